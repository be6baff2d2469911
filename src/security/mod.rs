pub mod sanitization;

pub use sanitization::{
    NormalForm, SanitizationGuard, SanitizationVerdict, DEFAULT_MAX_SCAN_LENGTH,
    PATTERN_DECODE_FAILURE, PATTERN_MAX_LENGTH,
};
