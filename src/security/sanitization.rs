use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Inputs longer than this are rejected without scanning
pub const DEFAULT_MAX_SCAN_LENGTH: usize = 4096;

/// Pseudo pattern id reported when an input exceeds the scan length limit
pub const PATTERN_MAX_LENGTH: &str = "max-scan-length";
/// Pseudo pattern id reported when percent-decoding produced invalid UTF-8
pub const PATTERN_DECODE_FAILURE: &str = "percent-decode-failure";

/// A named injection pattern
struct InjectionPattern {
    id: &'static str,
    regex: Regex,
}

fn pattern(id: &'static str, regex: &str) -> InjectionPattern {
    InjectionPattern {
        id,
        regex: Regex::new(regex).unwrap(),
    }
}

/// Injection pattern set, compiled once.
///
/// All keyword patterns are case-insensitive, which covers the case-obfuscation
/// class (`dRoP tAbLe`) without a separate folding pass. The patterns are
/// matched against every normalized form of the input, so encoding tricks have
/// to survive all of them to get through.
static INJECTION_PATTERNS: Lazy<Vec<InjectionPattern>> = Lazy::new(|| {
    vec![
        pattern(
            "sql-keyword",
            r"(?i)\b(?:drop|truncate)\s+(?:table|database|schema|collection|index|view)\b|\bdelete\s+from\s+\w|\binsert\s+into\s+\w|\bupdate\s+\w+\s+set\s+\w|\bunion\s+(?:all\s+)?select\b|\bselect\s+\*\s*from\b|\bexec(?:ute)?\s+(?:xp_|sp_)\w",
        ),
        pattern(
            "stacked-statement",
            r"(?i);\s*(?:drop|delete|truncate|update|insert|create|alter|exec|execute|shutdown|grant|revoke)\b",
        ),
        pattern("comment-marker", r#"/\*|\*/|(?:^|[\s;'")])--"#),
        pattern(
            "boolean-tautology",
            r#"(?i)['"]\s*(?:or|and)\b[^=]{0,24}=|\b(?:or|and)\s+\d+\s*=\s*\d+|['"]\s*=\s*['"]"#,
        ),
        pattern(
            "quote-escape",
            r#"'\s*;|"\s*;|'\s*--|"\s*--|\\x27|\\x22|\\'"#,
        ),
        pattern(
            "time-probe",
            r"(?i)\b(?:sleep|pg_sleep|benchmark)\s*\(|\bwaitfor\s+delay\b",
        ),
        pattern(
            "nosql-operator",
            r#"(?i)\$(?:where|function|accumulator|expr)\b|["'{\[,]\s*\$(?:ne|eq|gt|gte|lt|lte|in|nin|regex|or|and|not|nor|exists|elemMatch|mod|size|type|text|search|set|unset|inc|push|pull|rename)\b|^\$(?:ne|eq|gt|gte|lt|lte|in|nin|regex|or|and|not|nor|exists|elemMatch|mod|size|type|text|search|set|unset|inc|push|pull|rename)\b"#,
        ),
        pattern(
            "script-vector",
            r"(?i)javascript\s*:|\beval\s*\(|\bnew\s+function\s*\(|function\s*\(\s*\)\s*\{",
        ),
        pattern("control-char", r"[\x00\x08\x0b\x1a]"),
    ]
});

/// Inline SQL comments. Stripping rejoins keywords split by them.
static INLINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// The transformation that produced a scanned candidate string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalForm {
    /// The input exactly as given
    Raw,
    /// NFKD Unicode normalization (collapses fullwidth and combining forms)
    Unicode,
    /// Percent-decoded once (applied to the raw and normalized bases)
    Decoded,
    /// Percent-decoded twice (catches double-encoded payloads)
    DoubleDecoded,
    /// Inline comments removed, rejoining split keywords
    CommentStripped,
}

impl std::fmt::Display for NormalForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalForm::Raw => write!(f, "raw"),
            NormalForm::Unicode => write!(f, "unicode-normalized"),
            NormalForm::Decoded => write!(f, "percent-decoded"),
            NormalForm::DoubleDecoded => write!(f, "double-percent-decoded"),
            NormalForm::CommentStripped => write!(f, "comment-stripped"),
        }
    }
}

/// Result of screening one input string.
///
/// When `rejected` is true, `matched_pattern` names the pattern that fired and
/// `matched_form` names the normalized form it fired on. Length and decode
/// rejections carry the pseudo pattern ids [`PATTERN_MAX_LENGTH`] and
/// [`PATTERN_DECODE_FAILURE`].
#[derive(Debug, Clone)]
pub struct SanitizationVerdict<'a> {
    /// The input that was screened
    pub input: &'a str,
    /// Whether the input was rejected
    pub rejected: bool,
    /// Id of the pattern that fired, if any
    pub matched_pattern: Option<&'static str>,
    /// Normalized form the pattern fired on, if any
    pub matched_form: Option<NormalForm>,
}

impl<'a> SanitizationVerdict<'a> {
    fn safe(input: &'a str) -> Self {
        Self {
            input,
            rejected: false,
            matched_pattern: None,
            matched_form: None,
        }
    }

    fn rejected(
        input: &'a str,
        matched_pattern: &'static str,
        matched_form: Option<NormalForm>,
    ) -> Self {
        Self {
            input,
            rejected: true,
            matched_pattern: Some(matched_pattern),
            matched_form,
        }
    }

    /// Whether the input passed screening
    pub fn is_safe(&self) -> bool {
        !self.rejected
    }
}

/// Percent-decode one layer. `Ok(None)` means there was nothing to decode;
/// `Err` means the decoded bytes were not valid UTF-8.
fn decode_once(input: &str) -> Result<Option<String>, std::string::FromUtf8Error> {
    if !input.contains('%') {
        return Ok(None);
    }
    let decoded = urlencoding::decode(input)?.into_owned();
    if decoded == input {
        Ok(None)
    } else {
        Ok(Some(decoded))
    }
}

fn push_unique(forms: &mut Vec<(NormalForm, String)>, form: NormalForm, candidate: String) {
    if !forms.iter().any(|(_, existing)| *existing == candidate) {
        forms.push((form, candidate));
    }
}

/// Injection screening for strings destined for a query path.
///
/// The guard is a pure function service: it holds no state, takes no locks and
/// is safe to call from any number of threads concurrently.
///
/// An input is rejected if *any* normalized form of it matches any pattern.
/// The forms are derived independently, not as one cumulative pipeline, so an
/// attacker chaining techniques (say fullwidth Unicode plus URL encoding) is
/// still caught: decoding runs from both the raw and the NFKD-normalized
/// bases, decoded text is normalized again, and inline comments are stripped
/// from every form.
///
/// # Example
///
/// ```
/// use catalog_foundation::security::SanitizationGuard;
///
/// assert!(SanitizationGuard::is_safe("Aviator Classic 58mm"));
/// assert!(!SanitizationGuard::is_safe("'; DROP TABLE products; --"));
/// // URL-encoded payloads are decoded before matching
/// assert!(!SanitizationGuard::is_safe("%27%3B%20DROP%20TABLE%20products%3B%20--"));
/// ```
pub struct SanitizationGuard;

impl SanitizationGuard {
    /// Screen an input with the default scan length limit
    ///
    /// Returns `false` if any normalized form of the input matches an
    /// injection pattern, if the input is longer than
    /// [`DEFAULT_MAX_SCAN_LENGTH`], or if percent-decoding fails. Decode
    /// failure rejects: an input whose safety cannot be verified is unsafe.
    pub fn is_safe(input: &str) -> bool {
        Self::inspect(input).is_safe()
    }

    /// Screen an input, reporting which pattern and form fired
    pub fn inspect(input: &str) -> SanitizationVerdict<'_> {
        Self::inspect_with_limit(input, DEFAULT_MAX_SCAN_LENGTH)
    }

    /// Screen an input with an explicit scan length limit
    pub fn inspect_with_limit(input: &str, max_scan_length: usize) -> SanitizationVerdict<'_> {
        if input.len() > max_scan_length {
            return SanitizationVerdict::rejected(input, PATTERN_MAX_LENGTH, None);
        }

        let normalized: String = input.nfkd().collect();

        let mut forms: Vec<(NormalForm, String)> = Vec::new();
        forms.push((NormalForm::Raw, input.to_owned()));
        push_unique(&mut forms, NormalForm::Unicode, normalized.clone());

        // Decode chains run from both bases. Fullwidth percent signs only
        // become decodable after NFKD, and percent-encoded fullwidth letters
        // only become recognizable after decoding, so each decoded layer is
        // normalized again as well.
        for base in [input.to_owned(), normalized] {
            let mut current = base;
            for depth in [NormalForm::Decoded, NormalForm::DoubleDecoded] {
                match decode_once(&current) {
                    Ok(Some(decoded)) => {
                        push_unique(&mut forms, depth, decoded.clone());
                        push_unique(&mut forms, depth, decoded.nfkd().collect());
                        current = decoded;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        return SanitizationVerdict::rejected(
                            input,
                            PATTERN_DECODE_FAILURE,
                            Some(depth),
                        );
                    }
                }
            }
        }

        // Rejoin keywords split by inline comments, on every form. A comment
        // can sit inside a keyword (`dr/**/op`) or stand in for the space
        // between two (`drop/**/table`), so both replacements are scanned.
        let mut stripped: Vec<(NormalForm, String)> = Vec::new();
        for (_, candidate) in &forms {
            if candidate.contains("/*") {
                for replacement in ["", " "] {
                    let rejoined = INLINE_COMMENT.replace_all(candidate, replacement).into_owned();
                    if !forms.iter().any(|(_, existing)| *existing == rejoined)
                        && !stripped.iter().any(|(_, existing)| *existing == rejoined)
                    {
                        stripped.push((NormalForm::CommentStripped, rejoined));
                    }
                }
            }
        }
        forms.extend(stripped);

        for (form, candidate) in &forms {
            for pattern in INJECTION_PATTERNS.iter() {
                if pattern.regex.is_match(candidate) {
                    return SanitizationVerdict::rejected(input, pattern.id, Some(*form));
                }
            }
        }

        SanitizationVerdict::safe(input)
    }
}
