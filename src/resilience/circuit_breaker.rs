//! Circuit Breaker Pattern Implementation
//!
//! This module provides a circuit breaker that protects the backing store from
//! cascading failures. The breaker tracks failures per guarded resource and fails
//! fast while the resource is unhealthy, probing for recovery after a cool-down.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐
//! │ Closed  │ ◄──────────────────┐
//! │ (Normal)│                    │
//! └────┬────┘                    │ trial call
//!      │ failure_threshold       │ succeeds
//!      │ failures since entry    │
//!      ▼                         │
//! ┌─────────┐   cool-down   ┌────┴──────┐
//! │  Open   │───────────────► HalfOpen  │
//! │(Failing)│               │ (Probing) │
//! └─────────┘◄──────────────└───────────┘
//!               trial call fails
//! ```
//!
//! Every decision the breaker makes (may this call proceed, and what state does
//! that imply) happens inside a single critical section. The lock is never held
//! across the guarded operation itself, so a slow store call cannot block other
//! callers from being admitted or rejected.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use catalog_foundation::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a circuit breaker with default config
//! let cb = CircuitBreaker::new("products".to_string());
//!
//! // Or with custom config
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 10,
//!     cool_down: Duration::from_secs(120),
//!     operation_timeout: Some(Duration::from_secs(5)),
//! };
//! let cb_custom = CircuitBreaker::with_config("products".to_string(), config);
//!
//! // Use the circuit breaker to protect a call
//! let result = cb.call(async {
//!     // Make your risky call here (e.g., a database query)
//!     Ok::<String, std::io::Error>("Success".to_string())
//! }).await;
//!
//! match result {
//!     Ok(response) => println!("Success: {:?}", response),
//!     Err(e) => println!("Failed: {:?}", e),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, allowing all requests through
    Closed,
    /// Failing state, rejecting all requests until the cool-down expires
    Open,
    /// Probing state, allowing a single trial request to check recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Snapshot of a circuit breaker's counters, taken under its lock.
///
/// `failure_count` and `success_count` count events since the breaker last
/// entered its current state; they reset on every transition. The `total_*`
/// counters are lifetime values and survive transitions and manual resets.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    /// State the breaker was in when the snapshot was taken
    pub state: CircuitState,
    /// Failures recorded since the current state was entered
    pub failure_count: u32,
    /// Successes recorded since the current state was entered
    pub success_count: u32,
    /// Every call ever made, including fast rejections
    pub total_requests: u64,
    /// Executed calls that returned an error or timed out
    pub total_failures: u64,
    /// Calls rejected without executing (Open, or HalfOpen with a probe in flight)
    pub rejected_requests: u64,
    /// Time since the most recent recorded failure, if any
    pub last_failure_age: Option<Duration>,
    /// Time spent in the current state
    pub time_in_state: Duration,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures since state entry before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before a recovery probe is allowed
    pub cool_down: Duration,
    /// Deadline applied to each guarded operation; `None` disables it
    pub operation_timeout: Option<Duration>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(60),
            operation_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Circuit breaker error
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting requests
    #[error("Circuit breaker is open for {name}")]
    Open { name: String },
    /// The guarded operation exceeded the configured deadline
    #[error("Operation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    /// The underlying operation failed
    #[error("Operation failed: {0}")]
    Inner(#[source] E),
}

/// Everything the breaker's decisions depend on lives behind one mutex.
///
/// Counters and state are read and written only while this lock is held, so a
/// call can never observe a state the breaker has already moved past, and two
/// racing callers can never both claim the HalfOpen trial slot.
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    probe_in_flight: bool,
    failure_count: u32,
    success_count: u32,
    total_requests: u64,
    total_failures: u64,
    rejected_requests: u64,
    last_failure_time: Option<Instant>,
    last_state_change_time: Instant,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            probe_in_flight: false,
            failure_count: 0,
            success_count: 0,
            total_requests: 0,
            total_failures: 0,
            rejected_requests: 0,
            last_failure_time: None,
            last_state_change_time: Instant::now(),
        }
    }

    /// Move to `next`, resetting the per-state counters and the probe slot.
    fn transition(&mut self, next: CircuitState, name: &str) {
        let prev = self.state;
        self.state = next;
        self.failure_count = 0;
        self.success_count = 0;
        self.probe_in_flight = false;
        self.last_state_change_time = Instant::now();

        match next {
            CircuitState::Open => tracing::warn!(
                circuit_breaker = %name,
                from = %prev,
                to = %next,
                "Circuit breaker opened"
            ),
            _ => tracing::info!(
                circuit_breaker = %name,
                from = %prev,
                to = %next,
                "Circuit breaker state changed"
            ),
        }
    }

    fn cool_down_elapsed(&self, cool_down: Duration) -> bool {
        match self.last_failure_time {
            Some(at) => at.elapsed() >= cool_down,
            None => true,
        }
    }

    fn record_success(&mut self, name: &str) {
        self.success_count += 1;

        // One successful trial resolves the probe: the resource is back.
        if self.state == CircuitState::HalfOpen {
            self.transition(CircuitState::Closed, name);
        }
    }

    fn record_failure(&mut self, failure_threshold: u32, name: &str) {
        self.failure_count += 1;
        self.total_failures += 1;
        self.last_failure_time = Some(Instant::now());

        match self.state {
            CircuitState::Closed => {
                if self.failure_count >= failure_threshold {
                    self.transition(CircuitState::Open, name);
                }
            }
            // A failed trial resolves the probe: back to waiting.
            CircuitState::HalfOpen => self.transition(CircuitState::Open, name),
            CircuitState::Open => {}
        }
    }

    fn snapshot(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            total_requests: self.total_requests,
            total_failures: self.total_failures,
            rejected_requests: self.rejected_requests,
            last_failure_age: self.last_failure_time.map(|at| at.elapsed()),
            time_in_state: self.last_state_change_time.elapsed(),
        }
    }
}

/// How a call was admitted through the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted in Closed state
    Normal,
    /// Admitted as the single HalfOpen recovery probe
    Trial,
}

/// Clears the HalfOpen probe slot if the trial future is dropped before its
/// outcome is recorded. Without this, a cancelled probe would leave
/// `probe_in_flight` set and no caller could ever probe again.
struct ProbeGuard<'a> {
    inner: &'a Mutex<BreakerInner>,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().unwrap().probe_in_flight = false;
        }
    }
}

/// Circuit breaker guarding one downstream resource.
///
/// # Thread Safety
///
/// All decision state (current state, per-window counters, the HalfOpen probe
/// slot) sits behind a single mutex. "May this call proceed" and the state
/// transition that answer depends on are computed in one critical section, so
/// concurrent callers racing a transition boundary always act on the state the
/// breaker actually committed. The lock is released before the guarded
/// operation runs and re-acquired to record its outcome.
///
/// # Performance
///
/// The critical sections are a handful of integer updates; contention is only
/// possible on the lock itself, never across an await point.
#[derive(Clone)]
pub struct CircuitBreaker {
    /// Name for logging and debugging
    name: String,
    /// State, counters and probe slot, all behind one lock
    inner: Arc<Mutex<BreakerInner>>,
    /// Configuration
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_foundation::resilience::CircuitBreaker;
    ///
    /// let cb = CircuitBreaker::new("products".to_string());
    /// ```
    pub fn new(name: String) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use catalog_foundation::resilience::{CircuitBreaker, CircuitBreakerConfig};
    ///
    /// let config = CircuitBreakerConfig {
    ///     failure_threshold: 10,
    ///     cool_down: Duration::from_secs(120),
    ///     operation_timeout: None,
    /// };
    /// let cb = CircuitBreaker::with_config("brands".to_string(), config);
    /// ```
    pub fn with_config(name: String, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(BreakerInner::new())),
            config,
        }
    }

    /// Get the current state of the circuit breaker
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_foundation::resilience::{CircuitBreaker, CircuitState};
    ///
    /// let cb = CircuitBreaker::new("products".to_string());
    /// assert_eq!(cb.state(), CircuitState::Closed);
    /// ```
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Get the circuit breaker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take a consistent snapshot of the breaker's counters
    pub fn stats(&self) -> CircuitBreakerStats {
        self.inner.lock().unwrap().snapshot()
    }

    /// Get total number of calls, including fast rejections
    pub fn total_requests(&self) -> u64 {
        self.inner.lock().unwrap().total_requests
    }

    /// Get total number of executed calls that failed
    pub fn total_failures(&self) -> u64 {
        self.inner.lock().unwrap().total_failures
    }

    /// Failure rate over executed calls (0.0 to 1.0); rejections are excluded
    pub fn failure_rate(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        let executed = inner.total_requests - inner.rejected_requests;
        if executed == 0 {
            return 0.0;
        }
        inner.total_failures as f64 / executed as f64
    }

    /// Execute an operation protected by the circuit breaker
    ///
    /// # State Transitions
    ///
    /// - **Closed → Open**: when failures since entering Closed reach
    ///   `failure_threshold`
    /// - **Open → HalfOpen**: when `cool_down` has elapsed since the last
    ///   recorded failure
    /// - **HalfOpen → Closed**: the single trial call succeeds
    /// - **HalfOpen → Open**: the single trial call fails
    ///
    /// The admission decision and any Open → HalfOpen transition happen under
    /// one lock acquisition. While HalfOpen, exactly one caller is admitted as
    /// the trial; every other caller fails fast with
    /// [`CircuitBreakerError::Open`] until the trial resolves the state.
    /// `total_requests` counts every call, rejected or not.
    ///
    /// If `operation_timeout` is configured, the operation runs under that
    /// deadline and overruns are recorded as failures.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_foundation::resilience::CircuitBreaker;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let cb = CircuitBreaker::new("products".to_string());
    ///
    /// let result = cb.call(async {
    ///     // Your potentially failing operation
    ///     Ok::<_, std::io::Error>(42)
    /// }).await;
    ///
    /// match result {
    ///     Ok(value) => println!("Got: {}", value),
    ///     Err(e) => println!("Error: {}", e),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<F, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        // Admission and any cool-down transition are decided in one critical
        // section. Nothing below re-checks state without the lock.
        let admission = {
            let mut inner = self.inner.lock().unwrap();
            inner.total_requests += 1;

            if inner.state == CircuitState::Open && inner.cool_down_elapsed(self.config.cool_down) {
                inner.transition(CircuitState::HalfOpen, &self.name);
            }

            match inner.state {
                CircuitState::Closed => Admission::Normal,
                CircuitState::Open => {
                    inner.rejected_requests += 1;
                    return Err(CircuitBreakerError::Open {
                        name: self.name.clone(),
                    });
                }
                CircuitState::HalfOpen => {
                    if inner.probe_in_flight {
                        inner.rejected_requests += 1;
                        return Err(CircuitBreakerError::Open {
                            name: self.name.clone(),
                        });
                    }
                    inner.probe_in_flight = true;
                    Admission::Trial
                }
            }
        };

        let mut probe_guard = ProbeGuard {
            inner: &self.inner,
            armed: admission == Admission::Trial,
        };

        // The lock is not held while the operation runs.
        let outcome = match self.config.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, f).await {
                Ok(result) => result.map_err(CircuitBreakerError::Inner),
                Err(_) => Err(CircuitBreakerError::Timeout { elapsed: limit }),
            },
            None => f.await.map_err(CircuitBreakerError::Inner),
        };

        probe_guard.armed = false;

        {
            let mut inner = self.inner.lock().unwrap();
            if admission == Admission::Trial {
                inner.probe_in_flight = false;
            }
            match &outcome {
                Ok(_) => inner.record_success(&self.name),
                Err(_) => inner.record_failure(self.config.failure_threshold, &self.name),
            }
        }

        outcome
    }

    /// Manually reset the circuit breaker to Closed state
    ///
    /// This is useful for testing or administrative purposes. In production,
    /// prefer letting the circuit breaker manage state automatically. The
    /// lifetime totals are preserved; only the per-state window is cleared.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != CircuitState::Closed {
            inner.transition(CircuitState::Closed, &self.name);
        } else {
            inner.failure_count = 0;
            inner.success_count = 0;
        }
        tracing::info!(
            circuit_breaker = %self.name,
            "Circuit breaker manually reset to Closed"
        );
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("success_count", &inner.success_count)
            .field("total_requests", &inner.total_requests)
            .field("total_failures", &inner.total_failures)
            .field("config", &self.config)
            .finish()
    }
}
