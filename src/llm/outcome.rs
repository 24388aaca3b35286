use std::fmt;

/// Why an operation produced no usable model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Transport, status or timeout failure.
    Provider(String),
    /// The provider answered but not in the agreed shape.
    Malformed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Provider(msg) => write!(f, "provider failure: {}", msg),
            FallbackReason::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

/// Result of a non-fatal generation operation. Callers substitute their own
/// deterministic value on `Fallback`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Fallback(FallbackReason),
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Fallback(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Fallback(reason) => Outcome::Fallback(reason),
        }
    }
}
