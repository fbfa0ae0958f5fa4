//! Unified error types for the ground-service engine.
//!
//! Each boundary has its own small error enum (plan fetch, plan parse,
//! simulator/automation port, configuration).  They all convert into the
//! top-level [`Error`] so callers that only need to report can stay uniform.
//! Every variant is cheap to clone; the port and range errors are `Copy` so
//! the safety supervisor can latch them without allocation.

use core::fmt;

use crate::domain::Domain;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the engine funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The flight plan source could not be reached.
    Fetch(FetchError),
    /// The flight plan payload was malformed or untrusted.
    Parse(ParseError),
    /// A simulator or automation read/write failed.
    Port(PortError),
    /// An observed value was outside physically plausible bounds.
    Range(RangeViolation),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "plan fetch: {e}"),
            Self::Parse(e) => write!(f, "plan parse: {e}"),
            Self::Port(e) => write!(f, "port: {e}"),
            Self::Range(e) => write!(f, "range: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Plan fetch errors
// ---------------------------------------------------------------------------

/// The plan source (network service, file drop) is not reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    /// Source is unreachable or the document does not exist yet.
    Unavailable,
    /// The source did not answer in time.
    Timeout,
    /// Transport-level I/O failure.
    Io,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "plan source unavailable"),
            Self::Timeout => write!(f, "plan source timed out"),
            Self::Io => write!(f, "plan source I/O error"),
        }
    }
}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

// ---------------------------------------------------------------------------
// Plan parse errors
// ---------------------------------------------------------------------------

/// The plan payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Payload carries a document type declaration, entity declaration or
    /// external identifier.  Never parsed.
    ForbiddenMarkup(&'static str),
    /// Payload exceeds the configured size limit.
    TooLarge { len: usize, max: usize },
    /// Payload is not valid UTF-8 / JSON.
    Malformed(String),
    /// A required field is absent or empty.
    MissingField(&'static str),
    /// A quantity is negative, non-finite or implausibly large.
    OutOfRange(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForbiddenMarkup(what) => write!(f, "forbidden markup: {what}"),
            Self::TooLarge { len, max } => write!(f, "payload {len} bytes exceeds {max}"),
            Self::Malformed(msg) => write!(f, "malformed payload: {msg}"),
            Self::MissingField(field) => write!(f, "missing field: {field}"),
            Self::OutOfRange(field) => write!(f, "value out of range: {field}"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Port errors (simulator / automation boundary)
// ---------------------------------------------------------------------------

/// A read or write on the simulator or automation boundary failed.
///
/// All variants are transient from the engine's point of view: the domain
/// is retried on the next tick and only held after repeated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// No answer within the adapter's bounded timeout.
    Timeout,
    /// The endpoint refused the write.
    Rejected,
    /// The endpoint is disconnected.
    Unavailable,
    /// The endpoint answered with something that is not a number.
    InvalidValue,
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Rejected => write!(f, "write rejected"),
            Self::Unavailable => write!(f, "endpoint unavailable"),
            Self::InvalidValue => write!(f, "invalid value"),
        }
    }
}

impl From<PortError> for Error {
    fn from(e: PortError) -> Self {
        Self::Port(e)
    }
}

// ---------------------------------------------------------------------------
// Range violations
// ---------------------------------------------------------------------------

/// An observed amount fell outside the plausible range and was clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeViolation {
    pub domain: Domain,
    pub observed: f64,
    pub clamped: f64,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} observed {:.1}, clamped to {:.1}",
            self.domain, self.observed, self.clamped
        )
    }
}

impl From<RangeViolation> for Error {
    fn from(e: RangeViolation) -> Self {
        Self::Range(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No stored config exists (first start).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    Io,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Plan-level error (fetch or parse)
// ---------------------------------------------------------------------------

/// Failure of a single [`PlanProvider::load`](crate::plan::PlanProvider::load).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    Fetch(FetchError),
    Parse(ParseError),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<FetchError> for PlanError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<ParseError> for PlanError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<PlanError> for Error {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::Fetch(f) => Self::Fetch(f),
            PlanError::Parse(p) => Self::Parse(p),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
