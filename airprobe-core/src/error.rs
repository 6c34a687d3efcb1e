use std::fmt;

/// POSIX `EBUSY`: the radio is in the middle of another operation.
pub const EBUSY: i64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// OS-level errno reported by the driver
    Posix,
    /// External tool exited unsuccessfully, code is its exit status
    Tool,
    /// The radio subsystem could not be reached at all
    Unavailable,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Posix => f.write_str("posix"),
            ErrorDomain::Tool => f.write_str("tool"),
            ErrorDomain::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Error surfaced by a radio collaborator as a `(domain, code)` pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("radio error {domain}/{code}: {message}")]
pub struct RadioError {
    pub domain: ErrorDomain,
    pub code: i64,
    pub message: String,
}

impl RadioError {
    pub fn new<S: Into<String>>(domain: ErrorDomain, code: i64, message: S) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
        }
    }

    pub fn busy<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorDomain::Posix, EBUSY, message)
    }

    pub fn is_busy(&self) -> bool {
        self.domain == ErrorDomain::Posix && self.code == EBUSY
    }
}

/// A single raw entry could not be turned into a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("invalid country code {0:?}")]
    InvalidCountryCode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("No WiFi interface available")]
    NoInterfaceAvailable,

    #[error(transparent)]
    Radio(#[from] RadioError),

    #[error("Scan cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error("Scan gave up after {attempts} attempt(s)")]
    AttemptsExhausted { attempts: u32 },

    #[error("Scan failed: domain={domain}, code={code}")]
    ScanFailed { domain: ErrorDomain, code: i64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
