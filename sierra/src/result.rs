//! Common result type for methods/functions which may return a `Result`.
use std::fmt;

/// This is a convenient way to set the error type to SierraError on
/// common method/function responses to simplify the declaration of
/// return types.
///
/// ```
/// use sierra::result::*;
///
/// fn foo1() -> SierraResult<()> {
///     Err(SierraError::MultiCallNum { item_id: "123".to_string() })
/// }
///
/// // Plain strings become Debug errors.
/// fn foo2() -> SierraResult<()> {
///     Err("PROBLEM")?;
///     Ok(())
/// }
///
/// assert!(foo1().unwrap_err().is_multi_call_num());
/// assert_eq!(foo2().unwrap_err().to_string(), "PROBLEM");
/// ```
pub type SierraResult<T> = std::result::Result<T, SierraError>;

#[derive(Debug, Clone)]
pub enum SierraError {
    /// General error/failure message.
    ///
    /// Catch-all for I/O, JSON, and CSV problems which have no
    /// dedicated variant.
    Debug(Box<String>),

    /// A value handed to a constructor or helper is unusable.  This is
    /// a programming or configuration error and is never recovered.
    InvalidArgument(String),

    /// The work list contains a row we cannot interpret.
    MalformedRow { line: u64, message: String },

    /// The remote system has no bib record with this ID.
    BibNotFound(String),

    /// An item carries more than one call number field and needs
    /// human review.
    MultiCallNum { item_id: String },

    /// Transport error or non-2xx response from the remote system.
    Remote { status: Option<u16>, message: String },
}

impl std::error::Error for SierraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl SierraError {
    pub fn from_string(s: String) -> SierraError {
        Self::Debug(Box::new(s))
    }

    pub fn invalid(msg: impl Into<String>) -> SierraError {
        Self::InvalidArgument(msg.into())
    }

    pub fn remote(status: Option<u16>, msg: impl Into<String>) -> SierraError {
        Self::Remote {
            status,
            message: msg.into(),
        }
    }

    pub fn is_bib_not_found(&self) -> bool {
        matches!(self, Self::BibNotFound(_))
    }

    pub fn is_multi_call_num(&self) -> bool {
        matches!(self, Self::MultiCallNum { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl fmt::Display for SierraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Debug(ref m) => write!(f, "{m}"),
            Self::InvalidArgument(ref m) => write!(f, "Invalid argument: {m}"),
            Self::MalformedRow { line, ref message } => {
                write!(f, "Malformed work list row at line {line}: {message}")
            }
            Self::BibNotFound(ref id) => write!(f, "Bib record not found: {id}"),
            Self::MultiCallNum { ref item_id } => {
                write!(f, "Item {item_id} has multiple call number fields")
            }
            Self::Remote {
                status: Some(s),
                ref message,
            } => write!(f, "Remote request failed status={s}: {message}"),
            Self::Remote {
                status: None,
                ref message,
            } => write!(f, "Remote request failed: {message}"),
        }
    }
}

impl From<String> for SierraError {
    fn from(msg: String) -> Self {
        SierraError::from_string(msg)
    }
}

impl From<&str> for SierraError {
    fn from(msg: &str) -> Self {
        SierraError::from_string(msg.to_string())
    }
}

/// Useful for translating SierraError's into plain strings for
/// functions that return vanilla Result<T, String>, like the Logger.
impl From<SierraError> for String {
    fn from(err: SierraError) -> Self {
        err.to_string()
    }
}

impl From<std::io::Error> for SierraError {
    fn from(original: std::io::Error) -> Self {
        SierraError::from_string(original.to_string())
    }
}

impl From<json::Error> for SierraError {
    fn from(original: json::Error) -> Self {
        SierraError::from_string(format!("JSON error: {original}"))
    }
}

impl From<csv::Error> for SierraError {
    fn from(original: csv::Error) -> Self {
        SierraError::from_string(format!("CSV error: {original}"))
    }
}

/// Transport level failures, including timeouts, are Remote errors.
impl From<reqwest::Error> for SierraError {
    fn from(original: reqwest::Error) -> Self {
        SierraError::remote(original.status().map(|s| s.as_u16()), original.to_string())
    }
}
