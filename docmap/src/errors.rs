use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for mapping operations.
///
/// Every failure raised by the mapper, the schema deriver, the document model
/// or the builders carries one of these kinds so callers can branch on the
/// category without parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use docmap::errors::{MapperError, ErrorKind, MapperResult};
///
/// fn example() -> MapperResult<()> {
///     Err(MapperError::new("unknown operator 'like'", ErrorKind::UnknownOperator))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Schema derivation
    /// A type declaration cannot be turned into a schema
    SchemaError,

    // Conversion
    /// A value falls outside the closed value set or matches no converter
    UnsupportedValueKind,
    /// The identity cache holds an incompatible live binding
    TypeConflict,
    /// A type has neither a schema nor a registered converter
    MissingSchema,
    /// A list property does not resolve its element type
    MissingElementType,
    /// A value of the right kind cannot be represented in the target type
    ConversionError,

    // Document model
    /// A document is already bound to a typed object
    AlreadyBound,
    /// A key is empty or not usable for the container
    InvalidKey,

    // Builders
    /// A string-form condition uses an operator that is not recognized
    UnknownOperator,
    /// A builder argument has the wrong shape
    ValidationError,

    // Driver seam
    /// The document store reported a write failure
    StoreError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SchemaError => write!(f, "Schema error"),
            ErrorKind::UnsupportedValueKind => write!(f, "Unsupported value kind"),
            ErrorKind::TypeConflict => write!(f, "Type conflict"),
            ErrorKind::MissingSchema => write!(f, "Missing schema"),
            ErrorKind::MissingElementType => write!(f, "Missing element type"),
            ErrorKind::ConversionError => write!(f, "Conversion error"),
            ErrorKind::AlreadyBound => write!(f, "Already bound"),
            ErrorKind::InvalidKey => write!(f, "Invalid key"),
            ErrorKind::UnknownOperator => write!(f, "Unknown operator"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// The error type of the mapping engine.
///
/// `MapperError` keeps a message, a kind, an optional cause and the backtrace
/// captured where it was raised.
///
/// # Examples
///
/// ```rust,ignore
/// use docmap::errors::{MapperError, ErrorKind};
///
/// let cause = MapperError::new("'abc' is not a number", ErrorKind::ConversionError);
/// let err = MapperError::new_with_cause(
///     "cannot set field 'age' of User",
///     ErrorKind::ConversionError,
///     cause,
/// );
/// ```
#[derive(Clone)]
pub struct MapperError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<MapperError>>,
    backtrace: Atomic<Backtrace>,
}

impl MapperError {
    /// Creates a new `MapperError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        MapperError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `MapperError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: MapperError) -> Self {
        MapperError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&MapperError> {
        self.cause.as_deref()
    }
}

impl Display for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for MapperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for mapping operations.
pub type MapperResult<T> = Result<T, MapperError>;

#[cfg(feature = "serde")]
impl serde::de::Error for MapperError {
    fn custom<T: Display>(msg: T) -> Self {
        MapperError::new(&msg.to_string(), ErrorKind::ConversionError)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for MapperError {
    fn custom<T: Display>(msg: T) -> Self {
        MapperError::new(&msg.to_string(), ErrorKind::ConversionError)
    }
}

impl From<std::num::ParseIntError> for MapperError {
    fn from(err: std::num::ParseIntError) -> Self {
        MapperError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::ConversionError,
        )
    }
}

impl From<std::num::ParseFloatError> for MapperError {
    fn from(err: std::num::ParseFloatError) -> Self {
        MapperError::new(
            &format!("Float parsing error: {}", err),
            ErrorKind::ConversionError,
        )
    }
}

impl From<regex::Error> for MapperError {
    fn from(err: regex::Error) -> Self {
        MapperError::new(
            &format!("Invalid regular expression: {}", err),
            ErrorKind::ConversionError,
        )
    }
}

impl From<uuid::Error> for MapperError {
    fn from(err: uuid::Error) -> Self {
        MapperError::new(&format!("Invalid UUID: {}", err), ErrorKind::ConversionError)
    }
}

impl From<String> for MapperError {
    fn from(msg: String) -> Self {
        MapperError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for MapperError {
    fn from(msg: &str) -> Self {
        MapperError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_error() {
        let error = MapperError::new("an error occurred", ErrorKind::SchemaError);
        assert_eq!(error.message(), "an error occurred");
        assert_eq!(error.kind(), &ErrorKind::SchemaError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn test_error_with_cause() {
        let cause = MapperError::new("'abc' is not a number", ErrorKind::ConversionError);
        let error = MapperError::new_with_cause("cannot set 'age'", ErrorKind::ConversionError, cause);
        assert_eq!(error.cause().map(|c| c.message()), Some("'abc' is not a number"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_display_prints_message_only() {
        let error = MapperError::new("bad key", ErrorKind::InvalidKey);
        assert_eq!(format!("{}", error), "bad key");
    }

    #[test]
    fn test_debug_prints_cause_chain() {
        let root = MapperError::new("root", ErrorKind::StoreError);
        let top = MapperError::new_with_cause("top", ErrorKind::StoreError, root);
        let debug = format!("{:?}", top);
        assert!(debug.starts_with("top\nCaused by: root"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::AlreadyBound.to_string(), "Already bound");
        assert_eq!(ErrorKind::UnknownOperator.to_string(), "Unknown operator");
        assert_eq!(ErrorKind::MissingElementType.to_string(), "Missing element type");
    }

    #[test]
    fn test_from_parse_errors() {
        let err: MapperError = "x".parse::<i32>().unwrap_err().into();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);

        let err: MapperError = "x".parse::<f64>().unwrap_err().into();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);
    }

    #[test]
    fn test_from_str() {
        let err: MapperError = "boom".into();
        assert_eq!(err.kind(), &ErrorKind::InternalError);
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_clone_keeps_kind() {
        let err = MapperError::new("conflict", ErrorKind::TypeConflict);
        let cloned = err.clone();
        assert_eq!(cloned.kind(), err.kind());
    }
}
