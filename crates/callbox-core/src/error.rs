//! Error types for registration, marshaling and invocation

/// Result type used throughout the core
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a decoded request and its encoded result.
///
/// The request facade turns any of these into a `{"code": 500}` payload, so the
/// `Display` text is what callers see on the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No callable is registered under the requested path
    #[error("method not found: {path}, register it before invoking")]
    NotFound {
        /// The path that was looked up
        path: String,
    },

    /// Wrong number of arguments for the registered callable
    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// An argument could not be coerced to the declared parameter type
    #[error("argument {position} type mismatch: expected {expected}, got {actual}")]
    ArgumentTypeMismatch {
        /// Zero-based argument position
        position: usize,
        /// Declared parameter type
        expected: String,
        /// Runtime type of the supplied value
        actual: String,
    },

    /// Malformed literal inside an explicit type tag
    #[error("cannot parse {text:?} as {target}")]
    ValueParse {
        /// The offending text
        text: String,
        /// Type it was parsed as
        target: String,
    },

    /// Type tag that is neither built in nor a registered composite type
    #[error("unknown type: {0}, register it in the type registry first")]
    UnknownType(String),

    /// No JSON encoding exists for a runtime value
    #[error("unsupported value type: {0}, register a converter for it first")]
    UnsupportedValueType(String),

    /// Composite constructor rejected its JSON input
    #[error("cannot construct {type_name}: {message}")]
    Construct {
        /// Composite type name
        type_name: String,
        /// Constructor error text
        message: String,
    },

    /// Request is missing mandatory fields or is not valid JSON
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The registered callable panicked
    #[error("invocation panicked: {0}")]
    Panic(String),
}

/// Failed coercion of one value, before the argument position is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type mismatch: expected {expected}, got {got}")]
pub struct TypeMismatch {
    /// Expected type name
    pub expected: String,
    /// Actual type name
    pub got: String,
}

impl TypeMismatch {
    /// Lift into an [`Error::ArgumentTypeMismatch`] at `position`.
    pub fn at(self, position: usize) -> Error {
        Error::ArgumentTypeMismatch {
            position,
            expected: self.expected,
            actual: self.got,
        }
    }
}
