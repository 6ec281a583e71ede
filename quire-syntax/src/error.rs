//! Error types shared by all quire crates.

use std::borrow::Cow;
use std::fmt;

/// A specialized [`Result`] type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// The category of a [`DocError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A malformed token.
    LexicalError,
    /// An unexpected token or structure.
    SyntaxError,
    /// An object number outside of the cross-reference table.
    ReferenceOutOfRange,
    /// A required dictionary entry is missing.
    MissingRequiredEntry,
    /// A stream's declared length does not match its data.
    StreamLengthMismatch,
    /// No password could be authenticated against the security handler.
    EncryptionAuthenticationFailure,
    /// A function was called with the wrong arity or outside of its domain.
    FunctionDomainMismatch,
    /// A content or calculator stack overflowed.
    StackOverflow,
    /// A content or calculator stack underflowed.
    StackUnderflow,
    /// A value had the wrong type for an operation.
    TypeCheck,
    /// An arithmetic operation had no defined result.
    UndefinedResult,
    /// A feature that is recognized but not supported.
    UnsupportedFeature,
    /// A named resource could not be found.
    ResourceNotFound,
    /// The document could not be opened, even after repair.
    DocumentUnopenable,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::LexicalError => "lexical error",
            Self::SyntaxError => "syntax error",
            Self::ReferenceOutOfRange => "reference out of range",
            Self::MissingRequiredEntry => "missing required entry",
            Self::StreamLengthMismatch => "stream length mismatch",
            Self::EncryptionAuthenticationFailure => "encryption authentication failure",
            Self::FunctionDomainMismatch => "function domain mismatch",
            Self::StackOverflow => "stack overflow",
            Self::StackUnderflow => "stack underflow",
            Self::TypeCheck => "typecheck",
            Self::UndefinedResult => "undefined result",
            Self::UnsupportedFeature => "unsupported feature",
            Self::ResourceNotFound => "resource not found",
            Self::DocumentUnopenable => "document unopenable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while reading or interpreting a document.
///
/// Errors can be chained: the `cause` is the lower-level error that led to
/// this one, and is exposed through [`std::error::Error::source`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    cause: Option<Box<DocError>>,
}

impl DocError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach a lower-level cause to this error.
    pub fn with_cause(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message of the error, without its causes.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The chained cause, if any.
    pub fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }

    /// Returns the innermost error of the chain.
    pub fn root_cause(&self) -> &Self {
        let mut cur = self;

        while let Some(next) = cur.cause() {
            cur = next;
        }

        cur
    }

    /// Whether this error or any of its causes has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        let mut cur = Some(self);

        while let Some(err) = cur {
            if err.kind == kind {
                return true;
            }

            cur = err.cause();
        }

        false
    }
}

impl fmt::Display for DocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Extension methods for wrapping errors.
pub trait ResultExt<T> {
    /// Wrap the error (if any) as the cause of a new error.
    fn context(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|e| DocError::new(kind, message).with_cause(e))
    }
}

macro_rules! bail {
    ($kind:ident, $($arg:tt)+) => {
        return Err($crate::error::DocError::new(
            $crate::error::ErrorKind::$kind,
            format!($($arg)+),
        ))
    };
}

macro_rules! err {
    ($kind:ident, $($arg:tt)+) => {
        $crate::error::DocError::new($crate::error::ErrorKind::$kind, format!($($arg)+))
    };
}

pub(crate) use {bail, err};
