//! HTTP-facing error kinds.
//!
//! Handlers report failures by wrapping the underlying cause in an
//! [`HttpError`] tagged with one [`Kind`]. The boundary layer (`svckit-api`)
//! inspects the tag to pick a status code and render the error envelope.

use thiserror::Error;

use crate::validation::FieldErrors;

/// Boxed underlying cause carried by every [`HttpError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for handlers and adapters that fail with an [`HttpError`].
pub type HttpResult<T> = Result<T, HttpError>;

/// The fixed set of error tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    BadRequest,
    Conflict,
    Forbidden,
    InternalServer,
    NotAcceptable,
    NotFound,
    Unauthorized,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::BadRequest,
        Kind::Conflict,
        Kind::Forbidden,
        Kind::InternalServer,
        Kind::NotAcceptable,
        Kind::NotFound,
        Kind::Unauthorized,
    ];

    /// Status code associated with the tag.
    pub const fn status(self) -> u16 {
        match self {
            Kind::BadRequest => 400,
            Kind::Unauthorized => 401,
            Kind::Forbidden => 403,
            Kind::NotFound => 404,
            Kind::NotAcceptable => 406,
            Kind::Conflict => 409,
            Kind::InternalServer => 500,
        }
    }

    /// Standard reason phrase of [`Kind::status`]; the default message.
    pub const fn reason(self) -> &'static str {
        match self {
            Kind::BadRequest => "Bad Request",
            Kind::Unauthorized => "Unauthorized",
            Kind::Forbidden => "Forbidden",
            Kind::NotFound => "Not Found",
            Kind::NotAcceptable => "Not Acceptable",
            Kind::Conflict => "Conflict",
            Kind::InternalServer => "Internal Server Error",
        }
    }

    /// Only these kinds keep a field-error map.
    const fn carries_fields(self) -> bool {
        matches!(self, Kind::BadRequest | Kind::Conflict)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Message {
    Default,
    Custom(String),
    Cleared,
}

/// An error tagged with exactly one [`Kind`].
///
/// `Display` renders the underlying cause, not the kind's message: the
/// message is meant for the client, the cause for diagnostics.
///
/// Values are never mutated in place; [`HttpError::with_message`] and
/// [`HttpError::status_only`] consume the error and return the updated one.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct HttpError {
    kind: Kind,
    message: Message,
    fields: FieldErrors,
    #[source]
    source: BoxError,
}

impl HttpError {
    /// Wrap `cause` under `kind`.
    ///
    /// For [`Kind::BadRequest`] and [`Kind::Conflict`], a cause that is a
    /// [`FieldErrors`] has its mapping copied into the error.
    pub fn new(kind: Kind, cause: impl Into<BoxError>) -> Self {
        let source = cause.into();
        let fields = if kind.carries_fields() {
            source
                .downcast_ref::<FieldErrors>()
                .cloned()
                .unwrap_or_default()
        } else {
            FieldErrors::default()
        };

        Self {
            kind,
            message: Message::Default,
            fields,
            source,
        }
    }

    pub fn bad_request(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::BadRequest, cause)
    }

    pub fn conflict(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::Conflict, cause)
    }

    pub fn forbidden(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::Forbidden, cause)
    }

    pub fn internal_server(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::InternalServer, cause)
    }

    pub fn not_acceptable(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::NotAcceptable, cause)
    }

    pub fn not_found(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::NotFound, cause)
    }

    pub fn unauthorized(cause: impl Into<BoxError>) -> Self {
        Self::new(Kind::Unauthorized, cause)
    }

    /// Replace the client-facing message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Message::Custom(message.into());
        self
    }

    /// Drop the client-facing message; only the status is reported.
    pub fn status_only(mut self) -> Self {
        self.message = Message::Cleared;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Client-facing message: the kind's reason phrase unless replaced or
    /// cleared.
    pub fn msg(&self) -> &str {
        match &self.message {
            Message::Default => self.kind.reason(),
            Message::Custom(message) => message,
            Message::Cleared => "",
        }
    }

    /// The message set through [`HttpError::with_message`] or
    /// [`HttpError::status_only`], if any.
    pub fn custom_message(&self) -> Option<&str> {
        match &self.message {
            Message::Default => None,
            Message::Custom(message) => Some(message),
            Message::Cleared => Some(""),
        }
    }

    /// Field-level errors. Always empty for kinds other than BadRequest and
    /// Conflict.
    pub fn fields(&self) -> &FieldErrors {
        &self.fields
    }

    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    pub fn into_cause(self) -> BoxError {
        self.source
    }

    pub fn is_bad_request(&self) -> bool {
        self.kind == Kind::BadRequest
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == Kind::Conflict
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == Kind::Forbidden
    }

    pub fn is_internal_server(&self) -> bool {
        self.kind == Kind::InternalServer
    }

    pub fn is_not_acceptable(&self) -> bool {
        self.kind == Kind::NotAcceptable
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == Kind::NotFound
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == Kind::Unauthorized
    }
}
