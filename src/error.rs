use thiserror::Error as ThisError;

/// The error type produced by the crate itself.
///
/// Handlers and middleware may return any error type which implements
/// [`std::error::Error`]; it will be boxed into [`RouteError`](type.RouteError.html)
/// and passed to the router's error handler.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The request path could not be percent-decoded into valid UTF-8.
    #[error("could not percent decode request path: {0}")]
    PathDecode(String),

    /// A response helper was invoked after the status and body had already
    /// been written for the current request.
    #[error("response was already written")]
    ResponseWritten,

    /// A generic message error.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Creates a new error with the provided message.
    pub fn new<M: Into<String>>(msg: M) -> Error {
        Error::Message(msg.into())
    }
}

/// The boxed error type which handler and middleware errors are converted
/// into before they reach the error handler.
pub type RouteError = Box<dyn std::error::Error + Send + Sync + 'static>;
