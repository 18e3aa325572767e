use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use reqwest::{Method, StatusCode};

/// Coarse classification of every failure the SDK can surface.
///
/// Each pipeline stage maps to exactly one kind so callers can decide on a
/// retry policy without string matching. Nothing inside the SDK retries.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    /// Network or HTTP failure, or a gateway body that could not be understood.
    Transport,
    /// The gateway answered with a non-`"0"` response code.
    Application,
    /// Envelope construction failed, e.g. the sequence fetch did not succeed.
    Build,
    /// Key import or signature production failed.
    Signing,
    /// Serialization of a signed envelope or request body failed.
    Encoding,
    /// The realtime connection could not be opened.
    Connect,
    /// The realtime connection failed after it was established.
    Stream,
    /// An inbound realtime frame did not have the expected outer envelope.
    MalformedFrame,
    /// An inbound realtime frame carried an empty `data` array.
    EmptyPayload,
    /// Private key bytes are not a valid secp256k1 scalar.
    InvalidKey,
    /// The gateway does not know the queried address.
    AccountNotFound,
    /// Caller supplied input was rejected before anything was sent.
    Validation,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Transport => "transport",
            Kind::Application => "application",
            Kind::Build => "build",
            Kind::Signing => "signing",
            Kind::Encoding => "encoding",
            Kind::Connect => "connect",
            Kind::Stream => "stream",
            Kind::MalformedFrame => "malformed frame",
            Kind::EmptyPayload => "empty payload",
            Kind::InvalidKey => "invalid key material",
            Kind::AccountNotFound => "account not found",
            Kind::Validation => "validation",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns the typed source when it is an `E`, e.g. [`Application`].
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let source = self.source.as_deref()?;
        source.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Validation {
            reason: reason.into(),
        }
        .into()
    }

    pub fn application<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Application {
            code: code.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        Status {
            status_code,
            method,
            path,
            message: message.into(),
        }
        .into()
    }

    /// Builds an error of `kind` carrying a plain message.
    pub fn message<S: Into<String>>(kind: Kind, message: S) -> Self {
        Self::with_source(kind, Message(message.into()))
    }

    /// Re-tags an error from an earlier stage as belonging to `kind`.
    ///
    /// The original error stays reachable through [`StdError::source`].
    #[must_use]
    pub fn into_kind(self, kind: Kind) -> Self {
        if self.kind == kind {
            return self;
        }
        Self::with_source(kind, self)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{}: {}", self.kind, src),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Non-`"0"` gateway response code.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Application {
    pub code: String,
    pub message: String,
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gateway rejected request (code {}): {}", self.code, self.message)
    }
}

impl StdError for Application {}

impl From<Application> for Error {
    fn from(err: Application) -> Self {
        Error::with_source(Kind::Application, err)
    }
}

/// Non-success HTTP status returned by the gateway.
#[non_exhaustive]
#[derive(Debug)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error({}) making {} call to {} with {}",
            self.status_code, self.method, self.path, self.message
        )
    }
}

impl StdError for Status {}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Transport, err)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

/// The gateway accepted a submission but none of the known handle fields
/// carried a value. The transaction may still have been included.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MissingHandle {
    pub checked: &'static [&'static str],
}

impl fmt::Display for MissingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gateway response carried no transaction handle (checked {})",
            self.checked.join(", ")
        )
    }
}

impl StdError for MissingHandle {}

impl From<MissingHandle> for Error {
    fn from(err: MissingHandle) -> Self {
        Error::with_source(Kind::Transport, err)
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::with_source(Kind::Transport, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Transport, e)
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::with_source(Kind::Encoding, e)
    }
}

#[cfg(feature = "ws")]
impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::with_source(Kind::Stream, e)
    }
}
