use std::error::Error as ErrorTrait;
use std::fmt::Display;

/// Boxed error returned by the pluggable collaborators (`Transport`, `Filesystem`, `Fetcher`).
pub type BoxError = Box<dyn ErrorTrait + Send + Sync + 'static>;

///
/// Contains information about an error occurence
///
#[derive(Debug)]
pub struct Error {
    /// The type of this error
    pub kind: ErrorKind,
    /// Some errors come with more context
    pub context: Option<String>,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new_with_context(kind: ErrorKind, context: impl Display) -> Error {
        Error {
            kind,
            context: Some(context.to_string()),
            source: None,
        }
    }

    pub(crate) fn new_with_source(kind: ErrorKind, context: impl Display, source: BoxError) -> Error {
        Error {
            kind,
            context: Some(context.to_string()),
            source: Some(source),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (context: {})",
            self.kind.description(),
            self.context.as_deref().unwrap_or("none")
        )
    }
}

impl ErrorTrait for Error {
    fn source(&self) -> Option<&(dyn ErrorTrait + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn ErrorTrait + 'static))
    }
}

///
/// The type of an error
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `abort` was called with an empty or unknown failure reason
    InvalidErrorReason,
    /// The URL pattern could not be compiled
    InvalidUrlPattern,
    /// The regular expression of a matcher could not be compiled
    InvalidMatcher,
    /// The response body could not be decoded
    BodyDecode,
    /// Sending a protocol command failed
    Transport,
    /// The protocol answered with something we could not read
    InvalidResponse,
    /// A file or remote resource used as a stub could not be loaded
    ResourceUnavailable,
}

impl ErrorKind {
    fn description(&self) -> &'static str {
        match self {
            ErrorKind::InvalidErrorReason => "invalid error reason",
            ErrorKind::InvalidUrlPattern => "invalid url pattern",
            ErrorKind::InvalidMatcher => "invalid matcher regex",
            ErrorKind::BodyDecode => "failed to decode the response body",
            ErrorKind::Transport => "failed to send a protocol command",
            ErrorKind::InvalidResponse => "invalid protocol response",
            ErrorKind::ResourceUnavailable => "the stub resource is unavailable",
        }
    }
}
