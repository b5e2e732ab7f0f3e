use crate::command::{FailRequestParams, FulfillRequestParams};
use crate::fetch::{Fetcher, Filesystem};
use crate::headers::Headers;
use crate::overwrite::{AbortOverwrite, RespondOverwrite};
use crate::request::{Body, Call, RequestPausedEvent};
use crate::{Error, ErrorKind};
use base64::Engine;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_RESPONSE_STATUS: u16 = 200;
const JSON_CONTENT_TYPE: &str = "application/json";

type StubFn = dyn Fn(&Call) -> Option<Stub> + Send + Sync + 'static;
type StatusFn = dyn Fn(&Call) -> u16 + Send + Sync + 'static;

///
/// What a mock answers with.
///
/// - `Text` is checked in order: an existing file path is served from disk, an `http`/`https`
///   URL is fetched, anything else is sent as the literal body.
/// - `Json` is serialized and served as `application/json`. A JSON string behaves like `Text`.
/// - `Fn` is called with the recorded request; returning `None` lets the original response
///   through, anything else is resolved like a stub passed directly.
/// - `Bytes` is sent as it is.
///
#[derive(Clone)]
pub enum Stub {
    /// A file path, a URL, or literal body text
    Text(String),
    /// A JSON body
    Json(serde_json::Value),
    /// A raw body
    Bytes(Vec<u8>),
    /// Computes the stub from the intercepted request
    Fn(Arc<StubFn>),
}

impl Stub {
    /// Wraps a function into a stub.
    pub fn from_fn(f: impl Fn(&Call) -> Option<Stub> + Send + Sync + 'static) -> Self {
        Stub::Fn(Arc::new(f))
    }
}

impl<'a> From<&'a str> for Stub {
    fn from(value: &str) -> Self {
        Stub::Text(value.to_string())
    }
}

impl From<String> for Stub {
    fn from(value: String) -> Self {
        Stub::Text(value)
    }
}

impl From<serde_json::Value> for Stub {
    fn from(value: serde_json::Value) -> Self {
        Stub::Json(value)
    }
}

impl From<Vec<u8>> for Stub {
    fn from(value: Vec<u8>) -> Self {
        Stub::Bytes(value)
    }
}

impl From<Body> for Stub {
    fn from(body: Body) -> Self {
        match body {
            Body::Json(value) => Stub::Json(value),
            Body::Text(text) => Stub::Text(text),
            Body::Bytes(bytes) => Stub::Bytes(bytes),
        }
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stub::Text(ref text) => write!(f, "Text({:?})", text),
            Stub::Json(ref value) => write!(f, "Json({})", value),
            Stub::Bytes(ref bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Stub::Fn(_) => f.write_str("<callback>"),
        }
    }
}

impl PartialEq for Stub {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Stub::Text(ref a), Stub::Text(ref b)) => a == b,
            (Stub::Json(ref a), Stub::Json(ref b)) => a == b,
            (Stub::Bytes(ref a), Stub::Bytes(ref b)) => a == b,
            (Stub::Fn(ref a), Stub::Fn(ref b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

///
/// The status code of a stubbed response.
///
#[derive(Clone)]
pub enum Status {
    /// A fixed code, not validated against the HTTP range
    Code(u16),
    /// Computes the code from the intercepted request
    Fn(Arc<StatusFn>),
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{}", code),
            Status::Fn(_) => f.write_str("<callback>"),
        }
    }
}

///
/// Header and status changes applied on top of a stub.
///
/// ## Example
///
/// ```
/// use fetchmock::RespondOptions;
///
/// let options = RespondOptions::new()
///     .with_header("x-api-key", "1234")
///     .without_header("set-cookie")
///     .with_status(201);
/// ```
///
#[derive(Clone, Debug, Default)]
pub struct RespondOptions {
    pub(crate) headers: Vec<(String, Option<String>)>,
    pub(crate) status: Option<Status>,
}

impl RespondOptions {
    /// No changes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a response header, replacing any field of the same name.
    pub fn with_header(mut self, field: &str, value: &str) -> Self {
        self.headers.push((field.to_owned(), Some(value.to_owned())));
        self
    }

    /// Removes a response header.
    pub fn without_header(mut self, field: &str) -> Self {
        self.headers.push((field.to_owned(), None));
        self
    }

    /// Overrides the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(Status::Code(status));
        self
    }

    /// Computes the status code from the intercepted request.
    pub fn with_status_fn(mut self, f: impl Fn(&Call) -> u16 + Send + Sync + 'static) -> Self {
        self.status = Some(Status::Fn(Arc::new(f)));
        self
    }

    fn overrides_header(&self, field: &str) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(field))
    }

    fn apply_headers(&self, headers: &mut Headers) {
        for (field, value) in &self.headers {
            match value {
                Some(value) => headers.set(field, value.as_str()),
                None => headers.remove(field),
            }
        }
    }
}

///
/// A stub resolved into what goes on the wire.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Fulfillment {
    /// The status code
    pub status: u16,
    /// The response headers
    pub headers: Headers,
    /// The raw body
    pub body: Vec<u8>,
}

impl Fulfillment {
    pub(crate) fn into_params(self, request_id: &str) -> FulfillRequestParams {
        FulfillRequestParams {
            request_id: request_id.to_string(),
            response_code: self.status,
            response_headers: self.headers,
            body: Some(base64::engine::general_purpose::STANDARD.encode(&self.body)),
        }
    }
}

///
/// Turns overwrites into protocol parameters, loading file and remote stubs through the
/// configured collaborators.
///
#[derive(Clone)]
pub struct StubBuilder {
    filesystem: Arc<dyn Filesystem>,
    fetcher: Arc<dyn Fetcher>,
}

impl StubBuilder {
    /// Creates a builder on top of the given collaborators.
    pub fn new(filesystem: Arc<dyn Filesystem>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            filesystem,
            fetcher,
        }
    }

    pub(crate) fn set_filesystem(&mut self, filesystem: Arc<dyn Filesystem>) {
        self.filesystem = filesystem;
    }

    pub(crate) fn set_fetcher(&mut self, fetcher: Arc<dyn Fetcher>) {
        self.fetcher = fetcher;
    }

    ///
    /// Resolves a respond overwrite against the intercepted request. `None` means the stub
    /// declined to answer and the request should continue untouched.
    ///
    pub async fn build_response(
        &self,
        overwrite: &RespondOverwrite,
        call: &Call,
        event: &RequestPausedEvent,
    ) -> Option<Fulfillment> {
        let resolved = resolve(overwrite.stub.clone(), call)?;

        let base = Fulfillment {
            status: event.response_status_code.unwrap_or(DEFAULT_RESPONSE_STATUS),
            headers: event.response_headers(),
            body: Vec::new(),
        };

        let mut fulfillment = match resolved {
            Resolved::Text(text) => self.resolve_text(text, base, &overwrite.options).await,
            Resolved::Json(value) => {
                let mut fulfillment = base;
                fulfillment.body = value.to_string().into_bytes();
                if !overwrite.options.overrides_header("content-type") {
                    fulfillment.headers.set("Content-Type", JSON_CONTENT_TYPE);
                }
                fulfillment
            }
            Resolved::Bytes(body) => Fulfillment { body, ..base },
        };

        overwrite.options.apply_headers(&mut fulfillment.headers);
        match overwrite.options.status {
            Some(Status::Code(code)) => fulfillment.status = code,
            Some(Status::Fn(ref f)) => fulfillment.status = f(call),
            None => {}
        }

        Some(fulfillment)
    }

    async fn resolve_text(
        &self,
        text: String,
        base: Fulfillment,
        options: &RespondOptions,
    ) -> Fulfillment {
        let loaded = if !text.is_empty() && self.filesystem.is_file(Path::new(&text)).await {
            Some(self.load_file(&text, &base, options).await)
        } else if is_remote_url(&text) {
            Some(self.load_remote(&text).await)
        } else {
            None
        };

        match loaded {
            Some(Ok(fulfillment)) => fulfillment,
            Some(Err(err)) => {
                log::warn!("Serving {} as literal text: {}", text, err);
                literal(text, base)
            }
            None => literal(text, base),
        }
    }

    async fn load_file(
        &self,
        path: &str,
        base: &Fulfillment,
        options: &RespondOptions,
    ) -> Result<Fulfillment, Error> {
        let body = self.filesystem.read(Path::new(path)).await.map_err(|err| {
            Error::new_with_source(ErrorKind::ResourceUnavailable, path, err)
        })?;

        let mut fulfillment = base.clone();
        fulfillment.body = body;
        if !options.overrides_header("content-type") {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            fulfillment.headers.set("Content-Type", mime.essence_str());
        }

        Ok(fulfillment)
    }

    async fn load_remote(&self, url: &str) -> Result<Fulfillment, Error> {
        let response = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|err| Error::new_with_source(ErrorKind::ResourceUnavailable, url, err))?;

        Ok(Fulfillment {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }

    /// Turns an abort overwrite into `Fetch.failRequest` parameters.
    pub fn build_abort(&self, request_id: &str, overwrite: &AbortOverwrite) -> FailRequestParams {
        FailRequestParams {
            request_id: request_id.to_string(),
            error_reason: overwrite.error_reason,
        }
    }
}

impl Default for StubBuilder {
    fn default() -> Self {
        #[cfg(feature = "remote")]
        let fetcher: Arc<dyn Fetcher> = Arc::new(crate::fetch::HyperFetcher::new());
        #[cfg(not(feature = "remote"))]
        let fetcher: Arc<dyn Fetcher> = Arc::new(crate::fetch::NoFetcher);

        Self::new(Arc::new(crate::fetch::LocalFilesystem), fetcher)
    }
}

impl fmt::Debug for StubBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StubBuilder")
    }
}

enum Resolved {
    Text(String),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// Runs callbacks until a concrete stub comes out, `None` if a callback declines.
fn resolve(mut stub: Stub, call: &Call) -> Option<Resolved> {
    loop {
        stub = match stub {
            Stub::Fn(f) => f(call)?,
            Stub::Text(text) | Stub::Json(serde_json::Value::String(text)) => {
                return Some(Resolved::Text(text))
            }
            Stub::Json(value) => return Some(Resolved::Json(value)),
            Stub::Bytes(bytes) => return Some(Resolved::Bytes(bytes)),
        };
    }
}

fn literal(text: String, base: Fulfillment) -> Fulfillment {
    Fulfillment {
        body: text.into_bytes(),
        ..base
    }
}

fn is_remote_url(text: &str) -> bool {
    text.parse::<http::Uri>()
        .ok()
        .and_then(|uri| {
            let scheme = uri.scheme_str()?.to_ascii_lowercase();
            Some(uri.host().is_some() && (scheme == "http" || scheme == "https"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::is_remote_url;

    #[test]
    fn test_is_remote_url() {
        assert!(is_remote_url("http://json.org/image.svg"));
        assert!(is_remote_url("HTTPS://example.com"));
        assert!(!is_remote_url("ftp://example.com/file"));
        assert!(!is_remote_url("/tmp/file.json"));
        assert!(!is_remote_url("foobar"));
        assert!(!is_remote_url("http is great"));
    }
}
