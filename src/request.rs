use crate::headers::{HeaderEntry, Headers};
use crate::matcher::RequestSnapshot;
use crate::{Error, ErrorKind};
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

///
/// The `Fetch.requestPaused` event, as delivered by the transport.
///
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPausedEvent {
    /// Identifies the paused request in every follow-up command
    pub request_id: String,
    /// The request as the browser was about to send it
    pub request: InterceptedRequest,
    /// Present once the response has been received
    #[serde(default)]
    pub response_status_code: Option<u16>,
    /// Present once the response has been received
    #[serde(default)]
    pub response_headers: Option<Vec<HeaderEntry>>,
}

impl RequestPausedEvent {
    /// Whether the request was paused after the response arrived.
    pub fn is_response_stage(&self) -> bool {
        self.response_headers.is_some() || self.response_status_code.is_some()
    }

    pub(crate) fn response_headers(&self) -> Headers {
        self.response_headers.clone().unwrap_or_default().into()
    }
}

///
/// The request part of a `Fetch.requestPaused` event.
///
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    /// The full URL, fragment excluded
    pub url: String,
    /// The HTTP method
    #[serde(default)]
    pub method: String,
    /// The request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// The raw request body
    #[serde(default)]
    pub post_data: Option<String>,
}

///
/// A decoded response body.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// The content type mentioned JSON
    Json(serde_json::Value),
    /// Anything else that is valid UTF-8
    Text(String),
    /// Anything else, kept as received
    Bytes(Vec<u8>),
}

impl Body {
    ///
    /// Decodes a raw body according to the response content type. JSON content types are
    /// parsed. Other bodies are kept as text when they are valid UTF-8 and as bytes otherwise.
    ///
    pub(crate) fn decode(raw: &[u8], content_type: Option<&str>) -> Result<Self, Error> {
        if content_type.map_or(false, |ct| ct.to_lowercase().contains("json")) {
            return serde_json::from_slice(raw)
                .map(Body::Json)
                .map_err(|err| Error::new_with_context(ErrorKind::BodyDecode, err));
        }

        match String::from_utf8(raw.to_vec()) {
            Ok(text) => Ok(Body::Text(text)),
            Err(err) => Ok(Body::Bytes(err.into_bytes())),
        }
    }

    /// The JSON value, if the body was parsed as JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(ref value) => Some(value),
            _ => None,
        }
    }

    /// The text, if the body was decoded as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(ref text) => Some(text),
            _ => None,
        }
    }

    /// The raw bytes of a text or binary body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Text(ref text) => Some(text.as_bytes()),
            Body::Bytes(ref bytes) => Some(bytes),
            Body::Json(_) => None,
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Json(ref value) => write!(f, "{}", value),
            Body::Text(ref text) => f.write_str(text),
            Body::Bytes(ref bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

///
/// The body returned by `Fetch.getResponseBody`.
///
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponseBody {
    pub body: String,
    #[serde(default = "default_base64_encoded")]
    pub base64_encoded: bool,
}

fn default_base64_encoded() -> bool {
    true
}

impl ResponseBody {
    pub(crate) fn into_bytes(self) -> Result<Vec<u8>, Error> {
        if self.base64_encoded {
            base64::engine::general_purpose::STANDARD
                .decode(self.body.as_bytes())
                .map_err(|err| Error::new_with_context(ErrorKind::BodyDecode, err))
        } else {
            Ok(self.body.into_bytes())
        }
    }
}

///
/// A request recorded by a mock.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// The full request URL
    pub url: String,
    /// The request method
    pub method: String,
    /// The request headers
    pub request_headers: Headers,
    /// The raw request body
    pub post_data: Option<String>,
    /// The response headers, empty when the request was intercepted before the response
    pub response_headers: Headers,
    /// The response status code, when known
    pub status_code: Option<u16>,
    /// The decoded response body, `None` when the request was intercepted before the response
    pub body: Option<Body>,
}

impl Call {
    pub(crate) fn new(event: &RequestPausedEvent, body: Option<Body>) -> Self {
        // the protocol delivers request headers as an object, keep a stable order
        let mut request_headers: Vec<HeaderEntry> = event
            .request
            .headers
            .iter()
            .map(|(name, value)| HeaderEntry::new(name.clone(), value.clone()))
            .collect();
        request_headers.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            url: event.request.url.clone(),
            method: event.request.method.clone(),
            request_headers: request_headers.into(),
            post_data: event.request.post_data.clone(),
            response_headers: event.response_headers(),
            status_code: event.response_status_code,
            body,
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\r\n", self.method, self.url)?;
        if let Some(status) = self.status_code {
            write!(f, "-> {}\r\n", status)?;
        }
        write!(f, "{}", self.response_headers)
    }
}

///
/// Borrows the parts of an event the matcher looks at.
///
pub(crate) fn snapshot<'a>(
    event: &'a RequestPausedEvent,
    response_headers: &'a Headers,
) -> RequestSnapshot<'a> {
    RequestSnapshot {
        url: &event.request.url,
        method: &event.request.method,
        response_headers,
        status_code: event.response_status_code,
        post_data: event.request.post_data.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    use super::Body;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_decode_json_body() {
        let body = Body::decode(br#"{"foo":"bar"}"#, Some("application/json; charset=utf-8")).unwrap();
        assert_eq!(Body::Json(json!({"foo": "bar"})), body);

        let err = Body::decode(b"{", Some("application/json")).unwrap_err();
        assert_eq!(ErrorKind::BodyDecode, err.kind);
    }

    #[test]
    fn test_decode_binary_body() {
        let raw = vec![0x89, 0x50, 0xFF, 0x00];
        let body = Body::decode(&raw, Some("image/png")).unwrap();

        assert_eq!(Body::Bytes(raw.clone()), body);
        assert_eq!(Some(raw.as_slice()), body.as_bytes());
        assert_eq!(None, body.as_text());
    }

    #[test]
    fn test_decode_text_body() {
        let body = Body::decode(b"hello", None).unwrap();
        assert_eq!(Some("hello"), body.as_text());
        assert_eq!(Some(&b"hello"[..]), body.as_bytes());
    }
}
