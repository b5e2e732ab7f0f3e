use crate::error::BoxError;
use crate::headers::Headers;
use crate::request::ResponseBody;
use crate::{Error, ErrorKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

///
/// Sends protocol commands to the browser. Implemented by whatever carries the devtools
/// connection; the interceptor only ever calls `send`.
///
/// ## Example
///
/// ```
/// use async_trait::async_trait;
/// use fetchmock::{BoxError, Transport};
/// use serde_json::Value;
///
/// struct Noop;
///
/// #[async_trait]
/// impl Transport for Noop {
///     async fn send(&self, _method: &str, _params: Value) -> Result<Value, BoxError> {
///         Ok(Value::Null)
///     }
/// }
/// ```
///
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `method` with `params` and resolves to the command result.
    async fn send(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, BoxError>;
}

///
/// The network error reported for a failed request.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorReason {
    #[allow(missing_docs)]
    Failed,
    #[allow(missing_docs)]
    Aborted,
    #[allow(missing_docs)]
    TimedOut,
    #[allow(missing_docs)]
    AccessDenied,
    #[allow(missing_docs)]
    ConnectionClosed,
    #[allow(missing_docs)]
    ConnectionReset,
    #[allow(missing_docs)]
    ConnectionRefused,
    #[allow(missing_docs)]
    ConnectionAborted,
    #[allow(missing_docs)]
    ConnectionFailed,
    #[allow(missing_docs)]
    NameNotResolved,
    #[allow(missing_docs)]
    InternetDisconnected,
    #[allow(missing_docs)]
    AddressUnreachable,
    #[allow(missing_docs)]
    BlockedByClient,
    #[allow(missing_docs)]
    BlockedByResponse,
}

impl ErrorReason {
    /// Every reason the protocol accepts.
    pub const ALL: [ErrorReason; 14] = [
        ErrorReason::Failed,
        ErrorReason::Aborted,
        ErrorReason::TimedOut,
        ErrorReason::AccessDenied,
        ErrorReason::ConnectionClosed,
        ErrorReason::ConnectionReset,
        ErrorReason::ConnectionRefused,
        ErrorReason::ConnectionAborted,
        ErrorReason::ConnectionFailed,
        ErrorReason::NameNotResolved,
        ErrorReason::InternetDisconnected,
        ErrorReason::AddressUnreachable,
        ErrorReason::BlockedByClient,
        ErrorReason::BlockedByResponse,
    ];

    /// The protocol name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::Failed => "Failed",
            ErrorReason::Aborted => "Aborted",
            ErrorReason::TimedOut => "TimedOut",
            ErrorReason::AccessDenied => "AccessDenied",
            ErrorReason::ConnectionClosed => "ConnectionClosed",
            ErrorReason::ConnectionReset => "ConnectionReset",
            ErrorReason::ConnectionRefused => "ConnectionRefused",
            ErrorReason::ConnectionAborted => "ConnectionAborted",
            ErrorReason::ConnectionFailed => "ConnectionFailed",
            ErrorReason::NameNotResolved => "NameNotResolved",
            ErrorReason::InternetDisconnected => "InternetDisconnected",
            ErrorReason::AddressUnreachable => "AddressUnreachable",
            ErrorReason::BlockedByClient => "BlockedByClient",
            ErrorReason::BlockedByResponse => "BlockedByResponse",
        }
    }
}

impl FromStr for ErrorReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::new_with_context(
                ErrorKind::InvalidErrorReason,
                "no reason given",
            ));
        }

        ErrorReason::ALL
            .iter()
            .find(|reason| reason.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let expected: Vec<&str> = ErrorReason::ALL.iter().map(ErrorReason::as_str).collect();
                Error::new_with_context(
                    ErrorKind::InvalidErrorReason,
                    format!("{}, expected one of {}", s, expected.join(", ")),
                )
            })
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// Parameters of `Fetch.fulfillRequest`.
///
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillRequestParams {
    /// The paused request
    pub request_id: String,
    /// The status code sent to the page
    pub response_code: u16,
    /// The headers sent to the page
    pub response_headers: Headers,
    /// The base64 encoded body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

///
/// Parameters of `Fetch.failRequest`.
///
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequestParams {
    /// The paused request
    pub request_id: String,
    /// The network error reported to the page
    pub error_reason: ErrorReason,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestIdParams<'a> {
    request_id: &'a str,
}

///
/// The protocol commands the interceptor issues.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Retrieves the body of a paused response
    GetResponseBody {
        /// The paused request
        request_id: String,
    },
    /// Answers a paused request with a stub
    FulfillRequest(FulfillRequestParams),
    /// Fails a paused request
    FailRequest(FailRequestParams),
    /// Lets a paused request through untouched
    ContinueRequest {
        /// The paused request
        request_id: String,
    },
}

impl Command {
    /// The protocol method name.
    pub fn method(&self) -> &'static str {
        match self {
            Command::GetResponseBody { .. } => "Fetch.getResponseBody",
            Command::FulfillRequest(_) => "Fetch.fulfillRequest",
            Command::FailRequest(_) => "Fetch.failRequest",
            Command::ContinueRequest { .. } => "Fetch.continueRequest",
        }
    }

    /// The command parameters, serialized the way the protocol expects them.
    pub fn params(&self) -> Result<serde_json::Value, Error> {
        let params = match self {
            Command::GetResponseBody { request_id } | Command::ContinueRequest { request_id } => {
                serde_json::to_value(RequestIdParams { request_id })
            }
            Command::FulfillRequest(params) => serde_json::to_value(params),
            Command::FailRequest(params) => serde_json::to_value(params),
        };

        params.map_err(|err| Error::new_with_context(ErrorKind::InvalidResponse, err))
    }

    pub(crate) async fn send(&self, transport: &dyn Transport) -> Result<serde_json::Value, Error> {
        let method = self.method();
        log::debug!("-> {}", method);

        transport
            .send(method, self.params()?)
            .await
            .map_err(|err| Error::new_with_source(ErrorKind::Transport, method, err))
    }

    pub(crate) async fn get_response_body(
        transport: &dyn Transport,
        request_id: &str,
    ) -> Result<Vec<u8>, Error> {
        let cmd = Command::GetResponseBody {
            request_id: request_id.to_string(),
        };

        let result = cmd.send(transport).await?;
        let body: ResponseBody = serde_json::from_value(result)
            .map_err(|err| Error::new_with_context(ErrorKind::InvalidResponse, err))?;

        body.into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetResponseBody { request_id } | Command::ContinueRequest { request_id } => {
                write!(f, "{} ({})", self.method(), request_id)
            }
            Command::FulfillRequest(params) => write!(
                f,
                "{} ({}, {})",
                self.method(),
                params.request_id,
                params.response_code
            ),
            Command::FailRequest(params) => write!(
                f,
                "{} ({}, {})",
                self.method(),
                params.request_id,
                params.error_reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_reason_from_str() {
        assert_eq!(
            ErrorReason::NameNotResolved,
            "NameNotResolved".parse::<ErrorReason>().unwrap()
        );
        assert_eq!(
            ErrorKind::InvalidErrorReason,
            "foobar".parse::<ErrorReason>().unwrap_err().kind
        );
        assert_eq!(
            ErrorKind::InvalidErrorReason,
            "".parse::<ErrorReason>().unwrap_err().kind
        );
    }

    #[test]
    fn test_fail_request_params() {
        let cmd = Command::FailRequest(FailRequestParams {
            request_id: "123".to_string(),
            error_reason: ErrorReason::ConnectionFailed,
        });

        assert_eq!("Fetch.failRequest", cmd.method());
        assert_eq!(
            json!({"requestId": "123", "errorReason": "ConnectionFailed"}),
            cmd.params().unwrap()
        );
    }

    #[test]
    fn test_fulfill_request_params() {
        let cmd = Command::FulfillRequest(FulfillRequestParams {
            request_id: "123".to_string(),
            response_code: 200,
            response_headers: vec![("Content-Type", "text/plain")].into_iter().collect(),
            body: Some("Zm9vYmFy".to_string()),
        });

        assert_eq!(
            json!({
                "requestId": "123",
                "responseCode": 200,
                "responseHeaders": [{"name": "Content-Type", "value": "text/plain"}],
                "body": "Zm9vYmFy"
            }),
            cmd.params().unwrap()
        );
    }

    #[test]
    fn test_continue_request_params() {
        let cmd = Command::ContinueRequest {
            request_id: "123".to_string(),
        };

        assert_eq!(json!({"requestId": "123"}), cmd.params().unwrap());
    }
}
