#![warn(missing_docs)]

//!
//! Fetchmock intercepts browser network requests over the devtools `Fetch` domain and lets you
//! record, stub, or fail them from your tests.
//!
//! It does not own the browser connection. You hand it a `Transport` able to send protocol
//! commands and feed every `Fetch.requestPaused` event to the handler it gives you back.
//!
//! # Getting Started
//!
//! Implement `Transport` on top of your devtools client:
//!
//! ## Example
//!
//! ```
//! use async_trait::async_trait;
//! use fetchmock::{BoxError, Transport};
//! use serde_json::Value;
//!
//! struct Devtools;
//!
//! #[async_trait]
//! impl Transport for Devtools {
//!     async fn send(&self, method: &str, params: Value) -> Result<Value, BoxError> {
//!         // forward `method` and `params` to the browser and return its result
//!         Ok(Value::Null)
//!     }
//! }
//! ```
//!
//! Then register mocks and route the paused requests through the handler:
//!
//! ## Example
//!
//! ```no_run
//! use fetchmock::{create_interception_handler, Mock, MockRegistry, RequestPausedEvent, Transport};
//! use std::sync::Arc;
//!
//! async fn intercept(transport: Arc<dyn Transport>, events: Vec<RequestPausedEvent>) {
//!     let mocks = MockRegistry::new();
//!     let users = Mock::new("**/api/users");
//!     users.respond(serde_json::json!([{"name": "alice"}]));
//!     mocks.add(&users);
//!
//!     let handler = create_interception_handler(transport, mocks);
//!     for event in events {
//!         handler(event).await.unwrap();
//!     }
//!
//!     // every request to /api/users was answered with the JSON above
//!     println!("{} calls", users.calls().len());
//! }
//! ```
//!
//! Requests no mock matches are continued untouched, and so are matched requests whose mock
//! has nothing queued.
//!
//! # Matching
//!
//! Mocks match on the full request URL. Strings are globs: `*` stays within a path segment,
//! `**` crosses segments, `?` matches one character and `{a,b}` matches either alternative.
//! Regular expressions work too.
//!
//! ## Example
//!
//! ```
//! use fetchmock::{Mock, UrlPattern};
//! use regex::Regex;
//!
//! Mock::new("https://example.com/*.js");
//! Mock::new(Regex::new(r"/items/\d+$").unwrap());
//! Mock::new(UrlPattern::regex(r"\.(png|jpg)$").unwrap());
//! ```
//!
//! A `Filter` narrows the match further down by method, response headers, status code or
//! post data. Header names are case-insensitive.
//!
//! ## Example
//!
//! ```
//! use fetchmock::{Filter, Matcher, Mock};
//! use serde_json::json;
//!
//! let mock = Mock::new("**/api/**").with_filter(
//!     Filter::new()
//!         .method("post")
//!         .header("content-type", Matcher::regex("json").unwrap())
//!         .status_code(200)
//!         .post_data(Matcher::PartialJson(json!({"user": "alice"}))),
//! );
//! ```
//!
//! # Stubbing
//!
//! A stub can be literal text, a path to a file, an `http(s)` URL, a JSON value, or a function of
//! the recorded call. Responses queue up: `respond_once` answers one request, `respond` keeps
//! answering.
//!
//! ## Example
//!
//! ```
//! use fetchmock::{Mock, RespondOptions, Stub};
//! use serde_json::json;
//!
//! let mock = Mock::new("**/api/**");
//! mock.respond_once("tests/files/user.json")
//!     .respond_with(json!({"ok": true}), RespondOptions::new().with_status(201));
//!
//! let echo = Mock::new("**/echo");
//! echo.respond(Stub::from_fn(|call| call.post_data.clone().map(Stub::from)));
//! ```
//!
//! # Failing requests
//!
//! Aborts take precedence over responses. The reason must be one of the protocol's
//! `ErrorReason` names.
//!
//! ## Example
//!
//! ```
//! use fetchmock::Mock;
//!
//! let mock = Mock::new("**/tracking/**");
//! mock.abort("BlockedByClient").unwrap();
//! assert!(mock.abort("Nope").is_err());
//! ```
//!
//! # Cleaning up
//!
//! `Mock::clear` forgets the recorded calls, `Mock::restore` drops every queued overwrite and
//! `MockRegistry::remove` stops the mock from matching at all.
//!
//! # Logging
//!
//! Fetchmock logs through the `log` crate: every command sent at `debug`, skipped mocks at
//! `trace`, and stubs falling back to literal text at `warn`.
//!

pub use command::{Command, ErrorReason, FailRequestParams, FulfillRequestParams, Transport};
pub use error::{BoxError, Error, ErrorKind};
#[cfg(feature = "remote")]
pub use fetch::HyperFetcher;
pub use fetch::{Fetcher, Filesystem, LocalFilesystem, NoFetcher, RemoteResponse};
pub use handler::{create_interception_handler, InterceptionHandler, Interceptor};
pub use headers::{HeaderEntry, Headers};
pub use matcher::{Filter, HeadersMatcher, Matcher, RequestSnapshot, StatusMatcher};
pub use mock::{Mock, MockRegistry};
pub use overwrite::{AbortOverwrite, Entry, OverwriteQueue, RespondOverwrite};
pub use request::{Body, Call, InterceptedRequest, RequestPausedEvent};
pub use response::{Fulfillment, RespondOptions, Status, Stub, StubBuilder};
pub use url_pattern::UrlPattern;

mod command;
mod error;
mod fetch;
mod handler;
mod headers;
mod matcher;
mod mock;
mod overwrite;
mod request;
mod response;
mod url_pattern;
