use crate::command::{Command, Transport};
use crate::fetch::{Fetcher, Filesystem};
use crate::mock::{Mock, MockRegistry};
use crate::request::{self, Body, Call, RequestPausedEvent};
use crate::response::StubBuilder;
use crate::Error;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// The per-event function returned by `create_interception_handler`.
pub type InterceptionHandler =
    Arc<dyn Fn(RequestPausedEvent) -> BoxFuture<'static, Result<(), Error>> + Send + Sync>;

///
/// Handles `Fetch.requestPaused` events against a registry of mocks.
///
/// For every event it records a call on each matching mock, then issues exactly one
/// command: the first matching mock (in registration order) with a pending abort fails the
/// request, otherwise the first one with a pending response fulfills it, otherwise the
/// request continues untouched.
///
/// ## Example
///
/// ```no_run
/// use fetchmock::{Interceptor, Mock, MockRegistry, RequestPausedEvent, Transport};
/// use std::sync::Arc;
///
/// async fn run(transport: Arc<dyn Transport>, event: RequestPausedEvent) -> Result<(), fetchmock::Error> {
///     let mocks = MockRegistry::new();
///     let mock = Mock::new("**/api/**");
///     mock.respond("hello");
///     mocks.add(&mock);
///
///     let interceptor = Interceptor::new(transport, mocks);
///     interceptor.handle(event).await
/// }
/// ```
///
#[derive(Clone)]
pub struct Interceptor {
    transport: Arc<dyn Transport>,
    mocks: MockRegistry,
    stubs: StubBuilder,
}

enum Action {
    Fail(Mock, u64, Command),
    Respond(Mock, u64, Command),
    Continue,
}

impl Interceptor {
    /// Creates an interceptor reading files from disk and fetching remote stubs over `http` or `https`.
    pub fn new(transport: Arc<dyn Transport>, mocks: MockRegistry) -> Self {
        Self {
            transport,
            mocks,
            stubs: StubBuilder::default(),
        }
    }

    /// Loads file stubs through `filesystem`.
    pub fn with_filesystem(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
        self.stubs.set_filesystem(filesystem);
        self
    }

    /// Loads remote stubs through `fetcher`.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.stubs.set_fetcher(fetcher);
        self
    }

    /// The registry this interceptor consults.
    pub fn mocks(&self) -> &MockRegistry {
        &self.mocks
    }

    /// Turns the interceptor into a shareable per-event function.
    pub fn into_handler(self) -> InterceptionHandler {
        let interceptor = Arc::new(self);
        Arc::new(move |event| {
            let interceptor = interceptor.clone();
            Box::pin(async move { interceptor.handle(event).await })
        })
    }

    ///
    /// Handles one paused request. Errors from the transport and from decoding a JSON
    /// response body are returned as they are; nothing is retried.
    ///
    pub async fn handle(&self, event: RequestPausedEvent) -> Result<(), Error> {
        let response_headers = event.response_headers();
        let matched: Vec<Mock> = {
            let snapshot = request::snapshot(&event, &response_headers);
            self.mocks
                .mocks()
                .into_iter()
                .filter(|mock| {
                    let matches = mock.matches(&snapshot);
                    if !matches {
                        log::trace!("{} skipped by mock {}", event.request.url, mock.id());
                    }
                    matches
                })
                .collect()
        };

        if matched.is_empty() {
            return self.continue_request(&event).await;
        }

        let body = if event.is_response_stage() {
            let raw = Command::get_response_body(self.transport.as_ref(), &event.request_id).await?;
            Some(Body::decode(&raw, response_headers.content_type())?)
        } else {
            None
        };

        let call = Call::new(&event, body);
        for mock in &matched {
            mock.record(call.clone());
        }
        log::debug!("{} {} matched {} mock(s)", call.method, call.url, matched.len());

        match self.resolve(&matched, &call, &event).await {
            Action::Fail(mock, id, cmd) => {
                cmd.send(self.transport.as_ref()).await?;
                mock.consume_abort(id);
            }
            Action::Respond(mock, id, cmd) => {
                cmd.send(self.transport.as_ref()).await?;
                mock.consume_respond(id);
            }
            Action::Continue => self.continue_request(&event).await?,
        }

        Ok(())
    }

    async fn resolve(&self, matched: &[Mock], call: &Call, event: &RequestPausedEvent) -> Action {
        let aborting = matched
            .iter()
            .find_map(|mock| mock.pending_abort().map(|entry| (mock, entry)));
        if let Some((mock, entry)) = aborting {
            let params = self.stubs.build_abort(&event.request_id, &entry.overwrite);
            return Action::Fail(mock.clone(), entry.id, Command::FailRequest(params));
        }

        let responding = matched
            .iter()
            .find_map(|mock| mock.pending_respond().map(|entry| (mock, entry)));
        if let Some((mock, entry)) = responding {
            let cmd = match self.stubs.build_response(&entry.overwrite, call, event).await {
                Some(fulfillment) => Command::FulfillRequest(fulfillment.into_params(&event.request_id)),
                None => Command::ContinueRequest {
                    request_id: event.request_id.clone(),
                },
            };
            return Action::Respond(mock.clone(), entry.id, cmd);
        }

        Action::Continue
    }

    async fn continue_request(&self, event: &RequestPausedEvent) -> Result<(), Error> {
        let cmd = Command::ContinueRequest {
            request_id: event.request_id.clone(),
        };
        cmd.send(self.transport.as_ref()).await?;
        Ok(())
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("mocks", &self.mocks)
            .finish()
    }
}

///
/// Binds a transport and a registry into a function handling `Fetch.requestPaused` events.
/// The registry is read when each event arrives, not when the handler is created.
///
/// ## Example
///
/// ```no_run
/// use fetchmock::{create_interception_handler, MockRegistry, RequestPausedEvent, Transport};
/// use std::sync::Arc;
///
/// async fn on_event(transport: Arc<dyn Transport>, mocks: MockRegistry, event: RequestPausedEvent) {
///     let handler = create_interception_handler(transport, mocks);
///     handler(event).await.unwrap();
/// }
/// ```
///
pub fn create_interception_handler(
    transport: Arc<dyn Transport>,
    mocks: MockRegistry,
) -> InterceptionHandler {
    Interceptor::new(transport, mocks).into_handler()
}
