use crate::command::ErrorReason;
use crate::matcher::{self, Filter, RequestSnapshot};
use crate::overwrite::{AbortOverwrite, Entry, OverwriteQueue, RespondOverwrite};
use crate::request::Call;
use crate::response::{RespondOptions, Stub};
use crate::url_pattern::UrlPattern;
use crate::Error;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
pub(crate) struct InnerMock {
    pub(crate) id: String,
    pub(crate) pattern: UrlPattern,
    pub(crate) filter: Filter,
    pub(crate) calls: Vec<Call>,
    pub(crate) respond_overwrites: OverwriteQueue<RespondOverwrite>,
    pub(crate) abort_overwrites: OverwriteQueue<AbortOverwrite>,
}

impl fmt::Display for InnerMock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\r\n{} ({})\r\n", self.pattern, self.id)?;

        if let Some(ref method) = self.filter.method {
            write!(f, "method: {}\r\n", method)?;
        }
        if let Some(ref headers) = self.filter.headers {
            write!(f, "headers: {:?}\r\n", headers)?;
        }
        if let Some(ref status) = self.filter.status_code {
            write!(f, "status: {:?}\r\n", status)?;
        }
        if let Some(ref post_data) = self.filter.post_data {
            write!(f, "post data: {}\r\n", post_data)?;
        }

        Ok(())
    }
}

///
/// Intercepts requests whose URL matches a pattern, records them, and optionally answers or
/// fails them. Should be initialized via `Mock::new()` and registered in a `MockRegistry`.
///
/// `Mock` is a handle: clones share the same calls and overwrites, so the copy kept by the
/// test sees everything the interceptor records through the registered one.
///
#[derive(Clone)]
pub struct Mock {
    inner: Arc<RwLock<InnerMock>>,
}

impl Mock {
    ///
    /// Creates a mock for every request whose URL matches `pattern`. Strings are treated as
    /// globs, see `UrlPattern`.
    ///
    /// ## Example
    ///
    /// ```
    /// use fetchmock::Mock;
    ///
    /// let mock = Mock::new("**/api/users/*");
    /// assert_eq!(0, mock.calls().len());
    /// ```
    ///
    pub fn new<P: Into<UrlPattern>>(pattern: P) -> Mock {
        let inner = InnerMock {
            id: rand::rng()
                .sample_iter(&Alphanumeric)
                .map(char::from)
                .take(24)
                .collect(),
            pattern: pattern.into(),
            filter: Filter::default(),
            calls: Vec::new(),
            respond_overwrites: OverwriteQueue::new(),
            abort_overwrites: OverwriteQueue::new(),
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    ///
    /// Narrows the mock down to requests passing `filter`.
    ///
    /// ## Example
    ///
    /// ```
    /// use fetchmock::{Filter, Mock};
    ///
    /// let mock = Mock::new("**/foobar/**")
    ///   .with_filter(Filter::new().method("put").header("content-type", "text/xml"));
    /// ```
    ///
    pub fn with_filter(self, filter: Filter) -> Self {
        self.write().filter = filter;
        self
    }

    ///
    /// Answers every matching request with `stub` until `restore` is called.
    ///
    /// Overwrites queue up: a sticky overwrite is never consumed, so anything queued after it
    /// is never reached. Queue one-shot overwrites first.
    ///
    /// ## Example
    ///
    /// ```
    /// use fetchmock::Mock;
    /// use serde_json::json;
    ///
    /// let mock = Mock::new("**/users");
    /// mock.respond_once(json!({"users": []}))
    ///   .respond(json!({"users": ["alice"]}));
    ///
    /// assert_eq!(2, mock.respond_overwrites());
    /// ```
    ///
    pub fn respond<S: Into<Stub>>(&self, stub: S) -> &Self {
        self.respond_with(stub, RespondOptions::default())
    }

    /// Same as `Mock::respond`, with header and status changes.
    pub fn respond_with<S: Into<Stub>>(&self, stub: S, options: RespondOptions) -> &Self {
        self.push_respond(stub.into(), options, true)
    }

    /// Answers the next matching request with `stub`.
    pub fn respond_once<S: Into<Stub>>(&self, stub: S) -> &Self {
        self.respond_once_with(stub, RespondOptions::default())
    }

    /// Same as `Mock::respond_once`, with header and status changes.
    pub fn respond_once_with<S: Into<Stub>>(&self, stub: S, options: RespondOptions) -> &Self {
        self.push_respond(stub.into(), options, false)
    }

    ///
    /// Fails every matching request with `reason` until `restore` is called. Aborts take
    /// precedence over responses.
    ///
    /// Fails without touching the mock when `reason` is empty or not a known `ErrorReason`.
    ///
    /// ## Example
    ///
    /// ```
    /// use fetchmock::Mock;
    ///
    /// let mock = Mock::new("**/ads/**");
    /// assert!(mock.abort("BlockedByClient").is_ok());
    /// assert!(mock.abort("foobar").is_err());
    /// ```
    ///
    pub fn abort(&self, reason: &str) -> Result<&Self, Error> {
        let error_reason = reason.parse::<ErrorReason>()?;
        Ok(self.push_abort(error_reason, true))
    }

    /// Fails the next matching request with `reason`.
    pub fn abort_once(&self, reason: &str) -> Result<&Self, Error> {
        let error_reason = reason.parse::<ErrorReason>()?;
        Ok(self.push_abort(error_reason, false))
    }

    /// Forgets the recorded calls. Overwrites stay.
    pub fn clear(&self) {
        self.write().calls.clear();
    }

    /// Drops every pending overwrite, the mock goes back to recording only. Calls stay.
    pub fn restore(&self) {
        let mut inner = self.write();
        inner.respond_overwrites.clear();
        inner.abort_overwrites.clear();
    }

    /// The requests recorded so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.read().calls.clone()
    }

    /// Number of queued respond overwrites.
    pub fn respond_overwrites(&self) -> usize {
        self.read().respond_overwrites.len()
    }

    /// Number of queued abort overwrites.
    pub fn abort_overwrites(&self) -> usize {
        self.read().abort_overwrites.len()
    }

    /// The random identifier of this mock.
    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    /// Whether an intercepted request falls under this mock.
    pub fn matches(&self, snapshot: &RequestSnapshot<'_>) -> bool {
        let inner = self.read();
        matcher::matches(&inner.pattern, &inner.filter, snapshot)
    }

    pub(crate) fn record(&self, call: Call) {
        self.write().calls.push(call);
    }

    pub(crate) fn pending_abort(&self) -> Option<Entry<AbortOverwrite>> {
        self.read().abort_overwrites.front().cloned()
    }

    pub(crate) fn pending_respond(&self) -> Option<Entry<RespondOverwrite>> {
        self.read().respond_overwrites.front().cloned()
    }

    pub(crate) fn consume_abort(&self, id: u64) {
        self.write().abort_overwrites.consume_front_if_one_shot(id);
    }

    pub(crate) fn consume_respond(&self, id: u64) {
        self.write().respond_overwrites.consume_front_if_one_shot(id);
    }

    pub(crate) fn same_as(&self, other: &Mock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn push_respond(&self, stub: Stub, options: RespondOptions, sticky: bool) -> &Self {
        self.write()
            .respond_overwrites
            .push(RespondOverwrite { stub, options }, sticky);
        self
    }

    fn push_abort(&self, error_reason: ErrorReason, sticky: bool) -> &Self {
        self.write()
            .abort_overwrites
            .push(AbortOverwrite { error_reason }, sticky);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, InnerMock> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InnerMock> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for Mock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.read())
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Mock").field("inner", &*self.read()).finish()
    }
}

impl PartialEq for Mock {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || self.read().id == other.read().id
    }
}

///
/// The mocks an interceptor consults. Owned by the caller and shared with the interceptor;
/// membership is read for every intercepted request, so mocks added later are honored.
///
/// Mocks are matched in registration order.
///
#[derive(Clone, Debug, Default)]
pub struct MockRegistry {
    mocks: Arc<RwLock<Vec<Mock>>>,
}

impl MockRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mock. The registry keeps a handle, the caller keeps theirs.
    pub fn add(&self, mock: &Mock) -> &Self {
        self.mocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mock.clone());
        self
    }

    /// Unregisters a mock. Returns whether it was registered.
    pub fn remove(&self, mock: &Mock) -> bool {
        let mut mocks = self.mocks.write().unwrap_or_else(PoisonError::into_inner);
        match mocks.iter().position(|registered| registered.same_as(mock)) {
            Some(pos) => {
                mocks.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Unregisters every mock.
    pub fn reset(&self) {
        self.mocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Restores every registered mock.
    pub fn restore_all(&self) {
        for mock in self.mocks() {
            mock.restore();
        }
    }

    /// Number of registered mocks.
    pub fn len(&self) -> usize {
        self.mocks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no mock is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the registered mocks, in registration order.
    pub fn mocks(&self) -> Vec<Mock> {
        self.mocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl From<Vec<Mock>> for MockRegistry {
    fn from(mocks: Vec<Mock>) -> Self {
        Self {
            mocks: Arc::new(RwLock::new(mocks)),
        }
    }
}
