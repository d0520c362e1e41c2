//! Request controller with loading/error/data state.
//!
//! A [`FetchHook`] issues one request per trigger and guarantees that only the
//! most recently started request can touch its [`RequestState`]. Starting a
//! new request cancels the outstanding one; unmounting cancels it and freezes
//! the state for good.
//!
//! LIFECYCLE
//! =========
//! `Idle -> InFlight` on trigger, `InFlight -> Settled` when the current
//! request completes, `InFlight -> Cancelled` on teardown. A trigger while
//! in flight cancels the old request and starts a new generation; completions
//! from older generations are dropped without touching state.

pub mod transport;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{bearer_value, TokenSource};
use crate::error::FetchError;
use crate::ClientContext;

pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// What a hook requests. Each trigger works on its own snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub requires_auth: bool,
    pub auto_trigger: bool,
    pub dependency_key: Value,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: BTreeMap::new(),
            requires_auth: false,
            auto_trigger: true,
            dependency_key: Value::Null,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Only fire on explicit `trigger` calls.
    pub fn manual(mut self) -> Self {
        self.auto_trigger = false;
        self
    }

    pub fn depends_on(mut self, key: Value) -> Self {
        self.dependency_key = key;
        self
    }

    /// Everything except `auto_trigger` counts as a dependency.
    fn same_dependencies(&self, other: &RequestConfig) -> bool {
        self.url == other.url
            && self.method == other.method
            && self.body == other.body
            && self.headers == other.headers
            && self.requires_auth == other.requires_auth
            && self.dependency_key == other.dependency_key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InFlight,
    Cancelled,
    Settled,
}

struct Control {
    generation: u64,
    phase: Phase,
    cancel: Option<CancellationToken>,
    torn_down: bool,
}

/// A request whose generation has been claimed but not yet sent.
struct Ticket {
    generation: u64,
    cancel: CancellationToken,
    config: RequestConfig,
}

struct Inner<T> {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenSource>,
    config: Mutex<RequestConfig>,
    control: Mutex<Control>,
    state: watch::Sender<RequestState<T>>,
}

pub struct FetchHook<T> {
    inner: Arc<Inner<T>>,
}

impl<T> FetchHook<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a hook bound to the context's transport and session. When the
    /// config auto-triggers, the first request is spawned immediately, so
    /// this must run inside a tokio runtime.
    pub fn mount(ctx: &ClientContext, config: RequestConfig) -> Self {
        let tokens: Arc<dyn TokenSource> = ctx.session.clone();
        Self::with_parts(ctx.transport.clone(), tokens, config)
    }

    pub fn with_parts(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenSource>,
        config: RequestConfig,
    ) -> Self {
        let auto = config.auto_trigger;
        let (state, _) = watch::channel(RequestState::default());
        let hook = Self {
            inner: Arc::new(Inner {
                transport,
                tokens,
                config: Mutex::new(config),
                control: Mutex::new(Control {
                    generation: 0,
                    phase: Phase::Idle,
                    cancel: None,
                    torn_down: false,
                }),
                state,
            }),
        };
        if auto {
            hook.spawn_trigger(None);
        }
        hook
    }

    /// Start a request, cancelling whichever one is outstanding.
    ///
    /// `override_body` replaces the configured body for non-GET methods.
    /// Returns `Ok(None)` when this request was superseded or the hook was
    /// torn down before it completed; such requests leave state untouched.
    pub async fn trigger(&self, override_body: Option<Value>) -> Result<Option<T>, FetchError> {
        self.inner.clone().run(override_body).await
    }

    pub async fn refetch(&self) -> Result<Option<T>, FetchError> {
        self.trigger(None).await
    }

    /// Fire-and-forget variant of [`FetchHook::trigger`]. The request is
    /// claimed before this returns, so any trigger issued afterwards
    /// supersedes it.
    pub fn spawn_trigger(&self, override_body: Option<Value>) -> JoinHandle<Result<Option<T>, FetchError>> {
        let ticket = self.inner.begin();
        self.spawn_send(ticket, override_body)
    }

    fn spawn_send(
        &self,
        ticket: Option<Ticket>,
        override_body: Option<Value>,
    ) -> JoinHandle<Result<Option<T>, FetchError>> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            match ticket {
                Some(ticket) => inner.send(ticket, override_body).await,
                None => Ok(None),
            }
        })
    }

    pub fn state(&self) -> RequestState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.inner.state.subscribe()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<FetchError> {
        self.inner.state.borrow().error.clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock_control().phase
    }

    pub fn config(&self) -> RequestConfig {
        self.inner.lock_config().clone()
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.lock_control().torn_down
    }

    /// Wait until the current request (if any) has settled and return the
    /// resulting state. Returns immediately for an idle manual hook.
    pub async fn wait_settled(&self) -> RequestState<T> {
        let mut rx = self.subscribe();
        loop {
            {
                let control = self.inner.lock_control();
                let idle_manual = control.phase == Phase::Idle && !self.inner.lock_config().auto_trigger;
                if control.torn_down
                    || idle_manual
                    || matches!(control.phase, Phase::Settled | Phase::Cancelled)
                {
                    return self.state();
                }
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Overwrite `data` locally, e.g. after an optimistic update.
    pub fn set_data(&self, data: Option<T>) {
        let control = self.inner.lock_control();
        if control.torn_down {
            return;
        }
        self.inner.state.send_modify(|s| s.data = data);
    }

    /// Apply `update` to the config. Returns `true` when the change fired a
    /// new automatic request: the dependency snapshot changed (or auto
    /// triggering was just switched on) and the hook is auto-triggering.
    pub fn reconfigure(&self, update: impl FnOnce(&mut RequestConfig)) -> bool {
        let fire = {
            let mut config = self.inner.lock_config();
            let before = config.clone();
            update(&mut config);
            config.auto_trigger && (!before.auto_trigger || !config.same_dependencies(&before))
        };
        if !fire {
            return false;
        }
        let Some(ticket) = self.inner.begin() else {
            return false;
        };
        self.spawn_send(Some(ticket), None);
        true
    }

    pub fn set_dependency_key(&self, key: Value) -> bool {
        self.reconfigure(|config| config.dependency_key = key)
    }

    pub fn retarget(&self, method: Method, url: impl Into<String>) -> bool {
        let url = url.into();
        self.reconfigure(|config| {
            config.method = method;
            config.url = url;
        })
    }

    /// Cancel any outstanding request and stop all further state changes.
    pub fn unmount(&self) {
        self.inner.teardown();
    }
}

impl<T> Drop for FetchHook<T> {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl<T> Inner<T> {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_config(&self) -> MutexGuard<'_, RequestConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn teardown(&self) {
        let mut control = self.lock_control();
        if control.torn_down {
            return;
        }
        control.torn_down = true;
        if let Some(token) = control.cancel.take() {
            token.cancel();
        }
        if control.phase == Phase::InFlight {
            control.phase = Phase::Cancelled;
        }
        tracing::debug!(generation = control.generation, "Fetch hook torn down");
    }
}

impl<T> Inner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>, override_body: Option<Value>) -> Result<Option<T>, FetchError> {
        match self.begin() {
            Some(ticket) => self.send(ticket, override_body).await,
            None => Ok(None),
        }
    }

    /// Claim the next generation: cancel the outstanding request, mark the
    /// hook in flight and snapshot the config. `None` once torn down.
    fn begin(&self) -> Option<Ticket> {
        let mut control = self.lock_control();
        if control.torn_down {
            tracing::debug!("Ignoring trigger on a torn-down hook");
            return None;
        }
        if let Some(previous) = control.cancel.take() {
            if control.phase == Phase::InFlight {
                tracing::debug!(generation = control.generation, "Superseding in-flight request");
            }
            previous.cancel();
        }
        control.generation += 1;
        let cancel = CancellationToken::new();
        control.cancel = Some(cancel.clone());
        control.phase = Phase::InFlight;
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        Some(Ticket {
            generation: control.generation,
            cancel,
            config: self.lock_config().clone(),
        })
    }

    async fn send(self: Arc<Self>, ticket: Ticket, override_body: Option<Value>) -> Result<Option<T>, FetchError> {
        let Ticket {
            generation,
            cancel,
            config,
        } = ticket;

        let request = compose_request(&config, override_body, self.tokens.as_ref());
        let span = tracing::debug_span!(
            "fetch",
            method = %request.method,
            path = %request.path,
            request_id = %request.request_id,
            generation,
        );

        let outcome = async {
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = self.transport.send(request) => Some(result),
            }
        }
        .instrument(span.clone())
        .await;

        let Some(result) = outcome else {
            span.in_scope(|| tracing::debug!("Request cancelled"));
            return Ok(None);
        };
        let result = result.and_then(decode_response::<T>);

        let mut control = self.lock_control();
        if control.torn_down || control.generation != generation {
            span.in_scope(|| tracing::debug!("Discarding stale response"));
            return Ok(None);
        }
        control.phase = Phase::Settled;
        control.cancel = None;

        match result {
            Ok(data) => {
                self.state.send_modify(|s| {
                    s.data = Some(data.clone());
                    s.loading = false;
                });
                Ok(Some(data))
            }
            Err(e) => {
                span.in_scope(|| tracing::warn!(status = ?e.status(), "Request failed: {}", e));
                self.state.send_modify(|s| {
                    s.error = Some(e.clone());
                    s.loading = false;
                });
                Err(e)
            }
        }
    }
}

/// Build the wire request from a config snapshot.
///
/// Caller headers override the JSON content type. The bearer header is only
/// added when auth is required and a token exists; a missing token is left
/// for the server to reject.
pub fn compose_request(
    config: &RequestConfig,
    override_body: Option<Value>,
    tokens: &dyn TokenSource,
) -> ApiRequest {
    let request_id = Uuid::new_v4();

    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("X-Request-Id".to_string(), request_id.to_string());
    for (name, value) in &config.headers {
        headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
        headers.insert(name.clone(), value.clone());
    }

    if config.requires_auth {
        match tokens.token() {
            Some(token) => {
                headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case("Authorization"));
                headers.insert("Authorization".to_string(), bearer_value(&token));
            }
            None => tracing::debug!(path = %config.url, "No session token, sending without Authorization"),
        }
    }

    let body = match config.method {
        Method::Get => None,
        _ => override_body.or_else(|| config.body.clone()).filter(|b| !b.is_null()),
    };

    ApiRequest {
        request_id,
        method: config.method,
        path: config.url.clone(),
        headers,
        body,
    }
}

fn decode_response<T: DeserializeOwned>(resp: ApiResponse) -> Result<T, FetchError> {
    if !resp.is_success() {
        return Err(FetchError::from_response(resp.status, &resp.body));
    }
    serde_json::from_slice(&resp.body).map_err(|e| FetchError::Decode(e.to_string()))
}
