pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;

use std::sync::Arc;

use auth::{FileStorage, SessionStore};
use config::Config;
use error::ClientError;
use fetch::{HttpTransport, Transport};

/// Shared client state handed to every hook: the transport requests go
/// through and the session store tokens are read from.
#[derive(Clone)]
pub struct ClientContext {
    pub transport: Arc<dyn Transport>,
    pub session: Arc<SessionStore>,
}

impl ClientContext {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Wire the HTTP transport and the file-backed session described by `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(cfg.api_base_url.clone(), cfg.request_timeout)?;
        let storage = FileStorage::open(&cfg.session_file)?;
        let session = SessionStore::init(Arc::new(storage), cfg.session_keys);

        Ok(Self {
            transport: Arc::new(transport),
            session: Arc::new(session),
        })
    }
}
