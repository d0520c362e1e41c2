pub mod storage;

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub use storage::{FileStorage, MemoryStorage, Storage};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

/// Storage keys for one application's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKeys {
    pub token: &'static str,
    pub user: &'static str,
}

impl StorageKeys {
    pub const CUSTOMER: StorageKeys = StorageKeys {
        token: "token",
        user: "user",
    };
    pub const ADMIN: StorageKeys = StorageKeys {
        token: "admin_token",
        user: "admin_user",
    };
}

/// Read-only view of the bearer credential. Fetch hooks only see this.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Process-wide owner of the bearer token and user profile.
///
/// `init` hydrates from durable storage; `set_session` and `teardown` are the
/// only writers and always hit storage before memory.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    keys: StorageKeys,
    session: RwLock<AuthSession>,
}

impl SessionStore {
    pub fn init(storage: Arc<dyn Storage>, keys: StorageKeys) -> Self {
        let token = storage.get(keys.token).filter(|t| !t.is_empty());
        let user = storage
            .get(keys.user)
            .and_then(|raw| match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable stored user '{}': {}", keys.user, e);
                    None
                }
            });

        if token.is_some() {
            tracing::debug!(user = ?user.as_ref().map(|u| &u.email), "Hydrated stored session");
        }

        Self {
            storage,
            keys,
            session: RwLock::new(AuthSession { token, user }),
        }
    }

    /// A session that lives only in memory.
    pub fn ephemeral(keys: StorageKeys) -> Self {
        Self::init(Arc::new(MemoryStorage::new()), keys)
    }

    pub fn keys(&self) -> StorageKeys {
        self.keys
    }

    pub fn snapshot(&self) -> AuthSession {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// The admin dashboard only accepts sessions whose user is an admin.
    pub fn is_admin(&self) -> bool {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        session.token.is_some() && session.user.as_ref().is_some_and(|u| u.role.is_admin())
    }

    pub fn set_session(&self, token: &str, user: UserProfile) -> Result<(), SessionError> {
        let raw_user = serde_json::to_string(&user)?;
        self.storage
            .set_all(&[(self.keys.token, token), (self.keys.user, raw_user.as_str())])?;

        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(email = %user.email, role = ?user.role, "Session started");
        *session = AuthSession {
            token: Some(token.to_string()),
            user: Some(user),
        };
        Ok(())
    }

    pub fn clear_session(&self) -> Result<(), SessionError> {
        self.storage.remove_all(&[self.keys.token, self.keys.user])?;

        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if session.token.is_some() {
            tracing::info!("Session cleared");
        }
        *session = AuthSession::default();
        Ok(())
    }

    /// Logout lifecycle hook.
    pub fn teardown(&self) -> Result<(), SessionError> {
        self.clear_session()
    }
}

impl TokenSource for SessionStore {
    fn token(&self) -> Option<String> {
        SessionStore::token(self)
    }
}

pub fn bearer_value(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Inverse of [`bearer_value`]; used by stub servers in tests and by callers
/// that need to echo a header back.
pub fn extract_bearer_token(value: &str) -> Option<&str> {
    value.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}
