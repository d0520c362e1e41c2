use serde_json::Value;

/// Failure of a single request issued by a fetch hook.
///
/// Cancellation is not represented here: a superseded or torn-down request
/// resolves to `Ok(None)` and never reaches state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    Network(String),

    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Build the error for a non-success response. The server's `message`
    /// field wins when it is a non-empty string; anything else falls back to
    /// `HTTP <status>`.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));

        FetchError::Request { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable text for display.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the API layer flows (login, booking, ...).
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Request was superseded before it completed")]
    Superseded,

    #[error("Server response did not include an access token")]
    MissingToken,

    #[error("Invalid admin credentials")]
    NotAdmin,
}

impl ClientError {
    /// Text a view can show as-is.
    pub fn message(&self) -> String {
        match self {
            ClientError::Validation(e) => {
                let mut messages: Vec<String> = e
                    .field_errors()
                    .into_iter()
                    .map(|(field, errors)| {
                        let msgs: Vec<&str> = errors
                            .iter()
                            .filter_map(|err| err.message.as_ref().map(|m| m.as_ref()))
                            .collect();
                        let text = if msgs.is_empty() {
                            let codes: Vec<&str> =
                                errors.iter().map(|err| err.code.as_ref()).collect();
                            codes.join(", ")
                        } else {
                            msgs.join(", ")
                        };
                        // struct-level checks carry no field name
                        if field == "__all__" {
                            text
                        } else {
                            format!("{}: {}", field, text)
                        }
                    })
                    .collect();
                messages.sort();
                if messages.is_empty() {
                    // only nested errors, e.g. a single passenger entry
                    return "Please fill all passenger details".into();
                }
                messages.join("; ")
            }
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Fetch(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
