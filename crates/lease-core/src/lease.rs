//! Lease data model.

use serde::{Deserialize, Serialize};

/// Opaque token identifying the holder of a lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session ID from a caller-supplied token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Value persisted in the store under the page name.
///
/// The remaining lifetime is never stored; it comes from the key's TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredLease {
    pub page_name: String,
    #[serde(default)]
    pub session_id: SessionId,
}

impl StoredLease {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_expiry(self, expire_at: i64) -> Lease {
        Lease {
            page_name: self.page_name,
            session_id: self.session_id,
            expire_at,
        }
    }
}

/// An exclusive, time-bounded claim on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    /// The protected resource, also the store key.
    pub page_name: String,
    /// Current holder.
    pub session_id: SessionId,
    /// Remaining lifetime in seconds at the time of the read, `-1` if the
    /// key carries no expiry.
    pub expire_at: i64,
}

impl Lease {
    /// Whether `session` is the holder of this lease.
    pub fn is_held_by(&self, session: &SessionId) -> bool {
        &self.session_id == session
    }
}
