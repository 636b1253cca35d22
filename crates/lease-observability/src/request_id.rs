//! Request identifiers for log correlation.

use rand::Rng;

/// Unique request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new random request ID (32 hex chars).
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::thread_rng().gen();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Reuse an ID supplied by the caller (e.g. an `x-request-id` header),
    /// or generate one if it is empty or unreasonably long.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(id) if !id.is_empty() && id.len() <= 128 => Self(id.to_string()),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_format() {
        let id = RequestId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, RequestId::generate());
    }

    #[test]
    fn test_from_header() {
        assert_eq!(RequestId::from_header(Some(" abc ")).as_str(), "abc");
        assert_eq!(RequestId::from_header(Some("")).as_str().len(), 32);
        assert_eq!(RequestId::from_header(None).as_str().len(), 32);

        let long = "x".repeat(200);
        assert_ne!(RequestId::from_header(Some(&long)).as_str(), long);
    }
}
