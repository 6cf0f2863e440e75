use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Credential triple returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub username: String,
    pub user_id: i64,
    pub session: String,
}

impl SessionToken {
    pub fn new(username: impl Into<String>, user_id: i64, session: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id,
            session: session.into(),
        }
    }

    /// `Authorization` header value sent with every call after login
    pub fn header_value(&self) -> String {
        let raw = format!("{}:{}:{}", self.username, self.user_id, self.session);
        format!("Session {}", STANDARD.encode(raw))
    }
}

/// Everything an RPC call needs to know about who is calling and where.
/// Passed explicitly into the client instead of living in a global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub url: String,
    pub database: String,
    pub language: String,
    pub token: Option<SessionToken>,
}

impl SessionContext {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            language: "en".to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Forget the token, e.g. after logout or a rejected session
    pub fn clear(&mut self) {
        self.token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encoding() {
        let token = SessionToken::new("admin", 1, "abc123");
        // base64("admin:1:abc123")
        assert_eq!(token.header_value(), "Session YWRtaW46MTphYmMxMjM=");
    }

    #[test]
    fn test_context_clear() {
        let mut context = SessionContext::new("https://erp.example.org", "health")
            .with_token(SessionToken::new("admin", 1, "s"));
        assert!(context.is_authenticated());
        context.clear();
        assert!(!context.is_authenticated());
    }
}
