use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is logged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Identity {
    Admin,
    Judge { id: String, name: String },
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin)
    }

    /// Judge id, if this is a judge session
    pub fn judge_id(&self) -> Option<&str> {
        match self {
            Identity::Judge { id, .. } => Some(id),
            Identity::Admin => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Identity::Admin => "Admin",
            Identity::Judge { name, .. } => name,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Admin => write!(f, "Admin"),
            Identity::Judge { name, .. } => write!(f, "{} (judge)", name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub version: u32,
    #[serde(default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new logged-out session with version 1
    pub fn new() -> Self {
        Self {
            version: 1,
            identity: None,
            logged_in_at: None,
        }
    }

    pub fn login(&mut self, identity: Identity) {
        self.identity = Some(identity);
        self.logged_in_at = Some(Utc::now());
    }

    /// Returns true if someone was logged in
    pub fn logout(&mut self) -> bool {
        self.logged_in_at = None;
        self.identity.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_serializes_with_role_tag() {
        let judge = Identity::Judge {
            id: "j-1".to_string(),
            name: "Dr. Smith".to_string(),
        };
        let json = serde_json::to_string(&judge).unwrap();
        assert_eq!(json, r#"{"role":"judge","id":"j-1","name":"Dr. Smith"}"#);

        let admin: Identity = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.judge_id(), None);
    }

    #[test]
    fn test_login_logout() {
        let mut session = Session::new();
        assert!(!session.logout());

        session.login(Identity::Admin);
        assert_eq!(session.identity, Some(Identity::Admin));
        assert!(session.logged_in_at.is_some());

        assert!(session.logout());
        assert!(session.identity.is_none());
    }
}
