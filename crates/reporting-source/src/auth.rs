use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::{Result, SourceError};

/// An authenticated user: the bearer token for data requests and the organization that owns
/// every report the user saves or lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub organization_id: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            organization_id: organization_id.into(),
        }
    }

    /// Assemble a session from a token response and the user profile fetched with it.
    ///
    /// The token is read from `access_token_jwt`, `access_token` or `token` (first present
    /// wins); the organization from `organization.organization_uuid`. A profile wrapped in a
    /// list is unwrapped to its first element.
    pub fn from_responses(token_response: &JsonValue, profile: &JsonValue) -> Result<Self> {
        let access_token = ["access_token_jwt", "access_token", "token"]
            .iter()
            .find_map(|key| token_response.get(key).and_then(JsonValue::as_str))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SourceError::Rejected("login response has no access token".to_string()))?;

        let profile = match profile {
            JsonValue::Array(items) => items.first(),
            other => Some(other),
        };
        let organization_id = profile
            .and_then(|profile| profile.get("organization"))
            .and_then(|org| org.get("organization_uuid"))
            .and_then(JsonValue::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                SourceError::Rejected("user profile has no organization id".to_string())
            })?;

        Ok(Session::new(access_token, organization_id))
    }
}

/// Exchanges user credentials for a [`Session`].
pub trait AuthProvider {
    fn login(&self, username: &str, password: &str) -> Result<Session>;
}

/// Log in through `provider`, rejecting blank credentials before the provider is called.
pub fn authenticate(provider: &dyn AuthProvider, username: &str, password: &str) -> Result<Session> {
    let username = username.trim();
    let password = password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(SourceError::MissingCredentials);
    }
    let session = provider.login(username, password)?;
    log::info!("{username} logged in to organization {}", session.organization_id);
    Ok(session)
}

/// Fixed username/password table.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthProvider {
    users: HashMap<String, (String, Session)>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        session: Session,
    ) -> Self {
        self.users
            .insert(username.into(), (password.into(), session));
        self
    }
}

impl AuthProvider for StaticAuthProvider {
    fn login(&self, username: &str, password: &str) -> Result<Session> {
        match self.users.get(username) {
            Some((expected, session)) if expected == password => Ok(session.clone()),
            _ => Err(SourceError::Rejected("invalid username or password".to_string())),
        }
    }
}
