//! Core types for Veilpost

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::PostError;

/// Identity of a profile on a social network.
///
/// Textual form: `person:{network}/{user_id}`, e.g. `person:twitter.com/alice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileIdentifier {
    network: String,
    user_id: String,
}

impl ProfileIdentifier {
    /// Prefix of the textual form
    pub const PREFIX: &'static str = "person:";

    /// Create an identifier, rejecting empty parts and separators in the network.
    pub fn new(network: impl Into<String>, user_id: impl Into<String>) -> Result<Self, PostError> {
        let network = network.into();
        let user_id = user_id.into();

        if network.is_empty() || network.contains('/') {
            return Err(PostError::InvalidIdentifier(format!(
                "invalid network '{}'",
                network
            )));
        }
        if user_id.is_empty() {
            return Err(PostError::InvalidIdentifier(
                "user id cannot be empty".to_string(),
            ));
        }

        Ok(Self { network, user_id })
    }

    /// The social network this profile lives on
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The user id on that network
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Textual form, `person:{network}/{user_id}`
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProfileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", Self::PREFIX, self.network, self.user_id)
    }
}

impl FromStr for ProfileIdentifier {
    type Err = PostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(Self::PREFIX).ok_or_else(|| {
            PostError::InvalidIdentifier(format!("'{}' must start with '{}'", s, Self::PREFIX))
        })?;
        let (network, user_id) = rest.split_once('/').ok_or_else(|| {
            PostError::InvalidIdentifier(format!("'{}' is missing the '/' separator", s))
        })?;
        Self::new(network, user_id)
    }
}

/// Identifier of one decryption session.
///
/// A new session is started for every restart of the orchestrator; the ULID
/// keeps sessions time-ordered in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Create a new SessionId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Get the underlying ULID
    pub fn as_ulid(&self) -> &Ulid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_identifier_display() {
        let id = ProfileIdentifier::new("twitter.com", "alice").unwrap();
        assert_eq!(id.to_string(), "person:twitter.com/alice");
        assert_eq!(id.network(), "twitter.com");
        assert_eq!(id.user_id(), "alice");
    }

    #[test]
    fn test_profile_identifier_parse() {
        let id: ProfileIdentifier = "person:facebook.com/bob".parse().unwrap();
        assert_eq!(id, ProfileIdentifier::new("facebook.com", "bob").unwrap());
    }

    #[test]
    fn test_profile_identifier_user_id_may_contain_slash() {
        let id: ProfileIdentifier = "person:mastodon.social/@carol/1".parse().unwrap();
        assert_eq!(id.user_id(), "@carol/1");
    }

    #[test]
    fn test_profile_identifier_rejects_malformed() {
        assert!("twitter.com/alice".parse::<ProfileIdentifier>().is_err());
        assert!("person:twitter.com".parse::<ProfileIdentifier>().is_err());
        assert!("person:/alice".parse::<ProfileIdentifier>().is_err());
        assert!("person:twitter.com/".parse::<ProfileIdentifier>().is_err());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert!(SessionId::new().to_string().starts_with("session_"));
    }
}
