//! Inbound decryption stream protocol
//!
//! The decryption service owns the cryptography and the social-network
//! payload decoding. It is consumed here as an ordered stream of tagged
//! items per content unit:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `success` | Decrypted content (terminal) |
//! | `info` | Side-channel metadata: author match, iv, version, public sharing |
//! | `stage` | Intermediate stage, currently only `try_decrypt_by_e2e` |
//! | `error` | Unit-level failure (terminal) |
//!
//! Any other tag or stage is a protocol violation.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::progress::{DecodedMessage, UnitKey};
use crate::error::{PostError, PostResult};
use crate::types::ProfileIdentifier;

/// What the decryption service is asked to decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DecryptionPayload {
    /// Post text with mentioned links appended
    Text(String),
    /// One attached image
    ImageUrl(String),
}

impl DecryptionPayload {
    /// Key of the content unit this payload belongs to
    pub fn unit_key(&self) -> UnitKey {
        match self {
            DecryptionPayload::Text(_) => UnitKey::text(),
            DecryptionPayload::ImageUrl(url) => UnitKey::image(url.clone()),
        }
    }
}

/// Context handed to the decryption service alongside the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionContext {
    pub post_url: Option<String>,
    pub author_hint: ProfileIdentifier,
    pub current_profile: ProfileIdentifier,
    pub network: String,
}

/// Metadata learned while decrypting. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_author_of_post: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_shared: Option<bool>,
}

/// Intermediate stages the service may announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntermediateStage {
    /// Trying end-to-end decryption (looking up the post key)
    #[serde(rename = "try_decrypt_by_e2e")]
    TryDecryptByE2E,
}

/// One item of a unit's decryption stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecryptionItem {
    Success {
        content: DecodedMessage,
        #[serde(default)]
        iv: Vec<u8>,
    },
    Info(DecryptionInfo),
    Stage {
        event: IntermediateStage,
    },
    Error {
        message: String,
    },
}

impl DecryptionItem {
    /// Decode an item from its JSON wire form.
    ///
    /// Unknown tags, unknown stages and malformed items are protocol violations.
    pub fn from_json(raw: &str) -> PostResult<Self> {
        serde_json::from_str(raw).map_err(|e| PostError::ProtocolViolation(e.to_string()))
    }

    /// Decode an item from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> PostResult<Self> {
        serde_json::from_value(value).map_err(|e| PostError::ProtocolViolation(e.to_string()))
    }

    /// Short tag name, for logging
    pub fn tag(&self) -> &'static str {
        match self {
            DecryptionItem::Success { .. } => "success",
            DecryptionItem::Info(_) => "info",
            DecryptionItem::Stage { .. } => "stage",
            DecryptionItem::Error { .. } => "error",
        }
    }
}

/// Ordered, cancelable stream of items for one unit.
///
/// An `Err` item is a protocol defect reported by the transport layer.
pub type DecryptionStream = BoxStream<'static, PostResult<DecryptionItem>>;

/// The external decryption service.
pub trait DecryptionService: Send + Sync {
    /// Open a decryption stream for one content unit.
    fn decrypt(&self, payload: DecryptionPayload, context: DecryptionContext) -> DecryptionStream;
}
