//! Decrypted-report sink
//!
//! Metadata about a post (is the viewer its author, which iv, which protocol
//! version, is it shared publicly) becomes known while decrypting, often
//! before and independently of the final outcome. It is published to a sink
//! as partial updates that augment earlier knowledge.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A partial record of decryption metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_author_of_post: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_public: Option<bool>,
}

impl ReportUpdate {
    pub fn is_author_of_post(value: bool) -> Self {
        Self {
            is_author_of_post: Some(value),
            ..Default::default()
        }
    }

    pub fn iv(value: Vec<u8>) -> Self {
        Self {
            iv: Some(value),
            ..Default::default()
        }
    }

    pub fn version(value: i32) -> Self {
        Self {
            version: Some(value),
            ..Default::default()
        }
    }

    pub fn shared_public(value: bool) -> Self {
        Self {
            shared_public: Some(value),
            ..Default::default()
        }
    }

    /// Overlay the fields present in `other` onto `self`.
    pub fn merge(&mut self, other: ReportUpdate) {
        if other.is_author_of_post.is_some() {
            self.is_author_of_post = other.is_author_of_post;
        }
        if other.iv.is_some() {
            self.iv = other.iv;
        }
        if other.version.is_some() {
            self.version = other.version;
        }
        if other.shared_public.is_some() {
            self.shared_public = other.shared_public;
        }
    }
}

/// Receiver of decryption metadata.
pub trait DecryptedReportSink: Send + Sync {
    fn report(&self, update: ReportUpdate);
}

/// Accumulating report: later updates augment, never erase, earlier ones.
#[derive(Debug, Default)]
pub struct DecryptedReport {
    inner: RwLock<ReportUpdate>,
}

impl DecryptedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything known so far
    pub fn snapshot(&self) -> ReportUpdate {
        self.inner.read().clone()
    }

    pub fn shared_public(&self) -> Option<bool> {
        self.inner.read().shared_public
    }
}

impl DecryptedReportSink for DecryptedReport {
    fn report(&self, update: ReportUpdate) {
        self.inner.write().merge(update);
    }
}
