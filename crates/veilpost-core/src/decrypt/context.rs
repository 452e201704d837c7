//! Per-post context shared between the orchestrator and its collaborators

use std::sync::Arc;

use parking_lot::RwLock;

use super::progress::UnitKey;
use super::report::DecryptedReport;
use super::stream::{DecryptionContext, DecryptionPayload};
use crate::crypto::CommentCodec;
use crate::error::{PostError, PostResult};
use crate::types::ProfileIdentifier;

/// Slot holding the comment codec of a decrypted post.
///
/// Written once per successful unit (last writer wins), read by whoever
/// encrypts or decrypts comments. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct CommentSlot {
    inner: Arc<RwLock<Option<Arc<CommentCodec>>>>,
}

impl CommentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, codec: CommentCodec) {
        *self.inner.write() = Some(Arc::new(codec));
    }

    pub fn get(&self) -> Option<Arc<CommentCodec>> {
        self.inner.read().clone()
    }

    pub fn is_installed(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

/// One decryptable piece of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    pub key: UnitKey,
    pub payload: DecryptionPayload,
}

/// Everything a decryption session depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionInputs {
    pub post_url: Option<String>,
    pub author_hint: ProfileIdentifier,
    pub whoami: ProfileIdentifier,
    pub raw_text: String,
    pub mentioned_links: Vec<String>,
    pub images: Vec<String>,
    pub contains_payload: bool,
}

impl DecryptionInputs {
    /// Whether moving from `self` to `next` requires tearing the session down.
    ///
    /// The raw text alone does not trigger a restart.
    pub fn requires_restart(&self, next: &DecryptionInputs) -> bool {
        self.post_url != next.post_url
            || self.author_hint != next.author_hint
            || self.whoami != next.whoami
            || self.images != next.images
            || self.mentioned_links != next.mentioned_links
            || self.contains_payload != next.contains_payload
    }

    /// Units to decrypt, in discovery order.
    ///
    /// The text unit is only present when the post carries a payload.
    pub fn units(&self) -> Vec<ContentUnit> {
        let mut units = Vec::with_capacity(self.images.len() + 1);

        if self.contains_payload {
            let text = format!("{} {}", self.raw_text, self.mentioned_links.join(" "));
            units.push(ContentUnit {
                key: UnitKey::text(),
                payload: DecryptionPayload::Text(text),
            });
        }

        for url in &self.images {
            units.push(ContentUnit {
                key: UnitKey::image(url.clone()),
                payload: DecryptionPayload::ImageUrl(url.clone()),
            });
        }

        units
    }

    /// Context bundle handed to the decryption service
    pub fn context(&self, network: &str) -> DecryptionContext {
        DecryptionContext {
            post_url: self.post_url.clone(),
            author_hint: self.author_hint.clone(),
            current_profile: self.whoami.clone(),
            network: network.to_string(),
        }
    }
}

/// A post as seen by the decryption layer.
#[derive(Debug, Clone)]
pub struct PostContext {
    pub url: Option<String>,
    /// Who the social network says posted it
    pub posted_by: ProfileIdentifier,
    /// Author claimed inside the payload, if any
    pub claimed_author: Option<ProfileIdentifier>,
    pub raw_text: String,
    pub mentioned_links: Vec<String>,
    pub images: Vec<String>,
    /// Whether the text carries a decodable payload
    pub contains_payload: bool,
    report: Arc<DecryptedReport>,
    comments: CommentSlot,
}

impl PostContext {
    pub fn new(posted_by: ProfileIdentifier, raw_text: impl Into<String>) -> Self {
        Self {
            url: None,
            posted_by,
            claimed_author: None,
            raw_text: raw_text.into(),
            mentioned_links: Vec::new(),
            images: Vec::new(),
            contains_payload: false,
            report: Arc::new(DecryptedReport::new()),
            comments: CommentSlot::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_claimed_author(mut self, author: ProfileIdentifier) -> Self {
        self.claimed_author = Some(author);
        self
    }

    pub fn with_mentioned_links(mut self, links: Vec<String>) -> Self {
        self.mentioned_links = links;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_payload(mut self, contains_payload: bool) -> Self {
        self.contains_payload = contains_payload;
        self
    }

    /// The claimed author if the payload names one, else the poster
    pub fn author_hint(&self) -> &ProfileIdentifier {
        self.claimed_author.as_ref().unwrap_or(&self.posted_by)
    }

    /// Session inputs for this post as seen by `whoami`
    pub fn inputs(&self, whoami: &ProfileIdentifier) -> DecryptionInputs {
        DecryptionInputs {
            post_url: self.url.clone(),
            author_hint: self.author_hint().clone(),
            whoami: whoami.clone(),
            raw_text: self.raw_text.clone(),
            mentioned_links: self.mentioned_links.clone(),
            images: self.images.clone(),
            contains_payload: self.contains_payload,
        }
    }

    pub fn report(&self) -> &Arc<DecryptedReport> {
        &self.report
    }

    pub fn comments(&self) -> &CommentSlot {
        &self.comments
    }

    /// Encrypt a comment with the codec of the decrypted post.
    pub fn encrypt_comment(&self, plaintext: &str) -> PostResult<String> {
        let codec = self.comments.get().ok_or(PostError::NotDecrypted)?;
        codec.encrypt_comment(plaintext)
    }

    /// Decrypt a comment with the codec of the decrypted post.
    pub fn decrypt_comment(&self, encrypted: &str) -> PostResult<String> {
        let codec = self.comments.get().ok_or(PostError::NotDecrypted)?;
        codec.decrypt_comment(encrypted)
    }
}
