//! Per-unit progress merging
//!
//! Each content unit of a post (its text, or one attached image) produces its
//! own stream of progress events. [`DisplayState`] folds those events into one
//! entry per unit, in discovery order, without ever letting a terminal state
//! fall back to an in-progress one.
//!
//! ```text
//! (none) ──► Progress ──► Progress ──► Success | Error
//!    │                                   ▲        │
//!    └───────────────────────────────────┘        └─► Success | Error
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of the post text unit
pub const TEXT_UNIT_KEY: &str = "text";

/// Key of one decryptable unit: `"text"` or the image URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey(String);

impl UnitKey {
    /// The post text unit
    pub fn text() -> Self {
        Self(TEXT_UNIT_KEY.to_string())
    }

    /// An image attachment unit
    pub fn image(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for UnitKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A decrypted message as handed back by the decryption service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMessage {
    text: String,
}

impl DecodedMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Plain text extracted from the message
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Intermediate stages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// Looking up the post key for end-to-end decryption
    FindingPostKey,
}

/// What happened to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressKind {
    /// Decrypted successfully (terminal)
    Success {
        content: DecodedMessage,
        iv: Vec<u8>,
    },
    /// Decryption failed (terminal)
    Error { message: String },
    /// Still working (non-terminal)
    Progress { stage: ProgressStage },
}

/// One progress event for a unit.
///
/// `internal` events belong to posts without a decodable payload and are
/// never rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub internal: bool,
}

impl ProgressEvent {
    pub fn success(content: DecodedMessage, iv: Vec<u8>) -> Self {
        Self {
            kind: ProgressKind::Success { content, iv },
            internal: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Error {
                message: message.into(),
            },
            internal: false,
        }
    }

    pub fn finding_post_key() -> Self {
        Self {
            kind: ProgressKind::Progress {
                stage: ProgressStage::FindingPostKey,
            },
            internal: false,
        }
    }

    /// Mark the event as internal (or not)
    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Success and Error are terminal
    pub fn is_terminal(&self) -> bool {
        !self.is_progress()
    }

    pub fn is_progress(&self) -> bool {
        matches!(self.kind, ProgressKind::Progress { .. })
    }
}

/// An event addressed to one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitUpdate {
    pub key: UnitKey,
    pub progress: ProgressEvent,
}

impl UnitUpdate {
    pub fn new(key: impl Into<UnitKey>, progress: ProgressEvent) -> Self {
        Self {
            key: key.into(),
            progress,
        }
    }
}

/// Ordered mapping from unit key to its latest non-regressing event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    entries: Vec<(UnitKey, ProgressEvent)>,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update in place.
    ///
    /// Returns `true` if the state changed. An in-progress event never
    /// overwrites a terminal one; every other transition replaces the entry
    /// in its original position.
    pub fn apply(&mut self, update: UnitUpdate) -> bool {
        let UnitUpdate { key, progress } = update;

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            None => {
                self.entries.push((key, progress));
                true
            }
            Some((_, current)) => {
                if current.is_terminal() && progress.is_progress() {
                    return false;
                }
                if *current == progress {
                    return false;
                }
                *current = progress;
                true
            }
        }
    }

    /// Current event for a unit
    pub fn get(&self, key: &UnitKey) -> Option<&ProgressEvent> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, progress)| progress)
    }

    /// Entries in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&UnitKey, &ProgressEvent)> {
        self.entries.iter().map(|(k, p)| (k, p))
    }

    /// Keys in discovery order
    pub fn keys(&self) -> Vec<UnitKey> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every recorded event is internal (vacuously true when empty)
    pub fn all_internal(&self) -> bool {
        self.entries.iter().all(|(_, p)| p.internal)
    }

    /// True when every recorded unit reached Success or Error
    pub fn is_settled(&self) -> bool {
        self.entries.iter().all(|(_, p)| p.is_terminal())
    }
}

/// Fold one update into a display state.
pub fn reduce(mut state: DisplayState, update: UnitUpdate) -> DisplayState {
    state.apply(update);
    state
}
