//! Scripted decryption service
//!
//! Replays a fixed script of wire items per content unit, optionally delayed.
//! Used to drive the orchestrator without a real decryption backend (tests,
//! CLI replays).
//!
//! ## Script format
//!
//! ```json
//! {
//!   "units": {
//!     "text": [
//!       { "item": { "type": "stage", "event": "try_decrypt_by_e2e" } },
//!       { "delay_ms": 20, "item": { "type": "success", "content": { "text": "hi" }, "iv": [1, 2, 3] } }
//!     ],
//!     "https://img/1.png": [
//!       { "item": { "type": "error", "message": "bad key" } }
//!     ]
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::stream::{
    DecryptionContext, DecryptionItem, DecryptionPayload, DecryptionService, DecryptionStream,
};
use crate::error::PostResult;

/// One scripted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Delay before the item is yielded
    #[serde(default)]
    pub delay_ms: u64,
    /// Raw wire item, decoded when yielded
    pub item: serde_json::Value,
}

impl ScriptStep {
    pub fn new(item: &DecryptionItem) -> PostResult<Self> {
        Ok(Self {
            delay_ms: 0,
            item: serde_json::to_value(item)?,
        })
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A script: unit key → items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecryptionScript {
    #[serde(default)]
    pub units: HashMap<String, Vec<ScriptStep>>,
}

impl DecryptionScript {
    pub fn from_json_file(path: impl AsRef<Path>) -> PostResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Append a step for `key`.
    pub fn push(&mut self, key: impl Into<String>, step: ScriptStep) -> &mut Self {
        self.units.entry(key.into()).or_default().push(step);
        self
    }
}

/// Decryption service replaying a [`DecryptionScript`].
#[derive(Debug, Default)]
pub struct ScriptedDecryptionService {
    script: DecryptionScript,
    calls: Mutex<Vec<(DecryptionPayload, DecryptionContext)>>,
}

impl ScriptedDecryptionService {
    pub fn new(script: DecryptionScript) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `decrypt` call received so far, in order
    pub fn calls(&self) -> Vec<(DecryptionPayload, DecryptionContext)> {
        self.calls.lock().clone()
    }
}

impl DecryptionService for ScriptedDecryptionService {
    fn decrypt(&self, payload: DecryptionPayload, context: DecryptionContext) -> DecryptionStream {
        let key = payload.unit_key();
        self.calls.lock().push((payload, context));

        let steps = self
            .script
            .units
            .get(key.as_str())
            .cloned()
            .unwrap_or_default();

        stream::iter(steps)
            .then(|step| async move {
                if step.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
                }
                DecryptionItem::from_value(step.item)
            })
            .boxed()
    }
}
