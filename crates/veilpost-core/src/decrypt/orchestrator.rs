//! Decryption orchestrator
//!
//! Drives one decryption stream per content unit of a post and folds the
//! results into a [`DisplayState`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  DecryptionOrchestrator                                         │
//! │  ├── session: Option<Session>                                   │
//! │  │   ├── token: CancellationToken (shared by all unit tasks)    │
//! │  │   ├── state: Arc<RwLock<DisplayState>> (owned by session)    │
//! │  │   └── tasks: JoinSet (one task per content unit)             │
//! │  │                                                              │
//! │  └── change_tx: broadcast::Sender<StateChange>                  │
//! │      └── Notifies listeners after every accepted update         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A restart cancels the token and replaces the session, including its
//! display state. Old tasks only ever hold the old state, and re-check the
//! token under its write lock, so they cannot write into the new one.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use super::context::{ContentUnit, DecryptionInputs, PostContext};
use super::progress::{DisplayState, ProgressEvent, UnitKey, UnitUpdate};
use super::report::{DecryptedReportSink, ReportUpdate};
use super::stream::{DecryptionContext, DecryptionInfo, DecryptionItem, DecryptionService, IntermediateStage};
use crate::config::DecryptConfig;
use crate::crypto::CommentCodec;
use crate::error::PostResult;
use crate::types::SessionId;

/// Notification sent after a unit's display state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub session: SessionId,
    pub key: UnitKey,
}

struct Session {
    id: SessionId,
    inputs: DecryptionInputs,
    state: Arc<RwLock<DisplayState>>,
    token: CancellationToken,
    tasks: Arc<AsyncMutex<JoinSet<PostResult<()>>>>,
}

impl Session {
    /// Cancel under the state lock so no task is midway through a commit
    /// once this returns.
    fn cancel(&self) {
        debug!(session = %self.id, "Cancelling decryption session");
        let _state = self.state.write();
        self.token.cancel();
    }
}

/// Everything a unit task needs, cloned once per task.
struct UnitTask {
    session: SessionId,
    unit: ContentUnit,
    context: DecryptionContext,
    internal_noise: bool,
    post: Arc<PostContext>,
    state: Arc<RwLock<DisplayState>>,
    token: CancellationToken,
    change_tx: broadcast::Sender<StateChange>,
}

/// Runs and restarts the decryption of one post.
///
/// # Example
///
/// ```ignore
/// let orchestrator = DecryptionOrchestrator::new(service, post, DecryptConfig::default());
///
/// orchestrator.update(post.inputs(&whoami));
/// orchestrator.wait().await?;
///
/// for (key, progress) in orchestrator.snapshot().iter() {
///     println!("{key}: {:?}", progress.kind);
/// }
/// ```
pub struct DecryptionOrchestrator {
    service: Arc<dyn DecryptionService>,
    post: Arc<PostContext>,
    config: DecryptConfig,
    session: Mutex<Option<Session>>,
    change_tx: broadcast::Sender<StateChange>,
}

impl DecryptionOrchestrator {
    pub fn new(
        service: Arc<dyn DecryptionService>,
        post: Arc<PostContext>,
        config: DecryptConfig,
    ) -> Self {
        let (change_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            service,
            post,
            config,
            session: Mutex::new(None),
            change_tx,
        }
    }

    pub fn post(&self) -> &Arc<PostContext> {
        &self.post
    }

    pub fn config(&self) -> &DecryptConfig {
        &self.config
    }

    /// Subscribe to state change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.change_tx.subscribe()
    }

    /// Id of the running session, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.lock().as_ref().map(|s| s.id)
    }

    /// Snapshot of the running session's display state.
    ///
    /// Empty when no session is running.
    pub fn snapshot(&self) -> DisplayState {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.state.read().clone())
            .unwrap_or_default()
    }

    /// Start a session for `inputs`, or restart if they changed.
    ///
    /// Returns `true` if a new session was started, `false` if the running
    /// session already covers these inputs. Must be called within a Tokio
    /// runtime.
    pub fn update(&self, inputs: DecryptionInputs) -> bool {
        let mut slot = self.session.lock();

        if let Some(current) = slot.as_ref() {
            if !current.inputs.requires_restart(&inputs) {
                debug!(session = %current.id, "Inputs unchanged, keeping session");
                return false;
            }
            current.cancel();
        }

        let session = self.start_session(inputs);
        // Dropping the old session aborts whatever its tasks had left.
        *slot = Some(session);
        true
    }

    /// Cancel the running session.
    ///
    /// The display state is kept for inspection until the next `update`.
    pub fn shutdown(&self) {
        if let Some(session) = self.session.lock().as_ref() {
            info!(session = %session.id, "Shutting down decryption session");
            session.cancel();
        }
    }

    /// Wait for every unit task of the running session to finish.
    ///
    /// Returns the first protocol defect raised by a unit, if any. The tasks
    /// stay owned by the session, so dropping this future early (a timeout,
    /// a lost `select!` arm) leaves them running.
    pub async fn wait(&self) -> PostResult<()> {
        let tasks = {
            let slot = self.session.lock();
            match slot.as_ref() {
                Some(session) => session.tasks.clone(),
                None => return Ok(()),
            }
        };
        let mut tasks = tasks.lock().await;

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Ok(()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start_session(&self, inputs: DecryptionInputs) -> Session {
        let id = SessionId::new();
        let token = CancellationToken::new();
        let state = Arc::new(RwLock::new(DisplayState::new()));
        let context = inputs.context(&self.config.network);
        let units = inputs.units();

        info!(
            session = %id,
            author = %inputs.author_hint,
            whoami = %inputs.whoami,
            units = units.len(),
            "Starting decryption session"
        );

        let mut tasks = JoinSet::new();
        for unit in units {
            let span = tracing::debug_span!("unit", session = %id, unit = %unit.key);
            let task = UnitTask {
                session: id,
                unit,
                context: context.clone(),
                internal_noise: !inputs.contains_payload,
                post: self.post.clone(),
                state: state.clone(),
                token: token.clone(),
                change_tx: self.change_tx.clone(),
            };
            tasks.spawn(task.run(self.service.clone()).instrument(span));
        }

        Session {
            id,
            inputs,
            state,
            token,
            tasks: Arc::new(AsyncMutex::new(tasks)),
        }
    }
}

impl Drop for DecryptionOrchestrator {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().as_ref() {
            session.cancel();
        }
    }
}

impl UnitTask {
    async fn run(self, service: Arc<dyn DecryptionService>) -> PostResult<()> {
        let mut stream = service.decrypt(self.unit.payload.clone(), self.context.clone());
        let mut cached_iv: Option<Vec<u8>> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!("Unit cancelled");
                    return Ok(());
                }
                next = stream.next() => next,
            };

            let Some(item) = next else {
                debug!("Decryption stream finished");
                return Ok(());
            };

            if self.token.is_cancelled() {
                return Ok(());
            }

            let item = item.map_err(|e| {
                error!(error = %e, "Decryption service broke the stream protocol");
                e
            })?;
            debug!(item = item.tag(), "Decryption item");

            match item {
                DecryptionItem::Info(info) => {
                    if cached_iv.is_none() {
                        cached_iv = info.iv.clone();
                    }
                    self.forward_info(info);
                }
                DecryptionItem::Success { content, iv } => {
                    let iv = match cached_iv.as_ref() {
                        Some(iv) => iv.clone(),
                        None if !iv.is_empty() => iv,
                        None => {
                            // Should be unreachable: the service sends the iv before success.
                            warn!("No initialization vector before success, binding comments to an empty iv");
                            Vec::new()
                        }
                    };

                    let codec = CommentCodec::new(&iv, content.text())?;
                    self.commit(ProgressEvent::success(content, iv), Some(codec));
                }
                DecryptionItem::Stage { event } => match event {
                    IntermediateStage::TryDecryptByE2E => {
                        self.emit(
                            ProgressEvent::finding_post_key().with_internal(self.internal_noise),
                        );
                    }
                },
                DecryptionItem::Error { message } => {
                    debug!(%message, "Unit decryption failed");
                    self.emit(ProgressEvent::error(message).with_internal(self.internal_noise));
                }
            }
        }
    }

    fn forward_info(&self, info: DecryptionInfo) {
        let report = self.post.report();
        if let Some(is_author) = info.is_author_of_post {
            report.report(ReportUpdate::is_author_of_post(is_author));
        }
        if let Some(iv) = info.iv {
            report.report(ReportUpdate::iv(iv));
        }
        if let Some(version) = info.version {
            report.report(ReportUpdate::version(version));
        }
        if let Some(shared) = info.public_shared {
            report.report(ReportUpdate::shared_public(shared));
        }
    }

    /// Apply an event to this session's display state unless cancelled.
    fn emit(&self, progress: ProgressEvent) -> bool {
        self.commit(progress, None)
    }

    /// Install `codec` (if any) and apply `progress` under one state write
    /// lock, or do neither once the session is cancelled.
    fn commit(&self, progress: ProgressEvent, codec: Option<CommentCodec>) -> bool {
        let changed = {
            let mut state = self.state.write();
            if self.token.is_cancelled() {
                return false;
            }
            if let Some(codec) = codec {
                self.post.comments().install(codec);
            }
            state.apply(UnitUpdate::new(self.unit.key.clone(), progress))
        };

        if changed {
            let _ = self.change_tx.send(StateChange {
                session: self.session,
                key: self.unit.key.clone(),
            });
        }
        changed
    }
}
