//! Progressive post decryption
//!
//! A post is split into content units (its text, and each attached image).
//! Each unit is decrypted by an external service that reports progress as a
//! stream; this module drives those streams and decides what to show.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  DecryptionService (external)                                   │
//! │  └── one DecryptionStream per ContentUnit                       │
//! │           │                                                     │
//! │           ▼                                                     │
//! │  DecryptionOrchestrator                                         │
//! │  ├── one task per unit, shared CancellationToken                │
//! │  ├── forwards Info items to the DecryptedReport                 │
//! │  └── installs the CommentCodec on success                       │
//! │           │                                                     │
//! │           ▼                                                     │
//! │  DisplayState (per-unit merge, terminal states never regress)   │
//! │           │                                                     │
//! │           ▼                                                     │
//! │  select_views → PostView::{Success, Error, Progress}            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod orchestrator;
pub mod presentation;
pub mod progress;
pub mod report;
pub mod scripted;
pub mod stream;

pub use context::{CommentSlot, ContentUnit, DecryptionInputs, PostContext};
pub use orchestrator::{DecryptionOrchestrator, StateChange};
pub use presentation::{
    render_text, select_views, AppendRecipients, PostView, PresentationContext, RecipientAppender,
};
pub use progress::{
    reduce, DecodedMessage, DisplayState, ProgressEvent, ProgressKind, ProgressStage, UnitKey,
    UnitUpdate, TEXT_UNIT_KEY,
};
pub use report::{DecryptedReport, DecryptedReportSink, ReportUpdate};
pub use scripted::{DecryptionScript, ScriptStep, ScriptedDecryptionService};
pub use stream::{
    DecryptionContext, DecryptionInfo, DecryptionItem, DecryptionPayload, DecryptionService,
    DecryptionStream, IntermediateStage,
};
