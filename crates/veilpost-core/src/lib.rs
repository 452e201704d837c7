//! Veilpost Core Library
//!
//! Progressive decryption of encrypted social-network posts.
//!
//! ## Overview
//!
//! An encrypted post is made of content units: its text (with mentioned links
//! appended) and each attached image. Every unit is decrypted by an external
//! service that streams progress: metadata, "looking for the post key", and
//! finally success or failure. Veilpost runs one cancelable task per unit,
//! merges the progress into a per-unit display state that never regresses
//! from a final outcome, and selects what should be shown to the reader.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use veilpost_core::decrypt::{
//!     render_text, select_views, DecryptionOrchestrator, PostContext, PresentationContext,
//! };
//! use veilpost_core::DecryptConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let post = Arc::new(PostContext::new(author, "🎼 4/4 ...").with_payload(true));
//!     let orchestrator = DecryptionOrchestrator::new(service, post.clone(), DecryptConfig::default());
//!
//!     orchestrator.update(post.inputs(&whoami));
//!     orchestrator.wait().await?;
//!
//!     let ctx = PresentationContext::for_post(&post, &whoami, None, Default::default());
//!     print!("{}", render_text(&select_views(&orchestrator.snapshot(), &ctx)));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod decrypt;
pub mod error;
pub mod types;

// Re-exports
pub use config::DecryptConfig;
pub use crypto::CommentCodec;
pub use decrypt::{DecryptionOrchestrator, DisplayState, PostContext, PostView, ProgressEvent};
pub use error::{PostError, PostResult};
pub use types::{ProfileIdentifier, SessionId};
