//! Presentation selector
//!
//! Turns a [`DisplayState`] snapshot into the views shown to the user.
//! Internal events are never shown, and a post without a payload whose
//! events are all internal renders nothing at all.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use super::context::PostContext;
use super::progress::{DecodedMessage, DisplayState, ProgressKind, ProgressStage};
use crate::error::PostResult;
use crate::types::ProfileIdentifier;

/// External capability to add recipients to an already published post.
pub trait RecipientAppender: Send + Sync {
    fn append_recipients(
        &self,
        recipients: Vec<ProfileIdentifier>,
    ) -> BoxFuture<'static, PostResult<()>>;
}

/// Append-recipients capability offered on a successfully decrypted post.
///
/// Resolves only after the settle delay has passed, since the recipient
/// store is eventually consistent.
#[derive(Clone)]
pub struct AppendRecipients {
    appender: Arc<dyn RecipientAppender>,
    settle_delay: Duration,
}

impl AppendRecipients {
    /// Offer the capability only on the viewer's own posts.
    pub fn offer(
        whoami: &ProfileIdentifier,
        author: &ProfileIdentifier,
        appender: Option<Arc<dyn RecipientAppender>>,
        settle_delay: Duration,
    ) -> Option<Self> {
        if whoami != author {
            return None;
        }
        appender.map(|appender| Self {
            appender,
            settle_delay,
        })
    }

    pub async fn append(&self, recipients: Vec<ProfileIdentifier>) -> PostResult<()> {
        self.appender.append_recipients(recipients).await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
}

impl fmt::Debug for AppendRecipients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendRecipients")
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

/// Inputs of the selector besides the display state.
#[derive(Debug, Clone)]
pub struct PresentationContext {
    pub contains_payload: bool,
    /// Author claimed in the payload
    pub author: Option<ProfileIdentifier>,
    pub posted_by: ProfileIdentifier,
    pub shared_public: Option<bool>,
    pub append_recipients: Option<AppendRecipients>,
}

impl PresentationContext {
    /// Build the context for `post` as seen by `whoami`.
    pub fn for_post(
        post: &PostContext,
        whoami: &ProfileIdentifier,
        appender: Option<Arc<dyn RecipientAppender>>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            contains_payload: post.contains_payload,
            author: post.claimed_author.clone(),
            posted_by: post.posted_by.clone(),
            shared_public: post.report().shared_public(),
            append_recipients: AppendRecipients::offer(
                whoami,
                post.author_hint(),
                appender,
                settle_delay,
            ),
        }
    }
}

/// One rendered content unit.
#[derive(Debug, Clone)]
pub enum PostView {
    Success {
        content: DecodedMessage,
        shared_public: Option<bool>,
        author: Option<ProfileIdentifier>,
        posted_by: ProfileIdentifier,
        append_recipients: Option<AppendRecipients>,
    },
    Error {
        message: String,
        author: Option<ProfileIdentifier>,
        posted_by: ProfileIdentifier,
    },
    Progress {
        stage: ProgressStage,
        author: Option<ProfileIdentifier>,
        posted_by: ProfileIdentifier,
    },
}

/// Select the views to render, in discovery order.
pub fn select_views(state: &DisplayState, ctx: &PresentationContext) -> Vec<PostView> {
    // Not a secret post
    if !ctx.contains_payload && state.all_internal() {
        return Vec::new();
    }

    state
        .iter()
        .filter(|(_, progress)| !progress.internal)
        .map(|(_, progress)| match &progress.kind {
            ProgressKind::Success { content, .. } => PostView::Success {
                content: content.clone(),
                shared_public: ctx.shared_public,
                author: ctx.author.clone(),
                posted_by: ctx.posted_by.clone(),
                append_recipients: ctx.append_recipients.clone(),
            },
            ProgressKind::Error { message } => PostView::Error {
                message: message.clone(),
                author: ctx.author.clone(),
                posted_by: ctx.posted_by.clone(),
            },
            ProgressKind::Progress { stage } => PostView::Progress {
                stage: *stage,
                author: ctx.author.clone(),
                posted_by: ctx.posted_by.clone(),
            },
        })
        .collect()
}

/// Plain text rendering, one line per view.
pub fn render_text(views: &[PostView]) -> String {
    views.iter().map(|view| format!("{}\n", view)).collect()
}

impl fmt::Display for PostView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostView::Success {
                content,
                shared_public,
                posted_by,
                ..
            } => {
                let visibility = match shared_public {
                    Some(true) => " (public)",
                    _ => "",
                };
                write!(f, "[decrypted{}] {}: {}", visibility, posted_by, content.text())
            }
            PostView::Error {
                message, posted_by, ..
            } => write!(f, "[failed] {}: {}", posted_by, message),
            PostView::Progress {
                stage, posted_by, ..
            } => match stage {
                ProgressStage::FindingPostKey => {
                    write!(f, "[decrypting] {}: finding post key", posted_by)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decrypt::progress::{ProgressEvent, UnitUpdate};
    use crate::error::PostError;
    use parking_lot::Mutex;

    fn alice() -> ProfileIdentifier {
        ProfileIdentifier::new("twitter.com", "alice").unwrap()
    }

    fn bob() -> ProfileIdentifier {
        ProfileIdentifier::new("twitter.com", "bob").unwrap()
    }

    fn ctx(contains_payload: bool) -> PresentationContext {
        PresentationContext {
            contains_payload,
            author: None,
            posted_by: alice(),
            shared_public: None,
            append_recipients: None,
        }
    }

    #[derive(Default)]
    struct RecordingAppender {
        calls: Mutex<Vec<Vec<ProfileIdentifier>>>,
    }

    impl RecipientAppender for RecordingAppender {
        fn append_recipients(
            &self,
            recipients: Vec<ProfileIdentifier>,
        ) -> BoxFuture<'static, PostResult<()>> {
            self.calls.lock().push(recipients);
            Box::pin(async { Ok(()) })
        }
    }

    struct FailingAppender;

    impl RecipientAppender for FailingAppender {
        fn append_recipients(&self, _: Vec<ProfileIdentifier>) -> BoxFuture<'static, PostResult<()>> {
            Box::pin(async { Err(PostError::Crypto("store offline".into())) })
        }
    }

    #[test]
    fn test_no_payload_all_internal_renders_nothing() {
        let mut state = DisplayState::new();
        state.apply(UnitUpdate::new(
            "img",
            ProgressEvent::error("no payload").with_internal(true),
        ));
        assert!(select_views(&state, &ctx(false)).is_empty());
    }

    #[test]
    fn test_internal_entries_filtered_even_with_payload() {
        let mut state = DisplayState::new();
        state.apply(UnitUpdate::new(
            "text",
            ProgressEvent::success(DecodedMessage::new("hi"), vec![1]),
        ));
        state.apply(UnitUpdate::new(
            "img",
            ProgressEvent::finding_post_key().with_internal(true),
        ));

        let views = select_views(&state, &ctx(true));
        assert_eq!(views.len(), 1);
        assert!(matches!(&views[0], PostView::Success { content, .. } if content.text() == "hi"));
    }

    #[test]
    fn test_no_payload_with_visible_entry_renders_it() {
        let mut state = DisplayState::new();
        state.apply(UnitUpdate::new(
            "img",
            ProgressEvent::success(DecodedMessage::new("in image"), vec![]),
        ));
        let views = select_views(&state, &ctx(false));
        assert_eq!(views.len(), 1);
    }

    #[test]
    fn test_views_follow_discovery_order() {
        let mut state = DisplayState::new();
        state.apply(UnitUpdate::new("a", ProgressEvent::finding_post_key()));
        state.apply(UnitUpdate::new("b", ProgressEvent::error("bad key")));
        state.apply(UnitUpdate::new(
            "a",
            ProgressEvent::success(DecodedMessage::new("hi"), vec![]),
        ));

        let views = select_views(&state, &ctx(true));
        assert!(matches!(views[0], PostView::Success { .. }));
        assert!(matches!(views[1], PostView::Error { .. }));
    }

    #[test]
    fn test_render_text() {
        let mut state = DisplayState::new();
        state.apply(UnitUpdate::new(
            "text",
            ProgressEvent::success(DecodedMessage::new("hi"), vec![]),
        ));
        state.apply(UnitUpdate::new("img", ProgressEvent::finding_post_key()));
        state.apply(UnitUpdate::new("img2", ProgressEvent::error("bad key")));

        let mut ctx = ctx(true);
        ctx.shared_public = Some(true);
        let text = render_text(&select_views(&state, &ctx));
        assert_eq!(
            text,
            "[decrypted (public)] person:twitter.com/alice: hi\n\
             [decrypting] person:twitter.com/alice: finding post key\n\
             [failed] person:twitter.com/alice: bad key\n"
        );
    }

    #[test]
    fn test_view_display_has_no_trailing_newline() {
        let view = PostView::Error {
            message: "bad key".into(),
            author: Some(bob()),
            posted_by: alice(),
        };
        assert_eq!(view.to_string(), "[failed] person:twitter.com/alice: bad key");
        assert_eq!(render_text(&[]), "");
    }

    #[test]
    fn test_append_offered_only_to_author() {
        let appender: Arc<dyn RecipientAppender> = Arc::new(RecordingAppender::default());
        let delay = Duration::from_millis(1500);

        assert!(AppendRecipients::offer(&alice(), &alice(), Some(appender.clone()), delay).is_some());
        assert!(AppendRecipients::offer(&bob(), &alice(), Some(appender), delay).is_none());
        assert!(AppendRecipients::offer(&alice(), &alice(), None, delay).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_waits_for_settle_delay() {
        let recorder = Arc::new(RecordingAppender::default());
        let append = AppendRecipients::offer(
            &alice(),
            &alice(),
            Some(recorder.clone() as Arc<dyn RecipientAppender>),
            Duration::from_millis(1500),
        )
        .unwrap();

        let started = tokio::time::Instant::now();
        append.append(vec![bob()]).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(recorder.calls.lock().as_slice(), &[vec![bob()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_failure_skips_delay() {
        let append = AppendRecipients::offer(
            &alice(),
            &alice(),
            Some(Arc::new(FailingAppender) as Arc<dyn RecipientAppender>),
            Duration::from_millis(1500),
        )
        .unwrap();

        let started = tokio::time::Instant::now();
        assert!(append.append(vec![bob()]).await.is_err());
        assert!(started.elapsed() < Duration::from_millis(1500));
    }
}
