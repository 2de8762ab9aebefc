//! Reply composition: draft validation and submission.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::cache::ThreadCache;
use crate::error::ComposeError;
use crate::gateway::{CommentGateway, ProgressFn};
use crate::model::{Attachment, Comment, Id, NewComment};

/// Maximum accepted image attachment size.
pub const MAX_IMAGE_BYTES: u64 = 8 * 1024 * 1024;

/// Maximum accepted generic file attachment size.
pub const MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// A reply being composed. Content may be empty when an attachment is
/// present; both attachments are optional and independent.
#[derive(Debug, Clone, Default)]
pub struct ReplyDraft {
    pub content: String,
    pub image: Option<Attachment>,
    pub file: Option<Attachment>,
}

impl ReplyDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Composer form state, as a front-end would render it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeState {
    pub busy: bool,
    /// Last reported upload progress, 0–100. Cosmetic.
    pub progress: u8,
    pub error: Option<String>,
}

impl ComposeState {
    fn idle() -> Self {
        Self {
            busy: false,
            progress: 0,
            error: None,
        }
    }
}

/// Submits new comments under one fixed parent.
///
/// Validation happens locally, before any network call: an empty draft and
/// an oversized attachment never reach the gateway. On success the parent's
/// cache entry is invalidated so the next child listing includes the new
/// reply.
pub struct ReplyComposer {
    parent_id: Id,
    forum_id: Id,
    gateway: Arc<dyn CommentGateway>,
    cache: Arc<ThreadCache>,
    state: Arc<Mutex<ComposeState>>,
    on_progress: Mutex<Option<ProgressFn>>,
}

impl ReplyComposer {
    pub fn new(
        parent_id: Id,
        forum_id: Id,
        gateway: Arc<dyn CommentGateway>,
        cache: Arc<ThreadCache>,
    ) -> Self {
        Self {
            parent_id,
            forum_id,
            gateway,
            cache,
            state: Arc::new(Mutex::new(ComposeState::idle())),
            on_progress: Mutex::new(None),
        }
    }

    pub fn parent_id(&self) -> &Id {
        &self.parent_id
    }

    /// Current form state snapshot.
    pub fn state(&self) -> ComposeState {
        self.state.lock().unwrap().clone()
    }

    /// Register an additional observer for upload progress (0–100).
    pub fn on_progress<F>(&self, hook: F)
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        *self.on_progress.lock().unwrap() = Some(Arc::new(hook));
    }

    /// Check a draft against the local rules without submitting.
    pub fn validate(draft: &ReplyDraft) -> Result<(), ComposeError> {
        if let Some(image) = &draft.image {
            if image.len() > MAX_IMAGE_BYTES {
                return Err(ComposeError::ImageTooLarge { size: image.len() });
            }
        }
        if let Some(file) = &draft.file {
            if file.len() > MAX_FILE_BYTES {
                return Err(ComposeError::FileTooLarge { size: file.len() });
            }
        }
        if draft.content.trim().is_empty() && draft.image.is_none() && draft.file.is_none() {
            return Err(ComposeError::Empty);
        }
        Ok(())
    }

    /// Submit a draft as a child of this composer's parent.
    ///
    /// A validation failure returns before any network call and leaves the
    /// error on the form state. A gateway failure leaves the error on the
    /// form state and may be retried by submitting again; the draft is not
    /// consumed by failure (the caller still holds it).
    pub async fn submit(&self, draft: ReplyDraft) -> Result<Comment, ComposeError> {
        if let Err(e) = Self::validate(&draft) {
            let mut state = self.state.lock().unwrap();
            state.busy = false;
            state.error = Some(e.to_string());
            return Err(e);
        }

        {
            let mut state = self.state.lock().unwrap();
            state.busy = true;
            state.progress = 0;
            state.error = None;
        }

        let progress: ProgressFn = {
            let state = Arc::clone(&self.state);
            let hook = self.on_progress.lock().unwrap().clone();
            Arc::new(move |pct| {
                state.lock().unwrap().progress = pct;
                if let Some(hook) = &hook {
                    hook(pct);
                }
            })
        };

        let req = NewComment {
            parent_id: self.parent_id.clone(),
            forum_id: self.forum_id.clone(),
            content: draft.content,
            image: draft.image,
            file: draft.file,
        };

        match self.gateway.create_comment(req, Some(progress)).await {
            Ok(comment) => {
                debug!(parent = %self.parent_id, id = %comment.id, "reply created");
                self.cache.invalidate(&self.parent_id);
                *self.state.lock().unwrap() = ComposeState::idle();
                Ok(comment)
            }
            Err(e) => {
                warn!(parent = %self.parent_id, error = %e, "reply submit failed");
                let mut state = self.state.lock().unwrap();
                state.busy = false;
                state.error = Some(e.to_string());
                Err(ComposeError::Gateway(e))
            }
        }
    }
}
