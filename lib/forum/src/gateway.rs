//! The seam between the view-model and the remote API.
//!
//! The view-model never speaks HTTP; it talks to a `CommentGateway` trait
//! object. The real implementation lives in `openschool-client`; tests plug
//! in in-memory gateways.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::model::{Comment, Id, NewComment};

/// A boxed, `Send`-able future returned by gateway methods.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Callback invoked with upload progress in percent (0–100).
///
/// Advisory only — values may skip or repeat; the final successful submit
/// always reports 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Remote operations on forum posts and comments.
///
/// All lists come back in server order (oldest first); callers must not
/// re-sort. No method retries on failure — retry is a caller decision.
pub trait CommentGateway: Send + Sync {
    /// Fetch a single post/comment by id.
    fn fetch_post(&self, id: &Id) -> BoxFuture<Result<Comment, GatewayError>>;

    /// List the direct children of a post/comment.
    fn list_children(&self, parent_id: &Id) -> BoxFuture<Result<Vec<Comment>, GatewayError>>;

    /// Create a comment under a parent. The multipart upload drives
    /// `progress` while attachment bytes are sent.
    fn create_comment(
        &self,
        req: NewComment,
        progress: Option<ProgressFn>,
    ) -> BoxFuture<Result<Comment, GatewayError>>;

    /// Record that the post was viewed. Fire-and-forget at the call site;
    /// failures are not user-visible.
    fn mark_viewed(&self, post_id: &Id) -> BoxFuture<Result<(), GatewayError>>;
}
