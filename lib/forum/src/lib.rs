//! OpenSchool forum — comment-thread view-model.
//!
//! A headless model of the forum's nested comment threads. The UI layer
//! (web, CLI, anything) renders snapshots and forwards user actions; all
//! business logic stays behind the remote REST API, reached through the
//! [`CommentGateway`] seam.
//!
//! # Pieces
//!
//! - [`ThreadCache`] — shared per-parent-id comment cache with invalidation
//!   hooks
//! - [`CommentGateway`] — the remote API seam (`openschool-client` provides
//!   the HTTP implementation)
//! - [`ThreadNode`] — one comment's view state: collapse, lazy child
//!   reveal, reply-form overlay
//! - [`ReplyComposer`] — draft validation and submission with upload
//!   progress
//! - [`ThreadView`] — the root list of one post's comments, flattened for
//!   display
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(ThreadCache::new());
//! let view = ThreadView::open(post, forum_id, gateway, cache);
//! view.load().await;
//! for item in view.items() {
//!     println!("{:indent$}{}", "", item.comment.content, indent = item.indent * 2);
//! }
//! ```

pub mod cache;
pub mod composer;
pub mod error;
pub mod gateway;
pub mod model;
pub mod node;
pub mod thread;

pub use cache::{InvalidateHook, ThreadCache};
pub use composer::{ComposeState, ReplyComposer, ReplyDraft, MAX_FILE_BYTES, MAX_IMAGE_BYTES};
pub use error::{ComposeError, GatewayError};
pub use gateway::{BoxFuture, CommentGateway, ProgressFn};
pub use model::{Attachment, Comment, Id, NewComment, Sender};
pub use node::{NodeState, Replies, ThreadCtx, ThreadNode};
pub use thread::{ThreadItem, ThreadView, INDENT_CAP};
