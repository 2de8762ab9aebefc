//! Per-comment view state.
//!
//! Each rendered comment owns a `ThreadNode`. The node's state is a tagged
//! union so illegal combinations ("collapsed and loading") are
//! unrepresentable; the reply-form flag is an orthogonal overlay on top.
//!
//! State machine (see `Replies` for the expanded sub-states):
//!
//! ```text
//!   Collapsed  <-- toggle_collapse -->  Expanded(Hidden | Loading | Shown)
//!
//!   Hidden --reveal_replies--> Loading --ok--> Shown
//!                                      --err-> Hidden{error}   (retry = reveal again)
//!   Shown  --hide_replies----> Hidden
//! ```
//!
//! A reveal observed while `Loading` is a no-op — that is what serializes
//! concurrent reveals and guarantees a single network call per reveal.

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::cache::ThreadCache;
use crate::gateway::CommentGateway;
use crate::model::{Comment, Id};

/// Everything a node needs to fetch and build its children.
pub struct ThreadCtx {
    pub gateway: Arc<dyn CommentGateway>,
    pub cache: Arc<ThreadCache>,
    pub forum_id: Id,
}

/// Child-list sub-state of an expanded node.
pub enum Replies {
    /// Children not rendered. `error` carries the inline message from the
    /// last failed reveal; cleared when a reveal is attempted again.
    Hidden { error: Option<String> },
    /// A fetch is in flight. Further reveals are no-ops until it settles.
    Loading,
    /// Children rendered as live nodes.
    Shown { children: Vec<Arc<ThreadNode>> },
}

/// Node state proper.
pub enum NodeState {
    /// Descendant content hidden, node itself still visible. Remembers
    /// whether replies were visible so re-expanding can restore them.
    Collapsed { replies_were_visible: bool },
    Expanded { replies: Replies },
}

struct Cell {
    state: NodeState,
    /// Orthogonal overlay: whether a reply form is mounted on this node.
    replying: bool,
}

/// One comment plus its lazily loaded children.
///
/// Nodes are created by their parent (the thread view for roots, a `Shown`
/// parent for replies) and dropped when the parent stops rendering them.
/// Nothing here survives a full reload.
pub struct ThreadNode {
    comment: Comment,
    depth: usize,
    ctx: Arc<ThreadCtx>,
    /// Self-handle so transitions on `&self` can spawn children that point
    /// back here.
    this: Weak<ThreadNode>,
    parent: Weak<ThreadNode>,
    /// Cache key of the list this comment appears in when the parent is
    /// not a node — i.e. the post id, for roots mounted by a thread view.
    anchor: Option<Id>,
    cell: Mutex<Cell>,
}

impl ThreadNode {
    fn new(
        comment: Comment,
        depth: usize,
        ctx: Arc<ThreadCtx>,
        parent: Weak<ThreadNode>,
        anchor: Option<Id>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            comment,
            depth,
            ctx,
            this: this.clone(),
            parent,
            anchor,
            cell: Mutex::new(Cell {
                state: NodeState::Expanded {
                    replies: Replies::Hidden { error: None },
                },
                replying: false,
            }),
        })
    }

    /// Create a standalone root node (depth 0, no parent).
    pub fn new_root(comment: Comment, ctx: Arc<ThreadCtx>) -> Arc<Self> {
        Self::new(comment, 0, ctx, Weak::new(), None)
    }

    /// Create a root node of `post_id`'s comment list. Replies submitted
    /// here propagate invalidation to that list instead of a parent node.
    pub fn new_root_under(comment: Comment, post_id: Id, ctx: Arc<ThreadCtx>) -> Arc<Self> {
        Self::new(comment, 0, ctx, Weak::new(), Some(post_id))
    }

    /// Create a child node under this one.
    pub fn new_child(&self, comment: Comment) -> Arc<Self> {
        Self::new(
            comment,
            self.depth + 1,
            Arc::clone(&self.ctx),
            self.this.clone(),
            None,
        )
    }

    pub fn comment(&self) -> &Comment {
        &self.comment
    }

    pub fn id(&self) -> &Id {
        &self.comment.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Server-side direct-child count; drives the "view N replies"
    /// affordance.
    pub fn reply_count(&self) -> u32 {
        self.comment.reply_count
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self.cell.lock().unwrap().state, NodeState::Collapsed { .. })
    }

    /// Whether children are rendered or currently being fetched.
    pub fn replies_visible(&self) -> bool {
        matches!(
            self.cell.lock().unwrap().state,
            NodeState::Expanded {
                replies: Replies::Shown { .. } | Replies::Loading
            }
        )
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.cell.lock().unwrap().state,
            NodeState::Expanded {
                replies: Replies::Loading
            }
        )
    }

    pub fn is_replying(&self) -> bool {
        self.cell.lock().unwrap().replying
    }

    /// Inline error from the last failed reveal, if any.
    pub fn fetch_error(&self) -> Option<String> {
        match &self.cell.lock().unwrap().state {
            NodeState::Expanded {
                replies: Replies::Hidden { error },
            } => error.clone(),
            _ => None,
        }
    }

    /// Currently rendered children (empty unless replies are shown).
    pub fn children(&self) -> Vec<Arc<ThreadNode>> {
        match &self.cell.lock().unwrap().state {
            NodeState::Expanded {
                replies: Replies::Shown { children },
            } => children.clone(),
            _ => Vec::new(),
        }
    }

    // ====================================================================
    // Transitions
    // ====================================================================

    /// Fetch and render this node's children.
    ///
    /// Valid only while expanded with replies hidden; in every other state
    /// this is a no-op. Repeated reveals of the same node are served from
    /// the cache unless it was invalidated. A failed fetch surfaces as
    /// [`fetch_error`](Self::fetch_error) and re-invoking is the retry path.
    pub async fn reveal_replies(&self) {
        {
            let mut cell = self.cell.lock().unwrap();
            match &mut cell.state {
                NodeState::Expanded {
                    replies: replies @ Replies::Hidden { .. },
                } => {
                    *replies = Replies::Loading;
                }
                // Loading: a concurrent reveal is already in flight.
                // Shown / Collapsed: nothing to reveal.
                _ => return,
            }
        }
        self.fetch_children().await;
    }

    /// Unmount rendered children. Cache entries are untouched, so the next
    /// reveal is free unless something invalidated them.
    pub fn hide_replies(&self) {
        let mut cell = self.cell.lock().unwrap();
        if let NodeState::Expanded {
            replies: replies @ Replies::Shown { .. },
        } = &mut cell.state
        {
            *replies = Replies::Hidden { error: None };
        }
    }

    /// Collapse or expand the node.
    ///
    /// Collapsing unmounts descendants (including any open reply form).
    /// Re-expanding restores shown replies when they were visible before —
    /// through the cache, so this refetches only after an invalidation.
    pub async fn toggle_collapse(&self) {
        let restore_replies = {
            let mut cell = self.cell.lock().unwrap();
            match &cell.state {
                NodeState::Collapsed {
                    replies_were_visible,
                } => {
                    let restore = *replies_were_visible;
                    cell.state = NodeState::Expanded {
                        replies: Replies::Hidden { error: None },
                    };
                    restore
                }
                NodeState::Expanded { replies } => {
                    let visible = matches!(replies, Replies::Shown { .. } | Replies::Loading);
                    cell.state = NodeState::Collapsed {
                        replies_were_visible: visible,
                    };
                    cell.replying = false;
                    return;
                }
            }
        };
        if restore_replies {
            self.reveal_replies().await;
        }
    }

    /// Mount the reply form. Forces the node out of collapse and reveals
    /// replies — a reply is composed with its context visible.
    pub async fn start_reply(&self) {
        {
            let mut cell = self.cell.lock().unwrap();
            if let NodeState::Collapsed { .. } = cell.state {
                cell.state = NodeState::Expanded {
                    replies: Replies::Hidden { error: None },
                };
            }
            cell.replying = true;
        }
        self.reveal_replies().await;
    }

    /// Unmount the reply form without side effects.
    pub fn cancel_reply(&self) {
        self.cell.lock().unwrap().replying = false;
    }

    /// To be called after this node's composer submitted successfully.
    ///
    /// Closes the reply form, forces replies visible, and re-fetches this
    /// node's children so the new reply appears immediately. Also
    /// invalidates the list this node appears in — the `reply_count`
    /// rendered for it lives there and is now stale. That propagation is
    /// best-effort: parent node if mounted, the post's root list for
    /// anchored roots, otherwise a no-op.
    pub async fn on_reply_submitted(&self) {
        {
            let mut cell = self.cell.lock().unwrap();
            cell.replying = false;
            cell.state = NodeState::Expanded {
                replies: Replies::Loading,
            };
        }
        // Idempotent with the composer's own post-submit invalidation.
        self.ctx.cache.invalidate(self.id());
        self.fetch_children().await;

        if let Some(parent) = self.parent.upgrade() {
            debug!(node = %self.id(), parent = %parent.id(), "invalidating parent after reply");
            self.ctx.cache.invalidate(parent.id());
        } else if let Some(anchor) = &self.anchor {
            debug!(node = %self.id(), post = %anchor, "invalidating root list after reply");
            self.ctx.cache.invalidate(anchor);
        }
    }

    // ====================================================================
    // Fetch
    // ====================================================================

    /// Resolve the in-flight `Loading` state: serve children from the cache
    /// or the gateway, then settle into `Shown` or `Hidden{error}`.
    async fn fetch_children(&self) {
        let result = match self.ctx.cache.get_fresh(self.id()) {
            Some(list) => Ok(list),
            None => match self.ctx.gateway.list_children(self.id()).await {
                Ok(list) => Ok(self.ctx.cache.fill(self.id(), list)),
                Err(e) => Err(e),
            },
        };

        let mut cell = self.cell.lock().unwrap();
        match result {
            Ok(list) => {
                let children: Vec<Arc<ThreadNode>> = list
                    .iter()
                    .map(|c| self.new_child(c.clone()))
                    .collect();
                match &mut cell.state {
                    NodeState::Expanded {
                        replies: replies @ Replies::Loading,
                    } => {
                        *replies = Replies::Shown { children };
                    }
                    // Collapsed while loading: keep the data cached and
                    // restore shown replies on the next expand.
                    NodeState::Collapsed {
                        replies_were_visible,
                    } => {
                        *replies_were_visible = true;
                    }
                    _ => {}
                }
            }
            Err(e) => {
                warn!(node = %self.id(), error = %e, "failed to load replies");
                if let NodeState::Expanded {
                    replies: replies @ Replies::Loading,
                } = &mut cell.state
                {
                    *replies = Replies::Hidden {
                        error: Some(e.to_string()),
                    };
                }
            }
        }
    }
}
