//! Thread assembly: the root comment list of one post, plus display
//! flattening.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::cache::ThreadCache;
use crate::composer::ReplyComposer;
use crate::gateway::CommentGateway;
use crate::model::{Comment, Id};
use crate::node::{ThreadCtx, ThreadNode};

/// Nesting levels after which rows stop indenting further. Purely visual;
/// the data model nests without bound and deeper replies behave identically.
pub const INDENT_CAP: usize = 2;

/// Root comment list state. Mirrors the per-node reply sub-states.
enum Roots {
    NotLoaded,
    Loading,
    Shown(Vec<Arc<ThreadNode>>),
    Failed(String),
}

/// One row of a flattened thread, ready for a front-end to draw.
#[derive(Debug, Clone)]
pub struct ThreadItem {
    pub comment: Comment,
    /// Structural depth, unbounded.
    pub depth: usize,
    /// Visual indent, capped at [`INDENT_CAP`].
    pub indent: usize,
    pub collapsed: bool,
    pub replies_visible: bool,
    pub loading: bool,
    pub replying: bool,
    pub error: Option<String>,
}

/// The top-level orchestrator for one post's comment thread.
///
/// Owns the root `ThreadNode`s and a [`ReplyComposer`] bound to the post.
/// After a top-level reply is submitted, call
/// [`on_top_level_reply_submitted`](Self::on_top_level_reply_submitted): it
/// re-fetches the root list, and because the composer invalidated the
/// post's cache entry, the invalidation hooks already told any feed cache
/// that its aggregate comment count is stale (refreshing that feed is the
/// collaborator's job, not ours).
pub struct ThreadView {
    post: Comment,
    ctx: Arc<ThreadCtx>,
    composer: ReplyComposer,
    roots: Mutex<Roots>,
    viewed: AtomicBool,
}

impl ThreadView {
    /// Mount a thread view for `post`, with a composer bound to the post id.
    pub fn open(
        post: Comment,
        forum_id: Id,
        gateway: Arc<dyn CommentGateway>,
        cache: Arc<ThreadCache>,
    ) -> Self {
        let ctx = Arc::new(ThreadCtx {
            gateway: Arc::clone(&gateway),
            cache: Arc::clone(&cache),
            forum_id: forum_id.clone(),
        });
        let composer = ReplyComposer::new(post.id.clone(), forum_id, gateway, cache);
        Self {
            post,
            ctx,
            composer,
            roots: Mutex::new(Roots::NotLoaded),
            viewed: AtomicBool::new(false),
        }
    }

    pub fn post(&self) -> &Comment {
        &self.post
    }

    /// The composer for top-level replies to this post.
    pub fn composer(&self) -> &ReplyComposer {
        &self.composer
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.roots.lock().unwrap(), Roots::Loading)
    }

    /// Error from the last failed root fetch, if any.
    pub fn load_error(&self) -> Option<String> {
        match &*self.roots.lock().unwrap() {
            Roots::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Root-level nodes (empty until loaded).
    pub fn roots(&self) -> Vec<Arc<ThreadNode>> {
        match &*self.roots.lock().unwrap() {
            Roots::Shown(nodes) => nodes.clone(),
            _ => Vec::new(),
        }
    }

    /// Fetch and render the post's root comments.
    ///
    /// Cache-backed like a node reveal; a load observed while one is in
    /// flight is a no-op. A failure lands in
    /// [`load_error`](Self::load_error) and calling again retries.
    pub async fn load(&self) {
        {
            let mut roots = self.roots.lock().unwrap();
            if matches!(*roots, Roots::Loading) {
                return;
            }
            *roots = Roots::Loading;
        }
        self.fetch_roots().await;
    }

    /// Tell the API the post was viewed. Fires at most once per mounted
    /// view; failures are logged and swallowed (fire-and-forget).
    pub async fn mark_viewed(&self) {
        if self.viewed.swap(true, Ordering::Relaxed) {
            return;
        }
        if let Err(e) = self.ctx.gateway.mark_viewed(&self.post.id).await {
            debug!(post = %self.post.id, error = %e, "mark-viewed failed");
        }
    }

    /// Re-fetch the root list after a successful top-level submit.
    ///
    /// The composer already invalidated the post's cache entry (which also
    /// signalled the invalidation hooks), so this fetch goes to the
    /// network.
    pub async fn on_top_level_reply_submitted(&self) {
        *self.roots.lock().unwrap() = Roots::Loading;
        self.fetch_roots().await;
    }

    async fn fetch_roots(&self) {
        let result = match self.ctx.cache.get_fresh(&self.post.id) {
            Some(list) => Ok(list),
            None => match self.ctx.gateway.list_children(&self.post.id).await {
                Ok(list) => Ok(self.ctx.cache.fill(&self.post.id, list)),
                Err(e) => Err(e),
            },
        };

        let mut roots = self.roots.lock().unwrap();
        match result {
            Ok(list) => {
                let nodes = list
                    .iter()
                    .map(|c| {
                        ThreadNode::new_root_under(
                            c.clone(),
                            self.post.id.clone(),
                            Arc::clone(&self.ctx),
                        )
                    })
                    .collect();
                *roots = Roots::Shown(nodes);
            }
            Err(e) => {
                warn!(post = %self.post.id, error = %e, "failed to load comments");
                *roots = Roots::Failed(e.to_string());
            }
        }
    }

    /// Flatten the thread into display rows.
    ///
    /// Collapsed nodes contribute their own row but none of their
    /// descendants. Depth keeps counting past [`INDENT_CAP`]; only the
    /// indent stops growing.
    pub fn items(&self) -> Vec<ThreadItem> {
        let mut items = Vec::new();
        for root in self.roots() {
            flatten_into(&root, &mut items);
        }
        items
    }
}

fn flatten_into(node: &Arc<ThreadNode>, items: &mut Vec<ThreadItem>) {
    let collapsed = node.is_collapsed();
    items.push(ThreadItem {
        comment: node.comment().clone(),
        depth: node.depth(),
        indent: node.depth().min(INDENT_CAP),
        collapsed,
        replies_visible: node.replies_visible(),
        loading: node.is_loading(),
        replying: node.is_replying(),
        error: node.fetch_error(),
    });
    if collapsed {
        return;
    }
    for child in node.children() {
        flatten_into(&child, items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::{BoxFuture, ProgressFn};
    use crate::model::{NewComment, Sender};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU64;

    fn sender() -> Sender {
        Sender {
            id: Id::new("u1"),
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            avatar: None,
        }
    }

    fn comment(id: &str, parent: Option<&str>, reply_count: u32) -> Comment {
        Comment {
            id: Id::new(id),
            parent_id: parent.map(Id::new),
            content: format!("comment {id}"),
            image: None,
            file: None,
            reply_count,
            created_at: "2025-11-02T10:00:00Z".into(),
            sender: sender(),
        }
    }

    /// Gateway with a fixed parent→children table and call counters.
    struct TableGateway {
        table: HashMap<String, Vec<Comment>>,
        list_calls: AtomicU64,
        viewed_calls: AtomicU64,
    }

    impl TableGateway {
        fn new(table: HashMap<String, Vec<Comment>>) -> Arc<Self> {
            Arc::new(Self {
                table,
                list_calls: AtomicU64::new(0),
                viewed_calls: AtomicU64::new(0),
            })
        }
    }

    impl CommentGateway for TableGateway {
        fn fetch_post(&self, _id: &Id) -> BoxFuture<Result<Comment, GatewayError>> {
            unimplemented!("not used by thread tests")
        }

        fn list_children(&self, parent_id: &Id) -> BoxFuture<Result<Vec<Comment>, GatewayError>> {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            let children = self.table.get(parent_id.as_str()).cloned().unwrap_or_default();
            Box::pin(async move { Ok(children) })
        }

        fn create_comment(
            &self,
            _req: NewComment,
            _progress: Option<ProgressFn>,
        ) -> BoxFuture<Result<Comment, GatewayError>> {
            unimplemented!("not used by thread tests")
        }

        fn mark_viewed(&self, _post_id: &Id) -> BoxFuture<Result<(), GatewayError>> {
            self.viewed_calls.fetch_add(1, Ordering::Relaxed);
            Box::pin(async { Ok(()) })
        }
    }

    fn deep_table() -> HashMap<String, Vec<Comment>> {
        // post "1" → "2" → "3" → "4" → "5" (one chain, depth 4).
        let mut table = HashMap::new();
        table.insert("1".into(), vec![comment("2", Some("1"), 1)]);
        table.insert("2".into(), vec![comment("3", Some("2"), 1)]);
        table.insert("3".into(), vec![comment("4", Some("3"), 1)]);
        table.insert("4".into(), vec![comment("5", Some("4"), 0)]);
        table
    }

    fn view(gateway: Arc<TableGateway>) -> ThreadView {
        ThreadView::open(
            comment("1", None, 1),
            Id::new("forum"),
            gateway,
            Arc::new(ThreadCache::new()),
        )
    }

    // ========================================================================
    // Load
    // ========================================================================

    #[tokio::test]
    async fn load_renders_root_comments() {
        let mut table = HashMap::new();
        table.insert(
            "1".into(),
            vec![comment("2", Some("1"), 0), comment("3", Some("1"), 0)],
        );
        let gw = TableGateway::new(table);
        let v = view(Arc::clone(&gw));

        v.load().await;
        assert_eq!(v.roots().len(), 2);
        assert_eq!(gw.list_calls.load(Ordering::Relaxed), 1);

        let items = v.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].depth, 0);
        assert_eq!(items[0].indent, 0);
    }

    #[tokio::test]
    async fn mark_viewed_fires_once() {
        let gw = TableGateway::new(HashMap::new());
        let v = view(Arc::clone(&gw));

        v.mark_viewed().await;
        v.mark_viewed().await;
        v.mark_viewed().await;
        assert_eq!(gw.viewed_calls.load(Ordering::Relaxed), 1);
    }

    // ========================================================================
    // Top-level reply refresh
    // ========================================================================

    #[tokio::test]
    async fn top_level_reply_refetches_roots() {
        let mut table = HashMap::new();
        table.insert("1".into(), vec![comment("2", Some("1"), 0)]);
        let gw = TableGateway::new(table);
        let cache = Arc::new(ThreadCache::new());
        let v = ThreadView::open(
            comment("1", None, 1),
            Id::new("forum"),
            gw.clone(),
            Arc::clone(&cache),
        );

        v.load().await;
        assert_eq!(gw.list_calls.load(Ordering::Relaxed), 1);

        // What the composer does on success.
        cache.invalidate(&Id::new("1"));
        v.on_top_level_reply_submitted().await;
        assert_eq!(gw.list_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn invalidation_hook_carries_the_feed_signal() {
        let gw = TableGateway::new(HashMap::new());
        let cache = Arc::new(ThreadCache::new());
        let signalled = Arc::new(AtomicU64::new(0));
        let s = signalled.clone();
        cache.on_invalidate(move |id| {
            if id.as_str() == "1" {
                s.fetch_add(1, Ordering::Relaxed);
            }
        });
        let v = ThreadView::open(
            comment("1", None, 0),
            Id::new("forum"),
            gw,
            Arc::clone(&cache),
        );

        // The composer's post-submit invalidation is the signal source.
        cache.invalidate(&v.post().id);
        assert_eq!(signalled.load(Ordering::Relaxed), 1);
    }

    // ========================================================================
    // Flattening
    // ========================================================================

    #[tokio::test]
    async fn indent_caps_while_depth_keeps_counting() {
        let gw = TableGateway::new(deep_table());
        let v = view(gw);

        v.load().await;
        // Reveal the whole chain.
        let mut frontier = v.roots();
        while let Some(node) = frontier.pop() {
            node.reveal_replies().await;
            frontier.extend(node.children());
        }

        let items = v.items();
        assert_eq!(items.len(), 4);
        let depths: Vec<usize> = items.iter().map(|i| i.depth).collect();
        let indents: Vec<usize> = items.iter().map(|i| i.indent).collect();
        assert_eq!(depths, vec![0, 1, 2, 3]);
        assert_eq!(indents, vec![0, 1, 2, 2]); // capped at 2
    }

    #[tokio::test]
    async fn collapsed_node_hides_descendants_from_items() {
        let gw = TableGateway::new(deep_table());
        let v = view(gw);

        v.load().await;
        let root = v.roots()[0].clone();
        root.reveal_replies().await;
        let child = root.children()[0].clone();
        child.reveal_replies().await;
        assert_eq!(v.items().len(), 3);

        root.toggle_collapse().await;
        let items = v.items();
        // Root row remains, descendants gone.
        assert_eq!(items.len(), 1);
        assert!(items[0].collapsed);
    }
}
