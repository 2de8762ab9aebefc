//! End-to-end view-model flow against an in-memory gateway:
//! open a thread, reveal replies, submit replies, watch caches invalidate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use openschool_forum::{
    Attachment, BoxFuture, Comment, CommentGateway, GatewayError, Id, NewComment, ProgressFn,
    ReplyComposer, ReplyDraft, Sender, ThreadCache, ThreadView,
};

fn sender() -> Sender {
    Sender {
        id: Id::new("u1"),
        first_name: "Ada".into(),
        last_name: "Byron".into(),
        avatar: None,
    }
}

fn seed_comment(id: &str, parent: Option<&str>, content: &str) -> Comment {
    Comment {
        id: Id::new(id),
        parent_id: parent.map(Id::new),
        content: content.into(),
        image: None,
        file: None,
        reply_count: 0,
        created_at: format!("2025-11-02T10:00:{:02}Z", id.len()),
        sender: sender(),
    }
}

/// A gateway backed by a vector of comments, like the API would hold.
/// Creates assign ids and bump the parent's reply_count server-side.
struct InMemoryGateway {
    comments: Mutex<Vec<Comment>>,
    next_id: AtomicU64,
    list_calls: AtomicU64,
    create_calls: AtomicU64,
}

impl InMemoryGateway {
    fn new(seed: Vec<Comment>) -> Arc<Self> {
        Arc::new(Self {
            comments: Mutex::new(seed),
            next_id: AtomicU64::new(100),
            list_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
        })
    }

    fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::Relaxed)
    }
}

impl CommentGateway for InMemoryGateway {
    fn fetch_post(&self, id: &Id) -> BoxFuture<Result<Comment, GatewayError>> {
        let found = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.id == id)
            .cloned();
        Box::pin(async move {
            found.ok_or_else(|| GatewayError::Api {
                status: 404,
                code: "NOT_FOUND".into(),
                message: "post not found".into(),
            })
        })
    }

    fn list_children(&self, parent_id: &Id) -> BoxFuture<Result<Vec<Comment>, GatewayError>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let children: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect();
        Box::pin(async move { Ok(children) })
    }

    fn create_comment(
        &self,
        req: NewComment,
        progress: Option<ProgressFn>,
    ) -> BoxFuture<Result<Comment, GatewayError>> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let created = Comment {
            id: Id::new(id.to_string()),
            parent_id: Some(req.parent_id.clone()),
            content: req.content,
            image: req.image.as_ref().map(|a| format!("https://cdn/{}", a.file_name)),
            file: req.file.as_ref().map(|a| format!("https://cdn/{}", a.file_name)),
            reply_count: 0,
            created_at: "2025-11-02T11:00:00Z".into(),
            sender: sender(),
        };
        {
            let mut comments = self.comments.lock().unwrap();
            if let Some(parent) = comments.iter_mut().find(|c| c.id == req.parent_id) {
                parent.reply_count += 1;
            }
            comments.push(created.clone());
        }
        Box::pin(async move {
            if let Some(p) = progress {
                p(100);
            }
            Ok(created)
        })
    }

    fn mark_viewed(&self, _post_id: &Id) -> BoxFuture<Result<(), GatewayError>> {
        Box::pin(async { Ok(()) })
    }
}

fn seeded_gateway() -> Arc<InMemoryGateway> {
    InMemoryGateway::new(vec![
        seed_comment("1", None, "welcome to the forum"),
        seed_comment("2", Some("1"), "first"),
        seed_comment("3", Some("1"), "second"),
    ])
}

#[tokio::test]
async fn reply_round_trip_shows_new_comment() {
    let gw = seeded_gateway();
    let cache = Arc::new(ThreadCache::new());
    let view = ThreadView::open(
        seed_comment("1", None, "welcome to the forum"),
        Id::new("f1"),
        gw.clone(),
        Arc::clone(&cache),
    );

    view.load().await;
    assert_eq!(view.roots().len(), 2);
    assert_eq!(gw.list_calls(), 1);

    // Submit a top-level reply through the view's composer.
    let created = view
        .composer()
        .submit(ReplyDraft::text("third"))
        .await
        .unwrap();
    assert_eq!(created.content, "third");
    assert_eq!(gw.create_calls(), 1);

    // The composer invalidated the post's entry; the refresh refetches.
    view.on_top_level_reply_submitted().await;
    assert_eq!(gw.list_calls(), 2);

    let items = view.items();
    assert_eq!(items.len(), 3);
    assert!(items.iter().any(|i| i.comment.content == "third"));
}

#[tokio::test]
async fn nested_reply_appears_under_its_node_and_stales_the_root_list() {
    let gw = seeded_gateway();
    let cache = Arc::new(ThreadCache::new());
    let view = ThreadView::open(
        seed_comment("1", None, "welcome to the forum"),
        Id::new("f1"),
        gw.clone(),
        Arc::clone(&cache),
    );
    view.load().await;

    let node = view
        .roots()
        .into_iter()
        .find(|n| n.id().as_str() == "2")
        .unwrap();
    node.start_reply().await;
    assert!(node.is_replying());
    assert!(node.replies_visible());

    let composer = ReplyComposer::new(
        node.id().clone(),
        Id::new("f1"),
        gw.clone(),
        Arc::clone(&cache),
    );
    composer.submit(ReplyDraft::text("a nested answer")).await.unwrap();
    node.on_reply_submitted().await;

    // The new reply is rendered under its node...
    let children = node.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].comment().content, "a nested answer");
    assert_eq!(children[0].depth(), 1);

    // ...and the root list (which renders node 2's reply count) was staled.
    assert!(!cache.contains_fresh(&Id::new("1")));

    // A fresh fetch of the root list carries the bumped count.
    view.on_top_level_reply_submitted().await;
    let refreshed = view
        .roots()
        .into_iter()
        .find(|n| n.id().as_str() == "2")
        .unwrap();
    assert_eq!(refreshed.reply_count(), 1);
}

#[tokio::test]
async fn attachment_reply_round_trips_urls() {
    let gw = seeded_gateway();
    let cache = Arc::new(ThreadCache::new());
    let composer = ReplyComposer::new(Id::new("1"), Id::new("f1"), gw.clone(), cache);
    let last_progress = Arc::new(AtomicU64::new(0));
    let p = last_progress.clone();
    composer.on_progress(move |pct| {
        p.store(pct as u64, Ordering::Relaxed);
    });

    let draft = ReplyDraft {
        content: String::new(),
        image: Some(Attachment::new("chart.png", "image/png", vec![0u8; 2048])),
        file: None,
    };
    let created = composer.submit(draft).await.unwrap();
    assert_eq!(created.image.as_deref(), Some("https://cdn/chart.png"));
    assert_eq!(last_progress.load(Ordering::Relaxed), 100);
    assert!(!composer.state().busy);
}
