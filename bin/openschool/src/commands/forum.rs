//! Forum thread commands — mount the view-model and drive it from the
//! terminal.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use openschool_client::HttpGateway;
use openschool_forum::{
    Attachment, CommentGateway, Id, ReplyComposer, ReplyDraft, ThreadCache, ThreadNode,
    ThreadView,
};

use crate::config::{ClientConfig, Context};

fn current_context(client_config_path: &Path) -> Result<Context> {
    let config = ClientConfig::load(client_config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `openschool use <name>`."))?
        .clone();
    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `openschool context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }
    Ok(ctx)
}

fn gateway_for(ctx: &Context) -> Result<Arc<dyn CommentGateway>> {
    let token = if ctx.token.is_empty() {
        None
    } else {
        Some(ctx.token.as_str())
    };
    Ok(Arc::new(HttpGateway::connect(&ctx.server, token)?))
}

/// Print a post's comment thread, revealing `depth` reply levels.
pub async fn view(post_id: &str, forum_id: &str, depth: usize, client_config_path: &Path) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let gateway = gateway_for(&ctx)?;

    let post = gateway.fetch_post(&Id::new(post_id)).await?;
    let view = ThreadView::open(
        post,
        Id::new(forum_id),
        Arc::clone(&gateway),
        Arc::new(ThreadCache::new()),
    );

    view.mark_viewed().await;
    view.load().await;
    if let Some(e) = view.load_error() {
        anyhow::bail!("failed to load comments: {}", e);
    }
    reveal_to_depth(view.roots(), depth).await;

    let post = view.post();
    println!("{} — {}", post.sender.display_name(), post.content);
    if let Some(url) = &post.image {
        println!("  [image] {}", url);
    }
    if let Some(url) = &post.file {
        println!("  [file] {}", url);
    }

    for item in view.items() {
        let pad = "  ".repeat(item.indent + 1);
        print!(
            "{}{}: {}",
            pad,
            item.comment.sender.display_name(),
            item.comment.content
        );
        if let Some(url) = &item.comment.image {
            print!("  [image] {}", url);
        }
        if let Some(url) = &item.comment.file {
            print!("  [file] {}", url);
        }
        if item.comment.has_replies() && !item.replies_visible {
            print!("  ({} replies)", item.comment.reply_count);
        }
        if let Some(e) = &item.error {
            print!("  [failed to load replies: {}]", e);
        }
        println!();
    }
    Ok(())
}

/// Reveal replies breadth-first until `depth` levels below the roots.
async fn reveal_to_depth(roots: Vec<Arc<ThreadNode>>, depth: usize) {
    let mut queue: VecDeque<Arc<ThreadNode>> = roots.into();
    while let Some(node) = queue.pop_front() {
        if node.depth() >= depth {
            continue;
        }
        if node.reply_count() > 0 {
            node.reveal_replies().await;
            if let Some(e) = node.fetch_error() {
                warn!(node = %node.id(), error = %e, "could not reveal replies");
            }
        }
        queue.extend(node.children());
    }
}

/// Submit a reply under a post or comment.
pub async fn reply(
    parent_id: &str,
    forum_id: &str,
    message: Option<&str>,
    image: Option<&Path>,
    file: Option<&Path>,
    client_config_path: &Path,
) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let gateway = gateway_for(&ctx)?;

    let composer = ReplyComposer::new(
        Id::new(parent_id),
        Id::new(forum_id),
        gateway,
        Arc::new(ThreadCache::new()),
    );
    composer.on_progress(|pct| {
        eprint!("\rupload {:3}%", pct);
        let _ = io::stderr().flush();
    });

    let draft = ReplyDraft {
        content: message.unwrap_or_default().to_string(),
        image: image.map(load_attachment).transpose()?,
        file: file.map(load_attachment).transpose()?,
    };

    match composer.submit(draft).await {
        Ok(comment) => {
            eprintln!();
            println!("Reply {} created.", comment.id);
            Ok(())
        }
        Err(e) if e.is_validation() => anyhow::bail!("invalid reply: {}", e),
        Err(e) => anyhow::bail!("submit failed: {}", e),
    }
}

fn load_attachment(path: &Path) -> Result<Attachment> {
    let data = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    Ok(Attachment::new(file_name, mime_for(path), data))
}

/// Best-effort content type from the file extension; the server sniffs the
/// real type anyway.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
        .as_str()
    {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
