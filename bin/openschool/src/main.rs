//! `openschool` — CLI client for an OpenSchool server.
//!
//! Manages contexts and authentication, and drives the forum thread
//! view-model from the terminal.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// OpenSchool CLI tool.
#[derive(Parser, Debug)]
#[command(name = "openschool", about = "OpenSchool CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.openschool/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts (server connections).
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        /// Context name.
        name: String,
    },

    /// Login to the current context's server.
    Login {
        /// Username.
        #[arg(long)]
        user: String,
        /// Password (not recommended — omit for an interactive prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Logout — clear token from current context.
    Logout,

    /// Forum threads.
    Forum {
        #[command(subcommand)]
        action: ForumAction,
    },
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Register a context or update its server URL.
    Set {
        /// Context name.
        name: String,
        /// Server URL (e.g. "https://school.example.org/api").
        #[arg(long)]
        server: String,
    },
    /// List contexts.
    List,
    /// Delete a context.
    Delete {
        /// Context name.
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum ForumAction {
    /// Print a post's comment thread.
    View {
        /// Post id.
        post: String,
        /// Forum the post belongs to.
        #[arg(long)]
        forum: String,
        /// Reply levels to reveal below the roots (0 = roots only).
        #[arg(long, default_value_t = 2)]
        depth: usize,
    },
    /// Reply to a post or comment.
    Reply {
        /// Parent post/comment id.
        parent: String,
        /// Forum the parent belongs to.
        #[arg(long)]
        forum: String,
        /// Reply text.
        #[arg(long, short = 'm')]
        message: Option<String>,
        /// Attach an image (up to 8 MiB).
        #[arg(long)]
        image: Option<PathBuf>,
        /// Attach a file (up to 100 MiB).
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Set { name, server } => {
                commands::context::set(&name, &server, &config_path)
            }
            ContextAction::List => commands::context::list(&config_path),
            ContextAction::Delete { name } => commands::context::delete(&name, &config_path),
        },
        Commands::Use { name } => commands::context::use_context(&name, &config_path),
        Commands::Login { user, password } => {
            commands::login::login(&user, password.as_deref(), &config_path).await
        }
        Commands::Logout => commands::login::logout(&config_path),
        Commands::Forum { action } => match action {
            ForumAction::View { post, forum, depth } => {
                commands::forum::view(&post, &forum, depth, &config_path).await
            }
            ForumAction::Reply {
                parent,
                forum,
                message,
                image,
                file,
            } => {
                commands::forum::reply(
                    &parent,
                    &forum,
                    message.as_deref(),
                    image.as_deref(),
                    file.as_deref(),
                    &config_path,
                )
                .await
            }
        },
    }
}
