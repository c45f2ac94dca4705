//! `posts-board` - terminal front end for the posts board.
//!
//! # Commands
//! - `posts-board list` - show the first posts
//! - `posts-board create` - create the demo post
//! - `posts-board put <ID>` / `patch <ID>` / `delete <ID>` - act on one post
//! - `posts-board demo` - fire every action at once and redraw as they settle

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use posts_board::{PostRow, PostsBoard};
use posts_core::{PostsApi, ReqwestTransport, Transport, DEFAULT_BASE_URL};
use tracing::info;

#[derive(Parser)]
#[command(name = "posts-board")]
#[command(author, version, about = "Browse and edit posts on a JSON REST service")]
struct Cli {
    /// Base URL of the service
    #[arg(long, env = "POSTS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the post list
    List,

    /// Create the demo post
    Create,

    /// Replace a post
    Put {
        /// Post id
        id: u64,
    },

    /// Patch a post's title
    Patch {
        /// Post id
        id: u64,
    },

    /// Delete a post
    Delete {
        /// Post id
        id: u64,
    },

    /// Run every action concurrently on the first post
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(base_url = %cli.base_url, "starting");

    let board = PostsBoard::new(PostsApi::new(&cli.base_url), Arc::new(ReqwestTransport::new()));
    run(&board, cli.command, &mut std::io::stdout().lock()).await
}

/// Load the list, then carry out `command` and print the board to `out`.
///
/// Writes go ahead even when the list failed to load; only `list` and
/// `demo` depend on it.
async fn run<T, W>(board: &PostsBoard<T>, command: Commands, out: &mut W) -> Result<()>
where
    T: Transport,
    W: Write,
{
    let listed = board.load().await.is_some();

    match command {
        Commands::List => {
            write!(out, "{}", board.render())?;
            if !listed {
                bail!("could not load posts from {}", board.api().posts_url());
            }
            return Ok(());
        }
        Commands::Create => {
            board.create().await;
        }
        Commands::Put { id } => {
            board.replace(id).await;
        }
        Commands::Patch { id } => {
            board.patch(id).await;
        }
        Commands::Delete { id } => {
            board.delete(id).await;
        }
        Commands::Demo => return demo(board, out).await,
    }

    write!(out, "{}", board.render())?;
    Ok(())
}

async fn demo<T, W>(board: &PostsBoard<T>, out: &mut W) -> Result<()>
where
    T: Transport,
    W: Write,
{
    let Some(id) = board.view().posts.iter().find_map(PostRow::numeric_id) else {
        write!(out, "{}", board.render())?;
        bail!("no posts to act on");
    };

    let mut changes = board.subscribe();
    let actions = async {
        tokio::join!(board.create(), board.replace(id), board.patch(id), board.delete(id));
    };
    tokio::pin!(actions);

    loop {
        tokio::select! {
            _ = &mut actions => break,
            alive = changes.changed() => {
                if !alive {
                    break;
                }
                writeln!(out, "{}", board.render())?;
            }
        }
    }

    write!(out, "{}", board.render())?;
    Ok(())
}
