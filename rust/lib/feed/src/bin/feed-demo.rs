//! `feed-demo` — drives the optimistic feed against the in-memory
//! repository and logs every published state.
//!
//! Usage:
//!   feed-demo [--latency-ms 300] [--fail-likes] [--fail-deletes]
//!
//! Log level follows `RUST_LOG` (default `info`).

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use flux_feed::{
    FeedConfig, MemoryRepository, MemoryRepositoryConfig, Operation, Post, PostFeed,
};

/// Optimistic feed demo.
#[derive(Parser, Debug)]
#[command(name = "feed-demo", about = "Optimistic post feed demo")]
struct Cli {
    /// Simulated repository latency in milliseconds.
    #[arg(long = "latency-ms", default_value_t = 300)]
    latency_ms: u64,

    /// Make the like request fail (the local change stays, error is raised).
    #[arg(long = "fail-likes")]
    fail_likes: bool,

    /// Make the delete request fail (the post comes back).
    #[arg(long = "fail-deletes")]
    fail_deletes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let repo = Arc::new(MemoryRepository::new(MemoryRepositoryConfig {
        latency: Duration::from_millis(cli.latency_ms),
        author: "Student".to_string(),
        ..Default::default()
    }));
    seed_data(&repo);
    info!("Seeded {} posts", repo.posts().len());

    let feed = PostFeed::new(repo.clone(), FeedConfig::default());

    feed.data().subscribe(|state| {
        let summary: Vec<String> = state
            .posts
            .iter()
            .map(|p| format!("#{}({}{})", p.id, p.likes, if p.liked_by_me { "*" } else { "" }))
            .collect();
        info!(
            "feed: loading={} empty={} error={} posts=[{}]",
            state.loading,
            state.empty,
            state.error,
            summary.join(" ")
        );
    });
    feed.edited().subscribe(|draft| {
        info!("draft: id={} content={:?}", draft.id, draft.content);
    });

    feed.data().wait_for(|s| !s.loading).await;

    // Compose and publish a post, then reload to see it.
    feed.change_content("  Hello from the optimistic feed!  ");
    if let Some(handle) = feed.save() {
        handle.await?;
    }
    feed.post_created().recv().await;
    info!("Post created");
    feed.load_posts().await?;

    // Like the newest post.
    if cli.fail_likes {
        repo.fail_next(Operation::Like);
    }
    if let Some(first) = feed.data().get().posts.first().cloned() {
        feed.like_by_id(first.id, first.liked_by_me).await?;
    }

    // Delete the oldest post.
    if cli.fail_deletes {
        repo.fail_next(Operation::Remove);
    }
    if let Some(last) = feed.data().get().posts.last().cloned() {
        feed.remove_by_id(last.id).await?;
    }

    for op in Operation::ALL {
        info!("{op:?}: {} repository calls", repo.calls(op));
    }
    Ok(())
}

fn seed_data(repo: &MemoryRepository) {
    repo.seed(vec![
        Post {
            id: 2,
            content: "Second post: optimistic updates hide latency.".to_string(),
            author: "Netology".to_string(),
            liked_by_me: true,
            likes: 12,
            published: "22 May at 10:00".to_string(),
        },
        Post {
            id: 1,
            content: "First post.".to_string(),
            author: "Netology".to_string(),
            liked_by_me: false,
            likes: 3,
            published: "21 May at 18:36".to_string(),
        },
    ]);
}
