//! Flux Feed — optimistic post feed engine.
//!
//! Keeps a client-side view of a remote post collection responsive under
//! latency: mutations are applied locally first, the remote call runs on a
//! background task, and its outcome confirms or rolls back the change.
//!
//! # Pieces
//!
//! - [`Post`] / [`FeedState`] — immutable values, replaced wholesale.
//! - [`LiveValue`] — the publisher: one current value, last write wins,
//!   synchronous subscribers plus async `watch`/`wait_for`.
//! - [`OneShotEvent`] — fire-once signal, consumed at most once.
//! - [`PostRepository`] / [`AsyncPostRepository`] — remote storage
//!   boundary, blocking and non-blocking.
//! - [`PostFeed`] — the engine: load, save, like/unlike, remove, draft
//!   editing.
//! - [`MemoryRepository`] — process-local repository with fault
//!   injection, for tests and demos.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flux_feed::{FeedConfig, MemoryRepository, PostFeed};
//!
//! let repo = Arc::new(MemoryRepository::default());
//! let feed = PostFeed::new(repo, FeedConfig::default());
//!
//! feed.data().subscribe(|state| {
//!     println!("posts={} loading={}", state.posts.len(), state.loading);
//! });
//!
//! feed.like_by_id(1, false); // visible immediately
//! ```

pub mod engine;
pub mod error;
pub mod event;
pub mod live;
pub mod memory;
pub mod post;
pub mod repository;
pub mod state;

// Re-export primary types at crate root.
pub use engine::{FeedConfig, PostFeed};
pub use error::{RepositoryError, Result};
pub use event::OneShotEvent;
pub use live::{ChangeHandler, LiveValue, SubscriptionId};
pub use memory::{MemoryRepository, MemoryRepositoryConfig, Operation};
pub use post::Post;
pub use repository::{AsyncPostRepository, Blocking, PostRepository, submit};
pub use state::FeedState;
