//! Repository contract — the boundary to remote post storage.
//!
//! Two forms of the same four operations:
//! - [`PostRepository`] — blocking calls.
//! - [`AsyncPostRepository`] — non-blocking calls, the form the feed
//!   engine consumes.
//!
//! [`Blocking`] lifts any blocking repository into the non-blocking form,
//! and [`submit`] is the callback mirror: it runs one call on its own task
//! and hands the outcome to exactly one of two continuations.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::{RepositoryError, Result};
use crate::post::Post;

/// Blocking access to remote post storage.
pub trait PostRepository: Send + Sync {
    /// Fetch the complete remote collection.
    fn get_all(&self) -> Result<Vec<Post>>;

    /// Flip the like state of `id` and return the authoritative post.
    fn like_by_id(&self, id: i64, like_removed: bool) -> Result<Post>;

    /// Persist a post derived from `post` (create when `post.id == 0`).
    fn save(&self, post: Post) -> Result<()>;

    /// Remove a post.
    fn remove_by_id(&self, id: i64) -> Result<()>;
}

/// Non-blocking access to remote post storage.
///
/// Every call resolves to exactly one outcome.
#[async_trait]
pub trait AsyncPostRepository: Send + Sync {
    /// Fetch every post, newest first.
    async fn get_all_async(&self) -> Result<Vec<Post>>;

    /// Like (`like_removed == false`) or unlike a post; returns the stored post.
    async fn like_by_id_async(&self, id: i64, like_removed: bool) -> Result<Post>;

    /// Create (`id == 0`) or update a post.
    async fn save_async(&self, post: Post) -> Result<()>;

    /// Delete a post by id.
    async fn remove_by_id_async(&self, id: i64) -> Result<()>;
}

/// Runs a blocking [`PostRepository`] on Tokio's blocking pool.
///
/// A panic inside the blocking call is resumed on the awaiting task; it is
/// never reported as a repository error.
pub struct Blocking<R> {
    inner: Arc<R>,
}

impl<R: PostRepository + 'static> Blocking<R> {
    /// Wrap a blocking repository.
    pub fn new(inner: Arc<R>) -> Self {
        Self { inner }
    }

    /// The wrapped blocking repository.
    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    async fn run<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || call(&inner)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(RepositoryError::Transport(format!(
                "blocking call cancelled: {e}"
            ))),
        }
    }
}

#[async_trait]
impl<R: PostRepository + 'static> AsyncPostRepository for Blocking<R> {
    async fn get_all_async(&self) -> Result<Vec<Post>> {
        self.run(|r| r.get_all()).await
    }

    async fn like_by_id_async(&self, id: i64, like_removed: bool) -> Result<Post> {
        self.run(move |r| r.like_by_id(id, like_removed)).await
    }

    async fn save_async(&self, post: Post) -> Result<()> {
        self.run(move |r| r.save(post)).await
    }

    async fn remove_by_id_async(&self, id: i64) -> Result<()> {
        self.run(move |r| r.remove_by_id(id)).await
    }
}

/// Run one repository call on its own task and deliver the outcome.
///
/// Exactly one of `on_success` / `on_error` is invoked, exactly once, when
/// `call` resolves. Returns immediately; the handle may be awaited or
/// dropped (dropping does not cancel the task).
pub fn submit<T, Fut, S, E>(call: Fut, on_success: S, on_error: E) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    S: FnOnce(T) + Send + 'static,
    E: FnOnce(RepositoryError) + Send + 'static,
{
    tokio::spawn(async move {
        match call.await {
            Ok(value) => on_success(value),
            Err(err) => on_error(err),
        }
    })
}
