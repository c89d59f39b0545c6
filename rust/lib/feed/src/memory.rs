//! In-memory post repository.
//!
//! Process-local stand-in for remote storage, implementing both
//! [`PostRepository`] and [`AsyncPostRepository`]. Besides plain storage it
//! offers fault injection (`fail_next`, `set_offline`), per-operation call
//! counters, artificial latency, and gates (`hold` / `release`) that park
//! non-blocking calls so a caller can observe in-flight state.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{RepositoryError, Result};
use crate::post::Post;
use crate::repository::{AsyncPostRepository, PostRepository};

/// Repository operations, for fault injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAll,
    Like,
    Save,
    Remove,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::GetAll,
        Operation::Like,
        Operation::Save,
        Operation::Remove,
    ];

    fn index(self) -> usize {
        match self {
            Operation::GetAll => 0,
            Operation::Like => 1,
            Operation::Save => 2,
            Operation::Remove => 3,
        }
    }
}

/// Configuration for the in-memory repository.
#[derive(Debug, Clone)]
pub struct MemoryRepositoryConfig {
    /// Delay applied to every call before it takes effect.
    pub latency: Duration,
    /// Author stamped on newly created posts.
    pub author: String,
    /// Publication label stamped on newly created posts.
    pub published: String,
}

impl Default for MemoryRepositoryConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            author: "Me".to_string(),
            published: "now".to_string(),
        }
    }
}

struct Storage {
    /// Newest first.
    posts: Vec<Post>,
    next_id: i64,
    offline: bool,
    fail_next: HashSet<Operation>,
}

/// Process-local post storage.
pub struct MemoryRepository {
    config: MemoryRepositoryConfig,
    storage: Mutex<Storage>,
    calls: [AtomicU64; 4],
    /// `true` while calls of that operation are held.
    gates: [watch::Sender<bool>; 4],
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new(config: MemoryRepositoryConfig) -> Self {
        Self {
            config,
            storage: Mutex::new(Storage {
                posts: Vec::new(),
                next_id: 1,
                offline: false,
                fail_next: HashSet::new(),
            }),
            calls: std::array::from_fn(|_| AtomicU64::new(0)),
            gates: std::array::from_fn(|_| watch::channel(false).0),
        }
    }

    /// Replace the stored posts. Order is kept as given; later creates get
    /// IDs above the highest seeded one.
    pub fn seed(&self, posts: Vec<Post>) {
        let mut storage = self.storage.lock().unwrap();
        storage.next_id = posts.iter().map(|p| p.id).max().unwrap_or(0).max(0) + 1;
        storage.posts = posts;
    }

    /// Snapshot of the stored posts.
    pub fn posts(&self) -> Vec<Post> {
        self.storage.lock().unwrap().posts.clone()
    }

    /// Number of calls (blocking and non-blocking) made for `op`.
    pub fn calls(&self, op: Operation) -> u64 {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Make the next call of `op` fail with a transport error.
    pub fn fail_next(&self, op: Operation) {
        self.storage.lock().unwrap().fail_next.insert(op);
    }

    /// While offline, every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.storage.lock().unwrap().offline = offline;
    }

    /// Park non-blocking calls of `op` until `release(op)`.
    ///
    /// Blocking calls are not affected.
    pub fn hold(&self, op: Operation) {
        self.gates[op.index()].send_replace(true);
    }

    /// Let held calls of `op` proceed.
    pub fn release(&self, op: Operation) {
        self.gates[op.index()].send_replace(false);
    }

    fn record(&self, op: Operation) {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
    }

    async fn pass_gate(&self, op: Operation) {
        let mut rx = self.gates[op.index()].subscribe();
        // The sender is owned by `self`, so this cannot observe a close.
        let _ = rx.wait_for(|held| !*held).await;
    }

    /// Apply fault injection, then run `f` against storage.
    fn apply<T>(&self, op: Operation, f: impl FnOnce(&mut Storage) -> Result<T>) -> Result<T> {
        let mut storage = self.storage.lock().unwrap();
        if storage.offline {
            return Err(RepositoryError::Transport("offline".into()));
        }
        if storage.fail_next.remove(&op) {
            return Err(RepositoryError::Transport(format!("injected {op:?} failure")));
        }
        f(&mut storage)
    }

    fn do_get_all(&self) -> Result<Vec<Post>> {
        self.apply(Operation::GetAll, |s| Ok(s.posts.clone()))
    }

    fn do_like(&self, id: i64, like_removed: bool) -> Result<Post> {
        self.apply(Operation::Like, |s| {
            let post = s
                .posts
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(RepositoryError::NotFound(id))?;
            // Only flip when the stored state differs from the requested one.
            if post.liked_by_me == like_removed {
                *post = post.with_like_toggled(like_removed);
            }
            Ok(post.clone())
        })
    }

    fn do_save(&self, post: Post) -> Result<()> {
        let content = post.content.trim().to_string();
        self.apply(Operation::Save, |s| {
            if post.id == 0 {
                let created = Post {
                    id: s.next_id,
                    content,
                    author: self.config.author.clone(),
                    liked_by_me: false,
                    likes: 0,
                    published: self.config.published.clone(),
                };
                s.next_id += 1;
                debug!("memory repository: created post {}", created.id);
                s.posts.insert(0, created);
                return Ok(());
            }
            let existing = s
                .posts
                .iter_mut()
                .find(|p| p.id == post.id)
                .ok_or(RepositoryError::NotFound(post.id))?;
            *existing = existing.with_content(content);
            Ok(())
        })
    }

    fn do_remove(&self, id: i64) -> Result<()> {
        self.apply(Operation::Remove, |s| {
            s.posts.retain(|p| p.id != id);
            Ok(())
        })
    }

    fn sleep_blocking(&self) {
        if !self.config.latency.is_zero() {
            std::thread::sleep(self.config.latency);
        }
    }

    async fn sleep_async(&self, op: Operation) {
        self.pass_gate(op).await;
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(MemoryRepositoryConfig::default())
    }
}

impl PostRepository for MemoryRepository {
    fn get_all(&self) -> Result<Vec<Post>> {
        self.record(Operation::GetAll);
        self.sleep_blocking();
        self.do_get_all()
    }

    fn like_by_id(&self, id: i64, like_removed: bool) -> Result<Post> {
        self.record(Operation::Like);
        self.sleep_blocking();
        self.do_like(id, like_removed)
    }

    fn save(&self, post: Post) -> Result<()> {
        self.record(Operation::Save);
        self.sleep_blocking();
        self.do_save(post)
    }

    fn remove_by_id(&self, id: i64) -> Result<()> {
        self.record(Operation::Remove);
        self.sleep_blocking();
        self.do_remove(id)
    }
}

#[async_trait]
impl AsyncPostRepository for MemoryRepository {
    async fn get_all_async(&self) -> Result<Vec<Post>> {
        self.record(Operation::GetAll);
        self.sleep_async(Operation::GetAll).await;
        self.do_get_all()
    }

    async fn like_by_id_async(&self, id: i64, like_removed: bool) -> Result<Post> {
        self.record(Operation::Like);
        self.sleep_async(Operation::Like).await;
        self.do_like(id, like_removed)
    }

    async fn save_async(&self, post: Post) -> Result<()> {
        self.record(Operation::Save);
        self.sleep_async(Operation::Save).await;
        self.do_save(post)
    }

    async fn remove_by_id_async(&self, id: i64) -> Result<()> {
        self.record(Operation::Remove);
        self.sleep_async(Operation::Remove).await;
        self.do_remove(id)
    }
}
