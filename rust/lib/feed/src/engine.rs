use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::event::OneShotEvent;
use crate::live::LiveValue;
use crate::post::Post;
use crate::repository::{AsyncPostRepository, Blocking, PostRepository, submit};
use crate::state::FeedState;

/// Configuration for a [`PostFeed`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Start loading posts as soon as the feed is constructed.
    pub load_on_init: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { load_on_init: true }
    }
}

/// Optimistic feed engine.
///
/// Owns the published feed state, the draft being composed, and the
/// post-created signal. Mutating operations publish their speculative
/// result synchronously, then run the repository call on a spawned task
/// and publish the confirmed (or rolled back) result when it resolves.
///
/// Every repository-backed operation returns right after scheduling. The
/// returned `JoinHandle` may be awaited to observe completion, or dropped.
///
/// Failure policy differs per operation:
/// - load: `error` state, posts cleared.
/// - like/unlike: `error` raised, speculative change kept.
/// - delete: posts rolled back to the pre-delete snapshot.
/// - save: logged only.
///
/// Must be used inside a Tokio runtime.
///
/// # Examples
///
/// ```ignore
/// let repo = Arc::new(MemoryRepository::default());
/// let feed = PostFeed::new(repo, FeedConfig::default());
///
/// feed.data().subscribe(|state| println!("{} posts", state.posts.len()));
///
/// feed.change_content("hello");
/// feed.save();
/// feed.post_created().recv().await;
/// feed.load_posts();
/// ```
pub struct PostFeed {
    repository: Arc<dyn AsyncPostRepository>,
    data: Arc<LiveValue<FeedState>>,
    edited: Arc<LiveValue<Post>>,
    post_created: Arc<OneShotEvent<()>>,
}

impl PostFeed {
    /// Create a feed over a non-blocking repository.
    ///
    /// The draft starts as the empty sentinel. With `load_on_init` an
    /// initial load is scheduled before returning.
    pub fn new(repository: Arc<dyn AsyncPostRepository>, config: FeedConfig) -> Self {
        let feed = Self {
            repository,
            data: Arc::new(LiveValue::new(FeedState::default())),
            edited: Arc::new(LiveValue::new(Post::empty())),
            post_created: Arc::new(OneShotEvent::new()),
        };
        if config.load_on_init {
            drop(feed.load_posts());
        }
        feed
    }

    /// Create a feed over a blocking repository. Calls run on the
    /// blocking pool.
    pub fn with_blocking<R: PostRepository + 'static>(repository: Arc<R>, config: FeedConfig) -> Self {
        Self::new(Arc::new(Blocking::new(repository)), config)
    }

    // ====================================================================
    // Observables
    // ====================================================================

    /// Current feed state.
    pub fn data(&self) -> &LiveValue<FeedState> {
        &self.data
    }

    /// Current draft.
    pub fn edited(&self) -> &LiveValue<Post> {
        &self.edited
    }

    /// Fired once per successful save.
    pub fn post_created(&self) -> &OneShotEvent<()> {
        &self.post_created
    }

    // ====================================================================
    // Load
    // ====================================================================

    /// Replace the feed with a fresh fetch.
    pub fn load_posts(&self) -> JoinHandle<()> {
        self.data.set(FeedState::loading());
        debug!("loading posts");

        let repository = Arc::clone(&self.repository);
        let on_loaded = Arc::clone(&self.data);
        let on_failed = Arc::clone(&self.data);

        submit(
            async move { repository.get_all_async().await },
            move |posts: Vec<Post>| {
                info!("loaded {} posts", posts.len());
                on_loaded.set(FeedState::loaded(posts));
            },
            move |e| {
                warn!(error = %e, "failed to load posts");
                on_failed.set(FeedState::failed());
            },
        )
    }

    // ====================================================================
    // Save
    // ====================================================================

    /// Persist the draft and reset it to the empty sentinel.
    ///
    /// Returns `None` without calling the repository when the draft is
    /// the sentinel. The feed list is not touched; the next load shows
    /// the new post.
    pub fn save(&self) -> Option<JoinHandle<()>> {
        let draft = self.edited.get();
        if draft.is_empty() {
            debug!("save skipped: empty draft");
            return None;
        }

        let repository = Arc::clone(&self.repository);
        let post_created = Arc::clone(&self.post_created);
        let post = Post::clone(&draft);
        let id = post.id;
        debug!("saving post {id}");

        let handle = submit(
            async move { repository.save_async(post).await },
            move |()| {
                debug!("post {id} saved");
                post_created.fire(());
            },
            // No state change on failure; the draft is already reset.
            move |e| warn!(error = %e, "failed to save post {id}"),
        );

        self.edited.set(Post::empty());
        Some(handle)
    }

    // ====================================================================
    // Draft
    // ====================================================================

    /// Replace the draft wholesale.
    pub fn edit(&self, post: Post) {
        self.edited.set(post);
    }

    /// Set the draft content (trimmed). Unchanged content is not published.
    pub fn change_content(&self, content: &str) {
        let text = content.trim();
        let draft = self.edited.get();
        if draft.content == text {
            return;
        }
        self.edited.set(draft.with_content(text));
    }

    // ====================================================================
    // Like / unlike
    // ====================================================================

    /// Like (`like_removed = false`) or unlike (`true`) a post.
    ///
    /// The flipped post is published before the repository is called. On
    /// success the repository's post replaces the entry in whatever list
    /// is current at that time. On failure `error` is raised and the
    /// speculative change stays.
    pub fn like_by_id(&self, id: i64, like_removed: bool) -> JoinHandle<()> {
        let old = self.data.get();
        self.data
            .set(FeedState::from_posts(old.posts_after_like(id, like_removed)));
        debug!("post {id}: like_removed={like_removed} applied locally");

        let repository = Arc::clone(&self.repository);
        let on_confirmed = Arc::clone(&self.data);
        let on_failed = Arc::clone(&self.data);

        submit(
            async move { repository.like_by_id_async(id, like_removed).await },
            move |updated: Post| {
                debug!("post {id}: like confirmed (likes={})", updated.likes);
                let current = on_confirmed.get();
                on_confirmed.set(FeedState::loaded(current.posts_with(&updated)));
            },
            move |e| {
                warn!(error = %e, "post {id}: like failed, keeping local change");
                let current = on_failed.get();
                on_failed.set(FeedState::failed_with(current.posts.clone()));
            },
        )
    }

    // ====================================================================
    // Remove
    // ====================================================================

    /// Remove a post.
    ///
    /// The post disappears before the repository is called. On failure
    /// the list is restored to the snapshot taken before removal,
    /// discarding anything published in between.
    pub fn remove_by_id(&self, id: i64) -> JoinHandle<()> {
        let current = self.data.get();
        let old = current.posts.clone();
        self.data.set(current.with_posts(current.posts_without(id)));
        debug!("post {id}: removed locally");

        let repository = Arc::clone(&self.repository);
        let on_failed = Arc::clone(&self.data);

        submit(
            async move { repository.remove_by_id_async(id).await },
            move |()| debug!("post {id}: removal confirmed"),
            move |e| {
                warn!(error = %e, "post {id}: removal failed, rolling back");
                let current = on_failed.get();
                on_failed.set(current.with_posts(old));
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRepository, Operation};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn post(id: i64, likes: u32, liked_by_me: bool) -> Post {
        Post {
            id,
            content: format!("post {id}"),
            author: "Netology".into(),
            liked_by_me,
            likes,
            published: String::new(),
        }
    }

    fn manual() -> FeedConfig {
        FeedConfig { load_on_init: false }
    }

    async fn finish(handle: JoinHandle<()>) {
        timeout(WAIT, handle).await.expect("timed out").unwrap();
    }

    async fn loaded_feed(posts: Vec<Post>) -> (Arc<MemoryRepository>, PostFeed) {
        let repo = Arc::new(MemoryRepository::default());
        repo.seed(posts);
        let feed = PostFeed::new(repo.clone(), manual());
        finish(feed.load_posts()).await;
        (repo, feed)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[tokio::test]
    async fn new_starts_with_empty_draft() {
        let feed = PostFeed::new(Arc::new(MemoryRepository::default()), manual());
        assert!(feed.edited().get().is_empty());
        assert_eq!(*feed.data().get(), FeedState::default());
        assert!(!feed.post_created().is_pending());
    }

    // ========================================================================
    // Load
    // ========================================================================

    #[tokio::test]
    async fn load_on_init_publishes_loading_first() {
        let repo = Arc::new(MemoryRepository::default());
        repo.seed(vec![post(1, 0, false)]);
        repo.hold(Operation::GetAll);

        let feed = PostFeed::new(repo.clone(), FeedConfig::default());
        assert!(feed.data().get().loading);

        repo.release(Operation::GetAll);
        let state = timeout(WAIT, feed.data().wait_for(|s| !s.loading))
            .await
            .expect("timed out");
        assert_eq!(state.posts.len(), 1);
        assert_eq!(repo.calls(Operation::GetAll), 1);
    }

    #[tokio::test]
    async fn load_success() {
        let (_, feed) = loaded_feed(vec![post(1, 3, false), post(2, 0, false)]).await;
        let state = feed.data().get();
        assert_eq!(state.posts.len(), 2);
        assert!(!state.loading && !state.empty && !state.error);
    }

    #[tokio::test]
    async fn load_empty_sets_empty() {
        let (_, feed) = loaded_feed(vec![]).await;
        let state = feed.data().get();
        assert!(state.empty);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn load_failure_clears_posts() {
        let (repo, feed) = loaded_feed(vec![post(1, 0, false)]).await;
        repo.fail_next(Operation::GetAll);
        finish(feed.load_posts()).await;

        let state = feed.data().get();
        assert!(state.error);
        assert!(!state.loading);
        assert!(state.posts.is_empty());
    }

    #[tokio::test]
    async fn load_discards_prior_flags() {
        let (repo, feed) = loaded_feed(vec![post(1, 0, false)]).await;
        repo.fail_next(Operation::GetAll);
        finish(feed.load_posts()).await;
        assert!(feed.data().get().error);

        let handle = feed.load_posts();
        let loading = feed.data().get();
        assert!(loading.loading && !loading.error);
        finish(handle).await;
        assert!(!feed.data().get().error);
    }

    // ========================================================================
    // Draft
    // ========================================================================

    #[tokio::test]
    async fn change_content_trims_and_dedups() {
        let feed = PostFeed::new(Arc::new(MemoryRepository::default()), manual());
        let publishes = Arc::new(AtomicU64::new(0));
        let publishes_c = publishes.clone();
        feed.edited().subscribe(move |_| {
            publishes_c.fetch_add(1, Ordering::SeqCst);
        });

        feed.change_content("  hello ");
        feed.change_content("hello");
        feed.change_content("hello\n");

        assert_eq!(publishes.load(Ordering::SeqCst), 1);
        assert_eq!(feed.edited().get().content, "hello");
    }

    #[tokio::test]
    async fn edit_replaces_draft() {
        let feed = PostFeed::new(Arc::new(MemoryRepository::default()), manual());
        feed.edit(post(4, 1, true));
        assert_eq!(*feed.edited().get(), post(4, 1, true));

        feed.change_content("rewritten");
        let draft = feed.edited().get();
        assert_eq!(draft.id, 4);
        assert_eq!(draft.content, "rewritten");
        assert_eq!(draft.likes, 1);
    }

    // ========================================================================
    // Save
    // ========================================================================

    #[tokio::test]
    async fn save_resets_draft_before_completion() {
        let repo = Arc::new(MemoryRepository::default());
        let feed = PostFeed::new(repo.clone(), manual());
        repo.hold(Operation::Save);

        feed.change_content("new post");
        let handle = feed.save().expect("dispatched");
        assert!(feed.edited().get().is_empty());
        assert!(!feed.post_created().is_pending());

        repo.release(Operation::Save);
        finish(handle).await;
        assert_eq!(feed.post_created().take(), Some(()));
        assert_eq!(repo.posts()[0].content, "new post");
    }

    #[tokio::test]
    async fn save_does_not_touch_feed() {
        let (_, feed) = loaded_feed(vec![post(1, 0, false)]).await;
        let before = feed.data().publish_count();

        feed.change_content("hello");
        finish(feed.save().expect("dispatched")).await;

        assert_eq!(feed.data().publish_count(), before);
        assert_eq!(feed.data().get().posts.len(), 1);
    }

    #[tokio::test]
    async fn save_failure_is_silent() {
        let repo = Arc::new(MemoryRepository::default());
        let feed = PostFeed::new(repo.clone(), manual());
        repo.fail_next(Operation::Save);

        feed.change_content("lost");
        finish(feed.save().expect("dispatched")).await;

        assert!(!feed.post_created().is_pending());
        assert!(!feed.data().get().error);
        assert!(feed.edited().get().is_empty());
        assert!(repo.posts().is_empty());
    }

    // ========================================================================
    // Like / unlike
    // ========================================================================

    #[tokio::test]
    async fn like_failure_keeps_speculative_change() {
        let (repo, feed) = loaded_feed(vec![post(1, 3, false)]).await;
        repo.fail_next(Operation::Like);

        finish(feed.like_by_id(1, false)).await;

        let state = feed.data().get();
        assert!(state.error);
        let p = state.post(1).unwrap();
        assert_eq!(p.likes, 4);
        assert!(p.liked_by_me);
    }

    #[tokio::test]
    async fn like_confirmation_uses_repository_value() {
        let (repo, feed) = loaded_feed(vec![post(1, 3, false)]).await;
        // Another viewer liked it meanwhile; the repository knows better.
        repo.seed(vec![post(1, 10, false)]);

        finish(feed.like_by_id(1, false)).await;

        let p = feed.data().get().post(1).cloned().unwrap();
        assert_eq!(p.likes, 11);
        assert!(p.liked_by_me);
    }

    #[tokio::test]
    async fn unlike_not_found_raises_error() {
        let (repo, feed) = loaded_feed(vec![post(1, 1, true)]).await;
        repo.seed(vec![]);

        finish(feed.like_by_id(1, true)).await;

        let state = feed.data().get();
        assert!(state.error);
        assert_eq!(state.post(1).map(|p| p.likes), Some(0));
    }

    // ========================================================================
    // Remove
    // ========================================================================

    #[tokio::test]
    async fn remove_success_stands() {
        let (repo, feed) = loaded_feed(vec![post(1, 0, false), post(2, 0, false)]).await;

        let handle = feed.remove_by_id(1);
        assert!(feed.data().get().post(1).is_none());
        finish(handle).await;

        let ids: Vec<i64> = feed.data().get().posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(repo.posts().len(), 1);
    }

    #[tokio::test]
    async fn remove_failure_rolls_back() {
        let posts = vec![post(1, 0, false), post(2, 0, false), post(3, 0, false)];
        let (repo, feed) = loaded_feed(posts.clone()).await;
        repo.fail_next(Operation::Remove);

        finish(feed.remove_by_id(2)).await;

        let state = feed.data().get();
        assert_eq!(state.posts, posts);
        assert!(!state.error);
    }

    // ========================================================================
    // Blocking repository
    // ========================================================================

    #[tokio::test]
    async fn with_blocking_repository() {
        let repo = Arc::new(MemoryRepository::default());
        repo.seed(vec![post(1, 3, false)]);
        let feed = PostFeed::with_blocking(repo.clone(), manual());

        finish(feed.load_posts()).await;
        finish(feed.like_by_id(1, false)).await;

        let p = feed.data().get().post(1).cloned().unwrap();
        assert_eq!(p.likes, 4);
        assert_eq!(repo.calls(Operation::Like), 1);
    }
}
