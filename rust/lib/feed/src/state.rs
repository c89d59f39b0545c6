//! Feed state — the wholly-replaced view of the post collection.

use crate::post::Post;

/// Aggregate feed view: ordered posts plus status flags.
///
/// Invariants kept by every constructor here:
/// - `loading` and `error` are never both set.
/// - `empty` implies `!loading`.
///
/// The `posts_*` helpers are pure: they compute the next post list from
/// this snapshot and leave publishing to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedState {
    /// Remote-defined order (normally newest first).
    pub posts: Vec<Post>,
    pub loading: bool,
    /// Set only when a load succeeded with zero posts.
    pub empty: bool,
    /// Set when the most recent operation failed.
    pub error: bool,
}

impl FeedState {
    /// A load is in flight. Prior posts and flags are discarded.
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Authoritative result: `empty` mirrors whether `posts` is empty.
    pub fn loaded(posts: Vec<Post>) -> Self {
        let empty = posts.is_empty();
        Self {
            posts,
            empty,
            ..Self::default()
        }
    }

    /// Failure with no posts to show.
    pub fn failed() -> Self {
        Self {
            error: true,
            ..Self::default()
        }
    }

    /// Failure that keeps `posts` on screen.
    pub fn failed_with(posts: Vec<Post>) -> Self {
        Self {
            posts,
            error: true,
            ..Self::default()
        }
    }

    /// Speculative list with all flags cleared.
    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    /// Copy of this state with `posts` replaced and flags kept.
    pub fn with_posts(&self, posts: Vec<Post>) -> Self {
        Self {
            posts,
            loading: self.loading,
            empty: self.empty,
            error: self.error,
        }
    }

    /// Find a post by ID.
    pub fn post(&self, id: i64) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Posts with the like state of `id` flipped locally.
    pub fn posts_after_like(&self, id: i64, like_removed: bool) -> Vec<Post> {
        self.posts
            .iter()
            .map(|p| {
                if p.id == id {
                    p.with_like_toggled(like_removed)
                } else {
                    p.clone()
                }
            })
            .collect()
    }

    /// Posts with the entry matching `updated.id` replaced by `updated`.
    pub fn posts_with(&self, updated: &Post) -> Vec<Post> {
        self.posts
            .iter()
            .map(|p| if p.id == updated.id { updated.clone() } else { p.clone() })
            .collect()
    }

    /// Posts without `id`.
    pub fn posts_without(&self, id: i64) -> Vec<Post> {
        self.posts.iter().filter(|p| p.id != id).cloned().collect()
    }
}
