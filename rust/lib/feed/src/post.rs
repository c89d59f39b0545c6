//! Post — a single feed item.

use serde::{Deserialize, Serialize};

/// A post as seen by the local viewer.
///
/// Immutable by convention: every change produces a new value
/// (`with_content`, `with_like_toggled`), so snapshots held by readers
/// never shift under them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Assigned by remote storage. `0` means "not yet persisted".
    pub id: i64,
    pub content: String,
    pub author: String,
    /// Whether the local viewer has liked this post.
    pub liked_by_me: bool,
    pub likes: u32,
    /// Publication label as rendered by the remote side. Empty for drafts.
    pub published: String,
}

impl Post {
    /// The empty draft sentinel: `id=0`, no content, no likes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if this post is the empty draft sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Copy with only `content` replaced.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }

    /// Copy with the like state flipped in the requested direction.
    ///
    /// `like_removed = true` unlikes (count down, never below zero);
    /// `false` likes (count up).
    pub fn with_like_toggled(&self, like_removed: bool) -> Self {
        if like_removed {
            Self {
                liked_by_me: false,
                likes: self.likes.saturating_sub(1),
                ..self.clone()
            }
        } else {
            Self {
                liked_by_me: true,
                likes: self.likes.saturating_add(1),
                ..self.clone()
            }
        }
    }
}
