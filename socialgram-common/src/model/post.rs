use crate::model::{
    Id,
    user::{UserHandle, UserMarker},
};
use std::collections::BTreeSet;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A published picture with its caption, like counter and comment thread.
///
/// The author is referenced by handle. Handles never change after registration, so the join stays
/// valid. The image itself lives in the blob area under the post's id.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub username: UserHandle,
    pub caption: String,
    pub likes: u64,
    pub liked_by: BTreeSet<Id<UserMarker>>,
    pub timestamp: UtcDateTime,
    pub comments: Vec<Comment>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub username: UserHandle,
    pub text: String,
    pub timestamp: UtcDateTime,
}

impl Post {
    #[must_use]
    pub fn new(
        id: Id<PostMarker>,
        username: UserHandle,
        caption: String,
        timestamp: UtcDateTime,
    ) -> Self {
        Self {
            id,
            username,
            caption,
            likes: 0,
            liked_by: BTreeSet::new(),
            timestamp,
            comments: Vec::new(),
        }
    }

    /// Key of the image blob belonging to this post.
    #[must_use]
    pub fn image_ref(&self) -> Id<PostMarker> {
        self.id
    }

    #[must_use]
    pub fn is_liked_by(&self, viewer: Id<UserMarker>) -> bool {
        self.liked_by.contains(&viewer)
    }

    /// Flips the viewer's like and moves the counter by exactly one.
    ///
    /// Returns whether the viewer likes the post afterwards.
    pub fn toggle_like(&mut self, viewer: Id<UserMarker>) -> bool {
        if self.liked_by.remove(&viewer) {
            self.likes = self.likes.saturating_sub(1);
            false
        } else {
            self.liked_by.insert(viewer);
            self.likes += 1;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{post::Post, user::UserHandle};
    use time::macros::utc_datetime;

    fn post(likes: u64) -> Post {
        let mut post = Post::new(
            1_u64.into(),
            UserHandle::new("nature_photography".to_owned()).unwrap(),
            "Beautiful sunset at the beach".to_owned(),
            utc_datetime!(2025-06-01 18:00),
        );
        post.likes = likes;
        post
    }

    #[test]
    fn even_number_of_toggles_restores_state() {
        let original = post(342);
        let mut post = original.clone();
        let viewer = 7_u64.into();

        for round in 1..=6 {
            let liked = post.toggle_like(viewer);
            assert_eq!(liked, round % 2 == 1);
            assert_eq!(post.is_liked_by(viewer), liked);
            assert_eq!(post.likes, if liked { 343 } else { 342 });
        }

        assert_eq!(post, original);
    }

    #[test]
    fn likes_are_per_viewer() {
        let mut post = post(0);

        assert!(post.toggle_like(1_u64.into()));
        assert!(post.toggle_like(2_u64.into()));
        assert_eq!(post.likes, 2);

        assert!(!post.toggle_like(1_u64.into()));
        assert_eq!(post.likes, 1);
        assert!(!post.is_liked_by(1_u64.into()));
        assert!(post.is_liked_by(2_u64.into()));
    }
}
