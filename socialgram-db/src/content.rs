use crate::{
    blobs::{Blob, BlobStore},
    codec::{NOTIFICATIONS_KEY, POSTS_KEY, encode_collection, load_collection},
    error::{Result, StoreError},
    gateway::{PersistenceGateway, Scope, write_entities},
    ids::IdGenerator,
    notifications::NotificationLog,
    record::{NotificationRecord, PostRecord},
};
use socialgram_common::model::{
    Id,
    notification::{Notification, NotificationKind},
    post::{Comment, CommentMarker, Post, PostMarker},
    user::{UserHandle, UserMarker},
};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default)]
struct ContentState {
    /// Most recent first.
    posts: Vec<Post>,
    notifications: NotificationLog,
}

impl ContentState {
    fn position(&self, post_id: Id<PostMarker>) -> Result<usize> {
        self.posts
            .iter()
            .position(|post| post.id == post_id)
            .ok_or(StoreError::PostByIdNotFound(post_id))
    }
}

/// Posts with their comments and likes, the notification log those interactions feed, and the
/// post images.
#[derive(Debug)]
pub struct ContentStore {
    gateway: Arc<dyn PersistenceGateway>,
    ids: Arc<IdGenerator>,
    blobs: BlobStore,
    state: Mutex<ContentState>,
}

impl ContentStore {
    pub fn load(gateway: Arc<dyn PersistenceGateway>, ids: Arc<IdGenerator>) -> Result<Self> {
        let mut posts =
            load_collection::<PostRecord, Post>(&*gateway, POSTS_KEY)?.unwrap_or_default();
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let notifications =
            load_collection::<NotificationRecord, Notification>(&*gateway, NOTIFICATIONS_KEY)?
                .unwrap_or_default();

        info!(
            posts = posts.len(),
            notifications = notifications.len(),
            "Loaded content"
        );

        Ok(Self {
            blobs: BlobStore::new(gateway.clone()),
            gateway,
            ids,
            state: Mutex::new(ContentState {
                posts,
                notifications: NotificationLog::new(notifications),
            }),
        })
    }

    fn persist_posts(&self, posts: &[Post]) -> Result<()> {
        let bytes = encode_collection::<_, PostRecord>(posts)?;
        self.gateway.save(Scope::Entities, POSTS_KEY, &bytes)?;
        Ok(())
    }

    /// Writes posts and notifications together; a failure leaves both keys as they were.
    fn persist_with_notifications(&self, state: &ContentState) -> Result<()> {
        let posts = encode_collection::<_, PostRecord>(&state.posts)?;
        let notifications =
            encode_collection::<_, NotificationRecord>(state.notifications.as_slice())?;

        write_entities(
            &*self.gateway,
            &[
                (POSTS_KEY, Some(posts.as_slice())),
                (NOTIFICATIONS_KEY, Some(notifications.as_slice())),
            ],
        )?;
        Ok(())
    }

    fn notification(
        &self,
        username: &UserHandle,
        kind: NotificationKind,
        post_id: Id<PostMarker>,
    ) -> Notification {
        Notification {
            id: self.ids.generate(),
            username: username.clone(),
            kind,
            post_id,
            timestamp: UtcDateTime::now(),
        }
    }

    /// Publishes a post at the head of the feed and stores its image.
    pub async fn create_post(
        &self,
        username: UserHandle,
        image: Blob,
        caption: String,
    ) -> Result<Id<PostMarker>> {
        let mut state = self.state.lock().await;

        let post_id = self.ids.generate();
        self.blobs.put(post_id, &image)?;

        let mut posts = state.posts.clone();
        posts.insert(0, Post::new(post_id, username, caption, UtcDateTime::now()));
        if let Err(error) = self.persist_posts(&posts) {
            if let Err(cleanup) = self.blobs.remove(post_id) {
                warn!(%post_id, %cleanup, "Could not remove image of unsaved post");
            }
            return Err(error);
        }
        state.posts = posts;

        debug!(%post_id, image_len = image.as_bytes().len(), "Created post");
        Ok(post_id)
    }

    /// Flips `viewer_id`'s like on a post; liking emits a notification.
    ///
    /// Returns whether the viewer likes the post afterwards.
    pub async fn toggle_like(
        &self,
        post_id: Id<PostMarker>,
        viewer_id: Id<UserMarker>,
        viewer_username: &UserHandle,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let index = state.position(post_id)?;

        let mut next = state.clone();
        let liked = next.posts[index].toggle_like(viewer_id);
        if liked {
            let notification = self.notification(viewer_username, NotificationKind::Like, post_id);
            next.notifications.append(notification);
        }

        if liked {
            self.persist_with_notifications(&next)?;
        } else {
            self.persist_posts(&next.posts)?;
        }
        *state = next;

        debug!(%post_id, %viewer_id, liked, "Toggled like");
        Ok(liked)
    }

    /// Appends a comment to a post and emits a notification for it.
    pub async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        username: &UserHandle,
        text: String,
    ) -> Result<Id<CommentMarker>> {
        let mut state = self.state.lock().await;
        let index = state.position(post_id)?;

        let comment_id = self.ids.generate();
        let mut next = state.clone();
        next.posts[index].comments.push(Comment {
            id: comment_id,
            username: username.clone(),
            text,
            timestamp: UtcDateTime::now(),
        });
        let notification = self.notification(username, NotificationKind::Comment, post_id);
        next.notifications.append(notification);

        self.persist_with_notifications(&next)?;
        *state = next;

        debug!(%post_id, %comment_id, "Added comment");
        Ok(comment_id)
    }

    /// The image of a post; `None` if it has none.
    pub fn load_image(&self, post_id: Id<PostMarker>) -> Result<Option<Blob>> {
        self.blobs.get(post_id)
    }

    /// All posts, most recent first.
    pub async fn posts(&self) -> Vec<Post> {
        self.state.lock().await.posts.clone()
    }

    pub async fn post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        let state = self.state.lock().await;
        state.posts.iter().find(|post| post.id == post_id).cloned()
    }

    pub async fn posts_by(&self, username: &str) -> Vec<Post> {
        let state = self.state.lock().await;
        state
            .posts
            .iter()
            .filter(|post| post.username == *username)
            .cloned()
            .collect()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.as_slice().to_vec()
    }

    /// Likes and comments other users left on `author`'s posts, oldest first.
    pub async fn notifications_for(&self, author: &str) -> Vec<Notification> {
        let state = self.state.lock().await;
        let own_posts: Vec<_> = state
            .posts
            .iter()
            .filter(|post| post.username == *author)
            .map(|post| post.id)
            .collect();

        state
            .notifications
            .on_posts(&own_posts, author)
            .cloned()
            .collect()
    }
}
