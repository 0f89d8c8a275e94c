use crate::{
    blobs::Blob,
    content::ContentStore,
    error::{Result, StoreError},
    gateway::PersistenceGateway,
    ids::IdGenerator,
    messages::{MessagePoller, MessageStore},
    users::UserStore,
};
use socialgram_common::{
    model::{
        Id,
        post::{CommentMarker, Post, PostMarker},
        user::{User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
    util::PositiveDuration,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// All stores of one session, opened over a single gateway.
///
/// The stores share one id generator. Flows that touch more than one store are not transactional:
/// when a later step fails, earlier steps stay applied and the error is returned.
#[derive(Clone, Debug)]
pub struct SocialgramClient {
    users: Arc<UserStore>,
    content: Arc<ContentStore>,
    messages: Arc<MessageStore>,
}

impl SocialgramClient {
    pub fn open(
        gateway: Arc<dyn PersistenceGateway>,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let ids = Arc::new(IdGenerator::new(worker_id, process_id));

        let users = UserStore::load(gateway.clone(), ids.clone())?;
        let content = ContentStore::load(gateway.clone(), ids.clone())?;
        let messages = MessageStore::load(gateway, ids)?;

        info!(
            worker_id = worker_id.get(),
            process_id = process_id.get(),
            "Opened client"
        );

        Ok(Self {
            users: Arc::new(users),
            content: Arc::new(content),
            messages: Arc::new(messages),
        })
    }

    #[must_use]
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    #[must_use]
    pub fn messages(&self) -> &Arc<MessageStore> {
        &self.messages
    }

    async fn require_user(&self, user_id: Id<UserMarker>) -> Result<User> {
        self.users
            .user(user_id)
            .await
            .ok_or(StoreError::UserByIdNotFound(user_id))
    }

    /// Publishes a post for `author_id` and adds it to the author's post set.
    pub async fn publish_post(
        &self,
        author_id: Id<UserMarker>,
        image: Blob,
        caption: String,
    ) -> Result<Id<PostMarker>> {
        let author = self.require_user(author_id).await?;

        let post_id = self
            .content
            .create_post(author.username.clone(), image, caption)
            .await?;
        self.users.record_post(author.username.get(), post_id).await?;

        Ok(post_id)
    }

    /// Toggles `viewer_id`'s like on a post. Returns whether the viewer likes it afterwards.
    pub async fn like_post(
        &self,
        post_id: Id<PostMarker>,
        viewer_id: Id<UserMarker>,
    ) -> Result<bool> {
        let viewer = self.require_user(viewer_id).await?;
        self.content
            .toggle_like(post_id, viewer_id, &viewer.username)
            .await
    }

    pub async fn comment_on_post(
        &self,
        post_id: Id<PostMarker>,
        author_id: Id<UserMarker>,
        text: String,
    ) -> Result<Id<CommentMarker>> {
        let author = self.require_user(author_id).await?;
        self.content
            .add_comment(post_id, &author.username, text)
            .await
    }

    /// Posts published by `user_id`, most recent first.
    pub async fn posts_of(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let user = self.require_user(user_id).await?;
        Ok(self.content.posts_by(user.username.get()).await)
    }

    /// Starts polling persisted messages every `period`.
    #[must_use]
    pub fn start_message_sync(
        &self,
        period: PositiveDuration,
        cancellation: CancellationToken,
    ) -> MessagePoller {
        self.messages.spawn_poller(period, cancellation)
    }
}
