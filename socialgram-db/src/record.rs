use serde::{Deserialize, Serialize};
use socialgram_common::model::{
    Id, ModelValidationError,
    auth::Password,
    message::{Message, MessageMarker},
    notification::{Notification, NotificationKind, NotificationMarker},
    post::{Comment, CommentMarker, Post, PostMarker},
    user::{User, UserHandle, UserMarker},
};
use std::collections::BTreeSet;
use time::{OffsetDateTime, UtcDateTime, UtcOffset};

fn to_offset(timestamp: UtcDateTime) -> OffsetDateTime {
    timestamp.to_offset(UtcOffset::UTC)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Id<UserMarker>,
    pub email: String,
    pub full_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub followers: BTreeSet<Id<UserMarker>>,
    #[serde(default)]
    pub following: BTreeSet<Id<UserMarker>>,
    #[serde(default)]
    pub posts: BTreeSet<Id<PostMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: Id<PostMarker>,
    pub username: String,
    pub image_ref: Id<PostMarker>,
    pub caption: String,
    pub likes: u64,
    #[serde(default)]
    pub liked_by: BTreeSet<Id<UserMarker>>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: Id<CommentMarker>,
    pub username: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: Id<MessageMarker>,
    pub sender_id: Id<UserMarker>,
    pub receiver_id: Id<UserMarker>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKindRecord {
    Like,
    Comment,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Id<NotificationMarker>,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: NotificationKindRecord,
    pub post_id: Id<PostMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<&User> for UserRecord {
    fn from(value: &User) -> Self {
        Self {
            id: value.id,
            email: value.email.clone(),
            full_name: value.full_name.clone(),
            username: value.username.get().to_owned(),
            password: value.password.expose().to_owned(),
            description: value.description.clone(),
            followers: value.followers.clone(),
            following: value.following.clone(),
            posts: value.posts.clone(),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            email: value.email,
            username: UserHandle::new(value.username)?,
            full_name: value.full_name,
            password: Password::new(value.password),
            description: value.description,
            followers: value.followers,
            following: value.following,
            posts: value.posts,
        })
    }
}

impl From<&Comment> for CommentRecord {
    fn from(value: &Comment) -> Self {
        Self {
            id: value.id,
            username: value.username.get().to_owned(),
            text: value.text.clone(),
            timestamp: to_offset(value.timestamp),
        }
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            username: UserHandle::new(value.username)?,
            text: value.text,
            timestamp: value.timestamp.to_utc(),
        })
    }
}

impl From<&Post> for PostRecord {
    fn from(value: &Post) -> Self {
        Self {
            id: value.id,
            username: value.username.get().to_owned(),
            image_ref: value.image_ref(),
            caption: value.caption.clone(),
            likes: value.likes,
            liked_by: value.liked_by.clone(),
            timestamp: to_offset(value.timestamp),
            comments: value.comments.iter().map(CommentRecord::from).collect(),
        }
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            username: UserHandle::new(value.username)?,
            caption: value.caption,
            likes: value.likes,
            liked_by: value.liked_by,
            timestamp: value.timestamp.to_utc(),
            comments: value
                .comments
                .into_iter()
                .map(Comment::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<&Message> for MessageRecord {
    fn from(value: &Message) -> Self {
        Self {
            id: value.id,
            sender_id: value.sender_id,
            receiver_id: value.receiver_id,
            text: value.text.clone(),
            timestamp: to_offset(value.timestamp),
        }
    }
}

impl TryFrom<MessageRecord> for Message {
    type Error = ModelValidationError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            sender_id: value.sender_id,
            receiver_id: value.receiver_id,
            text: value.text,
            timestamp: value.timestamp.to_utc(),
        })
    }
}

impl From<NotificationKind> for NotificationKindRecord {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::Like => Self::Like,
            NotificationKind::Comment => Self::Comment,
        }
    }
}

impl From<NotificationKindRecord> for NotificationKind {
    fn from(value: NotificationKindRecord) -> Self {
        match value {
            NotificationKindRecord::Like => Self::Like,
            NotificationKindRecord::Comment => Self::Comment,
        }
    }
}

impl From<&Notification> for NotificationRecord {
    fn from(value: &Notification) -> Self {
        Self {
            id: value.id,
            username: value.username.get().to_owned(),
            kind: value.kind.into(),
            post_id: value.post_id,
            timestamp: to_offset(value.timestamp),
        }
    }
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = ModelValidationError;

    fn try_from(value: NotificationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            username: UserHandle::new(value.username)?,
            kind: value.kind.into(),
            post_id: value.post_id,
            timestamp: value.timestamp.to_utc(),
        })
    }
}
