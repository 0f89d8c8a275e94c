use crate::model::{Id, post::PostMarker, user::UserHandle};
use std::fmt::{Display, Formatter};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct NotificationMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum NotificationKind {
    Like,
    Comment,
}

/// A like or comment event on a post, attributed to the acting user.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Notification {
    pub id: Id<NotificationMarker>,
    pub username: UserHandle,
    pub kind: NotificationKind,
    pub post_id: Id<PostMarker>,
    pub timestamp: UtcDateTime,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
        })
    }
}
