use socialgram_common::model::{Id, notification::Notification, post::PostMarker};

/// Append-only record of like and comment events.
///
/// Entries are never merged or evicted.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct NotificationLog {
    entries: Vec<Notification>,
}

impl NotificationLog {
    #[must_use]
    pub fn new(entries: Vec<Notification>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, notification: Notification) {
        self.entries.push(notification);
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Notification] {
        &self.entries
    }

    /// Events on any of `posts` that were not caused by `author` themself.
    pub fn on_posts<'a>(
        &'a self,
        posts: &'a [Id<PostMarker>],
        author: &'a str,
    ) -> impl Iterator<Item = &'a Notification> + 'a {
        self.entries
            .iter()
            .filter(move |notification| posts.contains(&notification.post_id))
            .filter(move |notification| notification.username.get() != author)
    }
}

#[cfg(test)]
mod tests {
    use crate::notifications::NotificationLog;
    use socialgram_common::model::notification::{Notification, NotificationKind};
    use time::macros::utc_datetime;

    fn notification(id: u64, actor: &str, post: u64) -> Notification {
        Notification {
            id: id.into(),
            username: actor.to_owned().try_into().unwrap(),
            kind: NotificationKind::Comment,
            post_id: post.into(),
            timestamp: utc_datetime!(2025-01-02 03:04),
        }
    }

    #[test]
    fn duplicates_are_kept() {
        let mut log = NotificationLog::default();
        log.append(notification(1, "bob", 10));
        log.append(notification(1, "bob", 10));

        assert_eq!(log.as_slice().len(), 2);
    }

    #[test]
    fn filters_by_post_and_skips_own_events() {
        let log = NotificationLog::new(vec![
            notification(1, "bob", 10),
            notification(2, "alice", 10),
            notification(3, "carol", 20),
            notification(4, "dave", 30),
        ]);

        let posts = [10_u64.into(), 20_u64.into()];
        let ids: Vec<u64> = log
            .on_posts(&posts, "alice")
            .map(|notification| notification.id.into())
            .collect();

        assert_eq!(ids, vec![1, 3]);
    }
}
