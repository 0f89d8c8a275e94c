use crate::model::{Id, user::UserMarker};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MessageMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Message {
    pub id: Id<MessageMarker>,
    pub sender_id: Id<UserMarker>,
    pub receiver_id: Id<UserMarker>,
    pub text: String,
    pub timestamp: UtcDateTime,
}

impl Message {
    /// Whether this message was exchanged between `a` and `b`, in either direction.
    #[must_use]
    pub fn is_between(&self, a: Id<UserMarker>, b: Id<UserMarker>) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::message::Message;
    use time::macros::utc_datetime;

    #[test]
    fn pair_is_unordered() {
        let message = Message {
            id: 1_u64.into(),
            sender_id: 10_u64.into(),
            receiver_id: 20_u64.into(),
            text: "hi".to_owned(),
            timestamp: utc_datetime!(2025-03-01 12:00),
        };

        assert!(message.is_between(10_u64.into(), 20_u64.into()));
        assert!(message.is_between(20_u64.into(), 10_u64.into()));
        assert!(!message.is_between(10_u64.into(), 30_u64.into()));
        assert!(!message.is_between(10_u64.into(), 10_u64.into()));
    }
}
