use crate::{
    codec::{MESSAGES_KEY, encode_collection, load_collection},
    error::Result,
    gateway::{PersistenceGateway, Scope},
    ids::IdGenerator,
    record::MessageRecord,
};
use socialgram_common::{
    model::{
        Id,
        message::{Message, MessageMarker},
        user::UserMarker,
    },
    util::PositiveDuration,
};
use std::{collections::HashSet, sync::Arc};
use time::UtcDateTime;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
}

/// Direct messages between users.
///
/// The persisted collection is shared with every other session on the same device, so it is
/// re-read before each write and periodically by a [`MessagePoller`].
#[derive(Debug)]
pub struct MessageStore {
    gateway: Arc<dyn PersistenceGateway>,
    ids: Arc<IdGenerator>,
    /// Sorted by timestamp, ties broken by id.
    messages: Mutex<Vec<Message>>,
}

impl MessageStore {
    pub fn load(gateway: Arc<dyn PersistenceGateway>, ids: Arc<IdGenerator>) -> Result<Self> {
        let mut messages =
            load_collection::<MessageRecord, Message>(&*gateway, MESSAGES_KEY)?.unwrap_or_default();
        sort_messages(&mut messages);

        info!(messages = messages.len(), "Loaded messages");

        Ok(Self {
            gateway,
            ids,
            messages: Mutex::new(messages),
        })
    }

    /// Sends a message from `sender_id` to `receiver_id`.
    ///
    /// Messages other sessions persisted since the last refresh are kept. Two messages only count
    /// as the same message when they are equal in every field, and the new message gets an id no
    /// known message uses, so sessions whose id generators overlap cannot overwrite each other.
    pub async fn send(
        &self,
        sender_id: Id<UserMarker>,
        receiver_id: Id<UserMarker>,
        text: String,
    ) -> Result<Id<MessageMarker>> {
        let mut messages = self.messages.lock().await;

        let mut next =
            load_collection::<MessageRecord, Message>(&*self.gateway, MESSAGES_KEY)?
                .unwrap_or_default();
        let persisted: HashSet<_> = next.iter().cloned().collect();
        next.extend(
            messages
                .iter()
                .filter(|message| !persisted.contains(*message))
                .cloned(),
        );

        let taken: HashSet<_> = next.iter().map(|message| message.id).collect();
        let message_id = loop {
            let candidate = self.ids.generate();
            if !taken.contains(&candidate) {
                break candidate;
            }
            trace!(%candidate, "Skipping message id used by another session");
        };

        next.push(Message {
            id: message_id,
            sender_id,
            receiver_id,
            text,
            timestamp: UtcDateTime::now(),
        });
        sort_messages(&mut next);

        let bytes = encode_collection::<_, MessageRecord>(&next)?;
        self.gateway.save(Scope::Entities, MESSAGES_KEY, &bytes)?;
        *messages = next;

        debug!(%message_id, %sender_id, %receiver_id, "Sent message");
        Ok(message_id)
    }

    /// The messages exchanged between `a` and `b` in either direction, oldest first.
    pub async fn conversation(&self, a: Id<UserMarker>, b: Id<UserMarker>) -> Vec<Message> {
        let messages = self.messages.lock().await;
        messages
            .iter()
            .filter(|message| message.is_between(a, b))
            .cloned()
            .collect()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Replaces the in-memory messages with the persisted ones.
    ///
    /// Absent or undecodable persisted content leaves memory unchanged. Returns the number of
    /// messages held afterwards.
    pub async fn refresh(&self) -> Result<usize> {
        let mut messages = self.messages.lock().await;

        if let Some(mut persisted) =
            load_collection::<MessageRecord, Message>(&*self.gateway, MESSAGES_KEY)?
        {
            sort_messages(&mut persisted);
            trace!(
                before = messages.len(),
                after = persisted.len(),
                "Refreshed messages"
            );
            *messages = persisted;
        }

        Ok(messages.len())
    }

    /// Refreshes every `period` until `cancellation` fires or the returned handle is dropped.
    #[must_use]
    pub fn spawn_poller(
        self: &Arc<Self>,
        period: PositiveDuration,
        cancellation: CancellationToken,
    ) -> MessagePoller {
        let store = Arc::clone(self);
        let token = cancellation.clone();

        let handle = tokio::spawn(async move {
            let mut ticks = interval(period.to_std());
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period = %period.get(), "Polling messages");

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticks.tick() => {
                        if let Err(error) = store.refresh().await {
                            error!(%error, "Could not refresh messages");
                        }
                    }
                }
            }

            info!("Stopped polling messages");
        });

        MessagePoller {
            cancellation,
            handle: Some(handle),
        }
    }
}

/// Handle to a running message poll loop.
#[derive(Debug)]
pub struct MessagePoller {
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MessagePoller {
    /// Cancels the loop and waits for it to wind down.
    pub async fn stop(mut self) {
        self.cancellation.cancel();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Err(error) = handle.await {
            error!(%error, "Message poller panicked");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for MessagePoller {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
