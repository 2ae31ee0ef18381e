//! Mock message source for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{MessageSource, RawMessage, TransportError};

/// In-memory `MessageSource`.
///
/// - Messages are served in position order per channel
/// - `fail_from` makes the first read at or past a position fail
/// - `set_delay` slows every read down
#[derive(Debug, Default)]
pub struct MockMessageSource {
    messages: Mutex<HashMap<i64, Vec<RawMessage>>>,
    fail_from: Mutex<Option<(i64, TransportError)>>,
    delay: Mutex<Option<Duration>>,
    reads: AtomicUsize,
}

impl MockMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the messages of a channel.
    pub fn set_messages(&self, channel_id: i64, mut messages: Vec<RawMessage>) {
        messages.sort_by_key(|m| m.position);
        self.messages
            .lock()
            .unwrap()
            .insert(channel_id, messages);
    }

    /// Append one message to a channel.
    pub fn push(&self, channel_id: i64, message: RawMessage) {
        let mut messages = self.messages.lock().unwrap();
        let channel = messages.entry(channel_id).or_default();
        channel.push(message);
        channel.sort_by_key(|m| m.position);
    }

    /// Fail the next read that starts at or after `position`.
    pub fn fail_from(&self, position: i64, error: TransportError) {
        *self.fail_from.lock().unwrap() = Some((position, error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of `read` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for MockMessageSource {
    async fn read(
        &self,
        channel_id: i64,
        from: i64,
        limit: u32,
    ) -> Result<Vec<RawMessage>, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut fail = self.fail_from.lock().unwrap();
            if fail.as_ref().is_some_and(|(pos, _)| from >= *pos) {
                if let Some((_, error)) = fail.take() {
                    return Err(error);
                }
            }
        }

        let messages = self.messages.lock().unwrap();
        Ok(messages
            .get(&channel_id)
            .map(|channel| {
                channel
                    .iter()
                    .filter(|m| m.position >= from)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
