// SPDX-License-Identifier: MIT

//! Topic-addressed pub/sub layer. `LocalBus` is the in-process stand-in for
//! the Redis/NATS-style transport the supervisor is written against; it
//! speaks only the `Bus` trait, so a networked implementation can replace it
//! without touching callers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("invalid subscription pattern: {0}")]
    InvalidPattern(String),

    #[error("bus transport unavailable")]
    Unavailable,
}

impl From<BusError> for ghost_core::GhostError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::InvalidPattern(p) => ghost_core::GhostError::InvalidArgument(p),
            BusError::Unavailable => ghost_core::GhostError::BusUnavailable("local bus channel closed".into()),
        }
    }
}

#[derive(Debug, Clone)]
struct Envelope {
    topic: String,
    payload: Value,
    expires_at: Option<Instant>,
}

/// A received (topic, payload) pair, yielded to a subscriber.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Value,
}

#[async_trait]
pub trait Bus: Send + Sync {
    /// Fire-and-forget publish. `ttl` bounds how long a slow subscriber may
    /// still observe the message before it's treated as stale and dropped.
    async fn publish(&self, topic: &str, payload: Value, ttl: Option<Duration>) -> Result<(), BusError>;

    /// Subscribe to a literal topic or a suffix-`*` wildcard pattern.
    fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError>;

    /// Cheap liveness probe used by the maintenance ticker.
    fn is_available(&self) -> bool;
}

fn validate_pattern(pattern: &str) -> Result<(), BusError> {
    if pattern.is_empty() {
        return Err(BusError::InvalidPattern(pattern.to_string()));
    }
    let star_count = pattern.matches('*').count();
    if star_count > 1 || (star_count == 1 && !pattern.ends_with('*')) {
        return Err(BusError::InvalidPattern(pattern.to_string()));
    }
    Ok(())
}

fn matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}

/// In-process, broadcast-channel-backed `Bus`. Every publish fans out to
/// every live subscription; a subscription filters the shared stream down to
/// the topics its pattern matches.
pub struct LocalBus {
    sender: broadcast::Sender<Envelope>,
}

impl Default for LocalBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn publish(&self, topic: &str, payload: Value, ttl: Option<Duration>) -> Result<(), BusError> {
        let envelope = Envelope { topic: topic.to_string(), payload, expires_at: ttl.map(|d| Instant::now() + d) };
        match self.sender.send(envelope) {
            Ok(_) => Ok(()),
            Err(_) => {
                debug!(topic, "publish with no active subscribers");
                Ok(())
            }
        }
    }

    fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        validate_pattern(pattern)?;
        Ok(Subscription { pattern: pattern.to_string(), receiver: self.sender.subscribe(), last_topic: None })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// A live, cancellable subscription. Drop it to unsubscribe.
pub struct Subscription {
    pattern: String,
    receiver: broadcast::Receiver<Envelope>,
    last_topic: Option<String>,
}

impl Subscription {
    /// Await the next message matching this subscription's pattern.
    /// Returns `None` once the underlying bus is torn down.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            let envelope = match self.receiver.recv().await {
                Ok(envelope) => envelope,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, pattern = %self.pattern, "subscriber lagged, dropping buffered messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };

            if !matches(&self.pattern, &envelope.topic) {
                continue;
            }
            if let Some(expires_at) = envelope.expires_at {
                if Instant::now() > expires_at {
                    continue;
                }
            }

            self.last_topic = Some(envelope.topic.clone());
            return Some(Message { topic: envelope.topic, payload: envelope.payload });
        }
    }

    /// The concrete topic of the most recently yielded message, used to
    /// recover an id suffix from a wildcard subscription (e.g. the `{id}` in
    /// `ghost:health:{id}`).
    pub fn last_topic(&self) -> Option<&str> {
        self.last_topic.as_deref()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
