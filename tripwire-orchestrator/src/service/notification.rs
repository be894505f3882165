//! Notification dispatch
//!
//! Every matched event produces one summary on the notification topic.
//! Delivery is best-effort: failures are logged and reported back to the
//! caller, never retried, and never affect pipeline triggering.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use tripwire_core::domain::event::{DetailError, Event};
use tripwire_core::domain::notification::Notification;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("cannot build notification: {0}")]
    MalformedEvent(#[from] DetailError),

    #[error("publish to '{topic}' failed: {message}")]
    Publish { topic: String, message: String },
}

/// Sends a notification to the subscribers of a topic
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError>;
}

/// Publisher that only writes the summary to the log
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        info!(topic, summary = %notification.summary(), "Notification");
        Ok(())
    }
}

/// Publisher that POSTs the notification to each subscriber URL
pub struct WebhookPublisher {
    subscribers: Vec<String>,
    client: Client,
}

impl WebhookPublisher {
    pub fn new(subscribers: Vec<String>) -> Self {
        Self {
            subscribers,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        let mut failures = Vec::new();

        for url in &self.subscribers {
            let result = self
                .client
                .post(url)
                .header("X-Tripwire-Topic", topic)
                .json(notification)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(topic, subscriber = %url, "Notification delivered");
                }
                Ok(response) => failures.push(format!("{}: status {}", url, response.status())),
                Err(e) => failures.push(format!("{}: {}", url, e)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Publish {
                topic: topic.to_string(),
                message: failures.join("; "),
            })
        }
    }
}

/// Builds and publishes notifications for matched events
pub struct NotificationDispatcher {
    topic: String,
    publisher: Arc<dyn Publisher>,
}

impl NotificationDispatcher {
    pub fn new(topic: impl Into<String>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            topic: topic.into(),
            publisher,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish the summary of one event
    pub async fn notify(&self, event: &Event) -> Result<(), NotifyError> {
        let result = match Notification::from_event(event) {
            Ok(notification) => self.publisher.publish(&self.topic, &notification).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = &result {
            warn!(topic = %self.topic, event_id = ?event.id, error = %e, "Notification not delivered");
        }
        result
    }
}
