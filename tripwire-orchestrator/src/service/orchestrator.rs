//! Event orchestrator
//!
//! Entry point for delivered events. Each rule whose pattern matches gets
//! its own trigger task, and one notification task runs per matched event.
//! The paths are independent: a notification failure never blocks a
//! trigger, and a trigger failure never suppresses the notification.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tripwire_core::domain::event::Event;
use tripwire_core::domain::pattern::matches;
use tripwire_core::dto::event::{DeliveryOutcome, DispatchReport, TriggerOutcome};

use crate::service::engine::Engine;
use crate::service::notification::NotificationDispatcher;
use crate::service::trigger::{TriggerHandler, TriggerRule};

pub struct Orchestrator {
    handlers: Vec<Arc<TriggerHandler>>,
    notifications: Arc<NotificationDispatcher>,
}

impl Orchestrator {
    pub fn new(engine: Engine, rules: &[TriggerRule], notifications: NotificationDispatcher) -> Self {
        let handlers = rules
            .iter()
            .cloned()
            .map(|rule| Arc::new(TriggerHandler::new(engine.clone(), rule)))
            .collect();

        Self {
            handlers,
            notifications: Arc::new(notifications),
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = &TriggerRule> {
        self.handlers.iter().map(|h| h.rule())
    }

    /// Route one event to every matching rule and to the notification topic
    ///
    /// Events no rule matches are dropped silently.
    pub async fn dispatch(&self, event: Event) -> DispatchReport {
        let matched: Vec<Arc<TriggerHandler>> = self
            .handlers
            .iter()
            .filter(|h| matches(&event, &h.rule().pattern))
            .cloned()
            .collect();

        let mut report = DispatchReport {
            event_id: event.id.clone(),
            ..Default::default()
        };

        if matched.is_empty() {
            debug!(event_id = ?event.id, source = %event.source, "Event matched no rule");
            return report;
        }

        info!(event_id = ?event.id, rules = matched.len(), "Dispatching event");
        let event = Arc::new(event);

        let notify_task = {
            let notifications = Arc::clone(&self.notifications);
            let event = Arc::clone(&event);
            tokio::spawn(async move { notifications.notify(&event).await })
        };

        let trigger_tasks: Vec<(Arc<TriggerHandler>, JoinHandle<_>)> = matched
            .into_iter()
            .map(|handler| {
                let task = {
                    let handler = Arc::clone(&handler);
                    let event = Arc::clone(&event);
                    tokio::spawn(async move { handler.on_event(&event).await })
                };
                (handler, task)
            })
            .collect();

        for (handler, task) in trigger_tasks {
            let rule = handler.rule();
            let (execution_id, error) = match task.await {
                Ok(Ok(handle)) => (Some(handle), None),
                Ok(Err(e)) => (None, Some(e.to_string())),
                Err(e) => {
                    error!(rule = %rule.name, error = %e, "Trigger task panicked");
                    (None, Some(format!("trigger task failed: {}", e)))
                }
            };

            report.triggers.push(TriggerOutcome {
                rule: rule.name.clone(),
                pipeline_name: rule.pipeline_name.clone(),
                execution_id,
                error,
            });
        }

        let error = match notify_task.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => {
                error!(error = %e, "Notification task panicked");
                Some(format!("notification task failed: {}", e))
            }
        };
        report.notification = Some(DeliveryOutcome {
            topic: self.notifications.topic().to_string(),
            delivered: error.is_none(),
            error,
        });

        report
    }
}
