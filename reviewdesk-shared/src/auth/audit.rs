/// Fire-and-forget audit sink
///
/// Security events are written on a spawned task so the request never waits
/// for the audit store. A failed write is logged and dropped; it cannot change
/// the outcome of the request that produced it.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::audit::{AuditEventType, AuditSeverity, NewAuditEvent};
use crate::store::AuditStore;

/// Handle for recording audit events
#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn AuditStore>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Records an event in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn log(
        &self,
        actor_id: Option<Uuid>,
        event_type: AuditEventType,
        details: JsonValue,
        severity: AuditSeverity,
    ) {
        let store = Arc::clone(&self.store);
        let event = NewAuditEvent {
            actor_id,
            event_type,
            severity,
            details,
        };

        tokio::spawn(async move {
            if let Err(e) = store.record(event).await {
                tracing::error!(
                    error = %e,
                    event_type = event_type.as_str(),
                    actor_id = ?actor_id,
                    "Failed to write audit event"
                );
            }
        });
    }
}
