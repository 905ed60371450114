use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor has
    /// shut down. Domain operations never fail because of event delivery.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    TemplateCreated(Uuid),
    TemplateUpdated(Uuid),

    // Checkout events
    CheckoutSessionCreated {
        kind: String,
        template_id: Option<Uuid>,
        price_id: String,
    },

    // Entitlement events
    PurchaseRecorded {
        purchase_id: Uuid,
        stripe_session_id: String,
    },
    DownloadIssued {
        template_id: Uuid,
        stripe_session_id: String,
    },

    // Consultation events
    ConsultationRequested(Uuid),
    ConsultationStatusChanged {
        request_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

/// Event processing loop. Events are observational here: they feed logs and
/// whatever downstream integrations a deployment wires in.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PurchaseRecorded {
                purchase_id,
                stripe_session_id,
            } => {
                info!(
                    purchase_id = %purchase_id,
                    session_id = %stripe_session_id,
                    "Purchase recorded"
                );
            }
            Event::DownloadIssued {
                template_id,
                stripe_session_id,
            } => {
                info!(
                    template_id = %template_id,
                    session_id = %stripe_session_id,
                    "Download issued"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out
        sender.send_or_log(Event::TemplateCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender.send(Event::ConsultationRequested(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::ConsultationRequested(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
