use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted after state changes commit. Consumed out-of-band;
/// failure to deliver an event never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PasswordResetRequested { user_id: Uuid },
    PasswordResetCompleted { user_id: Uuid },
    ProfileUpdated { user_id: Uuid },
    AddressCreated { user_id: Uuid, address_id: Uuid },
    AddressUpdated { user_id: Uuid, address_id: Uuid },
    AddressDeleted { user_id: Uuid, address_id: Uuid },
    DefaultAddressChanged { user_id: Uuid, address_id: Uuid },
    SettingsUpdated { user_id: Uuid },
    AccountDeleted { user_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::PasswordResetRequested { user_id } => {
                info!(%user_id, "Password reset requested");
            }
            Event::PasswordResetCompleted { user_id } => {
                info!(%user_id, "Password reset completed");
            }
            Event::ProfileUpdated { user_id } => {
                info!(%user_id, "Profile updated");
            }
            Event::AddressCreated { user_id, address_id } => {
                info!(%user_id, %address_id, "Address created");
            }
            Event::AddressUpdated { user_id, address_id } => {
                info!(%user_id, %address_id, "Address updated");
            }
            Event::AddressDeleted { user_id, address_id } => {
                info!(%user_id, %address_id, "Address deleted");
            }
            Event::DefaultAddressChanged { user_id, address_id } => {
                info!(%user_id, %address_id, "Default address changed");
            }
            Event::SettingsUpdated { user_id } => {
                info!(%user_id, "Notification settings updated");
            }
            Event::AccountDeleted { user_id } => {
                info!(%user_id, "Account deleted");
            }
        }
    }

    info!("Event channel closed, consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let user_id = Uuid::new_v4();

        sender
            .send(Event::ProfileUpdated { user_id })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::ProfileUpdated { user_id: got }) => assert_eq!(got, user_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::AccountDeleted {
                user_id: Uuid::new_v4(),
            })
            .await;
        assert!(result.is_err());
    }
}
