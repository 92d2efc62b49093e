use anchor_types::Activity;
use tokio::sync::broadcast;

use crate::{activity::ActivityStore, AnchorStoreError};

const OUTBOX_CAPACITY: usize = 256;

/// The node's outgoing activity stream. Activities are persisted in the
/// activity store and fanned out to the external activity subscriber
/// (the federation layer), which replicates them to peers.
#[derive(Debug, Clone)]
pub struct Outbox {
    activities: ActivityStore,
    sender: broadcast::Sender<Activity>,
}

impl Outbox {
    pub fn new(activities: ActivityStore) -> Self {
        let (sender, _) = broadcast::channel(OUTBOX_CAPACITY);
        Self { activities, sender }
    }

    /// Persists and broadcasts an activity. Absence of subscribers is
    /// not an error: the store remains the source of truth for
    /// replication catch-up.
    pub async fn publish(&self, activity: Activity) -> Result<(), AnchorStoreError> {
        self.activities.put(&activity).await?;

        if self.sender.send(activity.clone()).is_err() {
            tracing::debug!(
                "No live subscribers for activity [{}]; stored for catch-up",
                activity.id
            );
        }
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.sender.subscribe()
    }
}
