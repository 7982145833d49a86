use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::model::Serial;
use crate::reconciler::ChangeSet;
use crate::view::DeviceGroup;

/// Rendering-side collaborator. Implementations read the store after being
/// notified and never mutate it.
#[async_trait]
pub trait ViewObserver: Send + Sync {
    async fn roster_rebuilt(&self, groups: &[DeviceGroup]);

    async fn view_states_updated(&self, changed: &[Serial]);
}

/// Delivers a change-set, skipping incremental passes that changed nothing.
pub async fn notify(observer: &dyn ViewObserver, change: &ChangeSet) {
    match change {
        ChangeSet::Rebuilt(groups) => observer.roster_rebuilt(groups).await,
        ChangeSet::Updated(changed) if !changed.is_empty() => {
            observer.view_states_updated(changed).await
        }
        ChangeSet::Updated(_) => {}
    }
}

/// Forwards change-sets over a channel, so a single UI thread can apply them.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ChangeSet>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChangeSet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, change: ChangeSet) {
        if self.tx.send(change).is_err() {
            debug!("View receiver dropped, discarding change");
        }
    }
}

#[async_trait]
impl ViewObserver for ChannelObserver {
    async fn roster_rebuilt(&self, groups: &[DeviceGroup]) {
        self.send(ChangeSet::Rebuilt(groups.to_vec()));
    }

    async fn view_states_updated(&self, changed: &[Serial]) {
        self.send(ChangeSet::Updated(changed.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::serial;

    #[tokio::test]
    async fn test_channel_observer_forwards_changes() {
        let (observer, mut rx) = ChannelObserver::new();
        notify(&observer, &ChangeSet::Rebuilt(vec![])).await;
        notify(&observer, &ChangeSet::Updated(vec![])).await;
        notify(&observer, &ChangeSet::Updated(vec![serial(4)])).await;

        assert_eq!(rx.recv().await, Some(ChangeSet::Rebuilt(vec![])));
        assert_eq!(rx.recv().await, Some(ChangeSet::Updated(vec![serial(4)])));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channel_observer_tolerates_closed_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.view_states_updated(&[serial(1)]).await;
    }
}
