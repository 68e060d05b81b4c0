//! Fan-out of board snapshots to connected viewers.
//!
//! A single supervisor task owns the set of viewer outboxes. Registration,
//! removal and publishing all reach it as commands on one channel, so they are
//! applied in the order they were issued and never race each other.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ViewerId = Uuid;

pub type Snapshot = Arc<str>;

enum HubCommand {
    Register {
        id: ViewerId,
        outbox: mpsc::Sender<Snapshot>,
    },
    Unregister {
        id: ViewerId,
    },
    Publish {
        snapshot: Snapshot,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the broadcast supervisor. Cheap to clone.
#[derive(Clone, Debug)]
pub struct BroadcastHub {
    commands: mpsc::UnboundedSender<HubCommand>,
    outbox_capacity: usize,
}

/// A registered viewer: snapshots published after registration arrive on `updates`, in order.
pub struct Viewer {
    pub id: ViewerId,
    pub updates: mpsc::Receiver<Snapshot>,
}

impl BroadcastHub {
    /// Spawns the supervisor on the current runtime.
    ///
    /// `outbox_capacity` is how many undelivered snapshots a viewer may fall
    /// behind before it is dropped.
    pub fn spawn(outbox_capacity: usize) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(supervise(rx));
        Self {
            commands,
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    pub fn register(&self) -> Viewer {
        let id = Uuid::new_v4();
        let (outbox, updates) = mpsc::channel(self.outbox_capacity);
        self.send(HubCommand::Register { id, outbox });
        Viewer { id, updates }
    }

    pub fn unregister(&self, id: ViewerId) {
        self.send(HubCommand::Unregister { id });
    }

    /// Queues `snapshot` for every viewer registered so far. Never blocks.
    pub fn publish(&self, snapshot: impl Into<Snapshot>) {
        self.send(HubCommand::Publish {
            snapshot: snapshot.into(),
        });
    }

    pub async fn viewer_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Count { reply });
        rx.await.unwrap_or(0)
    }

    fn send(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            warn!("Broadcast supervisor is gone, dropping command");
        }
    }
}

async fn supervise(mut commands: mpsc::UnboundedReceiver<HubCommand>) {
    let mut viewers: HashMap<ViewerId, mpsc::Sender<Snapshot>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Register { id, outbox } => {
                viewers.insert(id, outbox);
                info!(viewer = %id, viewers = viewers.len(), "Viewer registered");
            }
            HubCommand::Unregister { id } => {
                if viewers.remove(&id).is_some() {
                    info!(viewer = %id, viewers = viewers.len(), "Viewer unregistered");
                }
            }
            HubCommand::Publish { snapshot } => {
                viewers.retain(|id, outbox| match outbox.try_send(Arc::clone(&snapshot)) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(viewer = %id, "Viewer is not keeping up, dropping it");
                        false
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(viewer = %id, "Viewer went away, dropping it");
                        false
                    }
                });
                debug!(viewers = viewers.len(), "Snapshot published");
            }
            HubCommand::Count { reply } => {
                let _ = reply.send(viewers.len());
            }
        }
    }

    debug!("Broadcast supervisor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_viewer_gets_every_snapshot_in_order() {
        let hub = BroadcastHub::spawn(8);
        let mut a = hub.register();
        let mut b = hub.register();

        for n in 0..3 {
            hub.publish(format!("board-{n}"));
        }

        for viewer in [&mut a, &mut b] {
            for n in 0..3 {
                let got = viewer.updates.recv().await.unwrap();
                assert_eq!(&*got, format!("board-{n}"));
            }
        }
    }

    #[tokio::test]
    async fn viewers_only_see_snapshots_after_registering() {
        let hub = BroadcastHub::spawn(8);
        hub.publish("before");
        let mut viewer = hub.register();
        hub.publish("after");

        assert_eq!(&*viewer.updates.recv().await.unwrap(), "after");
    }

    #[tokio::test]
    async fn closed_viewer_is_dropped_without_affecting_others() {
        let hub = BroadcastHub::spawn(8);
        let gone = hub.register();
        let mut alive = hub.register();
        drop(gone);

        hub.publish("one");
        assert_eq!(&*alive.updates.recv().await.unwrap(), "one");
        assert_eq!(hub.viewer_count().await, 1);
    }

    #[tokio::test]
    async fn slow_viewer_is_dropped() {
        let hub = BroadcastHub::spawn(1);
        let mut slow = hub.register();
        let mut fast = hub.register();

        hub.publish("one");
        assert_eq!(&*fast.updates.recv().await.unwrap(), "one");
        hub.publish("two");
        assert_eq!(&*fast.updates.recv().await.unwrap(), "two");

        assert_eq!(hub.viewer_count().await, 1);
        assert_eq!(&*slow.updates.recv().await.unwrap(), "one");
        assert!(slow.updates.recv().await.is_none());
    }

    #[tokio::test]
    async fn unregister_removes_viewer() {
        let hub = BroadcastHub::spawn(8);
        let viewer = hub.register();
        assert_eq!(hub.viewer_count().await, 1);

        hub.unregister(viewer.id);
        assert_eq!(hub.viewer_count().await, 0);
    }
}
