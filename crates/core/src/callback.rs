// Status listeners attached to audio instances
// A listener is called on every accepted status transition of its instance

use crate::id::InstanceId;
use crate::status::InstanceStatus;
use crossbeam_channel::Sender;

/// Status change delivered to a listener
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub id: InstanceId,
    pub status: InstanceStatus,
    /// Diagnostic text sent along with the status, mostly for `ERROR`
    pub info: Option<String>,
}

/// Listener trait for status updates
/// Implementations should be lightweight; notifications are processed one at a time
pub trait StatusListener: Send + Sync {
    fn on_status_update(&self, event: &StatusEvent);
}

impl<F> StatusListener for F
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    fn on_status_update(&self, event: &StatusEvent) {
        self(event)
    }
}

/// Listener that forwards events into a channel
/// Lets the owner consume status updates on a thread of its choosing
pub struct ChannelListener {
    sender: Sender<StatusEvent>,
}

impl ChannelListener {
    pub fn new(sender: Sender<StatusEvent>) -> Self {
        Self { sender }
    }
}

impl StatusListener for ChannelListener {
    fn on_status_update(&self, event: &StatusEvent) {
        if self.sender.send(event.clone()).is_err() {
            log::debug!(
                "status listener for `{}` dropped, {} not delivered",
                event.id,
                event.status
            );
        }
    }
}

/// Listener that ignores every event
pub struct NoopListener;

impl StatusListener for NoopListener {
    fn on_status_update(&self, _event: &StatusEvent) {}
}

/// Recording listener for tests
#[cfg(test)]
pub struct RecordingListener {
    events: parking_lot::Mutex<Vec<StatusEvent>>,
}

#[cfg(test)]
impl RecordingListener {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    pub fn statuses(&self) -> Vec<InstanceStatus> {
        self.events.lock().iter().map(|e| e.status).collect()
    }
}

#[cfg(test)]
impl StatusListener for RecordingListener {
    fn on_status_update(&self, event: &StatusEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: InstanceStatus) -> StatusEvent {
        StatusEvent {
            id: InstanceId::new("a"),
            status,
            info: None,
        }
    }

    #[test]
    fn test_channel_listener_forwards() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let listener = ChannelListener::new(tx);
        listener.on_status_update(&event(InstanceStatus::Loading));
        listener.on_status_update(&event(InstanceStatus::Loaded));

        let received: Vec<_> = rx.try_iter().map(|e| e.status).collect();
        assert_eq!(
            received,
            vec![InstanceStatus::Loading, InstanceStatus::Loaded]
        );
    }

    #[test]
    fn test_channel_listener_survives_dropped_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let listener = ChannelListener::new(tx);
        listener.on_status_update(&event(InstanceStatus::Playing));
    }

    #[test]
    fn test_closure_listener() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener = move |e: &StatusEvent| sink.lock().push(e.status);
        listener.on_status_update(&event(InstanceStatus::Stopped));
        assert_eq!(*seen.lock(), vec![InstanceStatus::Stopped]);
    }
}
