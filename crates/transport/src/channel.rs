// In-process native channel built on crossbeam channels
// The session side sends commands and receives notifications on a
// dedicated dispatcher thread; the engine side does the opposite.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use yanap_core::{
    CommandSink, InstanceId, InstanceStatus, NativeCommand, NativeTransport, NotificationHandler,
    Result, YanapError,
};

/// Build a connected transport / engine endpoint pair
pub fn channel_pair() -> (ChannelTransport, EngineEndpoint) {
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (notify_tx, notify_rx) = crossbeam_channel::unbounded();

    let transport = ChannelTransport {
        commands: command_tx,
        notifications: Mutex::new(Some(notify_rx)),
        dispatcher: Mutex::new(None),
    };
    let endpoint = EngineEndpoint {
        commands: command_rx,
        notifier: Notifier { sender: notify_tx },
    };
    (transport, endpoint)
}

/// Session side of the channel
pub struct ChannelTransport {
    commands: Sender<NativeCommand>,
    notifications: Mutex<Option<Receiver<Value>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelTransport {
    /// Wait for the dispatcher thread to finish. It exits once every
    /// engine-side sender is gone. Returns false if nothing was attached.
    pub fn join_dispatcher(&self) -> bool {
        let handle = self.dispatcher.lock().take();
        match handle {
            Some(handle) => {
                if handle.join().is_err() {
                    log::error!("notification dispatcher panicked");
                }
                true
            }
            None => false,
        }
    }
}

impl CommandSink for ChannelTransport {
    fn send_command(&self, command: NativeCommand) {
        let op = command.op();
        let id = command.id().clone();
        if self.commands.send(command).is_err() {
            log::error!("native engine disconnected, dropping {} for `{}`", op, id);
        }
    }
}

impl NativeTransport for ChannelTransport {
    fn on_notification(&self, handler: NotificationHandler) -> Result<()> {
        let receiver = self
            .notifications
            .lock()
            .take()
            .ok_or_else(|| YanapError::Transport("notification channel already attached".into()))?;

        let handle = thread::Builder::new()
            .name("yanap-notify".into())
            .spawn(move || {
                for message in receiver.iter() {
                    handler(message);
                }
                log::info!("notification channel closed");
            })
            .map_err(|e| YanapError::Transport(format!("spawn dispatcher: {}", e)))?;

        *self.dispatcher.lock() = Some(handle);
        Ok(())
    }
}

/// Encode a status update the way the native side sends it
pub fn status_message(id: &InstanceId, status: InstanceStatus, info: Option<&str>) -> Value {
    let mut message = json!({
        "msgType": "statusUpdate",
        "audioUid": id,
        "newStatus": status.as_wire(),
    });
    if let Some(info) = info.filter(|info| !info.is_empty()) {
        message["additionalInfo"] = Value::from(info);
    }
    message
}

pub fn file_length_message(id: &InstanceId, length: i64) -> Value {
    json!({
        "msgType": "fileLength",
        "audioUid": id,
        "fileLength": length,
    })
}

/// Cloneable sender for engine-side notifications
#[derive(Clone)]
pub struct Notifier {
    sender: Sender<Value>,
}

impl Notifier {
    /// Push a raw message. Returns false once the session side is gone.
    pub fn send_raw(&self, message: Value) -> bool {
        self.sender.send(message).is_ok()
    }

    /// Push a message given as JSON text; invalid JSON is logged and dropped
    pub fn send_json(&self, text: &str) -> bool {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.send_raw(message),
            Err(err) => {
                log::error!("refusing to send invalid JSON notification: {}", err);
                false
            }
        }
    }

    pub fn send_status(&self, id: &InstanceId, status: InstanceStatus, info: Option<&str>) -> bool {
        self.send_raw(status_message(id, status, info))
    }

    pub fn send_file_length(&self, id: &InstanceId, length: i64) -> bool {
        self.send_raw(file_length_message(id, length))
    }
}

/// Engine side of the channel
pub struct EngineEndpoint {
    commands: Receiver<NativeCommand>,
    notifier: Notifier,
}

impl EngineEndpoint {
    /// Block for the next command; `None` once the session side is gone
    pub fn recv_command(&self) -> Option<NativeCommand> {
        self.commands.recv().ok()
    }

    pub fn recv_command_timeout(&self, timeout: Duration) -> Option<NativeCommand> {
        match self.commands.recv_timeout(timeout) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv_command(&self) -> Option<NativeCommand> {
        self.commands.try_recv().ok()
    }

    pub fn commands(&self) -> crossbeam_channel::Iter<'_, NativeCommand> {
        self.commands.iter()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn send_status(&self, id: &InstanceId, status: InstanceStatus, info: Option<&str>) -> bool {
        self.notifier.send_status(id, status, info)
    }

    pub fn send_file_length(&self, id: &InstanceId, length: i64) -> bool {
        self.notifier.send_file_length(id, length)
    }

    pub fn send_raw(&self, message: Value) -> bool {
        self.notifier.send_raw(message)
    }

    pub fn send_json(&self, text: &str) -> bool {
        self.notifier.send_json(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use yanap_core::{
        AudioKind, ChannelListener, SequentialIds, Session, StatusEvent, StatusListener,
    };

    const WAIT: Duration = Duration::from_secs(5);

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_commands_reach_engine() {
        let (transport, endpoint) = channel_pair();
        transport.send_command(NativeCommand::Play {
            id: InstanceId::new("a"),
        });
        assert_eq!(
            endpoint.try_recv_command(),
            Some(NativeCommand::Play {
                id: InstanceId::new("a")
            })
        );
        assert_eq!(endpoint.try_recv_command(), None);
    }

    #[test]
    fn test_send_to_dropped_engine_is_harmless() {
        init_logs();
        let (transport, endpoint) = channel_pair();
        drop(endpoint);
        transport.send_command(NativeCommand::Stop {
            id: InstanceId::new("a"),
        });
    }

    #[test]
    fn test_notifications_dispatched_in_order() {
        let (transport, endpoint) = channel_pair();
        let (tx, rx) = crossbeam_channel::unbounded();
        transport
            .on_notification(Box::new(move |message| {
                let _ = tx.send(message);
            }))
            .unwrap();

        let id = InstanceId::new("a");
        let notifier = endpoint.notifier().clone();
        notifier.send_status(&id, InstanceStatus::Loading, None);
        notifier.send_file_length(&id, 100);
        notifier.send_status(&id, InstanceStatus::Error, Some("boom"));

        let first = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(first["newStatus"], "LOADING");
        assert!(first.get("additionalInfo").is_none());
        assert_eq!(rx.recv_timeout(WAIT).unwrap()["fileLength"], 100);
        assert_eq!(rx.recv_timeout(WAIT).unwrap()["additionalInfo"], "boom");

        drop(notifier);
        drop(endpoint);
        assert!(transport.join_dispatcher());
    }

    #[test]
    fn test_attach_only_once() {
        let (transport, _endpoint) = channel_pair();
        transport.on_notification(Box::new(|_| {})).unwrap();
        let err = transport.on_notification(Box::new(|_| {})).unwrap_err();
        assert!(matches!(err, YanapError::Transport(_)));
    }

    #[test]
    fn test_invalid_json_not_sent() {
        init_logs();
        let (_transport, endpoint) = channel_pair();
        assert!(!endpoint.send_json("{oops"));
        assert!(endpoint.send_json(r#"{"msgType":"fileLength","audioUid":"a","fileLength":1}"#));
    }

    #[test]
    fn test_session_over_channel() {
        init_logs();
        let (transport, endpoint) = channel_pair();
        let transport = Arc::new(transport);
        let session = Session::with_id_generator(transport.clone(), Arc::new(SequentialIds::new("c")));

        let (tx, rx) = crossbeam_channel::unbounded::<StatusEvent>();
        let listener: Arc<dyn StatusListener> = Arc::new(ChannelListener::new(tx));
        let music = session.create_instance(AudioKind::Music, listener);
        assert!(session.is_ready());

        music.load("a.mp3");
        let command = endpoint.recv_command_timeout(WAIT).unwrap();
        assert_eq!(command.op(), "createAudioInstance");

        endpoint.send_file_length(music.id(), 2048);
        endpoint.send_status(music.id(), InstanceStatus::Loading, None);
        endpoint.send_status(music.id(), InstanceStatus::Loaded, None);
        assert_eq!(rx.recv_timeout(WAIT).unwrap().status, InstanceStatus::Loading);
        assert_eq!(rx.recv_timeout(WAIT).unwrap().status, InstanceStatus::Loaded);
        assert_eq!(music.content_length(), Some(2048));

        music.release();
        assert_eq!(endpoint.recv_command_timeout(WAIT).unwrap().op(), "release");
        endpoint.send_status(music.id(), InstanceStatus::Released, None);
        assert_eq!(rx.recv_timeout(WAIT).unwrap().status, InstanceStatus::Released);

        drop(endpoint);
        assert!(transport.join_dispatcher());
        assert_eq!(session.instance_count(), 0);
    }
}
