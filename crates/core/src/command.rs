// Commands sent to the native engine and the transport seam

use crate::error::Result;
use crate::id::InstanceId;
use crate::status::AudioKind;
use serde_json::{json, Value};

/// Fire-and-forget command for the native engine
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCommand {
    CreateInstance {
        id: InstanceId,
        kind: AudioKind,
        path: String,
    },
    Play {
        id: InstanceId,
    },
    Stop {
        id: InstanceId,
    },
    Release {
        id: InstanceId,
    },
    SetVolume {
        id: InstanceId,
        left: f32,
        right: f32,
    },
}

impl NativeCommand {
    /// Operation name on the native side
    pub fn op(&self) -> &'static str {
        match self {
            NativeCommand::CreateInstance { .. } => "createAudioInstance",
            NativeCommand::Play { .. } => "play",
            NativeCommand::Stop { .. } => "stop",
            NativeCommand::Release { .. } => "release",
            NativeCommand::SetVolume { .. } => "setVolume",
        }
    }

    pub fn id(&self) -> &InstanceId {
        match self {
            NativeCommand::CreateInstance { id, .. }
            | NativeCommand::Play { id }
            | NativeCommand::Stop { id }
            | NativeCommand::Release { id }
            | NativeCommand::SetVolume { id, .. } => id,
        }
    }

    /// Positional arguments, in the order the native side reads them
    pub fn args(&self) -> Vec<Value> {
        match self {
            NativeCommand::CreateInstance { id, kind, path } => {
                vec![json!(id), json!(kind), json!(path)]
            }
            NativeCommand::Play { id } | NativeCommand::Stop { id } | NativeCommand::Release { id } => {
                vec![json!(id)]
            }
            NativeCommand::SetVolume { id, left, right } => {
                vec![json!(id), json!(left), json!(right)]
            }
        }
    }
}

/// Outbound half of the native channel
pub trait CommandSink: Send + Sync {
    /// Dispatch a command; no result is awaited
    fn send_command(&self, command: NativeCommand);
}

/// Handler invoked once per inbound native message
pub type NotificationHandler = Box<dyn Fn(Value) + Send + Sync>;

/// Full native channel: commands out, notifications in
pub trait NativeTransport: CommandSink {
    /// Register the single process-wide notification handler
    fn on_notification(&self, handler: NotificationHandler) -> Result<()>;
}

/// Sink that records commands, for tests
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    commands: parking_lot::Mutex<Vec<NativeCommand>>,
    pub handler: parking_lot::Mutex<Option<NotificationHandler>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn commands(&self) -> Vec<NativeCommand> {
        self.commands.lock().clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.commands.lock().iter().map(NativeCommand::op).collect()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

#[cfg(test)]
impl CommandSink for RecordingSink {
    fn send_command(&self, command: NativeCommand) {
        self.commands.lock().push(command);
    }
}

#[cfg(test)]
impl NativeTransport for RecordingSink {
    fn on_notification(&self, handler: NotificationHandler) -> Result<()> {
        *self.handler.lock() = Some(handler);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_instance_args() {
        let cmd = NativeCommand::CreateInstance {
            id: InstanceId::new("a"),
            kind: AudioKind::Music,
            path: "a.mp3".into(),
        };
        assert_eq!(cmd.op(), "createAudioInstance");
        assert_eq!(cmd.args(), vec![json!("a"), json!("music"), json!("a.mp3")]);
    }

    #[test]
    fn test_set_volume_args() {
        let cmd = NativeCommand::SetVolume {
            id: InstanceId::new("a"),
            left: 0.5,
            right: 0.25,
        };
        assert_eq!(cmd.op(), "setVolume");
        assert_eq!(cmd.id().as_str(), "a");
        assert_eq!(cmd.args(), vec![json!("a"), json!(0.5), json!(0.25)]);
    }
}
