// Core types for tracking audio instances driven by a native engine

pub mod callback;
pub mod command;
pub mod error;
pub mod id;
pub mod instance;
pub mod message;
pub mod ready;
pub mod registry;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use callback::{ChannelListener, NoopListener, StatusEvent, StatusListener};
pub use command::{CommandSink, NativeCommand, NativeTransport, NotificationHandler};
pub use error::{Result, YanapError};
pub use id::{IdGenerator, InstanceId, SequentialIds};
#[cfg(feature = "uuid")]
pub use id::UuidGenerator;
pub use instance::AudioInstance;
pub use message::NativeMessage;
pub use ready::ReadyGate;
pub use registry::InstanceRegistry;
pub use session::{AudioHandle, Session, SessionStats};
pub use status::{AudioKind, InstanceStatus, WireStatus};
