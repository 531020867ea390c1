// Audio instance status and kind enumerations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an audio instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstanceStatus {
    /// Created, nothing loaded yet
    Empty,
    /// Native side is preparing the resource
    Loading,
    /// Resource is ready to play
    Loaded,
    /// Audio is currently playing
    Playing,
    /// A loop restarted from the beginning
    Looping,
    /// Playback has stopped
    Stopped,
    /// Native resources are gone; terminal
    Released,
    /// Native side reported an error
    Error,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 8] = [
        InstanceStatus::Empty,
        InstanceStatus::Loading,
        InstanceStatus::Loaded,
        InstanceStatus::Playing,
        InstanceStatus::Looping,
        InstanceStatus::Stopped,
        InstanceStatus::Released,
        InstanceStatus::Error,
    ];

    /// Status code as it travels over the native channel.
    pub fn as_wire(self) -> &'static str {
        match self {
            InstanceStatus::Empty => "EMPTY",
            InstanceStatus::Loading => "LOADING",
            InstanceStatus::Loaded => "LOADED",
            InstanceStatus::Playing => "PLAYING",
            InstanceStatus::Looping => "LOOPING",
            InstanceStatus::Stopped => "STOPPED",
            InstanceStatus::Released => "RELEASED",
            InstanceStatus::Error => "ERROR",
        }
    }

    pub fn from_wire(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_wire() == code)
    }

    pub fn is_terminal(self) -> bool {
        self == InstanceStatus::Released
    }

    /// Commands are only accepted while neither released nor errored.
    pub fn accepts_commands(self) -> bool {
        !matches!(self, InstanceStatus::Released | InstanceStatus::Error)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Status code decoded from an inbound message.
///
/// Codes outside the known set are kept so they can be reported as a
/// protocol error instead of silently passing through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireStatus {
    Known(InstanceStatus),
    Unrecognized(String),
}

impl From<&str> for WireStatus {
    fn from(code: &str) -> Self {
        match InstanceStatus::from_wire(code) {
            Some(status) => WireStatus::Known(status),
            None => WireStatus::Unrecognized(code.to_string()),
        }
    }
}

/// Kind of audio handled by the native engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioKind {
    /// Gapless looping background audio
    Loop,
    /// Long-form music track
    Music,
    /// Short sound effect
    Sound,
}

impl AudioKind {
    pub fn as_wire(self) -> &'static str {
        match self {
            AudioKind::Loop => "loop",
            AudioKind::Music => "music",
            AudioKind::Sound => "sound",
        }
    }

    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "loop" => Some(AudioKind::Loop),
            "music" => Some(AudioKind::Music),
            "sound" => Some(AudioKind::Sound),
            _ => None,
        }
    }
}

impl fmt::Display for AudioKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
