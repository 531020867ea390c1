// Audio instance record and its status transitions

use crate::callback::{StatusEvent, StatusListener};
use crate::error::{Result, YanapError};
use crate::id::InstanceId;
use crate::status::{AudioKind, InstanceStatus};
use std::sync::Arc;

/// Outcome of applying a status notification to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status was updated; the listener must be told
    Applied,
    /// A repeated `ERROR`; nothing changes and nobody is told
    Suppressed,
}

/// One live audio handle as tracked by the registry
pub struct AudioInstance {
    id: InstanceId,
    kind: AudioKind,
    status: InstanceStatus,
    source_path: Option<String>,
    content_length: Option<u64>,
    listener: Arc<dyn StatusListener>,
}

impl AudioInstance {
    pub fn new(id: InstanceId, kind: AudioKind, listener: Arc<dyn StatusListener>) -> Self {
        Self {
            id,
            kind,
            status: InstanceStatus::Empty,
            source_path: None,
            content_length: None,
            listener,
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn kind(&self) -> AudioKind {
        self.kind
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Byte length of the loaded resource, once the engine reported it
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn listener(&self) -> Arc<dyn StatusListener> {
        self.listener.clone()
    }

    /// Ok when the instance may still receive commands.
    pub fn ensure_alive(&self) -> Result<()> {
        match self.status {
            InstanceStatus::Released => Err(YanapError::Released(self.id.clone())),
            InstanceStatus::Error => Err(YanapError::Errored(self.id.clone())),
            _ => Ok(()),
        }
    }

    /// Ok once a load was handed to the engine, so play/stop/volume have
    /// something to act on. The engine keeps a play sent while loading.
    pub fn ensure_loaded(&self) -> Result<()> {
        self.ensure_alive()?;
        if self.status == InstanceStatus::Empty && self.source_path.is_none() {
            return Err(YanapError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                reason: "nothing loaded yet",
            });
        }
        Ok(())
    }

    /// Record the resource path; only valid once, while `EMPTY`. A second
    /// load before the engine answered the first is refused as well.
    pub fn begin_load(&mut self, path: &str) -> Result<()> {
        self.ensure_alive()?;
        if self.status != InstanceStatus::Empty {
            return Err(YanapError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                reason: "load is only available on an EMPTY instance",
            });
        }
        if self.source_path.is_some() {
            return Err(YanapError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                reason: "a load was already requested",
            });
        }
        self.source_path = Some(path.to_string());
        Ok(())
    }

    pub fn apply_status(&mut self, status: InstanceStatus) -> Transition {
        if self.status == InstanceStatus::Error && status == InstanceStatus::Error {
            return Transition::Suppressed;
        }
        self.status = status;
        Transition::Applied
    }

    pub fn set_content_length(&mut self, length: i64) {
        self.content_length = u64::try_from(length).ok();
    }

    pub fn event(&self, info: Option<String>) -> StatusEvent {
        StatusEvent {
            id: self.id.clone(),
            status: self.status,
            info,
        }
    }
}

impl std::fmt::Debug for AudioInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioInstance")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("source_path", &self.source_path)
            .field("content_length", &self.content_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NoopListener;

    fn instance() -> AudioInstance {
        AudioInstance::new(InstanceId::new("a"), AudioKind::Music, Arc::new(NoopListener))
    }

    #[test]
    fn test_new_instance_is_empty() {
        let ai = instance();
        assert_eq!(ai.status(), InstanceStatus::Empty);
        assert_eq!(ai.source_path(), None);
        assert_eq!(ai.content_length(), None);
        assert!(ai.ensure_alive().is_ok());
        assert!(ai.ensure_loaded().is_err());
    }

    #[test]
    fn test_load_only_once() {
        let mut ai = instance();
        ai.begin_load("a.mp3").unwrap();
        ai.apply_status(InstanceStatus::Loading);

        assert!(ai.ensure_loaded().is_ok());

        let err = ai.begin_load("b.mp3").unwrap_err();
        assert!(matches!(err, YanapError::InvalidState { .. }));
        assert_eq!(ai.source_path(), Some("a.mp3"));
    }

    #[test]
    fn test_error_is_sticky_only_for_errors() {
        let mut ai = instance();
        assert_eq!(ai.apply_status(InstanceStatus::Error), Transition::Applied);
        assert_eq!(ai.apply_status(InstanceStatus::Error), Transition::Suppressed);
        assert!(matches!(ai.ensure_alive(), Err(YanapError::Errored(_))));

        // Native side recovered
        assert_eq!(ai.apply_status(InstanceStatus::Loaded), Transition::Applied);
        assert!(ai.ensure_loaded().is_ok());
    }

    #[test]
    fn test_repeated_non_error_status_is_applied() {
        let mut ai = instance();
        assert_eq!(ai.apply_status(InstanceStatus::Playing), Transition::Applied);
        assert_eq!(ai.apply_status(InstanceStatus::Playing), Transition::Applied);
    }

    #[test]
    fn test_negative_length_is_unknown() {
        let mut ai = instance();
        ai.set_content_length(1024);
        assert_eq!(ai.content_length(), Some(1024));
        ai.set_content_length(-1);
        assert_eq!(ai.content_length(), None);
    }
}
