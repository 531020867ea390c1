// Instance identifiers and id generation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque audio instance identifier, also the correlation key on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Source of collision-free instance ids
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> InstanceId;
}

/// Random v4 UUIDs
#[cfg(feature = "uuid")]
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

#[cfg(feature = "uuid")]
impl IdGenerator for UuidGenerator {
    fn generate(&self) -> InstanceId {
        InstanceId(uuid::Uuid::new_v4().to_string())
    }
}

/// Predictable ids (`<prefix>-1`, `<prefix>-2`, ...) for tests and logs
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: std::sync::atomic::AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> InstanceId {
        let n = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        InstanceId(format!("{}-{}", self.prefix, n))
    }
}
