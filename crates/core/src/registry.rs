// Registry of live audio instances, keyed by id

use crate::callback::StatusListener;
use crate::id::{IdGenerator, InstanceId};
use crate::instance::AudioInstance;
use crate::status::AudioKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Single source of truth for which handles exist
pub struct InstanceRegistry {
    instances: HashMap<InstanceId, AudioInstance>,
    ids: Arc<dyn IdGenerator>,
}

impl InstanceRegistry {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            instances: HashMap::new(),
            ids,
        }
    }

    /// Register a fresh `EMPTY` instance and return its id.
    pub fn create(&mut self, kind: AudioKind, listener: Arc<dyn StatusListener>) -> InstanceId {
        let mut id = self.ids.generate();
        while self.instances.contains_key(&id) {
            log::warn!("id generator returned `{}` twice, drawing again", id);
            id = self.ids.generate();
        }
        self.instances
            .insert(id.clone(), AudioInstance::new(id.clone(), kind, listener));
        log::debug!("registered {} instance `{}`", kind, id);
        id
    }

    pub fn get(&self, id: &InstanceId) -> Option<&AudioInstance> {
        self.instances.get(id)
    }

    pub fn get_mut(&mut self, id: &InstanceId) -> Option<&mut AudioInstance> {
        self.instances.get_mut(id)
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Drop an instance. Unknown ids are tolerated since the engine may
    /// repeat a `RELEASED` notification.
    pub fn remove(&mut self, id: &InstanceId) -> Option<AudioInstance> {
        let removed = self.instances.remove(id);
        if removed.is_none() {
            log::warn!("cleanup: unknown audio instance `{}`", id);
        }
        removed
    }

    /// Ids registered right now. Callers act on the snapshot, so removals
    /// triggered while iterating are harmless.
    pub fn live_ids(&self) -> Vec<InstanceId> {
        self.instances.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NoopListener;
    use crate::id::SequentialIds;
    use crate::status::InstanceStatus;

    /// Hands out a fixed list of ids, in order
    struct ScriptedIds(parking_lot::Mutex<Vec<&'static str>>);

    impl IdGenerator for ScriptedIds {
        fn generate(&self) -> InstanceId {
            InstanceId::new(self.0.lock().remove(0))
        }
    }

    fn registry() -> InstanceRegistry {
        InstanceRegistry::new(Arc::new(SequentialIds::new("t")))
    }

    #[test]
    fn test_create_and_get() {
        let mut reg = registry();
        let id = reg.create(AudioKind::Sound, Arc::new(NoopListener));
        let ai = reg.get(&id).unwrap();
        assert_eq!(ai.kind(), AudioKind::Sound);
        assert_eq!(ai.status(), InstanceStatus::Empty);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut reg = registry();
        let id = reg.create(AudioKind::Music, Arc::new(NoopListener));
        assert!(reg.remove(&id).is_some());
        assert!(reg.remove(&id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_colliding_id_is_redrawn() {
        let mut reg = InstanceRegistry::new(Arc::new(ScriptedIds(parking_lot::Mutex::new(
            vec!["x", "x", "y"],
        ))));
        let first = reg.create(AudioKind::Loop, Arc::new(NoopListener));
        let second = reg.create(AudioKind::Loop, Arc::new(NoopListener));
        assert_eq!(first.as_str(), "x");
        assert_eq!(second.as_str(), "y");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_live_ids_snapshot() {
        let mut reg = registry();
        for _ in 0..3 {
            reg.create(AudioKind::Sound, Arc::new(NoopListener));
        }
        assert_eq!(reg.live_ids().len(), 3);

        for id in reg.live_ids() {
            reg.remove(&id);
        }
        assert!(reg.is_empty());
    }
}
