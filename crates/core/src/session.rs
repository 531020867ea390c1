// Session: owns the instance registry and drives the status state machine
// Commands are validated here before reaching the native channel; inbound
// notifications are applied here one at a time.

use crate::callback::{StatusEvent, StatusListener};
use crate::command::{NativeCommand, NativeTransport};
use crate::error::{Result, YanapError};
use crate::id::{IdGenerator, InstanceId};
use crate::instance::{AudioInstance, Transition};
use crate::message::NativeMessage;
use crate::ready::ReadyGate;
use crate::registry::InstanceRegistry;
use crate::status::{AudioKind, InstanceStatus, WireStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Counters describing what a session has seen so far
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Commands rejected before reaching the native side
    pub usage_errors: u64,
    /// Inbound messages discarded as malformed or unknown
    pub protocol_errors: u64,
    /// Notifications for unknown or already released instances
    pub ignored_notifications: u64,
    /// Status and length notifications applied to a record
    pub notifications_applied: u64,
    /// Commands handed to the transport
    pub commands_sent: u64,
    /// Listener calls that panicked
    pub listener_panics: u64,
}

#[derive(Default)]
struct Counters {
    usage_errors: AtomicU64,
    protocol_errors: AtomicU64,
    ignored_notifications: AtomicU64,
    notifications_applied: AtomicU64,
    commands_sent: AtomicU64,
    listener_panics: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            usage_errors: self.usage_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            ignored_notifications: self.ignored_notifications.load(Ordering::Relaxed),
            notifications_applied: self.notifications_applied.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            listener_panics: self.listener_panics.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    registry: Mutex<InstanceRegistry>,
    transport: Arc<dyn NativeTransport>,
    ready: ReadyGate,
    attach_lock: Mutex<()>,
    inbox: Mutex<VecDeque<Value>>,
    draining: AtomicBool,
    counters: Counters,
}

/// Clears the draining flag if applying a message unwinds, so the next
/// caller picks up whatever is still queued.
struct DrainReset<'a>(&'a AtomicBool);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(false, Ordering::Release);
        }
    }
}

/// Owned context tying the registry to one native channel.
///
/// Cloning is cheap and every clone refers to the same registry. The
/// registry lock is never held while a listener runs or while a command is
/// handed to the transport, so listeners are free to issue commands.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Session using random UUIDs for instance ids
    #[cfg(feature = "uuid")]
    pub fn new(transport: Arc<dyn NativeTransport>) -> Self {
        Self::with_id_generator(transport, Arc::new(crate::id::UuidGenerator))
    }

    pub fn with_id_generator(
        transport: Arc<dyn NativeTransport>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(InstanceRegistry::new(ids)),
                transport,
                ready: ReadyGate::new(),
                attach_lock: Mutex::new(()),
                inbox: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                counters: Counters::default(),
            }),
        }
    }

    /// Attach the notification handler to the transport and open the ready
    /// gate. Calling it again after a successful attach does nothing.
    pub fn attach(&self) -> Result<()> {
        let _guard = self.shared.attach_lock.lock();
        if self.shared.ready.is_ready() {
            return Ok(());
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        self.shared
            .transport
            .on_notification(Box::new(move |message| match weak.upgrade() {
                Some(shared) => Session { shared }.handle_notification(message),
                None => log::debug!("session dropped, ignoring native message {}", message),
            }))?;

        self.shared.ready.open();
        log::info!("notification channel attached, session ready");
        Ok(())
    }

    pub fn ready(&self) -> &ReadyGate {
        &self.shared.ready
    }

    pub fn is_ready(&self) -> bool {
        self.shared.ready.is_ready()
    }

    /// Register a new `EMPTY` instance. Attaches the notification channel
    /// first if nobody did yet.
    pub fn create_instance(
        &self,
        kind: AudioKind,
        listener: Arc<dyn StatusListener>,
    ) -> AudioHandle {
        if !self.is_ready() {
            if let Err(err) = self.attach() {
                log::error!("failed to attach notification channel: {}", err);
            }
        }

        let id = self.shared.registry.lock().create(kind, listener);
        log::info!("created {} instance `{}`", kind, id);
        AudioHandle {
            id,
            kind,
            session: self.clone(),
        }
    }

    /// Handle for an instance that is still registered
    pub fn handle(&self, id: &InstanceId) -> Option<AudioHandle> {
        let registry = self.shared.registry.lock();
        registry.get(id).map(|instance| AudioHandle {
            id: id.clone(),
            kind: instance.kind(),
            session: self.clone(),
        })
    }

    // -------------------------------
    // Commands
    // -------------------------------

    pub fn load(&self, id: &InstanceId, path: &str) {
        self.dispatch("load", id, |instance| {
            instance.begin_load(path)?;
            Ok(NativeCommand::CreateInstance {
                id: instance.id().clone(),
                kind: instance.kind(),
                path: path.to_string(),
            })
        });
    }

    pub fn play(&self, id: &InstanceId) {
        self.dispatch("play", id, |instance| {
            instance.ensure_loaded()?;
            Ok(NativeCommand::Play {
                id: instance.id().clone(),
            })
        });
    }

    pub fn stop(&self, id: &InstanceId) {
        self.dispatch("stop", id, |instance| {
            instance.ensure_loaded()?;
            Ok(NativeCommand::Stop {
                id: instance.id().clone(),
            })
        });
    }

    /// Set channel volumes; `right` follows `left` when omitted.
    pub fn set_volume(&self, id: &InstanceId, left: f32, right: Option<f32>) {
        self.dispatch("setVolume", id, |instance| {
            instance.ensure_loaded()?;
            Ok(NativeCommand::SetVolume {
                id: instance.id().clone(),
                left,
                right: right.unwrap_or(left),
            })
        });
    }

    /// Ask the engine to free the instance. Completion shows up later as a
    /// `RELEASED` notification.
    pub fn release(&self, id: &InstanceId) {
        self.dispatch("release", id, |instance| {
            instance.ensure_alive()?;
            Ok(NativeCommand::Release {
                id: instance.id().clone(),
            })
        });
    }

    /// Release every registered instance without waiting for confirmation.
    pub fn release_all(&self) {
        let ids = self.shared.registry.lock().live_ids();
        log::info!("releasing {} audio instance(s)", ids.len());
        for id in ids {
            self.release(&id);
        }
    }

    fn dispatch<F>(&self, method: &str, id: &InstanceId, build: F)
    where
        F: FnOnce(&mut AudioInstance) -> Result<NativeCommand>,
    {
        let outcome = {
            let mut registry = self.shared.registry.lock();
            match registry.get_mut(id) {
                Some(instance) => build(instance),
                None => Err(YanapError::UnknownInstance(id.clone())),
            }
        };

        match outcome {
            Ok(command) => {
                log::debug!("{} -> `{}`", command.op(), id);
                Counters::bump(&self.shared.counters.commands_sent);
                self.shared.transport.send_command(command);
            }
            Err(err) => {
                Counters::bump(&self.shared.counters.usage_errors);
                log::warn!("{} dropped: {}", method, err);
            }
        }
    }

    // -------------------------------
    // Notifications
    // -------------------------------

    /// Feed one inbound message. Messages are applied strictly one after
    /// another; a message arriving while another is being applied (from a
    /// listener or another thread) waits in the inbox and is applied by the
    /// caller already draining it.
    pub fn handle_notification(&self, message: Value) {
        self.shared.inbox.lock().push_back(message);
        if self.shared.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        let _reset = DrainReset(&self.shared.draining);

        loop {
            let next = self.shared.inbox.lock().pop_front();
            match next {
                Some(message) => self.process(message),
                None => {
                    self.shared.draining.store(false, Ordering::Release);
                    // Something may have been queued between the pop and the store.
                    if self.shared.inbox.lock().is_empty()
                        || self.shared.draining.swap(true, Ordering::AcqRel)
                    {
                        break;
                    }
                }
            }
        }
    }

    /// Feed one inbound message given as JSON text.
    pub fn handle_json(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.handle_notification(message),
            Err(err) => self.protocol_error(YanapError::from(err)),
        }
    }

    fn process(&self, message: Value) {
        match NativeMessage::from_value(&message) {
            Ok(NativeMessage::StatusUpdate {
                audio_uid,
                new_status,
                additional_info,
            }) => self.apply_status(&audio_uid, new_status, additional_info, &message),
            Ok(NativeMessage::FileLength {
                audio_uid,
                file_length,
            }) => self.apply_file_length(&audio_uid, file_length),
            Err(err) => self.protocol_error(err),
        }
    }

    fn apply_status(
        &self,
        id: &InstanceId,
        new_status: WireStatus,
        info: Option<String>,
        raw: &Value,
    ) {
        let (listener, event) = {
            let mut registry = self.shared.registry.lock();
            let Some(instance) = registry.get_mut(id) else {
                Counters::bump(&self.shared.counters.ignored_notifications);
                log::warn!(
                    "statusUpdate {:?}: unknown audio instance `{}`",
                    new_status,
                    id
                );
                return;
            };

            let status = match new_status {
                WireStatus::Known(status) => status,
                WireStatus::Unrecognized(_) => {
                    self.protocol_error(YanapError::UnknownStatus(raw.to_string()));
                    return;
                }
            };

            if instance.status().is_terminal() {
                Counters::bump(&self.shared.counters.ignored_notifications);
                log::warn!("statusUpdate {}: `{}` was already released", status, id);
                return;
            }

            if instance.apply_status(status) == Transition::Suppressed {
                log::debug!("repeated ERROR for `{}` suppressed", id);
                return;
            }

            if status == InstanceStatus::Error {
                log::warn!(
                    "audio instance `{}` reported an error: {}",
                    id,
                    info.as_deref().unwrap_or("no details")
                );
            } else {
                log::debug!("audio instance `{}` is now {}", id, status);
            }

            (instance.listener(), instance.event(info))
        };

        Counters::bump(&self.shared.counters.notifications_applied);
        if panic::catch_unwind(AssertUnwindSafe(|| listener.on_status_update(&event))).is_err() {
            Counters::bump(&self.shared.counters.listener_panics);
            log::error!("status listener for `{}` panicked on {}", id, event.status);
        }

        if event.status == InstanceStatus::Released {
            self.reclaim(id);
        }
    }

    fn reclaim(&self, id: &InstanceId) {
        if self.shared.registry.lock().remove(id).is_some() {
            log::info!("audio instance `{}` released", id);
        }
    }

    fn apply_file_length(&self, id: &InstanceId, length: i64) {
        let mut registry = self.shared.registry.lock();
        match registry.get_mut(id) {
            Some(instance) => {
                instance.set_content_length(length);
                Counters::bump(&self.shared.counters.notifications_applied);
                log::debug!("audio instance `{}` length {} bytes", id, length);
            }
            None => {
                Counters::bump(&self.shared.counters.ignored_notifications);
                log::warn!("fileLength: unknown audio instance `{}`", id);
            }
        }
    }

    fn protocol_error(&self, err: YanapError) {
        Counters::bump(&self.shared.counters.protocol_errors);
        log::error!("{}", err);
    }

    // -------------------------------
    // Queries
    // -------------------------------

    /// Current status, or `None` once the instance left the registry
    pub fn status(&self, id: &InstanceId) -> Option<InstanceStatus> {
        self.shared.registry.lock().get(id).map(AudioInstance::status)
    }

    pub fn source_path(&self, id: &InstanceId) -> Option<String> {
        self.shared
            .registry
            .lock()
            .get(id)
            .and_then(|instance| instance.source_path().map(str::to_string))
    }

    pub fn content_length(&self, id: &InstanceId) -> Option<u64> {
        self.shared
            .registry
            .lock()
            .get(id)
            .and_then(AudioInstance::content_length)
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.shared.registry.lock().contains(id)
    }

    pub fn instance_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    pub fn live_ids(&self) -> Vec<InstanceId> {
        self.shared.registry.lock().live_ids()
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.counters.snapshot()
    }
}

/// Caller-facing handle for one audio instance
#[derive(Clone)]
pub struct AudioHandle {
    id: InstanceId,
    kind: AudioKind,
    session: Session,
}

impl AudioHandle {
    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn kind(&self) -> AudioKind {
        self.kind
    }

    pub fn load(&self, path: &str) {
        self.session.load(&self.id, path);
    }

    pub fn play(&self) {
        self.session.play(&self.id);
    }

    pub fn stop(&self) {
        self.session.stop(&self.id);
    }

    pub fn set_volume(&self, left: f32, right: Option<f32>) {
        self.session.set_volume(&self.id, left, right);
    }

    pub fn release(&self) {
        self.session.release(&self.id);
    }

    /// Current status. An instance only leaves the registry after
    /// `RELEASED`, so a missing record reads as released.
    pub fn status(&self) -> InstanceStatus {
        self.session
            .status(&self.id)
            .unwrap_or(InstanceStatus::Released)
    }

    pub fn source_path(&self) -> Option<String> {
        self.session.source_path(&self.id)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.session.content_length(&self.id)
    }
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}
