// Simulated native engine
// Plays the far side of the channel: consumes commands, keeps per-instance
// player state and answers with status and fileLength notifications.

use crate::config::EngineConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use yanap_core::{AudioKind, InstanceId, InstanceStatus, NativeCommand};
use yanap_transport::{EngineEndpoint, Notifier};

/// Intent received while the resource was still loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Play,
    Release,
}

#[derive(Debug)]
struct SimPlayer {
    kind: AudioKind,
    path: String,
    status: InstanceStatus,
    pending: Pending,
    volume: (f32, f32),
    triggers: u32,
}

impl SimPlayer {
    fn new(kind: AudioKind, path: String) -> Self {
        Self {
            kind,
            path,
            status: InstanceStatus::Loading,
            pending: Pending::None,
            volume: (1.0, 1.0),
            triggers: 0,
        }
    }
}

struct EngineState {
    config: EngineConfig,
    notifier: Notifier,
    players: HashMap<InstanceId, SimPlayer>,
}

impl EngineState {
    fn emit(&self, id: &InstanceId, status: InstanceStatus, info: Option<&str>) {
        log::debug!("engine: `{}` -> {}", id, status);
        if !self.notifier.send_status(id, status, info) {
            log::warn!("engine: session gone, dropping {} for `{}`", status, id);
        }
    }

    fn handle(&mut self, command: NativeCommand) {
        match command {
            NativeCommand::CreateInstance { id, kind, path } => self.create(id, kind, path),
            NativeCommand::Play { id } => self.play(&id),
            NativeCommand::Stop { id } => self.stop(&id),
            NativeCommand::SetVolume { id, left, right } => self.set_volume(&id, left, right),
            NativeCommand::Release { id } => self.release(&id),
        }
    }

    fn create(&mut self, id: InstanceId, kind: AudioKind, path: String) {
        if self.players.contains_key(&id) {
            // The existing player keeps running
            let info = format!("uid {} already exists", id);
            log::warn!("engine: {}", info);
            self.emit(&id, InstanceStatus::Error, Some(&info));
            return;
        }

        let resolved = self.config.resolve(&path);
        let length = match std::fs::metadata(&resolved) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                let info = format!(
                    "unable to open file `{}` at `{}`",
                    path,
                    resolved.display()
                );
                self.fail(&id, &info);
                return;
            }
        };

        log::info!("engine: loading {} `{}` from {}", kind, id, resolved.display());
        self.players.insert(id.clone(), SimPlayer::new(kind, path));
        self.notifier
            .send_file_length(&id, i64::try_from(length).unwrap_or(-1));
        self.emit(&id, InstanceStatus::Loading, None);

        if !self.config.manual_loading {
            self.complete_load(&id);
        }
    }

    fn complete_load(&mut self, id: &InstanceId) -> bool {
        let path = match self.players.get(id) {
            Some(player) if player.status == InstanceStatus::Loading => player.path.clone(),
            _ => return false,
        };

        if self.config.should_fail(&path) {
            self.fail(id, "unable to load file");
            return true;
        }

        let pending = match self.players.get_mut(id) {
            Some(player) => {
                player.status = InstanceStatus::Loaded;
                std::mem::replace(&mut player.pending, Pending::None)
            }
            None => return false,
        };
        self.emit(id, InstanceStatus::Loaded, None);

        match pending {
            Pending::Release => self.release(id),
            Pending::Play => self.play(id),
            Pending::None => {}
        }
        true
    }

    fn play(&mut self, id: &InstanceId) {
        let Some(player) = self.players.get_mut(id) else {
            self.fail(id, &format!("(play) audioInstance `{}` not found", id));
            return;
        };

        match (player.kind, player.status) {
            (_, InstanceStatus::Loading) => {
                if player.pending != Pending::Release {
                    player.pending = Pending::Play;
                }
            }
            (AudioKind::Sound, _) => {
                player.triggers += 1;
                log::debug!("engine: sound `{}` fired ({})", id, player.triggers);
            }
            (_, InstanceStatus::Loaded) | (_, InstanceStatus::Stopped) => {
                player.status = InstanceStatus::Playing;
                self.emit(id, InstanceStatus::Playing, None);
            }
            (_, status) => {
                log::debug!("engine: `{}` already {}", id, status);
            }
        }
    }

    fn stop(&mut self, id: &InstanceId) {
        let Some(player) = self.players.get_mut(id) else {
            self.fail(id, &format!("(stop) audioInstance `{}` not found", id));
            return;
        };

        match (player.kind, player.status) {
            (_, InstanceStatus::Loading) => {
                if player.pending == Pending::Play {
                    player.pending = Pending::None;
                }
            }
            (AudioKind::Sound, _) => {}
            (_, InstanceStatus::Playing) | (_, InstanceStatus::Looping) => {
                player.status = InstanceStatus::Stopped;
                self.emit(id, InstanceStatus::Stopped, None);
            }
            _ => {}
        }
    }

    fn set_volume(&mut self, id: &InstanceId, left: f32, right: f32) {
        match self.players.get_mut(id) {
            Some(player) => player.volume = (left, right),
            None => self.fail(id, &format!("(setVolume) audioInstance `{}` not found", id)),
        }
    }

    fn release(&mut self, id: &InstanceId) {
        if let Some(player) = self.players.get_mut(id) {
            if player.status == InstanceStatus::Loading {
                player.pending = Pending::Release;
                return;
            }
        }

        // Ids never created here, or already freed, are answered the same way
        if self.players.remove(id).is_some() {
            log::info!("engine: released `{}`", id);
        }
        self.emit(id, InstanceStatus::Released, None);
    }

    /// Report an error, then free the player
    fn fail(&mut self, id: &InstanceId, info: &str) {
        self.players.remove(id);
        log::warn!("engine: `{}` failed: {}", id, info);
        self.emit(id, InstanceStatus::Error, Some(info));
        self.emit(id, InstanceStatus::Released, None);
    }

    fn complete_track(&mut self, id: &InstanceId) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };

        let next = match (player.kind, player.status) {
            (AudioKind::Music, InstanceStatus::Playing) => InstanceStatus::Stopped,
            (AudioKind::Loop, InstanceStatus::Playing) | (AudioKind::Loop, InstanceStatus::Looping) => {
                InstanceStatus::Looping
            }
            _ => return false,
        };
        player.status = next;
        self.emit(id, next, None);
        true
    }
}

struct Inner {
    endpoint: EngineEndpoint,
    state: Mutex<EngineState>,
}

impl Inner {
    fn handle(&self, command: NativeCommand) {
        log::debug!("engine: {} `{}`", command.op(), command.id());
        self.state.lock().handle(command);
    }
}

/// In-process stand-in for the native audio engine.
///
/// Cloning gives another handle on the same engine, so tests can keep
/// poking it (`complete_track`, `fail`) while `spawn` drives it.
#[derive(Clone)]
pub struct SimulatedEngine {
    inner: Arc<Inner>,
}

impl SimulatedEngine {
    pub fn new(endpoint: EngineEndpoint, config: EngineConfig) -> Self {
        let notifier = endpoint.notifier().clone();
        Self {
            inner: Arc::new(Inner {
                endpoint,
                state: Mutex::new(EngineState {
                    config,
                    notifier,
                    players: HashMap::new(),
                }),
            }),
        }
    }

    /// Process every queued command on the calling thread. Returns how
    /// many were handled.
    pub fn run_until_idle(&self) -> usize {
        let mut handled = 0;
        while let Some(command) = self.inner.endpoint.try_recv_command() {
            self.inner.handle(command);
            handled += 1;
        }
        handled
    }

    /// Run the engine on its own thread until the session side hangs up
    pub fn spawn(&self) -> io::Result<JoinHandle<()>> {
        let inner = self.inner.clone();
        thread::Builder::new()
            .name("yanap-engine-sim".into())
            .spawn(move || {
                log::info!("engine: started");
                while let Some(command) = inner.endpoint.recv_command() {
                    inner.handle(command);
                }
                log::info!("engine: command channel closed, stopping");
            })
    }

    /// Complete a load held back by `manual_loading`
    pub fn finish_loading(&self, id: &InstanceId) -> bool {
        self.inner.state.lock().complete_load(id)
    }

    /// The current track reached its end
    pub fn complete_track(&self, id: &InstanceId) -> bool {
        self.inner.state.lock().complete_track(id)
    }

    /// Inject a native failure for `id`
    pub fn fail(&self, id: &InstanceId, info: &str) {
        self.inner.state.lock().fail(id, info);
    }

    pub fn status(&self, id: &InstanceId) -> Option<InstanceStatus> {
        self.inner.state.lock().players.get(id).map(|p| p.status)
    }

    pub fn volume(&self, id: &InstanceId) -> Option<(f32, f32)> {
        self.inner.state.lock().players.get(id).map(|p| p.volume)
    }

    /// Players not yet released
    pub fn player_count(&self) -> usize {
        self.inner.state.lock().players.len()
    }

    /// How many times a SOUND instance was fired
    pub fn triggers(&self, id: &InstanceId) -> Option<u32> {
        self.inner.state.lock().players.get(id).map(|p| p.triggers)
    }
}
