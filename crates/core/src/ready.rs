// One-time readiness gate, opened once the notification channel is attached

use once_cell::sync::OnceCell;

#[derive(Debug, Default)]
pub struct ReadyGate {
    cell: OnceCell<()>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Returns false if it was already open.
    pub fn open(&self) -> bool {
        self.cell.set(()).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Block the calling thread until the gate opens.
    pub fn wait(&self) {
        self.cell.wait();
    }
}
