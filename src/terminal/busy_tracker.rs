use crate::terminal::TerminalId;
use std::collections::HashSet;

/// Set of terminals currently running a command, driven only by execution events.
///
/// Without execution events from the host every terminal reads as idle, so pools
/// fall back to always reusing.
#[derive(Debug, Default)]
pub struct TerminalBusyTracker {
    supported: bool,
    busy: HashSet<TerminalId>,
}

impl TerminalBusyTracker {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            busy: HashSet::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn on_execution_start(&mut self, id: TerminalId) {
        if self.supported {
            self.busy.insert(id);
        }
    }

    pub fn on_execution_end(&mut self, id: TerminalId) {
        self.busy.remove(&id);
    }

    pub fn is_busy(&self, id: TerminalId) -> bool {
        self.supported && self.busy.contains(&id)
    }

    /// Drops a terminal that no longer exists.
    pub fn forget(&mut self, id: TerminalId) {
        self.busy.remove(&id);
    }

    pub fn clear(&mut self) {
        self.busy.clear();
    }

    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }
}
