use crate::error::AppError;
use crate::terminal::{Terminal, TerminalBusyTracker, TerminalEvent, TerminalHost, TerminalId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseOptions {
    pub clear_before_reuse: bool,
    /// `0` means unlimited.
    pub max_terminals: usize,
}

#[derive(Debug)]
struct PoolEntry {
    terminal: Arc<dyn Terminal>,
    last_used: u64,
}

#[derive(Debug)]
struct PoolState {
    terminals: HashMap<String, PoolEntry>,
    busy: TerminalBusyTracker,
    clock: u64,
}

impl PoolState {
    fn apply(&mut self, event: TerminalEvent) {
        match event {
            TerminalEvent::ExecutionStarted(id) => self.busy.on_execution_start(id),
            TerminalEvent::ExecutionEnded(id) => self.busy.on_execution_end(id),
            TerminalEvent::Closed(id) => self.remove_closed(id),
        }
    }

    fn remove_closed(&mut self, id: TerminalId) {
        let key = self
            .terminals
            .iter()
            .find(|(_, entry)| entry.terminal.id() == id)
            .map(|(key, _)| key.clone());
        if let Some(key) = key {
            self.terminals.remove(&key);
            debug!(%key, terminal = %id, "Terminal closed, removed from pool");
        }
        self.busy.forget(id);
    }

    /// Disposes the least recently used idle entry, if any.
    fn evict_lru_idle(&mut self) -> bool {
        let victim = self
            .terminals
            .iter()
            .filter(|(_, entry)| !self.busy.is_busy(entry.terminal.id()))
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        match victim.and_then(|key| self.terminals.remove(&key).map(|entry| (key, entry))) {
            Some((key, entry)) => {
                info!(%key, terminal = %entry.terminal.name(), "Pool full, disposing least recently used terminal");
                self.busy.forget(entry.terminal.id());
                entry.terminal.dispose();
                true
            }
            None => false,
        }
    }
}

fn handle_event(state: &Mutex<PoolState>, event: TerminalEvent) {
    match state.lock() {
        Ok(mut guard) => guard.apply(event),
        // Runs inside the host's event delivery: log and keep going.
        Err(e) => error!(error = %e, ?event, "Error handling terminal event"),
    }
}

/// Terminals keyed by a reuse key.
///
/// Per key: no entry creates a terminal, an idle entry is reused (optionally
/// after `clear`), a busy entry is replaced by a new terminal while the old one keeps
/// running until it is closed.
///
/// Must be created inside a Tokio runtime: host events are consumed by a spawned task.
pub struct TerminalPool {
    host: Arc<dyn TerminalHost>,
    state: Arc<Mutex<PoolState>>,
    listener: Option<JoinHandle<()>>,
}

impl TerminalPool {
    pub fn new(host: Arc<dyn TerminalHost>) -> Self {
        let supported = host.supports_execution_events();
        if !supported {
            warn!("Host does not report command execution; terminals are always treated as idle");
        }
        let state = Arc::new(Mutex::new(PoolState {
            terminals: HashMap::new(),
            busy: TerminalBusyTracker::new(supported),
            clock: 0,
        }));

        let mut events = host.subscribe();
        let listener_state = state.clone();
        let listener = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => handle_event(&listener_state, event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Terminal event listener lagged behind, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            host,
            state,
            listener: Some(listener),
        }
    }

    pub fn get_or_create_terminal(
        &self,
        key: &str,
        name: &str,
        cwd: &Path,
        options: &ReuseOptions,
    ) -> Result<Arc<dyn Terminal>, AppError> {
        let mut state = self.state.lock()?;
        state.clock += 1;
        let now = state.clock;

        let existing = state.terminals.get(key).map(|entry| entry.terminal.clone());
        let needs_room = existing.is_none()
            && options.max_terminals > 0
            && state.terminals.len() >= options.max_terminals;
        match existing {
            Some(terminal) if !state.busy.is_busy(terminal.id()) => {
                if let Some(entry) = state.terminals.get_mut(key) {
                    entry.last_used = now;
                }
                if options.clear_before_reuse {
                    terminal.send_text("clear");
                }
                terminal.show();
                debug!(%key, terminal = %terminal.id(), "Reusing idle terminal");
                return Ok(terminal);
            }
            Some(busy) => {
                debug!(%key, terminal = %busy.id(), "Pooled terminal is busy, creating another");
            }
            None => {}
        }

        // Only give up an idle terminal once its replacement exists.
        let terminal = self.host.create_terminal(name, cwd)?;
        if needs_room && !state.evict_lru_idle() {
            warn!(
                max_terminals = options.max_terminals,
                "Every pooled terminal is busy, exceeding the terminal limit"
            );
        }
        state.terminals.insert(
            key.to_string(),
            PoolEntry {
                terminal: terminal.clone(),
                last_used: now,
            },
        );
        terminal.show();
        debug!(%key, terminal = %terminal.id(), "Created pooled terminal");
        Ok(terminal)
    }

    /// Applies a host event directly; normally the listener task does this.
    pub fn handle_event(&self, event: TerminalEvent) {
        handle_event(&self.state, event);
    }

    pub fn is_terminal_busy(&self, id: TerminalId) -> bool {
        self.state
            .lock()
            .map(|state| state.busy.is_busy(id))
            .unwrap_or(false)
    }

    pub fn terminal_for(&self, key: &str) -> Option<Arc<dyn Terminal>> {
        let state = self.state.lock().ok()?;
        state.terminals.get(key).map(|entry| entry.terminal.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.terminals.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disposes every pooled terminal and forgets all state.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in state.terminals.drain() {
            entry.terminal.dispose();
        }
        state.busy.clear();
    }

    /// Clears the pool and stops listening to host events.
    pub fn dispose(&mut self) {
        self.clear();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl Drop for TerminalPool {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
