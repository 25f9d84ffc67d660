//! Recording terminal host used by tests.

use crate::error::AppError;
use crate::terminal::{Terminal, TerminalEvent, TerminalHost, TerminalId};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct MockTerminal {
    id: TerminalId,
    name: String,
    pub cwd: PathBuf,
    sent: Mutex<Vec<String>>,
    shown: AtomicUsize,
    disposed: AtomicBool,
    events: broadcast::Sender<TerminalEvent>,
}

impl MockTerminal {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn show_count(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Terminal for MockTerminal {
    fn id(&self) -> TerminalId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn send_text(&self, text: &str) {
        self.sent.lock().unwrap().push(text.to_string());
    }

    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(TerminalEvent::Closed(self.id));
        }
    }
}

pub struct MockTerminalHost {
    events: broadcast::Sender<TerminalEvent>,
    created: Mutex<Vec<Arc<MockTerminal>>>,
    shell_integration: bool,
    fail_creation: AtomicBool,
}

impl MockTerminalHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_shell_integration(true))
    }

    pub fn without_shell_integration() -> Arc<Self> {
        Arc::new(Self::with_shell_integration(false))
    }

    fn with_shell_integration(shell_integration: bool) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            created: Mutex::new(Vec::new()),
            shell_integration,
            fail_creation: AtomicBool::new(false),
        }
    }

    pub fn created(&self) -> Vec<Arc<MockTerminal>> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn emit(&self, event: TerminalEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_creation(&self, fail: bool) {
        self.fail_creation.store(fail, Ordering::SeqCst);
    }
}

impl TerminalHost for MockTerminalHost {
    fn create_terminal(&self, name: &str, cwd: &Path) -> Result<Arc<dyn Terminal>, AppError> {
        if self.fail_creation.load(Ordering::SeqCst) {
            return Err(AppError::TerminalError("host refused to create a terminal".to_string()));
        }
        let terminal = Arc::new(MockTerminal {
            id: TerminalId::new(),
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            sent: Mutex::new(Vec::new()),
            shown: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            events: self.events.clone(),
        });
        self.created.lock().unwrap().push(terminal.clone());
        Ok(terminal)
    }

    fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.events.subscribe()
    }

    fn supports_execution_events(&self) -> bool {
        self.shell_integration
    }
}

/// Lets spawned listener tasks drain pending events on the current-thread test runtime.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
