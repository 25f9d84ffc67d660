//! Scripted quick-pick used by tests.

use crate::picker::{PickerEntry, PickerEvent, PickerSession, QuickPick};
use crate::types::ScriptQuickPickItem;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct QuickPickLog {
    pub item_sets: Vec<Vec<PickerEntry>>,
    pub placeholder: Option<String>,
    pub busy_history: Vec<bool>,
    pub shown: usize,
    pub disposed: usize,
    /// Index into the selectable entries of the current items.
    pub highlight: usize,
}

impl QuickPickLog {
    pub fn current_items(&self) -> Vec<PickerEntry> {
        self.item_sets.last().cloned().unwrap_or_default()
    }
}

pub struct ScriptedQuickPick {
    log: Arc<Mutex<QuickPickLog>>,
}

impl QuickPick for ScriptedQuickPick {
    fn set_items(&mut self, items: Vec<PickerEntry>) {
        let mut log = self.log.lock().unwrap();
        log.item_sets.push(items);
        log.highlight = 0;
    }

    fn set_placeholder(&mut self, placeholder: &str) {
        self.log.lock().unwrap().placeholder = Some(placeholder.to_string());
    }

    fn set_busy(&mut self, busy: bool) {
        self.log.lock().unwrap().busy_history.push(busy);
    }

    fn selected_item(&self) -> Option<ScriptQuickPickItem> {
        let log = self.log.lock().unwrap();
        let items = log.current_items();
        let selected = items.iter().filter_map(PickerEntry::as_script).nth(log.highlight).cloned();
        selected
    }

    fn show(&mut self) {
        self.log.lock().unwrap().shown += 1;
    }

    fn dispose(&mut self) {
        self.log.lock().unwrap().disposed += 1;
    }
}

/// A session over a scripted quick-pick, its log, and the sender that drives it.
pub fn scripted_session() -> (PickerSession, Arc<Mutex<QuickPickLog>>, mpsc::UnboundedSender<PickerEvent>) {
    let log = Arc::new(Mutex::new(QuickPickLog::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    let session = PickerSession::new(Box::new(ScriptedQuickPick { log: log.clone() }), rx);
    (session, log, tx)
}
