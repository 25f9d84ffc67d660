pub mod console;
pub mod controller;
#[cfg(test)]
pub mod mock;
pub mod recent_items;

use crate::types::ScriptQuickPickItem;
use tokio::sync::mpsc;

pub use controller::{show_script_picker, RecentSource};

pub const SEARCH_PLACEHOLDER: &str = "Search for a script to run...";
pub const EMPTY_WORKSPACE_PLACEHOLDER: &str = "No scripts found in workspace";

/// User interaction reported by a quick-pick widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    /// The search box now holds this text.
    ValueChanged(String),
    /// The highlighted entry was accepted.
    Accepted,
    /// Entry `n` (1-based, separators not counted) of the list on screen was accepted.
    AcceptedAt(usize),
    Hidden,
}

/// A row of the quick-pick list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEntry {
    Separator(String),
    Script(ScriptQuickPickItem),
}

impl PickerEntry {
    pub fn as_script(&self) -> Option<&ScriptQuickPickItem> {
        match self {
            PickerEntry::Script(item) => Some(item),
            PickerEntry::Separator(_) => None,
        }
    }
}

/// Quick-pick capabilities of the host. Events arrive separately, see [`PickerSession`].
pub trait QuickPick {
    fn set_items(&mut self, items: Vec<PickerEntry>);
    fn set_placeholder(&mut self, placeholder: &str);
    fn set_busy(&mut self, busy: bool);
    /// The entry that would be accepted right now.
    fn selected_item(&self) -> Option<ScriptQuickPickItem>;
    fn show(&mut self);
    fn dispose(&mut self);
}

/// A quick-pick widget together with the stream of its events.
pub struct PickerSession {
    pub quick_pick: Box<dyn QuickPick + Send>,
    pub events: mpsc::UnboundedReceiver<PickerEvent>,
}

impl PickerSession {
    pub fn new(quick_pick: Box<dyn QuickPick + Send>, events: mpsc::UnboundedReceiver<PickerEvent>) -> Self {
        Self { quick_pick, events }
    }
}
