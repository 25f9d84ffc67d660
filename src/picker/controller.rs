use crate::picker::recent_items::create_recent_quick_pick_items;
use crate::picker::{PickerEntry, PickerEvent, PickerSession, EMPTY_WORKSPACE_PLACEHOLDER, SEARCH_PLACEHOLDER};
use crate::recent::RecentCommandsProvider;
use crate::search::ScriptSearchIndex;
use crate::types::{PackageInfo, ScriptQuickPickItem, SelectedScript};
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Where the picker loads its "recent" section from.
#[derive(Clone)]
pub struct RecentSource {
    pub provider: Arc<dyn RecentCommandsProvider>,
    pub workspace_root: PathBuf,
}

type RecentFetch = Pin<Box<dyn Future<Output = Vec<PickerEntry>> + Send>>;

async fn load_recent_items(source: RecentSource) -> Vec<PickerEntry> {
    match source.provider.get_validated(&source.workspace_root).await {
        Ok(commands) => create_recent_quick_pick_items(&commands, &source.workspace_root, Utc::now().timestamp_millis()),
        Err(e) => {
            warn!(error = %e, "Could not load recent commands");
            Vec::new()
        }
    }
}

fn scripts(items: Vec<ScriptQuickPickItem>) -> Vec<PickerEntry> {
    items.into_iter().map(PickerEntry::Script).collect()
}

fn with_recent(recent: &[PickerEntry], all: &[PickerEntry]) -> Vec<PickerEntry> {
    recent.iter().chain(all).cloned().collect()
}

fn nth_script(items: &[PickerEntry], position: usize) -> Option<&ScriptQuickPickItem> {
    items.iter().filter_map(PickerEntry::as_script).nth(position.checked_sub(1)?)
}

/// Runs one picker session until the user accepts an entry or hides the picker.
///
/// The full list is shown right away; recent commands are merged above it once loaded,
/// but only while the search box is empty. Accepting the "no results" entry yields `None`.
/// Positional accepts resolve against the list as it stands after every earlier event.
#[instrument(skip_all, fields(packages = packages.len()))]
pub async fn show_script_picker(
    session: &mut PickerSession,
    packages: &[PackageInfo],
    search_cache_max_bytes: usize,
    recent: Option<RecentSource>,
) -> Option<SelectedScript> {
    let quick_pick = session.quick_pick.as_mut();
    quick_pick.set_busy(true);
    quick_pick.set_placeholder(if packages.is_empty() {
        EMPTY_WORKSPACE_PLACEHOLDER
    } else {
        SEARCH_PLACEHOLDER
    });

    let mut index = ScriptSearchIndex::from_packages(packages, search_cache_max_bytes);
    let all_items = scripts(index.items().to_vec());
    let mut current_items = all_items.clone();
    quick_pick.set_items(current_items.clone());
    quick_pick.set_busy(false);
    quick_pick.show();

    let mut recent_pending = recent.is_some();
    let mut recent_fetch: RecentFetch = match recent {
        Some(source) => Box::pin(load_recent_items(source)),
        None => Box::pin(std::future::pending::<Vec<PickerEntry>>()),
    };
    let mut recent_entries: Vec<PickerEntry> = Vec::new();
    let mut value = String::new();

    let selection = loop {
        tokio::select! {
            entries = &mut recent_fetch, if recent_pending => {
                recent_pending = false;
                recent_entries = entries;
                debug!(count = recent_entries.len(), "Recent commands loaded");
                if value.is_empty() && !recent_entries.is_empty() {
                    current_items = with_recent(&recent_entries, &all_items);
                    quick_pick.set_items(current_items.clone());
                }
            }
            event = session.events.recv() => match event {
                Some(PickerEvent::ValueChanged(new_value)) => {
                    value = new_value;
                    let items = if value.is_empty() && !recent_entries.is_empty() {
                        with_recent(&recent_entries, &all_items)
                    } else {
                        scripts(index.search(&value))
                    };
                    // Replace the list one tick after the event.
                    tokio::task::yield_now().await;
                    current_items = items;
                    quick_pick.set_items(current_items.clone());
                }
                Some(PickerEvent::Accepted) => {
                    break quick_pick.selected_item().and_then(|item| item.to_selected());
                }
                Some(PickerEvent::AcceptedAt(position)) => match nth_script(&current_items, position) {
                    Some(item) => break item.to_selected(),
                    None => warn!(position, count = current_items.len(), "No entry at that position"),
                },
                Some(PickerEvent::Hidden) | None => break None,
            }
        }
    };

    quick_pick.dispose();
    debug!(selected = ?selection.as_ref().map(|s| &s.script_name), "Picker closed");
    selection
}
