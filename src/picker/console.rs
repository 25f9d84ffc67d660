//! Line-oriented quick-pick for the terminal front end.
//!
//! Every input line is the new search text, `:<n>` accepts entry `n` of the listed items
//! and `:q` (or end of input) hides the picker.

use crate::picker::{PickerEntry, PickerEvent, QuickPick};
use crate::types::ScriptQuickPickItem;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const MAX_VISIBLE_ITEMS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleInput {
    Value(String),
    Accept(usize),
    Hide,
    Invalid(String),
}

fn parse_input_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix(':') else {
        return ConsoleInput::Value(trimmed.to_string());
    };
    match command.trim() {
        "q" | "quit" => ConsoleInput::Hide,
        "" => ConsoleInput::Accept(1),
        n => match n.parse::<usize>() {
            Ok(n) if n >= 1 => ConsoleInput::Accept(n),
            _ => ConsoleInput::Invalid(trimmed.to_string()),
        },
    }
}

#[derive(Debug, Default)]
struct ConsoleState {
    items: Vec<PickerEntry>,
    open: bool,
}

pub struct ConsoleQuickPick {
    state: Arc<Mutex<ConsoleState>>,
    placeholder: String,
    reader: JoinHandle<()>,
}

impl ConsoleQuickPick {
    /// Quick-pick reading from stdin. Needs a Tokio runtime.
    pub fn from_stdin() -> (Self, mpsc::UnboundedReceiver<PickerEvent>) {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }

    /// Quick-pick over any line source. One reader serves every picker session, so lines
    /// typed between sessions apply to the next one.
    pub fn with_input<R>(input: R) -> (Self, mpsc::UnboundedReceiver<PickerEvent>)
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let state = Arc::new(Mutex::new(ConsoleState::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_input(input, tx));
        (
            Self {
                state,
                placeholder: String::new(),
                reader,
            },
            rx,
        )
    }

    fn render(&self, state: &ConsoleState) {
        if !state.open {
            return;
        }
        let mut position = 0;
        for entry in state.items.iter() {
            match entry {
                PickerEntry::Separator(label) => println!("  ── {} ──", label),
                PickerEntry::Script(item) => {
                    position += 1;
                    if position > MAX_VISIBLE_ITEMS {
                        continue;
                    }
                    if item.is_selectable() {
                        println!("  {:>3}. {:<24} {}  {}", position, item.label, item.description, item.detail);
                    } else {
                        println!("       {}  ({})", item.label, item.detail);
                    }
                }
            }
        }
        if position > MAX_VISIBLE_ITEMS {
            println!("       ... and {} more, type to narrow", position - MAX_VISIBLE_ITEMS);
        }
        println!("{} (:<n> to run, :q to quit)", self.placeholder);
    }
}

/// Positions are sent as typed; they refer to the list as it will stand once every earlier
/// line has been applied.
async fn read_input<R>(input: R, tx: mpsc::UnboundedSender<PickerEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read picker input");
                break;
            }
        };
        let event = match parse_input_line(&line) {
            ConsoleInput::Value(value) => PickerEvent::ValueChanged(value),
            ConsoleInput::Hide => PickerEvent::Hidden,
            ConsoleInput::Accept(n) => PickerEvent::AcceptedAt(n),
            ConsoleInput::Invalid(text) => {
                println!("Unknown command: {}", text);
                continue;
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
    debug!("Picker input closed");
    let _ = tx.send(PickerEvent::Hidden);
}

impl QuickPick for ConsoleQuickPick {
    fn set_items(&mut self, items: Vec<PickerEntry>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.items = items;
        self.render(&state);
    }

    fn set_placeholder(&mut self, placeholder: &str) {
        self.placeholder = placeholder.to_string();
    }

    fn set_busy(&mut self, busy: bool) {
        if busy {
            println!("Loading scripts...");
        }
    }

    fn selected_item(&self) -> Option<ScriptQuickPickItem> {
        let state = self.state.lock().ok()?;
        state.items.iter().filter_map(PickerEntry::as_script).next().cloned()
    }

    fn show(&mut self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.open = true;
        self.render(&state);
    }

    fn dispose(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open = false;
            state.items.clear();
        }
    }
}

impl Drop for ConsoleQuickPick {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn item(name: &str) -> PickerEntry {
        PickerEntry::Script(ScriptQuickPickItem {
            label: name.to_string(),
            description: "pkg".to_string(),
            detail: "cmd".to_string(),
            package_name: "pkg".to_string(),
            package_path: PathBuf::from("/ws"),
            script_name: name.to_string(),
            script_command: "cmd".to_string(),
            always_show: false,
        })
    }

    #[test]
    fn parses_lines() {
        assert_eq!(parse_input_line("build web\n"), ConsoleInput::Value("build web".to_string()));
        assert_eq!(parse_input_line(""), ConsoleInput::Value(String::new()));
        assert_eq!(parse_input_line(":3"), ConsoleInput::Accept(3));
        assert_eq!(parse_input_line(":"), ConsoleInput::Accept(1));
        assert_eq!(parse_input_line(":q"), ConsoleInput::Hide);
        assert_eq!(parse_input_line(":0"), ConsoleInput::Invalid(":0".to_string()));
        assert_eq!(parse_input_line(":x"), ConsoleInput::Invalid(":x".to_string()));
    }

    #[tokio::test]
    async fn translates_input_into_events() {
        let (_picker, mut events) = ConsoleQuickPick::with_input(BufReader::new(&b"dev\n:2\n:x\n:\n:q\n"[..]));

        assert_eq!(events.recv().await, Some(PickerEvent::ValueChanged("dev".to_string())));
        assert_eq!(events.recv().await, Some(PickerEvent::AcceptedAt(2)));
        // `:x` is reported and skipped.
        assert_eq!(events.recv().await, Some(PickerEvent::AcceptedAt(1)));
        assert_eq!(events.recv().await, Some(PickerEvent::Hidden));
        // End of input hides as well.
        assert_eq!(events.recv().await, Some(PickerEvent::Hidden));
    }

    #[tokio::test]
    async fn first_entry_is_selected_by_default() {
        let (mut picker, _events) = ConsoleQuickPick::with_input(BufReader::new(&b""[..]));
        picker.set_items(vec![item("lint"), item("test")]);
        assert_eq!(picker.selected_item().unwrap().script_name, "lint");

        picker.dispose();
        assert!(picker.selected_item().is_none());
    }
}
