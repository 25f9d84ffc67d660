//! Terminals for the console front end: each terminal is a worker task that runs the
//! lines it is sent through the shell, one after another, in its working directory.

use crate::error::AppError;
use crate::terminal::{Terminal, TerminalEvent, TerminalHost, TerminalId};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio as StdProcessStdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

const EVENT_CAPACITY: usize = 256;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug)]
pub struct ShellTerminal {
    id: TerminalId,
    name: String,
    cwd: PathBuf,
    commands: mpsc::UnboundedSender<String>,
    worker: JoinHandle<()>,
    events: broadcast::Sender<TerminalEvent>,
    disposed: AtomicBool,
}

impl Terminal for ShellTerminal {
    fn id(&self) -> TerminalId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn send_text(&self, text: &str) {
        if self.commands.send(text.to_string()).is_err() {
            warn!(terminal = %self.name, "Terminal is closed, dropping input");
        }
    }

    fn show(&self) {
        println!("── {} ({}) ──", self.name, self.cwd.display());
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the running child kills it (kill_on_drop).
        self.worker.abort();
        debug!(terminal = %self.name, id = %self.id, "Terminal disposed");
        let _ = self.events.send(TerminalEvent::Closed(self.id));
    }
}

/// Host whose terminals are shell worker tasks. Needs a Tokio runtime.
pub struct ShellTerminalHost {
    events: broadcast::Sender<TerminalEvent>,
    shell: Option<String>,
    shell_integration: bool,
}

impl ShellTerminalHost {
    pub fn new(shell: Option<String>, shell_integration: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            shell,
            shell_integration,
        }
    }
}

impl TerminalHost for ShellTerminalHost {
    fn create_terminal(&self, name: &str, cwd: &Path) -> Result<Arc<dyn Terminal>, AppError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::TerminalError(format!("No async runtime to host terminal '{}': {}", name, e)))?;
        if !cwd.is_dir() {
            return Err(AppError::InvalidPath(format!(
                "Terminal working directory does not exist: {}",
                cwd.display()
            )));
        }

        let id = TerminalId::new();
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_worker(WorkerContext {
            id,
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            shell: self.shell.clone(),
            shell_integration: self.shell_integration,
            events: self.events.clone(),
            receiver,
        }));
        info!(terminal = %name, %id, cwd = %cwd.display(), "Created terminal");

        Ok(Arc::new(ShellTerminal {
            id,
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            commands,
            worker,
            events: self.events.clone(),
            disposed: AtomicBool::new(false),
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.events.subscribe()
    }

    fn supports_execution_events(&self) -> bool {
        self.shell_integration
    }
}

struct WorkerContext {
    id: TerminalId,
    name: String,
    cwd: PathBuf,
    shell: Option<String>,
    shell_integration: bool,
    events: broadcast::Sender<TerminalEvent>,
    receiver: mpsc::UnboundedReceiver<String>,
}

async fn run_worker(mut ctx: WorkerContext) {
    while let Some(line) = ctx.receiver.recv().await {
        if line.trim() == "clear" {
            print!("{}", CLEAR_SCREEN);
            let _ = std::io::stdout().flush();
            continue;
        }

        if ctx.shell_integration {
            let _ = ctx.events.send(TerminalEvent::ExecutionStarted(ctx.id));
        }
        match run_line(&ctx, &line).await {
            Ok(exit_code) => {
                info!(terminal = %ctx.name, command = %line, exit_code = ?exit_code, "Command finished")
            }
            Err(e) => {
                error!(terminal = %ctx.name, command = %line, error = %e, "Command failed to run");
                println!("[{}] {}", ctx.name, e);
            }
        }
        if ctx.shell_integration {
            let _ = ctx.events.send(TerminalEvent::ExecutionEnded(ctx.id));
        }
    }
    debug!(terminal = %ctx.name, "Terminal input closed");
}

fn shell_command(shell: Option<&str>, line: &str) -> TokioCommand {
    let default_shell = if cfg!(windows) { "cmd" } else { "sh" };
    let shell_path = shell.unwrap_or(default_shell);
    let mut cmd = TokioCommand::new(shell_path);
    let lowered = shell_path.to_lowercase();
    if lowered.contains("powershell") || lowered.contains("pwsh") {
        cmd.arg("-Command");
    } else if lowered.ends_with("cmd") || lowered.ends_with("cmd.exe") {
        cmd.arg("/C");
    } else {
        cmd.arg("-c");
    }
    cmd.arg(line);
    cmd
}

#[instrument(skip(ctx), fields(terminal = %ctx.name))]
async fn run_line(ctx: &WorkerContext, line: &str) -> Result<Option<i32>, AppError> {
    let mut command = shell_command(ctx.shell.as_deref(), line);
    command
        .current_dir(&ctx.cwd)
        .stdin(StdProcessStdio::null())
        .stdout(StdProcessStdio::piped())
        .stderr(StdProcessStdio::piped())
        .kill_on_drop(true);

    debug!(command = %line, "Spawning command");
    let mut child = command.spawn().map_err(|e| {
        AppError::TerminalError(format!("Failed to spawn command '{}': {}", line, e))
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::TerminalError("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::TerminalError("Failed to capture stderr".to_string()))?;

    let stdout_prefix = ctx.name.clone();
    let stdout_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            println!("[{}] {}", stdout_prefix, line);
        }
    });
    let stderr_prefix = ctx.name.clone();
    let stderr_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            eprintln!("[{}] {}", stderr_prefix, line);
        }
    });

    let status = child.wait().await?;
    let _ = tokio::join!(stdout_task, stderr_task); // Drain remaining output
    Ok(status.code())
}
