// src/exec/command.rs

//! Command construction and process-tree termination.

use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::sweep::ScriptEntry;

/// Build the command that runs one discovered script.
///
/// - With an interpreter (e.g. `"python3 -u"`) the script path is appended to
///   the interpreter's arguments.
/// - Without one, the script itself is the program.
///
/// Output is piped, stdin is closed, and on unix the child leads its own
/// process group so a timeout can take down everything it spawned.
pub fn script_command(entry: &ScriptEntry, working_dir: &Path) -> Command {
    let script_path = absolute(&entry.path);

    let mut std_cmd = match entry.interpreter.as_deref() {
        Some(interpreter) => {
            let mut parts = interpreter.split_whitespace();
            let program = parts.next().unwrap_or(interpreter);
            let mut c = StdCommand::new(program);
            c.args(parts).arg(&script_path);
            c
        }
        None => StdCommand::new(&script_path),
    };

    std_cmd
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(command_line: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    };
    cmd.kill_on_drop(true);
    cmd
}

/// Forcibly stop a child and everything in its process group, then reap it.
pub async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child);

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill child process");
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // Safety: kill(2) with a negative pid only signals the process group the
    // child leads; no memory is shared with the callee.
    let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if ret != 0 {
        debug!(pid, "process group already gone when killing");
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
