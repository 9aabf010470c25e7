//! ShellExecutor - job のコマンドを OS のシェルで実行する
//!
//! # 学習ポイント
//! - `tokio::process::Command` による非同期なサブプロセス実行
//! - 実行前の純粋な文字列変換（normalize_command）でプラットフォーム差を吸収

use std::borrow::Cow;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::ExecOutcome;
use crate::ports::CommandExecutor;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Host shell family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostShell {
    /// `sh -c`
    Posix,
    /// `cmd.exe /C`
    Windows,
}

impl HostShell {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostShell::Windows
        } else {
            HostShell::Posix
        }
    }

    fn program_and_flag(self) -> (&'static str, &'static str) {
        match self {
            HostShell::Posix => ("sh", "-c"),
            HostShell::Windows => ("cmd.exe", "/C"),
        }
    }
}

/// Rewrite a leading bare `sleep` into the host's wait primitive.
///
/// `cmd.exe` has no `sleep`; `sleep N` becomes `timeout /t N /nobreak >NUL`
/// (N defaults to 1). Everything else passes through unchanged.
pub fn normalize_command(command: &str, shell: HostShell) -> Cow<'_, str> {
    if shell != HostShell::Windows {
        return Cow::Borrowed(command);
    }

    let mut tokens = command.split_whitespace();
    if tokens.next() != Some("sleep") {
        return Cow::Borrowed(command);
    }
    let seconds = tokens.next().unwrap_or("1");
    Cow::Owned(format!("timeout /t {seconds} /nobreak >NUL"))
}

/// Runs commands through the host shell, capturing stdout and stderr separately.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: HostShell,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::for_shell(HostShell::current())
    }

    pub fn for_shell(shell: HostShell) -> Self {
        Self { shell }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, command: &str) -> ExecOutcome {
        let normalized = normalize_command(command, self.shell);
        let (program, flag) = self.shell.program_and_flag();
        debug!(%program, command = %normalized, "spawning command");

        let mut cmd = Command::new(program);
        cmd.arg(flag).arg(&*normalized).kill_on_drop(true);
        // own process group: Ctrl-C on the worker must not hit the running job
        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => return ExecOutcome::failure(format!("failed to spawn {program}: {e}")),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            ExecOutcome::success(stdout)
        } else {
            ExecOutcome::from_exit(output.status.code(), stdout, stderr)
        }
    }
}
