// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Settings file as read from TOML, before validation.
///
/// ```toml
/// [command]
/// shell = "bash"
/// shell_flag = "-c"
/// kill_timeout_ms = 500
///
/// [watch]
/// ignore = [".git", "target"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub command: CommandSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[command]` section: how the user command is executed.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSection {
    /// Shell program the command string is handed to.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Flag that makes the shell read the command from its next argument.
    #[serde(default = "default_shell_flag")]
    pub shell_flag: String,

    /// Grace period between SIGTERM and SIGKILL when stopping a run.
    #[serde(default = "default_kill_timeout_ms")]
    pub kill_timeout_ms: u64,

    /// Bytes of stdout/stderr kept in memory per run (most recent output wins).
    #[serde(default = "default_capture_limit")]
    pub capture_limit: usize,

    /// Echo child output to our own stdout/stderr.
    #[serde(default = "default_forward_output")]
    pub forward_output: bool,
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_flag: default_shell_flag(),
            kill_timeout_ms: default_kill_timeout_ms(),
            capture_limit: default_capture_limit(),
            forward_output: default_forward_output(),
        }
    }
}

impl CommandSection {
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }
}

/// `[watch]` section: which directories are never watched.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Directory names skipped together with their whole subtree.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
        }
    }
}

/// Validated settings. Construct via `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub command: CommandSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(command: CommandSection, watch: WatchSection) -> Self {
        Self { command, watch }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.command, raw.watch)
    }
}

fn default_shell() -> String {
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    shell.to_string()
}

fn default_shell_flag() -> String {
    let flag = if cfg!(windows) { "/C" } else { "-c" };
    flag.to_string()
}

fn default_kill_timeout_ms() -> u64 {
    2000
}

fn default_capture_limit() -> usize {
    1024 * 1024
}

fn default_forward_output() -> bool {
    true
}

fn default_ignore() -> Vec<String> {
    vec![".git".to_string()]
}
