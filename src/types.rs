use serde::Deserialize;

/// How a job's command line is turned into a child process.
///
/// - `Argv`: split on whitespace, first token is the program. No quoting.
/// - `Shell`: the whole line goes to the platform shell (`sh -c` / `cmd /C`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    Argv,
    Shell,
}

impl Default for CommandMode {
    fn default() -> Self {
        if cfg!(windows) {
            CommandMode::Shell
        } else {
            CommandMode::Argv
        }
    }
}
