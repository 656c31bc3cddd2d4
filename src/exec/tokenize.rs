// src/exec/tokenize.rs

/// Split a command line into an argument vector on whitespace.
///
/// There is no quoting or escaping: `echo "a b"` becomes
/// `["echo", "\"a", "b\""]`. Commands that need either should run in
/// [`crate::types::CommandMode::Shell`].
pub fn tokenize(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
