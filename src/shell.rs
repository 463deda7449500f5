//! Argument quoting for rendered agent launch commands.
//!
//! Launch templates are rendered into a single command line and handed to
//! the platform shell, so every substituted path goes through
//! [`quote_argument`] first.

/// Escapes a value for safe inclusion in a POSIX shell command.
///
/// Uses single-quote wrapping and the standard `'\''` sequence for embedded
/// quotes.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// Escapes a value for inclusion in a `cmd.exe` command line.
///
/// Embedded double quotes are doubled.
#[must_use]
pub fn cmd_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quotes a value for the shell used by the current platform.
#[must_use]
pub fn quote_argument(value: &str) -> String {
    if cfg!(windows) {
        cmd_escape(value)
    } else {
        shell_escape(value)
    }
}
