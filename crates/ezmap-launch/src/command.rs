//! Structured command composition (spec §9 DESIGN NOTES: "route them
//! through a structured command builder to avoid shell-injection").
//!
//! Grounded the way `Command::new("bsub").arg(...)` in the LSF/Apptainer
//! backend builds up an invocation one quoted argument at a time instead
//! of interpolating a shell string; this builder produces the same shape,
//! but as a single string (the scheduler adapter still needs one, to
//! preserve the bit-exact `echo "<command>" | qsub ...` form spec.md
//! requires for compatibility with existing submission policies).

/// Quote `value` for safe inclusion in a `sh -c` string. Tokens made up
/// only of characters that never need escaping are left bare, matching
/// the readability of the original's unquoted paths; anything else is
/// wrapped in single quotes with embedded quotes escaped.
pub fn shell_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,".contains(c));
    if is_plain {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Escape `value` for interpolation inside a double-quoted shell string
/// (the `echo "<command>"` wrapper the Torque/Moab adapters use).
pub fn escape_for_double_quotes(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`")
}

/// Builds a shell command line token by token, quoting each token on
/// insertion rather than interpolating a pre-joined string.
#[derive(Debug, Default)]
pub struct CommandBuilder {
    tokens: Vec<String>,
}

impl CommandBuilder {
    pub fn new() -> Self {
        CommandBuilder::default()
    }

    /// Append a token verbatim — for launcher flags and subcommands we
    /// control (`-np`, `srun -n6`), never for user-controlled fragments.
    pub fn raw(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Append a token that may contain user-controlled content
    /// (`progargs`, paths), quoting it first.
    pub fn quoted(mut self, token: impl AsRef<str>) -> Self {
        self.tokens.push(shell_quote(token.as_ref()));
        self
    }

    pub fn build(self) -> String {
        self.tokens.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_left_unquoted() {
        assert_eq!(shell_quote("/tmp/argfile.arg"), "/tmp/argfile.arg");
    }

    #[test]
    fn fragments_with_shell_metacharacters_are_quoted() {
        assert_eq!(shell_quote("x; rm -rf /"), "'x; rm -rf /'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn builder_joins_tokens_with_spaces() {
        let command = CommandBuilder::new()
            .raw("mpirun")
            .raw("-np")
            .raw("4")
            .quoted("/tmp/ezpool")
            .quoted("arg with spaces")
            .build();
        assert_eq!(command, "mpirun -np 4 /tmp/ezpool 'arg with spaces'");
    }
}
