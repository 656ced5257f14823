//! Command parser - Recognises explicit `!name args` invocations

/// Prefix that marks an explicit plugin invocation
pub const EXPLICIT_PREFIX: char = '!';

/// A parsed explicit invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitCommand {
    pub name: String,
    pub argument: String,
}

/// Splits prefixed messages into a plugin name and its argument string
#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    prefix: char,
}

impl CommandParser {
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// `None` unless `content` starts with the prefix.
    ///
    /// The name runs up to the first whitespace; the argument is everything
    /// after that whitespace run, inner spacing kept as typed.
    pub fn parse(&self, content: &str) -> Option<ExplicitCommand> {
        let rest = content.strip_prefix(self.prefix)?;

        let (name, argument) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim_start()),
            None => (rest, ""),
        };

        Some(ExplicitCommand {
            name: name.to_string(),
            argument: argument.to_string(),
        })
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(EXPLICIT_PREFIX)
    }
}
