use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::registry::Registry;

/// Handler signature shared by every builtin.
///
/// The registry is passed in so that `help` can enumerate its siblings.
/// `args` is the trimmed remainder of the command line.
pub type Handler = fn(&Registry, &str) -> Result<Reply, CommandError>;

/// How a builtin consumes the text after its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Takes nothing; trailing text is ignored
    None,
    /// Takes the rest of the line as one required argument
    Text,
}

/// A named command and the function that runs it
#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub arity: Arity,
    pub usage: &'static str,
    pub summary: &'static str,
    pub handler: Handler,
}

impl Builtin {
    /// Every token this builtin answers to, primary name first
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

// Custom Debug impl so the handler pointer doesn't clutter the output
impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("arity", &self.arity)
            .finish()
    }
}

/// What a handler hands back to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Message(String),
    Terminate,
}

/// Printable result of one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(msg) => msg,
            Outcome::Failure(msg) => msg,
        }
    }
}

impl From<CommandError> for Outcome {
    fn from(err: CommandError) -> Self {
        Outcome::Failure(err.to_string())
    }
}

/// Result of routing one line through the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Completed(Outcome),
    Terminate,
}

/// Errors a command can report; all of them end up as `Outcome::Failure`
#[derive(Debug, Error)]
pub enum CommandError {
    /// A required argument was missing or blank
    #[error("usage: {0}")]
    Usage(&'static str),

    /// The path could not be opened or read
    #[error("Failed to load image: {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bytes are not a structurally valid image
    #[error("Failed to load image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unknown command. Type 'help' for options.")]
    UnknownCommand,

    /// A handler panicked and the dispatcher caught it
    #[error("Command '{name}' failed: {message}")]
    Panicked { name: String, message: String },
}

/// Errors raised while building a registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command name '{0}' is registered more than once")]
    Duplicate(String),

    #[error("command names must be a single non-empty token, got '{0}'")]
    InvalidName(String),
}
