use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use super::types::{Arity, Builtin, CommandError, Dispatch, Outcome, Reply, RegistryError};

/// Name-keyed table of builtins.
///
/// Names and aliases share one namespace and are checked for collisions when
/// the registry is built. The table is read-only afterwards.
#[derive(Debug)]
pub struct Registry {
    commands: Vec<Builtin>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    /// Build a registry, rejecting duplicate or malformed names
    pub fn new(commands: Vec<Builtin>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (pos, builtin) in commands.iter().enumerate() {
            for name in builtin.names() {
                if name.is_empty() || name.chars().any(char::is_whitespace) {
                    return Err(RegistryError::InvalidName(name.to_string()));
                }
                if index.insert(name, pos).is_some() {
                    return Err(RegistryError::Duplicate(name.to_string()));
                }
            }
        }
        Ok(Self { commands, index })
    }

    /// Look up a builtin by name or alias
    pub fn get_builtin(&self, name: &str) -> Option<&Builtin> {
        self.index.get(name).map(|&pos| &self.commands[pos])
    }

    /// Registered builtins in declaration order
    pub fn commands(&self) -> impl Iterator<Item = &Builtin> {
        self.commands.iter()
    }

    /// Tokenize and run one input line; None for blank input
    pub fn dispatch_line(&self, line: &str) -> Option<Dispatch> {
        split_command(line).map(|(name, args)| self.dispatch(name, args))
    }

    /// Run `name` with the raw argument text.
    ///
    /// Every error, including a panic inside the handler, comes back as
    /// `Outcome::Failure`.
    pub fn dispatch(&self, name: &str, args: &str) -> Dispatch {
        let args = args.trim();
        debug!("dispatch {:?} args={:?}", name, args);

        let Some(builtin) = self.get_builtin(name) else {
            debug!("no builtin named {:?}", name);
            return Dispatch::Completed(CommandError::UnknownCommand.into());
        };

        if builtin.arity == Arity::Text && args.is_empty() {
            return Dispatch::Completed(CommandError::Usage(builtin.usage).into());
        }

        let handler = builtin.handler;
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler(self, args)));

        match result {
            Ok(Ok(Reply::Message(msg))) => Dispatch::Completed(Outcome::Success(msg)),
            Ok(Ok(Reply::Terminate)) => Dispatch::Terminate,
            Ok(Err(err)) => {
                debug!("{} failed: {}", builtin.name, err);
                Dispatch::Completed(err.into())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("{} panicked: {}", builtin.name, message);
                Dispatch::Completed(
                    CommandError::Panicked {
                        name: builtin.name.to_string(),
                        message,
                    }
                    .into(),
                )
            }
        }
    }
}

/// Split a line into its command name and the rest of the line.
///
/// The rest is kept as one string so arguments may contain spaces. Returns
/// None for blank input.
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => Some((name, rest.trim())),
        None => Some((line, "")),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
