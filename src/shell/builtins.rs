use std::path::Path;

use super::loader::load_image;
use super::registry::Registry;
use super::types::{Arity, Builtin, CommandError, Reply};

/// The builtin table, in the order `help` lists it.
///
/// This is the only place commands are declared; the registry and the help
/// text are both derived from it.
pub fn builtins() -> Vec<Builtin> {
    vec![
        Builtin {
            name: "greet",
            aliases: &[],
            arity: Arity::Text,
            usage: "greet NAME",
            summary: "Print a greeting",
            handler: greet,
        },
        Builtin {
            name: "load",
            aliases: &[],
            arity: Arity::Text,
            usage: "load PATH",
            summary: "Validate an image file and print its SHA-256 digest",
            handler: load,
        },
        Builtin {
            name: "help",
            aliases: &["?"],
            arity: Arity::None,
            usage: "help",
            summary: "List available commands",
            handler: help,
        },
        Builtin {
            name: "exit",
            aliases: &["quit"],
            arity: Arity::None,
            usage: "exit",
            summary: "Leave the shell",
            handler: exit,
        },
    ]
}

/// Greet someone by name
///
/// Args:
///   - name -> anything non-blank, spaces allowed
pub fn greet(_registry: &Registry, name: &str) -> Result<Reply, CommandError> {
    Ok(Reply::Message(format!("Hello, {}!", name.trim())))
}

/// Validate an image file and report its digest
///
/// Args:
///   - path -> file to read, spaces allowed
pub fn load(_registry: &Registry, path: &str) -> Result<Reply, CommandError> {
    let loaded = load_image(Path::new(path.trim()))?;
    Ok(Reply::Message(loaded.summary()))
}

/// List every registered command
pub fn help(registry: &Registry, _args: &str) -> Result<Reply, CommandError> {
    let entries: Vec<(String, &str)> = registry
        .commands()
        .map(|builtin| {
            let mut label = builtin.usage.to_string();
            if !builtin.aliases.is_empty() {
                label.push_str(&format!(" ({})", builtin.aliases.join(", ")));
            }
            (label, builtin.summary)
        })
        .collect();

    let width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    let mut text = String::from("Available commands:");
    for (label, summary) in entries {
        text.push_str(&format!("\n  {:<width$}  {}", label, summary, width = width));
    }
    Ok(Reply::Message(text))
}

/// Ask the loop to stop
pub fn exit(_registry: &Registry, _args: &str) -> Result<Reply, CommandError> {
    Ok(Reply::Terminate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(builtins()).unwrap()
    }

    #[test]
    fn test_greet_embeds_name() {
        let reg = registry();
        for name in ["Ada", "Grace Hopper", "李雷", "o'Brien"] {
            assert_eq!(
                greet(&reg, name).unwrap(),
                Reply::Message(format!("Hello, {}!", name))
            );
        }
    }

    #[test]
    fn test_greet_trims() {
        let reg = registry();
        assert_eq!(
            greet(&reg, "  Bob \t").unwrap(),
            Reply::Message("Hello, Bob!".to_string())
        );
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let reg = registry();
        let err = load(&reg, "/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, CommandError::NotFound { .. }));
    }

    #[test]
    fn test_help_lists_every_command() {
        let reg = registry();
        let Reply::Message(text) = help(&reg, "").unwrap() else {
            panic!("help should produce a message");
        };
        for builtin in builtins() {
            for name in builtin.names() {
                assert!(text.contains(name), "help is missing {}", name);
            }
            assert!(text.contains(builtin.summary));
        }
    }

    #[test]
    fn test_exit_terminates() {
        assert_eq!(exit(&registry(), "").unwrap(), Reply::Terminate);
    }
}
