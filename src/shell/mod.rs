pub mod builtins;
pub mod loader;
pub mod registry;
pub mod types;

// Re-export commonly used types and functions
pub use builtins::builtins;
pub use registry::Registry;
pub use types::{Dispatch, Outcome, RegistryError};

/// Registry holding the standard builtin table
pub fn default_registry() -> Result<Registry, RegistryError> {
    Registry::new(builtins())
}
