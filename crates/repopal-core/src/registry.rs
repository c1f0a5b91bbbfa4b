use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::types::{ArgField, ContainerRecipe, EventKind, ValidatedArgs};

/// A single executable command, registered once at process start and never
/// mutated afterward. Value-like: all state for one run lives in the
/// `ValidatedArgs` handed to `execution_string`, not in the descriptor.
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub documentation: String,
    pub schema: Vec<ArgField>,
    pub recipe: ContainerRecipe,
    pub(crate) accepts: fn(EventKind) -> bool,
    pub(crate) build: fn(&ValidatedArgs) -> String,
}

impl CommandDescriptor {
    pub fn accepts(&self, kind: EventKind) -> bool {
        (self.accepts)(kind)
    }

    pub fn execution_string(&self, args: &ValidatedArgs) -> String {
        (self.build)(args)
    }

    /// Apply the schema: reject unknown keys, fill defaults, enforce
    /// required fields. `raw` is whatever the planner produced.
    pub fn validate_args(&self, raw: &HashMap<String, String>) -> Result<ValidatedArgs> {
        let known: std::collections::HashSet<&str> = self.schema.iter().map(|f| f.name.as_str()).collect();
        for key in raw.keys() {
            if !known.contains(key.as_str()) {
                return Err(anyhow!("unknown argument '{key}' for command '{}'", self.name));
            }
        }

        let mut validated = ValidatedArgs::new();
        for field in &self.schema {
            match raw.get(&field.name) {
                Some(value) => {
                    validated.insert(field.name.clone(), value.clone());
                }
                None => match &field.default {
                    Some(default) => {
                        validated.insert(field.name.clone(), default.clone());
                    }
                    None if field.required => {
                        return Err(anyhow!(
                            "missing required argument '{}' for command '{}'",
                            field.name,
                            self.name
                        ));
                    }
                    None => {}
                },
            }
        }
        Ok(validated)
    }
}

/// Process-wide mapping from command name to descriptor. Built once via
/// [`CommandRegistry::with_builtins`] and shared behind an `Arc` by the
/// orchestrator.
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    pub fn register(&mut self, descriptor: CommandDescriptor) {
        self.commands.push(descriptor);
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::commands::find_replace::descriptor());
        registry.register(crate::commands::add_license::descriptor());
        registry.register(crate::commands::hello_world::descriptor());
        registry
    }

    /// Candidates for an event kind, in registration order — which doubles
    /// as the tie-break order the planner prompt presents them in.
    pub fn filter_for(&self, kind: EventKind) -> Vec<&CommandDescriptor> {
        self.commands.iter().filter(|c| c.accepts(kind)).collect()
    }

    pub fn lookup(&self, name: &str) -> Result<&CommandDescriptor> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow!("unknown command '{name}'"))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_for_returns_registration_order() {
        let registry = CommandRegistry::with_builtins();
        let names: Vec<&str> = registry
            .filter_for(EventKind::Issue)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["find_replace", "add_license", "hello_world"]);
    }

    #[test]
    fn lookup_unknown_command_fails() {
        let registry = CommandRegistry::with_builtins();
        assert!(registry.lookup("does_not_exist").is_err());
    }

    #[test]
    fn validate_args_rejects_unknown_key() {
        let registry = CommandRegistry::with_builtins();
        let descriptor = registry.lookup("hello_world").unwrap();
        let mut raw = HashMap::new();
        raw.insert("bogus".to_string(), "x".to_string());
        assert!(descriptor.validate_args(&raw).is_err());
    }

    #[test]
    fn validate_args_fills_defaults_for_missing_optional_fields() {
        let registry = CommandRegistry::with_builtins();
        let descriptor = registry.lookup("add_license").unwrap();
        let validated = descriptor.validate_args(&HashMap::new()).unwrap();
        assert_eq!(validated.get("license"), Some(&"MIT".to_string()));
    }
}
