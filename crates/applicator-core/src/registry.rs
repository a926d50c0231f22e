//! Transform registry
//!
//! Maps directive names to transform functions. Registering a name that is
//! already present silently replaces the previous function.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::transforms;
use crate::value::Value;

/// A transform: `(current value, directive argument) -> new value`
pub type TransformFn = Arc<dyn Fn(Value, &str) -> Result<Value> + Send + Sync>;

/// Name → transform mapping
#[derive(Clone, Default)]
pub struct Registry {
    funcs: HashMap<String, TransformFn>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in transforms
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(transforms::TRIM, transforms::trim);
        registry.register(transforms::LOWER, transforms::lower);
        registry.register(transforms::FILL_DEFAULT, transforms::fill_default);
        registry.register(transforms::FILL_NIL, transforms::fill_default);
        registry
    }

    /// Store `func` under `name`, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Value, &str) -> Result<Value> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
    }

    /// Look up the transform registered under `name`
    pub fn resolve(&self, name: &str) -> Result<&TransformFn> {
        self.funcs.get(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("funcs", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        assert_eq!(registry.names(), ["fillDefault", "fillNil", "lower", "trim"]);
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let registry = Registry::new();
        let err = registry.resolve("trim").err().unwrap();
        assert!(matches!(err, Error::NotFound { ref name } if name == "trim"));
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = Registry::with_builtins();
        registry.register("trim", |_, _| Ok(Value::string("replaced")));

        let trim = registry.resolve("trim").unwrap();
        assert_eq!(trim(Value::string(" a "), "").unwrap(), Value::string("replaced"));
    }

    #[test]
    fn test_argument_is_passed_through() {
        let mut registry = Registry::new();
        registry.register("echo", |_, arg: &str| Ok(Value::string(arg)));

        let echo = registry.resolve("echo").unwrap();
        assert_eq!(echo(Value::string(""), "hello").unwrap(), Value::string("hello"));
    }
}
