//! Named render-time functions shared by every template of a compiler.
//!
//! A [`HelperRegistry`] is an explicit handle rather than process-wide state:
//! clones share the same storage, so registering through one handle is
//! visible to every template compiled against another.
//!
//! # Invariants
//!
//! 1. Names are unique; the last registration wins.
//! 2. A failed registration leaves the registry untouched.
//! 3. Helpers shadow data keys of the same name during rendering.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No name | `helper(&Value::Null, None)` | `InvalidArgument` |
//! | Definition is not a function | `helper(name, Some(&Value::Int(1)))` | `InvalidArgument` |
//! | Name is not a string | `helper(&Value::Int(1), Some(def))` | `InvalidArgument` |
//! | Name is not an identifier | `register("a b", f)` | `InvalidArgument` |

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::value::Value;

type HelperFn = dyn Fn(&[Value]) -> Value;

/// A render-time function taking positional arguments.
#[derive(Clone)]
pub struct Helper {
    func: Rc<HelperFn>,
}

impl Helper {
    pub fn new(func: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            func: Rc::new(func),
        }
    }

    /// Invoke the helper.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }

    /// Whether both handles point at the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Helper(..)")
    }
}

impl PartialEq for Helper {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Errors from helper registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Wrong argument type or arity.
    InvalidArgument(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Result of the combined get/set entry point [`HelperRegistry::helper`].
#[derive(Debug, Clone)]
pub enum HelperReply {
    /// A definition was stored; the registry is returned for chaining.
    Registry(HelperRegistry),
    /// A lookup result.
    Lookup(Option<Helper>),
}

/// Shared mapping from helper name to function.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    entries: Rc<RefCell<AHashMap<String, Helper>>>,
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl HelperRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or set a helper with dynamically typed arguments.
    ///
    /// - name and definition: stores the definition and returns the registry;
    /// - name only: returns the stored helper, if any;
    /// - neither: fails.
    ///
    /// ```
    /// use weave_template::{Helper, HelperRegistry, HelperReply, Value};
    ///
    /// let registry = HelperRegistry::new();
    /// let greet = Value::Helper(Helper::new(|_| Value::from("hi")));
    /// registry.helper(&Value::from("greet"), Some(&greet)).unwrap();
    ///
    /// match registry.helper(&Value::from("greet"), None).unwrap() {
    ///     HelperReply::Lookup(Some(helper)) => assert_eq!(helper.call(&[]), Value::from("hi")),
    ///     other => panic!("unexpected reply: {other:?}"),
    /// }
    /// assert!(registry.helper(&Value::Null, None).is_err());
    /// ```
    pub fn helper(
        &self,
        name: &Value,
        definition: Option<&Value>,
    ) -> Result<HelperReply, RegistryError> {
        match (name, definition) {
            (Value::Null, None) => Err(RegistryError::InvalidArgument(
                "expecting at least 1 argument".into(),
            )),
            (_, Some(definition)) => {
                let Some(helper) = definition.as_helper() else {
                    return Err(RegistryError::InvalidArgument(
                        "expecting definition to be a function".into(),
                    ));
                };
                let Value::Str(name) = name else {
                    return Err(RegistryError::InvalidArgument(
                        "expecting name to be a string".into(),
                    ));
                };
                self.insert(name, helper.clone())?;
                Ok(HelperReply::Registry(self.clone()))
            }
            (Value::Str(name), None) => Ok(HelperReply::Lookup(self.get(name))),
            (other, None) => Err(RegistryError::InvalidArgument(format!(
                "expecting name to be a string, got {}",
                other.type_name()
            ))),
        }
    }

    /// Register a closure under `name`, replacing any previous entry.
    pub fn register(
        &self,
        name: &str,
        func: impl Fn(&[Value]) -> Value + 'static,
    ) -> Result<&Self, RegistryError> {
        self.insert(name, Helper::new(func))
    }

    /// Register an existing helper under `name`, replacing any previous entry.
    pub fn insert(&self, name: &str, helper: Helper) -> Result<&Self, RegistryError> {
        if !is_identifier(name) {
            return Err(RegistryError::InvalidArgument(format!(
                "helper name '{name}' is not an identifier"
            )));
        }
        let replaced = self
            .entries
            .borrow_mut()
            .insert(name.to_string(), helper)
            .is_some();
        tracing::debug!(name, replaced, "registered helper");
        Ok(self)
    }

    /// Look up a helper by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Helper> {
        self.entries.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Remove a helper, returning it if present.
    pub fn remove(&self, name: &str) -> Option<Helper> {
        self.entries.borrow_mut().remove(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
