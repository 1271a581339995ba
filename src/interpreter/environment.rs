use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope chained to its enclosing scopes.
///
/// A scope is populated at exactly two points: parameter binding when a call
/// frame is entered, and top-level definition/assignment statements. Each
/// name binds at most once per scope; shadowing an outer binding is a new
/// inner binding, never a mutation of the outer one. Closures keep their
/// defining chain alive by holding an `Rc` to it.
pub struct Environment {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }
    }

    /// A child scope chained in front of `parent`, used when entering a call
    /// frame.
    pub fn with_parent(parent: Rc<Environment>) -> Self {
        Self {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Binds `name` in this scope. Returns false if `name` is already bound
    /// here; bindings are write-once.
    #[must_use]
    pub fn define(&self, name: &str, value: Value) -> bool {
        let mut vars = self.vars.borrow_mut();
        if vars.contains_key(name) {
            return false;
        }
        vars.insert(name.to_string(), value);
        true
    }

    /// Looks `name` up through the chain, innermost scope first.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let env = Environment::new();
        assert!(env.define("x", Value::Int(42)));
        assert_eq!(env.get("x"), Some(Value::Int(42)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn test_rebinding_in_same_scope_is_rejected() {
        let env = Environment::new();
        assert!(env.define("x", Value::Int(1)));
        assert!(!env.define("x", Value::Int(2)));
        assert_eq!(env.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_lookup_walks_the_chain() {
        let outer = Rc::new(Environment::new());
        assert!(outer.define("x", Value::Int(1)));

        let inner = Environment::with_parent(Rc::clone(&outer));
        assert_eq!(inner.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_shadowing_leaves_outer_binding_intact() {
        let outer = Rc::new(Environment::new());
        assert!(outer.define("x", Value::Int(1)));

        let inner = Environment::with_parent(Rc::clone(&outer));
        assert!(inner.define("x", Value::Int(2)));
        assert_eq!(inner.get("x"), Some(Value::Int(2)));
        assert_eq!(outer.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_innermost_match_wins() {
        let root = Rc::new(Environment::new());
        assert!(root.define("x", Value::Int(1)));

        let middle = Rc::new(Environment::with_parent(Rc::clone(&root)));
        assert!(middle.define("x", Value::Int(2)));

        let leaf = Environment::with_parent(Rc::clone(&middle));
        assert_eq!(leaf.get("x"), Some(Value::Int(2)));
    }
}
