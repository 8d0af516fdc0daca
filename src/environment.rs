use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// One link in the chain of lexical scopes.  Closures and the interpreter
/// share environments, so links are `Rc<RefCell<_>>`; the chain is acyclic
/// because a child only ever references an environment created before it.
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind unconditionally in this scope.  Shadowing and redefinition are
    /// allowed; `var`, parameters, function declarations, and the globals
    /// built-ins all come through here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Read a binding exactly `distance` scopes up.  The resolver guarantees
    /// the binding exists there; a miss is an interpreter bug, not a language
    /// error, but it is still reported rather than panicking.
    pub fn get_at(&self, distance: usize, name: &str, line: usize) -> Result<Value> {
        if distance == 0 {
            return self.get(name, line);
        }

        match self.ancestor(distance) {
            Some(env) => env.borrow().get(name, line),

            None => Err(LoxError::runtime(
                line,
                format!("No enclosing scope at depth {} for '{}'.", distance, name),
            )),
        }
    }

    /// Write a binding exactly `distance` scopes up.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value, line: usize) -> Result<()> {
        if distance == 0 {
            return self.assign(name, value, line);
        }

        match self.ancestor(distance) {
            Some(env) => env.borrow_mut().assign(name, value, line),

            None => Err(LoxError::runtime(
                line,
                format!("No enclosing scope at depth {} for '{}'.", distance, name),
            )),
        }
    }

    fn ancestor(&self, distance: usize) -> Option<Rc<RefCell<Environment>>> {
        let mut env: Rc<RefCell<Environment>> = self.enclosing.clone()?;

        for _ in 1..distance {
            let parent: Rc<RefCell<Environment>> = env.borrow().enclosing.clone()?;
            env = parent;
        }

        Some(env)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
