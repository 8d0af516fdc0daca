use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::interpreter::{Interpreter, Signal};
use crate::value::Value;

/// A user-declared function or method: the shared declaration plus the
/// environment captured at the definition site.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a fresh function whose closure sees `this`.  Called on every
    /// method access, so bound methods never persist inside the instance and
    /// cannot form a retain cycle.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());

        environment.define("this", instance);

        LoxFunction::new(
            self.declaration.clone(),
            Rc::new(RefCell::new(environment)),
            self.is_initializer,
        )
    }

    /// Bind parameters in a fresh environment over the closure, run the body,
    /// and absorb a `return` unwind.  An initializer yields `this` on every
    /// path, including a bare `return;`.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> std::result::Result<Value, Signal> {
        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let result: std::result::Result<(), Signal> = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(environment)),
        );

        match result {
            Err(Signal::Return(value)) => {
                if self.is_initializer {
                    self.this_binding()
                } else {
                    Ok(value)
                }
            }

            Err(signal) => Err(signal),

            Ok(()) => {
                if self.is_initializer {
                    self.this_binding()
                } else {
                    Ok(Value::Nil)
                }
            }
        }
    }

    // Initializers are only ever called bound, so `this` sits in the closure
    // itself.
    fn this_binding(&self) -> std::result::Result<Value, Signal> {
        let line: usize = self.declaration.name.line;

        self.closure
            .borrow()
            .get_at(0, "this", line)
            .map_err(Signal::from)
    }
}

impl Display for LoxFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
