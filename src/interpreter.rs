use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::LoxClass;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::function::LoxFunction;
use crate::native;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local control flow bubbling through the evaluator: a `return`
/// unwinding to the nearest enclosing call, or a runtime error aborting the
/// whole interpretation.  `LoxFunction::call` absorbs `Return`; nothing
/// absorbs `Error`.
#[derive(Debug)]
pub enum Signal {
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Signal {
    fn from(e: LoxError) -> Self {
        Signal::Error(e)
    }
}

type ExprResult = std::result::Result<Value, Signal>;
type StmtResult = std::result::Result<(), Signal>;

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    // Resolver side table: reference expression id -> scope distance.
    // References without an entry resolve in globals.
    locals: HashMap<ExprId, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define("clock", native::clock());

        let environment: Rc<RefCell<Environment>> = globals.clone();

        Interpreter {
            globals,
            environment,
            locals: HashMap::new(),
        }
    }

    /// Run a resolved program.  The first runtime error halts execution.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            if let Err(signal) = self.execute(stmt) {
                return match signal {
                    Signal::Error(e) => Err(e),

                    Signal::Return(_) => unreachable!("resolver rejects top-level 'return'"),
                };
            }
        }

        Ok(())
    }

    /// Resolver callback: record that `id` binds `depth` scopes up from its
    /// use site.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Recording local binding: expr #{} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> StmtResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                println!("{}", value);

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = if let Some(expr) = initializer {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment: Environment =
                    Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(decl) => {
                let function: LoxFunction =
                    LoxFunction::new(decl.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::Nil,
                };

                Err(Signal::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` in `environment`, restoring the previous environment
    /// on every exit path: normal completion, a `return` unwind, or a runtime
    /// error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> StmtResult {
        let previous: Rc<RefCell<Environment>> = self.environment.clone();

        self.environment = environment;

        let mut result: StmtResult = Ok(());

        for stmt in statements {
            result = self.execute(stmt);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> StmtResult {
        // Defined up front so methods can refer to the class by name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let line: usize = match expr {
                    Expr::Variable {
                        name: super_name, ..
                    } => super_name.line,

                    _ => name.line,
                };

                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),

                    _ => {
                        return Err(
                            LoxError::runtime(line, "Superclass must be a class.").into()
                        );
                    }
                }
            }

            None => None,
        };

        // Method closures of a subclass see `super` one scope up.
        let previous: Option<Rc<RefCell<Environment>>> = match &superclass_value {
            Some(class) => {
                let previous: Rc<RefCell<Environment>> = self.environment.clone();

                let mut environment: Environment =
                    Environment::with_enclosing(previous.clone());

                environment.define("super", Value::Class(class.clone()));

                self.environment = Rc::new(RefCell::new(environment));

                Some(previous)
            }

            None => None,
        };

        let mut method_map: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for decl in methods {
            let is_initializer: bool = decl.name.lexeme == "init";

            let function: LoxFunction =
                LoxFunction::new(decl.clone(), self.environment.clone(), is_initializer);

            method_map.insert(decl.name.lexeme.clone(), Rc::new(function));
        }

        let class: Value = Value::Class(Rc::new(LoxClass::new(
            name.lexeme.clone(),
            superclass_value,
            method_map,
        )));

        if let Some(previous) = previous {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, class, name.line)?;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> ExprResult {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.lookup_variable(name, *id),

            Expr::This { id, keyword } => self.lookup_variable(keyword, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                if let Some(&distance) = self.locals.get(id) {
                    self.environment.borrow_mut().assign_at(
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?;
                } else {
                    self.globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?;
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => {
                let object_value: Value = self.evaluate(object)?;

                if let Value::Instance(ref instance) = object_value {
                    instance
                        .borrow()
                        .get(name, &object_value)
                        .map_err(Signal::from)
                } else {
                    Err(LoxError::runtime(name.line, "Only instances have properties.").into())
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object_value: Value = self.evaluate(object)?;

                if let Value::Instance(instance) = object_value {
                    let value: Value = self.evaluate(value)?;

                    instance.borrow_mut().set(name, value.clone());

                    Ok(value)
                } else {
                    Err(LoxError::runtime(name.line, "Only instances have fields.").into())
                }
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> ExprResult {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operand must be a number.").into(),
                ),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ExprResult {
        let left_value: Value = self.evaluate(left)?;
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // Either side a string: concatenate the display of both.
                (a @ Value::String(_), b) | (a, b @ Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", a, b)))
                }

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            // IEEE-754 throughout: division by zero is an infinity or NaN,
            // never a runtime error.
            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::PERCENT => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(
                    LoxError::runtime(operator.line, "Operands must be numbers.").into(),
                ),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    // `and`/`or` return the deciding operand itself, not a boolean, and never
    // evaluate the right side when the left decides.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ExprResult {
        let left_value: Value = self.evaluate(left)?;

        if operator.token_type == TokenType::OR {
            if is_truthy(&left_value) {
                return Ok(left_value);
            }
        } else if !is_truthy(&left_value) {
            return Ok(left_value);
        }

        self.evaluate(right)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> ExprResult {
        let callee_value: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());

        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match callee_value {
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;

                function.call(self, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;

                LoxClass::construct(class, self, args)
            }

            Value::NativeFunction { arity, func, .. } => {
                check_arity(arity, args.len(), paren)?;

                func(&args).map_err(Signal::from)
            }

            _ => Err(
                LoxError::runtime(paren.line, "Can only call functions and classes.").into(),
            ),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> ExprResult {
        let distance: usize = match self.locals.get(&id) {
            Some(&distance) => distance,

            None => {
                return Err(
                    LoxError::runtime(keyword.line, "Unresolved 'super' expression.").into(),
                );
            }
        };

        let superclass: Rc<LoxClass> =
            match self
                .environment
                .borrow()
                .get_at(distance, "super", keyword.line)?
            {
                Value::Class(class) => class,

                _ => {
                    return Err(LoxError::runtime(
                        keyword.line,
                        "'super' is not bound to a class.",
                    )
                    .into());
                }
            };

        // `this` always sits one scope below `super`.
        let instance: Value =
            self.environment
                .borrow()
                .get_at(distance - 1, "this", keyword.line)?;

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),

            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into()),
        }
    }

    fn lookup_variable(&self, name: &Token, id: ExprId) -> ExprResult {
        if let Some(&distance) = self.locals.get(&id) {
            self.environment
                .borrow()
                .get_at(distance, &name.lexeme, name.line)
                .map_err(Signal::from)
        } else {
            self.globals
                .borrow()
                .get(&name.lexeme, name.line)
                .map_err(Signal::from)
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),

        LiteralValue::Str(s) => Value::String(s.clone()),

        LiteralValue::True => Value::Bool(true),

        LiteralValue::False => Value::Bool(false),

        LiteralValue::Nil => Value::Nil,
    }
}

fn check_arity(
    expected: usize,
    got: usize,
    paren: &Token,
) -> std::result::Result<(), Signal> {
    if expected == got {
        Ok(())
    } else {
        Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, got),
        )
        .into())
    }
}

/// Only `nil` and `false` are false; everything else, `0`, `""`, and `NaN`
/// included, is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}
