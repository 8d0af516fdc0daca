//! Static resolution pass.
//!
//! A single AST walk that:
//! 1. **Builds lexical scopes**: maintains a stack of `HashMap<String, bool>`
//!    tracking declared (`false`) and fully defined (`true`) names in each
//!    nested block, function body, or class body.
//! 2. **Enforces static rules**: redeclaration in the same local scope,
//!    reading a variable in its own initializer, `return` outside functions,
//!    returning a value from an initializer, and `this`/`super` misuse.
//! 3. **Records binding distances**: for every reference expression
//!    (`Variable`, `Assign`, `This`, `Super`), calls back into the
//!    interpreter with the expression id and the number of scopes between
//!    use and declaration.  References found in no scope get no record and
//!    resolve in globals at runtime.
//!
//! Resolution halts on the first static error.
//!
//! After parsing, before interpretation:
//! ```ignore
//! let mut resolver = Resolver::new(&mut interpreter);
//! resolver.resolve(&statements)?;
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

/// Tracks scopes, enforces static rules, and records binding distances by
/// calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Class {
                name,
                methods,
                superclass,
            } => {
                self.resolve_class(name, superclass.as_ref(), methods)?;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s)?;
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared before the initializer resolves, defined after, so
                // the initializer cannot read the name it is initializing.
                self.declare(name)?;

                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                self.define(name);
            }

            Stmt::Function(decl) => {
                // Declared and defined eagerly so the body can recurse.
                self.declare(&decl.name)?;
                self.define(&decl.name);

                self.resolve_function(FunctionType::Function, decl)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;

                self.resolve_stmt(then_branch)?;

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;

                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    // In an initializer, only a bare `return;` is allowed.
                    if self.current_function == FunctionType::Initializer {
                        return Err(LoxError::resolve(
                            keyword.line,
                            "Can't return a value from an initializer.",
                        ));
                    }

                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        // 1. Self-inheritance guard
        if let Some(Expr::Variable {
            name: super_name, ..
        }) = superclass
        {
            if super_name.lexeme == name.lexeme {
                return Err(LoxError::resolve(
                    super_name.line,
                    "A class can't inherit from itself.",
                ));
            }
        }

        // 2. Declare & define the class name so methods can refer to it
        self.declare(name)?;
        self.define(name);

        // 3. Save and enter the class context
        let enclosing_class: ClassType = self.current_class;

        self.current_class = if superclass.is_some() {
            ClassType::Subclass
        } else {
            ClassType::Class
        };

        // 4. If there is a superclass, resolve it and open a scope binding
        //    `super`
        if let Some(expr) = superclass {
            self.resolve_expr(expr)?;

            self.begin_scope();
            self.scope_insert("super");
        }

        // 5. Open the implicit `this` scope for methods
        self.begin_scope();
        self.scope_insert("this");

        // 6. Resolve each method in its own function context
        for method in methods {
            let kind: FunctionType = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(kind, method)?;
        }

        // 7. Close the `this` scope, then the `super` scope if one was opened
        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        // 8. Restore the outer class context
        self.current_class = enclosing_class;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                // Reading a name that is declared but not yet defined in the
                // innermost scope means the initializer refers to itself.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // Right-hand side first, then bind the assignment target.
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;

                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'this' outside of a class.",
                    ));
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Get { object, .. } => {
                // Property names are looked up dynamically; only the object
                // resolves statically.
                self.resolve_expr(object)?;
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            Expr::Super { id, keyword, .. } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'super' outside of a class.",
                    ));
                }

                if self.current_class != ClassType::Subclass {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'super' in a class with no superclass.",
                    ));
                }

                self.resolve_local(*id, keyword);
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    ///
    /// `kind` distinguishes plain functions, methods, and initializers.
    fn resolve_function(&mut self, kind: FunctionType, decl: &FunctionDecl) -> Result<()> {
        let enclosing: FunctionType = self.current_function;

        self.current_function = kind;

        self.begin_scope();

        for param in &decl.params {
            self.declare(param)?;
            self.define(param);
        }

        for stmt in &decl.body {
            self.resolve_stmt(stmt)?;
        }

        self.end_scope();

        self.current_function = enclosing;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    // Implicit bindings (`this`, `super`) are born defined.
    fn scope_insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) -> Result<()> {
        // The global scope is unscoped: redeclaration is allowed there.
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    "Already a variable with this name in this scope.",
                ));
            }

            scope.insert(name.lexeme.clone(), false);
        }

        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this reference as a local at the depth of the first enclosing
    /// scope containing the name, or leave it for globals when no scope has
    /// it.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.resolve(id, depth);

                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
