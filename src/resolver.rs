//! Static resolver pass for the **Ling** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, reading a local in its own
//!    initializer, misplaced `return`/`this`/`super`/`break`/`continue`,
//!    self-inheritance) into the shared [`Diagnostics`] without stopping.
//! 3. Record, for *each* name-resolving node, how many frames out its binding
//!    lives. Nodes with no entry are globals, looked up dynamically.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::{NativeFunction, INITIALIZER};
use crate::error::{Diagnostics, LingError};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// Node identity → number of frames between the reference and its binding.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body we are in. Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body we are in. Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'d> {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    globals: HashMap<String, bool>,     // same, for top-level declarations
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Resolver<'d> {
    pub fn new(diagnostics: &'d mut Diagnostics) -> Self {
        info!("Resolver instantiated");

        // Natives exist before the first statement runs.
        let globals: HashMap<String, bool> = NativeFunction::builtins()
            .iter()
            .map(|native| (native.name.to_string(), true))
            .collect();

        Resolver {
            scopes: Vec::new(),
            globals,
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            diagnostics,
        }
    }

    /// Walk all top‑level statements and return the distance table.
    pub fn resolve(mut self, statements: &[Stmt]) -> Locals {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        info!("Resolved {} local reference(s)", self.locals.len());

        self.locals
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt))
    }

    fn resolve_stmt_inner(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // name is visible *inside* its own body
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }

            Stmt::Break(keyword) => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Must use break inside of a loop.");
                }
            }

            Stmt::Continue(keyword) => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Must use continue inside of a loop.");
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FunctionDecl>]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.bind_synthetic("super");
        }

        self.begin_scope();
        self.bind_synthetic("this");

        for method in methods {
            let kind = if method.name.lexeme == INITIALIZER {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| self.resolve_expr_inner(expr))
    }

    fn resolve_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if self.is_declared_not_ready(&name.lexeme) {
                    self.error(name, "Can't read local variable in its own initializer.");
                }
                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                }
                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loops = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;
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

    fn bind_synthetic(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) {
        match self.scopes.last_mut() {
            Some(scope) => {
                if scope.contains_key(&name.lexeme) {
                    self.error(name, "Already a variable with this name in this scope.");
                    return;
                }
                scope.insert(name.lexeme.clone(), false);
            }
            // Globals may be redeclared; only a first declaration is "not ready".
            None => {
                self.globals.entry(name.lexeme.clone()).or_insert(false);
            }
        }
    }

    fn define(&mut self, name: &Token) {
        match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), true),
            None => self.globals.insert(name.lexeme.clone(), true),
        };
    }

    fn is_declared_not_ready(&self, name: &str) -> bool {
        let scope = self.scopes.last().unwrap_or(&self.globals);

        scope.get(name) == Some(&false)
    }

    fn error(&mut self, token: &Token, message: &str) {
        debug!("Resolve error at line {}: {}", token.line, message);

        self.diagnostics.report(LingError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this reference as a local at depth `d`, or leave it out of the
    /// table when no enclosing scope declares it (a global).
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}

/// Convenience wrapper: resolve `statements` with a fresh [`Resolver`].
pub fn resolve(statements: &[Stmt], diagnostics: &mut Diagnostics) -> Locals {
    Resolver::new(diagnostics).resolve(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::scanner::scan_tokens;

    fn resolve_source(src: &str) -> (Locals, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(src, &mut diagnostics);
        let statements = parse(&tokens, &mut diagnostics);
        assert!(!diagnostics.has_errors(), "source must parse cleanly");

        let locals = resolve(&statements, &mut diagnostics);
        let errors = diagnostics.iter().map(ToString::to_string).collect();

        (locals, errors)
    }

    fn errors(src: &str) -> Vec<String> {
        resolve_source(src).1
    }

    #[test]
    fn distances_count_frames_skipped() {
        // ids: a(0) in block-1 print, a(1) in nested print, g(2) global read
        let (locals, errs) = resolve_source("var g; { var a; print a; { print a; print g; } }");

        assert!(errs.is_empty());
        assert_eq!(locals.get(&ExprId(0)), Some(&0));
        assert_eq!(locals.get(&ExprId(1)), Some(&1));
        assert_eq!(locals.get(&ExprId(2)), None);
    }

    #[test]
    fn self_reference_in_initializer_is_reported() {
        assert_eq!(
            errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
        assert_eq!(
            errors("var a = a;"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
        assert!(errors("var a = 1; var a = a;").is_empty());
    }

    #[test]
    fn natives_count_as_defined_globals() {
        assert!(errors("var clock = clock;").is_empty());
        assert_eq!(errors("{ var clock = clock; }").len(), 1);
    }

    #[test]
    fn duplicate_declaration_only_in_same_frame() {
        assert_eq!(
            errors("{ var a; var a; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        assert!(errors("{ var a; { var a; } }").is_empty());
        assert!(errors("var a; var a;").is_empty());
    }

    #[test]
    fn duplicate_parameter_names_share_one_frame() {
        assert_eq!(
            errors("fun f(a, a) {}"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        assert_eq!(
            errors("fun f(a) { var a; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn misplaced_keywords_each_have_their_own_message() {
        assert_eq!(
            errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );
        assert!(errors("class A { init() { return; } }").is_empty());
        assert_eq!(
            errors("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            errors("class A { f() { super.f(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            errors("fun f() { super.f(); }"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn loop_signals_do_not_cross_function_bodies() {
        assert_eq!(
            errors("break;"),
            vec!["[line 1] Error at 'break': Must use break inside of a loop."]
        );
        assert_eq!(
            errors("while (true) { fun f() { continue; } }"),
            vec!["[line 1] Error at 'continue': Must use continue inside of a loop."]
        );
        assert!(errors("while (true) { fun f() { while (true) continue; } break; }").is_empty());
    }

    #[test]
    fn errors_accumulate_across_the_whole_program() {
        assert_eq!(errors("return; break; print this;").len(), 3);
    }

    #[test]
    fn method_this_and_super_resolve_through_synthetic_frames() {
        // ids: A(0) superclass, super(1), this(2)
        let (locals, errs) = resolve_source("class A {} class B < A { m() { super.m(); this; } }");

        assert!(errs.is_empty());
        assert_eq!(locals.get(&ExprId(0)), None);
        assert_eq!(locals.get(&ExprId(1)), Some(&2));
        assert_eq!(locals.get(&ExprId(2)), Some(&1));
    }
}
