//! Centralised error hierarchy for the **Ling interpreter**.
//!
//! All stages (scanner, parser, resolver, runtime, CLI) convert their failure
//! modes into one of the variants defined here. Compile-time problems are
//! accumulated in a [`Diagnostics`] value that is threaded through the
//! front-end stages; runtime problems abort evaluation immediately.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Where a compile-time error points at, rendered between `Error` and `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// No token context (lexical errors).
    Nowhere,

    /// The end-of-input marker.
    AtEnd,

    /// A concrete lexeme.
    At(String),
}

impl Location {
    pub fn of(token: &Token) -> Self {
        if token.token_type == TokenType::EOF {
            Location::AtEnd
        } else {
            Location::At(token.lexeme.clone())
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Nowhere => Ok(()),
            Location::AtEnd => write!(f, " at end"),
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// Typed runtime failures. The `Display` text is the user-facing message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandNotNumber,

    #[error("Operands must be numbers.")]
    OperandsNotNumbers,

    #[error("Operands must be two numbers or two strings.")]
    InvalidAddition,

    #[error("Cannot divide by 0.")]
    DivideByZero,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: usize, got: usize },

    #[error("Only instances have properties.")]
    NotAnInstance,

    #[error("Only instances have fields.")]
    FieldOnNonInstance,

    #[error("Superclass must be a class.")]
    SuperclassNotClass,

    #[error("{0}")]
    Native(String),
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LingError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: Location,
        line: usize,
    },

    /// Static‑analysis or resolution failure (scoping rules, misplaced
    /// `this`/`super`/`return`/`break`/`continue`).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: Location,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error("{kind}\n[line {line}]")]
    Runtime { kind: RuntimeErrorKind, line: usize },

    /// Wrapper around `std::io::Error` (transparent). Raised when the output
    /// sink rejects a `print`.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LingError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LingError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LingError::Parse {
            message,
            location: Location::of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LingError::Resolve {
            message,
            location: Location::of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime(line: usize, kind: RuntimeErrorKind) -> Self {
        info!("Creating Runtime error: line={}, kind={:?}", line, kind);

        LingError::Runtime { kind, line }
    }

    /// The source line the error points at, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LingError::Lex { line, .. }
            | LingError::Parse { line, .. }
            | LingError::Resolve { line, .. }
            | LingError::Runtime { line, .. } => Some(*line),
            LingError::Io(_) => None,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LingError>;

/// Accumulates compile-time errors across scanning, parsing and resolving.
///
/// One value is built per run and passed by `&mut` into each front-end
/// stage. Execution must not start while it holds any error.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LingError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: LingError) {
        info!("Diagnostic recorded: {}", error);

        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LingError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<LingError> {
        self.errors
    }
}

/// Outcome of a failed run, as observed by the host.
#[derive(Debug, Error)]
pub enum RunError {
    /// Lexical, syntax or resolution errors; nothing was executed.
    #[error("{} compile error(s)", .0.len())]
    Compile(Vec<LingError>),

    /// The first uncaught runtime error; execution stopped there.
    #[error(transparent)]
    Runtime(LingError),
}

impl RunError {
    /// Process exit status for this failure (sysexits `DATAERR` / `SOFTWARE`).
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Compile(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }
}
