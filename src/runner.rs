//! End-to-end pipeline: scan → parse → resolve → interpret.
//!
//! Every run starts from a fresh interpreter, so globals never leak from one
//! program into the next.

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{Diagnostics, RunError};
use crate::interpreter::Interpreter;
use crate::parser::parse;
use crate::resolver::{resolve, Locals};
use crate::scanner::scan_tokens;

/// A program that passed every static check and is ready to execute.
#[derive(Debug)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub locals: Locals,
}

/// Run the front end over `source`.
///
/// Scanning and parsing report into the same [`Diagnostics`]; resolution is
/// skipped when either found problems. Any collected error fails the build.
pub fn compile(source: &str) -> Result<Program, RunError> {
    info!("Compiling {} byte(s) of source", source.len());

    let mut diagnostics = Diagnostics::new();

    let tokens = scan_tokens(source, &mut diagnostics);
    let statements = parse(&tokens, &mut diagnostics);

    if diagnostics.has_errors() {
        debug!("Front end reported {} error(s)", diagnostics.len());

        return Err(RunError::Compile(diagnostics.into_errors()));
    }

    let locals = resolve(&statements, &mut diagnostics);

    if diagnostics.has_errors() {
        debug!("Resolver reported {} error(s)", diagnostics.len());

        return Err(RunError::Compile(diagnostics.into_errors()));
    }

    Ok(Program { statements, locals })
}

/// Compile and execute `source`, writing `print` output to `out`.
pub fn run(source: &str, out: impl Write + 'static) -> Result<(), RunError> {
    let Program { statements, locals } = compile(source)?;

    let mut interpreter = Interpreter::with_output(out);
    interpreter.resolve(locals);

    interpreter
        .interpret(&statements)
        .map_err(RunError::Runtime)?;

    info!("Program finished");

    Ok(())
}
