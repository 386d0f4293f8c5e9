use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser as ClapParser, ValueEnum};
use env_logger::Builder;
use log::{debug, info};

use ling::ast_printer::AstPrinter;
use ling::error::{Diagnostics, RunError};
use ling::runner::{compile, run};
use ling::scanner::scan_tokens;

/// sysexits `EX_USAGE`.
const EXIT_USAGE: i32 = 64;

#[derive(ClapParser, Debug)]
#[command(version, about = "Ling language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run
    script: Option<PathBuf>,

    /// Enable logging to ling.log
    #[arg(long)]
    log: bool,

    /// Print an intermediate form instead of running the script
    #[arg(long, value_enum)]
    emit: Option<Emit>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    /// One token per line: `TYPE lexeme literal`
    Tokens,

    /// One JSON object per token
    JsonTokens,

    /// Parsed statements in prefix form
    Ast,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("ling.log").context("Failed to create ling.log")?;

    // `[module:line] - message`, crate prefix stripped
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("ling::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to ling.log");
    Ok(())
}

/// Print every diagnostic of a failed run to stderr and exit with its status.
fn fail(error: RunError) -> ! {
    match &error {
        RunError::Compile(errors) => {
            for e in errors {
                eprintln!("{}", e);
            }
        }
        RunError::Runtime(e) => eprintln!("{}", e),
    }

    debug!("Run failed, exiting with code {}", error.exit_code());

    process::exit(error.exit_code());
}

fn emit(mode: Emit, source: &str) -> Result<()> {
    info!("Emitting {:?}", mode);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match mode {
        Emit::Tokens | Emit::JsonTokens => {
            let mut diagnostics = Diagnostics::new();
            let tokens = scan_tokens(source, &mut diagnostics);

            for token in &tokens {
                if mode == Emit::Tokens {
                    writeln!(out, "{}", token)?;
                } else {
                    writeln!(out, "{}", serde_json::to_string(token)?)?;
                }
            }
            out.flush()?;

            if diagnostics.has_errors() {
                fail(RunError::Compile(diagnostics.into_errors()));
            }
        }

        Emit::Ast => {
            let program = compile(source).unwrap_or_else(|e| fail(e));

            for stmt in &program.statements {
                writeln!(out, "{}", AstPrinter::print_stmt(stmt))?;
            }
            out.flush()?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let Some(script) = args.script else {
        info!("No script provided");

        eprintln!("{}", Cli::command().render_usage());
        process::exit(EXIT_USAGE);
    };

    let buf = read_file(&script)?;
    let source = String::from_utf8_lossy(&buf);

    debug!("Provided input:\n {}", source);

    if let Some(mode) = args.emit {
        return emit(mode, &source);
    }

    if let Err(e) = run(&source, io::stdout()) {
        fail(e);
    }

    info!("Program executed successfully");

    Ok(())
}
