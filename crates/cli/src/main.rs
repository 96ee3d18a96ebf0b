//! `clockwork` — REPL and script driver for the Clockwork language.
//!
//! This binary is the "external collaborator" `spec.md` §1 places out of
//! scope for the core: it owns argument handling, file I/O, and the REPL
//! loop, and contains no interpreter logic of its own (`spec.md` §6).

use clap::Parser;
use clockwork_vm::{InterpretError, Vm};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

const BANNER: &str = concat!("Clockwork v", env!("CARGO_PKG_VERSION_MAJOR"), ".", env!("CARGO_PKG_VERSION_MINOR"));

#[derive(Parser)]
#[command(name = "clockwork")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clockwork - a bytecode interpreter for a small scripting language", long_about = None)]
struct Args {
    /// Script to run. Omit to start the interactive REPL.
    script: Option<PathBuf>,
}

/// Exit codes per `spec.md` §6.
const EXIT_OK: u8 = 0;
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_IO_ERROR: u8 = 74;

fn main() -> ExitCode {
    let args = Args::parse();
    let code = match args.script {
        Some(path) => run_file(&path),
        None => run_repl(),
    };
    ExitCode::from(code)
}

fn run_file(path: &PathBuf) -> u8 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: could not read '{}': {e}", path.display());
            return EXIT_IO_ERROR;
        }
    };

    let mut vm = Vm::new();
    match vm.interpret(&source) {
        Ok(()) => EXIT_OK,
        Err(InterpretError::Compile(errors)) => {
            for error in &errors {
                eprintln!("{error}");
            }
            EXIT_COMPILE_ERROR
        }
        Err(InterpretError::Runtime(error)) => {
            eprintln!("{error}");
            EXIT_RUNTIME_ERROR
        }
    }
}

fn history_file_path() -> Option<PathBuf> {
    home::home_dir().map(|d| d.join(".clockwork_history"))
}

/// Interactive REPL: one persistent `Vm` across lines, `>>> ` prompt,
/// history via `rustyline`. A compile or runtime error on one line is
/// reported and the loop continues with the next (`spec.md` §7: "The REPL
/// catches the return and continues to the next line").
fn run_repl() -> u8 {
    println!("{BANNER}");

    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error: could not start line editor: {e}");
            return EXIT_IO_ERROR;
        }
    };

    let history_path = history_file_path();
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    let mut vm = Vm::new();

    loop {
        match editor.readline(">>> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                match vm.interpret(&line) {
                    Ok(()) => {}
                    Err(InterpretError::Compile(errors)) => {
                        for error in &errors {
                            eprintln!("{error}");
                        }
                    }
                    Err(InterpretError::Runtime(error)) => {
                        eprintln!("{error}");
                    }
                }
                let _ = std::io::stdout().flush();
            }
            Err(rustyline::error::ReadlineError::Eof)
            | Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = editor.save_history(path);
    }

    EXIT_OK
}
