//! nsh - Nested Shell
//!
//! Usage:
//!   nsh               Start the interactive root shell
//!   nsh -c "line"     Execute a single command line
//!   nsh --help        Show help
//!   nsh --version     Show version

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use nsh::repl::ReplSource;
use nsh::shell::{ScriptSource, Session};
use nsh::{register_builtins, AliasStore, Engine, ShellType};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"nsh {VERSION} - Nested Shell, a multi-shell command interpreter

USAGE:
    nsh                 Start the interactive root shell
    nsh -c <line>       Execute a single command line and exit
    nsh --help          Show this help message
    nsh --version       Show version

SYNTAX:
    command arg "quoted arg" -switch -name=value
    Switch values may be quoted with ", ' or ` and escape the
    delimiter with a backslash.

BUILTINS:
    help [command]      List commands, or show one command's usage
    alias add|rem|list  Manage aliases (persisted to the alias store)
    wrap <command>      Run a command with paged output
    pipe <src> <dst>    Feed one command's output to another (-quoted)
    transfer            Enter the file-transfer shell
    editor              Enter the structured-data editor shell
    exit                Leave the current shell

STARTUP:
    ~/.nsh/aliases.json Alias store, rewritten on every change
    RUST_LOG=debug      Enable engine logging
"#
    );
}

fn alias_store_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".nsh").join("aliases.json"))
}

fn build_engine() -> Engine {
    let engine = Engine::new();
    register_builtins(&engine);
    if let Some(path) = alias_store_path() {
        engine.attach_alias_store(AliasStore::new(path));
    }
    engine
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--help") | Some("-h") => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Some("--version") | Some("-V") => {
            println!("nsh {VERSION}");
            return ExitCode::SUCCESS;
        }
        Some("-c") => {
            let Some(line) = args.get(1) else {
                eprintln!("nsh: -c requires a command line");
                return ExitCode::FAILURE;
            };
            let engine = build_engine();
            let mut session = Session::new(&engine);
            let mut source = ScriptSource::new([line.clone()]);
            let code = session.run(ShellType::Shell, &mut source);
            return exit_code(code);
        }
        Some(other) => {
            eprintln!("nsh: unknown argument '{other}' (try --help)");
            return ExitCode::FAILURE;
        }
        None => {}
    }

    // Ctrl+C sets the cooperative interrupt flag; paging polls it.
    let engine = build_engine();
    let interrupt = engine.interrupt().clone();
    if let Err(e) = ctrlc::set_handler(move || interrupt.store(true, Ordering::Relaxed)) {
        log::warn!("could not install interrupt handler: {e}");
    }

    let mut source = match ReplSource::new() {
        Ok(source) => source,
        Err(e) => {
            eprintln!("nsh: could not initialize line editor: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(&engine);
    let code = session.run(ShellType::Shell, &mut source);
    exit_code(code)
}

fn exit_code(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(code.clamp(0, 255) as u8)
    }
}
