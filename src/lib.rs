//! nsh - Nested Shell
//!
//! # Overview
//!
//! nsh is a multi-shell command interpreter engine: a root shell plus
//! nameable sub-shells (a file-transfer shell, a structured-data editor
//! shell) sharing one command-catalog, alias, and dispatch engine.
//!
//! The engine decides whether a typed line is well-formed for a command's
//! declared contract and routes it to an opaque body; the bodies
//! themselves are external collaborators registered at startup.
//!
//! # Pipeline
//!
//! ```text
//! raw line -> alias resolver -> switch extractor -> arguments validator
//!          -> command executor -> body -> exit code
//! ```
//!
//! # Example
//!
//! ```rust
//! use nsh::{eval_line, register_builtins, Engine, ShellType};
//!
//! let engine = Engine::new();
//! register_builtins(&engine);
//! let (code, output) = eval_line(&engine, ShellType::Shell, "echo hello");
//! assert_eq!(code, 0);
//! assert_eq!(output, "hello\n");
//! ```

pub mod alias;
pub mod builtins;
pub mod catalog;
pub mod engine;
pub mod executor;
pub mod repl;
pub mod shell;
pub mod switches;
pub mod validator;

// Re-export commonly used items
pub use alias::{AliasEntry, AliasError, AliasStore, AliasTable};
pub use builtins::register_builtins;
pub use catalog::{
    ArgumentPart, ArgumentShape, Catalog, CommandBody, CommandFlags, CommandInfo, ShellType,
    SwitchSpec,
};
pub use engine::Engine;
pub use executor::{codes, BodyError, CommandRequest, ExecMode, OutputSink};
pub use shell::{
    LineSource, ScriptSource, Session, ShellAction, ShellContext, ShellControl, ShellError,
    ShellStack,
};
pub use switches::Extraction;
pub use validator::ParsedCall;

/// Convenience: run one line in Buffer mode and return (exit code, output).
pub fn eval_line(engine: &Engine, scope: ShellType, line: &str) -> (i32, String) {
    let mut control = ShellControl::default();
    let mut out = String::new();
    let code = executor::run_buffered(engine, scope, line, &mut control, &mut out);
    (code, out)
}
