//! Command execution: direct, wrapped, buffered and piped dispatch
//!
//! The executor is the only place a command body runs. A call that failed
//! validation never reaches the body; a body error is caught exactly once
//! here, logged, and converted to a nonzero exit code so the read-eval
//! loop never unwinds.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use terminal_size::{terminal_size, Height};

use crate::catalog::{CommandInfo, ShellType};
use crate::engine::Engine;
use crate::shell::ShellControl;
use crate::switches::{self, split_first_token};
use crate::validator::{self, ParsedCall};

/// Error type for command bodies. Bodies are external collaborators, so
/// the engine accepts any boxed error.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// Exit-code categories. These identify failure kinds to the caller; they
/// are not errno-style process constants.
pub mod codes {
    pub const SUCCESS: i32 = 0;
    /// Validation failure (usage error).
    pub const USAGE: i32 = 10;
    /// A body reported an error.
    pub const COMMAND_FAILURE: i32 = 20;
    /// No such command in the current scope.
    pub const NOT_FOUND: i32 = 30;
    /// Wrap mode requested for a non-wrappable command.
    pub const WRAP_REJECTED: i32 = 40;
    /// Pipe source command failed.
    pub const PIPE_SOURCE: i32 = 50;
    /// Pipe target command failed.
    pub const PIPE_TARGET: i32 = 51;
    /// Generic exit attempted on the mother shell.
    pub const MOTHER_EXIT: i32 = 60;
}

/// Everything a command body gets besides its output sink.
pub struct CommandRequest<'a> {
    pub call: &'a ParsedCall,
    pub scope: ShellType,
    pub engine: &'a Engine,
    pub control: &'a mut ShellControl,
}

/// Line-oriented output seam. Console for interactive use, a string
/// buffer for Buffer mode, a pager wrapper for Wrap mode.
pub trait OutputSink {
    fn line(&mut self, text: &str) -> io::Result<()>;
}

/// Writes lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn line(&mut self, text: &str) -> io::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{text}")
    }
}

/// Captures lines into an in-memory string.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub buffer: String,
}

impl OutputSink for BufferSink {
    fn line(&mut self, text: &str) -> io::Result<()> {
        self.buffer.push_str(text);
        self.buffer.push('\n');
        Ok(())
    }
}

/// What the user pressed at a paging pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKey {
    More,
    Abort,
}

/// Key polling seam for Wrap mode.
pub trait KeySource {
    fn wait_key(&mut self) -> PageKey;
}

/// Reads paging keys from stdin, one line at a time. Escape or `q` aborts
/// the remaining output. Polls the interrupt flag first so Ctrl+C during
/// paging aborts cleanly instead of blocking.
pub struct StdinKeys {
    interrupt: Arc<AtomicBool>,
}

impl StdinKeys {
    pub fn new(interrupt: Arc<AtomicBool>) -> Self {
        StdinKeys { interrupt }
    }
}

impl KeySource for StdinKeys {
    fn wait_key(&mut self) -> PageKey {
        if self.interrupt.swap(false, Ordering::Relaxed) {
            return PageKey::Abort;
        }
        print!("-- more (Enter to continue, q to stop) -- ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => PageKey::Abort,
            Ok(_) => {
                if self.interrupt.swap(false, Ordering::Relaxed) {
                    return PageKey::Abort;
                }
                let answer = line.trim();
                if answer.starts_with('q') || answer.contains('\u{1b}') {
                    PageKey::Abort
                } else {
                    PageKey::More
                }
            }
        }
    }
}

/// Paging wrapper: after a full screen of lines, block for a key press.
/// Abort discards the remaining output without failing the command.
pub struct PagedSink<'a> {
    inner: &'a mut dyn OutputSink,
    keys: &'a mut dyn KeySource,
    height: usize,
    emitted: usize,
    aborted: bool,
}

impl<'a> PagedSink<'a> {
    pub fn new(inner: &'a mut dyn OutputSink, keys: &'a mut dyn KeySource, height: usize) -> Self {
        PagedSink {
            inner,
            keys,
            height: height.max(1),
            emitted: 0,
            aborted: false,
        }
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

impl OutputSink for PagedSink<'_> {
    fn line(&mut self, text: &str) -> io::Result<()> {
        if self.aborted {
            return Ok(());
        }
        self.inner.line(text)?;
        self.emitted += 1;
        if self.emitted >= self.height {
            self.emitted = 0;
            if self.keys.wait_key() == PageKey::Abort {
                self.aborted = true;
            }
        }
        Ok(())
    }
}

/// Usable screen height for paging; one line is reserved for the prompt.
pub fn page_height() -> usize {
    match terminal_size() {
        Some((_, Height(h))) if h > 1 => h as usize - 1,
        _ => 24,
    }
}

/// How a single command line should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Direct,
    /// Paged output; only permitted for wrappable commands.
    Wrapped,
}

/// Full dispatch pipeline for one line, writing to the console.
pub fn run_line(
    engine: &Engine,
    scope: ShellType,
    line: &str,
    mode: ExecMode,
    control: &mut ShellControl,
) -> i32 {
    let mut sink = ConsoleSink;
    dispatch(engine, scope, line, mode, control, &mut sink)
}

/// Buffer mode: run a line with output captured into `out`.
pub fn run_buffered(
    engine: &Engine,
    scope: ShellType,
    line: &str,
    control: &mut ShellControl,
    out: &mut String,
) -> i32 {
    let mut sink = BufferSink::default();
    let code = dispatch(engine, scope, line, ExecMode::Direct, control, &mut sink);
    out.push_str(&sink.buffer);
    code
}

/// Pipe mode: run `source` buffered; on success append its captured output
/// (optionally quote-wrapped) to `target` and run that through `sink`.
pub fn run_pipe(
    engine: &Engine,
    scope: ShellType,
    source: &str,
    target: &str,
    quoted: bool,
    control: &mut ShellControl,
    sink: &mut dyn OutputSink,
) -> i32 {
    let mut captured = String::new();
    let code = run_buffered(engine, scope, source, control, &mut captured);
    if code != codes::SUCCESS {
        log::error!("pipe: source command execution failed (exit {code})");
        eprintln!("pipe: source command execution failed");
        return codes::PIPE_SOURCE;
    }

    let text = captured.trim_end();
    let line = if text.is_empty() {
        target.to_string()
    } else if quoted {
        format!("{} \"{}\"", target, text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!("{target} {text}")
    };

    let code = dispatch(engine, scope, &line, ExecMode::Direct, control, sink);
    if code != codes::SUCCESS {
        log::error!("pipe: target command execution failed (exit {code})");
        eprintln!("pipe: target command execution failed");
        return codes::PIPE_TARGET;
    }
    codes::SUCCESS
}

/// Resolve, tokenize, validate and execute one line against a sink.
pub fn dispatch(
    engine: &Engine,
    scope: ShellType,
    line: &str,
    mode: ExecMode,
    control: &mut ShellControl,
    sink: &mut dyn OutputSink,
) -> i32 {
    let resolved = engine.resolve_alias(line.trim(), scope);
    if resolved.is_empty() {
        return codes::SUCCESS;
    }

    let (name, raw_args) = split_first_token(&resolved);
    let Some(info) = engine.lookup(name, scope) else {
        let _ = sink.line(&format!("{name}: no such command in {scope} scope"));
        return codes::NOT_FOUND;
    };

    // Wrap gate comes before validation: a non-wrappable command rejects
    // the request regardless of arguments.
    if mode == ExecMode::Wrapped && !info.flags.wrappable {
        let _ = sink.line(&format!("{name}: command output cannot be wrapped"));
        return codes::WRAP_REJECTED;
    }

    let extraction = switches::extract(raw_args);
    let call = validator::validate(&info, raw_args, &extraction);
    if !call.ok() {
        report_usage(&info, &call, sink);
        return codes::USAGE;
    }

    match mode {
        ExecMode::Direct => invoke(&info, &call, engine, scope, control, sink),
        ExecMode::Wrapped => {
            let mut keys = StdinKeys::new(Arc::clone(engine.interrupt()));
            let mut paged = PagedSink::new(sink, &mut keys, page_height());
            invoke(&info, &call, engine, scope, control, &mut paged)
        }
    }
}

fn invoke(
    info: &CommandInfo,
    call: &ParsedCall,
    engine: &Engine,
    scope: ShellType,
    control: &mut ShellControl,
    sink: &mut dyn OutputSink,
) -> i32 {
    let mut req = CommandRequest {
        call,
        scope,
        engine,
        control,
    };
    match info.body.invoke(&mut req, sink) {
        Ok(code) => code,
        Err(err) => {
            log::error!("command '{}' failed: {err}", info.name);
            eprintln!("{}: {err}", info.name);
            codes::COMMAND_FAILURE
        }
    }
}

/// Structured usage explanation for a validation failure.
fn report_usage(info: &CommandInfo, call: &ParsedCall, sink: &mut dyn OutputSink) {
    for shape in &info.overloads {
        let _ = sink.line(&format!("usage: {}", shape.usage(&info.name)));
    }
    if !call.required_args_ok {
        let _ = sink.line("required arguments are missing");
    }
    if !call.part_constraints_ok {
        let _ = sink.line("an argument has the wrong form (numeric or exact word expected)");
    }
    if !call.required_switches_ok {
        let _ = sink.line("a required switch is missing");
    }
    if !call.required_switch_values_ok {
        let _ = sink.line("a switch that requires a value was given none");
    }
    if !call.unknown_switches.is_empty() {
        let _ = sink.line(&format!("unknown switch(es): {}", call.unknown_switches.join(", ")));
    }
    if !call.conflicting_switches.is_empty() {
        let _ = sink.line(&format!(
            "conflicting switches: {}",
            call.conflicting_switches.join(", ")
        ));
    }
    if !info.help.is_empty() {
        let _ = sink.line(&info.help);
    }
}
