//! Shell contexts, the context stack, and the read-eval session
//!
//! Each shell context runs a read-eval loop: read a line, resolve the
//! alias, validate, dispatch, repeat until the context bails. Entering a
//! sub-shell pushes a child context and blocks the parent until the child
//! is popped; nesting is cooperative and synchronous, never parallel.
//! The bottom-most ("mother") context cannot be popped by the generic
//! exit path.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::catalog::ShellType;
use crate::engine::Engine;
use crate::executor::{self, codes, ExecMode};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellError {
    #[error("cannot exit the mother shell from the generic exit path")]
    MotherShell,
}

/// Context state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Initializing,
    Running,
    Bailing,
    Terminated,
}

/// A long-running background worker owned by one shell context.
/// Cancellation is cooperative: the worker polls the flag at loop
/// boundaries and is joined, never forcibly killed.
#[derive(Debug)]
pub struct WorkerHandle {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Signal cancellation and wait for the worker to finish.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a periodic worker (an auto-save timer, a transfer monitor).
/// The tick closure runs once per interval until the handle is stopped;
/// the sleep itself polls the cancel flag so stopping is prompt.
pub fn spawn_worker<F>(interval: Duration, mut tick: F) -> WorkerHandle
where
    F: FnMut() + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let handle = thread::spawn(move || {
        while !flag.load(Ordering::Relaxed) {
            tick();
            let mut slept = Duration::ZERO;
            let chunk = Duration::from_millis(10);
            while slept < interval {
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                thread::sleep(chunk.min(interval - slept));
                slept += chunk;
            }
        }
    });
    WorkerHandle {
        cancel,
        handle: Some(handle),
    }
}

/// One nested shell frame.
#[derive(Debug)]
pub struct ShellContext {
    scope: ShellType,
    bail: bool,
    lifecycle: Lifecycle,
    worker: Option<WorkerHandle>,
}

impl ShellContext {
    pub fn new(scope: ShellType) -> Self {
        ShellContext {
            scope,
            bail: false,
            lifecycle: Lifecycle::Initializing,
            worker: None,
        }
    }

    pub fn scope(&self) -> ShellType {
        self.scope
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn bail(&self) -> bool {
        self.bail
    }

    pub fn set_running(&mut self) {
        self.lifecycle = Lifecycle::Running;
    }

    /// Attach the context's background worker, replacing (and stopping)
    /// any previous one.
    pub fn attach_worker(&mut self, worker: WorkerHandle) {
        if let Some(mut old) = self.worker.replace(worker) {
            old.stop();
        }
    }

    /// Request loop exit. The worker is stopped when the context starts
    /// bailing, never left orphaned across a pop.
    pub fn request_bail(&mut self) {
        self.bail = true;
        self.lifecycle = Lifecycle::Bailing;
        if let Some(worker) = self.worker.as_mut() {
            worker.stop();
        }
    }

    pub fn terminate(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            worker.stop();
        }
        self.worker = None;
        self.lifecycle = Lifecycle::Terminated;
    }
}

/// Ordered stack of nested shell contexts. The bottom-most context is the
/// mother shell; the generic exit path refuses to pop it.
#[derive(Debug, Default)]
pub struct ShellStack {
    contexts: Vec<ShellContext>,
}

impl ShellStack {
    pub fn new() -> Self {
        ShellStack::default()
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn push(&mut self, ctx: ShellContext) {
        self.contexts.push(ctx);
    }

    pub fn top(&self) -> Option<&ShellContext> {
        self.contexts.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut ShellContext> {
        self.contexts.last_mut()
    }

    /// Pop the current context. Refuses to pop the mother context,
    /// leaving the stack untouched.
    pub fn pop(&mut self) -> Result<ShellContext, ShellError> {
        if self.contexts.len() <= 1 {
            return Err(ShellError::MotherShell);
        }
        // Length just checked.
        match self.contexts.pop() {
            Some(ctx) => Ok(ctx),
            None => Err(ShellError::MotherShell),
        }
    }

    /// The distinct shutdown path: removes the top context even when it is
    /// the mother shell. Used at process teardown, not by `exit`.
    pub fn shutdown_pop(&mut self) -> Option<ShellContext> {
        self.contexts.pop()
    }

    /// Generic exit: mark the current context bailing unless it is the
    /// mother context.
    pub fn request_exit(&mut self) -> Result<(), ShellError> {
        if self.contexts.len() <= 1 {
            return Err(ShellError::MotherShell);
        }
        if let Some(top) = self.contexts.last_mut() {
            top.request_bail();
        }
        Ok(())
    }
}

/// Action a command body may request from the surrounding session.
/// Applied after the executor returns, so bodies never re-enter the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Exit,
    Enter(ShellType),
}

/// Per-dispatch channel from a command body back to the session.
#[derive(Debug, Default)]
pub struct ShellControl {
    pending: Option<ShellAction>,
}

impl ShellControl {
    pub fn request_exit(&mut self) {
        self.pending = Some(ShellAction::Exit);
    }

    pub fn enter(&mut self, scope: ShellType) {
        self.pending = Some(ShellAction::Enter(scope));
    }

    pub fn pending(&self) -> Option<ShellAction> {
        self.pending
    }

    pub fn take(&mut self) -> Option<ShellAction> {
        self.pending.take()
    }
}

/// Where a session reads its lines from. The interactive binary plugs in
/// rustyline; tests and `-c` mode use a `ScriptSource`.
pub trait LineSource {
    /// Read one line. `Ok(None)` means end of input (bails the context).
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// A fixed list of lines, consumed front to back.
#[derive(Debug, Default)]
pub struct ScriptSource {
    lines: VecDeque<String>,
}

impl ScriptSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptSource {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for ScriptSource {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Builds the background worker for a newly entered context, if any.
pub type WorkerFactory = Box<dyn Fn(ShellType) -> Option<WorkerHandle>>;

/// A session drives the shell stack over one line source.
pub struct Session<'e> {
    engine: &'e Engine,
    stack: ShellStack,
    last_code: i32,
    worker_factory: Option<WorkerFactory>,
}

impl<'e> Session<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Session {
            engine,
            stack: ShellStack::new(),
            last_code: codes::SUCCESS,
            worker_factory: None,
        }
    }

    pub fn with_worker_factory(mut self, factory: WorkerFactory) -> Self {
        self.worker_factory = Some(factory);
        self
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn last_code(&self) -> i32 {
        self.last_code
    }

    fn prompt(&self) -> String {
        match self.stack.top().map(ShellContext::scope) {
            Some(ShellType::Shell) | None => "nsh> ".to_string(),
            Some(scope) => format!("nsh:{scope}> "),
        }
    }

    /// Run a read-eval loop for `scope` until it bails or the source is
    /// exhausted. Recursive sub-shell entry blocks this loop until the
    /// child context pops. Returns the last exit code.
    pub fn run(&mut self, scope: ShellType, lines: &mut dyn LineSource) -> i32 {
        self.stack.push(ShellContext::new(scope));
        if let Some(top) = self.stack.top_mut() {
            top.set_running();
            if let Some(factory) = &self.worker_factory {
                if let Some(worker) = factory(scope) {
                    top.attach_worker(worker);
                }
            }
        }
        log::debug!("entered {scope} shell (depth {})", self.stack.depth());

        loop {
            match self.stack.top() {
                Some(top) if !top.bail() => {}
                _ => break,
            }
            let prompt = self.prompt();
            match lines.read_line(&prompt) {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    self.handle_line(&line, lines);
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("line read failed: {e}");
                    break;
                }
            }
        }

        let popped = if self.stack.depth() > 1 {
            self.stack.pop().ok()
        } else {
            self.stack.shutdown_pop()
        };
        if let Some(mut ctx) = popped {
            ctx.terminate();
        }
        log::debug!("left {scope} shell (depth {})", self.stack.depth());
        self.last_code
    }

    fn handle_line(&mut self, line: &str, lines: &mut dyn LineSource) {
        let scope = match self.stack.top() {
            Some(top) => top.scope(),
            None => return,
        };
        let mut control = ShellControl::default();
        self.last_code = executor::run_line(self.engine, scope, line, ExecMode::Direct, &mut control);

        match control.take() {
            Some(ShellAction::Exit) => {
                if let Err(e) = self.stack.request_exit() {
                    eprintln!("{e}");
                    self.last_code = codes::MOTHER_EXIT;
                }
            }
            Some(ShellAction::Enter(child)) => {
                self.run(child, lines);
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn lifecycle_transitions() {
        let mut ctx = ShellContext::new(ShellType::Shell);
        assert_eq!(ctx.lifecycle(), Lifecycle::Initializing);
        ctx.set_running();
        assert_eq!(ctx.lifecycle(), Lifecycle::Running);
        ctx.request_bail();
        assert_eq!(ctx.lifecycle(), Lifecycle::Bailing);
        assert!(ctx.bail());
        ctx.terminate();
        assert_eq!(ctx.lifecycle(), Lifecycle::Terminated);
    }

    #[test]
    fn mother_context_cannot_be_popped() {
        let mut stack = ShellStack::new();
        stack.push(ShellContext::new(ShellType::Shell));

        assert_eq!(stack.pop().unwrap_err(), ShellError::MotherShell);
        assert_eq!(stack.request_exit().unwrap_err(), ShellError::MotherShell);
        // The stack is left untouched.
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn nested_context_pops_normally() {
        let mut stack = ShellStack::new();
        stack.push(ShellContext::new(ShellType::Shell));
        stack.push(ShellContext::new(ShellType::Transfer));

        stack.request_exit().unwrap();
        assert!(stack.top().map(ShellContext::bail).unwrap_or(false));
        let popped = stack.pop().unwrap();
        assert_eq!(popped.scope(), ShellType::Transfer);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn shutdown_pop_removes_the_mother() {
        let mut stack = ShellStack::new();
        stack.push(ShellContext::new(ShellType::Shell));
        assert!(stack.shutdown_pop().is_some());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn worker_stops_when_context_bails() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let worker = spawn_worker(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let mut ctx = ShellContext::new(ShellType::Editor);
        ctx.set_running();
        ctx.attach_worker(worker);

        thread::sleep(Duration::from_millis(30));
        ctx.request_bail();
        let after_bail = ticks.load(Ordering::Relaxed);
        assert!(after_bail >= 1);

        // Bailing joined the worker; no further ticks arrive.
        thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::Relaxed), after_bail);
    }

    #[test]
    fn script_source_ends_with_none() {
        let mut src = ScriptSource::new(["one", "two"]);
        assert_eq!(src.read_line("> ").unwrap(), Some("one".to_string()));
        assert_eq!(src.read_line("> ").unwrap(), Some("two".to_string()));
        assert_eq!(src.read_line("> ").unwrap(), None);
    }

    #[test]
    fn control_actions_are_taken_once() {
        let mut control = ShellControl::default();
        control.enter(ShellType::Transfer);
        assert_eq!(control.pending(), Some(ShellAction::Enter(ShellType::Transfer)));
        assert_eq!(control.take(), Some(ShellAction::Enter(ShellType::Transfer)));
        assert_eq!(control.take(), None);
    }
}
