//! Shared helpers for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nsh::executor::{BodyError, CommandRequest, OutputSink};
use nsh::{register_builtins, ArgumentPart, ArgumentShape, CommandInfo, Engine, ShellType};

/// Engine with the builtins plus the test fixture commands below.
pub fn engine() -> Engine {
    let engine = Engine::new();
    register_builtins(&engine);
    register_fixtures(&engine);
    engine
}

/// Run one line in the root shell scope, buffered.
pub fn eval(engine: &Engine, line: &str) -> (i32, String) {
    nsh::eval_line(engine, ShellType::Shell, line)
}

/// Register a command whose body only bumps a counter, so tests can
/// assert whether the body ran at all.
pub fn register_counted(engine: &Engine, name: &str, shapes: Vec<ArgumentShape>) -> Arc<AtomicUsize> {
    let counter = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&counter);
    let body = move |_req: &mut CommandRequest<'_>,
                     _out: &mut dyn OutputSink|
          -> Result<i32, BodyError> {
        hits.fetch_add(1, Ordering::Relaxed);
        Ok(0)
    };
    let mut info = CommandInfo::new(name, ShellType::Shell, "Counts invocations", Arc::new(body));
    info.overloads = shapes;
    engine.register(info);
    counter
}

fn register_fixtures(engine: &Engine) {
    // `lines <count>`: emit numbered lines; wrappable for paging tests.
    engine.register(
        CommandInfo::new(
            "lines",
            ShellType::Shell,
            "Emit numbered lines",
            Arc::new(
                |req: &mut CommandRequest<'_>,
                 out: &mut dyn OutputSink|
                 -> Result<i32, BodyError> {
                    let count: usize = req.call.positional[0].parse()?;
                    for i in 0..count {
                        out.line(&format!("line {i}"))?;
                    }
                    Ok(0)
                },
            ),
        )
        .shape(ArgumentShape::new().part(ArgumentPart::required("count").numeric()))
        .wrappable(),
    );

    // `boom`: a body that always reports an error.
    engine.register(CommandInfo::new(
        "boom",
        ShellType::Shell,
        "Always fails",
        Arc::new(
            |_req: &mut CommandRequest<'_>,
             _out: &mut dyn OutputSink|
             -> Result<i32, BodyError> { Err("kaboom".into()) },
        ),
    ));

    // `argc`: print how many positional args arrived (pipe quoting tests).
    engine.register(CommandInfo::new(
        "argc",
        ShellType::Shell,
        "Print positional argument count",
        Arc::new(
            |req: &mut CommandRequest<'_>,
             out: &mut dyn OutputSink|
             -> Result<i32, BodyError> {
                out.line(&req.call.positional.len().to_string())?;
                Ok(0)
            },
        ),
    ));
}
