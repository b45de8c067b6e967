//! Engine-surface commands
//!
//! These are the commands the engine itself contributes: shell navigation
//! (`exit`, sub-shell entry), alias management, the wrap/pipe execution
//! modifiers, `help`, and `echo`. Everything else is expected to arrive
//! through the same explicit registration boundary from external modules.

use std::sync::Arc;

use crate::alias::AliasError;
use crate::catalog::{ArgumentPart, ArgumentShape, CommandInfo, ShellType, SwitchSpec};
use crate::engine::Engine;
use crate::executor::{self, codes, BodyError, CommandRequest, ExecMode, OutputSink};

fn exit_body(req: &mut CommandRequest<'_>, _out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    req.control.request_exit();
    Ok(codes::SUCCESS)
}

fn echo_body(req: &mut CommandRequest<'_>, out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    out.line(&req.call.positional.join(" "))?;
    Ok(codes::SUCCESS)
}

fn help_body(req: &mut CommandRequest<'_>, out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    match req.call.positional.first() {
        Some(name) => {
            let Some(info) = req.engine.lookup(name, req.scope) else {
                out.line(&format!("{name}: no such command in {} scope", req.scope))?;
                return Ok(codes::NOT_FOUND);
            };
            out.line(&format!("{}: {}", info.name, info.help))?;
            for shape in &info.overloads {
                out.line(&format!("usage: {}", shape.usage(&info.name)))?;
            }
            if info.flags.obsolete {
                out.line("note: this command is obsolete")?;
            }
            if info.flags.strict {
                out.line("note: this command requires maintainer rights")?;
            }
            if info.flags.no_maintenance {
                out.line("note: available during maintenance mode")?;
            }
            if info.flags.sets_variable {
                out.line("note: this command sets a shell variable")?;
            }
            Ok(codes::SUCCESS)
        }
        None => {
            for name in req.engine.command_names(req.scope) {
                if let Some(info) = req.engine.lookup(&name, req.scope) {
                    let summary = info.help.lines().next().unwrap_or("");
                    out.line(&format!("{name} - {summary}"))?;
                }
            }
            let aliases = req.engine.aliases_for(req.scope);
            if !aliases.is_empty() {
                out.line("aliases:")?;
                for entry in aliases {
                    out.line(&format!("  {} -> {}", entry.alias, entry.target))?;
                }
            }
            Ok(codes::SUCCESS)
        }
    }
}

fn alias_scope(req: &CommandRequest<'_>) -> Result<ShellType, BodyError> {
    match req.call.switch_value("type") {
        Some(raw) => raw
            .parse::<ShellType>()
            .map_err(|e| Box::new(AliasError::from(e)) as BodyError),
        None => Ok(req.scope),
    }
}

fn alias_body(req: &mut CommandRequest<'_>, out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    let scope = alias_scope(req)?;
    let args = &req.call.positional;
    match args.first().map(String::as_str) {
        Some("add") => {
            req.engine
                .add_alias(&args[1], &args[2], scope)
                .map_err(|e| Box::new(e) as BodyError)?;
            out.line(&format!("alias {} -> {} added in {scope} scope", args[1], args[2]))?;
        }
        Some("rem") => {
            req.engine
                .remove_alias(&args[1], scope)
                .map_err(|e| Box::new(e) as BodyError)?;
            out.line(&format!("alias {} removed from {scope} scope", args[1]))?;
        }
        _ => {
            for entry in req.engine.aliases_for(scope) {
                out.line(&format!("{} -> {}", entry.alias, entry.target))?;
            }
        }
    }
    Ok(codes::SUCCESS)
}

fn wrap_body(req: &mut CommandRequest<'_>, out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    let target = req
        .call
        .positional
        .first()
        .cloned()
        .unwrap_or_else(|| req.call.raw_args_text.clone());
    Ok(executor::dispatch(
        req.engine,
        req.scope,
        &target,
        ExecMode::Wrapped,
        req.control,
        out,
    ))
}

fn pipe_body(req: &mut CommandRequest<'_>, out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    let source = req.call.positional[0].clone();
    let target = req.call.positional[1].clone();
    let quoted = req.call.has_switch("quoted");
    Ok(executor::run_pipe(
        req.engine,
        req.scope,
        &source,
        &target,
        quoted,
        req.control,
        out,
    ))
}

fn transfer_body(req: &mut CommandRequest<'_>, _out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    req.control.enter(ShellType::Transfer);
    Ok(codes::SUCCESS)
}

fn editor_body(req: &mut CommandRequest<'_>, _out: &mut dyn OutputSink) -> Result<i32, BodyError> {
    req.control.enter(ShellType::Editor);
    Ok(codes::SUCCESS)
}

/// Register the engine's own commands into a fresh engine.
pub fn register_builtins(engine: &Engine) {
    for scope in ShellType::ALL {
        engine.register(
            CommandInfo::new("exit", scope, "Exit the current shell", Arc::new(exit_body))
                .shape(ArgumentShape::new()),
        );
        engine.register(
            CommandInfo::new("help", scope, "Show command help", Arc::new(help_body))
                .shape(ArgumentShape::new().part(ArgumentPart::optional("command")))
                .wrappable(),
        );
        engine.register(
            CommandInfo::new("echo", scope, "Print arguments", Arc::new(echo_body))
                .shape(ArgumentShape::new().part(ArgumentPart::optional("text")))
                .wrappable(),
        );
        engine.register(
            CommandInfo::new("wrap", scope, "Run a command with paged output", Arc::new(wrap_body))
                .shape(ArgumentShape::new().part(ArgumentPart::required("command"))),
        );
        engine.register(
            CommandInfo::new(
                "pipe",
                scope,
                "Feed one command's output to another",
                Arc::new(pipe_body),
            )
            .shape(
                ArgumentShape::new()
                    .part(ArgumentPart::required("source"))
                    .part(ArgumentPart::required("target"))
                    .switch(SwitchSpec::new("quoted")),
            ),
        );
    }

    let type_switch = || SwitchSpec::new("type").takes_value(true);
    engine.register(
        CommandInfo::new(
            "alias",
            ShellType::Shell,
            "Manage command aliases (add, rem, list)",
            Arc::new(alias_body),
        )
        .shape(
            ArgumentShape::new()
                .part(ArgumentPart::required("mode").wording(&["add"]))
                .part(ArgumentPart::required("alias"))
                .part(ArgumentPart::required("target"))
                .switch(type_switch()),
        )
        .shape(
            ArgumentShape::new()
                .part(ArgumentPart::required("mode").wording(&["rem"]))
                .part(ArgumentPart::required("alias"))
                .switch(type_switch()),
        )
        .shape(
            ArgumentShape::new()
                .part(ArgumentPart::required("mode").wording(&["list"]))
                .switch(type_switch()),
        ),
    );

    engine.register(CommandInfo::new(
        "transfer",
        ShellType::Shell,
        "Enter the file-transfer shell",
        Arc::new(transfer_body),
    ));
    engine.register(CommandInfo::new(
        "editor",
        ShellType::Shell,
        "Enter the structured-data editor shell",
        Arc::new(editor_body),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::run_buffered;
    use crate::shell::{ShellAction, ShellControl};

    fn engine() -> Engine {
        let engine = Engine::new();
        register_builtins(&engine);
        engine
    }

    fn run(engine: &Engine, scope: ShellType, line: &str) -> (i32, String, ShellControl) {
        let mut control = ShellControl::default();
        let mut out = String::new();
        let code = run_buffered(engine, scope, line, &mut control, &mut out);
        (code, out, control)
    }

    #[test]
    fn echo_prints_positional_args() {
        let engine = engine();
        let (code, out, _) = run(&engine, ShellType::Shell, "echo hello world");
        assert_eq!(code, codes::SUCCESS);
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn exit_requests_the_exit_action() {
        let engine = engine();
        let (code, _, mut control) = run(&engine, ShellType::Shell, "exit");
        assert_eq!(code, codes::SUCCESS);
        assert_eq!(control.take(), Some(ShellAction::Exit));
    }

    #[test]
    fn sub_shell_entry_requests_enter() {
        let engine = engine();
        let (_, _, mut control) = run(&engine, ShellType::Shell, "transfer");
        assert_eq!(control.take(), Some(ShellAction::Enter(ShellType::Transfer)));
    }

    #[test]
    fn alias_add_and_list() {
        let engine = engine();
        let (code, _, _) = run(&engine, ShellType::Shell, "alias add e echo");
        assert_eq!(code, codes::SUCCESS);

        let (_, out, _) = run(&engine, ShellType::Shell, "alias list");
        assert!(out.contains("e -> echo"));

        // The alias is now usable.
        let (code, out, _) = run(&engine, ShellType::Shell, "e hi");
        assert_eq!(code, codes::SUCCESS);
        assert_eq!(out, "hi\n");
    }

    #[test]
    fn alias_with_explicit_type_switch() {
        let engine = engine();
        let (code, _, _) = run(&engine, ShellType::Shell, "alias add e echo -type=transfer");
        assert_eq!(code, codes::SUCCESS);
        assert!(engine.alias_exists("e", ShellType::Transfer));
        assert!(!engine.alias_exists("e", ShellType::Shell));
    }

    #[test]
    fn alias_bad_type_is_a_command_failure() {
        let engine = engine();
        let (code, _, _) = run(&engine, ShellType::Shell, "alias add e echo -type=mail");
        assert_eq!(code, codes::COMMAND_FAILURE);
    }

    #[test]
    fn alias_self_alias_fails() {
        let engine = engine();
        let (code, _, _) = run(&engine, ShellType::Shell, "alias add echo echo");
        assert_eq!(code, codes::COMMAND_FAILURE);
    }

    #[test]
    fn alias_wrong_mode_is_a_usage_failure() {
        let engine = engine();
        let (code, _, _) = run(&engine, ShellType::Shell, "alias frobnicate");
        assert_eq!(code, codes::USAGE);
    }

    #[test]
    fn wrap_of_non_wrappable_command_is_rejected() {
        let engine = engine();
        // `exit` is not wrappable; nothing is invoked.
        let (code, _, mut control) = run(&engine, ShellType::Shell, "wrap exit");
        assert_eq!(code, codes::WRAP_REJECTED);
        assert_eq!(control.take(), None);
    }

    #[test]
    fn pipe_echo_into_echo() {
        let engine = engine();
        let (code, out, _) = run(&engine, ShellType::Shell, "pipe \"echo payload\" echo");
        assert_eq!(code, codes::SUCCESS);
        assert_eq!(out, "payload\n");
    }

    #[test]
    fn pipe_with_failing_source_reports_source() {
        let engine = engine();
        let (code, _, _) = run(&engine, ShellType::Shell, "pipe nonsense echo");
        assert_eq!(code, codes::PIPE_SOURCE);
    }

    #[test]
    fn help_lists_commands_for_the_scope() {
        let engine = engine();
        let (code, out, _) = run(&engine, ShellType::Transfer, "help");
        assert_eq!(code, codes::SUCCESS);
        assert!(out.contains("echo"));
        // Sub-shell entries are shell-scope only.
        assert!(!out.contains("transfer - "));
    }

    #[test]
    fn help_for_one_command_shows_usage_lines() {
        let engine = engine();
        let (_, out, _) = run(&engine, ShellType::Shell, "help pipe");
        assert!(out.contains("usage: pipe <source> <target> [-quoted]"));
    }
}
