//! Command catalog: per-shell-type registry of command contracts
//!
//! A `CommandInfo` declares everything the engine needs to know about a
//! command before running it: which shell it belongs to, the argument
//! shapes it accepts, its behavioral flags, and the opaque body to invoke.
//! Entries are keyed by (name, shell type); re-registering a name replaces
//! the previous entry wholesale.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::executor::{BodyError, CommandRequest, OutputSink};

/// Closed set of shell scopes. Strings are parsed only at the CLI boundary;
/// everywhere else the engine dispatches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellType {
    /// The root ("mother") shell.
    Shell,
    /// File-transfer sub-shell.
    Transfer,
    /// Structured-data editor sub-shell.
    Editor,
}

impl ShellType {
    pub const ALL: [ShellType; 3] = [ShellType::Shell, ShellType::Transfer, ShellType::Editor];

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Shell => "shell",
            ShellType::Transfer => "transfer",
            ShellType::Editor => "editor",
        }
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no such shell type: {0}")]
pub struct UnknownShellType(pub String);

impl FromStr for ShellType {
    type Err = UnknownShellType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shell" => Ok(ShellType::Shell),
            "transfer" => Ok(ShellType::Transfer),
            "editor" => Ok(ShellType::Editor),
            other => Err(UnknownShellType(other.to_string())),
        }
    }
}

/// One positional slot of an argument shape. Order matters; only the tail
/// of a shape's part list may be optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentPart {
    pub required: bool,
    pub name: String,
    /// The value must parse as a number.
    pub numeric_only: bool,
    /// The value must be one of these exact words.
    pub exact_wording: Option<Vec<String>>,
}

impl ArgumentPart {
    pub fn required(name: &str) -> Self {
        ArgumentPart {
            required: true,
            name: name.to_string(),
            numeric_only: false,
            exact_wording: None,
        }
    }

    pub fn optional(name: &str) -> Self {
        ArgumentPart {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn numeric(mut self) -> Self {
        self.numeric_only = true;
        self
    }

    pub fn wording(mut self, words: &[&str]) -> Self {
        self.exact_wording = Some(words.iter().map(|w| w.to_string()).collect());
        self
    }
}

/// Declaration of one switch a shape accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwitchSpec {
    pub name: String,
    pub accepts_value: bool,
    pub value_required_if_present: bool,
    pub is_required: bool,
    pub conflicts_with: Vec<String>,
    /// Presence of this switch reduces the shape's minimum positional
    /// argument count by this much (floored at zero).
    pub optionalizes_last_required: usize,
}

impl SwitchSpec {
    pub fn new(name: &str) -> Self {
        SwitchSpec {
            name: name.to_string(),
            ..SwitchSpec::default()
        }
    }

    /// The switch takes a `-name=value` form; `required` demands a
    /// non-blank value whenever the switch is present.
    pub fn takes_value(mut self, required: bool) -> Self {
        self.accepts_value = true;
        self.value_required_if_present = required;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn conflicts(mut self, names: &[&str]) -> Self {
        self.conflicts_with = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn optionalizes(mut self, count: usize) -> Self {
        self.optionalizes_last_required = count;
        self
    }
}

/// One accepted overload of a command's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentShape {
    pub parts: Vec<ArgumentPart>,
    pub switches: Vec<SwitchSpec>,
}

impl ArgumentShape {
    pub fn new() -> Self {
        ArgumentShape::default()
    }

    pub fn part(mut self, part: ArgumentPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn switch(mut self, spec: SwitchSpec) -> Self {
        self.switches.push(spec);
        self
    }

    /// Number of required positional parts, before any optionalize offset.
    pub fn min_required(&self) -> usize {
        self.parts.iter().filter(|p| p.required).count()
    }

    pub fn find_switch(&self, name: &str) -> Option<&SwitchSpec> {
        self.switches.iter().find(|s| s.name == name)
    }

    /// Render a usage line like `cmd <mode> [target] [-quoted]`.
    pub fn usage(&self, command: &str) -> String {
        let mut out = command.to_string();
        for part in &self.parts {
            if part.required {
                out.push_str(&format!(" <{}>", part.name));
            } else {
                out.push_str(&format!(" [{}]", part.name));
            }
        }
        for sw in &self.switches {
            let body = if sw.accepts_value {
                format!("-{}=value", sw.name)
            } else {
                format!("-{}", sw.name)
            };
            if sw.is_required {
                out.push_str(&format!(" {}", body));
            } else {
                out.push_str(&format!(" [{}]", body));
            }
        }
        out
    }
}

/// Behavioral flags surfaced to callers. Only `wrappable` changes engine
/// behavior (it gates Wrap mode); the rest feed help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFlags {
    pub obsolete: bool,
    pub wrappable: bool,
    pub strict: bool,
    pub no_maintenance: bool,
    pub sets_variable: bool,
}

/// An executable command body. Bodies are opaque to the engine: they get
/// the validated call plus an output sink, and report failure through
/// `Err` rather than by unwinding.
pub trait CommandBody: Send + Sync {
    fn invoke(&self, req: &mut CommandRequest<'_>, out: &mut dyn OutputSink)
        -> Result<i32, BodyError>;
}

impl<F> CommandBody for F
where
    F: Fn(&mut CommandRequest<'_>, &mut dyn OutputSink) -> Result<i32, BodyError> + Send + Sync,
{
    fn invoke(
        &self,
        req: &mut CommandRequest<'_>,
        out: &mut dyn OutputSink,
    ) -> Result<i32, BodyError> {
        self(req, out)
    }
}

/// Full contract of a registered command.
#[derive(Clone)]
pub struct CommandInfo {
    pub name: String,
    pub scope: ShellType,
    pub help: String,
    /// Accepted argument shapes, tried first-fit in declaration order.
    pub overloads: Vec<ArgumentShape>,
    pub body: Arc<dyn CommandBody>,
    pub flags: CommandFlags,
}

impl fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInfo")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("overloads", &self.overloads.len())
            .field("flags", &self.flags)
            .finish()
    }
}

impl CommandInfo {
    pub fn new(name: &str, scope: ShellType, help: &str, body: Arc<dyn CommandBody>) -> Self {
        CommandInfo {
            name: name.to_string(),
            scope,
            help: help.to_string(),
            overloads: Vec::new(),
            body,
            flags: CommandFlags::default(),
        }
    }

    pub fn shape(mut self, shape: ArgumentShape) -> Self {
        self.overloads.push(shape);
        self
    }

    pub fn flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn wrappable(mut self) -> Self {
        self.flags.wrappable = true;
        self
    }
}

/// The registry itself. Plugins register concrete `CommandInfo` values at
/// startup; there is no runtime discovery.
#[derive(Default)]
pub struct Catalog {
    entries: HashMap<(ShellType, String), CommandInfo>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Register a command, replacing any previous entry for the same
    /// (name, scope) pair.
    pub fn register(&mut self, info: CommandInfo) {
        log::debug!("registering command '{}' in {} scope", info.name, info.scope);
        self.entries.insert((info.scope, info.name.clone()), info);
    }

    /// Remove a registration. Returns false if nothing was registered.
    pub fn unregister(&mut self, name: &str, scope: ShellType) -> bool {
        self.entries.remove(&(scope, name.to_string())).is_some()
    }

    pub fn lookup(&self, name: &str, scope: ShellType) -> Option<&CommandInfo> {
        self.entries.get(&(scope, name.to_string()))
    }

    pub fn contains(&self, name: &str, scope: ShellType) -> bool {
        self.entries.contains_key(&(scope, name.to_string()))
    }

    /// Command names registered for a scope, sorted.
    pub fn names(&self, scope: ShellType) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .keys()
            .filter(|(s, _)| *s == scope)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
