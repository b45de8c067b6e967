//! Arguments validation against a command's declared shapes
//!
//! A command declares one or more `ArgumentShape` overloads; validation
//! tries them in declaration order and the first shape that fully
//! validates wins. There is no cross-shape backtracking for a "best"
//! match, so registrants put the most specific shape first. Validation
//! never fails as a function: every outcome is communicated through the
//! boolean and list fields of the returned `ParsedCall`.

use crate::catalog::{ArgumentShape, CommandInfo};
use crate::switches::{switch_name, switch_value, Extraction};

/// Immutable result of validating one command line against a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub command_name: String,
    pub raw_args_text: String,
    pub positional: Vec<String>,
    pub switches: Vec<String>,
    pub required_args_ok: bool,
    pub required_switches_ok: bool,
    pub required_switch_values_ok: bool,
    /// Positional constraint checks (numeric-only, exact wording).
    pub part_constraints_ok: bool,
    pub unknown_switches: Vec<String>,
    /// Recorded as `"-current vs. -previous"` pairs.
    pub conflicting_switches: Vec<String>,
}

impl ParsedCall {
    /// True when the call may be dispatched to the command body.
    pub fn ok(&self) -> bool {
        self.required_args_ok
            && self.required_switches_ok
            && self.required_switch_values_ok
            && self.part_constraints_ok
            && self.unknown_switches.is_empty()
            && self.conflicting_switches.is_empty()
    }

    fn passing(command_name: &str, raw_args: &str, ex: &Extraction) -> Self {
        ParsedCall {
            command_name: command_name.to_string(),
            raw_args_text: raw_args.to_string(),
            positional: ex.positional.clone(),
            switches: ex.switches.clone(),
            required_args_ok: true,
            required_switches_ok: true,
            required_switch_values_ok: true,
            part_constraints_ok: true,
            unknown_switches: Vec::new(),
            conflicting_switches: Vec::new(),
        }
    }

    /// Switch value lookup on the call itself, by declared name.
    pub fn switch(&self, name: &str) -> Option<&str> {
        self.switches.iter().find(|t| switch_name(t) == name).map(|s| s.as_str())
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switch(name).is_some()
    }

    pub fn switch_value(&self, name: &str) -> Option<String> {
        self.switch(name).and_then(switch_value)
    }
}

/// Validate extracted tokens against a command's contract.
///
/// A command with no declared overloads accepts anything.
pub fn validate(info: &CommandInfo, raw_args: &str, ex: &Extraction) -> ParsedCall {
    if info.overloads.is_empty() {
        return ParsedCall::passing(&info.name, raw_args, ex);
    }

    let mut last = None;
    for shape in &info.overloads {
        let call = check_shape(&info.name, shape, raw_args, ex);
        if call.ok() {
            return call;
        }
        last = Some(call);
    }
    // No shape fully validated: report against the last evaluated shape so
    // the caller sees the most relevant failure reasons.
    match last {
        Some(call) => call,
        None => ParsedCall::passing(&info.name, raw_args, ex),
    }
}

fn check_shape(command: &str, shape: &ArgumentShape, raw_args: &str, ex: &Extraction) -> ParsedCall {
    // Minimum positional count, reduced by the largest optionalize offset
    // among present switches declared in this shape.
    let offset = ex
        .switches
        .iter()
        .filter_map(|t| shape.find_switch(switch_name(t)))
        .map(|spec| spec.optionalizes_last_required)
        .max()
        .unwrap_or(0);
    let min_required = shape.min_required().saturating_sub(offset);

    let required_args_ok = ex.positional.len() >= min_required;

    let required_switches_ok = shape
        .switches
        .iter()
        .filter(|spec| spec.is_required)
        .all(|spec| ex.switches.iter().any(|t| switch_name(t) == spec.name));

    let required_switch_values_ok = ex.switches.iter().all(|t| {
        match shape.find_switch(switch_name(t)) {
            Some(spec) if spec.value_required_if_present => switch_value(t)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false),
            _ => true,
        }
    });

    let unknown_switches: Vec<String> = ex
        .switches
        .iter()
        .map(|t| switch_name(t))
        .filter(|name| shape.find_switch(name).is_none())
        .map(|name| format!("-{name}"))
        .collect();

    // Adjacency-only conflict walk: each known switch is compared solely
    // against the immediately preceding known switch on the line.
    let mut conflicting_switches = Vec::new();
    let mut previous: Option<&str> = None;
    for token in &ex.switches {
        let name = switch_name(token);
        let Some(spec) = shape.find_switch(name) else {
            continue; // unknown switches are skipped entirely
        };
        if let Some(prev) = previous {
            if spec.conflicts_with.iter().any(|c| c == prev) {
                conflicting_switches.push(format!("-{name} vs. -{prev}"));
            }
        }
        previous = Some(name);
    }

    let part_constraints_ok = shape.parts.iter().enumerate().all(|(i, part)| {
        match ex.positional.get(i) {
            Some(value) => {
                if part.numeric_only && value.parse::<f64>().is_err() {
                    return false;
                }
                if let Some(words) = &part.exact_wording {
                    return words.iter().any(|w| w == value);
                }
                true
            }
            None => true, // absence is judged by the required-count check
        }
    });

    ParsedCall {
        command_name: command.to_string(),
        raw_args_text: raw_args.to_string(),
        positional: ex.positional.clone(),
        switches: ex.switches.clone(),
        required_args_ok,
        required_switches_ok,
        required_switch_values_ok,
        part_constraints_ok,
        unknown_switches,
        conflicting_switches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArgumentPart, CommandInfo, ShellType, SwitchSpec};
    use crate::executor::{BodyError, CommandRequest, OutputSink};
    use crate::switches::extract;
    use std::sync::Arc;

    fn cmd(shapes: Vec<ArgumentShape>) -> CommandInfo {
        let body = Arc::new(
            |_req: &mut CommandRequest<'_>, _out: &mut dyn OutputSink| -> Result<i32, BodyError> {
                Ok(0)
            },
        );
        let mut info = CommandInfo::new("probe", ShellType::Shell, "probe", body);
        info.overloads = shapes;
        info
    }

    fn run(shapes: Vec<ArgumentShape>, line: &str) -> ParsedCall {
        validate(&cmd(shapes), line, &extract(line))
    }

    #[test]
    fn no_overloads_accepts_anything() {
        let call = run(vec![], "-weird stuff -x=1");
        assert!(call.ok());
        assert_eq!(call.raw_args_text, "-weird stuff -x=1");
    }

    #[test]
    fn shape_with_no_required_args_always_passes_count() {
        let shape = ArgumentShape::new().part(ArgumentPart::optional("target"));
        let call = run(vec![shape], "");
        assert!(call.required_args_ok);
        assert!(call.ok());
    }

    #[test]
    fn missing_required_arg_fails() {
        let shape = ArgumentShape::new().part(ArgumentPart::required("target"));
        let call = run(vec![shape], "");
        assert!(!call.required_args_ok);
        assert!(!call.ok());
    }

    #[test]
    fn switch_plus_message_scenario() {
        // "-s Hello!" against one required part and a bare `s` switch.
        let shape = ArgumentShape::new()
            .part(ArgumentPart::required("message"))
            .switch(SwitchSpec::new("s"));
        let call = run(vec![shape], "-s Hello!");
        assert_eq!(call.positional, vec!["Hello!"]);
        assert_eq!(call.switches, vec!["-s"]);
        assert!(call.required_args_ok);
        assert!(call.ok());
    }

    #[test]
    fn optionalize_reduces_minimum() {
        let shape = ArgumentShape::new()
            .part(ArgumentPart::required("a"))
            .part(ArgumentPart::required("b"))
            .switch(SwitchSpec::new("all").optionalizes(2));

        // Without the switch, two args are required.
        assert!(!run(vec![shape.clone()], "one").required_args_ok);
        // With it, zero are.
        let call = run(vec![shape], "-all");
        assert!(call.required_args_ok);
        assert!(call.ok());
    }

    #[test]
    fn optionalize_takes_maximum_and_floors_at_zero() {
        let shape = ArgumentShape::new()
            .part(ArgumentPart::required("a"))
            .switch(SwitchSpec::new("one").optionalizes(1))
            .switch(SwitchSpec::new("many").optionalizes(5));
        let call = run(vec![shape], "-one -many");
        assert!(call.required_args_ok);
    }

    #[test]
    fn missing_required_switch_fails() {
        let shape = ArgumentShape::new().switch(SwitchSpec::new("force").required());
        let call = run(vec![shape.clone()], "");
        assert!(!call.required_switches_ok);
        assert!(run(vec![shape], "-force").ok());
    }

    #[test]
    fn required_switch_value_must_be_non_blank() {
        let shape = ArgumentShape::new().switch(SwitchSpec::new("to").takes_value(true));

        assert!(!run(vec![shape.clone()], "-to").required_switch_values_ok);
        assert!(!run(vec![shape.clone()], "-to=").required_switch_values_ok);
        assert!(!run(vec![shape.clone()], "-to=\"  \"").required_switch_values_ok);
        assert!(run(vec![shape], "-to=/tmp").ok());
    }

    #[test]
    fn unknown_switch_is_flagged() {
        let shape = ArgumentShape::new().switch(SwitchSpec::new("s"));
        let call = run(vec![shape], "-s -bogus");
        assert_eq!(call.unknown_switches, vec!["-bogus"]);
        assert!(!call.ok());
    }

    #[test]
    fn conflict_with_immediate_predecessor() {
        let shape = ArgumentShape::new()
            .switch(SwitchSpec::new("a"))
            .switch(SwitchSpec::new("b").conflicts(&["a"]))
            .switch(SwitchSpec::new("c"));
        let call = run(vec![shape], "-a -b");
        assert_eq!(call.conflicting_switches, vec!["-b vs. -a"]);
        assert!(!call.ok());
    }

    #[test]
    fn conflict_check_is_adjacency_only() {
        // -a -c -b: b only sees its immediate predecessor c, so no
        // conflict is recorded even though b conflicts with a.
        let shape = ArgumentShape::new()
            .switch(SwitchSpec::new("a"))
            .switch(SwitchSpec::new("b").conflicts(&["a"]))
            .switch(SwitchSpec::new("c"));
        let call = run(vec![shape], "-a -c -b");
        assert!(call.conflicting_switches.is_empty());
        assert!(call.ok());
    }

    #[test]
    fn unknown_switches_are_skipped_in_conflict_walk() {
        let shape = ArgumentShape::new()
            .switch(SwitchSpec::new("a"))
            .switch(SwitchSpec::new("b").conflicts(&["a"]));
        // The unknown -x between them does not shield -b from -a.
        let call = run(vec![shape], "-a -x -b");
        assert_eq!(call.conflicting_switches, vec!["-b vs. -a"]);
    }

    #[test]
    fn first_fit_prefers_declaration_order() {
        let specific = ArgumentShape::new()
            .part(ArgumentPart::required("mode").wording(&["add"]))
            .part(ArgumentPart::required("name"));
        let general = ArgumentShape::new().part(ArgumentPart::required("anything"));

        let call = run(vec![specific, general], "add thing");
        assert!(call.ok());
        // The specific shape matched first, so no fallthrough happened;
        // the general shape would also have matched but is never reached.
        assert_eq!(call.positional, vec!["add", "thing"]);
    }

    #[test]
    fn failure_reports_last_evaluated_shape() {
        let first = ArgumentShape::new().switch(SwitchSpec::new("x").required());
        let second = ArgumentShape::new()
            .part(ArgumentPart::required("a"))
            .part(ArgumentPart::required("b"));

        let call = run(vec![first, second], "only-one");
        // Reported against the second (last) shape: required args missing,
        // but no required-switch complaint from the first shape.
        assert!(!call.required_args_ok);
        assert!(call.required_switches_ok);
        assert_eq!(call.command_name, "probe");
        assert_eq!(call.raw_args_text, "only-one");
    }

    #[test]
    fn numeric_only_part() {
        let shape = ArgumentShape::new().part(ArgumentPart::required("line").numeric());
        assert!(run(vec![shape.clone()], "42").ok());
        assert!(!run(vec![shape], "forty-two").part_constraints_ok);
    }

    #[test]
    fn exact_wording_part() {
        let shape = ArgumentShape::new()
            .part(ArgumentPart::required("mode").wording(&["add", "rem"]));
        assert!(run(vec![shape.clone()], "add").ok());
        assert!(!run(vec![shape], "delete").part_constraints_ok);
    }

    #[test]
    fn switch_accessors() {
        let shape = ArgumentShape::new()
            .switch(SwitchSpec::new("quoted"))
            .switch(SwitchSpec::new("to").takes_value(true));
        let call = run(vec![shape], "-quoted -to=/tmp");
        assert!(call.has_switch("quoted"));
        assert!(!call.has_switch("missing"));
        assert_eq!(call.switch_value("to"), Some("/tmp".to_string()));
    }
}
