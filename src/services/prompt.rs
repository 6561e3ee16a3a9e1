//! Prompt rendering and completion parsing
//!
//! Fields are delimited with `[[ ## name ## ]]` headers, both in the prompt
//! (inputs and demos) and in the completion the engine is asked to produce.
//! The completion ends with a `[[ ## completed ## ]]` marker.

use crate::error::{Result, TutorError};
use crate::optimizer::program::PromptProgram;
use crate::signatures::{FieldMap, SignatureSpec, REASONING_FIELD};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

const COMPLETED_MARKER: &str = "completed";
const REASONING_DESC: &str = "Think step by step in order to produce the outputs.";

static FIELD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\[\[ ## (\w+) ## \]\]\s*$").expect("field header pattern is valid")
});

fn header(name: &str) -> String {
    format!("[[ ## {} ## ]]", name)
}

/// Render the full prompt for one chain-of-thought call
pub fn render_prompt(spec: &SignatureSpec, program: &PromptProgram, inputs: &FieldMap) -> String {
    let mut out = String::new();

    out.push_str(program.effective_instructions(spec));
    out.push_str("\n\nYour input fields are:\n");
    for (i, field) in spec.inputs.iter().enumerate() {
        let optional = if field.is_required() { "" } else { " (optional)" };
        let _ = writeln!(out, "{}. `{}`{}: {}", i + 1, field.name, optional, field.desc);
    }

    out.push_str("\nYour output fields are:\n");
    let _ = writeln!(out, "1. `{}`: {}", REASONING_FIELD, REASONING_DESC);
    for (i, field) in spec.outputs.iter().enumerate() {
        let _ = writeln!(out, "{}. `{}`: {}", i + 2, field.name, field.desc);
    }

    for (i, demo) in program.demos.iter().enumerate() {
        let _ = writeln!(out, "\n--- Example {} ---", i + 1);
        render_fields(&mut out, spec.inputs.iter().map(|f| f.name), &demo.inputs);
        let outputs = std::iter::once(REASONING_FIELD).chain(spec.output_names());
        render_fields(&mut out, outputs, &demo.outputs);
    }

    out.push_str("\n--- Your turn ---\n");
    render_fields(&mut out, spec.inputs.iter().map(|f| f.name), inputs);

    let order: Vec<String> = std::iter::once(REASONING_FIELD)
        .chain(spec.output_names())
        .map(|name| format!("`{}`", header(name)))
        .collect();
    let _ = write!(
        out,
        "\nRespond with the corresponding output fields, in this order: {}, \
         and then end with the marker `{}`.",
        order.join(", "),
        header(COMPLETED_MARKER)
    );

    out
}

fn render_fields<'a>(out: &mut String, names: impl Iterator<Item = &'a str>, values: &FieldMap) {
    for name in names {
        if let Some(value) = values.get(name) {
            let _ = writeln!(out, "{}\n{}\n", header(name), value);
        }
    }
}

/// Split a completion into the reasoning and output fields `spec` declares
///
/// Unknown headers are skipped; text after the completed marker is ignored.
/// Fails only when no field header appears at all.
pub fn parse_completion(spec: &SignatureSpec, completion: &str) -> Result<FieldMap> {
    let known = |name: &str| name == REASONING_FIELD || spec.output_names().any(|n| n == name);

    let mut fields = FieldMap::new();
    let mut current: Option<String> = None;
    let mut buffer = String::new();
    let mut saw_header = false;

    let mut flush = |current: &mut Option<String>, buffer: &mut String| {
        if let Some(name) = current.take() {
            if known(&name) {
                fields.insert(name, buffer.trim().to_string());
            }
        }
        buffer.clear();
    };

    for line in completion.lines() {
        if let Some(caps) = FIELD_HEADER.captures(line) {
            saw_header = true;
            flush(&mut current, &mut buffer);
            let name = caps[1].to_string();
            if name == COMPLETED_MARKER {
                break;
            }
            current = Some(name);
        } else if current.is_some() {
            buffer.push_str(line);
            buffer.push('\n');
        }
    }
    flush(&mut current, &mut buffer);

    if !saw_header {
        return Err(TutorError::LlmApi(format!(
            "{} completion contained no field headers",
            spec.name
        )));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::program::Demo;
    use crate::signatures::{MathsProblem, MATHS_SOLVER};

    #[test]
    fn test_render_includes_instructions_demos_and_inputs() {
        let demo = Demo {
            inputs: MathsProblem::new("1 + 1", "GCSE").into_fields(),
            outputs: FieldMap::from([("solution".to_string(), "First add: 2".to_string())]),
            augmented: false,
        };
        let program = PromptProgram {
            instructions: Some("Be concise.".to_string()),
            demos: vec![demo],
        };
        let inputs = MATHS_SOLVER
            .resolve_inputs(&MathsProblem::new("Solve x + 2 = 5", "GCSE").into_fields())
            .unwrap();

        let prompt = render_prompt(&MATHS_SOLVER, &program, &inputs);
        assert!(prompt.starts_with("Be concise."));
        assert!(prompt.contains("`topic` (optional)"));
        assert!(prompt.contains("--- Example 1 ---\n[[ ## problem ## ]]\n1 + 1"));
        assert!(prompt.contains("[[ ## solution ## ]]\nFirst add: 2"));
        assert!(prompt.contains("--- Your turn ---\n[[ ## problem ## ]]\nSolve x + 2 = 5"));
        assert!(prompt.ends_with("`[[ ## completed ## ]]`."));
    }

    #[test]
    fn test_parse_completion_extracts_known_fields() {
        let completion = "\
[[ ## reasoning ## ]]
Subtract 2 from both sides.

[[ ## solution ## ]]
Step 1: x + 2 - 2 = 5 - 2
Step 2: x = 3

[[ ## scratchpad ## ]]
ignored

[[ ## key_concepts ## ]]
inverse operations
[[ ## completed ## ]]
[[ ## follow_up ## ]]
after the marker";

        let fields = parse_completion(&MATHS_SOLVER, completion).unwrap();
        assert_eq!(fields["reasoning"], "Subtract 2 from both sides.");
        assert_eq!(fields["solution"], "Step 1: x + 2 - 2 = 5 - 2\nStep 2: x = 3");
        assert_eq!(fields["key_concepts"], "inverse operations");
        assert!(!fields.contains_key("scratchpad"));
        assert!(!fields.contains_key("follow_up"));
    }

    #[test]
    fn test_parse_completion_without_headers_fails() {
        let result = parse_completion(&MATHS_SOLVER, "x = 3");
        assert!(matches!(result, Err(TutorError::LlmApi(_))));
    }
}
