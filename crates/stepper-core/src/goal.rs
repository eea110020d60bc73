//! Declarative goal definitions.
//!
//! A definition is a YAML mapping with a `steps` sequence and an optional
//! `preempt` mode:
//!
//! ```yaml
//! preempt: stop_at_next_step
//! steps:
//!   - step:
//!       - base_auto: { height: 0.45 }
//!       - footstep: { name: LF_LEG, target: [0.3, 0.2, 0.0] }
//!   - step:
//!       - base_auto: {}
//! ```
//!
//! A step entry is either `{step: [...]}` or a bare list of motions. A motion
//! is a map from motion kind to its parameters, or a bare kind name.
//!
//! Parsing is lenient about the *contents* of steps: a malformed step becomes
//! an empty step, which makes the goal structurally invalid (see
//! [`GoalSpec::is_valid`]) rather than unparsable. Only a document without a
//! usable `steps` sequence is rejected outright.

use crate::error::{Result, StepperError};
use goal_client::{GoalSpec, Motion, PreemptionMode, Step};
use serde_yaml::Value;
use std::path::Path;

/// Read and parse a declarative definition file.
pub fn load_goal(path: &Path) -> Result<GoalSpec> {
    let invalid = |reason: String| StepperError::DefinitionInvalid {
        path: path.to_path_buf(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let value: Value = serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    goal_from_value(&value).map_err(invalid)
}

/// Build a goal from an already parsed YAML (or JSON-converted) document.
pub fn goal_from_value(value: &Value) -> std::result::Result<GoalSpec, String> {
    let Value::Mapping(map) = value else {
        return Err("definition is not a mapping".to_string());
    };

    let steps = match map.get("steps") {
        Some(Value::Sequence(steps)) => steps,
        Some(_) => return Err("`steps` is not a sequence".to_string()),
        None => return Err("definition has no `steps`".to_string()),
    };

    let preempt = match map.get("preempt") {
        None | Some(Value::Null) => PreemptionMode::default(),
        Some(v) => serde_yaml::from_value(v.clone())
            .map_err(|e| format!("invalid `preempt`: {e}"))?,
    };

    let steps = steps
        .iter()
        .map(parse_step)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(GoalSpec { preempt, steps })
}

fn parse_step(entry: &Value) -> std::result::Result<Step, String> {
    let body = match entry {
        Value::Mapping(m) => m.get("step").unwrap_or(entry),
        other => other,
    };
    Ok(Step {
        motions: parse_motions(body)?,
    })
}

fn parse_motions(body: &Value) -> std::result::Result<Vec<Motion>, String> {
    let mut motions = Vec::new();
    match body {
        Value::Sequence(items) => {
            for item in items {
                motions.extend(parse_motions(item)?);
            }
        }
        Value::Mapping(map) => {
            for (kind, params) in map {
                let Some(kind) = kind.as_str() else {
                    // Non-string keys cannot name a motion; the step stays short.
                    continue;
                };
                motions.push(Motion {
                    kind: kind.to_string(),
                    params: to_json(params)?,
                });
            }
        }
        Value::String(kind) => motions.push(Motion {
            kind: kind.clone(),
            params: serde_json::Value::Null,
        }),
        _ => {}
    }
    Ok(motions)
}

fn to_json(value: &Value) -> std::result::Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("unsupported motion parameters: {e}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> std::result::Result<GoalSpec, String> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        goal_from_value(&value)
    }

    #[test]
    fn parses_step_blocks() {
        let goal = parse(
            r#"
preempt: stop_at_next_step
steps:
  - step:
      - base_auto: { height: 0.45 }
      - footstep: { name: LF_LEG, target: [0.3, 0.2, 0.0] }
  - step:
      - base_auto: {}
"#,
        )
        .unwrap();
        assert_eq!(goal.preempt, PreemptionMode::StopAtNextStep);
        assert_eq!(goal.steps.len(), 2);
        assert_eq!(goal.steps[0].motions[1].kind, "footstep");
        assert_eq!(goal.steps[0].motions[1].params["name"], "LF_LEG");
        assert!(goal.is_valid());
    }

    #[test]
    fn bare_lists_and_names_are_motions() {
        let goal = parse("steps:\n  - [base_auto, {footstep: {name: RH_LEG}}]\n").unwrap();
        assert_eq!(goal.steps[0].motions.len(), 2);
        assert_eq!(goal.steps[0].motions[0].kind, "base_auto");
        assert!(goal.steps[0].motions[0].params.is_null());
        assert_eq!(goal.preempt, PreemptionMode::PreemptImmediate);
    }

    #[test]
    fn missing_steps_is_rejected() {
        assert!(parse("preempt: no_preempt\n").is_err());
        assert!(parse("steps: nope\n").is_err());
        assert!(parse("- just\n- a list\n").is_err());
        assert!(parse("~\n").is_err());
    }

    #[test]
    fn bad_preempt_is_rejected() {
        let err = parse("preempt: sometimes\nsteps: []\n").unwrap_err();
        assert!(err.contains("preempt"));
    }

    #[test]
    fn empty_steps_parse_but_are_invalid() {
        let goal = parse("steps: []\n").unwrap();
        assert!(!goal.is_valid());

        let goal = parse("steps:\n  - step: 42\n").unwrap();
        assert_eq!(goal.steps.len(), 1);
        assert!(!goal.is_valid());
    }

    #[test]
    fn load_goal_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "steps: [unclosed\n").unwrap();
        match load_goal(&path) {
            Err(StepperError::DefinitionInvalid { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected DefinitionInvalid, got {other:?}"),
        }
    }

    #[test]
    fn load_goal_missing_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_goal(&dir.path().join("gone.yaml")),
            Err(StepperError::DefinitionInvalid { .. })
        ));
    }

    #[test]
    fn empty_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_goal(&path),
            Err(StepperError::DefinitionInvalid { .. })
        ));
    }
}
