use crate::ir::{Action, Step, Transition, Workflow, WorkflowDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

static COMPONENT_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$components\.(successActions|failureActions)\.([A-Za-z0-9_.\-]+)$").unwrap()
});

const DEFAULT_WORKFLOW_ID: &str = "workflow";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("workflow document is not valid JSON, JSON5 or YAML: {0}")]
    Syntax(String),

    #[error("workflow document defines no workflows")]
    NoWorkflows,

    #[error("workflow `{0}` not found in document")]
    UnknownWorkflow(String),

    #[error("step {index} of workflow `{workflow}` has no stepId")]
    MissingStepId { workflow: String, index: usize },
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    workflows: Vec<RawWorkflow>,
    #[serde(default)]
    components: RawComponents,
    workflow_id: Option<String>,
    summary: Option<String>,
    steps: Option<Vec<RawStep>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawWorkflow {
    workflow_id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawComponents {
    #[serde(default)]
    success_actions: BTreeMap<String, RawAction>,
    #[serde(default)]
    failure_actions: BTreeMap<String, RawAction>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    step_id: Option<String>,
    description: Option<String>,
    operation_id: Option<String>,
    operation_path: Option<String>,
    workflow_id: Option<String>,
    #[serde(default)]
    on_success: Vec<RawAction>,
    #[serde(default)]
    on_failure: Vec<RawAction>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    step_id: Option<String>,
    workflow_id: Option<String>,
    reference: Option<String>,
    retry_after: Option<f32>,
    retry_limit: Option<u32>,
}

pub fn parse_workflow_document(input: &str) -> Result<WorkflowDocument, ParseError> {
    let raw = parse_raw_document(input)?;
    let components = &raw.components;

    let mut workflows = Vec::new();
    for raw_wf in &raw.workflows {
        let workflow_id = raw_wf
            .workflow_id
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKFLOW_ID.to_string());
        workflows.push(convert_workflow(
            workflow_id,
            raw_wf.summary.clone(),
            &raw_wf.steps,
            components,
        )?);
    }

    if workflows.is_empty()
        && let Some(steps) = raw.steps.as_ref()
    {
        let workflow_id = raw
            .workflow_id
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKFLOW_ID.to_string());
        workflows.push(convert_workflow(
            workflow_id,
            raw.summary.clone(),
            steps,
            components,
        )?);
    }

    if workflows.is_empty() {
        return Err(ParseError::NoWorkflows);
    }
    tracing::debug!(workflows = workflows.len(), "parsed workflow document");
    Ok(WorkflowDocument { workflows })
}

/// Parses a document and picks one workflow, the first when `workflow_id` is `None`.
pub fn parse_workflow(input: &str, workflow_id: Option<&str>) -> Result<Workflow, ParseError> {
    let document = parse_workflow_document(input)?;
    document
        .workflow(workflow_id)
        .cloned()
        .ok_or_else(|| ParseError::UnknownWorkflow(workflow_id.unwrap_or_default().to_string()))
}

fn parse_raw_document(input: &str) -> Result<RawDocument, ParseError> {
    let json_err = match serde_json::from_str::<RawDocument>(input) {
        Ok(doc) => return Ok(doc),
        Err(err) => err,
    };
    if let Ok(doc) = json5::from_str::<RawDocument>(input) {
        return Ok(doc);
    }
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Err(ParseError::Syntax(json_err.to_string()));
    }
    serde_yaml::from_str::<RawDocument>(input).map_err(|err| ParseError::Syntax(err.to_string()))
}

fn convert_workflow(
    workflow_id: String,
    summary: Option<String>,
    raw_steps: &[RawStep],
    components: &RawComponents,
) -> Result<Workflow, ParseError> {
    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw) in raw_steps.iter().enumerate() {
        let Some(step_id) = raw.step_id.clone() else {
            return Err(ParseError::MissingStepId {
                workflow: workflow_id,
                index,
            });
        };
        let operation = raw
            .operation_id
            .clone()
            .or_else(|| raw.operation_path.clone())
            .or_else(|| raw.workflow_id.as_ref().map(|id| format!("workflow:{id}")));
        steps.push(Step {
            step_id,
            description: raw.description.clone(),
            operation,
            on_success: raw
                .on_success
                .iter()
                .map(|action| convert_action(action, components))
                .collect(),
            on_failure: raw
                .on_failure
                .iter()
                .map(|action| convert_action(action, components))
                .collect(),
        });
    }
    Ok(Workflow {
        workflow_id,
        summary,
        steps,
    })
}

fn convert_action(raw: &RawAction, components: &RawComponents) -> Action {
    if let Some(reference) = raw.reference.as_deref() {
        return match resolve_component(reference, components) {
            Some(resolved) => {
                let mut action = convert_plain_action(resolved);
                if raw.name.is_some() {
                    action.name = raw.name.clone();
                }
                action
            }
            None => {
                tracing::warn!(reference, "unresolved action reference");
                Action {
                    name: raw.name.clone(),
                    transition: Transition::Reference {
                        target: reference.to_string(),
                    },
                }
            }
        };
    }
    convert_plain_action(raw)
}

fn resolve_component<'a>(reference: &str, components: &'a RawComponents) -> Option<&'a RawAction> {
    let caps = COMPONENT_REF_RE.captures(reference)?;
    let table = match caps.get(1)?.as_str() {
        "successActions" => &components.success_actions,
        _ => &components.failure_actions,
    };
    let resolved = table.get(caps.get(2)?.as_str())?;
    // Component actions are resolved one level deep only.
    if resolved.reference.is_some() {
        return None;
    }
    Some(resolved)
}

fn convert_plain_action(raw: &RawAction) -> Action {
    let transition = match raw.kind.as_deref() {
        Some("end") => Transition::End,
        Some("goto") => match (&raw.step_id, &raw.workflow_id) {
            (Some(step_id), _) => Transition::Goto {
                step_id: step_id.clone(),
            },
            (None, Some(workflow_id)) => Transition::Reference {
                target: workflow_id.clone(),
            },
            (None, None) => Transition::Goto {
                step_id: String::new(),
            },
        },
        Some("retry") => match &raw.workflow_id {
            Some(workflow_id) if raw.step_id.is_none() => Transition::Reference {
                target: workflow_id.clone(),
            },
            _ => Transition::Retry {
                step_id: raw.step_id.clone(),
                retry_after: raw.retry_after,
                retry_limit: raw.retry_limit,
            },
        },
        other => Transition::Reference {
            target: other.unwrap_or("unknown").to_string(),
        },
    };
    Action {
        name: raw.name.clone(),
        transition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_document() {
        let input = r#"{
            "arazzo": "1.0.0",
            "workflows": [{
                "workflowId": "checkout",
                "steps": [
                    { "stepId": "cart", "operationId": "getCart",
                      "onSuccess": [ { "name": "ok", "type": "goto", "stepId": "pay" } ],
                      "onFailure": [ { "name": "again", "type": "retry", "retryAfter": 1.5, "retryLimit": 3 } ] },
                    { "stepId": "pay" }
                ]
            }]
        }"#;
        let doc = parse_workflow_document(input).unwrap();
        let wf = doc.workflow(Some("checkout")).unwrap();
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0].operation.as_deref(), Some("getCart"));
        assert_eq!(wf.steps[0].on_success[0], Action::goto("pay").named("ok"));
        assert_eq!(
            wf.steps[0].on_failure[0].transition,
            Transition::Retry {
                step_id: None,
                retry_after: Some(1.5),
                retry_limit: Some(3),
            }
        );
        assert!(wf.steps[1].on_success.is_empty());
    }

    #[test]
    fn parses_yaml_and_resolves_components() {
        let input = r#"
arazzo: 1.0.0
workflows:
  - workflowId: login
    steps:
      - stepId: auth
        onFailure:
          - reference: $components.failureActions.giveUp
          - reference: $components.failureActions.nowhere
      - stepId: profile
components:
  failureActions:
    giveUp:
      name: give-up
      type: end
"#;
        let wf = parse_workflow(input, None).unwrap();
        assert_eq!(wf.workflow_id, "login");
        let failure = &wf.steps[0].on_failure;
        assert_eq!(failure[0], Action::end().named("give-up"));
        assert_eq!(
            failure[1].transition,
            Transition::Reference {
                target: "$components.failureActions.nowhere".to_string()
            }
        );
    }

    #[test]
    fn accepts_bare_workflow_in_json5() {
        let input = "{ steps: [ { stepId: 'a' }, { stepId: 'b', onSuccess: [ { type: 'end' } ] } ], }";
        let wf = parse_workflow(input, None).unwrap();
        assert_eq!(wf.workflow_id, DEFAULT_WORKFLOW_ID);
        assert_eq!(wf.steps.len(), 2);
    }

    #[test]
    fn cross_workflow_goto_becomes_reference() {
        let input = r#"{ "steps": [ { "stepId": "a", "onSuccess": [ { "type": "goto", "workflowId": "other" } ] } ] }"#;
        let wf = parse_workflow(input, None).unwrap();
        assert_eq!(wf.steps[0].on_success[0], Action::reference("other"));
    }

    #[test]
    fn reports_missing_step_id_and_unknown_workflow() {
        let err = parse_workflow(r#"{ "steps": [ { "description": "x" } ] }"#, None).unwrap_err();
        assert!(matches!(err, ParseError::MissingStepId { index: 0, .. }));
        let err = parse_workflow(r#"{ "steps": [] }"#, Some("nope")).unwrap_err();
        assert!(matches!(err, ParseError::UnknownWorkflow(ref id) if id == "nope"));
        assert!(matches!(
            parse_workflow_document("{ \"unrelated\": true }"),
            Err(ParseError::NoWorkflows)
        ));
        assert!(matches!(
            parse_workflow_document("{ not json"),
            Err(ParseError::Syntax(_))
        ));
    }
}
