#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" | "vertical" => Some(Self::TopDown),
            "LR" | "horizontal" => Some(Self::LeftRight),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight)
    }
}

/// Where a transition sends control once a step finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Goto {
        step_id: String,
    },
    End,
    /// `step_id: None` retries the step that declared the transition.
    Retry {
        step_id: Option<String>,
        retry_after: Option<f32>,
        retry_limit: Option<u32>,
    },
    /// Anything that could not be resolved to a step of this workflow.
    Reference {
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: Option<String>,
    pub transition: Transition,
}

impl Action {
    pub fn new(transition: Transition) -> Self {
        Self {
            name: None,
            transition,
        }
    }

    pub fn goto(step_id: &str) -> Self {
        Self::new(Transition::Goto {
            step_id: step_id.to_string(),
        })
    }

    pub fn end() -> Self {
        Self::new(Transition::End)
    }

    pub fn retry(step_id: Option<&str>) -> Self {
        Self::new(Transition::Retry {
            step_id: step_id.map(str::to_string),
            retry_after: None,
            retry_limit: None,
        })
    }

    pub fn reference(target: &str) -> Self {
        Self::new(Transition::Reference {
            target: target.to_string(),
        })
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Step {
    pub step_id: String,
    pub description: Option<String>,
    pub operation: Option<String>,
    pub on_success: Vec<Action>,
    pub on_failure: Vec<Action>,
}

impl Step {
    pub fn new(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            ..Default::default()
        }
    }

    pub fn on_success(mut self, actions: Vec<Action>) -> Self {
        self.on_success = actions;
        self
    }

    pub fn on_failure(mut self, actions: Vec<Action>) -> Self {
        self.on_failure = actions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workflow {
    pub workflow_id: String,
    pub summary: Option<String>,
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(workflow_id: &str, steps: Vec<Step>) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            summary: None,
            steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowDocument {
    pub workflows: Vec<Workflow>,
}

impl WorkflowDocument {
    pub fn workflow(&self, workflow_id: Option<&str>) -> Option<&Workflow> {
        match workflow_id {
            Some(id) => self.workflows.iter().find(|wf| wf.workflow_id == id),
            None => self.workflows.first(),
        }
    }
}
