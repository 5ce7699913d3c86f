use crate::flow::{ActionKind, ActionOutcome, TabId, TaskId};

/// How a run left the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reached `end` and pasted, or ran out of graph under the implicit-end policy.
    Completed,
    /// The run was parked in the background and continues in `tab_id` once it loads.
    Handoff { tab_id: TabId },
    ElementNotFound { node_id: String },
    SynthesisFailed { node_id: String },
}

impl RunOutcome {
    /// The integer status reported to callers: `1`, `0` or `-1`.
    /// A handoff is not a termination and has none.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            RunOutcome::Completed => Some(1),
            RunOutcome::Handoff { .. } => None,
            RunOutcome::ElementNotFound { .. } => Some(ActionOutcome::NotFound.code()),
            RunOutcome::SynthesisFailed { .. } => Some(ActionOutcome::Failed.code()),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            RunOutcome::ElementNotFound { .. } | RunOutcome::SynthesisFailed { .. }
        )
    }
}

/// One action the interpreter performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub node_id: String,
    pub kind: ActionKind,
    pub outcome: ActionOutcome,
}

/// Everything a single interpreter invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub task_id: TaskId,
    pub outcome: RunOutcome,
    pub steps: Vec<StepRecord>,
    /// `false` when the run completed without reaching `end`.
    pub reached_end: bool,
}

impl RunReport {
    pub fn status_code(&self) -> Option<i32> {
        self.outcome.status_code()
    }

    /// Ids of the executed nodes, in order.
    pub fn visited(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node_id.as_str()).collect()
    }

    pub fn pasted(&self) -> bool {
        self.reached_end
            && self
                .steps
                .last()
                .is_some_and(|s| s.kind == ActionKind::Paste)
    }
}
