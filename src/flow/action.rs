use serde::{Deserialize, Serialize};
use std::fmt;

/// Key code sent by the double-confirm `select` action.
pub const ENTER_KEY_CODE: u32 = 13;

/// One UI interaction carried by a step node.
///
/// The set is closed: the event synthesizer matches on it exhaustively, so a new
/// interaction kind has to be handled everywhere before the crate compiles again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Click { xpath: String },
    Input { xpath: String, value: String },
    KeyDown { xpath: String, key_code: u32 },
    Select { xpath: String },
    Paste,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Click { .. } => ActionKind::Click,
            Action::Input { .. } => ActionKind::Input,
            Action::KeyDown { .. } => ActionKind::KeyDown,
            Action::Select { .. } => ActionKind::Select,
            Action::Paste => ActionKind::Paste,
        }
    }

    /// The path expression the action targets. `Paste` targets the document itself.
    pub fn xpath(&self) -> Option<&str> {
        match self {
            Action::Click { xpath }
            | Action::Input { xpath, .. }
            | Action::KeyDown { xpath, .. }
            | Action::Select { xpath } => Some(xpath),
            Action::Paste => None,
        }
    }
}

/// Discriminant of [`Action`], used in traces and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Input,
    KeyDown,
    Select,
    Paste,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Click => "click",
            ActionKind::Input => "input",
            ActionKind::KeyDown => "keydown",
            ActionKind::Select => "select",
            ActionKind::Paste => "paste",
        };
        f.write_str(name)
    }
}

/// Result of performing a single action, with the integer codes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Success,
    NotFound,
    Failed,
}

impl ActionOutcome {
    pub fn code(self) -> i32 {
        match self {
            ActionOutcome::Success => 1,
            ActionOutcome::NotFound => -1,
            ActionOutcome::Failed => 0,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ActionOutcome::Success)
    }
}

/// Role of a node in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Step,
}

/// Where a run has to begin. Only the `start` node carries this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartConfig {
    pub new_tab: bool,
    pub url: Option<String>,
}
