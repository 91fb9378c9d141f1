use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress values this close to 1 are treated as finished. Summing the step
/// fifty times in floating point lands a hair off 1.0.
const PROGRESS_SNAP: f64 = 1e-9;

pub const DEFAULT_MOVE_STEPS: f64 = 50.0;
pub const DEFAULT_TURN_DEGREES: f64 = 90.0;
pub const DEFAULT_GOTO_TARGET: (f64, f64) = (300.0, 300.0);
pub const DEFAULT_SAY_MESSAGE: &str = "Hello!";
pub const DEFAULT_THINK_MESSAGE: &str = "Hmm...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskKind {
    Move {
        steps: f64,
    },
    Turn {
        degrees: f64,
    },
    Goto {
        x: f64,
        y: f64,
    },
    Say {
        message: String,
    },
    Think {
        message: String,
    },
    /// Any tag this build does not know. Executing it leaves the sprite alone.
    #[serde(other)]
    Unknown,
}

impl TaskKind {
    /// Builds a kind from its tool name with the toolbar's default parameters.
    pub fn with_defaults(name: &str) -> Option<Self> {
        let kind = match name {
            "move" => TaskKind::Move {
                steps: DEFAULT_MOVE_STEPS,
            },
            "turn" => TaskKind::Turn {
                degrees: DEFAULT_TURN_DEGREES,
            },
            "goto" => TaskKind::Goto {
                x: DEFAULT_GOTO_TARGET.0,
                y: DEFAULT_GOTO_TARGET.1,
            },
            "say" => TaskKind::Say {
                message: DEFAULT_SAY_MESSAGE.to_string(),
            },
            "think" => TaskKind::Think {
                message: DEFAULT_THINK_MESSAGE.to_string(),
            },
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Move { .. } => "move",
            TaskKind::Turn { .. } => "turn",
            TaskKind::Goto { .. } => "goto",
            TaskKind::Say { .. } => "say",
            TaskKind::Think { .. } => "think",
            TaskKind::Unknown => "unknown",
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, TaskKind::Say { .. } | TaskKind::Think { .. })
    }

    pub fn summary(&self) -> String {
        match self {
            TaskKind::Move { steps } => format!("move {steps} steps"),
            TaskKind::Turn { degrees } => format!("turn {degrees} degrees"),
            TaskKind::Goto { x, y } => format!("goto x: {x} y: {y}"),
            TaskKind::Say { message } => format!("say \"{message}\""),
            TaskKind::Think { message } => format!("think \"{message}\""),
            TaskKind::Unknown => "unknown".to_string(),
        }
    }
}

/// Partial edit of a queued task. Fields that do not belong to the task's kind
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParams {
    pub steps: Option<f64>,
    pub degrees: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub progress: f64,
    pub started_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl Task {
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            kind,
            progress: 0.0,
            started_at_ms: None,
            duration_ms: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.started_at_ms = None;
        self.duration_ms = None;
    }

    /// Independent copy for a sprite queue: new identity, no run state.
    pub fn copied_with_id(&self, id: TaskId) -> Self {
        Self::new(id, self.kind.clone())
    }

    pub fn apply_params(&mut self, params: &TaskParams) {
        match &mut self.kind {
            TaskKind::Move { steps } => {
                if let Some(value) = params.steps {
                    *steps = value;
                }
            }
            TaskKind::Turn { degrees } => {
                if let Some(value) = params.degrees {
                    *degrees = value;
                }
            }
            TaskKind::Goto { x, y } => {
                if let Some(value) = params.x {
                    *x = value;
                }
                if let Some(value) = params.y {
                    *y = value;
                }
            }
            TaskKind::Say { message } | TaskKind::Think { message } => {
                if let Some(value) = &params.message {
                    message.clone_from(value);
                }
            }
            TaskKind::Unknown => {}
        }
    }

    pub fn progress_percent(&self) -> u32 {
        (self.progress.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

pub fn is_complete(task: &Task) -> bool {
    task.is_complete()
}

pub fn advance_progress(progress: f64, step: f64) -> f64 {
    let next = (progress + step).min(1.0);
    if 1.0 - next < PROGRESS_SNAP { 1.0 } else { next }
}
