use crate::task::{Task, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(pub u64);

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sprite-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleKind {
    Say,
    Think,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub kind: BubbleKind,
    pub text: String,
}

impl Bubble {
    pub fn new(kind: BubbleKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl SpriteColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`; the leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn random(rng: &mut fastrand::Rng) -> Self {
        Self::new(rng.u8(..), rng.u8(..), rng.u8(..))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub id: SpriteId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Degrees, clockwise from "up". Never normalized.
    pub rotation: f64,
    pub is_animating: bool,
    pub color: SpriteColor,
    pub tasks: Vec<Task>,
    pub current_task_index: usize,
    pub bubble: Option<Bubble>,
    pub collision_cooldown: u32,
}

impl Sprite {
    pub fn new(
        id: SpriteId,
        name: impl Into<String>,
        position: (f64, f64),
        rotation: f64,
        color: SpriteColor,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            x: position.0,
            y: position.1,
            rotation,
            is_animating: false,
            color,
            tasks: Vec::new(),
            current_task_index: 0,
            bubble: None,
            collision_cooldown: 0,
        }
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.get(self.current_task_index)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.current_task_index < self.tasks.len()
    }

    /// Restarts the whole queue from the first task.
    pub fn reset_for_run(&mut self) {
        self.is_animating = true;
        self.current_task_index = 0;
        self.bubble = None;
        self.collision_cooldown = 0;
        for task in &mut self.tasks {
            task.reset();
        }
    }

    /// Stops animation without touching the queue or cursor.
    pub fn halt(&mut self) {
        self.is_animating = false;
        self.bubble = None;
        self.collision_cooldown = 0;
    }

    pub fn tick_cooldown(&mut self) {
        self.collision_cooldown = self.collision_cooldown.saturating_sub(1);
    }

    pub fn distance_to(&self, other: &Sprite) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Unit vector of the current heading in screen space (y grows downward).
    pub fn heading_vector(&self) -> (f64, f64) {
        let radians = self.rotation.to_radians();
        (radians.sin(), -radians.cos())
    }
}
