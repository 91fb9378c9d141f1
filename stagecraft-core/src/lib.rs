pub mod collision;
pub mod config;
pub mod executor;
pub mod payload;
pub mod registry;
pub mod simulation;
pub mod sprite;
pub mod task;

pub use collision::{
    CollisionEvent, CollisionHistory, ProximityLink, detect_and_swap, proximity_links,
};
pub use config::{ConfigError, SimulationConfig};
pub use executor::execute_task;
pub use payload::{PayloadError, ToolItem, parse_drop_payload, tool_catalogue};
pub use registry::{RegistryError, SpriteRegistry};
pub use simulation::{
    ClockFn, FrameReport, RunMode, Simulation, advance_frame, advance_sprite_frame,
};
pub use sprite::{Bubble, BubbleKind, Sprite, SpriteColor, SpriteId};
pub use task::{Task, TaskId, TaskKind, TaskParams, is_complete};
