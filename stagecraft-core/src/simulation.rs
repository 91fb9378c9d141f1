use crate::collision::{CollisionEvent, CollisionHistory, detect_and_swap};
use crate::config::SimulationConfig;
use crate::executor::execute_task;
use crate::registry::{RegistryError, SpriteRegistry};
use crate::sprite::{Sprite, SpriteId};
use crate::task::{TaskId, is_complete};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Returns the current wall-clock time in milliseconds.
pub type ClockFn = Box<dyn Fn() -> u64 + Send + Sync + 'static>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Whether the sprites this frame drove still want another frame.
    pub still_animating: bool,
    pub collisions: Vec<CollisionEvent>,
    pub completed_tasks: Vec<(SpriteId, TaskId)>,
}

/// One run-all frame: cooldowns, task execution for every animating sprite,
/// then a single collision pass over the result.
pub fn advance_frame(
    sprites: &mut [Sprite],
    config: &SimulationConfig,
    now_ms: u64,
) -> FrameReport {
    let mut report = FrameReport::default();

    for sprite in sprites.iter_mut() {
        sprite.tick_cooldown();
    }

    for sprite in sprites.iter_mut() {
        if let Some(completed) = step_sprite(sprite, config, now_ms) {
            report.completed_tasks.push((sprite.id, completed));
        }
    }

    report.collisions = detect_and_swap(sprites, config, now_ms);
    report.still_animating = sprites.iter().any(|sprite| sprite.is_animating);
    report
}

/// One run-one frame. Only `id` is cooled down and executed; the collision
/// pass still covers every animating sprite.
pub fn advance_sprite_frame(
    sprites: &mut [Sprite],
    id: SpriteId,
    config: &SimulationConfig,
    now_ms: u64,
) -> FrameReport {
    let mut report = FrameReport::default();
    let Some(index) = sprites.iter().position(|sprite| sprite.id == id) else {
        return report;
    };

    let sprite = &mut sprites[index];
    if !sprite.is_animating {
        return report;
    }
    if !sprite.has_pending_tasks() {
        sprite.is_animating = false;
        return report;
    }

    sprite.tick_cooldown();
    if let Some(completed) = step_sprite(sprite, config, now_ms) {
        report.completed_tasks.push((id, completed));
    }

    report.collisions = detect_and_swap(sprites, config, now_ms);
    report.still_animating = sprites[index].is_animating;
    report
}

/// Runs the sprite's current task for one frame and moves the cursor past it
/// once it completes. Sprites with nothing left to run stop animating.
fn step_sprite(sprite: &mut Sprite, config: &SimulationConfig, now_ms: u64) -> Option<TaskId> {
    if !sprite.is_animating || !sprite.has_pending_tasks() {
        sprite.is_animating = false;
        return None;
    }
    let task = sprite.tasks[sprite.current_task_index].clone();

    execute_task(sprite, &task, now_ms, config);

    if sprite.task(task.id).is_some_and(is_complete) {
        sprite.current_task_index += 1;
        return Some(task.id);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    All,
    Single(SpriteId),
}

/// Owns the stage and the one frame callback that may be pending at a time.
///
/// The host calls [`Simulation::tick`] once per display frame; a tick does
/// nothing unless a run scheduled a frame, and a frame reschedules itself only
/// while something is still animating.
pub struct Simulation {
    registry: SpriteRegistry,
    history: CollisionHistory,
    config: SimulationConfig,
    clock: ClockFn,
    pending: Option<RunMode>,
    frame_count: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self::new_with_clock(config, SpriteRegistry::new(), Self::system_clock())
    }

    pub fn new_with_clock(
        config: SimulationConfig,
        registry: SpriteRegistry,
        clock: ClockFn,
    ) -> Self {
        Self {
            history: CollisionHistory::with_capacity(config.history_capacity),
            registry,
            config,
            clock,
            pending: None,
            frame_count: 0,
        }
    }

    pub fn registry(&self) -> &SpriteRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SpriteRegistry {
        &mut self.registry
    }

    pub fn sprites(&self) -> &[Sprite] {
        self.registry.sprites()
    }

    pub fn history(&self) -> &CollisionHistory {
        &self.history
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn pending(&self) -> Option<RunMode> {
        self.pending
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Restarts every sprite that has tasks. Returns false when no sprite has
    /// anything to run.
    pub fn run_all(&mut self) -> bool {
        let mut started = 0usize;
        for sprite in self.registry.sprites_mut().iter_mut() {
            if !sprite.tasks.is_empty() {
                sprite.reset_for_run();
                started += 1;
            }
        }
        if started == 0 {
            return false;
        }

        debug!(started, "run all");
        self.schedule(RunMode::All);
        true
    }

    /// Restarts one sprite from its first task. A sprite that is already
    /// animating or has an empty queue is left alone.
    pub fn run_one(&mut self, id: SpriteId) -> Result<bool, RegistryError> {
        let sprite = self
            .registry
            .sprite_mut(id)
            .ok_or(RegistryError::UnknownSprite(id))?;
        if sprite.tasks.is_empty() || sprite.is_animating {
            return Ok(false);
        }

        sprite.reset_for_run();
        debug!(sprite = %sprite.name, "run one");
        self.schedule(RunMode::Single(id));
        Ok(true)
    }

    pub fn stop_all(&mut self) {
        self.pending = None;
        for sprite in self.registry.sprites_mut().iter_mut() {
            sprite.halt();
        }
        debug!("stop all");
    }

    /// Halts one sprite and drops the pending frame, whatever it was driving.
    /// Other sprites keep their animating flag and resume on the next run.
    pub fn stop_one(&mut self, id: SpriteId) -> Result<(), RegistryError> {
        let sprite = self
            .registry
            .sprite_mut(id)
            .ok_or(RegistryError::UnknownSprite(id))?;
        sprite.halt();
        debug!(sprite = %sprite.name, "stop one");

        self.pending = None;
        Ok(())
    }

    /// Runs the pending frame, if any, and reschedules it while its sprites
    /// are still animating.
    pub fn tick(&mut self) -> Option<FrameReport> {
        let mode = self.pending.take()?;
        let now_ms = (self.clock)();
        let sprites = self.registry.sprites_mut();

        let report = match mode {
            RunMode::All => advance_frame(sprites, &self.config, now_ms),
            RunMode::Single(id) => advance_sprite_frame(sprites, id, &self.config, now_ms),
        };

        self.frame_count = self.frame_count.saturating_add(1);
        self.history.extend(report.collisions.iter().cloned());
        if report.still_animating {
            self.pending = Some(mode);
        } else {
            debug!(frames = self.frame_count, "animation finished");
        }
        Some(report)
    }

    fn schedule(&mut self, mode: RunMode) {
        self.pending = match self.pending {
            None => Some(mode),
            Some(existing) if existing == mode => Some(mode),
            Some(_) => Some(RunMode::All),
        };
    }

    fn system_clock() -> ClockFn {
        Box::new(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis() as u64)
                .unwrap_or(0)
        })
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
