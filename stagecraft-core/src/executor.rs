use crate::config::SimulationConfig;
use crate::sprite::{Bubble, BubbleKind, Sprite};
use crate::task::{Task, TaskKind, advance_progress};

/// Advances `task` on `sprite` by one frame.
///
/// `task` is a snapshot of the sprite's current task; progress is written back
/// to the queue entry with the same id. Motion tasks read the sprite's live
/// position and heading on every call, so anything that moved the sprite
/// between frames bends the remaining path.
pub fn execute_task(sprite: &mut Sprite, task: &Task, now_ms: u64, config: &SimulationConfig) {
    match &task.kind {
        TaskKind::Move { steps } => {
            let next = advance_progress(task.progress, config.progress_step);
            let (dx, dy) = sprite.heading_vector();
            let distance = steps * (next - task.progress);
            sprite.x += dx * distance;
            sprite.y += dy * distance;
            write_progress(sprite, task, next);
        }
        TaskKind::Turn { degrees } => {
            let next = advance_progress(task.progress, config.progress_step);
            sprite.rotation += degrees * (next - task.progress);
            write_progress(sprite, task, next);
        }
        TaskKind::Goto { x, y } => {
            let next = advance_progress(task.progress, config.progress_step);
            sprite.x += (x - sprite.x) * next;
            sprite.y += (y - sprite.y) * next;
            if next >= 1.0 {
                sprite.x = *x;
                sprite.y = *y;
            }
            write_progress(sprite, task, next);
        }
        TaskKind::Say { message } => {
            show_bubble(sprite, task, BubbleKind::Say, message, now_ms, config)
        }
        TaskKind::Think { message } => {
            show_bubble(sprite, task, BubbleKind::Think, message, now_ms, config)
        }
        TaskKind::Unknown => {}
    }
}

fn show_bubble(
    sprite: &mut Sprite,
    task: &Task,
    kind: BubbleKind,
    message: &str,
    now_ms: u64,
    config: &SimulationConfig,
) {
    let Some(started_at) = task.started_at_ms else {
        sprite.bubble = Some(Bubble::new(kind, message));
        if let Some(entry) = sprite.task_mut(task.id) {
            entry.started_at_ms = Some(now_ms);
            entry.duration_ms = Some(config.bubble_duration_ms);
        }
        return;
    };

    let duration = task.duration_ms.unwrap_or(config.bubble_duration_ms);
    if now_ms.saturating_sub(started_at) >= duration {
        sprite.bubble = None;
        write_progress(sprite, task, 1.0);
    }
}

fn write_progress(sprite: &mut Sprite, task: &Task, progress: f64) {
    if let Some(entry) = sprite.task_mut(task.id) {
        entry.progress = progress;
    }
}
