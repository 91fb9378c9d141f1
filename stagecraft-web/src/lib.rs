#[cfg(target_arch = "wasm32")]
use macroquad::miniquad;
use macroquad::prelude::*;
use stagecraft_core::{
    ClockFn, Simulation, SimulationConfig, SpriteId, SpriteRegistry, Task, TaskKind, TaskParams,
    proximity_links, tool_catalogue,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::sprite_draw::{
    SpriteDrawConfig, draw_bubble, draw_proximity_link, draw_sprite, to_color,
};

mod sprite_draw;

const PANEL_WIDTH: f32 = 340.0;
const STAGE_MARGIN: f32 = 20.0;
const STAGE_WIDTH: f32 = 600.0;
const STAGE_HEIGHT: f32 = 520.0;
const GRID_SPACING: f32 = 50.0;
const FIXED_STEP_SECONDS: f32 = 1.0 / 60.0;
const RECENT_COLLISIONS_SHOWN: usize = 4;
const PANEL_FONT_SIZE: f32 = 20.0;
const PANEL_LINE_HEIGHT: f32 = 22.0;
const COLOR_COLLISION_TEXT: Color = Color::from_rgba(161, 98, 7, 255);
const COLOR_EDIT_HIGHLIGHT: Color = Color::from_rgba(255, 255, 255, 120);

pub const MOVE_STEP_INCREMENT: f64 = 10.0;
pub const TURN_DEGREE_INCREMENT: f64 = 15.0;
pub const GOTO_COORD_INCREMENT: f64 = 25.0;

static PENDING_RUN_ALL: AtomicBool = AtomicBool::new(false);
static PENDING_STOP_ALL: AtomicBool = AtomicBool::new(false);
static PENDING_ADD_SPRITE: AtomicBool = AtomicBool::new(false);
static PENDING_ASSIGN_POOL: AtomicBool = AtomicBool::new(false);

static COLLISION_TOTAL: AtomicU32 = AtomicU32::new(0);
static ANIMATING_SPRITES: AtomicU32 = AtomicU32::new(0);

#[unsafe(no_mangle)]
pub extern "C" fn stage_run_all() {
    log_ui_action("stage action: run all");
    PENDING_RUN_ALL.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn stage_stop_all() {
    log_ui_action("stage action: stop all");
    PENDING_STOP_ALL.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn stage_add_sprite() {
    log_ui_action("stage action: add sprite");
    PENDING_ADD_SPRITE.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn stage_assign_pool() {
    log_ui_action("stage action: assign pool");
    PENDING_ASSIGN_POOL.store(true, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
pub extern "C" fn stage_collision_total() -> u32 {
    COLLISION_TOTAL.load(Ordering::SeqCst)
}

#[unsafe(no_mangle)]
pub extern "C" fn stage_animating_sprites() -> u32 {
    ANIMATING_SPRITES.load(Ordering::SeqCst)
}

fn log_ui_action(label: &str) {
    #[cfg(target_arch = "wasm32")]
    miniquad::info!("{}", label);
    #[cfg(not(target_arch = "wasm32"))]
    tracing::info!("{}", label);
}

fn take_flag(flag: &AtomicBool) -> bool {
    flag.swap(false, Ordering::SeqCst)
}

const TOOL_KEYS: [KeyCode; 5] = [
    KeyCode::Key1,
    KeyCode::Key2,
    KeyCode::Key3,
    KeyCode::Key4,
    KeyCode::Key5,
];

pub struct GameState {
    simulation: Simulation,
    rng: fastrand::Rng,
    sprite_draw: SpriteDrawConfig,
    selected_sprite: usize,
    selected_task: usize,
    selected_pool: usize,
    message_draft: Option<String>,
    status: Option<String>,
    fps: f32,
    fps_frame_count: u32,
    fps_last_update_time: f64,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        let clock: ClockFn = Box::new(|| (get_time() * 1000.0) as u64);
        let simulation = Simulation::new_with_clock(config, SpriteRegistry::new(), clock);
        Self {
            simulation,
            rng: fastrand::Rng::new(),
            sprite_draw: SpriteDrawConfig::default(),
            selected_sprite: 0,
            selected_task: 0,
            selected_pool: 0,
            message_draft: None,
            status: None,
            fps: 0.0,
            fps_frame_count: 0,
            fps_last_update_time: get_time(),
        }
    }

    fn selected_id(&self) -> Option<SpriteId> {
        self.simulation
            .sprites()
            .get(self.selected_sprite)
            .map(|sprite| sprite.id)
    }

    fn selected_queue_entry(&self) -> Option<(SpriteId, &Task)> {
        let sprite = self.simulation.sprites().get(self.selected_sprite)?;
        sprite
            .tasks
            .get(self.selected_task)
            .map(|task| (sprite.id, task))
    }

    fn update(&mut self) {
        if let Some(report) = self.simulation.tick() {
            for event in &report.collisions {
                self.status = Some(format!(
                    "{} and {} swapped tasks",
                    event.name_a, event.name_b
                ));
            }
        }
        self.clamp_selections();
        self.publish_counters();
    }

    /// Swaps can resize the selected queue between frames.
    fn clamp_selections(&mut self) {
        let sprites = self.simulation.sprites();
        self.selected_sprite = clamp_selection(self.selected_sprite, sprites.len());
        let queue_len = sprites
            .get(self.selected_sprite)
            .map_or(0, |sprite| sprite.tasks.len());
        self.selected_task = clamp_selection(self.selected_task, queue_len);
        let pool_len = self.simulation.registry().pool().len();
        self.selected_pool = clamp_selection(self.selected_pool, pool_len);
    }

    fn publish_counters(&self) {
        let total =
            u32::try_from(self.simulation.history().total_recorded()).unwrap_or(u32::MAX);
        COLLISION_TOTAL.store(total, Ordering::SeqCst);
        let animating = self
            .simulation
            .sprites()
            .iter()
            .filter(|sprite| sprite.is_animating)
            .count();
        ANIMATING_SPRITES.store(animating as u32, Ordering::SeqCst);
    }

    fn apply_pending_ui_actions(&mut self) {
        if take_flag(&PENDING_ADD_SPRITE) {
            self.add_sprite();
        }
        if take_flag(&PENDING_ASSIGN_POOL) {
            self.assign_pool();
        }
        if take_flag(&PENDING_RUN_ALL) {
            self.run_all();
        }
        if take_flag(&PENDING_STOP_ALL) {
            self.stop_all();
        }
    }

    fn handle_keyboard(&mut self) {
        if self.message_draft.is_some() {
            self.handle_message_input();
            return;
        }

        let catalogue = tool_catalogue();
        for (key, tool) in TOOL_KEYS.iter().zip(catalogue.iter()) {
            if !is_key_pressed(*key) {
                continue;
            }
            // Same path as a toolbar drag so malformed payloads are handled uniformly.
            let result = tool
                .to_json()
                .and_then(|json| self.simulation.registry_mut().drop_payload(&json));
            self.status = Some(match result {
                Ok(_) => format!("added {} to the pool", tool.kind),
                Err(err) => err.to_string(),
            });
        }

        if is_key_pressed(KeyCode::Tab) {
            let count = self.simulation.sprites().len().max(1);
            self.selected_sprite = (self.selected_sprite + 1) % count;
            self.selected_task = 0;
        }
        if is_key_pressed(KeyCode::Up) {
            self.selected_task = self.selected_task.saturating_sub(1);
        }
        if is_key_pressed(KeyCode::Down) {
            self.selected_task += 1;
        }
        if is_key_pressed(KeyCode::Left) {
            self.selected_pool = self.selected_pool.saturating_sub(1);
        }
        if is_key_pressed(KeyCode::Right) {
            self.selected_pool += 1;
        }
        let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
        if is_key_pressed(KeyCode::D) {
            if shift {
                self.remove_selected_pool_entry();
            } else {
                self.remove_selected_task();
            }
        }
        if is_key_pressed(KeyCode::Equal) || is_key_pressed(KeyCode::KpAdd) {
            self.adjust_selected_task(1.0, shift);
        }
        if is_key_pressed(KeyCode::Minus) || is_key_pressed(KeyCode::KpSubtract) {
            self.adjust_selected_task(-1.0, shift);
        }
        if is_key_pressed(KeyCode::M) {
            self.begin_message_edit();
        }
        if is_key_pressed(KeyCode::A) {
            self.assign_pool();
        }
        if is_key_pressed(KeyCode::R) {
            self.run_all();
        }
        if is_key_pressed(KeyCode::E) {
            self.run_selected();
        }
        if is_key_pressed(KeyCode::S) {
            self.stop_all();
        }
        if is_key_pressed(KeyCode::X) {
            self.stop_selected();
        }
        if is_key_pressed(KeyCode::N) {
            self.add_sprite();
        }
        if is_key_pressed(KeyCode::Delete) || is_key_pressed(KeyCode::Backspace) {
            self.remove_selected();
        }
        if is_key_pressed(KeyCode::C) {
            self.clear_selected_tasks();
        }
        if is_key_pressed(KeyCode::P) {
            self.simulation.registry_mut().clear_pool();
            self.status = Some("pool cleared".to_string());
        }
        self.clamp_selections();
    }

    fn handle_message_input(&mut self) {
        let Some(draft) = self.message_draft.as_mut() else {
            return;
        };
        while let Some(ch) = get_char_pressed() {
            if !ch.is_control() {
                draft.push(ch);
            }
        }
        if is_key_pressed(KeyCode::Backspace) {
            draft.pop();
        }
        if is_key_pressed(KeyCode::Escape) {
            self.message_draft = None;
            self.status = Some("edit cancelled".to_string());
        } else if is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter) {
            let message = self.message_draft.take();
            self.apply_to_selected_task(TaskParams {
                message,
                ..TaskParams::default()
            });
        }
    }

    fn begin_message_edit(&mut self) {
        let Some((_, task)) = self.selected_queue_entry() else {
            return;
        };
        let (TaskKind::Say { message } | TaskKind::Think { message }) = &task.kind else {
            self.status = Some("only say/think tasks carry a message".to_string());
            return;
        };
        let draft = message.clone();
        // Drop the keystroke that opened the editor.
        while get_char_pressed().is_some() {}
        self.message_draft = Some(draft);
    }

    fn adjust_selected_task(&mut self, direction: f64, secondary: bool) {
        let Some((_, task)) = self.selected_queue_entry() else {
            return;
        };
        match adjusted_params(&task.kind, direction, secondary) {
            Some(params) => self.apply_to_selected_task(params),
            None => self.status = Some("press M to edit this message".to_string()),
        }
    }

    fn apply_to_selected_task(&mut self, params: TaskParams) {
        let Some((sprite_id, task)) = self.selected_queue_entry() else {
            return;
        };
        let task_id = task.id;
        let registry = self.simulation.registry_mut();
        self.status = Some(match registry.update_task(sprite_id, task_id, &params) {
            Ok(()) => format!("updated {task_id}"),
            Err(err) => err.to_string(),
        });
    }

    fn remove_selected_task(&mut self) {
        let Some((sprite_id, task)) = self.selected_queue_entry() else {
            return;
        };
        let task_id = task.id;
        self.status = Some(match self.simulation.registry_mut().remove_task(sprite_id, task_id) {
            Ok(task) => format!("removed {}", task.kind.summary()),
            Err(err) => err.to_string(),
        });
    }

    fn remove_selected_pool_entry(&mut self) {
        let registry = self.simulation.registry_mut();
        let Some(task_id) = registry.pool().get(self.selected_pool).map(|task| task.id) else {
            return;
        };
        if let Some(task) = registry.remove_from_pool(task_id) {
            self.status = Some(format!("dropped {} from the pool", task.kind.summary()));
        }
    }

    fn add_sprite(&mut self) {
        let config = self.simulation.config().clone();
        let id = self
            .simulation
            .registry_mut()
            .add_sprite(&mut self.rng, &config);
        self.status = Some(format!("added {id}"));
    }

    fn assign_pool(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        self.status = Some(match self.simulation.registry_mut().assign_pool(id) {
            Ok(0) => "pool is empty".to_string(),
            Ok(count) => format!("assigned {count} task(s)"),
            Err(err) => err.to_string(),
        });
    }

    fn run_all(&mut self) {
        if !self.simulation.run_all() {
            self.status = Some("no sprite has tasks".to_string());
        }
    }

    fn run_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if let Err(err) = self.simulation.run_one(id) {
            self.status = Some(err.to_string());
        }
    }

    fn stop_all(&mut self) {
        self.simulation.stop_all();
    }

    fn stop_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if let Err(err) = self.simulation.stop_one(id) {
            self.status = Some(err.to_string());
        }
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.simulation.registry_mut().remove_sprite(id) {
            Ok(sprite) => {
                self.status = Some(format!("removed {}", sprite.name));
                let count = self.simulation.sprites().len();
                self.selected_sprite = self.selected_sprite.min(count.saturating_sub(1));
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn clear_selected_tasks(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if let Err(err) = self.simulation.registry_mut().clear_tasks(id) {
            self.status = Some(err.to_string());
        }
    }

    fn update_fps_if_due(&mut self) {
        let now = get_time();
        self.fps_frame_count += 1;
        let elapsed = now - self.fps_last_update_time;
        if elapsed >= 1.0 {
            self.fps = self.fps_frame_count as f32 / elapsed as f32;
            self.fps_frame_count = 0;
            self.fps_last_update_time = now;
        }
    }

    fn stage_origin(&self) -> Vec2 {
        vec2(PANEL_WIDTH + STAGE_MARGIN, STAGE_MARGIN)
    }

    fn stage_scale(&self) -> f32 {
        let available_w = (screen_width() - PANEL_WIDTH - STAGE_MARGIN * 2.0).max(1.0);
        let available_h = (screen_height() - STAGE_MARGIN * 2.0).max(1.0);
        (available_w / STAGE_WIDTH).min(available_h / STAGE_HEIGHT)
    }

    fn stage_to_screen(&self, x: f64, y: f64) -> Vec2 {
        self.stage_origin() + vec2(x as f32, y as f32) * self.stage_scale()
    }

    fn render(&self) {
        clear_background(Color::from_rgba(245, 252, 255, 255));
        self.render_stage();
        self.render_panel();
    }

    fn render_stage(&self) {
        let origin = self.stage_origin();
        let scale = self.stage_scale();
        let width = STAGE_WIDTH * scale;
        let height = STAGE_HEIGHT * scale;

        let background = Color::from_rgba(249, 250, 251, 255);
        draw_rectangle(origin.x, origin.y, width, height, background);
        let grid = Color::from_rgba(209, 213, 219, 90);
        let mut offset = 0.0;
        while offset <= STAGE_WIDTH {
            let x = origin.x + offset * scale;
            draw_line(x, origin.y, x, origin.y + height, 1.0, grid);
            offset += GRID_SPACING;
        }
        offset = 0.0;
        while offset <= STAGE_HEIGHT {
            let y = origin.y + offset * scale;
            draw_line(origin.x, y, origin.x + width, y, 1.0, grid);
            offset += GRID_SPACING;
        }
        let border = Color::from_rgba(156, 163, 175, 255);
        draw_rectangle_lines(origin.x, origin.y, width, height, 2.0, border);

        let sprites = self.simulation.sprites();
        for link in proximity_links(sprites, self.simulation.config()) {
            let a = &sprites[link.a];
            let b = &sprites[link.b];
            draw_proximity_link(
                &link,
                self.stage_to_screen(a.x, a.y),
                self.stage_to_screen(b.x, b.y),
            );
        }

        // Animating sprites on top, like a raised z-index.
        let (idle, animating): (Vec<_>, Vec<_>) =
            sprites.iter().partition(|sprite| !sprite.is_animating);
        for sprite in idle.into_iter().chain(animating) {
            let center = self.stage_to_screen(sprite.x, sprite.y);
            draw_sprite(sprite, center, scale, &self.sprite_draw);
        }

        for sprite in sprites {
            if let Some(bubble) = &sprite.bubble {
                let center = self.stage_to_screen(sprite.x, sprite.y);
                let radius = self.sprite_draw.body_radius * scale;
                let anchor = center + vec2(radius, -radius * 2.0);
                draw_bubble(bubble, anchor, &self.sprite_draw);
            }
        }
    }

    fn render_panel(&self) {
        let background = Color::from_rgba(183, 233, 246, 255);
        draw_rectangle(0.0, 0.0, PANEL_WIDTH, screen_height(), background);
        let heading = Color::from_rgba(0, 123, 136, 255);
        let text = Color::from_rgba(31, 41, 55, 255);
        let muted = Color::from_rgba(107, 114, 128, 255);
        let mut y = 30.0;
        let line = |content: &str, color: Color, y: &mut f32| {
            draw_text(content, 16.0, *y, PANEL_FONT_SIZE, color);
            *y += PANEL_LINE_HEIGHT;
        };

        line("Tasks (1-5 add to pool)", heading, &mut y);
        for (index, tool) in tool_catalogue().iter().enumerate() {
            let description = tool.description.as_deref().unwrap_or("");
            let entry = format!("  {} {}: {}", index + 1, tool.kind, description);
            line(&entry, muted, &mut y);
        }

        y += 6.0;
        let pool = self.simulation.registry().pool();
        let pool_title = format!("Pool ({}) A assign, P clear, Left/Right Shift+D", pool.len());
        line(&pool_title, heading, &mut y);
        if pool.is_empty() {
            line("  drop tasks here", muted, &mut y);
        }
        for (index, task) in pool.iter().enumerate() {
            let marker = if index == self.selected_pool { ">" } else { " " };
            line(&format!("{marker} {}", task.kind.summary()), text, &mut y);
        }

        y += 6.0;
        let sprites = self.simulation.sprites();
        line(&format!("Sprites ({}) Tab select, N add", sprites.len()), heading, &mut y);
        for (index, sprite) in sprites.iter().enumerate() {
            let marker = if index == self.selected_sprite { ">" } else { " " };
            let state = if sprite.is_animating { "running" } else { "idle" };
            line(
                &format!(
                    "{marker} {} [{}] {} task(s), {state}",
                    sprite.name,
                    sprite.color.to_hex(),
                    sprite.tasks.len()
                ),
                to_color(sprite.color),
                &mut y,
            );
        }

        if let Some(sprite) = sprites.get(self.selected_sprite) {
            y += 6.0;
            let queue_title = format!("{} queue (E run, X stop, C clear)", sprite.name);
            line(&queue_title, heading, &mut y);
            line("  Up/Down select, D remove, =/- edit, M message", muted, &mut y);
            for (index, task) in sprite.tasks.iter().enumerate() {
                let cursor = if index == sprite.current_task_index && sprite.is_animating {
                    ">"
                } else {
                    " "
                };
                if index == self.selected_task {
                    let top = y - PANEL_FONT_SIZE * 0.8;
                    let width = PANEL_WIDTH - 16.0;
                    draw_rectangle(8.0, top, width, PANEL_LINE_HEIGHT, COLOR_EDIT_HIGHLIGHT);
                }
                let state = if task.is_complete() {
                    " done".to_string()
                } else if task.kind.is_timed() && task.started_at_ms.is_some() {
                    " showing".to_string()
                } else if task.kind.is_timed() {
                    String::new()
                } else {
                    format!(" {}%", task.progress_percent())
                };
                let entry = format!("{cursor} {}. {}{state}", index + 1, task.kind.summary());
                line(&entry, text, &mut y);
            }
            if let Some(draft) = &self.message_draft {
                line(&format!("  message: {draft}_ (Enter/Esc)"), heading, &mut y);
            }
        }

        y += 6.0;
        let history = self.simulation.history();
        let collisions_title =
            format!("Collisions: {} (R run all, S stop all)", history.total_recorded());
        line(&collisions_title, heading, &mut y);
        if history.is_empty() {
            line("  none yet", muted, &mut y);
        }
        for event in history.recent(RECENT_COLLISIONS_SHOWN) {
            let entry = format!("  {} <-> {}", event.name_a, event.name_b);
            line(&entry, COLOR_COLLISION_TEXT, &mut y);
        }

        if let Some(status) = &self.status {
            y += 6.0;
            line(status, text, &mut y);
        }

        let footer = format!(
            "frames: {}  fps: {:.1}{}",
            self.simulation.frame_count(),
            self.fps,
            if self.simulation.is_scheduled() { "  running" } else { "" }
        );
        draw_text(&footer, 16.0, screen_height() - 16.0, PANEL_FONT_SIZE, muted);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_selection(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

/// Parameter nudge for one +/- press. `secondary` picks the y coordinate of a
/// goto. Timed tasks have no numeric parameter and yield `None`.
pub fn adjusted_params(kind: &TaskKind, direction: f64, secondary: bool) -> Option<TaskParams> {
    if kind.is_timed() {
        return None;
    }
    let params = match kind {
        TaskKind::Move { steps } => TaskParams {
            steps: Some(steps + direction * MOVE_STEP_INCREMENT),
            ..TaskParams::default()
        },
        TaskKind::Turn { degrees } => TaskParams {
            degrees: Some(degrees + direction * TURN_DEGREE_INCREMENT),
            ..TaskParams::default()
        },
        TaskKind::Goto { y, .. } if secondary => TaskParams {
            y: Some(y + direction * GOTO_COORD_INCREMENT),
            ..TaskParams::default()
        },
        TaskKind::Goto { x, .. } => TaskParams {
            x: Some(x + direction * GOTO_COORD_INCREMENT),
            ..TaskParams::default()
        },
        _ => return None,
    };
    Some(params)
}

pub async fn run() {
    install_panic_hook();
    let mut game = GameState::new();
    let mut accumulator = 0.0_f32;

    loop {
        // At most one simulation frame per display frame; surplus time is dropped
        // rather than replayed.
        accumulator += get_frame_time();
        if accumulator >= FIXED_STEP_SECONDS {
            game.update();
            accumulator = (accumulator - FIXED_STEP_SECONDS).min(FIXED_STEP_SECONDS);
        }

        game.apply_pending_ui_actions();
        game.handle_keyboard();
        game.update_fps_if_due();

        game.render();

        next_frame().await;
    }
}

#[cfg(target_arch = "wasm32")]
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let msg = info.to_string();
        if let Some(location) = info.location() {
            miniquad::error!("panic at {}:{}: {}", location.file(), location.line(), msg);
        } else {
            miniquad::error!("panic: {}", msg);
        }
    }));
}

#[cfg(not(target_arch = "wasm32"))]
fn install_panic_hook() {}
