use macroquad::prelude::*;
use stagecraft_core::{Bubble, BubbleKind, ProximityLink, Sprite, SpriteColor};

pub const SAY_COLOR: Color = Color::from_rgba(59, 130, 246, 255);
pub const THINK_COLOR: Color = Color::from_rgba(139, 92, 246, 255);
pub const COLLIDING_COLOR: Color = Color::from_rgba(239, 68, 68, 255);
pub const NEAR_COLOR: Color = Color::from_rgba(245, 158, 11, 255);

#[derive(Debug, Clone)]
pub struct SpriteDrawConfig {
    pub body_radius: f32,        // stage units
    pub stroke_ratio: f32,       // white rim as a fraction of radius
    pub pointer_length_ratio: f32,
    pub pointer_width_ratio: f32,
    pub halo_radius: f32,        // stage units, half the collision ring diameter
    pub label_font_size: f32,
    pub bubble_font_size: f32,
    pub stroke_color: Color,
}

impl Default for SpriteDrawConfig {
    fn default() -> Self {
        Self {
            body_radius: 16.0,
            stroke_ratio: 0.15,
            pointer_length_ratio: 1.0,
            pointer_width_ratio: 0.5,
            halo_radius: 40.0,
            label_font_size: 18.0,
            bubble_font_size: 18.0,
            stroke_color: WHITE,
        }
    }
}

pub fn to_color(color: SpriteColor) -> Color {
    Color::from_rgba(color.r, color.g, color.b, 255)
}

fn heading(sprite: &Sprite) -> Vec2 {
    let (x, y) = sprite.heading_vector();
    vec2(x as f32, y as f32)
}

pub fn draw_sprite(sprite: &Sprite, center: Vec2, scale: f32, config: &SpriteDrawConfig) {
    let color = to_color(sprite.color);
    let radius = config.body_radius * scale;
    let stroke = (radius * config.stroke_ratio).max(1.0);

    if sprite.is_animating {
        let ring = if sprite.collision_cooldown > 0 {
            COLLIDING_COLOR
        } else {
            color
        };
        draw_dashed_circle(center, config.halo_radius * scale, Color { a: 0.4, ..ring });
    }

    // Pointer triangle ahead of the body, along the heading.
    let forward = heading(sprite);
    let side = vec2(-forward.y, forward.x);
    let base = center + forward * radius;
    let tip = base + forward * (radius * config.pointer_length_ratio);
    let half_width = radius * config.pointer_width_ratio;
    draw_triangle(tip, base + side * half_width, base - side * half_width, color);

    draw_circle(center.x, center.y, radius + stroke * 0.5, config.stroke_color);
    draw_circle(center.x, center.y, (radius - stroke * 0.5).max(0.0), color);

    let mut label = sprite.name.clone();
    if sprite.is_animating {
        label.push_str(" *");
    }
    if sprite.collision_cooldown > 0 {
        label.push_str(" ~");
    }
    let dims = measure_text(&label, None, config.label_font_size as u16, 1.0);
    let label_origin = vec2(center.x - dims.width * 0.5, center.y - radius * 2.2 - 6.0);
    draw_rectangle(
        label_origin.x - 4.0,
        label_origin.y - dims.offset_y - 2.0,
        dims.width + 8.0,
        dims.height + 4.0,
        color,
    );
    draw_text(
        &label,
        label_origin.x,
        label_origin.y,
        config.label_font_size,
        WHITE,
    );
}

pub fn draw_bubble(bubble: &Bubble, anchor: Vec2, config: &SpriteDrawConfig) {
    let border = match bubble.kind {
        BubbleKind::Say => SAY_COLOR,
        BubbleKind::Think => THINK_COLOR,
    };
    let dims = measure_text(&bubble.text, None, config.bubble_font_size as u16, 1.0);
    let padding = 8.0;
    let width = dims.width.max(12.0) + padding * 2.0;
    let height = dims.height + padding * 2.0;
    let left = anchor.x;
    let top = anchor.y - height;

    draw_rectangle(left, top, width, height, WHITE);
    draw_rectangle_lines(left, top, width, height, 2.0, border);
    draw_text(
        &bubble.text,
        left + padding,
        top + padding + dims.offset_y,
        config.bubble_font_size,
        BLACK,
    );

    let tail = vec2(left + 14.0, anchor.y);
    match bubble.kind {
        BubbleKind::Say => {
            draw_triangle(
                tail + vec2(-6.0, 0.0),
                tail + vec2(6.0, 0.0),
                tail + vec2(-8.0, 10.0),
                border,
            );
        }
        BubbleKind::Think => {
            draw_circle(tail.x - 2.0, tail.y + 6.0, 4.0, border);
            draw_circle(tail.x - 8.0, tail.y + 14.0, 2.5, border);
        }
    }
}

pub fn draw_proximity_link(link: &ProximityLink, a: Vec2, b: Vec2) {
    if link.colliding {
        draw_line(a.x, a.y, b.x, b.y, 3.0, COLLIDING_COLOR);
        let mid = (a + b) * 0.5;
        let text = "SWAPPED!";
        let dims = measure_text(text, None, 14, 1.0);
        draw_text(text, mid.x - dims.width * 0.5, mid.y - 8.0, 14.0, COLLIDING_COLOR);
    } else {
        draw_dashed_line(a, b, 2.0, 5.0, NEAR_COLOR);
    }
}

pub fn draw_dashed_line(from: Vec2, to: Vec2, thickness: f32, dash: f32, color: Color) {
    let length = from.distance(to);
    if length <= f32::EPSILON {
        return;
    }
    let direction = (to - from) / length;
    let mut travelled = 0.0;
    while travelled < length {
        let start = from + direction * travelled;
        let end = from + direction * (travelled + dash).min(length);
        draw_line(start.x, start.y, end.x, end.y, thickness, color);
        travelled += dash * 2.0;
    }
}

fn draw_dashed_circle(center: Vec2, radius: f32, color: Color) {
    const SEGMENTS: usize = 24;
    let step = std::f32::consts::TAU / SEGMENTS as f32;
    for i in (0..SEGMENTS).step_by(2) {
        let a0 = i as f32 * step;
        let a1 = a0 + step;
        let p0 = center + vec2(a0.cos(), a0.sin()) * radius;
        let p1 = center + vec2(a1.cos(), a1.sin()) * radius;
        draw_line(p0.x, p0.y, p1.x, p1.y, 2.0, color);
    }
}
