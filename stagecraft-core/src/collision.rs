use crate::config::SimulationConfig;
use crate::sprite::{Sprite, SpriteId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub sprite_a: SpriteId,
    pub sprite_b: SpriteId,
    pub name_a: String,
    pub name_b: String,
    pub timestamp_ms: u64,
}

/// Most recent collisions, oldest evicted first.
#[derive(Debug, Clone)]
pub struct CollisionHistory {
    entries: VecDeque<CollisionEvent>,
    capacity: usize,
    total_recorded: u64,
}

impl CollisionHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_recorded: 0,
        }
    }

    pub fn push(&mut self, event: CollisionEvent) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
        self.total_recorded = self.total_recorded.saturating_add(1);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = CollisionEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// Up to `count` newest entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &CollisionEvent> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    x: f64,
    y: f64,
    cooldown: u32,
}

/// Swaps task queues between every pair of animating sprites that are closer
/// than the collision distance.
///
/// Positions and cooldowns are read from a snapshot taken before the scan and
/// pairs are visited in ascending index order. A sprite that already swapped in
/// this pass can swap again with a later partner because the cooldown it just
/// received is not part of the snapshot.
pub fn detect_and_swap(
    sprites: &mut [Sprite],
    config: &SimulationConfig,
    now_ms: u64,
) -> Vec<CollisionEvent> {
    let candidates: Vec<Candidate> = sprites
        .iter()
        .enumerate()
        .filter(|(_, sprite)| sprite.is_animating)
        .map(|(index, sprite)| Candidate {
            index,
            x: sprite.x,
            y: sprite.y,
            cooldown: sprite.collision_cooldown,
        })
        .collect();

    let mut events = Vec::new();
    for (offset, a) in candidates.iter().enumerate() {
        for b in &candidates[offset + 1..] {
            if a.cooldown > 0 || b.cooldown > 0 {
                continue;
            }

            let distance = (a.x - b.x).hypot(a.y - b.y);
            if distance >= config.collision_distance {
                continue;
            }

            let Some((first, second)) = pair_mut(sprites, a.index, b.index) else {
                continue;
            };
            std::mem::swap(&mut first.tasks, &mut second.tasks);
            std::mem::swap(
                &mut first.current_task_index,
                &mut second.current_task_index,
            );
            first.collision_cooldown = config.collision_cooldown_frames;
            second.collision_cooldown = config.collision_cooldown_frames;

            info!(
                sprite_a = %first.name,
                sprite_b = %second.name,
                distance,
                "collision: sprites swapped task queues"
            );
            events.push(CollisionEvent {
                sprite_a: first.id,
                sprite_b: second.id,
                name_a: first.name.clone(),
                name_b: second.name.clone(),
                timestamp_ms: now_ms,
            });
        }
    }

    events
}

fn pair_mut(sprites: &mut [Sprite], a: usize, b: usize) -> Option<(&mut Sprite, &mut Sprite)> {
    if a >= b || b >= sprites.len() {
        return None;
    }
    let (head, tail) = sprites.split_at_mut(b);
    Some((&mut head[a], &mut tail[0]))
}

/// A pair of sprites close enough to draw a connector between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityLink {
    pub a: usize,
    pub b: usize,
    pub distance: f64,
    pub colliding: bool,
}

pub fn proximity_links(sprites: &[Sprite], config: &SimulationConfig) -> Vec<ProximityLink> {
    let mut links = Vec::new();
    for (a, first) in sprites.iter().enumerate() {
        for (b, second) in sprites.iter().enumerate().skip(a + 1) {
            let distance = first.distance_to(second);
            if distance < config.proximity_distance {
                links.push(ProximityLink {
                    a,
                    b,
                    distance,
                    colliding: distance < config.collision_distance,
                });
            }
        }
    }
    links
}
