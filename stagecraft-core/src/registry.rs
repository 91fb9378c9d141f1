use crate::config::SimulationConfig;
use crate::payload::{PayloadError, parse_drop_payload};
use crate::sprite::{Sprite, SpriteColor, SpriteId};
use crate::task::{Task, TaskId, TaskKind, TaskParams};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no sprite with id {0}")]
    UnknownSprite(SpriteId),
    #[error("sprite {sprite} has no task {task}")]
    UnknownTask { sprite: SpriteId, task: TaskId },
    #[error("the last sprite cannot be removed")]
    LastSprite,
}

/// Sprites on the stage plus the shared pool of unassigned tasks.
#[derive(Debug, Clone)]
pub struct SpriteRegistry {
    sprites: Vec<Sprite>,
    pool: Vec<Task>,
    next_sprite_id: u64,
    next_task_id: u64,
}

impl SpriteRegistry {
    pub fn new() -> Self {
        Self::with_sprites(vec![
            Sprite::new(
                SpriteId(1),
                "Sprite 1",
                (100.0, 100.0),
                0.0,
                SpriteColor::new(0x3b, 0x82, 0xf6),
            ),
            Sprite::new(
                SpriteId(2),
                "Sprite 2",
                (300.0, 300.0),
                90.0,
                SpriteColor::new(0xef, 0x44, 0x44),
            ),
        ])
    }

    pub fn with_sprites(sprites: Vec<Sprite>) -> Self {
        let next_sprite_id = sprites.iter().map(|s| s.id.0).max().unwrap_or(0) + 1;
        let next_task_id = sprites
            .iter()
            .flat_map(|s| s.tasks.iter().map(|t| t.id.0))
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            sprites,
            pool: Vec::new(),
            next_sprite_id,
            next_task_id,
        }
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprites_mut(&mut self) -> &mut Vec<Sprite> {
        &mut self.sprites
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.iter().find(|sprite| sprite.id == id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.iter_mut().find(|sprite| sprite.id == id)
    }

    pub fn index_of(&self, id: SpriteId) -> Option<usize> {
        self.sprites.iter().position(|sprite| sprite.id == id)
    }

    pub fn pool(&self) -> &[Task] {
        &self.pool
    }

    pub fn add_sprite(&mut self, rng: &mut fastrand::Rng, config: &SimulationConfig) -> SpriteId {
        let id = SpriteId(self.next_sprite_id);
        self.next_sprite_id += 1;

        let x = config.spawn_min + rng.f64() * config.spawn_extent;
        let y = config.spawn_min + rng.f64() * config.spawn_extent;
        let rotation = rng.f64() * 360.0;
        let name = format!("Sprite {}", self.sprites.len() + 1);

        debug!(%id, %name, x, y, rotation, "sprite added");
        self.sprites.push(Sprite::new(
            id,
            name,
            (x, y),
            rotation,
            SpriteColor::random(rng),
        ));
        id
    }

    pub fn remove_sprite(&mut self, id: SpriteId) -> Result<Sprite, RegistryError> {
        let index = self.index_of(id).ok_or(RegistryError::UnknownSprite(id))?;
        if self.sprites.len() <= 1 {
            return Err(RegistryError::LastSprite);
        }
        Ok(self.sprites.remove(index))
    }

    pub fn add_to_pool(&mut self, kind: TaskKind) -> TaskId {
        let id = self.allocate_task_id();
        self.pool.push(Task::new(id, kind));
        id
    }

    /// Adds the task described by a toolbar drag payload to the pool.
    pub fn drop_payload(&mut self, json: &str) -> Result<TaskId, PayloadError> {
        match parse_drop_payload(json) {
            Ok(kind) => Ok(self.add_to_pool(kind)),
            Err(err) => {
                warn!(error = %err, "ignoring drop payload");
                Err(err)
            }
        }
    }

    pub fn remove_from_pool(&mut self, id: TaskId) -> Option<Task> {
        let index = self.pool.iter().position(|task| task.id == id)?;
        Some(self.pool.remove(index))
    }

    pub fn clear_pool(&mut self) {
        self.pool.clear();
    }

    /// Appends independent copies of every pooled task to the sprite's queue
    /// and empties the pool. Returns how many tasks were assigned.
    pub fn assign_pool(&mut self, sprite_id: SpriteId) -> Result<usize, RegistryError> {
        let index = self
            .index_of(sprite_id)
            .ok_or(RegistryError::UnknownSprite(sprite_id))?;
        if self.pool.is_empty() {
            return Ok(0);
        }

        let pool = std::mem::take(&mut self.pool);
        let copies: Vec<Task> = pool
            .iter()
            .map(|task| {
                let id = self.allocate_task_id();
                task.copied_with_id(id)
            })
            .collect();
        let assigned = copies.len();

        let sprite = &mut self.sprites[index];
        sprite.tasks.extend(copies);
        sprite.current_task_index = 0;
        debug!(sprite = %sprite.name, assigned, "pool assigned");
        Ok(assigned)
    }

    pub fn remove_task(
        &mut self,
        sprite_id: SpriteId,
        task_id: TaskId,
    ) -> Result<Task, RegistryError> {
        let sprite = self
            .sprite_mut(sprite_id)
            .ok_or(RegistryError::UnknownSprite(sprite_id))?;
        let index = sprite
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(RegistryError::UnknownTask {
                sprite: sprite_id,
                task: task_id,
            })?;
        let removed = sprite.tasks.remove(index);
        sprite.current_task_index = sprite
            .current_task_index
            .min(sprite.tasks.len().saturating_sub(1));
        Ok(removed)
    }

    pub fn update_task(
        &mut self,
        sprite_id: SpriteId,
        task_id: TaskId,
        params: &TaskParams,
    ) -> Result<(), RegistryError> {
        let sprite = self
            .sprite_mut(sprite_id)
            .ok_or(RegistryError::UnknownSprite(sprite_id))?;
        let task = sprite.task_mut(task_id).ok_or(RegistryError::UnknownTask {
            sprite: sprite_id,
            task: task_id,
        })?;
        task.apply_params(params);
        Ok(())
    }

    pub fn clear_tasks(&mut self, sprite_id: SpriteId) -> Result<(), RegistryError> {
        let sprite = self
            .sprite_mut(sprite_id)
            .ok_or(RegistryError::UnknownSprite(sprite_id))?;
        sprite.tasks.clear();
        sprite.current_task_index = 0;
        Ok(())
    }

    fn allocate_task_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        id
    }
}

impl Default for SpriteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_pool(kinds: &[&str]) -> SpriteRegistry {
        let mut registry = SpriteRegistry::new();
        for kind in kinds {
            registry.add_to_pool(TaskKind::with_defaults(kind).unwrap());
        }
        registry
    }

    #[test]
    fn starts_with_two_default_sprites() {
        let registry = SpriteRegistry::new();
        let sprites = registry.sprites();
        assert_eq!(sprites.len(), 2);
        assert_eq!(sprites[0].name, "Sprite 1");
        assert_eq!((sprites[0].x, sprites[0].y, sprites[0].rotation), (100.0, 100.0, 0.0));
        assert_eq!(sprites[1].color.to_hex(), "#ef4444");
        assert_eq!(sprites[1].rotation, 90.0);
        assert!(sprites.iter().all(|s| s.tasks.is_empty() && !s.is_animating));
    }

    #[test]
    fn assign_copies_pool_with_fresh_ids_and_clears_it() {
        let mut registry = registry_with_pool(&["move", "say"]);
        let pool_ids: Vec<TaskId> = registry.pool().iter().map(|t| t.id).collect();

        let assigned = registry.assign_pool(SpriteId(1)).unwrap();

        assert_eq!(assigned, 2);
        assert!(registry.pool().is_empty());
        let sprite = registry.sprite(SpriteId(1)).unwrap();
        assert_eq!(sprite.tasks.len(), 2);
        assert_eq!(sprite.tasks[0].kind.name(), "move");
        assert_eq!(sprite.tasks[1].kind.name(), "say");
        assert!(sprite.tasks.iter().all(|t| !pool_ids.contains(&t.id)));
        assert_eq!(sprite.current_task_index, 0);
    }

    #[test]
    fn assign_appends_to_existing_queue() {
        let mut registry = registry_with_pool(&["move"]);
        registry.assign_pool(SpriteId(2)).unwrap();
        registry.add_to_pool(TaskKind::with_defaults("turn").unwrap());
        registry.sprite_mut(SpriteId(2)).unwrap().current_task_index = 1;

        registry.assign_pool(SpriteId(2)).unwrap();

        let sprite = registry.sprite(SpriteId(2)).unwrap();
        let names: Vec<&str> = sprite.tasks.iter().map(|t| t.kind.name()).collect();
        assert_eq!(names, vec!["move", "turn"]);
        assert_eq!(sprite.current_task_index, 0);
    }

    #[test]
    fn assigning_an_empty_pool_changes_nothing() {
        let mut registry = SpriteRegistry::new();
        assert_eq!(registry.assign_pool(SpriteId(1)).unwrap(), 0);
        assert!(registry.sprite(SpriteId(1)).unwrap().tasks.is_empty());
    }

    #[test]
    fn assign_to_unknown_sprite_keeps_pool() {
        let mut registry = registry_with_pool(&["move"]);
        let err = registry.assign_pool(SpriteId(99)).unwrap_err();
        assert_eq!(err, RegistryError::UnknownSprite(SpriteId(99)));
        assert_eq!(registry.pool().len(), 1);
    }

    #[test]
    fn last_sprite_cannot_be_removed() {
        let mut registry = SpriteRegistry::new();
        registry.remove_sprite(SpriteId(2)).unwrap();
        assert_eq!(registry.remove_sprite(SpriteId(1)), Err(RegistryError::LastSprite));
        assert_eq!(registry.sprites().len(), 1);
    }

    #[test]
    fn added_sprites_spawn_inside_the_stage() {
        let mut registry = SpriteRegistry::new();
        let config = SimulationConfig::default();
        let mut rng = fastrand::Rng::with_seed(7);

        let id = registry.add_sprite(&mut rng, &config);
        let second = registry.add_sprite(&mut rng, &config);

        assert_ne!(id, second);
        let sprite = registry.sprite(id).unwrap();
        assert_eq!(sprite.name, "Sprite 3");
        assert!((50.0..450.0).contains(&sprite.x));
        assert!((50.0..450.0).contains(&sprite.y));
        assert!((0.0..360.0).contains(&sprite.rotation));
        assert!(!sprite.is_animating);
        assert_eq!(registry.sprite(second).unwrap().name, "Sprite 4");
    }

    #[test]
    fn removing_a_task_keeps_cursor_in_range() {
        let mut registry = registry_with_pool(&["move", "turn", "say"]);
        registry.assign_pool(SpriteId(1)).unwrap();
        let ids: Vec<TaskId> = registry
            .sprite(SpriteId(1))
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.id)
            .collect();
        registry.sprite_mut(SpriteId(1)).unwrap().current_task_index = 2;

        registry.remove_task(SpriteId(1), ids[2]).unwrap();
        assert_eq!(registry.sprite(SpriteId(1)).unwrap().current_task_index, 1);

        registry.remove_task(SpriteId(1), ids[0]).unwrap();
        registry.remove_task(SpriteId(1), ids[1]).unwrap();
        let sprite = registry.sprite(SpriteId(1)).unwrap();
        assert!(sprite.tasks.is_empty());
        assert_eq!(sprite.current_task_index, 0);

        let err = registry.remove_task(SpriteId(1), ids[0]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTask { .. }));
    }

    #[test]
    fn update_and_clear_tasks() {
        let mut registry = registry_with_pool(&["say"]);
        registry.assign_pool(SpriteId(1)).unwrap();
        let task_id = registry.sprite(SpriteId(1)).unwrap().tasks[0].id;

        registry
            .update_task(
                SpriteId(1),
                task_id,
                &TaskParams {
                    message: Some("Hi there".into()),
                    ..TaskParams::default()
                },
            )
            .unwrap();
        assert_eq!(
            registry.sprite(SpriteId(1)).unwrap().tasks[0].kind,
            TaskKind::Say {
                message: "Hi there".into()
            }
        );

        registry.clear_tasks(SpriteId(1)).unwrap();
        assert!(registry.sprite(SpriteId(1)).unwrap().tasks.is_empty());
    }

    #[test]
    fn malformed_drop_leaves_pool_untouched() {
        let mut registry = SpriteRegistry::new();
        assert!(registry.drop_payload("not json").is_err());
        assert!(registry.pool().is_empty());

        registry
            .drop_payload(r#"{"id":"goto","type":"goto","content":"goto"}"#)
            .unwrap();
        assert_eq!(
            registry.pool()[0].kind,
            TaskKind::Goto { x: 300.0, y: 300.0 }
        );
    }

    #[test]
    fn pool_entries_can_be_removed_and_cleared() {
        let mut registry = registry_with_pool(&["move", "turn"]);
        let first = registry.pool()[0].id;
        assert!(registry.remove_from_pool(first).is_some());
        assert!(registry.remove_from_pool(first).is_none());
        assert_eq!(registry.pool().len(), 1);
        registry.clear_pool();
        assert!(registry.pool().is_empty());
    }
}
