use stagecraft_core::{
    BubbleKind, ClockFn, SimulationConfig, Simulation, Sprite, SpriteColor, SpriteId,
    SpriteRegistry, TaskKind, advance_frame,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

fn stage(sprites: Vec<(u64, (f64, f64), f64)>) -> SpriteRegistry {
    SpriteRegistry::with_sprites(
        sprites
            .into_iter()
            .map(|(id, position, rotation)| {
                Sprite::new(
                    SpriteId(id),
                    format!("Sprite {id}"),
                    position,
                    rotation,
                    SpriteColor::new(0x3b, 0x82, 0xf6),
                )
            })
            .collect(),
    )
}

fn assign(registry: &mut SpriteRegistry, id: u64, kinds: Vec<TaskKind>) {
    for kind in kinds {
        registry.add_to_pool(kind);
    }
    registry.assign_pool(SpriteId(id)).unwrap();
}

fn simulation_with_clock(registry: SpriteRegistry) -> (Arc<AtomicU64>, Simulation) {
    let now = Arc::new(AtomicU64::new(1_000));
    let reader = Arc::clone(&now);
    let clock: ClockFn = Box::new(move || reader.load(Ordering::SeqCst));
    let sim = Simulation::new_with_clock(SimulationConfig::default(), registry, clock);
    (now, sim)
}

fn assert_invariants(sim: &Simulation) {
    for sprite in sim.sprites() {
        assert!(
            sprite.current_task_index <= sprite.tasks.len(),
            "{} cursor {} past queue of {}",
            sprite.name,
            sprite.current_task_index,
            sprite.tasks.len()
        );
        assert!(sprite.collision_cooldown <= sim.config().collision_cooldown_frames);
        for task in &sprite.tasks {
            assert!((0.0..=1.0).contains(&task.progress));
        }
    }
}

#[test]
fn busy_stage_keeps_cursor_and_cooldown_invariants() {
    let mut registry = stage(vec![
        (1, (100.0, 100.0), 90.0),
        (2, (180.0, 100.0), 270.0),
        (3, (140.0, 60.0), 180.0),
    ]);
    assign(
        &mut registry,
        1,
        vec![
            TaskKind::Move { steps: 60.0 },
            TaskKind::Turn { degrees: 180.0 },
            TaskKind::Move { steps: 60.0 },
        ],
    );
    assign(
        &mut registry,
        2,
        vec![
            TaskKind::Move { steps: 60.0 },
            TaskKind::Goto { x: 100.0, y: 100.0 },
        ],
    );
    assign(
        &mut registry,
        3,
        vec![TaskKind::Goto { x: 140.0, y: 140.0 }, TaskKind::Turn { degrees: -720.0 }],
    );
    let (now, mut sim) = simulation_with_clock(registry);

    assert!(sim.run_all());
    let mut frames = 0;
    while sim.tick().is_some() {
        frames += 1;
        now.fetch_add(16, Ordering::SeqCst);
        assert_invariants(&sim);
        assert!(frames < 5_000, "stage never settled");
    }

    assert!(sim.history().len() <= 10);
    assert!(sim.history().total_recorded() >= 1);
    assert!(sim.sprites().iter().all(|sprite| !sprite.is_animating));
}

#[test]
fn move_ends_at_heading_offset() {
    let heading: f64 = 135.0;
    let mut registry = stage(vec![(1, (200.0, 200.0), heading)]);
    assign(&mut registry, 1, vec![TaskKind::Move { steps: 50.0 }]);
    let (_, mut sim) = simulation_with_clock(registry);

    sim.run_all();
    while sim.tick().is_some() {}

    let sprite = &sim.sprites()[0];
    let radians = heading.to_radians();
    assert!((sprite.x - (200.0 + radians.sin() * 50.0)).abs() < 1e-9);
    assert!((sprite.y - (200.0 - radians.cos() * 50.0)).abs() < 1e-9);
    assert_eq!(sprite.current_task_index, 1);
}

#[test]
fn goto_lands_on_target_from_anywhere() {
    for start in [(0.0, 0.0), (-250.0, 75.5), (300.0, 300.0)] {
        let mut registry = stage(vec![(1, start, 0.0)]);
        assign(&mut registry, 1, vec![TaskKind::Goto { x: 42.0, y: -7.0 }]);
        let (_, mut sim) = simulation_with_clock(registry);

        sim.run_all();
        while sim.tick().is_some() {}

        let sprite = &sim.sprites()[0];
        assert_eq!((sprite.x, sprite.y), (42.0, -7.0));
    }
}

#[test]
fn think_bubble_holds_for_two_seconds_of_wall_clock() {
    let mut registry = stage(vec![(1, (0.0, 0.0), 0.0)]);
    assign(
        &mut registry,
        1,
        vec![TaskKind::Think {
            message: "Hmm...".into(),
        }],
    );
    let (now, mut sim) = simulation_with_clock(registry);

    sim.run_all();
    sim.tick();
    let bubble = sim.sprites()[0].bubble.clone().unwrap();
    assert_eq!(bubble.kind, BubbleKind::Think);
    assert_eq!(bubble.text, "Hmm...");

    now.store(2_999, Ordering::SeqCst);
    sim.tick();
    assert!(sim.sprites()[0].bubble.is_some());
    assert_eq!(sim.sprites()[0].tasks[0].progress, 0.0);

    now.store(3_000, Ordering::SeqCst);
    sim.tick();
    assert!(sim.sprites()[0].bubble.is_none());
    assert_eq!(sim.sprites()[0].tasks[0].progress, 1.0);
}

#[test]
fn colliding_sprites_trade_queues_once_per_cooldown() {
    let mut registry = stage(vec![(1, (100.0, 100.0), 0.0), (2, (120.0, 100.0), 0.0)]);
    assign(&mut registry, 1, vec![TaskKind::Turn { degrees: 10.0 }]);
    assign(
        &mut registry,
        2,
        vec![TaskKind::Turn { degrees: 20.0 }, TaskKind::Turn { degrees: 30.0 }],
    );
    let (_, mut sim) = simulation_with_clock(registry);
    sim.run_all();

    let report = sim.tick().unwrap();
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(sim.sprites()[0].tasks.len(), 2);
    assert_eq!(sim.sprites()[1].tasks.len(), 1);
    assert_eq!(sim.sprites()[0].collision_cooldown, 30);
    assert_eq!(sim.sprites()[1].collision_cooldown, 30);

    // Still touching, but cooling down.
    for _ in 0..29 {
        let report = sim.tick().unwrap();
        assert!(report.collisions.is_empty());
    }
    let report = sim.tick().unwrap();
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(sim.history().len(), 2);
}

#[test]
fn advance_frame_is_usable_without_a_session() {
    let config = SimulationConfig::default();
    let mut registry = stage(vec![(1, (0.0, 0.0), 90.0)]);
    assign(&mut registry, 1, vec![TaskKind::Move { steps: 100.0 }]);
    let mut sprites = registry.sprites().to_vec();
    sprites[0].reset_for_run();

    let report = advance_frame(&mut sprites, &config, 0);

    assert!(report.still_animating);
    assert!((sprites[0].x - 2.0).abs() < 1e-9);
    assert!(sprites[0].y.abs() < 1e-9);
}

#[test]
fn stopping_mid_queue_then_rerunning_replays_from_the_start() {
    let mut registry = stage(vec![(1, (0.0, 0.0), 0.0)]);
    assign(
        &mut registry,
        1,
        vec![TaskKind::Turn { degrees: 90.0 }, TaskKind::Move { steps: 10.0 }],
    );
    let (_, mut sim) = simulation_with_clock(registry);

    sim.run_one(SpriteId(1)).unwrap();
    for _ in 0..75 {
        sim.tick();
    }
    sim.stop_all();
    let stopped = sim.sprites()[0].clone();
    assert_eq!(stopped.current_task_index, 1);
    assert!(stopped.tasks[1].progress > 0.0);
    assert!(!stopped.is_animating);

    assert!(sim.run_all());
    let sprite = &sim.sprites()[0];
    assert_eq!(sprite.current_task_index, 0);
    assert!(sprite.tasks.iter().all(|task| task.progress == 0.0));
}
