use anyhow::{Context, Result};
use glam::Vec2;
use kestrel_collision::cli::CliOverrides;
use kestrel_collision::config::GameConfig;
use kestrel_collision::ecs::{CollisionWorld, Enemy, Transform, WEAPON_RANGE};
use kestrel_collision::events::GameEvent;
use kestrel_collision::time::FixedTimestep;

const DEFAULT_CONFIG: &str = "config/game.json";
const DEFAULT_STEPS: u32 = 600;
const FIRE_INTERVAL: u32 = 20;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(&cli) {
        eprintln!("Application error: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: &CliOverrides) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::load_or_default(DEFAULT_CONFIG),
    };
    config.apply_overrides(&cli.config_overrides());
    log::info!(
        "physics {}, {} {} enemies at {:.0} u/s",
        if config.collision.physics_enabled { "on" } else { "off" },
        config.enemies.count,
        config.enemies.behavior.label(),
        config.enemies.speed
    );

    let mut world = CollisionWorld::new(&config);
    let player = world.spawn_demo_scene(&config.enemies).context("Failed to build the demo scene")?;
    let mut timestep = FixedTimestep::from_rate(config.tick_rate);
    let steps = cli.steps.unwrap_or(DEFAULT_STEPS);

    let mut hits = 0usize;
    let mut contacts = 0usize;
    let mut tick = 0u32;
    while tick < steps {
        // headless: every frame is exactly one tick long
        for _ in 0..timestep.advance(timestep.step()) {
            if tick % FIRE_INTERVAL == 0 {
                aim_and_fire(&mut world, player)?;
            }
            world.fixed_step(timestep.step()).with_context(|| format!("Collision tick {tick} failed"))?;
            for event in world.drain_events() {
                match event {
                    GameEvent::EnemyHit { .. } => {
                        hits += 1;
                        log::info!("{event}");
                    }
                    GameEvent::CollisionStarted { .. } => {
                        contacts += 1;
                        log::debug!("{event}");
                    }
                    _ => log::trace!("{event}"),
                }
            }
            tick += 1;
        }
    }

    let stats = world.layer().space().stats();
    log::info!(
        "{tick} ticks, {contacts} contacts started, {hits} enemies hit, {} left, {} static rehashes",
        world.enemy_count(),
        stats.static_rehashes
    );
    Ok(())
}

/// Turns the player toward the closest enemy and fires if nothing blocks the line of sight.
fn aim_and_fire(world: &mut CollisionWorld, player: bevy_ecs::prelude::Entity) -> Result<()> {
    let Some(origin) = world.transform(player).map(|t| t.translation) else {
        return Ok(());
    };
    let mut enemies = world.world.query_filtered::<&Transform, bevy_ecs::prelude::With<Enemy>>();
    let closest = enemies
        .iter(&world.world)
        .map(|t| t.translation)
        .min_by(|a, b| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)));
    let Some(target) = closest else {
        return Ok(());
    };
    let heading = target - origin;
    if heading.length() > WEAPON_RANGE || heading == Vec2::ZERO {
        return Ok(());
    }
    let hit = world.layer_mut().query_segment(origin, target, Some(player))?;
    let blocked = hit.and_then(|hit| hit.entity).is_some_and(|entity| world.world.get::<Enemy>(entity).is_none());
    if blocked {
        log::debug!("line of sight to {target} blocked");
        return Ok(());
    }
    world.set_rotation(player, heading.y.atan2(heading.x));
    world.fire_bullet(player)?;
    Ok(())
}
