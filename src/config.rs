use anyhow::{bail, Context, Result};
use glam::Vec2;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct CollisionConfig {
    /// When false the space only detects contacts; bodies never integrate.
    #[serde(default)]
    pub physics_enabled: bool,
    /// Time advanced by a detection-only step. rapier needs a strictly positive delta to run the
    /// pipeline, but kinematic proxies do not move regardless of its size.
    #[serde(default = "CollisionConfig::default_detection_dt")]
    pub detection_dt: f32,
    #[serde(default)]
    pub gravity: [f32; 2],
    #[serde(default = "CollisionConfig::default_flash_duration")]
    pub flash_duration: f32,
    #[serde(default = "CollisionConfig::default_flash_scale")]
    pub flash_scale: f32,
}

impl CollisionConfig {
    fn default_detection_dt() -> f32 {
        1.0e-6
    }

    fn default_flash_duration() -> f32 {
        1.5
    }

    fn default_flash_scale() -> f32 {
        2.0
    }

    pub fn gravity(&self) -> Vec2 {
        Vec2::from(self.gravity)
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            physics_enabled: false,
            detection_dt: Self::default_detection_dt(),
            gravity: [0.0, 0.0],
            flash_duration: Self::default_flash_duration(),
            flash_scale: Self::default_flash_scale(),
        }
    }
}

/// Which enemy controller the game spawns. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnemyBehavior {
    /// Steers straight at the player.
    #[default]
    Boid,
    /// Walks a fixed patrol loop.
    Waypoint,
}

impl EnemyBehavior {
    pub fn label(self) -> &'static str {
        match self {
            EnemyBehavior::Boid => "boid",
            EnemyBehavior::Waypoint => "waypoint",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "boid" => Some(EnemyBehavior::Boid),
            "waypoint" | "wpt" => Some(EnemyBehavior::Waypoint),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnemyConfig {
    #[serde(default)]
    pub behavior: EnemyBehavior,
    #[serde(default = "EnemyConfig::default_speed")]
    pub speed: f32,
    #[serde(default = "EnemyConfig::default_count")]
    pub count: u32,
}

impl EnemyConfig {
    const fn default_speed() -> f32 {
        100.0
    }

    const fn default_count() -> u32 {
        4
    }
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self { behavior: EnemyBehavior::default(), speed: Self::default_speed(), count: Self::default_count() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub collision: CollisionConfig,
    #[serde(default)]
    pub enemies: EnemyConfig,
    #[serde(default = "GameConfig::default_tick_rate")]
    pub tick_rate: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            collision: CollisionConfig::default(),
            enemies: EnemyConfig::default(),
            tick_rate: Self::default_tick_rate(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameConfigOverrides {
    pub physics_enabled: Option<bool>,
    pub enemy_behavior: Option<EnemyBehavior>,
}

impl GameConfig {
    const fn default_tick_rate() -> f32 {
        60.0
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: GameConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        cfg.validate().with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let dt = self.collision.detection_dt;
        if !dt.is_finite() || dt <= 0.0 {
            bail!("collision.detection_dt must be a positive number, got {dt}");
        }
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            bail!("tick_rate must be a positive number, got {}", self.tick_rate);
        }
        if self.collision.flash_duration < 0.0 {
            bail!("collision.flash_duration must not be negative");
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &GameConfigOverrides) {
        if let Some(enabled) = overrides.physics_enabled {
            self.collision.physics_enabled = enabled;
        }
        if let Some(behavior) = overrides.enemy_behavior {
            self.enemies.behavior = behavior;
        }
    }
}
