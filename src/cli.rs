use crate::config::{EnemyBehavior, GameConfigOverrides};
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub steps: Option<u32>,
    physics: Option<bool>,
    enemy: Option<EnemyBehavior>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Use --config/--physics/--steps/--enemy with values.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "physics" => overrides.physics = Some(parse_bool_flag("physics", &value)?),
                "steps" => {
                    overrides.steps =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid step count '{value}'"))?);
                }
                "enemy" => {
                    overrides.enemy = Some(
                        EnemyBehavior::parse(&value)
                            .ok_or_else(|| anyhow!("Invalid enemy behavior '{value}'. Use boid or waypoint."))?,
                    );
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: --config, --physics, --steps, --enemy."),
            }
        }
        Ok(overrides)
    }

    pub fn config_overrides(&self) -> GameConfigOverrides {
        GameConfigOverrides { physics_enabled: self.physics, enemy_behavior: self.enemy }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_flag() {
        let args = ["demo", "--config", "game.json", "--physics", "on", "--steps", "120", "--enemy", "wpt"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        assert_eq!(overrides.config, Some(PathBuf::from("game.json")));
        assert_eq!(overrides.steps, Some(120));
        let config = overrides.config_overrides();
        assert_eq!(config.physics_enabled, Some(true));
        assert_eq!(config.enemy_behavior, Some(EnemyBehavior::Waypoint));
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["demo", "--physics", "on", "--physics", "off", "--enemy", "waypoint", "--enemy", "boid"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        let config = overrides.config_overrides();
        assert_eq!(config.physics_enabled, Some(false));
        assert_eq!(config.enemy_behavior, Some(EnemyBehavior::Boid));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["demo", "--steps"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_behaviors() {
        let err = CliOverrides::parse(["demo", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
        let err = CliOverrides::parse(["demo", "--enemy", "ghost"]).unwrap_err();
        assert!(err.to_string().contains("Invalid enemy behavior"));
    }
}
