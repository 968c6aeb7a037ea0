use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collision::CollisionPolicy;
use crate::constants::*;
use crate::error::{ConfigError, SimError, SimResult};
use crate::rng::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Classic,
    Rounded,
}

impl Preset {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "classic" => Some(Self::Classic),
            "rounded" => Some(Self::Rounded),
            _ => None,
        }
    }
}

// Randomized delay in seconds, sampled from `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: f32,
    pub max: f32,
}

impl DelayRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self, rng: &mut Rng) -> f32 {
        rng.range(self.min, self.max)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MazeConfig {
    pub base_width: i32,
    pub base_height: i32,
    pub growth_per_level: i32,
    pub extra_paths_min: u32,
    pub extra_paths_max: u32,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            base_width: BASE_MAZE_WIDTH,
            base_height: BASE_MAZE_HEIGHT,
            growth_per_level: MAZE_GROWTH_PER_LEVEL,
            extra_paths_min: EXTRA_PATHS_MIN,
            extra_paths_max: EXTRA_PATHS_MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    pub speed: f32,
    pub capture_radius: f32,
    pub exit_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: PLAYER_SPEED,
            capture_radius: CAPTURE_RADIUS,
            exit_radius: EXIT_RADIUS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZombieConfig {
    pub min_count: usize,
    pub cells_per_zombie: usize,
    pub visibility_radius: f32,
    pub chase_speed: f32,
    pub confused_speed: f32,
    pub roam_speed: f32,
    pub chase_duration_cap: f32,
    pub path_lookahead: usize,
    pub arrive_epsilon: f32,
    pub replan_delay: DelayRange,
    pub lost_sight_delay: DelayRange,
    pub confused_delay: DelayRange,
    pub roam_delay: DelayRange,
    pub initial_delay: DelayRange,
    pub confused_tries: u32,
    pub roam_tries: u32,
    pub roam_radius: i32,
    pub spawn_min_start_distance: f32,
    pub spawn_min_exit_distance: f32,
}

impl Default for ZombieConfig {
    fn default() -> Self {
        Self {
            min_count: ZOMBIE_MIN_COUNT,
            cells_per_zombie: CELLS_PER_ZOMBIE,
            visibility_radius: VISIBILITY_RADIUS,
            chase_speed: CHASE_SPEED,
            confused_speed: CONFUSED_SPEED,
            roam_speed: ROAM_SPEED,
            chase_duration_cap: CHASE_DURATION_CAP_SECS,
            path_lookahead: PATH_LOOKAHEAD,
            arrive_epsilon: ARRIVE_EPSILON,
            replan_delay: DelayRange::new(0.8, 1.6),
            lost_sight_delay: DelayRange::new(0.6, 1.6),
            confused_delay: DelayRange::new(0.8, 2.0),
            roam_delay: DelayRange::new(1.6, 4.0),
            initial_delay: DelayRange::new(0.0, 1.5),
            confused_tries: CONFUSED_TRIES,
            roam_tries: ROAM_TRIES,
            roam_radius: ROAM_RADIUS,
            spawn_min_start_distance: SPAWN_MIN_START_DISTANCE,
            spawn_min_exit_distance: SPAWN_MIN_EXIT_DISTANCE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollisionConfig {
    pub margin: f32,
    pub corner_radius: Option<f32>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            margin: ROUNDED_MARGIN,
            corner_radius: Some(ROUNDED_CORNER_RADIUS),
        }
    }
}

impl CollisionConfig {
    pub fn policy(&self) -> CollisionPolicy {
        CollisionPolicy {
            margin: self.margin,
            corner_radius: self.corner_radius,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimConfig {
    pub maze: MazeConfig,
    pub player: PlayerConfig,
    pub zombies: ZombieConfig,
    pub collision: CollisionConfig,
    // Longest tick the engine will simulate; larger deltas are clamped.
    pub max_delta_secs: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            maze: MazeConfig::default(),
            player: PlayerConfig::default(),
            zombies: ZombieConfig::default(),
            collision: CollisionConfig::default(),
            max_delta_secs: MAX_DELTA_SECS,
        }
    }
}

impl SimConfig {
    pub fn preset(preset: Preset) -> Self {
        let mut config = Self::default();
        if preset == Preset::Classic {
            config.maze.extra_paths_min = 0;
            config.maze.extra_paths_max = 0;
            config.collision.margin = CLASSIC_MARGIN;
            config.collision.corner_radius = None;
        }
        config
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> SimResult<()> {
        let maze = &self.maze;
        if maze.base_width <= 0 || maze.base_height <= 0 {
            return Err(SimError::InvalidDimension {
                width: maze.base_width,
                height: maze.base_height,
            });
        }
        if (maze.base_width as usize).saturating_mul(maze.base_height as usize) > MAX_MAZE_CELLS {
            return Err(SimError::InvalidDimension {
                width: maze.base_width,
                height: maze.base_height,
            });
        }
        if maze.growth_per_level < 0 {
            return Err(invalid("maze.growthPerLevel must not be negative"));
        }
        if maze.extra_paths_min > maze.extra_paths_max {
            return Err(invalid("maze.extraPathsMin exceeds maze.extraPathsMax"));
        }

        let zombies = &self.zombies;
        if zombies.min_count == 0 {
            return Err(invalid("zombies.minCount must be at least 1"));
        }
        if zombies.cells_per_zombie == 0 {
            return Err(invalid("zombies.cellsPerZombie must be positive"));
        }
        for (name, value) in [
            ("player.speed", self.player.speed),
            ("zombies.chaseSpeed", zombies.chase_speed),
            ("zombies.confusedSpeed", zombies.confused_speed),
            ("zombies.roamSpeed", zombies.roam_speed),
            ("zombies.visibilityRadius", zombies.visibility_radius),
            ("zombies.chaseDurationCap", zombies.chase_duration_cap),
            ("zombies.arriveEpsilon", zombies.arrive_epsilon),
            ("zombies.spawnMinStartDistance", zombies.spawn_min_start_distance),
            ("zombies.spawnMinExitDistance", zombies.spawn_min_exit_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(&format!("{name} must be a non-negative number")));
            }
        }
        for (name, range) in [
            ("zombies.replanDelay", zombies.replan_delay),
            ("zombies.lostSightDelay", zombies.lost_sight_delay),
            ("zombies.confusedDelay", zombies.confused_delay),
            ("zombies.roamDelay", zombies.roam_delay),
            ("zombies.initialDelay", zombies.initial_delay),
        ] {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min < 0.0 || range.min > range.max {
                return Err(invalid(&format!("{name} must satisfy 0 <= min <= max")));
            }
        }
        if zombies.roam_radius < 0 {
            return Err(invalid("zombies.roamRadius must not be negative"));
        }

        if !(0.0..0.5).contains(&self.collision.margin) {
            return Err(invalid("collision.margin must be in [0, 0.5)"));
        }
        if let Some(radius) = self.collision.corner_radius {
            if !(0.0..=0.5).contains(&radius) {
                return Err(invalid("collision.cornerRadius must be in [0, 0.5]"));
            }
        }
        if !(self.player.capture_radius > 0.0 && self.player.exit_radius > 0.0) {
            return Err(invalid("player capture and exit radii must be positive"));
        }
        if !(self.max_delta_secs > 0.0 && self.max_delta_secs.is_finite()) {
            return Err(invalid("maxDeltaSecs must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> SimError {
    SimError::InvalidConfiguration(message.to_string())
}
