//! Navigation configuration.
//!
//! Every distance and time threshold the navigation stack consults lives
//! here, so a host game can retune movement feel without touching code.
//! Units are world units (roughly inches) and seconds.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Tunable parameters for locomotion, perception and path following.
///
/// # Example
///
/// ```
/// use botnav::core::NavConfig;
///
/// let config = NavConfig::new()
///     .with_run_speed(220.0)
///     .with_vision_range(1500.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Seconds per simulation tick.
    pub tick_interval: f32,

    // ===== Locomotion =====
    /// Top speed while running.
    pub run_speed: f32,
    /// Top speed while walking.
    pub walk_speed: f32,
    /// Acceleration cap when speeding up.
    pub max_accel: f32,
    /// Deceleration cap when slowing down.
    pub max_decel: f32,
    /// Tallest rise traversable without jumping or climbing.
    pub step_height: f32,
    /// Tallest ledge reachable with a jump-and-climb.
    pub max_jump_height: f32,
    /// Falls beyond this are treated as lethal by path costing.
    pub death_drop_height: f32,

    // ===== Body =====
    /// Collision hull width (both horizontal axes).
    pub hull_width: f32,
    /// Collision hull height while standing.
    pub stand_height: f32,
    /// Collision hull height while crouching.
    pub crouch_height: f32,

    // ===== Vision =====
    /// Entities beyond this range are never seen.
    pub vision_range: f32,
    /// Horizontal field of view in degrees.
    pub fov_deg: f32,
    /// Delay between an entity entering view and being recognized.
    pub reaction_time: f32,
    /// Minimum interval between full vision scans.
    pub vision_interval: f32,
    /// Seconds an unseen known entity is remembered before being
    /// forgotten.
    pub known_horizon: f32,

    // ===== Path following =====
    /// Horizontal distance at which a path segment counts as reached.
    pub goal_tolerance: f32,
    /// How far ahead along the path the follower may skip goals.
    pub min_lookahead: f32,
    /// Forward probe distance when checking for climbable ledges.
    pub ledge_lookahead: f32,
    /// Minimum flat ground beyond a ledge lip for a climb to commit.
    pub min_ledge_depth: f32,
    /// Area separation under this is walked over rather than jumped.
    pub gap_tolerance: f32,
    /// Distance from a gap at which the jump is launched.
    pub gap_jump_lookahead: f32,
    /// Sweep length for local obstacle avoidance.
    pub avoid_lookahead: f32,
    /// How far ahead a blocking actor can trigger a polite wait.
    pub hindrance_range: f32,
    /// Collapse redundant path segments after computation.
    pub prune_paths: bool,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            tick_interval: 1.0 / 60.0,

            run_speed: 150.0,
            walk_speed: 75.0,
            max_accel: 500.0,
            max_decel: 800.0,
            step_height: 18.0,
            max_jump_height: 60.0,
            death_drop_height: 200.0,

            hull_width: 26.0,
            stand_height: 68.0,
            crouch_height: 32.0,

            vision_range: 2000.0,
            fov_deg: 90.0,
            reaction_time: 0.2,
            vision_interval: 0.1,
            known_horizon: 10.0,

            goal_tolerance: 25.0,
            min_lookahead: 100.0,
            ledge_lookahead: 30.0,
            min_ledge_depth: 16.0,
            gap_tolerance: 12.0,
            gap_jump_lookahead: 64.0,
            avoid_lookahead: 50.0,
            hindrance_range: 300.0,
            prune_paths: false,
        }
    }
}

impl NavConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tick_interval(mut self, seconds: f32) -> Self {
        self.tick_interval = seconds;
        self
    }

    #[must_use]
    pub fn with_run_speed(mut self, speed: f32) -> Self {
        self.run_speed = speed;
        self
    }

    #[must_use]
    pub fn with_walk_speed(mut self, speed: f32) -> Self {
        self.walk_speed = speed;
        self
    }

    #[must_use]
    pub fn with_step_height(mut self, height: f32) -> Self {
        self.step_height = height;
        self
    }

    #[must_use]
    pub fn with_max_jump_height(mut self, height: f32) -> Self {
        self.max_jump_height = height;
        self
    }

    #[must_use]
    pub fn with_hull(mut self, width: f32, stand_height: f32, crouch_height: f32) -> Self {
        self.hull_width = width;
        self.stand_height = stand_height;
        self.crouch_height = crouch_height;
        self
    }

    #[must_use]
    pub fn with_vision_range(mut self, range: f32) -> Self {
        self.vision_range = range;
        self
    }

    #[must_use]
    pub fn with_fov(mut self, degrees: f32) -> Self {
        self.fov_deg = degrees;
        self
    }

    #[must_use]
    pub fn with_reaction_time(mut self, seconds: f32) -> Self {
        self.reaction_time = seconds;
        self
    }

    #[must_use]
    pub fn with_known_horizon(mut self, seconds: f32) -> Self {
        self.known_horizon = seconds;
        self
    }

    #[must_use]
    pub fn with_goal_tolerance(mut self, distance: f32) -> Self {
        self.goal_tolerance = distance;
        self
    }

    #[must_use]
    pub fn with_lookahead(mut self, distance: f32) -> Self {
        self.min_lookahead = distance;
        self
    }

    #[must_use]
    pub fn with_pruning(mut self, enabled: bool) -> Self {
        self.prune_paths = enabled;
        self
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field when a
    /// value is non-positive or inconsistent with a related one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
            if value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        }

        positive("tick_interval", self.tick_interval)?;
        positive("run_speed", self.run_speed)?;
        positive("walk_speed", self.walk_speed)?;
        positive("step_height", self.step_height)?;
        positive("hull_width", self.hull_width)?;
        positive("stand_height", self.stand_height)?;
        positive("crouch_height", self.crouch_height)?;
        positive("vision_range", self.vision_range)?;
        positive("known_horizon", self.known_horizon)?;
        positive("goal_tolerance", self.goal_tolerance)?;

        if self.walk_speed > self.run_speed {
            return Err(ConfigError::Invalid(format!(
                "walk_speed ({}) exceeds run_speed ({})",
                self.walk_speed, self.run_speed
            )));
        }
        if self.max_jump_height < self.step_height {
            return Err(ConfigError::Invalid(format!(
                "max_jump_height ({}) is below step_height ({})",
                self.max_jump_height, self.step_height
            )));
        }
        if self.death_drop_height < self.max_jump_height {
            return Err(ConfigError::Invalid(format!(
                "death_drop_height ({}) is below max_jump_height ({})",
                self.death_drop_height, self.max_jump_height
            )));
        }
        if self.crouch_height > self.stand_height {
            return Err(ConfigError::Invalid(format!(
                "crouch_height ({}) exceeds stand_height ({})",
                self.crouch_height, self.stand_height
            )));
        }
        if !(1.0..=360.0).contains(&self.fov_deg) {
            return Err(ConfigError::Invalid(format!(
                "fov_deg ({}) outside 1..=360",
                self.fov_deg
            )));
        }
        Ok(())
    }

    /// Loads a config from a `.ron` or `.json` file, validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O failure, parse failure, an
    /// unrecognized extension, or an invalid value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Self = match extension(path)?.as_str() {
            "ron" => ron::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?,
            "json" => serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?,
            other => return Err(ConfigError::UnknownFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Saves the config as `.ron` or `.json` depending on the extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on serialization or I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = match extension(path)?.as_str() {
            "ron" => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
            "json" => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(e.to_string()))?,
            other => return Err(ConfigError::UnknownFormat(other.to_string())),
        };
        fs::write(path, text).map_err(|e| ConfigError::Io(e.to_string()))?;
        log::info!("Saved nav config to {}", path.display());
        Ok(())
    }
}

fn extension(path: &Path) -> Result<String, ConfigError> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| ConfigError::UnknownFormat(path.display().to_string()))
}

/// Errors produced while loading, saving or validating a [`NavConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// Filesystem failure.
    Io(String),
    /// Parse or serialization failure.
    Parse(String),
    /// File extension is not `.ron` or `.json`.
    UnknownFormat(String),
    /// A field failed validation.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "config I/O error: {msg}"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::UnknownFormat(what) => write!(f, "unknown config format: {what}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ===== Tests =====
