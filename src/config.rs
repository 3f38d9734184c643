use crate::browser;
use serde::Deserialize;

/// Where the optional tuning override lives, relative to the host page
pub const CONFIG_PATH: &str = "catch.json";

/// Every number the simulation depends on.
/// - `Default` is the shipped tuning
/// - a `catch.json` next to the page may override any subset of fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// length of a session in whole seconds
    pub session_seconds: u32,
    /// how far below the bottom edge (px) an object must fall to count as missed
    pub miss_margin: f64,
    pub catcher: CatcherConfig,
    pub spawn: SpawnConfig,
    pub difficulty: DifficultyConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatcherConfig {
    pub max_width: f64,
    /// base width as a fraction of the surface width, capped by `max_width`
    pub width_ratio: f64,
    pub min_width: f64,
    pub height: f64,
    /// distance from the bottom of the surface to the catcher's top edge
    pub bottom_offset: f64,
    /// horizontal clearance kept on both sides of the surface
    pub edge_margin: f64,
    /// px moved per arrow key press
    pub nudge_step: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub base_interval_ms: f64,
    pub min_interval_ms: f64,
    /// interval reduction per whole elapsed second
    pub interval_decay_ms: f64,
    pub max_objects: usize,
    /// one extra concurrent object is allowed every this many seconds
    pub seconds_per_extra_object: u32,
    pub min_size: u32,
    /// sizes are drawn from [min_size, min_size + size_range)
    pub size_range: u32,
    /// objects start up to this far (plus their size) above the top edge
    pub height_band: f64,
    pub min_speed: f64,
    pub speed_range: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// growth of the difficulty factor per second
    pub rate: f64,
    /// catcher shrink per unit of difficulty above 1
    pub shrink_rate: f64,
    pub max_shrink: f64,
    /// per-step vertical acceleration, scaled by difficulty
    pub gravity: f64,
    pub wobble_amplitude: f64,
    pub wobble_frequency: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            session_seconds: 30,
            miss_margin: 40.0,
            catcher: CatcherConfig::default(),
            spawn: SpawnConfig::default(),
            difficulty: DifficultyConfig::default(),
        }
    }
}

impl Default for CatcherConfig {
    fn default() -> Self {
        CatcherConfig {
            max_width: 160.0,
            width_ratio: 0.35,
            min_width: 70.0,
            height: 22.0,
            bottom_offset: 44.0,
            edge_margin: 8.0,
            nudge_step: 20.0,
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            base_interval_ms: 1200.0,
            min_interval_ms: 300.0,
            interval_decay_ms: 30.0,
            max_objects: 8,
            seconds_per_extra_object: 6,
            min_size: 28,
            size_range: 36,
            height_band: 160.0,
            min_speed: 2.0,
            speed_range: 2.0,
        }
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        DifficultyConfig {
            rate: 0.06,
            shrink_rate: 0.12,
            max_shrink: 0.45,
            gravity: 0.01,
            wobble_amplitude: 0.6,
            wobble_frequency: 0.02,
        }
    }
}

impl GameConfig {
    /// Fetch the override file, falling back to the defaults.
    /// A missing override is the normal case, so failure only warns.
    pub async fn load(path: &str) -> Self {
        match browser::fetch_json::<GameConfig>(path).await {
            Ok(config) => {
                log::info!("Loaded tuning from {}", path);
                config
            }
            Err(err) => {
                log::warn!("Using default tuning ({} unavailable: {:#})", path, err);
                GameConfig::default()
            }
        }
    }

    /// Catcher width before any difficulty shrink, for a surface of `surface_width`
    pub fn base_catcher_width(&self, surface_width: f64) -> f64 {
        let catcher = &self.catcher;
        (surface_width * catcher.width_ratio)
            .floor()
            .min(catcher.max_width)
            .max(catcher.min_width)
    }
}
