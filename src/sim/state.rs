//! Session state and the operations that mutate it outside of a frame step:
//! catcher input, the one second countdown, resize and restart.

use rand_pcg::Pcg32;

use super::step::{catcher_width, difficulty_factor, spawn_object};
use crate::config::{DifficultyConfig, GameConfig};

pub const CATCHER_COLOR: &str = "#c68642";

/// Drawable area in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Surface { width, height }
    }
}

/// Axis aligned box, edges inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.right >= other.left
            && self.left <= other.right
            && self.bottom >= other.top
            && self.top <= other.bottom
    }
}

/// A croissant on its way down.
/// - `(x, y)` is the center, `size` the diameter
/// - negative `y` means above the visible area
#[derive(Debug, Clone, PartialEq)]
pub struct FallingObject {
    pub size: f64,
    pub x: f64,
    pub y: f64,
    pub vy: f64,
    pub wobble: f64,
}

impl FallingObject {
    /// accelerate, fall, then drift sideways
    pub fn advance(&mut self, difficulty: &DifficultyConfig, factor: f64) {
        self.vy += difficulty.gravity * factor;
        self.y += self.vy * factor;
        self.x += ((self.y + self.wobble * 10.0) * difficulty.wobble_frequency).sin()
            * difficulty.wobble_amplitude;
    }

    /// Collision box: a square of side `size` around the center
    pub fn bounds(&self) -> Bounds {
        let half = self.size / 2.0;
        Bounds {
            left: self.x - half,
            top: self.y - half,
            right: self.x + half,
            bottom: self.y + half,
        }
    }
}

/// The basket.
/// `width` is derived from `base_width` and the difficulty every step,
/// `x` is the left edge and always kept inside the edge margins.
#[derive(Debug, Clone, PartialEq)]
pub struct Catcher {
    pub base_width: f64,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub color: &'static str,
}

impl Catcher {
    pub fn new(config: &GameConfig, surface: Surface) -> Self {
        let base_width = config.base_catcher_width(surface.width);
        let mut catcher = Catcher {
            base_width,
            width: base_width,
            height: config.catcher.height,
            x: (surface.width - base_width) / 2.0,
            color: CATCHER_COLOR,
        };
        catcher.clamp_x(surface.width, config.catcher.edge_margin);
        catcher
    }

    /// Keep the catcher `margin` px away from both edges.
    /// On a surface too narrow for that the left margin wins.
    pub fn clamp_x(&mut self, surface_width: f64, margin: f64) {
        self.x = self.x.min(surface_width - self.width - margin).max(margin);
    }

    /// Recompute the width for the current difficulty and re-clamp
    pub fn refit(&mut self, config: &GameConfig, factor: f64, surface_width: f64) {
        self.width = catcher_width(config, self.base_width, factor);
        self.clamp_x(surface_width, config.catcher.edge_margin);
    }

    pub fn bounds(&self, top: f64) -> Bounds {
        Bounds {
            left: self.x,
            top,
            right: self.x + self.width,
            bottom: top + self.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// Things the outside world (HUD) wants to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Caught { score: u32 },
    Missed,
    Tick { time_remaining: u32 },
    GameOver { final_score: u32 },
}

/// Everything that makes up one play session.
/// `step` is the only per-frame mutator; the methods below cover input,
/// the countdown, resize and restart.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: GameConfig,
    pub surface: Surface,
    pub catcher: Catcher,
    pub objects: Vec<FallingObject>,
    pub score: u32,
    pub time_remaining: u32,
    pub running: bool,
    /// simulated time since the session started
    pub elapsed_ms: f64,
    pub last_spawn_ms: f64,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) rng: Pcg32,
}

impl Session {
    pub fn new(config: GameConfig, surface: Surface, rng: Pcg32) -> Self {
        let catcher = Catcher::new(&config, surface);
        let mut session = Session {
            time_remaining: config.session_seconds,
            config,
            surface,
            catcher,
            objects: Vec::new(),
            score: 0,
            running: true,
            elapsed_ms: 0.0,
            last_spawn_ms: 0.0,
            events: Vec::new(),
            rng,
        };
        session.spawn_initial();
        session
    }

    fn spawn_initial(&mut self) {
        let object = spawn_object(&self.config.spawn, self.surface.width, &mut self.rng);
        self.objects.push(object);
    }

    pub fn difficulty(&self) -> f64 {
        difficulty_factor(&self.config.difficulty, self.elapsed_ms / 1000.0)
    }

    /// Surface changed size: re-derive catcher geometry only
    pub fn resize(&mut self, width: f64, height: f64) {
        self.surface = Surface::new(width, height);
        self.catcher.base_width = self.config.base_catcher_width(width);
        let factor = self.difficulty();
        self.catcher.refit(&self.config, factor, width);
    }

    /// Center the catcher under a surface-local x coordinate
    pub fn set_catcher_center_x(&mut self, x: f64) {
        self.catcher.x = x - self.catcher.width / 2.0;
        self.catcher
            .clamp_x(self.surface.width, self.config.catcher.edge_margin);
    }

    pub fn nudge_catcher(&mut self, direction: Direction) {
        self.catcher.x += direction.sign() * self.config.catcher.nudge_step;
        self.catcher
            .clamp_x(self.surface.width, self.config.catcher.edge_margin);
    }

    /// One second of the countdown. Ends the session when it hits zero.
    pub fn tick_second(&mut self) {
        if !self.running {
            return;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        self.events.push(GameEvent::Tick {
            time_remaining: self.time_remaining,
        });
        if self.time_remaining == 0 {
            self.running = false;
            self.events.push(GameEvent::GameOver {
                final_score: self.score,
            });
        }
    }

    /// Start over from scratch; only the surface and the rng carry over
    pub fn restart(&mut self) {
        self.score = 0;
        self.time_remaining = self.config.session_seconds;
        self.running = true;
        self.elapsed_ms = 0.0;
        self.last_spawn_ms = 0.0;
        self.events.clear();
        self.objects.clear();
        self.catcher = Catcher::new(&self.config, self.surface);
        self.spawn_initial();
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
