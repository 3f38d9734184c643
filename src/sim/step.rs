//! One frame of simulation: difficulty curve, spawning, falling, catching.

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{FallingObject, GameEvent, Session};
use crate::config::{DifficultyConfig, GameConfig, SpawnConfig};

/// `1 + t * rate`, grows without bound
pub fn difficulty_factor(difficulty: &DifficultyConfig, elapsed_secs: f64) -> f64 {
    1.0 + elapsed_secs * difficulty.rate
}

/// Minimum gap between spawns after `whole_secs` of play
pub fn spawn_interval_ms(spawn: &SpawnConfig, whole_secs: u32) -> f64 {
    (spawn.base_interval_ms - spawn.interval_decay_ms * f64::from(whole_secs))
        .max(spawn.min_interval_ms)
}

/// How many objects may be on screen after `whole_secs` of play
pub fn max_live_objects(spawn: &SpawnConfig, whole_secs: u32) -> usize {
    let extra = whole_secs / spawn.seconds_per_extra_object.max(1);
    spawn.max_objects.min(1 + extra as usize)
}

/// Catcher width for a difficulty factor, never below the configured floor
pub fn catcher_width(config: &GameConfig, base_width: f64, factor: f64) -> f64 {
    let difficulty = &config.difficulty;
    let shrink = ((factor - 1.0) * difficulty.shrink_rate).min(difficulty.max_shrink);
    (base_width * (1.0 - shrink))
        .round()
        .max(config.catcher.min_width)
}

pub(crate) fn spawn_object(
    spawn: &SpawnConfig,
    surface_width: f64,
    rng: &mut Pcg32,
) -> FallingObject {
    let size = f64::from(spawn.min_size + rng.gen_range(0..spawn.size_range.max(1)));
    FallingObject {
        size,
        x: rng.gen::<f64>() * (surface_width - size).max(1.0) + size / 2.0,
        y: -rng.gen::<f64>() * spawn.height_band - size,
        vy: spawn.min_speed + rng.gen::<f64>() * spawn.speed_range,
        wobble: rng.gen::<f64>() * 2.0 - 1.0,
    }
}

/// Advance the session by one frame of `dt_ms`.
/// Difficulty is evaluated at the time the frame starts.
pub fn step(session: &mut Session, dt_ms: f64) {
    if !session.running {
        return;
    }

    let Session {
        config,
        surface,
        catcher,
        objects,
        score,
        elapsed_ms,
        last_spawn_ms,
        events,
        rng,
        ..
    } = session;

    let elapsed_secs = *elapsed_ms / 1000.0;
    let whole_secs = elapsed_secs.floor() as u32;
    let factor = difficulty_factor(&config.difficulty, elapsed_secs);

    if *elapsed_ms - *last_spawn_ms > spawn_interval_ms(&config.spawn, whole_secs)
        && objects.len() < max_live_objects(&config.spawn, whole_secs)
    {
        objects.push(spawn_object(&config.spawn, surface.width, rng));
        *last_spawn_ms = *elapsed_ms;
    }

    catcher.refit(config, factor, surface.width);

    let catch_zone = catcher.bounds(surface.height - config.catcher.bottom_offset);
    let miss_line = surface.height + config.miss_margin;
    let difficulty = &config.difficulty;

    objects.retain_mut(|object| {
        object.advance(difficulty, factor);

        if object.bounds().intersects(&catch_zone) {
            *score += 1;
            events.push(GameEvent::Caught { score: *score });
            return false;
        }
        if object.y - object.size / 2.0 > miss_line {
            events.push(GameEvent::Missed);
            return false;
        }
        true
    });

    *elapsed_ms += dt_ms;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Surface;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    const DT: f64 = 1000.0 / 60.0;

    fn session() -> Session {
        Session::new(
            GameConfig::default(),
            Surface::new(400.0, 600.0),
            Pcg32::seed_from_u64(42),
        )
    }

    fn object(x: f64, y: f64, size: f64, vy: f64) -> FallingObject {
        FallingObject {
            size,
            x,
            y,
            vy,
            wobble: 0.0,
        }
    }

    #[test]
    fn difficulty_grows_six_percent_per_second() {
        let difficulty = DifficultyConfig::default();
        assert_relative_eq!(difficulty_factor(&difficulty, 0.0), 1.0);
        assert_relative_eq!(difficulty_factor(&difficulty, 10.0), 1.6);
        assert_relative_eq!(difficulty_factor(&difficulty, 2.5), 1.15);
    }

    #[test]
    fn spawn_interval_shrinks_to_floor() {
        let spawn = SpawnConfig::default();
        assert_relative_eq!(spawn_interval_ms(&spawn, 0), 1200.0);
        assert_relative_eq!(spawn_interval_ms(&spawn, 10), 900.0);
        assert_relative_eq!(spawn_interval_ms(&spawn, 30), 300.0);
        assert_relative_eq!(spawn_interval_ms(&spawn, 120), 300.0);
    }

    #[test]
    fn live_object_cap_grows_every_six_seconds() {
        let spawn = SpawnConfig::default();
        assert_eq!(max_live_objects(&spawn, 0), 1);
        assert_eq!(max_live_objects(&spawn, 5), 1);
        assert_eq!(max_live_objects(&spawn, 6), 2);
        assert_eq!(max_live_objects(&spawn, 29), 5);
        assert_eq!(max_live_objects(&spawn, 600), 8);
    }

    #[test]
    fn catcher_shrinks_with_difficulty_down_to_floor() {
        let config = GameConfig::default();
        assert_relative_eq!(catcher_width(&config, 140.0, 1.0), 140.0);
        // shrink = 0.6 * 0.12 = 0.072
        assert_relative_eq!(catcher_width(&config, 140.0, 1.6), 130.0);
        // shrink capped at 45%
        assert_relative_eq!(catcher_width(&config, 160.0, 100.0), 88.0);
        assert_relative_eq!(catcher_width(&config, 120.0, 100.0), 70.0);
    }

    #[test]
    fn spawned_objects_stay_in_range() {
        let spawn = SpawnConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..500 {
            let object = spawn_object(&spawn, 400.0, &mut rng);
            assert!((28.0..64.0).contains(&object.size));
            assert_eq!(object.size.fract(), 0.0);
            assert!(object.x >= object.size / 2.0);
            assert!(object.x <= 400.0 - object.size / 2.0);
            assert!(object.y <= -object.size);
            assert!(object.y >= -160.0 - object.size);
            assert!((2.0..4.0).contains(&object.vy));
            assert!((-1.0..1.0).contains(&object.wobble));
        }
    }

    #[test]
    fn first_step_moves_object_by_its_speed() {
        let mut session = session();
        session.objects = vec![object(200.0, -40.0, 40.0, 2.0)];

        step(&mut session, DT);

        assert_eq!(session.objects.len(), 1);
        // vy picks up gravity before moving, f(0) = 1
        assert_relative_eq!(session.objects[0].y, -40.0 + 2.01, epsilon = 1e-9);
        assert_eq!(session.score, 0);
        assert_relative_eq!(session.elapsed_ms, DT);
    }

    #[test]
    fn object_overlapping_catcher_is_caught() {
        let mut session = session();
        session.set_catcher_center_x(220.0);
        assert_relative_eq!(session.catcher.x, 150.0);
        assert_relative_eq!(session.catcher.width, 140.0);
        session.objects = vec![object(200.0, 550.0, 30.0, 0.0)];

        step(&mut session, DT);

        assert_eq!(session.score, 1);
        assert!(session.objects.is_empty());
        assert_eq!(session.drain_events(), vec![GameEvent::Caught { score: 1 }]);
    }

    #[test]
    fn catch_removes_only_the_caught_object() {
        let mut session = session();
        session.set_catcher_center_x(220.0);
        session.objects = vec![
            object(50.0, 100.0, 30.0, 2.0),
            object(200.0, 560.0, 30.0, 0.0),
            object(350.0, -20.0, 30.0, 2.0),
        ];

        step(&mut session, DT);

        assert_eq!(session.score, 1);
        assert_eq!(session.objects.len(), 2);
        assert!(session.objects[0].x < 100.0);
        assert!(session.objects[1].x > 300.0);
    }

    #[test]
    fn object_past_bottom_margin_is_missed() {
        let mut session = session();
        let size = 30.0;
        session.objects = vec![object(50.0, 600.0 + 41.0 + size / 2.0, size, 3.0)];

        step(&mut session, DT);

        assert_eq!(session.score, 0);
        assert!(session.objects.is_empty());
        assert_eq!(session.drain_events(), vec![GameEvent::Missed]);
    }

    #[test]
    fn object_just_below_screen_is_kept() {
        let mut session = session();
        session.objects = vec![object(50.0, 610.0, 30.0, 0.0)];

        step(&mut session, DT);

        assert_eq!(session.objects.len(), 1);
        assert_eq!(session.score, 0);
    }

    #[test]
    fn stopped_session_does_not_step() {
        let mut session = session();
        session.running = false;
        let before = session.objects.clone();

        step(&mut session, DT);

        assert_eq!(session.objects, before);
        assert_relative_eq!(session.elapsed_ms, 0.0);
    }

    #[test]
    fn spawns_wait_for_the_interval() {
        let mut session = session();
        session.objects.clear();

        // interval is 1170ms once a full second has passed
        for _ in 0..71 {
            step(&mut session, DT);
        }
        assert!(session.objects.is_empty());

        step(&mut session, DT);
        assert_eq!(session.objects.len(), 1);
        assert!(session.last_spawn_ms > 1170.0);
        assert!(session.last_spawn_ms < 1170.0 + DT);
    }

    #[test]
    fn invariants_hold_over_a_long_session() {
        let mut session = session();
        let mut caught = 0;
        let mut missed = 0;

        for frame in 0..(90 * 60) {
            match frame {
                1000 => session.resize(900.0, 700.0),
                2500 => session.resize(220.0, 480.0),
                4000 => session.resize(640.0, 640.0),
                _ => {}
            }
            if frame % 7 == 0 {
                // sweep the pointer well past both edges
                session.set_catcher_center_x(f64::from(frame % 1200) - 300.0);
            }

            let score_before = session.score;
            let count_before = session.objects.len();
            step(&mut session, DT);

            let catcher = &session.catcher;
            assert!(catcher.width >= 70.0);
            assert!(catcher.width <= catcher.base_width);
            assert!(catcher.x >= 8.0);
            assert!(catcher.x <= session.surface.width - catcher.width - 8.0);

            let whole_secs = (session.elapsed_ms / 1000.0).floor() as u32;
            assert!(session.objects.len() <= 8usize.min(1 + whole_secs as usize / 6));

            let events = session.drain_events();
            let catches = events
                .iter()
                .filter(|event| matches!(event, GameEvent::Caught { .. }))
                .count();
            let misses = events.iter().filter(|event| **event == GameEvent::Missed).count();
            assert_eq!(session.score - score_before, catches as u32);
            assert!(session.objects.len() + catches + misses >= count_before);
            caught += catches;
            missed += misses;
        }

        assert!(caught + missed > 0);
        assert_eq!(session.score as usize, caught);
    }
}
