use tracing::{debug, info, trace};

use crate::collision::slide_move;
use crate::config::SimConfig;
use crate::constants::get_zombie_count;
use crate::error::{SimError, SimResult};
use crate::maze::{generate_level_maze, Maze};
use crate::pathfinding::{shortest_path, CellSet};
use crate::rng::Rng;
use crate::types::{
    CellPos, Direction, Exit, Intent, LevelSummary, MazeView, Outcome, RuntimeEvent, Snapshot,
    Vec2f,
};

mod spawn_system;
mod utils;
mod zombie_system;

use self::utils::{clamp_cell, intent_displacement};
pub use self::zombie_system::{step_zombie, Zombie, ZombieTick, ZombieWorld};

#[derive(Clone, Debug)]
pub struct LevelState {
    pub level: u32,
    pub maze: Maze,
    pub exit: Exit,
    // Shortest route from the start cell to the exit, both inclusive.
    pub main_path: Vec<CellPos>,
    pub main_path_set: CellSet,
}

impl LevelState {
    fn build(config: &SimConfig, level: u32, rng: &mut Rng) -> SimResult<Self> {
        let maze = generate_level_maze(&config.maze, level, rng)?;
        let exit = maze
            .exit()
            .ok_or_else(|| SimError::InvalidConfiguration("generated maze has no exit".to_string()))?;
        let main_path = shortest_path(&maze, CellPos::new(0, 0), exit.cell());
        let main_path_set = CellSet::from_cells(maze.width(), maze.height(), &main_path);
        Ok(Self {
            level,
            maze,
            exit,
            main_path,
            main_path_set,
        })
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    config: SimConfig,
    world: LevelState,

    rng: Rng,
    player: Vec2f,
    zombies: Vec<Zombie>,
    events: Vec<RuntimeEvent>,

    outcome: Outcome,
    captured_by: Option<u32>,
    elapsed_secs: f32,
    tick_counter: u64,
}

impl GameEngine {
    pub fn new(config: SimConfig, level: u32, seed: u32) -> SimResult<Self> {
        config.validate()?;
        let level = level.max(1);
        let mut rng = Rng::new(seed);
        let world = LevelState::build(&config, level, &mut rng)?;
        let mut engine = Self {
            config,
            world,
            rng,
            player: CellPos::new(0, 0).center(),
            zombies: Vec::new(),
            events: Vec::new(),
            outcome: Outcome::Playing,
            captured_by: None,
            elapsed_secs: 0.0,
            tick_counter: 0,
        };
        engine.start_level();
        Ok(engine)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn level(&self) -> u32 {
        self.world.level
    }

    pub fn world(&self) -> &LevelState {
        &self.world
    }

    pub fn player(&self) -> Vec2f {
        self.player
    }

    pub fn zombies(&self) -> &[Zombie] {
        &self.zombies
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_secs
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn is_ended(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn solution_path(&self) -> &[CellPos] {
        &self.world.main_path
    }

    pub fn restart(&mut self) -> SimResult<()> {
        self.load_level(self.world.level)
    }

    pub fn advance_level(&mut self) -> SimResult<()> {
        let next = self.world.level.checked_add(1).ok_or(SimError::InvalidDimension {
            width: self.world.maze.width(),
            height: self.world.maze.height(),
        })?;
        self.load_level(next)
    }

    fn load_level(&mut self, level: u32) -> SimResult<()> {
        // Built in full before anything is replaced.
        let world = LevelState::build(&self.config, level, &mut self.rng)?;
        self.world = world;
        self.start_level();
        Ok(())
    }

    fn start_level(&mut self) {
        self.player = CellPos::new(0, 0).center();
        self.outcome = Outcome::Playing;
        self.captured_by = None;
        self.elapsed_secs = 0.0;
        self.tick_counter = 0;
        self.spawn_zombies();
        self.events.push(RuntimeEvent::LevelStarted {
            level: self.world.level,
            width: self.world.maze.width(),
            height: self.world.maze.height(),
            zombies: self.zombies.len(),
        });
        debug!(
            level = self.world.level,
            zombies = self.zombies.len(),
            main_path = self.world.main_path.len(),
            "level started"
        );
    }

    pub fn step(&mut self, dt: f32, intent: Intent) -> Outcome {
        if self.outcome.is_terminal() || !(dt.is_finite() && dt > 0.0) {
            return self.outcome;
        }
        let dt = dt.min(self.config.max_delta_secs);
        self.tick_counter += 1;
        self.elapsed_secs += dt;

        self.update_player(dt, intent);
        self.update_zombies(dt);

        if self.outcome == Outcome::Playing {
            let exit = self.world.exit.cell().center();
            if self.player.distance(exit) < self.config.player.exit_radius {
                self.outcome = Outcome::Exited;
                self.events.push(RuntimeEvent::ExitReached {
                    elapsed_secs: self.elapsed_secs,
                });
                info!(level = self.world.level, elapsed = self.elapsed_secs, "exit reached");
            }
        }
        self.outcome
    }

    fn update_player(&mut self, dt: f32, intent: Intent) {
        if intent.is_idle() {
            return;
        }
        let (dx, dz) = intent_displacement(intent, self.config.player.speed * dt);
        let policy = self.config.collision.policy();
        self.player = slide_move(self.player, dx, dz, &self.world.maze, &policy);
    }

    fn update_zombies(&mut self, dt: f32) {
        let world = ZombieWorld {
            maze: &self.world.maze,
            main_path: &self.world.main_path_set,
            player: self.player,
            config: &self.config.zombies,
            collision: self.config.collision.policy(),
            capture_radius: self.config.player.capture_radius,
        };

        for zombie in &mut self.zombies {
            let before = zombie.state;
            let tick = step_zombie(zombie, &world, &mut self.rng, dt);
            if zombie.state != before {
                trace!(zombie = zombie.id, from = ?before, to = ?zombie.state, "zombie state changed");
                self.events.push(RuntimeEvent::ZombieStateChanged {
                    zombie_id: zombie.id,
                    from: before,
                    to: zombie.state,
                });
            }
            if tick.captured && self.captured_by.is_none() {
                self.captured_by = Some(zombie.id);
                self.outcome = Outcome::Captured;
                self.events.push(RuntimeEvent::PlayerCaptured { zombie_id: zombie.id });
                info!(
                    level = self.world.level,
                    zombie = zombie.id,
                    elapsed = self.elapsed_secs,
                    "player captured"
                );
            }
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            level: self.world.level,
            elapsed_secs: self.elapsed_secs,
            outcome: self.outcome,
            player: self.player,
            zombies: self.zombies.iter().map(Zombie::view).collect(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn maze_view(&self) -> MazeView {
        self.world.maze.to_view(self.world.exit, &self.world.main_path)
    }

    pub fn build_summary(&self) -> LevelSummary {
        LevelSummary {
            level: self.world.level,
            outcome: self.outcome,
            elapsed_secs: self.elapsed_secs,
            ticks: self.tick_counter,
            main_path_length: self.world.main_path.len(),
            captured_by: self.captured_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    const DT: f32 = 1.0 / 60.0;

    fn engine(seed: u32) -> GameEngine {
        GameEngine::new(SimConfig::default(), 1, seed).expect("default config is valid")
    }

    fn open_level(width: i32, height: i32, exit: Exit) -> LevelState {
        let mut maze = Maze::with_all_walls(width, height).expect("valid size");
        for z in 0..height {
            for x in 0..width {
                maze.carve(x, z, Direction::East);
                maze.carve(x, z, Direction::South);
            }
        }
        maze.set_exit(exit).expect("exit on boundary");
        let main_path = shortest_path(&maze, CellPos::new(0, 0), exit.cell());
        let main_path_set = CellSet::from_cells(width, height, &main_path);
        LevelState {
            level: 1,
            maze,
            exit,
            main_path,
            main_path_set,
        }
    }

    fn walk_along(engine: &GameEngine) -> Intent {
        let here = engine.player().cell();
        let path = engine.solution_path();
        let next = path
            .iter()
            .position(|cell| *cell == here)
            .and_then(|idx| path.get(idx + 1))
            .copied()
            .unwrap_or(engine.world().exit.cell());
        let goal = next.center();
        let pos = engine.player();
        Intent {
            up: goal.z < pos.z - 0.05,
            down: goal.z > pos.z + 0.05,
            left: goal.x < pos.x - 0.05,
            right: goal.x > pos.x + 0.05,
        }
    }

    #[test]
    fn same_seed_produces_same_progression() {
        let mut a = engine(1234);
        let mut b = engine(1234);
        assert_eq!(a.maze_view().walls, b.maze_view().walls);
        for _ in 0..600 {
            let intent = walk_along(&a);
            assert_eq!(intent, walk_along(&b));
            assert_eq!(a.step(DT, intent), b.step(DT, intent));
            let sa = a.build_snapshot(true);
            let sb = b.build_snapshot(true);
            assert_eq!(sa.player, sb.player);
            assert_eq!(sa.events, sb.events);
            for (za, zb) in sa.zombies.iter().zip(sb.zombies.iter()) {
                assert_eq!(za.x.to_bits(), zb.x.to_bits());
                assert_eq!(za.z.to_bits(), zb.z.to_bits());
                assert_eq!(za.state, zb.state);
            }
        }
    }

    #[test]
    fn invalid_config_fails_fast() {
        let mut config = SimConfig::default();
        config.maze.base_width = 0;
        let err = GameEngine::new(config, 1, 1).expect_err("zero width must be rejected");
        assert_eq!(err, SimError::InvalidDimension { width: 0, height: 10 });
    }

    #[test]
    fn fixed_seed_level_one_has_a_sound_main_path() {
        let engine = engine(2024);
        let view = engine.maze_view();
        assert_eq!((view.width, view.height), (10, 10));
        let exit = view.exit;
        let manhattan = CellPos::new(0, 0).manhattan(exit.cell()) as usize;
        assert!(view.main_path.len() >= manhattan + 1);
        assert_eq!(view.main_path.first(), Some(&CellPos::new(0, 0)));
        assert_eq!(view.main_path.last(), Some(&exit.cell()));
    }

    #[test]
    fn zombie_count_follows_grid_area() {
        let engine = engine(3);
        assert_eq!(engine.zombies().len(), 2);
        let bigger = GameEngine::new(SimConfig::default(), 3, 3).expect("valid config");
        // Level 3 is 20x20: 400 / 90 = 4.
        assert_eq!(bigger.zombies().len(), 4);
    }

    #[test]
    fn player_slides_along_open_axis() {
        let config = SimConfig::preset(Preset::Classic);
        let mut engine = GameEngine::new(config.clone(), 1, 9).expect("valid config");
        let mut level = open_level(4, 4, Exit { x: 3, z: 3, side: Direction::South });
        // From (1,1) south is walled off, east stays open.
        level.maze.build_wall(1, 1, Direction::South);
        engine.world = level;
        engine.zombies.clear();
        engine.player = CellPos::new(1, 1).center();
        let intent = Intent {
            down: true,
            right: true,
            ..Intent::none()
        };
        engine.step(0.05, intent);
        assert_eq!(engine.player().z, 1.5);
        assert!(engine.player().x > 1.5);
    }

    #[test]
    fn capture_at_exact_radius_does_not_latch() {
        let mut config = SimConfig::default();
        config.player.capture_radius = 0.5;
        config.zombies.chase_speed = 0.0;
        let mut engine = GameEngine::new(config.clone(), 1, 11).expect("valid config");
        engine.world = open_level(6, 1, Exit { x: 5, z: 0, side: Direction::East });
        // Keep the corridor out of the protected set so the zombie can sit next to the player.
        engine.world.main_path_set = CellSet::new(6, 1);
        engine.zombies = vec![Zombie::new(7, CellPos::new(2, 0), 5.0, &engine.world.main_path_set)];
        engine.player = Vec2f::new(2.0, 0.5);

        assert_eq!(engine.step(DT, Intent::none()), Outcome::Playing);
        engine.player = Vec2f::new(2.01, 0.5);
        assert_eq!(engine.step(DT, Intent::none()), Outcome::Captured);
        assert_eq!(engine.build_summary().captured_by, Some(7));

        let ticks = engine.tick();
        assert_eq!(engine.step(DT, Intent::none()), Outcome::Captured);
        assert_eq!(engine.tick(), ticks);
        let captures = engine
            .build_snapshot(true)
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::PlayerCaptured { .. }))
            .count();
        assert_eq!(captures, 1);
    }

    #[test]
    fn reaching_the_exit_latches_exited() {
        let config = SimConfig::default();
        let mut engine = GameEngine::new(config.clone(), 1, 13).expect("valid config");
        engine.world = open_level(3, 1, Exit { x: 2, z: 0, side: Direction::East });
        engine.zombies.clear();
        let right = Intent {
            right: true,
            ..Intent::none()
        };
        let mut outcome = Outcome::Playing;
        for _ in 0..120 {
            outcome = engine.step(DT, right);
            if outcome.is_terminal() {
                break;
            }
        }
        assert_eq!(outcome, Outcome::Exited);
        assert!(engine.player().distance(CellPos::new(2, 0).center()) < config.player.exit_radius);
        let frozen = engine.player();
        engine.step(DT, right);
        assert_eq!(engine.player(), frozen);
        assert!(engine.elapsed_secs() > 0.0);
    }

    #[test]
    fn oversized_level_is_rejected_without_panicking() {
        assert!(matches!(
            GameEngine::new(SimConfig::default(), 100_000, 1),
            Err(SimError::InvalidDimension { .. })
        ));
        assert!(GameEngine::new(SimConfig::default(), u32::MAX, 1).is_err());
    }

    #[test]
    fn failed_advance_keeps_the_current_level() {
        let mut config = SimConfig::default();
        config.maze.growth_per_level = 2000;
        let mut engine = GameEngine::new(config, 1, 4).expect("level 1 fits");
        assert!(matches!(
            engine.advance_level(),
            Err(SimError::InvalidDimension { .. })
        ));
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.maze_view().width, 10);
        assert_eq!(engine.outcome(), Outcome::Playing);
    }

    #[test]
    fn restart_and_advance_rebuild_the_level() {
        let mut engine = engine(21);
        engine.step(DT, Intent::none());
        engine.restart().expect("restart");
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.tick(), 0);
        assert_eq!(engine.outcome(), Outcome::Playing);
        assert_eq!(engine.player(), Vec2f::new(0.5, 0.5));

        engine.advance_level().expect("advance");
        assert_eq!(engine.level(), 2);
        let view = engine.maze_view();
        assert_eq!((view.width, view.height), (15, 15));
        let started = engine
            .build_snapshot(true)
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::LevelStarted { .. }))
            .count();
        assert_eq!(started, 3);
    }

    #[test]
    fn zombies_never_rest_on_the_main_path() {
        for seed in [5u32, 77, 901] {
            let mut engine = GameEngine::new(SimConfig::default(), 2, seed).expect("valid config");
            for _ in 0..1_200 {
                let intent = walk_along(&engine);
                if engine.step(DT, intent).is_terminal() {
                    break;
                }
                for zombie in engine.zombies() {
                    assert!(
                        !engine.world().main_path_set.contains(zombie.cell()),
                        "seed {seed}: zombie {} on main path",
                        zombie.id
                    );
                }
            }
        }
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut engine = engine(8);
        let before = engine.build_snapshot(false);
        for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            engine.step(dt, Intent { right: true, ..Intent::none() });
        }
        assert_eq!(engine.tick(), before.tick);
        assert_eq!(engine.player(), before.player);
    }

    #[test]
    fn large_dt_is_clamped() {
        let mut engine = engine(8);
        engine.step(10.0, Intent::none());
        assert_eq!(engine.elapsed_secs(), engine.config().max_delta_secs);
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = engine(31);
        let peek = engine.build_snapshot(false);
        assert!(peek.events.is_empty());
        let first = engine.build_snapshot(true);
        assert!(matches!(first.events.first(), Some(RuntimeEvent::LevelStarted { level: 1, .. })));
        assert!(engine.build_snapshot(true).events.is_empty());
    }
}
