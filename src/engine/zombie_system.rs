use std::collections::VecDeque;

use tracing::trace;

use super::utils::{approach, clamp_cell};
use crate::collision::{blocked_at, CollisionPolicy};
use crate::config::ZombieConfig;
use crate::maze::Maze;
use crate::pathfinding::{nearest_matching, shortest_path, CellSet};
use crate::rng::Rng;
use crate::sight::can_see;
use crate::types::{CellPos, Direction, Vec2f, ZombieState, ZombieView};

#[derive(Clone, Debug, PartialEq)]
pub struct Zombie {
    pub id: u32,
    pub pos: Vec2f,
    pub state: ZombieState,
    // Front is the next cell to walk to.
    pub path: VecDeque<CellPos>,
    pub think: f32,
    pub chase_timer: f32,
    // Most recent cell occupied off the main path.
    pub last_safe: Option<CellPos>,
}

impl Zombie {
    pub fn new(id: u32, spawn: CellPos, think: f32, main_path: &CellSet) -> Self {
        Self {
            id,
            pos: spawn.center(),
            state: ZombieState::Roam,
            path: VecDeque::new(),
            think,
            chase_timer: 0.0,
            last_safe: (!main_path.contains(spawn)).then_some(spawn),
        }
    }

    pub fn cell(&self) -> CellPos {
        self.pos.cell()
    }

    pub fn view(&self) -> ZombieView {
        ZombieView {
            id: self.id,
            x: self.pos.x,
            z: self.pos.z,
            state: self.state,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ZombieWorld<'a> {
    pub maze: &'a Maze,
    pub main_path: &'a CellSet,
    pub player: Vec2f,
    pub config: &'a ZombieConfig,
    pub collision: CollisionPolicy,
    pub capture_radius: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZombieTick {
    pub captured: bool,
    pub snapped: bool,
    pub replanned: bool,
}

enum Advance {
    Moved,
    Arrived,
    Blocked,
}

pub fn step_zombie(zombie: &mut Zombie, world: &ZombieWorld<'_>, rng: &mut Rng, dt: f32) -> ZombieTick {
    let mut tick = ZombieTick::default();
    let start_cell = zombie.cell();

    if world.main_path.contains(start_cell) {
        snap_to_safety(zombie, world, start_cell);
        tick.snapped = true;
    } else {
        let player_cell = world.player.cell();
        if can_see(world.maze, start_cell, player_cell, world.config.visibility_radius) {
            tick.replanned = chase(zombie, world, rng, dt, start_cell, player_cell);
        } else {
            if zombie.state == ZombieState::Chase {
                lose_track(zombie, world.config, rng);
            }
            let mut roam = zombie.state == ZombieState::Roam;
            if zombie.state == ZombieState::Confused {
                roam = confused(zombie, world, rng, dt, start_cell);
            }
            if roam {
                wander(zombie, world, rng, dt, start_cell);
            }
        }

        if blocked_at(zombie.pos, world.maze, &world.collision) {
            zombie.pos = start_cell.center();
        }
    }

    let cell = zombie.cell();
    if !world.main_path.contains(cell) {
        zombie.last_safe = Some(cell);
    }
    tick.captured = zombie.pos.distance(world.player) < world.capture_radius;
    tick
}

fn snap_to_safety(zombie: &mut Zombie, world: &ZombieWorld<'_>, cell: CellPos) {
    let target = zombie
        .last_safe
        .filter(|safe| !world.main_path.contains(*safe))
        .or_else(|| nearest_matching(world.maze, cell, |c| !world.main_path.contains(c)))
        .unwrap_or(cell);
    trace!(zombie = zombie.id, from = ?cell, to = ?target, "zombie moved off main path");
    zombie.pos = target.center();
    zombie.state = ZombieState::Roam;
    zombie.path.clear();
    zombie.chase_timer = 0.0;
}

// Returns whether a new plan was computed.
fn chase(
    zombie: &mut Zombie,
    world: &ZombieWorld<'_>,
    rng: &mut Rng,
    dt: f32,
    cell: CellPos,
    player_cell: CellPos,
) -> bool {
    let config = world.config;
    zombie.state = ZombieState::Chase;
    zombie.chase_timer += dt;
    zombie.think -= dt;

    let mut replanned = false;
    if zombie.path.is_empty() || zombie.think <= 0.0 {
        zombie.think = config.replan_delay.sample(rng);
        zombie.path = shortest_path(world.maze, cell, player_cell)
            .into_iter()
            .filter(|node| !world.main_path.contains(*node))
            .take(config.path_lookahead)
            .collect();
        replanned = true;
        trace!(zombie = zombie.id, nodes = zombie.path.len(), "chase re-planned");
    }

    if zombie.chase_timer <= config.chase_duration_cap && !zombie.path.is_empty() {
        match advance(zombie, world, config.chase_speed * dt) {
            Advance::Moved => {}
            Advance::Arrived => {
                zombie.path.pop_front();
            }
            Advance::Blocked => {
                zombie.path.clear();
                zombie.state = ZombieState::Confused;
                zombie.chase_timer = 0.0;
            }
        }
    } else {
        lose_track(zombie, config, rng);
    }
    replanned
}

fn lose_track(zombie: &mut Zombie, config: &ZombieConfig, rng: &mut Rng) {
    zombie.state = ZombieState::Confused;
    zombie.chase_timer = 0.0;
    zombie.path.clear();
    zombie.think = config.lost_sight_delay.sample(rng);
}

// Returns true when the zombie gave up and should roam this same tick.
fn confused(zombie: &mut Zombie, world: &ZombieWorld<'_>, rng: &mut Rng, dt: f32, cell: CellPos) -> bool {
    let config = world.config;
    zombie.think -= dt;
    if zombie.think <= 0.0 {
        for _ in 0..config.confused_tries {
            let (dx, dz) = Direction::ALL[rng.pick_index(4)].delta();
            let next = clamp_cell(world.maze, cell.x + dx, cell.z + dz);
            if is_wander_target(world, next) {
                zombie.path = VecDeque::from([next]);
                break;
            }
        }
        zombie.think = config.confused_delay.sample(rng);
        if zombie.path.is_empty() {
            zombie.state = ZombieState::Roam;
            return true;
        }
    }

    if zombie.path.is_empty() {
        zombie.state = ZombieState::Roam;
        return true;
    }
    match advance(zombie, world, config.confused_speed * dt) {
        Advance::Moved => {}
        Advance::Arrived => {
            zombie.path.pop_front();
            if zombie.path.is_empty() {
                zombie.state = ZombieState::Roam;
            }
        }
        Advance::Blocked => {
            zombie.path.clear();
            zombie.state = ZombieState::Roam;
        }
    }
    false
}

fn wander(zombie: &mut Zombie, world: &ZombieWorld<'_>, rng: &mut Rng, dt: f32, cell: CellPos) {
    let config = world.config;
    zombie.state = ZombieState::Roam;
    zombie.think -= dt;
    if zombie.think <= 0.0 {
        zombie.think = config.roam_delay.sample(rng);
        zombie.path.clear();
        let radius = config.roam_radius;
        for _ in 0..config.roam_tries {
            let next = clamp_cell(
                world.maze,
                cell.x + rng.int(-radius, radius),
                cell.z + rng.int(-radius, radius),
            );
            if is_wander_target(world, next) {
                zombie.path.push_back(next);
                break;
            }
        }
    }

    if zombie.path.is_empty() {
        return;
    }
    match advance(zombie, world, config.roam_speed * dt) {
        Advance::Moved => {}
        Advance::Arrived => {
            zombie.path.pop_front();
        }
        Advance::Blocked => zombie.path.clear(),
    }
}

fn is_wander_target(world: &ZombieWorld<'_>, cell: CellPos) -> bool {
    !world.main_path.contains(cell) && world.maze.is_room_cell(cell.x, cell.z)
}

fn advance(zombie: &mut Zombie, world: &ZombieWorld<'_>, step: f32) -> Advance {
    let Some(target) = zombie.path.front().copied() else {
        return Advance::Arrived;
    };
    let Some(next) = approach(zombie.pos, target, step, world.config.arrive_epsilon) else {
        return Advance::Arrived;
    };
    if blocked_at(next, world.maze, &world.collision) || world.main_path.contains(next.cell()) {
        return Advance::Blocked;
    }
    zombie.pos = next;
    Advance::Moved
}
