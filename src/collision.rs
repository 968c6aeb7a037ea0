use crate::maze::Maze;
use crate::types::{Direction, Vec2f};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionPolicy {
    pub margin: f32,
    pub corner_radius: Option<f32>,
}

// Out-of-grid points are always blocked.
pub fn blocked(x: f32, z: f32, maze: &Maze, policy: &CollisionPolicy) -> bool {
    if !(x.is_finite() && z.is_finite()) {
        return true;
    }
    let cx = x.floor();
    let cz = z.floor();
    let Some(cell) = maze.cell(cx as i32, cz as i32) else {
        return true;
    };
    let lx = x - cx;
    let lz = z - cz;
    let m = policy.margin;

    let north = cell.has_wall(Direction::North);
    let east = cell.has_wall(Direction::East);
    let south = cell.has_wall(Direction::South);
    let west = cell.has_wall(Direction::West);

    if (north && lz < m) || (south && lz > 1.0 - m) || (west && lx < m) || (east && lx > 1.0 - m) {
        return true;
    }

    let Some(radius) = policy.corner_radius else {
        return false;
    };
    let r2 = radius * radius;
    let near = |dx: f32, dz: f32| dx * dx + dz * dz < r2;
    (north && west && near(lx, lz))
        || (north && east && near(1.0 - lx, lz))
        || (south && west && near(lx, 1.0 - lz))
        || (south && east && near(1.0 - lx, 1.0 - lz))
}

pub fn blocked_at(pos: Vec2f, maze: &Maze, policy: &CollisionPolicy) -> bool {
    blocked(pos.x, pos.z, maze, policy)
}

pub fn slide_move(from: Vec2f, dx: f32, dz: f32, maze: &Maze, policy: &CollisionPolicy) -> Vec2f {
    let mut out = from;
    if dx != 0.0 && !blocked(from.x + dx, from.z, maze, policy) {
        out.x = from.x + dx;
    }
    if dz != 0.0 && !blocked(out.x, from.z + dz, maze, policy) {
        out.z = from.z + dz;
    }
    out
}
