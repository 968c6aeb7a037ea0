use crate::maze::Maze;
use crate::types::{CellPos, Direction};

// A diagonal step is open when either L-shaped route around the corner is.
pub fn can_see(maze: &Maze, from: CellPos, to: CellPos, radius: f32) -> bool {
    if !maze.in_bounds(from.x, from.z) || !maze.in_bounds(to.x, to.z) {
        return false;
    }
    if from.distance(to) > radius {
        return false;
    }

    let dx = (to.x - from.x).abs();
    let dz = (to.z - from.z).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sz = if from.z < to.z { 1 } else { -1 };
    let mut err = dx - dz;
    let mut current = from;

    while current != to {
        let e2 = err * 2;
        let mut next = current;
        if e2 > -dz {
            err -= dz;
            next.x += sx;
        }
        if e2 < dx {
            err += dx;
            next.z += sz;
        }
        if !step_is_open(maze, current, next) {
            return false;
        }
        current = next;
    }
    true
}

fn step_is_open(maze: &Maze, from: CellPos, to: CellPos) -> bool {
    let horizontal = axis_dir(to.x - from.x, Direction::East, Direction::West);
    let vertical = axis_dir(to.z - from.z, Direction::South, Direction::North);
    match (horizontal, vertical) {
        (Some(h), None) => !maze.has_wall(from.x, from.z, h),
        (None, Some(v)) => !maze.has_wall(from.x, from.z, v),
        (Some(h), Some(v)) => {
            let via_h = from.step(h);
            let via_v = from.step(v);
            (!maze.has_wall(from.x, from.z, h) && !maze.has_wall(via_h.x, via_h.z, v))
                || (!maze.has_wall(from.x, from.z, v) && !maze.has_wall(via_v.x, via_v.z, h))
        }
        (None, None) => true,
    }
}

fn axis_dir(delta: i32, positive: Direction, negative: Direction) -> Option<Direction> {
    match delta.signum() {
        1 => Some(positive),
        -1 => Some(negative),
        _ => None,
    }
}
