use crate::maze::Maze;
use crate::types::{CellPos, Intent, Vec2f};

pub(super) fn clamp_cell(maze: &Maze, x: i32, z: i32) -> CellPos {
    CellPos::new(x.clamp(0, maze.width() - 1), z.clamp(0, maze.height() - 1))
}

// Next position when moving from `from` toward the center of `target` by at most `step`.
// `None` means `from` is already within `epsilon` of the center.
pub(super) fn approach(from: Vec2f, target: CellPos, step: f32, epsilon: f32) -> Option<Vec2f> {
    let goal = target.center();
    let dx = goal.x - from.x;
    let dz = goal.z - from.z;
    let dist = dx.hypot(dz);
    if dist <= epsilon {
        return None;
    }
    let travel = step.min(dist);
    Some(Vec2f::new(from.x + dx / dist * travel, from.z + dz / dist * travel))
}

pub(super) fn intent_displacement(intent: Intent, step: f32) -> (f32, f32) {
    let mut dx = 0.0;
    let mut dz = 0.0;
    if intent.up {
        dz -= step;
    }
    if intent.down {
        dz += step;
    }
    if intent.left {
        dx -= step;
    }
    if intent.right {
        dx += step;
    }
    (dx, dz)
}
