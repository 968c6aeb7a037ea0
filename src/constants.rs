pub const BASE_MAZE_WIDTH: i32 = 10;
pub const BASE_MAZE_HEIGHT: i32 = 10;
pub const MAZE_GROWTH_PER_LEVEL: i32 = 5;
pub const MAX_MAZE_CELLS: usize = 4_000_000;
pub const EXTRA_PATHS_MIN: u32 = 2;
pub const EXTRA_PATHS_MAX: u32 = 4;

pub const PLAYER_SPEED: f32 = 2.6;
pub const CAPTURE_RADIUS: f32 = 0.45;
pub const EXIT_RADIUS: f32 = 0.55;
pub const MAX_DELTA_SECS: f32 = 0.1;

pub const ZOMBIE_MIN_COUNT: usize = 2;
pub const CELLS_PER_ZOMBIE: usize = 90;
pub const VISIBILITY_RADIUS: f32 = 8.0;
pub const CHASE_SPEED: f32 = 1.0;
pub const CONFUSED_SPEED: f32 = 0.45;
pub const ROAM_SPEED: f32 = 0.3;
pub const CHASE_DURATION_CAP_SECS: f32 = 5.0;
pub const PATH_LOOKAHEAD: usize = 8;
pub const ARRIVE_EPSILON: f32 = 0.06;
pub const CONFUSED_TRIES: u32 = 6;
pub const ROAM_TRIES: u32 = 12;
pub const ROAM_RADIUS: i32 = 3;
pub const SPAWN_MIN_START_DISTANCE: f32 = 5.0;
pub const SPAWN_MIN_EXIT_DISTANCE: f32 = 4.0;

pub const CLASSIC_MARGIN: f32 = 0.4;
pub const ROUNDED_MARGIN: f32 = 0.45;
pub const ROUNDED_CORNER_RADIUS: f32 = 0.35;

// Maze dimensions for a 1-based level, or `None` when they overflow `i32`.
pub fn get_maze_size_for_level(base_width: i32, base_height: i32, growth: i32, level: u32) -> Option<(i32, i32)> {
    let steps = i32::try_from(level.max(1) - 1).ok()?;
    let extra = steps.checked_mul(growth)?;
    Some((base_width.checked_add(extra)?, base_height.checked_add(extra)?))
}

pub fn get_zombie_count(width: i32, height: i32, min_count: usize, cells_per_zombie: usize) -> usize {
    let cells = (width.max(0) as usize).saturating_mul(height.max(0) as usize);
    if cells_per_zombie == 0 {
        return min_count;
    }
    min_count.max(cells / cells_per_zombie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maze_grows_five_cells_per_level() {
        assert_eq!(get_maze_size_for_level(10, 10, 5, 1), Some((10, 10)));
        assert_eq!(get_maze_size_for_level(10, 10, 5, 3), Some((20, 20)));
        assert_eq!(get_maze_size_for_level(10, 10, 5, 0), Some((10, 10)));
    }

    #[test]
    fn oversized_levels_do_not_wrap() {
        assert_eq!(get_maze_size_for_level(10, 10, 5, 1_000_000_000), None);
        assert_eq!(get_maze_size_for_level(10, 10, 5, u32::MAX), None);
        assert_eq!(get_maze_size_for_level(i32::MAX, 10, 5, 2), None);
        assert_eq!(get_zombie_count(i32::MAX, i32::MAX, 2, 90), usize::MAX / 90);
    }

    #[test]
    fn zombie_count_has_a_floor_of_two() {
        assert_eq!(get_zombie_count(10, 10, 2, 90), 2);
        assert_eq!(get_zombie_count(20, 20, 2, 90), 4);
        assert_eq!(get_zombie_count(30, 30, 2, 90), 10);
    }
}
