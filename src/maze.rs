use tracing::debug;

use crate::config::MazeConfig;
use crate::constants::{get_maze_size_for_level, MAX_MAZE_CELLS};
use crate::error::{SimError, SimResult};
use crate::rng::Rng;
use crate::types::{CellPos, Direction, Exit, MazeView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
    // Indexed by `Direction::index`; `true` blocks movement to that side.
    pub walls: [bool; 4],
}

impl Cell {
    pub fn has_wall(&self, dir: Direction) -> bool {
        self.walls[dir.index()]
    }

    pub fn open_sides(&self) -> usize {
        self.walls.iter().filter(|wall| !**wall).count()
    }
}

#[derive(Clone, Debug)]
pub struct Maze {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    exit: Option<Exit>,
}

struct CarveFrame {
    index: usize,
    dirs: [Direction; 4],
    cursor: usize,
}

impl Maze {
    pub fn with_all_walls(width: i32, height: i32) -> SimResult<Self> {
        let size = (width > 0 && height > 0)
            .then(|| (width as usize).checked_mul(height as usize))
            .flatten()
            .filter(|size| *size <= MAX_MAZE_CELLS);
        let Some(size) = size else {
            return Err(SimError::InvalidDimension { width, height });
        };
        let mut cells = Vec::with_capacity(size);
        for z in 0..height {
            for x in 0..width {
                cells.push(Cell {
                    x,
                    z,
                    walls: [true; 4],
                });
            }
        }
        Ok(Self {
            width,
            height,
            cells,
            exit: None,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn exit(&self) -> Option<Exit> {
        self.exit
    }

    pub fn in_bounds(&self, x: i32, z: i32) -> bool {
        x >= 0 && z >= 0 && x < self.width && z < self.height
    }

    pub fn index_of(&self, x: i32, z: i32) -> Option<usize> {
        self.in_bounds(x, z).then(|| (z * self.width + x) as usize)
    }

    pub fn cell(&self, x: i32, z: i32) -> Option<&Cell> {
        self.index_of(x, z).map(|idx| &self.cells[idx])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    // Out-of-bounds cells count as fully walled.
    pub fn has_wall(&self, x: i32, z: i32, dir: Direction) -> bool {
        self.cell(x, z).map(|cell| cell.has_wall(dir)).unwrap_or(true)
    }

    pub fn neighbor(&self, x: i32, z: i32, dir: Direction) -> Option<CellPos> {
        let next = CellPos::new(x, z).step(dir);
        self.in_bounds(next.x, next.z).then_some(next)
    }

    pub fn passable_neighbors(&self, x: i32, z: i32) -> impl Iterator<Item = CellPos> + '_ {
        Direction::ALL
            .into_iter()
            .filter(move |dir| !self.has_wall(x, z, *dir))
            .filter_map(move |dir| self.neighbor(x, z, dir))
    }

    pub fn open_sides(&self, x: i32, z: i32) -> usize {
        self.cell(x, z).map(Cell::open_sides).unwrap_or(0)
    }

    pub fn is_room_cell(&self, x: i32, z: i32) -> bool {
        self.open_sides(x, z) >= 2
    }

    // False when the neighbor is outside the grid.
    pub fn carve(&mut self, x: i32, z: i32, dir: Direction) -> bool {
        self.set_shared_wall(x, z, dir, false)
    }

    pub fn build_wall(&mut self, x: i32, z: i32, dir: Direction) -> bool {
        self.set_shared_wall(x, z, dir, true)
    }

    fn set_shared_wall(&mut self, x: i32, z: i32, dir: Direction, present: bool) -> bool {
        let (Some(here), Some(next)) = (
            self.index_of(x, z),
            self.neighbor(x, z, dir).and_then(|n| self.index_of(n.x, n.z)),
        ) else {
            return false;
        };
        self.cells[here].walls[dir.index()] = present;
        self.cells[next].walls[dir.opposite().index()] = present;
        true
    }

    // Opens the outward wall of a boundary cell. Any previous exit is closed again.
    pub fn set_exit(&mut self, exit: Exit) -> SimResult<()> {
        let on_boundary = match exit.side {
            Direction::North => exit.z == 0,
            Direction::South => exit.z == self.height - 1,
            Direction::West => exit.x == 0,
            Direction::East => exit.x == self.width - 1,
        };
        let Some(idx) = self.index_of(exit.x, exit.z).filter(|_| on_boundary) else {
            return Err(SimError::InvalidConfiguration(format!(
                "exit ({}, {}) does not face outward on side {:?}",
                exit.x, exit.z, exit.side
            )));
        };
        if let Some(previous) = self.exit.take() {
            if let Some(prev_idx) = self.index_of(previous.x, previous.z) {
                self.cells[prev_idx].walls[previous.side.index()] = true;
            }
        }
        self.cells[idx].walls[exit.side.index()] = false;
        self.exit = Some(exit);
        Ok(())
    }

    fn carve_spanning_tree(&mut self, rng: &mut Rng) {
        let mut visited = vec![false; self.cells.len()];
        let mut stack = vec![self.new_frame(0, rng)];
        visited[0] = true;

        while let Some(frame) = stack.last_mut() {
            if frame.cursor >= frame.dirs.len() {
                stack.pop();
                continue;
            }
            let dir = frame.dirs[frame.cursor];
            frame.cursor += 1;
            let here = self.cells[frame.index];
            let Some(next) = self.neighbor(here.x, here.z, dir) else {
                continue;
            };
            let next_idx = (next.z * self.width + next.x) as usize;
            if visited[next_idx] {
                continue;
            }
            self.carve(here.x, here.z, dir);
            visited[next_idx] = true;
            let frame = self.new_frame(next_idx, rng);
            stack.push(frame);
        }
    }

    fn new_frame(&self, index: usize, rng: &mut Rng) -> CarveFrame {
        let mut dirs = Direction::ALL;
        rng.shuffle(&mut dirs);
        CarveFrame {
            index,
            dirs,
            cursor: 0,
        }
    }

    fn punch_extra_paths(&mut self, count: u32, rng: &mut Rng) {
        for _ in 0..count {
            let x = rng.int(0, self.width - 1);
            let z = rng.int(0, self.height - 1);
            let dir = Direction::ALL[rng.pick_index(4)];
            self.carve(x, z, dir);
        }
    }

    fn random_exit(&self, rng: &mut Rng) -> Exit {
        let side = Direction::ALL[rng.pick_index(4)];
        let (x, z) = match side {
            Direction::North => (rng.int(0, self.width - 1), 0),
            Direction::South => (rng.int(0, self.width - 1), self.height - 1),
            Direction::West => (0, rng.int(0, self.height - 1)),
            Direction::East => (self.width - 1, rng.int(0, self.height - 1)),
        };
        Exit { x, z, side }
    }

    pub fn to_view(&self, exit: Exit, main_path: &[CellPos]) -> MazeView {
        MazeView {
            width: self.width,
            height: self.height,
            walls: self.cells.iter().map(|cell| cell.walls).collect(),
            exit,
            main_path: main_path.to_vec(),
        }
    }
}

pub fn generate_maze(width: i32, height: i32, extra_paths: u32, rng: &mut Rng) -> SimResult<Maze> {
    let mut maze = Maze::with_all_walls(width, height)?;
    maze.carve_spanning_tree(rng);
    maze.punch_extra_paths(extra_paths, rng);
    let exit = maze.random_exit(rng);
    maze.set_exit(exit)?;
    Ok(maze)
}

pub fn generate_level_maze(config: &MazeConfig, level: u32, rng: &mut Rng) -> SimResult<Maze> {
    let (width, height) = get_maze_size_for_level(
        config.base_width,
        config.base_height,
        config.growth_per_level,
        level,
    )
    .ok_or(SimError::InvalidDimension {
        width: config.base_width,
        height: config.base_height,
    })?;
    let extra_paths = rng.int(config.extra_paths_min as i32, config.extra_paths_max as i32).max(0) as u32;
    let maze = generate_maze(width, height, extra_paths, rng)?;
    debug!(level, width, height, extra_paths, exit = ?maze.exit, "maze generated");
    Ok(maze)
}
