use std::collections::VecDeque;

use crate::constants::MAX_MAZE_CELLS;
use crate::maze::Maze;
use crate::types::CellPos;

// Membership set over a fixed grid, keyed by `z * width + x`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellSet {
    width: i32,
    height: i32,
    members: Vec<bool>,
    len: usize,
}

impl CellSet {
    pub fn new(width: i32, height: i32) -> Self {
        let size = (width.max(0) as usize)
            .checked_mul(height.max(0) as usize)
            .filter(|size| *size <= MAX_MAZE_CELLS)
            .unwrap_or(0);
        Self {
            width,
            height,
            members: vec![false; size],
            len: 0,
        }
    }

    pub fn from_cells(width: i32, height: i32, cells: &[CellPos]) -> Self {
        let mut set = Self::new(width, height);
        for cell in cells {
            set.insert(*cell);
        }
        set
    }

    fn key(&self, cell: CellPos) -> Option<usize> {
        (cell.x >= 0 && cell.z >= 0 && cell.x < self.width && cell.z < self.height)
            .then(|| cell.z as usize * self.width as usize + cell.x as usize)
    }

    pub fn insert(&mut self, cell: CellPos) -> bool {
        let Some(key) = self.key(cell) else {
            return false;
        };
        match self.members.get_mut(key) {
            Some(member) if !*member => {
                *member = true;
                self.len += 1;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, cell: CellPos) -> bool {
        self.key(cell)
            .and_then(|key| self.members.get(key).copied())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Both ends inclusive. Neighbors expand N, E, S, W so ties resolve the same way every time.
pub fn shortest_path(maze: &Maze, start: CellPos, end: CellPos) -> Vec<CellPos> {
    let (Some(start_idx), Some(end_idx)) = (maze.index_of(start.x, start.z), maze.index_of(end.x, end.z)) else {
        return Vec::new();
    };
    if start_idx == end_idx {
        return vec![start];
    }

    let mut parent: Vec<Option<usize>> = vec![None; maze.cell_count()];
    let mut visited = vec![false; maze.cell_count()];
    let mut queue = VecDeque::new();
    visited[start_idx] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == end {
            break;
        }
        let current_idx = (current.z * maze.width() + current.x) as usize;
        for next in maze.passable_neighbors(current.x, current.z) {
            let next_idx = (next.z * maze.width() + next.x) as usize;
            if visited[next_idx] {
                continue;
            }
            visited[next_idx] = true;
            parent[next_idx] = Some(current_idx);
            queue.push_back(next);
        }
    }

    if parent[end_idx].is_none() {
        return Vec::new();
    }

    let mut path = vec![end];
    let mut cursor = end_idx;
    while let Some(prev) = parent[cursor] {
        let width = maze.width() as usize;
        path.push(CellPos::new((prev % width) as i32, (prev / width) as i32));
        cursor = prev;
    }
    path.reverse();
    path
}

pub fn distance_map(maze: &Maze, start: CellPos) -> Vec<Option<u32>> {
    let mut distances = vec![None; maze.cell_count()];
    let Some(start_idx) = maze.index_of(start.x, start.z) else {
        return distances;
    };
    let mut queue = VecDeque::new();
    distances[start_idx] = Some(0);
    queue.push_back((start, 0u32));

    while let Some((current, depth)) = queue.pop_front() {
        for next in maze.passable_neighbors(current.x, current.z) {
            let next_idx = (next.z * maze.width() + next.x) as usize;
            if distances[next_idx].is_none() {
                distances[next_idx] = Some(depth + 1);
                queue.push_back((next, depth + 1));
            }
        }
    }
    distances
}

// Nearest cell, by open passages, for which `accept` holds. `start` itself is checked first.
pub fn nearest_matching(maze: &Maze, start: CellPos, accept: impl Fn(CellPos) -> bool) -> Option<CellPos> {
    let start_idx = maze.index_of(start.x, start.z)?;
    let mut visited = vec![false; maze.cell_count()];
    let mut queue = VecDeque::new();
    visited[start_idx] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if accept(current) {
            return Some(current);
        }
        for next in maze.passable_neighbors(current.x, current.z) {
            let next_idx = (next.z * maze.width() + next.x) as usize;
            if !visited[next_idx] {
                visited[next_idx] = true;
                queue.push_back(next);
            }
        }
    }
    None
}
