use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    // Fixed expansion order used by path search.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub z: i32,
}

impl CellPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dz) = dir.delta();
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    pub fn center(self) -> Vec2f {
        Vec2f {
            x: self.x as f32 + 0.5,
            z: self.z as f32 + 0.5,
        }
    }

    pub fn distance(self, other: CellPos) -> f32 {
        ((self.x - other.x) as f32).hypot((self.z - other.z) as f32)
    }

    pub fn manhattan(self, other: CellPos) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2f {
    pub x: f32,
    pub z: f32,
}

impl Vec2f {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn cell(self) -> CellPos {
        CellPos {
            x: self.x.floor() as i32,
            z: self.z.floor() as i32,
        }
    }

    pub fn distance(self, other: Vec2f) -> f32 {
        (self.x - other.x).hypot(self.z - other.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Intent {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZombieState {
    Roam,
    Confused,
    Chase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Playing,
    Captured,
    Exited,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Self::Playing
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub x: i32,
    pub z: i32,
    pub side: Direction,
}

impl Exit {
    pub fn cell(&self) -> CellPos {
        CellPos::new(self.x, self.z)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ZombieView {
    pub id: u32,
    pub x: f32,
    pub z: f32,
    pub state: ZombieState,
}

#[derive(Clone, Debug, Serialize)]
pub struct MazeView {
    pub width: i32,
    pub height: i32,
    // Row-major, `z * width + x`, indexed North/East/South/West.
    pub walls: Vec<[bool; 4]>,
    pub exit: Exit,
    #[serde(rename = "mainPath")]
    pub main_path: Vec<CellPos>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    LevelStarted {
        level: u32,
        width: i32,
        height: i32,
        zombies: usize,
    },
    ZombieStateChanged {
        #[serde(rename = "zombieId")]
        zombie_id: u32,
        from: ZombieState,
        to: ZombieState,
    },
    PlayerCaptured {
        #[serde(rename = "zombieId")]
        zombie_id: u32,
    },
    ExitReached {
        #[serde(rename = "elapsedSecs")]
        elapsed_secs: f32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub level: u32,
    #[serde(rename = "elapsedSecs")]
    pub elapsed_secs: f32,
    pub outcome: Outcome,
    pub player: Vec2f,
    pub zombies: Vec<ZombieView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LevelSummary {
    pub level: u32,
    pub outcome: Outcome,
    #[serde(rename = "elapsedSecs")]
    pub elapsed_secs: f32,
    pub ticks: u64,
    #[serde(rename = "mainPathLength")]
    pub main_path_length: usize,
    #[serde(rename = "capturedBy")]
    pub captured_by: Option<u32>,
}
