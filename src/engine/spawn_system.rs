use super::*;

impl GameEngine {
    pub(super) fn spawn_zombies(&mut self) {
        let count = get_zombie_count(
            self.world.maze.width(),
            self.world.maze.height(),
            self.config.zombies.min_count,
            self.config.zombies.cells_per_zombie,
        );
        self.zombies.clear();
        for id in 1..=count as u32 {
            let cell = self.pick_spawn_cell();
            let think = self.config.zombies.initial_delay.sample(&mut self.rng);
            self.zombies
                .push(Zombie::new(id, cell, think, &self.world.main_path_set));
        }
    }

    pub(super) fn pick_spawn_cell(&mut self) -> CellPos {
        let maze = &self.world.maze;
        let main = &self.world.main_path_set;
        let cfg = &self.config.zombies;
        let (width, height) = (maze.width(), maze.height());
        let origin = CellPos::new(0, 0);
        let exit = self.world.exit.cell();

        let attempts = maze.cell_count().saturating_mul(3).max(1);
        for _ in 0..attempts {
            let cell = CellPos::new(self.rng.int(0, width - 1), self.rng.int(0, height - 1));
            if main.contains(cell) || !maze.is_room_cell(cell.x, cell.z) {
                continue;
            }
            if Direction::ALL.iter().any(|dir| main.contains(cell.step(*dir))) {
                continue;
            }
            if cell.distance(origin) < cfg.spawn_min_start_distance
                || cell.distance(exit) < cfg.spawn_min_exit_distance
            {
                continue;
            }
            return cell;
        }

        for z in 0..height {
            for x in 0..width {
                let cell = CellPos::new(x, z);
                if !main.contains(cell)
                    && maze.is_room_cell(x, z)
                    && cell.distance(origin) > cfg.spawn_min_start_distance
                {
                    return cell;
                }
            }
        }

        debug!(width, height, "no spawn candidate, using far corner");
        clamp_cell(maze, (width - 2).max(1), (height - 2).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZombieState;

    #[test]
    fn spawns_respect_main_path_and_distance_rules() {
        for seed in 0..20u32 {
            let engine = GameEngine::new(SimConfig::default(), 2, seed).expect("valid config");
            let main = &engine.world.main_path_set;
            let cfg = &engine.config.zombies;
            for zombie in &engine.zombies {
                let cell = zombie.cell();
                assert!(!main.contains(cell), "seed {seed}: zombie spawned on main path");
                assert!(engine.world.maze.in_bounds(cell.x, cell.z));
                assert_eq!(zombie.pos, cell.center());
                assert_eq!(zombie.state, ZombieState::Roam);
                assert!(zombie.path.is_empty());
                assert!(zombie.think >= cfg.initial_delay.min && zombie.think < cfg.initial_delay.max);
            }
        }
    }

    #[test]
    fn zombie_ids_start_at_one() {
        let engine = GameEngine::new(SimConfig::default(), 1, 42).expect("valid config");
        let ids: Vec<u32> = engine.zombies.iter().map(|z| z.id).collect();
        let expected: Vec<u32> = (1..=ids.len() as u32).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn falls_back_to_far_corner_when_nothing_qualifies() {
        let mut config = SimConfig::default();
        config.maze.base_width = 3;
        config.maze.base_height = 3;
        config.maze.growth_per_level = 0;
        let mut engine = GameEngine::new(config, 1, 5).expect("valid config");
        // Every cell on the main path leaves no candidate at all.
        for z in 0..3 {
            for x in 0..3 {
                engine.world.main_path_set.insert(CellPos::new(x, z));
            }
        }
        assert_eq!(engine.pick_spawn_cell(), CellPos::new(1, 1));
    }
}
