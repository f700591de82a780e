//! Agent storage plus the per-step intent queues.
//!
//! All world mutations produced while agents act are speculative intents
//! appended to these buffers; they are drained in a fixed order (deaths,
//! then moves) at end of step so that no agent observes another agent's
//! in-step effects.

use crate::agent::Agent;
use crate::grid::{Grid, EMPTY_CELL};
use crate::Coord;

/// A queued relocation produced during action execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveIntent {
    pub index: u16,
    pub to: Coord,
}

/// Owns the agents of the current generation (1-based, index 0 reserved)
/// and the move/death buffers for the step in flight.
#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<Agent>,
    move_queue: Vec<MoveIntent>,
    death_queue: Vec<u16>,
}

impl Default for Population {
    fn default() -> Self {
        Self::new()
    }
}

impl Population {
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: vec![Agent::null()],
            move_queue: Vec::new(),
            death_queue: Vec::new(),
        }
    }

    /// Drop every agent and pending intent, keeping the null slot.
    pub fn clear(&mut self) {
        self.agents.truncate(1);
        if self.agents.is_empty() {
            self.agents.push(Agent::null());
        }
        self.move_queue.clear();
        self.death_queue.clear();
    }

    /// Number of agents, dead or alive, excluding the null slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index the next pushed agent will receive.
    #[must_use]
    pub fn next_index(&self) -> u16 {
        self.agents.len() as u16
    }

    /// Append an agent, returning its 1-based index.
    pub fn push(&mut self, agent: Agent) -> u16 {
        debug_assert_eq!(agent.index, self.next_index());
        let index = self.next_index();
        self.agents.push(agent);
        index
    }

    #[must_use]
    pub fn agent(&self, index: u16) -> &Agent {
        &self.agents[index as usize]
    }

    pub fn agent_mut(&mut self, index: u16) -> &mut Agent {
        &mut self.agents[index as usize]
    }

    /// Agent at `index` when it names a real slot, `None` for 0 or out of
    /// range.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Agent> {
        if index == 0 {
            return None;
        }
        self.agents.get(index as usize)
    }

    /// All 1-based indices, in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = u16> {
        1..=self.len() as u16
    }

    /// Living agents, in index order.
    pub fn living(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().skip(1).filter(|agent| agent.alive)
    }

    #[must_use]
    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    pub fn queue_move(&mut self, index: u16, to: Coord) {
        self.move_queue.push(MoveIntent { index, to });
    }

    pub fn queue_death(&mut self, index: u16) {
        self.death_queue.push(index);
    }

    /// Drain queued deaths: clear the grid cell, mark the agent dead.
    /// Returns the number of agents that actually died (duplicate intents
    /// against one agent collapse). Runs before [`Self::drain_moves`].
    pub fn drain_deaths(&mut self, grid: &mut Grid) -> u32 {
        let mut died = 0;
        let deaths = std::mem::take(&mut self.death_queue);
        for index in deaths {
            let agent = &mut self.agents[index as usize];
            if !agent.alive {
                continue;
            }
            agent.alive = false;
            grid.set(agent.loc, EMPTY_CELL);
            died += 1;
        }
        died
    }

    /// Drain queued moves. A move is dropped when its agent died this step
    /// or its destination is no longer empty; dropped intents are not
    /// errors, the attempt was speculative.
    pub fn drain_moves(&mut self, grid: &mut Grid) {
        let moves = std::mem::take(&mut self.move_queue);
        for intent in moves {
            let agent = &self.agents[intent.index as usize];
            if !agent.alive || !grid.is_empty(intent.to) {
                continue;
            }
            let from = agent.loc;
            grid.set(from, EMPTY_CELL);
            grid.set(intent.to, intent.index);
            self.agents[intent.index as usize].loc = intent.to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;
    use crate::rng::Rng32;

    fn spawn_at(pop: &mut Population, grid: &mut Grid, loc: Coord, rng: &mut Rng32) -> u16 {
        let index = pop.next_index();
        let agent = Agent::spawn(index, loc, Genome::random(2, rng), 2, 4);
        pop.push(agent);
        grid.set(loc, index);
        index
    }

    #[test]
    fn indices_are_one_based_and_dense() {
        let mut pop = Population::new();
        let mut grid = Grid::new(8, 8);
        let mut rng = Rng32::new(1);
        let a = spawn_at(&mut pop, &mut grid, Coord::new(1, 1), &mut rng);
        let b = spawn_at(&mut pop, &mut grid, Coord::new(2, 2), &mut rng);
        assert_eq!((a, b), (1, 2));
        assert_eq!(pop.len(), 2);
        assert!(pop.get(0).is_none());
        assert_eq!(pop.agent(1).loc, Coord::new(1, 1));
        assert_eq!(pop.indices().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn deaths_drain_before_moves_freeing_the_cell() {
        let mut pop = Population::new();
        let mut grid = Grid::new(8, 8);
        let mut rng = Rng32::new(2);
        let victim = spawn_at(&mut pop, &mut grid, Coord::new(3, 3), &mut rng);
        let mover = spawn_at(&mut pop, &mut grid, Coord::new(2, 3), &mut rng);

        pop.queue_death(victim);
        pop.queue_move(mover, Coord::new(3, 3));

        let died = pop.drain_deaths(&mut grid);
        pop.drain_moves(&mut grid);

        assert_eq!(died, 1);
        assert!(!pop.agent(victim).alive);
        assert_eq!(grid.at(Coord::new(3, 3)), Some(mover));
        assert!(grid.is_empty(Coord::new(2, 3)));
        assert_eq!(pop.agent(mover).loc, Coord::new(3, 3));
    }

    #[test]
    fn move_of_a_killed_agent_is_dropped() {
        let mut pop = Population::new();
        let mut grid = Grid::new(8, 8);
        let mut rng = Rng32::new(3);
        let agent = spawn_at(&mut pop, &mut grid, Coord::new(4, 4), &mut rng);

        pop.queue_move(agent, Coord::new(5, 4));
        pop.queue_death(agent);

        pop.drain_deaths(&mut grid);
        pop.drain_moves(&mut grid);

        assert!(!pop.agent(agent).alive);
        assert!(grid.is_empty(Coord::new(4, 4)));
        assert!(grid.is_empty(Coord::new(5, 4)));
    }

    #[test]
    fn move_into_an_occupied_cell_is_dropped() {
        let mut pop = Population::new();
        let mut grid = Grid::new(8, 8);
        let mut rng = Rng32::new(4);
        let first = spawn_at(&mut pop, &mut grid, Coord::new(1, 1), &mut rng);
        let second = spawn_at(&mut pop, &mut grid, Coord::new(3, 1), &mut rng);

        pop.queue_move(first, Coord::new(2, 1));
        pop.queue_move(second, Coord::new(2, 1));

        pop.drain_moves(&mut grid);

        assert_eq!(pop.agent(first).loc, Coord::new(2, 1));
        assert_eq!(pop.agent(second).loc, Coord::new(3, 1));
        assert_eq!(grid.at(Coord::new(2, 1)), Some(first));
    }

    #[test]
    fn duplicate_deaths_collapse() {
        let mut pop = Population::new();
        let mut grid = Grid::new(8, 8);
        let mut rng = Rng32::new(5);
        let agent = spawn_at(&mut pop, &mut grid, Coord::new(4, 4), &mut rng);
        pop.queue_death(agent);
        pop.queue_death(agent);
        assert_eq!(pop.drain_deaths(&mut grid), 1);
    }

    #[test]
    fn clear_keeps_the_null_slot() {
        let mut pop = Population::new();
        let mut grid = Grid::new(8, 8);
        let mut rng = Rng32::new(6);
        spawn_at(&mut pop, &mut grid, Coord::new(1, 1), &mut rng);
        pop.clear();
        assert_eq!(pop.len(), 0);
        assert_eq!(pop.next_index(), 1);
    }
}
