//! A running demo: one grid, its agents and the clock that drives them.
//!
//! The display loop calls [`Simulation::step_simulation`] with the time since
//! the previous frame; everything else (wall edits, goal changes) happens
//! between steps through the methods below.

use crate::agent::Agent;
use crate::clock::{SimulationClock, MAX_SPEED, MIN_SPEED};
use crate::controller::{AgentController, ControllerState, HaltReason, StepEffect, Target};
use crate::error::{GridError, Result};
use crate::generation::{generate_grid_with, reachable, GenerationParams};
use crate::grid::{Connectivity, Grid, Position};
use crate::pathfinding::{CostKind, Planner};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Side effects of entering a cell, beyond movement and energy
pub trait StepHook {
    fn on_step(&mut self, agent: &mut Agent, cell: Position) -> Vec<StepEffect>;
}

/// Collectibles lying on the grid
#[derive(Debug, Clone, Default)]
pub struct Items {
    cells: BTreeSet<Position>,
}

impl Items {
    pub fn insert(&mut self, pos: Position) -> bool {
        self.cells.insert(pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.cells.iter()
    }
}

impl StepHook for Items {
    fn on_step(&mut self, agent: &mut Agent, cell: Position) -> Vec<StepEffect> {
        if self.cells.remove(&cell) {
            agent.inventory += 1;
            vec![StepEffect::ItemCollected(cell)]
        } else {
            Vec::new()
        }
    }
}

/// How agents of a simulation plan and behave
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub connectivity: Connectivity,
    pub cost: CostKind,
    /// Sight radius for fog-of-war planning; `None` means full knowledge
    pub vision_radius: Option<i32>,
    pub starting_energy: Option<f64>,
    pub max_teleports: u32,
    pub base_interval_ms: f64,
    pub speed: u32,
    /// Goals the first agent visits, the last being the generation goal
    pub goal_count: usize,
    pub item_count: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            connectivity: Connectivity::Orthogonal,
            cost: CostKind::Uniform,
            vision_radius: None,
            starting_energy: None,
            max_teleports: 3,
            base_interval_ms: 500.0,
            speed: 5,
            goal_count: 1,
            item_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub id: usize,
    pub position: Position,
    pub energy: Option<f64>,
    pub inventory: u32,
    pub reached: Vec<Position>,
    pub state: ControllerState,
    pub halt: Option<HaltReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub cols: i32,
    pub rows: i32,
    pub walls: usize,
    pub steps: u64,
    pub items_left: usize,
    pub agents: Vec<AgentSummary>,
}

pub struct Simulation {
    grid: Grid,
    params: GenerationParams,
    settings: SimulationSettings,
    agents: Vec<AgentController>,
    items: Items,
    hooks: Vec<Box<dyn StepHook>>,
    clock: SimulationClock,
    rng: StdRng,
    running: bool,
    steps: u64,
}

impl Simulation {
    /// Generate a grid and place one agent at the start, heading for the goal
    pub fn new(params: GenerationParams, mut settings: SimulationSettings) -> Result<Self> {
        settings.speed = settings.speed.clamp(MIN_SPEED, MAX_SPEED);
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let clock = SimulationClock::from_speed(settings.base_interval_ms, settings.speed);
        let mut sim = Simulation {
            grid: Grid::new(0, 0),
            params,
            settings,
            agents: Vec::new(),
            items: Items::default(),
            hooks: Vec::new(),
            clock,
            rng,
            running: true,
            steps: 0,
        };
        sim.regenerate()?;
        Ok(sim)
    }

    /// Wrap an existing grid with no agents
    pub fn from_grid(grid: Grid, mut settings: SimulationSettings, seed: u64) -> Self {
        settings.speed = settings.speed.clamp(MIN_SPEED, MAX_SPEED);
        let params = GenerationParams::new(grid.cols, grid.rows, Default::default());
        let clock = SimulationClock::from_speed(settings.base_interval_ms, settings.speed);
        Simulation {
            grid,
            params,
            settings,
            agents: Vec::new(),
            items: Items::default(),
            hooks: Vec::new(),
            clock,
            rng: StdRng::seed_from_u64(seed),
            running: true,
            steps: 0,
        }
    }

    /// Discard the grid and every agent and build a fresh layout
    pub fn regenerate(&mut self) -> Result<()> {
        let grid = generate_grid_with(&self.params, &mut self.rng)?;
        self.grid = grid;
        self.agents.clear();
        self.items = Items::default();
        self.steps = 0;
        self.clock.reset();

        let start = self.params.start();
        let goal = self.params.goal();
        let mut goals: Vec<Target> = self
            .random_reachable_cells(start, self.settings.goal_count.saturating_sub(1), &[start, goal])
            .into_iter()
            .map(Target::Cell)
            .collect();
        goals.push(Target::Cell(goal));
        self.add_agent(start, goals);

        for cell in self.random_reachable_cells(start, self.settings.item_count, &[start, goal]) {
            self.items.insert(cell);
        }
        info!(
            cols = self.grid.cols,
            rows = self.grid.rows,
            items = self.items.len(),
            "simulation ready"
        );
        Ok(())
    }

    fn random_reachable_cells(&mut self, from: Position, count: usize, exclude: &[Position]) -> Vec<Position> {
        let seen = reachable(&self.grid, from, self.settings.connectivity);
        let mut cells: Vec<Position> = seen
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| self.grid.position_of(i))
            .filter(|p| !exclude.contains(p))
            .collect();
        cells.shuffle(&mut self.rng);
        cells.truncate(count);
        cells
    }

    fn planner(&self) -> Planner {
        Planner::new(self.settings.connectivity).with_boxed_cost(self.settings.cost.boxed())
    }

    /// Add an agent and return its id
    pub fn add_agent(&mut self, position: Position, goals: Vec<Target>) -> usize {
        let id = self.agents.len();
        let mut agent = Agent::new(id, position);
        if let Some(energy) = self.settings.starting_energy {
            agent = agent.with_energy(energy);
        }
        let mut controller =
            AgentController::new(agent, self.planner()).with_max_teleports(self.settings.max_teleports);
        if let Some(radius) = self.settings.vision_radius {
            controller = controller.with_vision(&self.grid, radius);
        }
        if !goals.is_empty() {
            controller.set_goals(goals);
        }
        self.agents.push(controller);
        id
    }

    pub fn add_hook(&mut self, hook: Box<dyn StepHook>) {
        self.hooks.push(hook);
    }

    pub fn place_item(&mut self, pos: Position) -> Result<()> {
        if !self.grid.contains(pos) || self.grid.is_wall_at(pos) {
            return Err(GridError::InvalidParameter(format!("cannot place an item on {}", pos)));
        }
        self.items.insert(pos);
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut GenerationParams {
        &mut self.params
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn agents(&self) -> &[AgentController] {
        &self.agents
    }

    pub fn agent(&self, id: usize) -> Option<&AgentController> {
        self.agents.get(id)
    }

    pub fn items(&self) -> &Items {
        &self.items
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        self.clock.resume();
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.clock.pause();
    }

    /// Set the speed slider, clamped to the range the clock honours
    pub fn set_speed(&mut self, speed: u32) {
        self.settings.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.clock.set_speed(self.settings.base_interval_ms, self.settings.speed);
    }

    /// Every agent has stopped for good
    pub fn is_finished(&self) -> bool {
        self.agents.iter().all(AgentController::is_idle)
    }

    /// Cells that edit mode may not turn into walls
    fn is_protected(&self, pos: Position) -> bool {
        let snapshot = self.snapshot();
        self.agents.iter().any(|c| {
            c.agent.position == pos
                || c.goals().any(|&t| match t {
                    Target::Cell(goal) => goal == pos,
                    Target::Agent(id) => snapshot.get(id) == Some(&pos),
                })
        })
    }

    /// Edit mode: flip a wall. Start and goal cells cannot be walled.
    pub fn toggle_wall(&mut self, pos: Position) -> Result<bool> {
        if self.grid.is_open(pos) && self.is_protected(pos) {
            return Err(GridError::InvalidParameter(format!(
                "{} is occupied by an agent or goal",
                pos
            )));
        }
        let wall = self.grid.toggle_wall(pos)?;
        debug!(%pos, wall, "wall toggled");
        Ok(wall)
    }

    /// Replace an agent's goals with a single cell
    pub fn set_goal(&mut self, agent: usize, goal: Position) -> Result<()> {
        self.check_goal(goal)?;
        if let Some(c) = self.agents.get_mut(agent) {
            c.set_goal(Target::Cell(goal));
        }
        Ok(())
    }

    /// Move an agent's current goal, keeping the rest of its queue
    pub fn move_goal(&mut self, agent: usize, goal: Position) -> Result<()> {
        self.check_goal(goal)?;
        if let Some(c) = self.agents.get_mut(agent) {
            c.move_goal(Target::Cell(goal));
        }
        Ok(())
    }

    /// Make `agent` chase `target`
    pub fn chase(&mut self, agent: usize, target: usize) {
        if let Some(c) = self.agents.get_mut(agent) {
            c.set_goal(Target::Agent(target));
        }
    }

    fn check_goal(&self, goal: Position) -> Result<()> {
        if !self.grid.contains(goal) {
            return Err(GridError::OutOfBounds {
                x: goal.x,
                y: goal.y,
                cols: self.grid.cols,
                rows: self.grid.rows,
            });
        }
        if self.grid.is_wall_at(goal) {
            return Err(GridError::InvalidParameter(format!("goal {} is a wall", goal)));
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<Position> {
        self.agents.iter().map(|c| c.agent.position).collect()
    }

    /// Feed elapsed frame time; runs one step when the clock says so
    pub fn step_simulation(&mut self, delta_ms: f64) -> Vec<(usize, StepEffect)> {
        if !self.running {
            return Vec::new();
        }
        if self.clock.advance(delta_ms) {
            self.step()
        } else {
            Vec::new()
        }
    }

    /// Advance every agent by one step.
    ///
    /// All agents decide against the positions held at the start of the
    /// step; moves are committed afterwards.
    pub fn step(&mut self) -> Vec<(usize, StepEffect)> {
        let snapshot = self.snapshot();
        let mut effects = Vec::new();

        let mut intents = Vec::with_capacity(self.agents.len());
        for controller in &mut self.agents {
            let (decided, intent) = controller.decide(&self.grid, &snapshot);
            effects.extend(decided.into_iter().map(|e| (controller.agent.id, e)));
            intents.push(intent);
        }

        for (controller, intent) in self.agents.iter_mut().zip(intents) {
            let id = controller.agent.id;
            let committed = controller.commit(&self.grid, intent);
            let moved_to = committed.iter().find_map(|e| match e {
                StepEffect::Moved { to, .. } => Some(*to),
                _ => None,
            });
            effects.extend(committed.into_iter().map(|e| (id, e)));

            if let Some(cell) = moved_to {
                for e in self.items.on_step(&mut controller.agent, cell) {
                    effects.push((id, e));
                }
                for hook in &mut self.hooks {
                    for e in hook.on_step(&mut controller.agent, cell) {
                        effects.push((id, e));
                    }
                }
            }
        }

        self.recover(&snapshot, &mut effects);
        self.steps += 1;
        effects
    }

    /// Teleport agents whose planning failed to a random cell that can
    /// reach their goal
    fn recover(&mut self, snapshot: &[Position], effects: &mut Vec<(usize, StepEffect)>) {
        for i in 0..self.agents.len() {
            if self.agents[i].state() != ControllerState::Teleport {
                continue;
            }
            let id = self.agents[i].agent.id;
            let Some(goal) = self.agents[i].current_goal(snapshot) else {
                effects.push((id, self.agents[i].abandon()));
                continue;
            };

            let connectivity = self.agents[i].planner().connectivity;
            let current = self.agents[i].agent.position;
            let candidates: Vec<Position> = reachable(&self.grid, goal, connectivity)
                .iter()
                .enumerate()
                .filter(|(_, s)| **s)
                .map(|(idx, _)| self.grid.position_of(idx))
                .filter(|&p| p != goal && p != current)
                .collect();

            let effect = if candidates.is_empty() {
                self.agents[i].abandon()
            } else {
                let cell = candidates[self.rng.gen_range(0..candidates.len())];
                self.agents[i].teleport(cell)
            };
            effects.push((id, effect));
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            cols: self.grid.cols,
            rows: self.grid.rows,
            walls: self.grid.wall_count(),
            steps: self.steps,
            items_left: self.items.len(),
            agents: self
                .agents
                .iter()
                .map(|c| AgentSummary {
                    id: c.agent.id,
                    position: c.agent.position,
                    energy: c.agent.energy.is_finite().then_some(c.agent.energy),
                    inventory: c.agent.inventory,
                    reached: c.reached().to_vec(),
                    state: c.state(),
                    halt: c.halt_reason(),
                })
                .collect(),
        }
    }

    /// ASCII view with agents as `A`, goals as `G` and items as `*`
    pub fn render_ascii(&self) -> String {
        let snapshot = self.snapshot();
        self.grid.render_with(|pos| {
            if snapshot.contains(&pos) {
                Some('A')
            } else if self
                .agents
                .iter()
                .any(|c| c.current_goal(&snapshot) == Some(pos))
            {
                Some('G')
            } else if self.items.contains(pos) {
                Some('*')
            } else {
                None
            }
        })
    }
}
