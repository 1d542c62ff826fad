//! Per-agent planning and path following.
//!
//! Every agent runs the same state machine:
//!
//! ```text
//! Idle -> Planning -> Following -> Following      (next step)
//!                               -> Replanning     (discovery / change) -> Planning
//!                               -> Idle           (goals exhausted)
//!         Planning -> Teleport  (no path)         -> Planning
//! ```
//!
//! A simulation step is split into [`AgentController::decide`], which may
//! re-plan but never moves the agent, and [`AgentController::commit`], which
//! moves it. Multi-agent callers decide for every agent against one snapshot
//! of positions before committing any of them.

use crate::agent::Agent;
use crate::error::GridError;
use crate::grid::{Grid, Position};
use crate::pathfinding::{Path, Planner, Walkable};
use crate::visibility::{FogOfWar, KnowledgeMap};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    Idle,
    Planning,
    Following,
    Replanning,
    Teleport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HaltReason {
    GoalsExhausted,
    Unreachable,
    OutOfEnergy,
    Stopped,
}

/// Why a new path was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReplanTrigger {
    /// First plan for a goal, or the previous path ran out
    PathExhausted,
    /// The user picked a new goal
    GoalChanged,
    /// A moving target is no longer where the path ends
    GoalMoved,
    /// A wall turned up on the remaining path
    WallDiscovered(Position),
    /// Walls changed since the path was computed
    GridEdited,
}

/// Observable consequences of a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepEffect {
    Moved { from: Position, to: Position },
    EnergySpent(f64),
    GoalReached(Position),
    ItemCollected(Position),
    /// Health gained or lost through a step hook
    HealthChanged(f64),
    WallDiscovered(Position),
    Replanned { trigger: ReplanTrigger, steps: usize },
    NoPath { goal: Position },
    Teleported { from: Position, to: Position },
    Halted(HaltReason),
}

/// Where a goal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    Cell(Position),
    /// Chase another agent, located through the step snapshot
    Agent(usize),
}

/// Agent positions at the start of a step, indexed by agent id
pub type Snapshot = [Position];

pub struct AgentController {
    pub agent: Agent,
    planner: Planner,
    state: ControllerState,
    goals: VecDeque<Target>,
    reached: Vec<Position>,
    path: Option<Path>,
    planned_goal: Option<Position>,
    planned_revision: u64,
    step_goal: Option<Position>,
    pending: Option<ReplanTrigger>,
    knowledge: Option<KnowledgeMap>,
    vision_radius: i32,
    teleports: u32,
    max_teleports: u32,
    halt: Option<HaltReason>,
}

impl AgentController {
    pub fn new(agent: Agent, planner: Planner) -> Self {
        AgentController {
            agent,
            planner,
            state: ControllerState::Idle,
            goals: VecDeque::new(),
            reached: Vec::new(),
            path: None,
            planned_goal: None,
            planned_revision: 0,
            step_goal: None,
            pending: None,
            knowledge: None,
            vision_radius: 0,
            teleports: 0,
            max_teleports: 3,
            halt: None,
        }
    }

    /// Plan under partial observability with the given sight radius
    pub fn with_vision(mut self, grid: &Grid, radius: i32) -> Self {
        self.knowledge = Some(KnowledgeMap::new(grid));
        self.vision_radius = radius.max(1);
        self
    }

    pub fn with_max_teleports(mut self, max_teleports: u32) -> Self {
        self.max_teleports = max_teleports;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn knowledge(&self) -> Option<&KnowledgeMap> {
        self.knowledge.as_ref()
    }

    pub fn goals(&self) -> impl Iterator<Item = &Target> {
        self.goals.iter()
    }

    pub fn reached(&self) -> &[Position] {
        &self.reached
    }

    pub fn teleports(&self) -> u32 {
        self.teleports
    }

    pub fn is_idle(&self) -> bool {
        self.state == ControllerState::Idle
    }

    /// Replace every goal with `target` and start planning
    pub fn set_goal(&mut self, target: Target) {
        self.set_goals([target]);
    }

    /// Replace the goal queue. A drained agent keeps the goals but stays halted.
    pub fn set_goals<I: IntoIterator<Item = Target>>(&mut self, targets: I) {
        self.goals = targets.into_iter().collect();
        self.teleports = 0;
        if self.halt != Some(HaltReason::OutOfEnergy) {
            self.wake(ReplanTrigger::GoalChanged);
        }
    }

    /// Move the current goal. The path is re-planned on the next step.
    pub fn move_goal(&mut self, target: Target) {
        match self.goals.front_mut() {
            Some(front) => *front = target,
            None => self.goals.push_back(target),
        }
        if self.is_idle() && self.halt != Some(HaltReason::OutOfEnergy) {
            self.wake(ReplanTrigger::GoalMoved);
        }
    }

    pub fn stop(&mut self) {
        self.halt_with(HaltReason::Stopped);
    }

    fn wake(&mut self, trigger: ReplanTrigger) {
        self.halt = None;
        self.pending = Some(trigger);
        if self.state != ControllerState::Teleport {
            self.transition(ControllerState::Planning);
        }
    }

    fn transition(&mut self, next: ControllerState) {
        if self.state != next {
            debug!(agent = self.agent.id, from = ?self.state, to = ?next, "controller transition");
            self.state = next;
        }
    }

    fn halt_with(&mut self, reason: HaltReason) {
        debug!(agent = self.agent.id, ?reason, "controller halted");
        self.halt = Some(reason);
        self.pending = None;
        self.transition(ControllerState::Idle);
    }

    fn resolve(target: Target, snapshot: &Snapshot) -> Option<Position> {
        match target {
            Target::Cell(pos) => Some(pos),
            Target::Agent(id) => snapshot.get(id).copied(),
        }
    }

    /// Current goal position as seen from `snapshot`
    pub fn current_goal(&self, snapshot: &Snapshot) -> Option<Position> {
        self.goals.front().and_then(|&t| Self::resolve(t, snapshot))
    }

    /// Pick the next cell to move to, re-planning first when needed.
    ///
    /// Never moves the agent. Returns the effects produced so far and the
    /// intended next cell, if any.
    pub fn decide(&mut self, grid: &Grid, snapshot: &Snapshot) -> (Vec<StepEffect>, Option<Position>) {
        let mut effects = Vec::new();
        self.step_goal = None;

        if matches!(self.state, ControllerState::Idle | ControllerState::Teleport) {
            return (effects, None);
        }
        if self.agent.is_exhausted() {
            self.halt_with(HaltReason::OutOfEnergy);
            effects.push(StepEffect::Halted(HaltReason::OutOfEnergy));
            return (effects, None);
        }

        let position = self.agent.position;
        let mut discovered_on_path = None;
        if let Some(knowledge) = self.knowledge.as_mut() {
            for wall in knowledge.observe(grid, position, self.vision_radius) {
                effects.push(StepEffect::WallDiscovered(wall));
                let on_path = self
                    .path
                    .as_ref()
                    .is_some_and(|p| p.remaining().contains(&wall));
                if on_path && discovered_on_path.is_none() {
                    discovered_on_path = Some(wall);
                }
            }
        }

        // Arrive on goals that are already underfoot
        loop {
            let Some(goal) = self.current_goal(snapshot) else {
                self.halt_with(HaltReason::GoalsExhausted);
                effects.push(StepEffect::Halted(HaltReason::GoalsExhausted));
                return (effects, None);
            };
            if goal != position {
                self.step_goal = Some(goal);
                break;
            }
            self.arrive(goal, &mut effects);
        }
        let goal = self.step_goal.unwrap_or(position);

        let trigger = if let Some(pending) = self.pending.take() {
            Some(pending)
        } else if self.path.as_ref().map_or(true, Path::is_exhausted) {
            Some(ReplanTrigger::PathExhausted)
        } else if grid.revision != self.planned_revision {
            Some(ReplanTrigger::GridEdited)
        } else if self.planned_goal != Some(goal) {
            Some(ReplanTrigger::GoalMoved)
        } else {
            discovered_on_path.map(ReplanTrigger::WallDiscovered)
        };

        if let Some(trigger) = trigger {
            if self.state == ControllerState::Following {
                self.transition(ControllerState::Replanning);
            }
            self.transition(ControllerState::Planning);
            if !self.plan(grid, goal, trigger, &mut effects) {
                return (effects, None);
            }
        }

        let next = self.path.as_ref().and_then(Path::peek);
        (effects, next)
    }

    fn plan(&mut self, grid: &Grid, goal: Position, trigger: ReplanTrigger, effects: &mut Vec<StepEffect>) -> bool {
        let start = self.agent.position;
        let result = match &self.knowledge {
            Some(knowledge) => self.planner.plan(grid, start, goal, &FogOfWar { knowledge }),
            None => self.planner.plan(grid, start, goal, &Walkable),
        };

        match result {
            Ok(path) => {
                debug!(agent = self.agent.id, ?trigger, steps = path.len(), "planned");
                effects.push(StepEffect::Replanned {
                    trigger,
                    steps: path.len(),
                });
                self.path = Some(path);
                self.planned_goal = Some(goal);
                self.planned_revision = grid.revision;
                self.transition(ControllerState::Following);
                true
            }
            Err(GridError::NoPathFound { .. }) => {
                effects.push(StepEffect::NoPath { goal });
                self.path = None;
                self.planned_goal = None;
                if self.teleports < self.max_teleports {
                    self.transition(ControllerState::Teleport);
                } else {
                    self.halt_with(HaltReason::Unreachable);
                    effects.push(StepEffect::Halted(HaltReason::Unreachable));
                }
                false
            }
            Err(err) => {
                debug!(agent = self.agent.id, %err, "planning rejected");
                self.path = None;
                self.halt_with(HaltReason::Unreachable);
                effects.push(StepEffect::Halted(HaltReason::Unreachable));
                false
            }
        }
    }

    fn arrive(&mut self, goal: Position, effects: &mut Vec<StepEffect>) {
        self.goals.pop_front();
        self.reached.push(goal);
        self.teleports = 0;
        self.planned_goal = None;
        effects.push(StepEffect::GoalReached(goal));
    }

    /// Move onto `intent`, the cell returned by [`decide`](Self::decide)
    pub fn commit(&mut self, grid: &Grid, intent: Option<Position>) -> Vec<StepEffect> {
        let mut effects = Vec::new();
        let Some(next) = intent else {
            return effects;
        };
        let Some(path) = self.path.as_mut() else {
            return effects;
        };
        if path.peek() != Some(next) {
            return effects;
        }
        path.advance();

        let from = self.agent.position;
        let cost = self.planner.step_cost(grid, from, next);
        self.agent.step_to(next);
        effects.push(StepEffect::Moved { from, to: next });
        effects.push(StepEffect::EnergySpent(cost));
        let depleted = self.agent.spend_energy(cost);

        if self.step_goal == Some(next) {
            self.arrive(next, &mut effects);
            if self.goals.is_empty() {
                self.halt_with(HaltReason::GoalsExhausted);
                effects.push(StepEffect::Halted(HaltReason::GoalsExhausted));
                return effects;
            }
            self.transition(ControllerState::Planning);
        }

        if depleted {
            self.halt_with(HaltReason::OutOfEnergy);
            effects.push(StepEffect::Halted(HaltReason::OutOfEnergy));
        }
        effects
    }

    /// Decide and commit in one go, for an agent that shares the grid with
    /// nobody
    pub fn step(&mut self, grid: &Grid) -> Vec<StepEffect> {
        let snapshot = [self.agent.position];
        let (mut effects, intent) = self.decide(grid, &snapshot);
        effects.extend(self.commit(grid, intent));
        effects
    }

    /// Recover from a failed plan by jumping to `cell`
    pub fn teleport(&mut self, cell: Position) -> StepEffect {
        let from = self.agent.position;
        info!(agent = self.agent.id, %from, to = %cell, "teleporting after failed plan");
        self.agent.teleport(cell);
        self.teleports += 1;
        self.path = None;
        self.planned_goal = None;
        self.pending = Some(ReplanTrigger::PathExhausted);
        self.transition(ControllerState::Planning);
        StepEffect::Teleported { from, to: cell }
    }

    /// Give up on recovery
    pub fn abandon(&mut self) -> StepEffect {
        self.halt_with(HaltReason::Unreachable);
        StepEffect::Halted(HaltReason::Unreachable)
    }
}
