use crate::grid::Position;
use serde::Serialize;

/// A robot, player or creature occupying one grid cell
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Agent {
    pub id: usize,

    pub position: Position,

    /// Cell occupied before the most recent step, used to animate the move
    pub previous: Position,

    /// Spent by the cost of every step; infinite means unlimited
    pub energy: f64,

    pub health: f64,

    /// Items picked up from the grid
    pub inventory: u32,
}

impl Agent {
    pub fn new(id: usize, position: Position) -> Self {
        Agent {
            id,
            position,
            previous: position,
            energy: f64::INFINITY,
            health: 100.0,
            inventory: 0,
        }
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    /// Move onto an adjacent cell
    pub fn step_to(&mut self, cell: Position) {
        self.previous = self.position;
        self.position = cell;
    }

    /// Place the agent without animating from its old cell
    pub fn teleport(&mut self, cell: Position) {
        self.previous = cell;
        self.position = cell;
    }

    /// Subtract `amount` and report whether energy is now depleted
    pub fn spend_energy(&mut self, amount: f64) -> bool {
        self.energy = (self.energy - amount.max(0.0)).max(0.0);
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.energy <= 0.0
    }

    /// Position between `previous` and `position` in cell units,
    /// `t` in [0, 1] being the progress through the current step
    pub fn interpolated(&self, t: f32) -> (f32, f32) {
        let t = t.clamp(0.0, 1.0);
        let x = self.previous.x as f32 + (self.position.x - self.previous.x) as f32 * t;
        let y = self.previous.y as f32 + (self.position.y - self.previous.y) as f32 * t;
        (x, y)
    }
}
