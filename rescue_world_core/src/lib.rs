use serde::{Deserialize, Serialize};

pub mod camera;
pub mod config;
pub mod entity;
pub mod environment;
pub mod instruction;
pub mod level;
pub mod map;
pub mod mission;
pub mod placement;
pub mod render;
pub mod scenario;
pub mod topology;
pub mod tutorial;

pub use camera::{CameraState, CameraStrategy, Viewport};
pub use config::{ConfigError, RescueConfig};
pub use entity::{Door, Entity, EntityKind, FakeVictim, Shift, Victim};
pub use environment::{Action, Observation, RescueEnvironment, StepResult};
pub use instruction::{MissionReport, MissionStatus, RescueInstruction, calculate_max_steps};
pub use level::{Level, LevelError};
pub use mission::GenerationError;
pub use scenario::{ScenarioError, infer_room_size, load_level_from_string};
pub use tutorial::Tutorial;

/// Represents a 2D tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    /// Creates a new `Position`.
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the neighbouring tile one step towards `direction`, or `None`
    /// when that step would leave the non-negative quadrant.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.vector();
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

/// Facing direction of the agent and of victims.
///
/// The discriminants follow the usual grid-world convention: 0 faces right
/// and each increment turns clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right = 0,
    Down = 1,
    Left = 2,
    Up = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    /// Unit step `(dx, dy)` with y growing downwards.
    pub fn vector(self) -> (isize, isize) {
        match self {
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
        }
    }

    /// Quarter turn counter-clockwise.
    pub fn turn_left(self) -> Direction {
        Direction::ALL[(self as usize + 3) % 4]
    }

    /// Quarter turn clockwise.
    pub fn turn_right(self) -> Direction {
        Direction::ALL[(self as usize + 1) % 4]
    }

    /// Half turn.
    pub fn opposite(self) -> Direction {
        Direction::ALL[(self as usize + 2) % 4]
    }

    /// Lower-case name used in registry names, e.g. `victim_up`.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Up => "up",
        }
    }
}

/// Colour of a door and of the key that opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyColor {
    Red,
    Green,
    Blue,
    Purple,
    Yellow,
    Grey,
}

impl KeyColor {
    pub const ALL: [KeyColor; 6] = [
        KeyColor::Red,
        KeyColor::Green,
        KeyColor::Blue,
        KeyColor::Purple,
        KeyColor::Yellow,
        KeyColor::Grey,
    ];

    /// Display colour of doors and keys of this colour.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            KeyColor::Red => [255, 0, 0],
            KeyColor::Green => [0, 255, 0],
            KeyColor::Blue => [0, 0, 255],
            KeyColor::Purple => [112, 39, 195],
            KeyColor::Yellow => [255, 255, 0],
            KeyColor::Grey => [100, 100, 100],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turning_cycles_through_all_directions() {
        let mut dir = Direction::Right;
        for expected in [Direction::Down, Direction::Left, Direction::Up, Direction::Right] {
            dir = dir.turn_right();
            assert_eq!(dir, expected);
        }
        assert_eq!(Direction::Up.turn_left(), Direction::Left);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn step_refuses_to_underflow() {
        assert_eq!(Position::new(0, 3).step(Direction::Left), None);
        assert_eq!(
            Position::new(2, 3).step(Direction::Up),
            Some(Position::new(2, 2))
        );
    }
}
