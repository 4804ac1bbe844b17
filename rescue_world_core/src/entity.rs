//! Closed catalogue of everything that can occupy a tile.
//!
//! The set of kinds is fixed at compile time. [`EntityKind::index`] continues
//! the standard grid-world object numbering (lava = 9, agent = 10) so encoded
//! observations stay compatible with tooling that knows those ids.

use serde::{Deserialize, Serialize};

use crate::{Direction, KeyColor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    #[error("Unknown entity kind '{0}'")]
    UnknownKind(String),
}

/// Which half of the tile a fake victim's T-shape is shifted towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Left,
    Right,
}

impl Shift {
    pub const ALL: [Shift; 2] = [Shift::Left, Shift::Right];

    pub fn name(self) -> &'static str {
        match self {
            Shift::Left => "left",
            Shift::Right => "right",
        }
    }
}

/// Axis-aligned rectangle in fractional tile space (`0.0..=1.0` on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

const fn quad(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Quad {
    Quad {
        x_min,
        x_max,
        y_min,
        y_max,
    }
}

/// A victim that counts towards the rescue objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Victim {
    pub direction: Direction,
}

impl Victim {
    pub fn new(direction: Direction) -> Self {
        Victim { direction }
    }

    /// Cross shape: a body bar plus an arm bar, oriented by `direction`.
    pub fn render_quads(&self) -> &'static [Quad; 2] {
        const UP: [Quad; 2] = [quad(0.45, 0.55, 0.30, 0.80), quad(0.25, 0.75, 0.30, 0.40)];
        const DOWN: [Quad; 2] = [quad(0.45, 0.55, 0.20, 0.70), quad(0.25, 0.75, 0.60, 0.70)];
        const LEFT: [Quad; 2] = [quad(0.20, 0.70, 0.45, 0.55), quad(0.20, 0.30, 0.25, 0.75)];
        const RIGHT: [Quad; 2] = [quad(0.30, 0.80, 0.45, 0.55), quad(0.70, 0.80, 0.25, 0.75)];
        match self.direction {
            Direction::Up => &UP,
            Direction::Down => &DOWN,
            Direction::Left => &LEFT,
            Direction::Right => &RIGHT,
        }
    }
}

/// A decoy: picking it up costs reward and never completes the mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FakeVictim {
    pub shift: Shift,
    pub direction: Direction,
}

impl FakeVictim {
    pub fn new(shift: Shift, direction: Direction) -> Self {
        FakeVictim { shift, direction }
    }

    /// Asymmetric T shape, offset off-centre by `shift`.
    pub fn render_quads(&self) -> &'static [Quad; 2] {
        const LEFT_UP: [Quad; 2] = [quad(0.40, 0.50, 0.30, 0.80), quad(0.20, 0.60, 0.30, 0.40)];
        const LEFT_DOWN: [Quad; 2] = [quad(0.40, 0.50, 0.20, 0.70), quad(0.20, 0.60, 0.60, 0.70)];
        const LEFT_LEFT: [Quad; 2] = [quad(0.20, 0.70, 0.40, 0.50), quad(0.20, 0.30, 0.20, 0.60)];
        const LEFT_RIGHT: [Quad; 2] = [quad(0.30, 0.80, 0.40, 0.50), quad(0.70, 0.80, 0.20, 0.60)];
        const RIGHT_UP: [Quad; 2] = [quad(0.50, 0.60, 0.30, 0.80), quad(0.40, 0.80, 0.30, 0.40)];
        const RIGHT_DOWN: [Quad; 2] = [quad(0.50, 0.60, 0.20, 0.70), quad(0.40, 0.80, 0.60, 0.70)];
        const RIGHT_LEFT: [Quad; 2] = [quad(0.20, 0.70, 0.50, 0.60), quad(0.20, 0.30, 0.30, 0.70)];
        const RIGHT_RIGHT: [Quad; 2] =
            [quad(0.30, 0.80, 0.50, 0.60), quad(0.70, 0.80, 0.30, 0.70)];
        match (self.shift, self.direction) {
            (Shift::Left, Direction::Up) => &LEFT_UP,
            (Shift::Left, Direction::Down) => &LEFT_DOWN,
            (Shift::Left, Direction::Left) => &LEFT_LEFT,
            (Shift::Left, Direction::Right) => &LEFT_RIGHT,
            (Shift::Right, Direction::Up) => &RIGHT_UP,
            (Shift::Right, Direction::Down) => &RIGHT_DOWN,
            (Shift::Right, Direction::Left) => &RIGHT_LEFT,
            (Shift::Right, Direction::Right) => &RIGHT_RIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Door {
    pub color: KeyColor,
    pub locked: bool,
    pub open: bool,
}

impl Door {
    /// A closed door; `locked` doors additionally need the matching key.
    pub fn closed(color: KeyColor, locked: bool) -> Self {
        Door {
            color,
            locked,
            open: false,
        }
    }
}

/// Anything that can occupy a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Wall,
    Lava,
    Key { color: KeyColor },
    Door(Door),
    Victim(Victim),
    FakeVictim(FakeVictim),
}

impl Entity {
    /// Whether the agent may step onto this tile.
    pub fn can_overlap(&self) -> bool {
        match self {
            Entity::Door(door) => door.open,
            Entity::Lava => true,
            Entity::Wall | Entity::Key { .. } | Entity::Victim(_) | Entity::FakeVictim(_) => false,
        }
    }

    /// Whether the pickup action removes this entity from the grid.
    pub fn can_pickup(&self) -> bool {
        matches!(
            self,
            Entity::Key { .. } | Entity::Victim(_) | Entity::FakeVictim(_)
        )
    }

    /// Registry kind of this entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Wall => EntityKind::Wall,
            Entity::Lava => EntityKind::Lava,
            Entity::Key { .. } => EntityKind::Key,
            Entity::Door(_) => EntityKind::Door,
            Entity::Victim(v) => EntityKind::Victim(v.direction),
            Entity::FakeVictim(f) => EntityKind::FakeVictim(f.shift, f.direction),
        }
    }
}

/// Colourless registry key for an entity variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Wall,
    Door,
    Key,
    Lava,
    Victim(Direction),
    FakeVictim(Shift, Direction),
}

const VICTIM_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Right,
    Direction::Left,
];

const FAKE_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Object id of an empty floor tile.
pub const EMPTY_INDEX: u8 = 1;
/// Object id of the agent's tile.
pub const AGENT_INDEX: u8 = 10;

impl EntityKind {
    /// Every registered kind, in index order.
    pub fn all() -> Vec<EntityKind> {
        let mut kinds = vec![
            EntityKind::Wall,
            EntityKind::Door,
            EntityKind::Key,
            EntityKind::Lava,
        ];
        kinds.extend(VICTIM_ORDER.iter().map(|d| EntityKind::Victim(*d)));
        for shift in Shift::ALL {
            kinds.extend(FAKE_ORDER.iter().map(|d| EntityKind::FakeVictim(shift, *d)));
        }
        kinds
    }

    /// Numeric object id written by [`Level::encode`](crate::level::Level::encode).
    pub fn index(self) -> u8 {
        let position = |order: &[Direction; 4], d: Direction| {
            order.iter().position(|o| *o == d).unwrap_or_default() as u8
        };
        match self {
            EntityKind::Wall => 2,
            EntityKind::Door => 4,
            EntityKind::Key => 5,
            EntityKind::Lava => 9,
            EntityKind::Victim(d) => 11 + position(&VICTIM_ORDER, d),
            EntityKind::FakeVictim(Shift::Left, d) => 15 + position(&FAKE_ORDER, d),
            EntityKind::FakeVictim(Shift::Right, d) => 19 + position(&FAKE_ORDER, d),
        }
    }

    /// Registry name, e.g. `fake_victim_left_up`.
    pub fn name(self) -> String {
        match self {
            EntityKind::Wall => "wall".to_string(),
            EntityKind::Door => "door".to_string(),
            EntityKind::Key => "key".to_string(),
            EntityKind::Lava => "lava".to_string(),
            EntityKind::Victim(d) => format!("victim_{}", d.name()),
            EntityKind::FakeVictim(s, d) => format!("fake_victim_{}_{}", s.name(), d.name()),
        }
    }

    /// Looks a kind up by its registry name, e.g. `fake_victim_left_up`.
    pub fn from_name(name: &str) -> Result<EntityKind, EntityError> {
        EntityKind::all()
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EntityError::UnknownKind(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn victims_block_movement_but_can_be_picked_up() {
        let real = Entity::Victim(Victim::new(Direction::Up));
        let fake = Entity::FakeVictim(FakeVictim::new(Shift::Right, Direction::Left));
        for entity in [real, fake] {
            assert!(!entity.can_overlap());
            assert!(entity.can_pickup());
        }
        assert!(!Entity::Lava.can_pickup());
        assert!(Entity::Door(Door { open: true, ..Door::closed(KeyColor::Red, false) }).can_overlap());
        assert!(!Entity::Door(Door::closed(KeyColor::Red, true)).can_overlap());
    }

    #[test]
    fn registry_holds_four_real_and_eight_fake_variants() {
        let kinds = EntityKind::all();
        let real = kinds.iter().filter(|k| matches!(k, EntityKind::Victim(_))).count();
        let fake = kinds
            .iter()
            .filter(|k| matches!(k, EntityKind::FakeVictim(..)))
            .count();
        assert_eq!((real, fake), (4, 8));

        let indices: HashSet<u8> = kinds.iter().map(|k| k.index()).collect();
        assert_eq!(indices.len(), kinds.len());
        assert_eq!(EntityKind::Victim(Direction::Up).index(), 11);
        assert_eq!(EntityKind::FakeVictim(Shift::Right, Direction::Right).index(), 22);
    }

    #[test]
    fn names_round_trip_through_the_registry() {
        for kind in EntityKind::all() {
            assert_eq!(EntityKind::from_name(&kind.name()), Ok(kind));
        }
    }

    #[test]
    fn unknown_variant_names_fail_loudly() {
        assert_eq!(
            EntityKind::from_name("fake_victim_up_up"),
            Err(EntityError::UnknownKind("fake_victim_up_up".to_string()))
        );
    }

    #[test]
    fn fake_shift_moves_the_shape_off_centre() {
        let left = FakeVictim::new(Shift::Left, Direction::Up).render_quads();
        let right = FakeVictim::new(Shift::Right, Direction::Up).render_quads();
        assert!(left[0].x_min < right[0].x_min);
    }
}
