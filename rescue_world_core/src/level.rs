//! Room-lattice tile world: walls, doors, object placement and reachability.
//!
//! Rooms are `room_size` tiles square and share their boundary walls with
//! their neighbours, so a `num_rows x num_cols` lattice spans
//! `(room_size - 1) * num_cols + 1` tiles horizontally (likewise vertically).
//! Door slots are indexed by [`Direction`]: right, down, left, up.

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{
    Direction, KeyColor, Position,
    entity::{AGENT_INDEX, Door, EMPTY_INDEX, Entity, Victim},
    map::{Grid, GridError},
    render::{Frame, render_tiles},
};

/// Rejection-sampling budget for a single placement.
pub const MAX_PLACEMENT_TRIES: usize = 1000;
/// Iteration budget for [`Level::connect_all`].
pub const MAX_CONNECT_ITERATIONS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("No free tile in room ({row}, {col}) after {MAX_PLACEMENT_TRIES} tries")]
    NoFreeCell { row: usize, col: usize },
    #[error("No free tile for the agent after {MAX_PLACEMENT_TRIES} tries")]
    NoFreeAgentCell,
    #[error("Room ({row}, {col}) has no neighbour on its {slot:?} side")]
    BoundaryDoor {
        row: usize,
        col: usize,
        slot: Direction,
    },
    #[error("Room ({row}, {col}) already has a door on its {slot:?} side")]
    DoorSlotTaken {
        row: usize,
        col: usize,
        slot: Direction,
    },
    #[error("Could not connect all rooms within {0} iterations")]
    ConnectFailed(usize),
    #[error("Unreachable {kind} at {position:?}")]
    Unreachable { position: Position, kind: String },
    #[error("The agent has not been placed")]
    NoAgent,
    #[error("Tile {0:?} is occupied")]
    Occupied(Position),
    #[error("Tile {0:?} is not on a wall shared by two rooms")]
    NotADoorSlot(Position),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// One cell of the room lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub row: usize,
    pub col: usize,
    /// Top-left tile, on the shared wall.
    pub top: Position,
    /// Width and height in tiles, walls included.
    pub size: (usize, usize),
    pub locked: bool,
    /// Tile of the installed door per side, if any.
    pub doors: [Option<Position>; 4],
    /// Pre-drawn door tile per interior side; shared with the neighbour.
    pub door_pos: [Option<Position>; 4],
    pub neighbors: [Option<(usize, usize)>; 4],
}

impl Room {
    /// Sides with no door yet that lead to another room.
    pub fn open_interior_slots(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|slot| {
                let i = *slot as usize;
                self.doors[i].is_none() && self.neighbors[i].is_some()
            })
            .collect()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.top.x
            && pos.y >= self.top.y
            && pos.x < self.top.x + self.size.0
            && pos.y < self.top.y + self.size.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentPose {
    pub position: Position,
    pub direction: Direction,
}

/// What happened when the agent tried to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Blocked,
    EnteredLava,
}

#[derive(Debug, Clone)]
pub struct Level {
    room_size: usize,
    num_rows: usize,
    num_cols: usize,
    tiles: Grid<Option<Entity>>,
    rooms: Vec<Room>,
    agent: Option<AgentPose>,
    carrying: Option<Entity>,
}

impl Level {
    /// Builds the walled lattice with door positions drawn from `rng`.
    /// No doors are installed yet.
    ///
    /// # Panics
    ///
    /// Panics if `room_size < 3` (no interior tile for a door) or if the
    /// lattice has no rooms.
    pub fn new<R: Rng + ?Sized>(
        room_size: usize,
        num_rows: usize,
        num_cols: usize,
        rng: &mut R,
    ) -> Self {
        assert!(room_size >= 3, "room_size must be at least 3, got {room_size}");
        assert!(num_rows > 0 && num_cols > 0, "a level needs at least one room");
        let step = room_size - 1;
        let width = step * num_cols + 1;
        let height = step * num_rows + 1;
        let mut tiles: Grid<Option<Entity>> = Grid::new(width, height);
        let mut rooms = Vec::with_capacity(num_rows * num_cols);

        for row in 0..num_rows {
            for col in 0..num_cols {
                let top = Position::new(col * step, row * step);
                for i in 0..room_size {
                    for pos in [
                        Position::new(top.x + i, top.y),
                        Position::new(top.x + i, top.y + step),
                        Position::new(top.x, top.y + i),
                        Position::new(top.x + step, top.y + i),
                    ] {
                        tiles[pos] = Some(Entity::Wall);
                    }
                }

                let mut room = Room {
                    row,
                    col,
                    top,
                    size: (room_size, room_size),
                    locked: false,
                    doors: [None; 4],
                    door_pos: [None; 4],
                    neighbors: [None; 4],
                };
                if col + 1 < num_cols {
                    room.neighbors[Direction::Right as usize] = Some((row, col + 1));
                    room.door_pos[Direction::Right as usize] = Some(Position::new(
                        top.x + step,
                        rng.random_range(top.y + 1..top.y + step),
                    ));
                }
                if row + 1 < num_rows {
                    room.neighbors[Direction::Down as usize] = Some((row + 1, col));
                    room.door_pos[Direction::Down as usize] = Some(Position::new(
                        rng.random_range(top.x + 1..top.x + step),
                        top.y + step,
                    ));
                }
                if col > 0 {
                    let left: &Room = &rooms[row * num_cols + col - 1];
                    room.neighbors[Direction::Left as usize] = Some((row, col - 1));
                    room.door_pos[Direction::Left as usize] =
                        left.door_pos[Direction::Right as usize];
                }
                if row > 0 {
                    let above: &Room = &rooms[(row - 1) * num_cols + col];
                    room.neighbors[Direction::Up as usize] = Some((row - 1, col));
                    room.door_pos[Direction::Up as usize] =
                        above.door_pos[Direction::Down as usize];
                }
                rooms.push(room);
            }
        }

        Level {
            room_size,
            num_rows,
            num_cols,
            tiles,
            rooms,
            agent: None,
            carrying: None,
        }
    }

    /// Grid width in tiles.
    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    /// Grid height in tiles.
    pub fn height(&self) -> usize {
        self.tiles.height()
    }

    pub fn room_size(&self) -> usize {
        self.room_size
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// The tile grid, without the agent.
    pub fn tiles(&self) -> &Grid<Option<Entity>> {
        &self.tiles
    }

    /// Room at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `(row, col)` lies outside the lattice.
    pub fn room(&self, row: usize, col: usize) -> &Room {
        &self.rooms[row * self.num_cols + col]
    }

    pub fn room_mut(&mut self, row: usize, col: usize) -> &mut Room {
        &mut self.rooms[row * self.num_cols + col]
    }

    /// All rooms in row-major order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Entity on `pos`; `None` for empty floor or out-of-bounds positions.
    pub fn get(&self, pos: Position) -> Option<&Entity> {
        self.tiles.get(pos).and_then(Option::as_ref)
    }

    /// Overwrites the tile at `pos`.
    pub fn set(&mut self, pos: Position, entity: Option<Entity>) -> Result<(), LevelError> {
        self.tiles.set(pos, entity)?;
        Ok(())
    }

    /// Removes and returns whatever occupies `pos`.
    pub fn take(&mut self, pos: Position) -> Option<Entity> {
        self.tiles.get_mut(pos).and_then(Option::take)
    }

    /// Maps a tile to the `(row, col)` of the room containing it. Tiles on a
    /// shared wall belong to the room to their right/below.
    pub fn room_from_pos(&self, pos: Position) -> Option<(usize, usize)> {
        if !self.tiles.contains(pos) {
            return None;
        }
        let step = self.room_size - 1;
        let col = (pos.x / step).min(self.num_cols - 1);
        let row = (pos.y / step).min(self.num_rows - 1);
        Some((row, col))
    }

    pub fn agent(&self) -> Option<AgentPose> {
        self.agent
    }

    pub fn agent_pos(&self) -> Option<Position> {
        self.agent.map(|a| a.position)
    }

    /// What the agent holds, if anything.
    pub fn carrying(&self) -> Option<&Entity> {
        self.carrying.as_ref()
    }

    /// Puts the agent on `pos`, which must be empty or walkable.
    pub fn set_agent(&mut self, position: Position, direction: Direction) -> Result<(), LevelError> {
        if !self.tiles.contains(position) {
            return Err(GridError::OutOfBounds {
                x: position.x,
                y: position.y,
                width: self.width(),
                height: self.height(),
            }
            .into());
        }
        if self.get(position).is_some_and(|e| !e.can_overlap()) {
            return Err(LevelError::Occupied(position));
        }
        self.agent = Some(AgentPose {
            position,
            direction,
        });
        Ok(())
    }

    /// Tile directly in front of the agent.
    pub fn front_pos(&self) -> Option<Position> {
        let agent = self.agent?;
        agent
            .position
            .step(agent.direction)
            .filter(|p| self.tiles.contains(*p))
    }

    fn is_free(&self, pos: Position) -> bool {
        self.tiles.get(pos).is_some_and(Option::is_none) && self.agent_pos() != Some(pos)
    }

    fn sample_free<R: Rng + ?Sized>(
        &self,
        top: Position,
        size: (usize, usize),
        rng: &mut R,
    ) -> Option<Position> {
        (0..MAX_PLACEMENT_TRIES)
            .map(|_| {
                Position::new(
                    rng.random_range(top.x..top.x + size.0),
                    rng.random_range(top.y..top.y + size.1),
                )
            })
            .find(|pos| self.is_free(*pos))
    }

    /// Drops `entity` on a random free tile of room `(row, col)`.
    pub fn place_in_room<R: Rng + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        entity: Entity,
        rng: &mut R,
    ) -> Result<Position, LevelError> {
        let room = self.room(row, col);
        let pos = self
            .sample_free(room.top, room.size, rng)
            .ok_or(LevelError::NoFreeCell { row, col })?;
        self.tiles[pos] = Some(entity);
        Ok(pos)
    }

    /// Puts the agent on a random free tile anywhere, facing a random way.
    pub fn place_agent<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Position, LevelError> {
        self.agent = None;
        let pos = self
            .sample_free(Position::new(0, 0), (self.width(), self.height()), rng)
            .ok_or(LevelError::NoFreeAgentCell)?;
        let direction = *Direction::ALL.choose(rng).unwrap_or(&Direction::Right);
        self.agent = Some(AgentPose {
            position: pos,
            direction,
        });
        Ok(pos)
    }

    /// Installs a closed door on the `slot` side of room `(row, col)` and
    /// registers it with the neighbour on the other side.
    pub fn add_door(
        &mut self,
        row: usize,
        col: usize,
        slot: Direction,
        color: KeyColor,
        locked: bool,
    ) -> Result<Position, LevelError> {
        let i = slot as usize;
        let room = self.room(row, col);
        let (Some((n_row, n_col)), Some(pos)) = (room.neighbors[i], room.door_pos[i]) else {
            return Err(LevelError::BoundaryDoor { row, col, slot });
        };
        if room.doors[i].is_some() {
            return Err(LevelError::DoorSlotTaken { row, col, slot });
        }
        self.tiles[pos] = Some(Entity::Door(Door::closed(color, locked)));
        self.room_mut(row, col).doors[i] = Some(pos);
        self.room_mut(n_row, n_col).doors[slot.opposite() as usize] = Some(pos);
        Ok(pos)
    }

    /// Installs `door` on any tile of a shared wall, moving that side's
    /// pre-drawn door position to `pos`. Used by hand-built layouts.
    pub fn install_door_at(&mut self, pos: Position, door: Door) -> Result<(), LevelError> {
        if !self.tiles.contains(pos) {
            return Err(LevelError::NotADoorSlot(pos));
        }
        let step = self.room_size - 1;
        let on_column_wall = pos.x % step == 0 && pos.y % step != 0;
        let on_row_wall = pos.y % step == 0 && pos.x % step != 0;
        let (row, col, slot) = match (on_column_wall, on_row_wall) {
            (true, false) if pos.x > 0 && pos.x < self.width() - 1 => {
                (pos.y / step, pos.x / step - 1, Direction::Right)
            }
            (false, true) if pos.y > 0 && pos.y < self.height() - 1 => {
                (pos.y / step - 1, pos.x / step, Direction::Down)
            }
            _ => return Err(LevelError::NotADoorSlot(pos)),
        };
        let i = slot as usize;
        if self.room(row, col).doors[i].is_some() {
            return Err(LevelError::DoorSlotTaken { row, col, slot });
        }
        let Some((n_row, n_col)) = self.room(row, col).neighbors[i] else {
            return Err(LevelError::BoundaryDoor { row, col, slot });
        };
        self.tiles[pos] = Some(Entity::Door(door));
        let room = self.room_mut(row, col);
        room.doors[i] = Some(pos);
        room.door_pos[i] = Some(pos);
        let back = slot.opposite() as usize;
        let neighbor = self.room_mut(n_row, n_col);
        neighbor.doors[back] = Some(pos);
        neighbor.door_pos[back] = Some(pos);
        Ok(())
    }

    /// Rooms reachable from room (0, 0) through installed doors.
    fn connected_rooms(&self) -> HashSet<(usize, usize)> {
        let mut seen = HashSet::new();
        let mut stack = vec![(0, 0)];
        while let Some((row, col)) = stack.pop() {
            if !seen.insert((row, col)) {
                continue;
            }
            let room = self.room(row, col);
            for i in 0..4 {
                if let (Some(_), Some(next)) = (room.doors[i], room.neighbors[i]) {
                    stack.push(next);
                }
            }
        }
        seen
    }

    /// Adds random unlocked doors until every room is connected. Locked rooms
    /// never receive extra doors. Returns the number of doors added.
    pub fn connect_all<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, LevelError> {
        let mut added = 0;
        for _ in 0..=MAX_CONNECT_ITERATIONS {
            if self.connected_rooms().len() == self.rooms.len() {
                debug!(doors_added = added, "rooms_connected");
                return Ok(added);
            }
            let row = rng.random_range(0..self.num_rows);
            let col = rng.random_range(0..self.num_cols);
            let slot = Direction::ALL[rng.random_range(0..4)];
            let room = self.room(row, col);
            let i = slot as usize;
            let Some((n_row, n_col)) = room.neighbors[i] else {
                continue;
            };
            if room.doors[i].is_some() || room.locked || self.room(n_row, n_col).locked {
                continue;
            }
            let color = KeyColor::ALL[rng.random_range(0..KeyColor::ALL.len())];
            self.add_door(row, col, slot, color, false)?;
            added += 1;
        }
        Err(LevelError::ConnectFailed(MAX_CONNECT_ITERATIONS))
    }

    /// Verifies that every non-wall object can be reached from the agent.
    ///
    /// Empty tiles, doors and pickable objects are walkable (pickables can be
    /// carried or rescued out of the way); lava and walls stop the search. A
    /// locked door only opens once a key of its colour has been reached.
    pub fn check_objs_reachable(&self) -> Result<(), LevelError> {
        let start = self.agent_pos().ok_or(LevelError::NoAgent)?;
        let mut reached: Grid<bool> = Grid::new(self.width(), self.height());
        let mut keys: HashSet<KeyColor> = HashSet::new();
        if let Some(Entity::Key { color }) = self.carrying {
            keys.insert(color);
        }
        let mut pending: Vec<(Position, KeyColor)> = Vec::new();
        let mut stack = vec![start];

        let push_neighbors = |stack: &mut Vec<Position>, pos: Position| {
            stack.extend(Direction::ALL.iter().filter_map(|d| pos.step(*d)));
        };

        loop {
            while let Some(pos) = stack.pop() {
                if reached.get(pos) != Some(&false) {
                    continue;
                }
                reached[pos] = true;
                match self.get(pos) {
                    None => push_neighbors(&mut stack, pos),
                    Some(Entity::Wall | Entity::Lava) => {}
                    Some(Entity::Door(door)) if door.locked && !keys.contains(&door.color) => {
                        pending.push((pos, door.color));
                    }
                    Some(Entity::Key { color }) => {
                        keys.insert(*color);
                        push_neighbors(&mut stack, pos);
                    }
                    Some(_) => push_neighbors(&mut stack, pos),
                }
            }
            let (ready, waiting): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|(_, color)| keys.contains(color));
            pending = waiting;
            if ready.is_empty() {
                break;
            }
            for (pos, _) in ready {
                push_neighbors(&mut stack, pos);
            }
        }

        for (pos, cell) in self.tiles.enumerate() {
            match cell {
                Some(entity) if *entity != Entity::Wall && !reached[pos] => {
                    return Err(LevelError::Unreachable {
                        position: pos,
                        kind: entity.kind().name(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Object id of every tile: [`EMPTY_INDEX`] for floor, the registry
    /// index for entities and [`AGENT_INDEX`] under the agent.
    pub fn encode(&self) -> Grid<u8> {
        let mut ids: Grid<u8> = Grid::new(self.width(), self.height());
        for (pos, cell) in self.tiles.enumerate() {
            ids[pos] = cell.as_ref().map_or(EMPTY_INDEX, |e| e.kind().index());
        }
        if let Some(pos) = self.agent_pos() {
            ids[pos] = AGENT_INDEX;
        }
        ids
    }

    /// Number of door tiles on the grid.
    pub fn count_doors(&self) -> usize {
        self.tiles
            .iter()
            .filter(|cell| matches!(cell, Some(Entity::Door(_))))
            .count()
    }

    /// Real victims still on the grid, in row-major tile order.
    pub fn real_victims(&self) -> Vec<(Position, Victim)> {
        self.tiles
            .enumerate()
            .filter_map(|(pos, cell)| match cell {
                Some(Entity::Victim(v)) => Some((pos, *v)),
                _ => None,
            })
            .collect()
    }

    pub fn count_real_victims(&self) -> usize {
        self.tiles
            .iter()
            .filter(|cell| matches!(cell, Some(Entity::Victim(_))))
            .count()
    }

    /// Rotates the agent a quarter turn counter-clockwise.
    pub fn turn_left(&mut self) {
        if let Some(agent) = self.agent.as_mut() {
            agent.direction = agent.direction.turn_left();
        }
    }

    /// Rotates the agent a quarter turn clockwise.
    pub fn turn_right(&mut self) {
        if let Some(agent) = self.agent.as_mut() {
            agent.direction = agent.direction.turn_right();
        }
    }

    pub fn move_forward(&mut self) -> MoveOutcome {
        let Some(front) = self.front_pos() else {
            return MoveOutcome::Blocked;
        };
        let target = self.get(front).copied();
        if target.is_some_and(|e| !e.can_overlap()) {
            return MoveOutcome::Blocked;
        }
        if let Some(agent) = self.agent.as_mut() {
            agent.position = front;
        }
        match target {
            Some(Entity::Lava) => MoveOutcome::EnteredLava,
            _ => MoveOutcome::Moved,
        }
    }

    /// Moves a pickable object from the front tile into the carry slot.
    pub fn pickup(&mut self) -> Option<Entity> {
        if self.carrying.is_some() {
            return None;
        }
        let front = self.front_pos()?;
        if !self.get(front)?.can_pickup() {
            return None;
        }
        self.carrying = self.take(front);
        self.carrying
    }

    /// Puts the carried object on the front tile if it is empty.
    pub fn drop_carried(&mut self) -> bool {
        let Some(front) = self.front_pos() else {
            return false;
        };
        if self.carrying.is_none() || self.get(front).is_some() {
            return false;
        }
        self.tiles[front] = self.carrying.take();
        true
    }

    /// Opens or closes the door ahead. Locked doors need the matching key in
    /// hand; the key is kept.
    pub fn toggle(&mut self) -> bool {
        let Some(front) = self.front_pos() else {
            return false;
        };
        let held = match self.carrying {
            Some(Entity::Key { color }) => Some(color),
            _ => None,
        };
        match self.tiles.get_mut(front) {
            Some(Some(Entity::Door(door))) => {
                if door.locked {
                    if held == Some(door.color) {
                        door.locked = false;
                        door.open = true;
                        return true;
                    }
                    false
                } else {
                    door.open = !door.open;
                    true
                }
            }
            _ => false,
        }
    }

    /// Renders the whole level, agent included.
    pub fn render(&self, tile_size: usize) -> Frame {
        render_tiles(
            &self.tiles,
            tile_size,
            self.agent.map(|a| (a.position, a.direction)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FakeVictim;
    use rand::{SeedableRng, rngs::StdRng};

    fn level(rows: usize, cols: usize) -> (Level, StdRng) {
        let mut rng = StdRng::seed_from_u64(7);
        (Level::new(6, rows, cols, &mut rng), rng)
    }

    #[test]
    fn lattice_dimensions_share_walls() {
        let (level, _) = level(2, 3);
        assert_eq!((level.width(), level.height()), (16, 11));
        assert_eq!(level.get(Position::new(5, 2)), Some(&Entity::Wall));
        assert_eq!(level.get(Position::new(3, 3)), None);
        assert_eq!(level.room(1, 2).top, Position::new(10, 5));
    }

    #[test]
    fn encoding_uses_registry_indices() {
        let (mut level, _) = level(1, 2);
        level
            .set(Position::new(2, 2), Some(Entity::Victim(Victim::new(Direction::Up))))
            .unwrap();
        level.set(Position::new(3, 3), Some(Entity::Lava)).unwrap();
        level.set_agent(Position::new(1, 1), Direction::Down).unwrap();
        let ids = level.encode();
        assert_eq!(ids[Position::new(0, 0)], 2);
        assert_eq!(ids[Position::new(2, 2)], 11);
        assert_eq!(ids[Position::new(3, 3)], 9);
        assert_eq!(ids[Position::new(1, 1)], AGENT_INDEX);
        assert_eq!(ids[Position::new(1, 2)], EMPTY_INDEX);
    }

    #[test]
    #[should_panic(expected = "room_size must be at least 3")]
    fn rooms_without_an_interior_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        Level::new(2, 1, 2, &mut rng);
    }

    #[test]
    fn neighbouring_rooms_share_door_positions() {
        let (level, _) = level(2, 2);
        let a = level.room(0, 0);
        assert_eq!(
            a.door_pos[Direction::Right as usize],
            level.room(0, 1).door_pos[Direction::Left as usize]
        );
        assert_eq!(a.door_pos[Direction::Up as usize], None);
        assert_eq!(a.neighbors[Direction::Down as usize], Some((1, 0)));
    }

    #[test]
    fn room_from_pos_clamps_the_far_wall() {
        let (level, _) = level(2, 2);
        assert_eq!(level.room_from_pos(Position::new(2, 2)), Some((0, 0)));
        assert_eq!(level.room_from_pos(Position::new(5, 2)), Some((0, 1)));
        assert_eq!(level.room_from_pos(Position::new(10, 10)), Some((1, 1)));
        assert_eq!(level.room_from_pos(Position::new(11, 0)), None);
    }

    #[test]
    fn add_door_rejects_boundary_and_taken_slots() {
        let (mut level, _) = level(1, 2);
        assert_eq!(
            level.add_door(0, 0, Direction::Left, KeyColor::Red, false),
            Err(LevelError::BoundaryDoor {
                row: 0,
                col: 0,
                slot: Direction::Left
            })
        );
        let pos = level
            .add_door(0, 0, Direction::Right, KeyColor::Red, true)
            .unwrap();
        assert_eq!(level.room(0, 1).doors[Direction::Left as usize], Some(pos));
        assert!(matches!(
            level.add_door(0, 1, Direction::Left, KeyColor::Blue, false),
            Err(LevelError::DoorSlotTaken { .. })
        ));
    }

    #[test]
    fn place_in_room_stays_inside_and_avoids_the_agent() {
        let (mut level, mut rng) = level(1, 1);
        level
            .set_agent(Position::new(1, 1), Direction::Right)
            .unwrap();
        // 4x4 interior minus the agent tile.
        for _ in 0..15 {
            let pos = level
                .place_in_room(0, 0, Entity::Lava, &mut rng)
                .unwrap();
            assert!(pos != Position::new(1, 1));
            assert!(level.room(0, 0).contains(pos));
        }
        assert_eq!(
            level.place_in_room(0, 0, Entity::Lava, &mut rng),
            Err(LevelError::NoFreeCell { row: 0, col: 0 })
        );
    }

    #[test]
    fn install_door_at_moves_the_shared_slot() {
        let (mut level, _) = level(2, 2);
        let pos = Position::new(5, 8);
        level
            .install_door_at(pos, Door::closed(KeyColor::Red, false))
            .unwrap();
        assert_eq!(level.room(1, 0).doors[Direction::Right as usize], Some(pos));
        assert_eq!(level.room(1, 1).door_pos[Direction::Left as usize], Some(pos));
        assert_eq!(
            level.install_door_at(Position::new(5, 5), Door::closed(KeyColor::Red, false)),
            Err(LevelError::NotADoorSlot(Position::new(5, 5)))
        );
        assert_eq!(
            level.install_door_at(Position::new(0, 3), Door::closed(KeyColor::Red, false)),
            Err(LevelError::NotADoorSlot(Position::new(0, 3)))
        );
    }

    #[test]
    fn connect_all_links_every_room_and_skips_locked_ones() {
        let (mut level, mut rng) = level(3, 3);
        level.room_mut(1, 1).locked = true;
        level
            .add_door(1, 1, Direction::Up, KeyColor::Red, true)
            .unwrap();
        level.connect_all(&mut rng).unwrap();
        assert_eq!(level.connected_rooms().len(), 9);
        let centre = level.room(1, 1);
        assert_eq!(centre.doors.iter().flatten().count(), 1);
    }

    #[test]
    fn locked_door_needs_its_key_to_be_reachable() {
        let (mut level, _) = level(1, 2);
        let door = level
            .add_door(0, 0, Direction::Right, KeyColor::Blue, true)
            .unwrap();
        level
            .set_agent(Position::new(1, 1), Direction::Right)
            .unwrap();
        level
            .set(Position::new(7, 2), Some(Entity::Victim(Victim::new(Direction::Up))))
            .unwrap();
        assert!(matches!(
            level.check_objs_reachable(),
            Err(LevelError::Unreachable { .. })
        ));

        level
            .set(Position::new(2, 3), Some(Entity::Key { color: KeyColor::Blue }))
            .unwrap();
        assert_eq!(level.check_objs_reachable(), Ok(()));
        assert!(level.room(0, 0).doors.contains(&Some(door)));
    }

    #[test]
    fn lava_blocks_the_flood_fill() {
        let (mut level, _) = level(1, 1);
        level
            .set_agent(Position::new(1, 1), Direction::Right)
            .unwrap();
        // Wall off the bottom-right corner with lava.
        for pos in [Position::new(3, 4), Position::new(4, 3)] {
            level.set(pos, Some(Entity::Lava)).unwrap();
        }
        level
            .set(
                Position::new(4, 4),
                Some(Entity::FakeVictim(FakeVictim::new(
                    crate::entity::Shift::Left,
                    Direction::Up,
                ))),
            )
            .unwrap();
        assert!(matches!(
            level.check_objs_reachable(),
            Err(LevelError::Unreachable { position, .. }) if position == Position::new(4, 4)
        ));
    }

    #[test]
    fn toggle_unlocks_with_matching_key_only() {
        let (mut level, _) = level(1, 2);
        let door = level
            .add_door(0, 0, Direction::Right, KeyColor::Green, true)
            .unwrap();
        level
            .set_agent(Position::new(door.x - 1, door.y), Direction::Right)
            .unwrap();
        assert!(!level.toggle());
        assert_eq!(level.move_forward(), MoveOutcome::Blocked);

        level.carrying = Some(Entity::Key {
            color: KeyColor::Green,
        });
        assert!(level.toggle());
        assert_eq!(level.move_forward(), MoveOutcome::Moved);
        assert_eq!(level.agent_pos(), Some(door));
        assert_eq!(level.room_from_pos(door), Some((0, 1)));
        assert!(level.carrying().is_some());
    }

    #[test]
    fn pickup_and_drop_use_the_single_carry_slot() {
        let (mut level, _) = level(1, 1);
        level
            .set_agent(Position::new(1, 1), Direction::Down)
            .unwrap();
        level
            .set(Position::new(1, 2), Some(Entity::Key { color: KeyColor::Red }))
            .unwrap();
        assert_eq!(level.pickup(), Some(Entity::Key { color: KeyColor::Red }));
        assert_eq!(level.get(Position::new(1, 2)), None);
        assert_eq!(level.pickup(), None);
        assert!(level.drop_carried());
        assert!(level.carrying().is_none());
        assert!(level.get(Position::new(1, 2)).is_some());
    }
}
