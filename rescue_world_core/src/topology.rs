//! Locked-room topology: which rooms are locked, through which door, and
//! where each key lies.

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{
    Direction, KeyColor, Position,
    entity::Entity,
    level::Level,
    mission::GenerationError,
};

/// One locked room and its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedRoom {
    pub room: (usize, usize),
    pub slot: Direction,
    pub door: Position,
    pub color: KeyColor,
    pub key_room: (usize, usize),
    pub key: Position,
}

/// Locks `n_locked` rooms by rejection sampling.
///
/// Each draw picks a room that is neither locked nor holding a key, turns one
/// of its free interior door slots into a locked door with an unused colour,
/// and drops the key in a different unlocked room. Draws that hit a
/// non-candidate are discarded; after `max_attempts` draws the pass fails with
/// [`GenerationError::TopologyExhausted`].
pub fn add_locked_rooms<R: Rng + ?Sized>(
    level: &mut Level,
    n_locked: usize,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<LockedRoom>, GenerationError> {
    if n_locked > KeyColor::ALL.len() {
        return Err(GenerationError::OutOfKeyColors {
            requested: n_locked,
            available: KeyColor::ALL.len(),
        });
    }

    let mut locked: Vec<LockedRoom> = Vec::with_capacity(n_locked);
    let mut key_rooms: HashSet<(usize, usize)> = HashSet::new();
    let mut attempts = 0;

    while locked.len() < n_locked {
        if attempts >= max_attempts {
            return Err(GenerationError::TopologyExhausted {
                requested: n_locked,
                achieved: locked.len(),
                attempts,
            });
        }
        attempts += 1;

        let row = rng.random_range(0..level.num_rows());
        let col = rng.random_range(0..level.num_cols());
        let room = level.room(row, col);
        if room.locked || key_rooms.contains(&(row, col)) {
            continue;
        }
        let Some(&slot) = room.open_interior_slots().choose(rng) else {
            continue;
        };
        let candidates: Vec<(usize, usize)> = level
            .rooms()
            .iter()
            .filter(|r| !r.locked && (r.row, r.col) != (row, col))
            .map(|r| (r.row, r.col))
            .collect();
        let Some(&key_room) = candidates.choose(rng) else {
            continue;
        };
        let free_colors: Vec<KeyColor> = KeyColor::ALL
            .into_iter()
            .filter(|c| locked.iter().all(|l| l.color != *c))
            .collect();
        let Some(&color) = free_colors.choose(rng) else {
            continue;
        };

        let door = level.add_door(row, col, slot, color, true)?;
        level.room_mut(row, col).locked = true;
        let key = level.place_in_room(key_room.0, key_room.1, Entity::Key { color }, rng)?;
        key_rooms.insert(key_room);
        debug!(
            room = ?(row, col),
            slot = ?slot,
            color = ?color,
            key_room = ?key_room,
            "room_locked"
        );
        locked.push(LockedRoom {
            room: (row, col),
            slot,
            door,
            color,
            key_room,
            key,
        });
    }
    Ok(locked)
}
