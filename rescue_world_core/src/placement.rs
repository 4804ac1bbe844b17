//! Per-room placement policies for hazards and victims.
//!
//! Both policies walk the room lattice row by row, so a seeded RNG reproduces
//! the same layout. Placement is best-effort: a room that runs out of free
//! tiles simply ends up with fewer entities.

use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{
    Direction,
    config::{HazardConfig, VictimConfig},
    entity::{Entity, FakeVictim, Shift, Victim},
    level::Level,
};

/// Placement attempts per room before giving up on the remaining hazards.
pub const HAZARD_ATTEMPTS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct HazardPlacer {
    pub fixed_count_per_room: usize,
    pub probability: f64,
}

impl HazardPlacer {
    pub fn new(fixed_count_per_room: usize, probability: f64) -> Self {
        HazardPlacer {
            fixed_count_per_room,
            probability,
        }
    }

    /// Places up to `count` lava tiles in one room; returns how many landed.
    pub fn place_in_room<R: Rng + ?Sized>(
        &self,
        level: &mut Level,
        row: usize,
        col: usize,
        count: usize,
        rng: &mut R,
    ) -> usize {
        let mut placed = 0;
        for _ in 0..HAZARD_ATTEMPTS {
            if placed >= count {
                break;
            }
            if level.place_in_room(row, col, Entity::Lava, rng).is_ok() {
                placed += 1;
            }
        }
        if placed < count {
            debug!(row, col, requested = count, placed, "hazard_placement_short");
        }
        placed
    }

    /// Decides and places the hazards of every room. Returns the total placed.
    pub fn place_all<R: Rng + ?Sized>(
        &self,
        level: &mut Level,
        skip_locked_rooms: bool,
        rng: &mut R,
    ) -> usize {
        let mut total = 0;
        for row in 0..level.num_rows() {
            for col in 0..level.num_cols() {
                if skip_locked_rooms && level.room(row, col).locked {
                    continue;
                }
                let count = if self.fixed_count_per_room > 0 {
                    self.fixed_count_per_room
                } else if rng.random_bool(self.probability) {
                    rng.random_range(1..=3)
                } else {
                    0
                };
                if count > 0 {
                    total += self.place_in_room(level, row, col, count, rng);
                }
            }
        }
        total
    }
}

impl From<&HazardConfig> for HazardPlacer {
    fn from(config: &HazardConfig) -> Self {
        HazardPlacer::new(config.per_room, config.probability)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VictimPlacer {
    pub num_fake_per_room: usize,
    pub num_real_per_room: usize,
    pub important_variant: Direction,
}

/// Victims actually placed by [`VictimPlacer::place_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VictimTally {
    pub real: usize,
    pub fake: usize,
}

impl VictimPlacer {
    pub fn new(num_fake_per_room: usize, num_real_per_room: usize, important_variant: Direction) -> Self {
        VictimPlacer {
            num_fake_per_room,
            num_real_per_room,
            important_variant,
        }
    }

    /// Real-victim variants used outside locked rooms.
    pub fn ordinary_variants(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| *d != self.important_variant)
            .collect()
    }

    fn pick_real<R: Rng + ?Sized>(&self, locked: bool, ordinary: &[Direction], rng: &mut R) -> Victim {
        if locked {
            return Victim::new(self.important_variant);
        }
        Victim::new(*ordinary.choose(rng).unwrap_or(&self.important_variant))
    }

    fn pick_fake<R: Rng + ?Sized>(rng: &mut R) -> FakeVictim {
        FakeVictim::new(
            Shift::ALL[rng.random_range(0..Shift::ALL.len())],
            Direction::ALL[rng.random_range(0..Direction::ALL.len())],
        )
    }

    /// Places real then fake victims in every room. Locked rooms always get
    /// the important variant; other rooms never do.
    pub fn place_all<R: Rng + ?Sized>(&self, level: &mut Level, rng: &mut R) -> VictimTally {
        let ordinary = self.ordinary_variants();
        let mut tally = VictimTally::default();
        for row in 0..level.num_rows() {
            for col in 0..level.num_cols() {
                let locked = level.room(row, col).locked;
                for _ in 0..self.num_real_per_room {
                    let victim = self.pick_real(locked, &ordinary, rng);
                    match level.place_in_room(row, col, Entity::Victim(victim), rng) {
                        Ok(_) => tally.real += 1,
                        Err(error) => debug!(row, col, %error, "real_victim_skipped"),
                    }
                }
                for _ in 0..self.num_fake_per_room {
                    let fake = Self::pick_fake(rng);
                    match level.place_in_room(row, col, Entity::FakeVictim(fake), rng) {
                        Ok(_) => tally.fake += 1,
                        Err(error) => debug!(row, col, %error, "fake_victim_skipped"),
                    }
                }
            }
        }
        tally
    }
}

impl From<&VictimConfig> for VictimPlacer {
    fn from(config: &VictimConfig) -> Self {
        VictimPlacer::new(
            config.fake_per_room,
            config.real_per_room,
            config.important_variant,
        )
    }
}
