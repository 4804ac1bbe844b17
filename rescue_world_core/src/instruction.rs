//! The rescue objective and its completion check.

use serde::{Deserialize, Serialize};

use crate::{entity::Victim, level::Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Continue,
    Success,
}

impl MissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionStatus::Continue => "continue",
            MissionStatus::Success => "success",
        }
    }
}

/// Snapshot returned by `RescueEnvironment::get_mission_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionReport {
    pub status: MissionStatus,
    pub saved_victims: usize,
    pub remaining_victims: usize,
}

/// Mutable half of the instruction, rebound on every episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifierState {
    /// Room the agent stood in when the verifier was bound. `None` waives the
    /// leave-the-room condition.
    pub start_room: Option<(usize, usize)>,
    /// Real victims no longer on the grid; never decreases.
    pub rescued: usize,
    pub completed: bool,
}

/// "Pick up all victims, then leave the room you started in."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescueInstruction {
    roster: Vec<Victim>,
    verifier: VerifierState,
}

impl RescueInstruction {
    pub fn new(roster: Vec<Victim>) -> Self {
        RescueInstruction {
            roster,
            verifier: VerifierState::default(),
        }
    }

    /// Builds the roster from the real victims currently on `level`.
    pub fn from_level(level: &Level) -> Self {
        Self::new(level.real_victims().into_iter().map(|(_, v)| v).collect())
    }

    /// Real victims present when the mission was built.
    pub fn roster(&self) -> &[Victim] {
        &self.roster
    }

    pub fn num_victims(&self) -> usize {
        self.roster.len()
    }

    pub fn verifier(&self) -> &VerifierState {
        &self.verifier
    }

    /// Mission text shown to the player.
    pub fn surface(&self) -> String {
        format!("pick up all {} victims", self.num_victims())
    }

    /// Binds the verifier to the live level and records the start room.
    pub fn reset_verifier(&mut self, level: &Level) {
        self.verifier = VerifierState {
            start_room: level.agent_pos().and_then(|pos| level.room_from_pos(pos)),
            rescued: 0,
            completed: false,
        };
    }

    /// True once no real victim is left and the agent is outside its start
    /// room.
    fn is_satisfied(&self, level: &Level) -> bool {
        if level.count_real_victims() > 0 {
            return false;
        }
        let current_room = level.agent_pos().and_then(|pos| level.room_from_pos(pos));
        match (self.verifier.start_room, current_room) {
            (Some(start), Some(current)) => start != current,
            _ => true,
        }
    }

    /// Reads the mission status without touching the verifier.
    pub fn status(&self, level: &Level) -> MissionStatus {
        if self.verifier.completed || self.is_satisfied(level) {
            MissionStatus::Success
        } else {
            MissionStatus::Continue
        }
    }

    /// Updates the rescued counter and latches success the first time the
    /// mission is satisfied. Success is sticky for the rest of the episode.
    pub fn verify(&mut self, level: &Level) -> MissionStatus {
        let remaining = level.count_real_victims();
        self.verifier.rescued = self
            .verifier
            .rescued
            .max(self.roster.len().saturating_sub(remaining));
        if !self.verifier.completed && self.is_satisfied(level) {
            self.verifier.completed = true;
        }
        if self.verifier.completed {
            MissionStatus::Success
        } else {
            MissionStatus::Continue
        }
    }
}

/// Estimates a step limit for a human-paced episode.
///
/// Each room costs `exploration_factor * room_size²` steps to explore, each door
/// one more room's worth for backtracking, and each real victim
/// `steps_per_victim` to approach and rescue. The sum is scaled by
/// `safety_buffer` and truncated.
#[allow(clippy::too_many_arguments)]
pub fn calculate_max_steps(
    room_size: usize,
    num_rows: usize,
    num_cols: usize,
    num_doors: usize,
    victims_per_room: usize,
    exploration_factor: f64,
    steps_per_victim: usize,
    safety_buffer: f64,
) -> usize {
    let num_rooms = (num_rows * num_cols) as f64;
    let nav_per_room = exploration_factor * (room_size * room_size) as f64;
    let exploration = num_rooms * nav_per_room;
    let backtracking = num_doors as f64 * nav_per_room;
    let rescue = num_rooms * (victims_per_room * steps_per_victim) as f64;
    ((exploration + backtracking + rescue) * safety_buffer) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Position, entity::Entity};

    #[test]
    fn surface_counts_the_roster() {
        let instr = RescueInstruction::new(vec![Victim::new(Direction::Up); 3]);
        assert_eq!(instr.surface(), "pick up all 3 victims");
    }

    #[test]
    fn max_steps_matches_the_reference_layout() {
        // 9 rooms of 8x8 at 0.5 => 288 exploration, 12 doors => 384, 9 victims => 45.
        assert_eq!(calculate_max_steps(8, 3, 3, 12, 1, 0.5, 5, 1.0), 717);
        assert_eq!(calculate_max_steps(8, 3, 3, 12, 1, 0.5, 5, 2.0), 1434);
    }

    #[test]
    fn max_steps_never_decreases_with_layout_size() {
        let base = |rows, cols, doors, victims| {
            calculate_max_steps(6, rows, cols, doors, victims, 0.5, 5, 1.0)
        };
        let mut prev = 0;
        for (rows, cols) in [(1, 1), (1, 2), (2, 2), (2, 3), (3, 3), (4, 4)] {
            let steps = base(rows, cols, 4, 1);
            assert!(steps >= prev);
            prev = steps;
        }
        for doors in 0..10 {
            assert!(base(2, 2, doors + 1, 1) >= base(2, 2, doors, 1));
        }
        for victims in 0..10 {
            assert!(base(2, 2, 4, victims + 1) >= base(2, 2, 4, victims));
        }
    }

    /// Two rooms of size 5, the agent in the left one with two real victims.
    fn two_victims() -> (Level, RescueInstruction) {
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
        let mut level = Level::new(5, 1, 2, &mut rng);
        for pos in [Position::new(2, 2), Position::new(3, 3)] {
            level
                .set(pos, Some(Entity::Victim(Victim::new(Direction::Up))))
                .unwrap();
        }
        level.set_agent(Position::new(1, 1), Direction::Right).unwrap();
        let mut instr = RescueInstruction::from_level(&level);
        instr.reset_verifier(&level);
        (level, instr)
    }

    #[test]
    fn rescued_counter_climbs_and_never_drops() {
        let (mut level, mut instr) = two_victims();
        assert_eq!(instr.verify(&level), MissionStatus::Continue);
        assert_eq!(instr.verifier().rescued, 0);

        level.take(Position::new(2, 2));
        assert_eq!(instr.verify(&level), MissionStatus::Continue);
        assert_eq!(instr.verifier().rescued, 1);

        level.take(Position::new(3, 3));
        // Still in the start room.
        assert_eq!(instr.verify(&level), MissionStatus::Continue);
        assert_eq!(instr.verifier().rescued, 2);

        level.set_agent(Position::new(6, 2), Direction::Right).unwrap();
        assert_eq!(instr.verify(&level), MissionStatus::Success);
        assert!(instr.verifier().completed);

        // A victim reappearing after success changes neither the count nor the status.
        level
            .set(Position::new(2, 2), Some(Entity::Victim(Victim::new(Direction::Up))))
            .unwrap();
        assert_eq!(instr.verify(&level), MissionStatus::Success);
        assert_eq!(instr.verifier().rescued, 2);
    }

    #[test]
    fn status_reads_without_latching() {
        let (mut level, instr) = two_victims();
        level.take(Position::new(2, 2));
        level.take(Position::new(3, 3));
        level.set_agent(Position::new(6, 2), Direction::Right).unwrap();
        assert_eq!(instr.status(&level), MissionStatus::Success);
        assert!(!instr.verifier().completed);
        assert_eq!(instr.verifier().rescued, 0);

        level.set_agent(Position::new(1, 1), Direction::Right).unwrap();
        assert_eq!(instr.status(&level), MissionStatus::Continue);
    }

    #[test]
    fn unbound_verifier_waives_the_room_condition() {
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
        let level = Level::new(5, 1, 2, &mut rng);
        let mut instr = RescueInstruction::new(Vec::new());
        assert_eq!(instr.verify(&level), MissionStatus::Success);
    }
}
