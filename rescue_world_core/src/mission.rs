//! The mission generation pipeline run on every reset.

use rand::Rng;
use tracing::debug;

use crate::{
    Position,
    config::RescueConfig,
    instruction::RescueInstruction,
    level::{Level, LevelError},
    placement::{HazardPlacer, VictimPlacer, VictimTally},
    topology::{LockedRoom, add_locked_rooms},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Locked {achieved} of {requested} rooms before giving up after {attempts} draws")]
    TopologyExhausted {
        requested: usize,
        achieved: usize,
        attempts: usize,
    },
    #[error("{requested} locked rooms need more than the {available} key colours")]
    OutOfKeyColors { requested: usize, available: usize },
    #[error("Agent kept landing in a locked room ({attempts} draws)")]
    AgentPlacementExhausted { attempts: usize },
    #[error("Level rejected: {0}")]
    Level(#[from] LevelError),
    #[error("Invalid config: {0}")]
    Config(String),
    #[error("No valid mission after {attempts} attempts; last failure: {last}")]
    AttemptsExhausted {
        attempts: usize,
        last: Box<GenerationError>,
    },
}

/// Everything `generate` decided besides the tiles it wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMission {
    pub instruction: RescueInstruction,
    pub locked_rooms: Vec<LockedRoom>,
    pub hazards: usize,
    pub victims: VictimTally,
    pub agent_start: Position,
}

/// Draws agent positions until one lands outside every locked room.
pub fn place_agent_outside_locked_rooms<R: Rng + ?Sized>(
    level: &mut Level,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Position, GenerationError> {
    for _ in 0..max_attempts {
        let pos = level.place_agent(rng)?;
        let locked = level
            .room_from_pos(pos)
            .is_some_and(|(row, col)| level.room(row, col).locked);
        if !locked {
            return Ok(pos);
        }
    }
    Err(GenerationError::AgentPlacementExhausted {
        attempts: max_attempts,
    })
}

/// Populates a freshly built `level` with a complete rescue mission.
///
/// The steps run in a fixed order: locked rooms and keys, remaining doors,
/// hazards, the agent, a reachability check, victims, and finally the
/// instruction. With `unblocking` off, any unreachable object rejects the
/// attempt; the caller is expected to retry on a new level.
pub fn generate<R: Rng + ?Sized>(
    level: &mut Level,
    config: &RescueConfig,
    rng: &mut R,
) -> Result<GeneratedMission, GenerationError> {
    let locked_rooms = add_locked_rooms(
        level,
        config.num_locked_rooms(),
        config.max_topology_attempts,
        rng,
    )?;
    level.connect_all(rng)?;

    let hazards = if config.hazards.enabled {
        HazardPlacer::from(&config.hazards).place_all(
            level,
            config.hazards.skip_locked_rooms,
            rng,
        )
    } else {
        0
    };

    let agent_start =
        place_agent_outside_locked_rooms(level, config.max_agent_placement_attempts, rng)?;

    if !config.unblocking {
        level.check_objs_reachable()?;
    }

    let victims = VictimPlacer::from(&config.victims).place_all(level, rng);

    if !config.unblocking && config.revalidate_victims {
        level.check_objs_reachable()?;
    }

    let instruction = RescueInstruction::from_level(level);
    debug!(
        locked_rooms = locked_rooms.len(),
        hazards,
        real_victims = victims.real,
        fake_victims = victims.fake,
        agent_start = ?agent_start,
        "mission_generated"
    );
    Ok(GeneratedMission {
        instruction,
        locked_rooms,
        hazards,
        victims,
        agent_start,
    })
}
