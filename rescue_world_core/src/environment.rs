//! The episode facade: generation on reset, the pickup-aware step, scoring,
//! and the camera view.

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Direction, Position,
    camera::{CameraContext, CameraState, CameraStrategy, Viewport},
    config::RescueConfig,
    entity::{Entity, Victim},
    instruction::{MissionReport, MissionStatus, RescueInstruction, calculate_max_steps},
    level::{AgentPose, Level, LevelError, MoveOutcome},
    map::Grid,
    mission::{self, GenerationError},
    render::Frame,
    topology::LockedRoom,
};

pub const REAL_VICTIM_REWARD: f64 = 1.0;
pub const FAKE_VICTIM_PENALTY: f64 = -0.5;
/// Added on the step whose pickup completes the mission.
pub const MISSION_BONUS: f64 = 1.0;

/// Actions an agent can take in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Left,
    Right,
    Forward,
    Pickup,
    Drop,
    Toggle,
    Done,
}

/// What the agent is told after every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub agent: AgentPose,
    pub carrying: Option<Entity>,
    pub mission: String,
    /// Object ids of the whole level, see [`Level::encode`].
    pub objects: Grid<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    /// True only on the step that completed the mission.
    pub mission_complete: bool,
    pub status: MissionStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

/// Outcome of the rescue check on the tile in front of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rescue {
    Real,
    Fake,
    Nothing,
}

/// Removes a victim in front of the agent, if there is one.
fn rescue_in_front(level: &mut Level) -> Rescue {
    let Some(front) = level.front_pos() else {
        return Rescue::Nothing;
    };
    let outcome = match level.get(front) {
        Some(Entity::Victim(_)) => Rescue::Real,
        Some(Entity::FakeVictim(_)) => Rescue::Fake,
        _ => return Rescue::Nothing,
    };
    level.take(front);
    outcome
}

/// One rescue episode at a time over a generated (or loaded) level.
pub struct RescueEnvironment {
    config: RescueConfig,
    rng: StdRng,
    level: Level,
    instruction: RescueInstruction,
    locked_rooms: Vec<LockedRoom>,
    camera: CameraStrategy,
    camera_state: CameraState,
    step_count: usize,
    max_steps: usize,
    saved_victims: usize,
    score: f64,
}

impl RescueEnvironment {
    /// Validates `config` and generates the first episode.
    pub fn new(config: RescueConfig) -> Result<Self, GenerationError> {
        config
            .validate()
            .map_err(|e| GenerationError::Config(e.to_string()))?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (level, generated) = Self::generate_episode(&config, &mut rng)?;
        let camera = config.camera.strategy();
        let mut env = RescueEnvironment {
            config,
            rng,
            level,
            instruction: generated.instruction,
            locked_rooms: generated.locked_rooms,
            camera,
            camera_state: CameraState::default(),
            step_count: 0,
            max_steps: 0,
            saved_victims: 0,
            score: 0.0,
        };
        env.begin_episode();
        Ok(env)
    }

    /// Wraps a hand-built level. The level must already hold the agent.
    pub fn with_level(config: RescueConfig, level: Level) -> Result<Self, LevelError> {
        let agent = level.agent().ok_or(LevelError::NoAgent)?;
        debug!(position = ?agent.position, "scenario_loaded");
        let rng = StdRng::seed_from_u64(config.seed.unwrap_or_default());
        let camera = config.camera.strategy();
        let mut env = RescueEnvironment {
            config,
            rng,
            instruction: RescueInstruction::from_level(&level),
            level,
            locked_rooms: Vec::new(),
            camera,
            camera_state: CameraState::default(),
            step_count: 0,
            max_steps: 0,
            saved_victims: 0,
            score: 0.0,
        };
        env.begin_episode();
        Ok(env)
    }

    fn generate_episode(
        config: &RescueConfig,
        rng: &mut StdRng,
    ) -> Result<(Level, mission::GeneratedMission), GenerationError> {
        let mut last = GenerationError::Config("no generation attempt was made".into());
        for attempt in 1..=config.max_generation_attempts {
            let mut level = Level::new(config.room_size, config.num_rows, config.num_cols, rng);
            match mission::generate(&mut level, config, rng) {
                Ok(generated) => {
                    debug!(attempt, "mission_accepted");
                    return Ok((level, generated));
                }
                Err(error) => {
                    debug!(attempt, %error, "mission_rejected");
                    last = error;
                }
            }
        }
        warn!(
            attempts = config.max_generation_attempts,
            last = %last,
            "mission_generation_exhausted"
        );
        Err(GenerationError::AttemptsExhausted {
            attempts: config.max_generation_attempts,
            last: Box::new(last),
        })
    }

    /// Zeroes the episode counters and binds the verifier to the current level.
    fn begin_episode(&mut self) {
        let budget = &self.config.step_budget;
        self.max_steps = self
            .config
            .max_steps
            .unwrap_or_else(|| {
                calculate_max_steps(
                    self.level.room_size(),
                    self.level.num_rows(),
                    self.level.num_cols(),
                    self.level.count_doors(),
                    self.config.victims.real_per_room,
                    budget.exploration_factor,
                    budget.steps_per_victim,
                    budget.safety_buffer,
                )
            })
            .max(1);
        self.step_count = 0;
        self.saved_victims = 0;
        self.score = 0.0;
        self.camera_state.reset();
        self.instruction.reset_verifier(&self.level);
        info!(
            rooms = self.level.rooms().len(),
            locked_rooms = self.locked_rooms.len(),
            victims = self.instruction.num_victims(),
            max_steps = self.max_steps,
            "episode_started"
        );
    }

    /// Generates a fresh episode. A seed reseeds the generator first.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<Observation, GenerationError> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let (level, generated) = Self::generate_episode(&self.config, &mut self.rng)?;
        self.level = level;
        self.instruction = generated.instruction;
        self.locked_rooms = generated.locked_rooms;
        self.begin_episode();
        Ok(self.observation())
    }

    /// Replaces the current episode with a hand-built level.
    pub fn load_scenario(&mut self, level: Level) -> Result<Observation, LevelError> {
        if level.agent().is_none() {
            return Err(LevelError::NoAgent);
        }
        self.instruction = RescueInstruction::from_level(&level);
        self.level = level;
        self.locked_rooms.clear();
        self.begin_episode();
        Ok(self.observation())
    }

    fn pose(&self) -> AgentPose {
        self.level.agent().unwrap_or(AgentPose {
            position: Position::new(0, 0),
            direction: Direction::Right,
        })
    }

    /// What the agent sees right now, without advancing the episode.
    pub fn observation(&self) -> Observation {
        Observation {
            agent: self.pose(),
            carrying: self.level.carrying().copied(),
            mission: self.instruction.surface(),
            objects: self.level.encode(),
        }
    }

    /// Advances the episode by one action.
    pub fn step(&mut self, action: Action) -> StepResult {
        if action == Action::Pickup {
            return self.step_pickup();
        }
        self.step_count += 1;
        let mut terminated = false;
        match action {
            Action::Left => self.level.turn_left(),
            Action::Right => self.level.turn_right(),
            Action::Forward => {
                if self.level.move_forward() == MoveOutcome::EnteredLava {
                    debug!(step = self.step_count, "agent_entered_lava");
                    terminated = true;
                }
            }
            Action::Drop => {
                self.level.drop_carried();
            }
            Action::Toggle => {
                self.level.toggle();
            }
            Action::Pickup | Action::Done => {}
        }
        self.finish_step(0.0, terminated, false)
    }

    /// Pickup with rescue semantics: a victim in front is removed and scored
    /// instead of being carried. Anything else is an ordinary pickup.
    pub fn step_pickup(&mut self) -> StepResult {
        self.step_count += 1;
        let reward = match rescue_in_front(&mut self.level) {
            Rescue::Real => {
                self.saved_victims += 1;
                debug!(
                    saved = self.saved_victims,
                    remaining = self.level.count_real_victims(),
                    "victim_rescued"
                );
                REAL_VICTIM_REWARD
            }
            Rescue::Fake => {
                debug!("fake_victim_picked");
                FAKE_VICTIM_PENALTY
            }
            Rescue::Nothing => {
                self.level.pickup();
                0.0
            }
        };
        self.finish_step(reward, false, true)
    }

    fn finish_step(&mut self, mut reward: f64, mut terminated: bool, via_pickup: bool) -> StepResult {
        let was_complete = self.instruction.verifier().completed;
        let status = self.instruction.verify(&self.level);
        let mut mission_complete = false;
        if status == MissionStatus::Success {
            terminated = true;
            if !was_complete {
                mission_complete = true;
                reward += if via_pickup {
                    MISSION_BONUS
                } else {
                    1.0 - 0.9 * (self.step_count as f64 / self.max_steps as f64)
                };
                info!(
                    steps = self.step_count,
                    saved = self.saved_victims,
                    "mission_complete"
                );
            }
        }
        let truncated = self.step_count >= self.max_steps;
        self.score += reward;
        StepResult {
            observation: self.observation(),
            reward,
            terminated,
            truncated,
            info: StepInfo {
                mission_complete,
                status,
            },
        }
    }

    /// Real victims still on the grid.
    pub fn get_all_victims(&self) -> Vec<(Position, Victim)> {
        self.level.real_victims()
    }

    /// Current status with saved and remaining counts. Reading the status
    /// never completes the mission; only [`step`](Self::step) does.
    pub fn get_mission_status(&self) -> MissionReport {
        MissionReport {
            status: self.instruction.status(&self.level),
            saved_victims: self.saved_victims,
            remaining_victims: self.level.count_real_victims(),
        }
    }

    fn camera_context(&self) -> CameraContext {
        let pose = self.pose();
        CameraContext {
            agent_pos: pose.position,
            agent_dir: pose.direction,
            room_size: self
                .level
                .room_from_pos(pose.position)
                .map(|(row, col)| self.level.room(row, col).size),
            grid_dims: (self.level.width(), self.level.height()),
        }
    }

    /// Tile rectangle the active camera shows for the current pose.
    pub fn camera_viewport(&mut self) -> Viewport {
        let ctx = self.camera_context();
        self.camera.viewport(&mut self.camera_state, &ctx)
    }

    /// Renders the level and crops it to the active camera.
    pub fn get_camera_view(&mut self) -> Frame {
        let ctx = self.camera_context();
        let frame = self.level.render(self.camera.tile_size());
        self.camera.crop(&mut self.camera_state, &frame, &ctx)
    }

    /// Swaps the camera. The new camera starts without memory.
    pub fn switch_camera(&mut self, camera: CameraStrategy) {
        debug!(mode = ?camera.mode(), "camera_switched");
        self.camera = camera;
        self.camera_state.reset();
    }

    /// Natural-language mission, e.g. "pick up all 9 victims".
    pub fn mission_text(&self) -> String {
        self.instruction.surface()
    }

    /// The active camera.
    pub fn camera(&self) -> &CameraStrategy {
        &self.camera
    }

    pub fn config(&self) -> &RescueConfig {
        &self.config
    }

    /// The live level, including the agent and what it carries.
    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn instruction(&self) -> &RescueInstruction {
        &self.instruction
    }

    /// Locked rooms and their key rooms. Empty for hand-built levels.
    pub fn locked_rooms(&self) -> &[LockedRoom] {
        &self.locked_rooms
    }

    /// Steps taken in the current episode.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Step limit of the current episode; reaching it truncates.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Real victims rescued this episode.
    pub fn saved_victims(&self) -> usize {
        self.saved_victims
    }

    /// Sum of the rewards paid this episode.
    pub fn score(&self) -> f64 {
        self.score
    }
}
