//! Viewport selection over the rendered level.
//!
//! A [`CameraStrategy`] decides which tile rectangle of the level is shown.
//! Only the edge-follow strategy has memory; that memory lives in a
//! [`CameraState`] owned by the episode and passed in on every call, so
//! resetting an episode is just [`CameraState::reset`].

use serde::{Deserialize, Serialize};

use crate::{Direction, Position, config::ConfigError, render::Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    FullView,
    RoomCentered,
    EdgeFollow,
}

/// Camera settings as they appear in [`RescueConfig`](crate::RescueConfig).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub mode: CameraMode,
    pub tile_size: usize,
    /// Tiles added around the room for the room-centred camera.
    pub extra_tiles: (usize, usize),
    /// Window size for the edge-follow camera.
    pub view_tiles: (usize, usize),
    pub margin: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            mode: CameraMode::EdgeFollow,
            tile_size: 32,
            extra_tiles: (4, 4),
            view_tiles: (12, 12),
            margin: 3,
        }
    }
}

impl CameraConfig {
    pub fn strategy(&self) -> CameraStrategy {
        self.strategy_for(self.mode)
    }

    /// Builds the strategy for `mode` from these settings.
    pub fn strategy_for(&self, mode: CameraMode) -> CameraStrategy {
        match mode {
            CameraMode::FullView => CameraStrategy::FullView {
                tile_size: self.tile_size,
            },
            CameraMode::RoomCentered => CameraStrategy::RoomCentered {
                extra_tiles: self.extra_tiles,
                tile_size: self.tile_size,
            },
            CameraMode::EdgeFollow => CameraStrategy::EdgeFollow(EdgeFollowConfig {
                view_tiles: self.view_tiles,
                margin: self.margin,
                tile_size: self.tile_size,
            }),
        }
    }

    /// Checks that the active mode's window fits the grid.
    pub fn validate(&self, grid_dims: (usize, usize)) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::Invalid("camera.tile_size must be positive".into()));
        }
        if self.mode == CameraMode::EdgeFollow {
            let (w, h) = self.view_tiles;
            if w > grid_dims.0 || h > grid_dims.1 {
                return Err(ConfigError::Invalid(format!(
                    "camera view {w}x{h} exceeds the {}x{} grid",
                    grid_dims.0, grid_dims.1
                )));
            }
            if 2 * self.margin >= w.min(h) {
                return Err(ConfigError::Invalid(format!(
                    "camera margin {} leaves no dead-zone in a {w}x{h} view",
                    self.margin
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeFollowConfig {
    pub view_tiles: (usize, usize),
    pub margin: usize,
    pub tile_size: usize,
}

impl Default for EdgeFollowConfig {
    fn default() -> Self {
        EdgeFollowConfig {
            view_tiles: (12, 12),
            margin: 3,
            tile_size: 64,
        }
    }
}

/// Edge-follow memory: the current window origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraState {
    top_x: usize,
    top_y: usize,
    initialized: bool,
}

impl CameraState {
    /// Forgets the window so the next frame recentres on the agent.
    pub fn reset(&mut self) {
        self.initialized = false;
    }

    pub fn top_left(&self) -> Option<Position> {
        self.initialized
            .then(|| Position::new(self.top_x, self.top_y))
    }
}

/// Per-frame inputs for a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraContext {
    pub agent_pos: Position,
    pub agent_dir: Direction,
    /// Size in tiles of the room the agent stands in.
    pub room_size: Option<(usize, usize)>,
    pub grid_dims: (usize, usize),
}

/// Tile rectangle selected by a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.y >= self.y && pos.x < self.x + self.width && pos.y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraStrategy {
    FullView { tile_size: usize },
    RoomCentered {
        extra_tiles: (usize, usize),
        tile_size: usize,
    },
    EdgeFollow(EdgeFollowConfig),
}

/// Clamps a window origin into `[0, grid - view]`.
fn clamp_origin(origin: i64, grid: usize, view: usize) -> usize {
    origin.min(grid as i64 - view as i64).max(0) as usize
}

/// Shifts `top` by however far `agent` sits outside the dead-zone
/// `[top + margin, top + view - margin - 1]`.
fn follow_axis(top: i64, agent: i64, view: usize, margin: usize) -> i64 {
    let low = top + margin as i64;
    let high = top + view as i64 - margin as i64 - 1;
    if agent < low {
        top - (low - agent)
    } else if agent > high {
        top + (agent - high)
    } else {
        top
    }
}

impl CameraStrategy {
    /// Pixels per tile side in rendered frames.
    pub fn tile_size(&self) -> usize {
        match self {
            CameraStrategy::FullView { tile_size } => *tile_size,
            CameraStrategy::RoomCentered { tile_size, .. } => *tile_size,
            CameraStrategy::EdgeFollow(config) => config.tile_size,
        }
    }

    /// Which of the three strategies this is.
    pub fn mode(&self) -> CameraMode {
        match self {
            CameraStrategy::FullView { .. } => CameraMode::FullView,
            CameraStrategy::RoomCentered { .. } => CameraMode::RoomCentered,
            CameraStrategy::EdgeFollow(_) => CameraMode::EdgeFollow,
        }
    }

    /// Picks the visible tile rectangle, updating `state` for edge-follow.
    pub fn viewport(&self, state: &mut CameraState, ctx: &CameraContext) -> Viewport {
        let (grid_w, grid_h) = ctx.grid_dims;
        let agent_x = ctx.agent_pos.x as i64;
        let agent_y = ctx.agent_pos.y as i64;
        match self {
            CameraStrategy::FullView { .. } => Viewport {
                x: 0,
                y: 0,
                width: grid_w,
                height: grid_h,
            },
            CameraStrategy::RoomCentered { extra_tiles, .. } => {
                let (room_w, room_h) = ctx.room_size.unwrap_or(ctx.grid_dims);
                let width = room_w + extra_tiles.0;
                let height = room_h + extra_tiles.1;
                Viewport {
                    x: clamp_origin(agent_x - (width / 2) as i64, grid_w, width),
                    y: clamp_origin(agent_y - (height / 2) as i64, grid_h, height),
                    width,
                    height,
                }
            }
            CameraStrategy::EdgeFollow(config) => {
                let (view_w, view_h) = config.view_tiles;
                if !state.initialized {
                    state.top_x = (agent_x - (view_w / 2) as i64).max(0) as usize;
                    state.top_y = (agent_y - (view_h / 2) as i64).max(0) as usize;
                    state.initialized = true;
                }
                let top_x = follow_axis(state.top_x as i64, agent_x, view_w, config.margin);
                let top_y = follow_axis(state.top_y as i64, agent_y, view_h, config.margin);
                state.top_x = clamp_origin(top_x, grid_w, view_w);
                state.top_y = clamp_origin(top_y, grid_h, view_h);
                Viewport {
                    x: state.top_x,
                    y: state.top_y,
                    width: view_w,
                    height: view_h,
                }
            }
        }
    }

    /// Crops `frame`, rendered at [`Self::tile_size`], to this camera's view.
    pub fn crop(&self, state: &mut CameraState, frame: &Frame, ctx: &CameraContext) -> Frame {
        if let CameraStrategy::FullView { .. } = self {
            return frame.clone();
        }
        let vp = self.viewport(state, ctx);
        let ts = self.tile_size();
        frame.crop(vp.x * ts, vp.y * ts, vp.width * ts, vp.height * ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(x: usize, y: usize) -> CameraContext {
        CameraContext {
            agent_pos: Position::new(x, y),
            agent_dir: Direction::Right,
            room_size: Some((8, 8)),
            grid_dims: (22, 22),
        }
    }

    fn edge() -> CameraStrategy {
        CameraStrategy::EdgeFollow(EdgeFollowConfig::default())
    }

    #[test]
    fn full_view_covers_the_grid() {
        let mut state = CameraState::default();
        let vp = CameraStrategy::FullView { tile_size: 8 }.viewport(&mut state, &ctx(3, 3));
        assert_eq!(vp, Viewport { x: 0, y: 0, width: 22, height: 22 });
    }

    #[test]
    fn room_centered_clamps_to_grid_bounds() {
        let cam = CameraStrategy::RoomCentered {
            extra_tiles: (4, 4),
            tile_size: 8,
        };
        let mut state = CameraState::default();
        assert_eq!(cam.viewport(&mut state, &ctx(11, 11)).x, 5);
        assert_eq!(cam.viewport(&mut state, &ctx(1, 1)).x, 0);
        let far = cam.viewport(&mut state, &ctx(20, 20));
        assert_eq!((far.x, far.y), (10, 10));
        assert_eq!(state, CameraState::default());
    }

    #[test]
    fn edge_follow_first_frame_centres_on_the_agent() {
        let mut state = CameraState::default();
        let vp = edge().viewport(&mut state, &ctx(11, 9));
        assert_eq!((vp.x, vp.y), (5, 3));
        assert_eq!(state.top_left(), Some(Position::new(5, 3)));
    }

    #[test]
    fn edge_follow_holds_still_inside_the_dead_zone() {
        let cam = edge();
        let mut state = CameraState::default();
        cam.viewport(&mut state, &ctx(11, 11));
        // Dead-zone for origin (5, 5) is [8, 13] on both axes.
        for (x, y) in [(8, 8), (13, 13), (10, 12), (8, 13), (11, 11)] {
            let vp = cam.viewport(&mut state, &ctx(x, y));
            assert_eq!((vp.x, vp.y), (5, 5), "agent at ({x}, {y})");
        }
    }

    #[test]
    fn edge_follow_snaps_by_the_overshoot() {
        let cam = edge();
        let mut state = CameraState::default();
        cam.viewport(&mut state, &ctx(11, 11));
        let vp = cam.viewport(&mut state, &ctx(14, 11));
        assert_eq!((vp.x, vp.y), (6, 5));
        let vp = cam.viewport(&mut state, &ctx(14, 6));
        assert_eq!((vp.x, vp.y), (6, 3));
    }

    #[test]
    fn edge_follow_clamps_after_shifting() {
        let cam = edge();
        let mut state = CameraState::default();
        cam.viewport(&mut state, &ctx(11, 11));
        let vp = cam.viewport(&mut state, &ctx(21, 0));
        assert_eq!((vp.x, vp.y), (10, 0));
    }

    #[test]
    fn reset_recentres_on_the_next_frame() {
        let cam = edge();
        let mut state = CameraState::default();
        cam.viewport(&mut state, &ctx(11, 11));
        state.reset();
        assert_eq!(state.top_left(), None);
        let vp = cam.viewport(&mut state, &ctx(2, 2));
        assert_eq!((vp.x, vp.y), (0, 0));
    }

    #[test]
    fn crop_scales_the_viewport_by_tile_size() {
        let cam = CameraStrategy::EdgeFollow(EdgeFollowConfig {
            tile_size: 2,
            ..EdgeFollowConfig::default()
        });
        let frame = Frame::new(44, 44);
        let mut state = CameraState::default();
        let out = cam.crop(&mut state, &frame, &ctx(11, 11));
        assert_eq!((out.width(), out.height()), (24, 24));
    }

    #[test]
    fn oversized_view_is_rejected() {
        let config = CameraConfig {
            view_tiles: (30, 12),
            ..CameraConfig::default()
        };
        assert!(config.validate((22, 22)).is_err());
        let config = CameraConfig {
            margin: 6,
            ..CameraConfig::default()
        };
        assert!(config.validate((22, 22)).is_err());
    }
}
