//! A short walkthrough of the controls, one small two-room level per part.

use tracing::debug;

use crate::{
    level::Level,
    scenario::{ScenarioError, load_level_from_string},
};

const ROOM_SIZE: usize = 5;

struct Part {
    hint: &'static str,
    map: &'static str,
}

const PARTS: [Part; 3] = [
    Part {
        hint: "Pick up the victim, open the door with space and step through",
        map: "
            WL WL WL WL WL WL WL WL WL
            WL A> .. .. WL .. .. .. WL
            WL .. Vv .. DR .. .. .. WL
            WL .. .. .. WL .. .. .. WL
            WL WL WL WL WL WL WL WL WL
        ",
    },
    Part {
        hint: "Carry the red key to the locked door; leave the fake victims alone",
        map: "
            WL WL WL WL WL WL WL WL WL
            WL A> FLv .. WL .. .. .. WL
            WL .. KR .. LR .. Vv .. WL
            WL .. FR^ .. WL .. .. .. WL
            WL WL WL WL WL WL WL WL WL
        ",
    },
    Part {
        hint: "Pick up the key, drop it out of the way with d, then finish the rescue",
        map: "
            WL WL WL WL WL WL WL WL WL
            WL A> KR .. WL .. .. .. WL
            WL .. .. .. DR .. V< .. WL
            WL .. .. .. WL .. .. .. WL
            WL WL WL WL WL WL WL WL WL
        ",
    },
];

/// Position in the walkthrough. Starts at part 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tutorial {
    part: usize,
}

impl Tutorial {
    pub fn new() -> Self {
        Tutorial::default()
    }

    /// Current part, counting from 1.
    pub fn part(&self) -> usize {
        self.part + 1
    }

    pub fn num_parts(&self) -> usize {
        PARTS.len()
    }

    pub fn is_last(&self) -> bool {
        self.part + 1 == PARTS.len()
    }

    /// One-line instruction for the current part.
    pub fn hint(&self) -> &'static str {
        PARTS[self.part].hint
    }

    /// Builds a fresh level for the current part.
    pub fn level(&self) -> Result<Level, ScenarioError> {
        load_level_from_string(PARTS[self.part].map, ROOM_SIZE)
    }

    /// Moves on to the next part and reports whether it did; the last part
    /// stays put.
    pub fn next_part(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.part += 1;
        debug!(part = self.part(), "tutorial_advanced");
        true
    }
}
