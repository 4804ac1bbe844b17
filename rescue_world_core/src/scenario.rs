//! Hand-written layouts.
//!
//! A scenario is a whitespace-separated token grid, one line per tile row.
//! The grid must form a room lattice for the given room size; the tokens are
//! authoritative, so a `..` on a lattice wall opens it.
//!
//! | token | tile |
//! |-------|------|
//! | `..` | empty floor |
//! | `WL` | wall |
//! | `LV` | lava |
//! | `K?` | key (`?` is a colour code) |
//! | `D?` / `O?` / `L?` | closed, open or locked door |
//! | `V?` | real victim facing `?` (`>`, `v`, `<`, `^`) |
//! | `F??` | fake victim: shift `L`/`R`, then a facing |
//! | `A?` | agent facing `?`, standing on empty floor |
//!
//! Colour codes: `R`ed, `G`reen, `B`lue, `P`urple, `Y`ellow, gr`E`y.
//!
//! [`infer_room_size`] recovers the room size of a layout whose lattice walls
//! are drawn with `WL` and door tokens only.

use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Direction, KeyColor, Position,
    entity::{Door, Entity, FakeVictim, Shift, Victim},
    level::{Level, LevelError},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
    #[error("Scenario is empty")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("A {width}x{height} grid is not a lattice of {room_size}-tile rooms")]
    NotALattice {
        width: usize,
        height: usize,
        room_size: usize,
    },
    #[error("No room size tiles the {width}x{height} grid with walls and doors")]
    NoLattice { width: usize, height: usize },
    #[error("Unknown token '{token}' at ({x}, {y})")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("More than one agent token")]
    MultipleAgents,
    #[error("No agent token")]
    NoAgent,
    #[error(transparent)]
    Level(#[from] LevelError),
}

fn color_code(c: char) -> Option<KeyColor> {
    Some(match c {
        'R' => KeyColor::Red,
        'G' => KeyColor::Green,
        'B' => KeyColor::Blue,
        'P' => KeyColor::Purple,
        'Y' => KeyColor::Yellow,
        'E' => KeyColor::Grey,
        _ => return None,
    })
}

fn direction_code(c: char) -> Option<Direction> {
    Some(match c {
        '>' => Direction::Right,
        'v' => Direction::Down,
        '<' => Direction::Left,
        '^' => Direction::Up,
        _ => return None,
    })
}

/// One parsed token: what goes on the tile, plus the agent if it starts here.
enum Token {
    Tile(Option<Entity>),
    Agent(Direction),
    Door(Door),
}

fn parse_token(token: &str) -> Option<Token> {
    let mut chars = token.chars();
    let head = chars.next()?;
    let rest: Vec<char> = chars.collect();
    let parsed = match (head, rest.as_slice()) {
        ('.', ['.']) => Token::Tile(None),
        ('W', ['L']) => Token::Tile(Some(Entity::Wall)),
        ('L', ['V']) => Token::Tile(Some(Entity::Lava)),
        ('K', [c]) => Token::Tile(Some(Entity::Key {
            color: color_code(*c)?,
        })),
        ('D', [c]) => Token::Door(Door::closed(color_code(*c)?, false)),
        ('L', [c]) => Token::Door(Door::closed(color_code(*c)?, true)),
        ('O', [c]) => Token::Door(Door {
            color: color_code(*c)?,
            locked: false,
            open: true,
        }),
        ('V', [d]) => Token::Tile(Some(Entity::Victim(Victim::new(direction_code(*d)?)))),
        ('F', [s, d]) => {
            let shift = match s {
                'L' => Shift::Left,
                'R' => Shift::Right,
                _ => return None,
            };
            Token::Tile(Some(Entity::FakeVictim(FakeVictim::new(
                shift,
                direction_code(*d)?,
            ))))
        }
        ('A', [d]) => Token::Agent(direction_code(*d)?),
        _ => return None,
    };
    Some(parsed)
}

/// Splits `map` into token rows and checks they all have the same width.
fn token_rows(map: &str) -> Result<Vec<Vec<&str>>, ScenarioError> {
    let rows: Vec<Vec<&str>> = map
        .trim()
        .lines()
        .map(|line| line.split_whitespace().collect())
        .collect();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return Err(ScenarioError::Empty);
    }
    for (row, tokens) in rows.iter().enumerate() {
        if tokens.len() != width {
            return Err(ScenarioError::RaggedRow {
                row,
                expected: width,
                found: tokens.len(),
            });
        }
    }
    Ok(rows)
}

fn is_barrier(token: &str) -> bool {
    token == "WL" || matches!(parse_token(token), Some(Token::Door(_)))
}

/// Smallest room size whose lattice lines hold nothing but walls and doors.
///
/// A layout that opens a lattice wall with `..` reads as larger rooms; pass
/// its room size to [`load_level_from_string`] directly instead.
pub fn infer_room_size(map: &str) -> Result<usize, ScenarioError> {
    let rows = token_rows(map)?;
    let (width, height) = (rows[0].len(), rows.len());
    let on_lattice = |step: usize| {
        rows.iter().enumerate().all(|(y, tokens)| {
            tokens
                .iter()
                .enumerate()
                .all(|(x, token)| (x % step != 0 && y % step != 0) || is_barrier(token))
        })
    };
    (2..width.min(height))
        .filter(|step| (width - 1) % step == 0 && (height - 1) % step == 0)
        .find(|step| on_lattice(*step))
        .map(|step| step + 1)
        .ok_or(ScenarioError::NoLattice { width, height })
}

/// Builds a [`Level`] from a token grid. See the module docs for the format.
pub fn load_level_from_string(map: &str, room_size: usize) -> Result<Level, ScenarioError> {
    let rows = token_rows(map)?;
    let width = rows[0].len();
    let height = rows.len();
    let not_a_lattice = ScenarioError::NotALattice {
        width,
        height,
        room_size,
    };
    if room_size < 3 || width < room_size || height < room_size {
        return Err(not_a_lattice);
    }
    let step = room_size - 1;
    if (width - 1) % step != 0 || (height - 1) % step != 0 {
        return Err(not_a_lattice);
    }

    // Door positions drawn here are overwritten by every door token.
    let mut rng = StdRng::seed_from_u64(0);
    let mut level = Level::new(room_size, (height - 1) / step, (width - 1) / step, &mut rng);
    let mut agent = None;
    let mut doors = Vec::new();

    for (y, tokens) in rows.iter().enumerate() {
        for (x, token) in tokens.iter().enumerate() {
            let pos = Position::new(x, y);
            let parsed = parse_token(token).ok_or_else(|| ScenarioError::UnknownToken {
                token: token.to_string(),
                x,
                y,
            })?;
            match parsed {
                Token::Tile(entity) => level.set(pos, entity)?,
                Token::Door(door) => {
                    level.set(pos, None)?;
                    doors.push((pos, door));
                }
                Token::Agent(direction) => {
                    if agent.replace((pos, direction)).is_some() {
                        return Err(ScenarioError::MultipleAgents);
                    }
                    level.set(pos, None)?;
                }
            }
        }
    }

    for (pos, door) in doors {
        level.install_door_at(pos, door)?;
    }
    let (pos, direction) = agent.ok_or(ScenarioError::NoAgent)?;
    level.set_agent(pos, direction)?;
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROOMS: &str = "
        WL WL WL WL WL WL WL WL WL
        WL A> .. .. WL .. .. V^ WL
        WL .. KB .. LB .. .. .. WL
        WL FLv .. .. WL .. LV .. WL
        WL WL WL WL WL WL WL WL WL
    ";

    #[test]
    fn loads_a_two_room_lattice() {
        let level = load_level_from_string(TWO_ROOMS, 5).unwrap();
        assert_eq!((level.num_rows(), level.num_cols()), (1, 2));
        assert_eq!(level.agent_pos(), Some(Position::new(1, 1)));
        assert_eq!(level.count_real_victims(), 1);
        assert_eq!(level.count_doors(), 1);
        assert_eq!(
            level.room(0, 0).doors[Direction::Right as usize],
            Some(Position::new(4, 2))
        );
        assert!(matches!(
            level.get(Position::new(1, 3)),
            Some(Entity::FakeVictim(_))
        ));
        assert_eq!(level.check_objs_reachable(), Ok(()));
    }

    #[test]
    fn rejects_grids_that_do_not_tile_into_rooms() {
        assert!(matches!(
            load_level_from_string(TWO_ROOMS, 6),
            Err(ScenarioError::NotALattice { .. })
        ));
    }

    #[test]
    fn reports_unknown_tokens_with_their_position() {
        let map = TWO_ROOMS.replace("KB", "ZZ");
        assert_eq!(
            load_level_from_string(&map, 5).unwrap_err(),
            ScenarioError::UnknownToken {
                token: "ZZ".into(),
                x: 2,
                y: 2
            }
        );
    }

    #[test]
    fn requires_exactly_one_agent() {
        let none = TWO_ROOMS.replace("A>", "..");
        assert_eq!(
            load_level_from_string(&none, 5).unwrap_err(),
            ScenarioError::NoAgent
        );
        let two = TWO_ROOMS.replace("KB", "A<");
        assert_eq!(
            load_level_from_string(&two, 5).unwrap_err(),
            ScenarioError::MultipleAgents
        );
    }

    #[test]
    fn room_size_is_read_off_the_walls() {
        assert_eq!(infer_room_size(TWO_ROOMS), Ok(5));
        let single = "
            WL WL WL WL
            WL A> .. WL
            WL .. V^ WL
            WL WL WL WL
        ";
        assert_eq!(infer_room_size(single), Ok(4));
        assert_eq!(
            infer_room_size(&TWO_ROOMS.replace("LB", "..")),
            Err(ScenarioError::NoLattice {
                width: 9,
                height: 5
            })
        );
    }

    #[test]
    fn doors_must_sit_on_a_shared_wall() {
        let map = TWO_ROOMS.replace("KB", "DR");
        assert!(matches!(
            load_level_from_string(&map, 5),
            Err(ScenarioError::Level(LevelError::NotADoorSlot(_)))
        ));
    }
}
