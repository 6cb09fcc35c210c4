//! Event context for replacement effect matching.

use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

/// Context provided to replacement matchers for determining if they match an
/// event: the replacement effect's own controller and source, plus the game
/// state for lookups.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    /// The controller of the replacement effect being checked.
    pub controller: PlayerId,

    /// The source object of the replacement effect.
    pub source: ObjectId,

    /// Reference to the game state for additional lookups.
    pub game: &'a GameState,
}

impl<'a> EventContext<'a> {
    pub fn new(controller: PlayerId, source: ObjectId, game: &'a GameState) -> Self {
        Self {
            controller,
            source,
            game,
        }
    }
}
