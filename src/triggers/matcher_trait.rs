//! Trigger matcher trait for the modular trigger system.

use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

use super::trigger_event::TriggerEvent;

/// Context provided to trigger matchers for determining if they match an
/// event.
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext<'a> {
    /// The permanent that carries the triggered ability.
    pub source_id: ObjectId,

    /// The controller of the triggered ability source.
    pub controller: PlayerId,

    /// Reference to the game state for additional lookups.
    pub game: &'a GameState,
}

impl<'a> TriggerContext<'a> {
    pub fn for_source(source_id: ObjectId, controller: PlayerId, game: &'a GameState) -> Self {
        Self {
            source_id,
            controller,
            game,
        }
    }
}

/// Trait for matching game events to trigger conditions.
///
/// Each trigger type implements its own matching logic; the checker never
/// dispatches on event kind centrally.
pub trait TriggerMatcher: std::fmt::Debug + Send + Sync {
    /// Check if this trigger matches the given game event.
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool;

    /// Human-readable description for logs and ordering prompts.
    fn display(&self) -> String;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn TriggerMatcher>;
}

impl Clone for Box<dyn TriggerMatcher> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
