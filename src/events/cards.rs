//! Draw and discard events and their matchers.

use std::any::Any;

use crate::filter::PlayerFilter;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

use super::context::EventContext;
use super::traits::{EventKind, GameEventType, ReplacementMatcher, downcast_event};

/// A player would draw cards.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawEvent {
    pub player: PlayerId,
    pub count: u32,
}

impl GameEventType for DrawEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::Draw
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(self.clone())
    }

    fn affected_player(&self, _game: &GameState) -> PlayerId {
        self.player
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A card would be discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscardEvent {
    pub card: ObjectId,
    pub player: PlayerId,
}

impl GameEventType for DiscardEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::Discard
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(self.clone())
    }

    fn affected_player(&self, _game: &GameState) -> PlayerId {
        self.player
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches "would draw a card" for players satisfying a filter.
#[derive(Debug, Clone)]
pub struct WouldDrawMatcher {
    pub player: PlayerFilter,
}

impl WouldDrawMatcher {
    pub fn new(player: PlayerFilter) -> Self {
        Self { player }
    }

    pub fn you() -> Self {
        Self::new(PlayerFilter::You)
    }
}

impl ReplacementMatcher for WouldDrawMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(draw) = downcast_event::<DrawEvent>(event) else {
            return false;
        };
        self.player.matches(ctx.game, ctx.controller, draw.player)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "a card that would be drawn".into()
    }
}
