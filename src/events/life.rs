//! Life gain and life loss events and their matchers.

use std::any::Any;

use crate::filter::PlayerFilter;
use crate::game_state::GameState;
use crate::ids::PlayerId;

use super::context::EventContext;
use super::traits::{EventKind, GameEventType, ReplacementMatcher, downcast_event};

/// A player would gain life.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeGainEvent {
    pub player: PlayerId,
    pub amount: u32,
}

impl GameEventType for LifeGainEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::LifeGain
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

/// A player would lose life.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeLossEvent {
    pub player: PlayerId,
    pub amount: u32,
    pub from_damage: bool,
}

impl GameEventType for LifeLossEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::LifeLoss
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

/// Matches "would gain life" for players satisfying a filter.
#[derive(Debug, Clone)]
pub struct WouldGainLifeMatcher {
    pub player: PlayerFilter,
}

impl WouldGainLifeMatcher {
    pub fn new(player: PlayerFilter) -> Self {
        Self { player }
    }

    pub fn you() -> Self {
        Self::new(PlayerFilter::You)
    }

    pub fn any_player() -> Self {
        Self::new(PlayerFilter::Any)
    }
}

impl ReplacementMatcher for WouldGainLifeMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(gain) = downcast_event::<LifeGainEvent>(event) else {
            return false;
        };
        self.player.matches(ctx.game, ctx.controller, gain.player)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "life that would be gained".into()
    }
}

/// Matches "would lose life" for players satisfying a filter.
#[derive(Debug, Clone)]
pub struct WouldLoseLifeMatcher {
    pub player: PlayerFilter,
}

impl WouldLoseLifeMatcher {
    pub fn new(player: PlayerFilter) -> Self {
        Self { player }
    }

    pub fn you() -> Self {
        Self::new(PlayerFilter::You)
    }
}

impl ReplacementMatcher for WouldLoseLifeMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(loss) = downcast_event::<LifeLossEvent>(event) else {
            return false;
        };
        self.player.matches(ctx.game, ctx.controller, loss.player)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "life that would be lost".into()
    }
}
