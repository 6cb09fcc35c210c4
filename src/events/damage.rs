//! Damage events and their matchers.

use std::any::Any;

use crate::filter::ObjectFilter;
use crate::game_event::DamageTarget;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

use super::context::EventContext;
use super::traits::{EventKind, GameEventType, ReplacementMatcher, downcast_event};

/// Damage would be dealt to a player or an object.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageEvent {
    pub source: ObjectId,
    pub target: DamageTarget,
    pub amount: u32,
    pub is_battle: bool,
}

impl GameEventType for DamageEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::Damage
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(self.clone())
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        match self.target {
            DamageTarget::Player(player) => player,
            DamageTarget::Object(object) => game.controller_of(object),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches damage that would be dealt to the matcher's controller.
#[derive(Debug, Clone)]
pub struct DamageToYouMatcher;

impl ReplacementMatcher for DamageToYouMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(damage) = downcast_event::<DamageEvent>(event) else {
            return false;
        };
        damage.target == DamageTarget::Player(ctx.controller)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "damage that would be dealt to you".into()
    }
}

/// Matches damage that would be dealt to the matcher's own source.
#[derive(Debug, Clone)]
pub struct DamageToThisMatcher;

impl ReplacementMatcher for DamageToThisMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(damage) = downcast_event::<DamageEvent>(event) else {
            return false;
        };
        damage.target == DamageTarget::Object(ctx.source)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "damage that would be dealt to this card".into()
    }
}

/// Matches damage dealt to any object matching a filter.
#[derive(Debug, Clone)]
pub struct DamageToMatchingMatcher {
    pub filter: ObjectFilter,
}

impl DamageToMatchingMatcher {
    pub fn new(filter: ObjectFilter) -> Self {
        Self { filter }
    }
}

impl ReplacementMatcher for DamageToMatchingMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(damage) = downcast_event::<DamageEvent>(event) else {
            return false;
        };
        let DamageTarget::Object(object) = damage.target else {
            return false;
        };
        self.filter.matches(ctx.game, object, ctx.controller)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "damage that would be dealt to a matching card".into()
    }
}
