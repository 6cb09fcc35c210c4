//! Zone-change events and their matchers.

use std::any::Any;

use crate::filter::ObjectFilter;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::snapshot::ObjectSnapshot;
use crate::zone::Zone;

use super::context::EventContext;
use super::traits::{EventKind, GameEventType, ReplacementMatcher, downcast_event};

/// An object would move between zones.
#[derive(Debug, Clone)]
pub struct ZoneChangeEvent {
    pub object: ObjectId,
    pub from: Zone,
    pub to: Zone,
    /// Calculated state at the moment the move was proposed, for triggers
    /// that inspect the object as it last existed.
    pub snapshot: Option<ObjectSnapshot>,
}

impl ZoneChangeEvent {
    pub fn new(object: ObjectId, from: Zone, to: Zone, snapshot: Option<ObjectSnapshot>) -> Self {
        Self {
            object,
            from,
            to,
            snapshot,
        }
    }

    /// True for field → graveyard moves.
    pub fn is_destruction_move(&self) -> bool {
        self.from == Zone::Field && self.to == Zone::Graveyard
    }
}

impl GameEventType for ZoneChangeEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::ZoneChange
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(self.clone())
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        game.controller_of(self.object)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An object would enter the field.
#[derive(Debug, Clone)]
pub struct EnterFieldEvent {
    pub object: ObjectId,
    pub from: Zone,
    pub enters_rested: bool,
}

impl GameEventType for EnterFieldEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::EnterField
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(self.clone())
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        game.controller_of(self.object)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A permanent would be destroyed (by rule or by effect).
#[derive(Debug, Clone, PartialEq)]
pub struct DestroyEvent {
    pub permanent: ObjectId,
    pub source: Option<ObjectId>,
}

impl GameEventType for DestroyEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::Destroy
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(self.clone())
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        game.controller_of(self.permanent)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches "this card would be destroyed".
#[derive(Debug, Clone)]
pub struct ThisWouldBeDestroyedMatcher;

impl ReplacementMatcher for ThisWouldBeDestroyedMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(destroy) = downcast_event::<DestroyEvent>(event) else {
            return false;
        };
        destroy.permanent == ctx.source
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "this card would be destroyed".into()
    }
}

/// Matches destruction of any object satisfying a filter.
#[derive(Debug, Clone)]
pub struct WouldBeDestroyedMatcher {
    pub filter: ObjectFilter,
}

impl WouldBeDestroyedMatcher {
    pub fn new(filter: ObjectFilter) -> Self {
        Self { filter }
    }
}

impl ReplacementMatcher for WouldBeDestroyedMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(destroy) = downcast_event::<DestroyEvent>(event) else {
            return false;
        };
        self.filter.matches(ctx.game, destroy.permanent, ctx.controller)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "a matching card would be destroyed".into()
    }
}

/// Matches "this card would be put into a graveyard from the field".
#[derive(Debug, Clone)]
pub struct ThisWouldLeaveFieldForGraveyardMatcher;

impl ReplacementMatcher for ThisWouldLeaveFieldForGraveyardMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(change) = downcast_event::<ZoneChangeEvent>(event) else {
            return false;
        };
        change.object == ctx.source && change.is_destruction_move()
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "this card would be put into a graveyard from the field".into()
    }
}

/// Matches "this card would enter the field".
#[derive(Debug, Clone)]
pub struct ThisWouldEnterFieldMatcher;

impl ReplacementMatcher for ThisWouldEnterFieldMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(enter) = downcast_event::<EnterFieldEvent>(event) else {
            return false;
        };
        enter.object == ctx.source
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "this card would enter the field".into()
    }
}

/// Matches any object matching a filter entering the field.
#[derive(Debug, Clone)]
pub struct WouldEnterFieldMatcher {
    pub filter: ObjectFilter,
}

impl WouldEnterFieldMatcher {
    pub fn new(filter: ObjectFilter) -> Self {
        Self { filter }
    }
}

impl ReplacementMatcher for WouldEnterFieldMatcher {
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        let Some(enter) = downcast_event::<EnterFieldEvent>(event) else {
            return false;
        };
        // The object is not yet on the field; match in its current zone.
        let mut filter = self.filter.clone();
        filter.zone = ctx.game.object(enter.object).map(|o| o.zone);
        filter.matches(ctx.game, enter.object, ctx.controller)
    }

    fn clone_box(&self) -> Box<dyn ReplacementMatcher> {
        Box::new(self.clone())
    }

    fn display(&self) -> String {
        "a matching card would enter the field".into()
    }
}
