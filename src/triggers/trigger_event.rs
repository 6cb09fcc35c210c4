//! The event wrapper consumed by trigger matching.

use crate::events::{Event, EventKind, GameEventType};
use crate::game_event::DamageTarget;
use crate::ids::{ObjectId, PlayerId};
use crate::snapshot::ObjectSnapshot;
use crate::zone::Zone;

/// A game event offered to trigger matchers.
///
/// Thin wrapper over [`Event`] with factory methods for the events the engine
/// raises most often.
#[derive(Debug, Clone)]
pub struct TriggerEvent(pub Event);

impl TriggerEvent {
    pub fn new<E: GameEventType + 'static>(event: E) -> Self {
        Self(Event::new(event))
    }

    pub fn kind(&self) -> EventKind {
        self.0.kind()
    }

    pub fn downcast<E: GameEventType + 'static>(&self) -> Option<&E> {
        self.0.downcast::<E>()
    }

    pub fn zone_change(
        object: ObjectId,
        from: Zone,
        to: Zone,
        snapshot: Option<ObjectSnapshot>,
    ) -> Self {
        Self(Event::zone_change(object, from, to, snapshot))
    }

    pub fn enter_field(object: ObjectId, from: Zone, enters_rested: bool) -> Self {
        Self(Event::enter_field(object, from, enters_rested))
    }

    pub fn damage(source: ObjectId, target: DamageTarget, amount: u32, is_battle: bool) -> Self {
        Self(Event::damage(source, target, amount, is_battle))
    }

    pub fn draw(player: PlayerId, count: u32) -> Self {
        Self(Event::draw(player, count))
    }

    pub fn life_gain(player: PlayerId, amount: u32) -> Self {
        Self(Event::life_gain(player, amount))
    }

    pub fn life_loss(player: PlayerId, amount: u32) -> Self {
        Self(Event::life_loss(player, amount, false))
    }

    pub fn rest(permanent: ObjectId) -> Self {
        Self(Event::rest(permanent))
    }

    pub fn recover(permanent: ObjectId) -> Self {
        Self(Event::recover(permanent))
    }
}
