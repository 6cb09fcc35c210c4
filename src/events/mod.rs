//! Trait-based event system for replacement interception and triggers.
//!
//! Every interceptable state change is a concrete event type implementing
//! [`GameEventType`]. Replacement conditions implement [`ReplacementMatcher`].
//! The [`Event`] wrapper carries a boxed event with factory methods for the
//! common cases.

pub mod cards;
pub mod combat;
pub mod context;
pub mod damage;
pub mod life;
pub mod phase;
pub mod traits;
pub mod zones;

pub use cards::{DiscardEvent, DrawEvent, WouldDrawMatcher};
pub use combat::{
    AttackDeclaredEvent, BattleEndedEvent, BlockDeclaredEvent, RecoverEvent, RestEvent,
    StoneCalledEvent, WillProducedEvent,
};
pub use context::EventContext;
pub use damage::{DamageEvent, DamageToMatchingMatcher, DamageToThisMatcher, DamageToYouMatcher};
pub use life::{LifeGainEvent, LifeLossEvent, WouldGainLifeMatcher, WouldLoseLifeMatcher};
pub use phase::{
    BeginningOfDrawPhaseEvent, BeginningOfEndPhaseEvent, BeginningOfMainPhaseEvent,
    BeginningOfRecoveryPhaseEvent, TurnEndEvent, TurnStartEvent,
};
pub use traits::{EventKind, GameEventType, Matcher, ReplacementMatcher, downcast_event};
pub use zones::{
    DestroyEvent, EnterFieldEvent, ThisWouldBeDestroyedMatcher,
    ThisWouldEnterFieldMatcher, ThisWouldLeaveFieldForGraveyardMatcher, WouldBeDestroyedMatcher,
    WouldEnterFieldMatcher, ZoneChangeEvent,
};

use crate::game_event::DamageTarget;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::snapshot::ObjectSnapshot;
use crate::zone::Zone;

/// Wrapper around a boxed event type.
#[derive(Debug, Clone)]
pub struct Event(pub Box<dyn GameEventType>);

impl Event {
    pub fn new<E: GameEventType + 'static>(event: E) -> Self {
        Self(Box::new(event))
    }

    /// Get the event kind for fast dispatch.
    pub fn kind(&self) -> EventKind {
        self.0.event_kind()
    }

    /// Get the inner event as a trait object.
    pub fn inner(&self) -> &dyn GameEventType {
        &*self.0
    }

    /// Downcast to a concrete event type.
    pub fn downcast<E: GameEventType + 'static>(&self) -> Option<&E> {
        downcast_event::<E>(self.inner())
    }

    /// The player who chooses when several replacements apply.
    pub fn affected_player(&self, game: &GameState) -> PlayerId {
        self.0.affected_player(game)
    }

    // Factory methods for common event types

    pub fn damage(source: ObjectId, target: DamageTarget, amount: u32, is_battle: bool) -> Self {
        Self::new(DamageEvent {
            source,
            target,
            amount,
            is_battle,
        })
    }

    pub fn life_gain(player: PlayerId, amount: u32) -> Self {
        Self::new(LifeGainEvent { player, amount })
    }

    pub fn life_loss(player: PlayerId, amount: u32, from_damage: bool) -> Self {
        Self::new(LifeLossEvent {
            player,
            amount,
            from_damage,
        })
    }

    pub fn zone_change(
        object: ObjectId,
        from: Zone,
        to: Zone,
        snapshot: Option<ObjectSnapshot>,
    ) -> Self {
        Self::new(ZoneChangeEvent::new(object, from, to, snapshot))
    }

    pub fn enter_field(object: ObjectId, from: Zone, enters_rested: bool) -> Self {
        Self::new(EnterFieldEvent {
            object,
            from,
            enters_rested,
        })
    }

    pub fn destroy(permanent: ObjectId, source: Option<ObjectId>) -> Self {
        Self::new(DestroyEvent { permanent, source })
    }

    pub fn draw(player: PlayerId, count: u32) -> Self {
        Self::new(DrawEvent { player, count })
    }

    pub fn discard(card: ObjectId, player: PlayerId) -> Self {
        Self::new(DiscardEvent { card, player })
    }

    pub fn rest(permanent: ObjectId) -> Self {
        Self::new(RestEvent { permanent })
    }

    pub fn recover(permanent: ObjectId) -> Self {
        Self::new(RecoverEvent { permanent })
    }
}
