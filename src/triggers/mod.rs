//! Modular trigger system.
//!
//! Each trigger condition implements [`TriggerMatcher`]; the [`Trigger`]
//! wrapper provides factory methods for the common patterns. Checking and
//! queueing live in [`check`].

pub mod check;
pub mod combat;
pub mod life_damage;
pub mod matcher_trait;
pub mod phase_step;
pub mod trigger_event;
pub mod zone_changes;

pub use check::{
    DelayedTrigger, TriggerQueue, TriggeredAbilityEntry, check_delayed_triggers, check_triggers,
    verify_intervening_if,
};
pub use combat::{
    AttackTrigger, BlockTrigger, DrawTrigger, OrTrigger, RestRecoverTrigger, StoneCalledTrigger,
};
pub use life_damage::{DamageRecipient, DamageTrigger, LifeTrigger};
pub use matcher_trait::{TriggerContext, TriggerMatcher};
pub use phase_step::PhaseTrigger;
pub use trigger_event::TriggerEvent;
pub use zone_changes::{ZoneChangeTrigger, ZonePattern};

use crate::filter::ObjectFilter;

/// Wrapper around a boxed [`TriggerMatcher`] for ergonomic usage.
#[derive(Debug)]
pub struct Trigger(pub Box<dyn TriggerMatcher>);

impl Clone for Trigger {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.display() == other.display()
    }
}

impl Trigger {
    pub fn new<T: TriggerMatcher + 'static>(matcher: T) -> Self {
        Self(Box::new(matcher))
    }

    /// Check if this trigger matches a game event.
    pub fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        self.0.matches(event, ctx)
    }

    /// Get the display text for this trigger.
    pub fn display(&self) -> String {
        self.0.display()
    }

    // === Zone change triggers ===

    /// "When this card enters the field."
    pub fn this_enters_field() -> Self {
        Self::new(ZoneChangeTrigger::this_enters_field())
    }

    /// "Whenever [filter] enters the field."
    pub fn enters_field(filter: ObjectFilter) -> Self {
        Self::new(ZoneChangeTrigger::enters_field(filter))
    }

    /// "When this card is destroyed."
    pub fn this_is_destroyed() -> Self {
        Self::new(ZoneChangeTrigger::this_is_destroyed())
    }

    /// "Whenever [filter] is put into a graveyard from the field."
    pub fn destroyed(filter: ObjectFilter) -> Self {
        Self::new(ZoneChangeTrigger::destroyed(filter))
    }

    /// "When this card leaves the field."
    pub fn this_leaves_field() -> Self {
        Self::new(ZoneChangeTrigger::this_leaves_field())
    }

    // === Phase triggers ===

    /// "At the beginning of your main phase."
    pub fn beginning_of_your_main_phase() -> Self {
        Self::new(PhaseTrigger::beginning_of_your_main_phase())
    }

    /// "At the beginning of each end phase."
    pub fn beginning_of_each_end_phase() -> Self {
        Self::new(PhaseTrigger::beginning_of_each_end_phase())
    }

    // === Battle triggers ===

    /// "When this card attacks."
    pub fn this_attacks() -> Self {
        Self::new(AttackTrigger::this_attacks())
    }

    /// "When this card blocks."
    pub fn this_blocks() -> Self {
        Self::new(BlockTrigger::this_blocks())
    }

    // === Damage and life triggers ===

    /// "Whenever this card deals damage."
    pub fn this_deals_damage() -> Self {
        Self::new(DamageTrigger::this_deals_damage())
    }

    /// "Whenever this card is dealt damage."
    pub fn this_is_dealt_damage() -> Self {
        Self::new(DamageTrigger::this_is_dealt_damage())
    }

    /// "Whenever you gain life."
    pub fn you_gain_life() -> Self {
        Self::new(LifeTrigger::you_gain_life())
    }

    /// "Whenever an opponent loses life."
    pub fn opponent_loses_life() -> Self {
        Self::new(LifeTrigger::opponent_loses_life())
    }

    // === Other ===

    /// "Whenever you call a magic stone."
    pub fn you_call_a_stone() -> Self {
        Self::new(StoneCalledTrigger::you_call_a_stone())
    }

    /// "Whenever you draw a card."
    pub fn you_draw() -> Self {
        Self::new(DrawTrigger::you_draw())
    }

    /// "When this card is rested."
    pub fn this_rested() -> Self {
        Self::new(RestRecoverTrigger::this_rested())
    }

    /// "When this card recovers."
    pub fn this_recovered() -> Self {
        Self::new(RestRecoverTrigger::this_recovered())
    }

    /// Any of the given triggers.
    pub fn any_of(triggers: Vec<Trigger>) -> Self {
        Self::new(OrTrigger::new(triggers))
    }
}
