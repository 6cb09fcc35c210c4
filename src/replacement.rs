//! Replacement effect registrations.
//!
//! Replacement effects substitute a different outcome for an event before it
//! happens: "if X would happen, Y happens instead". Interception itself lives
//! in [`event_processor`](crate::event_processor); this module owns the
//! registrations.

use crate::effect::Effect;
use crate::events::Matcher;
use crate::events::damage::{DamageToThisMatcher, DamageToYouMatcher};
use crate::events::life::WouldGainLifeMatcher;
use crate::events::zones::{ThisWouldBeDestroyedMatcher, ThisWouldLeaveFieldForGraveyardMatcher};
use crate::ids::{ObjectId, PlayerId};
use crate::zone::Zone;

/// Unique identifier for a replacement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplacementEffectId(pub u64);

/// What happens instead when a replacement applies.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementAction {
    /// The event does not occur at all.
    Prevent,

    /// The event occurs with its magnitude modified.
    Modify(EventModification),

    /// A zone-changing event sends the object somewhere else.
    ChangeDestination(Zone),

    /// A damage or life-loss event is redirected.
    Redirect(RedirectTarget),

    /// The object enters the field rested.
    EnterRested,

    /// Different effects happen instead of the event.
    Instead(Vec<Effect>),
}

/// How to modify an event's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventModification {
    Add(u32),
    Subtract(u32),
    Multiply(u32),
    SetTo(u32),
}

impl EventModification {
    pub fn apply(self, amount: u32) -> u32 {
        match self {
            EventModification::Add(n) => amount + n,
            EventModification::Subtract(n) => amount.saturating_sub(n),
            EventModification::Multiply(n) => amount * n,
            EventModification::SetTo(n) => n,
        }
    }
}

/// Where a redirected event goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    /// To a specific player.
    ToPlayer(PlayerId),
    /// To a specific object.
    ToObject(ObjectId),
}

/// Whether an effect comes from a static ability (regenerated every state
/// refresh) or a resolved spell/ability (persists until removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementEffectSource {
    StaticAbility,
    Resolution,
}

/// A registered replacement effect.
#[derive(Debug, Clone)]
pub struct ReplacementEffect {
    pub id: ReplacementEffectId,
    pub source: ObjectId,
    pub controller: PlayerId,
    pub matcher: Matcher,
    pub action: ReplacementAction,
    /// Self-replacement effects only modify events about their own source.
    pub self_replacement: bool,
}

impl ReplacementEffect {
    pub fn new(
        source: ObjectId,
        controller: PlayerId,
        matcher: Matcher,
        action: ReplacementAction,
    ) -> Self {
        Self {
            id: ReplacementEffectId(0),
            source,
            controller,
            matcher,
            action,
            self_replacement: false,
        }
    }

    pub fn self_replacing(mut self) -> Self {
        self.self_replacement = true;
        self
    }

    /// "Prevent the next `amount` damage that would be dealt to you."
    pub fn prevent_damage_to_you(source: ObjectId, controller: PlayerId, amount: u32) -> Self {
        Self::new(
            source,
            controller,
            Matcher::new(DamageToYouMatcher),
            ReplacementAction::Modify(EventModification::Subtract(amount)),
        )
    }

    /// "If this card would be destroyed, it isn't." (Indestructible statics.)
    pub fn indestructible(source: ObjectId, controller: PlayerId) -> Self {
        Self::new(
            source,
            controller,
            Matcher::new(ThisWouldBeDestroyedMatcher),
            ReplacementAction::Prevent,
        )
        .self_replacing()
    }

    /// "If this card would be put into a graveyard from the field, remove it
    /// from the game instead."
    pub fn banish_instead_of_graveyard(source: ObjectId, controller: PlayerId) -> Self {
        Self::new(
            source,
            controller,
            Matcher::new(ThisWouldLeaveFieldForGraveyardMatcher),
            ReplacementAction::ChangeDestination(Zone::Removed),
        )
        .self_replacing()
    }

    /// "If you would gain life, you gain twice that much instead."
    pub fn double_life_gain(source: ObjectId, controller: PlayerId) -> Self {
        Self::new(
            source,
            controller,
            Matcher::new(WouldGainLifeMatcher::you()),
            ReplacementAction::Modify(EventModification::Multiply(2)),
        )
    }

    /// "Prevent all damage that would be dealt to this card."
    pub fn prevent_damage_to_this(source: ObjectId, controller: PlayerId) -> Self {
        Self::new(
            source,
            controller,
            Matcher::new(DamageToThisMatcher),
            ReplacementAction::Modify(EventModification::SetTo(0)),
        )
        .self_replacing()
    }
}

/// Registry of replacement effects.
#[derive(Debug, Clone, Default)]
pub struct ReplacementEffectManager {
    effects: Vec<ReplacementEffect>,
    effect_sources: std::collections::HashMap<u64, ReplacementEffectSource>,
    /// One-shot effects consumed after a single application.
    one_shot_effects: std::collections::HashSet<ReplacementEffectId>,
    /// Effects that expire at the end of the turn.
    turn_scoped_effects: std::collections::HashSet<ReplacementEffectId>,
    next_id: u64,
}

impl ReplacementEffectManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> &[ReplacementEffect] {
        &self.effects
    }

    pub fn add_effect(&mut self, mut effect: ReplacementEffect) -> ReplacementEffectId {
        let id = ReplacementEffectId(self.next_id);
        self.next_id += 1;
        effect.id = id;
        self.effects.push(effect);
        id
    }

    pub fn remove_effect(&mut self, id: ReplacementEffectId) {
        self.effects.retain(|e| e.id != id);
        self.effect_sources.remove(&id.0);
        self.one_shot_effects.remove(&id);
        self.turn_scoped_effects.remove(&id);
    }

    pub fn remove_effects_from_source(&mut self, source: ObjectId) {
        let ids: Vec<ReplacementEffectId> = self
            .effects
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.id)
            .collect();
        for id in ids {
            self.remove_effect(id);
        }
    }

    pub fn get_effect(&self, id: ReplacementEffectId) -> Option<&ReplacementEffect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Register an effect generated from a static ability.
    pub fn add_static_ability_effect(&mut self, effect: ReplacementEffect) -> ReplacementEffectId {
        let id = self.add_effect(effect);
        self.effect_sources
            .insert(id.0, ReplacementEffectSource::StaticAbility);
        id
    }

    /// Register an effect created by a resolved spell/ability.
    pub fn add_resolution_effect(&mut self, effect: ReplacementEffect) -> ReplacementEffectId {
        let id = self.add_effect(effect);
        self.effect_sources
            .insert(id.0, ReplacementEffectSource::Resolution);
        id
    }

    /// Clear all static-ability effects before regeneration.
    pub fn clear_static_ability_effects(&mut self) {
        let static_ids: Vec<ReplacementEffectId> = self
            .effects
            .iter()
            .filter(|e| {
                self.effect_sources
                    .get(&e.id.0)
                    .is_some_and(|s| *s == ReplacementEffectSource::StaticAbility)
            })
            .map(|e| e.id)
            .collect();

        for id in static_ids {
            self.remove_effect(id);
        }
    }

    /// Add a one-shot replacement effect consumed after a single use
    /// (destruction shields and the like).
    pub fn add_one_shot_effect(&mut self, effect: ReplacementEffect) -> ReplacementEffectId {
        let id = self.add_resolution_effect(effect);
        self.one_shot_effects.insert(id);
        id
    }

    pub fn is_one_shot(&self, id: ReplacementEffectId) -> bool {
        self.one_shot_effects.contains(&id)
    }

    /// Mark a one-shot effect as used and remove it.
    pub fn mark_effect_used(&mut self, id: ReplacementEffectId) -> bool {
        if self.one_shot_effects.remove(&id) {
            self.remove_effect(id);
            true
        } else {
            false
        }
    }

    /// Clear all one-shot effects (end of turn).
    pub fn clear_one_shot_effects(&mut self) {
        let ids: Vec<ReplacementEffectId> = self.one_shot_effects.iter().copied().collect();
        for id in ids {
            self.remove_effect(id);
        }
        self.one_shot_effects.clear();
    }

    /// Add a resolution effect that expires at the end of the turn.
    pub fn add_turn_scoped_effect(&mut self, effect: ReplacementEffect) -> ReplacementEffectId {
        let id = self.add_resolution_effect(effect);
        self.turn_scoped_effects.insert(id);
        id
    }

    /// Clear until-end-of-turn effects.
    pub fn clear_turn_scoped_effects(&mut self) {
        let ids: Vec<ReplacementEffectId> = self.turn_scoped_effects.iter().copied().collect();
        for id in ids {
            self.remove_effect(id);
        }
        self.turn_scoped_effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_modification() {
        assert_eq!(EventModification::Add(2).apply(3), 5);
        assert_eq!(EventModification::Subtract(5).apply(3), 0);
        assert_eq!(EventModification::Multiply(2).apply(3), 6);
        assert_eq!(EventModification::SetTo(1).apply(9), 1);
    }

    #[test]
    fn test_manager_add_remove() {
        let mut manager = ReplacementEffectManager::new();

        let e1 = ReplacementEffect::prevent_damage_to_you(
            ObjectId::from_raw(1),
            PlayerId::from_index(0),
            300,
        );
        let e2 =
            ReplacementEffect::indestructible(ObjectId::from_raw(2), PlayerId::from_index(0));

        let id1 = manager.add_effect(e1);
        let id2 = manager.add_effect(e2);
        assert_eq!(manager.effects().len(), 2);
        assert_ne!(id1, id2);

        manager.remove_effect(id1);
        assert_eq!(manager.effects().len(), 1);
        assert_eq!(manager.effects()[0].id, id2);
    }

    #[test]
    fn test_static_effects_cleared_separately() {
        let mut manager = ReplacementEffectManager::new();

        manager.add_static_ability_effect(ReplacementEffect::indestructible(
            ObjectId::from_raw(1),
            PlayerId::from_index(0),
        ));
        manager.add_resolution_effect(ReplacementEffect::prevent_damage_to_you(
            ObjectId::from_raw(2),
            PlayerId::from_index(0),
            300,
        ));

        manager.clear_static_ability_effects();
        assert_eq!(manager.effects().len(), 1);
        assert_eq!(manager.effects()[0].source, ObjectId::from_raw(2));
    }

    #[test]
    fn test_one_shot_consumed() {
        let mut manager = ReplacementEffectManager::new();
        let id = manager.add_one_shot_effect(ReplacementEffect::indestructible(
            ObjectId::from_raw(1),
            PlayerId::from_index(0),
        ));

        assert!(manager.is_one_shot(id));
        assert!(manager.mark_effect_used(id));
        assert!(manager.get_effect(id).is_none());
        assert!(!manager.mark_effect_used(id));
    }
}
