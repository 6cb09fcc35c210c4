//! Runtime card instances.
//!
//! An [`Object`] is one concrete card (or token) in the game: it pairs an
//! immutable [`CardDefinition`] with the mutable state the rules track for it.
//! Placement is owned by the zone store on
//! [`GameState`](crate::game_state::GameState); nothing here moves an object.

use std::collections::HashMap;

use crate::ability::Ability;
use crate::card::CardDefinition;
use crate::ids::{ObjectId, PlayerId};
use crate::types::CardType;
use crate::zone::Zone;

/// Counter types that can be placed on objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterType {
    /// +100/+100 counters.
    PlusHundred,
    /// -100/-100 counters.
    MinusHundred,
}

/// A card instance with its runtime state.
#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    /// The immutable printed characteristics.
    pub definition: CardDefinition,
    pub owner: PlayerId,
    /// May differ from owner under control-changing effects.
    pub controller: PlayerId,
    pub zone: Zone,
    /// Damage accumulated this turn.
    pub damage: u32,
    /// Rested (turned sideways). A recovered object is not rested.
    pub rested: bool,
    /// Turn number on which this object entered the field, for summoning
    /// sickness checks.
    pub entered_turn: u32,
    pub counters: HashMap<CounterType, u32>,
    /// For additions attached to a resonator.
    pub attached_to: Option<ObjectId>,
    /// Additions attached to this object.
    pub attachments: Vec<ObjectId>,
    /// Abilities currently printed on this object (base; continuous effects
    /// may add or remove abilities in the calculated view).
    pub abilities: Vec<Ability>,
}

impl Object {
    pub fn new(id: ObjectId, definition: CardDefinition, owner: PlayerId, zone: Zone) -> Self {
        let abilities = definition.abilities.clone();
        Self {
            id,
            definition,
            owner,
            controller: owner,
            zone,
            damage: 0,
            rested: false,
            entered_turn: 0,
            counters: HashMap::new(),
            attached_to: None,
            attachments: Vec::new(),
            abilities,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn card_type(&self) -> CardType {
        self.definition.card_type
    }

    pub fn is_token(&self) -> bool {
        self.definition.is_token
    }

    /// Base ATK before continuous effects.
    pub fn base_atk(&self) -> i32 {
        self.definition.atk.unwrap_or(0)
    }

    /// Base DEF before continuous effects.
    pub fn base_def(&self) -> i32 {
        self.definition.def.unwrap_or(0)
    }

    pub fn counters_of(&self, counter_type: CounterType) -> u32 {
        self.counters.get(&counter_type).copied().unwrap_or(0)
    }

    pub fn add_counters(&mut self, counter_type: CounterType, count: u32) {
        *self.counters.entry(counter_type).or_insert(0) += count;
    }

    pub fn remove_counters(&mut self, counter_type: CounterType, count: u32) -> u32 {
        let entry = self.counters.entry(counter_type).or_insert(0);
        let removed = (*entry).min(count);
        *entry -= removed;
        if *entry == 0 {
            self.counters.remove(&counter_type);
        }
        removed
    }

    /// Reset the per-field runtime state when an object enters the field.
    pub fn reset_on_field_entry(&mut self, turn_number: u32) {
        self.damage = 0;
        self.rested = false;
        self.entered_turn = turn_number;
        self.attached_to = None;
        self.attachments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::ids::CardId;

    fn bear() -> CardDefinition {
        CardBuilder::new(CardId::from_raw(1), "Hedgehog of Good Luck")
            .card_type(CardType::Resonator)
            .stats(200, 200)
            .build()
    }

    #[test]
    fn test_new_object_defaults() {
        let obj = Object::new(ObjectId::from_raw(1), bear(), PlayerId::from_index(0), Zone::Hand);
        assert_eq!(obj.controller, obj.owner);
        assert_eq!(obj.damage, 0);
        assert!(!obj.rested);
        assert_eq!(obj.base_atk(), 200);
        assert_eq!(obj.base_def(), 200);
    }

    #[test]
    fn test_counters() {
        let mut obj =
            Object::new(ObjectId::from_raw(1), bear(), PlayerId::from_index(0), Zone::Field);
        obj.add_counters(CounterType::PlusHundred, 2);
        assert_eq!(obj.counters_of(CounterType::PlusHundred), 2);

        let removed = obj.remove_counters(CounterType::PlusHundred, 5);
        assert_eq!(removed, 2);
        assert_eq!(obj.counters_of(CounterType::PlusHundred), 0);
    }

    #[test]
    fn test_field_entry_reset() {
        let mut obj =
            Object::new(ObjectId::from_raw(1), bear(), PlayerId::from_index(0), Zone::Hand);
        obj.damage = 300;
        obj.rested = true;

        obj.reset_on_field_entry(4);
        assert_eq!(obj.damage, 0);
        assert!(!obj.rested);
        assert_eq!(obj.entered_turn, 4);
    }
}
