//! Trigger checking and queue management.
//!
//! `check_triggers` scans everything in play for triggered abilities matching
//! a game event; matches are queued and later put on the Chase in APNAP order
//! by the game loop.

use crate::ability::{AbilityKind, InterveningIfCondition, TriggeredAbility};
use crate::effect::Effect;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

use super::Trigger;
use super::matcher_trait::TriggerContext;
use super::trigger_event::TriggerEvent;

/// A triggered ability that fired and is waiting to go on the Chase.
#[derive(Debug, Clone)]
pub struct TriggeredAbilityEntry {
    /// The permanent carrying the triggered ability.
    pub source: ObjectId,
    /// The controller of the triggered ability.
    pub controller: PlayerId,
    /// Index of the ability on its source, for once-per-turn bookkeeping.
    pub ability_index: usize,
    /// The triggered ability definition.
    pub ability: TriggeredAbility,
    /// The event that fired this ability.
    pub triggering_event: TriggerEvent,
    /// Name of the source for logs and ordering prompts.
    pub source_name: String,
}

/// A delayed trigger waiting for a specific event to occur.
#[derive(Debug, Clone)]
pub struct DelayedTrigger {
    pub trigger: Trigger,
    /// Effects to execute when the trigger fires.
    pub effects: Vec<Effect>,
    /// The object that scheduled this trigger.
    pub source: ObjectId,
    pub controller: PlayerId,
    /// One-shot triggers fire once and are removed.
    pub one_shot: bool,
}

/// Queue of triggered abilities waiting to be put on the Chase.
#[derive(Debug, Clone, Default)]
pub struct TriggerQueue {
    pub entries: Vec<TriggeredAbilityEntry>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: TriggeredAbilityEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Take all entries, leaving the queue empty.
    pub fn take_all(&mut self) -> Vec<TriggeredAbilityEntry> {
        std::mem::take(&mut self.entries)
    }
}

/// Check everything in play for triggered abilities matching the given event.
///
/// Abilities are taken from the calculated view, so granted and removed
/// abilities are honored. Once-per-turn triggers that already fired this turn
/// and intervening-if triggers whose condition is currently false do not
/// queue.
pub fn check_triggers(game: &GameState, trigger_event: &TriggerEvent) -> Vec<TriggeredAbilityEntry> {
    let mut triggered = Vec::new();

    let mut sources: Vec<ObjectId> = game.field_object_ids();
    for player in &game.players {
        if let Some(ruler) = player.ruler {
            sources.push(ruler);
        }
    }

    for obj_id in sources {
        let Some(chars) = game.calculated_characteristics(obj_id) else {
            continue;
        };
        let controller = chars.controller;
        let ctx = TriggerContext::for_source(obj_id, controller, game);

        for (ability_index, ability) in chars.abilities.iter().enumerate() {
            let AbilityKind::Triggered(trigger_ability) = &ability.kind else {
                continue;
            };

            if !trigger_ability.trigger.matches(trigger_event, &ctx) {
                continue;
            }

            if trigger_ability.once_per_turn
                && game
                    .triggers_fired_this_turn
                    .contains(&(obj_id, ability_index))
            {
                continue;
            }

            // Intervening-if is checked when the trigger fires and again when
            // it would resolve.
            if let Some(condition) = &trigger_ability.intervening_if
                && !verify_intervening_if(game, condition, controller, obj_id)
            {
                continue;
            }

            let source_name = game
                .object(obj_id)
                .map(|o| o.name().to_string())
                .unwrap_or_default();

            triggered.push(TriggeredAbilityEntry {
                source: obj_id,
                controller,
                ability_index,
                ability: trigger_ability.clone(),
                triggering_event: trigger_event.clone(),
                source_name,
            });
        }
    }

    triggered
}

/// Check delayed triggers against an event. Fired one-shot triggers are
/// removed from the game state.
pub fn check_delayed_triggers(
    game: &mut GameState,
    trigger_event: &TriggerEvent,
) -> Vec<TriggeredAbilityEntry> {
    let mut fired = Vec::new();
    let delayed = std::mem::take(&mut game.delayed_triggers);
    let mut remaining = Vec::new();

    for entry in delayed {
        let ctx = TriggerContext::for_source(entry.source, entry.controller, game);
        if entry.trigger.matches(trigger_event, &ctx) {
            let source_name = game
                .object(entry.source)
                .map(|o| o.name().to_string())
                .unwrap_or_default();
            fired.push(TriggeredAbilityEntry {
                source: entry.source,
                controller: entry.controller,
                ability_index: usize::MAX,
                ability: TriggeredAbility::new(entry.trigger.clone(), entry.effects.clone()),
                triggering_event: trigger_event.clone(),
                source_name,
            });
            if !entry.one_shot {
                remaining.push(entry);
            }
        } else {
            remaining.push(entry);
        }
    }

    game.delayed_triggers = remaining;
    fired
}

/// Evaluate an intervening-if condition against the current game state.
pub fn verify_intervening_if(
    game: &GameState,
    condition: &InterveningIfCondition,
    controller: PlayerId,
    source: ObjectId,
) -> bool {
    match condition {
        InterveningIfCondition::ControllerLifeAtMost(threshold) => game
            .player(controller)
            .is_some_and(|p| p.life <= *threshold),
        InterveningIfCondition::ControllerLifeAtLeast(threshold) => game
            .player(controller)
            .is_some_and(|p| p.life >= *threshold),
        InterveningIfCondition::ControlsAtLeast { filter, count } => {
            let matching = filter.collect_matching(game, controller).len() as u32;
            matching >= *count
        }
        InterveningIfCondition::SourceOnField => game
            .object(source)
            .is_some_and(|o| o.zone == crate::zone::Zone::Field),
    }
}
