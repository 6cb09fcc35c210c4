//! The replacement engine.
//!
//! Proposed state-changing events pass through `process_event` before they
//! apply. All matching replacement effects are gathered; with one match it
//! applies directly, with several the affected player chooses the order, and
//! each application's output is re-offered to the remaining candidates. An
//! effect never applies twice to the same original event, and chains are
//! capped: exceeding the cap is a [`ConfigurationError`], a malformed rule
//! set rather than a legal game state.

use std::collections::HashSet;

use crate::decision::{DecisionMaker, SelectOptionsContext};
use crate::effect::Effect;
use crate::error::ConfigurationError;
use crate::events::zones::ZoneChangeEvent;
use crate::events::{
    DamageEvent, DestroyEvent, DiscardEvent, DrawEvent, EnterFieldEvent, Event, EventContext,
    EventKind, LifeGainEvent, LifeLossEvent,
};
use crate::game_event::{DamageTarget, EngineEvent};
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::replacement::{ReplacementAction, ReplacementEffectId, RedirectTarget};
use crate::triggers::TriggerEvent;
use crate::types::Keyword;
use crate::zone::Zone;

/// What is left of an event after replacement processing.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// The (possibly transformed) event happens.
    Proceed(Event),
    /// A replacement consumed the event entirely.
    DoesNotHappen,
}

impl EventOutcome {
    pub fn is_prevented(&self) -> bool {
        matches!(self, EventOutcome::DoesNotHappen)
    }
}

/// Result of running an event through the replacement engine.
#[derive(Debug)]
pub struct ProcessedEvent {
    pub outcome: EventOutcome,
    /// Effects from `Instead` replacements, to be executed by the caller in
    /// place of the original event. (source, controller, effects).
    pub instead_effects: Vec<(ObjectId, PlayerId, Vec<Effect>)>,
}

/// Run an event through all registered replacement effects.
pub fn process_event(
    game: &mut GameState,
    event: Event,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<ProcessedEvent, ConfigurationError> {
    let mut current = event;
    let mut applied: HashSet<ReplacementEffectId> = HashSet::new();
    let mut instead_effects = Vec::new();
    let mut depth: u32 = 0;

    loop {
        let applicable = collect_applicable(game, &current, &applied);

        if applicable.is_empty() {
            return Ok(ProcessedEvent {
                outcome: EventOutcome::Proceed(current),
                instead_effects,
            });
        }

        depth += 1;
        if depth > game.config.replacement_depth_cap {
            tracing::warn!(
                cap = game.config.replacement_depth_cap,
                "replacement chain depth exceeded"
            );
            return Err(ConfigurationError::ReplacementDepthExceeded {
                cap: game.config.replacement_depth_cap,
            });
        }

        let chosen = if applicable.len() == 1 {
            applicable[0]
        } else {
            choose_replacement(game, &current, &applicable, decision_maker)
        };
        applied.insert(chosen);

        let (action, source, controller) = {
            let effect = game
                .replacement_effects
                .get_effect(chosen)
                .expect("chosen replacement effect exists");
            (effect.action.clone(), effect.source, effect.controller)
        };
        if game.replacement_effects.is_one_shot(chosen) {
            game.replacement_effects.mark_effect_used(chosen);
        }

        match apply_action(&current, &action) {
            AppliedAction::Transformed(next) => {
                current = next;
            }
            AppliedAction::Prevented => {
                return Ok(ProcessedEvent {
                    outcome: EventOutcome::DoesNotHappen,
                    instead_effects,
                });
            }
            AppliedAction::Instead(effects) => {
                instead_effects.push((source, controller, effects));
                return Ok(ProcessedEvent {
                    outcome: EventOutcome::DoesNotHappen,
                    instead_effects,
                });
            }
            AppliedAction::NotApplicable => {
                tracing::debug!(
                    ?action,
                    kind = ?current.kind(),
                    "replacement action not applicable to event kind; skipped"
                );
            }
        }
    }
}

fn collect_applicable(
    game: &GameState,
    event: &Event,
    applied: &HashSet<ReplacementEffectId>,
) -> Vec<ReplacementEffectId> {
    let mut out = Vec::new();
    for effect in game.replacement_effects.effects() {
        if applied.contains(&effect.id) {
            continue;
        }
        // Self-replacement effects only see events about their own source;
        // the matchers express this, but keep the structural guarantee too.
        let ctx = EventContext::new(effect.controller, effect.source, game);
        if effect.matcher.matches_event(event.inner(), &ctx) {
            out.push(effect.id);
        }
    }
    out
}

/// When several replacements apply, the affected player chooses which to
/// apply first. For an event that affects an object this is the object's
/// controller; for a player event the player; events without a single
/// affected party fall to the active player.
fn choose_replacement(
    game: &GameState,
    event: &Event,
    applicable: &[ReplacementEffectId],
    decision_maker: &mut dyn DecisionMaker,
) -> ReplacementEffectId {
    let chooser = event.affected_player(game);
    let options: Vec<String> = applicable
        .iter()
        .map(|id| {
            game.replacement_effects
                .get_effect(*id)
                .map(|e| e.matcher.display())
                .unwrap_or_default()
        })
        .collect();

    let ctx = SelectOptionsContext {
        player: chooser,
        prompt: "Choose which replacement effect to apply first".into(),
        options,
        min: 1,
        max: 1,
    };
    let chosen_indices = decision_maker.decide_options(game, &ctx);
    let index = chosen_indices
        .first()
        .copied()
        .filter(|&i| i < applicable.len())
        .unwrap_or(0);
    applicable[index]
}

enum AppliedAction {
    Transformed(Event),
    Prevented,
    Instead(Vec<Effect>),
    NotApplicable,
}

fn apply_action(event: &Event, action: &ReplacementAction) -> AppliedAction {
    match action {
        ReplacementAction::Prevent => AppliedAction::Prevented,
        ReplacementAction::Instead(effects) => AppliedAction::Instead(effects.clone()),
        ReplacementAction::Modify(modification) => match event.kind() {
            EventKind::Damage => {
                let damage = event.downcast::<DamageEvent>().expect("kind matches");
                let mut next = damage.clone();
                next.amount = modification.apply(damage.amount);
                AppliedAction::Transformed(Event::new(next))
            }
            EventKind::LifeGain => {
                let gain = event.downcast::<LifeGainEvent>().expect("kind matches");
                let mut next = gain.clone();
                next.amount = modification.apply(gain.amount);
                AppliedAction::Transformed(Event::new(next))
            }
            EventKind::LifeLoss => {
                let loss = event.downcast::<LifeLossEvent>().expect("kind matches");
                let mut next = loss.clone();
                next.amount = modification.apply(loss.amount);
                AppliedAction::Transformed(Event::new(next))
            }
            EventKind::Draw => {
                let draw = event.downcast::<DrawEvent>().expect("kind matches");
                let mut next = draw.clone();
                next.count = modification.apply(draw.count);
                AppliedAction::Transformed(Event::new(next))
            }
            _ => AppliedAction::NotApplicable,
        },
        ReplacementAction::ChangeDestination(zone) => match event.kind() {
            EventKind::ZoneChange => {
                let change = event.downcast::<ZoneChangeEvent>().expect("kind matches");
                let mut next = change.clone();
                next.to = *zone;
                AppliedAction::Transformed(Event::new(next))
            }
            EventKind::Destroy => {
                // Destruction with a rerouted destination becomes a plain
                // zone change; the object is not "destroyed".
                let destroy = event.downcast::<DestroyEvent>().expect("kind matches");
                AppliedAction::Transformed(Event::zone_change(
                    destroy.permanent,
                    Zone::Field,
                    *zone,
                    None,
                ))
            }
            _ => AppliedAction::NotApplicable,
        },
        ReplacementAction::Redirect(target) => match event.kind() {
            EventKind::Damage => {
                let damage = event.downcast::<DamageEvent>().expect("kind matches");
                let mut next = damage.clone();
                next.target = match target {
                    RedirectTarget::ToPlayer(player) => DamageTarget::Player(*player),
                    RedirectTarget::ToObject(object) => DamageTarget::Object(*object),
                };
                AppliedAction::Transformed(Event::new(next))
            }
            _ => AppliedAction::NotApplicable,
        },
        ReplacementAction::EnterRested => match event.kind() {
            EventKind::EnterField => {
                let enter = event.downcast::<EnterFieldEvent>().expect("kind matches");
                let mut next = enter.clone();
                next.enters_rested = true;
                AppliedAction::Transformed(Event::new(next))
            }
            _ => AppliedAction::NotApplicable,
        },
    }
}

// =============================================================================
// Event execution: propose, intercept, apply
// =============================================================================

fn run_instead_effects(
    game: &mut GameState,
    instead: Vec<(ObjectId, PlayerId, Vec<Effect>)>,
    decision_maker: &mut dyn DecisionMaker,
) {
    for (source, controller, effects) in instead {
        let mut ctx = crate::executor::ExecutionContext::new(source, controller);
        for effect in &effects {
            if let Err(err) = crate::executor::execute_effect(game, effect, &mut ctx, decision_maker)
            {
                tracing::warn!(%err, "replacement instead-effect failed");
            }
        }
    }
}

/// Deal damage through the replacement pipeline. Returns the amount actually
/// dealt.
pub fn execute_damage(
    game: &mut GameState,
    source: ObjectId,
    target: DamageTarget,
    amount: u32,
    is_battle: bool,
    decision_maker: &mut dyn DecisionMaker,
) -> u32 {
    if amount == 0 {
        return 0;
    }

    let event = Event::damage(source, target, amount, is_battle);
    let processed = match process_event(game, event, decision_maker) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "damage event aborted");
            return 0;
        }
    };

    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return 0;
    };
    let damage = final_event.downcast::<DamageEvent>().expect("damage event");
    let (final_target, final_amount) = (damage.target, damage.amount);
    if final_amount == 0 {
        return 0;
    }

    match final_target {
        DamageTarget::Object(object) => {
            game.mark_damage(object, final_amount);
        }
        DamageTarget::Player(player) => {
            game.change_life(player, -(final_amount as i32));
        }
    }

    game.emit(EngineEvent::DamageDealt {
        source,
        target: final_target,
        amount: final_amount,
    });
    game.pending_trigger_events
        .push(TriggerEvent::damage(source, final_target, final_amount, is_battle));

    final_amount
}

/// Gain life through the replacement pipeline. Returns the amount gained.
pub fn execute_life_gain(
    game: &mut GameState,
    player: PlayerId,
    amount: u32,
    decision_maker: &mut dyn DecisionMaker,
) -> u32 {
    if amount == 0 {
        return 0;
    }
    let processed = match process_event(game, Event::life_gain(player, amount), decision_maker) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "life gain event aborted");
            return 0;
        }
    };
    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return 0;
    };
    let gain = final_event.downcast::<LifeGainEvent>().expect("life gain");
    let (final_player, final_amount) = (gain.player, gain.amount);
    if final_amount > 0 {
        game.change_life(final_player, final_amount as i32);
    }
    final_amount
}

/// Lose life through the replacement pipeline. Returns the amount lost.
pub fn execute_life_loss(
    game: &mut GameState,
    player: PlayerId,
    amount: u32,
    decision_maker: &mut dyn DecisionMaker,
) -> u32 {
    if amount == 0 {
        return 0;
    }
    let processed =
        match process_event(game, Event::life_loss(player, amount, false), decision_maker) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(%err, "life loss event aborted");
                return 0;
            }
        };
    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return 0;
    };
    let loss = final_event.downcast::<LifeLossEvent>().expect("life loss");
    let (final_player, final_amount) = (loss.player, loss.amount);
    if final_amount > 0 {
        game.change_life(final_player, -(final_amount as i32));
    }
    final_amount
}

/// Draw through the replacement pipeline. Returns the drawn cards.
pub fn execute_draw(
    game: &mut GameState,
    player: PlayerId,
    count: u32,
    decision_maker: &mut dyn DecisionMaker,
) -> Vec<ObjectId> {
    if count == 0 {
        return Vec::new();
    }
    let processed = match process_event(game, Event::draw(player, count), decision_maker) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "draw event aborted");
            return Vec::new();
        }
    };
    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return Vec::new();
    };
    let draw = final_event.downcast::<DrawEvent>().expect("draw event");
    let (final_player, final_count) = (draw.player, draw.count);
    game.draw_cards(final_player, final_count)
}

/// Destroy a permanent through the replacement pipeline.
///
/// Returns true if the permanent was actually destroyed. Indestructible
/// permanents simply don't get destroyed; destruction replaced by a zone
/// reroute moves the card without counting as destruction.
pub fn execute_destroy(
    game: &mut GameState,
    permanent: ObjectId,
    source: Option<ObjectId>,
    decision_maker: &mut dyn DecisionMaker,
) -> bool {
    let Some(obj) = game.object(permanent) else {
        return false;
    };
    if obj.zone != Zone::Field {
        return false;
    }

    if game.object_has_keyword(permanent, Keyword::Indestructible) {
        tracing::debug!(?permanent, "destruction prevented by Indestructible");
        return false;
    }

    let processed =
        match process_event(game, Event::destroy(permanent, source), decision_maker) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(%err, "destroy event aborted");
                return false;
            }
        };

    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return false;
    };

    match final_event.kind() {
        EventKind::Destroy => {
            // The destruction proceeds: the card goes to the graveyard, and
            // that move is itself interceptable.
            game.emit(EngineEvent::Destroyed { object: permanent });
            execute_zone_change(game, permanent, Zone::Graveyard, decision_maker);
            true
        }
        EventKind::ZoneChange => {
            // A replacement rerouted the card somewhere else instead.
            let change = final_event
                .downcast::<ZoneChangeEvent>()
                .expect("zone change");
            let to = change.to;
            game.move_object(permanent, to);
            false
        }
        _ => false,
    }
}

/// Remove a permanent from the game. Banishing is not destruction and is not
/// stopped by Indestructible.
pub fn execute_banish(
    game: &mut GameState,
    permanent: ObjectId,
    decision_maker: &mut dyn DecisionMaker,
) -> bool {
    let Some(obj) = game.object(permanent) else {
        return false;
    };
    if obj.zone == Zone::Removed {
        return false;
    }
    game.emit(EngineEvent::Banished { object: permanent });
    execute_zone_change(game, permanent, Zone::Removed, decision_maker);
    true
}

/// Move an object through the zone-change replacement window.
///
/// Returns the zone the object ended up in (replacements may have rerouted
/// it), or `None` if the move was prevented or the object ceased to exist.
pub fn execute_zone_change(
    game: &mut GameState,
    object: ObjectId,
    to: Zone,
    decision_maker: &mut dyn DecisionMaker,
) -> Option<Zone> {
    let from = game.object(object)?.zone;
    let snapshot = game.snapshot_object(object);
    let event = Event::zone_change(object, from, to, snapshot);

    let processed = match process_event(game, event, decision_maker) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "zone change event aborted");
            return None;
        }
    };

    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return None;
    };
    let change = final_event
        .downcast::<ZoneChangeEvent>()
        .expect("zone change");
    let final_to = change.to;
    game.move_object(object, final_to)
}

/// Put an object onto the field through the enter-field replacement window.
pub fn execute_enter_field(
    game: &mut GameState,
    object: ObjectId,
    decision_maker: &mut dyn DecisionMaker,
) -> Option<ObjectId> {
    let from = game.object(object)?.zone;
    let event = Event::enter_field(object, from, false);

    let processed = match process_event(game, event, decision_maker) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "enter field event aborted");
            return None;
        }
    };

    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return None;
    };
    let enter = final_event
        .downcast::<EnterFieldEvent>()
        .expect("enter field");
    let enters_rested = enter.enters_rested;

    // The move itself raises the zone-change trigger event; enter-field
    // triggers match it directly.
    game.move_object(object, Zone::Field)?;
    if enters_rested
        && let Some(obj) = game.object_mut(object)
    {
        obj.rested = true;
    }
    Some(object)
}

/// Discard a card through the replacement pipeline.
pub fn execute_discard(
    game: &mut GameState,
    card: ObjectId,
    player: PlayerId,
    decision_maker: &mut dyn DecisionMaker,
) -> Option<Zone> {
    let processed = match process_event(game, Event::discard(card, player), decision_maker) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "discard event aborted");
            return None;
        }
    };
    let EventOutcome::Proceed(final_event) = processed.outcome else {
        run_instead_effects(game, processed.instead_effects, decision_maker);
        return None;
    };
    let discard = final_event.downcast::<DiscardEvent>().expect("discard");
    let card = discard.card;
    execute_zone_change(game, card, Zone::Graveyard, decision_maker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::decision::AutoPassDecisionMaker;
    use crate::ids::CardId;
    use crate::replacement::{EventModification, ReplacementEffect};
    use crate::types::CardType;

    fn setup() -> (GameState, ObjectId) {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let source = CardBuilder::new(CardId::from_raw(1), "Flame of the Outer World")
            .card_type(CardType::Resonator)
            .stats(500, 500)
            .build();
        let id = game.create_object_from_card(&source, alice, Zone::Field);
        (game, id)
    }

    #[test]
    fn test_unreplaced_event_passes_through() {
        let (mut game, source) = setup();
        let bob = game.turn_order[1];
        let mut dm = AutoPassDecisionMaker;

        let dealt = execute_damage(
            &mut game,
            source,
            DamageTarget::Player(bob),
            500,
            false,
            &mut dm,
        );
        assert_eq!(dealt, 500);
        assert_eq!(game.player(bob).unwrap().life, 3500);
    }

    #[test]
    fn test_prevention_subtracts() {
        let (mut game, source) = setup();
        let bob = game.turn_order[1];
        let mut dm = AutoPassDecisionMaker;

        game.replacement_effects
            .add_resolution_effect(ReplacementEffect::prevent_damage_to_you(
                ObjectId::from_raw(99),
                bob,
                300,
            ));

        let dealt = execute_damage(
            &mut game,
            source,
            DamageTarget::Player(bob),
            500,
            false,
            &mut dm,
        );
        assert_eq!(dealt, 200);
        assert_eq!(game.player(bob).unwrap().life, 3800);
    }

    #[test]
    fn test_replacement_applies_once_per_event() {
        let (mut game, source) = setup();
        let bob = game.turn_order[1];
        let mut dm = AutoPassDecisionMaker;

        // Doubling damage must not reapply to its own output.
        game.replacement_effects.add_resolution_effect(
            ReplacementEffect::new(
                ObjectId::from_raw(99),
                bob,
                crate::events::Matcher::new(crate::events::DamageToYouMatcher),
                ReplacementAction::Modify(EventModification::Multiply(2)),
            ),
        );

        let dealt = execute_damage(
            &mut game,
            source,
            DamageTarget::Player(bob),
            300,
            false,
            &mut dm,
        );
        assert_eq!(dealt, 600);
    }

    #[test]
    fn test_chained_replacements_reorderable(){
        let (mut game, source) = setup();
        let bob = game.turn_order[1];

        // R1: halve incoming damage (SetTo 200); R2: subtract 100.
        game.replacement_effects.add_resolution_effect(ReplacementEffect::new(
            ObjectId::from_raw(98),
            bob,
            crate::events::Matcher::new(crate::events::DamageToYouMatcher),
            ReplacementAction::Modify(EventModification::SetTo(200)),
        ));
        game.replacement_effects.add_resolution_effect(ReplacementEffect::new(
            ObjectId::from_raw(99),
            bob,
            crate::events::Matcher::new(crate::events::DamageToYouMatcher),
            ReplacementAction::Modify(EventModification::Subtract(100)),
        ));

        // Affected player picks the first listed effect each time:
        // SetTo(200) then Subtract(100) = 100 damage.
        let mut dm = crate::decision::ScriptedDecisionMaker::default().with_options(vec![vec![0]]);
        let dealt = execute_damage(
            &mut game,
            source,
            DamageTarget::Player(bob),
            800,
            false,
            &mut dm,
        );
        assert_eq!(dealt, 100);
    }

    #[test]
    fn test_depth_cap_is_configuration_error() {
        let (mut game, _source) = setup();
        let bob = game.turn_order[1];
        game.config.replacement_depth_cap = 4;

        // Adding damage re-matches forever; the cap must fire.
        game.replacement_effects.add_resolution_effect(ReplacementEffect::new(
            ObjectId::from_raw(99),
            bob,
            crate::events::Matcher::new(crate::events::DamageToYouMatcher),
            ReplacementAction::Modify(EventModification::Add(100)),
        ));
        // A second identical effect keeps the chain alive after the first is
        // exhausted... but each effect applies only once, so build many.
        for i in 0..10 {
            game.replacement_effects.add_resolution_effect(ReplacementEffect::new(
                ObjectId::from_raw(100 + i),
                bob,
                crate::events::Matcher::new(crate::events::DamageToYouMatcher),
                ReplacementAction::Modify(EventModification::Add(100)),
            ));
        }

        let mut dm = AutoPassDecisionMaker;
        let result = process_event(
            &mut game,
            Event::damage(
                ObjectId::from_raw(1),
                DamageTarget::Player(bob),
                100,
                false,
            ),
            &mut dm,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::ReplacementDepthExceeded { cap: 4 })
        ));
    }

    #[test]
    fn test_destroy_rerouted_is_not_destruction() {
        let (mut game, id) = setup();
        let alice = game.turn_order[0];
        let mut dm = AutoPassDecisionMaker;

        game.replacement_effects
            .add_resolution_effect(ReplacementEffect::banish_instead_of_graveyard(id, alice));

        // The effect matches the field->graveyard move rather than the
        // destroy event itself: destruction proceeds, the move reroutes.
        let destroyed = execute_destroy(&mut game, id, None, &mut dm);
        assert!(destroyed);
        assert_eq!(game.object(id).unwrap().zone, Zone::Removed);
        assert!(game.player(alice).unwrap().removed.contains(&id));
        assert!(game.player(alice).unwrap().graveyard.is_empty());
    }

    #[test]
    fn test_indestructible_blocks_destruction() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let tough = CardBuilder::new(CardId::from_raw(2), "Adamantine Golem")
            .card_type(CardType::Resonator)
            .stats(300, 300)
            .keyword(Keyword::Indestructible)
            .build();
        let id = game.create_object_from_card(&tough, alice, Zone::Field);

        let mut dm = AutoPassDecisionMaker;
        assert!(!execute_destroy(&mut game, id, None, &mut dm));
        assert_eq!(game.object(id).unwrap().zone, Zone::Field);
    }
}
