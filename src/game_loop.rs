//! The game loop.
//!
//! Control flow for one priority window: settle the game (state-based actions
//! to a fixpoint, then fired triggers onto the Chase in APNAP order), offer
//! priority, and act on the response. Both players passing resolves the top of
//! the Chase when it is non-empty, advances the battle when one is underway,
//! and otherwise ends the phase.
//!
//! External input arrives through the suspension surface: [`advance_priority`]
//! runs the engine until a decision is needed and returns the typed context;
//! [`apply_priority_response`] validates and applies the answer. In-process
//! hosts and tests drive the same machinery through
//! [`run_priority_loop_with`] and [`execute_turn_with`] with a
//! [`DecisionMaker`].

use crate::ability::AbilityKind;
use crate::decision::{
    AutoPassDecisionMaker, BooleanContext, DecisionContext, DecisionMaker, GameProgress,
    GameResult, LegalAction, NumberContext, OrderContext, PriorityContext, ResponseError,
    SelectObjectsContext, TargetRequirementContext, TargetsContext,
};
use crate::error::ConfigurationError;
use crate::event_processor::{execute_enter_field, execute_zone_change};
use crate::executor::{ExecutionContext, ExecutionError, execute_effect};
use crate::effect::{Effect, Value};
use crate::game_event::EngineEvent;
use crate::game_state::{ChaseEntry, GameState, Phase};
use crate::ids::{ObjectId, PlayerId};
use crate::rules::combat::{
    BattleStep, CombatError, advance_battle_step, can_attack, can_block, declare_attack,
    declare_block,
};
use crate::rules::state_based::apply_state_based_actions;
use crate::target::{ChooseSpec, Target};
use crate::targeting::{compute_legal_targets, has_legal_targets, revalidate_targets};
use crate::triggers::{
    TriggerEvent, TriggerQueue, TriggeredAbilityEntry, check_delayed_triggers, check_triggers,
    verify_intervening_if,
};
use crate::turn::{
    PriorityResult, PriorityTracker, apply_end_phase_discard, end_phase_discard_requirement,
    enter_end_phase, enter_main_phase, execute_draw_phase, execute_recovery_phase,
    execute_turn_cleanup, begin_turn, give_priority, is_main_timing, pass_priority,
    reset_priority,
};
use crate::types::{Attribute, CardType};
use crate::will::WillCost;
use crate::zone::Zone;

// ============================================================================
// Errors
// ============================================================================

/// An attempted player action that violates a timing, priority, or cost rule.
///
/// Raised before any state mutation; the message names the violated rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("that player does not hold priority")]
    NotYourPriority,
    #[error("the card is not in your hand")]
    NotInHand,
    #[error("this card type cannot be played from hand")]
    NotPlayable,
    #[error("chant-speed cards can only be played at main timing")]
    WrongTiming,
    #[error("not enough will to pay the cost")]
    CannotAfford,
    #[error("a required target has no legal choice")]
    NoLegalTargets,
    #[error("the card is not set in your standby area")]
    NotInStandby,
    #[error("no such activated ability on that card")]
    NoSuchAbility,
    #[error("that ability has already been used this turn")]
    AlreadyUsedThisTurn,
    #[error("the source must be recovered to pay its rest cost")]
    SourceRested,
    #[error("will abilities require a recovered source you control")]
    WillSourceNotReady,
    #[error("calling a stone is once per turn")]
    StoneAlreadyCalled,
    #[error("the ruler must be recovered to call a stone")]
    RulerNotRecovered,
    #[error("the stone deck is empty")]
    StoneDeckEmpty,
    #[error("no ruler in the ruler area")]
    NoRuler,
    #[error("judgment is once per game")]
    JudgmentAlreadyPerformed,
    #[error("this ruler has no judgment cost")]
    NoJudgment,
    #[error("only available at main timing")]
    NotMainTiming,
}

/// Errors surfaced by the game loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameLoopError {
    #[error("illegal action: {0}")]
    Action(#[from] ActionError),
    #[error("illegal battle declaration: {0}")]
    Combat(#[from] CombatError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("rejected response: {0}")]
    Response(#[from] ResponseError),
    #[error("invalid game state: {0}")]
    InvalidState(String),
}

// ============================================================================
// The suspension surface
// ============================================================================

/// Answer to a pending decision, supplied by the external caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorityResponse {
    Action(LegalAction),
    Targets(Vec<Target>),
    Number(u32),
}

/// A spell cast paused at a choice point (X value, then targets).
#[derive(Debug, Clone)]
struct PendingCast {
    spell: ObjectId,
    player: PlayerId,
    from_standby: bool,
    needs_x: bool,
    x: Option<u32>,
    specs: Vec<ChooseSpec>,
}

/// Per-window loop state: the pass tracker, the trigger queue, and whatever
/// decision is currently pending.
pub struct PriorityLoopState {
    pub tracker: PriorityTracker,
    pub triggers: TriggerQueue,
    pending: Option<DecisionContext>,
    pending_cast: Option<PendingCast>,
}

impl PriorityLoopState {
    pub fn new(players_in_game: usize) -> Self {
        Self {
            tracker: PriorityTracker::new(players_in_game),
            triggers: TriggerQueue::new(),
            pending: None,
            pending_cast: None,
        }
    }

    /// The decision currently awaiting an answer, if any.
    pub fn pending_decision(&self) -> Option<&DecisionContext> {
        self.pending.as_ref()
    }
}

// ============================================================================
// Settlement: state-based actions and trigger collection
// ============================================================================

/// Run state-based actions to a fixpoint.
///
/// Static continuous registrations are refreshed before every pass so the
/// checks see current effective characteristics. Exceeding the iteration cap
/// is a [`ConfigurationError`]: a correction that recreates its own condition
/// is an authoring bug, not a legal game state.
pub fn check_and_apply_sbas(
    game: &mut GameState,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<(), GameLoopError> {
    let mut iterations = 0u32;
    loop {
        game.refresh_continuous_state();
        iterations += 1;
        if iterations > game.config.sba_iteration_cap {
            tracing::warn!(
                cap = game.config.sba_iteration_cap,
                "state-based actions did not converge"
            );
            return Err(ConfigurationError::StateBasedActionLoop {
                cap: game.config.sba_iteration_cap,
            }
            .into());
        }
        if !apply_state_based_actions(game, decision_maker) {
            return Ok(());
        }
    }
}

/// Settle the game: state-based actions to a fixpoint, then match the trigger
/// events those mutations raised. Fired triggers land in `queue`; putting them
/// on the Chase is the caller's next step. New trigger events raised while
/// applying corrections feed back in, bounded by the cascade cap.
pub fn settle(
    game: &mut GameState,
    queue: &mut TriggerQueue,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<(), GameLoopError> {
    let mut rounds = 0u32;
    loop {
        check_and_apply_sbas(game, decision_maker)?;

        let events: Vec<TriggerEvent> = std::mem::take(&mut game.pending_trigger_events);
        if events.is_empty() {
            return Ok(());
        }
        rounds += 1;
        if rounds > game.config.trigger_cascade_cap {
            tracing::warn!(
                cap = game.config.trigger_cascade_cap,
                "trigger cascade did not converge"
            );
            return Err(ConfigurationError::TriggerCascadeOverflow {
                cap: game.config.trigger_cascade_cap,
            }
            .into());
        }

        for event in events {
            for entry in check_triggers(game, &event) {
                game.emit(EngineEvent::TriggerQueued {
                    source: entry.source,
                    controller: entry.controller,
                });
                queue.add(entry);
            }
            for entry in check_delayed_triggers(game, &event) {
                game.emit(EngineEvent::TriggerQueued {
                    source: entry.source,
                    controller: entry.controller,
                });
                queue.add(entry);
            }
        }
    }
}

// ============================================================================
// Putting triggers on the Chase (APNAP)
// ============================================================================

/// Put every queued trigger on the Chase in APNAP order.
///
/// The active player's triggers go on first (so they resolve last); each
/// player chooses the relative order among their own simultaneous triggers.
pub fn put_triggers_on_chase(
    game: &mut GameState,
    queue: &mut TriggerQueue,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<(), GameLoopError> {
    if queue.is_empty() {
        return Ok(());
    }

    let active = game.turn.active_player;
    let mut active_entries = Vec::new();
    let mut other_entries = Vec::new();
    for entry in queue.take_all() {
        if entry.controller == active {
            active_entries.push(entry);
        } else {
            other_entries.push(entry);
        }
    }

    for group in [active_entries, other_entries] {
        for entry in order_own_triggers(game, group, decision_maker) {
            push_trigger_entry(game, entry, decision_maker);
        }
    }
    Ok(())
}

/// Let a player order their own simultaneous triggers. A malformed answer
/// falls back to queue order.
fn order_own_triggers(
    game: &GameState,
    entries: Vec<TriggeredAbilityEntry>,
    decision_maker: &mut dyn DecisionMaker,
) -> Vec<TriggeredAbilityEntry> {
    if entries.len() < 2 {
        return entries;
    }
    let player = entries[0].controller;
    let ctx = OrderContext {
        player,
        prompt: "Choose the order your triggered abilities go on the Chase".into(),
        items: entries.iter().map(|e| e.source_name.clone()).collect(),
    };
    let order = decision_maker.decide_order(game, &ctx);

    let mut sorted: Vec<usize> = order.clone();
    sorted.sort_unstable();
    if sorted != (0..entries.len()).collect::<Vec<_>>() {
        tracing::debug!(?order, "invalid trigger ordering answer; using queue order");
        return entries;
    }

    let mut slots: Vec<Option<TriggeredAbilityEntry>> = entries.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

fn push_trigger_entry(
    game: &mut GameState,
    trigger: TriggeredAbilityEntry,
    decision_maker: &mut dyn DecisionMaker,
) {
    // "You may" triggers ask their controller before going on the Chase.
    if !trigger.ability.mandatory {
        let ctx = BooleanContext {
            player: trigger.controller,
            prompt: format!("Use {}'s triggered ability?", trigger.source_name),
        };
        if !decision_maker.decide_boolean(game, &ctx) {
            return;
        }
    }

    if trigger.ability_index != usize::MAX && trigger.ability.once_per_turn {
        game.triggers_fired_this_turn
            .insert((trigger.source, trigger.ability_index));
    }

    // Targets are captured now; they are re-validated at resolution.
    let mut targets = Vec::new();
    if !trigger.ability.choices.is_empty() {
        let mut requirements = Vec::new();
        for spec in &trigger.ability.choices {
            let legal = compute_legal_targets(game, spec, trigger.controller);
            if legal.len() < spec.min {
                tracing::debug!(
                    source = ?trigger.source,
                    "triggered ability has no legal targets and does not go on the Chase"
                );
                return;
            }
            requirements.push(TargetRequirementContext {
                description: format!("target for {}", trigger.source_name),
                legal_targets: legal,
                min: spec.min,
                max: spec.max,
            });
        }
        let ctx = TargetsContext {
            player: trigger.controller,
            source: trigger.source,
            prompt: format!("Choose targets for {}'s triggered ability", trigger.source_name),
            requirements: requirements.clone(),
        };
        let chosen = decision_maker.decide_targets(game, &ctx);
        targets = clamp_targets_to_requirements(chosen, &requirements);
    }

    let snapshot = game.snapshot_object(trigger.source);
    let mut entry = ChaseEntry::ability(
        trigger.source,
        trigger.controller,
        trigger.ability.effects.clone(),
    )
    .with_targets(targets, trigger.ability.choices.clone())
    .with_source_name(trigger.source_name.clone())
    .with_triggering_event(trigger.triggering_event.clone());
    if let Some(snapshot) = snapshot {
        entry = entry.with_snapshot(snapshot);
    }
    if let Some(condition) = &trigger.ability.intervening_if {
        entry = entry.with_intervening_if(condition.clone());
    }
    game.push_to_chase(entry);
}

/// Keep only answers that are legal for their positional requirement, topping
/// up to each requirement's minimum from its legal set.
fn clamp_targets_to_requirements(
    chosen: Vec<Target>,
    requirements: &[TargetRequirementContext],
) -> Vec<Target> {
    let mut result = Vec::new();
    let mut supplied = chosen.into_iter();
    for req in requirements {
        let mut picked: Vec<Target> = Vec::new();
        while picked.len() < req.max {
            let Some(candidate) = supplied.next() else {
                break;
            };
            if req.legal_targets.contains(&candidate) && !picked.contains(&candidate) {
                picked.push(candidate);
            }
        }
        let mut fill = req.legal_targets.iter();
        while picked.len() < req.min {
            let Some(&fallback) = fill.next() else {
                break;
            };
            if !picked.contains(&fallback) {
                picked.push(fallback);
            }
        }
        result.extend(picked);
    }
    result
}

// ============================================================================
// Chase resolution
// ============================================================================

/// Resolve the top entry of the Chase.
///
/// Intervening-if conditions are rechecked first: a false recheck discards
/// the ability without resolving. Targets are then re-validated against
/// current effective characteristics; individually-invalid targets drop, and
/// an entry that had targets but lost all of them fizzles, with the source
/// still moving to its normal post-resolution zone.
pub fn resolve_chase_entry(
    game: &mut GameState,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<(), GameLoopError> {
    let Some(entry) = game.pop_from_chase() else {
        return Err(GameLoopError::InvalidState(
            "resolve called with an empty Chase".into(),
        ));
    };

    if let Some(condition) = &entry.intervening_if
        && !verify_intervening_if(game, condition, entry.controller, entry.object_id)
    {
        tracing::debug!(
            source = ?entry.object_id,
            "intervening-if condition false at resolution; trigger discarded"
        );
        game.emit(EngineEvent::TriggerDiscarded {
            source: entry.object_id,
        });
        return Ok(());
    }

    let (valid_targets, fizzled) =
        revalidate_targets(game, &entry.targets, &entry.choices, entry.controller);
    if fizzled {
        tracing::debug!(source = ?entry.object_id, "all targets invalid; entry fizzles");
        game.emit(EngineEvent::ChaseEntryFizzled {
            object: entry.object_id,
            controller: entry.controller,
        });
        if !entry.is_ability {
            move_spent_spell(game, entry.object_id, decision_maker);
        }
        return Ok(());
    }

    if entry.is_judgment {
        resolve_judgment(game, &entry, decision_maker);
        return Ok(());
    }

    let mut ctx = ExecutionContext::new(entry.object_id, entry.controller)
        .with_targets(valid_targets);
    if let Some(x) = entry.x_value {
        ctx = ctx.with_x(x);
    }

    if entry.is_ability {
        for effect in entry.ability_effects.as_deref().unwrap_or_default() {
            run_resolution_effect(game, effect, &mut ctx, decision_maker);
        }
    } else {
        let Some(definition) = game.object(entry.object_id).map(|o| o.definition.clone())
        else {
            // The card left the Chase (e.g. was removed wholesale); nothing
            // resolves.
            tracing::debug!(source = ?entry.object_id, "spell missing at resolution");
            game.emit(EngineEvent::ChaseEntryFizzled {
                object: entry.object_id,
                controller: entry.controller,
            });
            return Ok(());
        };

        if definition.card_type.is_permanent() {
            execute_enter_field(game, entry.object_id, decision_maker);
            attach_addition(game, entry.object_id, &definition, &ctx.targets);
        } else {
            for effect in &definition.resolution_effects {
                run_resolution_effect(game, effect, &mut ctx, decision_maker);
            }
            move_spent_spell(game, entry.object_id, decision_maker);
        }
    }

    game.emit(EngineEvent::ChaseEntryResolved {
        object: entry.object_id,
        controller: entry.controller,
    });
    Ok(())
}

/// A configuration error inside one effect aborts that effect, not the game:
/// the offending registration is logged and the rest of the resolution
/// continues.
fn run_resolution_effect(
    game: &mut GameState,
    effect: &Effect,
    ctx: &mut ExecutionContext,
    decision_maker: &mut dyn DecisionMaker,
) {
    if let Err(ExecutionError::Configuration(err)) =
        execute_effect(game, effect, ctx, decision_maker)
    {
        tracing::warn!(%err, source = ?ctx.source, "effect rejected during resolution");
    }
}

fn move_spent_spell(
    game: &mut GameState,
    spell: ObjectId,
    decision_maker: &mut dyn DecisionMaker,
) {
    if game.object(spell).is_some_and(|o| o.zone == Zone::Chase) {
        execute_zone_change(game, spell, Zone::Graveyard, decision_maker);
    }
}

/// A resonator addition entering the field attaches to its chosen host.
fn attach_addition(
    game: &mut GameState,
    addition: ObjectId,
    definition: &crate::card::CardDefinition,
    targets: &[Target],
) {
    if definition.card_type != CardType::AdditionResonator {
        return;
    }
    let host = targets.iter().find_map(|t| match t {
        Target::Object(id) => Some(*id),
        Target::Player(_) => None,
    });
    let Some(host) = host else {
        return;
    };
    if let Some(obj) = game.object_mut(addition) {
        obj.attached_to = Some(host);
    }
    if let Some(host_obj) = game.object_mut(host) {
        host_obj.attachments.push(addition);
    }
}

fn resolve_judgment(
    game: &mut GameState,
    entry: &ChaseEntry,
    decision_maker: &mut dyn DecisionMaker,
) {
    let ruler = entry.object_id;
    let j_side = game
        .object(ruler)
        .and_then(|o| o.definition.j_ruler_side.clone());
    let Some(side) = j_side else {
        tracing::debug!(?ruler, "judgment resolved without a J-Ruler side");
        return;
    };
    if let Some(obj) = game.object_mut(ruler) {
        obj.definition = *side;
    }
    execute_enter_field(game, ruler, decision_maker);
    game.emit(EngineEvent::JudgmentPerformed {
        player: entry.controller,
        j_ruler: ruler,
    });
    game.emit(EngineEvent::ChaseEntryResolved {
        object: ruler,
        controller: entry.controller,
    });
}

// ============================================================================
// Legal actions
// ============================================================================

/// Everything the given player may legally do right now. Passing is always
/// legal for the priority holder.
pub fn compute_legal_actions(game: &GameState, player: PlayerId) -> Vec<LegalAction> {
    let mut actions = vec![LegalAction::PassPriority];

    if let Some(battle) = &game.battle
        && battle.step == BattleStep::DeclareBlocker
        && battle.defending_player == player
        && battle.blocker.is_none()
    {
        for &blocker in &game.field {
            if can_block(game, player, blocker).is_ok() {
                actions.push(LegalAction::DeclareBlock { blocker });
            }
        }
    }

    let hand: Vec<ObjectId> = game
        .player(player)
        .map(|p| p.hand.clone())
        .unwrap_or_default();
    for card in hand {
        if can_cast_spell(game, player, card).is_ok() {
            actions.push(LegalAction::CastSpell { spell_id: card });
        }
    }

    let standby: Vec<ObjectId> = game
        .player(player)
        .map(|p| p.standby.clone())
        .unwrap_or_default();
    for card in standby {
        if can_play_from_standby(game, player, card).is_ok() {
            actions.push(LegalAction::PlayFromStandby { card_id: card });
        }
    }

    for source in controlled_sources(game, player) {
        let Some(chars) = game.calculated_characteristics(source) else {
            continue;
        };
        for (index, ability) in chars.abilities.iter().enumerate() {
            match &ability.kind {
                AbilityKind::Activated(_) => {
                    if can_activate_ability(game, player, source, index).is_ok() {
                        actions.push(LegalAction::ActivateAbility {
                            source,
                            ability_index: index,
                        });
                    }
                }
                AbilityKind::Will(will) => {
                    if !game.is_rested(source) {
                        for &attribute in &will.produces {
                            actions.push(LegalAction::ProduceWill { source, attribute });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if is_main_timing(game, player) {
        if can_call_stone(game, player).is_ok() {
            actions.push(LegalAction::CallStone);
        }
        if can_perform_judgment(game, player).is_ok() {
            actions.push(LegalAction::Judgment);
        }

        let opponent = game.opponent_of(player);
        let attackers: Vec<ObjectId> = game
            .field
            .iter()
            .copied()
            .filter(|&id| game.controller_of(id) == player)
            .collect();
        for attacker in attackers {
            if can_attack(game, player, attacker, Target::Player(opponent)).is_ok() {
                actions.push(LegalAction::DeclareAttack {
                    attacker,
                    target: Target::Player(opponent),
                });
            }
            for &defender in &game.field {
                if game.controller_of(defender) == opponent
                    && can_attack(game, player, attacker, Target::Object(defender)).is_ok()
                {
                    actions.push(LegalAction::DeclareAttack {
                        attacker,
                        target: Target::Object(defender),
                    });
                }
            }
        }
    }

    actions
}

fn controlled_sources(game: &GameState, player: PlayerId) -> Vec<ObjectId> {
    let mut sources: Vec<ObjectId> = game
        .field
        .iter()
        .copied()
        .filter(|&id| game.controller_of(id) == player)
        .collect();
    if let Some(ruler) = game.player(player).and_then(|p| p.ruler) {
        sources.push(ruler);
    }
    sources
}

/// Validate playing a card from hand, without mutating anything.
pub fn can_cast_spell(
    game: &GameState,
    player: PlayerId,
    card: ObjectId,
) -> Result<(), ActionError> {
    let Some(obj) = game.object(card) else {
        return Err(ActionError::NotInHand);
    };
    if obj.zone != Zone::Hand || obj.owner != player {
        return Err(ActionError::NotInHand);
    }
    let def = &obj.definition;
    match def.card_type {
        CardType::Ruler | CardType::JRuler | CardType::MagicStone | CardType::SpecialMagicStone => {
            return Err(ActionError::NotPlayable);
        }
        _ => {}
    }
    if !def.is_instant_speed() && !is_main_timing(game, player) {
        return Err(ActionError::WrongTiming);
    }
    if !can_afford(game, player, &def.cost) {
        return Err(ActionError::CannotAfford);
    }
    if !has_legal_targets(game, &def.choices, player) {
        return Err(ActionError::NoLegalTargets);
    }
    Ok(())
}

/// Validate playing a set chant-standby card. Playing from standby is free
/// and allowed at any priority window.
pub fn can_play_from_standby(
    game: &GameState,
    player: PlayerId,
    card: ObjectId,
) -> Result<(), ActionError> {
    let Some(obj) = game.object(card) else {
        return Err(ActionError::NotInStandby);
    };
    if obj.zone != Zone::Standby || obj.owner != player {
        return Err(ActionError::NotInStandby);
    }
    if !has_legal_targets(game, &obj.definition.choices, player) {
        return Err(ActionError::NoLegalTargets);
    }
    Ok(())
}

/// Validate activating the ability at `index` on `source`.
pub fn can_activate_ability(
    game: &GameState,
    player: PlayerId,
    source: ObjectId,
    index: usize,
) -> Result<(), ActionError> {
    let Some(chars) = game.calculated_characteristics(source) else {
        return Err(ActionError::NoSuchAbility);
    };
    if chars.controller != player {
        return Err(ActionError::NoSuchAbility);
    }
    let in_play = game
        .object(source)
        .is_some_and(|o| o.zone == Zone::Field || o.zone == Zone::RulerArea);
    if !in_play {
        return Err(ActionError::NoSuchAbility);
    }
    let Some(AbilityKind::Activated(ability)) = chars.abilities.get(index).map(|a| &a.kind)
    else {
        return Err(ActionError::NoSuchAbility);
    };

    if ability.once_per_turn
        && game.activated_abilities_this_turn.contains(&(source, index))
    {
        return Err(ActionError::AlreadyUsedThisTurn);
    }
    if ability.rest_cost && game.is_rested(source) {
        return Err(ActionError::SourceRested);
    }
    if ability.main_timing_only && !is_main_timing(game, player) {
        return Err(ActionError::NotMainTiming);
    }
    if !can_afford(game, player, &ability.will_cost) {
        return Err(ActionError::CannotAfford);
    }
    if !has_legal_targets(game, &ability.choices, player) {
        return Err(ActionError::NoLegalTargets);
    }
    Ok(())
}

pub fn can_call_stone(game: &GameState, player: PlayerId) -> Result<(), ActionError> {
    if !is_main_timing(game, player) {
        return Err(ActionError::NotMainTiming);
    }
    let Some(p) = game.player(player) else {
        return Err(ActionError::NoRuler);
    };
    if p.has_called_stone {
        return Err(ActionError::StoneAlreadyCalled);
    }
    let Some(ruler) = p.ruler else {
        return Err(ActionError::NoRuler);
    };
    if game.is_rested(ruler) {
        return Err(ActionError::RulerNotRecovered);
    }
    if p.stone_deck.is_empty() {
        return Err(ActionError::StoneDeckEmpty);
    }
    Ok(())
}

pub fn can_perform_judgment(game: &GameState, player: PlayerId) -> Result<(), ActionError> {
    if !is_main_timing(game, player) {
        return Err(ActionError::NotMainTiming);
    }
    let Some(p) = game.player(player) else {
        return Err(ActionError::NoRuler);
    };
    if p.has_performed_judgment {
        return Err(ActionError::JudgmentAlreadyPerformed);
    }
    let Some(ruler) = p.ruler else {
        return Err(ActionError::NoRuler);
    };
    let Some(obj) = game.object(ruler) else {
        return Err(ActionError::NoRuler);
    };
    let Some(cost) = &obj.definition.judgment_cost else {
        return Err(ActionError::NoJudgment);
    };
    if obj.definition.j_ruler_side.is_none() {
        return Err(ActionError::NoJudgment);
    }
    if !can_afford(game, player, cost) {
        return Err(ActionError::CannotAfford);
    }
    Ok(())
}

// ============================================================================
// Will payment
// ============================================================================

/// Recovered will sources the player controls, with the attributes each can
/// produce.
fn will_sources(game: &GameState, player: PlayerId) -> Vec<(ObjectId, Vec<Attribute>)> {
    let mut sources = Vec::new();
    for id in controlled_sources(game, player) {
        if game.is_rested(id) {
            continue;
        }
        let Some(chars) = game.calculated_characteristics(id) else {
            continue;
        };
        let produces: Vec<Attribute> = chars
            .abilities
            .iter()
            .filter_map(|a| match &a.kind {
                AbilityKind::Will(will) => Some(will.produces.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        if !produces.is_empty() {
            sources.push((id, produces));
        }
    }
    sources
}

/// Whether the cost is payable from the pool plus the will the player could
/// still produce this window.
fn can_afford(game: &GameState, player: PlayerId, cost: &WillCost) -> bool {
    if cost.is_free() {
        return true;
    }
    let Some(p) = game.player(player) else {
        return false;
    };
    let mut sim = p.will_pool.clone();
    let mut sources: Vec<Vec<Attribute>> = will_sources(game, player)
        .into_iter()
        .map(|(_, produces)| produces)
        .collect();

    for &pip in cost.pips() {
        let single = WillCost::new(vec![pip], 0);
        if sim.pay(&single, false) {
            continue;
        }
        let Some(position) = sources.iter().position(|produces| produces.contains(&pip))
        else {
            return false;
        };
        sources.remove(position);
    }
    sim.total() as usize + sources.len() >= cost.generic_component() as usize
}

/// The most extra generic will the player could add on top of `base`; the
/// upper bound for an X choice.
fn max_extra_will(game: &GameState, player: PlayerId, base: &WillCost) -> u32 {
    let Some(p) = game.player(player) else {
        return 0;
    };
    let potential = p.will_pool.total() + will_sources(game, player).len() as u32;
    potential.saturating_sub(base.total())
}

/// Rest will sources as needed and produce will from them.
fn produce_will_from(game: &mut GameState, player: PlayerId, source: ObjectId, attribute: Attribute) {
    game.rest(source);
    if let Some(p) = game.player_mut(player) {
        p.will_pool.add(attribute, 1);
    }
    game.emit(EngineEvent::WillProduced {
        player,
        source,
        attribute,
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(crate::events::WillProducedEvent {
            player,
            source,
        }));
}

/// Pay a cost, automatically resting will sources for whatever the pool does
/// not already cover. Validated by `can_afford` before any mutation.
fn pay_will_cost(
    game: &mut GameState,
    player: PlayerId,
    cost: &WillCost,
) -> Result<(), ActionError> {
    if cost.is_free() {
        return Ok(());
    }
    if !can_afford(game, player, cost) {
        return Err(ActionError::CannotAfford);
    }

    let mut needed: Vec<(Attribute, u32)> = Vec::new();
    for &pip in cost.pips() {
        match needed.iter_mut().find(|(a, _)| *a == pip) {
            Some((_, count)) => *count += 1,
            None => needed.push((pip, 1)),
        }
    }

    for (attribute, count) in needed {
        loop {
            let available = game
                .player(player)
                .map(|p| p.will_pool.available(attribute))
                .unwrap_or(0);
            if available >= count {
                break;
            }
            let Some((source, _)) = will_sources(game, player)
                .into_iter()
                .find(|(_, produces)| produces.contains(&attribute))
            else {
                return Err(ActionError::CannotAfford);
            };
            produce_will_from(game, player, source, attribute);
        }
    }

    loop {
        let total = game.player(player).map(|p| p.will_pool.total()).unwrap_or(0);
        if total >= cost.total() {
            break;
        }
        let Some((source, produces)) = will_sources(game, player).into_iter().next() else {
            return Err(ActionError::CannotAfford);
        };
        let attribute = produces[0];
        produce_will_from(game, player, source, attribute);
    }

    let paid = game
        .player_mut(player)
        .is_some_and(|p| p.will_pool.pay(cost, false));
    if !paid {
        return Err(ActionError::CannotAfford);
    }
    Ok(())
}

// ============================================================================
// Advancing priority and applying responses
// ============================================================================

/// Advance the engine until it needs external input, using a decision maker
/// that passes and declines for any incidental choices along the way.
pub fn advance_priority(
    game: &mut GameState,
    state: &mut PriorityLoopState,
) -> Result<GameProgress, GameLoopError> {
    let mut dm = AutoPassDecisionMaker;
    advance_priority_with(game, state, &mut dm)
}

/// Advance the engine until it needs external input.
///
/// Settles the game, puts fired triggers on the Chase (APNAP), and offers
/// priority. Returns the pending decision, [`GameProgress::Continue`] when the
/// current phase has no further priority window, or the game result.
pub fn advance_priority_with(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    if game.game_over {
        return Ok(GameProgress::GameOver(game_result(game)));
    }

    settle(game, &mut state.triggers, decision_maker)?;
    if game.game_over {
        return Ok(GameProgress::GameOver(game_result(game)));
    }
    if !state.triggers.is_empty() {
        put_triggers_on_chase(game, &mut state.triggers, decision_maker)?;
        // Something went on the Chase; priority restarts with the active
        // player even in phases without their own window.
        reset_priority(game, &mut state.tracker);
    }

    let Some(player) = game.turn.priority_player else {
        return Ok(GameProgress::Continue);
    };

    let actions = compute_legal_actions(game, player);
    let ctx = DecisionContext::Priority(PriorityContext { player, actions });
    state.pending = Some(ctx.clone());
    Ok(GameProgress::NeedsDecision(ctx))
}

/// Apply an external answer to the pending decision, with an auto-passing
/// decision maker for incidental choices.
pub fn apply_priority_response(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    response: PriorityResponse,
) -> Result<GameProgress, GameLoopError> {
    let mut dm = AutoPassDecisionMaker;
    apply_priority_response_with(game, state, response, &mut dm)
}

/// Apply an external answer to the pending decision.
///
/// An answer outside the declared option set is rejected with a
/// [`ResponseError`]; the decision stays pending and no state was mutated.
pub fn apply_priority_response_with(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    response: PriorityResponse,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    let Some(pending) = state.pending.clone() else {
        return Err(ResponseError::NoDecisionPending.into());
    };

    match (&pending, response) {
        (DecisionContext::Priority(ctx), PriorityResponse::Action(action)) => {
            if !ctx.actions.contains(&action) {
                return Err(ResponseError::IllegalChoice(format!(
                    "{action:?} is not in the legal action set"
                ))
                .into());
            }
            state.pending = None;
            apply_priority_action(game, state, ctx.player, action, decision_maker)
        }
        (DecisionContext::Number(ctx), PriorityResponse::Number(value)) => {
            if value < ctx.min || value > ctx.max {
                return Err(ResponseError::IllegalChoice(format!(
                    "{value} is outside {}..={}",
                    ctx.min, ctx.max
                ))
                .into());
            }
            state.pending = None;
            if let Some(cast) = &mut state.pending_cast {
                cast.x = Some(value);
            }
            continue_pending_cast(game, state, decision_maker)
        }
        (DecisionContext::Targets(ctx), PriorityResponse::Targets(targets)) => {
            validate_target_response(ctx, &targets)?;
            state.pending = None;
            finalize_pending_cast(game, state, targets, decision_maker)
        }
        _ => Err(ResponseError::WrongResponseType.into()),
    }
}

fn validate_target_response(
    ctx: &TargetsContext,
    targets: &[Target],
) -> Result<(), ResponseError> {
    let mut remaining = targets;
    for req in &ctx.requirements {
        let take = remaining.len().min(req.max);
        let (chunk, rest) = remaining.split_at(take);
        if chunk.len() < req.min {
            return Err(ResponseError::InvalidTargets(format!(
                "requirement wants at least {} targets, got {}",
                req.min,
                chunk.len()
            )));
        }
        for target in chunk {
            if !req.legal_targets.contains(target) {
                return Err(ResponseError::InvalidTargets(format!(
                    "{target:?} is not a legal target"
                )));
            }
        }
        remaining = rest;
    }
    if !remaining.is_empty() {
        return Err(ResponseError::InvalidTargets(
            "more targets supplied than the requirements allow".into(),
        ));
    }
    Ok(())
}

fn apply_priority_action(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    player: PlayerId,
    action: LegalAction,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    if game.turn.priority_player != Some(player) {
        return Err(ActionError::NotYourPriority.into());
    }

    match action {
        LegalAction::PassPriority => {
            match pass_priority(game, &mut state.tracker) {
                PriorityResult::Continue => advance_priority_with(game, state, decision_maker),
                PriorityResult::ChaseResolves => {
                    resolve_chase_entry(game, decision_maker)?;
                    settle(game, &mut state.triggers, decision_maker)?;
                    reset_priority(game, &mut state.tracker);
                    Ok(GameProgress::ChaseResolved)
                }
                PriorityResult::PhaseEnds => {
                    if game.battle.is_some() {
                        advance_battle_step(game, decision_maker)?;
                        settle(game, &mut state.triggers, decision_maker)?;
                        let blocker_window = game
                            .battle
                            .as_ref()
                            .filter(|b| b.step == BattleStep::DeclareBlocker)
                            .map(|b| b.defending_player);
                        match blocker_window {
                            Some(defender) => give_priority(game, &mut state.tracker, defender),
                            None => reset_priority(game, &mut state.tracker),
                        }
                        Ok(GameProgress::BattleAdvanced)
                    } else {
                        game.turn.priority_player = None;
                        Ok(GameProgress::Continue)
                    }
                }
            }
        }

        LegalAction::CastSpell { spell_id } => {
            can_cast_spell(game, player, spell_id)?;
            let definition = game
                .object(spell_id)
                .map(|o| o.definition.clone())
                .ok_or(ActionError::NotInHand)?;

            if definition.card_type == CardType::ChantStandby {
                // Setting a chant-standby card does not use the Chase.
                pay_will_cost(game, player, &definition.cost)?;
                game.move_object(spell_id, Zone::Standby);
                give_priority(game, &mut state.tracker, player);
                return advance_priority_with(game, state, decision_maker);
            }

            state.pending_cast = Some(PendingCast {
                spell: spell_id,
                player,
                from_standby: false,
                needs_x: effects_reference_x(&definition.resolution_effects),
                x: None,
                specs: definition.choices.clone(),
            });
            continue_pending_cast(game, state, decision_maker)
        }

        LegalAction::PlayFromStandby { card_id } => {
            can_play_from_standby(game, player, card_id)?;
            let definition = game
                .object(card_id)
                .map(|o| o.definition.clone())
                .ok_or(ActionError::NotInStandby)?;
            state.pending_cast = Some(PendingCast {
                spell: card_id,
                player,
                from_standby: true,
                needs_x: effects_reference_x(&definition.resolution_effects),
                x: None,
                specs: definition.choices.clone(),
            });
            continue_pending_cast(game, state, decision_maker)
        }

        LegalAction::ActivateAbility {
            source,
            ability_index,
        } => {
            activate_ability(game, state, player, source, ability_index, decision_maker)
        }

        LegalAction::ProduceWill { source, attribute } => {
            produce_will_action(game, player, source, attribute)?;
            // Will abilities don't use the Chase and don't yield priority.
            give_priority(game, &mut state.tracker, player);
            advance_priority_with(game, state, decision_maker)
        }

        LegalAction::CallStone => {
            call_stone(game, player, decision_maker)?;
            give_priority(game, &mut state.tracker, player);
            advance_priority_with(game, state, decision_maker)
        }

        LegalAction::Judgment => {
            perform_judgment(game, player)?;
            let opponent = game.opponent_of(player);
            give_priority(game, &mut state.tracker, opponent);
            advance_priority_with(game, state, decision_maker)
        }

        LegalAction::DeclareAttack { attacker, target } => {
            declare_attack(game, player, attacker, target)?;
            settle(game, &mut state.triggers, decision_maker)?;
            reset_priority(game, &mut state.tracker);
            advance_priority_with(game, state, decision_maker)
        }

        LegalAction::DeclareBlock { blocker } => {
            declare_block(game, player, blocker)?;
            settle(game, &mut state.triggers, decision_maker)?;
            reset_priority(game, &mut state.tracker);
            advance_priority_with(game, state, decision_maker)
        }
    }
}

/// True when any resolution effect reads the spell's X.
fn effects_reference_x(effects: &[Effect]) -> bool {
    fn value_is_x(value: &Value) -> bool {
        matches!(value, Value::X)
    }
    effects.iter().any(|effect| match effect {
        Effect::DealDamageToTargets(v) => value_is_x(v),
        Effect::DrawCards { count, .. } => value_is_x(count),
        Effect::GainLife { amount, .. } | Effect::LoseLife { amount, .. } => value_is_x(amount),
        Effect::Sequence(inner) => effects_reference_x(inner),
        Effect::Conditional { then, otherwise, .. } => {
            effects_reference_x(then) || effects_reference_x(otherwise)
        }
        _ => false,
    })
}

/// Drive a pending cast to its next choice point, or finish it.
fn continue_pending_cast(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    let Some(cast) = state.pending_cast.clone() else {
        return Err(GameLoopError::InvalidState("no cast in progress".into()));
    };

    if cast.needs_x && cast.x.is_none() {
        let base = game
            .object(cast.spell)
            .map(|o| o.definition.cost.clone())
            .unwrap_or_else(WillCost::free);
        let max = if cast.from_standby {
            // Free plays still choose X, bounded by what the player could pay.
            max_extra_will(game, cast.player, &WillCost::free())
        } else {
            max_extra_will(game, cast.player, &base)
        };
        let ctx = DecisionContext::Number(NumberContext {
            player: cast.player,
            prompt: "Choose a value for X".into(),
            min: 0,
            max,
        });
        state.pending = Some(ctx.clone());
        return Ok(GameProgress::NeedsDecision(ctx));
    }

    if !cast.specs.is_empty() {
        let mut requirements = Vec::new();
        for spec in &cast.specs {
            let legal = compute_legal_targets(game, spec, cast.player);
            if legal.len() < spec.min {
                state.pending_cast = None;
                return Err(ActionError::NoLegalTargets.into());
            }
            requirements.push(TargetRequirementContext {
                description: "target".into(),
                legal_targets: legal,
                min: spec.min,
                max: spec.max,
            });
        }
        let ctx = DecisionContext::Targets(TargetsContext {
            player: cast.player,
            source: cast.spell,
            prompt: "Choose targets".into(),
            requirements,
        });
        state.pending = Some(ctx.clone());
        return Ok(GameProgress::NeedsDecision(ctx));
    }

    finalize_pending_cast(game, state, Vec::new(), decision_maker)
}

/// Pay for the pending cast, move the card to the Chase, and push its entry.
fn finalize_pending_cast(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    targets: Vec<Target>,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    let Some(cast) = state.pending_cast.take() else {
        return Err(GameLoopError::InvalidState("no cast in progress".into()));
    };

    let definition = game
        .object(cast.spell)
        .map(|o| o.definition.clone())
        .ok_or(ActionError::NotInHand)?;

    if !cast.from_standby {
        let mut cost = definition.cost.clone();
        if let Some(x) = cast.x.filter(|&x| x > 0) {
            cost = WillCost::new(cost.pips().to_vec(), cost.generic_component() + x);
        }
        pay_will_cost(game, cast.player, &cost)?;
    }

    let snapshot = game.snapshot_object(cast.spell);
    game.move_object(cast.spell, Zone::Chase);

    let mut entry = ChaseEntry::spell(cast.spell, cast.player)
        .with_targets(targets, cast.specs)
        .with_source_name(definition.name.clone());
    if let Some(x) = cast.x {
        entry = entry.with_x(x);
    }
    if let Some(snapshot) = snapshot {
        entry = entry.with_snapshot(snapshot);
    }
    game.push_to_chase(entry);

    let opponent = game.opponent_of(cast.player);
    give_priority(game, &mut state.tracker, opponent);
    advance_priority_with(game, state, decision_maker)
}

fn activate_ability(
    game: &mut GameState,
    state: &mut PriorityLoopState,
    player: PlayerId,
    source: ObjectId,
    index: usize,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    can_activate_ability(game, player, source, index)?;
    let chars = game
        .calculated_characteristics(source)
        .ok_or(ActionError::NoSuchAbility)?;
    let Some(AbilityKind::Activated(ability)) = chars.abilities.get(index).map(|a| a.kind.clone())
    else {
        return Err(ActionError::NoSuchAbility.into());
    };

    // Costs first; the ability is "activated" once they are paid.
    pay_will_cost(game, player, &ability.will_cost)?;
    if ability.rest_cost {
        game.rest(source);
    }
    if ability.once_per_turn {
        game.activated_abilities_this_turn.insert((source, index));
    }

    // Targets for the ability are chosen inline.
    let mut targets = Vec::new();
    if !ability.choices.is_empty() {
        let mut requirements = Vec::new();
        for spec in &ability.choices {
            let legal = compute_legal_targets(game, spec, player);
            requirements.push(TargetRequirementContext {
                description: "target".into(),
                legal_targets: legal,
                min: spec.min,
                max: spec.max,
            });
        }
        let ctx = TargetsContext {
            player,
            source,
            prompt: "Choose targets for the ability".into(),
            requirements: requirements.clone(),
        };
        let chosen = decision_maker.decide_targets(game, &ctx);
        targets = clamp_targets_to_requirements(chosen, &requirements);
    }

    let snapshot = game.snapshot_object(source);
    let source_name = game
        .object(source)
        .map(|o| o.name().to_string())
        .unwrap_or_default();

    if ability.uses_chase {
        let mut entry = ChaseEntry::ability(source, player, ability.effects.clone())
            .with_targets(targets, ability.choices.clone())
            .with_source_name(source_name);
        if let Some(snapshot) = snapshot {
            entry = entry.with_snapshot(snapshot);
        }
        game.push_to_chase(entry);
        let opponent = game.opponent_of(player);
        give_priority(game, &mut state.tracker, opponent);
    } else {
        let mut ctx = ExecutionContext::new(source, player).with_targets(targets);
        for effect in &ability.effects {
            run_resolution_effect(game, effect, &mut ctx, decision_maker);
        }
        give_priority(game, &mut state.tracker, player);
    }
    advance_priority_with(game, state, decision_maker)
}

fn produce_will_action(
    game: &mut GameState,
    player: PlayerId,
    source: ObjectId,
    attribute: Attribute,
) -> Result<(), GameLoopError> {
    let Some(chars) = game.calculated_characteristics(source) else {
        return Err(ActionError::WillSourceNotReady.into());
    };
    if chars.controller != player || game.is_rested(source) {
        return Err(ActionError::WillSourceNotReady.into());
    }
    let produces_it = chars.abilities.iter().any(|a| match &a.kind {
        AbilityKind::Will(will) => will.produces.contains(&attribute),
        _ => false,
    });
    if !produces_it {
        return Err(ActionError::WillSourceNotReady.into());
    }
    produce_will_from(game, player, source, attribute);
    Ok(())
}

/// Call the top stone of the stone deck. Rests the ruler; once per turn.
fn call_stone(
    game: &mut GameState,
    player: PlayerId,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<(), GameLoopError> {
    can_call_stone(game, player)?;
    let ruler = game
        .player(player)
        .and_then(|p| p.ruler)
        .ok_or(ActionError::NoRuler)?;
    game.rest(ruler);

    let stone = game
        .player_mut(player)
        .and_then(|p| {
            if p.stone_deck.is_empty() {
                None
            } else {
                Some(p.stone_deck.remove(0))
            }
        })
        .ok_or(ActionError::StoneDeckEmpty)?;

    execute_enter_field(game, stone, decision_maker);
    if let Some(p) = game.player_mut(player) {
        p.has_called_stone = true;
    }
    game.emit(EngineEvent::StoneCalled { player, stone });
    game.pending_trigger_events
        .push(TriggerEvent::new(crate::events::StoneCalledEvent {
            player,
            stone,
        }));
    Ok(())
}

/// Pay the judgment cost and put the judgment entry on the Chase.
fn perform_judgment(game: &mut GameState, player: PlayerId) -> Result<(), GameLoopError> {
    can_perform_judgment(game, player)?;
    let ruler = game
        .player(player)
        .and_then(|p| p.ruler)
        .ok_or(ActionError::NoRuler)?;
    let cost = game
        .object(ruler)
        .and_then(|o| o.definition.judgment_cost.clone())
        .ok_or(ActionError::NoJudgment)?;
    pay_will_cost(game, player, &cost)?;
    if let Some(p) = game.player_mut(player) {
        p.has_performed_judgment = true;
    }

    let name = game
        .object(ruler)
        .map(|o| o.name().to_string())
        .unwrap_or_default();
    let mut entry = ChaseEntry::spell(ruler, player).with_source_name(name);
    entry.is_judgment = true;
    game.push_to_chase(entry);
    Ok(())
}

// ============================================================================
// Driving a whole window / turn with a decision maker
// ============================================================================

fn respond_from_decision_maker(
    game: &GameState,
    ctx: &DecisionContext,
    decision_maker: &mut dyn DecisionMaker,
) -> PriorityResponse {
    match ctx {
        DecisionContext::Priority(priority) => {
            PriorityResponse::Action(decision_maker.decide_priority_action(game, priority))
        }
        DecisionContext::Number(number) => {
            PriorityResponse::Number(decision_maker.decide_number(game, number))
        }
        DecisionContext::Targets(targets) => {
            PriorityResponse::Targets(decision_maker.decide_targets(game, targets))
        }
        // The remaining contexts are answered inline through the decision
        // maker and never surface here.
        _ => PriorityResponse::Action(LegalAction::PassPriority),
    }
}

/// Run one full priority window with a decision maker until the phase ends or
/// the game is over.
pub fn run_priority_loop_with(
    game: &mut GameState,
    decision_maker: &mut impl DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    let mut state = PriorityLoopState::new(game.players_in_game());

    loop {
        let mut progress = advance_priority_with(game, &mut state, decision_maker)?;
        loop {
            match progress {
                GameProgress::NeedsDecision(ctx) => {
                    let auto_pass = matches!(
                        &ctx,
                        DecisionContext::Priority(p)
                            if p.actions.len() == 1
                    );
                    let response = if auto_pass {
                        decision_maker.on_auto_pass(game, ctx.player());
                        PriorityResponse::Action(LegalAction::PassPriority)
                    } else {
                        respond_from_decision_maker(game, &ctx, decision_maker)
                    };
                    progress =
                        apply_priority_response_with(game, &mut state, response, decision_maker)?;
                }
                GameProgress::Continue => return Ok(GameProgress::Continue),
                GameProgress::GameOver(result) => return Ok(GameProgress::GameOver(result)),
                GameProgress::ChaseResolved | GameProgress::BattleAdvanced => break,
            }
        }
    }
}

fn game_result(game: &GameState) -> GameResult {
    match game.winner {
        Some(winner) => GameResult::Winner(winner),
        None => GameResult::Draw,
    }
}

/// Shuffle, draw opening hands, and mark the game started.
pub fn begin_game(game: &mut GameState, opening_hand_size: u32) {
    game.emit(EngineEvent::GameStarted {
        first_player: game.turn.active_player,
    });
    game.shuffle_decks();
    for player in game.turn_order.clone() {
        game.draw_cards(player, opening_hand_size);
    }
    // Opening draws don't fire draw triggers.
    game.pending_trigger_events.clear();
}

/// Execute one complete turn with a decision maker.
pub fn execute_turn_with(
    game: &mut GameState,
    decision_maker: &mut impl DecisionMaker,
) -> Result<GameProgress, GameLoopError> {
    begin_turn(game);

    // Draw phase.
    game.turn.phase = Phase::Draw;
    execute_draw_phase(game);
    if let GameProgress::GameOver(result) = run_priority_loop_with(game, decision_maker)? {
        return Ok(GameProgress::GameOver(result));
    }

    // Recovery phase: no priority window of its own, but triggers that fire
    // here go on the Chase and open one.
    game.turn.phase = Phase::Recovery;
    execute_recovery_phase(game);
    if let GameProgress::GameOver(result) = run_priority_loop_with(game, decision_maker)? {
        return Ok(GameProgress::GameOver(result));
    }

    // Main phase; battles happen inside it.
    game.turn.phase = Phase::Main;
    enter_main_phase(game);
    if let GameProgress::GameOver(result) = run_priority_loop_with(game, decision_maker)? {
        return Ok(GameProgress::GameOver(result));
    }

    // End phase.
    game.turn.phase = Phase::End;
    enter_end_phase(game);
    if let GameProgress::GameOver(result) = run_priority_loop_with(game, decision_maker)? {
        return Ok(GameProgress::GameOver(result));
    }

    // Discard to hand size.
    if let Some((player, excess, hand)) = end_phase_discard_requirement(game) {
        let ctx = SelectObjectsContext {
            player,
            prompt: format!("Discard {excess} cards"),
            candidates: hand.clone(),
            min: excess,
            max: excess,
        };
        let mut chosen = decision_maker.decide_objects(game, &ctx);
        let mut seen = std::collections::HashSet::new();
        chosen.retain(|&id| hand.contains(&id) && seen.insert(id));
        chosen.truncate(excess);
        for &fallback in &hand {
            if chosen.len() >= excess {
                break;
            }
            if !chosen.contains(&fallback) {
                chosen.push(fallback);
            }
        }
        apply_end_phase_discard(game, player, &chosen, decision_maker);
        if let GameProgress::GameOver(result) = run_priority_loop_with(game, decision_maker)? {
            return Ok(GameProgress::GameOver(result));
        }
    }

    // Turn end, then cleanup. Effect expiry can create fresh state-based
    // conditions, which get their own settlement (and window, if triggers
    // fire) before a final cleanup pass.
    crate::turn::mark_turn_end(game);
    execute_turn_cleanup(game);
    if let GameProgress::GameOver(result) = run_priority_loop_with(game, decision_maker)? {
        return Ok(GameProgress::GameOver(result));
    }
    execute_turn_cleanup(game);

    if game.game_over {
        return Ok(GameProgress::GameOver(game_result(game)));
    }
    game.next_turn();
    Ok(GameProgress::Continue)
}

/// Play turns until the game ends or `max_turns` is reached.
pub fn execute_game_with(
    game: &mut GameState,
    decision_maker: &mut impl DecisionMaker,
    max_turns: u32,
) -> Result<Option<GameResult>, GameLoopError> {
    while game.turn.turn_number <= max_turns {
        if let GameProgress::GameOver(result) = execute_turn_with(game, decision_maker)? {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{Ability, TriggeredAbility};
    use crate::card::{CardBuilder, CardDefinition};
    use crate::decision::ScriptedDecisionMaker;
    use crate::events::{Matcher, ThisWouldLeaveFieldForGraveyardMatcher};
    use crate::filter::{ObjectFilter, PlayerFilter};
    use crate::ids::CardId;
    use crate::replacement::{ReplacementAction, ReplacementEffect};
    use crate::triggers::Trigger;
    use crate::types::Keyword;

    fn two_player_game() -> GameState {
        GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0)
    }

    fn vanilla(id: u32, name: &str, atk: i32, def: i32) -> CardDefinition {
        CardBuilder::new(CardId::from_raw(id), name)
            .card_type(CardType::Resonator)
            .stats(atk, def)
            .build()
    }

    fn stone(id: u32, attribute: Attribute) -> CardDefinition {
        CardBuilder::new(CardId::from_raw(id), "Magic Stone")
            .card_type(CardType::MagicStone)
            .ability(Ability::will(vec![attribute]))
            .build()
    }

    fn lose_life_ability(amount: i32) -> Vec<Effect> {
        vec![Effect::LoseLife {
            player: PlayerFilter::Opponent,
            amount: Value::fixed(amount),
        }]
    }

    #[test]
    fn test_chase_resolves_lifo() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let mut dm = AutoPassDecisionMaker;

        // Three ability entries pushed A, B, C; life deltas distinguish them.
        for (i, amount) in [(1u64, 100), (2, 200), (3, 300)] {
            game.push_to_chase(ChaseEntry::ability(
                ObjectId::from_raw(i),
                alice,
                lose_life_ability(amount),
            ));
        }

        let bob = game.turn_order[1];
        resolve_chase_entry(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(bob).unwrap().life, 3700); // C first
        resolve_chase_entry(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(bob).unwrap().life, 3500); // then B
        resolve_chase_entry(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(bob).unwrap().life, 3400); // then A
    }

    #[test]
    fn test_spell_fizzles_when_only_target_leaves() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        game.turn.phase = Phase::Main;

        let bolt = CardBuilder::new(CardId::from_raw(10), "Scorching Bolt")
            .card_type(CardType::ChantInstant)
            .targets(vec![ChooseSpec::object(ObjectFilter::resonator())])
            .resolution(vec![Effect::DealDamageToTargets(Value::fixed(500))])
            .build();
        let spell = game.create_object_from_card(&bolt, alice, Zone::Hand);
        let target = game.create_object_from_card(&vanilla(11, "Lonely Bear", 200, 200), bob, Zone::Field);

        game.move_object(spell, Zone::Chase);
        game.push_to_chase(
            ChaseEntry::spell(spell, alice).with_targets(
                vec![Target::Object(target)],
                vec![ChooseSpec::object(ObjectFilter::resonator())],
            ),
        );

        // The only target leaves play before resolution.
        game.move_object(target, Zone::Graveyard);

        let mut dm = AutoPassDecisionMaker;
        resolve_chase_entry(&mut game, &mut dm).unwrap();

        assert!(game.events().iter().any(|e| matches!(
            e,
            EngineEvent::ChaseEntryFizzled { object, .. } if *object == spell
        )));
        // The spent spell still goes to the graveyard.
        assert_eq!(game.object(spell).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_apnap_active_triggers_resolve_last() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];

        let watcher = |id: u32| {
            CardBuilder::new(CardId::from_raw(id), "Border Guard")
                .card_type(CardType::Resonator)
                .stats(200, 200)
                .ability(Ability::triggered(TriggeredAbility::new(
                    Trigger::enters_field(ObjectFilter::resonator()),
                    vec![Effect::GainLife {
                        player: PlayerFilter::You,
                        amount: Value::fixed(100),
                    }],
                )))
                .build()
        };
        let alice_watcher = game.create_object_from_card(&watcher(20), alice, Zone::Field);
        let _bob_watcher = game.create_object_from_card(&watcher(21), bob, Zone::Field);

        let mut queue = TriggerQueue::new();
        let mut dm = AutoPassDecisionMaker;
        let event = TriggerEvent::zone_change(alice_watcher, Zone::Hand, Zone::Field, None);
        for entry in check_triggers(&game, &event) {
            queue.add(entry);
        }
        assert_eq!(queue.entries.len(), 2);

        put_triggers_on_chase(&mut game, &mut queue, &mut dm).unwrap();
        assert_eq!(game.chase.len(), 2);
        // Active player's trigger was pushed first, so the non-active
        // player's is on top and resolves first.
        assert_eq!(game.chase[0].controller, alice);
        assert_eq!(game.chase[1].controller, bob);

        resolve_chase_entry(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(bob).unwrap().life, 4100);
        assert_eq!(game.player(alice).unwrap().life, 4000);
        resolve_chase_entry(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(alice).unwrap().life, 4100);
    }

    #[test]
    fn test_sba_cycle_raises_configuration_error() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        game.config.sba_iteration_cap = 8;

        let doomed = game.create_object_from_card(&vanilla(30, "Cursed Husk", 100, 100), alice, Zone::Field);
        game.mark_damage(doomed, 100);

        // A replacement that bounces the card back onto the field whenever it
        // would hit the graveyard recreates the lethal-damage condition
        // forever.
        game.replacement_effects
            .add_resolution_effect(ReplacementEffect::new(
                doomed,
                alice,
                Matcher::new(ThisWouldLeaveFieldForGraveyardMatcher),
                ReplacementAction::ChangeDestination(Zone::Field),
            ));

        let mut dm = AutoPassDecisionMaker;
        let err = check_and_apply_sbas(&mut game, &mut dm).unwrap_err();
        assert_eq!(
            err,
            GameLoopError::Configuration(ConfigurationError::StateBasedActionLoop { cap: 8 })
        );
    }

    #[test]
    fn test_cast_timing_rules() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        game.turn.phase = Phase::Draw;

        let chant = CardBuilder::new(CardId::from_raw(40), "Seed of Growth")
            .card_type(CardType::Chant)
            .build();
        let card = game.create_object_from_card(&chant, alice, Zone::Hand);

        // Chant-speed cards are not castable outside main timing.
        assert_eq!(
            can_cast_spell(&game, alice, card),
            Err(ActionError::WrongTiming)
        );

        game.turn.phase = Phase::Main;
        assert!(can_cast_spell(&game, alice, card).is_ok());
    }

    #[test]
    fn test_cast_pays_will_by_resting_stones() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        game.turn.phase = Phase::Main;

        let stone_id = game.create_object_from_card(&stone(50, Attribute::Fire), alice, Zone::Field);
        let chant = CardBuilder::new(CardId::from_raw(51), "Ember Prayer")
            .card_type(CardType::Chant)
            .cost(WillCost::of(Attribute::Fire, 0))
            .resolution(vec![Effect::GainLife {
                player: PlayerFilter::You,
                amount: Value::fixed(300),
            }])
            .build();
        let card = game.create_object_from_card(&chant, alice, Zone::Hand);

        let mut dm = ScriptedDecisionMaker::new(vec![LegalAction::CastSpell { spell_id: card }]);
        run_priority_loop_with(&mut game, &mut dm).unwrap();

        assert!(game.is_rested(stone_id));
        assert_eq!(game.player(alice).unwrap().life, 4300);
        assert_eq!(game.object(card).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_suspension_surface_rejects_illegal_answer() {
        let mut game = two_player_game();
        game.turn.phase = Phase::Main;
        let mut state = PriorityLoopState::new(2);

        let progress = advance_priority(&mut game, &mut state).unwrap();
        let GameProgress::NeedsDecision(DecisionContext::Priority(ctx)) = progress else {
            panic!("expected a priority decision");
        };
        assert!(ctx.actions.contains(&LegalAction::PassPriority));

        // An action outside the legal set is rejected; the decision stays
        // pending and can then be answered legally.
        let err = apply_priority_response(
            &mut game,
            &mut state,
            PriorityResponse::Action(LegalAction::CallStone),
        )
        .unwrap_err();
        assert!(matches!(err, GameLoopError::Response(_)));
        assert!(state.pending_decision().is_some());

        let progress = apply_priority_response(
            &mut game,
            &mut state,
            PriorityResponse::Action(LegalAction::PassPriority),
        )
        .unwrap();
        assert!(matches!(progress, GameProgress::NeedsDecision(_)));
    }

    #[test]
    fn test_call_stone_once_per_turn() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        game.turn.phase = Phase::Main;

        let ruler = CardBuilder::new(CardId::from_raw(60), "Grimm, the Fairy Tale Prince")
            .card_type(CardType::Ruler)
            .build();
        game.set_ruler(alice, &ruler);
        game.load_stone_deck(alice, &[stone(61, Attribute::Light), stone(62, Attribute::Light)]);

        assert!(can_call_stone(&game, alice).is_ok());

        let mut dm = ScriptedDecisionMaker::new(vec![LegalAction::CallStone]);
        run_priority_loop_with(&mut game, &mut dm).unwrap();

        assert_eq!(game.field.len(), 1);
        assert!(game.player(alice).unwrap().has_called_stone);
        let ruler_id = game.player(alice).unwrap().ruler.unwrap();
        assert!(game.is_rested(ruler_id));
        // Second call the same turn is illegal.
        assert_eq!(can_call_stone(&game, alice), Err(ActionError::StoneAlreadyCalled));
    }

    #[test]
    fn test_judgment_flips_ruler_to_field() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        game.turn.phase = Phase::Main;

        let j_side = CardBuilder::new(CardId::from_raw(71), "Grimm, the Avenger")
            .card_type(CardType::JRuler)
            .stats(800, 800)
            .build();
        let ruler = CardBuilder::new(CardId::from_raw(70), "Grimm, the Fairy Tale Prince")
            .card_type(CardType::Ruler)
            .judgment(WillCost::free(), j_side)
            .build();
        let ruler_id = game.set_ruler(alice, &ruler);

        let mut dm = ScriptedDecisionMaker::new(vec![LegalAction::Judgment]);
        run_priority_loop_with(&mut game, &mut dm).unwrap();

        let obj = game.object(ruler_id).unwrap();
        assert_eq!(obj.zone, Zone::Field);
        assert_eq!(obj.definition.card_type, CardType::JRuler);
        assert!(game.player(alice).unwrap().has_performed_judgment);
        assert!(game.events().iter().any(|e| matches!(
            e,
            EngineEvent::JudgmentPerformed { j_ruler, .. } if *j_ruler == ruler_id
        )));
    }

    #[test]
    fn test_battle_inside_main_phase() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        game.turn.phase = Phase::Main;
        game.turn.turn_number = 2;

        let attacker =
            game.create_object_from_card(&vanilla(80, "Charging Boar", 600, 400), alice, Zone::Field);
        game.object_mut(attacker).unwrap().entered_turn = 1;

        let mut dm = ScriptedDecisionMaker::new(vec![LegalAction::DeclareAttack {
            attacker,
            target: Target::Player(bob),
        }]);
        run_priority_loop_with(&mut game, &mut dm).unwrap();

        assert_eq!(game.player(bob).unwrap().life, 3400);
        assert!(game.battle.is_none());
        assert!(game.is_rested(attacker));
    }

    #[test]
    fn test_blocker_window_offers_block() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        game.turn.phase = Phase::Main;
        game.turn.turn_number = 2;

        let attacker =
            game.create_object_from_card(&vanilla(90, "Raider", 400, 400), alice, Zone::Field);
        let blocker =
            game.create_object_from_card(&vanilla(91, "Sentinel", 500, 500), bob, Zone::Field);
        game.object_mut(attacker).unwrap().entered_turn = 1;
        game.object_mut(blocker).unwrap().entered_turn = 1;

        let mut dm = ScriptedDecisionMaker::new(vec![
            LegalAction::DeclareAttack {
                attacker,
                target: Target::Player(bob),
            },
            LegalAction::DeclareBlock { blocker },
        ]);
        run_priority_loop_with(&mut game, &mut dm).unwrap();

        // Blocked: the attacker took lethal damage from the 500 ATK blocker.
        assert_eq!(game.object(attacker).unwrap().zone, Zone::Graveyard);
        assert_eq!(game.player(bob).unwrap().life, 4000);
        assert_eq!(game.damage_on(blocker), 400);
    }

    #[test]
    fn test_full_turn_draw_and_recovery() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        let filler: Vec<CardDefinition> = (0..10)
            .map(|i| {
                CardBuilder::new(CardId::from_raw(200 + i), format!("Filler {i}"))
                    .card_type(CardType::Chant)
                    .cost(WillCost::generic(9))
                    .build()
            })
            .collect();
        game.load_main_deck(alice, &filler);
        game.load_main_deck(bob, &filler);

        let mut dm = AutoPassDecisionMaker;
        // Turn 1: first player draws nothing.
        execute_turn_with(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(alice).unwrap().hand.len(), 0);
        assert_eq!(game.turn.active_player, bob);

        // Turn 2: second player draws one.
        execute_turn_with(&mut game, &mut dm).unwrap();
        assert_eq!(game.player(bob).unwrap().hand.len(), 1);
        assert_eq!(game.turn.turn_number, 3);
    }

    #[test]
    fn test_barrier_excluded_from_legal_cast() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        game.turn.phase = Phase::Main;

        let shielded = CardBuilder::new(CardId::from_raw(100), "Shrine Keeper")
            .card_type(CardType::Resonator)
            .stats(200, 200)
            .keyword(Keyword::Barrier)
            .build();
        game.create_object_from_card(&shielded, bob, Zone::Field);

        let removal = CardBuilder::new(CardId::from_raw(101), "Stroke of Midnight")
            .card_type(CardType::Chant)
            .targets(vec![ChooseSpec::object(ObjectFilter::resonator())])
            .resolution(vec![Effect::DestroyTargets])
            .build();
        let card = game.create_object_from_card(&removal, alice, Zone::Hand);

        // The only candidate is protected, so the spell has no legal targets.
        assert_eq!(
            can_cast_spell(&game, alice, card),
            Err(ActionError::NoLegalTargets)
        );
    }

    #[test]
    fn test_intervening_if_discards_at_resolution() {
        let mut game = two_player_game();
        let alice = game.turn_order[0];

        let source = game.create_object_from_card(&vanilla(110, "Oathkeeper", 300, 300), alice, Zone::Field);
        let entry = ChaseEntry::ability(source, alice, lose_life_ability(500)).with_intervening_if(
            crate::ability::InterveningIfCondition::ControllerLifeAtMost(1000),
        );
        game.push_to_chase(entry);

        // Life is 4000; the condition is false, so the ability is discarded.
        let mut dm = AutoPassDecisionMaker;
        resolve_chase_entry(&mut game, &mut dm).unwrap();

        let bob = game.turn_order[1];
        assert_eq!(game.player(bob).unwrap().life, 4000);
        assert!(game.events().iter().any(|e| matches!(
            e,
            EngineEvent::TriggerDiscarded { source: s } if *s == source
        )));
    }
}
