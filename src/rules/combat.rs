//! Battle.
//!
//! Battles happen during the main phase: one attack declaration at a time,
//! with a blocker window, first-strike and normal damage steps, and the
//! battle keywords (Pierce, Drain, First Strike, Flying, Precision, Target
//! Attack, Explode).

use crate::decision::DecisionMaker;
use crate::event_processor::{execute_damage, execute_destroy, execute_life_gain};
use crate::events::combat::{AttackDeclaredEvent, BattleEndedEvent, BlockDeclaredEvent};
use crate::game_event::{DamageTarget, EngineEvent};
use crate::game_state::{GameState, Phase};
use crate::ids::{ObjectId, PlayerId};
use crate::target::Target;
use crate::triggers::TriggerEvent;
use crate::types::Keyword;
use crate::zone::Zone;

/// Battle timing windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleStep {
    DeclareAttack,
    DeclareBlocker,
    BeforeDamage,
    FirstStrikeDamage,
    NormalDamage,
    AfterDamage,
    EndOfBattle,
}

/// The battle in progress.
#[derive(Debug, Clone)]
pub struct BattleState {
    pub step: BattleStep,
    pub attacker: ObjectId,
    pub attacking_player: PlayerId,
    pub defending_player: PlayerId,
    /// Set when a rested J/resonator is attacked directly.
    pub defender: Option<ObjectId>,
    pub blocker: Option<ObjectId>,
}

/// Errors from battle declarations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error("a battle is already in progress")]
    BattleInProgress,
    #[error("no battle is in progress")]
    NoBattle,
    #[error("battles only happen during the main phase")]
    NotMainPhase,
    #[error("only the turn player attacks")]
    NotTurnPlayer,
    #[error("attacker must be a recovered J/resonator on the field")]
    AttackerNotReady,
    #[error("resonators cannot attack the turn they entered")]
    SummoningSickness,
    #[error("this card cannot attack")]
    CannotAttack,
    #[error("attacking a resonator requires Target Attack")]
    NeedsTargetAttack,
    #[error("a recovered resonator can only be attacked with Precision")]
    NeedsPrecision,
    #[error("wrong battle step for this declaration")]
    WrongStep,
    #[error("only the defending player declares blockers")]
    NotDefendingPlayer,
    #[error("blocker must be a recovered J/resonator on the field")]
    BlockerNotReady,
    #[error("this card cannot block")]
    CannotBlock,
    #[error("this attacker cannot be blocked")]
    Unblockable,
    #[error("only a card with Flying can block a Flying attacker")]
    NeedsFlying,
}

/// Validate an attack declaration without mutating anything.
pub fn can_attack(
    game: &GameState,
    player: PlayerId,
    attacker: ObjectId,
    target: Target,
) -> Result<(), CombatError> {
    if game.battle.is_some() {
        return Err(CombatError::BattleInProgress);
    }
    if game.turn.phase != Phase::Main {
        return Err(CombatError::NotMainPhase);
    }
    if game.turn.active_player != player {
        return Err(CombatError::NotTurnPlayer);
    }

    let Some(obj) = game.object(attacker) else {
        return Err(CombatError::AttackerNotReady);
    };
    let Some(chars) = game.calculated_characteristics(attacker) else {
        return Err(CombatError::AttackerNotReady);
    };
    if obj.zone != Zone::Field || obj.rested || !chars.card_type.is_combatant() {
        return Err(CombatError::AttackerNotReady);
    }
    if chars.controller != player {
        return Err(CombatError::AttackerNotReady);
    }
    if obj.entered_turn == game.turn.turn_number && !chars.keywords.contains(Keyword::Swiftness) {
        return Err(CombatError::SummoningSickness);
    }
    if chars.keywords.contains(Keyword::CannotAttack) {
        return Err(CombatError::CannotAttack);
    }

    if let Target::Object(defender) = target {
        let Some(defender_chars) = game.calculated_characteristics(defender) else {
            return Err(CombatError::AttackerNotReady);
        };
        if defender_chars.card_type.is_combatant() {
            if !chars.keywords.contains(Keyword::TargetAttack) {
                return Err(CombatError::NeedsTargetAttack);
            }
            let rested = game.is_rested(defender);
            if !rested && !chars.keywords.contains(Keyword::Precision) {
                return Err(CombatError::NeedsPrecision);
            }
        }
    }

    Ok(())
}

/// Declare an attack. Rests the attacker (unless Vigilance), opens the
/// battle, and queues the attack trigger event.
pub fn declare_attack(
    game: &mut GameState,
    player: PlayerId,
    attacker: ObjectId,
    target: Target,
) -> Result<(), CombatError> {
    can_attack(game, player, attacker, target)?;

    if !game.object_has_keyword(attacker, Keyword::Vigilance) {
        game.rest(attacker);
    }

    let (defending_player, defender, damage_target) = match target {
        Target::Player(p) => (p, None, DamageTarget::Player(p)),
        Target::Object(id) => (game.controller_of(id), Some(id), DamageTarget::Object(id)),
    };

    game.battle = Some(BattleState {
        step: BattleStep::DeclareAttack,
        attacker,
        attacking_player: player,
        defending_player,
        defender,
        blocker: None,
    });

    game.emit(EngineEvent::AttackDeclared {
        attacker,
        target: damage_target,
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(AttackDeclaredEvent {
            attacker,
            target: damage_target,
        }));

    Ok(())
}

/// Validate a block declaration.
pub fn can_block(game: &GameState, player: PlayerId, blocker: ObjectId) -> Result<(), CombatError> {
    let Some(battle) = &game.battle else {
        return Err(CombatError::NoBattle);
    };
    if battle.step != BattleStep::DeclareBlocker {
        return Err(CombatError::WrongStep);
    }
    if battle.defending_player != player {
        return Err(CombatError::NotDefendingPlayer);
    }
    if battle.blocker.is_some() {
        return Err(CombatError::WrongStep);
    }

    let Some(obj) = game.object(blocker) else {
        return Err(CombatError::BlockerNotReady);
    };
    let Some(chars) = game.calculated_characteristics(blocker) else {
        return Err(CombatError::BlockerNotReady);
    };
    if obj.zone != Zone::Field || obj.rested || !chars.card_type.is_combatant() {
        return Err(CombatError::BlockerNotReady);
    }
    if chars.controller != player {
        return Err(CombatError::BlockerNotReady);
    }
    if chars.keywords.contains(Keyword::CannotBlock) {
        return Err(CombatError::CannotBlock);
    }

    let attacker_chars = game
        .calculated_characteristics(battle.attacker)
        .ok_or(CombatError::NoBattle)?;
    if attacker_chars.keywords.contains(Keyword::Unblockable)
        || attacker_chars.keywords.contains(Keyword::Stealth)
    {
        return Err(CombatError::Unblockable);
    }
    if attacker_chars.keywords.contains(Keyword::Flying)
        && !chars.keywords.contains(Keyword::Flying)
    {
        return Err(CombatError::NeedsFlying);
    }

    Ok(())
}

/// Declare a blocker. Rests the blocker and queues the block trigger event.
pub fn declare_block(
    game: &mut GameState,
    player: PlayerId,
    blocker: ObjectId,
) -> Result<(), CombatError> {
    can_block(game, player, blocker)?;

    game.rest(blocker);
    let Some(battle) = &mut game.battle else {
        return Err(CombatError::NoBattle);
    };
    battle.blocker = Some(blocker);
    let attacker = battle.attacker;

    game.emit(EngineEvent::BlockDeclared { blocker, attacker });
    game.pending_trigger_events
        .push(TriggerEvent::new(BlockDeclaredEvent { blocker, attacker }));

    Ok(())
}

/// Advance the battle one step. Damage steps deal their damage; returns true
/// when the battle has ended. State-based actions run between steps in the
/// game loop.
pub fn advance_battle_step(
    game: &mut GameState,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<bool, CombatError> {
    let Some(battle) = game.battle.clone() else {
        return Err(CombatError::NoBattle);
    };

    let next = match battle.step {
        BattleStep::DeclareAttack => BattleStep::DeclareBlocker,
        BattleStep::DeclareBlocker => BattleStep::BeforeDamage,
        BattleStep::BeforeDamage => {
            if battle_has_first_striker(game, &battle) {
                BattleStep::FirstStrikeDamage
            } else {
                BattleStep::NormalDamage
            }
        }
        BattleStep::FirstStrikeDamage => BattleStep::NormalDamage,
        BattleStep::NormalDamage => BattleStep::AfterDamage,
        BattleStep::AfterDamage => BattleStep::EndOfBattle,
        BattleStep::EndOfBattle => {
            end_battle(game, decision_maker);
            return Ok(true);
        }
    };

    if let Some(b) = &mut game.battle {
        b.step = next;
    }

    match next {
        BattleStep::FirstStrikeDamage => {
            deal_battle_damage(game, &battle, true, decision_maker);
        }
        BattleStep::NormalDamage => {
            deal_battle_damage(game, &battle, false, decision_maker);
        }
        BattleStep::EndOfBattle => {
            end_battle(game, decision_maker);
            return Ok(true);
        }
        _ => {}
    }

    Ok(false)
}

fn battle_has_first_striker(game: &GameState, battle: &BattleState) -> bool {
    let attacker_fs = game.object_has_keyword(battle.attacker, Keyword::FirstStrike);
    let blocker_fs = battle
        .blocker
        .is_some_and(|b| game.object_has_keyword(b, Keyword::FirstStrike));
    attacker_fs || blocker_fs
}

fn combatant_strikes_in(game: &GameState, combatant: ObjectId, first_strike_step: bool) -> bool {
    let has_first_strike = game.object_has_keyword(combatant, Keyword::FirstStrike);
    has_first_strike == first_strike_step
}

fn deal_battle_damage(
    game: &mut GameState,
    battle: &BattleState,
    first_strike_step: bool,
    decision_maker: &mut dyn DecisionMaker,
) {
    // Attacker's damage. A dead or removed combatant deals nothing.
    if game.object(battle.attacker).is_some_and(|o| o.zone == Zone::Field)
        && combatant_strikes_in(game, battle.attacker, first_strike_step)
    {
        let atk = game.calculated_atk(battle.attacker).unwrap_or(0).max(0) as u32;
        let target = if let Some(blocker) = battle.blocker {
            if game.object(blocker).is_some_and(|o| o.zone == Zone::Field) {
                DamageTarget::Object(blocker)
            } else {
                original_attack_target(battle)
            }
        } else {
            original_attack_target(battle)
        };

        let dealt = execute_damage(game, battle.attacker, target, atk, true, decision_maker);

        // Pierce: excess damage over the blocker's DEF carries through.
        if game.object_has_keyword(battle.attacker, Keyword::Pierce)
            && let DamageTarget::Object(blocked) = target
            && battle.blocker == Some(blocked)
        {
            let def = game.calculated_def(blocked).unwrap_or(0).max(0) as u32;
            if atk > def {
                execute_damage(
                    game,
                    battle.attacker,
                    DamageTarget::Player(battle.defending_player),
                    atk - def,
                    true,
                    decision_maker,
                );
            }
        }

        if dealt > 0 && game.object_has_keyword(battle.attacker, Keyword::Drain) {
            let controller = game.controller_of(battle.attacker);
            execute_life_gain(game, controller, dealt, decision_maker);
        }
    }

    // Blocker (or attacked resonator) strikes back.
    let striker = battle.blocker.or(battle.defender);
    if let Some(striker) = striker
        && game.object(striker).is_some_and(|o| o.zone == Zone::Field)
        && combatant_strikes_in(game, striker, first_strike_step)
        && game.object(battle.attacker).is_some_and(|o| o.zone == Zone::Field)
    {
        let atk = game.calculated_atk(striker).unwrap_or(0).max(0) as u32;
        let dealt = execute_damage(
            game,
            striker,
            DamageTarget::Object(battle.attacker),
            atk,
            true,
            decision_maker,
        );
        if dealt > 0 && game.object_has_keyword(striker, Keyword::Drain) {
            let controller = game.controller_of(striker);
            execute_life_gain(game, controller, dealt, decision_maker);
        }
    }
}

fn original_attack_target(battle: &BattleState) -> DamageTarget {
    match battle.defender {
        Some(defender) => DamageTarget::Object(defender),
        None => DamageTarget::Player(battle.defending_player),
    }
}

fn end_battle(game: &mut GameState, decision_maker: &mut dyn DecisionMaker) {
    let Some(battle) = game.battle.take() else {
        return;
    };

    // Explode destroys the attacker (and what it fought) after battle.
    if game.object_has_keyword(battle.attacker, Keyword::Explode)
        && game
            .object(battle.attacker)
            .is_some_and(|o| o.zone == Zone::Field)
        && (battle.blocker.is_some() || battle.defender.is_some())
    {
        execute_destroy(game, battle.attacker, None, decision_maker);
        if let Some(blocker) = battle.blocker
            && game.object(blocker).is_some_and(|o| o.zone == Zone::Field)
        {
            execute_destroy(game, blocker, None, decision_maker);
        }
    }

    game.emit(EngineEvent::BattleEnded {
        attacking_player: battle.attacking_player,
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(BattleEndedEvent {
            attacking_player: battle.attacking_player,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::decision::AutoPassDecisionMaker;
    use crate::ids::CardId;
    use crate::types::CardType;

    fn combatant(id: u32, name: &str, atk: i32, def: i32) -> crate::card::CardDefinition {
        CardBuilder::new(CardId::from_raw(id), name)
            .card_type(CardType::Resonator)
            .stats(atk, def)
            .build()
    }

    fn battle_ready_game() -> (GameState, ObjectId, ObjectId) {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        game.turn.phase = Phase::Main;

        let attacker = game.create_object_from_card(&combatant(1, "Raging Bull", 600, 400), alice, Zone::Field);
        let blocker = game.create_object_from_card(&combatant(2, "Wall of Wind", 200, 700), bob, Zone::Field);

        // Clear summoning sickness.
        game.object_mut(attacker).unwrap().entered_turn = 0;
        game.object_mut(blocker).unwrap().entered_turn = 0;
        (game, attacker, blocker)
    }

    #[test]
    fn test_attack_rests_attacker() {
        let (mut game, attacker, _) = battle_ready_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];

        declare_attack(&mut game, alice, attacker, Target::Player(bob)).unwrap();
        assert!(game.is_rested(attacker));
        assert!(game.battle.is_some());
    }

    #[test]
    fn test_summoning_sickness_blocks_attack() {
        let (mut game, attacker, _) = battle_ready_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        game.object_mut(attacker).unwrap().entered_turn = game.turn.turn_number;

        let err = declare_attack(&mut game, alice, attacker, Target::Player(bob)).unwrap_err();
        assert_eq!(err, CombatError::SummoningSickness);
    }

    #[test]
    fn test_unblocked_attack_damages_player() {
        let (mut game, attacker, _) = battle_ready_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        let mut dm = AutoPassDecisionMaker;

        declare_attack(&mut game, alice, attacker, Target::Player(bob)).unwrap();
        // Step through: blocker window (no block), damage, after, end.
        while !advance_battle_step(&mut game, &mut dm).unwrap() {}

        assert_eq!(game.player(bob).unwrap().life, 3400);
        assert!(game.battle.is_none());
    }

    #[test]
    fn test_blocked_attack_trades_damage() {
        let (mut game, attacker, blocker) = battle_ready_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        let mut dm = AutoPassDecisionMaker;

        declare_attack(&mut game, alice, attacker, Target::Player(bob)).unwrap();
        advance_battle_step(&mut game, &mut dm).unwrap(); // -> DeclareBlocker
        declare_block(&mut game, bob, blocker).unwrap();
        while !advance_battle_step(&mut game, &mut dm).unwrap() {}

        assert_eq!(game.damage_on(blocker), 600);
        assert_eq!(game.damage_on(attacker), 200);
        assert_eq!(game.player(bob).unwrap().life, 4000);
    }

    #[test]
    fn test_flying_requires_flying_blocker() {
        let (mut game, attacker, blocker) = battle_ready_game();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];
        let mut dm = AutoPassDecisionMaker;

        game.object_mut(attacker).unwrap().definition.keywords =
            crate::types::KeywordSet::from_keyword(Keyword::Flying);

        declare_attack(&mut game, alice, attacker, Target::Player(bob)).unwrap();
        advance_battle_step(&mut game, &mut dm).unwrap();
        let err = declare_block(&mut game, bob, blocker).unwrap_err();
        assert_eq!(err, CombatError::NeedsFlying);
    }

    #[test]
    fn test_target_attack_requires_keyword() {
        let (mut game, attacker, blocker) = battle_ready_game();
        let alice = game.turn_order[0];

        game.rest(blocker);
        let err = declare_attack(&mut game, alice, attacker, Target::Object(blocker)).unwrap_err();
        assert_eq!(err, CombatError::NeedsTargetAttack);

        game.object_mut(attacker).unwrap().definition.keywords =
            crate::types::KeywordSet::from_keyword(Keyword::TargetAttack);
        declare_attack(&mut game, alice, attacker, Target::Object(blocker)).unwrap();
    }
}
