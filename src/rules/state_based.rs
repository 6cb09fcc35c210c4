//! State-based actions.
//!
//! Mandatory corrections checked before any player receives priority and
//! after every Chase resolution. They don't use the Chase; all
//! simultaneously-true corrections apply as one batch, and the caller loops
//! to a fixpoint.

use crate::decision::DecisionMaker;
use crate::event_processor::{execute_destroy, execute_zone_change};
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::types::{CardType, Keyword};
use crate::zone::Zone;

/// A state-based action that needs to be performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBasedAction {
    /// A J/resonator with lethal damage or zero-or-less DEF is destroyed.
    ObjectDestroyed(ObjectId),

    /// A player loses the game.
    PlayerLoses {
        player: PlayerId,
        reason: LoseReason,
    },

    /// A resonator addition attached to nothing (or to an illegal host) is
    /// put into its owner's graveyard.
    AdditionFallsOff(ObjectId),

    /// A token outside the field ceases to exist.
    TokenCeasesToExist(ObjectId),
}

/// Reason why a player loses the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoseReason {
    /// Life total is 0 or less.
    ZeroLife,
}

/// Check state-based actions and return everything that currently applies.
///
/// Lethal-damage checks use *calculated* DEF, so a permanent whose effective
/// DEF dropped to zero under continuous effects is destroyed even when its
/// base DEF was positive.
pub fn check_state_based_actions(game: &GameState) -> Vec<StateBasedAction> {
    let mut actions = Vec::new();

    check_player_sbas(game, &mut actions);
    check_field_sbas(game, &mut actions);
    check_token_cleanup(game, &mut actions);

    actions
}

fn check_player_sbas(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    for player in &game.players {
        if !player.is_in_game() {
            continue;
        }
        if player.has_lethal_life() {
            actions.push(StateBasedAction::PlayerLoses {
                player: player.id,
                reason: LoseReason::ZeroLife,
            });
        }
    }
}

fn check_field_sbas(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    for &obj_id in &game.field {
        let Some(obj) = game.object(obj_id) else {
            continue;
        };
        let Some(chars) = game.calculated_characteristics(obj_id) else {
            continue;
        };

        if chars.card_type.is_combatant() {
            let shielded = chars.keywords.contains(Keyword::Indestructible)
                || chars.keywords.contains(Keyword::Imperishable);

            if chars.def <= 0 && !shielded {
                actions.push(StateBasedAction::ObjectDestroyed(obj_id));
                continue;
            }

            if chars.def > 0 && obj.damage >= chars.def as u32 && !shielded {
                actions.push(StateBasedAction::ObjectDestroyed(obj_id));
                continue;
            }
        }

        if chars.card_type == CardType::AdditionResonator {
            let host_ok = obj.attached_to.is_some_and(|host| {
                game.object(host).is_some_and(|h| h.zone == Zone::Field)
                    && game
                        .calculated_characteristics(host)
                        .is_some_and(|hc| hc.card_type.is_combatant())
            });
            if !host_ok {
                actions.push(StateBasedAction::AdditionFallsOff(obj_id));
            }
        }
    }
}

fn check_token_cleanup(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    for id in game.all_object_ids() {
        let Some(obj) = game.object(id) else {
            continue;
        };
        if obj.is_token() && obj.zone != Zone::Field {
            actions.push(StateBasedAction::TokenCeasesToExist(id));
        }
    }
}

/// Apply one batch of state-based actions.
///
/// Returns true if anything was applied; the caller re-checks until a pass
/// applies nothing.
pub fn apply_state_based_actions(
    game: &mut GameState,
    decision_maker: &mut dyn DecisionMaker,
) -> bool {
    let actions = check_state_based_actions(game);
    if actions.is_empty() {
        return false;
    }

    let mut applied = 0usize;
    for action in &actions {
        match action {
            StateBasedAction::ObjectDestroyed(id) => {
                if execute_destroy(game, *id, None, decision_maker) {
                    applied += 1;
                }
            }
            StateBasedAction::PlayerLoses { player, reason } => {
                let reason_text = match reason {
                    LoseReason::ZeroLife => "life reached 0",
                };
                game.player_loses(*player, reason_text);
                applied += 1;
            }
            StateBasedAction::AdditionFallsOff(id) => {
                if execute_zone_change(game, *id, Zone::Graveyard, decision_maker).is_some() {
                    applied += 1;
                }
            }
            StateBasedAction::TokenCeasesToExist(id) => {
                // Off-field tokens normally vanish during the move itself;
                // this catches tokens placed off-field directly.
                if game.object(*id).is_some() {
                    game.move_object(*id, Zone::Removed);
                    applied += 1;
                }
            }
        }
    }

    if applied > 0 {
        game.emit(crate::game_event::EngineEvent::StateBasedActionsApplied { count: applied });
    }
    applied > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::continuous::{ContinuousEffectDef, EffectTarget, Modification};
    use crate::decision::AutoPassDecisionMaker;
    use crate::effect::Until;
    use crate::ids::CardId;

    fn game_with_creature(atk: i32, def: i32) -> (GameState, ObjectId) {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let card = CardBuilder::new(CardId::from_raw(1), "Brave Soldier")
            .card_type(CardType::Resonator)
            .stats(atk, def)
            .build();
        let id = game.create_object_from_card(&card, alice, Zone::Field);
        (game, id)
    }

    #[test]
    fn test_lethal_damage_destroys() {
        let (mut game, id) = game_with_creature(400, 400);
        game.mark_damage(id, 400);

        let actions = check_state_based_actions(&game);
        assert!(actions.contains(&StateBasedAction::ObjectDestroyed(id)));

        let mut dm = AutoPassDecisionMaker;
        assert!(apply_state_based_actions(&mut game, &mut dm));
        assert_eq!(game.object(id).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_sublethal_damage_survives() {
        let (mut game, id) = game_with_creature(400, 400);
        game.mark_damage(id, 399);

        assert!(check_state_based_actions(&game).is_empty());
    }

    #[test]
    fn test_zero_effective_def_destroys_despite_positive_base() {
        let (mut game, id) = game_with_creature(400, 400);
        let alice = game.turn_order[0];

        // A -400/-400 effect drops effective DEF to zero.
        let ts = game.ids.next_timestamp();
        game.continuous_effects
            .register_resolution(
                ContinuousEffectDef::new(
                    Modification::ModifyStats {
                        atk: -400,
                        def: -400,
                    },
                    EffectTarget::Objects(vec![id]),
                    Until::EndOfTurn,
                ),
                id,
                alice,
                ts,
                1,
            )
            .unwrap();

        let actions = check_state_based_actions(&game);
        assert!(actions.contains(&StateBasedAction::ObjectDestroyed(id)));
    }

    #[test]
    fn test_player_at_zero_life_loses() {
        let (mut game, _) = game_with_creature(100, 100);
        let bob = game.turn_order[1];
        game.player_mut(bob).unwrap().life = 0;

        let actions = check_state_based_actions(&game);
        assert!(actions.iter().any(|a| matches!(
            a,
            StateBasedAction::PlayerLoses {
                reason: LoseReason::ZeroLife,
                ..
            }
        )));

        let mut dm = AutoPassDecisionMaker;
        apply_state_based_actions(&mut game, &mut dm);
        assert!(game.player(bob).unwrap().has_lost);
    }

    #[test]
    fn test_orphaned_addition_falls_off() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];

        let aura = CardBuilder::new(CardId::from_raw(3), "Blessing of Light")
            .card_type(CardType::AdditionResonator)
            .build();
        let id = game.create_object_from_card(&aura, alice, Zone::Field);

        let actions = check_state_based_actions(&game);
        assert!(actions.contains(&StateBasedAction::AdditionFallsOff(id)));

        let mut dm = AutoPassDecisionMaker;
        apply_state_based_actions(&mut game, &mut dm);
        assert_eq!(game.object(id).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_indestructible_not_flagged() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let card = CardBuilder::new(CardId::from_raw(1), "Eternal Statue")
            .card_type(CardType::Resonator)
            .stats(100, 100)
            .keyword(Keyword::Indestructible)
            .build();
        let id = game.create_object_from_card(&card, alice, Zone::Field);
        game.mark_damage(id, 500);

        assert!(check_state_based_actions(&game).is_empty());
    }
}
