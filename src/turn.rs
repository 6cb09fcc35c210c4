//! Turn structure and the priority protocol.
//!
//! Phase order is Draw, Recovery, Main, End; battles happen inside the main
//! phase. Priority passes between the two players; both passing resolves the
//! top of the Chase or ends the phase.

use crate::decision::DecisionMaker;
use crate::event_processor::execute_discard;
use crate::events::{
    BeginningOfDrawPhaseEvent, BeginningOfEndPhaseEvent, BeginningOfMainPhaseEvent,
    BeginningOfRecoveryPhaseEvent, TurnEndEvent, TurnStartEvent,
};
use crate::game_event::EngineEvent;
use crate::game_state::{GameState, Phase};
use crate::ids::{ObjectId, PlayerId};
use crate::triggers::TriggerEvent;

/// Result of passing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityResult {
    /// More players need to pass priority.
    Continue,
    /// All players passed in succession; resolve the top of the Chase.
    ChaseResolves,
    /// All players passed with an empty Chase; the phase ends.
    PhaseEnds,
}

/// Tracks consecutive priority passes.
#[derive(Debug, Clone, Default)]
pub struct PriorityTracker {
    pub consecutive_passes: usize,
    pub players_in_game: usize,
}

impl PriorityTracker {
    pub fn new(players_in_game: usize) -> Self {
        Self {
            consecutive_passes: 0,
            players_in_game,
        }
    }

    /// Records a pass. Returns true if all players have now passed.
    pub fn record_pass(&mut self) -> bool {
        self.consecutive_passes += 1;
        self.consecutive_passes >= self.players_in_game
    }

    /// Resets the pass counter (called when a player takes an action).
    pub fn reset(&mut self) {
        self.consecutive_passes = 0;
    }

    pub fn all_passed(&self) -> bool {
        self.consecutive_passes >= self.players_in_game
    }
}

/// Returns the next phase, or `None` at the end of the turn.
pub fn next_phase(phase: Phase) -> Option<Phase> {
    match phase {
        Phase::Draw => Some(Phase::Recovery),
        Phase::Recovery => Some(Phase::Main),
        Phase::Main => Some(Phase::End),
        Phase::End => None,
    }
}

/// Returns true if the given player currently has priority.
pub fn has_priority(game: &GameState, player: PlayerId) -> bool {
    game.turn.priority_player == Some(player)
}

/// Passes priority for the current holder.
pub fn pass_priority(game: &mut GameState, tracker: &mut PriorityTracker) -> PriorityResult {
    if let Some(holder) = game.turn.priority_player {
        game.emit(EngineEvent::PriorityPassed { player: holder });
    }

    if tracker.record_pass() {
        if game.chase_is_empty() {
            PriorityResult::PhaseEnds
        } else {
            PriorityResult::ChaseResolves
        }
    } else {
        advance_priority_to_next_player(game);
        PriorityResult::Continue
    }
}

/// Resets priority to the active player (after something was put on the
/// Chase or resolved).
pub fn reset_priority(game: &mut GameState, tracker: &mut PriorityTracker) {
    tracker.reset();
    game.turn.priority_player = Some(game.turn.active_player);
}

/// Hands priority to a specific player and clears the pass count.
pub fn give_priority(game: &mut GameState, tracker: &mut PriorityTracker, player: PlayerId) {
    tracker.reset();
    game.turn.priority_player = Some(player);
}

fn advance_priority_to_next_player(game: &mut GameState) {
    let Some(current) = game.turn.priority_player else {
        return;
    };
    let next = game.opponent_of(current);
    if game.player(next).is_some_and(|p| p.is_in_game()) {
        game.turn.priority_player = Some(next);
    }
}

/// "Main timing": the turn player, main phase, empty Chase, no battle.
pub fn is_main_timing(game: &GameState, player: PlayerId) -> bool {
    game.turn.active_player == player
        && game.turn.phase == Phase::Main
        && game.chase_is_empty()
        && game.battle.is_none()
}

/// Executes the draw phase entry action: the turn player draws one card,
/// except the first player on the game's first turn.
pub fn execute_draw_phase(game: &mut GameState) {
    let active = game.turn.active_player;
    game.emit(EngineEvent::PhaseChanged {
        player: active,
        phase: Phase::Draw.name(),
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(BeginningOfDrawPhaseEvent { player: active }));

    if game.turn.turn_number > 1 {
        game.draw_cards(active, 1);
    }
    game.turn.priority_player = Some(active);
}

/// Executes the recovery phase: clears the will pool and recovers everything
/// the turn player controls, skipping each player's first recovery phase and
/// anything denied recovery by a continuous effect.
pub fn execute_recovery_phase(game: &mut GameState) {
    let active = game.turn.active_player;
    game.emit(EngineEvent::PhaseChanged {
        player: active,
        phase: Phase::Recovery.name(),
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(BeginningOfRecoveryPhaseEvent {
            player: active,
        }));

    if let Some(player) = game.player_mut(active) {
        player.will_pool.empty();
    }

    let first_recovery = game
        .player(active)
        .is_some_and(|p| !p.has_had_recovery);
    if first_recovery {
        if let Some(player) = game.player_mut(active) {
            player.has_had_recovery = true;
        }
        game.turn.priority_player = None;
        return;
    }

    let mut to_recover: Vec<ObjectId> = Vec::new();
    for &id in &game.field {
        let Some(chars) = game.calculated_characteristics(id) else {
            continue;
        };
        if chars.controller == active && !chars.doesnt_recover && game.is_rested(id) {
            to_recover.push(id);
        }
    }
    if let Some(ruler) = game.player(active).and_then(|p| p.ruler)
        && game.is_rested(ruler)
    {
        to_recover.push(ruler);
    }

    for id in to_recover {
        game.recover(id);
    }

    // No priority window during recovery.
    game.turn.priority_player = None;
}

/// Marks the start of the main phase.
pub fn enter_main_phase(game: &mut GameState) {
    let active = game.turn.active_player;
    game.emit(EngineEvent::PhaseChanged {
        player: active,
        phase: Phase::Main.name(),
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(BeginningOfMainPhaseEvent { player: active }));
    game.turn.priority_player = Some(active);
}

/// Marks the start of the end phase.
pub fn enter_end_phase(game: &mut GameState) {
    let active = game.turn.active_player;
    game.emit(EngineEvent::PhaseChanged {
        player: active,
        phase: Phase::End.name(),
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(BeginningOfEndPhaseEvent { player: active }));
    game.turn.priority_player = Some(active);
}

/// If the turn player is over their hand size, returns who must discard and
/// how many.
pub fn end_phase_discard_requirement(game: &GameState) -> Option<(PlayerId, usize, Vec<ObjectId>)> {
    let active = game.turn.active_player;
    let player = game.player(active)?;
    let max_hand = player.max_hand_size.max(0) as usize;
    let excess = player.hand.len().saturating_sub(max_hand);
    if excess > 0 {
        Some((active, excess, player.hand.clone()))
    } else {
        None
    }
}

/// Applies the chosen end-phase discards.
pub fn apply_end_phase_discard(
    game: &mut GameState,
    player: PlayerId,
    cards: &[ObjectId],
    decision_maker: &mut impl DecisionMaker,
) {
    for &card in cards {
        execute_discard(game, card, player, decision_maker);
    }
}

/// Fire the turn-end event. Cleanup follows once any resulting triggers have
/// been given their window.
pub fn mark_turn_end(game: &mut GameState) {
    let active = game.turn.active_player;
    game.pending_trigger_events
        .push(TriggerEvent::new(TurnEndEvent { player: active }));
}

/// End-of-turn cleanup: expire until-end-of-turn effects, clear one-shot
/// replacement shields, empty will pools, and remove marked damage.
pub fn execute_turn_cleanup(game: &mut GameState) {
    let turn = game.turn.turn_number;
    game.continuous_effects.remove_end_of_turn_effects(turn);
    game.replacement_effects.clear_one_shot_effects();
    game.replacement_effects.clear_turn_scoped_effects();

    for player in &mut game.players {
        player.will_pool.empty();
    }

    for id in game.field_object_ids() {
        game.clear_damage(id);
    }

    game.turn.priority_player = None;
}

/// Fire the turn-start bookkeeping and event.
pub fn begin_turn(game: &mut GameState) {
    let active = game.turn.active_player;
    game.emit(EngineEvent::TurnStarted {
        player: active,
        turn: game.turn.turn_number,
    });
    game.pending_trigger_events
        .push(TriggerEvent::new(TurnStartEvent { player: active }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::game_state::ChaseEntry;
    use crate::ids::CardId;
    use crate::types::CardType;
    use crate::zone::Zone;

    fn test_game() -> GameState {
        GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0)
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(next_phase(Phase::Draw), Some(Phase::Recovery));
        assert_eq!(next_phase(Phase::Recovery), Some(Phase::Main));
        assert_eq!(next_phase(Phase::Main), Some(Phase::End));
        assert_eq!(next_phase(Phase::End), None);
    }

    #[test]
    fn test_pass_priority_empty_chase() {
        let mut game = test_game();
        let mut tracker = PriorityTracker::new(2);

        assert_eq!(pass_priority(&mut game, &mut tracker), PriorityResult::Continue);
        assert_eq!(pass_priority(&mut game, &mut tracker), PriorityResult::PhaseEnds);
    }

    #[test]
    fn test_pass_priority_with_chase() {
        let mut game = test_game();
        let mut tracker = PriorityTracker::new(2);

        game.push_to_chase(ChaseEntry::spell(
            crate::ids::ObjectId::from_raw(1),
            game.turn_order[0],
        ));

        assert_eq!(pass_priority(&mut game, &mut tracker), PriorityResult::Continue);
        assert_eq!(
            pass_priority(&mut game, &mut tracker),
            PriorityResult::ChaseResolves
        );
    }

    #[test]
    fn test_first_turn_skips_draw() {
        let mut game = test_game();
        let alice = game.turn_order[0];
        let deck: Vec<_> = (0..3)
            .map(|i| {
                CardBuilder::new(CardId::from_raw(100 + i), format!("Filler {i}"))
                    .card_type(CardType::Chant)
                    .build()
            })
            .collect();
        game.load_main_deck(alice, &deck);

        execute_draw_phase(&mut game);
        assert!(game.player(alice).unwrap().hand.is_empty());

        game.turn.turn_number = 3;
        execute_draw_phase(&mut game);
        assert_eq!(game.player(alice).unwrap().hand.len(), 1);
    }

    #[test]
    fn test_first_recovery_skipped() {
        let mut game = test_game();
        let alice = game.turn_order[0];
        let card = CardBuilder::new(CardId::from_raw(1), "Tired Worker")
            .card_type(CardType::Resonator)
            .stats(200, 200)
            .build();
        let id = game.create_object_from_card(&card, alice, Zone::Field);
        game.rest(id);

        execute_recovery_phase(&mut game);
        assert!(game.is_rested(id));
        assert!(game.player(alice).unwrap().has_had_recovery);

        execute_recovery_phase(&mut game);
        assert!(!game.is_rested(id));
    }

    #[test]
    fn test_recovery_clears_will_pool() {
        let mut game = test_game();
        let alice = game.turn_order[0];
        game.player_mut(alice)
            .unwrap()
            .will_pool
            .add(crate::types::Attribute::Fire, 3);

        execute_recovery_phase(&mut game);
        assert_eq!(game.player(alice).unwrap().will_pool.total(), 0);
    }

    #[test]
    fn test_discard_requirement() {
        let mut game = test_game();
        let alice = game.turn_order[0];
        for i in 0..9 {
            let card = CardBuilder::new(CardId::from_raw(200 + i), format!("Extra {i}"))
                .card_type(CardType::Chant)
                .build();
            game.create_object_from_card(&card, alice, Zone::Hand);
        }

        let (player, count, hand) = end_phase_discard_requirement(&game).unwrap();
        assert_eq!(player, alice);
        assert_eq!(count, 2);
        assert_eq!(hand.len(), 9);
    }
}
