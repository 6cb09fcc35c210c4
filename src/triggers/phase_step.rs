//! Phase-boundary triggers.

use crate::events::EventKind;
use crate::filter::PlayerFilter;
use crate::game_state::GameState;
use crate::ids::PlayerId;

use super::matcher_trait::{TriggerContext, TriggerMatcher};
use super::trigger_event::TriggerEvent;

/// "At the beginning of [whose] [phase]" triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTrigger {
    pub kind: EventKind,
    pub whose: PlayerFilter,
}

impl PhaseTrigger {
    pub fn new(kind: EventKind, whose: PlayerFilter) -> Self {
        Self { kind, whose }
    }

    pub fn beginning_of_your_main_phase() -> Self {
        Self::new(EventKind::BeginningOfMainPhase, PlayerFilter::You)
    }

    pub fn beginning_of_each_end_phase() -> Self {
        Self::new(EventKind::BeginningOfEndPhase, PlayerFilter::Any)
    }

    pub fn beginning_of_your_recovery_phase() -> Self {
        Self::new(EventKind::BeginningOfRecoveryPhase, PlayerFilter::You)
    }

    pub fn start_of_each_turn() -> Self {
        Self::new(EventKind::TurnStart, PlayerFilter::Any)
    }

    fn event_player(event: &TriggerEvent, game: &GameState) -> PlayerId {
        event.0.affected_player(game)
    }
}

impl TriggerMatcher for PhaseTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        if event.kind() != self.kind {
            return false;
        }
        let player = Self::event_player(event, ctx.game);
        self.whose.matches(ctx.game, ctx.controller, player)
    }

    fn display(&self) -> String {
        let phase = match self.kind {
            EventKind::BeginningOfDrawPhase => "draw phase",
            EventKind::BeginningOfRecoveryPhase => "recovery phase",
            EventKind::BeginningOfMainPhase => "main phase",
            EventKind::BeginningOfEndPhase => "end phase",
            EventKind::TurnStart => "turn",
            EventKind::TurnEnd => "end of turn",
            _ => "phase",
        };
        let whose = match self.whose {
            PlayerFilter::You => "your",
            PlayerFilter::Opponent => "your opponent's",
            _ => "each",
        };
        format!("at the beginning of {whose} {phase}")
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}
