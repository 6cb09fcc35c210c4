//! Phase and turn boundary events, consumed by phase-step triggers.

use std::any::Any;

use crate::game_state::GameState;
use crate::ids::PlayerId;

use super::traits::{EventKind, GameEventType};

macro_rules! phase_event {
    ($name:ident, $kind:expr) => {
        /// Marker event fired at a phase boundary; `player` is the turn player.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            pub player: PlayerId,
        }

        impl GameEventType for $name {
            fn event_kind(&self) -> EventKind {
                $kind
            }

            fn clone_box(&self) -> Box<dyn GameEventType> {
                Box::new(*self)
            }

            fn affected_player(&self, _game: &GameState) -> PlayerId {
                self.player
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

phase_event!(BeginningOfDrawPhaseEvent, EventKind::BeginningOfDrawPhase);
phase_event!(
    BeginningOfRecoveryPhaseEvent,
    EventKind::BeginningOfRecoveryPhase
);
phase_event!(BeginningOfMainPhaseEvent, EventKind::BeginningOfMainPhase);
phase_event!(BeginningOfEndPhaseEvent, EventKind::BeginningOfEndPhase);
phase_event!(TurnStartEvent, EventKind::TurnStart);
phase_event!(TurnEndEvent, EventKind::TurnEnd);
