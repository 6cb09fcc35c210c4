//! Battle events and rest/recover state events.

use std::any::Any;

use crate::game_event::DamageTarget;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

use super::traits::{EventKind, GameEventType};

/// An attack was declared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackDeclaredEvent {
    pub attacker: ObjectId,
    /// The player or rested resonator being attacked.
    pub target: DamageTarget,
}

impl GameEventType for AttackDeclaredEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::AttackDeclared
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(*self)
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        match self.target {
            DamageTarget::Player(player) => player,
            DamageTarget::Object(object) => game.controller_of(object),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A blocker was declared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDeclaredEvent {
    pub blocker: ObjectId,
    pub attacker: ObjectId,
}

impl GameEventType for BlockDeclaredEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::BlockDeclared
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(*self)
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        game.controller_of(self.blocker)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A battle ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleEndedEvent {
    pub attacking_player: PlayerId,
}

impl GameEventType for BattleEndedEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::BattleEnded
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(*self)
    }

    fn affected_player(&self, _game: &GameState) -> PlayerId {
        self.attacking_player
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A permanent became rested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestEvent {
    pub permanent: ObjectId,
}

impl GameEventType for RestEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::Rest
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(*self)
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        game.controller_of(self.permanent)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A permanent recovered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoverEvent {
    pub permanent: ObjectId,
}

impl GameEventType for RecoverEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::Recover
    }

    fn clone_box(&self) -> Box<dyn GameEventType> {
        Box::new(*self)
    }

    fn affected_player(&self, game: &GameState) -> PlayerId {
        game.controller_of(self.permanent)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A magic stone was called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoneCalledEvent {
    pub player: PlayerId,
    pub stone: ObjectId,
}

impl GameEventType for StoneCalledEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::StoneCalled
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

/// Will was produced from a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WillProducedEvent {
    pub player: PlayerId,
    pub source: ObjectId,
}

impl GameEventType for WillProducedEvent {
    fn event_kind(&self) -> EventKind {
        EventKind::WillProduced
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
