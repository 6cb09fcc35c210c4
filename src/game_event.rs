//! The engine's outward-facing event stream.
//!
//! Every state mutation appends one [`EngineEvent`] to the session log, in
//! exactly the order it took effect. Rendering, logging, and replay
//! collaborators consume the log read-only; nothing in here feeds back into
//! the rules.

use crate::ids::{ObjectId, PlayerId};
use crate::types::Attribute;
use crate::zone::Zone;

/// The target of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageTarget {
    /// Damage to a player.
    Player(PlayerId),
    /// Damage to a resonator or J-Ruler.
    Object(ObjectId),
}

/// One entry in the observable event stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub enum EngineEvent {
    GameStarted {
        first_player: PlayerId,
    },
    TurnStarted {
        player: PlayerId,
        turn: u32,
    },
    TurnEnded {
        player: PlayerId,
        turn: u32,
    },
    PhaseChanged {
        player: PlayerId,
        phase: &'static str,
    },
    PriorityPassed {
        player: PlayerId,
    },
    CardDrawn {
        player: PlayerId,
        object: ObjectId,
    },
    ZoneChanged {
        object: ObjectId,
        from: Zone,
        to: Zone,
    },
    TokenCeasedToExist {
        object: ObjectId,
    },
    ChaseEntryPushed {
        object: ObjectId,
        controller: PlayerId,
    },
    ChaseEntryResolved {
        object: ObjectId,
        controller: PlayerId,
    },
    /// A legally-played ability resolved as a no-op because every required
    /// target had become invalid. Not an error.
    ChaseEntryFizzled {
        object: ObjectId,
        controller: PlayerId,
    },
    /// An intervening-if trigger whose condition went false was discarded
    /// without resolving.
    TriggerDiscarded {
        source: ObjectId,
    },
    TriggerQueued {
        source: ObjectId,
        controller: PlayerId,
    },
    DamageDealt {
        source: ObjectId,
        target: DamageTarget,
        amount: u32,
    },
    LifeChanged {
        player: PlayerId,
        delta: i32,
        new_total: i32,
    },
    Destroyed {
        object: ObjectId,
    },
    Banished {
        object: ObjectId,
    },
    Rested {
        object: ObjectId,
    },
    Recovered {
        object: ObjectId,
    },
    CountersChanged {
        object: ObjectId,
        delta: i32,
    },
    StoneCalled {
        player: PlayerId,
        stone: ObjectId,
    },
    WillProduced {
        player: PlayerId,
        source: ObjectId,
        attribute: Attribute,
    },
    JudgmentPerformed {
        player: PlayerId,
        j_ruler: ObjectId,
    },
    AttackDeclared {
        attacker: ObjectId,
        target: DamageTarget,
    },
    BlockDeclared {
        blocker: ObjectId,
        attacker: ObjectId,
    },
    BattleEnded {
        attacking_player: PlayerId,
    },
    StateBasedActionsApplied {
        count: usize,
    },
    PlayerLost {
        player: PlayerId,
        reason: &'static str,
    },
    GameEnded {
        winner: Option<PlayerId>,
    },
}
