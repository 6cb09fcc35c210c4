//! The closed effect-action vocabulary.
//!
//! Every resolution effect a card can perform is one case of [`Effect`],
//! consumed by the single dispatch in [`executor`](crate::executor). New
//! effect kinds extend the enum; there is no open-ended subclassing.

use crate::card::CardDefinition;
use crate::events::Matcher;
use crate::filter::{ObjectFilter, PlayerFilter};
use crate::object::CounterType;
use crate::replacement::ReplacementAction;
use crate::types::Keyword;

/// A quantity that may be fixed, the spell's X, or computed from board state.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Fixed(i32),
    /// The X chosen when the spell or ability was played.
    X,
    /// `per` for each object matching the filter.
    CountMatching { filter: Box<ObjectFilter>, per: i32 },
}

impl Value {
    pub fn fixed(n: i32) -> Self {
        Value::Fixed(n)
    }
}

/// Duration of a non-static continuous modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    EndOfTurn,
    SourceLeavesField,
    Permanently,
}

/// A board-state condition gating an [`Effect::Conditional`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The effect's controller has at most this much life.
    ControllerLifeAtMost(i32),
    /// The effect's controller has at least this much life.
    ControllerLifeAtLeast(i32),
    /// The effect's controller controls at least `count` matching objects.
    ControlsAtLeast { filter: Box<ObjectFilter>, count: u32 },
    /// At least one captured target survived re-validation.
    AnyTargetsRemain,
}

/// A resolution effect.
///
/// "Targets" refers to the targets captured on the Chase entry this effect is
/// resolved from. Player-scoped cases name their player by filter relative to
/// the effect's controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deal damage to each target.
    DealDamageToTargets(Value),
    /// Destroy each target object.
    DestroyTargets,
    /// Remove each target object from the game.
    BanishTargets,
    /// Return each target object to its owner's hand.
    ReturnTargetsToHand,
    /// Rest each target object.
    RestTargets,
    /// Recover each target object.
    RecoverTargets,
    /// Give each target object +atk/+def for a duration.
    ModifyStatsOfTargets { atk: i32, def: i32, until: Until },
    /// Grant each target object a keyword for a duration.
    GrantKeywordToTargets { keyword: Keyword, until: Until },
    /// Put counters on each target object.
    AddCountersToTargets { counter: CounterType, count: u32 },
    /// A player draws cards.
    DrawCards { player: PlayerFilter, count: Value },
    /// A player gains life.
    GainLife { player: PlayerFilter, amount: Value },
    /// A player loses life.
    LoseLife { player: PlayerFilter, amount: Value },
    /// Destroy every object matching the filter.
    DestroyAllMatching(ObjectFilter),
    /// Put token copies of a definition onto the field under the controller's
    /// control.
    CreateToken {
        token: Box<CardDefinition>,
        count: u32,
    },
    /// Register a replacement effect from this resolution. One-shot shields
    /// ("the next time ... would ...") are consumed after a single
    /// application; others last until the end of the turn.
    RegisterReplacement {
        matcher: Matcher,
        action: ReplacementAction,
        one_shot: bool,
    },
    /// Effects applied in order.
    Sequence(Vec<Effect>),
    /// `then` when the condition holds, `otherwise` when it does not.
    Conditional {
        condition: Condition,
        then: Vec<Effect>,
        otherwise: Vec<Effect>,
    },
}
