//! Core traits for the trait-based event system.
//!
//! Every interceptable state change is an event type implementing
//! [`GameEventType`]; replacement conditions implement [`ReplacementMatcher`].

use std::any::Any;
use std::fmt::Debug;

use crate::game_state::GameState;
use crate::ids::PlayerId;

use super::context::EventContext;

/// Fast dispatch enum for event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Damage being dealt.
    Damage,
    /// Object changing zones.
    ZoneChange,
    /// Object entering the field (specialized zone change).
    EnterField,
    /// Permanent being destroyed.
    Destroy,
    /// Player drawing cards.
    Draw,
    /// Card being discarded.
    Discard,
    /// Player gaining life.
    LifeGain,
    /// Player losing life.
    LifeLoss,
    /// Permanent becoming rested.
    Rest,
    /// Permanent recovering.
    Recover,
    /// A magic stone was called.
    StoneCalled,
    /// Will was produced.
    WillProduced,
    /// An attack was declared.
    AttackDeclared,
    /// A blocker was declared.
    BlockDeclared,
    /// Battle ended.
    BattleEnded,
    /// Beginning of the draw phase.
    BeginningOfDrawPhase,
    /// Beginning of the recovery phase.
    BeginningOfRecoveryPhase,
    /// Beginning of the main phase.
    BeginningOfMainPhase,
    /// Beginning of the end phase.
    BeginningOfEndPhase,
    /// Turn started.
    TurnStart,
    /// Turn ended.
    TurnEnd,
}

/// Core trait for all game events.
pub trait GameEventType: Debug + Send + Sync {
    /// Get the event kind for fast dispatch without downcasting.
    fn event_kind(&self) -> EventKind;

    /// Clone this event into a boxed trait object.
    fn clone_box(&self) -> Box<dyn GameEventType>;

    /// The player a replacement choice falls to when several replacements
    /// apply to this event: the affected player, or the controller of the
    /// affected object. Events that affect both players (or no one in
    /// particular) fall to the active player.
    fn affected_player(&self, game: &GameState) -> PlayerId;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn GameEventType> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Downcast an event trait object to a concrete event type.
pub fn downcast_event<E: GameEventType + 'static>(event: &dyn GameEventType) -> Option<&E> {
    event.as_any().downcast_ref::<E>()
}

/// A condition deciding whether a replacement effect applies to an event.
pub trait ReplacementMatcher: Debug + Send + Sync {
    /// Check whether the effect applies to this event.
    fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn ReplacementMatcher>;

    /// Display text for logs and choice prompts.
    fn display(&self) -> String;
}

impl Clone for Box<dyn ReplacementMatcher> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Cloneable wrapper around a boxed [`ReplacementMatcher`].
#[derive(Debug, Clone)]
pub struct Matcher(pub Box<dyn ReplacementMatcher>);

impl Matcher {
    pub fn new<M: ReplacementMatcher + 'static>(matcher: M) -> Self {
        Self(Box::new(matcher))
    }

    pub fn matches_event(&self, event: &dyn GameEventType, ctx: &EventContext) -> bool {
        self.0.matches_event(event, ctx)
    }

    pub fn display(&self) -> String {
        self.0.display()
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.display() == other.display()
    }
}
