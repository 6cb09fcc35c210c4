//! A deterministic rules-resolution engine for a Force of Will-style trading
//! card game.
//!
//! The crate owns the turn and phase state machine, the priority protocol,
//! the Chase (the LIFO resolution stack), the continuous-effect layer system,
//! replacement-effect interception, triggered-ability ordering (APNAP), and
//! target legality. Card behavior arrives as structured data (trigger,
//! continuous, and replacement registrations plus resolution effects); the
//! engine never parses rules text.
//!
//! A [`game_state::GameState`] is a self-contained session: it owns every
//! card instance, all zone placement, ID and timestamp allocation, and an
//! ordered event log that observers consume read-only. Feeding two sessions
//! the same seed and inputs produces identical logs.
//!
//! External input is a suspension point, never a blocking wait:
//! [`game_loop::advance_priority`] runs the engine until a typed decision
//! context is pending, and [`game_loop::apply_priority_response`] validates
//! and applies the answer. In-process hosts and tests drive the same
//! machinery with a [`decision::DecisionMaker`].

pub mod ability;
pub mod card;
pub mod continuous;
pub mod decision;
pub mod dependency;
pub mod effect;
pub mod error;
pub mod event_processor;
pub mod events;
pub mod executor;
pub mod filter;
pub mod game_event;
pub mod game_loop;
pub mod game_state;
pub mod ids;
pub mod object;
pub mod player;
pub mod replacement;
pub mod rules;
pub mod snapshot;
pub mod target;
pub mod targeting;
pub mod triggers;
pub mod turn;
pub mod types;
pub mod will;
pub mod zone;

pub use ability::{Ability, AbilityKind, ActivatedAbility, StaticAbility, TriggeredAbility};
pub use card::{CardBuilder, CardDefinition};
pub use continuous::{
    CalculatedCharacteristics, ContinuousEffect, ContinuousEffectDef, ContinuousEffectId,
    ContinuousEffectManager, Layer, Modification,
};
pub use decision::{
    AutoPassDecisionMaker, DecisionContext, DecisionMaker, GameProgress, GameResult, LegalAction,
    ResponseError, ScriptedDecisionMaker,
};
pub use effect::{Condition, Effect, Until, Value};
pub use error::ConfigurationError;
pub use event_processor::{EventOutcome, ProcessedEvent, process_event};
pub use game_event::{DamageTarget, EngineEvent};
pub use game_loop::{
    ActionError, GameLoopError, PriorityLoopState, PriorityResponse, advance_priority,
    advance_priority_with, apply_priority_response, apply_priority_response_with, begin_game,
    compute_legal_actions, execute_game_with, execute_turn_with, resolve_chase_entry,
    run_priority_loop_with,
};
pub use game_state::{ChaseEntry, EngineConfig, GameState, Phase, TurnState};
pub use ids::{CardId, ObjectId, PlayerId};
pub use object::{CounterType, Object};
pub use player::Player;
pub use replacement::{ReplacementAction, ReplacementEffect, ReplacementEffectManager};
pub use target::{ChooseSpec, Target};
pub use triggers::{Trigger, TriggerEvent};
pub use types::{Attribute, CardType, Keyword, KeywordSet, Race};
pub use will::{WillCost, WillPool};
pub use zone::Zone;
