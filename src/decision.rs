//! The player choice protocol.
//!
//! Every decision point produces a typed context: the legal option set plus
//! its count contract. A [`DecisionMaker`] answers contexts synchronously
//! when the host drives the game in-process; the suspension surface in
//! [`game_loop`](crate::game_loop) exposes the same contexts across an
//! `advance`/`respond` boundary. Out-of-option answers are rejected with a
//! [`ResponseError`] and the decision stays pending; nothing is applied
//! speculatively.

use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::target::Target;
use crate::types::Attribute;

// ============================================================================
// Action types
// ============================================================================

/// A legal action a player can take when they have priority.
#[derive(Debug, Clone, PartialEq)]
pub enum LegalAction {
    /// Pass priority to the next player.
    PassPriority,

    /// Play a card from hand.
    CastSpell { spell_id: ObjectId },

    /// Play a set chant-standby card.
    PlayFromStandby { card_id: ObjectId },

    /// Activate an ability on a permanent.
    ActivateAbility {
        source: ObjectId,
        ability_index: usize,
    },

    /// Produce will from a will ability (does not use the Chase).
    ProduceWill {
        source: ObjectId,
        attribute: Attribute,
    },

    /// Call the top card of the stone deck (rests the ruler; main timing,
    /// once per turn).
    CallStone,

    /// Perform judgment, flipping the ruler into its J-Ruler side.
    Judgment,

    /// Declare an attack with a recovered J/resonator (main timing).
    DeclareAttack {
        attacker: ObjectId,
        target: Target,
    },

    /// Declare a blocker during the opponent's battle.
    DeclareBlock { blocker: ObjectId },
}

// ============================================================================
// Decision contexts
// ============================================================================

/// Priority window: which actions are legal right now.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityContext {
    pub player: PlayerId,
    pub actions: Vec<LegalAction>,
}

/// Yes/no question ("you may ...").
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanContext {
    pub player: PlayerId,
    pub prompt: String,
}

/// Numeric choice (an X value).
#[derive(Debug, Clone, PartialEq)]
pub struct NumberContext {
    pub player: PlayerId,
    pub prompt: String,
    pub min: u32,
    pub max: u32,
}

/// Choose objects from a candidate set (discard, sacrifice, search).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectObjectsContext {
    pub player: PlayerId,
    pub prompt: String,
    pub candidates: Vec<ObjectId>,
    pub min: usize,
    pub max: usize,
}

/// Choose options by index (modes, replacement-effect order).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOptionsContext {
    pub player: PlayerId,
    pub prompt: String,
    pub options: Vec<String>,
    pub min: usize,
    pub max: usize,
}

/// Put items in an order of the player's choosing (own simultaneous
/// triggers).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderContext {
    pub player: PlayerId,
    pub prompt: String,
    pub items: Vec<String>,
}

/// One target requirement within a targets decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRequirementContext {
    pub description: String,
    pub legal_targets: Vec<Target>,
    pub min: usize,
    pub max: usize,
}

/// Choose targets for a spell or ability.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetsContext {
    pub player: PlayerId,
    pub source: ObjectId,
    pub prompt: String,
    pub requirements: Vec<TargetRequirementContext>,
}

/// A pending decision, as exposed over the suspension surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionContext {
    Priority(PriorityContext),
    Boolean(BooleanContext),
    Number(NumberContext),
    SelectObjects(SelectObjectsContext),
    SelectOptions(SelectOptionsContext),
    Order(OrderContext),
    Targets(TargetsContext),
}

impl DecisionContext {
    pub fn player(&self) -> PlayerId {
        match self {
            DecisionContext::Priority(c) => c.player,
            DecisionContext::Boolean(c) => c.player,
            DecisionContext::Number(c) => c.player,
            DecisionContext::SelectObjects(c) => c.player,
            DecisionContext::SelectOptions(c) => c.player,
            DecisionContext::Order(c) => c.player,
            DecisionContext::Targets(c) => c.player,
        }
    }
}

// ============================================================================
// Game progress
// ============================================================================

/// Result of advancing the game.
#[derive(Debug, Clone)]
pub enum GameProgress {
    /// A player decision is required before the game can continue.
    NeedsDecision(DecisionContext),
    /// Current phase has ended, game can continue.
    Continue,
    /// A Chase entry resolved; priority restarts with the active player.
    ChaseResolved,
    /// The battle advanced one step; priority restarts.
    BattleAdvanced,
    /// Game has ended.
    GameOver(GameResult),
}

/// Result of a completed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameResult {
    Winner(PlayerId),
    Draw,
}

// ============================================================================
// Error types
// ============================================================================

/// Error when applying a player response over the suspension surface.
///
/// The pending decision remains pending; no state was mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("no decision is pending")]
    NoDecisionPending,
    #[error("response type doesn't match the pending decision")]
    WrongResponseType,
    #[error("illegal choice: {0}")]
    IllegalChoice(String),
    #[error("invalid targets: {0}")]
    InvalidTargets(String),
}

// ============================================================================
// Decision maker trait
// ============================================================================

/// Something that can make player decisions: a UI bridge, an AI, or a test
/// script. Default implementations give deterministic minimal behavior.
pub trait DecisionMaker {
    /// Called when a player auto-passes (had no meaningful action).
    fn on_auto_pass(&mut self, _game: &GameState, _player: PlayerId) {}

    /// Choose an action with priority.
    fn decide_priority_action(&mut self, _game: &GameState, _ctx: &PriorityContext) -> LegalAction {
        LegalAction::PassPriority
    }

    /// Boolean decisions ("you may ...").
    fn decide_boolean(&mut self, _game: &GameState, _ctx: &BooleanContext) -> bool {
        false
    }

    /// Number selection (X value).
    fn decide_number(&mut self, _game: &GameState, ctx: &NumberContext) -> u32 {
        ctx.min
    }

    /// Object selection. Returns IDs of selected objects.
    fn decide_objects(&mut self, _game: &GameState, ctx: &SelectObjectsContext) -> Vec<ObjectId> {
        ctx.candidates.iter().copied().take(ctx.min).collect()
    }

    /// Option selection (modes, replacement order). Returns indices.
    fn decide_options(&mut self, _game: &GameState, ctx: &SelectOptionsContext) -> Vec<usize> {
        (0..ctx.options.len()).take(ctx.min).collect()
    }

    /// Ordering. Returns a permutation of `0..items.len()`.
    fn decide_order(&mut self, _game: &GameState, ctx: &OrderContext) -> Vec<usize> {
        (0..ctx.items.len()).collect()
    }

    /// Target selection. Returns one flat list, requirement by requirement.
    fn decide_targets(&mut self, _game: &GameState, ctx: &TargetsContext) -> Vec<Target> {
        let mut targets = Vec::new();
        for req in &ctx.requirements {
            targets.extend(req.legal_targets.iter().copied().take(req.min));
        }
        targets
    }
}

/// Decision maker that always passes and declines. Used for settling state
/// where no meaningful decisions arise, and as the test default.
pub struct AutoPassDecisionMaker;

impl DecisionMaker for AutoPassDecisionMaker {}

/// Scripted decision maker for tests: plays queued priority actions in order,
/// then passes forever. Targets default to the first legal choice.
#[derive(Default)]
pub struct ScriptedDecisionMaker {
    pub actions: std::collections::VecDeque<LegalAction>,
    /// Scripted answers for ordering decisions, consumed in order.
    pub orders: std::collections::VecDeque<Vec<usize>>,
    /// Scripted answers for option selections, consumed in order.
    pub options: std::collections::VecDeque<Vec<usize>>,
    /// Scripted answers for target selections, consumed in order.
    pub targets: std::collections::VecDeque<Vec<Target>>,
}

impl ScriptedDecisionMaker {
    pub fn new(actions: Vec<LegalAction>) -> Self {
        Self {
            actions: actions.into(),
            ..Default::default()
        }
    }

    pub fn with_targets(mut self, targets: Vec<Vec<Target>>) -> Self {
        self.targets = targets.into();
        self
    }

    pub fn with_orders(mut self, orders: Vec<Vec<usize>>) -> Self {
        self.orders = orders.into();
        self
    }

    pub fn with_options(mut self, options: Vec<Vec<usize>>) -> Self {
        self.options = options.into();
        self
    }
}

impl DecisionMaker for ScriptedDecisionMaker {
    fn decide_priority_action(&mut self, _game: &GameState, ctx: &PriorityContext) -> LegalAction {
        // Only play the next scripted action when it is currently legal;
        // otherwise wait (pass).
        if let Some(next) = self.actions.front()
            && ctx.actions.contains(next)
        {
            return self.actions.pop_front().unwrap();
        }
        LegalAction::PassPriority
    }

    fn decide_order(&mut self, _game: &GameState, ctx: &OrderContext) -> Vec<usize> {
        self.orders
            .pop_front()
            .unwrap_or_else(|| (0..ctx.items.len()).collect())
    }

    fn decide_options(&mut self, _game: &GameState, ctx: &SelectOptionsContext) -> Vec<usize> {
        self.options
            .pop_front()
            .unwrap_or_else(|| (0..ctx.options.len()).take(ctx.min).collect())
    }

    fn decide_targets(&mut self, _game: &GameState, ctx: &TargetsContext) -> Vec<Target> {
        if let Some(scripted) = self.targets.pop_front() {
            return scripted;
        }
        let mut targets = Vec::new();
        for req in &ctx.requirements {
            targets.extend(req.legal_targets.iter().copied().take(req.min.max(1)));
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decision_maker_passes() {
        let game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let mut dm = AutoPassDecisionMaker;
        let ctx = PriorityContext {
            player: game.turn_order[0],
            actions: vec![LegalAction::PassPriority, LegalAction::CallStone],
        };
        assert_eq!(
            dm.decide_priority_action(&game, &ctx),
            LegalAction::PassPriority
        );
    }

    #[test]
    fn test_scripted_waits_for_legality() {
        let game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let mut dm = ScriptedDecisionMaker::new(vec![LegalAction::CallStone]);

        let without = PriorityContext {
            player: game.turn_order[0],
            actions: vec![LegalAction::PassPriority],
        };
        assert_eq!(
            dm.decide_priority_action(&game, &without),
            LegalAction::PassPriority
        );

        let with = PriorityContext {
            player: game.turn_order[0],
            actions: vec![LegalAction::PassPriority, LegalAction::CallStone],
        };
        assert_eq!(dm.decide_priority_action(&game, &with), LegalAction::CallStone);
        // Consumed.
        assert_eq!(
            dm.decide_priority_action(&game, &with),
            LegalAction::PassPriority
        );
    }

    #[test]
    fn test_default_number_is_minimum() {
        let game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let mut dm = AutoPassDecisionMaker;
        let ctx = NumberContext {
            player: game.turn_order[0],
            prompt: "choose X".into(),
            min: 2,
            max: 10,
        };
        assert_eq!(dm.decide_number(&game, &ctx), 2);
    }
}
