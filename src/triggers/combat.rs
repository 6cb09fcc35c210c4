//! Battle and state-change triggers.

use crate::events::EventKind;
use crate::events::cards::DrawEvent;
use crate::events::combat::{
    AttackDeclaredEvent, BlockDeclaredEvent, RecoverEvent, RestEvent, StoneCalledEvent,
};
use crate::filter::PlayerFilter;
use crate::game_event::DamageTarget;

use super::matcher_trait::{TriggerContext, TriggerMatcher};
use super::trigger_event::TriggerEvent;

/// "When this card attacks" / "whenever a J/resonator attacks you".
#[derive(Debug, Clone, PartialEq)]
pub struct AttackTrigger {
    /// Only the trigger's own source attacking matches.
    pub this_attacks: bool,
    /// Only attacks against the trigger's controller match.
    pub attacks_you: bool,
}

impl AttackTrigger {
    pub fn this_attacks() -> Self {
        Self {
            this_attacks: true,
            attacks_you: false,
        }
    }

    pub fn attacks_you() -> Self {
        Self {
            this_attacks: false,
            attacks_you: true,
        }
    }
}

impl TriggerMatcher for AttackTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        if event.kind() != EventKind::AttackDeclared {
            return false;
        }
        let Some(attack) = event.downcast::<AttackDeclaredEvent>() else {
            return false;
        };
        if self.this_attacks && attack.attacker != ctx.source_id {
            return false;
        }
        if self.attacks_you {
            return attack.target == DamageTarget::Player(ctx.controller);
        }
        true
    }

    fn display(&self) -> String {
        if self.this_attacks {
            "when this card attacks".into()
        } else if self.attacks_you {
            "whenever a card attacks you".into()
        } else {
            "whenever a card attacks".into()
        }
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

/// "When this card blocks."
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTrigger {
    pub this_blocks: bool,
}

impl BlockTrigger {
    pub fn this_blocks() -> Self {
        Self { this_blocks: true }
    }
}

impl TriggerMatcher for BlockTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        let Some(block) = event.downcast::<BlockDeclaredEvent>() else {
            return false;
        };
        !self.this_blocks || block.blocker == ctx.source_id
    }

    fn display(&self) -> String {
        "when this card blocks".into()
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

/// "When this card is rested/recovered."
#[derive(Debug, Clone, PartialEq)]
pub struct RestRecoverTrigger {
    pub on_rest: bool,
}

impl RestRecoverTrigger {
    pub fn this_rested() -> Self {
        Self { on_rest: true }
    }

    pub fn this_recovered() -> Self {
        Self { on_rest: false }
    }
}

impl TriggerMatcher for RestRecoverTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        if self.on_rest {
            event
                .downcast::<RestEvent>()
                .is_some_and(|rest| rest.permanent == ctx.source_id)
        } else {
            event
                .downcast::<RecoverEvent>()
                .is_some_and(|recover| recover.permanent == ctx.source_id)
        }
    }

    fn display(&self) -> String {
        if self.on_rest {
            "when this card is rested".into()
        } else {
            "when this card recovers".into()
        }
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

/// "Whenever [player] calls a magic stone."
#[derive(Debug, Clone, PartialEq)]
pub struct StoneCalledTrigger {
    pub player: PlayerFilter,
}

impl StoneCalledTrigger {
    pub fn you_call_a_stone() -> Self {
        Self {
            player: PlayerFilter::You,
        }
    }
}

impl TriggerMatcher for StoneCalledTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        let Some(called) = event.downcast::<StoneCalledEvent>() else {
            return false;
        };
        self.player.matches(ctx.game, ctx.controller, called.player)
    }

    fn display(&self) -> String {
        "whenever a magic stone is called".into()
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

/// "Whenever [player] draws a card."
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTrigger {
    pub player: PlayerFilter,
}

impl DrawTrigger {
    pub fn you_draw() -> Self {
        Self {
            player: PlayerFilter::You,
        }
    }

    pub fn opponent_draws() -> Self {
        Self {
            player: PlayerFilter::Opponent,
        }
    }
}

impl TriggerMatcher for DrawTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        let Some(draw) = event.downcast::<DrawEvent>() else {
            return false;
        };
        draw.count > 0 && self.player.matches(ctx.game, ctx.controller, draw.player)
    }

    fn display(&self) -> String {
        "whenever a player draws a card".into()
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

/// Fires when any of the inner triggers fires.
#[derive(Debug, Clone)]
pub struct OrTrigger {
    pub triggers: Vec<super::Trigger>,
}

impl OrTrigger {
    pub fn new(triggers: Vec<super::Trigger>) -> Self {
        Self { triggers }
    }
}

impl TriggerMatcher for OrTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        self.triggers.iter().any(|t| t.matches(event, ctx))
    }

    fn display(&self) -> String {
        self.triggers
            .iter()
            .map(|t| t.display())
            .collect::<Vec<_>>()
            .join(" or ")
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}
