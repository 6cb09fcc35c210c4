//! Damage, life gain, and life loss triggers.

use crate::events::EventKind;
use crate::events::damage::DamageEvent;
use crate::events::life::{LifeGainEvent, LifeLossEvent};
use crate::filter::{ObjectFilter, PlayerFilter};
use crate::game_event::DamageTarget;

use super::matcher_trait::{TriggerContext, TriggerMatcher};
use super::trigger_event::TriggerEvent;

/// Who the damage in a [`DamageTrigger`] must be dealt to.
#[derive(Debug, Clone, PartialEq)]
pub enum DamageRecipient {
    /// Any player or object.
    Any,
    /// A player matching the filter.
    Player(PlayerFilter),
    /// An object matching the filter.
    Object(ObjectFilter),
    /// The trigger's own source.
    This,
}

/// "Whenever [source] deals damage [to ...]" triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageTrigger {
    /// When set, only damage dealt by the trigger's source matches.
    pub from_this: bool,
    pub recipient: DamageRecipient,
    /// Restrict to battle damage.
    pub battle_only: bool,
}

impl DamageTrigger {
    pub fn this_deals_damage() -> Self {
        Self {
            from_this: true,
            recipient: DamageRecipient::Any,
            battle_only: false,
        }
    }

    pub fn this_deals_damage_to_player() -> Self {
        Self {
            from_this: true,
            recipient: DamageRecipient::Player(PlayerFilter::Any),
            battle_only: false,
        }
    }

    pub fn this_is_dealt_damage() -> Self {
        Self {
            from_this: false,
            recipient: DamageRecipient::This,
            battle_only: false,
        }
    }

    pub fn battle_damage_to_you() -> Self {
        Self {
            from_this: false,
            recipient: DamageRecipient::Player(PlayerFilter::You),
            battle_only: true,
        }
    }
}

impl TriggerMatcher for DamageTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        if event.kind() != EventKind::Damage {
            return false;
        }
        let Some(damage) = event.downcast::<DamageEvent>() else {
            return false;
        };
        if damage.amount == 0 {
            return false;
        }
        if self.from_this && damage.source != ctx.source_id {
            return false;
        }
        if self.battle_only && !damage.is_battle {
            return false;
        }

        match &self.recipient {
            DamageRecipient::Any => true,
            DamageRecipient::This => damage.target == DamageTarget::Object(ctx.source_id),
            DamageRecipient::Player(filter) => match damage.target {
                DamageTarget::Player(player) => {
                    filter.matches(ctx.game, ctx.controller, player)
                }
                DamageTarget::Object(_) => false,
            },
            DamageRecipient::Object(filter) => match damage.target {
                DamageTarget::Object(object) => {
                    filter.matches(ctx.game, object, ctx.controller)
                }
                DamageTarget::Player(_) => false,
            },
        }
    }

    fn display(&self) -> String {
        let mut text = String::from("whenever ");
        text.push_str(if self.from_this {
            "this card deals damage"
        } else {
            "damage is dealt"
        });
        match &self.recipient {
            DamageRecipient::Player(_) => text.push_str(" to a player"),
            DamageRecipient::Object(_) => text.push_str(" to a matching card"),
            DamageRecipient::This => text.push_str(" to this card"),
            DamageRecipient::Any => {}
        }
        if self.battle_only {
            text.push_str(" in battle");
        }
        text
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}

/// "Whenever [player] gains/loses life" triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeTrigger {
    pub player: PlayerFilter,
    pub gain: bool,
}

impl LifeTrigger {
    pub fn you_gain_life() -> Self {
        Self {
            player: PlayerFilter::You,
            gain: true,
        }
    }

    pub fn you_lose_life() -> Self {
        Self {
            player: PlayerFilter::You,
            gain: false,
        }
    }

    pub fn opponent_loses_life() -> Self {
        Self {
            player: PlayerFilter::Opponent,
            gain: false,
        }
    }
}

impl TriggerMatcher for LifeTrigger {
    fn matches(&self, event: &TriggerEvent, ctx: &TriggerContext) -> bool {
        if self.gain {
            let Some(gain) = event.downcast::<LifeGainEvent>() else {
                return false;
            };
            gain.amount > 0 && self.player.matches(ctx.game, ctx.controller, gain.player)
        } else {
            let Some(loss) = event.downcast::<LifeLossEvent>() else {
                return false;
            };
            loss.amount > 0 && self.player.matches(ctx.game, ctx.controller, loss.player)
        }
    }

    fn display(&self) -> String {
        let clause = match (self.player, self.gain) {
            (PlayerFilter::You, true) => "you gain life",
            (PlayerFilter::You, false) => "you lose life",
            (PlayerFilter::Opponent, true) => "an opponent gains life",
            (PlayerFilter::Opponent, false) => "an opponent loses life",
            (_, true) => "a player gains life",
            (_, false) => "a player loses life",
        };
        format!("whenever {clause}")
    }

    fn clone_box(&self) -> Box<dyn TriggerMatcher> {
        Box::new(self.clone())
    }
}
