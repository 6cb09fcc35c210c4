//! Ability definitions.
//!
//! Cards carry their rules text as structured ability data: triggered,
//! activated, static (continuous or replacement registrations), and will
//! abilities. The engine never parses text.

use crate::continuous::Modification;
use crate::effect::Effect;
use crate::events::Matcher;
use crate::filter::ObjectFilter;
use crate::replacement::ReplacementAction;
use crate::target::ChooseSpec;
use crate::triggers::Trigger;
use crate::types::Attribute;
use crate::will::WillCost;

/// One ability on a card.
#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    pub name: String,
    pub kind: AbilityKind,
}

impl Ability {
    pub fn triggered(ability: TriggeredAbility) -> Self {
        Self {
            name: String::new(),
            kind: AbilityKind::Triggered(ability),
        }
    }

    pub fn activated(ability: ActivatedAbility) -> Self {
        Self {
            name: String::new(),
            kind: AbilityKind::Activated(ability),
        }
    }

    pub fn static_ability(ability: StaticAbility) -> Self {
        Self {
            name: String::new(),
            kind: AbilityKind::Static(ability),
        }
    }

    pub fn will(produces: Vec<Attribute>) -> Self {
        Self {
            name: String::new(),
            kind: AbilityKind::Will(WillAbility { produces }),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbilityKind {
    Triggered(TriggeredAbility),
    Activated(ActivatedAbility),
    Static(StaticAbility),
    Will(WillAbility),
}

/// "When/Whenever [trigger], [effects]".
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAbility {
    pub trigger: Trigger,
    /// Intervening-if: rechecked when the ability would resolve; a false
    /// recheck discards the ability without resolving.
    pub intervening_if: Option<InterveningIfCondition>,
    /// Target requirements chosen when the ability is put on the Chase.
    pub choices: Vec<ChooseSpec>,
    pub effects: Vec<Effect>,
    pub once_per_turn: bool,
    /// "You may" triggers ask the controller before going on the Chase.
    pub mandatory: bool,
}

impl TriggeredAbility {
    pub fn new(trigger: Trigger, effects: Vec<Effect>) -> Self {
        Self {
            trigger,
            intervening_if: None,
            choices: Vec::new(),
            effects,
            once_per_turn: false,
            mandatory: true,
        }
    }

    pub fn with_choices(mut self, choices: Vec<ChooseSpec>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_intervening_if(mut self, condition: InterveningIfCondition) -> Self {
        self.intervening_if = Some(condition);
        self
    }

    pub fn once_per_turn(mut self) -> Self {
        self.once_per_turn = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }
}

/// Conditions usable as intervening-if checks.
#[derive(Debug, Clone, PartialEq)]
pub enum InterveningIfCondition {
    /// The ability's controller has at most this much life.
    ControllerLifeAtMost(i32),
    /// The ability's controller has at least this much life.
    ControllerLifeAtLeast(i32),
    /// The ability's controller controls at least `count` objects matching.
    ControlsAtLeast { filter: ObjectFilter, count: u32 },
    /// The source is still on the field.
    SourceOnField,
}

/// "[Cost]: [effects]".
#[derive(Debug, Clone, PartialEq)]
pub struct ActivatedAbility {
    pub will_cost: WillCost,
    /// Rest the source as part of the cost.
    pub rest_cost: bool,
    pub choices: Vec<ChooseSpec>,
    pub effects: Vec<Effect>,
    /// Most activated abilities go on the Chase; will-like ones resolve
    /// immediately.
    pub uses_chase: bool,
    pub once_per_turn: bool,
    pub main_timing_only: bool,
}

impl ActivatedAbility {
    pub fn new(will_cost: WillCost, effects: Vec<Effect>) -> Self {
        Self {
            will_cost,
            rest_cost: false,
            choices: Vec::new(),
            effects,
            uses_chase: true,
            once_per_turn: false,
            main_timing_only: false,
        }
    }

    pub fn with_rest_cost(mut self) -> Self {
        self.rest_cost = true;
        self
    }

    pub fn with_choices(mut self, choices: Vec<ChooseSpec>) -> Self {
        self.choices = choices;
        self
    }

    pub fn once_per_turn(mut self) -> Self {
        self.once_per_turn = true;
        self
    }

    pub fn main_timing_only(mut self) -> Self {
        self.main_timing_only = true;
        self
    }
}

/// What a static continuous ability applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum ContinuousScope {
    /// Only the source itself.
    SelfOnly,
    /// Every object matching the filter (evaluated from the source
    /// controller's perspective).
    Matching(ObjectFilter),
}

/// A static ability: registered while the source is on the field, regenerated
/// on every state refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticAbility {
    /// A continuous characteristics modification in the layer system.
    Continuous {
        modification: Modification,
        scope: ContinuousScope,
    },
    /// A replacement-effect registration.
    Replacement {
        matcher: Matcher,
        action: ReplacementAction,
        /// Self-replacement effects only ever modify events about their own
        /// source.
        self_replacement: bool,
    },
}

/// Rest this card to produce will.
#[derive(Debug, Clone, PartialEq)]
pub struct WillAbility {
    pub produces: Vec<Attribute>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Value;
    use crate::filter::PlayerFilter;

    #[test]
    fn test_triggered_ability_builder() {
        let ability = TriggeredAbility::new(
            Trigger::this_enters_field(),
            vec![Effect::DrawCards {
                player: PlayerFilter::You,
                count: Value::fixed(1),
            }],
        )
        .once_per_turn();

        assert!(ability.mandatory);
        assert!(ability.once_per_turn);
        assert!(ability.intervening_if.is_none());
    }

    #[test]
    fn test_activated_ability_builder() {
        let ability = ActivatedAbility::new(WillCost::generic(1), vec![Effect::DestroyTargets])
            .with_rest_cost()
            .with_choices(vec![ChooseSpec::object(ObjectFilter::resonator())])
            .main_timing_only();

        assert!(ability.rest_cost);
        assert!(ability.uses_chase);
        assert!(ability.main_timing_only);
        assert_eq!(ability.choices.len(), 1);
    }
}
