//! Static card definitions.
//!
//! A [`CardDefinition`] is the immutable, printed side of a card: name, type,
//! cost, base stats, and the structured ability data supplied by the authoring
//! collaborator. Runtime state lives on [`Object`](crate::object::Object).

use crate::ability::Ability;
use crate::effect::Effect;
use crate::ids::CardId;
use crate::target::ChooseSpec;
use crate::types::{Attribute, CardType, Keyword, KeywordSet, Race};
use crate::will::WillCost;

/// Static, immutable card definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardDefinition {
    pub id: CardId,
    pub name: String,
    pub card_type: CardType,
    pub attribute: Attribute,
    pub races: Vec<Race>,
    pub cost: WillCost,
    /// Base ATK for resonators and J-Rulers.
    pub atk: Option<i32>,
    /// Base DEF for resonators and J-Rulers.
    pub def: Option<i32>,
    pub keywords: KeywordSet,
    /// Structured ability data (triggered, activated, static, will).
    pub abilities: Vec<Ability>,
    /// For chant-type cards: the target requirements chosen when playing.
    pub choices: Vec<ChooseSpec>,
    /// For chant-type cards: the effects executed on resolution.
    pub resolution_effects: Vec<Effect>,
    /// Judgment cost, for rulers with a J-Ruler side.
    pub judgment_cost: Option<WillCost>,
    /// The J-Ruler side's definition, for rulers.
    pub j_ruler_side: Option<Box<CardDefinition>>,
    /// True if this definition describes a token (not a real card).
    pub is_token: bool,
}

impl CardDefinition {
    pub fn has_race(&self, race: Race) -> bool {
        self.races.contains(&race)
    }

    /// Whether the card can be played at any priority window rather than only
    /// at main timing.
    pub fn is_instant_speed(&self) -> bool {
        self.card_type == CardType::ChantInstant || self.keywords.contains(Keyword::Quickcast)
    }
}

/// Builder for card definitions.
#[derive(Debug, Default)]
pub struct CardBuilder {
    def: CardDefinition,
}

impl CardBuilder {
    pub fn new(id: CardId, name: impl Into<String>) -> Self {
        Self {
            def: CardDefinition {
                id,
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn card_type(mut self, card_type: CardType) -> Self {
        self.def.card_type = card_type;
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.def.attribute = attribute;
        self
    }

    pub fn races(mut self, races: Vec<Race>) -> Self {
        self.def.races = races;
        self
    }

    pub fn cost(mut self, cost: WillCost) -> Self {
        self.def.cost = cost;
        self
    }

    pub fn stats(mut self, atk: i32, def: i32) -> Self {
        self.def.atk = Some(atk);
        self.def.def = Some(def);
        self
    }

    pub fn keywords(mut self, keywords: KeywordSet) -> Self {
        self.def.keywords = keywords;
        self
    }

    pub fn keyword(mut self, keyword: Keyword) -> Self {
        self.def.keywords = self.def.keywords.with(keyword);
        self
    }

    pub fn ability(mut self, ability: Ability) -> Self {
        self.def.abilities.push(ability);
        self
    }

    pub fn abilities(mut self, abilities: Vec<Ability>) -> Self {
        self.def.abilities = abilities;
        self
    }

    pub fn targets(mut self, choices: Vec<ChooseSpec>) -> Self {
        self.def.choices = choices;
        self
    }

    pub fn resolution(mut self, effects: Vec<Effect>) -> Self {
        self.def.resolution_effects = effects;
        self
    }

    pub fn judgment(mut self, cost: WillCost, j_ruler_side: CardDefinition) -> Self {
        self.def.judgment_cost = Some(cost);
        self.def.j_ruler_side = Some(Box::new(j_ruler_side));
        self
    }

    pub fn token(mut self) -> Self {
        self.def.is_token = true;
        self
    }

    pub fn build(self) -> CardDefinition {
        self.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_definition() {
        let card = CardBuilder::new(CardId::from_raw(7), "Lancelot, the Knight of Mad Demon")
            .card_type(CardType::Resonator)
            .attribute(Attribute::Darkness)
            .races(vec![Race::Knight])
            .cost(WillCost::of(Attribute::Darkness, 2))
            .stats(1000, 1000)
            .keyword(Keyword::Swiftness)
            .build();

        assert_eq!(card.name, "Lancelot, the Knight of Mad Demon");
        assert_eq!(card.card_type, CardType::Resonator);
        assert!(card.has_race(Race::Knight));
        assert!(card.keywords.contains(Keyword::Swiftness));
        assert_eq!(card.cost.total(), 3);
        assert!(!card.is_token);
    }

    #[test]
    fn test_instant_speed() {
        let chant = CardBuilder::new(CardId::from_raw(1), "Rapid Growth")
            .card_type(CardType::ChantInstant)
            .build();
        assert!(chant.is_instant_speed());

        let quickcast = CardBuilder::new(CardId::from_raw(2), "Sudden Gust")
            .card_type(CardType::Chant)
            .keyword(Keyword::Quickcast)
            .build();
        assert!(quickcast.is_instant_speed());

        let slow = CardBuilder::new(CardId::from_raw(3), "Ancient Rites")
            .card_type(CardType::Chant)
            .build();
        assert!(!slow.is_instant_speed());
    }
}
