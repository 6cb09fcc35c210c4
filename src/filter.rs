//! Object and player predicates.
//!
//! Filters are the data-level predicates the authoring collaborator supplies:
//! targeting requirements, trigger subjects, and continuous-effect scopes are
//! all expressed as an [`ObjectFilter`]. Numeric comparisons are evaluated
//! against *calculated* characteristics, never base values.

use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::types::{Attribute, CardType, Keyword, Race};
use crate::zone::Zone;

/// Relation between the filtered object's controller and the filter's
/// reference player (usually the source's controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerRelation {
    #[default]
    Any,
    You,
    Opponent,
}

/// Numeric comparison on a calculated stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast(i32),
    AtMost(i32),
    Exactly(i32),
}

impl Comparison {
    pub fn matches(self, value: i32) -> bool {
        match self {
            Comparison::AtLeast(n) => value >= n,
            Comparison::AtMost(n) => value <= n,
            Comparison::Exactly(n) => value == n,
        }
    }
}

/// Which players a player-scoped predicate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerFilter {
    #[default]
    Any,
    You,
    Opponent,
    Active,
    NonActive,
}

impl PlayerFilter {
    /// Check whether `player` satisfies this filter from the perspective of
    /// `you`.
    pub fn matches(self, game: &GameState, you: PlayerId, player: PlayerId) -> bool {
        match self {
            PlayerFilter::Any => true,
            PlayerFilter::You => player == you,
            PlayerFilter::Opponent => player != you,
            PlayerFilter::Active => player == game.turn.active_player,
            PlayerFilter::NonActive => player != game.turn.active_player,
        }
    }
}

/// A composable predicate over objects.
///
/// Empty vectors mean "no restriction". All set restrictions must hold for the
/// filter to match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectFilter {
    /// Zone restriction; `None` means field only when used for targeting.
    pub zone: Option<Zone>,
    pub controller: ControllerRelation,
    pub card_types: Vec<CardType>,
    pub attributes: Vec<Attribute>,
    pub races: Vec<Race>,
    pub has_keyword: Option<Keyword>,
    pub lacks_keyword: Option<Keyword>,
    pub atk: Option<Comparison>,
    pub def: Option<Comparison>,
    pub max_total_cost: Option<u32>,
    pub rested: Option<bool>,
    pub has_damage: Option<bool>,
    pub is_token: Option<bool>,
    /// Restrict to a single specific object.
    pub specific: Option<ObjectId>,
    /// Set when the ability text explicitly ignores protection keywords
    /// ("target resonator with Barrier", removal that cannot be barred).
    pub bypasses_protection: bool,
}

impl ObjectFilter {
    pub fn any() -> Self {
        Self::default()
    }

    /// Any resonator.
    pub fn resonator() -> Self {
        Self {
            card_types: vec![CardType::Resonator],
            ..Default::default()
        }
    }

    /// Resonator or J-Ruler.
    pub fn combatant() -> Self {
        Self {
            card_types: vec![CardType::Resonator, CardType::JRuler],
            ..Default::default()
        }
    }

    pub fn magic_stone() -> Self {
        Self {
            card_types: vec![CardType::MagicStone, CardType::SpecialMagicStone],
            ..Default::default()
        }
    }

    pub fn addition() -> Self {
        Self {
            card_types: vec![CardType::AdditionField, CardType::AdditionResonator],
            ..Default::default()
        }
    }

    pub fn specific(id: ObjectId) -> Self {
        Self {
            specific: Some(id),
            ..Default::default()
        }
    }

    pub fn controlled_by_you(mut self) -> Self {
        self.controller = ControllerRelation::You;
        self
    }

    pub fn controlled_by_opponent(mut self) -> Self {
        self.controller = ControllerRelation::Opponent;
        self
    }

    pub fn of_race(mut self, race: Race) -> Self {
        self.races.push(race);
        self
    }

    pub fn of_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.has_keyword = Some(keyword);
        self
    }

    pub fn without_keyword(mut self, keyword: Keyword) -> Self {
        self.lacks_keyword = Some(keyword);
        self
    }

    pub fn with_atk(mut self, cmp: Comparison) -> Self {
        self.atk = Some(cmp);
        self
    }

    pub fn with_def(mut self, cmp: Comparison) -> Self {
        self.def = Some(cmp);
        self
    }

    pub fn with_total_cost_at_most(mut self, cost: u32) -> Self {
        self.max_total_cost = Some(cost);
        self
    }

    pub fn rested(mut self) -> Self {
        self.rested = Some(true);
        self
    }

    pub fn recovered(mut self) -> Self {
        self.rested = Some(false);
        self
    }

    pub fn in_zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn ignoring_protection(mut self) -> Self {
        self.bypasses_protection = true;
        self
    }

    /// Check this filter against the calculated characteristics of an object.
    ///
    /// `source_controller` is the "you" for controller relations.
    pub fn matches(
        &self,
        game: &GameState,
        object_id: ObjectId,
        source_controller: PlayerId,
    ) -> bool {
        let Some(obj) = game.object(object_id) else {
            return false;
        };

        if let Some(specific) = self.specific
            && specific != object_id
        {
            return false;
        }

        let expected_zone = self.zone.unwrap_or(Zone::Field);
        if obj.zone != expected_zone {
            return false;
        }

        let Some(chars) = game.calculated_characteristics(object_id) else {
            return false;
        };

        match self.controller {
            ControllerRelation::Any => {}
            ControllerRelation::You => {
                if chars.controller != source_controller {
                    return false;
                }
            }
            ControllerRelation::Opponent => {
                if chars.controller == source_controller {
                    return false;
                }
            }
        }

        if !self.card_types.is_empty() && !self.card_types.contains(&chars.card_type) {
            return false;
        }

        if !self.attributes.is_empty()
            && !self.attributes.iter().any(|&a| chars.attributes.contains(a))
        {
            return false;
        }

        if !self.races.is_empty() && !self.races.iter().any(|r| chars.races.contains(r)) {
            return false;
        }

        if let Some(keyword) = self.has_keyword
            && !chars.keywords.contains(keyword)
        {
            return false;
        }

        if let Some(keyword) = self.lacks_keyword
            && chars.keywords.contains(keyword)
        {
            return false;
        }

        if let Some(cmp) = self.atk
            && !cmp.matches(chars.atk)
        {
            return false;
        }

        if let Some(cmp) = self.def
            && !cmp.matches(chars.def)
        {
            return false;
        }

        if let Some(max_cost) = self.max_total_cost
            && obj.definition.cost.total() > max_cost
        {
            return false;
        }

        if let Some(rested) = self.rested
            && obj.rested != rested
        {
            return false;
        }

        if let Some(has_damage) = self.has_damage
            && (obj.damage > 0) != has_damage
        {
            return false;
        }

        if let Some(is_token) = self.is_token
            && obj.is_token() != is_token
        {
            return false;
        }

        true
    }

    /// All objects in the game matching this filter, in a deterministic order.
    pub fn collect_matching(&self, game: &GameState, source_controller: PlayerId) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = game
            .all_object_ids()
            .into_iter()
            .filter(|&id| self.matches(game, id, source_controller))
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::ids::CardId;
    use crate::will::WillCost;

    fn game_with_creatures() -> (GameState, ObjectId, ObjectId) {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];

        let knight = CardBuilder::new(CardId::from_raw(1), "Gawain, the Knight of the Sun")
            .card_type(CardType::Resonator)
            .attribute(Attribute::Light)
            .races(vec![Race::Knight])
            .cost(WillCost::of(Attribute::Light, 2))
            .stats(800, 800)
            .build();
        let beast = CardBuilder::new(CardId::from_raw(2), "Hunter in Black Forest")
            .card_type(CardType::Resonator)
            .attribute(Attribute::Darkness)
            .races(vec![Race::Beast])
            .cost(WillCost::of(Attribute::Darkness, 1))
            .stats(400, 400)
            .build();

        let a = game.create_object_from_card(&knight, alice, Zone::Field);
        let b = game.create_object_from_card(&beast, bob, Zone::Field);
        (game, a, b)
    }

    #[test]
    fn test_controller_relation() {
        let (game, a, b) = game_with_creatures();
        let alice = game.turn_order[0];

        let yours = ObjectFilter::resonator().controlled_by_you();
        assert!(yours.matches(&game, a, alice));
        assert!(!yours.matches(&game, b, alice));

        let theirs = ObjectFilter::resonator().controlled_by_opponent();
        assert!(theirs.matches(&game, b, alice));
        assert!(!theirs.matches(&game, a, alice));
    }

    #[test]
    fn test_stat_comparison_uses_calculated_values() {
        let (game, a, b) = game_with_creatures();
        let alice = game.turn_order[0];

        let big = ObjectFilter::resonator().with_atk(Comparison::AtLeast(600));
        assert!(big.matches(&game, a, alice));
        assert!(!big.matches(&game, b, alice));
    }

    #[test]
    fn test_race_and_attribute() {
        let (game, a, b) = game_with_creatures();
        let alice = game.turn_order[0];

        let knights = ObjectFilter::resonator().of_race(Race::Knight);
        assert!(knights.matches(&game, a, alice));
        assert!(!knights.matches(&game, b, alice));

        let dark = ObjectFilter::resonator().of_attribute(Attribute::Darkness);
        assert!(dark.matches(&game, b, alice));
        assert!(!dark.matches(&game, a, alice));
    }

    #[test]
    fn test_cost_restriction() {
        let (game, a, b) = game_with_creatures();
        let alice = game.turn_order[0];

        let cheap = ObjectFilter::resonator().with_total_cost_at_most(2);
        assert!(cheap.matches(&game, b, alice));
        assert!(!cheap.matches(&game, a, alice));
    }
}
