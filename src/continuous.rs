//! Continuous effects and the layer system.
//!
//! Every query for an object's current characteristics folds the active
//! continuous effects over its base definition, in fixed layer order. Nothing
//! is cached on the object: the fold produces a transient
//! [`CalculatedCharacteristics`] view, so there is no stale state to
//! invalidate after a zone change or effect expiry.

use std::collections::HashMap;

use crate::ability::Ability;
use crate::effect::{Until, Value};
use crate::error::ConfigurationError;
use crate::filter::ObjectFilter;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::object::{CounterType, Object};
use crate::types::{Attribute, AttributeSet, CardType, Keyword, KeywordSet, Race};
use crate::zone::Zone;

/// Application layers, in order. Stats (layer 6) has set and modify sublayers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Copy,
    Control,
    Text,
    Type,
    Attribute,
    Stats,
    Keyword,
    Ability,
    Rules,
}

impl Layer {
    pub const ALL: [Layer; 9] = [
        Layer::Copy,
        Layer::Control,
        Layer::Text,
        Layer::Type,
        Layer::Attribute,
        Layer::Stats,
        Layer::Keyword,
        Layer::Ability,
        Layer::Rules,
    ];

    pub fn number(self) -> u8 {
        match self {
            Layer::Copy => 1,
            Layer::Control => 2,
            Layer::Text => 3,
            Layer::Type => 4,
            Layer::Attribute => 5,
            Layer::Stats => 6,
            Layer::Keyword => 7,
            Layer::Ability => 8,
            Layer::Rules => 9,
        }
    }

    pub fn from_number(n: u8) -> Option<Layer> {
        match n {
            1 => Some(Layer::Copy),
            2 => Some(Layer::Control),
            3 => Some(Layer::Text),
            4 => Some(Layer::Type),
            5 => Some(Layer::Attribute),
            6 => Some(Layer::Stats),
            7 => Some(Layer::Keyword),
            8 => Some(Layer::Ability),
            9 => Some(Layer::Rules),
            _ => None,
        }
    }
}

/// Sublayers of the stats layer: setting applies before modifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatSublayer {
    Set,
    Modify,
}

/// What a continuous effect does to the characteristics view.
///
/// Each variant belongs to exactly one layer; the effect's declared layer is
/// validated against this at registration.
#[derive(Debug, Clone, PartialEq)]
pub enum Modification {
    /// Layer 1: the object has the characteristics of another object's
    /// definition.
    CopyCharacteristics(ObjectId),
    /// Layer 2: control change.
    SetController(PlayerId),
    /// Layer 3: text change, expressed as a race-word swap.
    ChangeRaceText { from: Race, to: Race },
    /// Layer 4: the object becomes this card type.
    SetCardType(CardType),
    /// Layer 5.
    SetAttribute(Attribute),
    /// Layer 5.
    AddAttribute(Attribute),
    /// Layer 6, set sublayer. Values may be computed from board state.
    SetStats { atk: Value, def: Value },
    /// Layer 6, modify sublayer.
    ModifyStats { atk: i32, def: i32 },
    /// Layer 7.
    GrantKeyword(Keyword),
    /// Layer 7.
    RemoveKeyword(Keyword),
    /// Layer 8.
    GrantAbility(Box<Ability>),
    /// Layer 8.
    RemoveAllAbilities,
    /// Layer 9: the object does not recover during its controller's recovery
    /// phase.
    DoesntRecover,
}

impl Modification {
    pub fn layer(&self) -> Layer {
        match self {
            Modification::CopyCharacteristics(_) => Layer::Copy,
            Modification::SetController(_) => Layer::Control,
            Modification::ChangeRaceText { .. } => Layer::Text,
            Modification::SetCardType(_) => Layer::Type,
            Modification::SetAttribute(_) | Modification::AddAttribute(_) => Layer::Attribute,
            Modification::SetStats { .. } | Modification::ModifyStats { .. } => Layer::Stats,
            Modification::GrantKeyword(_) | Modification::RemoveKeyword(_) => Layer::Keyword,
            Modification::GrantAbility(_) | Modification::RemoveAllAbilities => Layer::Ability,
            Modification::DoesntRecover => Layer::Rules,
        }
    }

    pub fn stat_sublayer(&self) -> Option<StatSublayer> {
        match self {
            Modification::SetStats { .. } => Some(StatSublayer::Set),
            Modification::ModifyStats { .. } => Some(StatSublayer::Modify),
            _ => None,
        }
    }
}

/// What a continuous effect applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectTarget {
    /// The effect's own source.
    Source,
    /// Specific objects captured when the effect was created.
    Objects(Vec<ObjectId>),
    /// Every object matching the filter.
    Matching(ObjectFilter),
}

/// Whether an effect comes from a static ability (regenerated every state
/// refresh) or from a resolved spell/ability (persists until its duration
/// ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectSourceType {
    StaticAbility,
    Resolution,
}

/// Unique identifier for a registered continuous effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuousEffectId(pub u64);

/// A registered continuous effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousEffect {
    pub id: ContinuousEffectId,
    pub source: ObjectId,
    pub controller: PlayerId,
    pub modification: Modification,
    pub target: EffectTarget,
    /// Monotonic registration timestamp, the in-layer tiebreak.
    pub timestamp: u64,
    pub duration: Until,
    pub source_type: EffectSourceType,
    /// Explicit dependency hints: effects that must be applied before this
    /// one when they share a layer.
    pub depends_on: Vec<ContinuousEffectId>,
    /// Turn on which an end-of-turn effect expires.
    pub expires_end_of_turn: u32,
}

/// Authoring-facing definition of a continuous effect.
///
/// Carries the declared layer number so malformed definitions can be rejected
/// at registration rather than silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousEffectDef {
    pub layer: u8,
    pub modification: Modification,
    pub target: EffectTarget,
    pub duration: Until,
    pub depends_on: Vec<ContinuousEffectId>,
}

impl ContinuousEffectDef {
    pub fn new(modification: Modification, target: EffectTarget, duration: Until) -> Self {
        Self {
            layer: modification.layer().number(),
            modification,
            target,
            duration,
            depends_on: Vec::new(),
        }
    }

    pub fn with_declared_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn depends_on(mut self, id: ContinuousEffectId) -> Self {
        self.depends_on.push(id);
        self
    }
}

/// Registry of continuous effects.
#[derive(Debug, Clone, Default)]
pub struct ContinuousEffectManager {
    effects: Vec<ContinuousEffect>,
    next_id: u64,
}

impl ContinuousEffectManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> &[ContinuousEffect] {
        &self.effects
    }

    fn register(
        &mut self,
        def: ContinuousEffectDef,
        source: ObjectId,
        controller: PlayerId,
        source_type: EffectSourceType,
        timestamp: u64,
        current_turn: u32,
    ) -> Result<ContinuousEffectId, ConfigurationError> {
        let Some(declared) = Layer::from_number(def.layer) else {
            return Err(ConfigurationError::InvalidLayer {
                source_id: source,
                declared: def.layer,
            });
        };
        let expected = def.modification.layer();
        if declared != expected {
            return Err(ConfigurationError::LayerMismatch {
                source_id: source,
                declared: def.layer,
                expected: expected.number(),
            });
        }

        let id = ContinuousEffectId(self.next_id);
        self.next_id += 1;
        self.effects.push(ContinuousEffect {
            id,
            source,
            controller,
            modification: def.modification,
            target: def.target,
            timestamp,
            duration: def.duration,
            source_type,
            depends_on: def.depends_on,
            expires_end_of_turn: current_turn,
        });
        Ok(id)
    }

    /// Register an effect generated from a static ability. These are cleared
    /// and regenerated on every state refresh.
    pub fn register_static(
        &mut self,
        def: ContinuousEffectDef,
        source: ObjectId,
        controller: PlayerId,
        timestamp: u64,
    ) -> Result<ContinuousEffectId, ConfigurationError> {
        self.register(
            def,
            source,
            controller,
            EffectSourceType::StaticAbility,
            timestamp,
            0,
        )
    }

    /// Register an effect created by a resolved spell or ability.
    pub fn register_resolution(
        &mut self,
        def: ContinuousEffectDef,
        source: ObjectId,
        controller: PlayerId,
        timestamp: u64,
        current_turn: u32,
    ) -> Result<ContinuousEffectId, ConfigurationError> {
        self.register(
            def,
            source,
            controller,
            EffectSourceType::Resolution,
            timestamp,
            current_turn,
        )
    }

    pub fn remove(&mut self, id: ContinuousEffectId) {
        self.effects.retain(|e| e.id != id);
    }

    pub fn remove_effects_from_source(&mut self, source: ObjectId) {
        self.effects.retain(|e| e.source != source);
    }

    /// Clear all static-ability effects before regeneration.
    pub fn clear_static_effects(&mut self) {
        self.effects
            .retain(|e| e.source_type == EffectSourceType::Resolution);
    }

    /// Remove until-end-of-turn effects registered on or before `turn`.
    pub fn remove_end_of_turn_effects(&mut self, turn: u32) {
        self.effects.retain(|e| {
            !(e.duration == Until::EndOfTurn && e.expires_end_of_turn <= turn)
        });
    }
}

/// The transient effective view of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedCharacteristics {
    pub name: String,
    pub card_type: CardType,
    pub attributes: AttributeSet,
    pub races: Vec<Race>,
    pub keywords: KeywordSet,
    pub atk: i32,
    pub def: i32,
    pub controller: PlayerId,
    pub abilities: Vec<Ability>,
    /// Layer 9: set when the object is denied its recovery-phase recovery.
    pub doesnt_recover: bool,
}

impl CalculatedCharacteristics {
    fn from_base(obj: &Object) -> Self {
        Self {
            name: obj.definition.name.clone(),
            card_type: obj.definition.card_type,
            attributes: AttributeSet::from_attribute(obj.definition.attribute),
            races: obj.definition.races.clone(),
            keywords: obj.definition.keywords,
            atk: obj.base_atk(),
            def: obj.base_def(),
            controller: obj.controller,
            abilities: obj.abilities.clone(),
            doesnt_recover: false,
        }
    }

    pub fn has_keyword(&self, keyword: Keyword) -> bool {
        self.keywords.contains(keyword)
    }
}

/// Compute the effective characteristics of an object by folding all active
/// continuous effects over its base definition in layer order.
///
/// Returns `None` when the object does not exist.
pub fn calculate_characteristics(
    game: &GameState,
    object_id: ObjectId,
) -> Option<CalculatedCharacteristics> {
    let obj = game.object(object_id)?;
    let mut chars = CalculatedCharacteristics::from_base(obj);

    // Only objects in play pick up board-wide continuous effects; cards in
    // other zones show their printed characteristics.
    let active: Vec<&ContinuousEffect> = game
        .continuous_effects
        .effects()
        .iter()
        .filter(|e| effect_is_active(game, e))
        .collect();

    let mut by_layer: HashMap<Layer, Vec<&ContinuousEffect>> = HashMap::new();
    for effect in active {
        by_layer.entry(effect.modification.layer()).or_default().push(effect);
    }

    for layer in Layer::ALL {
        let Some(effects) = by_layer.get(&layer) else {
            // Counters fold at the end of the stats layer even when no stats
            // effects are registered.
            if layer == Layer::Stats {
                apply_stat_counters(obj, &mut chars);
            }
            continue;
        };

        let ordered = crate::dependency::sort_layer_effects(effects);
        for effect in ordered {
            if effect_applies_to(game, effect, object_id, obj, &chars) {
                apply_modification(game, effect, obj, &mut chars);
            }
        }

        if layer == Layer::Stats {
            apply_stat_counters(obj, &mut chars);
        }
    }

    Some(chars)
}

fn effect_is_active(game: &GameState, effect: &ContinuousEffect) -> bool {
    match effect.duration {
        Until::SourceLeavesField => game
            .object(effect.source)
            .is_some_and(|source| source.zone == Zone::Field || source.zone == Zone::RulerArea),
        Until::EndOfTurn | Until::Permanently => true,
    }
}

fn effect_applies_to(
    game: &GameState,
    effect: &ContinuousEffect,
    object_id: ObjectId,
    obj: &Object,
    chars: &CalculatedCharacteristics,
) -> bool {
    // Board-wide effects only reach objects in play.
    if obj.zone != Zone::Field && !matches!(effect.target, EffectTarget::Objects(_)) {
        return false;
    }

    match &effect.target {
        EffectTarget::Source => effect.source == object_id,
        EffectTarget::Objects(ids) => ids.contains(&object_id),
        EffectTarget::Matching(filter) => {
            filter_matches_in_progress(game, filter, obj, chars, effect.controller)
        }
    }
}

/// Filter evaluation against the in-progress view, used inside the fold so a
/// filter on a later layer sees the output of earlier layers without
/// re-entering the fold.
fn filter_matches_in_progress(
    game: &GameState,
    filter: &ObjectFilter,
    obj: &Object,
    chars: &CalculatedCharacteristics,
    source_controller: PlayerId,
) -> bool {
    let expected_zone = filter.zone.unwrap_or(Zone::Field);
    if obj.zone != expected_zone {
        return false;
    }
    if let Some(specific) = filter.specific
        && specific != obj.id
    {
        return false;
    }

    match filter.controller {
        crate::filter::ControllerRelation::Any => {}
        crate::filter::ControllerRelation::You => {
            if chars.controller != source_controller {
                return false;
            }
        }
        crate::filter::ControllerRelation::Opponent => {
            if chars.controller == source_controller {
                return false;
            }
        }
    }

    if !filter.card_types.is_empty() && !filter.card_types.contains(&chars.card_type) {
        return false;
    }
    if !filter.attributes.is_empty()
        && !filter.attributes.iter().any(|&a| chars.attributes.contains(a))
    {
        return false;
    }
    if !filter.races.is_empty() && !filter.races.iter().any(|r| chars.races.contains(r)) {
        return false;
    }
    if let Some(keyword) = filter.has_keyword
        && !chars.keywords.contains(keyword)
    {
        return false;
    }
    if let Some(keyword) = filter.lacks_keyword
        && chars.keywords.contains(keyword)
    {
        return false;
    }
    if let Some(cmp) = filter.atk
        && !cmp.matches(chars.atk)
    {
        return false;
    }
    if let Some(cmp) = filter.def
        && !cmp.matches(chars.def)
    {
        return false;
    }
    if let Some(max_cost) = filter.max_total_cost
        && obj.definition.cost.total() > max_cost
    {
        return false;
    }
    if let Some(rested) = filter.rested
        && obj.rested != rested
    {
        return false;
    }
    if let Some(has_damage) = filter.has_damage
        && (obj.damage > 0) != has_damage
    {
        return false;
    }
    if let Some(is_token) = filter.is_token
        && obj.is_token() != is_token
    {
        return false;
    }
    let _ = game;
    true
}

fn apply_modification(
    game: &GameState,
    effect: &ContinuousEffect,
    obj: &Object,
    chars: &mut CalculatedCharacteristics,
) {
    match &effect.modification {
        Modification::CopyCharacteristics(copied) => {
            if let Some(copied_obj) = game.object(*copied) {
                let def = &copied_obj.definition;
                chars.name = def.name.clone();
                chars.card_type = def.card_type;
                chars.attributes = AttributeSet::from_attribute(def.attribute);
                chars.races = def.races.clone();
                chars.keywords = def.keywords;
                chars.atk = def.atk.unwrap_or(0);
                chars.def = def.def.unwrap_or(0);
                chars.abilities = def.abilities.clone();
            }
        }
        Modification::SetController(player) => {
            chars.controller = *player;
        }
        Modification::ChangeRaceText { from, to } => {
            for race in chars.races.iter_mut() {
                if race == from {
                    *race = *to;
                }
            }
        }
        Modification::SetCardType(card_type) => {
            chars.card_type = *card_type;
        }
        Modification::SetAttribute(attribute) => {
            chars.attributes = AttributeSet::from_attribute(*attribute);
        }
        Modification::AddAttribute(attribute) => {
            chars.attributes = chars.attributes.with(*attribute);
        }
        Modification::SetStats { atk, def } => {
            chars.atk = resolve_stat_value(game, atk, effect.controller);
            chars.def = resolve_stat_value(game, def, effect.controller);
        }
        Modification::ModifyStats { atk, def } => {
            chars.atk += atk;
            chars.def += def;
        }
        Modification::GrantKeyword(keyword) => {
            chars.keywords = chars.keywords.with(*keyword);
        }
        Modification::RemoveKeyword(keyword) => {
            chars.keywords = chars.keywords.without(*keyword);
        }
        Modification::GrantAbility(ability) => {
            chars.abilities.push((**ability).clone());
        }
        Modification::RemoveAllAbilities => {
            chars.abilities.clear();
        }
        Modification::DoesntRecover => {
            chars.doesnt_recover = true;
        }
    }
    let _ = obj;
}

/// Stat values inside continuous effects count against base characteristics
/// so the fold never re-enters itself.
fn resolve_stat_value(game: &GameState, value: &Value, controller: PlayerId) -> i32 {
    match value {
        Value::Fixed(n) => *n,
        Value::X => 0,
        Value::CountMatching { filter, per } => {
            let count = game
                .field_object_ids()
                .iter()
                .filter(|&&id| base_filter_match(game, filter, id, controller))
                .count() as i32;
            count * per
        }
    }
}

fn base_filter_match(
    game: &GameState,
    filter: &ObjectFilter,
    object_id: ObjectId,
    source_controller: PlayerId,
) -> bool {
    let Some(obj) = game.object(object_id) else {
        return false;
    };
    let base = CalculatedCharacteristics::from_base(obj);
    filter_matches_in_progress(game, filter, obj, &base, source_controller)
}

fn apply_stat_counters(obj: &Object, chars: &mut CalculatedCharacteristics) {
    let plus = obj.counters_of(CounterType::PlusHundred) as i32;
    let minus = obj.counters_of(CounterType::MinusHundred) as i32;
    chars.atk += (plus - minus) * 100;
    chars.def += (plus - minus) * 100;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::ids::CardId;

    fn game_with_bear() -> (GameState, ObjectId) {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let bear = CardBuilder::new(CardId::from_raw(1), "Guardian of Tower")
            .card_type(CardType::Resonator)
            .attribute(Attribute::Light)
            .stats(400, 600)
            .build();
        let id = game.create_object_from_card(&bear, alice, Zone::Field);
        (game, id)
    }

    #[test]
    fn test_base_characteristics_without_effects() {
        let (game, id) = game_with_bear();
        let chars = calculate_characteristics(&game, id).unwrap();
        assert_eq!(chars.atk, 400);
        assert_eq!(chars.def, 600);
        assert!(chars.attributes.contains(Attribute::Light));
    }

    #[test]
    fn test_layer_numbers_round_trip() {
        for layer in Layer::ALL {
            assert_eq!(Layer::from_number(layer.number()), Some(layer));
        }
        assert_eq!(Layer::from_number(0), None);
        assert_eq!(Layer::from_number(10), None);
    }

    #[test]
    fn test_invalid_layer_rejected_at_registration() {
        let (mut game, id) = game_with_bear();
        let controller = game.turn_order[0];
        let ts = game.ids.next_timestamp();

        let def = ContinuousEffectDef::new(
            Modification::ModifyStats { atk: 100, def: 100 },
            EffectTarget::Source,
            Until::EndOfTurn,
        )
        .with_declared_layer(12);

        let err = game
            .continuous_effects
            .register_resolution(def, id, controller, ts, 1)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidLayer { declared: 12, .. }));
        assert!(game.continuous_effects.effects().is_empty());
    }

    #[test]
    fn test_layer_mismatch_rejected() {
        let (mut game, id) = game_with_bear();
        let controller = game.turn_order[0];
        let ts = game.ids.next_timestamp();

        let def = ContinuousEffectDef::new(
            Modification::GrantKeyword(Keyword::Flying),
            EffectTarget::Source,
            Until::EndOfTurn,
        )
        .with_declared_layer(6);

        let err = game
            .continuous_effects
            .register_resolution(def, id, controller, ts, 1)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::LayerMismatch { declared: 6, expected: 7, .. }));
    }

    #[test]
    fn test_set_then_modify_sublayer_order() {
        let (mut game, id) = game_with_bear();
        let controller = game.turn_order[0];

        // Register the modifier first: set must still apply before modify.
        let ts1 = game.ids.next_timestamp();
        game.continuous_effects
            .register_resolution(
                ContinuousEffectDef::new(
                    Modification::ModifyStats { atk: 200, def: 200 },
                    EffectTarget::Source,
                    Until::EndOfTurn,
                ),
                id,
                controller,
                ts1,
                1,
            )
            .unwrap();

        let ts2 = game.ids.next_timestamp();
        game.continuous_effects
            .register_resolution(
                ContinuousEffectDef::new(
                    Modification::SetStats {
                        atk: Value::fixed(100),
                        def: Value::fixed(100),
                    },
                    EffectTarget::Source,
                    Until::EndOfTurn,
                ),
                id,
                controller,
                ts2,
                1,
            )
            .unwrap();

        let chars = calculate_characteristics(&game, id).unwrap();
        assert_eq!(chars.atk, 300);
        assert_eq!(chars.def, 300);
    }

    #[test]
    fn test_counters_fold_after_stats_layer() {
        let (mut game, id) = game_with_bear();
        game.object_mut(id)
            .unwrap()
            .add_counters(CounterType::PlusHundred, 2);

        let chars = calculate_characteristics(&game, id).unwrap();
        assert_eq!(chars.atk, 600);
        assert_eq!(chars.def, 800);
    }

    #[test]
    fn test_effect_expires_with_source() {
        let (mut game, id) = game_with_bear();
        let alice = game.turn_order[0];
        let anthem_def = CardBuilder::new(CardId::from_raw(9), "Banner of Light")
            .card_type(CardType::AdditionField)
            .build();
        let anthem = game.create_object_from_card(&anthem_def, alice, Zone::Field);

        let ts = game.ids.next_timestamp();
        game.continuous_effects
            .register_resolution(
                ContinuousEffectDef::new(
                    Modification::ModifyStats { atk: 200, def: 200 },
                    EffectTarget::Matching(ObjectFilter::resonator()),
                    Until::SourceLeavesField,
                ),
                anthem,
                alice,
                ts,
                1,
            )
            .unwrap();

        let boosted = calculate_characteristics(&game, id).unwrap();
        assert_eq!(boosted.atk, 600);

        // Source leaves the field: the effect stops applying.
        game.object_mut(anthem).unwrap().zone = Zone::Graveyard;
        let plain = calculate_characteristics(&game, id).unwrap();
        assert_eq!(plain.atk, 400);
    }
}
