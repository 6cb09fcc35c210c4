//! The game session object.
//!
//! `GameState` owns every card instance, the authoritative zone placement,
//! the Chase, the effect managers, and the observable event log. It is the
//! single mutation path: components receive `&mut GameState` from the game
//! loop and never keep state of their own between calls. There is no
//! process-wide state; two sessions fed identical inputs produce identical
//! logs.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::ability::InterveningIfCondition;
use crate::card::CardDefinition;
use crate::continuous::{CalculatedCharacteristics, ContinuousEffectManager};
use crate::effect::Effect;
use crate::game_event::EngineEvent;
use crate::ids::{IdAllocator, ObjectId, PlayerId};
use crate::object::Object;
use crate::player::Player;
use crate::replacement::ReplacementEffectManager;
use crate::snapshot::ObjectSnapshot;
use crate::target::{ChooseSpec, Target};
use crate::triggers::{DelayedTrigger, TriggerEvent};
use crate::types::{CardType, Keyword};
use crate::zone::Zone;

/// Turn phases, in official order. Battle happens during the main phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Draw,
    Recovery,
    Main,
    End,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Draw => "Draw",
            Phase::Recovery => "Recovery",
            Phase::Main => "Main",
            Phase::End => "End",
        }
    }
}

/// Turn state tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub active_player: PlayerId,
    pub priority_player: Option<PlayerId>,
    pub turn_number: u32,
    pub phase: Phase,
}

impl TurnState {
    pub fn new(active_player: PlayerId) -> Self {
        Self {
            active_player,
            priority_player: Some(active_player),
            turn_number: 1,
            phase: Phase::Draw,
        }
    }
}

/// One pending spell or ability on the Chase.
#[derive(Debug, Clone)]
pub struct ChaseEntry {
    pub object_id: ObjectId,
    pub controller: PlayerId,
    /// Targets captured when the entry was put on the Chase.
    pub targets: Vec<Target>,
    /// The target specs used to choose them, re-evaluated at resolution.
    pub choices: Vec<ChooseSpec>,
    pub x_value: Option<u32>,
    /// For triggered/activated abilities, the effects to execute. Spells
    /// resolve the effects on their own definition.
    pub ability_effects: Option<Vec<Effect>>,
    /// Whether this is an ability (triggered or activated) vs a spell.
    pub is_ability: bool,
    /// Last known state of the source when the entry was created.
    pub source_snapshot: Option<ObjectSnapshot>,
    pub source_name: String,
    /// The event that fired this triggered ability.
    pub triggering_event: Option<TriggerEvent>,
    /// Intervening-if condition rechecked at resolution time.
    pub intervening_if: Option<InterveningIfCondition>,
    /// Set for the judgment entry that flips a ruler into its J-Ruler side.
    pub is_judgment: bool,
}

impl ChaseEntry {
    pub fn spell(object_id: ObjectId, controller: PlayerId) -> Self {
        Self {
            object_id,
            controller,
            targets: Vec::new(),
            choices: Vec::new(),
            x_value: None,
            ability_effects: None,
            is_ability: false,
            source_snapshot: None,
            source_name: String::new(),
            triggering_event: None,
            intervening_if: None,
            is_judgment: false,
        }
    }

    pub fn ability(object_id: ObjectId, controller: PlayerId, effects: Vec<Effect>) -> Self {
        Self {
            ability_effects: Some(effects),
            is_ability: true,
            ..Self::spell(object_id, controller)
        }
    }

    pub fn with_targets(mut self, targets: Vec<Target>, choices: Vec<ChooseSpec>) -> Self {
        self.targets = targets;
        self.choices = choices;
        self
    }

    pub fn with_x(mut self, x: u32) -> Self {
        self.x_value = Some(x);
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_snapshot(mut self, snapshot: ObjectSnapshot) -> Self {
        self.source_snapshot = Some(snapshot);
        self
    }

    pub fn with_triggering_event(mut self, event: TriggerEvent) -> Self {
        self.triggering_event = Some(event);
        self
    }

    pub fn with_intervening_if(mut self, condition: InterveningIfCondition) -> Self {
        self.intervening_if = Some(condition);
        self
    }
}

/// Engine safety caps. All are configurable per session; overflowing any of
/// them is a [`ConfigurationError`](crate::error::ConfigurationError), which
/// signals a malformed rule set rather than a legal game state.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum state-based-action fixpoint iterations.
    pub sba_iteration_cap: u32,
    /// Maximum chained replacements applied to a single event.
    pub replacement_depth_cap: u32,
    /// Maximum rounds of triggers-enqueue-triggers per settlement.
    pub trigger_cascade_cap: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sba_iteration_cap: 100,
            replacement_depth_cap: 16,
            trigger_cascade_cap: 32,
        }
    }
}

#[derive(Debug)]
pub struct GameState {
    // Players
    pub players: Vec<Player>,
    pub turn_order: Vec<PlayerId>,

    // Objects
    objects: HashMap<ObjectId, Object>,

    // The Chase
    pub chase: Vec<ChaseEntry>,

    // Zone index for the shared field (per-player zones live on Player)
    pub field: Vec<ObjectId>,

    // Turn tracking
    pub turn: TurnState,

    // Effect managers
    pub continuous_effects: ContinuousEffectManager,
    pub replacement_effects: ReplacementEffectManager,

    // Delayed triggers waiting to fire
    pub delayed_triggers: Vec<DelayedTrigger>,

    /// Trigger events generated by mutations, drained by the game loop after
    /// each settlement step.
    pub pending_trigger_events: Vec<TriggerEvent>,

    /// Current battle, when one is underway during the main phase.
    pub battle: Option<crate::rules::combat::BattleState>,

    /// Activated abilities used this turn, for once-per-turn restrictions.
    pub activated_abilities_this_turn: HashSet<(ObjectId, usize)>,

    /// Triggered abilities that fired this turn, for once-per-turn triggers.
    pub triggers_fired_this_turn: HashSet<(ObjectId, usize)>,

    /// ID and timestamp allocation for this session.
    pub ids: IdAllocator,

    pub config: EngineConfig,

    // Observable, ordered event stream
    event_log: Vec<EngineEvent>,

    pub game_over: bool,
    pub winner: Option<PlayerId>,

    rng: StdRng,
}

impl GameState {
    /// Create a new game session. `seed` drives all shuffles, so a session is
    /// replayable from (seed, inputs).
    pub fn new(player_names: Vec<String>, starting_life: i32, seed: u64) -> Self {
        let players: Vec<Player> = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(PlayerId::from_index(i as u8), name, starting_life))
            .collect();
        let turn_order: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        let first = turn_order[0];

        Self {
            players,
            turn_order,
            objects: HashMap::new(),
            chase: Vec::new(),
            field: Vec::new(),
            turn: TurnState::new(first),
            continuous_effects: ContinuousEffectManager::new(),
            replacement_effects: ReplacementEffectManager::new(),
            delayed_triggers: Vec::new(),
            pending_trigger_events: Vec::new(),
            battle: None,
            activated_abilities_this_turn: HashSet::new(),
            triggers_fired_this_turn: HashSet::new(),
            ids: IdAllocator::new(),
            config: EngineConfig::default(),
            event_log: Vec::new(),
            game_over: false,
            winner: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    // =========================================================================
    // Players
    // =========================================================================

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn opponent_of(&self, player: PlayerId) -> PlayerId {
        self.turn_order
            .iter()
            .copied()
            .find(|&p| p != player)
            .unwrap_or(player)
    }

    pub fn players_in_game(&self) -> usize {
        self.players.iter().filter(|p| p.is_in_game()).count()
    }

    // =========================================================================
    // Objects and the zone store
    // =========================================================================

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn all_object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn field_object_ids(&self) -> Vec<ObjectId> {
        self.field.clone()
    }

    /// Instantiate a card definition into a zone. The instance gets a fresh
    /// object ID owned by this session.
    pub fn create_object_from_card(
        &mut self,
        card: &CardDefinition,
        owner: PlayerId,
        zone: Zone,
    ) -> ObjectId {
        let id = self.ids.next_object_id();
        let mut obj = Object::new(id, card.clone(), owner, zone);
        if zone == Zone::Field {
            obj.reset_on_field_entry(self.turn.turn_number);
        }
        self.objects.insert(id, obj);

        match zone {
            Zone::Field => self.field.push(id),
            Zone::RulerArea => {
                if let Some(player) = self.player_mut(owner) {
                    player.ruler = Some(id);
                }
            }
            Zone::Chase => {}
            _ => {
                if let Some(list) = self
                    .player_mut(owner)
                    .and_then(|p| p.zone_list_mut(zone))
                {
                    list.push(id);
                }
            }
        }
        id
    }

    fn remove_from_zone_containers(&mut self, id: ObjectId, zone: Zone, holder: PlayerId) {
        match zone {
            Zone::Field => self.field.retain(|&o| o != id),
            Zone::RulerArea => {
                if let Some(player) = self.player_mut(holder)
                    && player.ruler == Some(id)
                {
                    player.ruler = None;
                }
            }
            Zone::Chase => {}
            _ => {
                if let Some(list) = self
                    .player_mut(holder)
                    .and_then(|p| p.zone_list_mut(zone))
                {
                    list.retain(|&o| o != id);
                }
            }
        }
    }

    /// Move an object to a new zone. This is the only place placement
    /// changes.
    ///
    /// Tokens cease to exist when they leave the field (no graveyard copy).
    /// Returns the zone the object actually ended up in, or `None` when it
    /// ceased to exist.
    pub fn move_object(&mut self, id: ObjectId, to: Zone) -> Option<Zone> {
        let (from, owner, controller, is_token) = {
            let obj = self.object(id)?;
            (obj.zone, obj.owner, obj.controller, obj.is_token())
        };

        // Snapshot before the move for leave-zone triggers.
        let snapshot = self.snapshot_object(id);

        let from_holder = if from == Zone::Field || from == Zone::Chase {
            controller
        } else {
            owner
        };
        self.remove_from_zone_containers(id, from, from_holder);

        // Detach from whatever this was attached to.
        if let Some(host) = self.object(id).and_then(|o| o.attached_to)
            && let Some(host_obj) = self.object_mut(host)
        {
            host_obj.attachments.retain(|&a| a != id);
        }
        if from == Zone::Field {
            // Anything attached to a leaving object is orphaned; state-based
            // actions will clean it up.
            let attachments: Vec<ObjectId> = self
                .object(id)
                .map(|o| o.attachments.clone())
                .unwrap_or_default();
            for attachment in attachments {
                if let Some(att) = self.object_mut(attachment) {
                    att.attached_to = None;
                }
            }
        }

        if is_token && from == Zone::Field && to != Zone::Field {
            self.objects.remove(&id);
            self.continuous_effects.remove_effects_from_source(id);
            self.replacement_effects.remove_effects_from_source(id);
            self.emit(EngineEvent::TokenCeasedToExist { object: id });
            self.pending_trigger_events
                .push(TriggerEvent::zone_change(id, from, to, snapshot));
            return None;
        }

        let turn_number = self.turn.turn_number;
        {
            let obj = self.objects.get_mut(&id)?;
            obj.zone = to;
            if to == Zone::Field && from != Zone::Field {
                obj.reset_on_field_entry(turn_number);
            }
            if to != Zone::Field {
                // Ownership pulls cards back to their owner's zones.
                obj.controller = obj.owner;
            }
        }

        let to_holder = if to == Zone::Field || to == Zone::Chase {
            controller
        } else {
            owner
        };
        match to {
            Zone::Field => self.field.push(id),
            Zone::RulerArea => {
                if let Some(player) = self.player_mut(to_holder) {
                    player.ruler = Some(id);
                }
            }
            Zone::Chase => {}
            _ => {
                if let Some(list) = self
                    .player_mut(to_holder)
                    .and_then(|p| p.zone_list_mut(to))
                {
                    list.push(id);
                }
            }
        }

        self.emit(EngineEvent::ZoneChanged {
            object: id,
            from,
            to,
        });
        self.pending_trigger_events
            .push(TriggerEvent::zone_change(id, from, to, snapshot));

        Some(to)
    }

    /// Remove an object from the game entirely (judgment flips, token
    /// cleanup). The zone containers are cleaned up as well.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let (zone, owner, controller) = {
            let obj = self.object(id)?;
            (obj.zone, obj.owner, obj.controller)
        };
        let holder = if zone == Zone::Field || zone == Zone::Chase {
            controller
        } else {
            owner
        };
        self.remove_from_zone_containers(id, zone, holder);
        self.continuous_effects.remove_effects_from_source(id);
        self.replacement_effects.remove_effects_from_source(id);
        self.objects.remove(&id)
    }

    /// Capture the calculated state of an object for last-known-information
    /// consumers.
    pub fn snapshot_object(&self, id: ObjectId) -> Option<ObjectSnapshot> {
        let obj = self.object(id)?;
        let chars = self.calculated_characteristics(id)?;
        Some(ObjectSnapshot {
            object_id: id,
            card_id: obj.definition.id,
            name: chars.name.clone(),
            owner: obj.owner,
            controller: chars.controller,
            card_type: chars.card_type,
            attributes: chars.attributes,
            races: chars.races.clone(),
            keywords: chars.keywords,
            atk: chars.atk,
            def: chars.def,
            zone: obj.zone,
            is_token: obj.is_token(),
        })
    }

    // =========================================================================
    // Calculated characteristics
    // =========================================================================

    /// The effective view of an object after folding continuous effects.
    pub fn calculated_characteristics(
        &self,
        id: ObjectId,
    ) -> Option<CalculatedCharacteristics> {
        crate::continuous::calculate_characteristics(self, id)
    }

    /// The effective controller of an object (layer 2 effects included).
    /// Falls back to the owner for unknown objects so event routing always
    /// has a player.
    pub fn controller_of(&self, id: ObjectId) -> PlayerId {
        self.calculated_characteristics(id)
            .map(|c| c.controller)
            .or_else(|| self.object(id).map(|o| o.controller))
            .unwrap_or(self.turn.active_player)
    }

    pub fn object_has_card_type(&self, id: ObjectId, card_type: CardType) -> bool {
        self.calculated_characteristics(id)
            .is_some_and(|c| c.card_type == card_type)
    }

    pub fn object_has_keyword(&self, id: ObjectId, keyword: Keyword) -> bool {
        self.calculated_characteristics(id)
            .is_some_and(|c| c.keywords.contains(keyword))
    }

    pub fn calculated_def(&self, id: ObjectId) -> Option<i32> {
        self.calculated_characteristics(id).map(|c| c.def)
    }

    pub fn calculated_atk(&self, id: ObjectId) -> Option<i32> {
        self.calculated_characteristics(id).map(|c| c.atk)
    }

    /// Regenerate static-ability registrations (continuous and replacement)
    /// from everything in play. Run before state-based actions and before any
    /// characteristic-sensitive decision.
    pub fn refresh_continuous_state(&mut self) {
        self.continuous_effects.clear_static_effects();
        self.replacement_effects.clear_static_ability_effects();

        let mut sources: Vec<ObjectId> = self.field.clone();
        for player in &self.players {
            if let Some(ruler) = player.ruler {
                sources.push(ruler);
            }
        }

        for source in sources {
            let Some(obj) = self.object(source) else {
                continue;
            };
            let controller = obj.controller;
            let statics: Vec<crate::ability::StaticAbility> = obj
                .abilities
                .iter()
                .filter_map(|a| match &a.kind {
                    crate::ability::AbilityKind::Static(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();

            for static_ability in statics {
                match static_ability {
                    crate::ability::StaticAbility::Continuous {
                        modification,
                        scope,
                    } => {
                        let target = match scope {
                            crate::ability::ContinuousScope::SelfOnly => {
                                crate::continuous::EffectTarget::Source
                            }
                            crate::ability::ContinuousScope::Matching(filter) => {
                                crate::continuous::EffectTarget::Matching(filter)
                            }
                        };
                        let def = crate::continuous::ContinuousEffectDef::new(
                            modification,
                            target,
                            crate::effect::Until::SourceLeavesField,
                        );
                        let ts = self.ids.next_timestamp();
                        if let Err(err) = self
                            .continuous_effects
                            .register_static(def, source, controller, ts)
                        {
                            tracing::warn!(%err, "rejected malformed static continuous effect");
                        }
                    }
                    crate::ability::StaticAbility::Replacement {
                        matcher,
                        action,
                        self_replacement,
                    } => {
                        let mut effect = crate::replacement::ReplacementEffect::new(
                            source, controller, matcher, action,
                        );
                        effect.self_replacement = self_replacement;
                        self.replacement_effects.add_static_ability_effect(effect);
                    }
                }
            }
        }
    }

    // =========================================================================
    // The Chase
    // =========================================================================

    pub fn push_to_chase(&mut self, entry: ChaseEntry) {
        self.emit(EngineEvent::ChaseEntryPushed {
            object: entry.object_id,
            controller: entry.controller,
        });
        self.chase.push(entry);
    }

    pub fn pop_from_chase(&mut self) -> Option<ChaseEntry> {
        self.chase.pop()
    }

    pub fn chase_is_empty(&self) -> bool {
        self.chase.is_empty()
    }

    // =========================================================================
    // Common mutations
    // =========================================================================

    /// Rest a permanent. Returns false if it was already rested.
    pub fn rest(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.object_mut(id) else {
            return false;
        };
        if obj.rested {
            return false;
        }
        obj.rested = true;
        self.emit(EngineEvent::Rested { object: id });
        self.pending_trigger_events.push(TriggerEvent::rest(id));
        true
    }

    /// Recover a permanent. Returns false if it was already recovered.
    pub fn recover(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.object_mut(id) else {
            return false;
        };
        if !obj.rested {
            return false;
        }
        obj.rested = false;
        self.emit(EngineEvent::Recovered { object: id });
        self.pending_trigger_events.push(TriggerEvent::recover(id));
        true
    }

    pub fn is_rested(&self, id: ObjectId) -> bool {
        self.object(id).is_some_and(|o| o.rested)
    }

    pub fn mark_damage(&mut self, id: ObjectId, amount: u32) {
        if let Some(obj) = self.object_mut(id) {
            obj.damage += amount;
        }
    }

    pub fn clear_damage(&mut self, id: ObjectId) {
        if let Some(obj) = self.object_mut(id) {
            obj.damage = 0;
        }
    }

    pub fn damage_on(&self, id: ObjectId) -> u32 {
        self.object(id).map(|o| o.damage).unwrap_or(0)
    }

    /// Draw cards off the top of the main deck. Drawing from an empty deck
    /// loses the game (checked as a state-based action).
    pub fn draw_cards(&mut self, player: PlayerId, count: u32) -> Vec<ObjectId> {
        let mut drawn = Vec::new();
        for _ in 0..count {
            let Some(card_id) = self
                .player_mut(player)
                .and_then(|p| {
                    if p.main_deck.is_empty() {
                        None
                    } else {
                        Some(p.main_deck.remove(0))
                    }
                })
            else {
                self.player_loses(player, "deck out");
                break;
            };

            if let Some(obj) = self.object_mut(card_id) {
                obj.zone = Zone::Hand;
            }
            if let Some(p) = self.player_mut(player) {
                p.hand.push(card_id);
            }
            self.emit(EngineEvent::CardDrawn {
                player,
                object: card_id,
            });
            self.pending_trigger_events
                .push(TriggerEvent::draw(player, 1));
            drawn.push(card_id);
        }
        drawn
    }

    /// Apply a life change directly. Replacement interception happens in the
    /// event processor before this is called.
    pub fn change_life(&mut self, player: PlayerId, delta: i32) {
        let Some(p) = self.player_mut(player) else {
            return;
        };
        p.life += delta;
        let new_total = p.life;
        self.emit(EngineEvent::LifeChanged {
            player,
            delta,
            new_total,
        });
        if delta > 0 {
            self.pending_trigger_events
                .push(TriggerEvent::life_gain(player, delta as u32));
        } else if delta < 0 {
            self.pending_trigger_events
                .push(TriggerEvent::life_loss(player, (-delta) as u32));
        }
    }

    pub fn player_loses(&mut self, player: PlayerId, reason: &'static str) {
        let Some(p) = self.player_mut(player) else {
            return;
        };
        if p.has_lost {
            return;
        }
        p.has_lost = true;
        self.emit(EngineEvent::PlayerLost { player, reason });

        let remaining: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.is_in_game())
            .map(|p| p.id)
            .collect();
        match remaining.len() {
            0 => {
                self.game_over = true;
                self.winner = None;
                self.emit(EngineEvent::GameEnded { winner: None });
            }
            1 => {
                self.game_over = true;
                self.winner = Some(remaining[0]);
                if let Some(winner) = self.player_mut(remaining[0]) {
                    winner.has_won = true;
                }
                self.emit(EngineEvent::GameEnded {
                    winner: Some(remaining[0]),
                });
            }
            _ => {}
        }
    }

    // =========================================================================
    // Deck setup
    // =========================================================================

    pub fn load_main_deck(&mut self, player: PlayerId, cards: &[CardDefinition]) {
        for card in cards {
            self.create_object_from_card(card, player, Zone::MainDeck);
        }
    }

    pub fn load_stone_deck(&mut self, player: PlayerId, stones: &[CardDefinition]) {
        for stone in stones {
            self.create_object_from_card(stone, player, Zone::StoneDeck);
        }
    }

    pub fn set_ruler(&mut self, player: PlayerId, ruler: &CardDefinition) -> ObjectId {
        self.create_object_from_card(ruler, player, Zone::RulerArea)
    }

    /// Shuffle both players' decks with the session RNG.
    pub fn shuffle_decks(&mut self) {
        let mut rng = self.rng.clone();
        for player in &mut self.players {
            player.main_deck.shuffle(&mut rng);
            player.stone_deck.shuffle(&mut rng);
        }
        self.rng = rng;
    }

    // =========================================================================
    // Turn bookkeeping
    // =========================================================================

    /// Advance to the next turn: switch active player, reset per-turn state.
    pub fn next_turn(&mut self) {
        let finished = self.turn.active_player;
        self.emit(EngineEvent::TurnEnded {
            player: finished,
            turn: self.turn.turn_number,
        });

        self.turn.turn_number += 1;
        self.turn.active_player = self.opponent_of(finished);
        self.turn.priority_player = Some(self.turn.active_player);
        self.turn.phase = Phase::Draw;

        self.activated_abilities_this_turn.clear();
        self.triggers_fired_this_turn.clear();
        let active = self.turn.active_player;
        if let Some(p) = self.player_mut(active) {
            p.reset_turn_flags();
        }
    }

    // =========================================================================
    // Event stream
    // =========================================================================

    /// Append an event to the observable log.
    pub fn emit(&mut self, event: EngineEvent) {
        self.event_log.push(event);
    }

    /// The full ordered event log (read-only).
    pub fn events(&self) -> &[EngineEvent] {
        &self.event_log
    }

    /// Drain the log; observers that consume incrementally call this.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.event_log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::ids::CardId;

    fn token_def() -> CardDefinition {
        CardBuilder::new(CardId::from_raw(50), "Gremlin Token")
            .card_type(CardType::Resonator)
            .stats(100, 100)
            .token()
            .build()
    }

    fn creature_def() -> CardDefinition {
        CardBuilder::new(CardId::from_raw(51), "Tell a Fairy Tale")
            .card_type(CardType::Resonator)
            .stats(300, 300)
            .build()
    }

    #[test]
    fn test_create_and_move() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];

        let id = game.create_object_from_card(&creature_def(), alice, Zone::Hand);
        assert_eq!(game.object(id).unwrap().zone, Zone::Hand);
        assert!(game.player(alice).unwrap().hand.contains(&id));

        game.move_object(id, Zone::Field);
        assert_eq!(game.object(id).unwrap().zone, Zone::Field);
        assert!(game.field.contains(&id));
        assert!(!game.player(alice).unwrap().hand.contains(&id));

        game.move_object(id, Zone::Graveyard);
        assert_eq!(game.object(id).unwrap().zone, Zone::Graveyard);
        assert!(game.player(alice).unwrap().graveyard.contains(&id));
        assert!(!game.field.contains(&id));
    }

    #[test]
    fn test_token_ceases_to_exist_off_field() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];

        let id = game.create_object_from_card(&token_def(), alice, Zone::Field);
        assert!(game.object(id).is_some());

        let result = game.move_object(id, Zone::Graveyard);
        assert_eq!(result, None);
        assert!(game.object(id).is_none());
        assert!(game.player(alice).unwrap().graveyard.is_empty());
        assert!(
            game.events()
                .iter()
                .any(|e| matches!(e, EngineEvent::TokenCeasedToExist { .. }))
        );
    }

    #[test]
    fn test_rest_and_recover() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let id = game.create_object_from_card(&creature_def(), alice, Zone::Field);

        assert!(game.rest(id));
        assert!(game.is_rested(id));
        assert!(!game.rest(id));

        assert!(game.recover(id));
        assert!(!game.is_rested(id));
        assert!(!game.recover(id));
    }

    #[test]
    fn test_draw_from_empty_deck_loses() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];

        let drawn = game.draw_cards(alice, 1);
        assert!(drawn.is_empty());
        assert!(game.player(alice).unwrap().has_lost);
        assert!(game.game_over);
        assert_eq!(game.winner, Some(game.turn_order[1]));
    }

    #[test]
    fn test_event_log_order() {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let id = game.create_object_from_card(&creature_def(), alice, Zone::Hand);

        game.move_object(id, Zone::Field);
        game.rest(id);

        let kinds: Vec<&EngineEvent> = game.events().iter().collect();
        assert!(matches!(kinds[0], EngineEvent::ZoneChanged { .. }));
        assert!(matches!(kinds[1], EngineEvent::Rested { .. }));
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let mut deck = Vec::new();
        for i in 0..30 {
            deck.push(
                CardBuilder::new(CardId::from_raw(i), format!("Card {i}"))
                    .card_type(CardType::Chant)
                    .build(),
            );
        }

        let mut game1 = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 7);
        let mut game2 = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 7);
        let p0 = game1.turn_order[0];
        game1.load_main_deck(p0, &deck);
        game2.load_main_deck(p0, &deck);

        game1.shuffle_decks();
        game2.shuffle_decks();

        assert_eq!(
            game1.player(p0).unwrap().main_deck,
            game2.player(p0).unwrap().main_deck
        );
    }
}
