//! Effect execution.
//!
//! The single dispatch point that interprets [`Effect`] values during Chase
//! resolution. Every mutation routes through the replacement pipeline in
//! [`event_processor`](crate::event_processor) and lands in the event stream.

use crate::decision::DecisionMaker;
use crate::effect::{Condition, Effect, Until, Value};
use crate::error::ConfigurationError;
use crate::event_processor::{
    execute_banish, execute_damage, execute_destroy, execute_draw, execute_life_gain,
    execute_life_loss, execute_zone_change,
};
use crate::filter::PlayerFilter;
use crate::game_event::DamageTarget;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::target::Target;
use crate::triggers::TriggerEvent;
use crate::zone::Zone;

/// Context for one resolution: the source, its controller, and the captured
/// targets.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub source: ObjectId,
    pub controller: PlayerId,
    pub targets: Vec<Target>,
    pub x_value: Option<u32>,
}

impl ExecutionContext {
    pub fn new(source: ObjectId, controller: PlayerId) -> Self {
        Self {
            source,
            controller,
            targets: Vec::new(),
            x_value: None,
        }
    }

    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_x(mut self, x: u32) -> Self {
        self.x_value = Some(x);
        self
    }

    fn object_targets(&self) -> Vec<ObjectId> {
        self.targets
            .iter()
            .filter_map(|t| match t {
                Target::Object(id) => Some(*id),
                Target::Player(_) => None,
            })
            .collect()
    }
}

/// Errors during effect execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Resolve a [`Value`] in context.
pub fn resolve_value(game: &GameState, value: &Value, ctx: &ExecutionContext) -> i32 {
    match value {
        Value::Fixed(n) => *n,
        Value::X => ctx.x_value.unwrap_or(0) as i32,
        Value::CountMatching { filter, per } => {
            let count = filter.collect_matching(game, ctx.controller).len() as i32;
            count * per
        }
    }
}

fn players_matching(game: &GameState, filter: PlayerFilter, you: PlayerId) -> Vec<PlayerId> {
    game.turn_order
        .iter()
        .copied()
        .filter(|&p| filter.matches(game, you, p))
        .collect()
}

/// Execute one effect. The dispatch for every effect-action kind lives here;
/// new kinds extend [`Effect`] and get a new arm.
pub fn execute_effect(
    game: &mut GameState,
    effect: &Effect,
    ctx: &mut ExecutionContext,
    decision_maker: &mut dyn DecisionMaker,
) -> Result<(), ExecutionError> {
    match effect {
        Effect::DealDamageToTargets(value) => {
            let amount = resolve_value(game, value, ctx).max(0) as u32;
            for &target in &ctx.targets.clone() {
                let damage_target = match target {
                    Target::Object(id) => DamageTarget::Object(id),
                    Target::Player(player) => DamageTarget::Player(player),
                };
                execute_damage(game, ctx.source, damage_target, amount, false, decision_maker);
            }
        }

        Effect::DestroyTargets => {
            for id in ctx.object_targets() {
                execute_destroy(game, id, Some(ctx.source), decision_maker);
            }
        }

        Effect::BanishTargets => {
            for id in ctx.object_targets() {
                execute_banish(game, id, decision_maker);
            }
        }

        Effect::ReturnTargetsToHand => {
            for id in ctx.object_targets() {
                execute_zone_change(game, id, Zone::Hand, decision_maker);
            }
        }

        Effect::RestTargets => {
            for id in ctx.object_targets() {
                game.rest(id);
            }
        }

        Effect::RecoverTargets => {
            for id in ctx.object_targets() {
                game.recover(id);
            }
        }

        Effect::ModifyStatsOfTargets { atk, def, until } => {
            let targets = ctx.object_targets();
            if !targets.is_empty() {
                register_resolution_modification(
                    game,
                    ctx,
                    crate::continuous::Modification::ModifyStats {
                        atk: *atk,
                        def: *def,
                    },
                    targets,
                    *until,
                )?;
            }
        }

        Effect::GrantKeywordToTargets { keyword, until } => {
            let targets = ctx.object_targets();
            if !targets.is_empty() {
                register_resolution_modification(
                    game,
                    ctx,
                    crate::continuous::Modification::GrantKeyword(*keyword),
                    targets,
                    *until,
                )?;
            }
        }

        Effect::AddCountersToTargets { counter, count } => {
            for id in ctx.object_targets() {
                let Some(obj) = game.object_mut(id) else {
                    continue;
                };
                obj.add_counters(*counter, *count);
                game.emit(crate::game_event::EngineEvent::CountersChanged {
                    object: id,
                    delta: *count as i32,
                });
            }
        }

        Effect::DrawCards { player, count } => {
            let count = resolve_value(game, count, ctx).max(0) as u32;
            for player in players_matching(game, *player, ctx.controller) {
                execute_draw(game, player, count, decision_maker);
            }
        }

        Effect::GainLife { player, amount } => {
            let amount = resolve_value(game, amount, ctx).max(0) as u32;
            for player in players_matching(game, *player, ctx.controller) {
                execute_life_gain(game, player, amount, decision_maker);
            }
        }

        Effect::LoseLife { player, amount } => {
            let amount = resolve_value(game, amount, ctx).max(0) as u32;
            for player in players_matching(game, *player, ctx.controller) {
                execute_life_loss(game, player, amount, decision_maker);
            }
        }

        Effect::DestroyAllMatching(filter) => {
            // Board sweeps don't target; protection keywords don't help.
            for id in filter.collect_matching(game, ctx.controller) {
                execute_destroy(game, id, Some(ctx.source), decision_maker);
            }
        }

        Effect::CreateToken { token, count } => {
            for _ in 0..*count {
                let id = game.create_object_from_card(token, ctx.controller, Zone::Field);
                game.pending_trigger_events
                    .push(TriggerEvent::enter_field(id, Zone::Field, false));
            }
        }

        Effect::RegisterReplacement {
            matcher,
            action,
            one_shot,
        } => {
            let effect = crate::replacement::ReplacementEffect::new(
                ctx.source,
                ctx.controller,
                matcher.clone(),
                action.clone(),
            );
            if *one_shot {
                game.replacement_effects.add_one_shot_effect(effect);
            } else {
                game.replacement_effects.add_turn_scoped_effect(effect);
            }
        }

        Effect::Sequence(effects) => {
            for effect in effects {
                execute_effect(game, effect, ctx, decision_maker)?;
            }
        }

        Effect::Conditional {
            condition,
            then,
            otherwise,
        } => {
            let branch = if condition_holds(game, condition, ctx) {
                then
            } else {
                otherwise
            };
            for effect in branch {
                execute_effect(game, effect, ctx, decision_maker)?;
            }
        }
    }

    Ok(())
}

fn condition_holds(game: &GameState, condition: &Condition, ctx: &ExecutionContext) -> bool {
    match condition {
        Condition::ControllerLifeAtMost(threshold) => game
            .player(ctx.controller)
            .is_some_and(|p| p.life <= *threshold),
        Condition::ControllerLifeAtLeast(threshold) => game
            .player(ctx.controller)
            .is_some_and(|p| p.life >= *threshold),
        Condition::ControlsAtLeast { filter, count } => {
            let yours = crate::filter::ObjectFilter {
                controller: crate::filter::ControllerRelation::You,
                ..(**filter).clone()
            };
            yours.collect_matching(game, ctx.controller).len() as u32 >= *count
        }
        Condition::AnyTargetsRemain => !ctx.targets.is_empty(),
    }
}

fn register_resolution_modification(
    game: &mut GameState,
    ctx: &ExecutionContext,
    modification: crate::continuous::Modification,
    targets: Vec<ObjectId>,
    until: Until,
) -> Result<(), ExecutionError> {
    let def = crate::continuous::ContinuousEffectDef::new(
        modification,
        crate::continuous::EffectTarget::Objects(targets),
        until,
    );
    let ts = game.ids.next_timestamp();
    let turn = game.turn.turn_number;
    game.continuous_effects
        .register_resolution(def, ctx.source, ctx.controller, ts, turn)
        .map_err(ExecutionError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardBuilder;
    use crate::decision::AutoPassDecisionMaker;
    use crate::filter::ObjectFilter;
    use crate::ids::CardId;
    use crate::types::{CardType, Keyword};

    fn setup() -> (GameState, ObjectId, ObjectId) {
        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];

        let caster = CardBuilder::new(CardId::from_raw(1), "Ritual Chanter")
            .card_type(CardType::Resonator)
            .stats(300, 300)
            .build();
        let victim = CardBuilder::new(CardId::from_raw(2), "Woodland Guide")
            .card_type(CardType::Resonator)
            .stats(400, 400)
            .build();

        let source = game.create_object_from_card(&caster, alice, Zone::Field);
        let target = game.create_object_from_card(&victim, bob, Zone::Field);
        (game, source, target)
    }

    #[test]
    fn test_deal_damage_to_target_object() {
        let (mut game, source, target) = setup();
        let alice = game.turn_order[0];
        let mut ctx =
            ExecutionContext::new(source, alice).with_targets(vec![Target::Object(target)]);
        let mut dm = AutoPassDecisionMaker;

        execute_effect(
            &mut game,
            &Effect::DealDamageToTargets(Value::fixed(300)),
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        assert_eq!(game.damage_on(target), 300);
    }

    #[test]
    fn test_x_damage() {
        let (mut game, source, target) = setup();
        let alice = game.turn_order[0];
        let mut ctx = ExecutionContext::new(source, alice)
            .with_targets(vec![Target::Object(target)])
            .with_x(250);
        let mut dm = AutoPassDecisionMaker;

        execute_effect(
            &mut game,
            &Effect::DealDamageToTargets(Value::X),
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        assert_eq!(game.damage_on(target), 250);
    }

    #[test]
    fn test_grant_keyword_until_end_of_turn() {
        let (mut game, source, target) = setup();
        let alice = game.turn_order[0];
        let mut ctx =
            ExecutionContext::new(source, alice).with_targets(vec![Target::Object(target)]);
        let mut dm = AutoPassDecisionMaker;

        execute_effect(
            &mut game,
            &Effect::GrantKeywordToTargets {
                keyword: Keyword::Flying,
                until: Until::EndOfTurn,
            },
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        assert!(game.object_has_keyword(target, Keyword::Flying));

        let turn = game.turn.turn_number;
        game.continuous_effects.remove_end_of_turn_effects(turn);
        assert!(!game.object_has_keyword(target, Keyword::Flying));
    }

    #[test]
    fn test_counters_raise_calculated_stats() {
        use crate::object::CounterType;

        let (mut game, source, target) = setup();
        let alice = game.turn_order[0];
        let mut ctx =
            ExecutionContext::new(source, alice).with_targets(vec![Target::Object(target)]);
        let mut dm = AutoPassDecisionMaker;

        execute_effect(
            &mut game,
            &Effect::AddCountersToTargets {
                counter: CounterType::PlusHundred,
                count: 2,
            },
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        let chars = game.calculated_characteristics(target).unwrap();
        assert_eq!(chars.atk, 600);
        assert_eq!(chars.def, 600);
    }

    #[test]
    fn test_destroy_all_matching_ignores_barrier() {
        let (mut game, source, target) = setup();
        let alice = game.turn_order[0];
        let bob = game.turn_order[1];

        let shielded = CardBuilder::new(CardId::from_raw(3), "Veiled Sentinel")
            .card_type(CardType::Resonator)
            .stats(200, 200)
            .keyword(Keyword::Barrier)
            .build();
        let shielded_id = game.create_object_from_card(&shielded, bob, Zone::Field);

        let mut ctx = ExecutionContext::new(source, alice);
        let mut dm = AutoPassDecisionMaker;
        execute_effect(
            &mut game,
            &Effect::DestroyAllMatching(ObjectFilter::resonator()),
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        // Barrier stops targeting, not board sweeps.
        assert_eq!(game.object(target).unwrap().zone, Zone::Graveyard);
        assert_eq!(game.object(shielded_id).unwrap().zone, Zone::Graveyard);
        assert_eq!(game.object(source).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_token_creation_fires_enter_field_triggers() {
        use crate::ability::{Ability, TriggeredAbility};
        use crate::triggers::{Trigger, check_triggers};

        let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
        let alice = game.turn_order[0];
        let watcher = CardBuilder::new(CardId::from_raw(1), "Gate Observer")
            .card_type(CardType::Resonator)
            .stats(200, 200)
            .ability(Ability::triggered(TriggeredAbility::new(
                Trigger::enters_field(ObjectFilter::resonator()),
                vec![Effect::GainLife {
                    player: PlayerFilter::You,
                    amount: Value::fixed(100),
                }],
            )))
            .build();
        let source = game.create_object_from_card(&watcher, alice, Zone::Field);

        let token = CardBuilder::new(CardId::from_raw(2), "Wolf Token")
            .card_type(CardType::Resonator)
            .stats(300, 300)
            .token()
            .build();
        let mut ctx = ExecutionContext::new(source, alice);
        let mut dm = AutoPassDecisionMaker;
        execute_effect(
            &mut game,
            &Effect::CreateToken {
                token: Box::new(token),
                count: 1,
            },
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        let events: Vec<_> = std::mem::take(&mut game.pending_trigger_events);
        let fired: usize = events
            .iter()
            .map(|e| check_triggers(&game, e).len())
            .sum();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_one_shot_shield_consumed_after_first_use() {
        use crate::event_processor::execute_damage;
        use crate::events::{DamageToYouMatcher, Matcher};
        use crate::replacement::{EventModification, ReplacementAction};

        let (mut game, source, _) = setup();
        let alice = game.turn_order[0];
        let mut ctx = ExecutionContext::new(source, alice);
        let mut dm = AutoPassDecisionMaker;

        execute_effect(
            &mut game,
            &Effect::RegisterReplacement {
                matcher: Matcher::new(DamageToYouMatcher),
                action: ReplacementAction::Modify(EventModification::SetTo(0)),
                one_shot: true,
            },
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        let first = execute_damage(
            &mut game,
            source,
            DamageTarget::Player(alice),
            400,
            false,
            &mut dm,
        );
        assert_eq!(first, 0);

        // The shield was consumed; the second hit lands.
        let second = execute_damage(
            &mut game,
            source,
            DamageTarget::Player(alice),
            400,
            false,
            &mut dm,
        );
        assert_eq!(second, 400);
        assert_eq!(game.player(alice).unwrap().life, 3600);
    }

    #[test]
    fn test_conditional_branches_on_life_total() {
        let (mut game, source, _) = setup();
        let alice = game.turn_order[0];
        let mut dm = AutoPassDecisionMaker;

        let desperate_prayer = Effect::Conditional {
            condition: crate::effect::Condition::ControllerLifeAtMost(1000),
            then: vec![Effect::GainLife {
                player: PlayerFilter::You,
                amount: Value::fixed(1000),
            }],
            otherwise: vec![Effect::GainLife {
                player: PlayerFilter::You,
                amount: Value::fixed(100),
            }],
        };

        let mut ctx = ExecutionContext::new(source, alice);
        execute_effect(&mut game, &desperate_prayer, &mut ctx, &mut dm).unwrap();
        assert_eq!(game.player(alice).unwrap().life, 4100);

        game.player_mut(alice).unwrap().life = 800;
        let mut ctx = ExecutionContext::new(source, alice);
        execute_effect(&mut game, &desperate_prayer, &mut ctx, &mut dm).unwrap();
        assert_eq!(game.player(alice).unwrap().life, 1800);
    }

    #[test]
    fn test_sequence_draw_and_gain() {
        let (mut game, source, _) = setup();
        let alice = game.turn_order[0];

        let deck: Vec<_> = (0..3)
            .map(|i| {
                CardBuilder::new(CardId::from_raw(100 + i), format!("Filler {i}"))
                    .card_type(CardType::Chant)
                    .build()
            })
            .collect();
        game.load_main_deck(alice, &deck);

        let mut ctx = ExecutionContext::new(source, alice);
        let mut dm = AutoPassDecisionMaker;
        execute_effect(
            &mut game,
            &Effect::Sequence(vec![
                Effect::DrawCards {
                    player: PlayerFilter::You,
                    count: Value::fixed(2),
                },
                Effect::GainLife {
                    player: PlayerFilter::You,
                    amount: Value::fixed(500),
                },
            ]),
            &mut ctx,
            &mut dm,
        )
        .unwrap();

        assert_eq!(game.player(alice).unwrap().hand.len(), 2);
        assert_eq!(game.player(alice).unwrap().life, 4500);
    }
}
