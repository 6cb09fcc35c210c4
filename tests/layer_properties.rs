//! Property tests for the layer system and the replacement engine.

use proptest::prelude::*;

use willstone::continuous::EffectTarget;
use willstone::decision::ScriptedDecisionMaker;
use willstone::effect::Value;
use willstone::event_processor::execute_life_loss;
use willstone::replacement::{EventModification, ReplacementAction, ReplacementEffect};
use willstone::{
    CardBuilder, CardId, ContinuousEffectDef, GameState, Keyword, Modification, ObjectId, Until,
    Zone, events,
};
use willstone::types::CardType;

fn game_with_target() -> (GameState, ObjectId) {
    let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
    let alice = game.turn_order[0];
    let card = CardBuilder::new(CardId::from_raw(1), "Clay Soldier")
        .card_type(CardType::Resonator)
        .stats(300, 300)
        .build();
    let id = game.create_object_from_card(&card, alice, Zone::Field);
    (game, id)
}

/// The fixed effect set: (definition, timestamp) pairs. Timestamps are part
/// of the effect identity, not of the registration call order.
fn effect_set(target: ObjectId) -> Vec<(ContinuousEffectDef, u64)> {
    let on_target = || EffectTarget::Objects(vec![target]);
    vec![
        (
            ContinuousEffectDef::new(
                Modification::SetStats {
                    atk: Value::fixed(400),
                    def: Value::fixed(400),
                },
                on_target(),
                Until::Permanently,
            ),
            10,
        ),
        (
            ContinuousEffectDef::new(
                Modification::ModifyStats { atk: 200, def: 200 },
                on_target(),
                Until::Permanently,
            ),
            11,
        ),
        (
            ContinuousEffectDef::new(
                Modification::ModifyStats { atk: -100, def: 0 },
                on_target(),
                Until::Permanently,
            ),
            12,
        ),
        (
            ContinuousEffectDef::new(
                Modification::GrantKeyword(Keyword::Flying),
                on_target(),
                Until::Permanently,
            ),
            13,
        ),
        (
            ContinuousEffectDef::new(
                Modification::RemoveKeyword(Keyword::Flying),
                on_target(),
                Until::Permanently,
            ),
            14,
        ),
    ]
}

proptest! {
    /// Calculated characteristics depend only on (layer, dependency order,
    /// timestamp), never on the order the registration calls were made.
    #[test]
    fn prop_registration_order_is_irrelevant(
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let (mut shuffled, target) = game_with_target();
        let alice = shuffled.turn_order[0];
        let effects = effect_set(target);
        for &i in &order {
            let (def, ts) = effects[i].clone();
            shuffled
                .continuous_effects
                .register_resolution(def, target, alice, ts, 1)
                .unwrap();
        }

        let (mut canonical, canonical_target) = game_with_target();
        let canonical_owner = canonical.turn_order[0];
        for (def, ts) in effect_set(canonical_target) {
            canonical
                .continuous_effects
                .register_resolution(def, canonical_target, canonical_owner, ts, 1)
                .unwrap();
        }

        let got = shuffled.calculated_characteristics(target).unwrap();
        let want = canonical.calculated_characteristics(canonical_target).unwrap();

        prop_assert_eq!(got.atk, want.atk);
        prop_assert_eq!(got.def, want.def);
        prop_assert_eq!(got.keywords, want.keywords);
        // Hand-computed: set 400/400, +200/+200, -100/+0; the Flying grant is
        // undone by the later-timestamped removal.
        prop_assert_eq!(got.atk, 500);
        prop_assert_eq!(got.def, 600);
        prop_assert!(!got.keywords.contains(Keyword::Flying));
    }

    /// For a fixed choice order, chained replacement application is
    /// deterministic: identical sessions produce identical outcomes.
    #[test]
    fn prop_replacement_chain_is_idempotent_for_fixed_choice(choice in 0usize..2) {
        let run = |choice: usize| {
            let mut game = GameState::new(vec!["Alice".into(), "Bob".into()], 4000, 0);
            let bob = game.turn_order[1];
            game.replacement_effects
                .add_resolution_effect(ReplacementEffect::new(
                    ObjectId::from_raw(90),
                    bob,
                    events::Matcher::new(events::WouldLoseLifeMatcher::you()),
                    ReplacementAction::Modify(EventModification::SetTo(200)),
                ));
            game.replacement_effects
                .add_resolution_effect(ReplacementEffect::new(
                    ObjectId::from_raw(91),
                    bob,
                    events::Matcher::new(events::WouldLoseLifeMatcher::you()),
                    ReplacementAction::Modify(EventModification::Subtract(100)),
                ));

            let mut dm = ScriptedDecisionMaker::default().with_options(vec![vec![choice]]);
            let lost = execute_life_loss(&mut game, bob, 800, &mut dm);
            (lost, game.player(bob).unwrap().life)
        };

        prop_assert_eq!(run(choice), run(choice));
        // Both orders are themselves hand-computable: SetTo first yields
        // 200 - 100 = 100; Subtract first yields 800 - 100 then SetTo = 200.
        let expected = if choice == 0 { 100 } else { 200 };
        prop_assert_eq!(run(choice).0, expected);
    }
}
