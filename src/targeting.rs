//! Target legality.
//!
//! The same predicate is evaluated twice: once when targets are chosen, and
//! again when the Chase entry resolves. Individually-invalid targets are
//! dropped at resolution; an entry whose targets all became invalid fizzles.

use crate::filter::ObjectFilter;
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};
use crate::target::{ChooseSpec, Target, TargetKind};
use crate::types::Keyword;

/// Why a target is not (or no longer) legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingInvalidReason {
    /// The object no longer exists.
    NoLongerExists,
    /// The object no longer satisfies the target filter.
    FilterMismatch,
    /// Barrier: the object cannot be targeted by an opposing source.
    Protected,
    /// A player target no longer satisfies the player filter, or the target
    /// is of the wrong kind for the requirement.
    WrongKind,
}

/// Check whether an object may be targeted through the given filter by a
/// source controlled by `source_controller`.
///
/// Protection is checked here, not in the filter: a card with Barrier is an
/// illegal target for opposing spells and abilities unless the filter
/// explicitly bypasses protection.
pub fn can_target_object(
    game: &GameState,
    filter: &ObjectFilter,
    target: ObjectId,
    source_controller: PlayerId,
) -> Result<(), TargetingInvalidReason> {
    let Some(chars) = game.calculated_characteristics(target) else {
        return Err(TargetingInvalidReason::NoLongerExists);
    };

    if !filter.bypasses_protection
        && chars.controller != source_controller
        && chars.keywords.contains(Keyword::Barrier)
    {
        return Err(TargetingInvalidReason::Protected);
    }

    if !filter.matches(game, target, source_controller) {
        return Err(TargetingInvalidReason::FilterMismatch);
    }

    Ok(())
}

/// Check one chosen target against one spec.
pub fn validate_target(
    game: &GameState,
    spec: &ChooseSpec,
    target: Target,
    source_controller: PlayerId,
) -> Result<(), TargetingInvalidReason> {
    match (&spec.kind, target) {
        (TargetKind::Objects(filter), Target::Object(id)) => {
            can_target_object(game, filter, id, source_controller)
        }
        (TargetKind::Players(player_filter), Target::Player(player)) => {
            if player_filter.matches(game, source_controller, player) {
                Ok(())
            } else {
                Err(TargetingInvalidReason::WrongKind)
            }
        }
        (TargetKind::ObjectsOrPlayers(filter, _), Target::Object(id)) => {
            can_target_object(game, filter, id, source_controller)
        }
        (TargetKind::ObjectsOrPlayers(_, player_filter), Target::Player(player)) => {
            if player_filter.matches(game, source_controller, player) {
                Ok(())
            } else {
                Err(TargetingInvalidReason::WrongKind)
            }
        }
        _ => Err(TargetingInvalidReason::WrongKind),
    }
}

/// All currently-legal targets for a spec, in deterministic order.
pub fn compute_legal_targets(
    game: &GameState,
    spec: &ChooseSpec,
    chooser: PlayerId,
) -> Vec<Target> {
    let mut legal = Vec::new();

    match &spec.kind {
        TargetKind::Objects(filter) | TargetKind::ObjectsOrPlayers(filter, _) => {
            for id in game.all_object_ids() {
                if can_target_object(game, filter, id, chooser).is_ok() {
                    legal.push(Target::Object(id));
                }
            }
        }
        TargetKind::Players(_) => {}
    }

    match &spec.kind {
        TargetKind::Players(player_filter) | TargetKind::ObjectsOrPlayers(_, player_filter) => {
            for &player in &game.turn_order {
                if player_filter.matches(game, chooser, player) {
                    legal.push(Target::Player(player));
                }
            }
        }
        TargetKind::Objects(_) => {}
    }

    legal
}

/// Whether a spell or ability with these specs could legally be played right
/// now (every mandatory spec has at least one legal choice).
pub fn has_legal_targets(game: &GameState, specs: &[ChooseSpec], chooser: PlayerId) -> bool {
    specs
        .iter()
        .all(|spec| spec.min == 0 || !compute_legal_targets(game, spec, chooser).is_empty())
}

/// Resolution-time re-validation.
///
/// Returns the surviving targets, plus `true` when the entry had targets and
/// every one of them became invalid, in which case the entry fizzles.
pub fn revalidate_targets(
    game: &GameState,
    targets: &[Target],
    specs: &[ChooseSpec],
    source_controller: PlayerId,
) -> (Vec<Target>, bool) {
    if targets.is_empty() {
        return (Vec::new(), false);
    }

    let mut valid = Vec::new();
    for (i, &target) in targets.iter().enumerate() {
        let ok = if specs.len() == targets.len() {
            validate_target(game, &specs[i], target, source_controller).is_ok()
        } else {
            specs
                .iter()
                .any(|spec| validate_target(game, spec, target, source_controller).is_ok())
        };
        if ok {
            valid.push(target);
        } else {
            tracing::debug!(?target, "target dropped at resolution revalidation");
        }
    }

    let all_invalid = valid.is_empty();
    (valid, all_invalid)
}
