//! Dependency ordering for continuous effects.
//!
//! Within one layer (or one stats sublayer), effects whose results feed each
//! other are applied in dependency order regardless of their timestamps: the
//! dependency graph is built, topologically ordered, and unresolved cycles
//! fall back to timestamp order.

use std::collections::{HashMap, HashSet};

use crate::continuous::{ContinuousEffect, Layer, Modification, StatSublayer};
use crate::effect::Value;

/// Check if effect A depends on effect B.
///
/// A depends on B when they share a layer (and sublayer, for stats) and
/// applying B first would change whether A applies or what A does. Explicit
/// dependency hints from the authoring collaborator are honored first.
pub fn effect_depends_on(a: &ContinuousEffect, b: &ContinuousEffect) -> bool {
    if a.modification.layer() != b.modification.layer() {
        return false;
    }

    if a.modification.layer() == Layer::Stats
        && a.modification.stat_sublayer() != b.modification.stat_sublayer()
    {
        return false;
    }

    if a.depends_on.contains(&b.id) {
        return true;
    }

    implicit_dependency(&a.modification, &b.modification)
}

/// Structural dependencies that hold without authoring hints.
fn implicit_dependency(a: &Modification, b: &Modification) -> bool {
    match (a, b) {
        // Removing all abilities applies after anything that grants one in
        // the same layer, so the removal wins.
        (Modification::RemoveAllAbilities, Modification::GrantAbility(_)) => true,
        (Modification::GrantAbility(_), Modification::RemoveAllAbilities) => false,

        // Removing a keyword applies after an effect granting that keyword.
        (Modification::RemoveKeyword(removed), Modification::GrantKeyword(granted)) => {
            removed == granted
        }

        // A stat-setter whose value counts board state depends on other
        // setters in the same sublayer: their output changes what it counts.
        (Modification::SetStats { atk, def }, Modification::SetStats { .. }) => {
            value_is_computed(atk) || value_is_computed(def)
        }

        // Fixed modifiers commute.
        (Modification::ModifyStats { .. }, Modification::ModifyStats { .. }) => false,

        _ => false,
    }
}

fn value_is_computed(value: &Value) -> bool {
    matches!(value, Value::CountMatching { .. })
}

/// Order the effects of a single layer for application.
///
/// Stats effects are grouped by sublayer (set before modify); each group is
/// then dependency-sorted with timestamps as the tiebreak.
pub fn sort_layer_effects<'a>(effects: &[&'a ContinuousEffect]) -> Vec<&'a ContinuousEffect> {
    if effects.is_empty() {
        return Vec::new();
    }

    let layer = effects[0].modification.layer();

    if layer == Layer::Stats {
        let mut by_sublayer: HashMap<Option<StatSublayer>, Vec<&ContinuousEffect>> = HashMap::new();
        for &effect in effects {
            by_sublayer
                .entry(effect.modification.stat_sublayer())
                .or_default()
                .push(effect);
        }

        let mut sublayers: Vec<_> = by_sublayer.keys().cloned().collect();
        sublayers.sort();

        let mut result = Vec::new();
        for sublayer in sublayers {
            let group = &by_sublayer[&sublayer];
            result.extend(sort_with_dependencies(group));
        }
        result
    } else {
        sort_with_dependencies(effects)
    }
}

/// Topological sort with timestamp tiebreak; timestamp order on cycles.
pub fn sort_with_dependencies<'a>(effects: &[&'a ContinuousEffect]) -> Vec<&'a ContinuousEffect> {
    if effects.len() <= 1 {
        return effects.to_vec();
    }

    // depends_on[i] holds the indices i must come after.
    let mut depends_on: HashMap<usize, HashSet<usize>> = HashMap::new();
    for i in 0..effects.len() {
        depends_on.insert(i, HashSet::new());
    }

    let mut has_any_dependency = false;
    for i in 0..effects.len() {
        for j in 0..effects.len() {
            if i != j && effect_depends_on(effects[i], effects[j]) {
                depends_on.get_mut(&i).unwrap().insert(j);
                has_any_dependency = true;
            }
        }
    }

    if !has_any_dependency {
        let mut sorted = effects.to_vec();
        sorted.sort_by_key(|e| e.timestamp);
        return sorted;
    }

    if has_cycle(&depends_on, effects.len()) {
        tracing::warn!(
            layer = ?effects[0].modification.layer(),
            "continuous-effect dependency cycle, falling back to timestamp order"
        );
        let mut sorted = effects.to_vec();
        sorted.sort_by_key(|e| e.timestamp);
        return sorted;
    }

    let mut in_degree: Vec<usize> = vec![0; effects.len()];
    for (i, deps) in &depends_on {
        in_degree[*i] = deps.len();
    }

    let mut depended_by: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..effects.len() {
        depended_by.insert(i, Vec::new());
    }
    for (i, deps) in &depends_on {
        for &j in deps {
            depended_by.get_mut(&j).unwrap().push(*i);
        }
    }

    let mut result = Vec::new();
    let mut ready: Vec<usize> = (0..effects.len()).filter(|&i| in_degree[i] == 0).collect();
    // Pop oldest timestamp first.
    ready.sort_by_key(|&i| std::cmp::Reverse(effects[i].timestamp));

    while let Some(idx) = ready.pop() {
        result.push(effects[idx]);
        for &dependent in &depended_by[&idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(dependent);
            }
        }
        ready.sort_by_key(|&i| std::cmp::Reverse(effects[i].timestamp));
    }

    result
}

fn has_cycle(dependencies: &HashMap<usize, HashSet<usize>>, n: usize) -> bool {
    fn dfs(
        node: usize,
        dependencies: &HashMap<usize, HashSet<usize>>,
        visiting: &mut Vec<bool>,
        visited: &mut Vec<bool>,
    ) -> bool {
        if visiting[node] {
            return true;
        }
        if visited[node] {
            return false;
        }
        visiting[node] = true;
        for &dep in &dependencies[&node] {
            if dfs(dep, dependencies, visiting, visited) {
                return true;
            }
        }
        visiting[node] = false;
        visited[node] = true;
        false
    }

    let mut visiting = vec![false; n];
    let mut visited = vec![false; n];
    (0..n).any(|i| dfs(i, dependencies, &mut visiting, &mut visited))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{Ability, ContinuousScope, StaticAbility};
    use crate::continuous::{ContinuousEffectId, EffectSourceType, EffectTarget};
    use crate::effect::Until;
    use crate::ids::{ObjectId, PlayerId};
    use crate::types::Keyword;

    fn effect(id: u64, timestamp: u64, modification: Modification) -> ContinuousEffect {
        ContinuousEffect {
            id: ContinuousEffectId(id),
            source: ObjectId::from_raw(id),
            controller: PlayerId::from_index(0),
            modification,
            target: EffectTarget::Source,
            timestamp,
            duration: Until::Permanently,
            source_type: EffectSourceType::Resolution,
            depends_on: Vec::new(),
            expires_end_of_turn: 0,
        }
    }

    fn grant_keyword_ability() -> Ability {
        Ability::static_ability(StaticAbility::Continuous {
            modification: Modification::GrantKeyword(Keyword::Flying),
            scope: ContinuousScope::SelfOnly,
        })
    }

    #[test]
    fn test_no_dependency_across_layers() {
        let a = effect(1, 1, Modification::GrantKeyword(Keyword::Flying));
        let b = effect(2, 2, Modification::ModifyStats { atk: 100, def: 0 });
        assert!(!effect_depends_on(&a, &b));
    }

    #[test]
    fn test_remove_all_abilities_depends_on_grant() {
        let grant = effect(
            1,
            5,
            Modification::GrantAbility(Box::new(grant_keyword_ability())),
        );
        let remove = effect(2, 1, Modification::RemoveAllAbilities);

        assert!(effect_depends_on(&remove, &grant));
        assert!(!effect_depends_on(&grant, &remove));

        // Despite the earlier timestamp, the removal applies last.
        let refs = vec![&grant, &remove];
        let sorted = sort_with_dependencies(&refs);
        assert_eq!(sorted.last().unwrap().id, remove.id);
    }

    #[test]
    fn test_timestamp_order_without_dependencies() {
        let a = effect(1, 9, Modification::ModifyStats { atk: 100, def: 0 });
        let b = effect(2, 3, Modification::ModifyStats { atk: 200, def: 0 });
        let c = effect(3, 6, Modification::ModifyStats { atk: 300, def: 0 });

        let refs = vec![&a, &b, &c];
        let sorted = sort_with_dependencies(&refs);
        let timestamps: Vec<u64> = sorted.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![3, 6, 9]);
    }

    #[test]
    fn test_explicit_dependency_hint() {
        let mut late = effect(1, 10, Modification::GrantKeyword(Keyword::Flying));
        let early = effect(2, 1, Modification::GrantKeyword(Keyword::Pierce));
        late.depends_on.push(ContinuousEffectId(2));

        let refs = vec![&late, &early];
        let sorted = sort_with_dependencies(&refs);
        assert_eq!(sorted[0].id, ContinuousEffectId(2));
        assert_eq!(sorted[1].id, ContinuousEffectId(1));
    }

    #[test]
    fn test_cycle_falls_back_to_timestamp() {
        let mut a = effect(1, 7, Modification::GrantKeyword(Keyword::Flying));
        let mut b = effect(2, 2, Modification::GrantKeyword(Keyword::Pierce));
        a.depends_on.push(ContinuousEffectId(2));
        b.depends_on.push(ContinuousEffectId(1));

        let refs = vec![&a, &b];
        let sorted = sort_with_dependencies(&refs);
        let timestamps: Vec<u64> = sorted.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![2, 7]);
    }

    #[test]
    fn test_set_before_modify_in_stats_layer() {
        let modify = effect(1, 1, Modification::ModifyStats { atk: 100, def: 100 });
        let set = effect(
            2,
            9,
            Modification::SetStats {
                atk: Value::fixed(100),
                def: Value::fixed(100),
            },
        );

        let refs = vec![&modify, &set];
        let sorted = sort_layer_effects(&refs);
        assert!(matches!(sorted[0].modification, Modification::SetStats { .. }));
        assert!(matches!(sorted[1].modification, Modification::ModifyStats { .. }));
    }

    #[test]
    fn test_registration_order_independence() {
        let a = effect(1, 4, Modification::ModifyStats { atk: 100, def: 0 });
        let b = effect(2, 8, Modification::ModifyStats { atk: 200, def: 0 });
        let remove = effect(3, 2, Modification::RemoveAllAbilities);

        let order1: Vec<&ContinuousEffect> = vec![&a, &b, &remove];
        let order2: Vec<&ContinuousEffect> = vec![&remove, &b, &a];

        let sorted1: Vec<u64> = sort_with_dependencies(&order1).iter().map(|e| e.id.0).collect();
        let sorted2: Vec<u64> = sort_with_dependencies(&order2).iter().map(|e| e.id.0).collect();
        assert_eq!(sorted1, sorted2);
    }
}
