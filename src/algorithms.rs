use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::FamilyGraph;
use crate::models::PersonId;

/// Every person below `id`, breadth first. Shared descendants appear once.
pub fn descendants(graph: &FamilyGraph, id: PersonId) -> Vec<PersonId> {
    walk(id, |current| graph.children_of(current))
        .into_iter()
        .map(|(person, _)| person)
        .collect()
}

/// Every person above `id`, breadth first.
pub fn ancestors(graph: &FamilyGraph, id: PersonId) -> Vec<PersonId> {
    walk(id, |current| graph.parents_of(current))
        .into_iter()
        .map(|(person, _)| person)
        .collect()
}

/// Everyone connected to `root` through parent, child or spouse links, in visit order.
/// The root itself comes first. Siblings are not followed; they are reachable through parents.
pub fn reachable_from(graph: &FamilyGraph, root: PersonId) -> Vec<PersonId> {
    if !graph.contains(root) {
        return Vec::new();
    }
    let mut ordered = vec![root];
    ordered.extend(
        walk(root, |current| neighbours(graph, current))
            .into_iter()
            .map(|(person, _)| person),
    );
    ordered
}

/// Generation offset of every person reachable from `root`; the root is generation 0,
/// parents are -1, children +1 and spouses share their partner's generation.
///
/// Ancestors and descendants of the root are fixed first by their shortest vertical
/// distance so they always land strictly above or below the root. Each spouse group then
/// takes one generation: the shallowest of its ancestors, or the shallowest of its
/// descendants. Everyone else takes the generation implied by the first link that reaches
/// them, and their spouses follow.
pub fn assign_generations(graph: &FamilyGraph, root: PersonId) -> Vec<(PersonId, i32)> {
    if !graph.contains(root) {
        return Vec::new();
    }

    let mut generation: HashMap<PersonId, i32> = HashMap::new();
    generation.insert(root, 0);
    for (person, depth) in walk(root, |current| graph.parents_of(current)) {
        generation.insert(person, -(depth as i32));
    }
    for (person, depth) in walk(root, |current| graph.children_of(current)) {
        generation.entry(person).or_insert(depth as i32);
    }

    let groups = spouse_groups(graph, &reachable_from(graph, root));
    for group in groups.values() {
        align_group(group, &mut generation);
    }

    let mut ordered = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(root);
    queue.push_back(root);
    while let Some(current) = queue.pop_front() {
        let current_generation = generation.get(&current).copied().unwrap_or(0);
        ordered.push((current, current_generation));

        let links = graph
            .spouses_of(current)
            .into_iter()
            .map(|spouse| (spouse, 0))
            .chain(graph.parents_of(current).into_iter().map(|parent| (parent, -1)))
            .chain(graph.children_of(current).into_iter().map(|child| (child, 1)));
        for (next, step) in links {
            if !visited.insert(next) {
                continue;
            }
            if !generation.contains_key(&next) {
                let value = current_generation + step;
                let members = groups.get(&next).map(Vec::as_slice).unwrap_or(&[]);
                for member in std::iter::once(&next).chain(members) {
                    generation.entry(*member).or_insert(value);
                }
            }
            queue.push_back(next);
        }
    }

    ordered
}

/// Spouse-connected groups keyed by each member, members in visit order.
fn spouse_groups(graph: &FamilyGraph, people: &[PersonId]) -> HashMap<PersonId, Vec<PersonId>> {
    let mut groups = HashMap::new();
    for person in people {
        if groups.contains_key(person) {
            continue;
        }
        let mut members = vec![*person];
        members.extend(
            walk(*person, |current| graph.spouses_of(current))
                .into_iter()
                .map(|(spouse, _)| spouse),
        );
        for member in &members {
            groups.insert(*member, members.clone());
        }
    }
    groups
}

/// Pulls a spouse group onto one generation when its fixed members allow it. A group
/// holding both an ancestor and a descendant of the root keeps their rows; its other
/// members follow the first fixed member.
fn align_group(group: &[PersonId], generation: &mut HashMap<PersonId, i32>) {
    let fixed: Vec<i32> = group
        .iter()
        .filter_map(|member| generation.get(member).copied())
        .collect();
    let Some(first) = fixed.first().copied() else {
        return;
    };
    let above = fixed.iter().copied().filter(|value| *value < 0).max();
    let below = fixed.iter().copied().filter(|value| *value > 0).min();
    let at_root = fixed.contains(&0);

    let target = match (above, below, at_root) {
        (Some(value), None, false) | (None, Some(value), false) => Some(value),
        (None, None, true) => Some(0),
        _ => None,
    };
    for member in group {
        match target {
            Some(value) => {
                generation.insert(*member, value);
            }
            None => {
                generation.entry(*member).or_insert(first);
            }
        }
    }
}

fn neighbours(graph: &FamilyGraph, id: PersonId) -> Vec<PersonId> {
    let mut out = graph.spouses_of(id);
    out.extend(graph.parents_of(id));
    out.extend(graph.children_of(id));
    out
}

/// Breadth-first walk from `start`, returning each newly reached person with its distance.
/// The start node is excluded.
fn walk(start: PersonId, next: impl Fn(PersonId) -> Vec<PersonId>) -> Vec<(PersonId, usize)> {
    let mut reached = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back((start, 0usize));

    while let Some((current, depth)) = queue.pop_front() {
        for relative in next(current) {
            if visited.insert(relative) {
                reached.push((relative, depth + 1));
                queue.push_back((relative, depth + 1));
            }
        }
    }

    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FamilyBuilder, pid, three_generations};

    #[test]
    fn descendants_and_ancestors_follow_one_direction() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");

        let below = descendants(&graph, family.father);
        assert_eq!(below, vec![family.son, family.daughter, family.grandson]);

        let above = ancestors(&graph, family.grandson);
        assert_eq!(
            above,
            vec![family.son, family.father, family.mother, family.grandpa, family.grandma]
        );
    }

    #[test]
    fn generations_put_ancestors_above_and_descendants_below() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let generations: HashMap<_, _> = assign_generations(&graph, family.son).into_iter().collect();

        assert_eq!(generations[&family.son], 0);
        assert_eq!(generations[&family.daughter], 0);
        assert_eq!(generations[&family.father], -1);
        assert_eq!(generations[&family.mother], -1);
        assert_eq!(generations[&family.grandpa], -2);
        assert_eq!(generations[&family.grandma], -2);
        assert_eq!(generations[&family.grandson], 1);
    }

    #[test]
    fn spouse_shares_partner_generation() {
        let mut family = FamilyBuilder::new();
        let root = family.person("Root");
        let child = family.person("Child");
        let in_law = family.person("InLaw");
        family.parent_child(root, child).spouses(child, in_law);
        let graph = FamilyGraph::new(family.build()).expect("graph");

        let generations: HashMap<_, _> = assign_generations(&graph, root).into_iter().collect();
        assert_eq!(generations[&in_law], 1);
    }

    #[test]
    fn spouses_reached_at_different_depths_share_a_generation() {
        // A is a grandparent through M and a great-grandparent through F; his wife B
        // only appears on F's line.
        let mut family = FamilyBuilder::new();
        let root = family.person("Root");
        let m = family.person("M");
        let f = family.person("F");
        let a = family.person("A");
        let c = family.person("C");
        let b = family.person("B");
        let x = family.person("X");
        family
            .parent_child(m, root)
            .parent_child(f, root)
            .spouses(m, f)
            .parent_child(a, m)
            .parent_child(c, m)
            .spouses(a, c)
            .parent_child(a, x)
            .parent_child(b, x)
            .spouses(a, b)
            .parent_child(x, f);
        let people = family.build();
        crate::invariants::ensure_kinship_invariants(&people).expect("consistent");
        let graph = FamilyGraph::new(people).expect("graph");

        let generations: HashMap<_, _> = assign_generations(&graph, root).into_iter().collect();
        assert_eq!(generations[&a], generations[&b]);
        assert_eq!(generations[&a], generations[&c]);
        assert!(generations[&b] < 0);
        assert!(generations[&x] < 0);
    }

    #[test]
    fn spouse_of_in_law_follows_first_link() {
        let mut family = FamilyBuilder::new();
        let root = family.person("Root");
        let child = family.person("Child");
        let in_law = family.person("InLaw");
        let second = family.person("Second");
        family
            .parent_child(root, child)
            .spouses(child, in_law)
            .spouses(in_law, second);
        let graph = FamilyGraph::new(family.build()).expect("graph");

        let generations: HashMap<_, _> = assign_generations(&graph, root).into_iter().collect();
        assert_eq!(generations[&second], 1);
    }

    #[test]
    fn disconnected_people_are_not_reached() {
        let mut family = FamilyBuilder::new();
        let a = family.person("A");
        let b = family.person("B");
        let loner = family.person("Loner");
        family.spouses(a, b);
        let graph = FamilyGraph::new(family.build()).expect("graph");

        let reached = reachable_from(&graph, a);
        assert_eq!(reached, vec![a, b]);
        assert!(!reached.contains(&loner));
        assert!(reachable_from(&graph, pid(77)).is_empty());
        assert!(assign_generations(&graph, pid(77)).is_empty());
    }
}
