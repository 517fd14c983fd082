//! Generational grid layout.
//!
//! Rows are generations relative to the chosen root, top to bottom. Within a row people are
//! ordered by the mean column of their already placed relatives in the neighbouring row
//! (parents for rows below the root, children for rows above), ties broken by traversal
//! order, and spouses are pulled next to their partner. Rows are then centred on the widest
//! row. Coordinates are abstract grid cells; pixel conversion belongs to the viewport.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::anyhow;
use serde::Serialize;

use crate::algorithms;
use crate::error::{LibError, Result};
use crate::graph::FamilyGraph;
use crate::models::PersonId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPerson {
    pub id: PersonId,
    pub col: u32,
    pub row: u32,
}

impl PlacedPerson {
    pub fn center(&self) -> GridPoint {
        GridPoint {
            x: self.col as f64 + 0.5,
            y: self.row as f64 + 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    ParentChild,
    Spouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub kind: ConnectorKind,
    pub from_id: PersonId,
    pub to_id: PersonId,
    pub from: GridPoint,
    pub to: GridPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeLayout {
    pub root_id: PersonId,
    /// Sorted by row, then column.
    pub nodes: Vec<PlacedPerson>,
    pub connectors: Vec<Connector>,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl TreeLayout {
    pub fn position(&self, id: PersonId) -> Option<&PlacedPerson> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&PlacedPerson> {
        self.position(self.root_id)
    }
}

/// Lays out everyone reachable from `root_id`. Unknown roots yield a `NotFound` error.
pub fn compute_layout(graph: &FamilyGraph, root_id: PersonId) -> Result<TreeLayout> {
    let generations = algorithms::assign_generations(graph, root_id);
    if generations.is_empty() {
        return Err(LibError::not_found(
            "Family tree not found for the selected person",
            anyhow!("layout root {} is not in the snapshot", root_id),
        ));
    }

    let visit_order: HashMap<PersonId, usize> = generations
        .iter()
        .enumerate()
        .map(|(order, (id, _))| (*id, order))
        .collect();
    let mut rows: BTreeMap<i32, Vec<PersonId>> = BTreeMap::new();
    for (id, generation) in &generations {
        rows.entry(*generation).or_default().push(*id);
    }
    let min_generation = rows.keys().next().copied().unwrap_or(0);
    let max_generation = rows.keys().next_back().copied().unwrap_or(0);

    // Row-relative index of each person once its row has been ordered.
    let mut index_in_row: HashMap<PersonId, usize> = HashMap::new();
    let mut ordered_rows: BTreeMap<i32, Vec<PersonId>> = BTreeMap::new();

    let downward = (0..=max_generation).map(|generation| (generation, true));
    let upward = (min_generation..0).rev().map(|generation| (generation, false));
    for (generation, below_root) in downward.chain(upward) {
        let Some(members) = rows.get(&generation) else {
            continue;
        };
        let anchored = |id: PersonId| -> Option<f64> {
            if generation == 0 {
                return None;
            }
            let relatives = if below_root {
                graph.parents_of(id)
            } else {
                graph.children_of(id)
            };
            barycenter(&relatives, &index_in_row)
        };

        let mut keyed: Vec<(Option<f64>, usize, PersonId)> = members
            .iter()
            .map(|id| (anchored(*id), visit_order[id], *id))
            .collect();
        keyed.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.total_cmp(&y).then(a.1.cmp(&b.1)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.1.cmp(&b.1),
        });

        let ordered = group_spouses(graph, keyed.into_iter().map(|(_, _, id)| id).collect());
        for (index, id) in ordered.iter().enumerate() {
            index_in_row.insert(*id, index);
        }
        ordered_rows.insert(generation, ordered);
    }

    let canvas_width = ordered_rows.values().map(Vec::len).max().unwrap_or(0) as u32;
    let canvas_height = (max_generation - min_generation + 1) as u32;

    let mut nodes = Vec::with_capacity(generations.len());
    for (generation, members) in &ordered_rows {
        let offset = (canvas_width - members.len() as u32) / 2;
        let row = (generation - min_generation) as u32;
        for (index, id) in members.iter().enumerate() {
            nodes.push(PlacedPerson {
                id: *id,
                col: offset + index as u32,
                row,
            });
        }
    }

    let connectors = connectors(graph, &nodes);
    Ok(TreeLayout {
        root_id,
        nodes,
        connectors,
        canvas_width,
        canvas_height,
    })
}

fn barycenter(relatives: &[PersonId], index_in_row: &HashMap<PersonId, usize>) -> Option<f64> {
    let placed: Vec<usize> = relatives
        .iter()
        .filter_map(|id| index_in_row.get(id).copied())
        .collect();
    if placed.is_empty() {
        return None;
    }
    Some(placed.iter().sum::<usize>() as f64 / placed.len() as f64)
}

/// Keeps the given order but emits each person's same-row spouses right after them.
fn group_spouses(graph: &FamilyGraph, ordered: Vec<PersonId>) -> Vec<PersonId> {
    let in_row: HashSet<PersonId> = ordered.iter().copied().collect();
    let mut emitted = HashSet::with_capacity(ordered.len());
    let mut grouped = Vec::with_capacity(ordered.len());
    for id in &ordered {
        if !emitted.insert(*id) {
            continue;
        }
        grouped.push(*id);
        let spouses = graph.spouses_of(*id);
        for candidate in &ordered {
            if spouses.contains(candidate) && in_row.contains(candidate) && emitted.insert(*candidate)
            {
                grouped.push(*candidate);
            }
        }
    }
    grouped
}

fn connectors(graph: &FamilyGraph, nodes: &[PlacedPerson]) -> Vec<Connector> {
    let placed: HashMap<PersonId, (usize, &PlacedPerson)> = nodes
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.id, (slot, node)))
        .collect();

    let mut out = Vec::new();
    for (slot, node) in nodes.iter().enumerate() {
        for spouse in graph.spouses_of(node.id) {
            if let Some((other_slot, other)) = placed.get(&spouse) {
                if *other_slot > slot {
                    out.push(Connector {
                        kind: ConnectorKind::Spouse,
                        from_id: node.id,
                        to_id: other.id,
                        from: node.center(),
                        to: other.center(),
                    });
                }
            }
        }
        for child in graph.children_of(node.id) {
            if let Some((_, other)) = placed.get(&child) {
                out.push(Connector {
                    kind: ConnectorKind::ParentChild,
                    from_id: node.id,
                    to_id: other.id,
                    from: node.center(),
                    to: other.center(),
                });
            }
        }
    }
    out
}
