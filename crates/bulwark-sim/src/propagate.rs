//! Blast-radius propagation.
//!
//! Depth-first walk from each entry point over the component arena. A node
//! is visited at most once per simulation; compromised nodes expand into
//! their neighbours, anything else blocks propagation. The walk uses an
//! explicit stack and reproduces the visiting order of the recursive form:
//! neighbours are pushed in reverse and the visited check happens on pop.

use serde::Serialize;

use bulwark_core::Component;

use crate::graph::ComponentGraph;
use crate::profile::NodeProfile;

/// Why a component fell.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CompromiseReason {
    /// Own score at or above the compromise threshold.
    HighScore,
    /// Reached from a compromised neighbour with a nonzero score.
    LateralMovement,
    /// The internet itself.
    ExternalVector,
}

/// A compromised component and how the attacker got there.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Compromise {
    pub component_id: String,
    pub reason: CompromiseReason,
    /// The compromised neighbour it was reached from; `None` for entry points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(skip)]
    pub index: usize,
}

/// Outcome of one propagation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Compromised components in the order they fell.
    pub compromised: Vec<Compromise>,
    /// Components the walk reached, compromised or not.
    pub visited: usize,
}

impl Propagation {
    pub fn compromised_ids(&self) -> Vec<String> {
        self.compromised
            .iter()
            .map(|c| c.component_id.clone())
            .collect()
    }
}

/// Decide whether `component` falls when reached, returning the reason.
///
/// Rules are checked in order: own score at the threshold, lateral movement
/// through any residual weakness, then the internet node itself.
pub fn compromise_reason(
    score: u32,
    component: &Component,
    came_from: Option<usize>,
    threshold: u32,
) -> Option<CompromiseReason> {
    if score >= threshold {
        Some(CompromiseReason::HighScore)
    } else if came_from.is_some() && score > 0 {
        Some(CompromiseReason::LateralMovement)
    } else if component.configuration.is_internet() {
        Some(CompromiseReason::ExternalVector)
    } else {
        None
    }
}

/// Run the walk from `entry_points` (dense indices, in order).
///
/// `profiles` is parallel to `graph.nodes`. Visited state is shared across
/// entry points, so the result is the union of their blast radii.
pub fn propagate(
    graph: &ComponentGraph<'_>,
    profiles: &[NodeProfile],
    entry_points: &[usize],
    threshold: u32,
) -> Propagation {
    let mut visited = vec![false; graph.node_count()];
    let mut result = Propagation::default();
    let mut stack: Vec<(usize, Option<usize>)> = Vec::new();

    for &entry in entry_points {
        // A duplicate id shares the visited slot of its first occurrence.
        let Some(entry) = graph.index_of(&graph.nodes[entry].id) else {
            continue;
        };
        stack.push((entry, None));

        while let Some((node, came_from)) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            result.visited += 1;

            let component = &graph.nodes[node];
            let Some(reason) = compromise_reason(profiles[node].score, component, came_from, threshold)
            else {
                tracing::trace!(component = %component.id, "Propagation blocked");
                continue;
            };

            result.compromised.push(Compromise {
                component_id: component.id.clone(),
                reason,
                via: came_from.map(|from| graph.nodes[from].id.clone()),
                index: node,
            });

            for link in graph.links(node).iter().rev() {
                if let Some(target) = link.target {
                    stack.push((target, Some(node)));
                }
            }
        }
    }

    result
}
