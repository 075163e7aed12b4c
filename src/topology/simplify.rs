//! Visvalingam-Whyatt simplification of topology arcs.
//!
//! [`presimplify`] tags every arc point with the area of the triangle it
//! forms with its neighbours at the moment it would be removed. [`simplify`]
//! then drops points below a weight threshold. Arc endpoints are never
//! dropped, so arcs shared by two regions stay shared.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{Position, Topology};

/// Smallest positive `f64` (a subnormal): keeps every point whose
/// triangle has any area at all.
pub const DEFAULT_MIN_WEIGHT: f64 = 5e-324;

fn planar_triangle_area(a: &[f64], b: &[f64], c: &[f64]) -> f64 {
    ((a[0] - c[0]) * (b[1] - a[1]) - (a[0] - b[0]) * (c[1] - a[1])).abs() / 2.0
}

/// A candidate for removal, ordered so the heap pops the smallest area first.
#[derive(Debug)]
struct Candidate {
    area: f64,
    index: usize,
    version: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .area
            .total_cmp(&self.area)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Returns the topology with a removal weight appended to every arc point.
pub fn presimplify(mut topology: Topology) -> Topology {
    for arc in &mut topology.arcs {
        let weights = effective_areas(arc);
        for (position, weight) in arc.iter_mut().zip(weights) {
            position.truncate(2);
            position.push(weight);
        }
    }
    topology
}

/// Computes each point's effective area.
///
/// A point is never weighted below a point removed before it, so removing
/// everything under a threshold removes a prefix of the elimination order.
fn effective_areas(arc: &[Position]) -> Vec<f64> {
    let n = arc.len();
    let mut weights = vec![f64::INFINITY; n];
    if n < 3 {
        return weights;
    }

    let mut previous: Vec<usize> = (0..n).map(|i| i.saturating_sub(1)).collect();
    let mut next: Vec<usize> = (0..n).map(|i| (i + 1).min(n - 1)).collect();
    let mut versions = vec![0u32; n];
    let mut removed = vec![false; n];
    let mut heap = BinaryHeap::with_capacity(n - 2);

    for i in 1..n - 1 {
        weights[i] = planar_triangle_area(&arc[i - 1], &arc[i], &arc[i + 1]);
        heap.push(Candidate {
            area: weights[i],
            index: i,
            version: 0,
        });
    }

    let mut max_weight: f64 = 0.0;
    while let Some(candidate) = heap.pop() {
        let i = candidate.index;
        if removed[i] || candidate.version != versions[i] {
            continue;
        }
        removed[i] = true;

        if weights[i] < max_weight {
            weights[i] = max_weight;
        } else {
            max_weight = weights[i];
        }

        let (p, q) = (previous[i], next[i]);
        next[p] = q;
        previous[q] = p;

        for j in [p, q] {
            if j == 0 || j == n - 1 {
                continue;
            }
            weights[j] = planar_triangle_area(&arc[previous[j]], &arc[j], &arc[next[j]]);
            versions[j] += 1;
            heap.push(Candidate {
                area: weights[j],
                index: j,
                version: versions[j],
            });
        }
    }

    weights
}

/// Returns the topology with every arc point below `min_weight` removed.
///
/// Points without a weight (the topology was never presimplified) are kept.
/// Weights are stripped from the output.
pub fn simplify(mut topology: Topology, min_weight: f64) -> Topology {
    let before = topology.arc_position_count();

    for arc in &mut topology.arcs {
        arc.retain(|position| position.get(2).map_or(true, |&w| w >= min_weight));
        for position in arc.iter_mut() {
            position.truncate(2);
        }
    }

    log::debug!(
        "Simplified arcs from {} to {} points",
        before,
        topology.arc_position_count()
    );

    topology
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn topology_with_arc(points: &[[f64; 2]]) -> Topology {
        Topology {
            bbox: None,
            objects: BTreeMap::new(),
            arcs: vec![points.iter().map(|p| p.to_vec()).collect()],
        }
    }

    #[test]
    fn test_endpoints_are_never_removed() {
        let topo = presimplify(topology_with_arc(&[[0.0, 0.0], [1.0, 5.0], [2.0, 0.0]]));
        let arc = &topo.arcs[0];
        assert_eq!(arc[0][2], f64::INFINITY);
        assert_eq!(arc[2][2], f64::INFINITY);
        assert_eq!(arc[1][2], 5.0);
    }

    #[test]
    fn test_collinear_points_are_dropped() {
        let topo = presimplify(topology_with_arc(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 1.0],
        ]));
        let topo = simplify(topo, DEFAULT_MIN_WEIGHT);
        assert_eq!(
            topo.arcs[0],
            vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![3.0, 1.0]]
        );
    }

    #[test]
    fn test_weights_never_decrease_along_elimination_order() {
        // Removing (3, 0.5) and then (1, 2) leaves (2, 0) on a straight line,
        // but it may not be weighted below the point removed before it.
        let topo = presimplify(topology_with_arc(&[
            [0.0, 0.0],
            [1.0, 2.0],
            [2.0, 0.0],
            [3.0, 0.5],
            [4.0, 0.0],
        ]));
        let weights: Vec<f64> = topo.arcs[0].iter().map(|p| p[2]).collect();
        assert_eq!(weights, vec![f64::INFINITY, 2.0, 2.0, 0.5, f64::INFINITY]);
    }

    #[test]
    fn test_threshold_keeps_heavy_points() {
        let topo = presimplify(topology_with_arc(&[
            [0.0, 0.0],
            [1.0, 2.01],
            [2.0, 4.0],
            [4.0, 0.0],
        ]));
        let topo = simplify(topo, 1.0);
        assert_eq!(
            topo.arcs[0],
            vec![vec![0.0, 0.0], vec![2.0, 4.0], vec![4.0, 0.0]]
        );
    }

    #[test]
    fn test_unweighted_points_survive() {
        let topo = simplify(
            topology_with_arc(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]),
            DEFAULT_MIN_WEIGHT,
        );
        assert_eq!(topo.arcs[0].len(), 3);
    }

    #[test]
    fn test_default_threshold_keeps_subnormal_areas() {
        assert_eq!(DEFAULT_MIN_WEIGHT.to_bits(), 1);

        let topo = presimplify(topology_with_arc(&[[0.0, 0.0], [1.0, 2e-310], [2.0, 0.0]]));
        let weight = topo.arcs[0][1][2];
        assert!(weight > 0.0 && weight < f64::MIN_POSITIVE);

        let topo = simplify(topo, DEFAULT_MIN_WEIGHT);
        assert_eq!(topo.arcs[0].len(), 3);
    }
}
