// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ranking path finder candidates by disjointness from a broken path (§4.7).

use crate::path::Path;
use id::Id;
use std::collections::HashSet;
use topology::{Link, Topology};

/// A raw candidate path as returned by the path finder, still carrying its hop list so
/// disjointness can be scored against the unfiltered hops (switches included) before the
/// interface-only pairing in [`Path::from_hops`] discards them.
#[derive(Debug, Clone)]
pub struct CandidatePath {
    pub hops: Vec<String>,
    pub cost: f64,
}

/// The unordered pair of endpoint interface ids a link connects, used as a link's identity for
/// shared-component counting independent of `Id<Link>` (candidates may reference links the
/// topology hasn't resolved into a `Path` yet).
fn link_identity(topology: &Topology, link: Id<Link>) -> Option<(String, String)> {
    let link = topology.links.get(link)?;
    let a = topology.interfaces.get(link.endpoint_a())?;
    let b = topology.interfaces.get(link.endpoint_b())?;
    let (a, b) = (a.interface_id().to_string(), b.interface_id().to_string());
    Some(if a <= b { (a, b) } else { (b, a) })
}

/// Every transit switch (UNI switches excluded) visited by `hops`, matched by dpid.
fn transit_switches(hops: &[String]) -> HashSet<&str> {
    let interface_positions: Vec<usize> = hops
        .iter()
        .enumerate()
        .filter(|(_, hop)| hop.len() > 23)
        .map(|(i, _)| i)
        .collect();

    let Some(&first_iface) = interface_positions.first() else {
        return HashSet::new();
    };
    let Some(&last_iface) = interface_positions.last() else {
        return HashSet::new();
    };

    hops.iter()
        .enumerate()
        .filter(|(i, hop)| *i > first_iface && *i < last_iface && hop.len() <= 23)
        .map(|(_, hop)| hop.as_str())
        .collect()
}

/// Shared links and shared transit switches between two raw hop lists, mirroring the source's
/// `get_shared_components`. A link's two endpoint interface ids are always directly adjacent in
/// an unfiltered hop list, so `windows(2)` over the raw hops (no interface-only filtering) finds
/// every link without needing the topology to resolve ids first.
fn shared_components(unwanted_hops: &[String], candidate_hops: &[String]) -> (usize, usize) {
    let edge_set = |hops: &[String]| -> HashSet<(String, String)> {
        hops.windows(2)
            .filter(|pair| pair[0].len() > 23 && pair[1].len() > 23)
            .map(|pair| {
                let (a, b) = (pair[0].clone(), pair[1].clone());
                if a <= b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect()
    };

    let unwanted_edges = edge_set(unwanted_hops);
    let candidate_edges = edge_set(candidate_hops);
    let shared_links = unwanted_edges.intersection(&candidate_edges).count();

    let unwanted_switches = transit_switches(unwanted_hops);
    let candidate_switches = transit_switches(candidate_hops);
    let shared_switches = unwanted_switches.intersection(&candidate_switches).count();

    (shared_links, shared_switches)
}

/// A ranked, resolved alternative to a broken path.
#[derive(Debug, Clone)]
pub struct RankedPath {
    pub path: Path,
    pub disjointness: f64,
    pub cost: f64,
}

/// Rank path finder candidates against `unwanted_hops` (the just-broken path's raw hop list),
/// resolve each surviving candidate into a [`Path`] of registered links, and return them ordered
/// by `(-disjointness, cost)`. Candidates with `disjointness == 0`, or that fail to resolve
/// against the topology, are dropped.
#[must_use]
pub fn disjoint_paths(
    topology: &Topology,
    unwanted_hops: &[String],
    candidates: &[CandidatePath],
) -> Vec<RankedPath> {
    let interface_hop_count = unwanted_hops.iter().filter(|h| h.len() > 23).count();
    let switch_hop_count = transit_switches(unwanted_hops).len();
    let link_count = interface_hop_count / 2;
    #[allow(clippy::cast_precision_loss)]
    let total = (link_count + switch_hop_count) as f64;

    let mut ranked: Vec<RankedPath> = candidates
        .iter()
        .filter_map(|candidate| {
            let (shared_links, shared_switches) = shared_components(unwanted_hops, &candidate.hops);
            #[allow(clippy::cast_precision_loss)]
            let disjointness = if total > 0.0 {
                1.0 - (shared_links + shared_switches) as f64 / total
            } else {
                1.0
            };
            if disjointness <= 0.0 {
                return None;
            }
            let path = Path::from_hops(topology, &candidate.hops).ok()?;
            Some(RankedPath {
                path,
                disjointness,
                cost: candidate.cost,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.disjointness
            .partial_cmp(&a.disjointness)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cost.partial_cmp(&b.cost).unwrap_or(std::cmp::Ordering::Equal))
    });
    ranked
}

/// Count of shared links between two already-resolved paths, using the registry rather than raw
/// hop lists (used once candidates have already been turned into `Path`s, e.g. when checking
/// `failover_path` against `current_path` for the no-shared-switch invariant in §3).
#[must_use]
pub fn shared_links(topology: &Topology, a: &Path, b: &Path) -> usize {
    let identities: HashSet<(String, String)> = a
        .links()
        .iter()
        .filter_map(|&link| link_identity(topology, link))
        .collect();
    b.links()
        .iter()
        .filter_map(|&link| link_identity(topology, link))
        .filter(|identity| identities.contains(identity))
        .count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use topology::{Interface, Link, Switch};

    fn linear_topology() -> (Topology, Vec<String>) {
        let topology = Topology::new();
        let sw1 = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:01"));
        let sw2 = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:02"));
        let sw3 = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:03"));

        let if1 = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:01:1", sw1, 1));
        let if2a = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:02:1", sw2, 1));
        let if2b = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:02:2", sw2, 2));
        let if3 = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:03:1", sw3, 1));

        let link_a = topology.links.insert(Link::new(if1, if2a));
        let link_b = topology.links.insert(Link::new(if2b, if3));
        for (iface, link) in [(if1, link_a), (if2a, link_a), (if2b, link_b), (if3, link_b)] {
            topology.interfaces.get(iface).unwrap().set_current_link(Some(link));
        }

        let hops = vec![
            "00:00:00:00:00:00:00:01:1".to_string(),
            "00:00:00:00:00:00:00:02".to_string(),
            "00:00:00:00:00:00:00:02:1".to_string(),
            "00:00:00:00:00:00:00:02:2".to_string(),
            "00:00:00:00:00:00:00:02".to_string(),
            "00:00:00:00:00:00:00:03:1".to_string(),
        ];
        (topology, hops)
    }

    #[test]
    fn identical_candidate_is_rejected_as_not_disjoint() {
        let (topology, hops) = linear_topology();
        let candidates = vec![CandidatePath {
            hops: hops.clone(),
            cost: 2.0,
        }];
        let ranked = disjoint_paths(&topology, &hops, &candidates);
        assert!(ranked.is_empty());
    }

    #[test]
    fn fully_disjoint_candidate_ranks_first() {
        let (topology, hops) = linear_topology();

        // Build a second route, sw1 -- sw4 -- sw3, sharing no link or transit switch with the
        // unwanted sw1 -- sw2 -- sw3 route.
        let sw1 = topology
            .switches
            .get(topology.interfaces.find_by_wire_id("00:00:00:00:00:00:00:01:1").unwrap())
            .unwrap()
            .switch();
        let sw1 = topology.switches.get(sw1).unwrap().id();
        let sw3 = topology
            .switches
            .get(
                topology
                    .interfaces
                    .get(
                        topology
                            .interfaces
                            .find_by_wire_id("00:00:00:00:00:00:00:03:1")
                            .unwrap(),
                    )
                    .unwrap()
                    .switch(),
            )
            .unwrap()
            .id();
        let sw4 = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:04"));

        let if1_alt = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:01:9", sw1, 9));
        let if4a = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:04:1", sw4, 1));
        let if4b = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:04:2", sw4, 2));
        let if3_alt = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:03:9", sw3, 9));

        let link_c = topology.links.insert(Link::new(if1_alt, if4a));
        let link_d = topology.links.insert(Link::new(if4b, if3_alt));
        for (iface, link) in [
            (if1_alt, link_c),
            (if4a, link_c),
            (if4b, link_d),
            (if3_alt, link_d),
        ] {
            topology.interfaces.get(iface).unwrap().set_current_link(Some(link));
        }

        let alt_hops = vec![
            "00:00:00:00:00:00:00:01:9".to_string(),
            "00:00:00:00:00:00:00:04".to_string(),
            "00:00:00:00:00:00:00:04:1".to_string(),
            "00:00:00:00:00:00:00:04:2".to_string(),
            "00:00:00:00:00:00:00:04".to_string(),
            "00:00:00:00:00:00:00:03:9".to_string(),
        ];

        let candidates = vec![
            CandidatePath {
                hops: hops.clone(),
                cost: 1.0,
            },
            CandidatePath {
                hops: alt_hops,
                cost: 5.0,
            },
        ];

        let ranked = disjoint_paths(&topology, &hops, &candidates);
        assert_eq!(ranked.len(), 1, "the identical candidate must be rejected");
        assert!((ranked[0].disjointness - 1.0).abs() < f64::EPSILON);
        assert_eq!(ranked[0].path.links().len(), 2);
    }
}
