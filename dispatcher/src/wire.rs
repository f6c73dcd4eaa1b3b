// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! JSON wire shapes for the three outbound collaborators (§6). Kept separate from the domain
//! types in `evccore`/`pathmodel`/`flowbuilder` so those crates never depend on `serde_json`'s
//! request/response framing, only on `FlowMod`'s own `Serialize` impl.

use evccore::collaborators::{PathConstraints, TraceOut, TraceProbe, TraceStep, TraceStepKind};
use flowbuilder::{FlowMatch, FlowMod};
use pathmodel::CandidatePath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `POST /pathfinder/v*/` request body (§6).
#[derive(Debug, Serialize)]
pub(crate) struct PathFinderRequest<'a> {
    pub(crate) source: &'a str,
    pub(crate) destination: &'a str,
    pub(crate) spf_max_paths: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) spf_attribute: Option<&'a str>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub(crate) mandatory_metrics: &'a HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub(crate) flexible_metrics: &'a HashMap<String, serde_json::Value>,
    /// Not part of the distilled spec's literal request schema, but the only way
    /// `deploy_avoiding`'s "wait for old path" hint (§4.9) can reach the path finder at all;
    /// resolved as a forward-compatible extra field per the Design Notes' "strict tagged
    /// records with an explicit extra map" guidance. Omitted entirely when empty so a path
    /// finder that does not understand the field never sees it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) avoid_recently_used: &'a [(String, u16)],
}

impl<'a> PathFinderRequest<'a> {
    pub(crate) fn new(
        source: &'a str,
        destination: &'a str,
        spf_max_paths: u32,
        spf_attribute: Option<&'a str>,
        constraints: &'a PathConstraints,
    ) -> Self {
        Self {
            source,
            destination,
            spf_max_paths,
            spf_attribute: constraints.spf_attribute.as_deref().or(spf_attribute),
            mandatory_metrics: &constraints.mandatory_metrics,
            flexible_metrics: &constraints.flexible_metrics,
            avoid_recently_used: &constraints.avoid_recently_used,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PathFinderResponse {
    pub(crate) paths: Vec<PathFinderHop>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PathFinderHop {
    pub(crate) hops: Vec<String>,
    pub(crate) cost: f64,
}

impl From<PathFinderHop> for CandidatePath {
    fn from(hop: PathFinderHop) -> Self {
        CandidatePath {
            hops: hop.hops,
            cost: hop.cost,
        }
    }
}

/// The per-switch `{flows: [...]}` wrapper the flow manager expects as each value in a
/// `flows_by_switch` body (§6). The outer map (`dpid -> FlowsWire`) is posted to
/// `flows_by_switch/` in a single request; see [`crate::flowmanager`].
#[derive(Debug, Serialize)]
pub(crate) struct FlowsWire<'a> {
    pub(crate) flows: &'a [FlowMod],
}

/// Every flow this engine installs matches deletions with `cookie_mask = 0xFFFF_FFFF_FFFF_FFFF`
/// (§3), so a delete targets exactly the cookie it names.
pub(crate) const COOKIE_MASK: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// A cookie-masked delete entry (§3, §4.5's "cookie-masked delete"): matches by `cookie`/
/// `cookie_mask` alone rather than the full install-shaped match/actions/priority, mirroring the
/// original `prepare_delete_flow` (`utils.py`).
#[derive(Debug, Serialize)]
pub(crate) struct FlowDeleteWire {
    #[serde(rename = "match")]
    pub(crate) match_: FlowMatch,
    pub(crate) cookie: u64,
    pub(crate) owner: &'static str,
    pub(crate) cookie_mask: u64,
}

impl From<&FlowMod> for FlowDeleteWire {
    fn from(flow: &FlowMod) -> Self {
        FlowDeleteWire {
            match_: flow.match_,
            cookie: flow.cookie,
            owner: flow.owner,
            cookie_mask: COOKIE_MASK,
        }
    }
}

/// The per-switch `{flows: [...]}` wrapper for a delete batch, the cookie-masked counterpart of
/// [`FlowsWire`].
#[derive(Debug, Serialize)]
pub(crate) struct FlowsDeleteWire {
    pub(crate) flows: Vec<FlowDeleteWire>,
}

/// One probe entry of a trace request body (§6): `{trace: {switch: {dpid, in_port}, eth?}}`.
#[derive(Debug, Serialize)]
pub(crate) struct TraceRequestEntry {
    pub(crate) trace: TraceSpec,
}

#[derive(Debug, Serialize)]
pub(crate) struct TraceSpec {
    pub(crate) switch: TraceSwitch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) eth: Option<TraceEth>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TraceSwitch {
    pub(crate) dpid: String,
    pub(crate) in_port: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TraceEth {
    pub(crate) dl_type: u16,
    pub(crate) dl_vlan: u16,
}

/// Ethertype for 802.1Q-tagged probes, when a probe carries a specific VLAN to match on.
const ETH_TYPE_VLAN: u16 = 0x8100;

impl From<&TraceProbe> for TraceRequestEntry {
    fn from(probe: &TraceProbe) -> Self {
        TraceRequestEntry {
            trace: TraceSpec {
                switch: TraceSwitch {
                    dpid: probe.dpid.clone(),
                    in_port: probe.in_port,
                },
                eth: probe.vlan.map(|vlan| TraceEth {
                    dl_type: ETH_TYPE_VLAN,
                    dl_vlan: vlan,
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TraceResponse {
    pub(crate) result: Vec<Vec<TraceStepWire>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TraceStepWire {
    pub(crate) dpid: String,
    pub(crate) port: u32,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) vlan: Option<u16>,
    #[serde(default)]
    pub(crate) out: Option<TraceOutWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TraceOutWire {
    pub(crate) port: u32,
    #[serde(default)]
    pub(crate) vlan: Option<u16>,
}

impl TraceStepWire {
    pub(crate) fn into_step(self) -> Option<TraceStep> {
        let kind = match self.kind.as_str() {
            "starting" => TraceStepKind::Starting,
            "intermediary" => TraceStepKind::Intermediary,
            "last" => TraceStepKind::Last,
            "loop" => TraceStepKind::Loop,
            _ => return None,
        };
        Some(TraceStep {
            dpid: self.dpid,
            port: self.port,
            kind,
            vlan: self.vlan,
            out: self.out.map(|out| TraceOut {
                port: out.port,
                vlan: out.vlan,
            }),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_empty_avoid_recently_used() {
        let constraints = PathConstraints::default();
        let body = PathFinderRequest::new("sw-a", "sw-z", 2, Some("hop"), &constraints);
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("avoid_recently_used").is_none());
        assert_eq!(value["spf_attribute"], "hop");
    }

    #[test]
    fn request_carries_avoid_recently_used_when_set() {
        let mut constraints = PathConstraints::default();
        constraints.avoid_recently_used = vec![("link-1".to_string(), 105)];
        let body = PathFinderRequest::new("sw-a", "sw-z", 2, Some("hop"), &constraints);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["avoid_recently_used"], serde_json::json!([["link-1", 105]]));
    }

    #[test]
    fn constraint_spf_attribute_overrides_the_process_default() {
        let mut constraints = PathConstraints::default();
        constraints.spf_attribute = Some("delay".to_string());
        let body = PathFinderRequest::new("sw-a", "sw-z", 2, Some("hop"), &constraints);
        assert_eq!(body.spf_attribute, Some("delay"));
    }

    #[test]
    fn hop_converts_into_a_candidate_path() {
        let hop = PathFinderHop {
            hops: vec!["iface-1".to_string(), "iface-2".to_string()],
            cost: 3.5,
        };
        let candidate: CandidatePath = hop.into();
        assert_eq!(candidate.hops, vec!["iface-1".to_string(), "iface-2".to_string()]);
        assert!((candidate.cost - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn probe_without_vlan_omits_eth() {
        let probe = TraceProbe {
            dpid: "00:00:00:00:00:00:00:01".to_string(),
            in_port: 3,
            vlan: None,
        };
        let entry = TraceRequestEntry::from(&probe);
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value["trace"].get("eth").is_none());
    }

    #[test]
    fn probe_with_vlan_tags_the_eth_match() {
        let probe = TraceProbe {
            dpid: "00:00:00:00:00:00:00:01".to_string(),
            in_port: 3,
            vlan: Some(105),
        };
        let entry = TraceRequestEntry::from(&probe);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["trace"]["eth"]["dl_vlan"], 105);
        assert_eq!(value["trace"]["eth"]["dl_type"], 0x8100);
    }

    #[test]
    fn delete_wire_drops_actions_and_priority_but_keeps_cookie_mask() {
        let flow = FlowMod {
            match_: FlowMatch { in_port: 1, dl_vlan: None },
            actions: vec![flowbuilder::FlowAction::Output { port: 2 }],
            cookie: 0xaa00_0000_0000_0042,
            priority: 1000,
            owner: "mef_eline",
            table_id: 0,
            table_group: flowbuilder::TableGroup::Epl,
        };
        let delete = FlowDeleteWire::from(&flow);
        let value = serde_json::to_value(&delete).unwrap();
        assert_eq!(value["cookie"], 0xaa00_0000_0000_0042u64);
        assert_eq!(value["cookie_mask"], 0xFFFF_FFFF_FFFF_FFFFu64);
        assert_eq!(value["owner"], "mef_eline");
        assert!(value.get("actions").is_none());
        assert!(value.get("priority").is_none());
    }

    #[test]
    fn unknown_step_kind_is_dropped() {
        let wire = TraceStepWire {
            dpid: "00:00:00:00:00:00:00:01".to_string(),
            port: 1,
            kind: "unrecognized".to_string(),
            vlan: None,
            out: None,
        };
        assert!(wire.into_step().is_none());
    }

    #[test]
    fn last_step_carries_its_out_port_and_vlan() {
        let wire = TraceStepWire {
            dpid: "00:00:00:00:00:00:00:02".to_string(),
            port: 4,
            kind: "last".to_string(),
            vlan: Some(105),
            out: Some(TraceOutWire { port: 7, vlan: Some(105) }),
        };
        let step = wire.into_step().unwrap();
        assert_eq!(step.kind, TraceStepKind::Last);
        assert_eq!(step.out, Some(TraceOut { port: 7, vlan: Some(105) }));
    }
}
