// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `(Evc, Path) -> switch_id -> [flow, …]` translation (§4.3).

use crate::errors::FlowBuildError;
use crate::model::{
    cookie_for, tags_for_uni, EvcFlowSpec, FlowAction, FlowMatch, FlowMod, TableGroup, VlanTag,
};
use id::Id;
use std::collections::HashMap;
use std::sync::Arc;
use topology::{Interface, Link, Switch, Topology};

/// Translate `spec` into the flows each touched switch needs installed, per §4.3.
pub fn build_flows(
    topology: &Topology,
    spec: &EvcFlowSpec,
) -> Result<HashMap<Id<Switch>, Vec<FlowMod>>, FlowBuildError> {
    let uni_a_iface = topology
        .interfaces
        .get(spec.uni_a.interface())
        .ok_or_else(|| FlowBuildError::UnknownInterface(spec.uni_a.interface().to_string()))?;
    let uni_z_iface = topology
        .interfaces
        .get(spec.uni_z.interface())
        .ok_or_else(|| FlowBuildError::UnknownInterface(spec.uni_z.interface().to_string()))?;

    let switch_a = uni_a_iface.switch();
    let switch_z = uni_z_iface.switch();

    let mut flows: HashMap<Id<Switch>, Vec<FlowMod>> = HashMap::new();

    if spec.path.is_empty() {
        if switch_a != switch_z {
            return Err(FlowBuildError::PathUniMismatch(
                "path is empty but unis are on different switches".to_string(),
            ));
        }
        build_intra_switch(spec, &uni_a_iface, &uni_z_iface, &mut flows)?;
    } else {
        build_inter_switch(
            topology, spec, &uni_a_iface, &uni_z_iface, switch_a, switch_z, &mut flows,
        )?;
    }

    Ok(flows)
}

/// Both UNIs on the same switch: one flow per (src tag, dst tag) pair, in each direction.
fn build_intra_switch(
    spec: &EvcFlowSpec,
    uni_a_iface: &Interface,
    uni_z_iface: &Interface,
    flows: &mut HashMap<Id<Switch>, Vec<FlowMod>>,
) -> Result<(), FlowBuildError> {
    let switch = uni_a_iface.switch();
    let tags_a = tags_for_uni(&spec.uni_a);
    let tags_z = tags_for_uni(&spec.uni_z);

    let pairs = zip_broadcast(&tags_a, &tags_z)?;

    for (ta, tz) in pairs {
        push_flow(
            flows,
            switch,
            spec,
            ta,
            uni_a_iface.port_number(),
            tz,
            uni_z_iface.port_number(),
        );
        push_flow(
            flows,
            switch,
            spec,
            tz,
            uni_z_iface.port_number(),
            ta,
            uni_a_iface.port_number(),
        );
    }
    Ok(())
}

/// UNIs on different switches: ingress flows at `switch_a`, an NNI translation pair at every
/// transit switch, and egress flows at `switch_z`.
#[allow(clippy::too_many_arguments)]
fn build_inter_switch(
    topology: &Topology,
    spec: &EvcFlowSpec,
    uni_a_iface: &Interface,
    uni_z_iface: &Interface,
    switch_a: Id<Switch>,
    switch_z: Id<Switch>,
    flows: &mut HashMap<Id<Switch>, Vec<FlowMod>>,
) -> Result<(), FlowBuildError> {
    let links: Vec<Arc<Link>> = spec
        .path
        .links()
        .iter()
        .map(|id| {
            topology
                .links
                .get(*id)
                .ok_or_else(|| FlowBuildError::UnknownLink(id.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let s_vlans: Vec<VlanTag> = links
        .iter()
        .map(|link| {
            link.s_vlan()
                .map(VlanTag::Single)
                .ok_or_else(|| FlowBuildError::NoServiceVlan(link.id().to_string()))
        })
        .collect::<Result<_, _>>()?;

    let switches_order = switch_sequence(topology, &links, switch_a)?;
    if switches_order.last().copied() != Some(switch_z) {
        return Err(FlowBuildError::PathUniMismatch(
            "path does not terminate at uni_z's switch".to_string(),
        ));
    }

    let tags_a = tags_for_uni(&spec.uni_a);
    let (_, a_side_port) = link_port_on_switch(topology, &links[0], switch_a)?;
    for &ta in &tags_a {
        push_flow(flows, switch_a, spec, ta, uni_a_iface.port_number(), s_vlans[0], a_side_port);
        push_flow(flows, switch_a, spec, s_vlans[0], a_side_port, ta, uni_a_iface.port_number());
    }

    for i in 1..links.len() {
        let transit = switches_order[i];
        let (_, in_port) = link_port_on_switch(topology, &links[i - 1], transit)?;
        let (_, out_port) = link_port_on_switch(topology, &links[i], transit)?;
        push_flow(flows, transit, spec, s_vlans[i - 1], in_port, s_vlans[i], out_port);
        push_flow(flows, transit, spec, s_vlans[i], out_port, s_vlans[i - 1], in_port);
    }

    let tags_z = tags_for_uni(&spec.uni_z);
    let last = links.len() - 1;
    let (_, z_side_port) = link_port_on_switch(topology, &links[last], switch_z)?;
    for &tz in &tags_z {
        push_flow(flows, switch_z, spec, s_vlans[last], z_side_port, tz, uni_z_iface.port_number());
        push_flow(flows, switch_z, spec, tz, uni_z_iface.port_number(), s_vlans[last], z_side_port);
    }

    Ok(())
}

/// The switch visited at each position along `links`, starting from `first_switch`.
fn switch_sequence(
    topology: &Topology,
    links: &[Arc<Link>],
    first_switch: Id<Switch>,
) -> Result<Vec<Id<Switch>>, FlowBuildError> {
    let mut order = Vec::with_capacity(links.len() + 1);
    order.push(first_switch);
    for link in links {
        let a_switch = topology
            .interfaces
            .get(link.endpoint_a())
            .ok_or_else(|| FlowBuildError::UnknownInterface(link.endpoint_a().to_string()))?
            .switch();
        let b_switch = topology
            .interfaces
            .get(link.endpoint_b())
            .ok_or_else(|| FlowBuildError::UnknownInterface(link.endpoint_b().to_string()))?
            .switch();
        let last = *order.last().ok_or_else(|| {
            FlowBuildError::PathUniMismatch("empty switch sequence".to_string())
        })?;
        let next = if a_switch == last { b_switch } else { a_switch };
        order.push(next);
    }
    Ok(order)
}

/// The endpoint of `link` attached to `switch`, and its port number.
fn link_port_on_switch(
    topology: &Topology,
    link: &Link,
    switch: Id<Switch>,
) -> Result<(Id<Interface>, u32), FlowBuildError> {
    for candidate in [link.endpoint_a(), link.endpoint_b()] {
        let iface = topology
            .interfaces
            .get(candidate)
            .ok_or_else(|| FlowBuildError::UnknownInterface(candidate.to_string()))?;
        if iface.switch() == switch {
            return Ok((candidate, iface.port_number()));
        }
    }
    Err(FlowBuildError::PathUniMismatch(format!(
        "link {} has no endpoint on switch {switch}",
        link.id()
    )))
}

/// Pair up two tag lists index-wise, broadcasting a singleton list against the other (covers
/// plain scalar-to-scalar UNIs as the common case where both lists have length one).
fn zip_broadcast(a: &[VlanTag], b: &[VlanTag]) -> Result<Vec<(VlanTag, VlanTag)>, FlowBuildError> {
    match (a.len(), b.len()) {
        (1, _) => Ok(std::iter::repeat(a[0]).zip(b.iter().copied()).collect()),
        (_, 1) => Ok(a.iter().copied().zip(std::iter::repeat(b[0])).collect()),
        (n, m) if n == m => Ok(a.iter().copied().zip(b.iter().copied()).collect()),
        (n, m) => Err(FlowBuildError::TagRangeLengthMismatch(n, m)),
    }
}

/// Build one direction's match/actions and append the resulting flow mod to `flows`.
#[allow(clippy::too_many_arguments)]
fn push_flow(
    flows: &mut HashMap<Id<Switch>, Vec<FlowMod>>,
    switch: Id<Switch>,
    spec: &EvcFlowSpec,
    in_tag: VlanTag,
    in_port: u32,
    out_tag: VlanTag,
    out_port: u32,
) {
    let (match_, actions) = flow_leg(in_tag, out_tag, in_port, out_port, spec.queue_id);

    let table_group = if matches!(in_tag, VlanTag::Unset) {
        TableGroup::Epl
    } else {
        TableGroup::Evpl
    };
    let priority = spec
        .sb_priority
        .unwrap_or_else(|| spec.priorities.get_priority(in_tag));

    flows.entry(switch).or_default().push(FlowMod {
        match_,
        actions,
        cookie: cookie_for(spec.evc_id),
        priority,
        owner: "mef_eline",
        table_id: spec.table_group.resolve(table_group),
        table_group,
    });
}

/// The match and action chain for one direction of one flow leg (§4.3's case analysis, applied
/// uniformly whether `in_tag`/`out_tag` come from a UNI or from a link's `s_vlan`).
fn flow_leg(
    in_tag: VlanTag,
    out_tag: VlanTag,
    in_port: u32,
    out_port: u32,
    queue_id: Option<u32>,
) -> (FlowMatch, Vec<FlowAction>) {
    let dl_vlan = if matches!(in_tag, VlanTag::Unset) {
        None
    } else {
        Some(in_tag)
    };
    let match_ = FlowMatch { in_port, dl_vlan };

    let mut actions = Vec::new();
    if matches!(in_tag, VlanTag::Any) && matches!(out_tag, VlanTag::Untagged) {
        actions.push(FlowAction::PopVlan);
    } else if !in_tag.is_special() && matches!(out_tag, VlanTag::Untagged) {
        actions.push(FlowAction::PopVlan);
    } else if matches!(in_tag, VlanTag::Unset | VlanTag::Untagged) && !out_tag.is_special() {
        actions.push(FlowAction::PushVlan);
    }

    if !out_tag.is_special() && out_tag != in_tag {
        actions.push(FlowAction::SetVlan { vlan: out_tag });
    }

    if let Some(queue_id) = queue_id {
        actions.push(FlowAction::SetQueue { queue_id });
    }

    actions.push(FlowAction::Output { port: out_port });
    (match_, actions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{EvcId, Priorities, TableGroupIds};
    use topology::{Interface as TopoInterface, Switch as TopoSwitch, Uni, UserTag};

    fn priorities() -> Priorities {
        Priorities {
            epl: 1,
            untagged: 100,
            any: 50,
            evpl: 1000,
        }
    }

    fn table_group_ids() -> TableGroupIds {
        TableGroupIds { evpl: 2, epl: 0 }
    }

    #[test]
    fn intra_switch_tagged_to_tagged_sets_vlan_both_ways() {
        let topology = Topology::new();
        let switch = topology.switches.insert(TopoSwitch::new("sw1"));
        let if_a = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:01:1", switch, 1));
        let if_z = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:01:2", switch, 2));

        let spec = EvcFlowSpec {
            evc_id: EvcId::new(),
            uni_a: Uni::new(if_a, Some(UserTag::Tagged(100))),
            uni_z: Uni::new(if_z, Some(UserTag::Tagged(200))),
            path: pathmodel::Path::empty(),
            queue_id: None,
            table_group: table_group_ids(),
            priorities: priorities(),
            sb_priority: None,
        };

        let flows = build_flows(&topology, &spec).unwrap();
        let switch_flows = &flows[&switch];
        assert_eq!(switch_flows.len(), 2);

        let a_to_z = switch_flows
            .iter()
            .find(|f| f.match_.in_port == 1)
            .unwrap();
        assert_eq!(a_to_z.match_.dl_vlan, Some(VlanTag::Single(100)));
        assert_eq!(
            a_to_z.actions,
            vec![
                FlowAction::SetVlan {
                    vlan: VlanTag::Single(200)
                },
                FlowAction::Output { port: 2 },
            ]
        );
        assert_eq!(a_to_z.table_group, TableGroup::Evpl);
        assert_eq!(a_to_z.table_id, 2);
        assert_eq!(a_to_z.priority, 1000);
    }

    #[test]
    fn intra_switch_untagged_to_tagged_pushes_vlan() {
        let topology = Topology::new();
        let switch = topology.switches.insert(TopoSwitch::new("sw1"));
        let if_a = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:01:1", switch, 1));
        let if_z = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:01:2", switch, 2));

        let spec = EvcFlowSpec {
            evc_id: EvcId::new(),
            uni_a: Uni::new(if_a, Some(UserTag::Untagged)),
            uni_z: Uni::new(if_z, Some(UserTag::Tagged(200))),
            path: pathmodel::Path::empty(),
            queue_id: None,
            table_group: table_group_ids(),
            priorities: priorities(),
            sb_priority: None,
        };

        let flows = build_flows(&topology, &spec).unwrap();
        let switch_flows = &flows[&switch];

        let a_to_z = switch_flows.iter().find(|f| f.match_.in_port == 1).unwrap();
        assert_eq!(a_to_z.match_.dl_vlan, Some(VlanTag::Untagged));
        assert_eq!(
            a_to_z.actions,
            vec![
                FlowAction::PushVlan,
                FlowAction::SetVlan {
                    vlan: VlanTag::Single(200)
                },
                FlowAction::Output { port: 2 },
            ]
        );
        assert_eq!(a_to_z.table_group, TableGroup::Epl);
        assert_eq!(a_to_z.priority, 100);

        let z_to_a = switch_flows.iter().find(|f| f.match_.in_port == 2).unwrap();
        assert_eq!(z_to_a.match_.dl_vlan, Some(VlanTag::Single(200)));
        assert_eq!(
            z_to_a.actions,
            vec![FlowAction::PopVlan, FlowAction::Output { port: 1 }]
        );
    }

    #[test]
    fn inter_switch_builds_uni_and_nni_legs() {
        let topology = Topology::new();
        let switch_a = topology.switches.insert(TopoSwitch::new("sw-a"));
        let switch_b = topology.switches.insert(TopoSwitch::new("sw-b"));
        let switch_z = topology.switches.insert(TopoSwitch::new("sw-z"));

        let if_a = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:0a:1", switch_a, 1));
        let if_a_nni = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:0a:2", switch_a, 2));
        let if_b1 = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:0b:1", switch_b, 1));
        let if_b2 = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:0b:2", switch_b, 2));
        let if_z_nni = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:0z:1", switch_z, 1));
        let if_z = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:0z:2", switch_z, 2));

        let link_ab = topology.links.insert(Link::new(if_a_nni, if_b1));
        let link_bz = topology.links.insert(Link::new(if_b2, if_z_nni));
        topology.links.get(link_ab).unwrap().choose_vlan().unwrap();
        topology.links.get(link_bz).unwrap().choose_vlan().unwrap();

        let spec = EvcFlowSpec {
            evc_id: EvcId::new(),
            uni_a: Uni::new(if_a, Some(UserTag::Tagged(10))),
            uni_z: Uni::new(if_z, Some(UserTag::Tagged(20))),
            path: pathmodel::Path::new(vec![link_ab, link_bz]),
            queue_id: Some(7),
            table_group: table_group_ids(),
            priorities: priorities(),
            sb_priority: None,
        };

        let flows = build_flows(&topology, &spec).unwrap();
        assert_eq!(flows.len(), 3, "uni switches plus one transit switch");
        assert_eq!(flows[&switch_a].len(), 2);
        assert_eq!(flows[&switch_b].len(), 2);
        assert_eq!(flows[&switch_z].len(), 2);

        let ingress = flows[&switch_a].iter().find(|f| f.match_.in_port == 1).unwrap();
        assert!(ingress.actions.iter().any(|a| matches!(a, FlowAction::SetQueue { queue_id: 7 })));
        assert!(matches!(ingress.actions.last(), Some(FlowAction::Output { port: 2 })));
    }

    #[test]
    fn mismatched_tag_range_lengths_are_rejected() {
        let topology = Topology::new();
        let switch = topology.switches.insert(TopoSwitch::new("sw1"));
        let if_a = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:01:1", switch, 1));
        let if_z = topology
            .interfaces
            .insert(TopoInterface::new("00:00:00:00:00:00:00:01:2", switch, 2));

        let err = zip_broadcast(
            &tags_for_uni(&Uni::new(if_a, Some(UserTag::ranges(vec![(10, 10), (20, 21)])))),
            &tags_for_uni(&Uni::new(if_z, Some(UserTag::ranges(vec![(30, 30)])))),
        )
        .unwrap_err();
        assert!(matches!(err, FlowBuildError::TagRangeLengthMismatch(2, 1)));
    }
}
