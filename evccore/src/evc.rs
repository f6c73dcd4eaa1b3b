// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The EVC aggregate: immutable identity and constraints, plus the mutable lifecycle state
//! behind a single per-EVC try-lock (§3, §4.5, §5).
//!
//! The source's `EVCBase -> EVCDeploy -> LinkProtection -> EVC` inheritance chain (see the
//! distilled spec's Design Notes) collapses here into one struct with clearly separated method
//! groups, matching `GwConfig`'s metadata/generation split in the teacher crate
//! (`mgmt/src/models/external/gwconfig/mod.rs`): immutable fields describe what the operator
//! asked for, `EvcMutable` (guarded by `concurrency::TryLock`) describes what is currently true.

use crate::collaborators::PathConstraints;
use crate::errors::{EvcError, EvcResult};
use chrono::{DateTime, Utc};
use concurrency::TryLock;
use flowbuilder::EvcId;
use pathmodel::{Path, PathStatus};
use topology::{InterfaceStatus, Topology, Uni};

/// A single cron-style schedule entry managed by the (out-of-scope) schedule collaborator; the
/// engine only needs to carry these through so they round-trip on persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitSchedule {
    pub id: String,
    pub cron: String,
    pub action: String,
}

/// The EVC's two flow-table placements for EVPL vs. EPL flows (§3's `table_group` mapping).
pub type TableGroupIds = flowbuilder::TableGroupIds;

/// The three lifecycle flags from §4.5, as a closed set of legal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleFlags {
    pub enabled: bool,
    pub active: bool,
    pub archived: bool,
}

impl LifecycleFlags {
    const INITIAL: Self = Self {
        enabled: false,
        active: false,
        archived: false,
    };
}

/// The mutable half of an EVC: everything the deployer, link-down pipeline, link-up handler and
/// consistency loop read and write, always behind the EVC's try-lock.
#[derive(Debug, Clone)]
pub struct EvcMutable {
    pub flags: LifecycleFlags,
    pub primary_path: Path,
    pub backup_path: Path,
    pub current_path: Path,
    pub failover_path: Path,
    pub queue_id: Option<u32>,
    pub bandwidth: u64,
    pub circuit_scheduler: Vec<CircuitSchedule>,
    pub creation_time: DateTime<Utc>,
    pub inserted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Timestamp of the last time this EVC's flows were removed (by undeploy or link-down);
    /// the consistency loop's grace window (§4.9) is measured from this.
    pub last_flow_removal: Option<DateTime<Utc>>,
    pub execution_rounds: u32,
}

impl EvcMutable {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            flags: LifecycleFlags::INITIAL,
            primary_path: Path::empty(),
            backup_path: Path::empty(),
            current_path: Path::empty(),
            failover_path: Path::empty(),
            queue_id: None,
            bandwidth: 0,
            circuit_scheduler: Vec::new(),
            creation_time: now,
            inserted_at: None,
            updated_at: None,
            last_flow_removal: None,
            execution_rounds: 0,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

/// The EVC aggregate (§3): a point-to-point L2 circuit between two UNIs.
#[derive(Debug)]
pub struct Evc {
    id: EvcId,
    name: String,
    owner: Option<String>,
    priority: i32,
    sb_priority: Option<u16>,
    service_level: u8,
    uni_a: Uni,
    uni_z: Uni,
    dynamic_backup_path: bool,
    primary_constraints: PathConstraints,
    secondary_constraints: PathConstraints,
    table_group: TableGroupIds,
    state: TryLock<EvcMutable>,
}

impl Evc {
    /// Build a freshly created, disabled EVC (the state a REST `POST` produces before the
    /// operator enables it).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        uni_a: Uni,
        uni_z: Uni,
        dynamic_backup_path: bool,
        primary_constraints: PathConstraints,
        secondary_constraints: PathConstraints,
        table_group: TableGroupIds,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EvcId::new(),
            name: name.into(),
            owner: None,
            priority: 0,
            sb_priority: None,
            service_level: 0,
            uni_a,
            uni_z,
            dynamic_backup_path,
            primary_constraints,
            secondary_constraints,
            table_group,
            state: TryLock::new(EvcMutable::new(now)),
        }
    }

    #[must_use]
    pub fn id(&self) -> EvcId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn set_owner(&mut self, owner: Option<String>) {
        self.owner = owner;
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    #[must_use]
    pub fn sb_priority(&self) -> Option<u16> {
        self.sb_priority
    }

    pub fn set_sb_priority(&mut self, sb_priority: Option<u16>) {
        self.sb_priority = sb_priority;
    }

    #[must_use]
    pub fn service_level(&self) -> u8 {
        self.service_level
    }

    #[must_use]
    pub fn uni_a(&self) -> &Uni {
        &self.uni_a
    }

    #[must_use]
    pub fn uni_z(&self) -> &Uni {
        &self.uni_z
    }

    #[must_use]
    pub fn dynamic_backup_path(&self) -> bool {
        self.dynamic_backup_path
    }

    #[must_use]
    pub fn primary_constraints(&self) -> &PathConstraints {
        &self.primary_constraints
    }

    #[must_use]
    pub fn secondary_constraints(&self) -> &PathConstraints {
        &self.secondary_constraints
    }

    #[must_use]
    pub fn table_group(&self) -> TableGroupIds {
        self.table_group
    }

    /// Whether the two UNIs attach to the same switch (an intra-switch EVC needs no path).
    #[must_use]
    pub fn is_intra_switch(&self, topology: &Topology) -> bool {
        match (
            topology.switch_of(self.uni_a.interface()),
            topology.switch_of(self.uni_z.interface()),
        ) {
            (Some(a), Some(z)) => a.id() == z.id(),
            _ => false,
        }
    }

    /// Attempt to acquire this EVC's lock non-blockingly (§5). `None` means the EVC is already
    /// being mutated this tick and should be skipped, never treated as an error.
    #[must_use]
    pub fn try_lock(&self) -> Option<parking_lot::MutexGuard<'_, EvcMutable>> {
        self.state.try_lock()
    }

    /// A read-only snapshot of the lifecycle flags, for callers that only need to branch on
    /// state without holding the lock (e.g. the router's cheap "is this EVC archived" check).
    #[must_use]
    pub fn flags(&self) -> Option<LifecycleFlags> {
        self.state.try_lock().map(|guard| guard.flags)
    }

    #[must_use]
    pub fn snapshot_event(&self) -> Option<crate::events::EvcSnapshot> {
        let flags = self.flags()?;
        Some(crate::events::EvcSnapshot {
            evc_id: self.id,
            name: self.name.clone(),
            active: flags.active,
            enabled: flags.enabled,
            uni_a: self.uni_a.clone(),
            uni_z: self.uni_z.clone(),
        })
    }
}

/// Mutating state-machine transitions (§4.5). Each takes the already-acquired `EvcMutable`
/// guard so callers control the try-lock discipline at the call site.
impl EvcMutable {
    /// `(F,F,F) --enable--> (T,F,F)`. Idempotent if already enabled.
    pub fn enable(&mut self, now: DateTime<Utc>) -> EvcResult<()> {
        if self.flags.archived {
            return Err(EvcError::Archived(String::new()));
        }
        if !self.flags.enabled {
            self.flags.enabled = true;
            self.touch(now);
        }
        Ok(())
    }

    /// `(T,*,F) --disable--> (F,F,F)`. Idempotent if already disabled. Does not clear path
    /// slots; a later `enable` + deploy may reuse the still-allocated `current_path`.
    pub fn disable(&mut self, now: DateTime<Utc>) -> EvcResult<()> {
        if self.flags.archived {
            return Err(EvcError::Archived(String::new()));
        }
        if self.flags.enabled || self.flags.active {
            self.flags.enabled = false;
            self.flags.active = false;
            self.touch(now);
        }
        Ok(())
    }

    /// `(*,*,F) --archive--> (F,F,T)` (terminal). The caller is responsible for having already
    /// removed every installed flow and released every s_vlan (`crate::deploy::Deployer`
    /// enforces this ordering); this method only asserts the path slots are empty before
    /// flipping the flags, matching the invariant in §3.
    pub fn archive(&mut self, now: DateTime<Utc>) -> EvcResult<()> {
        if self.flags.archived {
            return Ok(());
        }
        if !self.current_path.is_empty()
            || !self.failover_path.is_empty()
            || !self.primary_path.is_empty()
            || !self.backup_path.is_empty()
        {
            return Err(EvcError::InvalidPath(pathmodel::PathError::InvalidPath(
                "cannot archive an evc with non-empty path slots".to_string(),
            )));
        }
        self.flags.enabled = false;
        self.flags.active = false;
        self.flags.archived = true;
        self.touch(now);
        Ok(())
    }

    /// The only path into `active` (§4.5): both UNI interfaces must be up, and either the EVC is
    /// intra-switch or `current_path.status() == Up`.
    pub fn try_to_activate(
        &mut self,
        topology: &Topology,
        uni_a: &Uni,
        uni_z: &Uni,
        intra_switch: bool,
        now: DateTime<Utc>,
    ) -> EvcResult<()> {
        if self.flags.archived || !self.flags.enabled {
            return Err(EvcError::ActivationError(
                "evc is not enabled".to_string(),
            ));
        }

        let uni_a_up = topology
            .interfaces
            .get(uni_a.interface())
            .is_some_and(|iface| iface.status() == InterfaceStatus::Up);
        let uni_z_up = topology
            .interfaces
            .get(uni_z.interface())
            .is_some_and(|iface| iface.status() == InterfaceStatus::Up);

        if !uni_a_up || !uni_z_up {
            return Err(EvcError::ActivationError(
                "one or both uni interfaces are down".to_string(),
            ));
        }

        if !intra_switch && self.current_path.status(topology) != PathStatus::Up {
            return Err(EvcError::ActivationError(
                "current path is not up".to_string(),
            ));
        }

        if !self.flags.active {
            self.flags.active = true;
            self.touch(now);
        }
        Ok(())
    }

    /// `active -> inactive`, used by `remove_current_flows`/undeploy; does not touch `enabled`.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        if self.flags.active {
            self.flags.active = false;
            self.touch(now);
        }
    }

    /// §4.5 step 1 of `deploy_to_path`: enabled, not archived, and not already active on a
    /// path that satisfies `path_hint` (when given).
    #[must_use]
    pub fn should_deploy(&self, path_hint: Option<&Path>) -> bool {
        if !self.flags.enabled || self.flags.archived {
            return false;
        }
        if !self.flags.active {
            return true;
        }
        match path_hint {
            Some(hint) => self.current_path.links() != hint.links(),
            None => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    #[test]
    fn enable_then_archive_requires_empty_paths() {
        let mut state = EvcMutable::new(now());
        state.enable(now()).unwrap();
        assert!(state.flags.enabled);

        state.current_path = Path::new(vec![id::Id::new()]);
        let err = state.archive(now()).unwrap_err();
        assert!(matches!(err, EvcError::InvalidPath(_)));

        state.current_path = Path::empty();
        state.archive(now()).unwrap();
        assert!(state.flags.archived);
        assert!(!state.flags.enabled);
    }

    #[test]
    fn disable_is_idempotent() {
        let mut state = EvcMutable::new(now());
        state.enable(now()).unwrap();
        state.disable(now()).unwrap();
        state.disable(now()).unwrap();
        assert!(!state.flags.enabled);
    }

    #[test]
    fn cannot_enable_an_archived_evc() {
        let mut state = EvcMutable::new(now());
        state.enable(now()).unwrap();
        state.archive(now()).unwrap();
        let err = state.enable(now()).unwrap_err();
        assert!(matches!(err, EvcError::Archived(_)));
    }

    #[test]
    fn should_deploy_false_once_active_on_hinted_path() {
        let mut state = EvcMutable::new(now());
        state.enable(now()).unwrap();
        let link = id::Id::new();
        state.current_path = Path::new(vec![link]);
        state.flags.active = true;
        assert!(!state.should_deploy(Some(&Path::new(vec![link]))));
        assert!(state.should_deploy(Some(&Path::new(vec![id::Id::new()]))));
    }
}
