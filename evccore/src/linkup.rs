// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The per-EVC link-up handler (§4.8): re-optimizes a single EVC toward its most-preferred
//! reachable path whenever a link it cares about comes back up, and retries activation when a
//! UNI interface itself comes up.

use crate::deploy::Deployer;
use crate::errors::EvcResult;
use crate::evc::Evc;
use id::Id;
use pathmodel::Path;
use std::sync::Arc;
use topology::Link;
use tracectl::trace_target;

trace_target!("mefeline_core_linkup", tracing::level_filters::LevelFilter::INFO, &["evccore"]);

/// Drives the link-up and UNI-interface-up reactions for one EVC at a time against the same
/// `Deployer` primitives the bulk link-down pipeline uses.
pub struct LinkUpHandler {
    deployer: Arc<Deployer>,
}

impl LinkUpHandler {
    #[must_use]
    pub fn new(deployer: Arc<Deployer>) -> Self {
        Self { deployer }
    }

    /// §4.8: ignore the event unless `link_id` appears in `primary`, `backup`, or `current`.
    /// Otherwise deploy to the most-preferred option that is now reachable — `primary` if valid
    /// and up, else `backup` if valid and up, else plain discovery if `dynamic_backup_path`
    /// allows it. `Deployer::deploy_to_path`'s own `should_deploy` check absorbs the "already on
    /// the highest-preference option, do nothing" rule: a hint matching the live `current_path`
    /// (or no hint, with the EVC already active) makes the call a no-op.
    pub async fn handle_link_up(&self, link_id: Id<Link>, evc: &Evc) -> EvcResult<bool> {
        let preferred = {
            let Some(guard) = evc.try_lock() else {
                return Ok(false);
            };
            let affected = guard.primary_path.links().contains(&link_id)
                || guard.backup_path.links().contains(&link_id)
                || guard.current_path.links().contains(&link_id);
            if !affected {
                return Ok(false);
            }

            match self.preferred_path(evc, &guard.primary_path, &guard.backup_path) {
                Preference::Pinned(path) => Some(path),
                Preference::Discover if evc.dynamic_backup_path() => None,
                Preference::Discover | Preference::NoneReachable => return Ok(false),
            }
        };

        self.deployer.deploy_to_path(evc, preferred).await
    }

    /// §4.8's closing sentence: a UNI interface came up. Retry activation first — if the EVC
    /// was already fully deployed this is all that is needed — then fall through to `deploy`,
    /// whose own `should_deploy` gate makes the call a no-op unless the EVC genuinely still has
    /// no path installed.
    pub async fn handle_uni_interface_up(&self, evc: &Evc) -> EvcResult<bool> {
        self.deployer.retry_activation(evc).await?;
        self.deployer.deploy(evc).await
    }

    fn preferred_path(&self, evc: &Evc, primary: &Path, backup: &Path) -> Preference {
        let topology = self.deployer.topology();
        let (Ok(switch_a), Ok(switch_z)) = (self.deployer.switch_a(evc), self.deployer.switch_z(evc)) else {
            return Preference::NoneReachable;
        };

        if !primary.is_empty()
            && primary.is_valid(topology, switch_a, switch_z, true).is_ok()
            && primary.status(topology) == pathmodel::PathStatus::Up
        {
            return Preference::Pinned(primary.clone());
        }
        if !backup.is_empty()
            && backup.is_valid(topology, switch_a, switch_z, true).is_ok()
            && backup.status(topology) == pathmodel::PathStatus::Up
        {
            return Preference::Pinned(backup.clone());
        }
        Preference::Discover
    }
}

enum Preference {
    /// One of the two operator-pinned paths is valid and up; deploy to it.
    Pinned(Path),
    /// Neither pinned path is usable; fall back to discovery if the EVC allows it.
    Discover,
    /// Neither pinned path is usable and the EVC cannot resolve its own switches (e.g. a UNI
    /// switch is disabled); nothing to do.
    NoneReachable,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCollaborators, Fixture};

    #[tokio::test]
    async fn unrelated_link_up_is_a_no_op() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        deployer.deploy(&fixture.evc).await.unwrap();
        let handler = LinkUpHandler::new(Arc::clone(&deployer));

        let unrelated_link: Id<Link> = id::Id::new();
        let deployed = handler.handle_link_up(unrelated_link, &fixture.evc).await.unwrap();
        assert!(!deployed);
        assert_eq!(fakes.install_calls(), 1, "the unrelated event must not trigger a redeploy");
    }

    #[tokio::test]
    async fn uni_interface_up_deploys_when_never_deployed() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        let handler = LinkUpHandler::new(Arc::clone(&deployer));

        let deployed = handler.handle_uni_interface_up(&fixture.evc).await.unwrap();
        assert!(deployed);
        assert!(fixture.evc.flags().unwrap().active);
        assert_eq!(fakes.install_calls(), 1);
    }

    #[tokio::test]
    async fn uni_interface_up_is_idempotent_once_deployed() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        deployer.deploy(&fixture.evc).await.unwrap();
        let handler = LinkUpHandler::new(Arc::clone(&deployer));

        let deployed = handler.handle_uni_interface_up(&fixture.evc).await.unwrap();
        assert!(!deployed, "already active on its current path, nothing to redeploy");
        assert_eq!(fakes.install_calls(), 1);
    }
}
