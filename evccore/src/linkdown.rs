// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The bulk link-down pipeline (§4.6): classifies every candidate EVC against the link that just
//! went down, then runs three sequential stages — swap-to-failover, clear-failover, undeploy —
//! promoting failures from one stage into the next so every affected EVC ends the tick in a
//! consistent state. Stages run strictly in order; within a stage, EVCs are handled independently
//! so a slow or locked EVC never blocks its siblings.

use crate::deploy::Deployer;
use crate::events::EvcEvent;
use crate::evc::Evc;
use id::Id;
use std::sync::Arc;
use topology::Link;
use tracectl::trace_target;
use tracing::warn;

trace_target!("mefeline_core_linkdown", tracing::level_filters::LevelFilter::INFO, &["evccore"]);

/// Which of the five cases in §4.6's classification table an EVC falls into for a given link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    /// `current` uses the link, `failover` does not: swap to the pre-provisioned failover.
    SwapToFailover,
    /// `current` uses the link, and so does `failover` (or `failover` is empty): undeploy.
    Undeploy,
    /// `current` does not use the link but `failover` does: the failover is now stale.
    ClearFailover,
    /// Neither slot references the link.
    Ignore,
}

/// `None` means the EVC is locked by a concurrent operation this tick; the caller treats that
/// the same as `Ignore` — a later event (or the consistency loop) will catch up on it.
fn classify(evc: &Evc, link_id: Id<Link>) -> Option<Case> {
    let guard = evc.try_lock()?;
    let current_uses = guard.current_path.links().contains(&link_id);
    let failover_uses = guard.failover_path.links().contains(&link_id);
    Some(if current_uses {
        if failover_uses || guard.failover_path.is_empty() {
            Case::Undeploy
        } else {
            Case::SwapToFailover
        }
    } else if failover_uses {
        Case::ClearFailover
    } else {
        Case::Ignore
    })
}

/// Drives the three-stage bulk pipeline for a single link-down event over a candidate set of
/// EVCs (the event router narrows this to EVCs whose topology plausibly references the link;
/// EVCs classified `Ignore` cost nothing beyond the classification try-lock).
pub struct LinkDownPipeline {
    deployer: Arc<Deployer>,
}

impl LinkDownPipeline {
    #[must_use]
    pub fn new(deployer: Arc<Deployer>) -> Self {
        Self { deployer }
    }

    /// Runs stages 1–3 of §4.6 for `link_id` over `evcs`. EVCs unrelated to the link, or whose
    /// lock is held by a concurrent operation, are skipped.
    pub async fn handle_link_down(&self, link_id: Id<Link>, evcs: &[Arc<Evc>]) {
        let mut undeploy_set = Vec::new();
        let mut clear_failover_set = Vec::new();

        for evc in evcs {
            match classify(evc, link_id) {
                Some(Case::SwapToFailover) => {
                    if self.stage1_swap(evc).await {
                        clear_failover_set.push(Arc::clone(evc));
                    } else {
                        undeploy_set.push(Arc::clone(evc));
                    }
                }
                Some(Case::ClearFailover) => clear_failover_set.push(Arc::clone(evc)),
                Some(Case::Undeploy) => undeploy_set.push(Arc::clone(evc)),
                Some(Case::Ignore) | None => {}
            }
        }

        // Stage 2 runs over D-cases and every stage-1 success, only after the swap has fully
        // landed — stage 2 must see the new role assignments (§4.6: "the swap must complete
        // before the clear").
        for evc in &clear_failover_set {
            if !self.stage2_clear_failover(evc).await {
                undeploy_set.push(Arc::clone(evc));
            }
        }

        for evc in &undeploy_set {
            self.stage3_undeploy(evc).await;
        }
    }

    /// Stage 1 (case A): swap `failover_path` into `current_path`. On success the old
    /// `current_path` is left sitting in the `failover_path` slot, still holding its s_vlan
    /// allocations, for stage 2 to clear.
    async fn stage1_swap(&self, evc: &Evc) -> bool {
        let Some(mut guard) = evc.try_lock() else {
            return false;
        };
        match self.deployer.swap_to_failover(evc, &mut guard).await {
            Ok(()) => {
                drop(guard);
                self.deployer.persist_and_emit(evc, EvcEvent::FailoverLinkDown).await;
                true
            }
            Err(err) => {
                warn!(evc_id = %evc.id(), %err, "swap to failover failed, falling back to undeploy");
                false
            }
        }
    }

    /// Stage 2 (case D, and every stage-1 success): delete whatever is sitting in the
    /// `failover_path` slot — the pre-provisioned NNI-only path for case D, or the just-demoted
    /// former `current_path` (UNI legs included) after a stage-1 swap — and release its tags.
    async fn stage2_clear_failover(&self, evc: &Evc) -> bool {
        let Some(mut guard) = evc.try_lock() else {
            return false;
        };
        match self.deployer.remove_failover_flows(evc, &mut guard, false).await {
            Ok(()) => {
                drop(guard);
                self.deployer.persist_and_emit(evc, EvcEvent::FailoverOldPath).await;
                true
            }
            Err(err) => {
                warn!(evc_id = %evc.id(), %err, "clearing stale failover failed, falling back to undeploy");
                false
            }
        }
    }

    /// Stage 3 (cases B/C, and every earlier-stage failure): remove every installed flow on both
    /// path slots, release all tags, deactivate, and emit `need_redeploy` so the redeployer can
    /// later find the EVC a fresh path.
    async fn stage3_undeploy(&self, evc: &Evc) {
        let Some(mut guard) = evc.try_lock() else {
            return;
        };
        if let Err(err) = self.deployer.remove_current_flows(evc, &mut guard).await {
            warn!(evc_id = %evc.id(), %err, "undeploy during link-down failed to remove current flows");
        }
        if let Err(err) = self.deployer.remove_failover_flows(evc, &mut guard, false).await {
            warn!(evc_id = %evc.id(), %err, "undeploy during link-down failed to clear failover flows");
        }
        drop(guard);
        self.deployer.persist_and_emit(evc, EvcEvent::NeedRedeploy).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCollaborators, Fixture};

    #[tokio::test]
    async fn link_down_without_failover_undeploys() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        deployer.deploy(&fixture.evc).await.unwrap();
        assert!(fixture.evc.flags().unwrap().active);

        let broken_link = {
            let guard = fixture.evc.try_lock().unwrap();
            guard.current_path.links()[0]
        };

        let pipeline = LinkDownPipeline::new(Arc::clone(&deployer));
        let evc = Arc::new(fixture.evc);
        pipeline.handle_link_down(broken_link, std::slice::from_ref(&evc)).await;

        assert!(!evc.flags().unwrap().active);
        assert_eq!(fakes.delete_calls(), 1);
    }

    #[tokio::test]
    async fn unrelated_link_down_is_a_no_op() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        deployer.deploy(&fixture.evc).await.unwrap();

        let unrelated_link: Id<Link> = id::Id::new();
        let evc = Arc::new(fixture.evc);
        let pipeline = LinkDownPipeline::new(Arc::clone(&deployer));
        pipeline.handle_link_down(unrelated_link, std::slice::from_ref(&evc)).await;

        assert!(evc.flags().unwrap().active);
        assert_eq!(fakes.delete_calls(), 0);
    }
}
