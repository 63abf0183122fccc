//! The mitigation controller: per-phase bookkeeping over the three
//! strategies plus the ban-expiry timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use floodlab_core::phase::MitigationSelection;

use crate::ban::TempBan;
use crate::rate_limit::RateLimit;
use crate::state::{MitigationKind, MitigationStatus};
use crate::threshold::ThresholdBlock;

/// Global enable flags, fixed for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct EnabledMitigations {
    pub threshold_block: bool,
    pub rate_limit: bool,
    pub temp_ban: bool,
}

/// Affected-address counts from one `apply_all` call; `None` means the
/// strategy was not attempted (not selected, not enabled, or already
/// applied this phase).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub threshold_block: Option<usize>,
    pub rate_limit: Option<usize>,
    pub temp_ban: Option<usize>,
}

#[derive(Debug, Default)]
struct PhaseState {
    threshold_block: MitigationStatus,
    rate_limit: MitigationStatus,
    temp_ban: MitigationStatus,
}

/// Owns the three strategies and enforces the per-phase invariants:
/// each strategy applies at most once per phase, removal is idempotent,
/// and the ban-expiry task may fire at any point after application.
pub struct MitigationController {
    threshold_block: ThresholdBlock,
    rate_limit: RateLimit,
    temp_ban: TempBan,
    enabled: EnabledMitigations,
    ban_duration: Duration,
    state: Mutex<PhaseState>,
    ban_expiry: Mutex<Option<JoinHandle<()>>>,
}

impl MitigationController {
    pub fn new(
        threshold_block: ThresholdBlock,
        rate_limit: RateLimit,
        temp_ban: TempBan,
        enabled: EnabledMitigations,
        ban_duration: Duration,
    ) -> Self {
        Self {
            threshold_block,
            rate_limit,
            temp_ban,
            enabled,
            ban_duration,
            state: Mutex::new(PhaseState::default()),
            ban_expiry: Mutex::new(None),
        }
    }

    /// Resets the tri-state bookkeeping for a new phase. A still-pending
    /// ban-expiry task from the previous phase is left running; its
    /// removal call is idempotent and the rules it targets are already
    /// gone after teardown.
    pub fn begin_phase(&self) {
        *self.state.lock() = PhaseState::default();
        self.ban_expiry.lock().take();
    }

    pub fn status(&self, kind: MitigationKind) -> MitigationStatus {
        let state = self.state.lock();
        match kind {
            MitigationKind::ThresholdBlock => state.threshold_block,
            MitigationKind::RateLimit => state.rate_limit,
            MitigationKind::TempBan => state.temp_ban,
        }
    }

    fn mark_applied(&self, kind: MitigationKind) {
        let mut state = self.state.lock();
        let slot = match kind {
            MitigationKind::ThresholdBlock => &mut state.threshold_block,
            MitigationKind::RateLimit => &mut state.rate_limit,
            MitigationKind::TempBan => &mut state.temp_ban,
        };
        *slot = MitigationStatus::Applied;
    }

    fn mark_removed(&self, kind: MitigationKind) {
        let mut state = self.state.lock();
        let slot = match kind {
            MitigationKind::ThresholdBlock => &mut state.threshold_block,
            MitigationKind::RateLimit => &mut state.rate_limit,
            MitigationKind::TempBan => &mut state.temp_ban,
        };
        if *slot == MitigationStatus::Applied {
            *slot = MitigationStatus::Removed;
        }
    }

    /// Applies exactly the strategies that are requested by the phase,
    /// globally enabled, and not yet applied this phase. A strategy that
    /// affected zero addresses stays `NotApplied`.
    pub async fn apply_all(self: Arc<Self>, selection: MitigationSelection) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        if selection.threshold_block
            && self.enabled.threshold_block
            && self.status(MitigationKind::ThresholdBlock) == MitigationStatus::NotApplied
        {
            let affected = self.threshold_block.apply().await;
            if affected > 0 {
                self.mark_applied(MitigationKind::ThresholdBlock);
            } else {
                warn!("threshold-block affected zero addresses, keeping not-applied");
            }
            outcome.threshold_block = Some(affected);
        }

        if selection.rate_limit
            && self.enabled.rate_limit
            && self.status(MitigationKind::RateLimit) == MitigationStatus::NotApplied
        {
            let affected = self.rate_limit.apply().await;
            if affected > 0 {
                self.mark_applied(MitigationKind::RateLimit);
            } else {
                warn!("rate-limit affected zero addresses, keeping not-applied");
            }
            outcome.rate_limit = Some(affected);
        }

        if selection.temp_ban
            && self.enabled.temp_ban
            && self.status(MitigationKind::TempBan) == MitigationStatus::NotApplied
        {
            let affected = self.temp_ban.apply().await;
            if affected > 0 {
                self.mark_applied(MitigationKind::TempBan);

                // The non-cancellable expiry task: it always fires and
                // always calls the idempotent removal, regardless of
                // whether phase teardown got there first.
                let controller = Arc::clone(&self);
                let duration = self.ban_duration;
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    info!(
                        secs = duration.as_secs(),
                        "temporary ban expired, removing deny rules"
                    );
                    controller.remove_temp_ban().await;
                });
                *self.ban_expiry.lock() = Some(handle);
            } else {
                warn!("temp-ban affected zero addresses, keeping not-applied");
            }
            outcome.temp_ban = Some(affected);
        }

        outcome
    }

    pub async fn remove_temp_ban(&self) {
        self.temp_ban.remove().await;
        self.mark_removed(MitigationKind::TempBan);
    }

    /// Unconditionally attempts removal of every strategy, applied or
    /// not, to guarantee a clean starting state for the next phase even
    /// after partial failure.
    pub async fn remove_all(&self) {
        self.threshold_block.remove().await;
        self.mark_removed(MitigationKind::ThresholdBlock);
        self.rate_limit.remove().await;
        self.mark_removed(MitigationKind::RateLimit);
        self.temp_ban.remove().await;
        self.mark_removed(MitigationKind::TempBan);
    }

    /// Test/diagnostic access to the pending expiry task.
    pub fn ban_expiry_pending(&self) -> bool {
        self.ban_expiry
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use floodlab_core::control::SwitchControl;
    use floodlab_core::error::GatewayError;
    use floodlab_core::resource::ResourceId;
    use floodlab_core::topology::ClusterId;
    use std::collections::BTreeMap;
    use std::net::IpAddr;

    /// In-memory switch state shared by all mocked switches: every rule
    /// and meter currently installed, as (switch, src, dst, priority).
    #[derive(Default)]
    struct RuleBook {
        denies: Mutex<Vec<(ResourceId, IpAddr, IpAddr, u16)>>,
        forwards: Mutex<Vec<(ResourceId, IpAddr, IpAddr, u16)>>,
        meters: Mutex<Vec<(ResourceId, u32)>>,
        fail_deny_installs: bool,
    }

    #[async_trait]
    impl SwitchControl for RuleBook {
        async fn add_deny(
            &self,
            switch: &ResourceId,
            src: IpAddr,
            dst: IpAddr,
            priority: u16,
        ) -> Result<(), GatewayError> {
            if self.fail_deny_installs {
                return Err(GatewayError::UnknownResource(switch.clone()));
            }
            self.denies
                .lock()
                .push((switch.clone(), src, dst, priority));
            Ok(())
        }

        async fn remove_deny(
            &self,
            switch: &ResourceId,
            src: IpAddr,
            dst: IpAddr,
            priority: u16,
        ) -> Result<(), GatewayError> {
            self.denies
                .lock()
                .retain(|r| r != &(switch.clone(), src, dst, priority));
            Ok(())
        }

        async fn add_meter(
            &self,
            switch: &ResourceId,
            meter_id: u32,
            _rate_kbps: u32,
        ) -> Result<(), GatewayError> {
            self.meters.lock().push((switch.clone(), meter_id));
            Ok(())
        }

        async fn remove_meter(
            &self,
            switch: &ResourceId,
            meter_id: u32,
        ) -> Result<(), GatewayError> {
            self.meters.lock().retain(|m| m != &(switch.clone(), meter_id));
            Ok(())
        }

        async fn add_metered_forward(
            &self,
            switch: &ResourceId,
            src: IpAddr,
            dst: IpAddr,
            _meter_id: u32,
            priority: u16,
        ) -> Result<(), GatewayError> {
            self.forwards
                .lock()
                .push((switch.clone(), src, dst, priority));
            Ok(())
        }

        async fn remove_metered_forward(
            &self,
            switch: &ResourceId,
            src: IpAddr,
            dst: IpAddr,
            priority: u16,
        ) -> Result<(), GatewayError> {
            self.forwards
                .lock()
                .retain(|r| r != &(switch.clone(), src, dst, priority));
            Ok(())
        }
    }

    fn server() -> IpAddr {
        "10.0.0.10".parse().unwrap()
    }

    fn cluster_addrs(cluster: ClusterId, count: u8) -> Vec<IpAddr> {
        (1..=count)
            .map(|n| format!("10.0.{cluster}.{n}").parse().unwrap())
            .collect()
    }

    fn controller_with(
        book: Arc<RuleBook>,
        enabled: EnabledMitigations,
        ban_duration: Duration,
    ) -> Arc<MitigationController> {
        let control: Arc<dyn SwitchControl> = book;
        let clusters: BTreeMap<ClusterId, (ResourceId, Vec<IpAddr>)> = BTreeMap::from([(
            1,
            (ResourceId::from("leaf1"), cluster_addrs(1, 10)),
        )]);

        Arc::new(MitigationController::new(
            ThresholdBlock::new(
                control.clone(),
                ResourceId::from("leaf1"),
                cluster_addrs(1, 10),
                server(),
            ),
            RateLimit::new(control.clone(), clusters.clone(), server(), 500),
            TempBan::new(control, clusters, server()),
            enabled,
            ban_duration,
        ))
    }

    const ALL_ENABLED: EnabledMitigations = EnabledMitigations {
        threshold_block: true,
        rate_limit: true,
        temp_ban: true,
    };

    #[tokio::test(start_paused = true)]
    async fn ban_counts_affected_and_self_expires() {
        let book = Arc::new(RuleBook::default());
        let controller = controller_with(book.clone(), ALL_ENABLED, Duration::from_secs(60));

        let outcome = controller
            .clone()
            .apply_all(MitigationSelection {
                temp_ban: true,
                ..MitigationSelection::NONE
            })
            .await;
        assert_eq!(outcome.temp_ban, Some(10));
        assert_eq!(book.denies.lock().len(), 10);
        assert!(controller.ban_expiry_pending());

        // Past the ban lifetime the deny rules are gone without any
        // explicit remove call from the caller.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(book.denies.lock().len(), 0);
        assert_eq!(
            controller.status(MitigationKind::TempBan),
            MitigationStatus::Removed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn double_remove_matches_single_remove() {
        let book = Arc::new(RuleBook::default());
        let controller = controller_with(book.clone(), ALL_ENABLED, Duration::from_secs(600));

        controller
            .clone()
            .apply_all(MitigationSelection::ALL)
            .await;
        assert!(!book.denies.lock().is_empty());
        assert!(!book.meters.lock().is_empty());

        controller.remove_all().await;
        let denies_after_one = book.denies.lock().clone();
        let forwards_after_one = book.forwards.lock().clone();
        let meters_after_one = book.meters.lock().clone();

        // Simulates the expiry-timer race with teardown.
        controller.remove_all().await;
        assert_eq!(*book.denies.lock(), denies_after_one);
        assert_eq!(*book.forwards.lock(), forwards_after_one);
        assert_eq!(*book.meters.lock(), meters_after_one);
        assert!(book.denies.lock().is_empty());
        assert!(book.meters.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn apply_all_is_once_per_phase() {
        let book = Arc::new(RuleBook::default());
        let controller = controller_with(book.clone(), ALL_ENABLED, Duration::from_secs(600));

        let first = controller
            .clone()
            .apply_all(MitigationSelection::ALL)
            .await;
        assert_eq!(first.temp_ban, Some(10));
        let rules_after_first = book.denies.lock().len();

        let second = controller
            .clone()
            .apply_all(MitigationSelection::ALL)
            .await;
        assert_eq!(second, ApplyOutcome::default());
        assert_eq!(book.denies.lock().len(), rules_after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn begin_phase_resets_bookkeeping() {
        let book = Arc::new(RuleBook::default());
        let controller = controller_with(book.clone(), ALL_ENABLED, Duration::from_secs(600));

        controller
            .clone()
            .apply_all(MitigationSelection::ALL)
            .await;
        controller.remove_all().await;
        controller.begin_phase();

        assert_eq!(
            controller.status(MitigationKind::TempBan),
            MitigationStatus::NotApplied
        );
        let outcome = controller
            .clone()
            .apply_all(MitigationSelection::ALL)
            .await;
        assert_eq!(outcome.temp_ban, Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_strategy_is_never_applied() {
        let book = Arc::new(RuleBook::default());
        let controller = controller_with(
            book.clone(),
            EnabledMitigations {
                threshold_block: false,
                rate_limit: true,
                temp_ban: false,
            },
            Duration::from_secs(600),
        );

        let outcome = controller
            .clone()
            .apply_all(MitigationSelection::ALL)
            .await;
        assert_eq!(outcome.threshold_block, None);
        assert_eq!(outcome.temp_ban, None);
        assert_eq!(outcome.rate_limit, Some(10));
        assert!(book.denies.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_application_stays_not_applied() {
        let book = Arc::new(RuleBook {
            fail_deny_installs: true,
            ..RuleBook::default()
        });
        let controller = controller_with(book.clone(), ALL_ENABLED, Duration::from_secs(600));

        let outcome = controller
            .clone()
            .apply_all(MitigationSelection {
                temp_ban: true,
                ..MitigationSelection::NONE
            })
            .await;
        assert_eq!(outcome.temp_ban, Some(0));
        assert_eq!(
            controller.status(MitigationKind::TempBan),
            MitigationStatus::NotApplied
        );
        assert!(!controller.ban_expiry_pending());
    }
}
