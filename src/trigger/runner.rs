use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::{CycleError, CycleOutcome, CycleState, Trigger};
use crate::discovery;
use crate::error::ResultOkLogExt;
use crate::inventory::InstanceLister;
use crate::metrics::Metrics;
use crate::rules::RuleSet;
use crate::target::{self, TargetSet};

/// Runs discovery cycles for one rule set and owns what was last written.
pub struct TriggerLoop<L> {
    lister: L,
    rules: RuleSet,
    output: PathBuf,
    timeout: Duration,
    metrics: Metrics,
    /// `None` until something was written (or found on disk at startup).
    last_written: Option<TargetSet>,
    state: CycleState,
}

impl<L> TriggerLoop<L>
where
    L: InstanceLister,
{
    pub fn new(
        lister: L,
        rules: RuleSet,
        output: impl Into<PathBuf>,
        timeout: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            lister,
            rules,
            output: output.into(),
            timeout,
            metrics,
            last_written: None,
            state: CycleState::Idle,
        }
    }

    /// Treats an existing output file as the last written set, so a restart
    /// that discovers the same targets leaves the file alone.
    pub fn seed_from_output(&mut self) {
        if !self.output.exists() {
            log::debug!("No existing target file at `{}`", self.output.display());
            return;
        }

        match target::load(&self.output) {
            Ok(targets) => {
                log::info!(
                    "Loaded {} existing targets from `{}`",
                    targets.len(),
                    self.output.display()
                );
                self.last_written = Some(targets);
            }
            Err(err) => log::warn!("Ignoring existing target file: {}", err),
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn last_written(&self) -> Option<&TargetSet> {
        self.last_written.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Runs a cycle per received trigger until `shutdown` resolves or every
    /// sender is gone. A cycle in progress always finishes first.
    pub async fn run(
        &mut self,
        mut triggers: mpsc::Receiver<Trigger>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);

        loop {
            let trigger = tokio::select! {
                biased;
                () = &mut shutdown => {
                    log::info!("Shutting down discovery loop");
                    break;
                }
                trigger = triggers.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => {
                        log::info!("Trigger sources closed, stopping discovery loop");
                        break;
                    }
                },
            };

            self.run_cycle(trigger).await.ok_log();
        }

        self.transition(CycleState::Stopped);
    }

    /// Discovers targets and writes them if they changed or `trigger` is
    /// forced. Updates the sync metrics either way.
    ///
    /// # Errors
    ///
    /// - [`CycleError::Discovery`] if listing a project failed.
    /// - [`CycleError::Timeout`] if discovery exceeded the configured timeout.
    /// - [`CycleError::Write`] if the output file could not be replaced.
    pub async fn run_cycle(&mut self, trigger: Trigger) -> Result<CycleOutcome, CycleError> {
        let started = Instant::now();
        let result = self.cycle(trigger).await;
        self.metrics
            .observe_sync_duration(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => self.metrics.record_success(),
            Err(_) => self.metrics.record_failure(),
        }
        self.transition(CycleState::Idle);

        result
    }

    async fn cycle(&mut self, trigger: Trigger) -> Result<CycleOutcome, CycleError> {
        self.transition(CycleState::Discovering);
        log::debug!("Discovering targets ({:?})", trigger);

        let discovery = tokio::time::timeout(
            self.timeout,
            discovery::discover_targets(&self.lister, &self.rules),
        )
        .await
        .map_err(|_| CycleError::Timeout(self.timeout))??;

        let targets = discovery.targets;
        self.metrics.set_targets(&targets);
        if discovery.skipped_instances > 0 {
            self.metrics
                .record_skipped_instances(discovery.skipped_instances);
        }

        let changed = self
            .last_written
            .as_ref()
            .is_none_or(|old| target::is_different(old, &targets));
        if trigger.is_forced() {
            log::info!("Forcing write of {} targets", targets.len());
        } else if !changed {
            self.transition(CycleState::Skipping);
            log::debug!("No changes detected, skipping write");
            return Ok(CycleOutcome::Skipped);
        }

        self.transition(CycleState::Writing);
        let path = self.output.clone();
        let to_write = targets.clone();
        tokio::task::spawn_blocking(move || target::write(path, &to_write)).await??;

        log::info!(
            "Wrote {} targets to `{}`",
            targets.len(),
            self.output.display()
        );
        self.metrics.record_write();
        self.last_written = Some(targets);

        Ok(CycleOutcome::Written)
    }

    fn transition(&mut self, next: CycleState) {
        log::trace!("Discovery loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::testing::{StaticLister, instance};
    use crate::rules::Rule;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(25);

    struct Fixture {
        lister: Arc<StaticLister>,
        dir: tempfile::TempDir,
        discovery_loop: TriggerLoop<Arc<StaticLister>>,
    }

    impl Fixture {
        fn new(lister: StaticLister) -> Self {
            let lister = Arc::new(lister);
            lister.set_instances(
                "sandbox",
                vec![
                    instance("zk-0", &["zookeeper", "prod"], Some("10.0.0.3")),
                    instance("zk-1", &["zookeeper"], Some("10.0.0.4")),
                ],
            );
            let dir = tempfile::tempdir().unwrap();
            let rules = RuleSet::new(vec![
                Rule::new("zk", ["zookeeper"], "sandbox", [8080, 6060]).unwrap(),
            ]);
            let discovery_loop = TriggerLoop::new(
                Arc::clone(&lister),
                rules,
                dir.path().join("gce.yaml"),
                TIMEOUT,
                Metrics::new().unwrap(),
            );

            Self {
                lister,
                dir,
                discovery_loop,
            }
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("gce.yaml")
        }

        fn modified(&self) -> std::time::SystemTime {
            std::fs::metadata(self.output()).unwrap().modified().unwrap()
        }
    }

    #[tokio::test]
    async fn test_first_cycle_writes() {
        let mut f = Fixture::new(StaticLister::default());

        let outcome = f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Written);
        assert_eq!(f.discovery_loop.state(), CycleState::Idle);

        let written = target::load(f.output()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(!target::is_different(
            &written,
            f.discovery_loop.last_written().unwrap()
        ));

        let metrics = f.discovery_loop.metrics();
        assert_eq!(metrics.successes(), 1);
        assert_eq!(metrics.failures(), 0);
        assert_eq!(metrics.writes(), 1);
        assert_eq!(metrics.targets_for("zk"), 2);
    }

    #[tokio::test]
    async fn test_unchanged_set_is_skipped() {
        let mut f = Fixture::new(StaticLister::default());
        f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();

        // Same instances, different listing order.
        f.lister.set_instances(
            "sandbox",
            vec![
                instance("zk-1", &["zookeeper"], Some("10.0.0.4")),
                instance("zk-0", &["zookeeper", "prod"], Some("10.0.0.3")),
            ],
        );
        let outcome = f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Skipped);

        let metrics = f.discovery_loop.metrics();
        assert_eq!(metrics.successes(), 2);
        assert_eq!(metrics.failures(), 0);
        assert_eq!(metrics.writes(), 1);
    }

    #[tokio::test]
    async fn test_changed_set_is_written() {
        let mut f = Fixture::new(StaticLister::default());
        f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();

        f.lister.set_instances(
            "sandbox",
            vec![instance("zk-0", &["zookeeper", "canary"], Some("10.0.0.3"))],
        );
        let outcome = f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Written);

        let written = target::load(f.output()).unwrap();
        assert_eq!(written.len(), 1);
        let target = written.iter().next().unwrap();
        assert_eq!(target.label("gce_instance_tag_canary"), Some("true"));
        assert_eq!(f.discovery_loop.metrics().writes(), 2);
        assert_eq!(f.discovery_loop.metrics().targets_for("zk"), 1);
    }

    #[tokio::test]
    async fn test_forced_cycle_always_writes() {
        let mut f = Fixture::new(StaticLister::default());
        f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        std::fs::write(f.output(), "tampered").unwrap();

        let outcome = f.discovery_loop.run_cycle(Trigger::Forced).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Written);
        assert_eq!(f.discovery_loop.metrics().writes(), 2);
        assert_eq!(target::load(f.output()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unmappable_instance_does_not_fail_cycle() {
        let mut f = Fixture::new(StaticLister::default());
        f.lister.set_instances(
            "sandbox",
            vec![
                instance("zk-0", &["zookeeper"], None),
                instance("zk-1", &["zookeeper"], Some("10.0.0.4")),
            ],
        );

        let outcome = f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Written);
        assert_eq!(target::load(f.output()).unwrap().len(), 1);
        assert_eq!(f.discovery_loop.metrics().successes(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_file() {
        let mut f = Fixture::new(StaticLister::default());
        f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        let before = std::fs::read(f.output()).unwrap();

        f.lister.fail_project("sandbox");
        let err = f
            .discovery_loop
            .run_cycle(Trigger::Forced)
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Discovery(_)));
        assert_eq!(std::fs::read(f.output()).unwrap(), before);
        assert_eq!(f.discovery_loop.state(), CycleState::Idle);

        let metrics = f.discovery_loop.metrics();
        assert_eq!(metrics.failures(), 1);
        assert_eq!(metrics.successes(), 1);

        // The next trigger retries.
        f.lister.recover_project("sandbox");
        f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(f.discovery_loop.metrics().successes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_cycle_without_writing() {
        let mut f = Fixture::new(StaticLister::with_delay(TIMEOUT * 2));
        std::fs::write(f.output(), "previous").unwrap();
        let modified = f.modified();

        let err = f
            .discovery_loop
            .run_cycle(Trigger::Forced)
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Timeout(t) if t == TIMEOUT));
        assert_eq!(std::fs::read_to_string(f.output()).unwrap(), "previous");
        assert_eq!(f.modified(), modified);

        let metrics = f.discovery_loop.metrics();
        assert_eq!(metrics.failures(), 1);
        assert_eq!(metrics.writes(), 0);
        assert!(f.discovery_loop.last_written().is_none());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let mut f = Fixture::new(StaticLister::default());
        f.discovery_loop.output = f.dir.path().join("missing").join("gce.yaml");

        let err = f
            .discovery_loop
            .run_cycle(Trigger::Scheduled)
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Write(_)));
        assert!(f.discovery_loop.last_written().is_none());
        assert_eq!(f.discovery_loop.metrics().failures(), 1);
    }

    #[tokio::test]
    async fn test_seed_from_output_skips_identical_restart() {
        let mut f = Fixture::new(StaticLister::default());
        f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();

        let mut restarted = TriggerLoop::new(
            Arc::clone(&f.lister),
            f.discovery_loop.rules.clone(),
            f.output(),
            TIMEOUT,
            Metrics::new().unwrap(),
        );
        restarted.seed_from_output();
        assert!(restarted.last_written().is_some());

        let outcome = restarted.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_seed_ignores_unparseable_file() {
        let mut f = Fixture::new(StaticLister::default());
        std::fs::write(f.output(), "{{ not yaml").unwrap();

        f.discovery_loop.seed_from_output();
        assert!(f.discovery_loop.last_written().is_none());
    }

    #[tokio::test]
    async fn test_empty_discovery_still_creates_file() {
        let mut f = Fixture::new(StaticLister::default());
        f.lister.set_instances("sandbox", vec![]);

        let outcome = f.discovery_loop.run_cycle(Trigger::Scheduled).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Written);
        assert!(target::load(f.output()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_consumes_triggers_until_closed() {
        let mut f = Fixture::new(StaticLister::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(Trigger::Scheduled).await.unwrap();
        tx.send(Trigger::Scheduled).await.unwrap();
        tx.send(Trigger::Forced).await.unwrap();
        drop(tx);

        f.discovery_loop
            .run(rx, std::future::pending::<()>())
            .await;

        assert_eq!(f.discovery_loop.state(), CycleState::Stopped);
        let metrics = f.discovery_loop.metrics();
        assert_eq!(metrics.successes(), 3);
        assert_eq!(metrics.writes(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut f = Fixture::new(StaticLister::default());
        let (_tx, rx) = mpsc::channel(1);

        f.discovery_loop.run(rx, std::future::ready(())).await;

        assert_eq!(f.discovery_loop.state(), CycleState::Stopped);
        assert_eq!(f.discovery_loop.metrics().successes(), 0);
    }
}
