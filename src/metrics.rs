//! Counters and gauges describing discovery, exposed on `/metrics`.
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

use crate::target::TargetSet;

const SUCCESS: &str = "success";
const FAILURE: &str = "failure";

/// Discovery metrics in a registry of their own, so independently
/// configured loops never share series.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    targets: IntGaugeVec,
    sync_duration: Histogram,
    sync_count: IntCounterVec,
    writes: IntCounter,
    skipped_instances: IntCounter,
}

impl Metrics {
    /// # Errors
    ///
    /// Returns an error if a metric is malformed or registered twice.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let targets = IntGaugeVec::new(
            Opts::new("gcesd_targets", "Number of targets discovered, by job name"),
            &["job"],
        )?;
        registry.register(Box::new(targets.clone()))?;

        let sync_duration = Histogram::with_opts(HistogramOpts::new(
            "gcesd_sync_duration_seconds",
            "Duration of the GCE api to prometheus target sync operation",
        ))?;
        registry.register(Box::new(sync_duration.clone()))?;

        let sync_count = IntCounterVec::new(
            Opts::new(
                "gcesd_sync_count",
                "Count of the GCE api to prometheus target sync operation, labeled by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(sync_count.clone()))?;

        let writes = IntCounter::new(
            "gcesd_target_write_count",
            "Number of times that the output file is updated",
        )?;
        registry.register(Box::new(writes.clone()))?;

        let skipped_instances = IntCounter::new(
            "gcesd_skipped_instances_count",
            "Number of matching instances left out because they could not be mapped",
        )?;
        registry.register(Box::new(skipped_instances.clone()))?;

        // Both outcomes are exported from the start.
        sync_count.with_label_values(&[SUCCESS]);
        sync_count.with_label_values(&[FAILURE]);

        Ok(Self {
            registry,
            targets,
            sync_duration,
            sync_count,
            writes,
            skipped_instances,
        })
    }

    /// Replaces the per-job target gauges; jobs absent from `targets` vanish.
    pub fn set_targets(&self, targets: &TargetSet) {
        self.targets.reset();
        for (job, count) in targets.count_by_job() {
            self.targets.with_label_values(&[job]).set(count as i64);
        }
    }

    pub fn observe_sync_duration(&self, seconds: f64) {
        self.sync_duration.observe(seconds);
    }

    pub fn record_success(&self) {
        self.sync_count.with_label_values(&[SUCCESS]).inc();
    }

    pub fn record_failure(&self) {
        self.sync_count.with_label_values(&[FAILURE]).inc();
    }

    pub fn record_write(&self) {
        self.writes.inc();
    }

    pub fn record_skipped_instances(&self, count: usize) {
        self.skipped_instances.inc_by(count as u64);
    }

    pub fn successes(&self) -> u64 {
        self.sync_count.with_label_values(&[SUCCESS]).get()
    }

    pub fn failures(&self) -> u64 {
        self.sync_count.with_label_values(&[FAILURE]).get()
    }

    pub fn writes(&self) -> u64 {
        self.writes.get()
    }

    pub fn targets_for(&self, job: &str) -> i64 {
        self.targets.with_label_values(&[job]).get()
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_owned()
    }
}
