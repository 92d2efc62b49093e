use std::time::Duration;

use vise::{Buckets, Counter, Histogram, LabeledFamily, Metrics, Unit};

#[derive(Debug, Metrics)]
#[metrics(prefix = "anchor_task_coordinator")]
pub(crate) struct TaskCoordinatorMetrics {
    /// Task runs started by this instance.
    #[metrics(labels = ["task_id"])]
    pub task_runs: LabeledFamily<String, Counter>,

    /// Permits taken over from stale holders.
    pub takeovers: Counter,

    /// Wall-clock duration of task handler runs.
    #[metrics(buckets = Buckets::LATENCIES, unit = Unit::Seconds)]
    pub task_latency: Histogram<Duration>,
}

#[vise::register]
pub(crate) static METRICS: vise::Global<TaskCoordinatorMetrics> = vise::Global::new();
