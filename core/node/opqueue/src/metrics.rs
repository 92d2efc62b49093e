use vise::{Counter, Gauge, Metrics};

#[derive(Debug, Metrics)]
#[metrics(prefix = "anchor_opqueue")]
pub(crate) struct OpQueueMetrics {
    /// Operations currently in the pending buffer.
    pub pending_ops: Gauge<usize>,

    /// Operations accepted by `add`.
    pub added_ops: Counter,

    /// Operations handed to the batch writer.
    pub removed_ops: Counter,

    /// Operations repudiated and republished for redelivery.
    pub nacked_ops: Counter,

    /// Operations dropped after exhausting the retry ceiling.
    pub dropped_ops: Counter,

    /// Messages dropped because they could not be unmarshalled.
    pub unmarshal_failures: Counter,

    /// Orphaned in-flight operations recovered by the monitor.
    pub republished_ops: Counter,
}

#[vise::register]
pub(crate) static METRICS: vise::Global<OpQueueMetrics> = vise::Global::new();
