use std::time::Duration;

use vise::{Buckets, Counter, Histogram, Metrics, Unit};

#[derive(Debug, Metrics)]
#[metrics(prefix = "anchor_witness")]
pub(crate) struct WitnessMetrics {
    /// Offer activities emitted to witnesses.
    pub solicitations: Counter,

    /// Witness proofs received via Accept activities.
    pub proofs_received: Counter,

    /// Anchors whose policy was satisfied.
    pub witnessed_anchors: Counter,

    /// Anchors published to the activity stream.
    pub published_anchors: Counter,

    /// Anchors rejected after exhausting the resolicitation budget.
    pub rejected_anchors: Counter,

    /// Resolicitation rounds performed.
    pub resolicits: Counter,

    /// Batches anchored by the writer.
    pub anchored_batches: Counter,

    /// Time from policy satisfaction to published anchor.
    #[metrics(buckets = Buckets::LATENCIES, unit = Unit::Seconds)]
    pub publish_latency: Histogram<Duration>,
}

#[vise::register]
pub(crate) static METRICS: vise::Global<WitnessMetrics> = vise::Global::new();
