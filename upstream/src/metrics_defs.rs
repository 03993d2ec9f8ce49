//! Metrics definitions for upstream calls.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_REQUEST_DURATION: MetricDef = MetricDef {
    name: "upstream.request.duration",
    metric_type: MetricType::Histogram,
    description: "Upstream call duration in seconds. Tagged with upstream, outcome.",
};

pub const UPSTREAM_REQUEST_FAILURES: MetricDef = MetricDef {
    name: "upstream.request.failures",
    metric_type: MetricType::Counter,
    description: "Upstream calls that failed at the transport level. Tagged with upstream, reason.",
};

pub const HEALTH_CHECK: MetricDef = MetricDef {
    name: "health.check",
    metric_type: MetricType::Counter,
    description: "Dependency liveness checks. Tagged with dependency, status.",
};

pub const DISPATCH_FANOUT_SIZE: MetricDef = MetricDef {
    name: "dispatch.fanout.size",
    metric_type: MetricType::Histogram,
    description: "Number of upstream calls issued for one inbound request",
};

pub const ALL_METRICS: &[MetricDef] = &[
    UPSTREAM_REQUEST_DURATION,
    UPSTREAM_REQUEST_FAILURES,
    HEALTH_CHECK,
    DISPATCH_FANOUT_SIZE,
];
