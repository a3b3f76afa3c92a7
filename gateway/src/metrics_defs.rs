//! Metrics definitions for the gateway pipeline.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "gateway.requests",
    metric_type: MetricType::Counter,
    description: "Number of requests entering the pipeline",
};

pub const REQUEST_FAILURES: MetricDef = MetricDef {
    name: "gateway.request.failures",
    metric_type: MetricType::Counter,
    description: "Number of requests that ended in a failure outcome",
};

pub const TELEMETRY_DELIVERY_FAILURES: MetricDef = MetricDef {
    name: "gateway.telemetry.delivery_failures",
    metric_type: MetricType::Counter,
    description: "Diagnostic events that could not be delivered",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "gateway.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time from request receipt to terminal response in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS,
    REQUEST_FAILURES,
    TELEMETRY_DELIVERY_FAILURES,
    REQUEST_DURATION,
];
