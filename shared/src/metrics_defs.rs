//! Common types for metrics definitions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

#[macro_export]
macro_rules! counter {
    ($def:expr $(, $key:expr => $value:expr)* $(,)?) => {
        metrics::counter!($def.name $(, $key => $value)*)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr $(, $key:expr => $value:expr)* $(,)?) => {
        metrics::histogram!($def.name $(, $key => $value)*)
    };
}

/// Registers descriptions for every metric in `defs` with the installed recorder.
pub fn describe_all(defs: &[MetricDef]) {
    for def in defs {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}
