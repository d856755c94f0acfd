pub mod debug;
pub mod error;
pub mod frames;
pub mod histogram;
pub mod model;
pub mod proto;
pub mod render;
pub mod scrape;

pub use model::{decode_snapshot, Metric, MetricFamily, MetricValue, Snapshot};
pub use proto::MetricType;

impl MetricType {
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
            MetricType::Histogram => "histogram",
            MetricType::GaugeHistogram => "gauge_histogram",
        }
    }
}
