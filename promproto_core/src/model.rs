//! Typed metric records, decoded from the wire schema.
//!
//! The wire `Metric` message has one optional field per value kind; here the
//! value is picked once, from the family's type, so it can't disagree with it.

use prost::Message;

use crate::debug::DEBUG;
use crate::error::FrameError;
use crate::frames::{Frame, Frames};
use crate::proto;
use crate::MetricType;

#[derive(Clone, Debug, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    /// May be empty
    pub help: String,
    pub kind: MetricType,
    pub metrics: Vec<Metric>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    /// Labels in the order they were declared; names aren't checked for uniqueness.
    pub labels: Vec<LabelPair>,
    pub value: MetricValue,
    pub timestamp_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelPair {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    Untyped(f64),
    Summary(Summary),
    /// Both `histogram` and `gauge_histogram` families
    Histogram(Histogram),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub sample_count: u64,
    pub sample_sum: f64,
    pub quantiles: Vec<Quantile>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quantile {
    pub quantile: f64,
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Histogram {
    pub sample_count: u64,
    pub sample_sum: f64,
    /// Classic buckets, ascending by upper bound; the last bound is `+Inf`.
    pub buckets: Vec<Bucket>,

    /// Native bucket resolution; bucket `i` spans `[base^i, base^(i+1))` where `base = 2^(2^-schema)`.
    pub schema: i32,
    pub zero_threshold: f64,
    pub zero_count: u64,
    pub positive: SparseBuckets,
    pub negative: SparseBuckets,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bucket {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

/// One side (positive or negative) of a native histogram.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseBuckets {
    pub spans: Vec<Span>,
    /// Bucket counts, each relative to the previous populated bucket
    pub deltas: Vec<i64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Span {
    pub offset: i32,
    pub length: u32,
}

impl MetricFamily {
    /// Decode a single frame of a delimited stream
    pub fn decode(frame: Frame<'_>) -> Result<Self, FrameError> {
        let family = proto::MetricFamily::decode(frame.payload).map_err(|cause| FrameError::Decode {
            offset: frame.offset,
            cause,
        })?;
        let kind = MetricType::from_i32(family.r#type).ok_or(FrameError::UnknownType {
            offset: frame.offset,
            value: family.r#type,
        })?;
        let metrics = family
            .metric
            .into_iter()
            .map(|metric| Metric::from_wire(metric, kind))
            .collect();
        Ok(MetricFamily {
            name: family.name,
            help: family.help,
            kind,
            metrics,
        })
    }
}

impl Metric {
    fn from_wire(metric: proto::Metric, kind: MetricType) -> Self {
        // Missing payloads read as their defaults, as proto2 getters would
        let value = match kind {
            MetricType::Counter => MetricValue::Counter(metric.counter.unwrap_or_default().value),
            MetricType::Gauge => MetricValue::Gauge(metric.gauge.unwrap_or_default().value),
            MetricType::Untyped => MetricValue::Untyped(metric.untyped.unwrap_or_default().value),
            MetricType::Summary => MetricValue::Summary(metric.summary.unwrap_or_default().into()),
            MetricType::Histogram | MetricType::GaugeHistogram => {
                MetricValue::Histogram(metric.histogram.unwrap_or_default().into())
            }
        };
        let labels = metric
            .label
            .into_iter()
            .map(|label| LabelPair {
                name: label.name,
                value: label.value,
            })
            .collect();
        Metric {
            labels,
            value,
            timestamp_ms: metric.timestamp_ms,
        }
    }
}

impl From<proto::Summary> for Summary {
    fn from(summary: proto::Summary) -> Self {
        Summary {
            sample_count: summary.sample_count,
            sample_sum: summary.sample_sum,
            quantiles: summary
                .quantile
                .into_iter()
                .map(|q| Quantile {
                    quantile: q.quantile,
                    value: q.value,
                })
                .collect(),
        }
    }
}

impl From<proto::Histogram> for Histogram {
    fn from(histogram: proto::Histogram) -> Self {
        fn spans(spans: Vec<proto::BucketSpan>) -> Vec<Span> {
            spans
                .into_iter()
                .map(|span| Span {
                    offset: span.offset,
                    length: span.length,
                })
                .collect()
        }

        Histogram {
            sample_count: histogram.sample_count,
            sample_sum: histogram.sample_sum,
            buckets: histogram
                .bucket
                .into_iter()
                .map(|bucket| Bucket {
                    upper_bound: bucket.upper_bound,
                    cumulative_count: bucket.cumulative_count,
                })
                .collect(),
            schema: histogram.schema,
            zero_threshold: histogram.zero_threshold,
            zero_count: histogram.zero_count,
            positive: SparseBuckets {
                spans: spans(histogram.positive_span),
                deltas: histogram.positive_delta,
            },
            negative: SparseBuckets {
                spans: spans(histogram.negative_span),
                deltas: histogram.negative_delta,
            },
        }
    }
}

/// Everything decoded from one scrape
#[derive(Debug, Default)]
pub struct Snapshot {
    pub families: Vec<MetricFamily>,
    /// Frames that were skipped because they couldn't be decoded
    pub errors: Vec<FrameError>,
    /// Trailing bytes that didn't form a complete frame
    pub truncated_bytes: usize,
}

/// Decode a length-delimited stream of `MetricFamily` messages.
///
/// A corrupt message is recorded in `Snapshot::errors` and skipped; decoding
/// stops quietly at the first incomplete frame, keeping everything before it.
pub fn decode_snapshot(input: &[u8]) -> Snapshot {
    let mut snapshot = Snapshot::default();
    let mut frames = Frames::new(input);
    for frame in frames.by_ref() {
        match MetricFamily::decode(frame) {
            Ok(family) => snapshot.families.push(family),
            Err(err) => snapshot.errors.push(err),
        }
    }
    snapshot.truncated_bytes = frames.remaining();

    DEBUG.frames_decoded(snapshot.families.len());
    DEBUG.frames_failed(snapshot.errors.len());
    if snapshot.truncated_bytes > 0 {
        DEBUG.stream_truncated(snapshot.truncated_bytes);
    }
    snapshot
}
