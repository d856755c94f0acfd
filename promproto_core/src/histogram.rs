//! Reconstructs renderable bucket ranges from classic and native histograms.

use crate::model::{Bucket, Histogram, SparseBuckets};

/// How a histogram's buckets are encoded
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Layout<'a> {
    /// Sparse exponential buckets described by `schema`, spans and deltas
    Native,
    /// An explicit list of cumulative `le` buckets
    Classic(&'a [Bucket]),
    /// Only the sample count and sum are available
    Empty,
}

pub fn layout(histogram: &Histogram) -> Layout<'_> {
    if histogram.schema != 0
        || !histogram.positive.spans.is_empty()
        || !histogram.negative.spans.is_empty()
    {
        Layout::Native
    } else if !histogram.buckets.is_empty() {
        Layout::Classic(&histogram.buckets)
    } else {
        Layout::Empty
    }
}

/// A bucket's bounds and count.
///
/// For native buckets the range is `[lower, upper)`; classic buckets are unbounded below.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BucketRange {
    pub lower: f64,
    pub upper: f64,
    /// Wide enough for any classic `u64` count and any sum of native `i64` deltas
    pub count: i128,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Sign {
    Positive,
    Negative,
}

/// The bounds of native bucket `index`, as `(base^index, base^(index+1))`.
///
/// Schemas far outside the valid range yield degenerate (zero, one or infinite) bounds.
pub fn bucket_bounds(index: i64, schema: i32) -> (f64, f64) {
    let base = 2f64.powf(2f64.powf(-f64::from(schema)));
    (base.powf(index as f64), base.powf((index + 1) as f64))
}

/// Pass classic buckets through, in order
pub fn classic_ranges(buckets: &[Bucket]) -> Vec<BucketRange> {
    buckets
        .iter()
        .map(|bucket| BucketRange {
            lower: f64::NEG_INFINITY,
            upper: bucket.upper_bound,
            count: i128::from(bucket.cumulative_count),
        })
        .collect()
}

/// Walk the spans of one side of a native histogram.
///
/// Each populated bucket consumes one delta; when deltas run out before the spans do,
/// the walk stops there. Counts aren't clamped, so inconsistent deltas may produce
/// negative counts.
pub fn native_ranges(buckets: &SparseBuckets, schema: i32, sign: Sign) -> Vec<BucketRange> {
    let mut deltas = buckets.deltas.iter();
    let mut index: i64 = 0;
    let mut count: i128 = 0;
    let mut ranges = Vec::with_capacity(buckets.deltas.len());
    'spans: for span in &buckets.spans {
        index += i64::from(span.offset);
        for _ in 0..span.length {
            let delta = match deltas.next() {
                Some(delta) => *delta,
                None => break 'spans,
            };
            count = count.saturating_add(i128::from(delta));

            let (lower, upper) = bucket_bounds(index, schema);
            let (lower, upper) = match sign {
                Sign::Positive => (lower, upper),
                Sign::Negative => (-upper, -lower),
            };
            ranges.push(BucketRange {
                lower,
                upper,
                count,
            });
            index += 1;
        }
    }
    ranges
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Span;

    fn sparse(spans: &[(i32, u32)], deltas: &[i64]) -> SparseBuckets {
        SparseBuckets {
            spans: spans
                .iter()
                .map(|&(offset, length)| Span { offset, length })
                .collect(),
            deltas: deltas.to_vec(),
        }
    }

    #[test]
    fn classifies_layouts() {
        let mut histogram = Histogram::default();
        assert_eq!(layout(&histogram), Layout::Empty);

        histogram.buckets.push(Bucket {
            upper_bound: f64::INFINITY,
            cumulative_count: 1,
        });
        assert!(matches!(layout(&histogram), Layout::Classic(b) if b.len() == 1));

        // A non-zero schema makes it native even without spans
        histogram.schema = -1;
        assert_eq!(layout(&histogram), Layout::Native);

        histogram.schema = 0;
        histogram.negative = sparse(&[(0, 1)], &[1]);
        assert_eq!(layout(&histogram), Layout::Native);
    }

    #[test]
    fn classic_buckets_pass_through_in_order() {
        let buckets = [(0.1, 20), (0.5, 70), (1.0, 95), (f64::INFINITY, 100)]
            .iter()
            .map(|&(upper_bound, cumulative_count)| Bucket {
                upper_bound,
                cumulative_count,
            })
            .collect::<Vec<_>>();

        let ranges = classic_ranges(&buckets);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].upper, 0.1);
        assert_eq!(ranges[0].count, 20);
        assert_eq!(ranges[3].upper, f64::INFINITY);
        assert_eq!(ranges[3].count, 100);
        assert!(ranges.iter().all(|r| r.lower == f64::NEG_INFINITY));
    }

    #[test]
    fn bounds_follow_schema_resolution() {
        assert_eq!(bucket_bounds(0, 0), (1.0, 2.0));
        assert_eq!(bucket_bounds(3, 0), (8.0, 16.0));
        assert_eq!(bucket_bounds(-1, 0), (0.5, 1.0));
        // schema -1 squares the base
        assert_eq!(bucket_bounds(1, -1), (4.0, 16.0));
        // schema 1 halves the exponent step
        let (lower, upper) = bucket_bounds(1, 1);
        assert!((lower - 2f64.sqrt()).abs() < 1e-12);
        assert!((upper - 2.0).abs() < 1e-12);
    }

    #[test]
    fn extreme_schemas_do_not_panic() {
        assert_eq!(bucket_bounds(0, i32::MIN), (1.0, f64::INFINITY));
        assert_eq!(bucket_bounds(0, i32::MAX), (1.0, 1.0));
        assert_eq!(bucket_bounds(-1, i32::MIN).0, 0.0);

        let ranges = native_ranges(&sparse(&[(i32::MIN, 2)], &[1, 1]), i32::MIN, Sign::Negative);
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn classic_counts_keep_full_u64_range() {
        let buckets = [Bucket {
            upper_bound: f64::INFINITY,
            cumulative_count: u64::MAX,
        }];
        assert_eq!(classic_ranges(&buckets)[0].count, i128::from(u64::MAX));
    }

    #[test]
    fn single_positive_bucket() {
        let ranges = native_ranges(&sparse(&[(0, 1)], &[5]), 0, Sign::Positive);
        assert_eq!(
            ranges,
            vec![BucketRange {
                lower: 1.0,
                upper: 2.0,
                count: 5
            }]
        );
    }

    #[test]
    fn spans_skip_offsets_and_accumulate_deltas() {
        let buckets = sparse(&[(1, 2), (2, 1)], &[3, -1, 4]);
        let ranges = native_ranges(&buckets, 0, Sign::Positive);

        let bounds = ranges.iter().map(|r| (r.lower, r.upper)).collect::<Vec<_>>();
        assert_eq!(bounds, vec![(2.0, 4.0), (4.0, 8.0), (32.0, 64.0)]);
        let counts = ranges.iter().map(|r| r.count).collect::<Vec<_>>();
        assert_eq!(counts, vec![3, 2, 6]);
    }

    #[test]
    fn negative_side_mirrors_bounds() {
        let ranges = native_ranges(&sparse(&[(0, 2)], &[1, 1]), 0, Sign::Negative);
        assert_eq!(ranges[0].lower, -2.0);
        assert_eq!(ranges[0].upper, -1.0);
        assert_eq!(ranges[1].lower, -4.0);
        assert_eq!(ranges[1].upper, -2.0);
        assert!(ranges.iter().all(|r| r.lower < r.upper));
        assert_eq!(ranges[1].count, 2);
    }

    #[test]
    fn stops_when_deltas_run_out() {
        let ranges = native_ranges(&sparse(&[(0, 3), (1, 2)], &[1, 1]), 0, Sign::Positive);
        assert_eq!(ranges.len(), 2);

        assert!(native_ranges(&sparse(&[(0, 4)], &[]), 0, Sign::Positive).is_empty());
    }

    #[test]
    fn inconsistent_deltas_are_not_clamped() {
        let ranges = native_ranges(&sparse(&[(0, 2)], &[2, -5]), 0, Sign::Positive);
        assert_eq!(ranges[1].count, -3);
    }
}
