/// Number of buckets variations are spread over.
pub const MAX_TRAFFIC_VALUE: u32 = 10_000;

/// Campaign traffic percentages are expressed out of this.
pub const MAX_TRAFFIC_PERCENT: u32 = 100;

/// Inclusive range of variation buckets owned by one variation.
///
/// Zero-weight variations get the `(-1, -1)` sentinel, which contains no
/// bucket. Ranges of over-allocated campaigns may run past `MAX_TRAFFIC_VALUE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub start: i64,
    pub end: i64,
}

impl BucketRange {
    pub const UNREACHABLE: BucketRange = BucketRange { start: -1, end: -1 };

    pub fn contains(&self, bucket: u32) -> bool {
        let bucket = i64::from(bucket);
        self.start <= bucket && bucket <= self.end
    }

    pub fn is_unreachable(&self) -> bool {
        *self == Self::UNREACHABLE
    }

    pub fn len(&self) -> u32 {
        if self.is_unreachable() || self.start > self.end {
            0
        } else {
            (self.end - self.start + 1) as u32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of buckets a weight (a percentage) is worth, capped at `total_space`.
/// `None` for absent, zero or negative weights.
pub fn bucket_span(weight: Option<f64>, total_space: u32) -> Option<u32> {
    let weight = weight.filter(|w| *w > 0.0)?;
    let buckets_per_percent = f64::from(total_space / MAX_TRAFFIC_PERCENT);
    let span = (weight * buckets_per_percent).ceil();
    Some(span.min(f64::from(total_space)) as u32)
}

/// Splits `total_space` into contiguous ranges, one per weight, in declaration order.
///
/// Ranges are handed out front to back and never re-sorted, so reordering a
/// campaign's variations moves bucket ownership. Weight lists that overshoot
/// 100% do not fail and are not truncated: later ranges run past
/// `total_space`, where bucketing can still land for users whose bucket value
/// exceeds it. Running experiments depend on this, keep it.
pub fn allocate(weights: &[Option<f64>], total_space: u32) -> Vec<BucketRange> {
    let mut allocated: i64 = 0;

    weights
        .iter()
        .map(|weight| match bucket_span(*weight, total_space) {
            Some(span) => {
                let range = BucketRange {
                    start: allocated + 1,
                    end: allocated + i64::from(span),
                };
                allocated = range.end;
                range
            }
            None => BucketRange::UNREACHABLE,
        })
        .collect()
}
