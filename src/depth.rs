use log::info;

// deeper null links share the last bucket.
const BUCKETS: usize = 256;

/// Histogram of null-link depths, gathered by [`Tree::audit`].
///
/// Every empty child slot reached while auditing is one sample, its depth
/// being the number of nodes on the path from the root. For a red-black
/// tree of `n` nodes there are `n + 1` samples, and the spread between
/// [`Depth::min`] and [`Depth::max`] tells how far the tree is from
/// perfect balance.
///
/// [`Tree::audit`]: crate::Tree::audit
#[derive(Clone, Debug)]
pub struct Depth {
    samples: usize,
    min: usize,
    max: usize,
    total: usize,
    buckets: [u64; BUCKETS],
}

impl Depth {
    pub(crate) fn new() -> Depth {
        Default::default()
    }

    pub(crate) fn sample(&mut self, depth: usize) {
        self.min = if self.samples == 0 {
            depth
        } else {
            self.min.min(depth)
        };
        self.max = self.max.max(depth);
        self.samples += 1;
        self.total += depth;
        self.buckets[depth.min(BUCKETS - 1)] += 1;
    }

    /// Number of null links sampled.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Shallowest null link, zero when nothing was sampled.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Deepest null link.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Integer mean over all samples, zero when nothing was sampled.
    pub fn mean(&self) -> usize {
        self.total.checked_div(self.samples).unwrap_or(0)
    }

    /// Cumulative distribution over the tail of the histogram. Each entry
    /// is `(percent, depth)`, `percent` of the samples sit at `depth` or
    /// shallower. Only depths where the running total has reached 90% are
    /// listed, the last entry is always `(100, max)`.
    pub fn percentiles(&self) -> Vec<(u8, usize)> {
        let mut acc = 0_u64;
        let mut tail = vec![];
        if self.samples == 0 {
            return tail;
        }
        for (depth, &count) in self.buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            acc += count;
            let percent = (acc * 100 / self.samples as u64) as u8;
            if percent >= 90 {
                tail.push((percent, depth));
            }
        }
        tail
    }

    /// Log the summary and the percentile tail, one line each.
    pub fn pretty_print(&self, prefix: &str) {
        info!(
            "{}null-link depth over {} samples, min:{} mean:{} max:{}",
            prefix,
            self.samples,
            self.min,
            self.mean(),
            self.max
        );
        for (percent, depth) in self.percentiles() {
            info!("{}  {:>3}% at depth <= {}", prefix, percent, depth);
        }
    }

    /// Render as a single-line JSON object with the summary and the
    /// percentile tail as `[percent, depth]` pairs.
    pub fn json(&self) -> String {
        let tail = self
            .percentiles()
            .into_iter()
            .map(|(percent, depth)| format!("[{},{}]", percent, depth))
            .collect::<Vec<String>>()
            .join(",");
        format!(
            "{{\"samples\":{},\"min\":{},\"mean\":{},\"max\":{},\"tail\":[{}]}}",
            self.samples,
            self.min,
            self.mean(),
            self.max,
            tail
        )
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth {
            samples: 0,
            min: 0,
            max: 0,
            total: 0,
            buckets: [0; BUCKETS],
        }
    }
}
