//! In-memory metrics sink.

use cosync_api::{LoadStateLabel, MetricsSink};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// An in-memory implementation of the [MetricsSink] gauge.
///
/// Useful for tests and for embedders without a metrics backend; a real
/// deployment would forward the increments to its metrics pipeline.
#[derive(Debug)]
pub struct MemMetricsSink {
    inner: Mutex<HashMap<LoadStateLabel, i64>>,
}

impl MemMetricsSink {
    /// Create a new [MemMetricsSink].
    pub fn create() -> Arc<MemMetricsSink> {
        Arc::new(MemMetricsSink {
            inner: Mutex::new(HashMap::new()),
        })
    }

    /// The current gauge value for a state label.
    pub fn value(&self, state: LoadStateLabel) -> i64 {
        self.inner.lock().unwrap().get(&state).copied().unwrap_or(0)
    }
}

impl MetricsSink for MemMetricsSink {
    fn increment(&self, state: LoadStateLabel) {
        *self.inner.lock().unwrap().entry(state).or_insert(0) += 1;
    }

    fn decrement(&self, state: LoadStateLabel) {
        *self.inner.lock().unwrap().entry(state).or_insert(0) -= 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gauge_tracks_paired_transitions() {
        let sink = MemMetricsSink::create();
        assert_eq!(0, sink.value(LoadStateLabel::Loading));

        sink.increment(LoadStateLabel::Loading);
        assert_eq!(1, sink.value(LoadStateLabel::Loading));

        sink.decrement(LoadStateLabel::Loading);
        sink.increment(LoadStateLabel::Available);
        assert_eq!(0, sink.value(LoadStateLabel::Loading));
        assert_eq!(1, sink.value(LoadStateLabel::Available));
    }
}
