//! Running average of measured element sizes.

/// Number of slots in an [`EstimationBuffer`].
pub const ESTIMATION_BUFFER_SIZE: usize = 100;

/// Bounded ring of per-index sizes used to estimate the size of elements
/// that were never measured.
///
/// Slot `index % ESTIMATION_BUFFER_SIZE` remembers the last size recorded
/// for that index, so re-measuring an element replaces its old contribution
/// instead of counting it twice.
#[derive(Debug, Clone)]
pub struct EstimationBuffer {
    slots: [Option<f32>; ESTIMATION_BUFFER_SIZE],
    total: f32,
    measured: usize,
}

impl Default for EstimationBuffer {
    fn default() -> Self {
        Self {
            slots: [None; ESTIMATION_BUFFER_SIZE],
            total: 0.0,
            measured: 0,
        }
    }
}

impl EstimationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size measured for `index`.
    pub fn record(&mut self, index: usize, size: f32) {
        let slot = &mut self.slots[index % ESTIMATION_BUFFER_SIZE];
        match slot.replace(size) {
            Some(previous) => self.total -= previous,
            None => self.measured += 1,
        }
        self.total += size;
    }

    /// Number of occupied slots.
    #[inline]
    pub fn measured(&self) -> usize {
        self.measured
    }

    #[inline]
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Mean of the occupied slots, `None` before anything was recorded.
    pub fn average(&self) -> Option<f32> {
        (self.measured > 0).then(|| self.total / self.measured as f32)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_recorded_sizes() {
        let mut buffer = EstimationBuffer::new();
        assert_eq!(buffer.average(), None);
        buffer.record(0, 20.0);
        buffer.record(1, 30.0);
        buffer.record(2, 25.0);
        assert_eq!(buffer.measured(), 3);
        assert_eq!(buffer.average(), Some(25.0));
    }

    #[test]
    fn test_remeasure_replaces_contribution() {
        let mut buffer = EstimationBuffer::new();
        buffer.record(4, 10.0);
        buffer.record(4, 50.0);
        assert_eq!(buffer.measured(), 1);
        assert_eq!(buffer.total(), 50.0);
    }

    #[test]
    fn test_indices_share_slots_modulo_capacity() {
        let mut buffer = EstimationBuffer::new();
        buffer.record(3, 10.0);
        buffer.record(3 + ESTIMATION_BUFFER_SIZE, 30.0);
        assert_eq!(buffer.measured(), 1);
        assert_eq!(buffer.average(), Some(30.0));

        buffer.clear();
        assert_eq!(buffer.measured(), 0);
    }
}
