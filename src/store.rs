use crate::detection::Detection;
use parking_lot::RwLock;
use std::sync::Arc;

/// Single-slot store holding the most recent accepted detection batch.
///
/// The slot starts out as the empty batch and is replaced wholesale on every
/// write; no history is kept. Batches are immutable once stored, so a write
/// is an `Arc` swap and a read is an `Arc` clone. Readers share the read
/// lock and either side's critical section is a pointer operation, never a
/// serialization or an allocation.
pub struct LatestBatchStore {
    latest: RwLock<Arc<Vec<Detection>>>,
}

impl LatestBatchStore {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Replaces the stored batch unconditionally. An empty batch is a real
    /// signal (a frame with no detections) and overwrites like any other.
    pub fn write(&self, batch: Vec<Detection>) {
        let batch = Arc::new(batch);
        *self.latest.write() = batch;
    }

    /// Returns the current batch. The snapshot is complete: it is the value
    /// of some single prior write, or the initial empty batch.
    pub fn read(&self) -> Arc<Vec<Detection>> {
        Arc::clone(&self.latest.read())
    }
}

impl Default for LatestBatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::NormalizedBbox;
    use std::thread;

    fn uniform_batch(label: &str, confidence: f64, len: usize) -> Vec<Detection> {
        (0..len)
            .map(|_| Detection {
                label: label.to_string(),
                confidence,
                bbox_normalized: NormalizedBbox {
                    xmin: 0.1,
                    ymin: 0.2,
                    xmax: 0.4,
                    ymax: 0.9,
                },
            })
            .collect()
    }

    #[test]
    fn starts_empty() {
        let store = LatestBatchStore::new();
        assert!(store.read().is_empty());
    }

    #[test]
    fn last_write_wins() {
        let store = LatestBatchStore::new();

        store.write(uniform_batch("person", 0.9, 2));
        store.write(uniform_batch("car", 0.5, 3));

        let snapshot = store.read();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].label, "car");
    }

    #[test]
    fn empty_batch_clears_previous_detections() {
        let store = LatestBatchStore::new();

        store.write(uniform_batch("person", 0.9, 4));
        store.write(Vec::new());

        assert!(store.read().is_empty());
    }

    #[test]
    fn reads_see_the_write_completed_before_them() {
        let store = LatestBatchStore::new();
        let batch = uniform_batch("dog", 0.7, 1);

        store.write(batch.clone());

        assert_eq!(*store.read(), batch);
    }

    #[test]
    fn concurrent_readers_never_observe_a_torn_batch() {
        // One writer alternates between two internally-uniform batches while
        // readers hammer the slot. Every snapshot must be uniform: a mixture
        // of the two batches would mean a read overlapped a write.
        let store = Arc::new(LatestBatchStore::new());
        let batches = [
            uniform_batch("person", 0.25, 64),
            uniform_batch("car", 0.75, 32),
        ];

        let writer = {
            let store = Arc::clone(&store);
            let batches = batches.clone();
            thread::spawn(move || {
                for i in 0..2_000 {
                    store.write(batches[i % 2].clone());
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = store.read();
                        if let Some(first) = snapshot.first() {
                            assert!(snapshot
                                .iter()
                                .all(|d| d.label == first.label
                                    && d.confidence == first.confidence));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn snapshots_outlive_later_writes() {
        let store = LatestBatchStore::new();

        store.write(uniform_batch("person", 0.9, 2));
        let snapshot = store.read();
        store.write(uniform_batch("car", 0.5, 5));

        // The old snapshot is still the batch it was when read.
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].label, "person");
        assert_eq!(store.read()[0].label, "car");
    }
}
