use std::sync::{Mutex, MutexGuard};

use hashbrown::HashMap;

use crate::record::RecordKey;
use crate::{snapshot, CompressionConfig, EmbeddingRecord, IndexError, StoreBackend, StoreConfig};

#[derive(Default)]
struct Catalog {
    records: Vec<EmbeddingRecord>,
    positions: HashMap<RecordKey, usize>,
}

impl Catalog {
    fn from_records(records: Vec<EmbeddingRecord>) -> Self {
        let mut catalog = Catalog::default();
        for rec in records {
            // A well-formed snapshot has unique keys; keep the last row if not.
            match catalog.positions.get(&rec.key()) {
                Some(&pos) => catalog.records[pos] = rec,
                None => {
                    catalog.positions.insert(rec.key(), catalog.records.len());
                    catalog.records.push(rec);
                }
            }
        }
        catalog
    }
}

/// Allowed distance of a stored vector's L2 norm from 1. All-zero vectors
/// (blank crops) are accepted as is.
const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// What the previous state of a slot was, for rolling back a failed save.
enum Undo {
    Replaced(usize, EmbeddingRecord),
    Appended(RecordKey),
}

/// Durable, thread-safe catalog of [`EmbeddingRecord`]s.
///
/// One mutex serializes every operation. `upsert` holds it across the
/// in-memory mutation and the write-through save, so concurrent writers
/// never interleave snapshots.
pub struct EmbeddingStore {
    backend: Box<dyn StoreBackend>,
    compression: CompressionConfig,
    dim: usize,
    catalog: Mutex<Catalog>,
}

impl EmbeddingStore {
    /// Build the configured backend and load any persisted catalog for
    /// vectors of width `dim`.
    pub fn open(cfg: &StoreConfig, dim: usize) -> Result<Self, IndexError> {
        cfg.validate()?;
        let backend = cfg.backend.build()?;
        Self::with_backend(backend, cfg.compression.clone(), dim)
    }

    /// Use a caller-supplied backend (tests, custom storage).
    pub fn with_backend(
        backend: Box<dyn StoreBackend>,
        compression: CompressionConfig,
        dim: usize,
    ) -> Result<Self, IndexError> {
        if dim == 0 {
            return Err(IndexError::InvalidConfig(
                "embedding dimension must be > 0".into(),
            ));
        }
        let records = load_or_discard(backend.as_ref(), &compression, dim);
        Ok(Self {
            backend,
            compression,
            dim,
            catalog: Mutex::new(Catalog::from_records(records)),
        })
    }

    /// Width every stored vector must have.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Insert a record, or overwrite the display name, orientation and
    /// vector of the record with the same `(individual_id, photo_id)`.
    ///
    /// Vectors must be L2-normalized (or all zero) so that dot products
    /// are cosine similarities.
    ///
    /// The full catalog is persisted before returning. If the save fails
    /// the in-memory change is rolled back and the error is returned.
    pub fn upsert(&self, record: EmbeddingRecord) -> Result<(), IndexError> {
        if record.individual_id.is_empty() {
            return Err(IndexError::InvalidRecord("individual_id is empty".into()));
        }
        if record.vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: record.vector.len(),
            });
        }
        if record.vector.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::InvalidRecord(
                "vector contains non-finite values".into(),
            ));
        }
        let norm = record.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm != 0.0 && (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(IndexError::InvalidRecord(format!(
                "vector is not unit-norm (norm {norm:.4})"
            )));
        }

        let mut catalog = self.lock();
        let key = record.key();
        let undo = match catalog.positions.get(&key).copied() {
            Some(pos) => {
                let previous = std::mem::replace(&mut catalog.records[pos], record);
                Undo::Replaced(pos, previous)
            }
            None => {
                let pos = catalog.records.len();
                catalog.records.push(record);
                catalog.positions.insert(key.clone(), pos);
                Undo::Appended(key)
            }
        };

        let saved = snapshot::encode(&catalog.records, self.dim, &self.compression)
            .and_then(|bytes| self.backend.save(&bytes));
        if let Err(err) = saved {
            match undo {
                Undo::Replaced(pos, previous) => catalog.records[pos] = previous,
                Undo::Appended(key) => {
                    catalog.records.pop();
                    catalog.positions.remove(&key);
                }
            }
            tracing::error!(error = %err, backend = %self.backend.describe(), "catalog save failed");
            return Err(err);
        }

        tracing::debug!(count = catalog.records.len(), "catalog persisted");
        Ok(())
    }

    /// Copies of all records in insertion order.
    pub fn get_all(&self) -> Vec<EmbeddingRecord> {
        self.lock().records.clone()
    }

    pub fn count(&self) -> usize {
        self.lock().records.len()
    }

    // No code path panics while holding the lock, so a poisoned guard still
    // protects a consistent catalog.
    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_or_discard(
    backend: &dyn StoreBackend,
    compression: &CompressionConfig,
    dim: usize,
) -> Vec<EmbeddingRecord> {
    let location = backend.describe();
    let bytes = match backend.load() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            tracing::info!(backend = %location, "no persisted catalog, starting empty");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(backend = %location, error = %err, "catalog unreadable, starting empty");
            return Vec::new();
        }
    };
    match snapshot::decode(&bytes, dim, compression) {
        Ok(records) => {
            tracing::info!(backend = %location, count = records.len(), dim, "catalog loaded");
            records
        }
        Err(err) => {
            tracing::warn!(backend = %location, error = %err, "discarding persisted catalog");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendConfig, InMemoryBackend};
    use detect::Orientation;
    use std::sync::Arc;

    fn unit(v: &[f32]) -> Vec<f32> {
        let n: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / n).collect()
    }

    fn store(dim: usize) -> EmbeddingStore {
        EmbeddingStore::open(&StoreConfig::default(), dim).expect("open")
    }

    #[test]
    fn same_key_overwrites_in_place() {
        let s = store(2);
        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0]).with_photo_id("p"))
            .unwrap();
        s.upsert(
            EmbeddingRecord::new("a", "Alpha Prime", vec![0.0, 1.0])
                .with_photo_id("p")
                .with_orientation(Orientation::FaceLeft),
        )
        .unwrap();
        assert_eq!(s.count(), 1);
        let rec = &s.get_all()[0];
        assert_eq!(rec.display_name, "Alpha Prime");
        assert_eq!(rec.vector, vec![0.0, 1.0]);
        assert_eq!(rec.orientation, Orientation::FaceLeft);
    }

    #[test]
    fn new_photo_id_appends() {
        let s = store(2);
        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0])).unwrap();
        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0]).with_photo_id("p2"))
            .unwrap();
        assert_eq!(s.count(), 2);
    }

    #[test]
    fn empty_photo_id_is_a_distinct_key() {
        let s = store(2);
        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0])).unwrap();
        s.upsert(EmbeddingRecord::new("a", "Renamed", vec![0.0, 1.0])).unwrap();
        assert_eq!(s.count(), 1);
        assert_eq!(s.get_all()[0].display_name, "Renamed");
    }

    #[test]
    fn wrong_width_is_rejected() {
        let s = store(3);
        let err = s
            .upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn non_unit_vector_is_rejected() {
        let s = store(2);
        let err = s
            .upsert(EmbeddingRecord::new("a", "Alpha", vec![3.0, 4.0]))
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidRecord(_)));
        assert!(err.is_client_error());
        assert_eq!(s.count(), 0);

        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![0.6, 0.8])).unwrap();
        s.upsert(EmbeddingRecord::new("b", "Blank", vec![0.0, 0.0])).unwrap();
        assert_eq!(s.count(), 2);
    }

    #[test]
    fn get_all_returns_detached_copies() {
        let s = store(2);
        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0])).unwrap();
        let mut snapshot = s.get_all();
        snapshot[0].display_name = "mutated".into();
        assert_eq!(s.get_all()[0].display_name, "Alpha");
    }

    struct FailingBackend;

    impl StoreBackend for FailingBackend {
        fn load(&self) -> Result<Option<Vec<u8>>, IndexError> {
            Ok(None)
        }
        fn save(&self, _bytes: &[u8]) -> Result<(), IndexError> {
            Err(IndexError::backend("disk full"))
        }
        fn describe(&self) -> String {
            "failing".into()
        }
    }

    #[test]
    fn failed_save_rolls_back() {
        let s = EmbeddingStore::with_backend(Box::new(FailingBackend), CompressionConfig::default(), 2)
            .unwrap();
        assert!(s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0])).is_err());
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn unreadable_snapshot_starts_empty() {
        let backend = InMemoryBackend::new();
        backend.save(b"garbage").unwrap();
        let s = EmbeddingStore::with_backend(Box::new(backend), CompressionConfig::default(), 2)
            .unwrap();
        assert_eq!(s.count(), 0);
        // The store remains writable after discarding.
        s.upsert(EmbeddingRecord::new("a", "Alpha", vec![1.0, 0.0])).unwrap();
        assert_eq!(s.count(), 1);
    }

    #[test]
    fn concurrent_upserts_are_not_lost() {
        let s = Arc::new(
            EmbeddingStore::open(&StoreConfig::new().with_backend(BackendConfig::InMemory), 4)
                .unwrap(),
        );
        let threads = 8;
        let per_thread = 25;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let v = unit(&[t as f32, i as f32, 1.0, 0.0]);
                        s.upsert(
                            EmbeddingRecord::new(format!("ind-{t}"), "x", v)
                                .with_photo_id(format!("photo-{i}")),
                        )
                        .expect("upsert");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(s.count(), threads * per_thread);
        for rec in s.get_all() {
            let t: f32 = rec.individual_id.trim_start_matches("ind-").parse().unwrap();
            let i: f32 = rec.photo_id.trim_start_matches("photo-").parse().unwrap();
            assert_eq!(rec.vector, unit(&[t, i, 1.0, 0.0]));
        }
    }
}
