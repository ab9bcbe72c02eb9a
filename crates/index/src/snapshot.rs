//! On-disk layout of the catalog.
//!
//! A snapshot carries the metadata rows and a row-major `(len, dim)` vector
//! matrix. It is bincode-encoded (serde mode) and then compressed.

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

use crate::record::RecordMeta;
use crate::{CompressionConfig, EmbeddingRecord, IndexError};

/// Bump this value whenever the persisted snapshot layout changes.
pub const SNAPSHOT_SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    schema_version: u16,
    dim: u32,
    records: Vec<RecordMeta>,
    vectors: Vec<f32>,
}

pub(crate) fn encode(
    records: &[EmbeddingRecord],
    dim: usize,
    compression: &CompressionConfig,
) -> Result<Vec<u8>, IndexError> {
    let mut vectors = Vec::with_capacity(records.len() * dim);
    for rec in records {
        vectors.extend_from_slice(&rec.vector);
    }
    let snapshot = Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        dim: dim as u32,
        records: records.iter().map(RecordMeta::from).collect(),
        vectors,
    };
    let encoded = encode_to_vec(&snapshot, standard())?;
    compression.compress(&encoded)
}

/// Decode and validate a snapshot for an embedder of width `dim`.
///
/// Any inconsistency rejects the whole snapshot; nothing is partially
/// recovered.
pub(crate) fn decode(
    bytes: &[u8],
    dim: usize,
    compression: &CompressionConfig,
) -> Result<Vec<EmbeddingRecord>, IndexError> {
    let raw = compression.decompress(bytes)?;
    let (snapshot, _): (Snapshot, usize) = decode_from_slice(&raw, standard())?;
    if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(IndexError::Corrupt(format!(
            "unsupported schema version {}",
            snapshot.schema_version
        )));
    }
    if snapshot.dim as usize != dim {
        return Err(IndexError::DimensionMismatch {
            expected: dim,
            actual: snapshot.dim as usize,
        });
    }
    if snapshot.records.len() * dim != snapshot.vectors.len() {
        return Err(IndexError::Corrupt(format!(
            "{} metadata rows but {} vector components",
            snapshot.records.len(),
            snapshot.vectors.len()
        )));
    }
    let records = snapshot
        .records
        .into_iter()
        .zip(snapshot.vectors.chunks_exact(dim.max(1)))
        .map(|(meta, row)| meta.into_record(row.to_vec()))
        .collect();
    Ok(records)
}
