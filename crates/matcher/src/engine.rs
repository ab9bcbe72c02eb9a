use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use detect::Orientation;
use index::{EmbeddingRecord, EmbeddingStore};

use crate::metrics::metrics_recorder;
use crate::types::{Candidate, MatchConfig, MatchError};

#[cfg(test)]
mod tests;

/// Ranks catalogued individuals by cosine similarity to a query embedding.
pub struct Matcher {
    store: Arc<EmbeddingStore>,
    cfg: MatchConfig,
}

impl Matcher {
    pub fn new(store: Arc<EmbeddingStore>, cfg: MatchConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { store, cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    /// Rank the catalog against `query` with the configured threshold.
    pub fn find_candidates(
        &self,
        query: &[f32],
        orientation: Orientation,
    ) -> Result<Vec<Candidate>, MatchError> {
        self.find_candidates_with_threshold(query, self.cfg.threshold, orientation)
    }

    /// Rank the catalog against `query`, discarding scores below `threshold`.
    pub fn find_candidates_with_threshold(
        &self,
        query: &[f32],
        threshold: f32,
        orientation: Orientation,
    ) -> Result<Vec<Candidate>, MatchError> {
        let expected = self.store.dimension();
        if query.len() != expected {
            return Err(MatchError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        let start = Instant::now();
        let records = self.store.get_all();
        let cfg = MatchConfig {
            threshold,
            ..self.cfg.clone()
        };
        let candidates = rank_records(query, &records, orientation, &cfg);

        if let Some(recorder) = metrics_recorder() {
            recorder.record_match(start.elapsed(), records.len(), candidates.len());
        }
        tracing::debug!(
            catalog = records.len(),
            candidates = candidates.len(),
            threshold,
            orientation = %orientation,
            "classified query"
        );
        Ok(candidates)
    }
}

/// Pure ranking over a catalog snapshot.
///
/// 1. Keep records with the query's orientation, unless none match.
/// 2. Score every record by dot product (cosine similarity for unit vectors).
/// 3. Take the `max_results * oversample_factor` best neighbours.
/// 4. Keep the best score per individual, drop scores below the threshold.
/// 5. Sort descending and truncate to `max_results`.
pub fn rank_records(
    query: &[f32],
    records: &[EmbeddingRecord],
    orientation: Orientation,
    cfg: &MatchConfig,
) -> Vec<Candidate> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut pool: Vec<&EmbeddingRecord> = if orientation.is_specified() {
        records
            .iter()
            .filter(|r| r.orientation == orientation)
            .collect()
    } else {
        Vec::new()
    };
    if pool.is_empty() {
        pool = records.iter().collect();
    }

    let mut scored: Vec<(&EmbeddingRecord, f32)> = pool
        .into_iter()
        .filter(|r| r.vector.len() == query.len())
        .map(|r| (r, dot(query, &r.vector)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(cfg.neighbour_budget(scored.len()));

    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut best: Vec<Candidate> = Vec::new();
    for (rec, score) in scored {
        match slots.get(rec.individual_id.as_str()) {
            Some(&slot) => {
                if score > best[slot].score {
                    best[slot].score = score;
                    best[slot].display_name = rec.display_name.clone();
                }
            }
            None => {
                slots.insert(rec.individual_id.as_str(), best.len());
                best.push(Candidate {
                    individual_id: rec.individual_id.clone(),
                    display_name: rec.display_name.clone(),
                    score,
                });
            }
        }
    }

    let mut candidates: Vec<Candidate> = best
        .into_iter()
        .filter(|c| c.score >= cfg.threshold)
        .collect();
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.truncate(cfg.max_results);
    for c in &mut candidates {
        c.score = round_to(c.score, cfg.score_decimals);
    }
    candidates
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn round_to(value: f32, decimals: u32) -> f32 {
    let scale = 10f64.powi(decimals as i32);
    ((value as f64 * scale).round() / scale) as f32
}
