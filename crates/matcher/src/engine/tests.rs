use super::*;
use std::sync::RwLock;
use std::time::Duration;

use index::StoreConfig;

use crate::metrics::{set_match_metrics, MatchMetrics};

fn unit(v: &[f32]) -> Vec<f32> {
    let n: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / n).collect()
}

fn store_with(records: Vec<EmbeddingRecord>) -> Arc<EmbeddingStore> {
    let dim = records.first().map(|r| r.vector.len()).unwrap_or(3);
    let store = EmbeddingStore::open(&StoreConfig::default(), dim).expect("open store");
    for rec in records {
        store.upsert(rec).expect("upsert");
    }
    Arc::new(store)
}

fn matcher(records: Vec<EmbeddingRecord>) -> Matcher {
    Matcher::new(store_with(records), MatchConfig::default()).expect("matcher")
}

#[test]
fn empty_catalog_yields_no_candidates() {
    let m = matcher(Vec::new());
    let hits = m
        .find_candidates(&unit(&[1.0, 0.0, 0.0]), Orientation::Unspecified)
        .expect("query");
    assert!(hits.is_empty());
}

#[test]
fn identical_vector_ranks_first_with_unit_score() {
    let target = unit(&[0.2, 0.7, 0.1]);
    let m = matcher(vec![
        EmbeddingRecord::new("a", "Alpha", unit(&[1.0, 0.0, 0.0])),
        EmbeddingRecord::new("b", "Beta", target.clone()),
        EmbeddingRecord::new("c", "Gamma", unit(&[0.3, 0.6, 0.3])),
    ]);
    let hits = m
        .find_candidates_with_threshold(&target, 0.0, Orientation::Unspecified)
        .expect("query");
    assert_eq!(hits[0].individual_id, "b");
    assert!((hits[0].score - 1.0).abs() < 1e-4);
}

#[test]
fn results_are_capped_unique_and_sorted() {
    let mut records = Vec::new();
    for i in 0..12 {
        for p in 0..3 {
            let v = unit(&[1.0, i as f32 * 0.05 + p as f32 * 0.01, 0.1]);
            records.push(
                EmbeddingRecord::new(format!("ind-{i}"), format!("Shark {i}"), v)
                    .with_photo_id(format!("p{p}")),
            );
        }
    }
    let m = matcher(records);
    let hits = m
        .find_candidates_with_threshold(&unit(&[1.0, 0.0, 0.1]), 0.0, Orientation::Unspecified)
        .expect("query");
    assert!(hits.len() <= 5);
    assert_eq!(hits.len(), 5);
    let mut ids: Vec<_> = hits.iter().map(|h| h.individual_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), hits.len(), "duplicate individuals: {hits:?}");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn dedup_keeps_best_score_per_individual() {
    let query = unit(&[1.0, 0.0, 0.0]);
    let m = matcher(vec![
        EmbeddingRecord::new("a", "Alpha", unit(&[1.0, 1.0, 0.0])).with_photo_id("p1"),
        EmbeddingRecord::new("a", "Alpha", query.clone()).with_photo_id("p2"),
    ]);
    let hits = m
        .find_candidates_with_threshold(&query, 0.0, Orientation::Unspecified)
        .expect("query");
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 1.0).abs() < 1e-4);
}

#[test]
fn threshold_above_best_score_returns_nothing() {
    let m = matcher(vec![
        EmbeddingRecord::new("a", "Alpha", unit(&[1.0, 0.0, 0.0])),
        EmbeddingRecord::new("b", "Beta", unit(&[0.0, 1.0, 0.0])),
    ]);
    let hits = m
        .find_candidates_with_threshold(&unit(&[1.0, 1.0, 0.0]), 0.9, Orientation::Unspecified)
        .expect("query");
    assert!(hits.is_empty());
}

#[test]
fn threshold_is_inclusive() {
    let v = unit(&[1.0, 0.0, 0.0]);
    let m = matcher(vec![EmbeddingRecord::new("a", "Alpha", v.clone())]);
    let hits = m
        .find_candidates_with_threshold(&v, 1.0 - 1e-6, Orientation::Unspecified)
        .expect("query");
    assert_eq!(hits.len(), 1);
}

#[test]
fn orientation_filter_selects_matching_side() {
    // The right-facing record is the closer match, but must be filtered out.
    let query = unit(&[1.0, 0.2, 0.0]);
    let m = matcher(vec![
        EmbeddingRecord::new("left-shark", "Lefty", unit(&[1.0, 0.5, 0.0]))
            .with_orientation(Orientation::FaceLeft),
        EmbeddingRecord::new("right-shark", "Righty", query.clone())
            .with_orientation(Orientation::FaceRight),
    ]);
    let hits = m
        .find_candidates_with_threshold(&query, 0.0, Orientation::FaceLeft)
        .expect("query");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].individual_id, "left-shark");
}

#[test]
fn orientation_filter_falls_back_to_untagged_records() {
    let query = unit(&[0.0, 1.0, 0.0]);
    let m = matcher(vec![
        EmbeddingRecord::new("a", "Alpha", query.clone()),
        EmbeddingRecord::new("b", "Beta", unit(&[0.0, 1.0, 1.0])),
    ]);
    let hits = m
        .find_candidates_with_threshold(&query, 0.0, Orientation::FaceRight)
        .expect("query");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].individual_id, "a");
}

#[test]
fn orientation_filter_falls_back_to_whole_catalog() {
    let query = unit(&[0.0, 1.0, 0.0]);
    let m = matcher(vec![
        EmbeddingRecord::new("left", "Lefty", query.clone())
            .with_orientation(Orientation::FaceLeft),
        EmbeddingRecord::new("plain", "Plain", unit(&[0.0, 1.0, 1.0])),
    ]);
    // No record is tagged face_right, so tagged and untagged records both compete.
    let hits = m
        .find_candidates_with_threshold(&query, 0.0, Orientation::FaceRight)
        .expect("query");
    let ids: Vec<_> = hits.iter().map(|h| h.individual_id.as_str()).collect();
    assert_eq!(ids, vec!["left", "plain"]);
}

#[test]
fn scores_are_rounded_to_four_decimals() {
    let m = matcher(vec![EmbeddingRecord::new("a", "Alpha", unit(&[1.0, 2.0, 3.0]))]);
    let hits = m
        .find_candidates_with_threshold(&unit(&[3.0, 2.0, 1.0]), 0.0, Orientation::Unspecified)
        .expect("query");
    let s = hits[0].score as f64;
    assert!(((s * 1e4).round() - s * 1e4).abs() < 1e-2, "score={s}");
}

#[test]
fn oversampling_window_is_bounded() {
    // One individual owns the 20 nearest records; a distant second individual
    // falls outside the neighbour window and is not returned.
    let mut records: Vec<EmbeddingRecord> = (0..20)
        .map(|p| {
            EmbeddingRecord::new("crowd", "Crowd", unit(&[1.0, p as f32 * 0.001, 0.0]))
                .with_photo_id(format!("p{p}"))
        })
        .collect();
    records.push(EmbeddingRecord::new("far", "Far", unit(&[1.0, 0.5, 0.0])));
    let m = matcher(records);
    let hits = m
        .find_candidates_with_threshold(&unit(&[1.0, 0.0, 0.0]), 0.0, Orientation::Unspecified)
        .expect("query");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].individual_id, "crowd");
}

#[test]
fn query_width_must_match_catalog() {
    let m = matcher(vec![EmbeddingRecord::new("a", "Alpha", unit(&[1.0, 0.0, 0.0]))]);
    let err = m
        .find_candidates(&[1.0, 0.0], Orientation::Unspecified)
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn rank_records_matches_store_backed_path() {
    let records = vec![
        EmbeddingRecord::new("a", "Alpha", unit(&[1.0, 0.0, 0.0])),
        EmbeddingRecord::new("b", "Beta", unit(&[0.9, 0.1, 0.0])),
    ];
    let direct = rank_records(
        &unit(&[1.0, 0.0, 0.0]),
        &records,
        Orientation::Unspecified,
        &MatchConfig::default(),
    );
    let via_store = matcher(records)
        .find_candidates(&unit(&[1.0, 0.0, 0.0]), Orientation::Unspecified)
        .expect("query");
    assert_eq!(direct, via_store);
}

struct RecordingMetrics {
    events: RwLock<Vec<(usize, usize)>>,
}

impl MatchMetrics for RecordingMetrics {
    fn record_match(&self, _latency: Duration, catalog_size: usize, candidates: usize) {
        self.events
            .write()
            .unwrap()
            .push((catalog_size, candidates));
    }
}

#[test]
fn metrics_hook_observes_queries() {
    let metrics = Arc::new(RecordingMetrics {
        events: RwLock::new(Vec::new()),
    });
    set_match_metrics(Some(metrics.clone()));

    let v = unit(&[1.0, 0.0, 0.0]);
    let m = matcher(vec![
        EmbeddingRecord::new("a", "Alpha", v.clone()),
        EmbeddingRecord::new("b", "Beta", unit(&[0.0, 1.0, 0.0])),
    ]);
    m.find_candidates(&v, Orientation::Unspecified).expect("query");

    set_match_metrics(None);
    let events = metrics.events.read().unwrap().clone();
    assert!(events.contains(&(2, 1)), "events: {events:?}");
}
