//! Statistics Tests.
//!
//! Verifies histogram bucketing and section-selective report output.

use wpred_core::stats::{BridgeStats, Distribution, PredictorStats, Report};

// ══════════════════════════════════════════════════════════
// 1. Distribution
// ══════════════════════════════════════════════════════════

#[test]
fn distribution_buckets_samples() {
    let mut d = Distribution::new(0, 100, 10);
    d.sample(0);
    d.sample(9);
    d.sample(10);
    d.sample(100);
    assert_eq!(d.samples(), 4);
    assert_eq!(d.bucket_count(5), Some(2));
    assert_eq!(d.bucket_count(15), Some(1));
    assert_eq!(d.bucket_count(100), Some(1));
    assert_eq!(d.buckets().len(), 11);
}

#[test]
fn distribution_tracks_out_of_range() {
    let mut d = Distribution::new(10, 20, 1);
    d.sample(5);
    d.sample(25);
    d.sample(15);
    assert_eq!(d.underflows(), 1);
    assert_eq!(d.overflows(), 1);
    assert_eq!(d.extremes(), Some((5, 25)));
    assert!((d.mean() - 15.0).abs() < f64::EPSILON);
    assert_eq!(d.bucket_count(25), None);
}

#[test]
fn empty_distribution_has_zero_mean() {
    let d = Distribution::new(0, 8, 1);
    assert_eq!(d.samples(), 0);
    assert_eq!(d.mean(), 0.0);
    assert_eq!(d.extremes(), None);
}

// ══════════════════════════════════════════════════════════
// 2. Report output
// ══════════════════════════════════════════════════════════

fn sample_stats() -> (BridgeStats, PredictorStats) {
    let bridge = BridgeStats {
        requests_accepted: 3,
        requests_forwarded: 3,
        ..BridgeStats::default()
    };
    let mut pred = PredictorStats::new(8, 5);
    pred.total_writes = 4;
    pred.correctly_predicted = 1;
    pred.data_match.sample(8);
    pred.invalidated_predictions = 3;
    let _ = pred.address_matches_by_pc.insert(0x4000_1000, 2);
    (bridge, pred)
}

#[test]
fn full_report_contains_every_section() {
    let (bridge, pred) = sample_stats();
    let report = Report {
        bridge: &bridge,
        predictor: Some(&pred),
    };
    let mut out = Vec::new();
    report.write_sections(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("25.00%"));
    assert!(text.contains("BRIDGE"));
    assert!(text.contains("PREDICTOR"));
    assert!(text.contains("DISTRIBUTIONS"));
    assert!(text.contains("data_match_chunks"));
    assert!(text.contains("writeback_distance_micro"));
    assert!(text.contains("invalidated            3"));
    assert!(text.contains("0x0000000040001000   2"));
}

#[test]
fn selected_sections_only() {
    let (bridge, pred) = sample_stats();
    let report = Report {
        bridge: &bridge,
        predictor: Some(&pred),
    };
    let mut out = Vec::new();
    report
        .write_sections(&mut out, &["bridge".to_string()])
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("req.accepted"));
    assert!(!text.contains("PREDICTOR"));
    assert!(!text.contains("DISTRIBUTIONS"));
}

#[test]
fn disabled_predictor_omits_predictor_sections() {
    let bridge = BridgeStats::default();
    let report = Report {
        bridge: &bridge,
        predictor: None,
    };
    let mut out = Vec::new();
    report.write_sections(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("PREDICTOR"));
    assert!(!text.contains("pred.writes"));
}
