//! Chunk Matcher Tests.
//!
//! Verifies full, partial, and empty matches, geometry handling, and
//! rejection of payloads that are not line-sized.

use rstest::rstest;
use wpred_core::common::{PhysAddr, PredictorError};
use wpred_core::predictor::chunk::{ChunkMatchVec, ChunkMatcher};
use wpred_core::predictor::store::CompletedWriteEntry;

use crate::common::builder::{line, line_with_chunk};

fn candidate(data: &[u8]) -> CompletedWriteEntry {
    CompletedWriteEntry::new(PhysAddr(0x1000), data, 0x400, 0)
}

// ══════════════════════════════════════════════════════════
// 1. Match vectors
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(8)]
#[case(16)]
#[case(32)]
#[case(64)]
fn identical_payload_matches_every_chunk(#[case] chunk_bytes: usize) {
    let matcher = ChunkMatcher::new(64, chunk_bytes);
    let data = line(0x5A);
    let vec = matcher.compare_to_candidate(&data, &candidate(&data)).unwrap();
    assert!(vec.is_full());
    assert_eq!(vec.count() as usize, 64 / chunk_bytes);
    assert_eq!(vec.width(), matcher.chunk_count());
}

#[test]
fn one_differing_chunk_is_partial() {
    let matcher = ChunkMatcher::new(64, 8);
    let vec = matcher
        .compare_to_candidate(&line_with_chunk(1, 3, 9), &candidate(&line(1)))
        .unwrap();
    assert!(vec.is_partial());
    assert!(!vec.is_full());
    assert_eq!(vec.count(), 7);
    assert!(!vec.is_set(3));
    assert!(vec.is_set(2));
    assert_eq!(vec.bits(), 0b1111_0111);
}

#[test]
fn disjoint_payloads_match_nothing() {
    let matcher = ChunkMatcher::new(64, 8);
    let vec = matcher
        .compare_to_candidate(&line(1), &candidate(&line(2)))
        .unwrap();
    assert_eq!(vec, ChunkMatchVec::empty(8));
    assert!(!vec.is_partial());
}

#[test]
fn single_byte_difference_breaks_its_chunk() {
    let matcher = ChunkMatcher::new(64, 8);
    let mut data = line(0);
    data[63] = 1;
    let vec = matcher.compare(&data, &line(0)).unwrap();
    assert_eq!(vec.count(), 7);
    assert!(!vec.is_set(7));
}

#[test]
fn learned_constant_comparison() {
    let matcher = ChunkMatcher::new(64, 8);
    let entry = candidate(&line(0));
    assert!(matcher.compare_to_constant(&entry, &line(0)).unwrap().is_full());
    assert_eq!(
        matcher
            .compare_to_constant(&entry, &line_with_chunk(0, 0, 1))
            .unwrap()
            .count(),
        7
    );
}

// ══════════════════════════════════════════════════════════
// 2. Length checks
// ══════════════════════════════════════════════════════════

#[test]
fn short_incoming_payload_is_rejected() {
    let matcher = ChunkMatcher::new(64, 8);
    let err = matcher
        .compare_to_candidate(&[0; 32], &candidate(&line(0)))
        .unwrap_err();
    assert_eq!(
        err,
        PredictorError::PayloadLengthMismatch {
            expected: 64,
            found: 32
        }
    );
}

#[test]
fn short_constant_is_rejected() {
    let matcher = ChunkMatcher::new(64, 8);
    assert!(matcher.compare_to_constant(&candidate(&line(0)), &[0; 8]).is_err());
}
