//! Integration tests for the verification pipeline
//!
//! These tests drive `Verifier` end to end: clustering, intersection,
//! classifier narrowing and packet validation, with fake seams where the
//! outside world would otherwise be needed.

use rendverify::classifier::client::{TamperClassifier, TamperVerdicts};
use rendverify::config::loader::{StageFlags, VerifierConfig};
use rendverify::config::presets::ProfileRegistry;
use rendverify::config::types::{ClassifierError, ErrorSeverity, Evidence, VerifyError};
use rendverify::packet::validator::{
    PacketFault, StreamValidator, TsPacketValidator, ValidationSummary, SYNC_BYTE,
    TS_PACKET_SIZE, VIDEO_PID,
};
use rendverify::utils::upstream::EvidenceBatch;
use rendverify::verdict::verdict::Stage;
use rendverify::Verifier;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::Path;

fn profile() -> rendverify::VideoProfile {
    ProfileRegistry::new().resolve("P360p30fps16x9").unwrap()
}

fn evidence(path: &str, features: Vec<f64>, positions: Vec<u64>) -> Evidence {
    let lengths = vec![TS_PACKET_SIZE as u64; positions.len()];
    Evidence::new("source.ts", path, positions, lengths, features, profile()).unwrap()
}

fn stages(feature: bool, position: bool, inference: bool, packet: bool) -> VerifierConfig {
    VerifierConfig {
        stages: StageFlags {
            feature_check: feature,
            position_check: position,
            inference_check: inference,
            packet_check: packet,
        },
        ..VerifierConfig::default()
    }
}

/// Returns fixed flags and records how many evidences it was asked about
struct FakeClassifier {
    flags: Vec<u8>,
    seen: Cell<Option<usize>>,
}

impl FakeClassifier {
    fn new(flags: &[u8]) -> Self {
        Self {
            flags: flags.to_vec(),
            seen: Cell::new(None),
        }
    }
}

impl TamperClassifier for FakeClassifier {
    fn infer(&self, evidences: &[Evidence]) -> Result<TamperVerdicts, ClassifierError> {
        self.seen.set(Some(evidences.len()));
        Ok(TamperVerdicts::from_flags(&self.flags))
    }
}

struct DownClassifier(u16);

impl TamperClassifier for DownClassifier {
    fn infer(&self, _evidences: &[Evidence]) -> Result<TamperVerdicts, ClassifierError> {
        Err(ClassifierError::VerifierStatus { status: self.0 })
    }
}

/// Fails the listed renditions and records every attempt
struct RecordingValidator {
    failing: Vec<String>,
    attempts: RefCell<Vec<String>>,
}

impl RecordingValidator {
    fn failing(paths: &[&str]) -> Self {
        Self {
            failing: paths.iter().map(|p| p.to_string()).collect(),
            attempts: RefCell::new(Vec::new()),
        }
    }
}

impl StreamValidator for RecordingValidator {
    fn validate(&self, evidence: &Evidence) -> Result<ValidationSummary, PacketFault> {
        self.attempts
            .borrow_mut()
            .push(evidence.rendition_path.clone());
        if self.failing.contains(&evidence.rendition_path) {
            Err(PacketFault::StartCount {
                segment: 0,
                starts: 0,
                last_pid: Some(VIDEO_PID),
            })
        } else {
            Ok(ValidationSummary::default())
        }
    }
}

fn ts_packet(pid: u16, pusi: bool, payload: &[u8]) -> Vec<u8> {
    let mut p = vec![0xFFu8; TS_PACKET_SIZE];
    p[0] = SYNC_BYTE;
    p[1] = (u8::from(pusi) << 6) | ((pid >> 8) as u8 & 0x1F);
    p[2] = (pid & 0xFF) as u8;
    p[3] = 0x10;
    p[4..4 + payload.len()].copy_from_slice(payload);
    p
}

/// Two one-packet segments, each starting a video PES
fn write_rendition(dir: &Path, name: &str, corrupt: bool) -> String {
    let start = [0x00, 0x00, 0x01, 0xE0, 0x00, 0x00];
    let mut bytes = ts_packet(VIDEO_PID, true, &start);
    bytes.extend(ts_packet(VIDEO_PID, true, &start));
    if corrupt {
        bytes[TS_PACKET_SIZE] = 0x00;
    }
    let path = dir.join(name);
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&bytes)
        .unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_feature_axis_alone_selects_first_agreeing_rendition() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![1.0, 0.001], vec![0]),
        evidence("r2.ts", vec![0.0, 1.0], vec![0]),
    ];
    let verifier = Verifier::new(stages(true, false, false, false)).unwrap();

    let report = verifier.verify(&evidences).unwrap();
    assert_eq!(report.stage(Stage::Feature).unwrap().candidates, vec![0, 1]);
    assert_eq!(report.candidates, vec![0, 1]);
    assert_eq!(report.winning_path(), "r0.ts");
}

#[test]
fn test_missing_feature_consensus_is_retryable() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![0.0, 1.0], vec![0]),
        evidence("r2.ts", vec![-1.0, 0.0], vec![0]),
    ];
    let verifier = Verifier::new(stages(true, true, false, false)).unwrap();

    let err = verifier.verify(&evidences).unwrap_err();
    assert!(matches!(err, VerifyError::FeatureConsensusNotFound));
    assert_eq!(err.severity(), ErrorSeverity::Retryable);
}

#[test]
fn test_missing_position_consensus() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0, 188]),
        evidence("r1.ts", vec![1.0, 0.0], vec![0, 376]),
        evidence("r2.ts", vec![1.0, 0.0], vec![0, 564]),
    ];
    let verifier = Verifier::new(stages(true, true, false, false)).unwrap();

    let err = verifier.verify(&evidences).unwrap_err();
    assert!(matches!(err, VerifyError::PositionConsensusNotFound));
}

#[test]
fn test_disjoint_axes_yield_no_winner_without_error() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![1.0, 0.0], vec![500]),
        evidence("r2.ts", vec![0.0, 1.0], vec![1000]),
        evidence("r3.ts", vec![0.0, 1.0], vec![1000]),
    ];
    // Packet stage enabled: an empty candidate set reaches it and passes through.
    let verifier = Verifier::with_components(
        stages(true, true, false, true),
        FakeClassifier::new(&[]),
        RecordingValidator::failing(&[]),
    )
    .unwrap();

    let report = verifier.verify(&evidences).unwrap();
    assert_eq!(report.stage(Stage::Feature).unwrap().candidates, vec![0, 1]);
    assert_eq!(report.stage(Stage::Position).unwrap().candidates, vec![2, 3]);
    assert!(report.candidates.is_empty());
    assert_eq!(report.winning_path(), "");
    assert!(!report.has_winner());
}

#[test]
fn test_classifier_narrows_candidates_in_order() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![1.0, 0.0], vec![0]),
        evidence("r2.ts", vec![1.0, 0.0], vec![0]),
    ];
    let verifier = Verifier::with_components(
        stages(true, true, true, false),
        FakeClassifier::new(&[1, 0, 0]),
        RecordingValidator::failing(&[]),
    )
    .unwrap();

    let report = verifier.verify(&evidences).unwrap();
    assert_eq!(report.stage(Stage::Intersect).unwrap().candidates, vec![0, 1, 2]);
    assert_eq!(report.candidates, vec![1, 2]);
    assert_eq!(report.winning_path(), "r1.ts");
    assert_eq!(report.verdicts.as_ref().unwrap().len(), 3);
}

#[test]
fn test_classifier_sees_every_evidence() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![1.0, 0.0], vec![0]),
        evidence("r2.ts", vec![0.0, 1.0], vec![0]),
        evidence("r3.ts", vec![-1.0, 0.0], vec![0]),
    ];
    let classifier = FakeClassifier::new(&[0, 0, 0, 0]);
    let verifier =
        Verifier::with_components(stages(true, false, true, false), &classifier, TsPacketValidator)
            .unwrap();

    let report = verifier.verify(&evidences).unwrap();
    assert_eq!(report.candidates, vec![0, 1]);
    assert_eq!(classifier.seen.get(), Some(4));
}

#[test]
fn test_classifier_failure_does_not_fall_back() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![1.0, 0.0], vec![0]),
    ];
    let validator = RecordingValidator::failing(&[]);
    let verifier = Verifier::with_components(
        stages(true, true, true, true),
        DownClassifier(503),
        &validator,
    )
    .unwrap();

    let err = verifier.verify(&evidences).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::Inference(ClassifierError::VerifierStatus { status: 503 })
    ));
    assert!(err.is_retryable());
    assert!(validator.attempts.borrow().is_empty());

    let rejected = Verifier::with_components(
        stages(true, true, true, true),
        DownClassifier(400),
        RecordingValidator::failing(&[]),
    )
    .unwrap()
    .verify(&evidences)
    .unwrap_err();
    assert_eq!(rejected.severity(), ErrorSeverity::Fatal);
}

#[test]
fn test_packet_check_stops_at_first_passing_candidate() {
    let evidences: Vec<Evidence> = (0..5)
        .map(|i| evidence(&format!("r{}.ts", i), vec![1.0, 0.0], vec![0]))
        .collect();
    let validator = RecordingValidator::failing(&["r2.ts"]);
    let verifier = Verifier::with_components(
        stages(true, true, true, true),
        FakeClassifier::new(&[1, 1, 0, 0, 0]),
        &validator,
    )
    .unwrap();

    let report = verifier.verify(&evidences).unwrap();
    assert_eq!(report.winning_path(), "r3.ts");
    assert_eq!(report.candidates, vec![3]);
    assert_eq!(
        *validator.attempts.borrow(),
        vec!["r2.ts".to_string(), "r3.ts".to_string()]
    );
}

#[test]
fn test_all_candidates_failing_packet_check() {
    let evidences = vec![
        evidence("r0.ts", vec![1.0, 0.0], vec![0]),
        evidence("r1.ts", vec![1.0, 0.0], vec![0]),
    ];
    let verifier = Verifier::with_components(
        stages(true, true, false, true),
        FakeClassifier::new(&[]),
        RecordingValidator::failing(&["r0.ts", "r1.ts"]),
    )
    .unwrap();

    let err = verifier.verify(&evidences).unwrap_err();
    assert!(matches!(err, VerifyError::PacketValidationFailed { candidates: 2 }));
    assert_eq!(err.severity(), ErrorSeverity::Fatal);
    assert_eq!(i32::from(&err), 65);
}

#[test]
fn test_real_transport_streams_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_rendition(dir.path(), "r0.ts", true);
    let good = write_rendition(dir.path(), "r1.ts", false);
    let missing = dir.path().join("gone.ts").to_string_lossy().to_string();

    let evidences = vec![
        evidence(&missing, vec![1.0, 0.0], vec![0, 188]),
        evidence(&bad, vec![1.0, 0.0], vec![0, 188]),
        evidence(&good, vec![1.0, 0.0], vec![0, 188]),
    ];
    let verifier = Verifier::new(stages(true, true, false, true)).unwrap();

    let report = verifier.verify(&evidences).unwrap();
    assert_eq!(report.winning_path(), good);
    assert_eq!(report.winner.as_ref().unwrap().index, 2);
}

#[test]
fn test_verification_is_deterministic() {
    let evidences = vec![
        evidence("r0.ts", vec![0.0, 1.0], vec![0, 188]),
        evidence("r1.ts", vec![1.0, 0.0], vec![0, 188]),
        evidence("r2.ts", vec![1.0, 0.0], vec![0, 188]),
        evidence("r3.ts", vec![1.0, 0.0], vec![0, 376]),
    ];
    let verifier = Verifier::new(stages(true, true, false, false)).unwrap();

    let first = verifier.verify(&evidences).unwrap();
    assert_eq!(first.winning_path(), "r1.ts");
    for _ in 0..20 {
        let again = verifier.verify(&evidences).unwrap();
        assert_eq!(again.winning_path(), first.winning_path());
        assert_eq!(again.candidates, first.candidates);
        assert_eq!(again.evidence_fingerprint, first.evidence_fingerprint);
    }
}

#[test]
fn test_upstream_batch_to_winner() {
    let dir = tempfile::tempdir().unwrap();
    write_rendition(dir.path(), "a.ts", true);
    write_rendition(dir.path(), "b.ts", false);

    let batch_path = dir.path().join("batch.json");
    std::fs::write(
        &batch_path,
        r#"{
            "source": "source.ts",
            "renditions": [
                {"path": "a.ts", "positions": "0,188.0", "lengths": "188,188",
                 "features": "0.3,0.4", "profile": "P720p30fps16x9"},
                {"path": "b.ts", "positions": "0,188.0", "lengths": "188,188",
                 "features": "0.3,0.4", "profile": "P720p30fps16x9"}
            ]
        }"#,
    )
    .unwrap();

    let evidences = EvidenceBatch::load(&batch_path)
        .unwrap()
        .into_evidence(&ProfileRegistry::new())
        .unwrap();
    let report = Verifier::new(VerifierConfig::default())
        .unwrap()
        .verify(&evidences)
        .unwrap();

    assert_eq!(
        report.winning_path(),
        dir.path().join("b.ts").to_string_lossy()
    );
}
