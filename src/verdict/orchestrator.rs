/// Verification pipeline
///
/// Stages run in a fixed order, each gated by its flag in `StageFlags`:
/// feature axis, position axis, intersection, tamper classifier, packet
/// validation, winner selection. A failing stage ends the round with its
/// classified error; nothing falls back to an earlier candidate set.
use crate::classifier::client::{HttpTamperClassifier, TamperClassifier};
use crate::config::loader::{AxisParams, VerifierConfig};
use crate::config::types::{Evidence, Result, VerifyError};
use crate::config::validator::{validate_config, validate_evidence};
use crate::consensus::{cluster, intersect, ClusterParams, IndexedPoint};
use crate::observability::audit::{self, CorrelationIds};
use crate::observability::metrics::get_metrics;
use crate::packet::validator::{StreamValidator, TsPacketValidator};
use crate::verdict::verdict::{
    evidence_fingerprint, select_winner, Stage, StageTrace, VerifyReport,
};
use std::time::Instant;

impl From<&AxisParams> for ClusterParams {
    fn from(axis: &AxisParams) -> Self {
        ClusterParams {
            min_points: axis.min_points,
            epsilon: axis.epsilon,
            metric: axis.metric,
        }
    }
}

/// Runs verification rounds with a fixed configuration.
///
/// The classifier and stream validator are seams; production code uses the
/// HTTP classifier and the on-disk transport stream validator.
pub struct Verifier<C = HttpTamperClassifier, V = TsPacketValidator> {
    config: VerifierConfig,
    classifier: C,
    validator: V,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Result<Self> {
        let classifier = HttpTamperClassifier::new(&config.classifier).map_err(|e| {
            VerifyError::Config(format!("cannot build classifier client: {}", e))
        })?;
        Self::with_components(config, classifier, TsPacketValidator)
    }
}

impl<C: TamperClassifier, V: StreamValidator> Verifier<C, V> {
    pub fn with_components(config: VerifierConfig, classifier: C, validator: V) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self {
            config,
            classifier,
            validator,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Run one verification round over `evidences`
    pub fn verify(&self, evidences: &[Evidence]) -> Result<VerifyReport> {
        let started = Instant::now();
        let source = evidences
            .first()
            .map(|e| e.source_path.as_str())
            .unwrap_or("");
        let mut correlation = CorrelationIds::new(source);
        let metrics = get_metrics();

        match self.run(evidences, &mut correlation) {
            Ok(report) => {
                metrics.record_outcome(report.has_winner(), started.elapsed());
                match &report.winner {
                    Some(winner) => {
                        log::info!("winner: evidence {} ({})", winner.index, winner.rendition_path);
                        audit::winner_selected(&correlation, winner.index, &winner.rendition_path);
                    }
                    None => {
                        log::info!("no rendition survived verification");
                        audit::no_winner(&correlation);
                    }
                }
                Ok(report)
            }
            Err(err) => {
                metrics.record_error(&err, started.elapsed());
                log::warn!("verification failed ({}): {}", err.severity(), err);
                audit::verification_failed(&correlation, &err);
                Err(err)
            }
        }
    }

    /// Stages of one round. `correlation` picks up the evidence fingerprint
    /// so the caller's closing audit event carries it too.
    fn run(
        &self,
        evidences: &[Evidence],
        correlation: &mut CorrelationIds,
    ) -> Result<VerifyReport> {
        validate_evidence(evidences)?;
        let fingerprint = evidence_fingerprint(evidences)?;
        correlation.evidence_fingerprint = Some(fingerprint.clone());
        let correlation: &CorrelationIds = correlation;
        audit::verification_start(correlation, evidences.len());

        let stages = &self.config.stages;
        let mut trace = Vec::new();
        let mut groups: Vec<Vec<IndexedPoint>> = Vec::new();

        if stages.feature_check {
            let points = evidences
                .iter()
                .enumerate()
                .map(|(i, e)| IndexedPoint::for_evidence(i, e.features.clone()))
                .collect::<Vec<_>>();
            let group = self
                .canonical_group(&self.config.feature_axis, &points, Stage::Feature, correlation)
                .ok_or(VerifyError::FeatureConsensusNotFound)?;
            trace.push(group_trace(Stage::Feature, &group));
            groups.push(group);
        }

        if stages.position_check {
            let points = evidences
                .iter()
                .enumerate()
                .map(|(i, e)| IndexedPoint::for_evidence(i, e.position_vector()))
                .collect::<Vec<_>>();
            let group = self
                .canonical_group(&self.config.position_axis, &points, Stage::Position, correlation)
                .ok_or(VerifyError::PositionConsensusNotFound)?;
            trace.push(group_trace(Stage::Position, &group));
            groups.push(group);
        }

        let group_refs: Vec<&[IndexedPoint]> = groups.iter().map(Vec::as_slice).collect();
        let mut candidates = intersect(evidences.len(), &group_refs);
        log::debug!("candidates after intersection: {:?}", candidates);
        trace.push(StageTrace {
            stage: Stage::Intersect,
            candidates: candidates.clone(),
        });

        let mut verdicts = None;
        if stages.inference_check {
            let call_started = Instant::now();
            match self.classifier.infer(evidences) {
                Ok(result) => {
                    let tampered = result.verdicts.iter().filter(|v| v.is_tampered()).count();
                    get_metrics().record_classifier_call(true, tampered, call_started.elapsed());
                    audit::inference_success(correlation, tampered, result.len());

                    candidates = result.retain_untampered(&candidates);
                    log::debug!("candidates after inference: {:?}", candidates);
                    trace.push(StageTrace {
                        stage: Stage::Inference,
                        candidates: candidates.clone(),
                    });
                    verdicts = Some(result);
                }
                Err(err) => {
                    get_metrics().record_classifier_call(false, 0, call_started.elapsed());
                    audit::inference_failure(correlation, &err.to_string());
                    return Err(VerifyError::Inference(err));
                }
            }
        }

        if stages.packet_check {
            candidates = self.first_valid_candidate(evidences, &candidates, correlation)?;
            trace.push(StageTrace {
                stage: Stage::Packet,
                candidates: candidates.clone(),
            });
        }

        Ok(VerifyReport {
            round_id: correlation.round_id.clone(),
            winner: select_winner(&candidates, evidences),
            candidates,
            trace,
            verdicts,
            evidence_fingerprint: fingerprint,
        })
    }

    /// First cluster of one axis, or `None` when the axis found none
    fn canonical_group(
        &self,
        axis: &AxisParams,
        points: &[IndexedPoint],
        stage: Stage,
        correlation: &CorrelationIds,
    ) -> Option<Vec<IndexedPoint>> {
        let group = cluster(&ClusterParams::from(axis), points)
            .into_iter()
            .next()
            .filter(|group| !group.is_empty());

        match &group {
            Some(members) => {
                let ids: Vec<usize> = members.iter().map(IndexedPoint::evidence_index).collect();
                log::debug!("{} consensus: {:?}", stage.as_str(), ids);
                audit::consensus_found(correlation, stage.as_str(), &ids);
            }
            None => audit::consensus_missing(correlation, stage.as_str()),
        }
        group
    }

    /// Validate candidates in ascending order and keep the first that
    /// passes. Later candidates are not opened.
    fn first_valid_candidate(
        &self,
        evidences: &[Evidence],
        candidates: &[usize],
        correlation: &CorrelationIds,
    ) -> Result<Vec<usize>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut ordered = candidates.to_vec();
        ordered.sort_unstable();

        for &id in &ordered {
            let Some(evidence) = evidences.get(id) else {
                continue;
            };
            match self.validator.validate(evidence) {
                Ok(summary) => {
                    get_metrics().record_packet_check(true);
                    log::debug!(
                        "evidence {} passed packet validation ({} packets)",
                        id,
                        summary.packets_scanned
                    );
                    audit::candidate_accepted(correlation, id, &evidence.rendition_path);
                    return Ok(vec![id]);
                }
                Err(fault) => {
                    get_metrics().record_packet_check(false);
                    log::warn!("evidence {} rejected: {}", id, fault);
                    audit::candidate_rejected(correlation, id, &fault.to_string());
                }
            }
        }

        Err(VerifyError::PacketValidationFailed {
            candidates: ordered.len(),
        })
    }
}

fn group_trace(stage: Stage, group: &[IndexedPoint]) -> StageTrace {
    let mut candidates: Vec<usize> = group.iter().map(IndexedPoint::evidence_index).collect();
    candidates.sort_unstable();
    StageTrace { stage, candidates }
}
