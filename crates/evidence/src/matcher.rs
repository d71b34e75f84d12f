use crate::{EvidenceSource, Feature, MatchError};
use geomatch_decision::{
    decide, supports, CombinationError, CombinationRule, DecisionPolicy, Frame, FrameError,
    MassFunction, Support, Verdict, MASS_EPSILON,
};
use tracing::{debug, info, info_span, warn};
use validator::Validate;

/// The outcome of evaluating one reference feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// The id of the reference feature.
    pub reference: String,
    pub verdict: Verdict<String>,
    /// The aggregate conflict of the combination, 1.0 when the evidence was in total conflict.
    pub conflict: f64,
    /// Belief figures per hypothesis in frame order, empty when the evidence was in total conflict.
    pub supports: Vec<Support<String>>,
}

/// Evaluates reference features against their candidates with a fixed set of evidence sources.
///
/// A matcher is immutable once built and can be shared between threads.
#[derive(Debug)]
pub struct Matcher<G> {
    sources: Vec<Box<dyn EvidenceSource<G>>>,
    policy: DecisionPolicy,
    rule: CombinationRule,
}

impl<G> Matcher<G> {
    /// Builds a matcher, validating the decision policy.
    ///
    /// Returns [`MatchError::NoSources`] if `sources` is empty.
    pub fn new(
        sources: Vec<Box<dyn EvidenceSource<G>>>,
        policy: DecisionPolicy,
        rule: CombinationRule,
    ) -> Result<Self, MatchError> {
        policy.validate()?;
        if sources.is_empty() {
            return Err(MatchError::NoSources);
        }
        Ok(Self {
            sources,
            policy,
            rule,
        })
    }

    pub fn sources(&self) -> &[Box<dyn EvidenceSource<G>>] {
        &self.sources
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn rule(&self) -> CombinationRule {
        self.rule
    }

    /// Builds one mass function per source from the weighted focal sets it produces for every candidate.
    ///
    /// A kernel summing to more than one is rescaled before the source's weight discounts it. A source that
    /// applies to none of the candidates contributes no kernel.
    fn kernels(
        &self,
        reference: &Feature<G>,
        candidates: &[Feature<G>],
        width: usize,
    ) -> Result<Vec<MassFunction>, FrameError> {
        let mut kernels = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let entries = source.evaluate(reference, candidates)?;
            if entries.is_empty() {
                debug!(message = "source not applicable", source = source.name());
                continue;
            }
            let mut kernel = MassFunction::from_entries(width, entries);
            if kernel.total() > 1.0 + MASS_EPSILON {
                debug!(
                    message = "rescaling kernel",
                    source = source.name(),
                    total = kernel.total(),
                );
                kernel = kernel.scale();
            }
            kernels.push(kernel.discount(source.weight()));
        }
        Ok(kernels)
    }

    /// Evaluates a reference feature against its candidates.
    ///
    /// The candidates, in the given order, followed by the no-match hypothesis form the frame of discernment.
    /// Each source's evidence for all candidates forms one kernel. The kernels of every source are combined with the
    /// matcher's [`CombinationRule`] and the result goes through [`decide`].
    ///
    /// Returns [`MatchError::InvalidInput`] if there are no candidates, too many of them or a repeated candidate id. Evidence in total
    /// conflict is not an error: it produces an [`Verdict::Ambiguous`] report with a conflict of 1.0.
    pub fn evaluate(
        &self,
        reference: &Feature<G>,
        candidates: &[Feature<G>],
    ) -> Result<Report, MatchError> {
        let span = info_span!("evaluate feature", reference = %reference.id);
        let _entered = span.enter();

        let frame = Frame::new(candidates.iter().map(|c| c.id.clone()))?;
        let mut kernels = self.kernels(reference, candidates, frame.len())?;
        if kernels.is_empty() {
            debug!(message = "no evidence for any candidate");
            kernels.push(MassFunction::vacuous(frame.len()));
        }

        let combination = match self.rule.combine(&kernels) {
            Ok(combination) => combination,
            Err(CombinationError::TotalConflict) => {
                warn!(
                    message = "total conflict between evidence sources",
                    kernels = kernels.len(),
                );
                return Ok(Report {
                    reference: reference.id.clone(),
                    verdict: Verdict::Ambiguous,
                    conflict: 1.0,
                    supports: vec![],
                });
            }
            Err(e) => return Err(e.into()),
        };

        let verdict = decide(
            &combination.mass,
            &frame,
            combination.conflict,
            &self.policy,
        )?;
        info!(
            message = "feature verdict",
            reference = %reference.id,
            verdict = verdict.kind(),
            candidate = verdict.candidate().map(String::as_str),
            conflict = combination.conflict,
            candidates = candidates.len(),
        );
        Ok(Report {
            reference: reference.id.clone(),
            verdict,
            conflict: combination.conflict,
            supports: supports(&combination.mass, &frame),
        })
    }
}
