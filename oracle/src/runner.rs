//! The campaign runner: preflight, then sample → encode → mutate → judge
//! until a bug is found or the budget runs out.
//!
//! Bucket selection here is uniform: every `(field, aspect)` pair draws a
//! random bucket each step. An external bandit can replace this policy
//! without touching the oracle; the runner is the policy-free baseline.

use crate::differential::Oracle;
use crate::feedback::{BugKind, RuntimeSignature};
use crate::preflight::preflight;
use crate::sut::TargetCodec;
use crate::tracer;
use domains::{analyze, Domain, SelectionMatrix};
use rand::Rng;
use sampler::{concretize, mutate};
use slog::{info, warn, Logger};
use ssz::Type;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Limits for one campaign.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Wall-clock budget; checked before every step.
    pub budget: Duration,
    /// Upper bound on sampling steps.
    pub max_steps: usize,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(30),
            max_steps: 10_000,
        }
    }
}

/// Why a campaign stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BugFound,
    BudgetExceeded,
    StepsExhausted,
}

/// The outcome of a campaign.
#[derive(Debug, Clone)]
pub struct CampaignResult {
    pub found: bool,
    /// The step that triggered the first bug; zero when preflight did.
    pub bug_step: usize,
    pub steps: usize,
    pub elapsed: Duration,
    /// Fraction of all buckets exercised at least once.
    pub coverage: f64,
    pub bug_kinds: BTreeMap<BugKind, u64>,
    pub stopped: StopReason,
}

/// Runs a full campaign of `oracle` against `schema`.
pub fn run_campaign<T: TargetCodec, R: Rng>(
    oracle: &Oracle<T>,
    schema: &Type,
    config: &CampaignConfig,
    rng: &mut R,
    log: &Logger,
) -> CampaignResult {
    let start = Instant::now();
    let domains = analyze(schema);
    let total_buckets: usize = domains
        .iter()
        .flat_map(|d| d.aspects.iter())
        .map(|a| a.buckets.len())
        .sum();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut totals = RuntimeSignature::new();

    let (preflight_sig, preflight_bug) = preflight(oracle, schema);
    totals.merge(&preflight_sig);
    if preflight_bug {
        warn!(log, "Preflight found a bug"; "kinds" => ?preflight_sig.bug_kinds.keys().collect::<Vec<_>>());
        return result(true, 0, 0, start, &seen, total_buckets, totals, StopReason::BugFound);
    }

    for step in 1..=config.max_steps {
        if start.elapsed() > config.budget {
            info!(log, "Campaign budget exceeded"; "steps" => step - 1);
            return result(
                false,
                0,
                step - 1,
                start,
                &seen,
                total_buckets,
                totals,
                StopReason::BudgetExceeded,
            );
        }

        let matrix = random_selection(&domains, rng);
        for (field, aspect, bucket) in matrix.iter() {
            let cid = tracer::fnv1a(format!("{}/{:?}/{}", field, aspect, bucket).as_bytes());
            tracer::record(cid, step as i64);
            seen.insert(cid);
        }

        let (value, plan) = match concretize(schema, &domains, &matrix, rng) {
            Ok(sample) => sample,
            // Fatal for this iteration only.
            Err(err) => {
                warn!(log, "Sample skipped"; "error" => ?err);
                continue;
            }
        };
        let bytes = match ssz::encode(&value, schema) {
            Ok(bytes) => bytes,
            Err(_) => {
                totals.non_bug_error_count += 1;
                continue;
            }
        };
        let candidate = mutate(&bytes, &plan, schema, rng);

        let sig = oracle.execute_with_value(&candidate, schema, Some(&value));
        let bug = sig.has_bug();
        totals.merge(&sig);

        if bug {
            info!(log, "Campaign bug"; "step" => step,
                  "kinds" => ?sig.bug_kinds.keys().collect::<Vec<_>>());
            return result(
                true,
                step,
                step,
                start,
                &seen,
                total_buckets,
                totals,
                StopReason::BugFound,
            );
        }
    }

    result(
        false,
        0,
        config.max_steps,
        start,
        &seen,
        total_buckets,
        totals,
        StopReason::StepsExhausted,
    )
}

/// Draws one uniform random bucket for every aspect of every field.
pub fn random_selection<R: Rng>(domains: &[Domain], rng: &mut R) -> SelectionMatrix {
    let mut matrix = SelectionMatrix::new("random");
    for domain in domains {
        for aspect in &domain.aspects {
            if aspect.buckets.is_empty() {
                continue;
            }
            let bucket = &aspect.buckets[rng.gen_range(0..aspect.buckets.len())];
            matrix.select(domain.field_path.as_str(), aspect.aspect, bucket.id.as_str());
        }
    }
    matrix
}

#[allow(clippy::too_many_arguments)]
fn result(
    found: bool,
    bug_step: usize,
    steps: usize,
    start: Instant,
    seen: &HashSet<u64>,
    total_buckets: usize,
    totals: RuntimeSignature,
    stopped: StopReason,
) -> CampaignResult {
    CampaignResult {
        found,
        bug_step,
        steps,
        elapsed: start.elapsed(),
        coverage: if total_buckets == 0 {
            0.0
        } else {
            seen.len() as f64 / total_buckets as f64
        },
        bug_kinds: totals.bug_kinds,
        stopped,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sut::ReferenceCodec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use slog::o;
    use ssz::Field;

    fn oracle() -> Oracle<ReferenceCodec> {
        Oracle::new(ReferenceCodec, Logger::root(slog::Discard, o!()))
    }

    fn schema() -> std::sync::Arc<Type> {
        Type::container(
            "Small",
            vec![
                Field::new("slot", Type::uint64()),
                Field::new("data", Type::list(Type::uint8(), 16)),
            ],
        )
    }

    #[test]
    fn reference_campaign_finds_no_bug() {
        let schema = schema();
        let config = CampaignConfig {
            budget: Duration::from_secs(10),
            max_steps: 64,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let log = Logger::root(slog::Discard, o!());

        let outcome = run_campaign(&oracle(), &schema, &config, &mut rng, &log);
        assert!(!outcome.found);
        assert_eq!(outcome.stopped, StopReason::StepsExhausted);
        assert_eq!(outcome.steps, 64);
        assert!(outcome.coverage > 0.0);
        assert!(outcome.bug_kinds.is_empty());
    }

    #[test]
    fn zero_budget_exits_before_sampling() {
        let schema = schema();
        let config = CampaignConfig {
            budget: Duration::from_secs(0),
            max_steps: 1_000,
        };
        let mut rng = StdRng::seed_from_u64(12);
        let log = Logger::root(slog::Discard, o!());

        let outcome = run_campaign(&oracle(), &schema, &config, &mut rng, &log);
        assert!(!outcome.found);
        assert_eq!(outcome.stopped, StopReason::BudgetExceeded);
        assert_eq!(outcome.steps, 0);
    }

    #[test]
    fn random_selection_covers_every_aspect() {
        let schema = schema();
        let domains = analyze(&schema);
        let mut rng = StdRng::seed_from_u64(13);
        let matrix = random_selection(&domains, &mut rng);
        let picks: Vec<_> = matrix.iter().collect();
        let aspects: usize = domains.iter().map(|d| d.aspects.len()).sum();
        assert_eq!(picks.len(), aspects);
    }
}
