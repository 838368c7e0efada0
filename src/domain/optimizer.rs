//! Seeded random search over indicator parameters.
//!
//! Candidates are drawn sequentially from the caller's generator, so a fixed
//! seed and sample count always yields the same candidate list. They are then
//! backtested in parallel on a rayon pool and reduced in candidate order: a
//! candidate replaces the best only with a strictly greater objective, so ties
//! keep the earlier one and `NaN` never wins.

use log::{info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::domain::backtest::{BacktestConfig, run_backtest};
use crate::domain::error::AlgoedgeError;
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::ohlcv::{PriceBar, validate_bars};
use crate::domain::strategy::{ParamCandidate, StrategyDocument};

pub const DEFAULT_SAMPLES: usize = 25;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_OBJECTIVE: &str = "roi_pct";

/// Indicator-block id → how to sample its parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSpace(pub BTreeMap<String, IndicatorSpace>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorSpace {
    /// Complete override maps, one picked uniformly.
    Choices(Vec<BTreeMap<String, Value>>),
    /// Each parameter sampled on its own.
    Params(BTreeMap<String, ParamSpec>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Range(RangeSpec),
    Choices(Vec<Value>),
}

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    #[serde(default, rename = "type")]
    pub kind: RangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Int,
    #[default]
    Float,
}

impl ParamSpace {
    pub fn from_json(json: &str) -> Result<Self, AlgoedgeError> {
        let space: ParamSpace =
            serde_json::from_str(json).map_err(|e| AlgoedgeError::ParamSpace {
                reason: e.to_string(),
            })?;
        space.validate()?;
        Ok(space)
    }

    pub fn validate(&self) -> Result<(), AlgoedgeError> {
        for (id, space) in &self.0 {
            match space {
                IndicatorSpace::Choices(choices) if choices.is_empty() => {
                    return Err(space_error(format!("{id}: empty choice list")));
                }
                IndicatorSpace::Choices(_) => {}
                IndicatorSpace::Params(params) => {
                    for (name, spec) in params {
                        validate_spec(spec)
                            .map_err(|reason| space_error(format!("{id}.{name}: {reason}")))?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn space_error(reason: String) -> AlgoedgeError {
    AlgoedgeError::ParamSpace { reason }
}

fn validate_spec(spec: &ParamSpec) -> Result<(), String> {
    match spec {
        ParamSpec::Choices(values) if values.is_empty() => Err("empty choice list".to_string()),
        ParamSpec::Choices(_) => Ok(()),
        ParamSpec::Range(range) => {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err("range bounds must be finite".to_string());
            }
            if range.min > range.max {
                return Err(format!("min {} is greater than max {}", range.min, range.max));
            }
            if range.kind == RangeKind::Int && range.min.ceil() > range.max.floor() {
                return Err(format!(
                    "no integer between {} and {}",
                    range.min, range.max
                ));
            }
            Ok(())
        }
    }
}

fn sample_spec(spec: &ParamSpec, rng: &mut impl Rng) -> Value {
    match spec {
        ParamSpec::Choices(values) => values.choose(rng).cloned().unwrap_or(Value::Null),
        ParamSpec::Range(range) => match range.kind {
            RangeKind::Int => {
                let low = range.min.ceil() as i64;
                let high = range.max.floor() as i64;
                Value::from(rng.gen_range(low..=high))
            }
            RangeKind::Float => Value::from(rng.gen_range(range.min..=range.max)),
        },
    }
}

/// Draw `count` candidates from `space`, in order, from `rng`.
pub fn generate_candidates(
    space: &ParamSpace,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<ParamCandidate>, AlgoedgeError> {
    space.validate()?;

    let mut candidates = Vec::with_capacity(count);
    for _ in 0..count {
        let mut candidate = ParamCandidate::new();
        for (id, indicator_space) in &space.0 {
            let overrides = match indicator_space {
                IndicatorSpace::Choices(choices) => {
                    choices.choose(rng).cloned().unwrap_or_default()
                }
                IndicatorSpace::Params(params) => params
                    .iter()
                    .map(|(name, spec)| (name.clone(), sample_spec(spec, rng)))
                    .collect(),
            };
            candidate.insert(id.clone(), overrides);
        }
        candidates.push(candidate);
    }
    Ok(candidates)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub objective: String,
    pub best_strategy: StrategyDocument,
    pub best_candidate: Option<ParamCandidate>,
    pub best_metrics: Option<MetricsSnapshot>,
    pub evaluated: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Result of one candidate run.
#[derive(Debug, Clone)]
enum CandidateRun {
    Skipped,
    Failed,
    Scored {
        trial: StrategyDocument,
        metrics: MetricsSnapshot,
        score: f64,
    },
}

pub struct Optimizer<'a> {
    bars: &'a [PriceBar],
    config: BacktestConfig,
    workers: usize,
    cancel: Option<&'a AtomicBool>,
    deadline: Option<Instant>,
}

impl<'a> Optimizer<'a> {
    pub fn new(bars: &'a [PriceBar], config: BacktestConfig) -> Self {
        Self {
            bars,
            config,
            workers: 0,
            cancel: None,
            deadline: None,
        }
    }

    /// Worker pool size; 0 lets rayon pick.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn search(
        &self,
        strategy: &StrategyDocument,
        space: &ParamSpace,
        objective: &str,
        sample_count: usize,
        rng: &mut impl Rng,
    ) -> Result<SearchOutcome, AlgoedgeError> {
        if !MetricsSnapshot::is_known(objective) {
            return Err(AlgoedgeError::UnknownObjective {
                name: objective.to_string(),
            });
        }
        validate_bars(self.bars)?;
        let candidates = generate_candidates(space, sample_count, rng)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| AlgoedgeError::WorkerPool {
                reason: e.to_string(),
            })?;

        info!(
            "optimizing '{}' for {objective}: {} candidates on {} workers",
            strategy.name,
            candidates.len(),
            pool.current_num_threads()
        );

        let runs: Vec<CandidateRun> = pool.install(|| {
            candidates
                .par_iter()
                .enumerate()
                .map(|(i, candidate)| self.run_candidate(i, strategy, candidate, objective))
                .collect()
        });

        let outcome = select_best(strategy, objective, candidates, runs);
        info!(
            "optimization done: {} evaluated, {} failed, {} skipped, best {objective} = {}",
            outcome.evaluated,
            outcome.failed,
            outcome.skipped,
            outcome
                .best_metrics
                .and_then(|m| m.get(objective))
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(outcome)
    }

    fn run_candidate(
        &self,
        index: usize,
        strategy: &StrategyDocument,
        candidate: &ParamCandidate,
        objective: &str,
    ) -> CandidateRun {
        if self.should_stop() {
            return CandidateRun::Skipped;
        }
        let trial = strategy.with_overrides(candidate);
        match run_backtest(&trial, self.bars, &self.config) {
            Ok(result) => {
                let score = result.metrics.get(objective).unwrap_or(f64::NEG_INFINITY);
                CandidateRun::Scored {
                    trial,
                    metrics: result.metrics,
                    score,
                }
            }
            Err(e) => {
                warn!("candidate {index} failed: {e}");
                CandidateRun::Failed
            }
        }
    }
}

fn select_best(
    strategy: &StrategyDocument,
    objective: &str,
    candidates: Vec<ParamCandidate>,
    runs: Vec<CandidateRun>,
) -> SearchOutcome {
    let mut outcome = SearchOutcome {
        objective: objective.to_string(),
        best_strategy: strategy.clone(),
        best_candidate: None,
        best_metrics: None,
        evaluated: 0,
        failed: 0,
        skipped: 0,
    };
    let mut best_score = f64::NEG_INFINITY;

    for (candidate, run) in candidates.into_iter().zip(runs) {
        match run {
            CandidateRun::Skipped => outcome.skipped += 1,
            CandidateRun::Failed => {
                outcome.evaluated += 1;
                outcome.failed += 1;
            }
            CandidateRun::Scored {
                trial,
                metrics,
                score,
            } => {
                outcome.evaluated += 1;
                if score > best_score {
                    best_score = score;
                    outcome.best_strategy = trial;
                    outcome.best_candidate = Some(candidate);
                    outcome.best_metrics = Some(metrics);
                }
            }
        }
    }
    outcome
}
