//! # Minimization Engine
//!
//! Greedy fixed-point reduction of a failing statement:
//!
//! ```text
//! current = seed                          (must reproduce, else fail fast)
//! loop:
//!     for location in pre-order(current):
//!         for rule in catalog (priority order):
//!             for candidate in rule.propose(current, location):
//!                 if oracle.reproduces(candidate):
//!                     current = candidate; restart from the top
//!     no candidate accepted -> current is a local minimum
//! ```
//!
//! Every accepted candidate is strictly smaller under [`Size`], so the loop
//! terminates. Traversal is re-derived from `current` at every restart.
//!
//! ## Run state
//!
//! The oracle is stateless. Each run owns a memo keyed by the canonical
//! rendering of a candidate, so identical text is never sent to the oracle
//! twice. The memo also lets the verification passes detect an oracle that
//! changes its mind.
//!
//! ## Stopping early
//!
//! The oracle-call budget, the run deadline and external cancellation are
//! checked before each oracle call and at each restart. A stopped run
//! still returns `current`, which is always a previously accepted
//! statement, together with the [`StopReason`].
//!
//! ## Parallel evaluation
//!
//! With `parallel` enabled all candidates of one location are sent to the
//! oracle concurrently on a rayon pool. The winner is the first accepted
//! candidate in priority order, which is the one sequential evaluation
//! would have picked.

pub mod deadline;

pub use deadline::{CancelHandle, Interrupted, RunDeadline};

use crate::ast::{Size, Statement};
use crate::config::{Config, OracleConfig, SearchConfig};
use crate::oracle::{Oracle, OracleError};
use crate::rules::{Candidate, RuleCatalog, RuleKind};
use crate::traversal::locations;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Errors that abort a minimization run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinimizeError {
    #[error("seed statement does not reproduce the expected failure")]
    SeedDoesNotReproduce,

    #[error("seed statement cannot be evaluated: {0}")]
    UnusableSeed(String),

    #[error("oracle changed its verdict for `{sql}` (first {first}, then {second})")]
    OracleInconsistent {
        sql: String,
        first: bool,
        second: bool,
    },

    #[error("oracle unavailable after {consecutive} consecutive infrastructure failures: {last}")]
    OracleUnavailable { consecutive: u32, last: String },

    #[error("run interrupted before the seed was checked: {0}")]
    Interrupted(#[from] Interrupted),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Why a run returned before reaching a local minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    BudgetExhausted { oracle_calls: u64 },
    TimedOut { elapsed_ms: u64 },
    Cancelled { elapsed_ms: u64 },
}

impl From<Interrupted> for StopReason {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled { elapsed } => StopReason::Cancelled {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            Interrupted::TimedOut { elapsed, .. } => StopReason::TimedOut {
                elapsed_ms: elapsed.as_millis() as u64,
            },
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted { oracle_calls } => {
                write!(f, "oracle budget exhausted after {oracle_calls} calls")
            }
            StopReason::TimedOut { elapsed_ms } => write!(f, "timed out after {elapsed_ms}ms"),
            StopReason::Cancelled { elapsed_ms } => write!(f, "cancelled after {elapsed_ms}ms"),
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Calls actually made to the oracle, verification included
    pub oracle_calls: u64,
    /// Candidates answered from the memo
    pub memo_hits: u64,
    /// Verified candidates considered
    pub candidates: u64,
    pub accepted: u64,
    pub unusable: u64,
    pub infrastructure_errors: u64,
    /// Traversals started (one per accepted candidate, plus the final one)
    pub passes: u64,
    pub initial_size: Size,
    pub final_size: Size,
    pub elapsed_ms: u64,
}

/// One accepted reduction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub rule: RuleKind,
    pub location: String,
    pub size: Size,
    pub sql: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Smallest reproducing statement found
    pub statement: Statement,
    pub stats: SearchStats,
    /// Accepted steps, oldest first
    pub history: Vec<Step>,
    /// Set when the run stopped before reaching a fixed point
    pub stop: Option<StopReason>,
    /// Result of the minimality check, when it ran
    pub locally_minimal: Option<bool>,
}

impl Reduction {
    /// Whether the search ran to its fixed point
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }
}

// ============================================================================
// Minimizer
// ============================================================================

/// Fixed-point statement minimizer
#[derive(Debug, Clone)]
pub struct Minimizer {
    search: SearchConfig,
    max_infrastructure_errors: u32,
    catalog: RuleCatalog,
}

impl Default for Minimizer {
    fn default() -> Self {
        Minimizer::with_settings(SearchConfig::default(), &OracleConfig::default())
    }
}

impl Minimizer {
    /// Minimizer with default settings and every rule enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimizer configured from the `[search]` and `[oracle]` sections
    pub fn from_config(config: &Config) -> Self {
        Minimizer::with_settings(config.search.clone(), &config.oracle)
    }

    fn with_settings(search: SearchConfig, oracle: &OracleConfig) -> Self {
        Minimizer {
            catalog: search.catalog(),
            max_infrastructure_errors: oracle.max_consecutive_infrastructure_errors.max(1),
            search,
        }
    }

    /// Replace the rule catalog
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Limit oracle calls per run (0 = unlimited)
    pub fn with_max_oracle_calls(mut self, max_oracle_calls: u64) -> Self {
        self.search.max_oracle_calls = max_oracle_calls;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.search.parallel = parallel;
        self
    }

    pub fn with_verify_result(mut self, verify: bool) -> Self {
        self.search.verify_result = verify;
        self
    }

    pub fn with_verify_minimality(mut self, verify: bool) -> Self {
        self.search.verify_minimality = verify;
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Minimize `seed` under the configured timeout
    pub fn minimize<O>(&self, seed: Statement, oracle: &O) -> Result<Reduction, MinimizeError>
    where
        O: Oracle + Sync,
    {
        self.minimize_with(seed, oracle, &RunDeadline::from_millis(self.search.timeout_ms))
    }

    /// Minimize `seed` under a caller-supplied deadline.
    ///
    /// The deadline replaces the configured `timeout_ms`; keep its
    /// [`CancelHandle`] to abandon the run from another thread.
    pub fn minimize_with<O>(
        &self,
        seed: Statement,
        oracle: &O,
        deadline: &RunDeadline,
    ) -> Result<Reduction, MinimizeError>
    where
        O: Oracle + Sync,
    {
        let pool = if self.search.parallel {
            Some(build_pool(self.search.num_threads)?)
        } else {
            None
        };

        let initial_size = seed.size();
        tracing::info!(
            nodes = initial_size.nodes,
            text_len = initial_size.text_len,
            rules = self.catalog.rules().len(),
            parallel = self.search.parallel,
            "starting minimization"
        );

        let mut run = Run {
            oracle,
            deadline,
            memo: HashMap::new(),
            stats: SearchStats {
                initial_size,
                ..SearchStats::default()
            },
            history: Vec::new(),
            consecutive_infrastructure: 0,
            max_infrastructure: self.max_infrastructure_errors,
            max_calls: self.search.max_oracle_calls,
        };

        run.check_seed(&seed)?;
        let (statement, stop) = run.search(seed, &self.catalog, pool.as_ref())?;

        let mut locally_minimal = None;
        if let Some(reason) = stop {
            tracing::warn!(%reason, "minimization stopped early");
        } else {
            if self.search.verify_result {
                run.verify_result(&statement)?;
            }
            if self.search.verify_minimality {
                locally_minimal = Some(run.verify_minimality(&statement, &self.catalog)?);
            }
        }

        run.stats.final_size = statement.size();
        run.stats.elapsed_ms = deadline.elapsed().as_millis() as u64;
        tracing::info!(
            oracle_calls = run.stats.oracle_calls,
            accepted = run.stats.accepted,
            nodes = run.stats.final_size.nodes,
            text_len = run.stats.final_size.text_len,
            elapsed_ms = run.stats.elapsed_ms,
            "minimization finished"
        );

        Ok(Reduction {
            statement,
            stats: run.stats,
            history: run.history,
            stop,
            locally_minimal,
        })
    }
}

fn build_pool(num_threads: usize) -> Result<ThreadPool, MinimizeError> {
    let threads = if num_threads == 0 {
        num_cpus::get()
    } else {
        num_threads
    };
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("sqlmin-oracle-{i}"))
        .build()
        .map_err(|e| MinimizeError::ThreadPool(e.to_string()))
}

/// Every verified candidate of `statement`, in search order
pub fn neighbours(statement: &Statement, catalog: &RuleCatalog) -> Vec<Candidate> {
    locations(statement)
        .iter()
        .flat_map(|location| catalog.propose(statement, location))
        .collect()
}

/// First single-rule reduction of `statement` that still reproduces.
///
/// `Ok(None)` means `statement` is a local minimum. Unusable candidates
/// are skipped; infrastructure failures are returned.
pub fn verify_local_minimum<O: Oracle>(
    statement: &Statement,
    oracle: &O,
    catalog: &RuleCatalog,
) -> Result<Option<Candidate>, OracleError> {
    for candidate in neighbours(statement, catalog) {
        match oracle.reproduces(candidate.statement()) {
            Ok(true) => return Ok(Some(candidate)),
            Ok(false) | Err(OracleError::Unusable(_)) => {}
            Err(e @ OracleError::Infrastructure(_)) => return Err(e),
        }
    }
    Ok(None)
}

// ============================================================================
// Run
// ============================================================================

/// Control flow out of the search loop
enum Halt {
    Stop(StopReason),
    Fail(MinimizeError),
}

/// Mutable state of one run
struct Run<'a, O> {
    oracle: &'a O,
    deadline: &'a RunDeadline,
    memo: HashMap<String, bool>,
    stats: SearchStats,
    history: Vec<Step>,
    consecutive_infrastructure: u32,
    max_infrastructure: u32,
    max_calls: u64,
}

impl<O: Oracle + Sync> Run<'_, O> {
    fn check_seed(&mut self, seed: &Statement) -> Result<(), MinimizeError> {
        loop {
            self.deadline.check()?;
            self.stats.oracle_calls += 1;
            match self.oracle.reproduces(seed) {
                Ok(true) => {
                    self.consecutive_infrastructure = 0;
                    self.memo.insert(seed.to_string(), true);
                    return Ok(());
                }
                Ok(false) => return Err(MinimizeError::SeedDoesNotReproduce),
                Err(OracleError::Unusable(reason)) => {
                    return Err(MinimizeError::UnusableSeed(reason))
                }
                Err(OracleError::Infrastructure(reason)) => self.infrastructure_failure(reason)?,
            }
        }
    }

    /// Count an infrastructure failure; abort once the threshold is reached
    fn infrastructure_failure(&mut self, reason: String) -> Result<(), MinimizeError> {
        self.stats.infrastructure_errors += 1;
        self.consecutive_infrastructure += 1;
        tracing::warn!(
            %reason,
            consecutive = self.consecutive_infrastructure,
            "oracle infrastructure failure"
        );
        if self.consecutive_infrastructure >= self.max_infrastructure {
            return Err(MinimizeError::OracleUnavailable {
                consecutive: self.consecutive_infrastructure,
                last: reason,
            });
        }
        Ok(())
    }

    fn check_budget(&self) -> Result<(), Halt> {
        if self.max_calls > 0 && self.stats.oracle_calls >= self.max_calls {
            return Err(Halt::Stop(StopReason::BudgetExhausted {
                oracle_calls: self.stats.oracle_calls,
            }));
        }
        self.deadline
            .check()
            .map_err(|interrupted| Halt::Stop(interrupted.into()))
    }

    /// Calls left before the budget runs out
    fn remaining_calls(&self) -> usize {
        if self.max_calls == 0 {
            usize::MAX
        } else {
            usize::try_from(self.max_calls.saturating_sub(self.stats.oracle_calls))
                .unwrap_or(usize::MAX)
        }
    }

    /// Fold one oracle answer into the memo and counters.
    /// Returns whether the candidate reproduces.
    fn record(&mut self, sql: String, answer: Result<bool, OracleError>) -> Result<bool, Halt> {
        self.stats.oracle_calls += 1;
        match answer {
            Ok(reproduces) => {
                self.consecutive_infrastructure = 0;
                self.memo.insert(sql, reproduces);
                Ok(reproduces)
            }
            Err(OracleError::Unusable(reason)) => {
                self.consecutive_infrastructure = 0;
                self.stats.unusable += 1;
                tracing::warn!(%sql, %reason, "skipping unusable candidate");
                self.memo.insert(sql, false);
                Ok(false)
            }
            Err(OracleError::Infrastructure(reason)) => {
                self.infrastructure_failure(reason).map_err(Halt::Fail)?;
                Ok(false)
            }
        }
    }

    fn search(
        &mut self,
        seed: Statement,
        catalog: &RuleCatalog,
        pool: Option<&ThreadPool>,
    ) -> Result<(Statement, Option<StopReason>), MinimizeError> {
        let mut current = seed;

        'restart: loop {
            if let Err(interrupted) = self.deadline.check() {
                return Ok((current, Some(interrupted.into())));
            }
            self.stats.passes += 1;

            for location in locations(&current) {
                let candidates = catalog.propose(&current, &location);
                if candidates.is_empty() {
                    continue;
                }
                let outcome = match pool {
                    Some(pool) => self.first_accepted_parallel(candidates, pool),
                    None => self.first_accepted(candidates),
                };
                match outcome {
                    Ok(Some(candidate)) => {
                        let step = Step {
                            rule: candidate.rule(),
                            location: location.to_string(),
                            size: candidate.size(),
                            sql: candidate.statement().to_string(),
                        };
                        tracing::debug!(
                            rule = %step.rule,
                            location = %step.location,
                            nodes = step.size.nodes,
                            sql = %step.sql,
                            "accepted candidate"
                        );
                        self.stats.accepted += 1;
                        self.history.push(step);
                        current = candidate.into_statement();
                        continue 'restart;
                    }
                    Ok(None) => {}
                    Err(Halt::Stop(reason)) => return Ok((current, Some(reason))),
                    Err(Halt::Fail(error)) => return Err(error),
                }
            }

            return Ok((current, None));
        }
    }

    /// Evaluate candidates one at a time, stopping at the first that
    /// reproduces
    fn first_accepted(&mut self, candidates: Vec<Candidate>) -> Result<Option<Candidate>, Halt> {
        for candidate in candidates {
            self.stats.candidates += 1;
            let sql = candidate.statement().to_string();
            if let Some(&reproduces) = self.memo.get(&sql) {
                self.stats.memo_hits += 1;
                if reproduces {
                    return Ok(Some(candidate));
                }
                continue;
            }

            self.check_budget()?;
            let answer = self.oracle.reproduces(candidate.statement());
            if self.record(sql, answer)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Evaluate every unknown candidate concurrently, then pick the first
    /// that reproduces in priority order
    fn first_accepted_parallel(
        &mut self,
        candidates: Vec<Candidate>,
        pool: &ThreadPool,
    ) -> Result<Option<Candidate>, Halt> {
        let texts: Vec<String> = candidates
            .iter()
            .map(|candidate| candidate.statement().to_string())
            .collect();
        self.stats.candidates += candidates.len() as u64;

        let mut pending: Vec<usize> = Vec::new();
        let mut queued = HashSet::new();
        for (i, sql) in texts.iter().enumerate() {
            if self.memo.contains_key(sql) {
                self.stats.memo_hits += 1;
            } else if queued.insert(sql.as_str()) {
                pending.push(i);
            }
        }

        // Candidates from `cutoff` on were not evaluated for lack of budget
        let mut cutoff = candidates.len();
        if !pending.is_empty() {
            self.check_budget()?;
            let remaining = self.remaining_calls();
            if pending.len() > remaining {
                cutoff = pending[remaining];
                pending.truncate(remaining);
            }

            let oracle = self.oracle;
            let answers: Vec<Result<bool, OracleError>> = pool.install(|| {
                pending
                    .par_iter()
                    .map(|&i| oracle.reproduces(candidates[i].statement()))
                    .collect()
            });
            for (&i, answer) in pending.iter().zip(answers) {
                self.record(texts[i].clone(), answer)?;
            }
        }

        let budget_hit = cutoff < candidates.len();
        for (candidate, sql) in candidates.into_iter().zip(&texts).take(cutoff) {
            if self.memo.get(sql) == Some(&true) {
                return Ok(Some(candidate));
            }
        }
        if budget_hit {
            return Err(Halt::Stop(StopReason::BudgetExhausted {
                oracle_calls: self.stats.oracle_calls,
            }));
        }
        Ok(None)
    }

    /// Ask the oracle once more about the final statement
    fn verify_result(&mut self, statement: &Statement) -> Result<(), MinimizeError> {
        self.stats.oracle_calls += 1;
        match self.oracle.reproduces(statement) {
            Ok(true) => Ok(()),
            Ok(false) => {
                let sql = statement.to_string();
                tracing::error!(%sql, "oracle no longer reproduces an accepted statement");
                Err(MinimizeError::OracleInconsistent {
                    sql,
                    first: true,
                    second: false,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not re-verify the final statement");
                Ok(())
            }
        }
    }

    /// Re-ask the oracle about every candidate of the final statement.
    /// Returns whether none of them reproduces.
    fn verify_minimality(
        &mut self,
        statement: &Statement,
        catalog: &RuleCatalog,
    ) -> Result<bool, MinimizeError> {
        let mut minimal = true;
        let mut seen = HashSet::new();
        for candidate in neighbours(statement, catalog) {
            let sql = candidate.statement().to_string();
            if !seen.insert(sql.clone()) {
                continue;
            }
            self.stats.oracle_calls += 1;
            let answer = self.oracle.reproduces(candidate.statement());
            match (answer, self.memo.get(&sql)) {
                (Ok(true), Some(false)) => {
                    tracing::error!(%sql, "oracle verdict flipped from rejected to reproducing");
                    return Err(MinimizeError::OracleInconsistent {
                        sql,
                        first: false,
                        second: true,
                    });
                }
                (Ok(true), _) => {
                    tracing::warn!(%sql, rule = %candidate.rule(), "final statement is not a local minimum");
                    minimal = false;
                }
                _ => {}
            }
        }
        Ok(minimal)
    }
}
