//! Build orchestration: dump every known asset once.
//!
//! Enumeration order is eager assets (registration order) followed by lazy
//! formulae (discovery order). Assets are independent, so they run on the
//! rayon pool; the report keeps enumeration order regardless of which asset
//! finishes first.

use rayon::prelude::*;

use crate::asset::AssetDefinition;
use crate::context::BuildContext;
use crate::error::{AssetError, AssetFailure, BuildFailures};
use crate::logger::ProgressLine;
use crate::writer::WriteOutcome;

/// Failure name used when the asset registration callback fails.
pub const REGISTRATION: &str = "<registration>";

/// Outcome of one [`Dumper::dump`].
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Written (or already up-to-date) assets, in enumeration order.
    pub outcomes: Vec<WriteOutcome>,
    /// Every failure, in enumeration order.
    pub failures: Vec<AssetFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Assets whose target file was (re)written.
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.unchanged).count()
    }

    /// Assets served from the compiled cache.
    pub fn cached(&self) -> usize {
        self.outcomes.iter().filter(|o| o.cache_hit).count()
    }

    pub fn unchanged(&self) -> usize {
        self.outcomes.iter().filter(|o| o.unchanged).count()
    }

    pub fn outcome(&self, name: &str) -> Option<&WriteOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn failure(&self, name: &str) -> Option<&AssetFailure> {
        self.failures.iter().find(|f| f.name == name)
    }

    pub fn into_result(self) -> Result<Vec<WriteOutcome>, BuildFailures> {
        if self.failures.is_empty() {
            Ok(self.outcomes)
        } else {
            Err(BuildFailures::new(self.failures))
        }
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} asset(s): {} written, {} unchanged, {} from cache",
            self.outcomes.len(),
            self.written(),
            self.unchanged(),
            self.cached()
        );
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        summary
    }
}

/// A unit of work in one dump.
enum Job<'a> {
    Eager(&'a AssetDefinition),
    Lazy(&'a str),
    Conflict(&'a str),
}

impl Job<'_> {
    fn name(&self) -> &str {
        match self {
            Job::Eager(def) => &def.name,
            Job::Lazy(name) | Job::Conflict(name) => name,
        }
    }

    fn counter(&self) -> &'static str {
        match self {
            Job::Eager(_) | Job::Conflict(_) => "eager",
            Job::Lazy(_) => "lazy",
        }
    }
}

/// Drives one dump over a [`BuildContext`]. Safe to run concurrently.
pub struct Dumper<'a> {
    ctx: &'a BuildContext,
    progress: bool,
}

impl<'a> Dumper<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            progress: false,
        }
    }

    /// Show a progress line while dumping.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn dump(&self) -> BuildReport {
        let eager = self.ctx.eager_assets();
        let lazy = self.ctx.lazy_manager();

        let mut failures = Vec::new();
        if let Some(error) = &eager.error {
            failures.push(AssetFailure::new(
                REGISTRATION,
                AssetError::Registration(error.clone()),
            ));
        }
        for failure in lazy.loader_failures() {
            failures.push(AssetFailure::new(
                failure.loader.clone(),
                AssetError::Registration(failure.message.clone()),
            ));
        }

        let jobs = self.jobs();
        let progress = self.progress.then(|| {
            let lazy_jobs = jobs.iter().filter(|j| matches!(j, Job::Lazy(_))).count();
            ProgressLine::new(&[("eager", jobs.len() - lazy_jobs), ("lazy", lazy_jobs)])
        });

        let results: Vec<Result<WriteOutcome, AssetFailure>> = jobs
            .par_iter()
            .map(|job| {
                let result = self
                    .run(job)
                    .map_err(|e| AssetFailure::new(job.name(), e));
                if let Some(progress) = &progress {
                    progress.inc(job.counter());
                }
                result
            })
            .collect();

        if let Some(progress) = progress {
            progress.finish();
        }

        let mut outcomes = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(failure) => failures.push(failure),
            }
        }

        let report = BuildReport { outcomes, failures };
        crate::debug!("dump"; "{}", report.summary());
        report
    }

    /// Eager names first, then lazy names; a name in both is one conflict.
    fn jobs(&self) -> Vec<Job<'a>> {
        let manager = self.ctx.asset_manager();
        let lazy = self.ctx.lazy_manager();

        let mut jobs: Vec<Job<'a>> = manager
            .all()
            .map(|(name, def)| {
                if lazy.has(name) {
                    Job::Conflict(name)
                } else {
                    Job::Eager(def)
                }
            })
            .collect();
        jobs.extend(lazy.names().filter(|n| !manager.has(n)).map(Job::Lazy));
        jobs
    }

    fn run(&self, job: &Job<'_>) -> Result<WriteOutcome, AssetError> {
        let writer = self.ctx.writer();
        match job {
            Job::Eager(def) => {
                let asset = self.ctx.factory().materialize(def)?;
                writer.write(&asset, self.ctx.cache().map(|cache| cache.as_ref()))
            }
            Job::Lazy(name) => {
                let resolved = self.ctx.lazy_manager().get(name)?;
                let asset = self.ctx.factory().materialize(&resolved.definition)?;
                writer.write(&asset, resolved.cache())
            }
            Job::Conflict(name) => Err(AssetError::Conflict(name.to_string())),
        }
    }
}
