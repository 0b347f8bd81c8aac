// src/core/runner.rs

//! Runs scripts across generations of projects.
//!
//! Generations run strictly one after another. Inside a generation, projects run on
//! a `rayon` pool (bounded by the throttle when one is set). Inside a script, commands
//! run one at a time in declared order and a failing command does not stop the ones
//! after it, unless abort-on-error is enabled.

use crate::CancellationToken;
use crate::core::generations::{GenerationError, ProjectGraph, split_generations_by_links};
use crate::core::materializer::{build_dictionary, guard_allows, materialize_command};
use crate::models::{GenerationResult, GenerationsResult, Project, ScriptInContext, ScriptOutcome, ScriptResult};
use crate::system::decorators::{CommandJob, ExecuteCommand};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::Ordering;
use std::time::Instant;
use thiserror::Error;

/// Returned once every eligible command has run and at least one of them failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{0} command(s) failed")]
pub struct CommandFailures(pub usize);

/// One script bound to one project.
#[derive(Debug, Clone, Copy)]
pub struct ScriptInvocation<'a> {
    pub context: &'a ScriptInContext<'a>,
    pub project: &'a Project,
}

pub type Generation<'a> = Vec<ScriptInvocation<'a>>;

/// Called after each generation completes.
pub trait GenerationReporter {
    fn report(&mut self, index: usize, result: &GenerationResult);
}

impl<F: FnMut(usize, &GenerationResult)> GenerationReporter for F {
    fn report(&mut self, index: usize, result: &GenerationResult) {
        self(index, result);
    }
}

/// The generations to run plus the projects the scheduler could not place.
#[derive(Debug)]
pub struct ExecutionPlan<'a> {
    pub generations: Vec<Generation<'a>>,
    pub missing: Vec<&'a Project>,
}

/// Binds the script to every project. With `links`, projects are split into
/// generations by their links; otherwise they all share one generation.
/// Duplicate project names are rejected either way.
pub fn plan_generations<'a>(
    context: &'a ScriptInContext<'a>,
    projects: &'a [Project],
    links: bool,
) -> Result<ExecutionPlan<'a>, GenerationError> {
    let bind = |p: &'a Project| ScriptInvocation {
        context,
        project: p,
    };
    if !links {
        ProjectGraph::new(projects)?;
        let generations = if projects.is_empty() {
            Vec::new()
        } else {
            vec![projects.iter().map(bind).collect()]
        };
        return Ok(ExecutionPlan {
            generations,
            missing: Vec::new(),
        });
    }
    let split = split_generations_by_links(projects)?;
    Ok(ExecutionPlan {
        generations: split
            .generations
            .into_iter()
            .map(|g| g.into_iter().map(bind).collect())
            .collect(),
        missing: split.missing,
    })
}

/// Executes generations of script invocations through a command executor.
pub struct GenerationExecutor<'e> {
    executor: &'e dyn ExecuteCommand,
    pool: Option<rayon::ThreadPool>,
    cancellation_token: CancellationToken,
    abort_on_error: bool,
}

impl fmt::Debug for GenerationExecutor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationExecutor")
            .field("throttle", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .field("abort_on_error", &self.abort_on_error)
            .finish_non_exhaustive()
    }
}

impl<'e> GenerationExecutor<'e> {
    /// `throttle` caps how many projects of a generation run at once; 0 leaves it to rayon.
    pub fn new(
        executor: &'e dyn ExecuteCommand,
        throttle: usize,
        cancellation_token: CancellationToken,
    ) -> Result<Self> {
        let pool = if throttle > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(throttle)
                    .build()
                    .with_context(|| format!("Could not start a pool of {} workers", throttle))?,
            )
        } else {
            None
        };
        Ok(Self {
            executor,
            pool,
            cancellation_token,
            abort_on_error: false,
        })
    }

    /// Trip the cancellation token on the first failing command.
    pub fn abort_on_error(mut self, abort_on_error: bool) -> Self {
        self.abort_on_error = abort_on_error;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::SeqCst)
    }

    /// Runs every command of the script for one project, in order.
    pub fn execute_script(&self, invocation: &ScriptInvocation<'_>) -> ScriptResult {
        let ScriptInvocation { context, project } = *invocation;
        let script = context.details;
        let start = Instant::now();
        let mut result = ScriptResult {
            project_name: project.name().to_string(),
            directory: project.directory.clone(),
            script_name: script.name.clone(),
            results: Vec::with_capacity(script.commands.len()),
            duration: Default::default(),
            outcome: ScriptOutcome::Completed,
        };

        if self.is_cancelled() {
            result.outcome = ScriptOutcome::Cancelled;
            return result;
        }

        let dic = build_dictionary(context.config, project);
        if !guard_allows(&dic, script.guard.as_deref()) {
            let reason = script.guard_reason.clone().unwrap_or_else(|| {
                format!("guard [{}] is not satisfied", script.guard.as_deref().unwrap_or_default())
            });
            log::debug!("Skipping '{}' for {}: {}", script.name, project.name(), reason);
            result.outcome = ScriptOutcome::Skipped(reason);
            return result;
        }

        for command in &script.commands {
            if self.is_cancelled() {
                result.outcome = ScriptOutcome::Cancelled;
                break;
            }
            let job = CommandJob {
                context,
                project,
                details: materialize_command(&dic, project, script, command),
            };
            log::trace!("{}: {}", project.name(), job.details.command_string);
            let shell_result = self.executor.execute(&job);
            if shell_result.has_error() && self.abort_on_error {
                log::debug!("'{}' failed in {}; aborting the run", command.name, project.name());
                self.cancellation_token.store(true, Ordering::SeqCst);
            }
            result.results.push(shell_result);
        }
        result.duration = start.elapsed();
        result
    }

    /// Runs every invocation of the generation. Results keep the generation's order.
    pub fn execute_generation(&self, generation: &[ScriptInvocation<'_>]) -> GenerationResult {
        let run = || {
            generation
                .par_iter()
                .map(|invocation| self.execute_script(invocation))
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Runs generation 0 to completion, reports it, then moves on to generation 1, and so on.
    pub fn execute_generations(
        &self,
        generations: &[Generation<'_>],
        reporter: &mut dyn GenerationReporter,
    ) -> GenerationsResult {
        let mut all = Vec::with_capacity(generations.len());
        for (i, generation) in generations.iter().enumerate() {
            if self.is_cancelled() {
                log::warn!(
                    "Run aborted; {} generation(s) not started",
                    generations.len() - i
                );
                break;
            }
            log::debug!("Starting generation {} with {} project(s)", i, generation.len());
            let result = self.execute_generation(generation);
            reporter.report(i, &result);
            all.push(result);
        }
        all
    }
}

/// Number of commands across the whole run that ended with an error.
pub fn count_failures(results: &GenerationsResult) -> usize {
    results
        .iter()
        .flatten()
        .flat_map(|sr| sr.results.iter())
        .filter(|r| r.has_error())
        .count()
}
