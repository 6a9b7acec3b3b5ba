//! Subproject build orchestration
//!
//! Builds subprojects in dependency order, each at most once per run. Callers
//! asking for a subproject that is already being built wait for that build
//! instead of starting another one. A failed subproject causes every
//! subproject depending on it to be skipped; unrelated subprojects still
//! build.

use crate::assembler::package_directory;
use crate::build_order::{BuildGraph, SubprojectNode};
use crate::error::{BuildError, BuildResult};
use crate::manifest::JarManifest;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The work performed for one subproject
pub trait SubprojectTask: Send + Sync {
    /// Build `node` and return the path of its output archive
    fn build(&self, node: &SubprojectNode) -> BuildResult<PathBuf>;
}

/// Packages a subproject's compiled output into `<build>/subprojects/<name>.jar`
#[derive(Debug, Clone)]
pub struct JarTask {
    output_dir: PathBuf,
}

impl JarTask {
    pub fn new(build_dir: &Path) -> Self {
        Self {
            output_dir: build_dir.join("subprojects"),
        }
    }

    /// Output archive of a subproject
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.jar", name))
    }
}

impl SubprojectTask for JarTask {
    fn build(&self, node: &SubprojectNode) -> BuildResult<PathBuf> {
        if !node.classes_dir.is_dir() {
            return Err(BuildError::missing_input(
                format!("subproject '{}'", node.name),
                &node.classes_dir,
            ));
        }
        let dest = self.output_path(&node.name);
        package_directory(&node.classes_dir, &dest, &JarManifest::new())?;
        Ok(dest)
    }
}

/// Final state of one subproject in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubprojectOutcome {
    Built { output: PathBuf },
    Failed { error: String },
    Skipped { failed: String },
}

/// Outcome of every requested subproject, in build order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub subprojects: Vec<(String, SubprojectOutcome)>,
    pub layers: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl BuildReport {
    pub fn outcome(&self, name: &str) -> Option<&SubprojectOutcome> {
        self.subprojects
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    pub fn is_success(&self) -> bool {
        self.subprojects
            .iter()
            .all(|(_, o)| matches!(o, SubprojectOutcome::Built { .. }))
    }

    /// Output archives of built subprojects, in build order
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.subprojects
            .iter()
            .filter_map(|(_, o)| match o {
                SubprojectOutcome::Built { output } => Some(output.clone()),
                _ => None,
            })
            .collect()
    }

    /// Error for the first failed subproject, if any
    pub fn first_failure(&self) -> Option<BuildError> {
        self.subprojects.iter().find_map(|(name, o)| match o {
            SubprojectOutcome::Failed { error } => Some(BuildError::SubprojectFailed {
                subproject: name.clone(),
                error: error.clone(),
            }),
            _ => None,
        })
    }

    /// Ok if everything built, otherwise the first failure
    pub fn into_result(self) -> BuildResult<Self> {
        match self.first_failure() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Building,
    Done(SubprojectOutcome),
}

#[derive(Debug, Default)]
struct RunState {
    slots: HashMap<String, Slot>,
    build_counts: HashMap<String, usize>,
}

/// Marks an in-flight build as failed if its task unwinds, so waiters
/// never block on a slot nobody will finish
struct InFlight<'a> {
    orchestrator: &'a Orchestrator,
    name: &'a str,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(subproject = self.name, "build task panicked");
            self.orchestrator.finish(
                self.name,
                SubprojectOutcome::Failed {
                    error: "build task panicked".to_string(),
                },
            );
        }
    }
}

/// Runs subproject tasks over a validated build graph
pub struct Orchestrator {
    graph: BuildGraph,
    task: Box<dyn SubprojectTask>,
    state: Mutex<RunState>,
    finished: Condvar,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator; fails if the graph is invalid or cyclic
    pub fn new(graph: BuildGraph, task: impl SubprojectTask + 'static) -> BuildResult<Self> {
        graph.validate()?;
        Ok(Self {
            graph,
            task: Box::new(task),
            state: Mutex::new(RunState::default()),
            finished: Condvar::new(),
        })
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of times the task ran for `name` in this run
    pub fn build_count(&self, name: &str) -> usize {
        self.lock().build_counts.get(name).copied().unwrap_or(0)
    }

    /// Outcome recorded for `name`, if it has finished
    pub fn outcome(&self, name: &str) -> Option<SubprojectOutcome> {
        match self.lock().slots.get(name) {
            Some(Slot::Done(outcome)) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Build `name` and its prerequisites unless already done in this run.
    ///
    /// Returns the output archive. Concurrent callers for the same
    /// subproject block until the in-flight build finishes and then share
    /// its outcome.
    pub fn ensure_built(&self, name: &str) -> BuildResult<PathBuf> {
        let node = self.graph.require(name)?;

        for dep in &node.dependencies {
            if let Err(err) = self.ensure_built(dep) {
                let failed = match err {
                    BuildError::SubprojectFailed { subproject, .. } => subproject,
                    BuildError::Skipped { failed, .. } => failed,
                    other => return Err(other),
                };
                return Err(self.record_skip(name, failed));
            }
        }

        {
            let mut state = self.lock();
            loop {
                match state.slots.get(name) {
                    Some(Slot::Done(outcome)) => return outcome_to_result(name, outcome),
                    Some(Slot::Building) => {
                        debug!(subproject = name, "waiting for in-flight build");
                        state = self
                            .finished
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    None => {
                        state.slots.insert(name.to_string(), Slot::Building);
                        break;
                    }
                }
            }
        }

        info!(subproject = name, "building");
        let started = Instant::now();
        let mut in_flight = InFlight {
            orchestrator: self,
            name,
            armed: true,
        };
        let result = self.task.build(node);
        in_flight.armed = false;

        let outcome = match &result {
            Ok(output) => {
                debug!(subproject = name, elapsed = ?started.elapsed(), "built");
                SubprojectOutcome::Built {
                    output: output.clone(),
                }
            }
            Err(err) => {
                warn!(
                    subproject = name,
                    error = %err,
                    dependents = ?self.graph.dependents_of(name),
                    "build failed"
                );
                SubprojectOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        self.finish(name, outcome.clone());
        outcome_to_result(name, &outcome)
    }

    /// Record the outcome of a task run and wake every waiter
    fn finish(&self, name: &str, outcome: SubprojectOutcome) {
        let mut state = self.lock();
        *state.build_counts.entry(name.to_string()).or_default() += 1;
        state.slots.insert(name.to_string(), Slot::Done(outcome));
        drop(state);
        self.finished.notify_all();
    }

    fn record_skip(&self, name: &str, failed: String) -> BuildError {
        let mut state = self.lock();
        if !state.slots.contains_key(name) {
            warn!(subproject = name, failed = %failed, "skipped");
            state.slots.insert(
                name.to_string(),
                Slot::Done(SubprojectOutcome::Skipped {
                    failed: failed.clone(),
                }),
            );
        }
        drop(state);
        self.finished.notify_all();
        BuildError::Skipped {
            subproject: name.to_string(),
            failed,
        }
    }

    /// Build every subproject in the graph
    pub fn build_all(&self) -> BuildResult<BuildReport> {
        let names: Vec<String> = self.graph.subprojects().map(|n| n.name.clone()).collect();
        self.ensure_all(&names)
    }

    /// Build `names` and their prerequisites, layer by layer.
    ///
    /// Subprojects within a layer build concurrently. Failures do not abort
    /// the run: they show up in the report, together with the dependents
    /// that were skipped because of them.
    pub fn ensure_all<S: AsRef<str>>(&self, names: &[S]) -> BuildResult<BuildReport> {
        let started = Instant::now();
        let mut requested = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            requested.extend(self.graph.prerequisite_closure(name)?);
            requested.insert(name.to_string());
        }

        let layers = self.graph.groups_for(requested)?;
        for layer in &layers {
            layer.par_iter().for_each(|name| {
                // outcomes are collected from the run state below
                let _ = self.ensure_built(name);
            });
        }

        let state = self.lock();
        let subprojects = layers
            .iter()
            .flatten()
            .filter_map(|name| match state.slots.get(name) {
                Some(Slot::Done(outcome)) => Some((name.clone(), outcome.clone())),
                _ => None,
            })
            .collect();

        Ok(BuildReport {
            subprojects,
            layers: layers.len(),
            elapsed: started.elapsed(),
        })
    }
}

fn outcome_to_result(name: &str, outcome: &SubprojectOutcome) -> BuildResult<PathBuf> {
    match outcome {
        SubprojectOutcome::Built { output } => Ok(output.clone()),
        SubprojectOutcome::Failed { error } => Err(BuildError::SubprojectFailed {
            subproject: name.to_string(),
            error: error.clone(),
        }),
        SubprojectOutcome::Skipped { failed } => Err(BuildError::Skipped {
            subproject: name.to_string(),
            failed: failed.clone(),
        }),
    }
}
