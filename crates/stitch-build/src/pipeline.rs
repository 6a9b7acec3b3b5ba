//! Entry-point pipeline
//!
//! Ties the project configuration to the build stages: upstream subprojects
//! are built once through the orchestrator, the runtime classpath is
//! resolved once per request, and each requested entry point is assembled.
//! The thin entry point is the primary application; building it also runs
//! native placement.

use crate::assembler::{zip_files, AssembledArchive, AssemblyReport, Assembler};
use crate::build_order::{BuildGraph, SubprojectNode};
use crate::classpath::RuntimeClasspath;
use crate::error::{BuildError, BuildResult};
use crate::launch::ToolLauncher;
use crate::native::{NativePlacement, PlacedNative};
use crate::orchestrator::{JarTask, Orchestrator, SubprojectTask};
use crate::staging::copy_atomic;
use crate::targets::EntryPoint;
use crate::test_gate::{GateDecision, SuiteKind, TestExecutor, TestGate, TestSuite};
use serde::Serialize;
use std::path::{Path, PathBuf};
use stitch_config::{Config, TestsConfig};
use stitch_package::{Lockfile, PlatformTarget, VariantResolver};
use tracing::{debug, info, warn};

/// Directory under the build directory holding entry-point archives
pub const LIBS_DIR: &str = "libs";
/// Collect-mode archive name
pub const COLLECT_ARCHIVE: &str = "jars.zip";

/// An assembled entry point and the natives placed for it
#[derive(Debug, Clone, Serialize)]
pub struct EntryPointBuild {
    pub archive: AssembledArchive,
    pub natives: Vec<PlacedNative>,
}

/// Outcome of each requested entry point, in request order.
///
/// Entry points share only the already-built upstream, so one failing entry
/// point does not stop the others from being assembled.
#[derive(Debug)]
pub struct EntryPointReport {
    pub results: Vec<(String, BuildResult<EntryPointBuild>)>,
}

impl EntryPointReport {
    pub fn builds(&self) -> impl Iterator<Item = &EntryPointBuild> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &BuildError)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    /// Every build, or one error naming all failed entry points
    pub fn into_result(self) -> BuildResult<Vec<EntryPointBuild>> {
        let total = self.results.len();
        let mut builds = Vec::with_capacity(total);
        let mut failed = Vec::new();
        let mut first = None;
        for (name, result) in self.results {
            match result {
                Ok(build) => builds.push(build),
                Err(err) => {
                    failed.push(name);
                    first.get_or_insert(err);
                }
            }
        }
        match first {
            None => Ok(builds),
            Some(first) => Err(BuildError::EntryPointsFailed {
                failed,
                total,
                first: Box::new(first),
            }),
        }
    }
}

/// Result of collect mode
#[derive(Debug, Clone, Serialize)]
pub struct CollectReport {
    pub archive: PathBuf,
    /// Runtime files copied next to the primary archive
    pub copied: usize,
    pub report: AssemblyReport,
}

/// A configured project, ready to build
#[derive(Debug)]
pub struct Pipeline {
    project_root: PathBuf,
    build_dir: PathBuf,
    root: String,
    root_classes: PathBuf,
    orchestrator: Orchestrator,
    lockfile: Lockfile,
    resolver: VariantResolver,
    platforms: Vec<PlatformTarget>,
    entry_points: Vec<EntryPoint>,
    tests: TestsConfig,
    java: String,
    ci: bool,
}

impl Pipeline {
    /// Pipeline packaging subprojects with [`JarTask`]
    pub fn from_config(config: &Config) -> BuildResult<Self> {
        let task = JarTask::new(&config.build_dir());
        Self::with_task(config, task)
    }

    /// Pipeline running `task` for every upstream subproject
    pub fn with_task(config: &Config, task: impl SubprojectTask + 'static) -> BuildResult<Self> {
        let project = &config.project;
        project.validate()?;

        let mut graph = BuildGraph::new();
        for sub in &project.subprojects {
            graph.add_subproject(
                SubprojectNode::new(&sub.name, config.resolve_path(&sub.classes))
                    .with_dependencies(sub.depends_on.iter().cloned()),
            );
        }
        let root = project.project.root.clone();
        let root_classes = graph.require(&root)?.classes_dir.clone();
        let orchestrator = Orchestrator::new(graph, task)?;

        let platforms = match PlatformTarget::parse_list(&config.platforms())? {
            ids if !ids.is_empty() => ids,
            _ => vec![PlatformTarget::host().ok_or_else(|| {
                BuildError::InvalidConfiguration(
                    "no platform targets configured and the host platform is not a known target"
                        .to_string(),
                )
            })?],
        };

        let lockfile_path = config.lockfile_path();
        let lockfile = if lockfile_path.exists() {
            Lockfile::from_file(&lockfile_path)?
        } else {
            debug!(path = %lockfile_path.display(), "no lockfile, no external dependencies");
            Lockfile::new()
        };

        let entry_points = project
            .entry_points
            .iter()
            .map(|e| EntryPoint::from_config(e, config.project_root()))
            .collect();

        Ok(Self {
            project_root: config.project_root().to_path_buf(),
            build_dir: config.build_dir(),
            root,
            root_classes,
            orchestrator,
            lockfile,
            resolver: VariantResolver::new(config.project_root()),
            platforms,
            entry_points,
            tests: project.tests.clone(),
            java: config.java().to_string(),
            ci: config.ci,
        })
    }

    pub fn graph(&self) -> &BuildGraph {
        self.orchestrator.graph()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn platforms(&self) -> &[PlatformTarget] {
        &self.platforms
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.build_dir.join(LIBS_DIR)
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn lockfile(&self) -> &Lockfile {
        &self.lockfile
    }

    /// Look up an entry point by name
    pub fn entry_point(&self, name: &str) -> BuildResult<&EntryPoint> {
        self.entry_points
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BuildError::UnknownEntryPoint {
                name: name.to_string(),
                declared: self
                    .entry_points
                    .iter()
                    .map(|e| e.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// The thin entry point
    pub fn primary_entry_point(&self) -> BuildResult<&EntryPoint> {
        self.entry_points
            .iter()
            .find(|e| e.is_thin())
            .ok_or_else(|| {
                BuildError::InvalidConfiguration(
                    "no entry point uses thin packaging, so there is no primary application"
                        .to_string(),
                )
            })
    }

    /// Build every prerequisite of the root subproject; returns their archives in build order
    pub fn build_upstream(&self) -> BuildResult<Vec<PathBuf>> {
        let upstream = self.graph().prerequisite_closure(&self.root)?;
        let report = self.orchestrator.ensure_all(&upstream)?.into_result()?;
        Ok(report.outputs())
    }

    /// Upstream archives followed by the resolved runtime dependencies
    pub fn runtime_classpath(&self) -> BuildResult<RuntimeClasspath> {
        let upstream = self.build_upstream()?;
        RuntimeClasspath::resolve(
            upstream,
            self.lockfile.runtime_dependencies(),
            &self.resolver,
            &self.platforms,
        )
    }

    /// Assemble the named entry points, each independently.
    ///
    /// All names are checked before anything is built, and upstream
    /// subprojects are built once however many entry points are requested.
    /// Those shared stages are fatal to the whole request; a failure while
    /// assembling one entry point is recorded in the report and the
    /// remaining entry points are still assembled.
    pub fn assemble_entry_points<S: AsRef<str>>(&self, names: &[S]) -> BuildResult<EntryPointReport> {
        let entries = names
            .iter()
            .map(|n| self.entry_point(n.as_ref()))
            .collect::<BuildResult<Vec<_>>>()?;

        let classpath = self.runtime_classpath()?;
        let assembler = Assembler::new(self.libs_dir());

        let results = entries
            .into_iter()
            .map(|entry| {
                let result = self.assemble_one(entry, &assembler, &classpath);
                if let Err(err) = &result {
                    warn!(entry_point = %entry.name, error = %err, "assembly failed");
                }
                (entry.name.clone(), result)
            })
            .collect();
        Ok(EntryPointReport { results })
    }

    fn assemble_one(
        &self,
        entry: &EntryPoint,
        assembler: &Assembler,
        classpath: &RuntimeClasspath,
    ) -> BuildResult<EntryPointBuild> {
        let archive = assembler.assemble(entry, &self.root_classes, classpath)?;
        let natives = if entry.is_thin() {
            NativePlacement::new().place(classpath)?
        } else {
            Vec::new()
        };
        Ok(EntryPointBuild { archive, natives })
    }

    /// Assemble the named entry points; fails if any of them failed
    pub fn build_entry_points<S: AsRef<str>>(&self, names: &[S]) -> BuildResult<Vec<EntryPointBuild>> {
        self.assemble_entry_points(names)?.into_result()
    }

    /// Assemble every declared entry point, each independently
    pub fn assemble_all_entry_points(&self) -> BuildResult<EntryPointReport> {
        let names: Vec<&str> = self.entry_points.iter().map(|e| e.name.as_str()).collect();
        self.assemble_entry_points(&names)
    }

    /// Assemble the primary application and place its natives
    pub fn build_primary(&self) -> BuildResult<EntryPointBuild> {
        let name = self.primary_entry_point()?.name.clone();
        let (_, result) = self
            .assemble_entry_points(&[name])?
            .results
            .pop()
            .ok_or_else(|| BuildError::MissingArtifact("primary archive".to_string()))?;
        result
    }

    /// Build the primary archive, gather every runtime file next to it and
    /// zip that directory into `<build>/jars.zip`
    pub fn collect(&self) -> BuildResult<CollectReport> {
        let primary = self.build_primary()?;
        let dir = primary
            .archive
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.libs_dir());

        let mut copied = 0;
        for artifact in &self.runtime_classpath()? {
            if !artifact.path.is_file() {
                warn!(path = %artifact.path.display(), "runtime file does not exist, not collected");
                continue;
            }
            let dest = dir.join(&artifact.name);
            if dest != artifact.path {
                copy_atomic(&artifact.path, &dest)?;
                copied += 1;
            }
        }

        let archive = self.build_dir.join(COLLECT_ARCHIVE);
        let report = zip_files(&dir, &archive)?;
        info!(path = %archive.display(), files = report.files_written, "collected runtime files");
        Ok(CollectReport {
            archive,
            copied,
            report,
        })
    }

    /// Classpath and command for a verification suite.
    ///
    /// Test classes come first, then the root classes, the runtime
    /// classpath and finally the suite's extra dependencies.
    pub fn test_suite(&self, kind: SuiteKind) -> BuildResult<TestSuite> {
        let config = match kind {
            SuiteKind::Default => self.tests.default.as_ref(),
            SuiteKind::Extended => self.tests.extended.as_ref(),
        }
        .ok_or_else(|| {
            BuildError::InvalidConfiguration(format!("no [tests.{}] suite configured", kind))
        })?;

        let mut classpath = self.runtime_classpath()?;
        for name in &config.dependencies {
            let dependency = self.lockfile.get_dependency(name).ok_or_else(|| {
                BuildError::InvalidConfiguration(format!(
                    "{} suite needs '{}', which is not in the lockfile",
                    kind, name
                ))
            })?;
            classpath.push_dependency(dependency, &self.resolver, &self.platforms)?;
        }

        let mut paths = vec![
            self.project_root.join(&config.classes),
            self.root_classes.clone(),
        ];
        paths.extend(classpath.paths().map(Path::to_path_buf));

        Ok(TestSuite {
            kind,
            command: config.command.clone(),
            classpath: paths,
            working_dir: self.project_root.clone(),
        })
    }

    /// Gate applying this project's failure policy
    pub fn test_gate(&self) -> TestGate {
        TestGate::new(self.ci)
    }

    /// Run the default suite through `gate`, then `step` unless the gate
    /// halts. A tolerated failure stays in the gate's history and `step`
    /// still runs.
    pub fn verify_then<T>(
        &self,
        gate: &mut TestGate,
        executor: &dyn TestExecutor,
        step: impl FnOnce(&Self) -> BuildResult<T>,
    ) -> BuildResult<T> {
        let suite = self.test_suite(SuiteKind::Default)?;
        if gate.run(executor, &suite)? == GateDecision::Tolerated {
            info!("continuing after a tolerated test failure");
        }
        step(self)
    }

    /// Launcher running an entry point's main class against the root
    /// classes and the runtime classpath
    pub fn launcher(&self, name: &str, args: &str) -> BuildResult<ToolLauncher> {
        let entry = self.entry_point(name)?;
        let classpath = self.runtime_classpath()?;

        let mut paths = vec![self.root_classes.clone()];
        paths.extend(classpath.paths().map(Path::to_path_buf));

        Ok(ToolLauncher::new(&self.java, &entry.main_class, paths).with_arg_string(args))
    }
}
