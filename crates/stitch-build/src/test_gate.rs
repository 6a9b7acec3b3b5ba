//! Test execution gate
//!
//! Runs verification suites and decides whether a failure stops the
//! pipeline. Default-suite failures are tolerated when the continuous
//! integration signal is present; the extended suite is always strict.

use crate::error::{BuildError, BuildResult};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Which verification suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    Default,
    Extended,
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// A runnable suite: its command and the classpath it sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub kind: SuiteKind,
    /// Program followed by its arguments
    pub command: Vec<String>,
    pub classpath: Vec<PathBuf>,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum TestOutcome {
    Pass,
    Fail { exit_code: Option<i32> },
}

/// Result of running one suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRun {
    pub suite: SuiteKind,
    pub outcome: TestOutcome,
    #[serde(skip)]
    pub duration: Duration,
}

impl TestRun {
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Pass
    }
}

/// Runs a suite
pub trait TestExecutor {
    fn execute(&self, suite: &TestSuite) -> BuildResult<TestRun>;
}

/// Runs the suite command as a child process with `CLASSPATH` set
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl TestExecutor for ProcessExecutor {
    fn execute(&self, suite: &TestSuite) -> BuildResult<TestRun> {
        let (program, args) = suite.command.split_first().ok_or_else(|| {
            BuildError::InvalidConfiguration(format!("{} test command is empty", suite.kind))
        })?;
        let classpath = std::env::join_paths(&suite.classpath).map_err(|e| {
            BuildError::InvalidConfiguration(format!("test classpath cannot be joined: {}", e))
        })?;

        info!(suite = %suite.kind, command = ?suite.command, "running tests");
        let started = Instant::now();
        let status = Command::new(program)
            .args(args)
            .env("CLASSPATH", classpath)
            .current_dir(&suite.working_dir)
            .status()
            .map_err(|e| BuildError::io(program, e))?;

        let outcome = if status.success() {
            TestOutcome::Pass
        } else {
            TestOutcome::Fail {
                exit_code: status.code(),
            }
        };
        Ok(TestRun {
            suite: suite.kind,
            outcome,
            duration: started.elapsed(),
        })
    }
}

/// What the pipeline does after a suite ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Proceed,
    /// Failed, but the failure is recorded and the pipeline continues
    Tolerated,
    Halt,
}

/// Applies the failure policy and keeps every run
#[derive(Debug, Clone, Default)]
pub struct TestGate {
    ci: bool,
    history: Vec<(TestRun, GateDecision)>,
}

impl TestGate {
    pub fn new(ci: bool) -> Self {
        Self {
            ci,
            history: Vec::new(),
        }
    }

    pub fn decide(&self, run: &TestRun) -> GateDecision {
        match (&run.outcome, run.suite) {
            (TestOutcome::Pass, _) => GateDecision::Proceed,
            (TestOutcome::Fail { .. }, SuiteKind::Default) if self.ci => GateDecision::Tolerated,
            (TestOutcome::Fail { .. }, _) => GateDecision::Halt,
        }
    }

    /// Record `run` and turn a halting decision into `TestFailure`
    pub fn evaluate(&mut self, run: TestRun) -> BuildResult<GateDecision> {
        let decision = self.decide(&run);
        let failure = match run.outcome {
            TestOutcome::Fail { exit_code } => Some(exit_code),
            TestOutcome::Pass => None,
        };

        match decision {
            GateDecision::Proceed => info!(suite = %run.suite, "tests passed"),
            GateDecision::Tolerated => {
                warn!(suite = %run.suite, "tests failed; continuing because CI is set")
            }
            GateDecision::Halt => warn!(suite = %run.suite, "tests failed"),
        }

        let suite = run.suite;
        self.history.push((run, decision));

        match (decision, failure) {
            (GateDecision::Halt, Some(exit_code)) => Err(BuildError::TestFailure {
                suite: suite.to_string(),
                exit_code,
            }),
            _ => Ok(decision),
        }
    }

    /// Run `suite` with `executor` and evaluate the result
    pub fn run(
        &mut self,
        executor: &dyn TestExecutor,
        suite: &TestSuite,
    ) -> BuildResult<GateDecision> {
        let run = executor.execute(suite)?;
        self.evaluate(run)
    }

    pub fn history(&self) -> &[(TestRun, GateDecision)] {
        &self.history
    }

    pub fn ci(&self) -> bool {
        self.ci
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(suite: SuiteKind, pass: bool) -> TestRun {
        TestRun {
            suite,
            outcome: if pass {
                TestOutcome::Pass
            } else {
                TestOutcome::Fail { exit_code: Some(1) }
            },
            duration: Duration::ZERO,
        }
    }

    #[rstest]
    #[case(SuiteKind::Default, true, false, GateDecision::Proceed)]
    #[case(SuiteKind::Default, true, true, GateDecision::Proceed)]
    #[case(SuiteKind::Default, false, true, GateDecision::Tolerated)]
    #[case(SuiteKind::Default, false, false, GateDecision::Halt)]
    #[case(SuiteKind::Extended, false, true, GateDecision::Halt)]
    #[case(SuiteKind::Extended, false, false, GateDecision::Halt)]
    #[case(SuiteKind::Extended, true, true, GateDecision::Proceed)]
    fn test_gate_policy(
        #[case] suite: SuiteKind,
        #[case] pass: bool,
        #[case] ci: bool,
        #[case] expected: GateDecision,
    ) {
        assert_eq!(TestGate::new(ci).decide(&run(suite, pass)), expected);
    }

    #[test]
    fn test_halt_is_an_error_and_recorded() {
        let mut gate = TestGate::new(false);
        let err = gate.evaluate(run(SuiteKind::Default, false)).unwrap_err();
        assert!(matches!(
            err,
            BuildError::TestFailure {
                exit_code: Some(1),
                ..
            }
        ));
        assert_eq!(gate.history().len(), 1);
        assert_eq!(gate.history()[0].1, GateDecision::Halt);
    }

    #[test]
    fn test_tolerated_failure_is_kept_in_history() {
        let mut gate = TestGate::new(true);
        assert_eq!(
            gate.evaluate(run(SuiteKind::Default, false)).unwrap(),
            GateDecision::Tolerated
        );
        assert_eq!(
            gate.evaluate(run(SuiteKind::Default, true)).unwrap(),
            GateDecision::Proceed
        );
        assert_eq!(gate.history().len(), 2);
        assert!(!gate.history()[0].0.passed());
    }

    #[test]
    fn test_empty_command_rejected() {
        let suite = TestSuite {
            kind: SuiteKind::Default,
            command: Vec::new(),
            classpath: Vec::new(),
            working_dir: PathBuf::from("."),
        };
        assert!(matches!(
            ProcessExecutor.execute(&suite),
            Err(BuildError::InvalidConfiguration(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_reports_exit_code() {
        let suite = TestSuite {
            kind: SuiteKind::Default,
            command: vec!["sh".into(), "-c".into(), "test -n \"$CLASSPATH\" && exit 3".into()],
            classpath: vec![PathBuf::from("classes")],
            working_dir: PathBuf::from("."),
        };
        let run = ProcessExecutor.execute(&suite).unwrap();
        assert_eq!(run.outcome, TestOutcome::Fail { exit_code: Some(3) });
    }
}
