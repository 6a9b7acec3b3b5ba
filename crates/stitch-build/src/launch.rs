//! Launching entry points as standalone tools
use crate::error::{BuildError, BuildResult};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use tracing::info;

/// Split a free-form argument string on whitespace.
///
/// There is no quoting or escaping: an argument cannot contain whitespace.
pub fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(String::from).collect()
}

/// Runs `<java> -cp <classpath> <main-class> <args>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLauncher {
    java: String,
    main_class: String,
    classpath: Vec<PathBuf>,
    args: Vec<String>,
}

impl ToolLauncher {
    pub fn new(java: impl Into<String>, main_class: impl Into<String>, classpath: Vec<PathBuf>) -> Self {
        Self {
            java: java.into(),
            main_class: main_class.into(),
            classpath,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Arguments from a single whitespace-separated string
    pub fn with_arg_string(self, args: &str) -> Self {
        self.with_args(split_args(args))
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }

    /// The command that would be run
    pub fn command(&self) -> BuildResult<Command> {
        let classpath = std::env::join_paths(&self.classpath).map_err(|e| {
            BuildError::InvalidConfiguration(format!("classpath cannot be joined: {}", e))
        })?;

        let mut command = Command::new(&self.java);
        command
            .arg("-cp")
            .arg(classpath)
            .arg(&self.main_class)
            .args(&self.args);
        Ok(command)
    }

    /// Run the tool to completion, inheriting stdio
    pub fn run(&self) -> BuildResult<ExitStatus> {
        let mut command = self.command()?;
        info!(main_class = %self.main_class, args = ?self.args, "launching");
        command
            .status()
            .map_err(|e| BuildError::io(&self.java, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args("  input.ggb   out.gpad\t--verbose "),
            vec!["input.ggb", "out.gpad", "--verbose"]
        );
        assert!(split_args("   ").is_empty());
        // no quoting support
        assert_eq!(split_args("\"a b\""), vec!["\"a", "b\""]);
    }

    #[test]
    fn test_command_shape() {
        let launcher = ToolLauncher::new(
            "java",
            "org.example.GgbToGpadConverter",
            vec![PathBuf::from("classes"), PathBuf::from("libs/a.jar")],
        )
        .with_arg_string("in.ggb out.gpad");

        let command = launcher.command().unwrap();
        assert_eq!(command.get_program(), "java");

        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "-cp");
        assert!(args[1].contains("classes"));
        assert!(args[1].contains("a.jar"));
        assert_eq!(&args[2..], ["org.example.GgbToGpadConverter", "in.ggb", "out.gpad"]);
    }
}
