//! Submission description

use std::path::{Path, PathBuf};
use std::process::Command;

use judge_core::{JudgeError, Result};
use nix::unistd::{access, AccessFlags};

const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// The executable entity under evaluation. Owned by the engine for one run.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Program to execute
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Environment overrides
    pub env: Vec<(String, String)>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Whether to inherit the judge's environment underneath the overrides
    pub inherit_env: bool,
}

impl Submission {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            inherit_env: true,
        }
    }

    /// Split a command line on whitespace: first word is the program
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let program = words.next().ok_or_else(|| {
            JudgeError::InvalidConfig("Run command cannot be empty".to_string())
        })?;
        Ok(Self::new(program).args(words))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Build the command to spawn. Stdio and process-group setup is left to
    /// the caller.
    pub fn to_command(&self) -> Result<Command> {
        let program = self.resolve_program()?;

        let mut command = Command::new(program);
        command.args(&self.args);
        if !self.inherit_env {
            command.env_clear();
        }
        command.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        Ok(command)
    }

    /// Resolve the program to an executable path using PATH semantics.
    /// A relative program with a `/` is resolved against the working directory.
    fn resolve_program(&self) -> Result<PathBuf> {
        if self.program.is_empty() {
            return Err(JudgeError::InvalidConfig(
                "Submission program cannot be empty".to_string(),
            ));
        }

        if self.program.contains('/') {
            let path = Path::new(&self.program);
            return Ok(match &self.cwd {
                Some(cwd) if path.is_relative() => cwd.join(path),
                _ => path.to_path_buf(),
            });
        }

        let path_value = self
            .env
            .iter()
            .find(|(key, _)| key == "PATH")
            .map(|(_, value)| value.clone())
            .or_else(|| {
                self.inherit_env
                    .then(|| std::env::var("PATH").ok())
                    .flatten()
            })
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        for entry in path_value.split(':') {
            let dir = if entry.is_empty() { "." } else { entry };
            let candidate = Path::new(dir).join(&self.program);

            if access(&candidate, AccessFlags::X_OK).is_ok() {
                return Ok(candidate);
            }
        }

        Err(JudgeError::InvalidConfig(format!(
            "command not found: {}",
            self.program
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_defaults() {
        let submission = Submission::new("/bin/echo");
        assert!(submission.args.is_empty());
        assert!(submission.env.is_empty());
        assert!(submission.cwd.is_none());
        assert!(submission.inherit_env);
    }

    #[test]
    fn test_submission_builder_methods() {
        let submission = Submission::new("python3")
            .arg("main.py")
            .env("PYTHONHASHSEED", "0")
            .current_dir("/tmp")
            .inherit_env(false);

        assert_eq!(submission.args, vec!["main.py"]);
        assert_eq!(submission.env[0].0, "PYTHONHASHSEED");
        assert_eq!(submission.cwd.as_deref(), Some(Path::new("/tmp")));
        assert!(!submission.inherit_env);
    }

    #[test]
    fn test_from_command_line() {
        let submission = Submission::from_command_line("java -Xmx512M Main").unwrap();
        assert_eq!(submission.program, "java");
        assert_eq!(submission.args, vec!["-Xmx512M", "Main"]);
        assert!(Submission::from_command_line("   ").is_err());
    }

    #[test]
    fn test_resolve_absolute_program() {
        let submission = Submission::new("/bin/sh");
        assert_eq!(submission.resolve_program().unwrap(), PathBuf::from("/bin/sh"));
    }

    #[test]
    fn test_resolve_relative_program_against_cwd() {
        let submission = Submission::new("./main").current_dir("/work");
        assert_eq!(
            submission.resolve_program().unwrap(),
            PathBuf::from("/work/./main")
        );
    }

    #[test]
    fn test_resolve_through_path() {
        let submission = Submission::new("sh").env("PATH", "/nonexistent:/bin");
        assert_eq!(submission.resolve_program().unwrap(), PathBuf::from("/bin/sh"));
    }

    #[test]
    fn test_resolve_missing_program() {
        let submission = Submission::new("definitely-not-a-real-binary-4242");
        let err = submission.resolve_program().unwrap_err();
        assert!(err.to_string().contains("command not found"));
    }

    #[test]
    fn test_empty_program_rejected() {
        assert!(Submission::new("").to_command().is_err());
    }
}
