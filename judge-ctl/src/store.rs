//! On-disk test-set store
//!
//! ```text
//! <project>/.judge/config.json     test set name -> Testset
//! <project>/.judge/<set>/<n>.in    test input
//! <project>/.judge/<set>/<n>.out   expected output
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use judge_checker::{ComparisonPolicy, DEFAULT_DEBUG_MARKER};
use judge_core::{JudgeError, Limits, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const STORE_DIR: &str = ".judge";
pub const CONFIG_FILE: &str = "config.json";

/// Shell scripts and the submission command of a test set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scripts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<String>,
    pub run: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testset {
    pub limits: Limits,
    pub scripts: Scripts,
    #[serde(default)]
    pub checker: ComparisonPolicy,
    #[serde(default = "default_debug_marker")]
    pub debug_marker: String,
}

fn default_debug_marker() -> String {
    DEFAULT_DEBUG_MARKER.to_string()
}

pub type Config = BTreeMap<String, Testset>;

/// Stored test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub number: u32,
    pub input: Vec<u8>,
    pub output: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyInitialized,
    Reset,
}

pub struct TestStore {
    project: PathBuf,
}

impl TestStore {
    /// Create the store under `project`. An existing configuration is kept
    /// unless `force` is set.
    pub fn init(project: impl AsRef<Path>, force: bool) -> Result<(Self, InitOutcome)> {
        let store = Self {
            project: project.as_ref().to_path_buf(),
        };
        fs::create_dir_all(store.root())?;

        let existed = store.config_path().exists();
        if existed && !force {
            return Ok((store, InitOutcome::AlreadyInitialized));
        }

        store.save_config(&Config::new())?;
        let outcome = if existed {
            InitOutcome::Reset
        } else {
            InitOutcome::Created
        };
        info!("Initialized {}", store.root().display());
        Ok((store, outcome))
    }

    /// Open an existing store
    pub fn open(project: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            project: project.as_ref().to_path_buf(),
        };
        if !store.config_path().is_file() {
            return Err(JudgeError::InvalidConfig(format!(
                "No judge configuration found in {}. Run `judge-ctl init` first.",
                store.project.display()
            )));
        }
        Ok(store)
    }

    /// Directory scripts and submissions run in
    pub fn project_dir(&self) -> &Path {
        &self.project
    }

    pub fn root(&self) -> PathBuf {
        self.project.join(STORE_DIR)
    }

    fn config_path(&self) -> PathBuf {
        self.root().join(CONFIG_FILE)
    }

    pub fn set_dir(&self, set: &str) -> PathBuf {
        self.root().join(set)
    }

    pub fn load_config(&self) -> Result<Config> {
        let data = fs::read_to_string(self.config_path())?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save_config(&self, config: &Config) -> Result<()> {
        let data = serde_json::to_string_pretty(config)?;
        fs::write(self.config_path(), data + "\n")?;
        Ok(())
    }

    pub fn testset(&self, name: &str) -> Result<Testset> {
        self.load_config()?
            .remove(name)
            .ok_or_else(|| JudgeError::TestsetNotFound(name.to_string()))
    }

    pub fn add_set(&self, name: &str, testset: Testset) -> Result<()> {
        validate_set_name(name)?;

        let mut config = self.load_config()?;
        if config.contains_key(name) {
            return Err(JudgeError::AlreadyExists(format!("test set \"{}\"", name)));
        }
        config.insert(name.to_string(), testset);
        self.save_config(&config)?;

        fs::create_dir_all(self.set_dir(name))?;
        debug!("Added test set {}", name);
        Ok(())
    }

    /// Store a test case under the lowest unused number, starting at 1
    pub fn add_test(&self, set: &str, input: &[u8], output: &[u8]) -> Result<u32> {
        self.testset(set)?;
        let dir = self.set_dir(set);
        fs::create_dir_all(&dir)?;

        let mut number = 1;
        while dir.join(format!("{}.in", number)).exists() {
            number += 1;
        }

        fs::write(dir.join(format!("{}.in", number)), input)?;
        fs::write(dir.join(format!("{}.out", number)), output)?;
        debug!("Added test {} to {}", number, set);
        Ok(number)
    }

    pub fn read_test(&self, set: &str, number: u32) -> Result<TestCase> {
        self.testset(set)?;
        let dir = self.set_dir(set);
        let input_path = dir.join(format!("{}.in", number));
        let output_path = dir.join(format!("{}.out", number));

        if !input_path.is_file() || !output_path.is_file() {
            return Err(JudgeError::TestNotFound {
                set: set.to_string(),
                number,
            });
        }

        Ok(TestCase {
            number,
            input: fs::read(input_path)?,
            output: fs::read(output_path)?,
        })
    }

    /// Numbers of all stored tests, ascending
    pub fn test_numbers(&self, set: &str) -> Result<Vec<u32>> {
        self.testset(set)?;
        let dir = self.set_dir(set);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut numbers = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("in") {
                continue;
            }
            if let Some(number) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
            {
                numbers.push(number);
            }
        }
        numbers.sort_unstable();
        numbers.dedup();
        Ok(numbers)
    }
}

fn validate_set_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\0');
    if !valid {
        return Err(JudgeError::InvalidConfig(format!(
            "Invalid test set name: {:?}",
            name
        )));
    }
    Ok(())
}
