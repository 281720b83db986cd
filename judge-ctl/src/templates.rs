use clap::ValueEnum;
use judge_checker::ComparisonPolicy;
use judge_core::util::parse_memory_size;
use judge_core::{JudgeError, Limits, Result};

use crate::store::{Scripts, Testset};

struct TemplateConfig {
    time_ms: u64,
    memory: &'static str,
    compile: Option<&'static str>,
    run: &'static str,
    cleanup: Option<&'static str>,
}

const JAVA: TemplateConfig = TemplateConfig {
    time_ms: 4000,
    memory: "64M",
    compile: Some("javac {name}.java"),
    run: "java -Xmx512M -Xss64M -DONLINE_JUDGE=false -Duser.language=en -Duser.region=US -Duser.variant=US {name}",
    cleanup: Some("rm -f {name}*.class"),
};

const PYTHON: TemplateConfig = TemplateConfig {
    time_ms: 8000,
    memory: "64M",
    compile: None,
    run: "python3 {name}.py",
    cleanup: None,
};

const JS: TemplateConfig = TemplateConfig {
    time_ms: 2000,
    memory: "64M",
    compile: None,
    run: "node {name}.js",
    cleanup: None,
};

/// Placeholder in scripts replaced by the test set name
pub const NAME_PLACEHOLDER: &str = "{name}";

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Template {
    /// Java source compiled with javac
    Java,
    /// Python 3 script
    Python,
    /// Node.js script
    Js,
    /// No defaults: --run is required
    None,
}

/// Values given on the command line, overriding the template
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub time_ms: Option<u64>,
    pub memory: Option<String>,
    pub compile: Option<String>,
    pub run: Option<String>,
    pub cleanup: Option<String>,
    pub checker: ComparisonPolicy,
    pub debug_marker: String,
}

impl Template {
    fn config(&self) -> Option<&'static TemplateConfig> {
        match self {
            Template::Java => Some(&JAVA),
            Template::Python => Some(&PYTHON),
            Template::Js => Some(&JS),
            Template::None => None,
        }
    }

    /// Build a test set named `name` from this template and the overrides
    pub fn build(&self, name: &str, options: SetOptions) -> Result<Testset> {
        let config = self.config();
        let defaults = Limits::default();

        let time_ms = options
            .time_ms
            .or(config.map(|c| c.time_ms))
            .unwrap_or(defaults.time_ms);
        let memory_bytes = match options.memory.as_deref().or(config.map(|c| c.memory)) {
            Some(size) => parse_memory_size(size)?,
            None => defaults.memory_bytes,
        };
        let limits = Limits::new(time_ms, memory_bytes);
        limits.validate()?;
        options.checker.validate()?;

        let run = options
            .run
            .or_else(|| config.map(|c| c.run.to_string()))
            .ok_or_else(|| {
                JudgeError::InvalidConfig(
                    "A run command is required when no template is used".to_string(),
                )
            })?;
        let compile = options
            .compile
            .or_else(|| config.and_then(|c| c.compile).map(str::to_string));
        let cleanup = options
            .cleanup
            .or_else(|| config.and_then(|c| c.cleanup).map(str::to_string));

        let fill = |script: String| script.replace(NAME_PLACEHOLDER, name);

        Ok(Testset {
            limits,
            scripts: Scripts {
                compile: compile.map(fill),
                run: fill(run),
                cleanup: cleanup.map(fill),
            },
            checker: options.checker,
            debug_marker: options.debug_marker,
        })
    }

    pub fn description(&self) -> &str {
        match self {
            Template::Java => "Java source compiled with javac",
            Template::Python => "Python 3 script",
            Template::Js => "Node.js script",
            Template::None => "No defaults; limits fall back to 2000 ms / 256M",
        }
    }

    pub fn details(&self) -> String {
        match self.config() {
            Some(config) => {
                let mut details = format!(
                    "Time: {} ms | Memory: {} | Run: {}",
                    config.time_ms, config.memory, config.run
                );
                if let Some(compile) = config.compile {
                    details.push_str(&format!(" | Compile: {}", compile));
                }
                details
            }
            None => "Requires --run".to_string(),
        }
    }

    pub fn all() -> [Template; 4] {
        [Template::Java, Template::Python, Template::Js, Template::None]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SetOptions {
        SetOptions {
            debug_marker: "#".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn java_template_fills_the_name() {
        let set = Template::Java.build("Sum", options()).unwrap();
        assert_eq!(set.limits.time_ms, 4000);
        assert_eq!(set.limits.memory_bytes, 64 * 1024 * 1024);
        assert_eq!(set.scripts.compile.as_deref(), Some("javac Sum.java"));
        assert!(set.scripts.run.ends_with(" Sum"));
        assert_eq!(set.scripts.cleanup.as_deref(), Some("rm -f Sum*.class"));
    }

    #[test]
    fn template_limits() {
        let python = Template::Python.build("a", options()).unwrap();
        let js = Template::Js.build("a", options()).unwrap();
        assert_eq!(python.limits.time_ms, 8000);
        assert_eq!(js.limits.time_ms, 2000);
        assert_eq!(python.scripts.run, "python3 a.py");
        assert!(js.scripts.compile.is_none());
    }

    #[test]
    fn overrides_win_over_template() {
        let set = Template::Js
            .build(
                "fast",
                SetOptions {
                    time_ms: Some(500),
                    memory: Some("128M".to_string()),
                    run: Some("node --stack-size=65500 {name}.js".to_string()),
                    ..options()
                },
            )
            .unwrap();
        assert_eq!(set.limits.time_ms, 500);
        assert_eq!(set.limits.memory_bytes, 128 * 1024 * 1024);
        assert_eq!(set.scripts.run, "node --stack-size=65500 fast.js");
    }

    #[test]
    fn no_template_requires_run() {
        assert!(Template::None.build("x", options()).is_err());

        let set = Template::None
            .build(
                "x",
                SetOptions {
                    run: Some("./{name}".to_string()),
                    ..options()
                },
            )
            .unwrap();
        assert_eq!(set.scripts.run, "./x");
        assert_eq!(set.limits, Limits::default());
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let zero_time = SetOptions {
            time_ms: Some(0),
            ..options()
        };
        assert!(Template::Java.build("x", zero_time).is_err());

        let bad_memory = SetOptions {
            memory: Some("lots".to_string()),
            ..options()
        };
        assert!(Template::Java.build("x", bad_memory).is_err());

        let bad_checker = SetOptions {
            checker: ComparisonPolicy::tolerance(f64::NAN, 0.0),
            ..options()
        };
        assert!(Template::Java.build("x", bad_checker).is_err());
    }

    #[test]
    fn every_template_has_a_description() {
        for template in Template::all() {
            assert!(!template.description().is_empty());
            assert!(!template.details().is_empty());
        }
    }
}
