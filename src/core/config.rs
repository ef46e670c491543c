//! Orchestrator configuration
//!
//! All configuration is assembled once at process start — from the
//! environment, optionally overridden by a YAML file — and passed by
//! reference into the runner and workflow constructors. Nothing else in the
//! crate reads the environment.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resolved orchestrator configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Repository root of the toolchain checkout
    pub tools_base: PathBuf,

    /// Directory where generated sources and packaged archives land
    pub generated_output: PathBuf,

    /// Directory holding the credentials file
    pub secure_dir: PathBuf,

    /// Current schema version, e.g. "1.2.0"
    pub schema_version: String,

    /// Source name driving the conventional module layout, e.g. "canvas"
    pub source: String,

    /// Path the download step writes result metadata to
    pub result_file: Option<PathBuf>,

    /// Pre-supplied dump identifier; skips the download state when present
    pub dump_id: Option<String>,

    /// Parallelism forwarded to the external verify tool
    pub threads: usize,

    /// Config paths forwarded to the code generator
    pub config_paths: Option<String>,

    /// Run identifier forwarded to the code generator
    pub run_id: Option<String>,

    /// Main class of the code generator
    pub generator_class: Option<String>,

    /// Main class of the external data CLI
    pub cli_class: Option<String>,

    /// Copy the credentials file into the tools module before its compile
    pub copy_credentials: bool,

    /// Use the threaded post-verify subcommand instead of plain verify
    pub post_verify: bool,

    /// Run the downstream store update after a successful verify
    pub update_store: bool,
}

/// Partial configuration loaded from a YAML overrides file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub tools_base: Option<PathBuf>,
    #[serde(default)]
    pub generated_output: Option<PathBuf>,
    #[serde(default)]
    pub secure_dir: Option<PathBuf>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub result_file: Option<PathBuf>,
    #[serde(default)]
    pub dump_id: Option<String>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub config_paths: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub generator_class: Option<String>,
    #[serde(default)]
    pub cli_class: Option<String>,
    #[serde(default)]
    pub copy_credentials: Option<bool>,
    #[serde(default)]
    pub post_verify: Option<bool>,
    #[serde(default)]
    pub update_store: Option<bool>,
}

impl Config {
    /// Assemble configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Assemble configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).with_context(|| format!("required environment variable {} is not set", key))
        };
        let flag = |key: &str| {
            matches!(
                lookup(key).as_deref(),
                Some("1") | Some("true") | Some("yes")
            )
        };

        let threads = match lookup("DATA_THREAD_COUNT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("DATA_THREAD_COUNT is not a number: {}", raw))?,
            None => 1,
        };

        Ok(Self {
            tools_base: PathBuf::from(required("DATA_TOOLS_BASE")?),
            generated_output: PathBuf::from(required("DATA_GENERATED_OUTPUT")?),
            secure_dir: PathBuf::from(required("DATA_SECURE_DIR")?),
            schema_version: required("DATA_SCHEMA_VERSION")?,
            source: required("DATA_SOURCE")?,
            result_file: lookup("DATA_RESULT_FILE").map(PathBuf::from),
            dump_id: lookup("DATA_DUMP_ID"),
            threads,
            config_paths: lookup("DATA_CONFIG_PATHS"),
            run_id: lookup("DATA_RUN_ID"),
            generator_class: lookup("DATA_GENERATOR_CLASS"),
            cli_class: lookup("DATA_CLI_CLASS"),
            copy_credentials: flag("DATA_COPY_CREDENTIALS"),
            post_verify: flag("DATA_POST_VERIFY"),
            update_store: flag("DATA_UPDATE_STORE"),
        })
    }

    /// Apply overrides from a YAML file on top of the assembled values
    pub fn apply_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {}", path.as_ref().display()))?;
        let overrides: ConfigOverrides = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.as_ref().display()))?;
        self.apply(overrides);
        Ok(())
    }

    /// Merge a set of overrides into this configuration
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            tools_base,
            generated_output,
            secure_dir,
            schema_version,
            source,
            result_file,
            dump_id,
            threads,
            config_paths,
            run_id,
            generator_class,
            cli_class,
            copy_credentials,
            post_verify,
            update_store,
        } = overrides;

        if let Some(value) = tools_base {
            self.tools_base = value;
        }
        if let Some(value) = generated_output {
            self.generated_output = value;
        }
        if let Some(value) = secure_dir {
            self.secure_dir = value;
        }
        if let Some(value) = schema_version {
            self.schema_version = value;
        }
        if let Some(value) = source {
            self.source = value;
        }
        if let Some(value) = result_file {
            self.result_file = Some(value);
        }
        if let Some(value) = dump_id {
            self.dump_id = Some(value);
        }
        if let Some(value) = threads {
            self.threads = value;
        }
        if let Some(value) = config_paths {
            self.config_paths = Some(value);
        }
        if let Some(value) = run_id {
            self.run_id = Some(value);
        }
        if let Some(value) = generator_class {
            self.generator_class = Some(value);
        }
        if let Some(value) = cli_class {
            self.cli_class = Some(value);
        }
        if let Some(value) = copy_credentials {
            self.copy_credentials = value;
        }
        if let Some(value) = post_verify {
            self.post_verify = value;
        }
        if let Some(value) = update_store {
            self.update_store = value;
        }
    }

    /// Validate the assembled configuration
    pub fn validate(&self) -> Result<()> {
        let version_pattern = Regex::new(r"^\d+(\.\d+)*$").context("schema version pattern")?;
        if !version_pattern.is_match(&self.schema_version) {
            bail!(
                "invalid schema version '{}': expected digits separated by dots",
                self.schema_version
            );
        }

        if self.source.is_empty() {
            bail!("source name must not be empty");
        }
        if self.threads == 0 {
            bail!("thread count must be at least 1");
        }

        for (label, path) in [
            ("tools base", &self.tools_base),
            ("generated output", &self.generated_output),
            ("secure", &self.secure_dir),
        ] {
            if path.as_os_str().is_empty() {
                bail!("{} directory must not be empty", label);
            }
        }

        Ok(())
    }

    /// Result metadata path, required for ingest runs
    pub fn require_result_file(&self) -> Result<&Path> {
        self.result_file
            .as_deref()
            .context("DATA_RESULT_FILE is not set")
    }

    /// Generator main class, required for build runs
    pub fn require_generator_class(&self) -> Result<&str> {
        self.generator_class
            .as_deref()
            .context("DATA_GENERATOR_CLASS is not set")
    }

    /// Data CLI main class, required for ingest runs
    pub fn require_cli_class(&self) -> Result<&str> {
        self.cli_class.as_deref().context("DATA_CLI_CLASS is not set")
    }

    // Conventional module layout under the toolchain checkout.

    /// Base client library module
    pub fn client_dir(&self) -> PathBuf {
        self.tools_base.join("java").join("data_client")
    }

    /// Source-specific client module
    pub fn source_client_dir(&self) -> PathBuf {
        self.tools_base
            .join("java")
            .join(format!("{}_data_client", self.source))
    }

    /// Source-specific tools module
    pub fn tools_dir(&self) -> PathBuf {
        self.tools_base
            .join("java")
            .join(format!("{}_data_tools", self.source))
    }

    /// Schema description directory
    pub fn schema_dir(&self) -> PathBuf {
        self.tools_base.join("schema")
    }

    /// Where the generator emits source bindings
    pub fn bindings_dir(&self) -> PathBuf {
        self.generated_output.join("java")
    }

    /// Canonical location of the packaged tools archive
    pub fn tools_archive(&self) -> PathBuf {
        self.generated_output.join("data_tools.jar")
    }

    /// The credentials file under the secure directory
    pub fn credentials_file(&self) -> PathBuf {
        self.secure_dir.join("secure.properties")
    }
}
