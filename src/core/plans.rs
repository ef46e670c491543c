//! Concrete pipeline definitions for the toolchain
//!
//! The build pipeline flattens the module dependency graph into a fixed
//! topological order: client library, source client, code generation from
//! the compiled clients plus the schema, generated-bindings compile,
//! dependent tools compile, then packaging and scratch cleanup.

use crate::core::config::Config;
use crate::core::pipeline::Pipeline;
use crate::core::stage::{CommandSpec, Stage};
use anyhow::Result;
use std::path::PathBuf;

/// Version the module builds stamp onto their archives
const MODULE_VERSION: &str = "1.0.0";

/// JVM settings for the external data CLI
const CLI_JVM_FLAGS: [&str; 2] = ["-Duser.timezone=GMT", "-Xmx32G"];

fn mvn_install(dir: PathBuf) -> CommandSpec {
    CommandSpec::new("mvn", ["clean", "install"]).in_dir(dir)
}

fn module_archive(module_dir: &PathBuf, module: &str) -> PathBuf {
    module_dir
        .join("target")
        .join(format!("{}-{}.jar", module, MODULE_VERSION))
}

fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

/// The compile → generate → compile → package pipeline for one source
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let generator_class = config.require_generator_class()?.to_string();

    let client_dir = config.client_dir();
    let source_client_dir = config.source_client_dir();
    let tools_dir = config.tools_dir();

    let client_jar = module_archive(&client_dir, "data_client");
    let source_client_jar = module_archive(
        &source_client_dir,
        &format!("{}_data_client", config.source),
    );
    let tools_jar = module_archive(&tools_dir, &format!("{}_data_tools", config.source));

    let generator_classpath = join_classpath(&[
        source_client_jar,
        client_jar,
        config.schema_dir(),
        config.secure_dir.clone(),
    ]);

    let mut generator_args = vec![
        "-cp".to_string(),
        generator_classpath,
        generator_class,
        config.schema_version.clone(),
    ];
    if let Some(config_paths) = &config.config_paths {
        generator_args.push(config_paths.clone());
    }
    generator_args.push(config.tools_base.to_string_lossy().into_owned());
    generator_args.push(config.generated_output.to_string_lossy().into_owned());
    if let Some(run_id) = &config.run_id {
        generator_args.push(run_id.clone());
    }

    let mut pipeline = Pipeline::new(format!("{}-build", config.source))
        .input("schema")
        .input("credentials")
        .stage(
            Stage::invoke("compile-client", mvn_install(client_dir))
                .produces("client-jar"),
        )
        .stage(
            Stage::invoke("compile-source-client", mvn_install(source_client_dir))
                .produces("source-client-jar"),
        )
        .stage(
            Stage::invoke("generate-bindings", CommandSpec::new("java", generator_args))
                .reads("client-jar")
                .reads("source-client-jar")
                .reads("schema")
                .produces("generated-sources"),
        )
        .stage(
            Stage::invoke("compile-bindings", mvn_install(config.bindings_dir()))
                .reads("generated-sources")
                .produces("bindings-jar"),
        );

    if config.copy_credentials {
        pipeline = pipeline.stage(
            Stage::copy_file(
                "copy-credentials",
                config.credentials_file(),
                tools_dir
                    .join("src")
                    .join("main")
                    .join("resources")
                    .join("secure.properties"),
            )
            .reads("credentials")
            .produces("tools-credentials"),
        );
    }

    let mut compile_tools = Stage::invoke("compile-tools", mvn_install(tools_dir))
        .reads("bindings-jar")
        .produces("tools-jar");
    if config.copy_credentials {
        compile_tools = compile_tools.reads("tools-credentials");
    }

    Ok(pipeline
        .stage(compile_tools)
        .stage(
            Stage::rename("package-tools", tools_jar, config.tools_archive())
                .reads("tools-jar")
                .produces("tools-archive"),
        )
        .stage(
            Stage::remove_dir("clean-bindings", config.bindings_dir())
                .reads("generated-sources"),
        ))
}

/// How to reach the external data CLI: the JVM invocation wrapped around
/// every subcommand
#[derive(Debug, Clone)]
pub struct DataCli {
    program: String,
    prefix_args: Vec<String>,
}

impl DataCli {
    pub fn new(program: impl Into<String>, prefix_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args,
        }
    }

    /// The data CLI as packaged by the build pipeline
    pub fn from_config(config: &Config) -> Result<Self> {
        let cli_class = config.require_cli_class()?.to_string();
        let classpath = join_classpath(&[
            config.tools_archive(),
            config.secure_dir.clone(),
            config.schema_dir(),
        ]);

        let mut prefix_args: Vec<String> =
            CLI_JVM_FLAGS.iter().map(|flag| flag.to_string()).collect();
        prefix_args.push("-cp".to_string());
        prefix_args.push(classpath);
        prefix_args.push(cli_class);

        Ok(Self::new("java", prefix_args))
    }

    /// Build the full command for one subcommand invocation
    pub fn command<I, A>(&self, subcommand_args: I) -> CommandSpec
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let args = self
            .prefix_args
            .iter()
            .cloned()
            .chain(subcommand_args.into_iter().map(Into::into))
            .collect::<Vec<_>>();
        CommandSpec::new(self.program.clone(), args)
    }
}

/// Module roots merged into the unified documentation tree
pub fn docs_modules(config: &Config) -> Vec<PathBuf> {
    vec![
        config.source_client_dir(),
        config.tools_dir(),
        config.bindings_dir(),
    ]
}
