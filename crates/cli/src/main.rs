//! Kiln CLI
//!
//! Maintains a generated Java project's `pom.xml` and drives `mvn compile` /
//! `mvn test`, optionally generating the sources first.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kiln_core::codegen::LlmCodeGenerator;
use kiln_core::config::{ConfigOverrides, KilnConfig};
use kiln_core::manifest::{DependencyDeclaration, ManifestStore};
use kiln_core::models::LlmProvider;
use kiln_core::session::Session;
use kiln_core::tools::{BuildAndTest, BuildOrchestrator};
use kiln_core::workspace::ProjectWorkspace;
use kiln_core::Provenance;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kiln", author, version, about = "Kiln - generate, build and test Java projects")]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Creator identity recorded in provenance stamps
    #[arg(long, global = true)]
    created_by: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the source/test layout, a default pom.xml and .kiln/config.json if missing
    Init,
    /// Declare dependencies (groupId:artifactId:version), replacing existing versions
    AddDep {
        #[arg(required = true, value_parser = parse_coordinate)]
        coordinates: Vec<DependencyDeclaration>,
    },
    /// List dependencies declared in pom.xml, or look up one (groupId:artifactId)
    ShowDeps {
        #[arg(value_parser = parse_key)]
        dependency: Option<(String, String)>,
    },
    /// Run `compile`, then `test` if the build passed
    Build(BuildArgs),
    /// Generate sources from a prompt, then build and test them
    Generate {
        /// What to build, in plain language
        prompt: String,

        #[command(flatten)]
        build: BuildArgs,

        /// LLM provider (anthropic, openai, openrouter)
        #[arg(long)]
        provider: Option<LlmProvider>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Base URL for OpenAI-compatible endpoints
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[derive(Args, Clone, Default)]
struct BuildArgs {
    /// Kill a phase that runs longer than this
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Build tool executable (default: mvn)
    #[arg(long)]
    toolchain: Option<String>,

    /// Argument passed to the build tool before the phase (repeatable)
    #[arg(long = "toolchain-arg", allow_hyphen_values = true)]
    toolchain_args: Vec<String>,
}

fn parse_coordinate(s: &str) -> Result<DependencyDeclaration, String> {
    s.parse()
}

fn parse_key(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') => {
            Ok((group.to_string(), artifact.to_string()))
        }
        _ => Err(format!("invalid dependency '{}', expected groupId:artifactId", s)),
    }
}

/// Initialize tracing on stderr so `--json` output stays clean
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "kiln_core=info,kiln_cli=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let root = cli.project.clone();
    let workspace = ProjectWorkspace::new(&root);

    let mut config = KilnConfig::load(&root)?;
    tracing::debug!(root = %root.display(), toolchain = %config.toolchain.program, "Configuration loaded");
    let mut overrides = ConfigOverrides {
        created_by: cli.created_by.clone(),
        ..Default::default()
    };

    match cli.command {
        Command::Init => {
            config.merge(overrides);
            let store = ManifestStore::new(config.project.clone());
            workspace.ensure_layout().await?;
            if !KilnConfig::path_for(&root).exists() {
                config.save(&root)?;
            }
            let manifest =
                store.ensure_manifest(&workspace.manifest_path, &Provenance::now(&config.created_by))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&workspace)?);
            } else {
                println!("Project ready at {}", workspace.project_root.display());
                println!(
                    "  {} ({} dependencies)",
                    workspace.manifest_path.display(),
                    manifest.dependencies().len()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::AddDep { coordinates } => {
            config.merge(overrides);
            let store = ManifestStore::new(config.project.clone());
            let manifest = store.update_dependencies(
                &workspace.manifest_path,
                &Provenance::now(&config.created_by),
                &coordinates,
            )?;
            print_dependencies(&manifest.dependencies(), cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::ShowDeps { dependency } => {
            let manifest = ManifestStore::new(config.project.clone())
                .load(&workspace.manifest_path)
                .with_context(|| format!("No usable manifest under {}", root.display()))?;
            let Some((group_id, artifact_id)) = dependency else {
                print_dependencies(&manifest.dependencies(), cli.json)?;
                return Ok(ExitCode::SUCCESS);
            };
            match manifest.dependency(&group_id, &artifact_id) {
                Some(found) => {
                    print_dependencies(std::slice::from_ref(found), cli.json)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("{}:{} is not declared", group_id, artifact_id);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Build(args) => {
            apply_build_args(&mut overrides, args);
            config.merge(overrides);
            let mut orchestrator = BuildOrchestrator::new(config.toolchain.clone());
            if let Some(timeout) = config.timeout() {
                orchestrator = orchestrator.with_timeout(timeout);
            }
            let outcome = orchestrator.run_build_then_test(&workspace.project_root).await;
            print_outcome(&outcome, cli.json)?;
            Ok(exit_code(outcome.succeeded()))
        }
        Command::Generate {
            prompt,
            build,
            provider,
            model,
            base_url,
        } => {
            apply_build_args(&mut overrides, build);
            overrides.provider = provider;
            overrides.model = model;
            overrides.base_url = base_url;
            config.merge(overrides);

            // Fatal at startup rather than after the manifest has been touched.
            config.model.check_credentials()?;

            let generator = LlmCodeGenerator::new(config.model.clone());
            let session = Session::from_config(workspace, &config, generator);
            let report = session.run(&prompt).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
            Ok(exit_code(report.succeeded()))
        }
    }
}

fn apply_build_args(overrides: &mut ConfigOverrides, args: BuildArgs) {
    overrides.timeout_secs = args.timeout_secs;
    overrides.toolchain_program = args.toolchain;
    if !args.toolchain_args.is_empty() {
        overrides.toolchain_args = Some(args.toolchain_args);
    }
}

fn print_dependencies(dependencies: &[DependencyDeclaration], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(dependencies)?);
    } else if dependencies.is_empty() {
        println!("No dependencies declared");
    } else {
        for dep in dependencies {
            println!("{}", dep);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &BuildAndTest, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let build = &outcome.build;
    if build.succeeded {
        println!("Build passed in {}ms", build.duration_ms);
    } else {
        println!("Build failed:\n{}", build.output_tail(40));
    }
    match &outcome.test {
        Some(test) if test.succeeded => println!("Tests passed in {}ms", test.duration_ms),
        Some(test) => println!("Tests failed:\n{}", test.output_tail(40)),
        None => println!("Tests skipped"),
    }
    Ok(())
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
