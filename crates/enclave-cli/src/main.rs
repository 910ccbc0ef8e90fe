//! Enclave CLI
//!
//! Usage:
//!   enclave run main.star --params '{"name": "web"}'    Run a script file
//!   enclave run-package github.com/org/pkg             Run a remote package
//!   enclave services [IDENTIFIER]                      List or resolve services
//!   enclave enclaves [IDENTIFIER]                      List or resolve enclaves

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use enclave::{
    DEFAULT_MAIN_FILE, DEFAULT_MAIN_FUNCTION, DEFAULT_PARALLELISM, IdentifierSet, ResponseLine,
    ResponseStream, RunConfig, RunResult, RunResultBuilder,
};
use enclave_grpc::{ConnectionConfig, TransportKind};
use futures::StreamExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Enclave CLI - run scripts and packages against an enclave engine
#[derive(Parser, Debug)]
#[command(name = "enclave")]
#[command(about = "Run scripts in an enclave and resolve identifiers")]
struct Args {
    /// Endpoint to connect to (the API container for runs and services,
    /// the engine for enclaves)
    #[arg(long, default_value = "http://127.0.0.1:9710")]
    addr: String,

    /// Transport: native or web
    #[arg(long, default_value_t = TransportKind::Native)]
    transport: TransportKind,

    /// Full id of the enclave
    #[arg(long, default_value = "")]
    enclave_uuid: String,

    /// Name of the enclave
    #[arg(long, default_value = "")]
    enclave_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script file
    Run {
        /// Script to run
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Run a package the engine fetches itself
    RunPackage {
        /// Package locator, e.g. github.com/org/repo
        package_id: String,

        /// File holding the main function, relative to the package root
        #[arg(long, default_value = DEFAULT_MAIN_FILE)]
        main_file: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// List services, or resolve one identifier to its full id
    Services {
        /// Full id, shortened id or name
        identifier: Option<String>,
    },
    /// List enclaves, or resolve one identifier to its full id
    Enclaves {
        /// Full id, shortened id or name
        identifier: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Arguments for the main function, as a JSON object
    #[arg(long, default_value = "{}")]
    params: String,

    /// Interpret and validate only
    #[arg(long)]
    dry_run: bool,

    /// Instructions executed concurrently
    #[arg(long, default_value_t = DEFAULT_PARALLELISM)]
    parallelism: u32,

    /// Main function to call
    #[arg(long, default_value = DEFAULT_MAIN_FUNCTION)]
    main_function: String,

    /// Print the result as JSON instead of plain text
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn config(&self) -> RunConfig {
        RunConfig::default()
            .with_serialized_params(self.params.clone())
            .dry_run(self.dry_run)
            .parallelism(self.parallelism)
            .main_function(self.main_function.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let config = ConnectionConfig::new(args.addr, args.transport)
        .enclave(args.enclave_uuid, args.enclave_name);

    match args.command {
        Command::Run { file, run } => {
            let script = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let enclave = enclave_grpc::connect_enclave(&config)?;
            let lines = enclave.run_script(script, run.config()).await?;
            finish(follow(lines).await?, run.json)
        }
        Command::RunPackage {
            package_id,
            main_file,
            run,
        } => {
            let enclave = enclave_grpc::connect_enclave(&config)?;
            let lines = enclave
                .run_remote_package(package_id, run.config().main_file(main_file))
                .await?;
            finish(follow(lines).await?, run.json)
        }
        Command::Services { identifier } => {
            let enclave = enclave_grpc::connect_enclave(&config)?;
            let ids = enclave.service_identifiers().await?;
            show(&ids, identifier.as_deref())
        }
        Command::Enclaves { identifier } => {
            let engine = enclave_grpc::connect_engine(&config)?;
            let ids = engine.enclave_identifiers().await?;
            show(&ids, identifier.as_deref())
        }
    }
}

/// Print lines as they arrive and fold them. Ctrl-C closes the stream, which
/// cancels the run on the server.
async fn follow(mut lines: ResponseStream) -> anyhow::Result<RunResult> {
    let mut builder = RunResultBuilder::new();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        let line = tokio::select! {
            line = lines.next() => line,
            _ = &mut interrupt, if !lines.is_closed() => {
                tracing::info!("interrupted, cancelling run");
                lines.close();
                continue;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line?;
        match &line {
            ResponseLine::Progress(progress) => {
                eprintln!(
                    "[{}/{}] {}",
                    progress.current_step_number,
                    progress.total_steps,
                    progress.current_step_descriptions.join(", ")
                );
            }
            ResponseLine::Instruction(instruction) if !instruction.is_skipped => {
                eprintln!("> {}", instruction.executable_text);
            }
            ResponseLine::Warning(msg) => eprintln!("warning: {msg}"),
            ResponseLine::Info(msg) => eprintln!("{msg}"),
            ResponseLine::Error(err) => eprintln!("error: {}", err.message()),
            _ => {}
        }
        builder.apply(&line);
    }

    Ok(builder.finish())
}

fn finish(result: RunResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.run_output);
    }

    if let Some(err) = &result.interpretation_error {
        anyhow::bail!("interpretation failed: {err}");
    }
    if !result.validation_errors.is_empty() {
        anyhow::bail!(
            "validation failed:\n{}",
            result.validation_errors.join("\n")
        );
    }
    if let Some(err) = &result.execution_error {
        anyhow::bail!("execution failed: {err}");
    }
    Ok(())
}

fn show(ids: &IdentifierSet, identifier: Option<&str>) -> anyhow::Result<()> {
    match identifier {
        Some(identifier) => println!("{}", ids.resolve(identifier)?),
        None => {
            for id in ids.canonical_order() {
                println!("{id}");
            }
        }
    }
    Ok(())
}
