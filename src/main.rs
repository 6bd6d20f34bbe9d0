// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{CommandFactory, Parser};
use kube::Client;
use squashctl::{
    cli::{Cli, Command},
    config::{default_config_path, load_config_file, resolve, ConfigSources, PartialOptions},
    context::Context,
    errors::SquashError,
    orchestrator::Orchestrator,
    port,
    target::TargetResolver,
};
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// Exit status when the user declines the confirmation prompt
const EXIT_USER_ABORTED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .thread_name("squashctl")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e
                .downcast_ref::<SquashError>()
                .is_some_and(SquashError::is_user_abort)
            {
                eprintln!("Aborted.");
                ExitCode::from(EXIT_USER_ABORTED)
            } else {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing() {
    // Logs go to stderr; stdout carries machine-mode output.
    //
    // Respects RUST_LOG if set, otherwise only warnings are shown so prompts stay readable.
    // Example: RUST_LOG=squashctl=debug squashctl --namespace shop
    //
    // Respects RUST_LOG_FORMAT for output format
    // Example: RUST_LOG_FORMAT=json squashctl --machine
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    if let Some(Command::Completions { shell }) = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "squashctl", &mut std::io::stdout());
        return Ok(());
    }

    if cli.debug_server {
        warn!("--debug-server is deprecated and has no effect");
    }

    let config_path = cli.config.clone().or_else(default_config_path);
    let file = config_path
        .as_deref()
        .map(load_config_file)
        .unwrap_or_default();

    let options = resolve(ConfigSources {
        file,
        env: PartialOptions::from_process_env(),
        flags: cli.overrides(),
    });
    info!(
        secure_mode = options.secure_mode,
        machine = options.machine,
        "Attaching debugger"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default()
        .await
        .map_err(|e| SquashError::cluster("connecting to the cluster", e))?;
    let context = Context::from_client(client, &options);

    let target = TargetResolver::new(&context).resolve(&options).await?;

    let local_port = port::allocate(options.local_port)?.release();
    debug!(local_port, "Reserved local port for the debugger");

    let mut orchestrator = Orchestrator::new(&context);
    orchestrator.attach(&options, &target, local_port).await?;

    Ok(())
}
