// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tcs-service`: standalone entry hosting one service instance.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tcs_config::JsonMap;
use tcs_core::SystemClock;
use tcs_launcher::{
    exit_code, logging, memory_bus_connector, resolve_descriptor, run_service, BootstrapOptions,
    LauncherError, ProcessContext, ServiceRegistry,
};

#[derive(Parser)]
#[command(name = "tcs-service", about = "Run one telescope-control service instance")]
struct Args {
    /// Services file
    #[arg(default_value = tcs_config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Instance to run: a full `type.variant` id, or a bare variant
    /// that is unique in the services file
    #[arg(default_value = "default")]
    service: String,

    /// Supervisor-assigned runner id
    #[arg(long)]
    runner_id: Option<String>,

    /// Display hint naming the supervising monitor
    #[arg(long)]
    parent_name: Option<String>,

    /// Log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let registry: Arc<ServiceRegistry> = Arc::new(ServiceRegistry::new());
    let context = match ProcessContext::bootstrap(BootstrapOptions {
        config_path: args.config.clone(),
        args: JsonMap::new(),
        registry,
        connector: Some(memory_bus_connector()),
        clock: SystemClock,
    })
    .await
    {
        Ok(context) => context,
        Err(LauncherError::Config(e)) => {
            eprintln!("configuration error: {e}");
            return exit_code::CONFIG;
        }
        Err(e) => {
            eprintln!("{e}");
            return exit_code::FAILURE;
        }
    };

    let descriptor = match resolve_descriptor(&context.resolver_snapshot(), &args.service) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return exit_code::CONFIG;
        }
    };

    // Per-service log level applies unless RUST_LOG overrides it.
    let _log_guard = logging::init(descriptor.log_level.as_deref(), args.log_file.as_deref());

    run_service(&context, descriptor, args.runner_id, args.parent_name).await
}
