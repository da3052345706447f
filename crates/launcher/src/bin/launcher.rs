// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tcs-launcher`: supervise the configured service fleet.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tcs_config::JsonMap;
use tcs_core::SystemClock;
use tcs_launcher::{
    exit_code, logging, memory_bus_connector, signal, BootstrapOptions, LaunchKind, Launcher,
    LauncherError, ProcessContext, ServiceRegistry,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "tcs-launcher", about = "Supervisor for telescope-control services")]
struct Args {
    /// Services file
    #[arg(long)]
    config: PathBuf,

    /// Drive controllers on this process's scheduler instead of
    /// spawning child processes
    #[arg(long)]
    in_process: bool,

    /// Standalone entry binary for subprocess mode (defaults to a
    /// `tcs-service` sibling of this executable)
    #[arg(long)]
    service_exe: Option<PathBuf>,

    /// Log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _log_guard = logging::init(None, args.log_file.as_deref());
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

    let kind = if args.in_process {
        LaunchKind::InProcess
    } else {
        LaunchKind::Subprocess {
            program: args.service_exe.clone().unwrap_or_else(default_service_exe),
        }
    };

    let launcher = match Launcher::new(context, kind, args.config) {
        Ok(launcher) => launcher,
        Err(e) => {
            eprintln!("{e}");
            return exit_code::FAILURE;
        }
    };
    if let Err(e) = launcher.start().await {
        eprintln!("{e}");
        launcher.shutdown(SHUTDOWN_GRACE).await;
        return exit_code::FAILURE;
    }

    signal::wait_for_shutdown().await;
    launcher.shutdown(SHUTDOWN_GRACE).await;
    exit_code::OK
}

fn default_service_exe() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("tcs-service")))
        .unwrap_or_else(|| PathBuf::from("tcs-service"))
}
