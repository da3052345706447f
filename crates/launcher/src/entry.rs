// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared logic of the standalone service entry (`tcs-service`).

use crate::context::ProcessContext;
use crate::controller::{Controller, ControllerIds, ControllerState};
use crate::error::LauncherError;
use crate::{exit_code, signal, STOP_GRACE};
use std::sync::Arc;
use tcs_config::ConfigResolver;
use tcs_core::{Clock, ServiceDescriptor, ServiceId};

/// Resolve the entry's `service` argument against the config file.
///
/// Accepts a full `type.variant` id, or a bare variant when it is
/// unambiguous among the configured services.
pub fn resolve_descriptor(
    resolver: &ConfigResolver,
    raw: &str,
) -> Result<ServiceDescriptor, LauncherError> {
    if let Ok(id) = raw.parse::<ServiceId>() {
        if let Some(descriptor) = resolver.descriptor(id.service_type(), id.variant()) {
            return Ok(descriptor.clone());
        }
    }

    let matches: Vec<&ServiceDescriptor> =
        resolver.descriptors().iter().filter(|d| d.variant == raw).collect();
    match matches.len() {
        0 => Err(LauncherError::UnknownService(raw.to_string())),
        1 => Ok(matches[0].clone()),
        _ => {
            let ids: Vec<String> = matches
                .iter()
                .map(|d| format!("{}.{}", d.service_type, d.variant))
                .collect();
            Err(LauncherError::AmbiguousVariant(raw.to_string(), ids.join(", ")))
        }
    }
}

/// Drive one service instance to completion; returns the process exit
/// code per the entry contract.
pub async fn run_service<C: Clock + 'static>(
    context: &Arc<ProcessContext<C>>,
    descriptor: ServiceDescriptor,
    runner_id: Option<String>,
    parent_name: Option<String>,
) -> i32 {
    let ids = ControllerIds {
        launcher_id: None,
        runner_id,
        parent_name,
        host: context.host().to_string(),
        pid: context.pid(),
    };
    let resolver = context.resolver_snapshot();
    let controller = match Controller::initialize(
        descriptor,
        context.registry(),
        &resolver,
        context.bus(),
        ids,
        context.clock().clone(),
    )
    .await
    {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!(error = %e, "unusable service identity");
            return exit_code::CONFIG;
        }
    };
    context.register_controller(controller.clone());

    let code = if controller.state() == ControllerState::Failed {
        exit_code::FAILURE
    } else if controller.start().await.is_err() {
        exit_code::FAILURE
    } else {
        tokio::select! {
            result = controller.wait() => match result {
                Ok(()) => exit_code::OK,
                Err(e) => {
                    tracing::error!(error = %e, "service ended with error");
                    exit_code::FAILURE
                }
            },
            _ = signal::wait_for_shutdown() => {
                match controller.stop(STOP_GRACE).await {
                    Ok(()) => exit_code::OK,
                    Err(e) => {
                        tracing::error!(error = %e, "stop failed");
                        exit_code::FAILURE
                    }
                }
            }
        }
    };

    if let Some(bus) = context.bus() {
        if let Err(e) = bus.flush().await {
            tracing::warn!(error = %e, "final flush failed");
        }
    }
    code
}
