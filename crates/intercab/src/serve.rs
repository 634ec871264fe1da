// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `intercab serve` command implementation.
//!
//! Opens storage, starts one Telegram bot per configured role, wires the bots
//! into the notification router and runs one sequential role loop per bot.
//! The HTTP gateway runs alongside when enabled. SIGINT/SIGTERM cancel every
//! task; the database is checkpointed and closed last.

use std::sync::Arc;

use intercab_config::model::{IntercabConfig, TelegramConfig};
use intercab_core::error::IntercabError;
use intercab_core::types::Role;
use intercab_core::{ChannelAdapter, PluginAdapter, StorageAdapter};
use intercab_dispatch::{DispatchContext, DispatchSettings, PeerRouter, RoleLoop, install_signal_handler};
use intercab_gateway::GatewayState;
use intercab_storage::SqliteStorage;
use intercab_telegram::TelegramChannel;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Runs the `intercab serve` command.
pub async fn run_serve(config: IntercabConfig) -> Result<(), IntercabError> {
    let bots = configured_bots(&config.telegram);
    if bots.is_empty() {
        return Err(IntercabError::Config(
            "no bot token configured: set at least one of telegram.rider_token, \
             telegram.driver_token, telegram.operator_token"
                .into(),
        ));
    }

    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "intercab starting");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
    info!(path = %config.storage.database_path, "storage ready");

    let mut channels: Vec<(Role, Arc<TelegramChannel>)> = Vec::with_capacity(bots.len());
    for (role, token) in bots {
        let mut channel = TelegramChannel::new(role, token)?;
        channel.connect().await?;
        channels.push((role, Arc::new(channel)));
    }

    let mut router = PeerRouter::new(storage.clone());
    for (role, channel) in &channels {
        router.register(*role, channel.clone());
    }
    for role in [Role::Rider, Role::Driver, Role::Operator] {
        if !router.is_registered(role) {
            warn!(%role, "no bot for role, notifications to it are dropped");
        }
    }

    let ctx = DispatchContext::new(
        storage.clone(),
        Arc::new(router),
        DispatchSettings {
            dispatch: config.dispatch.clone(),
            operator: config.operator.clone(),
        },
    );

    let cancel = install_signal_handler();
    let mut tasks: JoinSet<(String, Result<(), IntercabError>)> = JoinSet::new();

    for (role, channel) in &channels {
        let role = *role;
        let mut role_loop = RoleLoop::new(role, channel.clone(), ctx.clone());
        let loop_cancel = cancel.clone();
        tasks.spawn(async move { (format!("{role} loop"), role_loop.run(loop_cancel).await) });
        info!(%role, "role loop started");
    }

    if config.gateway.enabled {
        let gateway_config = config.gateway.clone();
        let state = GatewayState::new(ctx.clone(), gateway_config.webhook_secret.as_deref());
        let gateway_cancel = cancel.clone();
        tasks.spawn(async move {
            let result =
                intercab_gateway::start_server(&gateway_config, state, gateway_cancel).await;
            ("gateway".to_string(), result)
        });
    } else {
        info!("gateway disabled");
    }

    // One failed task takes the service down with it.
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!(task = %name, "stopped"),
            Ok((name, Err(e))) => {
                error!(task = %name, error = %e, "task failed");
                cancel.cancel();
            }
            Err(e) => {
                error!(error = %e, "task panicked");
                cancel.cancel();
            }
        }
    }

    for (role, channel) in &channels {
        if let Err(e) = channel.shutdown().await {
            warn!(%role, error = %e, "bot shutdown failed");
        }
    }

    storage.close().await?;
    info!("intercab serve shutdown complete");
    Ok(())
}

/// The roles that have a non-empty bot token, in rider, driver, operator order.
fn configured_bots(telegram: &TelegramConfig) -> Vec<(Role, &str)> {
    [
        (Role::Rider, &telegram.rider_token),
        (Role::Driver, &telegram.driver_token),
        (Role::Operator, &telegram.operator_token),
    ]
    .into_iter()
    .filter_map(|(role, token)| {
        token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| (role, t))
    })
    .collect()
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("intercab={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_roles_with_tokens_start() {
        let telegram = TelegramConfig {
            rider_token: Some("1:rider".into()),
            driver_token: Some("   ".into()),
            operator_token: Some("3:operator".into()),
        };
        assert_eq!(
            configured_bots(&telegram),
            vec![(Role::Rider, "1:rider"), (Role::Operator, "3:operator")]
        );
        assert!(configured_bots(&TelegramConfig::default()).is_empty());
    }

    #[tokio::test]
    async fn serve_refuses_to_start_without_bots() {
        let err = run_serve(IntercabConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("telegram.rider_token"));
    }
}
