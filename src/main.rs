//! HTN status bot entry point
//!
//! 1. Loads `.env` and the environment configuration
//! 2. Connects to the Discord gateway, reconnecting when a session drops
//! 3. On READY, registers slash commands and starts the channel refresher
//! 4. Answers interactions on their own tasks
//! 5. On Ctrl+C, stops the refresher, releases the HTTP client and closes
//!    the gateway, in that order

use anyhow::Context;
use htn_status_bot::{
    commands::{self, Command, Responder},
    constants::GATEWAY_RECONNECT_DELAY_SECS,
    context::AppContext,
    logging::init_logging,
    platform::{
        gateway::ReadyInfo, DiscordRest, Gateway, GatewayEvent, Interaction, PresenceHandle,
    },
    Config,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

const EVENT_BUFFER: usize = 64;
const GATEWAY_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Configuration failed")?;
    init_logging(&config.log_level, &config.log_format);

    info!("HTN status bot starting");
    if config.api_url.is_none() {
        warn!("API_URL is not configured; Hoosat metrics and commands are disabled");
    }

    let (presence, presence_rx) = PresenceHandle::new();
    let gateway = Gateway::new(config.token.clone(), presence_rx);
    let context = AppContext::build(config, presence, gateway.latency())
        .context("Failed to build HTTP client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
    let mut supervisor = tokio::spawn(supervise(gateway, event_tx, shutdown_rx));

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut commands_synced = false;

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown initiated");
                break;
            }
            event = event_rx.recv() => match event {
                Some(GatewayEvent::Ready(ready)) => {
                    on_ready(&context, &ready, &mut commands_synced).await;
                }
                Some(GatewayEvent::Interaction(interaction)) => {
                    tokio::spawn(handle_interaction(
                        context.responder.clone(),
                        context.rest.clone(),
                        interaction,
                    ));
                }
                None => {
                    error!("Gateway supervisor stopped");
                    break;
                }
            },
        }
    }

    drop(event_rx);
    context.shutdown().await;

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(GATEWAY_CLOSE_TIMEOUT, &mut supervisor).await {
        Ok(_) => info!("Gateway closed"),
        Err(_) => {
            warn!("Gateway did not close in time");
            supervisor.abort();
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Keeps a gateway session alive until shutdown
async fn supervise(
    gateway: Gateway,
    events: mpsc::Sender<GatewayEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let delay = Duration::from_secs(GATEWAY_RECONNECT_DELAY_SECS);

    while !*shutdown.borrow() {
        match gateway.run(events.clone(), shutdown.clone()).await {
            Ok(()) => return,
            Err(e) => warn!(
                error = %e,
                retry_in_secs = delay.as_secs(),
                "Gateway session ended"
            ),
        }

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn on_ready(context: &AppContext, ready: &ReadyInfo, commands_synced: &mut bool) {
    info!(user = %ready.username, "Logged in");

    if !*commands_synced {
        let guild_id = context.config.guild_id;
        match context
            .rest
            .register_commands(ready.application_id, guild_id, &commands::definitions())
            .await
        {
            Ok(()) => {
                *commands_synced = true;
                match guild_id {
                    Some(guild) => info!(guild_id = guild, "Synced app commands to guild"),
                    None => info!("Synced app commands globally"),
                }
            }
            Err(e) => warn!(error = %e, "Failed to sync app commands"),
        }
    }

    context.start_refresher().await;
}

async fn handle_interaction(
    responder: Arc<Responder>,
    rest: DiscordRest,
    interaction: Interaction,
) {
    let Some(command) = Command::from_interaction(&interaction) else {
        tracing::debug!(interaction_id = interaction.id, "Ignoring unknown interaction");
        return;
    };

    if let Err(e) = responder.answer(&rest, &interaction, &command).await {
        warn!(command = command.name(), error = %e, "Failed to answer interaction");
    }
}
