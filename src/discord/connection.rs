// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::incoming_messages::handle_message;
use super::platform::DiscordPlatform;
use super::state::BotState;
use crate::config::ConfigData;
use crate::tickets::{TicketController, TicketPlatform};
use miette::IntoDiagnostic;
use std::sync::Arc;
use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_http::client::Client;
use twilight_model::gateway::event::Event;

pub fn set_up_client(config: &ConfigData) -> Arc<Client> {
	Arc::new(Client::new(config.discord.bot_token.clone()))
}

pub async fn run_bot(config: Arc<ConfigData>, http_client: Arc<Client>) -> miette::Result<()> {
	let intents = Intents::GUILDS
		| Intents::GUILD_MEMBERS
		| Intents::GUILD_MESSAGES
		| Intents::DIRECT_MESSAGES
		| Intents::MESSAGE_CONTENT;

	let mut shard = Shard::new(ShardId::ONE, config.discord.bot_token.clone(), intents);

	let cache = Arc::new(
		DefaultInMemoryCache::builder()
			.resource_types(ResourceType::GUILD | ResourceType::CHANNEL | ResourceType::MEMBER | ResourceType::ROLE)
			.build(),
	);

	let bot_user_id = {
		let bot_user_response = http_client.current_user().await.into_diagnostic()?;
		bot_user_response.model().await.into_diagnostic()?.id
	};

	let platform: Arc<dyn TicketPlatform> = Arc::new(DiscordPlatform::new(
		&config,
		Arc::clone(&http_client),
		Arc::clone(&cache),
		bot_user_id,
	));
	let tickets = Arc::new(TicketController::new(platform, config.tickets.close_delay));
	let bot_state = Arc::new(BotState::new(
		Arc::clone(&config),
		http_client,
		cache,
		tickets,
		bot_user_id,
		shard.sender(),
	));

	while let Some(event) = shard.next_event(EventTypeFlags::all()).await {
		let event = match event {
			Ok(event) => event,
			Err(error) => {
				tracing::warn!(source = ?error, "error receiving event");
				continue;
			}
		};
		bot_state.cache.update(&event);

		match &event {
			Event::GatewayHeartbeatAck => {
				bot_state.record_latency(shard.latency().average()).await;
				continue;
			}
			Event::GatewayClose(_) if bot_state.shutdown_requested() => {
				tracing::info!("gateway connection closed for shutdown");
				break;
			}
			_ => (),
		}

		tokio::spawn(handle_event(event, Arc::clone(&bot_state)));
	}

	Ok(())
}

async fn handle_event(event: Event, bot_state: Arc<BotState>) {
	let event_result = handle_event_route(event, &bot_state).await;
	if let Err(error) = event_result {
		tracing::error!(source = ?error, "An error occurred handling a gateway event");
	}
}

async fn handle_event_route(event: Event, bot_state: &Arc<BotState>) -> miette::Result<()> {
	match event {
		Event::MessageCreate(message) => handle_message(&message, bot_state).await?,
		Event::Ready(ready) => {
			tracing::info!(user = %ready.user.name, "Discord gateway is ready");
			if let Err(error) = bot_state.set_presence(&bot_state.presence().await).await {
				tracing::warn!(source = ?error, "failed to set presence");
			}
			let adopted = bot_state.tickets.reconcile().await?;
			if adopted > 0 {
				tracing::info!(adopted, "restored open tickets from existing channels");
			}
		}
		_ => (),
	}
	Ok(())
}
