// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::commands::{CommandContext, route_command};
use super::state::BotState;
use super::utils::timestamp::datetime_from_timestamp;
use super::utils::users::requester_from_user;
use crate::tickets::TicketError;
use crate::tickets::lifecycle::InboundTicketMessage;
use crate::tickets::router::{InboundMessage, Route, classify};
use chrono::Utc;
use miette::IntoDiagnostic;
use std::sync::Arc;
use twilight_model::channel::message::{AllowedMentions, Message};

pub async fn handle_message(message: &Message, bot_state: &Arc<BotState>) -> miette::Result<()> {
	if message.guild_id.is_some_and(|guild_id| guild_id != bot_state.config.discord.guild_id) {
		return Ok(());
	}

	let inbound = InboundMessage {
		content: &message.content,
		channel_id: message.channel_id,
		is_direct: message.guild_id.is_none(),
		author_is_bot: message.author.bot,
	};
	let route = classify(
		&inbound,
		&bot_state.config.discord.command_prefix,
		bot_state.auto_response_channel(),
	);

	match route {
		Route::Command(invocation) => {
			let context = CommandContext {
				message,
				bot_state: Arc::clone(bot_state),
			};
			route_command(&context, invocation).await;
		}
		Route::AutoResponse => {
			bot_state
				.http_client
				.create_message(message.channel_id)
				.content(&bot_state.config.auto_response.message)
				.allowed_mentions(Some(&AllowedMentions::default()))
				.await
				.into_diagnostic()?;
			tracing::debug!(user = %message.author.id, channel = %message.channel_id, "sent auto-response");
		}
		Route::DirectMessage => forward_direct_message(message, bot_state).await?,
		Route::Ignore => (),
	}

	Ok(())
}

async fn forward_direct_message(message: &Message, bot_state: &BotState) -> miette::Result<()> {
	let requester = requester_from_user(&message.author);
	let channel = match bot_state.tickets.find_or_create_ticket(&requester).await {
		Ok((channel, _)) => channel,
		Err(TicketError::Configuration(error)) => {
			tracing::error!(%error, user = %requester.id, "can't open a ticket until the configuration is fixed");
			return Ok(());
		}
		Err(error) => return Err(error.into()),
	};

	let inbound = InboundTicketMessage {
		content: message.content.clone(),
		attachment_urls: message
			.attachments
			.iter()
			.map(|attachment| attachment.url.clone())
			.collect(),
		sent_at: datetime_from_timestamp(&message.timestamp).unwrap_or_else(Utc::now),
	};
	bot_state.tickets.forward_message(channel, &requester, inbound).await;
	Ok(())
}
