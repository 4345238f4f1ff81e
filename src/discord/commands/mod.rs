// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::state::BotState;
use super::utils::embeds::error_embed;
use crate::tickets::TicketError;
use crate::tickets::router::CommandInvocation;
use checks::Denial;
use miette::IntoDiagnostic;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use twilight_model::channel::message::Message;
use twilight_model::channel::message::embed::Embed;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, UserMarker};

pub mod checks;
mod claim;
mod close;
mod general;
mod owner;
mod reply;
mod role;

/// How long transient responses, such as permission denials, stay in the channel
const TRANSIENT_RESPONSE_LIFETIME: Duration = Duration::from_secs(10);

/// The message that invoked a command, with the bot's shared state
pub struct CommandContext<'a> {
	pub message: &'a Message,
	pub bot_state: Arc<BotState>,
}

impl CommandContext<'_> {
	pub fn author_id(&self) -> Id<UserMarker> {
		self.message.author.id
	}

	pub fn channel_id(&self) -> Id<ChannelMarker> {
		self.message.channel_id
	}
}

/// What a command posts back to the channel it was used in
pub enum CommandResponse {
	Embed(Embed),
	/// Deleted after a short delay
	Transient(Embed),
	/// The command has already posted everything it needs to
	Silent,
}

/// Ways a command can end without a normal response
#[derive(Debug)]
pub enum CommandError {
	Denied(Denial),
	Failed(miette::Report),
}

impl From<Denial> for CommandError {
	fn from(denial: Denial) -> Self {
		Self::Denied(denial)
	}
}

impl From<miette::Report> for CommandError {
	fn from(error: miette::Report) -> Self {
		Self::Failed(error)
	}
}

impl From<TicketError> for CommandError {
	fn from(error: TicketError) -> Self {
		Self::Failed(error.into())
	}
}

pub type CommandResult = Result<CommandResponse, CommandError>;

/// Runs a prefix command and posts its response. Unknown commands are ignored.
///
/// Nothing a command does fails past this point; errors are logged and reported in the channel.
pub async fn route_command(context: &CommandContext<'_>, invocation: CommandInvocation<'_>) {
	let args = invocation.args;
	let result = match invocation.name {
		"claim" => claim::claim(context).await,
		"unclaim" => claim::unclaim(context).await,
		"reply" => reply::reply(context, args, false).await,
		"a_reply" => reply::reply(context, args, true).await,
		"close" => close::close(context, args).await,
		"repair" => owner::repair(context).await,
		"restart" => owner::restart(context).await,
		"status" => owner::status(context, args).await,
		"role" => role::role(context, args).await,
		"help" => general::help(context),
		"uptime" => general::uptime(context),
		"toggle_whitelist" => general::toggle_whitelist(context),
		_ => {
			tracing::debug!(command = invocation.name, "ignoring unknown command");
			return;
		}
	};

	let response = match result {
		Ok(response) => response,
		Err(CommandError::Denied(denial)) => {
			tracing::debug!(command = invocation.name, user = %context.author_id(), ?denial, "command denied");
			denial_response(&denial)
		}
		Err(CommandError::Failed(error)) => {
			tracing::error!(source = ?error, command = invocation.name, "command failed");
			match error_embed("❌ Error", &format!("An error occurred while running `{}`.", invocation.name)) {
				Ok(embed) => CommandResponse::Embed(embed),
				Err(_) => CommandResponse::Silent,
			}
		}
	};

	if let Err(error) = send_response(context, response).await {
		tracing::error!(source = ?error, command = invocation.name, "failed to send command response");
	}
}

fn denial_response(denial: &Denial) -> CommandResponse {
	let (title, description) = denial.explanation();
	match error_embed(title, description) {
		Ok(embed) => CommandResponse::Transient(embed),
		Err(_) => CommandResponse::Silent,
	}
}

async fn send_response(context: &CommandContext<'_>, response: CommandResponse) -> miette::Result<()> {
	let (embed, transient) = match response {
		CommandResponse::Embed(embed) => (embed, false),
		CommandResponse::Transient(embed) => (embed, true),
		CommandResponse::Silent => return Ok(()),
	};

	let channel_id = context.channel_id();
	let http_client = &context.bot_state.http_client;
	let sent_message = http_client
		.create_message(channel_id)
		.embeds(&[embed])
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;

	if transient {
		tokio::spawn(expire_response(Arc::clone(&context.bot_state), channel_id, sent_message.id));
	}

	Ok(())
}

async fn expire_response(bot_state: Arc<BotState>, channel_id: Id<ChannelMarker>, message_id: Id<MessageMarker>) {
	sleep(TRANSIENT_RESPONSE_LIFETIME).await;
	if let Err(error) = bot_state.http_client.delete_message(channel_id, message_id).await {
		tracing::debug!(source = ?error, %channel_id, %message_id, "failed to remove transient response");
	}
}
