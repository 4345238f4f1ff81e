// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::checks::require_staff_ticket;
use super::{CommandContext, CommandResponse, CommandResult};
use crate::discord::utils::embeds::{MODMAIL_COLOR, error_embed, field_value, titled_embed};
use crate::tickets::lifecycle::DEFAULT_CLOSE_REASON;
use crate::tickets::{CloseOutcome, CloseRequest, TicketError};
use miette::IntoDiagnostic;
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::embed::Embed;
use twilight_util::builder::embed::EmbedFieldBuilder;

pub async fn close(context: &CommandContext<'_>, reason: &str) -> CommandResult {
	require_staff_ticket(context).await?;
	let bot_state = &context.bot_state;
	let channel_id = context.channel_id();
	let author_id = context.author_id();

	let Some(user) = bot_state.tickets.ticket_user(channel_id, None).await else {
		let embed = error_embed("❌ Error", "Could not find the user for this ticket.").into_diagnostic()?;
		return Ok(CommandResponse::Embed(embed));
	};
	if bot_state.tickets.is_closing(channel_id).await {
		return Ok(CommandResponse::Transient(already_closing_embed()?));
	}
	let reason = (!reason.is_empty()).then(|| reason.to_string());

	let closing_embed = titled_embed(
		"🔒 Ticket Closing",
		&format!("Ticket is being closed by {}", author_id.mention()),
		MODMAIL_COLOR,
	)
	.field(EmbedFieldBuilder::new(
		"Reason",
		field_value(reason.as_deref().unwrap_or(DEFAULT_CLOSE_REASON)),
	))
	.field(EmbedFieldBuilder::new("Closed by", author_id.mention().to_string()).inline())
	.validate()
	.into_diagnostic()?
	.build();
	bot_state
		.http_client
		.create_message(channel_id)
		.embeds(&[closing_embed])
		.await
		.into_diagnostic()?;

	let request = CloseRequest {
		channel: channel_id,
		requester: user,
		reason,
		closed_by: author_id,
	};
	match bot_state.tickets.close(request).await {
		Ok(CloseOutcome::Closed(_)) => Ok(CommandResponse::Silent),
		Ok(CloseOutcome::AlreadyClosing) => Ok(CommandResponse::Transient(already_closing_embed()?)),
		Err(TicketError::Configuration(error)) => {
			tracing::error!(%error, channel = %channel_id, "ticket couldn't be archived");
			let embed = error_embed(
				"❌ Error",
				&format!("The ticket was not closed because {}. Check the bot configuration.", error),
			)
			.into_diagnostic()?;
			Ok(CommandResponse::Embed(embed))
		}
		Err(error) => Err(error.into()),
	}
}

fn already_closing_embed() -> miette::Result<Embed> {
	error_embed("❌ Already Closing", "This ticket is already being closed.").into_diagnostic()
}
