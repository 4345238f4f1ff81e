// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::checks::require_staff_ticket;
use super::{CommandContext, CommandResponse, CommandResult};
use crate::discord::utils::embeds::{MODMAIL_COLOR, error_embed, field_value, titled_embed};
use crate::discord::utils::users::{avatar_url, display_name};
use crate::tickets::{ReplyAuthor, ReplyOutcome};
use miette::IntoDiagnostic;
use twilight_mention::fmt::Mention;
use twilight_util::builder::embed::EmbedFieldBuilder;

pub async fn reply(context: &CommandContext<'_>, text: &str, anonymous: bool) -> CommandResult {
	require_staff_ticket(context).await?;
	if text.is_empty() {
		let embed = error_embed("❌ Invalid Usage", "Please provide a message to send.").into_diagnostic()?;
		return Ok(CommandResponse::Transient(embed));
	}

	let author = &context.message.author;
	let reply_author = if anonymous {
		ReplyAuthor::Anonymous
	} else {
		let nick = context.message.member.as_ref().and_then(|member| member.nick.as_deref());
		ReplyAuthor::Staff {
			display_name: display_name(author, nick),
			avatar_url: avatar_url(author.id, author.discriminator, author.avatar.as_ref()),
		}
	};

	let outcome = context
		.bot_state
		.tickets
		.relay_reply(context.channel_id(), reply_author, text)
		.await?;
	let kind = if anonymous { "Anonymous Reply" } else { "Reply" };
	let embed = match outcome {
		ReplyOutcome::Delivered(user) => {
			let mut embed = titled_embed(
				&format!("✅ {} Sent", kind),
				&format!(
					"Successfully sent {} to {}",
					kind.to_lowercase(),
					user.mention()
				),
				MODMAIL_COLOR,
			)
			.field(EmbedFieldBuilder::new("Message", field_value(text)))
			.field(EmbedFieldBuilder::new("Sent by", author.id.mention().to_string()).inline());
			if anonymous {
				embed = embed.field(EmbedFieldBuilder::new("Anonymous", "Yes").inline());
			}
			embed.validate().into_diagnostic()?.build()
		}
		ReplyOutcome::Undeliverable(user) => error_embed(
			&format!("❌ {} Failed", kind),
			&format!("Could not send reply to {} (DMs may be disabled)", user.mention()),
		)
		.into_diagnostic()?,
		ReplyOutcome::NoTicket => error_embed("❌ Error", "Could not find the user for this ticket.").into_diagnostic()?,
	};
	Ok(CommandResponse::Embed(embed))
}
