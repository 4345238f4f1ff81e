// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::checks::require_staff_ticket;
use super::{CommandContext, CommandResponse, CommandResult};
use crate::discord::state::BotState;
use crate::discord::utils::embeds::{MODMAIL_COLOR, WARNING_COLOR, error_embed, titled_embed};
use crate::discord::utils::permissions::{has_permission, member_standing};
use crate::discord::utils::users::{UserData, avatar_url, get_member_data};
use crate::tickets::{ClaimOutcome, UnclaimOutcome};
use miette::IntoDiagnostic;
use twilight_mention::fmt::Mention;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;
use twilight_util::builder::embed::{EmbedFieldBuilder, ImageSource};

const NO_TICKET_USER: &str = "Could not find the user for this ticket.";

/// Looks up a user's names for display, falling back to a mention if Discord can't find them
async fn user_data(bot_state: &BotState, user: Id<UserMarker>) -> UserData {
	match get_member_data(&bot_state.http_client, bot_state.config.discord.guild_id, user).await {
		Ok(data) => data,
		Err(error) => {
			tracing::debug!(source = ?error, %user, "couldn't look up user data");
			let mention = user.mention().to_string();
			UserData {
				display_name: mention.clone(),
				tag: mention,
			}
		}
	}
}

pub async fn claim(context: &CommandContext<'_>) -> CommandResult {
	require_staff_ticket(context).await?;
	let tickets = &context.bot_state.tickets;
	let channel_id = context.channel_id();
	let author = &context.message.author;

	let embed = match tickets.claim(channel_id, author.id).await {
		ClaimOutcome::Claimed => {
			let Some(user) = tickets.ticket_user(channel_id, None).await else {
				return Ok(CommandResponse::Embed(error_embed("❌ Error", NO_TICKET_USER).into_diagnostic()?));
			};
			let user_tag = user_data(&context.bot_state, user).await.tag;
			let mut embed = titled_embed(
				"📌 Ticket Claimed",
				&format!("{} has claimed this ticket", author.id.mention()),
				MODMAIL_COLOR,
			)
			.field(EmbedFieldBuilder::new("User", format!("{} ({})", user_tag, user)).inline())
			.field(EmbedFieldBuilder::new("Claimed by", author.id.mention().to_string()).inline());
			if let Ok(thumbnail) = ImageSource::url(avatar_url(author.id, author.discriminator, author.avatar.as_ref())) {
				embed = embed.thumbnail(thumbnail);
			}
			embed.validate().into_diagnostic()?.build()
		}
		ClaimOutcome::AlreadyClaimed(claimer) => {
			let claimer_name = user_data(&context.bot_state, claimer).await.display_name;
			error_embed(
				"❌ Already Claimed",
				&format!("This ticket is already claimed by {}", claimer_name),
			)
			.into_diagnostic()?
		}
		ClaimOutcome::NoTicket => error_embed("❌ Error", NO_TICKET_USER).into_diagnostic()?,
	};
	Ok(CommandResponse::Embed(embed))
}

pub async fn unclaim(context: &CommandContext<'_>) -> CommandResult {
	require_staff_ticket(context).await?;
	let bot_state = &context.bot_state;
	let tickets = &bot_state.tickets;
	let channel_id = context.channel_id();
	let author_id = context.author_id();

	// Permission lookups only matter when someone else holds the claim.
	let has_override = match tickets.claimer(channel_id).await {
		Some(claimer) if claimer != author_id => {
			let standing = member_standing(bot_state.config.discord.guild_id, author_id, &bot_state.http_client).await?;
			has_permission(standing.permissions, Permissions::MANAGE_CHANNELS)
		}
		_ => false,
	};

	let embed = match tickets.unclaim(channel_id, author_id, has_override).await {
		UnclaimOutcome::Unclaimed { previous } => {
			let user = tickets.ticket_user(channel_id, None).await;
			let previous_name = user_data(bot_state, previous).await.display_name;
			let mut embed = titled_embed(
				"📌 Ticket Unclaimed",
				&format!("This ticket has been unclaimed by {}", author_id.mention()),
				WARNING_COLOR,
			);
			if let Some(user) = user {
				let user_tag = user_data(bot_state, user).await.tag;
				embed = embed.field(EmbedFieldBuilder::new("User", format!("{} ({})", user_tag, user)).inline());
			}
			embed
				.field(EmbedFieldBuilder::new("Previously claimed by", previous_name).inline())
				.field(EmbedFieldBuilder::new("Unclaimed by", author_id.mention().to_string()).inline())
				.validate()
				.into_diagnostic()?
				.build()
		}
		UnclaimOutcome::NotClaimed => {
			error_embed("❌ Not Claimed", "This ticket is not currently claimed.").into_diagnostic()?
		}
		UnclaimOutcome::PermissionDenied(claimer) => error_embed(
			"❌ Permission Denied",
			&format!(
				"Only {} or someone with Manage Channels permission can unclaim this ticket.",
				claimer.mention()
			),
		)
		.into_diagnostic()?,
	};
	Ok(CommandResponse::Embed(embed))
}
