// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::checks::{Denial, is_authorized_user};
use super::{CommandContext, CommandResponse, CommandResult};
use crate::discord::utils::embeds::{ERROR_COLOR, MODMAIL_COLOR, error_embed, titled_embed};
use crate::discord::utils::permissions::{has_permission, member_standing};
use crate::discord::utils::users::{avatar_url, user_tag};
use miette::IntoDiagnostic;
use std::future::IntoFuture;
use twilight_http::request::AuditLogReason;
use twilight_mention::fmt::Mention;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{RoleMarker, UserMarker};
use twilight_util::builder::embed::{EmbedFieldBuilder, EmbedFooterBuilder, ImageSource};

const USAGE_HELP: &str = "Please provide both a user and a role.\n\n**Usage:** `role @user @role`";

#[derive(Debug, PartialEq, Eq)]
enum HierarchyProblem {
	AboveBot,
	AboveAuthor,
}

/// Parses a user mention (`<@id>` or `<@!id>`) or a raw user ID
fn parse_user_id(text: &str) -> Option<Id<UserMarker>> {
	let id = match text.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
		Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
		None => text,
	};
	id.parse::<u64>().ok().and_then(Id::new_checked)
}

/// Parses a role mention (`<@&id>`) or a raw role ID
fn parse_role_id(text: &str) -> Option<Id<RoleMarker>> {
	let id = text
		.strip_prefix("<@&")
		.and_then(|rest| rest.strip_suffix('>'))
		.unwrap_or(text);
	id.parse::<u64>().ok().and_then(Id::new_checked)
}

/// Roles can only be handed out from below the bot's highest role, and from below the author's unless they own the
/// server.
fn check_hierarchy(
	role_position: i64,
	bot_highest_position: i64,
	author_highest_position: i64,
	author_is_owner: bool,
) -> Result<(), HierarchyProblem> {
	if role_position >= bot_highest_position {
		return Err(HierarchyProblem::AboveBot);
	}
	if role_position >= author_highest_position && !author_is_owner {
		return Err(HierarchyProblem::AboveAuthor);
	}
	Ok(())
}

pub async fn role(context: &CommandContext<'_>, args: &str) -> CommandResult {
	let bot_state = &context.bot_state;
	let author = &context.message.author;
	is_authorized_user(author.id, bot_state.config.access.role_admin_id)?;
	let Some(guild_id) = context.message.guild_id else {
		return Err(Denial::GuildOnly.into());
	};

	let mut arguments = args.split_whitespace();
	let target = arguments.next().and_then(parse_user_id);
	let role_id = arguments.next().and_then(parse_role_id);
	let (Some(target), Some(role_id)) = (target, role_id) else {
		let embed = titled_embed("❌ Invalid Usage", USAGE_HELP, ERROR_COLOR)
			.field(EmbedFieldBuilder::new(
				"Examples:",
				"• `role @JohnDoe @Moderator`\n• `role 123456789012345678 987654321098765432`",
			))
			.validate()
			.into_diagnostic()?
			.build();
		return Ok(CommandResponse::Transient(embed));
	};

	let http_client = &bot_state.http_client;
	let roles_future = http_client.roles(guild_id).into_future();
	let member_future = http_client.guild_member(guild_id, target).into_future();
	let (roles, member) = tokio::join!(roles_future, member_future);
	let roles = roles.into_diagnostic()?.models().await.into_diagnostic()?;
	let Some(role) = roles.into_iter().find(|role| role.id == role_id) else {
		let embed = error_embed("❌ Invalid Usage", "That role doesn't exist on this server.").into_diagnostic()?;
		return Ok(CommandResponse::Transient(embed));
	};
	let member = match member {
		Ok(response) => response.model().await.into_diagnostic()?,
		Err(error) => {
			tracing::debug!(source = ?error, user = %target, "role target isn't a member");
			let embed = error_embed("❌ Invalid Usage", "That user isn't a member of this server.").into_diagnostic()?;
			return Ok(CommandResponse::Transient(embed));
		}
	};

	let bot_standing_future = member_standing(guild_id, bot_state.bot_user_id, http_client);
	let author_standing_future = member_standing(guild_id, author.id, http_client);
	let (bot_standing, author_standing) = tokio::join!(bot_standing_future, author_standing_future);
	let bot_standing = bot_standing?;
	let author_standing = author_standing?;

	if !has_permission(bot_standing.permissions, Permissions::MANAGE_ROLES) {
		let embed = error_embed(
			"❌ Bot Permission Error",
			"I don't have permission to manage roles in this server.",
		)
		.into_diagnostic()?;
		return Ok(CommandResponse::Transient(embed));
	}
	let hierarchy = check_hierarchy(
		role.position,
		bot_standing.highest_role_position,
		author_standing.highest_role_position,
		author_standing.is_owner,
	);
	if let Err(problem) = hierarchy {
		let (subject, holder) = match problem {
			HierarchyProblem::AboveBot => ("I", "my"),
			HierarchyProblem::AboveAuthor => ("You", "your"),
		};
		let embed = error_embed(
			"❌ Role Hierarchy Error",
			&format!(
				"{} cannot manage the role `{}` because it's higher than or equal to {} highest role in the hierarchy.",
				subject, role.name, holder
			),
		)
		.into_diagnostic()?;
		return Ok(CommandResponse::Transient(embed));
	}

	let author_tag = user_tag(author);
	let had_role = member.roles.contains(&role_id);
	if had_role {
		http_client
			.remove_guild_member_role(guild_id, target, role_id)
			.reason(&format!("Role removed by {}", author_tag))
			.await
			.into_diagnostic()?;
	} else {
		http_client
			.add_guild_member_role(guild_id, target, role_id)
			.reason(&format!("Role added by {}", author_tag))
			.await
			.into_diagnostic()?;
	}
	tracing::info!(user = %target, role = %role_id, removed = had_role, by = %author.id, "toggled member role");

	let (title, description, action) = if had_role {
		(
			"✅ Role Removed",
			format!("Successfully removed the role `{}` from {}.", role.name, target.mention()),
			"Removed",
		)
	} else {
		(
			"✅ Role Added",
			format!("Successfully added the role `{}` to {}.", role.name, target.mention()),
			"Added",
		)
	};
	let mut footer = EmbedFooterBuilder::new(format!("Action performed by {}", author_tag));
	if let Ok(icon) = ImageSource::url(avatar_url(author.id, author.discriminator, author.avatar.as_ref())) {
		footer = footer.icon_url(icon);
	}
	let mut embed = titled_embed(title, &description, MODMAIL_COLOR)
		.field(EmbedFieldBuilder::new("User", format!("{} ({})", user_tag(&member.user), target)).inline())
		.field(EmbedFieldBuilder::new("Role", role.name.clone()).inline())
		.field(EmbedFieldBuilder::new("Action", action).inline())
		.footer(footer);
	let member_avatar = avatar_url(member.user.id, member.user.discriminator, member.user.avatar.as_ref());
	if let Ok(thumbnail) = ImageSource::url(member_avatar) {
		embed = embed.thumbnail(thumbnail);
	}
	let embed = embed.validate().into_diagnostic()?.build();

	if let Some(log_channel) = bot_state.config.access.role_log_channel {
		let log_result = http_client
			.create_message(log_channel)
			.embeds(&[embed.clone()])
			.await;
		if let Err(error) = log_result {
			tracing::warn!(source = ?error, channel = %log_channel, "failed to copy role change to the log channel");
		}
	}

	Ok(CommandResponse::Embed(embed))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_users_from_mentions_and_ids() {
		let expected = Some(Id::new(498952210701352981));
		assert_eq!(parse_user_id("<@498952210701352981>"), expected);
		assert_eq!(parse_user_id("<@!498952210701352981>"), expected);
		assert_eq!(parse_user_id("498952210701352981"), expected);
		assert_eq!(parse_user_id("<@&498952210701352981>"), None);
		assert_eq!(parse_user_id("someone"), None);
		assert_eq!(parse_user_id("0"), None);
	}

	#[test]
	fn parses_roles_from_mentions_and_ids() {
		let expected = Some(Id::new(1407804143892172810));
		assert_eq!(parse_role_id("<@&1407804143892172810>"), expected);
		assert_eq!(parse_role_id("1407804143892172810"), expected);
		assert_eq!(parse_role_id("<@1407804143892172810>"), None);
	}

	#[test]
	fn roles_must_sit_below_the_bot() {
		assert_eq!(check_hierarchy(5, 5, 10, true), Err(HierarchyProblem::AboveBot));
		assert_eq!(check_hierarchy(6, 5, 10, false), Err(HierarchyProblem::AboveBot));
		assert_eq!(check_hierarchy(4, 5, 10, false), Ok(()));
	}

	#[test]
	fn roles_must_sit_below_the_author_unless_owner() {
		assert_eq!(check_hierarchy(4, 10, 4, false), Err(HierarchyProblem::AboveAuthor));
		assert_eq!(check_hierarchy(4, 10, 4, true), Ok(()));
		assert_eq!(check_hierarchy(4, 10, 0, true), Ok(()));
	}
}
