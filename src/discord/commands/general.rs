// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::checks::require_staff;
use super::{CommandContext, CommandResponse, CommandResult};
use crate::discord::utils::embeds::{ERROR_COLOR, INFO_COLOR, MODMAIL_COLOR, titled_embed};
use miette::IntoDiagnostic;
use std::time::Duration;
use twilight_mention::fmt::Mention;
use twilight_util::builder::embed::{EmbedFieldBuilder, EmbedFooterBuilder};

pub fn help(context: &CommandContext<'_>) -> CommandResult {
	let prefix = &context.bot_state.config.discord.command_prefix;
	let staff_commands = [
		("reply <message>", "Reply to a ticket"),
		("a_reply <message>", "Send anonymous reply"),
		("close [reason]", "Close a ticket"),
		("claim", "Claim a ticket"),
		("unclaim", "Release a claimed ticket"),
		("repair", "Repair bot issues"),
	];
	let general_commands = [
		("help", "Show this help message"),
		("uptime", "Show bot uptime"),
		("toggle_whitelist", "Toggle whitelist auto-response"),
	];
	let list = |commands: &[(&str, &str)]| {
		commands
			.iter()
			.map(|(usage, description)| format!("• `{}{}` - {}", prefix, usage, description))
			.collect::<Vec<String>>()
			.join("\n")
	};

	let embed = titled_embed("🤖 Modmail Bot Commands", "Here are the available commands:", INFO_COLOR)
		.field(EmbedFieldBuilder::new("Staff Commands", list(&staff_commands[..])))
		.field(EmbedFieldBuilder::new("General", list(&general_commands[..])))
		.footer(EmbedFooterBuilder::new("Note: Staff commands only work in ticket channels"))
		.validate()
		.into_diagnostic()?
		.build();
	Ok(CommandResponse::Embed(embed))
}

pub fn uptime(context: &CommandContext<'_>) -> CommandResult {
	let uptime = format_uptime(context.bot_state.uptime());
	let embed = titled_embed(
		"⏰ Bot Uptime",
		&format!("Bot has been running for: **{}**", uptime),
		MODMAIL_COLOR,
	)
	.validate()
	.into_diagnostic()?
	.build();
	Ok(CommandResponse::Embed(embed))
}

pub fn toggle_whitelist(context: &CommandContext<'_>) -> CommandResult {
	require_staff(context)?;
	let bot_state = &context.bot_state;
	let enabled = bot_state.toggle_auto_response();
	tracing::info!(enabled, by = %context.author_id(), "toggled auto-response");

	let (status, color) = if enabled {
		("enabled", MODMAIL_COLOR)
	} else {
		("disabled", ERROR_COLOR)
	};
	let title = if enabled {
		"🔄 Whitelist Auto-Response Enabled"
	} else {
		"🔄 Whitelist Auto-Response Disabled"
	};
	let mut embed = titled_embed(
		title,
		&format!("The whitelist auto-response has been **{}**.", status),
		color,
	);
	if enabled {
		let channel = match bot_state.config.auto_response.channel {
			Some(channel) => channel.mention().to_string(),
			None => String::from("No channel configured"),
		};
		embed = embed.field(EmbedFieldBuilder::new("Channel", channel));
	}
	Ok(CommandResponse::Embed(embed.validate().into_diagnostic()?.build()))
}

/// Formats a duration as days, hours, minutes, and seconds, leaving off leading units that are zero.
pub fn format_uptime(uptime: Duration) -> String {
	let total_seconds = uptime.as_secs();
	let days = total_seconds / 86_400;
	let hours = (total_seconds % 86_400) / 3_600;
	let minutes = (total_seconds % 3_600) / 60;
	let seconds = total_seconds % 60;

	if days > 0 {
		format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
	} else if hours > 0 {
		format!("{}h {}m {}s", hours, minutes, seconds)
	} else if minutes > 0 {
		format!("{}m {}s", minutes, seconds)
	} else {
		format!("{}s", seconds)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn leading_zero_units_are_dropped() {
		assert_eq!(format_uptime(Duration::from_secs(0)), "0s");
		assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
		assert_eq!(format_uptime(Duration::from_secs(61)), "1m 1s");
		assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h 0m 0s");
		assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m 1s");
	}

	#[test]
	fn partial_seconds_are_truncated() {
		assert_eq!(format_uptime(Duration::from_millis(1_999)), "1s");
	}
}
