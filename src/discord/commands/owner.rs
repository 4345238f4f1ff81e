// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::checks::is_authorized_user;
use super::general::format_uptime;
use super::{CommandContext, CommandResponse, CommandResult};
use crate::discord::state::BotState;
use crate::discord::utils::channels::channel_name;
use crate::discord::utils::embeds::{MODMAIL_COLOR, WARNING_COLOR, field_value, titled_embed};
use crate::discord::utils::permissions::{KEY_BOT_PERMISSIONS, has_permission, member_standing};
use crate::discord::utils::timestamp::timestamp_now;
use crate::discord::utils::users::{avatar_url, user_tag};
use miette::IntoDiagnostic;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, ProcessesToUpdate, System};
use tokio::time::sleep;
use twilight_mention::fmt::Mention;
use twilight_model::channel::ChannelType;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource};

const BYTES_PER_GIB: f64 = 1_073_741_824.0;
const BYTES_PER_MIB: f64 = 1_048_576.0;

fn require_owner(context: &CommandContext<'_>) -> Result<(), super::checks::Denial> {
	is_authorized_user(context.author_id(), context.bot_state.config.access.owner_id)
}

/// Resource usage of the host and of this process
struct ResourceUsage {
	cpu_percent: f32,
	memory_percent: f64,
	available_memory: u64,
	process_memory: Option<u64>,
}

async fn resource_usage() -> ResourceUsage {
	let mut system = System::new();
	system.refresh_memory();
	system.refresh_cpu_usage();
	// CPU usage is measured between two refreshes.
	sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
	system.refresh_cpu_usage();

	let process_memory = match sysinfo::get_current_pid() {
		Ok(pid) => {
			system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
			system.process(pid).map(|process| process.memory())
		}
		Err(_) => None,
	};
	let total_memory = system.total_memory();
	let memory_percent = if total_memory > 0 {
		system.used_memory() as f64 / total_memory as f64 * 100.0
	} else {
		0.0
	};

	ResourceUsage {
		cpu_percent: system.global_cpu_usage(),
		memory_percent,
		available_memory: system.available_memory(),
		process_memory,
	}
}

async fn configured_channel_status(label: &str, channel_id: Id<ChannelMarker>, bot_state: &BotState) -> String {
	match channel_name(channel_id, &bot_state.cache, &bot_state.http_client).await {
		Ok(Some(name)) => format!("✅ {}: {}", label, name),
		Ok(None) => format!("✅ {}: {}", label, channel_id),
		Err(error) => {
			tracing::debug!(source = ?error, %channel_id, "configured channel didn't resolve");
			format!("❌ {}: Not Found", label)
		}
	}
}

pub async fn repair(context: &CommandContext<'_>) -> CommandResult {
	require_owner(context)?;
	let bot_state = &context.bot_state;
	let config = &bot_state.config;
	let guild_id = config.discord.guild_id;

	let latency = match bot_state.latency().await {
		Some(latency) => format!("{}ms", latency.as_millis()),
		None => String::from("Unknown"),
	};
	let bot_status = format!(
		"**Ping:** {}\n**Uptime:** {}\n**Status:** Online ✅",
		latency,
		format_uptime(bot_state.uptime())
	);

	let usage = resource_usage().await;
	let process_memory = match usage.process_memory {
		Some(bytes) => format!("{:.1}MB", bytes as f64 / BYTES_PER_MIB),
		None => String::from("Unknown"),
	};
	let system_resources = format!(
		"**RAM Usage:** {:.1}%\n**CPU Usage:** {:.1}%\n**Available RAM:** {:.2}GB\n**Bot Memory:** {}",
		usage.memory_percent,
		usage.cpu_percent,
		usage.available_memory as f64 / BYTES_PER_GIB,
		process_memory
	);

	let os_name = System::name().unwrap_or_else(|| String::from("Unknown"));
	let os_version = System::os_version().unwrap_or_default();
	let version_info = format!(
		"**Bot:** {} {}\n**OS:** {} {}",
		env!("CARGO_PKG_NAME"),
		env!("CARGO_PKG_VERSION"),
		os_name,
		os_version
	);

	let stats = bot_state.tickets.stats().await;
	let ticket_stats = format!(
		"**Active Tickets:** {}\n**Claimed Tickets:** {}\n**Unclaimed Tickets:** {}",
		stats.open,
		stats.claimed,
		stats.open.saturating_sub(stats.claimed)
	);

	let guild_info = {
		let cache = &bot_state.cache;
		let member_count = cache
			.guild(guild_id)
			.and_then(|guild| guild.member_count())
			.map(|count| count.to_string())
			.unwrap_or_else(|| String::from("Unknown"));
		let (text_channels, voice_channels) = match cache.guild_channels(guild_id) {
			Some(channel_ids) => channel_ids.iter().fold((0, 0), |(text, voice), channel_id| {
				match cache.channel(*channel_id).map(|channel| channel.kind) {
					Some(ChannelType::GuildText) => (text + 1, voice),
					Some(ChannelType::GuildVoice) => (text, voice + 1),
					_ => (text, voice),
				}
			}),
			None => (0, 0),
		};
		format!(
			"**Total Members:** {}\n**Text Channels:** {}\n**Voice Channels:** {}",
			member_count, text_channels, voice_channels
		)
	};

	let key_permissions = match member_standing(guild_id, bot_state.bot_user_id, &bot_state.http_client).await {
		Ok(standing) => KEY_BOT_PERMISSIONS
			.iter()
			.map(|(name, permission)| {
				let status = if has_permission(standing.permissions, *permission) {
					"✅"
				} else {
					"❌"
				};
				format!("{} {}", status, name)
			})
			.collect::<Vec<String>>()
			.join("\n"),
		Err(error) => {
			tracing::warn!(source = ?error, "couldn't calculate bot permissions");
			String::from("❌ Unable to read permissions")
		}
	};

	let staff_role_status = match bot_state.cache.role(config.tickets.staff_role) {
		Some(role) => format!("✅ Staff Role: {}", role.resource().name),
		None => String::from("❌ Staff Role: Not Found"),
	};
	let configuration_status = [
		format!("✅ Guild ID: {}", guild_id),
		configured_channel_status("Transcript Channel", config.tickets.transcript_channel, bot_state).await,
		configured_channel_status("Ticket Category", config.tickets.category, bot_state).await,
		staff_role_status,
	]
	.join("\n");

	let author = &context.message.author;
	let mut footer = EmbedFooterBuilder::new(format!("Requested by {}", user_tag(author)));
	if let Ok(icon) = ImageSource::url(avatar_url(author.id, author.discriminator, author.avatar.as_ref())) {
		footer = footer.icon_url(icon);
	}
	let mut embed = EmbedBuilder::new()
		.title("🔧 Bot Diagnostics & Repair Info")
		.color(MODMAIL_COLOR)
		.field(EmbedFieldBuilder::new("🤖 Bot Status", bot_status).inline())
		.field(EmbedFieldBuilder::new("💻 System Resources", system_resources).inline())
		.field(EmbedFieldBuilder::new("📦 Version Info", version_info).inline())
		.field(EmbedFieldBuilder::new("📊 Modmail Stats", ticket_stats).inline())
		.field(EmbedFieldBuilder::new("🏰 Guild Info", guild_info).inline())
		.field(EmbedFieldBuilder::new("🔐 Key Permissions", key_permissions))
		.field(EmbedFieldBuilder::new("⚙️ Configuration Status", field_value(&configuration_status)))
		.footer(footer);
	if let Ok(timestamp) = timestamp_now() {
		embed = embed.timestamp(timestamp);
	}
	Ok(CommandResponse::Embed(embed.validate().into_diagnostic()?.build()))
}

pub async fn restart(context: &CommandContext<'_>) -> CommandResult {
	require_owner(context)?;
	let bot_state = &context.bot_state;

	let embed = titled_embed(
		"🔄 Bot Restarting",
		"Bot is restarting... This may take a few moments.",
		WARNING_COLOR,
	)
	.field(EmbedFieldBuilder::new("Requested by", context.author_id().mention().to_string()).inline())
	.validate()
	.into_diagnostic()?
	.build();
	bot_state
		.http_client
		.create_message(context.channel_id())
		.embeds(&[embed])
		.await
		.into_diagnostic()?;

	tracing::info!(by = %context.author_id(), "restart requested");
	bot_state.request_shutdown()?;
	Ok(CommandResponse::Silent)
}

pub async fn status(context: &CommandContext<'_>, text: &str) -> CommandResult {
	require_owner(context)?;
	let bot_state = &context.bot_state;

	if text.is_empty() {
		let presence = bot_state.presence().await;
		let embed = EmbedBuilder::new()
			.title("🎭 Current Bot Status")
			.color(MODMAIL_COLOR)
			.field(EmbedFieldBuilder::new("Status", "Online").inline())
			.field(EmbedFieldBuilder::new("Activity", format!("Playing {}", presence)).inline())
			.validate()
			.into_diagnostic()?
			.build();
		return Ok(CommandResponse::Embed(embed));
	}

	bot_state.set_presence(text).await?;
	tracing::info!(presence = text, by = %context.author_id(), "presence changed");
	let embed = titled_embed(
		"✅ Status Updated",
		&format!("Bot status changed to: **{}**", text),
		MODMAIL_COLOR,
	)
	.field(EmbedFieldBuilder::new("Changed by", context.author_id().mention().to_string()).inline())
	.validate()
	.into_diagnostic()?
	.build();
	Ok(CommandResponse::Embed(embed))
}
