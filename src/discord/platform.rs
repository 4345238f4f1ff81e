// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::utils::embeds::{archive_embed, notice_message};
use super::utils::permissions::ticket_channel_permissions;
use super::utils::timestamp::datetime_from_timestamp;
use super::utils::users::user_tag;
use crate::config::ConfigData;
use crate::tickets::platform::{ArchiveRecord, ChannelSummary};
use crate::tickets::transcript::TranscriptEntry;
use crate::tickets::{ConfigurationError, Delivery, Notice, TicketError, TicketPlatform};
use async_trait::async_trait;
use chrono::Utc;
use std::future::IntoFuture;
use std::sync::Arc;
use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_http::client::Client;
use twilight_http::error::{Error as HttpError, ErrorType};
use twilight_http::request::AuditLogReason;
use twilight_model::channel::message::Message;
use twilight_model::channel::message::embed::Embed;
use twilight_model::channel::permission_overwrite::{PermissionOverwrite, PermissionOverwriteType};
use twilight_model::channel::{Channel, ChannelType};
use twilight_model::guild::Permissions;
use twilight_model::http::attachment::Attachment;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};

const HISTORY_PAGE_SIZE: u16 = 100;
/// Upper bound on history pages fetched for a single transcript
const MAX_HISTORY_PAGES: usize = 50;

/// Ticket platform backed by the Discord HTTP API.
pub struct DiscordPlatform {
	http_client: Arc<Client>,
	cache: Arc<DefaultInMemoryCache>,
	guild_id: Id<GuildMarker>,
	category: Id<ChannelMarker>,
	staff_role: Id<RoleMarker>,
	transcript_channel: Id<ChannelMarker>,
	owner_id: Option<Id<UserMarker>>,
	bot_user_id: Id<UserMarker>,
}

impl DiscordPlatform {
	pub fn new(
		config: &ConfigData,
		http_client: Arc<Client>,
		cache: Arc<DefaultInMemoryCache>,
		bot_user_id: Id<UserMarker>,
	) -> Self {
		Self {
			http_client,
			cache,
			guild_id: config.discord.guild_id,
			category: config.tickets.category,
			staff_role: config.tickets.staff_role,
			transcript_channel: config.tickets.transcript_channel,
			owner_id: config.access.owner_id,
			bot_user_id,
		}
	}

	fn guild_icon_url(&self) -> Option<String> {
		let guild = self.cache.guild(self.guild_id)?;
		let icon = guild.icon()?;
		Some(format!("https://cdn.discordapp.com/icons/{}/{}.png", self.guild_id, icon))
	}

	async fn fetch_channel(&self, channel_id: Id<ChannelMarker>) -> Result<Option<Channel>, TicketError> {
		match self.http_client.channel(channel_id).await {
			Ok(response) => Ok(Some(response.model().await.map_err(TicketError::platform)?)),
			Err(error) if is_missing(&error) => Ok(None),
			Err(error) => Err(TicketError::platform(error)),
		}
	}

	async fn owner_is_member(&self, owner_id: Id<UserMarker>) -> bool {
		self.http_client.guild_member(self.guild_id, owner_id).await.is_ok()
	}

	async fn ticket_channel_overwrites(&self) -> Vec<PermissionOverwrite> {
		let owner_id = match self.owner_id {
			Some(owner_id) if self.owner_is_member(owner_id).await => Some(owner_id),
			_ => None,
		};
		ticket_channel_overwrites(self.guild_id, self.staff_role, self.bot_user_id, owner_id)
	}
}

/// Hides a ticket channel from everyone except the staff role, the bot, and the owner if they're on the server.
fn ticket_channel_overwrites(
	guild_id: Id<GuildMarker>,
	staff_role: Id<RoleMarker>,
	bot_user_id: Id<UserMarker>,
	owner_id: Option<Id<UserMarker>>,
) -> Vec<PermissionOverwrite> {
	let allowed = ticket_channel_permissions();
	let mut overwrites = vec![
		PermissionOverwrite {
			allow: Permissions::empty(),
			deny: Permissions::VIEW_CHANNEL,
			id: guild_id.cast(),
			kind: PermissionOverwriteType::Role,
		},
		PermissionOverwrite {
			allow: allowed,
			deny: Permissions::empty(),
			id: staff_role.cast(),
			kind: PermissionOverwriteType::Role,
		},
		PermissionOverwrite {
			allow: allowed | Permissions::MANAGE_CHANNELS,
			deny: Permissions::empty(),
			id: bot_user_id.cast(),
			kind: PermissionOverwriteType::Member,
		},
	];
	if let Some(owner_id) = owner_id {
		overwrites.push(PermissionOverwrite {
			allow: allowed,
			deny: Permissions::empty(),
			id: owner_id.cast(),
			kind: PermissionOverwriteType::Member,
		});
	}
	overwrites
}

#[async_trait]
impl TicketPlatform for DiscordPlatform {
	async fn verify_ticket_setup(&self) -> Result<(), TicketError> {
		let category_future = self.fetch_channel(self.category);
		let roles_future = self.http_client.roles(self.guild_id).into_future();
		let (category, roles) = tokio::join!(category_future, roles_future);

		match category? {
			Some(channel) if channel.kind == ChannelType::GuildCategory => (),
			_ => return Err(ConfigurationError::TicketCategory(self.category).into()),
		}

		let roles = roles
			.map_err(TicketError::platform)?
			.models()
			.await
			.map_err(TicketError::platform)?;
		if !roles.iter().any(|role| role.id == self.staff_role) {
			return Err(ConfigurationError::StaffRole(self.staff_role).into());
		}

		Ok(())
	}

	async fn ticket_channels(&self) -> Result<Vec<ChannelSummary>, TicketError> {
		let channels = self
			.http_client
			.guild_channels(self.guild_id)
			.await
			.map_err(TicketError::platform)?
			.models()
			.await
			.map_err(TicketError::platform)?;
		let ticket_channels = channels
			.into_iter()
			.filter(|channel| channel.kind == ChannelType::GuildText && channel.parent_id == Some(self.category))
			.filter_map(|channel| {
				channel.name.map(|name| ChannelSummary {
					id: channel.id,
					name,
				})
			})
			.collect();
		Ok(ticket_channels)
	}

	async fn create_ticket_channel(&self, name: &str) -> Result<Id<ChannelMarker>, TicketError> {
		let overwrites = self.ticket_channel_overwrites().await;
		let response = self
			.http_client
			.create_guild_channel(self.guild_id, name)
			.kind(ChannelType::GuildText)
			.parent_id(self.category)
			.permission_overwrites(&overwrites)
			.reason("Opened modmail ticket")
			.await;
		let response = match response {
			Ok(response) => response,
			Err(error) if is_missing(&error) => return Err(ConfigurationError::TicketCategory(self.category).into()),
			Err(error) => return Err(TicketError::platform(error)),
		};
		let channel = response.model().await.map_err(TicketError::platform)?;
		Ok(channel.id)
	}

	async fn post(&self, channel: Id<ChannelMarker>, notice: Notice) -> Result<(), TicketError> {
		let guild_icon_url = self.guild_icon_url();
		let message = notice_message(&notice, guild_icon_url.as_deref()).map_err(TicketError::platform)?;
		message
			.set_create_message_data(self.http_client.create_message(channel))
			.await
			.map_err(TicketError::platform)?;
		Ok(())
	}

	async fn direct_message(&self, user: Id<UserMarker>, notice: Notice) -> Result<Delivery, TicketError> {
		let guild_icon_url = self.guild_icon_url();
		let message = notice_message(&notice, guild_icon_url.as_deref()).map_err(TicketError::platform)?;

		let dm_channel = match self.http_client.create_private_channel(user).await {
			Ok(response) => response.model().await.map_err(TicketError::platform)?,
			Err(error) if is_client_error(&error) => {
				tracing::debug!(source = ?error, %user, "couldn't open direct message channel");
				return Ok(Delivery::Undeliverable);
			}
			Err(error) => return Err(TicketError::platform(error)),
		};

		match message
			.set_create_message_data(self.http_client.create_message(dm_channel.id))
			.await
		{
			Ok(_) => Ok(Delivery::Delivered),
			Err(error) if is_client_error(&error) => {
				tracing::debug!(source = ?error, %user, "direct message rejected");
				Ok(Delivery::Undeliverable)
			}
			Err(error) => Err(TicketError::platform(error)),
		}
	}

	async fn history(&self, channel: Id<ChannelMarker>) -> Result<Vec<TranscriptEntry>, TicketError> {
		let mut entries: Vec<TranscriptEntry> = Vec::new();
		let mut before: Option<Id<MessageMarker>> = None;

		for _ in 0..MAX_HISTORY_PAGES {
			let request = self.http_client.channel_messages(channel);
			let response = match before {
				Some(message_id) => request.before(message_id).limit(HISTORY_PAGE_SIZE).await,
				None => request.limit(HISTORY_PAGE_SIZE).await,
			};
			let page = response
				.map_err(TicketError::platform)?
				.models()
				.await
				.map_err(TicketError::platform)?;
			let Some(oldest) = page.last() else {
				break;
			};
			before = Some(oldest.id);
			let page_full = page.len() == usize::from(HISTORY_PAGE_SIZE);
			entries.extend(page.iter().map(transcript_entry));
			if !page_full {
				break;
			}
		}

		// Discord returns newest messages first
		entries.reverse();
		Ok(entries)
	}

	async fn archive(&self, record: ArchiveRecord) -> Result<(), TicketError> {
		let embed = archive_embed(&record).map_err(TicketError::platform)?;
		let attachment = Attachment::from_bytes(record.transcript.file_name.clone(), record.transcript.contents, 1);
		let response = self
			.http_client
			.create_message(self.transcript_channel)
			.embeds(&[embed])
			.attachments(&[attachment])
			.await;
		match response {
			Ok(_) => Ok(()),
			Err(error) if is_missing(&error) => Err(ConfigurationError::ArchiveChannel(self.transcript_channel).into()),
			Err(error) => Err(TicketError::platform(error)),
		}
	}

	async fn delete_channel(&self, channel: Id<ChannelMarker>) -> Result<(), TicketError> {
		match self.http_client.delete_channel(channel).reason("Closed modmail ticket").await {
			Ok(_) => Ok(()),
			Err(error) if response_status(&error) == Some(404) => Ok(()),
			Err(error) => Err(TicketError::platform(error)),
		}
	}
}

fn transcript_entry(message: &Message) -> TranscriptEntry {
	TranscriptEntry {
		author_id: message.author.id,
		author_name: user_tag(&message.author),
		sent_at: datetime_from_timestamp(&message.timestamp).unwrap_or_else(Utc::now),
		content: message.content.clone(),
		embeds: message.embeds.iter().filter_map(embed_text).collect(),
		attachments: message
			.attachments
			.iter()
			.map(|attachment| attachment.url.clone())
			.collect(),
	}
}

fn embed_text(embed: &Embed) -> Option<String> {
	let mut parts: Vec<&str> = Vec::new();
	if let Some(author) = &embed.author {
		parts.push(&author.name);
	}
	if let Some(title) = &embed.title {
		parts.push(title);
	}
	if let Some(description) = &embed.description {
		parts.push(description);
	}
	if parts.is_empty() {
		None
	} else {
		Some(parts.join(": "))
	}
}

fn response_status(error: &HttpError) -> Option<u16> {
	match error.kind() {
		ErrorType::Response { status, .. } => Some(status.get()),
		_ => None,
	}
}

/// Not found, or hidden from the bot
fn is_missing(error: &HttpError) -> bool {
	matches!(response_status(error), Some(403 | 404))
}

fn is_client_error(error: &HttpError) -> bool {
	matches!(response_status(error), Some(400..=499))
}
