// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::timestamp::{timestamp_from_datetime, timestamp_now};
use crate::tickets::platform::ArchiveRecord;
use crate::tickets::{Notice, ReplyAuthor};
use twilight_http::request::channel::message::create_message::CreateMessage;
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::channel::message::embed::Embed;
use twilight_util::builder::embed::{
	EmbedAuthorBuilder, EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource,
};
use twilight_validate::embed::EmbedValidationError;

pub const MODMAIL_COLOR: u32 = 0x00ff00;
pub const ERROR_COLOR: u32 = 0xff0000;
pub const INFO_COLOR: u32 = 0x0099ff;
pub const WARNING_COLOR: u32 = 0xffaa00;
pub const FORWARDED_COLOR: u32 = 0x3498db;

const FIELD_VALUE_LIMIT: usize = 1024;

/// Contains data necessary to post a ticket message
pub struct TicketMessageData {
	pub content: Option<String>,
	pub embeds: Vec<Embed>,
	pub allowed_mentions: AllowedMentions,
}

impl TicketMessageData {
	fn text(content: String) -> Self {
		Self {
			content: Some(content),
			embeds: Vec::new(),
			allowed_mentions: AllowedMentions::default(),
		}
	}

	fn embed(embed: Embed) -> Self {
		Self {
			content: None,
			embeds: vec![embed],
			allowed_mentions: AllowedMentions::default(),
		}
	}

	/// Adds all of the ticket message data to a [CreateMessage] builder
	pub fn set_create_message_data<'a>(&'a self, mut create_message: CreateMessage<'a>) -> CreateMessage<'a> {
		if let Some(content) = &self.content {
			create_message = create_message.content(content);
		}
		create_message
			.embeds(&self.embeds)
			.allowed_mentions(Some(&self.allowed_mentions))
	}
}

/// Cuts text down to fit in an embed field
pub fn field_value(text: &str) -> String {
	if text.chars().count() <= FIELD_VALUE_LIMIT {
		return text.to_string();
	}
	let mut shortened: String = text.chars().take(FIELD_VALUE_LIMIT - 3).collect();
	shortened.push_str("...");
	shortened
}

pub fn titled_embed(title: &str, description: &str, color: u32) -> EmbedBuilder {
	EmbedBuilder::new().title(title).description(description).color(color)
}

pub fn error_embed(title: &str, description: &str) -> Result<Embed, EmbedValidationError> {
	Ok(titled_embed(title, description, ERROR_COLOR).validate()?.build())
}

/// Generates the message data for a notice from the ticket system.
///
/// `guild_icon_url` is shown on anonymous staff replies.
pub fn notice_message(notice: &Notice, guild_icon_url: Option<&str>) -> Result<TicketMessageData, EmbedValidationError> {
	let message = match notice {
		Notice::TicketIntroduction {
			requester,
			account_created,
		} => {
			let account_created = account_created
				.map(|created| created.format("%Y-%m-%d").to_string())
				.unwrap_or_else(|| String::from("Unknown"));
			let mut embed = titled_embed(
				"New Modmail Thread",
				&format!("Thread created for {} ({})", requester.id.mention(), requester.tag),
				MODMAIL_COLOR,
			)
			.field(EmbedFieldBuilder::new("User ID", requester.id.to_string()).inline())
			.field(EmbedFieldBuilder::new("Account Created", account_created).inline());
			if let Ok(avatar) = ImageSource::url(&requester.avatar_url) {
				embed = embed.thumbnail(avatar);
			}
			TicketMessageData::embed(embed.validate()?.build())
		}
		Notice::TicketCreated => {
			let embed = titled_embed(
				"📬 Modmail Ticket Created",
				"Your modmail ticket has been successfully created! A staff member will respond to you as soon as possible.",
				MODMAIL_COLOR,
			)
			.field(EmbedFieldBuilder::new(
				"What happens next?",
				"• Your message has been forwarded to our staff team\n• You will receive a response here in DMs\n• Feel free to send additional messages if needed",
			))
			.footer(EmbedFooterBuilder::new("Please be patient while we review your message"))
			.validate()?
			.build();
			TicketMessageData::embed(embed)
		}
		Notice::Forwarded {
			author,
			content,
			sent_at,
		} => {
			let mut embed_author = EmbedAuthorBuilder::new(format!("{} ({})", author.tag, author.id));
			if let Ok(avatar) = ImageSource::url(&author.avatar_url) {
				embed_author = embed_author.icon_url(avatar);
			}
			let description = if content.is_empty() {
				"*No text content*"
			} else {
				content.as_str()
			};
			let mut embed = EmbedBuilder::new()
				.description(description)
				.author(embed_author)
				.color(FORWARDED_COLOR);
			if let Ok(timestamp) = timestamp_from_datetime(sent_at) {
				embed = embed.timestamp(timestamp);
			}
			TicketMessageData::embed(embed.validate()?.build())
		}
		Notice::Attachment { url } => TicketMessageData::text(format!("📎 **Attachment:** {}", url)),
		Notice::Reply { author, content } => {
			let embed_author = match author {
				ReplyAuthor::Staff {
					display_name,
					avatar_url,
				} => {
					let embed_author = EmbedAuthorBuilder::new(display_name.as_str());
					match ImageSource::url(avatar_url) {
						Ok(avatar) => embed_author.icon_url(avatar),
						Err(_) => embed_author,
					}
				}
				ReplyAuthor::Anonymous => {
					let embed_author = EmbedAuthorBuilder::new("Staff");
					match guild_icon_url.map(ImageSource::url) {
						Some(Ok(icon)) => embed_author.icon_url(icon),
						_ => embed_author,
					}
				}
			};
			let mut embed = EmbedBuilder::new()
				.description(content.as_str())
				.author(embed_author)
				.color(MODMAIL_COLOR);
			if let Ok(timestamp) = timestamp_now() {
				embed = embed.timestamp(timestamp);
			}
			TicketMessageData::embed(embed.validate()?.build())
		}
		Notice::TicketClosed { reason } => {
			let embed = titled_embed("🔒 Ticket Closed", "Your modmail ticket has been closed.", MODMAIL_COLOR)
				.field(EmbedFieldBuilder::new("Reason", field_value(reason)))
				.field(EmbedFieldBuilder::new(
					"Need more help?",
					"Feel free to send another message to create a new ticket.",
				))
				.validate()?
				.build();
			TicketMessageData::embed(embed)
		}
		Notice::CloseNoticeUndeliverable => TicketMessageData::text(String::from(
			"⚠️ Could not send closing notification to user (DMs disabled)",
		)),
		Notice::ChannelDeletionPending { delay } => TicketMessageData::text(format!(
			"This channel will be deleted in {} seconds...",
			delay.as_secs()
		)),
	};
	Ok(message)
}

/// Generates the embed posted with a transcript in the transcript channel
pub fn archive_embed(record: &ArchiveRecord) -> Result<Embed, EmbedValidationError> {
	let embed = titled_embed(
		"📄 Ticket Transcript",
		&format!("Transcript for ticket with {} ({})", record.requester.mention(), record.requester),
		MODMAIL_COLOR,
	)
	.field(EmbedFieldBuilder::new("Closed by", record.closed_by.mention().to_string()).inline())
	.field(EmbedFieldBuilder::new("Reason", field_value(&record.reason)).inline())
	.validate()?
	.build();
	Ok(embed)
}
