// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::TicketError;
use super::transcript::{Transcript, TranscriptEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

/// The person a ticket is held for, as seen when they message the bot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requester {
	pub id: Id<UserMarker>,
	/// Username, with the discriminator if the account still has one
	pub tag: String,
	pub avatar_url: String,
}

/// Who a staff reply is shown as coming from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyAuthor {
	Staff { display_name: String, avatar_url: String },
	Anonymous,
}

/// Everything the ticket core posts to a channel or sends to a user
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
	/// Summary posted at the top of a new ticket channel
	TicketIntroduction {
		requester: Requester,
		account_created: Option<DateTime<Utc>>,
	},
	/// Acknowledgement sent to the user when their ticket is opened
	TicketCreated,
	Forwarded {
		author: Requester,
		content: String,
		sent_at: DateTime<Utc>,
	},
	Attachment {
		url: String,
	},
	Reply {
		author: ReplyAuthor,
		content: String,
	},
	TicketClosed {
		reason: String,
	},
	/// Posted in the ticket channel when the user can't be told their ticket closed
	CloseNoticeUndeliverable,
	ChannelDeletionPending {
		delay: Duration,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
	Delivered,
	/// The user can't be reached, usually because they've disabled direct messages
	Undeliverable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSummary {
	pub id: Id<ChannelMarker>,
	pub name: String,
}

/// Metadata sent to the transcript channel alongside a closed ticket's transcript
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveRecord {
	pub requester: Id<UserMarker>,
	pub closed_by: Id<UserMarker>,
	pub reason: String,
	pub transcript: Transcript,
}

/// Outbound effects the ticket controller relies on.
///
/// Implementations must map "this user can't receive direct messages" to [Delivery::Undeliverable] rather than to an
/// error.
#[async_trait]
pub trait TicketPlatform: Send + Sync {
	/// Confirms the ticket category and staff role exist.
	async fn verify_ticket_setup(&self) -> Result<(), TicketError>;

	/// Lists the text channels currently in the ticket category.
	async fn ticket_channels(&self) -> Result<Vec<ChannelSummary>, TicketError>;

	/// Creates a channel in the ticket category visible only to staff and the bot.
	async fn create_ticket_channel(&self, name: &str) -> Result<Id<ChannelMarker>, TicketError>;

	async fn post(&self, channel: Id<ChannelMarker>, notice: Notice) -> Result<(), TicketError>;

	async fn direct_message(&self, user: Id<UserMarker>, notice: Notice) -> Result<Delivery, TicketError>;

	/// Fetches the full message history of a channel, oldest first.
	async fn history(&self, channel: Id<ChannelMarker>) -> Result<Vec<TranscriptEntry>, TicketError>;

	async fn archive(&self, record: ArchiveRecord) -> Result<(), TicketError>;

	async fn delete_channel(&self, channel: Id<ChannelMarker>) -> Result<(), TicketError>;
}
