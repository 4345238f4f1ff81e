// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::{ConfigurationError, TicketError};
use super::platform::{ArchiveRecord, ChannelSummary, Delivery, Notice, Requester, TicketPlatform};
use super::transcript::TranscriptEntry;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

pub fn requester(id: u64) -> Requester {
	Requester {
		id: Id::new(id),
		tag: format!("user{}", id),
		avatar_url: String::from("https://cdn.discordapp.com/embed/avatars/0.png"),
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
	Create(String),
	Post(Id<ChannelMarker>, Notice),
	DirectMessage(Id<UserMarker>, Notice),
	Archive(ArchiveRecord),
	Delete(Id<ChannelMarker>),
}

#[derive(Debug)]
struct PostFailure;

impl fmt::Display for PostFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "post rejected")
	}
}

impl std::error::Error for PostFailure {}

#[derive(Default)]
struct Inner {
	calls: Vec<Call>,
	channels: Vec<ChannelSummary>,
	next_channel_id: u64,
	blocked_users: HashSet<Id<UserMarker>>,
	setup_failure: Option<ConfigurationError>,
	archive_failure: Option<ConfigurationError>,
	fail_posts: bool,
	failed_posts: usize,
	create_delay: Duration,
}

/// In-memory platform recording every call the controller makes
#[derive(Default)]
pub struct RecordingPlatform {
	inner: Mutex<Inner>,
}

impl RecordingPlatform {
	pub fn calls(&self) -> Vec<Call> {
		self.inner.lock().unwrap().calls.clone()
	}

	pub fn created_channels(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Create(name) => Some(name),
				_ => None,
			})
			.collect()
	}

	pub fn posts_to(&self, channel: Id<ChannelMarker>) -> Vec<Notice> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Post(to, notice) if to == channel => Some(notice),
				_ => None,
			})
			.collect()
	}

	pub fn direct_messages_to(&self, user: Id<UserMarker>) -> Vec<Notice> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::DirectMessage(to, notice) if to == user => Some(notice),
				_ => None,
			})
			.collect()
	}

	pub fn archived(&self) -> Vec<ArchiveRecord> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Archive(record) => Some(record),
				_ => None,
			})
			.collect()
	}

	pub fn add_existing_channel(&self, channel: ChannelSummary) {
		self.inner.lock().unwrap().channels.push(channel);
	}

	pub fn block_direct_messages(&self, user: Id<UserMarker>) {
		self.inner.lock().unwrap().blocked_users.insert(user);
	}

	pub fn fail_setup(&self, error: ConfigurationError) {
		self.inner.lock().unwrap().setup_failure = Some(error);
	}

	pub fn fail_archive(&self, error: ConfigurationError) {
		self.inner.lock().unwrap().archive_failure = Some(error);
	}

	pub fn fail_posts(&self) {
		self.inner.lock().unwrap().fail_posts = true;
	}

	pub fn failed_post_count(&self) -> usize {
		self.inner.lock().unwrap().failed_posts
	}

	pub fn set_create_delay(&self, delay: Duration) {
		self.inner.lock().unwrap().create_delay = delay;
	}
}

fn take_failure(failure: &Option<ConfigurationError>) -> Result<(), TicketError> {
	match failure {
		Some(ConfigurationError::TicketCategory(id)) => Err(ConfigurationError::TicketCategory(*id).into()),
		Some(ConfigurationError::StaffRole(id)) => Err(ConfigurationError::StaffRole(*id).into()),
		Some(ConfigurationError::ArchiveChannel(id)) => Err(ConfigurationError::ArchiveChannel(*id).into()),
		None => Ok(()),
	}
}

#[async_trait]
impl TicketPlatform for RecordingPlatform {
	async fn verify_ticket_setup(&self) -> Result<(), TicketError> {
		take_failure(&self.inner.lock().unwrap().setup_failure)
	}

	async fn ticket_channels(&self) -> Result<Vec<ChannelSummary>, TicketError> {
		Ok(self.inner.lock().unwrap().channels.clone())
	}

	async fn create_ticket_channel(&self, name: &str) -> Result<Id<ChannelMarker>, TicketError> {
		let delay = self.inner.lock().unwrap().create_delay;
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		let mut inner = self.inner.lock().unwrap();
		inner.next_channel_id += 1;
		let id = Id::new(10_000 + inner.next_channel_id);
		inner.channels.push(ChannelSummary {
			id,
			name: name.to_string(),
		});
		inner.calls.push(Call::Create(name.to_string()));
		Ok(id)
	}

	async fn post(&self, channel: Id<ChannelMarker>, notice: Notice) -> Result<(), TicketError> {
		let mut inner = self.inner.lock().unwrap();
		if inner.fail_posts {
			inner.failed_posts += 1;
			return Err(TicketError::platform(PostFailure));
		}
		inner.calls.push(Call::Post(channel, notice));
		Ok(())
	}

	async fn direct_message(&self, user: Id<UserMarker>, notice: Notice) -> Result<Delivery, TicketError> {
		let mut inner = self.inner.lock().unwrap();
		if inner.blocked_users.contains(&user) {
			return Ok(Delivery::Undeliverable);
		}
		inner.calls.push(Call::DirectMessage(user, notice));
		Ok(Delivery::Delivered)
	}

	async fn history(&self, channel: Id<ChannelMarker>) -> Result<Vec<TranscriptEntry>, TicketError> {
		let posts = self.posts_to(channel);
		let entries = posts
			.into_iter()
			.map(|notice| TranscriptEntry {
				author_id: Id::new(1),
				author_name: String::from("bot"),
				sent_at: chrono::Utc::now(),
				content: String::new(),
				embeds: vec![format!("{:?}", notice)],
				attachments: Vec::new(),
			})
			.collect();
		Ok(entries)
	}

	async fn archive(&self, record: ArchiveRecord) -> Result<(), TicketError> {
		let mut inner = self.inner.lock().unwrap();
		take_failure(&inner.archive_failure)?;
		inner.calls.push(Call::Archive(record));
		Ok(())
	}

	async fn delete_channel(&self, channel: Id<ChannelMarker>) -> Result<(), TicketError> {
		let mut inner = self.inner.lock().unwrap();
		inner.channels.retain(|summary| summary.id != channel);
		inner.calls.push(Call::Delete(channel));
		Ok(())
	}
}
