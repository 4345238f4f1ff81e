// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::directory::{ClaimOutcome, Directory, Ticket, UnclaimOutcome};
use super::error::TicketError;
use super::platform::{ArchiveRecord, Delivery, Notice, ReplyAuthor, Requester, TicketPlatform};
use super::transcript::Transcript;
use super::{ticket_channel_name, user_from_channel_name};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_util::snowflake::Snowflake;

pub const DEFAULT_CLOSE_REASON: &str = "No reason provided";

/// A message from a user to be relayed into their ticket
#[derive(Clone, Debug)]
pub struct InboundTicketMessage {
	pub content: String,
	pub attachment_urls: Vec<String>,
	pub sent_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CloseRequest {
	pub channel: Id<ChannelMarker>,
	pub requester: Id<UserMarker>,
	pub reason: Option<String>,
	pub closed_by: Id<UserMarker>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
	Delivered(Id<UserMarker>),
	Undeliverable(Id<UserMarker>),
	NoTicket,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
	/// The channel was archived and deleted, with the ticket that was removed from the Directory, if any
	Closed(Option<Ticket>),
	/// Another close of the same channel is already running
	AlreadyClosing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TicketStats {
	pub open: usize,
	pub claimed: usize,
}

/// Runs every ticket state transition and owns the [Directory].
///
/// Directory writes happen only after the platform calls they depend on have succeeded, and no Directory lock is held
/// across a platform call.
pub struct TicketController {
	platform: Arc<dyn TicketPlatform>,
	directory: RwLock<Directory>,
	creation_locks: Mutex<HashMap<Id<UserMarker>, Arc<Mutex<()>>>>,
	close_delay: Duration,
}

impl TicketController {
	pub fn new(platform: Arc<dyn TicketPlatform>, close_delay: Duration) -> Self {
		Self {
			platform,
			directory: RwLock::new(Directory::default()),
			creation_locks: Mutex::new(HashMap::new()),
			close_delay,
		}
	}

	/// Gets the user's open ticket channel, creating the ticket first if there isn't one.
	///
	/// Returns the channel and whether a new ticket was opened. Calls for the same user run one at a time, so
	/// concurrent messages from one user open a single ticket.
	pub async fn find_or_create_ticket(
		&self,
		requester: &Requester,
	) -> Result<(Id<ChannelMarker>, bool), TicketError> {
		let user_lock = {
			let mut locks = self.creation_locks.lock().await;
			Arc::clone(locks.entry(requester.id).or_default())
		};

		let result = {
			let _creating = user_lock.lock().await;
			self.find_or_create_ticket_exclusive(requester).await
		};

		let mut locks = self.creation_locks.lock().await;
		// One reference in the map, one here: nobody else is waiting on this user.
		if Arc::strong_count(&user_lock) == 2 {
			locks.remove(&requester.id);
		}

		result
	}

	async fn find_or_create_ticket_exclusive(
		&self,
		requester: &Requester,
	) -> Result<(Id<ChannelMarker>, bool), TicketError> {
		if let Some(channel) = self.directory.read().await.channel_for(requester.id) {
			return Ok((channel, false));
		}

		self.platform.verify_ticket_setup().await?;

		let channel_name = ticket_channel_name(requester.id);
		let existing_channels = self.platform.ticket_channels().await?;
		let stale_channel = {
			let directory = self.directory.read().await;
			existing_channels
				.into_iter()
				.find(|channel| channel.name == channel_name && !directory.is_closing(channel.id))
		};
		if let Some(stale_channel) = stale_channel {
			self.directory
				.write()
				.await
				.open(requester.id, stale_channel.id, Utc::now())?;
			tracing::info!(user = %requester.id, channel = %stale_channel.id, "adopted existing ticket channel");
			return Ok((stale_channel.id, false));
		}

		let channel = self.platform.create_ticket_channel(&channel_name).await?;
		self.directory.write().await.open(requester.id, channel, Utc::now())?;
		tracing::info!(user = %requester.id, %channel, "opened ticket");

		let introduction = Notice::TicketIntroduction {
			requester: requester.clone(),
			account_created: account_created(requester.id),
		};
		if let Err(error) = self.platform.post(channel, introduction).await {
			tracing::warn!(source = ?error, %channel, "failed to post ticket introduction");
		}

		match self.platform.direct_message(requester.id, Notice::TicketCreated).await {
			Ok(Delivery::Delivered) => (),
			Ok(Delivery::Undeliverable) => {
				tracing::debug!(user = %requester.id, "ticket creation acknowledgement undeliverable")
			}
			Err(error) => {
				tracing::warn!(source = ?error, user = %requester.id, "failed to acknowledge ticket creation")
			}
		}

		Ok((channel, true))
	}

	/// Relays a user's message into their ticket channel: one post for the content, then one per attachment.
	///
	/// Send failures are logged and dropped; the user already believes the message reached staff.
	pub async fn forward_message(
		&self,
		channel: Id<ChannelMarker>,
		sender: &Requester,
		message: InboundTicketMessage,
	) {
		let content_notice = Notice::Forwarded {
			author: sender.clone(),
			content: message.content,
			sent_at: message.sent_at,
		};
		if let Err(error) = self.platform.post(channel, content_notice).await {
			tracing::warn!(source = ?error, %channel, user = %sender.id, "failed to forward message to ticket");
		}

		for url in message.attachment_urls {
			if let Err(error) = self.platform.post(channel, Notice::Attachment { url }).await {
				tracing::warn!(source = ?error, %channel, user = %sender.id, "failed to forward attachment to ticket");
			}
		}
	}

	pub async fn claim(&self, channel: Id<ChannelMarker>, staff: Id<UserMarker>) -> ClaimOutcome {
		let outcome = self.directory.write().await.claim(channel, staff);
		if outcome == ClaimOutcome::Claimed {
			tracing::info!(%channel, %staff, "ticket claimed");
		}
		outcome
	}

	pub async fn unclaim(
		&self,
		channel: Id<ChannelMarker>,
		requester: Id<UserMarker>,
		has_override_permission: bool,
	) -> UnclaimOutcome {
		let outcome = self
			.directory
			.write()
			.await
			.unclaim(channel, requester, has_override_permission);
		if let UnclaimOutcome::Unclaimed { previous } = outcome {
			tracing::info!(%channel, %previous, by = %requester, "ticket unclaimed");
		}
		outcome
	}

	/// Sends a staff reply to the user holding the ticket in the channel.
	pub async fn relay_reply(
		&self,
		channel: Id<ChannelMarker>,
		author: ReplyAuthor,
		content: &str,
	) -> Result<ReplyOutcome, TicketError> {
		let Some(user) = self.directory.read().await.user_for(channel) else {
			return Ok(ReplyOutcome::NoTicket);
		};
		let notice = Notice::Reply {
			author,
			content: content.to_string(),
		};
		let outcome = match self.platform.direct_message(user, notice).await? {
			Delivery::Delivered => ReplyOutcome::Delivered(user),
			Delivery::Undeliverable => ReplyOutcome::Undeliverable(user),
		};
		Ok(outcome)
	}

	/// Archives and closes a ticket, then deletes its channel once the grace delay has passed.
	///
	/// Only one close runs per channel; a second request while the first is running gets
	/// [CloseOutcome::AlreadyClosing] and does nothing. If the transcript can't be produced or archived, nothing is
	/// changed. Once the ticket has been removed from the Directory, a failed channel deletion leaves an orphaned channel
	/// for [Self::reconcile] to pick up.
	pub async fn close(&self, request: CloseRequest) -> Result<CloseOutcome, TicketError> {
		let channel = request.channel;
		if !self.directory.write().await.begin_closing(channel) {
			tracing::debug!(%channel, by = %request.closed_by, "ticket is already closing");
			return Ok(CloseOutcome::AlreadyClosing);
		}
		let result = self.close_exclusive(request).await;
		self.directory.write().await.finish_closing(channel);
		result.map(CloseOutcome::Closed)
	}

	async fn close_exclusive(&self, request: CloseRequest) -> Result<Option<Ticket>, TicketError> {
		let CloseRequest {
			channel,
			requester,
			reason,
			closed_by,
		} = request;
		let reason = reason
			.filter(|reason| !reason.trim().is_empty())
			.unwrap_or_else(|| String::from(DEFAULT_CLOSE_REASON));

		let history = self.platform.history(channel).await?;
		let transcript = Transcript::render(&ticket_channel_name(requester), requester, &history);
		let record = ArchiveRecord {
			requester,
			closed_by,
			reason: reason.clone(),
			transcript,
		};
		self.platform.archive(record).await?;

		let delivery = match self.platform.direct_message(requester, Notice::TicketClosed { reason }).await {
			Ok(delivery) => delivery,
			Err(error) => {
				tracing::warn!(source = ?error, user = %requester, "failed to send ticket closure notice");
				Delivery::Undeliverable
			}
		};
		if delivery == Delivery::Undeliverable {
			if let Err(error) = self.platform.post(channel, Notice::CloseNoticeUndeliverable).await {
				tracing::warn!(source = ?error, %channel, "failed to post undeliverable closure notice");
			}
		}

		let closed_ticket = self.directory.write().await.close(channel);
		tracing::info!(%channel, user = %requester, by = %closed_by, "ticket closed");

		let pending_notice = Notice::ChannelDeletionPending {
			delay: self.close_delay,
		};
		if let Err(error) = self.platform.post(channel, pending_notice).await {
			tracing::warn!(source = ?error, %channel, "failed to post channel deletion notice");
		}
		sleep(self.close_delay).await;
		self.platform.delete_channel(channel).await?;

		Ok(closed_ticket)
	}

	/// Adopts ticket channels that exist on the server but have no Directory entry, such as channels left behind when
	/// the process stopped partway through closing a ticket. Returns the number adopted.
	pub async fn reconcile(&self) -> Result<usize, TicketError> {
		let channels = self.platform.ticket_channels().await?;
		let mut directory = self.directory.write().await;
		let mut adopted = 0;
		for channel in channels {
			let Some(user) = user_from_channel_name(&channel.name) else {
				continue;
			};
			if directory.user_for(channel.id).is_some() || directory.is_closing(channel.id) {
				continue;
			}
			match directory.open(user, channel.id, Utc::now()) {
				Ok(()) => {
					tracing::info!(%user, channel = %channel.id, "adopted orphaned ticket channel");
					adopted += 1;
				}
				Err(conflict) => {
					tracing::warn!(%conflict, channel = %channel.id, "duplicate ticket channel left unadopted")
				}
			}
		}
		Ok(adopted)
	}

	/// Gets the user whose ticket is held in the channel. Falls back to the channel's name when the channel isn't in
	/// the Directory.
	pub async fn ticket_user(&self, channel: Id<ChannelMarker>, channel_name: Option<&str>) -> Option<Id<UserMarker>> {
		if let Some(user) = self.directory.read().await.user_for(channel) {
			return Some(user);
		}
		channel_name.and_then(user_from_channel_name)
	}

	pub async fn is_open_ticket(&self, channel: Id<ChannelMarker>) -> bool {
		self.directory.read().await.user_for(channel).is_some()
	}

	pub async fn is_closing(&self, channel: Id<ChannelMarker>) -> bool {
		self.directory.read().await.is_closing(channel)
	}

	pub async fn claimer(&self, channel: Id<ChannelMarker>) -> Option<Id<UserMarker>> {
		self.directory.read().await.claimer(channel)
	}

	pub async fn ticket_for_user(&self, user: Id<UserMarker>) -> Option<Ticket> {
		self.directory.read().await.ticket(user)
	}

	pub async fn stats(&self) -> TicketStats {
		let directory = self.directory.read().await;
		TicketStats {
			open: directory.open_count(),
			claimed: directory.claimed_count(),
		}
	}
}

fn account_created(user: Id<UserMarker>) -> Option<DateTime<Utc>> {
	Utc.timestamp_millis_opt(user.timestamp()).single()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tickets::error::ConfigurationError;
	use crate::tickets::platform::ChannelSummary;
	use crate::tickets::testing::{Call, RecordingPlatform, requester};

	const STAFF: Id<UserMarker> = Id::new(7);
	const OTHER_STAFF: Id<UserMarker> = Id::new(8);

	fn controller(platform: &Arc<RecordingPlatform>) -> TicketController {
		let platform: Arc<dyn TicketPlatform> = Arc::clone(platform) as Arc<dyn TicketPlatform>;
		TicketController::new(platform, Duration::from_secs(5))
	}

	fn message(content: &str, attachments: &[&str]) -> InboundTicketMessage {
		InboundTicketMessage {
			content: content.to_string(),
			attachment_urls: attachments.iter().map(|url| url.to_string()).collect(),
			sent_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn creates_exactly_one_ticket_per_user() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let user = requester(42);

		let (channel, created) = controller.find_or_create_ticket(&user).await.unwrap();
		assert!(created);
		let (again, created_again) = controller.find_or_create_ticket(&user).await.unwrap();
		assert_eq!(again, channel);
		assert!(!created_again);

		assert_eq!(platform.created_channels(), vec![String::from("ticket-42")]);
		assert_eq!(controller.stats().await.open, 1);
	}

	#[tokio::test]
	async fn new_ticket_is_introduced_and_acknowledged() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let user = requester(42);

		let (channel, _) = controller.find_or_create_ticket(&user).await.unwrap();

		let posts = platform.posts_to(channel);
		assert_eq!(posts.len(), 1);
		let Notice::TicketIntroduction {
			requester: introduced,
			account_created,
		} = &posts[0]
		else {
			panic!("expected an introduction, got {:?}", posts[0]);
		};
		assert_eq!(introduced.id, Id::new(42));
		assert_eq!(*account_created, account_created_for(42));
		assert_eq!(platform.direct_messages_to(Id::new(42)), vec![Notice::TicketCreated]);
	}

	fn account_created_for(id: u64) -> Option<DateTime<Utc>> {
		account_created(Id::new(id))
	}

	#[tokio::test]
	async fn undeliverable_acknowledgement_does_not_fail_creation() {
		let platform = Arc::new(RecordingPlatform::default());
		platform.block_direct_messages(Id::new(42));
		let controller = controller(&platform);

		let (_, created) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		assert!(created);
		assert!(controller.ticket_for_user(Id::new(42)).await.is_some());
	}

	#[tokio::test]
	async fn missing_configuration_prevents_creation() {
		let platform = Arc::new(RecordingPlatform::default());
		platform.fail_setup(ConfigurationError::StaffRole(Id::new(400)));
		let controller = controller(&platform);

		let error = controller.find_or_create_ticket(&requester(42)).await.unwrap_err();
		assert!(matches!(
			error,
			TicketError::Configuration(ConfigurationError::StaffRole(_))
		));
		assert!(platform.created_channels().is_empty());
		assert_eq!(controller.stats().await.open, 0);
	}

	#[tokio::test]
	async fn concurrent_messages_open_one_ticket() {
		let platform = Arc::new(RecordingPlatform::default());
		platform.set_create_delay(Duration::from_millis(50));
		let controller = Arc::new(controller(&platform));
		let user = requester(42);

		let tasks: Vec<_> = (0..5)
			.map(|_| {
				let controller = Arc::clone(&controller);
				let user = user.clone();
				tokio::spawn(async move { controller.find_or_create_ticket(&user).await })
			})
			.collect();
		let mut created_count = 0;
		let mut channels = Vec::new();
		for task in tasks {
			let (channel, created) = task.await.unwrap().unwrap();
			channels.push(channel);
			if created {
				created_count += 1;
			}
		}

		assert_eq!(created_count, 1);
		assert!(channels.iter().all(|channel| *channel == channels[0]));
		assert_eq!(platform.created_channels().len(), 1);
		assert!(controller.creation_locks.lock().await.is_empty());
	}

	#[tokio::test]
	async fn stale_channel_is_adopted_instead_of_duplicated() {
		let platform = Arc::new(RecordingPlatform::default());
		platform.add_existing_channel(ChannelSummary {
			id: Id::new(555),
			name: String::from("ticket-42"),
		});
		let controller = controller(&platform);

		let (channel, created) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		assert_eq!(channel, Id::new(555));
		assert!(!created);
		assert!(platform.created_channels().is_empty());
	}

	#[tokio::test]
	async fn forwarding_posts_content_then_attachments_in_order() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let user = requester(42);
		let (channel, _) = controller.find_or_create_ticket(&user).await.unwrap();

		controller
			.forward_message(channel, &user, message("see attached", &["https://a/1.png", "https://a/2.png"]))
			.await;

		let posts = platform.posts_to(channel);
		assert_eq!(posts.len(), 4);
		assert!(matches!(&posts[1], Notice::Forwarded { content, .. } if content == "see attached"));
		assert_eq!(
			posts[2],
			Notice::Attachment {
				url: String::from("https://a/1.png")
			}
		);
		assert_eq!(
			posts[3],
			Notice::Attachment {
				url: String::from("https://a/2.png")
			}
		);
	}

	#[tokio::test]
	async fn attachment_only_message_still_gets_a_content_post() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let user = requester(42);
		let (channel, _) = controller.find_or_create_ticket(&user).await.unwrap();

		controller
			.forward_message(channel, &user, message("", &["https://a/1.png"]))
			.await;

		let posts = platform.posts_to(channel);
		assert_eq!(posts.len(), 3);
		assert!(matches!(&posts[1], Notice::Forwarded { content, .. } if content.is_empty()));
		assert!(matches!(&posts[2], Notice::Attachment { .. }));
	}

	#[tokio::test]
	async fn forwarding_failures_are_swallowed() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		platform.fail_posts();

		controller
			.forward_message(Id::new(1), &requester(42), message("hello", &["https://a/1.png"]))
			.await;
		assert_eq!(platform.failed_post_count(), 2);
	}

	#[tokio::test]
	async fn second_claim_reports_first_claimer() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();

		assert_eq!(controller.claim(channel, STAFF).await, ClaimOutcome::Claimed);
		assert_eq!(controller.claim(channel, OTHER_STAFF).await, ClaimOutcome::AlreadyClaimed(STAFF));
		assert_eq!(controller.claimer(channel).await, Some(STAFF));
	}

	#[tokio::test]
	async fn unclaim_by_other_staff_is_denied() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		controller.claim(channel, STAFF).await;

		assert_eq!(
			controller.unclaim(channel, OTHER_STAFF, false).await,
			UnclaimOutcome::PermissionDenied(STAFF)
		);
		assert_eq!(controller.claimer(channel).await, Some(STAFF));
	}

	#[tokio::test]
	async fn reply_reports_delivery() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();

		let outcome = controller
			.relay_reply(channel, ReplyAuthor::Anonymous, "we're on it")
			.await
			.unwrap();
		assert_eq!(outcome, ReplyOutcome::Delivered(Id::new(42)));
		assert_eq!(
			platform.direct_messages_to(Id::new(42)).last(),
			Some(&Notice::Reply {
				author: ReplyAuthor::Anonymous,
				content: String::from("we're on it")
			})
		);

		platform.block_direct_messages(Id::new(42));
		let outcome = controller
			.relay_reply(channel, ReplyAuthor::Anonymous, "hello?")
			.await
			.unwrap();
		assert_eq!(outcome, ReplyOutcome::Undeliverable(Id::new(42)));

		let outcome = controller
			.relay_reply(Id::new(9999), ReplyAuthor::Anonymous, "hello?")
			.await
			.unwrap();
		assert_eq!(outcome, ReplyOutcome::NoTicket);
	}

	#[tokio::test(start_paused = true)]
	async fn close_archives_notifies_and_removes_everything() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		controller.claim(channel, STAFF).await;

		let started = tokio::time::Instant::now();
		let closed = controller
			.close(CloseRequest {
				channel,
				requester: Id::new(42),
				reason: None,
				closed_by: STAFF,
			})
			.await
			.unwrap();
		assert!(started.elapsed() >= Duration::from_secs(5));
		let CloseOutcome::Closed(Some(closed)) = closed else {
			panic!("expected the ticket to close, got {:?}", closed);
		};
		assert_eq!(closed.claimed_by, Some(STAFF));
		assert!(!controller.is_closing(channel).await);

		let archived = platform.archived();
		assert_eq!(archived.len(), 1);
		assert_eq!(archived[0].requester, Id::new(42));
		assert_eq!(archived[0].closed_by, STAFF);
		assert_eq!(archived[0].reason, DEFAULT_CLOSE_REASON);
		assert_eq!(archived[0].transcript.file_name, "ticket-42.txt");

		assert_eq!(
			platform.direct_messages_to(Id::new(42)).last(),
			Some(&Notice::TicketClosed {
				reason: String::from(DEFAULT_CLOSE_REASON)
			})
		);
		assert_eq!(controller.ticket_for_user(Id::new(42)).await, None);
		assert_eq!(controller.claimer(channel).await, None);
		assert_eq!(controller.stats().await, TicketStats::default());

		let calls = platform.calls();
		let archive_index = calls.iter().position(|call| matches!(call, Call::Archive(_))).unwrap();
		let deletion_notice = calls
			.iter()
			.position(|call| matches!(call, Call::Post(_, Notice::ChannelDeletionPending { .. })))
			.unwrap();
		let delete_index = calls.iter().position(|call| matches!(call, Call::Delete(_))).unwrap();
		assert!(archive_index < deletion_notice);
		assert!(deletion_notice < delete_index);
		assert_eq!(calls[delete_index], Call::Delete(channel));
	}

	#[tokio::test(start_paused = true)]
	async fn close_of_unclaimed_ticket_with_blocked_user() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		platform.block_direct_messages(Id::new(42));

		controller
			.close(CloseRequest {
				channel,
				requester: Id::new(42),
				reason: Some(String::from("resolved")),
				closed_by: STAFF,
			})
			.await
			.unwrap();

		assert!(platform.posts_to(channel).contains(&Notice::CloseNoticeUndeliverable));
		assert_eq!(platform.archived()[0].reason, "resolved");
		assert_eq!(controller.stats().await.open, 0);

		let (new_channel, created) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		assert!(created);
		assert_ne!(new_channel, channel);
	}

	#[tokio::test(start_paused = true)]
	async fn failed_archive_leaves_ticket_open() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		controller.claim(channel, STAFF).await;
		platform.fail_archive(ConfigurationError::ArchiveChannel(Id::new(200)));

		let error = controller
			.close(CloseRequest {
				channel,
				requester: Id::new(42),
				reason: None,
				closed_by: STAFF,
			})
			.await
			.unwrap_err();
		assert!(matches!(error, TicketError::Configuration(_)));
		assert!(!controller.is_closing(channel).await);
		assert_eq!(controller.ticket_for_user(Id::new(42)).await.unwrap().channel_id, channel);
		assert_eq!(controller.claimer(channel).await, Some(STAFF));
		assert!(!platform.calls().iter().any(|call| matches!(call, Call::Delete(_))));
	}

	fn close_request(channel: Id<ChannelMarker>) -> CloseRequest {
		CloseRequest {
			channel,
			requester: Id::new(42),
			reason: Some(String::from("resolved")),
			closed_by: STAFF,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn message_during_grace_delay_opens_a_fresh_ticket() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = Arc::new(controller(&platform));
		let (closing_channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();

		let close_task = {
			let controller = Arc::clone(&controller);
			tokio::spawn(async move { controller.close(close_request(closing_channel)).await })
		};
		sleep(Duration::from_secs(1)).await;
		assert!(controller.is_closing(closing_channel).await);
		assert_eq!(controller.reconcile().await.unwrap(), 0);

		let (channel, created) = controller.find_or_create_ticket(&requester(42)).await.unwrap();
		assert!(created);
		assert_ne!(channel, closing_channel);

		let outcome = close_task.await.unwrap().unwrap();
		assert!(matches!(outcome, CloseOutcome::Closed(Some(_))));
		assert_eq!(
			controller.ticket_for_user(Id::new(42)).await.map(|ticket| ticket.channel_id),
			Some(channel)
		);
		let deleted: Vec<Call> = platform
			.calls()
			.into_iter()
			.filter(|call| matches!(call, Call::Delete(_)))
			.collect();
		assert_eq!(deleted, vec![Call::Delete(closing_channel)]);
	}

	#[tokio::test(start_paused = true)]
	async fn simultaneous_closes_archive_once() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		let (channel, _) = controller.find_or_create_ticket(&requester(42)).await.unwrap();

		let (first, second) = tokio::join!(
			controller.close(close_request(channel)),
			controller.close(close_request(channel))
		);
		let mut outcomes = vec![first.unwrap(), second.unwrap()];
		outcomes.sort_by_key(|outcome| matches!(outcome, CloseOutcome::AlreadyClosing));
		assert!(matches!(outcomes[0], CloseOutcome::Closed(Some(_))));
		assert_eq!(outcomes[1], CloseOutcome::AlreadyClosing);

		assert_eq!(platform.archived().len(), 1);
		let closure_notices = platform
			.direct_messages_to(Id::new(42))
			.into_iter()
			.filter(|notice| matches!(notice, Notice::TicketClosed { .. }))
			.count();
		assert_eq!(closure_notices, 1);
		let deletions = platform
			.calls()
			.into_iter()
			.filter(|call| matches!(call, Call::Delete(_)))
			.count();
		assert_eq!(deletions, 1);
		assert!(!controller.is_closing(channel).await);
	}

	#[tokio::test]
	async fn reconcile_adopts_orphaned_channels() {
		let platform = Arc::new(RecordingPlatform::default());
		platform.add_existing_channel(ChannelSummary {
			id: Id::new(601),
			name: String::from("ticket-42"),
		});
		platform.add_existing_channel(ChannelSummary {
			id: Id::new(602),
			name: String::from("notes"),
		});
		let controller = controller(&platform);

		assert_eq!(controller.reconcile().await.unwrap(), 1);
		assert_eq!(controller.ticket_user(Id::new(601), None).await, Some(Id::new(42)));
		assert!(controller.is_open_ticket(Id::new(601)).await);
		assert!(!controller.is_open_ticket(Id::new(602)).await);
		assert_eq!(controller.reconcile().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn ticket_user_falls_back_to_channel_name() {
		let platform = Arc::new(RecordingPlatform::default());
		let controller = controller(&platform);
		assert_eq!(
			controller.ticket_user(Id::new(1), Some("ticket-77")).await,
			Some(Id::new(77))
		);
		assert_eq!(controller.ticket_user(Id::new(1), Some("general")).await, None);
	}
}
