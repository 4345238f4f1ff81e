// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::ConfigData;
use crate::tickets::TicketController;
use miette::IntoDiagnostic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_gateway::{CloseFrame, MessageSender};
use twilight_http::client::Client;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{Activity, ActivityType, MinimalActivity, Status};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

pub const DEFAULT_PRESENCE: &str = "DM For Support";

/// Everything shared between event handlers for the lifetime of the gateway connection
pub struct BotState {
	pub config: Arc<ConfigData>,
	pub http_client: Arc<Client>,
	pub cache: Arc<DefaultInMemoryCache>,
	pub tickets: Arc<TicketController>,
	pub bot_user_id: Id<UserMarker>,
	started_at: Instant,
	gateway: MessageSender,
	latency: RwLock<Option<Duration>>,
	presence: RwLock<String>,
	auto_response_enabled: AtomicBool,
	shutdown_requested: AtomicBool,
}

impl BotState {
	pub fn new(
		config: Arc<ConfigData>,
		http_client: Arc<Client>,
		cache: Arc<DefaultInMemoryCache>,
		tickets: Arc<TicketController>,
		bot_user_id: Id<UserMarker>,
		gateway: MessageSender,
	) -> Self {
		Self {
			config,
			http_client,
			cache,
			tickets,
			bot_user_id,
			started_at: Instant::now(),
			gateway,
			latency: RwLock::new(None),
			presence: RwLock::new(String::from(DEFAULT_PRESENCE)),
			auto_response_enabled: AtomicBool::new(true),
			shutdown_requested: AtomicBool::new(false),
		}
	}

	pub fn uptime(&self) -> Duration {
		self.started_at.elapsed()
	}

	pub async fn latency(&self) -> Option<Duration> {
		*self.latency.read().await
	}

	pub async fn record_latency(&self, latency: Option<Duration>) {
		*self.latency.write().await = latency;
	}

	pub async fn presence(&self) -> String {
		self.presence.read().await.clone()
	}

	/// Sets the bot's "Playing" activity.
	pub async fn set_presence(&self, text: &str) -> miette::Result<()> {
		let activity = Activity::from(MinimalActivity {
			kind: ActivityType::Playing,
			name: text.to_string(),
			url: None,
		});
		let update = UpdatePresence::new(vec![activity], false, None::<u64>, Status::Online).into_diagnostic()?;
		self.gateway.command(&update).into_diagnostic()?;
		*self.presence.write().await = text.to_string();
		Ok(())
	}

	/// The channel whose posts get the canned auto-response, if that's configured and switched on
	pub fn auto_response_channel(&self) -> Option<Id<ChannelMarker>> {
		if self.auto_response_enabled.load(Ordering::Relaxed) {
			self.config.auto_response.channel
		} else {
			None
		}
	}

	/// Flips the auto-response on or off, returning whether it's now on.
	pub fn toggle_auto_response(&self) -> bool {
		!self.auto_response_enabled.fetch_xor(true, Ordering::Relaxed)
	}

	/// Closes the gateway connection so the event loop ends.
	pub fn request_shutdown(&self) -> miette::Result<()> {
		self.shutdown_requested.store(true, Ordering::SeqCst);
		self.gateway.close(CloseFrame::NORMAL).into_diagnostic()
	}

	pub fn shutdown_requested(&self) -> bool {
		self.shutdown_requested.load(Ordering::SeqCst)
	}
}
