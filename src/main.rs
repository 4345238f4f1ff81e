// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use modmail_sword::config::load_config;
use modmail_sword::discord::{run_bot, set_up_client};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> miette::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config = Arc::new(load_config()?);
	tracing::info!(guild = %config.discord.guild_id, "configuration loaded");

	let http_client = set_up_client(&config);
	run_bot(config, http_client).await?;

	tracing::info!("bot stopped");
	Ok(())
}
