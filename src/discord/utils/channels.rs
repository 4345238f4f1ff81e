// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::IntoDiagnostic;
use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_http::client::Client;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

/// Gets a channel's name, checking the cache before asking Discord.
pub async fn channel_name(
	channel_id: Id<ChannelMarker>,
	cache: &DefaultInMemoryCache,
	http_client: &Client,
) -> miette::Result<Option<String>> {
	if let Some(channel) = cache.channel(channel_id) {
		return Ok(channel.name.clone());
	}

	let channel = http_client
		.channel(channel_id)
		.await
		.into_diagnostic()?
		.model()
		.await
		.into_diagnostic()?;
	Ok(channel.name)
}
