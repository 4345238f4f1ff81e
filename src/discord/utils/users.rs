// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::tickets::Requester;
use miette::Diagnostic;
use std::fmt;
use twilight_http::client::Client;
use twilight_http::error::Error;
use twilight_http::response::DeserializeBodyError;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::user::User;
use twilight_model::util::ImageHash;

/// User data obtained from guild member data, falling back to the user data if the guild member data is not available.
#[derive(Debug)]
pub struct UserData {
	pub display_name: String,
	pub tag: String,
}

/// Error data for getting user/member data
#[derive(Debug, Diagnostic)]
pub enum UserDataError {
	Http(Error),
	Deserialize(DeserializeBodyError),
}

impl From<Error> for UserDataError {
	fn from(error: Error) -> Self {
		Self::Http(error)
	}
}

impl From<DeserializeBodyError> for UserDataError {
	fn from(error: DeserializeBodyError) -> Self {
		Self::Deserialize(error)
	}
}

impl std::error::Error for UserDataError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Http(error) => Some(error),
			Self::Deserialize(error) => Some(error),
		}
	}
}

impl fmt::Display for UserDataError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Http(error) => write!(f, "HTTP error: {}", error),
			Self::Deserialize(error) => write!(f, "deserialization error: {}", error),
		}
	}
}

/// Username with the discriminator for accounts that still have one
pub fn user_tag(user: &User) -> String {
	tag_from_parts(&user.name, user.discriminator)
}

fn tag_from_parts(name: &str, discriminator: u16) -> String {
	if discriminator == 0 {
		name.to_string()
	} else {
		format!("{}#{:04}", name, discriminator)
	}
}

/// Display name for a user, preferring their server nickname
pub fn display_name(user: &User, nick: Option<&str>) -> String {
	nick.map(|nick| nick.to_string())
		.or_else(|| user.global_name.clone())
		.unwrap_or_else(|| user.name.clone())
}

pub fn avatar_url(user_id: Id<UserMarker>, discriminator: u16, avatar: Option<&ImageHash>) -> String {
	match avatar {
		Some(hash) => format!("https://cdn.discordapp.com/avatars/{}/{}.png", user_id, hash),
		None => {
			let index = if discriminator == 0 {
				(user_id.get() >> 22) % 6
			} else {
				u64::from(discriminator % 5)
			};
			format!("https://cdn.discordapp.com/embed/avatars/{}.png", index)
		}
	}
}

pub fn requester_from_user(user: &User) -> Requester {
	Requester {
		id: user.id,
		tag: user_tag(user),
		avatar_url: avatar_url(user.id, user.discriminator, user.avatar.as_ref()),
	}
}

/// Gets member data with a fallback to user data
pub async fn get_member_data(
	http_client: &Client,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> Result<UserData, UserDataError> {
	let member = get_member_data_only(http_client, guild_id, user_id).await;
	match member {
		Ok(member) => Ok(member),
		Err(_) => get_user_data_only(http_client, user_id).await,
	}
}

async fn get_member_data_only(
	http_client: &Client,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> Result<UserData, UserDataError> {
	let member_response = http_client.guild_member(guild_id, user_id).await?;
	let member = member_response.model().await?;

	Ok(UserData {
		display_name: display_name(&member.user, member.nick.as_deref()),
		tag: user_tag(&member.user),
	})
}

async fn get_user_data_only(http_client: &Client, user_id: Id<UserMarker>) -> Result<UserData, UserDataError> {
	let user_response = http_client.user(user_id).await?;
	let user = user_response.model().await?;

	Ok(UserData {
		display_name: display_name(&user, None),
		tag: user_tag(&user),
	})
}
