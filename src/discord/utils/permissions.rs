// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::IntoDiagnostic;
use std::collections::HashMap;
use std::future::IntoFuture;
use twilight_http::client::Client;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};
use twilight_util::permission_calculator::PermissionCalculator;

/// Permissions granted in ticket channels to the staff role, the bot, and the owner.
pub fn ticket_channel_permissions() -> Permissions {
	Permissions::VIEW_CHANNEL
		| Permissions::READ_MESSAGE_HISTORY
		| Permissions::SEND_MESSAGES
		| Permissions::EMBED_LINKS
		| Permissions::ATTACH_FILES
}

/// Server-wide permissions the bot needs, with the names shown in diagnostics
pub const KEY_BOT_PERMISSIONS: [(&str, Permissions); 7] = [
	("Manage Channels", Permissions::MANAGE_CHANNELS),
	("Manage Roles", Permissions::MANAGE_ROLES),
	("View Channels", Permissions::VIEW_CHANNEL),
	("Send Messages", Permissions::SEND_MESSAGES),
	("Embed Links", Permissions::EMBED_LINKS),
	("Attach Files", Permissions::ATTACH_FILES),
	("Read Message History", Permissions::READ_MESSAGE_HISTORY),
];

/// A member's standing on the server: guild-level permissions and where they sit in the role hierarchy.
#[derive(Debug)]
pub struct MemberStanding {
	pub permissions: Permissions,
	/// Position of the member's highest role; members with no roles are at the `@everyone` position of 0.
	pub highest_role_position: i64,
	pub is_owner: bool,
}

/// Gets the guild-level standing of a member.
pub async fn member_standing(
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	http_client: &Client,
) -> miette::Result<MemberStanding> {
	let member_future = http_client.guild_member(guild_id, user_id).into_future();
	let guild_roles_future = http_client.roles(guild_id).into_future();
	let guild_future = http_client.guild(guild_id).into_future();
	let (member, guild_roles, guild) = tokio::join!(member_future, guild_roles_future, guild_future);

	let member = member.into_diagnostic()?.model().await.into_diagnostic()?;
	let guild_roles = guild_roles.into_diagnostic()?.models().await.into_diagnostic()?;
	let guild = guild.into_diagnostic()?.model().await.into_diagnostic()?;

	let guild_everyone_role_id: Id<RoleMarker> = guild_id.cast();
	let role_data: HashMap<Id<RoleMarker>, (Permissions, i64)> = guild_roles
		.iter()
		.map(|role| (role.id, (role.permissions, role.position)))
		.collect();
	let everyone_role_permissions = role_data
		.get(&guild_everyone_role_id)
		.map(|(permissions, _)| *permissions)
		.unwrap_or_else(Permissions::empty);
	let member_roles: Vec<(Id<RoleMarker>, Permissions)> = member
		.roles
		.iter()
		.map(|role_id| {
			(
				*role_id,
				role_data
					.get(role_id)
					.map(|(permissions, _)| *permissions)
					.unwrap_or_else(Permissions::empty),
			)
		})
		.collect();
	let highest_role_position = member
		.roles
		.iter()
		.filter_map(|role_id| role_data.get(role_id).map(|(_, position)| *position))
		.max()
		.unwrap_or(0);

	let calculator = PermissionCalculator::new(guild_id, user_id, everyone_role_permissions, &member_roles)
		.owner_id(guild.owner_id);
	Ok(MemberStanding {
		permissions: calculator.root(),
		highest_role_position,
		is_owner: guild.owner_id == user_id,
	})
}

/// Whether a permission set includes a permission, counting Administrator as every permission
pub fn has_permission(permissions: Permissions, required: Permissions) -> bool {
	permissions.contains(Permissions::ADMINISTRATOR) || permissions.contains(required)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn administrator_implies_everything() {
		assert!(has_permission(Permissions::ADMINISTRATOR, Permissions::MANAGE_ROLES));
		assert!(has_permission(
			Permissions::MANAGE_CHANNELS | Permissions::SEND_MESSAGES,
			Permissions::MANAGE_CHANNELS
		));
		assert!(!has_permission(Permissions::SEND_MESSAGES, Permissions::MANAGE_CHANNELS));
	}
}
