// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandContext, CommandError};
use crate::discord::utils::channels::channel_name;
use crate::tickets::user_from_channel_name;
use twilight_model::id::Id;
use twilight_model::id::marker::{RoleMarker, UserMarker};

/// Why a command wasn't run for its caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
	NotStaff,
	NotTicketChannel,
	NotAuthorized,
	GuildOnly,
}

impl Denial {
	/// Title and description shown to the caller
	pub fn explanation(&self) -> (&'static str, &'static str) {
		match self {
			Self::NotStaff | Self::NotTicketChannel => (
				"❌ Permission Denied",
				"You don't have permission to use this command or it's not available in this channel.",
			),
			Self::NotAuthorized => ("❌ Permission Denied", "You don't have permission to use this command."),
			Self::GuildOnly => (
				"❌ Invalid Usage",
				"This command can only be used in a server, not in DMs.",
			),
		}
	}
}

/// Staff hold the staff role; the override identity always counts as staff.
pub fn is_staff(
	author: Id<UserMarker>,
	author_roles: &[Id<RoleMarker>],
	staff_role: Id<RoleMarker>,
	override_user: Option<Id<UserMarker>>,
) -> Result<(), Denial> {
	if override_user == Some(author) || author_roles.contains(&staff_role) {
		Ok(())
	} else {
		Err(Denial::NotStaff)
	}
}

pub fn is_ticket_channel(channel_name: Option<&str>, has_open_ticket: bool) -> Result<(), Denial> {
	let named_as_ticket = channel_name.and_then(user_from_channel_name).is_some();
	if named_as_ticket && has_open_ticket {
		Ok(())
	} else {
		Err(Denial::NotTicketChannel)
	}
}

pub fn is_authorized_user(author: Id<UserMarker>, authorized: Option<Id<UserMarker>>) -> Result<(), Denial> {
	if authorized == Some(author) {
		Ok(())
	} else {
		Err(Denial::NotAuthorized)
	}
}

pub fn require_staff(context: &CommandContext<'_>) -> Result<(), Denial> {
	let config = &context.bot_state.config;
	let roles: &[Id<RoleMarker>] = match &context.message.member {
		Some(member) => &member.roles,
		None => &[],
	};
	is_staff(
		context.author_id(),
		roles,
		config.tickets.staff_role,
		config.access.owner_id,
	)
}

/// Checks that the caller is staff and the command was used in an open ticket's channel.
pub async fn require_staff_ticket(context: &CommandContext<'_>) -> Result<(), CommandError> {
	require_staff(context)?;
	if context.message.guild_id.is_none() {
		return Err(Denial::NotTicketChannel.into());
	}

	let channel_id = context.channel_id();
	let bot_state = &context.bot_state;
	let name = channel_name(channel_id, &bot_state.cache, &bot_state.http_client).await?;
	let has_open_ticket = bot_state.tickets.is_open_ticket(channel_id).await;
	is_ticket_channel(name.as_deref(), has_open_ticket)?;
	Ok(())
}
