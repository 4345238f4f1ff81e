// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod platform;
pub mod router;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

pub use directory::{ClaimOutcome, Directory, Ticket, UnclaimOutcome};
pub use error::{ConfigurationError, TicketError};
pub use lifecycle::{CloseOutcome, CloseRequest, ReplyOutcome, TicketController};
pub use platform::{Delivery, Notice, ReplyAuthor, Requester, TicketPlatform};

const TICKET_CHANNEL_PREFIX: &str = "ticket-";

/// Name of the staff channel holding the ticket for a user
pub fn ticket_channel_name(user: Id<UserMarker>) -> String {
	format!("{}{}", TICKET_CHANNEL_PREFIX, user)
}

/// Gets the user a ticket channel was created for from the channel's name
pub fn user_from_channel_name(name: &str) -> Option<Id<UserMarker>> {
	let id = name.strip_prefix(TICKET_CHANNEL_PREFIX)?;
	if !id.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}
	id.parse::<u64>().ok().and_then(Id::new_checked)
}
