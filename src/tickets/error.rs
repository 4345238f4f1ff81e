// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::Diagnostic;
use std::error::Error;
use std::fmt;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, RoleMarker, UserMarker};

/// A configured identity that doesn't resolve to a live object on the server
#[derive(Debug, Diagnostic, PartialEq, Eq)]
pub enum ConfigurationError {
	TicketCategory(Id<ChannelMarker>),
	StaffRole(Id<RoleMarker>),
	ArchiveChannel(Id<ChannelMarker>),
}

impl fmt::Display for ConfigurationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::TicketCategory(id) => write!(f, "the ticket category {} could not be found", id),
			Self::StaffRole(id) => write!(f, "the staff role {} could not be found", id),
			Self::ArchiveChannel(id) => write!(f, "the transcript channel {} could not be found", id),
		}
	}
}

impl Error for ConfigurationError {}

/// Rejected Directory mutations; each one would break the one-ticket-per-user or one-user-per-channel rule.
#[derive(Debug, PartialEq, Eq)]
pub enum DirectoryConflict {
	UserHasTicket {
		user: Id<UserMarker>,
		channel: Id<ChannelMarker>,
	},
	ChannelInUse {
		channel: Id<ChannelMarker>,
		user: Id<UserMarker>,
	},
}

impl fmt::Display for DirectoryConflict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UserHasTicket { user, channel } => {
				write!(f, "user {} already has an open ticket in channel {}", user, channel)
			}
			Self::ChannelInUse { channel, user } => {
				write!(f, "channel {} is already the ticket of user {}", channel, user)
			}
		}
	}
}

impl Error for DirectoryConflict {}

#[derive(Debug, Diagnostic)]
pub enum TicketError {
	Configuration(ConfigurationError),
	Conflict(DirectoryConflict),
	Platform(Box<dyn Error + Send + Sync>),
}

impl TicketError {
	pub fn platform(error: impl Error + Send + Sync + 'static) -> Self {
		Self::Platform(Box::new(error))
	}
}

impl From<ConfigurationError> for TicketError {
	fn from(error: ConfigurationError) -> Self {
		Self::Configuration(error)
	}
}

impl From<DirectoryConflict> for TicketError {
	fn from(error: DirectoryConflict) -> Self {
		Self::Conflict(error)
	}
}

impl Error for TicketError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Configuration(error) => Some(error),
			Self::Conflict(error) => Some(error),
			Self::Platform(error) => Some(error.as_ref()),
		}
	}
}

impl fmt::Display for TicketError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Configuration(error) => write!(f, "configuration error: {}", error),
			Self::Conflict(error) => write!(f, "ticket conflict: {}", error),
			Self::Platform(error) => write!(f, "platform error: {}", error),
		}
	}
}
