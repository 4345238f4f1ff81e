// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::DirectoryConflict;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

/// One open support conversation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
	pub user_id: Id<UserMarker>,
	pub channel_id: Id<ChannelMarker>,
	pub claimed_by: Option<Id<UserMarker>>,
	pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug)]
struct OpenTicket {
	channel_id: Id<ChannelMarker>,
	created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
	Claimed,
	AlreadyClaimed(Id<UserMarker>),
	NoTicket,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnclaimOutcome {
	Unclaimed { previous: Id<UserMarker> },
	NotClaimed,
	PermissionDenied(Id<UserMarker>),
}

/// In-memory record of open tickets and their claims.
///
/// A channel in the claim view is always the channel of some open ticket, and a channel belongs to at most one open
/// ticket. Channels being closed stay marked until they're deleted, so they can't be taken up again as a new ticket.
/// Nothing here is persisted.
#[derive(Debug, Default)]
pub struct Directory {
	open_tickets: HashMap<Id<UserMarker>, OpenTicket>,
	channel_owners: HashMap<Id<ChannelMarker>, Id<UserMarker>>,
	claims: HashMap<Id<ChannelMarker>, Id<UserMarker>>,
	closing: HashSet<Id<ChannelMarker>>,
}

impl Directory {
	pub fn channel_for(&self, user: Id<UserMarker>) -> Option<Id<ChannelMarker>> {
		self.open_tickets.get(&user).map(|ticket| ticket.channel_id)
	}

	pub fn user_for(&self, channel: Id<ChannelMarker>) -> Option<Id<UserMarker>> {
		self.channel_owners.get(&channel).copied()
	}

	pub fn claimer(&self, channel: Id<ChannelMarker>) -> Option<Id<UserMarker>> {
		self.claims.get(&channel).copied()
	}

	pub fn ticket(&self, user: Id<UserMarker>) -> Option<Ticket> {
		let open_ticket = self.open_tickets.get(&user)?;
		Some(Ticket {
			user_id: user,
			channel_id: open_ticket.channel_id,
			claimed_by: self.claimer(open_ticket.channel_id),
			created_at: open_ticket.created_at,
		})
	}

	pub fn open(
		&mut self,
		user: Id<UserMarker>,
		channel: Id<ChannelMarker>,
		created_at: DateTime<Utc>,
	) -> Result<(), DirectoryConflict> {
		if let Some(existing) = self.open_tickets.get(&user) {
			return Err(DirectoryConflict::UserHasTicket {
				user,
				channel: existing.channel_id,
			});
		}
		if let Some(owner) = self.channel_owners.get(&channel) {
			return Err(DirectoryConflict::ChannelInUse { channel, user: *owner });
		}
		self.open_tickets.insert(
			user,
			OpenTicket {
				channel_id: channel,
				created_at,
			},
		);
		self.channel_owners.insert(channel, user);
		Ok(())
	}

	pub fn claim(&mut self, channel: Id<ChannelMarker>, staff: Id<UserMarker>) -> ClaimOutcome {
		if !self.channel_owners.contains_key(&channel) {
			return ClaimOutcome::NoTicket;
		}
		if let Some(claimer) = self.claims.get(&channel) {
			return ClaimOutcome::AlreadyClaimed(*claimer);
		}
		self.claims.insert(channel, staff);
		ClaimOutcome::Claimed
	}

	pub fn unclaim(
		&mut self,
		channel: Id<ChannelMarker>,
		requester: Id<UserMarker>,
		has_override_permission: bool,
	) -> UnclaimOutcome {
		let Some(claimer) = self.claims.get(&channel).copied() else {
			return UnclaimOutcome::NotClaimed;
		};
		if claimer != requester && !has_override_permission {
			return UnclaimOutcome::PermissionDenied(claimer);
		}
		self.claims.remove(&channel);
		UnclaimOutcome::Unclaimed { previous: claimer }
	}

	/// Removes the ticket held in the channel along with its claim, returning what was removed.
	pub fn close(&mut self, channel: Id<ChannelMarker>) -> Option<Ticket> {
		let claimed_by = self.claims.remove(&channel);
		let user = self.channel_owners.remove(&channel)?;
		let open_ticket = self.open_tickets.remove(&user)?;
		Some(Ticket {
			user_id: user,
			channel_id: open_ticket.channel_id,
			claimed_by,
			created_at: open_ticket.created_at,
		})
	}

	/// Marks the channel as closing. Returns `false` if it was already being closed.
	pub fn begin_closing(&mut self, channel: Id<ChannelMarker>) -> bool {
		self.closing.insert(channel)
	}

	pub fn finish_closing(&mut self, channel: Id<ChannelMarker>) {
		self.closing.remove(&channel);
	}

	pub fn is_closing(&self, channel: Id<ChannelMarker>) -> bool {
		self.closing.contains(&channel)
	}

	pub fn open_count(&self) -> usize {
		self.open_tickets.len()
	}

	pub fn claimed_count(&self) -> usize {
		self.claims.len()
	}
}
