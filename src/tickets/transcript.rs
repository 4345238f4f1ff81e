// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use std::fmt::Write;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// One message from a ticket channel's history
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
	pub author_id: Id<UserMarker>,
	pub author_name: String,
	pub sent_at: DateTime<Utc>,
	pub content: String,
	/// Embeds flattened to text; the bot posts most ticket traffic as embeds
	pub embeds: Vec<String>,
	pub attachments: Vec<String>,
}

/// Plain text rendering of a ticket's history, ready to upload as a file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
	pub file_name: String,
	pub contents: Vec<u8>,
}

impl Transcript {
	pub fn render(channel_name: &str, requester: Id<UserMarker>, entries: &[TranscriptEntry]) -> Self {
		let mut text = String::new();
		// Writing into a String can't fail.
		let _ = writeln!(text, "Transcript of {}", channel_name);
		let _ = writeln!(text, "Requester: {}", requester);
		let _ = writeln!(text, "Messages: {}", entries.len());
		let _ = writeln!(text, "Exported: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));

		for entry in entries.iter() {
			text.push('\n');
			let _ = write!(
				text,
				"[{}] {} ({})",
				entry.sent_at.format("%Y-%m-%d %H:%M:%S"),
				entry.author_name,
				entry.author_id
			);
			if entry.content.is_empty() {
				text.push('\n');
			} else {
				let _ = writeln!(text, ": {}", entry.content);
			}
			for embed in entry.embeds.iter() {
				for line in embed.lines() {
					let _ = writeln!(text, "    | {}", line);
				}
			}
			for attachment in entry.attachments.iter() {
				let _ = writeln!(text, "    attachment: {}", attachment);
			}
		}

		Self {
			file_name: format!("{}.txt", channel_name),
			contents: text.into_bytes(),
		}
	}
}
