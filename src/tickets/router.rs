// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

/// The parts of an incoming message that decide where it goes
#[derive(Clone, Copy, Debug)]
pub struct InboundMessage<'a> {
	pub content: &'a str,
	pub channel_id: Id<ChannelMarker>,
	/// Whether the message was sent in a direct message channel with the bot
	pub is_direct: bool,
	pub author_is_bot: bool,
}

/// A prefixed command split into its name and the rest of the text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandInvocation<'a> {
	pub name: &'a str,
	pub args: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route<'a> {
	Command(CommandInvocation<'a>),
	AutoResponse,
	DirectMessage,
	Ignore,
}

/// Decides how to handle an incoming message. Checks run in priority order and the first match wins.
///
/// `monitored_channel` is the auto-response channel while that feature is switched on.
pub fn classify<'a>(
	message: &InboundMessage<'a>,
	prefix: &str,
	monitored_channel: Option<Id<ChannelMarker>>,
) -> Route<'a> {
	if message.author_is_bot {
		return Route::Ignore;
	}
	if let Some(invocation) = parse_command(message.content, prefix) {
		return Route::Command(invocation);
	}
	if monitored_channel == Some(message.channel_id) {
		return Route::AutoResponse;
	}
	if message.is_direct {
		return Route::DirectMessage;
	}
	Route::Ignore
}

pub fn parse_command<'a>(content: &'a str, prefix: &str) -> Option<CommandInvocation<'a>> {
	let body = content.strip_prefix(prefix)?;
	if body.starts_with(char::is_whitespace) {
		return None;
	}
	let (name, args) = match body.split_once(char::is_whitespace) {
		Some((name, args)) => (name, args.trim()),
		None => (body, ""),
	};
	if name.is_empty() {
		return None;
	}
	Some(CommandInvocation { name, args })
}

#[cfg(test)]
mod tests {
	use super::*;

	const MONITORED: Id<ChannelMarker> = Id::new(50);

	fn message(content: &str, channel: u64, is_direct: bool, author_is_bot: bool) -> InboundMessage<'_> {
		InboundMessage {
			content,
			channel_id: Id::new(channel),
			is_direct,
			author_is_bot,
		}
	}

	#[test]
	fn commands_take_priority() {
		let in_monitored = message("?help", 50, false, false);
		assert_eq!(
			classify(&in_monitored, "?", Some(MONITORED)),
			Route::Command(CommandInvocation { name: "help", args: "" })
		);
		let in_dm = message("?uptime", 60, true, false);
		assert!(matches!(classify(&in_dm, "?", None), Route::Command(_)));
	}

	#[test]
	fn monitored_channel_gets_auto_response() {
		let post = message("how do I join", 50, false, false);
		assert_eq!(classify(&post, "?", Some(MONITORED)), Route::AutoResponse);
		assert_eq!(classify(&post, "?", None), Route::Ignore);
	}

	#[test]
	fn direct_messages_become_tickets() {
		let dm = message("help me", 60, true, false);
		assert_eq!(classify(&dm, "?", Some(MONITORED)), Route::DirectMessage);
	}

	#[test]
	fn bots_and_other_channels_are_ignored() {
		assert_eq!(classify(&message("help me", 60, true, true), "?", None), Route::Ignore);
		assert_eq!(
			classify(&message("hi", 50, false, true), "?", Some(MONITORED)),
			Route::Ignore
		);
		assert_eq!(classify(&message("?claim", 60, false, true), "?", None), Route::Ignore);
		assert_eq!(classify(&message("hello", 70, false, false), "?", None), Route::Ignore);
	}

	#[test]
	fn parses_command_arguments() {
		assert_eq!(
			parse_command("?reply  thanks for waiting\nmore", "?"),
			Some(CommandInvocation {
				name: "reply",
				args: "thanks for waiting\nmore"
			})
		);
		assert_eq!(
			parse_command("!!close spam", "!!"),
			Some(CommandInvocation {
				name: "close",
				args: "spam"
			})
		);
		assert_eq!(parse_command("?", "?"), None);
		assert_eq!(parse_command("? claim", "?"), None);
		assert_eq!(parse_command("claim", "?"), None);
	}

	#[test]
	fn lone_prefix_in_direct_message_is_forwarded() {
		let dm = message("?", 60, true, false);
		assert_eq!(classify(&dm, "?", None), Route::DirectMessage);
	}
}
