// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::Diagnostic;
use std::fmt;
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

pub const DEFAULT_COMMAND_PREFIX: &str = "?";
pub const DEFAULT_CLOSE_DELAY_SECS: u64 = 5;
pub const DEFAULT_AUTO_RESPONSE_MESSAGE: &str =
	"To become whitelisted, please apply in the application channel. If you need support, please DM the support bot.";

/// Loads the bot configuration from the process environment, reading a `.env` file first if one exists.
pub fn load_config() -> Result<ConfigData, ConfigError> {
	match dotenvy::dotenv() {
		Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
		Err(error) if error.not_found() => (),
		Err(error) => tracing::warn!(source = ?error, "failed to read environment file"),
	}
	ConfigData::from_lookup(|name| std::env::var(name).ok())
}

#[derive(Debug)]
pub struct ConfigData {
	pub discord: DiscordConfig,
	pub tickets: TicketConfig,
	pub access: AccessConfig,
	pub auto_response: AutoResponseConfig,
}

#[derive(Debug)]
pub struct DiscordConfig {
	pub bot_token: String,
	pub guild_id: Id<GuildMarker>,
	pub command_prefix: String,
}

#[derive(Debug)]
pub struct TicketConfig {
	/// Category in which ticket channels are created
	pub category: Id<ChannelMarker>,
	pub staff_role: Id<RoleMarker>,
	/// Channel receiving transcripts of closed tickets
	pub transcript_channel: Id<ChannelMarker>,
	pub close_delay: Duration,
}

#[derive(Debug)]
pub struct AccessConfig {
	/// Identity that passes every staff check, is added to every ticket, and may run owner commands.
	pub owner_id: Option<Id<UserMarker>>,
	pub role_admin_id: Option<Id<UserMarker>>,
	pub role_log_channel: Option<Id<ChannelMarker>>,
}

#[derive(Debug)]
pub struct AutoResponseConfig {
	pub channel: Option<Id<ChannelMarker>>,
	pub message: String,
}

impl ConfigData {
	/// Builds the configuration from a variable lookup. Every missing or malformed variable is reported at once.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let mut reader = VarReader {
			lookup: &lookup,
			problems: Vec::new(),
		};

		let bot_token = reader.required_string("DISCORD_TOKEN");
		let guild_id = reader.required_id("GUILD_ID");
		let transcript_channel = reader.required_id("TRANSCRIPT_CHANNEL");
		let category = reader.required_id("TICKET_CATEGORY");
		let staff_role = reader.required_id("STAFF_ROLE");
		let owner_id = reader.optional_id("OWNER_ID");
		let role_admin_id = reader.optional_id("ROLE_ADMIN_ID");
		let role_log_channel = reader.optional_id("ROLE_LOG_CHANNEL");
		let auto_response_channel = reader.optional_id("AUTO_RESPONSE_CHANNEL");
		let close_delay_secs = reader.optional_u64("CLOSE_DELAY_SECS");

		let command_prefix = lookup("COMMAND_PREFIX")
			.filter(|prefix| !prefix.trim().is_empty())
			.unwrap_or_else(|| String::from(DEFAULT_COMMAND_PREFIX));
		let auto_response_message = lookup("AUTO_RESPONSE_MESSAGE")
			.filter(|message| !message.trim().is_empty())
			.unwrap_or_else(|| String::from(DEFAULT_AUTO_RESPONSE_MESSAGE));

		let problems = reader.problems;
		match (bot_token, guild_id, transcript_channel, category, staff_role) {
			(Some(bot_token), Some(guild_id), Some(transcript_channel), Some(category), Some(staff_role))
				if problems.is_empty() =>
			{
				Ok(Self {
					discord: DiscordConfig {
						bot_token,
						guild_id,
						command_prefix,
					},
					tickets: TicketConfig {
						category,
						staff_role,
						transcript_channel,
						close_delay: Duration::from_secs(close_delay_secs.unwrap_or(DEFAULT_CLOSE_DELAY_SECS)),
					},
					access: AccessConfig {
						owner_id,
						role_admin_id,
						role_log_channel,
					},
					auto_response: AutoResponseConfig {
						channel: auto_response_channel,
						message: auto_response_message,
					},
				})
			}
			_ => Err(ConfigError { problems }),
		}
	}
}

struct VarReader<'a> {
	lookup: &'a dyn Fn(&str) -> Option<String>,
	problems: Vec<ConfigProblem>,
}

impl VarReader<'_> {
	fn value(&self, name: &str) -> Option<String> {
		(self.lookup)(name)
			.map(|value| value.trim().to_string())
			.filter(|value| !value.is_empty())
	}

	fn required_string(&mut self, name: &'static str) -> Option<String> {
		let value = self.value(name);
		if value.is_none() {
			self.problems.push(ConfigProblem::Missing(name));
		}
		value
	}

	fn required_id<T>(&mut self, name: &'static str) -> Option<Id<T>> {
		let value = self.required_string(name)?;
		self.parse_id(name, &value)
	}

	fn optional_id<T>(&mut self, name: &'static str) -> Option<Id<T>> {
		let value = self.value(name)?;
		self.parse_id(name, &value)
	}

	fn optional_u64(&mut self, name: &'static str) -> Option<u64> {
		let value = self.value(name)?;
		match value.parse() {
			Ok(number) => Some(number),
			Err(_) => {
				self.problems.push(ConfigProblem::Invalid { name, value });
				None
			}
		}
	}

	fn parse_id<T>(&mut self, name: &'static str, value: &str) -> Option<Id<T>> {
		let id = value.parse::<u64>().ok().and_then(Id::new_checked);
		if id.is_none() {
			self.problems.push(ConfigProblem::Invalid {
				name,
				value: value.to_string(),
			});
		}
		id
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigProblem {
	Missing(&'static str),
	Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigProblem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Missing(name) => write!(f, "{} is not set", name),
			Self::Invalid { name, value } => write!(f, "{} has an invalid value: {:?}", name, value),
		}
	}
}

#[derive(Debug, Diagnostic)]
#[diagnostic(
	code(modmail::config),
	help("Set the variables in the environment or in a .env file next to the bot.")
)]
pub struct ConfigError {
	pub problems: Vec<ConfigProblem>,
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "invalid configuration")?;
		for problem in self.problems.iter() {
			write!(f, "\n  - {}", problem)?;
		}
		Ok(())
	}
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(name, value)| (name.to_string(), value.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	const REQUIRED: [(&str, &str); 5] = [
		("DISCORD_TOKEN", "token"),
		("GUILD_ID", "100"),
		("TRANSCRIPT_CHANNEL", "200"),
		("TICKET_CATEGORY", "300"),
		("STAFF_ROLE", "400"),
	];

	#[test]
	fn required_variables_are_enough() {
		let config = ConfigData::from_lookup(lookup_from(&REQUIRED)).unwrap();
		assert_eq!(config.discord.bot_token, "token");
		assert_eq!(config.discord.guild_id, Id::new(100));
		assert_eq!(config.discord.command_prefix, "?");
		assert_eq!(config.tickets.transcript_channel, Id::new(200));
		assert_eq!(config.tickets.category, Id::new(300));
		assert_eq!(config.tickets.staff_role, Id::new(400));
		assert_eq!(config.tickets.close_delay, Duration::from_secs(5));
		assert!(config.access.owner_id.is_none());
		assert!(config.auto_response.channel.is_none());
	}

	#[test]
	fn optional_variables_are_read() {
		let mut vars = REQUIRED.to_vec();
		vars.extend([
			("OWNER_ID", "500"),
			("ROLE_ADMIN_ID", "600"),
			("AUTO_RESPONSE_CHANNEL", "700"),
			("COMMAND_PREFIX", "!"),
			("CLOSE_DELAY_SECS", "0"),
		]);
		let config = ConfigData::from_lookup(lookup_from(&vars)).unwrap();
		assert_eq!(config.access.owner_id, Some(Id::new(500)));
		assert_eq!(config.access.role_admin_id, Some(Id::new(600)));
		assert_eq!(config.auto_response.channel, Some(Id::new(700)));
		assert_eq!(config.discord.command_prefix, "!");
		assert_eq!(config.tickets.close_delay, Duration::ZERO);
	}

	#[test]
	fn every_problem_is_reported() {
		let error = ConfigData::from_lookup(lookup_from(&[
			("DISCORD_TOKEN", "token"),
			("GUILD_ID", "not a number"),
			("TICKET_CATEGORY", "0"),
			("STAFF_ROLE", "400"),
			("OWNER_ID", "-5"),
		]))
		.unwrap_err();
		assert_eq!(
			error.problems,
			vec![
				ConfigProblem::Invalid {
					name: "GUILD_ID",
					value: String::from("not a number")
				},
				ConfigProblem::Missing("TRANSCRIPT_CHANNEL"),
				ConfigProblem::Invalid {
					name: "TICKET_CATEGORY",
					value: String::from("0")
				},
				ConfigProblem::Invalid {
					name: "OWNER_ID",
					value: String::from("-5")
				},
			]
		);
		let rendered = error.to_string();
		assert!(rendered.contains("TRANSCRIPT_CHANNEL is not set"));
	}

	#[test]
	fn invalid_optional_value_fails_startup() {
		let mut vars = REQUIRED.to_vec();
		vars.push(("CLOSE_DELAY_SECS", "soon"));
		let error = ConfigData::from_lookup(lookup_from(&vars)).unwrap_err();
		assert_eq!(error.problems.len(), 1);
	}
}
