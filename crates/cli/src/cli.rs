use std::time::Duration;

use clap::{Parser, Subcommand};
use ubus_runtime::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_IN_FLIGHT};

use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "ubus")]
#[command(about = "ubus client - call router objects over the ubus WebSocket bridge")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Router address
	#[arg(long, global = true, default_value = "192.168.1.1")]
	pub host: String,

	/// WebSocket port on the router
	#[arg(long, global = true, default_value_t = 80)]
	pub port: u16,

	/// Full WebSocket URL, overrides --host and --port
	#[arg(long, global = true, value_name = "URL")]
	pub url: Option<String>,

	/// Login user
	#[arg(short, long, global = true, default_value = "admin")]
	pub user: String,

	/// Login password
	#[arg(long, global = true, env = "UBUS_PASSWORD", hide_env_values = true, default_value = "")]
	pub password: String,

	/// Connect and login timeout in milliseconds
	#[arg(long, global = true, value_name = "MS", default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
	pub timeout_ms: u64,

	/// Maximum number of calls awaiting a response
	#[arg(long, global = true, value_name = "N", default_value_t = DEFAULT_MAX_IN_FLIGHT)]
	pub max_in_flight: usize,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Call a method on a ubus object
	///
	/// Prints the payload as JSON. A non-zero status is reported on stderr and
	/// exits with code 1.
	Call {
		/// Object path, e.g. system or network.interface.wan
		object: String,
		/// Method name, e.g. board
		method: String,
		/// Arguments as a JSON object
		#[arg(value_name = "ARGS_JSON", default_value = "{}")]
		args: String,
		/// Payload fields the response is expected to contain
		#[arg(long, value_name = "JSON")]
		expect: Option<String>,
	},

	/// List objects and their method signatures
	List {
		/// Object pattern, `*` for all
		#[arg(default_value = "*")]
		pattern: String,
	},
}

impl Cli {
	/// Client configuration from the global flags.
	pub fn client_config(&self) -> ClientConfig {
		let config = match &self.url {
			Some(url) => ClientConfig::new(url.clone(), self.user.clone(), self.password.clone()),
			None => ClientConfig::for_host(&self.host, self.port, self.user.clone(), self.password.clone()),
		};

		config
			.with_connect_timeout(Duration::from_millis(self.timeout_ms))
			.with_max_in_flight(self.max_in_flight)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_call_command() {
		let args = vec!["ubus", "call", "system", "board"];
		let cli = Cli::try_parse_from(args).unwrap();

		match cli.command {
			Commands::Call {
				object,
				method,
				args,
				expect,
			} => {
				assert_eq!(object, "system");
				assert_eq!(method, "board");
				assert_eq!(args, "{}");
				assert!(expect.is_none());
			}
			_ => panic!("Expected Call command"),
		}
	}

	#[test]
	fn parse_call_with_args_and_expect() {
		let args = vec![
			"ubus",
			"call",
			"router.wps",
			"checkpin",
			r#"{"pin":"1234"}"#,
			"--expect",
			r#"{"valid":true}"#,
		];
		let cli = Cli::try_parse_from(args).unwrap();

		match cli.command {
			Commands::Call { args, expect, .. } => {
				assert_eq!(args, r#"{"pin":"1234"}"#);
				assert_eq!(expect.as_deref(), Some(r#"{"valid":true}"#));
			}
			_ => panic!("Expected Call command"),
		}
	}

	#[test]
	fn parse_list_default_pattern() {
		let cli = Cli::try_parse_from(vec!["ubus", "list"]).unwrap();
		match cli.command {
			Commands::List { pattern } => assert_eq!(pattern, "*"),
			_ => panic!("Expected List command"),
		}
	}

	#[test]
	fn parse_global_defaults() {
		let cli = Cli::try_parse_from(vec!["ubus", "list"]).unwrap();
		assert_eq!(cli.host, "192.168.1.1");
		assert_eq!(cli.port, 80);
		assert_eq!(cli.user, "admin");
		assert_eq!(cli.timeout_ms, 5000);
		assert_eq!(cli.max_in_flight, 5);
		assert_eq!(cli.verbose, 0);
	}

	#[test]
	fn parse_globals_after_subcommand() {
		let args = vec!["ubus", "list", "network.*", "--host", "10.0.0.1", "--port", "8080", "-vv"];
		let cli = Cli::try_parse_from(args).unwrap();

		assert_eq!(cli.host, "10.0.0.1");
		assert_eq!(cli.port, 8080);
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.client_config().url, "ws://10.0.0.1:8080");
	}

	#[test]
	fn url_overrides_host() {
		let args = vec![
			"ubus",
			"--url",
			"wss://router.lan/ubus",
			"--host",
			"10.0.0.1",
			"--max-in-flight",
			"2",
			"--timeout-ms",
			"250",
			"list",
		];
		let config = Cli::try_parse_from(args).unwrap().client_config();

		assert_eq!(config.url, "wss://router.lan/ubus");
		assert_eq!(config.max_in_flight, 2);
		assert_eq!(config.connect_timeout, Duration::from_millis(250));
	}

	#[test]
	fn missing_subcommand_fails() {
		assert!(Cli::try_parse_from(vec!["ubus"]).is_err());
		assert!(Cli::try_parse_from(vec!["ubus", "call", "system"]).is_err());
	}
}
