//! Subcommand execution.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use ubus_runtime::{CallOutcome, Client, UbusCall};

use crate::cli::{Cli, Commands};

/// Connects, runs the subcommand and closes the session.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let call = build_call(&cli.command)?;
	let config = cli.client_config();

	let client = Client::connect(config)
		.await
		.with_context(|| format!("failed to open ubus session as {}", cli.user))?;

	let outcome = client.call(call.clone()).await;
	let closed = client.close();
	tracing::info!(%closed, "session finished");

	let outcome = outcome.with_context(|| format!("{} failed", describe(&call)))?;
	report(&call, outcome)
}

fn build_call(command: &Commands) -> Result<UbusCall> {
	match command {
		Commands::Call {
			object,
			method,
			args,
			expect,
		} => {
			let args = parse_json(args, "ARGS_JSON")?;
			if !args.is_object() {
				bail!("ARGS_JSON must be a JSON object, got {}", args);
			}

			let call = UbusCall::call(object.as_str(), method.as_str(), args);
			match expect {
				Some(expected) => Ok(call.expect(parse_json(expected, "--expect")?)),
				None => Ok(call),
			}
		}
		Commands::List { pattern } => Ok(UbusCall::list(pattern.as_str())),
	}
}

fn parse_json(text: &str, what: &str) -> Result<Value> {
	serde_json::from_str(text).with_context(|| format!("{} is not valid JSON: {}", what, text))
}

fn describe(call: &UbusCall) -> String {
	let names: Vec<&str> = call.params().iter().take(2).filter_map(Value::as_str).collect();
	format!("{} {}", call.method(), names.join(" "))
}

/// Prints a successful payload, or turns a non-zero status into an error.
fn report(call: &UbusCall, outcome: CallOutcome) -> Result<()> {
	if let Some(expected) = call.expected_result() {
		if outcome.matches(expected) {
			tracing::info!("response matches expected result");
		} else {
			tracing::warn!(%expected, actual = %outcome, "response differs from expected result");
		}
	}

	match outcome {
		CallOutcome::Success(payload) => {
			println!("{}", serde_json::to_string_pretty(&payload)?);
			Ok(())
		}
		CallOutcome::Failed(status) => {
			bail!("{} returned status {}: {}", describe(call), status.code(), status.label())
		}
	}
}
