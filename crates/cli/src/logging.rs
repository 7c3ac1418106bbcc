use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = errors only
	// 1 (-v) = connection lifecycle
	// 2+ (-vv) = every frame
	let filter = verbosity_filter(verbosity);

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

fn verbosity_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		1 => "info,ubus_runtime::transport=warn",
		_ => "debug,tokio_tungstenite=info,tungstenite=info",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_parse() {
		for verbosity in 0..4 {
			assert!(EnvFilter::try_new(verbosity_filter(verbosity)).is_ok());
		}
	}
}
