use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::PathBuf;

use replicr::compare::ComparePolicy;
use replicr::config::Config;
use replicr::driver;
use replicr::error::ErrorKind;
use replicr::logging::init_tracing;

fn cli() -> Command {
	Command::new("replicr")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Keeps a replica directory identical to a source directory")
		.arg(Arg::new("source").value_name("SOURCE").value_parser(value_parser!(PathBuf)))
		.arg(Arg::new("replica").value_name("REPLICA").value_parser(value_parser!(PathBuf)))
		.arg(
			Arg::new("interval")
				.value_name("INTERVAL")
				.help("Seconds between synchronization passes")
				.value_parser(value_parser!(u64)),
		)
		.arg(Arg::new("log_file").value_name("LOG_FILE").value_parser(value_parser!(PathBuf)))
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("TOML config file (command line wins over file)")
				.value_parser(value_parser!(PathBuf)),
		)
		.arg(
			Arg::new("exclude")
				.short('x')
				.long("exclude")
				.value_name("GLOB")
				.help("Leave matching entries alone on both sides")
				.action(ArgAction::Append),
		)
		.arg(
			Arg::new("always_checksum")
				.long("always-checksum")
				.help("Ignore modification times, decide on size and content digest")
				.action(ArgAction::SetTrue),
		)
		.arg(
			Arg::new("propagate")
				.long("propagate")
				.value_name("KIND")
				.help("Abort the pass on this error kind (io, not-found, permission-denied, contract, config)")
				.value_parser(value_parser!(ErrorKind))
				.action(ArgAction::Append),
		)
		.arg(
			Arg::new("once")
				.long("once")
				.help("Run a single pass and exit")
				.action(ArgAction::SetTrue),
		)
		.arg(Arg::new("log_level").long("log-level").value_name("LEVEL"))
}

/// Layer command line values over the config file (or defaults)
fn merge_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let mut config = match matches.get_one::<PathBuf>("config") {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};

	if let Some(source) = matches.get_one::<PathBuf>("source") {
		config.source = Some(source.clone());
	}
	if let Some(replica) = matches.get_one::<PathBuf>("replica") {
		config.replica = Some(replica.clone());
	}
	if let Some(interval) = matches.get_one::<u64>("interval") {
		config.interval_secs = Some(*interval);
	}
	if let Some(log_file) = matches.get_one::<PathBuf>("log_file") {
		config.log_file = Some(log_file.clone());
	}
	if let Some(patterns) = matches.get_many::<String>("exclude") {
		config.exclude_patterns.extend(patterns.cloned());
	}
	if let Some(kinds) = matches.get_many::<ErrorKind>("propagate") {
		config.propagate_errors.extend(kinds.copied());
	}
	if matches.get_flag("always_checksum") {
		config.compare = ComparePolicy::AlwaysChecksum;
	}
	if matches.get_flag("once") {
		config.once = true;
	}
	if let Some(level) = matches.get_one::<String>("log_level") {
		config.log_level = level.clone();
	}

	Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = cli().get_matches();
	let config = merge_config(&matches)?;

	init_tracing(&config.log_level);

	let job = config.into_job()?;
	driver::run(job).await?;

	Ok(())
}

// vim: ts=4
