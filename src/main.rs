#![warn(clippy::all, clippy::nursery, clippy::pedantic)]

mod console;

use std::{
	env,
	path::PathBuf,
	thread,
	time::Duration,
};

use chmview::{
	config::ConfigManager,
	document::DirectoryProvider,
	shell::{UserEvent, ViewerShell},
};
use log::info;

struct CmdLineArgs {
	file: Option<PathBuf>,
	autotest: bool,
}

fn main() {
	env_logger::init();
	let args = parse_cmd_line_args();
	let mut config = ConfigManager::new();
	if let Some(path) = default_config_path() {
		config.initialize(&path);
	}
	let mut shell = ViewerShell::new(Box::new(DirectoryProvider), config);
	if let Some(path) = args.file {
		shell.post_event(UserEvent::OpenFile { path });
	}
	if args.autotest {
		run_autotest(&mut shell);
		return;
	}
	console::run(&mut shell);
}

/// Production driver for the autotest state machine: a plain timer loop
/// feeding ticks through the normal event queue until the machine asks
/// for shutdown.
fn run_autotest(shell: &mut ViewerShell) {
	shell.begin_autotest();
	let tick = Duration::from_millis(shell.config().app().autotest_tick_ms);
	while !shell.shutdown_requested() {
		shell.post_event(UserEvent::RunAutotestStep);
		if shell.shutdown_requested() {
			break;
		}
		thread::sleep(tick);
	}
	info!("autotest run complete");
}

fn parse_cmd_line_args() -> CmdLineArgs {
	let mut args = CmdLineArgs { file: None, autotest: false };
	for arg in env::args().skip(1) {
		if arg == "--autotest" {
			args.autotest = true;
		} else if args.file.is_none() {
			args.file = Some(PathBuf::from(arg));
		}
	}
	args
}

fn default_config_path() -> Option<PathBuf> {
	let base = env::var_os("XDG_CONFIG_HOME").map(PathBuf::from).or_else(|| {
		env::var_os("APPDATA")
			.map(PathBuf::from)
			.or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
	})?;
	Some(base.join("chmview").join("chmview.toml"))
}
