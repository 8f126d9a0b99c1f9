use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

/// Help output colors, matching cargo.
const STYLES: Styles = Styles::styled()
	.header(AnsiColor::Green.on_default().bold())
	.usage(AnsiColor::Green.on_default().bold())
	.literal(AnsiColor::Cyan.on_default())
	.placeholder(AnsiColor::Cyan.on_default())
	.valid(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "webbridge")]
#[command(about = "Serve bundled web assets to embedded browsers over loopback")]
#[command(version)]
#[command(styles = STYLES)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Serve a directory on 127.0.0.1 until interrupted
	Serve(ServeArgs),

	/// Print the content type the server would send for a file
	#[command(alias = "mime")]
	ContentType {
		/// File to inspect
		path: PathBuf,
	},
}

#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct ServeArgs {
	/// Port to listen on (0 picks a free port)
	#[arg(short, long, env = "WEBBRIDGE_PORT")]
	pub port: Option<u16>,

	/// Directory to serve
	#[arg(short, long, env = "WEBBRIDGE_ROOT", value_name = "DIR")]
	pub root: Option<PathBuf>,

	/// JSON file with `port` and `root`; flags take precedence
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,
}
