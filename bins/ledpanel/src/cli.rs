use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ledpanel_core::SectionMode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Terminal control panel for LED strip controllers",
    long_about = "Loads the settings form from an LED strip controller over HTTP, keeps it in sync\n\
                  over the controller's WebSocket and writes changes back as you edit them.\n\
                  Settings are read from ~/.ledpanel/settings.json; flags override the file."
)]
pub struct Args {
    /// Device host name or address, with an optional port
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Settings file to use instead of ~/.ledpanel/settings.json
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Section display: accordion or navigation
    #[arg(short, long, global = true)]
    pub sections: Option<SectionMode>,

    /// Log file used while the terminal UI is running
    #[arg(long, global = true, default_value = "ledpanel.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive settings form (default)
    Tui,
    /// Print the schema and current values
    Dump,
    /// Write one value, e.g. `set brightness 120` or `set solidColor 255,0,64`
    Set { name: String, value: String },
    /// Log live updates until Ctrl+C
    Watch,
    /// Print the effective settings
    Config {
        /// Store the effective settings, flags included
        #[arg(long)]
        save: bool,
    },
}
