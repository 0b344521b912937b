//! Command line arguments

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_PORTS: [&str; 2] = ["/dev/ttyUSB0", "/dev/ttyUSB1"];

#[derive(Parser, Debug)]
#[command(name = "projmon", version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Log wire traffic and sweep details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: PollArgs,
}

impl Cli {
    /// The subcommand to execute, `run` when none was given
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Run(self.run))
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Poll the projectors forever and forward readings to InfluxDB
    Run(PollArgs),

    /// Sweep once and print the readings as JSON, without InfluxDB
    Once(PollArgs),

    /// Type raw commands (e.g. `get=lamp`) to one projector, `exit` to quit
    Console {
        #[arg(long, default_value = DEFAULT_PORTS[0])]
        port: String,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PollArgs {
    /// Serial ports, in projector order (projector 0 first)
    #[arg(
        long = "port",
        env = "PROJMON_PORTS",
        value_delimiter = ',',
        default_values = DEFAULT_PORTS
    )]
    pub ports: Vec<String>,

    /// Stop at the first failed query instead of skipping it
    #[arg(long)]
    pub strict: bool,
}
