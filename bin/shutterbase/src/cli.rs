use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shutterbase",
    about = "Catalog maintenance for the Shutterbase photo gallery",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Give every record of one gallery day a well-formed identifier
    Migrate {
        /// Gallery day bucket (1-9)
        #[arg(long)]
        day: u8,
    },
    /// Report malformed identifiers and orphaned blobs
    Verify,
    /// Per-day catalog counts
    Stats,
}
