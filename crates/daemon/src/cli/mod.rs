pub mod op;
pub mod ops;

use std::path::PathBuf;

use clap::Parser;

pub use op::{Op, OpContext};

/// Mount your Flickr photostream as a read-only filesystem
#[derive(Parser, Debug)]
#[command(name = "flickrfs", version, about)]
pub struct Cli {
    /// Config file [default: ~/.flickrfs-ng/config.toml]
    #[arg(long, global = true, env = "FLICKRFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Content cache database, overriding the config file
    #[arg(long, global = true)]
    pub cache_path: Option<PathBuf>,

    /// Number of photos kept in the content cache, overriding the config file
    #[arg(long, global = true)]
    pub cache_capacity: Option<usize>,

    #[command(subcommand)]
    pub command: ops::Command,
}
