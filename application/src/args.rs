//! Command line [`Args`].

use clap::Parser;

/// Tenancy lifecycle server: GraphQL API plus rent and notification
/// background tasks.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    ///
    /// A missing file is not an error: defaults and `CONF.*` environment
    /// variables are used instead.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Apply pending database migrations and exit without serving.
    #[arg(long)]
    pub migrate_only: bool,
}

impl Args {
    /// Parses [`Args`] of the current process.
    ///
    /// # Errors
    ///
    /// If the command line is malformed, or `--help`/`--version` is asked.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}
