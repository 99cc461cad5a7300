use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file to use instead of the one in the platform config directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Planet scheduler, rebuilding the index first if it was left inconsistent
    Serve,
    /// Rebuild the search index from the content repository
    Rebuild {
        /// Only rebuild the documents of this site
        #[arg(long)]
        site: Option<String>,
    },
    /// Show index statistics and subscription state
    Status,
    /// Return a failed subscription to active polling
    ResetSubscription {
        /// Subscription id as shown by `status`
        id: String,
    },
}

impl Cli {
    /// Log level for the number of `-v` flags
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["roller-search", "status"], "warn")]
    #[case(&["roller-search", "-v", "status"], "info")]
    #[case(&["roller-search", "status", "-vv"], "debug")]
    #[case(&["roller-search", "-vvvv", "serve"], "trace")]
    fn test_verbosity(#[case] args: &[&str], #[case] level: &str) {
        assert_eq!(Cli::parse_from(args).log_level(), level);
    }

    #[test]
    fn test_rebuild_site() {
        let cli = Cli::parse_from(["roller-search", "rebuild", "--site", "planet"]);
        assert!(matches!(cli.command, Some(Commands::Rebuild { site: Some(s) }) if s == "planet"));
    }
}
