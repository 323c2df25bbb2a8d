use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

/// Command-line front end for the collection dashboard's access control.
#[derive(Parser, Debug)]
#[command(name = "vitrine", about = "Vitrine access control console", version)]
pub struct Cli {
    /// Key-value store file (overrides $VITRINE_STORE_PATH)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Location reported to the access-control layer (audit path, redirect target)
    #[arg(long, global = true, default_value = "/")]
    pub location: String,

    /// Log output: json or compact
    #[arg(long, global = true, default_value = "json")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session, replacing any current one
    Login {
        username: String,
        /// Role identifier (guest, researcher, curator, board, auditor, admin)
        #[arg(long, short)]
        role: String,
        /// Display name (defaults to the username)
        #[arg(long)]
        name: Option<String>,
        /// Record that a second factor was presented
        #[arg(long)]
        two_factor: bool,
    },
    /// End the current session
    Logout {
        #[arg(long, default_value = "User logged out")]
        reason: String,
    },
    /// Show the current session
    Whoami,
    /// List the role registry
    Roles,
    /// Check whether the current session holds a permission
    Check {
        permission: String,
        /// Print the full decision explanation
        #[arg(long)]
        explain: bool,
    },
    /// Gate an action on a permission (non-zero exit when denied)
    Require { permission: String, action: String },
    /// Gate a protected view (non-zero exit when denied)
    Gate {
        #[arg(value_enum)]
        route: RouteArg,
    },
    /// Run the periodic session check once, or repeatedly with --ticks
    Watch {
        /// Number of checks to run, one per check interval
        #[arg(long, default_value_t = 1)]
        ticks: u32,
    },
    /// Query the audit log (newest first)
    Audit {
        #[command(flatten)]
        filter: FilterArgs,
        /// Maximum entries to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Export the audit log
    Export {
        /// json or csv
        format: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Consume the pending login redirect, if any
    Redirect,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteArg {
    Dashboard,
    Audit,
}

#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub event: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_login_with_globals() {
        let cli = Cli::parse_from([
            "vitrine", "--store", "/tmp/s.json", "login", "alice", "--role", "curator", "--two-factor",
        ]);
        let Commands::Login { username, role, name, two_factor } = cli.command else {
            panic!("expected login");
        };
        assert_eq!(username, "alice");
        assert_eq!(role, "curator");
        assert_eq!(name, None);
        assert!(two_factor);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn parses_audit_filters() {
        let cli = Cli::parse_from([
            "vitrine", "audit", "--event", "session_created", "--since", "2024-01-01T00:00:00Z",
        ]);
        let Commands::Audit { filter, limit } = cli.command else {
            panic!("expected audit");
        };
        assert_eq!(filter.event.as_deref(), Some("session_created"));
        assert!(filter.since.is_some());
        assert_eq!(limit, None);
    }
}
