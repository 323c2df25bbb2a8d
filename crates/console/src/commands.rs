//! Execution of console commands against an [`AccessControl`] context.

use std::io::Write;

use anyhow::{Context, Result, bail};

use vitrine_auth::{AccessControl, AuditEntry, AuditQuery, ExportFormat, Route, SessionCheck};
use vitrine_core::{Clock, KeyValueStore};

use crate::cli::{Commands, FilterArgs, RouteArg};

/// Outcome of a command, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Denied,
}

impl From<FilterArgs> for AuditQuery {
    fn from(args: FilterArgs) -> Self {
        AuditQuery {
            user_id: args.user,
            event: args.event,
            start: args.since,
            end: args.until,
        }
    }
}

pub fn run<S, C, W>(ac: &mut AccessControl<S, C>, command: Commands, out: &mut W) -> Result<Outcome>
where
    S: KeyValueStore,
    C: Clock,
    W: Write,
{
    match command {
        Commands::Login { username, role, name, two_factor } => {
            let name = name.unwrap_or_else(|| username.clone());
            let session = ac.create_session(username, role, name, two_factor);
            if ac.current_role().is_none() {
                tracing::warn!(role = %session.role, "session role is not defined; it grants nothing");
            }
            writeln!(out, "logged in as {} ({})", session.username, session.role)?;
            if let Some(section) = ac.registry().default_section(session.role.as_str()) {
                writeln!(out, "default section: {section}")?;
            }
        }
        Commands::Logout { reason } => {
            if !ac.is_authenticated() {
                writeln!(out, "no active session")?;
                return Ok(Outcome::Ok);
            }
            let redirect = ac.logout(&reason);
            writeln!(out, "logged out: {}", redirect.message)?;
        }
        Commands::Whoami => match ac.current_session() {
            Some(session) => {
                writeln!(out, "{}", serde_json::to_string_pretty(session)?)?;
                if let Some(remaining) = ac.time_remaining() {
                    writeln!(out, "expires in {}m", remaining.num_minutes())?;
                }
            }
            None => writeln!(out, "not logged in")?,
        },
        Commands::Roles => {
            let roles: Vec<_> = ac.registry().roles().collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&roles)?)?;
        }
        Commands::Check { permission, explain } => {
            if explain {
                let explanation = ac.explain(&permission);
                writeln!(out, "{}", serde_json::to_string_pretty(&explanation)?)?;
            } else {
                writeln!(out, "{}", ac.has_permission(&permission))?;
            }
        }
        Commands::Require { permission, action } => {
            if let Err(err) = ac.require_permission(&permission, &action) {
                writeln!(out, "{err}")?;
                return Ok(Outcome::Denied);
            }
            writeln!(out, "allowed: {action}")?;
        }
        Commands::Gate { route } => {
            let route = match route {
                RouteArg::Dashboard => Route::Dashboard,
                RouteArg::Audit => Route::AuditLog,
            };
            if let Err(redirect) = ac.authorize_route(route) {
                writeln!(out, "redirect to login: {} (return to {})", redirect.message, redirect.return_to)?;
                return Ok(Outcome::Denied);
            }
            writeln!(out, "access granted")?;
        }
        Commands::Watch { ticks } => {
            let interval = ac.config().check_interval;
            for tick in 0..ticks {
                if tick > 0 {
                    std::thread::sleep(interval);
                }
                match ac.check_session() {
                    SessionCheck::NoSession => writeln!(out, "no active session")?,
                    SessionCheck::Valid { remaining } => {
                        writeln!(out, "session valid for {}m", remaining.num_minutes())?
                    }
                    SessionCheck::ExpiringSoon { remaining } => writeln!(
                        out,
                        "warning: session expiring soon ({}s left)",
                        remaining.num_seconds()
                    )?,
                    SessionCheck::Expired(redirect) => {
                        writeln!(out, "redirect to login: {}", redirect.message)?;
                        return Ok(Outcome::Denied);
                    }
                }
            }
        }
        Commands::Audit { filter, limit } => {
            let entries = ac.query_audit(&AuditQuery::from(filter));
            let shown = limit.unwrap_or(entries.len()).min(entries.len());
            for entry in &entries[..shown] {
                writeln!(out, "{}", summary(entry))?;
            }
        }
        Commands::Export { format, filter, output } => {
            let format: ExportFormat = format.parse()?;
            let rendered = ac.export_audit(format, &AuditQuery::from(filter))?;
            match output {
                Some(path) => std::fs::write(&path, rendered)
                    .with_context(|| format!("failed to write export to {}", path.display()))?,
                None => writeln!(out, "{rendered}")?,
            }
        }
        Commands::Redirect => match ac.take_login_redirect() {
            Some(redirect) => writeln!(out, "{}", serde_json::to_string_pretty(&redirect)?)?,
            None => writeln!(out, "no pending redirect")?,
        },
    }

    Ok(Outcome::Ok)
}

fn summary(entry: &AuditEntry) -> String {
    format!(
        "{} {:<22} {}({}) {} {}",
        entry.timestamp.to_rfc3339(),
        entry.event,
        entry.user_id,
        entry.user_role,
        entry.path,
        entry.data
    )
}

/// Reject obviously wrong store locations before touching the filesystem.
pub fn validate_store_path(path: &std::path::Path) -> Result<()> {
    if path.is_dir() {
        bail!("store path {} is a directory", path.display());
    }
    Ok(())
}
