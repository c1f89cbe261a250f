// src/cli.rs

//! CLI command table.
//!
//! Holds every registered subcommand plus the two built-in ones:
//! - `server` / `s`: serve the registered routes over HTTP
//! - `tls_server` / `tls`: serve them over HTTPS
//!
//! Commands are assembled with clap's builder API because their flags are
//! only known once routes are registered.

use anyhow::Result;
use clap::{ArgMatches, Args, Command};
use std::{collections::HashSet, io::Write, sync::Arc};

use crate::error::RouteError;

/// Runs one parsed subcommand, writing its output to the given stream.
pub type CliRunner = Arc<dyn Fn(&ArgMatches, &mut dyn Write) -> Result<()> + Send + Sync>;

pub const SERVER: &str = "server";
pub const TLS_SERVER: &str = "tls_server";

// Overrides accepted by both serving commands.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    /// Listen IP address (overrides config)
    #[arg(long)]
    pub addr: Option<String>,

    /// Listen port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

struct CliCommand {
    command: Command,
    run: CliRunner,
}

pub struct CliServer {
    name: String,
    about: Option<String>,
    commands: Vec<CliCommand>,
}

impl CliServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            commands: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_about(&mut self, about: impl Into<String>) {
        self.about = Some(about.into());
    }

    /// Reject a command whose name or aliases are already taken.
    pub fn check(&self, command: &Command) -> Result<(), RouteError> {
        let taken = self.taken_names();
        let wanted = std::iter::once(command.get_name()).chain(command.get_all_aliases());
        for name in wanted {
            if taken.contains(name) {
                return Err(RouteError::DuplicateCommand(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn add(&mut self, command: Command, run: CliRunner) -> Result<(), RouteError> {
        self.check(&command)?;
        tracing::debug!(command = command.get_name(), "cli command registered");
        self.commands.push(CliCommand { command, run });
        Ok(())
    }

    pub fn runner(&self, name: &str) -> Option<&CliRunner> {
        self.commands
            .iter()
            .find(|c| c.command.get_name() == name)
            .map(|c| &c.run)
    }

    /// Full command tree: registered commands first, then the built-ins.
    pub fn command(&self) -> Command {
        let mut root = Command::new(self.name.clone());
        if let Some(about) = &self.about {
            root = root.about(about.clone());
        }

        root.subcommands(self.commands.iter().map(|c| c.command.clone()))
            .subcommand(ServeArgs::augment_args(
                Command::new(SERVER)
                    .visible_alias("s")
                    .about("start a api server"),
            ))
            .subcommand(ServeArgs::augment_args(
                Command::new(TLS_SERVER)
                    .visible_alias("tls")
                    .about("start a api tls server"),
            ))
    }

    fn taken_names(&self) -> HashSet<&str> {
        let mut taken: HashSet<&str> = [SERVER, "s", TLS_SERVER, "tls", "help"].into();
        for c in &self.commands {
            taken.insert(c.command.get_name());
            taken.extend(c.command.get_all_aliases());
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CliRunner {
        Arc::new(|_: &ArgMatches, _: &mut dyn Write| Ok(()))
    }

    #[test]
    fn builtins_are_always_present() {
        let cli = CliServer::new("test");
        let root = cli.command();
        let names: Vec<_> = root.get_subcommands().map(|c| c.get_name()).collect();
        assert_eq!(names, vec!["server", "tls_server"]);

        let server = root.find_subcommand("s").unwrap();
        assert_eq!(server.get_name(), "server");
        assert!(root.find_subcommand("tls").is_some());
    }

    #[test]
    fn duplicate_names_and_aliases_are_rejected() {
        let mut cli = CliServer::new("test");
        cli.add(Command::new("items_list").visible_alias("items/list"), noop())
            .unwrap();

        assert_eq!(
            cli.add(Command::new("items_list"), noop()).unwrap_err(),
            RouteError::DuplicateCommand("items_list".to_string())
        );
        assert_eq!(
            cli.add(Command::new("other").alias("items/list"), noop())
                .unwrap_err(),
            RouteError::DuplicateCommand("items/list".to_string())
        );
        assert!(cli.add(Command::new("s"), noop()).is_err());
    }

    #[test]
    fn serve_args_parse_overrides() {
        let m = CliServer::new("test")
            .command()
            .try_get_matches_from(["test", "tls", "--port", "8443"])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, TLS_SERVER);

        use clap::FromArgMatches;
        let args = ServeArgs::from_arg_matches(sub).unwrap();
        assert_eq!(
            args,
            ServeArgs {
                addr: None,
                port: Some(8443)
            }
        );
    }
}
