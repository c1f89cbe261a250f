// src/router.rs

//! Dual registration of handlers.
//!
//! A handler registered here can be reached:
//! - over HTTP, at a path and method
//! - from the CLI, as a subcommand named after the path (`/` → `_`)
//!
//! Either way it receives one `Action` to read parameters from and one
//! `Response` to write its result to, both scoped to that invocation.
//! Registration is append-only and finished before serving starts.

use anyhow::{bail, Context as _, Result};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{any, delete, get, head, options, patch, post, put, MethodRouter},
};
use clap::{error::ErrorKind, ArgMatches, Command, FromArgMatches};
use serde::Serialize;
use std::{collections::HashSet, ffi::OsString, io::Write, sync::Arc};

use crate::action::{Action, CliAction, HttpAction};
use crate::cli::{CliRunner, CliServer, ServeArgs, SERVER, TLS_SERVER};
use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::{RouteError, RouterError};
use crate::flags::{synthesize, FlagSpec};
use crate::params::Params;
use crate::response::{CliResponse, HttpResponse, Response};
use crate::server;

/// A handler shared by the HTTP and CLI paths.
pub type Handler = Arc<dyn Fn(&Action, &mut Response<'_>) + Send + Sync>;

/// Method name accepted by `add_api_route` that matches every method.
pub const ANY_METHOD: &str = "Any";

const METHODS: [&str; 8] = [
    "GET", "POST", "DELETE", "PATCH", "PUT", "OPTIONS", "HEAD", ANY_METHOD,
];

/// Registration record of one route.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub path: String,
    pub method: String,
    pub description: String,
    /// Type name of the parameter struct
    pub params: &'static str,
    /// Type name of the documented response payload, if any
    pub response: Option<&'static str>,
    pub flags: Vec<FlagSpec>,
}

impl Route {
    pub fn new(
        path: impl Into<String>,
        method: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            description: description.into(),
            params: std::any::type_name::<()>(),
            response: None,
            flags: Vec::new(),
        }
    }

    /// Use `P` as the parameter template; its flags are synthesized here.
    pub fn params<P: Params>(mut self) -> Self {
        self.params = std::any::type_name::<P>();
        self.flags = synthesize::<P>();
        self
    }

    pub fn response<R>(mut self) -> Self {
        self.response = Some(std::any::type_name::<R>());
        self
    }

    /// Route path without its leading `/`.
    pub fn cli_path(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}

pub struct Router {
    context: Arc<Context>,
    http: axum::Router,
    registered: HashSet<(String, String)>,
    routes: Vec<Route>,
    cli: CliServer,
}

impl Router {
    pub fn new(config: RouterConfig) -> Result<Self, RouterError> {
        config.validate()?;

        tracing::debug!(
            addr = %config.addr,
            port = config.port,
            debug_mode = config.debug_mode,
            tls = config.tls.is_some(),
            "router created"
        );

        Ok(Self {
            context: Arc::new(Context::new(config)),
            http: axum::Router::new(),
            registered: HashSet::new(),
            routes: Vec::new(),
            cli: CliServer::new(env!("CARGO_PKG_NAME")),
        })
    }

    /// Name and description shown in CLI help.
    pub fn set_app(&mut self, name: impl Into<String>, about: impl Into<String>) {
        self.cli.set_name(name);
        self.cli.set_about(about);
    }

    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.context)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /* ---------------- registration ---------------- */

    /// Register a handler as both an HTTP route and a CLI subcommand.
    ///
    /// The CLI path is the route path without its leading `/`. Nothing is
    /// registered unless both registrations are possible.
    pub fn add_multi_route<H>(&mut self, route: Route, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&Action, &mut Response<'_>) + Send + Sync + 'static,
    {
        let cli_path = route.cli_path().to_string();
        let description = route.description.clone();
        let command = cli_command(&cli_path, &description, &route.flags)?;

        self.check_api(&route)?;
        self.cli.check(&command)?;

        let handler: Handler = Arc::new(handler);
        self.register_api(route, Arc::clone(&handler));
        self.register_cli(command, handler)
    }

    /// Register a handler as an HTTP route.
    ///
    /// Methods: `GET POST DELETE PATCH PUT OPTIONS HEAD` and `Any`.
    ///
    /// Paths use axum's syntax (`/users/:id`, `/files/*rest`). Two paths that
    /// capture different parameters at the same position are rejected with
    /// `RouteError::ConflictingPath`. Any other overlap axum refuses still
    /// panics here, as `axum::Router::route` does.
    pub fn add_api_route<H>(&mut self, route: Route, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&Action, &mut Response<'_>) + Send + Sync + 'static,
    {
        self.check_api(&route)?;
        self.register_api(route, Arc::new(handler));
        Ok(())
    }

    /// Register a handler as a CLI subcommand with flags synthesized from `P`.
    ///
    /// `items/list` becomes the command `items_list` with alias `items/list`.
    pub fn add_cli_command_by_struct<P, H>(
        &mut self,
        path: &str,
        description: &str,
        handler: H,
    ) -> Result<(), RouteError>
    where
        P: Params,
        H: Fn(&Action, &mut Response<'_>) + Send + Sync + 'static,
    {
        let command = cli_command(path, description, &synthesize::<P>())?;
        self.register_cli(command, Arc::new(handler))
    }

    /// Register a hand-built clap command.
    pub fn add_cli_command<F>(&mut self, command: Command, action: F) -> Result<(), RouteError>
    where
        F: Fn(&ArgMatches, &mut dyn Write) -> Result<()> + Send + Sync + 'static,
    {
        self.cli.add(command, Arc::new(action))
    }

    fn check_api(&self, route: &Route) -> Result<(), RouteError> {
        if !route.path.starts_with('/') {
            return Err(RouteError::InvalidPath(route.path.clone()));
        }
        if !METHODS.contains(&route.method.as_str()) {
            tracing::warn!(
                method = %route.method,
                path = %route.path,
                "unsupported HTTP method, route not registered"
            );
            return Err(RouteError::UnsupportedMethod {
                method: route.method.clone(),
                path: route.path.clone(),
            });
        }

        if let Some((_, existing)) = self
            .registered
            .iter()
            .find(|(_, path)| paths_conflict(path, &route.path))
        {
            return Err(RouteError::ConflictingPath {
                path: route.path.clone(),
                existing: existing.clone(),
            });
        }

        let clash = self.registered.iter().any(|(method, path)| {
            path == &route.path
                && (method == &route.method || method == ANY_METHOD || route.method == ANY_METHOD)
        });
        if clash {
            return Err(RouteError::DuplicateRoute {
                method: route.method.clone(),
                path: route.path.clone(),
            });
        }
        Ok(())
    }

    /// Caller has run `check_api`.
    fn register_api(&mut self, route: Route, handler: Handler) {
        let context = Arc::clone(&self.context);
        let endpoint = move |req: Request<Body>| {
            let handler = Arc::clone(&handler);
            let context = Arc::clone(&context);
            async move {
                let action = Action::Http(HttpAction::from_request(req, context).await);
                invoke_http(&handler, &action)
            }
        };

        let Some(methods) = method_router(&route.method, endpoint) else {
            return;
        };

        if self.context.debug_mode() {
            tracing::info!(method = %route.method, path = %route.path, "api route registered");
        } else {
            tracing::debug!(method = %route.method, path = %route.path, "api route registered");
        }

        let http = std::mem::take(&mut self.http);
        self.http = http.route(&route.path, methods);
        self.registered
            .insert((route.method.clone(), route.path.clone()));
        self.routes.push(route);
    }

    fn register_cli(&mut self, command: Command, handler: Handler) -> Result<(), RouteError> {
        let context = Arc::clone(&self.context);
        let run: CliRunner = Arc::new(move |matches: &ArgMatches, out: &mut dyn Write| {
            let action = Action::Cli(CliAction::new(matches.clone(), Arc::clone(&context)));
            let mut response = Response::Cli(CliResponse::new(out));
            handler(&action, &mut response);
            Ok(())
        });
        self.cli.add(command, run)
    }

    /* ---------------- running ---------------- */

    /// The HTTP application with fallback and middleware applied.
    pub fn http_app(&self) -> axum::Router {
        server::app(self.http.clone())
    }

    /// The CLI command tree.
    pub fn command(&self) -> Command {
        self.cli.command()
    }

    /// Parse the process arguments and run the selected command.
    ///
    /// Argument errors print clap's message and exit.
    pub async fn run(self) -> Result<()> {
        let mut stdout = std::io::stdout();
        match self.run_from(std::env::args_os(), &mut stdout).await {
            Err(e) => match e.downcast::<clap::Error>() {
                Ok(clap_err) => clap_err.exit(),
                Err(e) => Err(e),
            },
            ok => ok,
        }
    }

    /// Run the command selected by `args`, writing command output to `out`.
    ///
    /// `args[0]` is the program name. Help is written to `out`; invalid
    /// arguments are returned as a `clap::Error`.
    pub async fn run_from<I, T>(self, args: I, out: &mut dyn Write) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut root = self.command();
        let matches = match root.try_get_matches_from_mut(args) {
            Ok(m) => m,
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    write!(out, "{}", e.render()).context("Failed to write help")?;
                    return Ok(());
                }
                _ => return Err(e.into()),
            },
        };

        match matches.subcommand() {
            None => {
                write!(out, "{}", root.render_help()).context("Failed to write help")?;
                Ok(())
            }
            Some((SERVER, sub)) => {
                let args = ServeArgs::from_arg_matches(sub)?;
                self.serve(args, false).await
            }
            Some((TLS_SERVER, sub)) => {
                let args = ServeArgs::from_arg_matches(sub)?;
                self.serve(args, true).await
            }
            Some((name, sub)) => {
                let run = self
                    .cli
                    .runner(name)
                    .with_context(|| format!("No runner for command {:?}", name))?;
                tracing::debug!(command = name, "running cli command");
                run(sub, out)
            }
        }
    }

    async fn serve(self, args: ServeArgs, tls: bool) -> Result<()> {
        let mut config = self.context.config().clone();
        if let Some(addr) = args.addr {
            config.addr = addr;
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        let addr = config.socket_addr()?;
        let app = self.http_app();

        if tls {
            let Some(tls_config) = &config.tls else {
                bail!("tls_server needs a TLS key and certificate in the router config");
            };
            server::serve_tls(app, addr, tls_config).await
        } else {
            server::serve(app, addr).await
        }
    }
}

/// Build the CLI command for a path: `/` becomes `_`, the path is an alias.
fn cli_command(path: &str, description: &str, flags: &[FlagSpec]) -> Result<Command, RouteError> {
    let name = path.replace('/', "_");

    let mut seen = HashSet::new();
    for flag in flags {
        if flag.name == "help" {
            return Err(RouteError::ReservedFlag {
                command: name,
                flag: flag.name.to_string(),
            });
        }
        if !seen.insert(flag.name) {
            return Err(RouteError::DuplicateFlag {
                command: name,
                flag: flag.name.to_string(),
            });
        }
    }

    let mut command = Command::new(name.clone())
        .about(description.to_string())
        .args(flags.iter().map(FlagSpec::to_arg));
    if name != path {
        command = command.visible_alias(path.to_string());
    }
    Ok(command)
}

/// Whether axum would refuse to hold both paths: at the first segment where
/// they differ, both capture (`:name` / `*name`).
fn paths_conflict(a: &str, b: &str) -> bool {
    let is_capture = |seg: &str| seg.starts_with(':') || seg.starts_with('*');
    a.split('/')
        .zip(b.split('/'))
        .find(|(x, y)| x != y)
        .is_some_and(|(x, y)| is_capture(x) && is_capture(y))
}

fn method_router<H, T>(method: &str, endpoint: H) -> Option<MethodRouter>
where
    H: axum::handler::Handler<T, ()>,
    T: 'static,
{
    let router = match method {
        "GET" => get(endpoint),
        "POST" => post(endpoint),
        "DELETE" => delete(endpoint),
        "PATCH" => patch(endpoint),
        "PUT" => put(endpoint),
        "OPTIONS" => options(endpoint),
        "HEAD" => head(endpoint),
        ANY_METHOD => any(endpoint),
        _ => return None,
    };
    Some(router)
}

fn invoke_http(handler: &Handler, action: &Action) -> axum::response::Response {
    let mut response = Response::Http(HttpResponse::new());
    handler(action, &mut response);
    match response {
        Response::Http(reply) => reply.into_response(),
        Response::Cli(_) => {
            tracing::error!("http handler replaced its response with a cli response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
