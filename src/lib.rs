// src/lib.rs

//! acroute
//!
//! Expose one handler function as an HTTP endpoint and a CLI subcommand at
//! the same time.
//!
//! - Parameter structs describe their fields once (`params::Params`); that
//!   schema drives CLI flag synthesis and HTTP/CLI value binding.
//! - Handlers receive an `Action` (read side) and a `Response` (write side)
//!   whatever the transport.
//! - `Router` registers handlers with axum and clap and runs the CLI, which
//!   also carries the `server` / `tls_server` commands.
//!
//! ```no_run
//! use acroute::{Action, Response, Route, Router, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new(RouterConfig::default())?;
//!     router.add_multi_route(Route::new("/hello", "GET", "say hello"), |_: &Action, r: &mut Response<'_>| {
//!         r.respond(200, "hello");
//!     })?;
//!     router.run().await
//! }
//! ```

pub mod action;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod flags;
pub mod logging;
pub mod params;
pub mod response;
pub mod router;
pub mod server;
pub mod tags;
pub mod value;

pub use action::{Action, ActionKind};
pub use config::{LogConfig, RouterConfig, TlsConfig};
pub use context::Context;
pub use error::{BindError, RouteError, RouterError};
pub use params::{Params, Schema, Slot};
pub use response::Response;
pub use router::{Route, Router};
pub use tags::Tags;
pub use value::Param;
