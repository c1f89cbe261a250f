// src/main.rs

//! acroute demo
//!
//! Registers a few sample handlers, each reachable both as an HTTP route
//! and as a CLI subcommand:
//!
//! acroute items_list --page 2          # CLI
//! acroute server                       # then GET /items/list?page=2
//!
//! Configuration comes from the YAML file named by `ACROUTE_CONFIG`
//! (a `.env` file is honoured), falling back to built-in defaults.

mod demo;

use acroute::{logging, Route, Router, RouterConfig};
use anyhow::Result;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = match std::env::var_os("ACROUTE_CONFIG") {
        Some(path) => RouterConfig::load(&PathBuf::from(path))?,
        None => RouterConfig::default(),
    };
    logging::init(&config.log)?;

    let mut router = Router::new(config)?;
    router.set_app("acroute", "HTTP and CLI from one set of handlers");

    router.add_multi_route(Route::new("/hello", "GET", "say hello"), demo::hello)?;
    router.add_multi_route(
        Route::new("/items/list", "GET", "list items")
            .params::<demo::ListItems>()
            .response::<Vec<demo::Item>>(),
        demo::list_items,
    )?;
    router.add_multi_route(
        Route::new("/items/create", "POST", "create an item")
            .params::<demo::CreateItem>()
            .response::<demo::Item>(),
        demo::create_item,
    )?;

    router.run().await
}
