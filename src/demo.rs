// src/demo.rs

use acroute::{Action, Params, Response, Schema, Slot, Tags};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub tags: Vec<String>,
}

const CATALOG: [(&str, f64); 5] = [
    ("keyboard", 49.0),
    ("mouse", 19.5),
    ("monitor", 229.0),
    ("headset", 79.9),
    ("webcam", 59.0),
];

fn catalog() -> Vec<Item> {
    CATALOG
        .iter()
        .enumerate()
        .map(|(i, (name, price))| Item {
            id: i as u64 + 1,
            name: name.to_string(),
            price: *price,
            tags: Vec::new(),
        })
        .collect()
}

/* ---------------- hello ---------------- */

pub fn hello(_: &Action, response: &mut Response<'_>) {
    response.respond(200, "hello");
}

/* ---------------- items/list ---------------- */

#[derive(Debug, Default)]
pub struct ListItems {
    pub page: usize,
    pub size: usize,
    pub keyword: String,
}

impl Params for ListItems {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .field("page", Tags::new().form("page").description("page number, from 1"), Slot::Uint(|p| &mut p.page))
            .field("size", Tags::new().form("size").description("items per page"), Slot::Uint(|p| &mut p.size))
            .field("keyword", Tags::new().form("keyword").description("name filter"), Slot::String(|p| &mut p.keyword));
    }
}

pub fn list_items(action: &Action, response: &mut Response<'_>) {
    let mut params = ListItems::default();
    if let Err(e) = action.bind_into(&mut params) {
        response.send_fail(&e.to_string());
        return;
    }

    let size = if params.size == 0 { 10 } else { params.size };
    let skip = params.page.saturating_sub(1).saturating_mul(size);

    let items: Vec<Item> = catalog()
        .into_iter()
        .filter(|item| item.name.contains(&params.keyword))
        .skip(skip)
        .take(size)
        .collect();

    response.respond(200, &items);
}

/* ---------------- items/create ---------------- */

#[derive(Debug, Default)]
pub struct CreateItem {
    pub name: String,
    pub price: f64,
    pub tags: Vec<String>,
}

impl Params for CreateItem {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .field("name", Tags::new().form("name").description("item name").binding("required"), Slot::String(|p| &mut p.name))
            .field("price", Tags::new().form("price").description("unit price"), Slot::Float64(|p| &mut p.price))
            .field("tags", Tags::new().form("tag").description("tag, repeatable"), Slot::StringList(|p| &mut p.tags));
    }
}

pub fn create_item(action: &Action, response: &mut Response<'_>) {
    let mut params = CreateItem::default();
    if let Err(e) = action.bind_into(&mut params) {
        response.send_fail(&e.to_string());
        return;
    }

    tracing::info!(name = %params.name, kind = ?action.kind(), "item created");

    let item = Item {
        id: CATALOG.len() as u64 + 1,
        name: params.name,
        price: params.price,
        tags: params.tags,
    };
    response.respond(200, &item);
}
