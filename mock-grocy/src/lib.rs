//! In-memory Grocy stand-in for integration tests.
//!
//! Speaks just enough of the Grocy REST surface for the gateway: product and
//! barcode lookups, stock bookings, the shopping list, chores and system
//! info, plus an OpenFoodFacts-shaped lookup route for the external
//! name-lookup path. State lives behind a shared `RwLock` so tests can seed
//! and inspect it around requests. Numeric fields are served in the mixed
//! number/string spelling real backends produce.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// API key accepted on the `GROCY-API-KEY` header.
pub const API_KEY: &str = "mock-grocy-key";
/// Version reported by `/api/system/info`.
pub const VERSION: &str = "3.3.2";

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: i64,
    pub barcode: String,
    pub name: String,
    pub unit: String,
    pub stock_amount: f64,
    pub tare_weight: f64,
    pub enable_tare_weight_handling: bool,
    pub qu_factor_purchase_to_stock: f64,
    pub default_best_before_days: i64,
}

#[derive(Default)]
pub struct Inventory {
    pub products: HashMap<i64, Product>,
    /// `(product_id, amount)` entries on the default shopping list.
    pub shopping_list: Vec<(i64, f64)>,
    pub chores: Vec<(i64, String)>,
    /// Record of every stock/chore booking, for assertions.
    pub bookings: Vec<Value>,
}

pub type Db = Arc<RwLock<Inventory>>;

/// Seeded inventory covering the interesting shapes: plain stock, zero
/// stock with a never-expiring default, tare-weight handling, and a
/// purchase-to-stock conversion factor.
pub fn demo_db() -> Db {
    let mut inventory = Inventory::default();
    for product in [
        Product {
            id: 1,
            barcode: "4001234567890".to_string(),
            name: "Milk".to_string(),
            unit: "Liter".to_string(),
            stock_amount: 5.0,
            tare_weight: 0.0,
            enable_tare_weight_handling: false,
            qu_factor_purchase_to_stock: 1.0,
            default_best_before_days: 7,
        },
        Product {
            id: 2,
            barcode: "4009876543210".to_string(),
            name: "Flour".to_string(),
            unit: "Pack".to_string(),
            stock_amount: 0.0,
            tare_weight: 0.0,
            enable_tare_weight_handling: false,
            qu_factor_purchase_to_stock: 1.0,
            default_best_before_days: -1,
        },
        Product {
            id: 3,
            barcode: "4005555555555".to_string(),
            name: "Honey".to_string(),
            unit: "Jar".to_string(),
            stock_amount: 2.0,
            tare_weight: 0.25,
            enable_tare_weight_handling: true,
            qu_factor_purchase_to_stock: 1.0,
            default_best_before_days: 0,
        },
        Product {
            id: 4,
            barcode: "4007777777777".to_string(),
            name: "Eggs".to_string(),
            unit: "Piece".to_string(),
            stock_amount: 12.0,
            tare_weight: 0.0,
            enable_tare_weight_handling: false,
            qu_factor_purchase_to_stock: 6.0,
            default_best_before_days: 21,
        },
    ] {
        inventory.products.insert(product.id, product);
    }
    inventory.shopping_list.push((1, 1.0));
    inventory.chores.push((11, "Water the plants".to_string()));
    Arc::new(RwLock::new(inventory))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/api/system/info", get(system_info))
        .route("/api/objects/products", get(list_products))
        .route("/api/objects/products/{id}", put(replace_barcodes))
        .route("/api/objects/chores", get(list_chores))
        .route("/api/objects/chores/{id}", get(chore_details))
        .route("/api/chores/{id}/execute", post(execute_chore))
        .route("/api/stock/products/{id}", get(product_details))
        .route("/api/stock/products/by-barcode/{barcode}", get(product_by_barcode))
        .route("/api/stock/products/{id}/add", post(add_stock))
        .route("/api/stock/products/{id}/consume", post(consume_stock))
        .route("/api/stock/products/{id}/open", post(open_stock))
        .route("/api/stock/products/{id}/locations", get(product_locations))
        .route("/api/stock/shoppinglist/add-product", post(shopping_add))
        .route("/api/stock/shoppinglist/remove-product", post(shopping_remove))
        .route("/off/api/v0/product/{file}", get(off_lookup))
        .layer(middleware::from_fn(require_key))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

/// Grocy-style auth: every `/api` route wants the key header. The
/// OpenFoodFacts-shaped route is a different service and takes none.
async fn require_key(request: Request, next: Next) -> Response {
    if !request.uri().path().starts_with("/api/") {
        return next.run(request).await;
    }
    let authorized = request
        .headers()
        .get("GROCY-API-KEY")
        .is_some_and(|value| value == API_KEY);
    if authorized {
        next.run(request).await
    } else {
        error_message(StatusCode::UNAUTHORIZED, "unauthorized")
    }
}

async fn system_info() -> Json<Value> {
    Json(json!({
        "grocy_version": {"Version": VERSION, "ReleaseDate": "2024-02-02"}
    }))
}

async fn list_products(State(db): State<Db>) -> Json<Value> {
    let inventory = db.read().await;
    let mut products: Vec<&Product> = inventory.products.values().collect();
    products.sort_by_key(|product| product.id);
    Json(json!(products))
}

/// Detail payload in Grocy's mixed spelling: amounts as strings, the tare
/// flag as 0/1.
fn detail_payload(product: &Product) -> Value {
    json!({
        "product": {
            "id": product.id,
            "barcode": product.barcode,
            "name": product.name,
            "tare_weight": format!("{}", product.tare_weight),
            "enable_tare_weight_handling": i32::from(product.enable_tare_weight_handling),
            "qu_factor_purchase_to_stock": format!("{}", product.qu_factor_purchase_to_stock),
            "default_best_before_days": product.default_best_before_days,
        },
        "quantity_unit_stock": {"name": product.unit},
        "stock_amount": format!("{}", product.stock_amount),
    })
}

async fn product_details(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    let inventory = db.read().await;
    match inventory.products.get(&id) {
        Some(product) => Json(detail_payload(product)).into_response(),
        None => error_message(StatusCode::BAD_REQUEST, "Product does not exist or is inactive"),
    }
}

async fn product_by_barcode(State(db): State<Db>, Path(barcode): Path<String>) -> Response {
    let inventory = db.read().await;
    match inventory
        .products
        .values()
        .find(|product| product.barcode == barcode)
    {
        Some(product) => Json(detail_payload(product)).into_response(),
        None => error_message(
            StatusCode::BAD_REQUEST,
            format!("No product with barcode {barcode} found"),
        ),
    }
}

async fn add_stock(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut inventory = db.write().await;
    let Some(product) = inventory.products.get_mut(&id) else {
        return error_message(StatusCode::BAD_REQUEST, "Product does not exist or is inactive");
    };
    let amount = body["amount"].as_f64().unwrap_or(0.0);
    product.stock_amount += amount;
    inventory.bookings.push(json!({
        "op": "purchase",
        "product_id": id,
        "amount": amount,
        "best_before_date": body["best_before_date"],
        "price": body["price"],
    }));
    let booking_id = inventory.bookings.len();
    Json(json!([{"id": booking_id, "transaction_type": "purchase"}])).into_response()
}

async fn consume_stock(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut inventory = db.write().await;
    let Some(product) = inventory.products.get_mut(&id) else {
        return error_message(StatusCode::BAD_REQUEST, "Product does not exist or is inactive");
    };
    let amount = body["amount"].as_f64().unwrap_or(0.0);
    if amount > product.stock_amount {
        return error_message(
            StatusCode::BAD_REQUEST,
            "Amount to be consumed cannot be > current stock amount",
        );
    }
    product.stock_amount -= amount;
    inventory.bookings.push(json!({
        "op": "consume",
        "product_id": id,
        "amount": amount,
        "spoiled": body["spoiled"],
    }));
    let booking_id = inventory.bookings.len();
    Json(json!([{"id": booking_id, "transaction_type": "consume"}])).into_response()
}

async fn open_stock(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut inventory = db.write().await;
    if !inventory.products.contains_key(&id) {
        return error_message(StatusCode::BAD_REQUEST, "Product does not exist or is inactive");
    }
    inventory.bookings.push(json!({
        "op": "open",
        "product_id": id,
        "amount": body["amount"],
    }));
    let booking_id = inventory.bookings.len();
    Json(json!([{"id": booking_id, "transaction_type": "product-opened"}])).into_response()
}

async fn product_locations(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    let inventory = db.read().await;
    match inventory.products.get(&id) {
        Some(product) => Json(json!([
            {"location_id": 1, "location_name": "Pantry", "amount": product.stock_amount}
        ]))
        .into_response(),
        None => error_message(StatusCode::BAD_REQUEST, "Product does not exist or is inactive"),
    }
}

async fn replace_barcodes(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut inventory = db.write().await;
    match inventory.products.get_mut(&id) {
        Some(product) => {
            product.barcode = body["barcode"].as_str().unwrap_or_default().to_string();
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_message(StatusCode::BAD_REQUEST, "Product does not exist or is inactive"),
    }
}

async fn shopping_add(State(db): State<Db>, Json(body): Json<Value>) -> StatusCode {
    let id = body["product_id"].as_i64().unwrap_or(0);
    let amount = body["product_amount"].as_f64().unwrap_or(0.0);
    db.write().await.shopping_list.push((id, amount));
    StatusCode::NO_CONTENT
}

async fn shopping_remove(State(db): State<Db>, Json(body): Json<Value>) -> StatusCode {
    let id = body["product_id"].as_i64().unwrap_or(0);
    let mut remaining = body["product_amount"].as_f64().unwrap_or(0.0);
    let mut inventory = db.write().await;
    inventory.shopping_list.retain_mut(|(product_id, amount)| {
        if *product_id != id || remaining <= 0.0 {
            return true;
        }
        let taken = remaining.min(*amount);
        *amount -= taken;
        remaining -= taken;
        *amount > 0.0
    });
    StatusCode::NO_CONTENT
}

async fn list_chores(State(db): State<Db>) -> Json<Value> {
    let inventory = db.read().await;
    let chores: Vec<Value> = inventory
        .chores
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name}))
        .collect();
    Json(json!(chores))
}

async fn chore_details(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    let inventory = db.read().await;
    match inventory.chores.iter().find(|(chore_id, _)| *chore_id == id) {
        Some((id, name)) => Json(json!({"id": id, "name": name})).into_response(),
        None => error_message(StatusCode::BAD_REQUEST, "Chore does not exist"),
    }
}

async fn execute_chore(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut inventory = db.write().await;
    if !inventory.chores.iter().any(|(chore_id, _)| *chore_id == id) {
        return error_message(StatusCode::BAD_REQUEST, "Chore does not exist");
    }
    inventory.bookings.push(json!({
        "op": "chore",
        "chore_id": id,
        "done_by": body["done_by"],
    }));
    let booking_id = inventory.bookings.len();
    Json(json!({"id": booking_id, "chore_id": id})).into_response()
}

/// OpenFoodFacts-shaped lookup. One known barcode, everything else unknown.
async fn off_lookup(Path(file): Path<String>) -> Json<Value> {
    let barcode = file.trim_end_matches(".json");
    if barcode == "5000000000000" {
        Json(json!({
            "status": 1,
            "product": {"product_name": "Oatly Oat Drink", "generic_name": "Oat drink"}
        }))
    } else {
        Json(json!({"status": 0, "status_verbose": "product not found"}))
    }
}

fn error_message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error_message": message.into()}))).into_response()
}
