//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use till_core::{
    Money, NewProduct, NewSale, NewSaleItem, NewSalePayment, PaymentMethod, Product, Quantity,
    SaleStatus,
};
use till_db::{Database, DbConfig};
use till_engine::{Engine, EngineConfig};

pub const TENANT_A: &str = "11111111-1111-4111-8111-111111111111";
pub const TENANT_B: &str = "22222222-2222-4222-8222-222222222222";
pub const WAREHOUSE: &str = "W1";
pub const CASHIER: &str = "U1";

/// Engine over a fresh in-memory database.
pub async fn engine() -> Engine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Engine::new(db, EngineConfig::default())
}

/// Engine over a fresh database file, for tests that need more than one
/// connection. Returns the path so the test can clean up.
pub async fn file_engine() -> (Engine, PathBuf) {
    let path = std::env::temp_dir().join(format!("till-{}.db", uuid::Uuid::new_v4()));
    let config = EngineConfig {
        db_path: path.clone(),
        ..EngineConfig::default()
    };
    (Engine::connect(config).await.unwrap(), path)
}

pub fn remove_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub fn qty(s: &str) -> Quantity {
    s.parse().unwrap()
}

pub async fn product(engine: &Engine, tenant: &str, sku: &str) -> Product {
    engine
        .create_product(
            tenant,
            NewProduct {
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                is_composite: false,
                unit_type: "kg".to_string(),
                allow_decimals: true,
            },
        )
        .await
        .unwrap()
}

/// A kit made of `2 × A + 0.5 × B`.
pub async fn kit(engine: &Engine, tenant: &str) -> (Product, Product, Product) {
    let a = product(engine, tenant, "A").await;
    let b = product(engine, tenant, "B").await;
    let kit = engine
        .create_product(
            tenant,
            NewProduct {
                sku: "KIT".to_string(),
                name: "Kit".to_string(),
                is_composite: true,
                unit_type: "unit".to_string(),
                allow_decimals: false,
            },
        )
        .await
        .unwrap();
    engine
        .add_component(tenant, &kit.id, &a.id, Quantity::units(2), Money::from_cents(100))
        .await
        .unwrap();
    engine
        .add_component(tenant, &kit.id, &b.id, qty("0.5"), Money::from_cents(50))
        .await
        .unwrap();
    (kit, a, b)
}

/// One line of `quantity × unit_cents`, paid with one leg per `(method, cents)`.
pub fn sale(
    register_id: Option<&str>,
    product_id: &str,
    quantity: Quantity,
    unit_cents: i64,
    legs: &[(PaymentMethod, i64)],
) -> NewSale {
    NewSale {
        warehouse_id: WAREHOUSE.to_string(),
        cash_register_id: register_id.map(str::to_string),
        user_id: Some(CASHIER.to_string()),
        status: SaleStatus::Completed,
        tax: Money::zero(),
        discount: Money::zero(),
        items: vec![NewSaleItem {
            product_id: product_id.to_string(),
            quantity,
            unit_price: Money::from_cents(unit_cents),
        }],
        payments: legs
            .iter()
            .map(|(method, cents)| NewSalePayment::base(*method, Money::from_cents(*cents)))
            .collect(),
    }
}

/// One unit of `product_id` paid fully in cash on `register_id`.
pub fn cash_sale(register_id: &str, product_id: &str, cents: i64) -> NewSale {
    sale(
        Some(register_id),
        product_id,
        Quantity::units(1),
        cents,
        &[(PaymentMethod::Cash, cents)],
    )
}
