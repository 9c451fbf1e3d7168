//! # Demo Shift Seeder
//!
//! Plays one cash shift through the engine so a fresh database has
//! something to look at.
//!
//! ## Usage
//! ```bash
//! # Default database (TILL_DB_PATH or ./till.db)
//! cargo run -p till-engine --bin seed
//!
//! # Specify database path
//! cargo run -p till-engine --bin seed -- --db ./data/demo.db
//! ```
//!
//! ## The Shift
//! - cheese sold by the kg, a bread roll, and a "sandwich kit" made of
//!   2 rolls + 0.5 kg cheese
//! - register opened with $1,000.00
//! - one cash sale of $350.00 and one of $299.00
//! - the $299.00 sale is cancelled
//! - expected balance: $1,350.00

use std::env;
use std::path::PathBuf;

use till_core::{
    Money, NewProduct, NewSale, NewSaleItem, NewSalePayment, PaymentMethod, Quantity, SaleStatus,
    DEFAULT_TENANT_ID,
};
use till_engine::{telemetry, Engine, EngineConfig};

const WAREHOUSE: &str = "MAIN";
const CASHIER: &str = "cashier-01";

fn product(sku: &str, name: &str, is_composite: bool, unit_type: &str) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: name.to_string(),
        is_composite,
        unit_type: unit_type.to_string(),
        allow_decimals: unit_type == "kg",
    }
}

fn cash_sale(register_id: &str, product_id: &str, quantity: Quantity, unit_price: Money) -> NewSale {
    let total = unit_price.checked_mul_quantity(quantity).unwrap_or_default();
    NewSale {
        warehouse_id: WAREHOUSE.to_string(),
        cash_register_id: Some(register_id.to_string()),
        user_id: Some(CASHIER.to_string()),
        status: SaleStatus::Completed,
        tax: Money::zero(),
        discount: Money::zero(),
        items: vec![NewSaleItem {
            product_id: product_id.to_string(),
            quantity,
            unit_price,
        }],
        payments: vec![NewSalePayment::base(PaymentMethod::Cash, total)],
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let mut config = EngineConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.db_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Demo Shift Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: TILL_DB_PATH or ./till.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Demo Shift Seeder");
    println!("=========================");
    println!("Database: {}", config.db_path.display());
    println!();

    if config.db_path.exists() {
        println!("⚠ Database already exists");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let engine = Engine::connect(config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let tenant = DEFAULT_TENANT_ID;

    // Catalog
    let cheese = engine
        .create_product(tenant, product("CHS-001", "Gouda Cheese", false, "kg"))
        .await?;
    let roll = engine
        .create_product(tenant, product("BRD-001", "Bread Roll", false, "unit"))
        .await?;
    let kit = engine
        .create_product(tenant, product("KIT-001", "Sandwich Kit", true, "unit"))
        .await?;
    engine
        .add_component(tenant, &kit.id, &roll.id, Quantity::units(2), Money::from_cents(80))
        .await?;
    engine
        .add_component(tenant, &kit.id, &cheese.id, "0.5".parse()?, Money::from_cents(450))
        .await?;
    println!("✓ Catalog: {}, {}, {}", cheese.sku, roll.sku, kit.sku);

    // Stock
    engine
        .set_stock_count(tenant, &cheese.id, WAREHOUSE, "40".parse()?)
        .await?;
    engine
        .set_stock_count(tenant, &roll.id, WAREHOUSE, Quantity::units(200))
        .await?;
    println!("✓ Stock counted in {}", WAREHOUSE);

    // Shift
    let register = engine
        .open_register(tenant, WAREHOUSE, CASHIER, Money::from_major_minor(1000, 0))
        .await?;
    println!("✓ Register {} opened with {}", register.id, register.opening_amount);

    let kept = engine
        .record_sale(
            tenant,
            cash_sale(&register.id, &kit.id, Quantity::units(35), Money::from_cents(1000)),
        )
        .await?;
    let cancelled = engine
        .record_sale(
            tenant,
            cash_sale(&register.id, &cheese.id, "11.5".parse()?, Money::from_cents(2600)),
        )
        .await?;
    println!("✓ Sales: {} ({}), {} ({})", kept.id, kept.total, cancelled.id, cancelled.total);

    let outcome = engine.cancel_sale(tenant, &cancelled.id).await?;
    println!(
        "✓ Cancelled {}: {} product(s) restored, {} reversal(s)",
        outcome.sale_id,
        outcome.restored.len(),
        outcome.reversals.len()
    );

    // Summary
    let summary = engine.cash_register_summary(tenant, &register.id).await?;
    println!();
    println!("Register summary");
    println!("----------------");
    println!("Opening:        {}", summary.opening_amount);
    println!("Cash sales:     {}", summary.total_cash_sales);
    println!("Cancellations:  {}", summary.total_cancellations);
    println!("Income:         {}", summary.total_income);
    println!("Expenses:       {}", summary.total_expenses);
    println!("Withdrawals:    {}", summary.total_withdrawals);
    println!("Expected:       {}", summary.expected_balance);
    println!();

    for (name, id) in [("Cheese", &cheese.id), ("Rolls", &roll.id)] {
        let stock = engine.get_stock(tenant, id, WAREHOUSE).await?;
        println!("{name} on hand: {stock}");
    }

    println!();
    println!("✅ Seed complete!");
    Ok(())
}
