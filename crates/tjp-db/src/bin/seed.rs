//! # Seed Data Generator
//!
//! Populates the database with test sales for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 sales (default)
//! cargo run -p tjp-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tjp-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p tjp-db --bin seed -- --db ./data/tjp_ledger.db
//! ```
//!
//! ## Generated Data
//! A rotating cast of regular customers buying mushroom pockets (with a
//! few seed purchases mixed in), spread over the last 90 days:
//! - Payment split roughly cash / GPay / kadan
//! - Some of the older kadan entries already settled
//! - Customer rows upserted the same way the real write path does

use chrono::{Duration, Utc};
use std::env;
use tjp_core::{Money, PaymentType, ProductType, Sale, SettlementMethod};
use tjp_db::{Database, DbConfig};
use uuid::Uuid;

/// Regular customers for realistic test data.
const CUSTOMERS: &[(&str, &str)] = &[
    ("Kumar", "9500591897"),
    ("Anitha", "9159659711"),
    ("Ravi", "9843012345"),
    ("Meena", "9790055521"),
    ("Selvam", "9003998877"),
    ("Lakshmi", "9944123456"),
    ("Prakash", "8870456123"),
    ("Devi", "9361778899"),
];

/// Mushroom price points in rupees.
const MUSHROOM_PRICES: &[i64] = &[40, 50, 60];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tjp_ledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("TJP Farm Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of sales to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tjp_ledger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 TJP Farm Ledger Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!("Sales: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing sales
    let existing = db.sales().list(&Default::default()).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} sales", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating sales...");

    let mut generated = 0;
    let mut kadan_open = 0;
    let start = std::time::Instant::now();

    for seed in 0..count {
        let sale = generate_sale(seed);

        db.customers()
            .upsert(&sale.contact_number, &sale.customer_name, sale.created_at)
            .await?;

        if let Err(e) = db.sales().insert(&sale, None).await {
            eprintln!("Failed to insert sale {}: {}", sale.id, e);
            continue;
        }

        // Settle roughly half of the older kadan entries.
        if sale.payment_type == PaymentType::Credit {
            let age_days = (Utc::now() - sale.date).num_days();
            if age_days > 30 && seed % 2 == 0 {
                let method = if seed % 4 == 0 {
                    SettlementMethod::Cash
                } else {
                    SettlementMethod::Gpay
                };
                db.sales()
                    .try_settle(&sale.id, method, sale.date + Duration::days(seed as i64 % 20))
                    .await?;
            } else {
                kadan_open += 1;
            }
        }

        generated += 1;

        if generated % 100 == 0 {
            println!("  Generated {} sales...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} sales in {:?}", generated, elapsed);
    println!("  Open kadan entries: {}", kadan_open);

    // Verify query surface
    println!();
    println!("Verifying queries...");
    let kadan = db.sales().kadan_list().await?;
    println!("  Kadan list: {} entries", kadan.len());

    let totals = db.sales().totals_by_payment_method(None, None).await?;
    println!("  Cash total: {}", totals.cash);
    println!("  GPay total: {}", totals.gpay);
    println!("  Outstanding kadan: {}", totals.credit_unpaid);

    let customers = db.customers().list_with_lifetime().await?;
    println!("  Customers: {}", customers.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single sale with realistic data.
fn generate_sale(seed: usize) -> Sale {
    let (name, contact) = CUSTOMERS[seed % CUSTOMERS.len()];

    // Spread business dates over the last 90 days.
    let date = Utc::now() - Duration::days((seed * 7 % 90) as i64) - Duration::hours((seed % 12) as i64);

    // One in ten sales is spawn seeds; the rest are mushroom pockets.
    let (product_type, quantity, price) = if seed % 10 == 9 {
        (ProductType::Seeds, 1 + (seed % 3) as i64, 300)
    } else {
        (
            ProductType::Mushroom,
            1 + (seed % 6) as i64,
            MUSHROOM_PRICES[seed % MUSHROOM_PRICES.len()],
        )
    };

    let payment_type = match seed % 5 {
        0 | 1 => PaymentType::Cash,
        2 | 3 => PaymentType::Gpay,
        _ => PaymentType::Credit,
    };

    let price_per_unit = Money::from_rupees(price);

    Sale {
        id: Uuid::new_v4().to_string(),
        customer_name: name.to_string(),
        contact_number: contact.to_string(),
        product_type,
        quantity,
        unit: product_type.unit().to_string(),
        price_per_unit_paise: price_per_unit.paise(),
        total_amount_paise: price_per_unit.multiply_quantity(quantity).paise(),
        payment_type,
        payment_status: payment_type.initial_status(),
        settled_date: None,
        settled_by: None,
        date,
        created_at: date,
        updated_at: date,
    }
}
