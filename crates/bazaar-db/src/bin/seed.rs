//! # Seed Data Generator
//!
//! Populates a tenant with a small storefront for local development.
//!
//! ## Usage
//! ```bash
//! # Seed the default tenant into ./bazaar_dev.db
//! cargo run -p bazaar-db --bin seed
//!
//! # Pick the tenant and database file
//! cargo run -p bazaar-db --bin seed -- --tenant store-42 --db ./data/bazaar.db
//! ```
//!
//! ## Generated Data
//! - One product per catalog entry below, GST slab per category
//! - Coupons `WELCOME10` (₹100 to ₹1,000) and `BIG15` (₹1,000 to ₹10,000)
//! - A negotiate offer over the first product of each category, floor at
//!   80% of list price
//! - A discount offer over the second product of each category

use chrono::Utc;
use std::env;
use uuid::Uuid;

use bazaar_core::offer::{DiscountItem, DiscountTerms, NegotiateItem, NegotiateTerms};
use bazaar_core::{Coupon, Offer, OfferTerms, Product};
use bazaar_db::{Database, DbConfig};

/// (code prefix, GST bps, [(name, price in rupees)])
const CATALOG: &[(&str, u32, &[(&str, i64)])] = &[
    (
        "MEAL",
        500,
        &[
            ("Paneer Tikka", 240),
            ("Veg Biryani", 220),
            ("Chicken Biryani", 280),
            ("Dal Makhani", 190),
            ("Butter Naan", 45),
        ],
    ),
    (
        "BEV",
        1200,
        &[
            ("Masala Chai", 30),
            ("Cold Coffee", 120),
            ("Sweet Lassi", 80),
            ("Fresh Lime Soda", 70),
        ],
    ),
    (
        "GRO",
        0,
        &[
            ("Basmati Rice 5kg", 650),
            ("Toor Dal 1kg", 160),
            ("Atta 10kg", 480),
        ],
    ),
    (
        "HOME",
        1800,
        &[
            ("Steel Tiffin Box", 550),
            ("Pressure Cooker 3L", 1850),
            ("Cotton Bedsheet", 899),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut tenant_id = String::from("demo");
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
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
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tenant <ID>  Tenant to seed (default: demo)");
                println!("  -d, --db <PATH>    Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(&tenant_id, true).await?;
    if !existing.is_empty() {
        println!("⚠ Tenant already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut negotiate_items = Vec::new();
    let mut discount_items = Vec::new();
    let mut generated = 0;

    for (prefix, gst_bps, entries) in CATALOG {
        for (idx, (name, rupees)) in entries.iter().enumerate() {
            let product = generate_product(&tenant_id, prefix, idx, name, *rupees, *gst_bps);

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.product_code, e);
                continue;
            }
            generated += 1;

            match idx {
                0 => negotiate_items.push(NegotiateItem {
                    product_id: product.id.clone(),
                    floor_price_cents: product.price_cents * 80 / 100,
                }),
                1 => discount_items.push(DiscountItem {
                    product_id: product.id.clone(),
                    discount_bps: 1000,
                }),
                _ => {}
            }
        }
    }
    println!("✓ Generated {} products", generated);

    let coupons = [
        ("WELCOME10", 1000, 10_000, 100_000),
        ("BIG15", 1500, 100_000, 1_000_000),
    ];
    for (code, bps, min, max) in coupons {
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            code: code.to_string(),
            discount_bps: bps,
            min_price_cents: min,
            max_price_cents: max,
            active: true,
            created_at: Utc::now(),
        };
        db.coupons().insert(&coupon).await?;
    }
    println!("✓ Created coupons WELCOME10, BIG15");

    let negotiate = new_offer(
        &tenant_id,
        OfferTerms::Negotiate(NegotiateTerms {
            success_bps: 1000,
            failure_bps: 300,
            max_attempts: Some(3),
            items: negotiate_items,
        }),
    );
    db.offers().insert(&negotiate).await?;

    let discount = new_offer(
        &tenant_id,
        OfferTerms::Discount(DiscountTerms {
            items: discount_items,
        }),
    );
    db.offers().insert(&discount).await?;
    println!("✓ Created negotiate and discount offers");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn new_offer(tenant_id: &str, terms: OfferTerms) -> Offer {
    let now = Utc::now();
    Offer {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        is_active: true,
        terms,
        created_at: now,
        updated_at: now,
    }
}

fn generate_product(
    tenant_id: &str,
    prefix: &str,
    idx: usize,
    name: &str,
    rupees: i64,
    gst_bps: u32,
) -> Product {
    let now = Utc::now();
    let price_cents = rupees * 100;

    Product {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        product_code: format!("{}-{:03}", prefix, idx + 1),
        description: None,
        price_cents,
        // shown struck through next to the selling price
        strike_price_cents: price_cents * 120 / 100,
        gst_bps,
        active: true,
        is_deleted: false,
        re_enabled_at: None,
        created_at: now,
        updated_at: now,
    }
}
