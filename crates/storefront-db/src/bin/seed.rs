//! # Seed Data Generator
//!
//! Populates a storefront database for development: categories, products
//! and two accounts to log in with.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p storefront-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p storefront-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db
//! ```
//!
//! ## Accounts
//! - `admin@storefront.local` / `admin123` (ADMIN)
//! - `customer@storefront.local` / `customer123` (CUSTOMER)
//!
//! ## Generated Products
//! Names are `{item} {variant}`; price and stock are derived from the
//! product index, so two runs against empty databases produce the same data.

use std::env;
use storefront_core::{NewCategory, NewProduct, Role};
use storefront_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Categories with their items.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "Electronics",
        "Gadgets, audio and accessories",
        &[
            "Wireless Earbuds",
            "Bluetooth Speaker",
            "USB-C Charger",
            "Power Bank",
            "Mechanical Keyboard",
            "Wireless Mouse",
            "HD Webcam",
            "Smart Watch",
        ],
    ),
    (
        "Home",
        "Furniture, lighting and decor",
        &[
            "Desk Lamp",
            "Floor Lamp",
            "Throw Pillow",
            "Wall Clock",
            "Scented Candle",
            "Picture Frame",
            "Storage Basket",
            "Ceramic Vase",
        ],
    ),
    (
        "Apparel",
        "Clothing and accessories",
        &[
            "Cotton T-Shirt",
            "Hooded Sweatshirt",
            "Denim Jacket",
            "Wool Scarf",
            "Baseball Cap",
            "Running Socks",
            "Leather Belt",
            "Canvas Tote",
        ],
    ),
    (
        "Books",
        "Fiction, non-fiction and notebooks",
        &[
            "Mystery Novel",
            "Cookbook",
            "Travel Guide",
            "Poetry Collection",
            "Sketchbook",
            "Dotted Notebook",
            "Science Primer",
            "History Atlas",
        ],
    ),
    (
        "Outdoors",
        "Camping and garden gear",
        &[
            "Camping Lantern",
            "Water Bottle",
            "Folding Chair",
            "Picnic Blanket",
            "Garden Gloves",
            "Trail Backpack",
            "Hammock",
            "Cooler Bag",
        ],
    ),
];

/// Variants with price add-ons in cents.
const VARIANTS: &[(&str, i64)] = &[
    ("Classic", 0),
    ("Black", 0),
    ("White", 0),
    ("Deluxe", 1500),
    ("Mini", -200),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./storefront_dev.db");

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
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./storefront_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Storefront Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().list_products().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Accounts
    let auth = db.auth();
    auth.create_account("admin@storefront.local", "admin123", "Store Admin", Role::Admin)
        .await?;
    auth.create_account(
        "customer@storefront.local",
        "customer123",
        "Sample Customer",
        Role::Customer,
    )
    .await?;
    println!("✓ Created admin and customer accounts");

    // Catalog
    println!();
    println!("Generating products...");

    let catalog = db.catalog();
    let start = std::time::Instant::now();
    let mut generated = 0;

    'categories: for (category_name, description, items) in CATEGORIES {
        let category = catalog
            .create_category(&NewCategory {
                name: category_name.to_string(),
                description: Some(description.to_string()),
            })
            .await?;

        for item in items.iter() {
            for (variant, price_addon) in VARIANTS {
                if generated >= count {
                    break 'categories;
                }

                let product = generate_product(category.id, item, variant, *price_addon, generated);
                if let Err(e) = catalog.create_product(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    println!();
    println!("Verifying search...");
    let results = catalog.search_products("lamp").await?;
    println!("  Search 'lamp': {} results", results.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one product from its position in the generated sequence.
fn generate_product(
    category_id: i64,
    item: &str,
    variant: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    // $4.99 - $79.99 before the variant add-on
    let base_price = 499 + ((seed * 37) % 7500) as i64;
    let price_cents = (base_price + price_addon).max(99);

    // Every 11th product starts out of stock
    let stock_quantity = if seed % 11 == 10 { 0 } else { 1 + (seed % 50) as i64 };

    let slug = item.to_lowercase().replace(' ', "-");

    NewProduct {
        category_id,
        name: format!("{} {}", item, variant),
        description: Some(format!("{} in {} finish.", item, variant.to_lowercase())),
        price_cents,
        stock_quantity,
        image_url: Some(format!("https://img.storefront.local/{}.jpg", slug)),
    }
}
