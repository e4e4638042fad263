//! # Seed & Maintenance Tool
//!
//! Populates a fresh database with the coffee-shop catalog and runs
//! day-to-day maintenance.
//!
//! ## Usage
//! ```bash
//! # Seed an empty database (catalog, two clients, admin/cashier logins)
//! cargo run -p kassa-db --bin seed -- --db ./kassa.db
//!
//! # Issue new bonus codes for every client whose code expired
//! cargo run -p kassa-db --bin seed -- --db ./kassa.db --rotate-codes
//!
//! # Register an operator
//! cargo run -p kassa-db --bin seed -- --register maria:hunter2:cashier
//! ```

use chrono::{Days, Local, NaiveDate};
use std::env;
use tracing_subscriber::EnvFilter;

use kassa_core::{NewClient, NewProduct, Role};
use kassa_db::{generate_bonus_code, migrations, Database, DbConfig};

/// (name, manufacturer, stock, sell_price, purchase_price, bonuses, returnable)
const CATALOG: &[(&str, &str, i64, i64, i64, i64, bool)] = &[
    ("Espresso", "House", 200, 150, 40, 1, false),
    ("Americano", "House", 200, 180, 45, 1, false),
    ("Cappuccino", "House", 150, 220, 60, 2, false),
    ("Latte", "House", 150, 240, 65, 2, false),
    ("Croissant", "Le Four", 30, 120, 55, 0, false),
    ("Muffin", "Le Four", 30, 110, 50, 0, false),
    ("Coffee Beans 250g", "Roastery", 40, 650, 380, 5, true),
    ("Coffee Beans 1kg", "Roastery", 15, 2200, 1400, 15, true),
    ("Paper Filters", "Brewline", 60, 190, 90, 0, true),
    ("Travel Mug", "Brewline", 20, 900, 450, 8, true),
];

const DEFAULT_OPERATORS: &[(&str, &str, Role)] = &[
    ("admin", "admin", Role::Admin),
    ("cashier", "cashier", Role::Cashier),
];

struct Args {
    db_path: String,
    rotate_codes: bool,
    validity_days: u32,
    register: Vec<String>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();

    let mut parsed = Args {
        db_path: String::from("./kassa.db"),
        rotate_codes: false,
        validity_days: 1,
        register: Vec::new(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    parsed.db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--rotate-codes" => parsed.rotate_codes = true,
            "--validity-days" => {
                if i + 1 < args.len() {
                    parsed.validity_days = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--register" => {
                if i + 1 < args.len() {
                    parsed.register.push(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kassa seed & maintenance tool");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>               Database file path (default: ./kassa.db)");
                println!("      --rotate-codes            Issue new codes for expired bonus codes");
                println!("      --validity-days <N>       Days a rotated code stays valid (default: 1)");
                println!("      --register <L:P:ROLE>     Register operator (role: admin|cashier)");
                println!("  -h, --help                    Show this help message");
                return None;
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,kassa=info")),
        )
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    println!("Kassa seed");
    println!("==========");
    println!("Database: {}", args.db_path);

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    let (total, applied) = migrations::migration_status(db.pool()).await?;
    println!("✓ Connected ({} of {} migrations applied)", applied, total);

    let today = Local::now().date_naive();

    seed_if_empty(&db, today).await?;

    for entry in &args.register {
        register(&db, entry).await?;
    }

    if args.rotate_codes {
        let rotated = db
            .clients()
            .rotate_expired_codes(today, args.validity_days)
            .await?;
        println!("✓ Rotated {} bonus codes", rotated.len());
        for (client_id, code) in rotated {
            println!("  client {:>4}: {}", client_id, code);
        }
    }

    db.close().await;
    println!("✓ Done");
    Ok(())
}

async fn seed_if_empty(db: &Database, today: NaiveDate) -> Result<(), Box<dyn std::error::Error>> {
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products, skipping catalog seed", existing);
        return Ok(());
    }

    let use_by = today.checked_add_days(Days::new(180)).unwrap_or(NaiveDate::MAX);
    for &(name, manufacturer, stock, sell_price, purchase_price, bonuses, returnable) in CATALOG {
        let product = NewProduct {
            name: name.to_string(),
            manufacturer: manufacturer.to_string(),
            stock,
            sell_price,
            use_by,
            purchase_price,
            bonus_points: bonuses,
            returnable,
        };
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", name, e);
        }
    }
    println!("✓ Inserted {} products", CATALOG.len());

    for (phone, name, bonuses) in [("+7 900 111 22 33", "Anna", 12), ("+7 900 444 55 66", "Boris", 0)] {
        let client = db
            .clients()
            .insert(&NewClient {
                phone: phone.to_string(),
                name: name.to_string(),
                bonus_balance: bonuses,
                bonus_code: generate_bonus_code(),
                code_expiry: today,
            })
            .await?;
        println!("  client {} ({}): code {}", client.id, client.name, client.bonus_code);
    }

    if db.logins().count().await? == 0 {
        for &(login, password, role) in DEFAULT_OPERATORS {
            db.logins().register(login, password, role).await?;
        }
        println!("✓ Registered default operators (change their passwords)");
    }

    Ok(())
}

async fn register(db: &Database, entry: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut parts = entry.splitn(3, ':');
    let (Some(login), Some(password), Some(role)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("--register expects login:password:role, got '{}'", entry).into());
    };

    let role: Role = role.parse()?;
    db.logins().register(login, password, role).await?;
    println!("✓ Registered {} as {}", login, role);
    Ok(())
}
