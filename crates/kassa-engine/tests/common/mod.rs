//! Shared fixtures for the engine integration tests.
//!
//! Every till is a private in-memory database seeded with a small catalog
//! and two operators.

#![allow(dead_code)]

use chrono::{Days, Local, NaiveDate};
use kassa_core::{Client, NewClient, NewProduct, Product, Role};
use kassa_db::{Database, DbConfig};

pub const ADMIN: (&str, &str) = ("boss", "s3cret");
pub const CASHIER: (&str, &str) = ("anna", "till");

/// (name, stock, sell_price, bonuses, returnable)
const CATALOG: &[(&str, i64, i64, i64, bool)] = &[
    ("Espresso", 10, 150, 1, true),
    ("Coffee Beans", 8, 650, 5, true),
    ("Croissant", 5, 120, 0, false),
];

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn till() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed(&db).await;
    db
}

pub async fn seed(db: &Database) {
    for &(name, stock, sell_price, bonus_points, returnable) in CATALOG {
        shelve(db, name, stock, sell_price, bonus_points, returnable).await;
    }

    db.logins().register(ADMIN.0, ADMIN.1, Role::Admin).await.unwrap();
    db.logins()
        .register(CASHIER.0, CASHIER.1, Role::Cashier)
        .await
        .unwrap();
}

pub async fn shelve(
    db: &Database,
    name: &str,
    stock: i64,
    sell_price: i64,
    bonus_points: i64,
    returnable: bool,
) -> Product {
    db.products()
        .insert(&NewProduct {
            name: name.to_string(),
            manufacturer: "Test Roastery".to_string(),
            stock,
            sell_price,
            use_by: today().checked_add_days(Days::new(30)).unwrap(),
            purchase_price: sell_price / 3,
            bonus_points,
            returnable,
        })
        .await
        .unwrap()
}

/// A client whose code `code` is valid until `expiry`.
pub async fn client_with(db: &Database, bonuses: i64, code: &str, expiry: NaiveDate) -> Client {
    db.clients()
        .insert(&NewClient {
            phone: format!("+7 900 {}", code),
            name: format!("Client {}", code),
            bonus_balance: bonuses,
            bonus_code: code.to_string(),
            code_expiry: expiry,
        })
        .await
        .unwrap()
}

/// A client with a code valid today.
pub async fn client(db: &Database, bonuses: i64) -> Client {
    client_with(db, bonuses, "482913", today()).await
}

pub async fn stock(db: &Database, name: &str) -> i64 {
    db.products().find_by_name(name).await.unwrap().stock
}

pub async fn balance(db: &Database, client: &Client) -> i64 {
    db.clients()
        .get_by_id(client.id)
        .await
        .unwrap()
        .unwrap()
        .bonus_balance
}

pub async fn sale_line_count(db: &Database) -> usize {
    db.checks().list_sale_lines(1000).await.unwrap().len()
}

/// Changes a catalog price behind the engine's back.
pub async fn set_price(db: &Database, name: &str, price: i64) {
    sqlx::query("UPDATE goods SET sell_price = ?1 WHERE name = ?2")
        .bind(price)
        .bind(name)
        .execute(db.pool())
        .await
        .unwrap();
}
