#![allow(dead_code)]

use bigdecimal::BigDecimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use order_core::adapters::InMemoryStore;
use order_core::config::OrderPolicy;
use order_core::domain::{Actor, CatalogProduct, CustomerProfile, Role};
use order_core::services::{CartLine, CreateOrder, OrderEngine, Reporter};

pub const ADDRESS: &str = "Plot 7, Kiambu Road, Nairobi";

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub engine: OrderEngine,
    pub reporter: Reporter,
    pub customer: Actor,
    pub other_customer: Actor,
    pub admin: Actor,
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let customer = register(&store, "Amina Wanjiku", "0711000001", Role::Customer).await;
    let other_customer = register(&store, "Brian Otieno", "0711000002", Role::Customer).await;
    let admin = register(&store, "Shop Admin", "0711000099", Role::Admin).await;

    Fixture {
        engine: OrderEngine::new(store.clone(), OrderPolicy::default()),
        reporter: Reporter::new(store.clone(), OrderPolicy::default()),
        store,
        customer,
        other_customer,
        admin,
    }
}

pub async fn register(store: &InMemoryStore, name: &str, phone: &str, role: Role) -> Actor {
    let id = Uuid::new_v4();
    store
        .insert_customer(
            CustomerProfile {
                id,
                full_name: name.to_string(),
                phone: phone.to_string(),
                email: None,
            },
            role,
        )
        .await;
    Actor {
        id,
        display_name: name.to_string(),
        role,
    }
}

pub async fn add_product(
    store: &InMemoryStore,
    name: &str,
    price: &str,
    stock: i32,
    category_id: Option<Uuid>,
) -> CatalogProduct {
    let product = CatalogProduct {
        id: Uuid::new_v4(),
        name: name.to_string(),
        price: money(price),
        stock,
        images: vec![format!("/uploads/{}.jpg", name.to_lowercase().replace(' ', "-"))],
        category_id,
        is_active: true,
    };
    store.insert_product(product.clone()).await;
    product
}

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub fn order_for(lines: &[(Uuid, i32)]) -> CreateOrder {
    CreateOrder {
        items: lines
            .iter()
            .map(|(product_id, quantity)| CartLine {
                product_id: *product_id,
                quantity: *quantity,
                color: None,
            })
            .collect(),
        delivery_address: ADDRESS.to_string(),
        notes: None,
    }
}
