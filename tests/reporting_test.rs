mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{add_product, fixture, money, order_for, Fixture};
use order_core::domain::{CatalogProduct, Order, OrderStatus};
use order_core::error::AppError;
use order_core::services::{
    CustomerQuery, LimitQuery, LowStockQuery, PeriodQuery, StatusChange, TopProductsQuery,
};

struct Catalog {
    sofa: CatalogProduct,
    bed: CatalogProduct,
    lamp: CatalogProduct,
}

async fn catalog(fx: &Fixture) -> Catalog {
    let living = fx.store.insert_category("Living Room").await;
    let bedroom = fx.store.insert_category("Bedroom").await;
    Catalog {
        sofa: add_product(&fx.store, "Sofa", "100", 20, Some(living)).await,
        bed: add_product(&fx.store, "Bed", "350", 10, Some(bedroom)).await,
        lamp: add_product(&fx.store, "Lamp", "10", 3, None).await,
    }
}

async fn place(fx: &Fixture, lines: &[(Uuid, i32)], status: OrderStatus) -> Order {
    let order = fx
        .engine
        .create_order(&fx.customer, order_for(lines))
        .await
        .unwrap();
    if status != OrderStatus::Pending {
        fx.engine
            .set_status(&fx.admin, order.id, StatusChange { status, note: None })
            .await
            .unwrap();
    }
    order
}

/// confirmed 200, delivered 450, pending 100, processing 350, cancelled 300.
async fn seed_orders(fx: &Fixture, c: &Catalog) {
    place(fx, &[(c.sofa.id, 2)], OrderStatus::Confirmed).await;
    place(fx, &[(c.bed.id, 1), (c.sofa.id, 1)], OrderStatus::Delivered).await;
    place(fx, &[(c.sofa.id, 1)], OrderStatus::Pending).await;
    place(fx, &[(c.bed.id, 1)], OrderStatus::Processing).await;
    place(fx, &[(c.sofa.id, 3)], OrderStatus::Cancelled).await;
}

#[tokio::test]
async fn test_dashboard_counts_only_recognized_revenue() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    seed_orders(&fx, &c).await;

    let stats = fx.reporter.dashboard(&fx.admin).await.unwrap();

    assert_eq!(stats.total_orders, 5);
    assert_eq!(stats.orders_today, 5);
    assert_eq!(stats.orders_this_week, 5);
    assert_eq!(stats.orders_this_month, 5);
    assert_eq!(stats.revenue_today, money("650"));
    assert_eq!(stats.revenue_this_week, money("650"));
    assert_eq!(stats.revenue_this_month, money("650"));
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.total_customers, 2);
    assert_eq!(stats.total_products, 3);
    assert_eq!(stats.low_stock_count, 1);
}

#[tokio::test]
async fn test_dashboard_windows_exclude_old_orders() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    let old = place(&fx, &[(c.bed.id, 1)], OrderStatus::Delivered).await;
    place(&fx, &[(c.sofa.id, 1)], OrderStatus::Confirmed).await;

    assert!(
        fx.store
            .backdate_order(old.id, Utc::now() - Duration::days(40))
            .await
    );

    let stats = fx.reporter.dashboard(&fx.admin).await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.orders_this_month, 1);
    assert_eq!(stats.revenue_this_month, money("100"));
}

#[tokio::test]
async fn test_revenue_by_category_uses_distinct_orders() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    seed_orders(&fx, &c).await;
    let old = place(&fx, &[(c.sofa.id, 5)], OrderStatus::Delivered).await;
    fx.store
        .backdate_order(old.id, Utc::now() - Duration::days(45))
        .await;

    let rows = fx
        .reporter
        .revenue_by_category(&fx.admin, PeriodQuery { days: Some(30) })
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].category_name, "Bedroom");
    assert_eq!(rows[0].revenue, money("350"));
    assert_eq!(rows[0].order_count, 1);
    assert_eq!(rows[1].category_name, "Living Room");
    assert_eq!(rows[1].revenue, money("300"));
    assert_eq!(rows[1].order_count, 2);

    let wider = fx
        .reporter
        .revenue_by_category(&fx.admin, PeriodQuery { days: Some(60) })
        .await
        .unwrap();
    let living = wider
        .iter()
        .find(|r| r.category_name == "Living Room")
        .unwrap();
    assert_eq!(living.revenue, money("800"));
    assert_eq!(living.order_count, 3);
}

#[tokio::test]
async fn test_top_products_rank_by_units_sold() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    seed_orders(&fx, &c).await;

    let rows = fx
        .reporter
        .top_products(&fx.admin, TopProductsQuery::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].product_id, c.sofa.id);
    assert_eq!(rows[0].total_sold, 3);
    assert_eq!(rows[0].revenue, money("300"));
    assert_eq!(rows[0].image.as_deref(), Some("/uploads/sofa.jpg"));
    assert_eq!(rows[1].product_id, c.bed.id);
    assert_eq!(rows[1].total_sold, 1);

    let top_one = fx
        .reporter
        .top_products(
            &fx.admin,
            TopProductsQuery {
                limit: Some(1),
                days: Some(7),
            },
        )
        .await
        .unwrap();
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].name, "Sofa");
}

#[tokio::test]
async fn test_low_stock_lists_active_products_ascending() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    fx.store
        .insert_product(CatalogProduct {
            id: Uuid::new_v4(),
            name: "Retired Stool".to_string(),
            price: money("5"),
            stock: 0,
            images: vec![],
            category_id: None,
            is_active: false,
        })
        .await;

    let default = fx
        .reporter
        .low_stock(&fx.admin, LowStockQuery::default())
        .await
        .unwrap();
    assert_eq!(default.len(), 1);
    assert_eq!(default[0].id, c.lamp.id);
    assert_eq!(default[0].stock, 3);

    let wide = fx
        .reporter
        .low_stock(&fx.admin, LowStockQuery { threshold: Some(10) })
        .await
        .unwrap();
    let names: Vec<_> = wide.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Lamp", "Bed"]);
}

#[tokio::test]
async fn test_recent_orders_newest_first() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    seed_orders(&fx, &c).await;

    let rows = fx
        .reporter
        .recent_orders(&fx.admin, LimitQuery { limit: Some(3) })
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
    assert!(rows.iter().all(|r| r.customer_name == "Amina Wanjiku"));
    assert!(rows.iter().all(|r| r.items_count >= 1));
}

#[tokio::test]
async fn test_customer_summary() {
    let fx = fixture().await;
    let c = catalog(&fx).await;
    seed_orders(&fx, &c).await;

    let theirs = fx
        .engine
        .create_order(&fx.other_customer, order_for(&[(c.lamp.id, 1)]))
        .await
        .unwrap();
    fx.engine
        .set_status(
            &fx.admin,
            theirs.id,
            StatusChange {
                status: OrderStatus::Delivered,
                note: None,
            },
        )
        .await
        .unwrap();

    let summary = fx
        .reporter
        .customer_summary(&fx.admin, fx.customer.id)
        .await
        .unwrap();
    assert_eq!(summary.customer.full_name, "Amina Wanjiku");
    assert_eq!(summary.total_orders, 5);
    assert_eq!(summary.total_spent, money("650"));
    assert_eq!(summary.recent_orders.len(), 5);

    let other = fx
        .reporter
        .customer_summary(&fx.admin, fx.other_customer.id)
        .await
        .unwrap();
    assert_eq!(other.total_orders, 1);
    assert_eq!(other.total_spent, money("10"));

    let err = fx
        .reporter
        .customer_summary(&fx.admin, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_customer_summary_excludes_admin_accounts() {
    let fx = fixture().await;

    let err = fx
        .reporter
        .customer_summary(&fx.admin, fx.admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_customer_listing() {
    let fx = fixture().await;

    let all = fx
        .reporter
        .customers(&fx.admin, CustomerQuery::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.pages, 1);
    let names: Vec<_> = all.customers.iter().map(|c| c.full_name.as_str()).collect();
    assert_eq!(names, vec!["Brian Otieno", "Amina Wanjiku"]);

    let second = fx
        .reporter
        .customers(
            &fx.admin,
            CustomerQuery {
                page: Some(2),
                limit: Some(1),
                search: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(second.total, 2);
    assert_eq!(second.pages, 2);
    assert_eq!(second.page, 2);
    assert_eq!(second.customers[0].full_name, "Amina Wanjiku");

    let found = fx
        .reporter
        .customers(
            &fx.admin,
            CustomerQuery {
                search: Some("  WANJIKU ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.customers[0].id, fx.customer.id);

    let by_phone = fx
        .reporter
        .customers(
            &fx.admin,
            CustomerQuery {
                search: Some("0711000099".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_phone.total, 0);
    assert!(by_phone.customers.is_empty());
    assert_eq!(by_phone.pages, 0);
}

#[tokio::test]
async fn test_customer_listing_parameters() {
    let fx = fixture().await;

    for query in [
        CustomerQuery {
            limit: Some(101),
            ..Default::default()
        },
        CustomerQuery {
            limit: Some(0),
            ..Default::default()
        },
        CustomerQuery {
            page: Some(0),
            ..Default::default()
        },
    ] {
        let err = fx.reporter.customers(&fx.admin, query).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    let full = fx
        .reporter
        .customers(
            &fx.admin,
            CustomerQuery {
                limit: Some(100),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(full.total, 2);

    let err = fx
        .reporter
        .customers(&fx.customer, CustomerQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied(_)));
}

#[tokio::test]
async fn test_reports_are_admin_only() {
    let fx = fixture().await;

    let err = fx.reporter.dashboard(&fx.customer).await.unwrap_err();
    assert!(matches!(err, AppError::AccessDenied(_)));

    let err = fx
        .reporter
        .customer_summary(&fx.customer, fx.customer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied(_)));
}

#[tokio::test]
async fn test_report_parameters_are_validated() {
    let fx = fixture().await;

    for days in [0, 366] {
        let err = fx
            .reporter
            .revenue_by_category(&fx.admin, PeriodQuery { days: Some(days) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    let err = fx
        .reporter
        .top_products(
            &fx.admin,
            TopProductsQuery {
                limit: Some(51),
                days: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = fx
        .reporter
        .low_stock(&fx.admin, LowStockQuery { threshold: Some(0) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = fx
        .reporter
        .recent_orders(&fx.admin, LimitQuery { limit: Some(0) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
