mod support;

use checkout_engine::{db_types::NewProduct, traits::InventoryError, InventoryApi, SqliteDatabase};
use shop_common::Money;

fn inventory(db: &SqliteDatabase) -> InventoryApi<SqliteDatabase> {
    InventoryApi::new(db.clone())
}

#[tokio::test]
async fn products_enter_the_catalog_through_the_ledger() {
    let db = support::new_db().await;
    let api = inventory(&db);
    let product = api.add_product(NewProduct::new("Widget", Money::from(10_000), 4)).await.unwrap();
    assert_eq!(product.stock, 4);
    assert_eq!(product.sales, 0);
    assert!(product.is_available());

    let fetched = api.product(product.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Widget");
    assert_eq!(fetched.price, Money::from(10_000));

    assert!(api.product(999).await.unwrap().is_none());
}

#[tokio::test]
async fn restock_and_drawdown_move_the_same_counter() {
    let db = support::new_db().await;
    let api = inventory(&db);
    let product = api.add_product(NewProduct::new("Widget", Money::from(10_000), 4)).await.unwrap();

    let product = api.adjust_stock(product.id, 6).await.unwrap();
    assert_eq!(product.stock, 10);

    let product = api.adjust_stock(product.id, -10).await.unwrap();
    assert_eq!(product.stock, 0);
}

#[tokio::test]
async fn stock_can_never_go_negative() {
    let db = support::new_db().await;
    let api = inventory(&db);
    let product = api.add_product(NewProduct::new("Widget", Money::from(10_000), 4)).await.unwrap();

    let err = api.adjust_stock(product.id, -5).await.unwrap_err();
    assert!(matches!(err, InventoryError::StockUnderflow { requested: 5, available: 4 }));

    // the refused adjustment changed nothing
    let unchanged = api.product(product.id).await.unwrap().unwrap();
    assert_eq!(unchanged.stock, 4);

    let err = api.adjust_stock(999, 1).await.unwrap_err();
    assert!(matches!(err, InventoryError::ProductNotFound(999)));
}

#[tokio::test]
async fn unlimited_products_have_no_stock_counter() {
    let db = support::new_db().await;
    let api = inventory(&db);
    let mut new_product = NewProduct::new("Pattern download", Money::from(2_500), 0);
    new_product.unlimited = true;
    let product = api.add_product(new_product).await.unwrap();
    assert!(product.is_available());
    assert!(product.available_stock().is_none());

    // adjustments are a no-op rather than an error
    let product = api.adjust_stock(product.id, -100).await.unwrap();
    assert_eq!(product.stock, 0);
}
