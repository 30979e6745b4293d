//! Checkout and order lifecycle against the in-memory store

mod common;

use std::sync::Arc;

use common::{Shop, product, shipping};
use shared::error::{AppError, ErrorCode};
use shared::models::Order;
use shared::order::{
    DEFAULT_CUSTOMER_CANCEL_REASON, OrderStatus, PaymentMethod, PaymentStatus, day_key,
    format_order_number,
};
use shared::util::now_millis;
use shop_server::db::{Store, StoreError};
use shop_server::error::ServiceResult;
use shop_server::orders::{
    BuyNowRequest, CreateOrderRequest, ListQuery, ShippingInfoRequest, StatusUpdateRequest,
};

const USER: &str = "user-1";
const ADMIN: &str = "admin-1";

fn error_code<T: std::fmt::Debug>(result: ServiceResult<T>) -> ErrorCode {
    AppError::from(result.unwrap_err()).code
}

fn from_cart(item_ids: Vec<i64>) -> CreateOrderRequest {
    CreateOrderRequest {
        item_ids,
        shipping: shipping(),
        payment_method: PaymentMethod::Card,
        transaction_id: None,
        merchant_order_id: None,
    }
}

fn paid_from_cart(item_ids: Vec<i64>, imp_uid: &str, merchant_uid: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        transaction_id: Some(imp_uid.into()),
        merchant_order_id: Some(merchant_uid.into()),
        ..from_cart(item_ids)
    }
}

fn buy_now(product_id: i64, quantity: i32) -> BuyNowRequest {
    BuyNowRequest {
        product_id,
        quantity,
        selected_color: "navy".into(),
        selected_size: "L".into(),
        shipping: shipping(),
        payment_method: PaymentMethod::Kakao,
        transaction_id: None,
        merchant_order_id: None,
    }
}

fn status(status: OrderStatus) -> StatusUpdateRequest {
    StatusUpdateRequest {
        status,
        shipping_company: None,
        tracking_number: None,
        cancel_reason: None,
        refund_amount: None,
    }
}

fn ship() -> StatusUpdateRequest {
    StatusUpdateRequest {
        shipping_company: Some("CJ Logistics".into()),
        tracking_number: Some("6301-2345-6789".into()),
        ..status(OrderStatus::Shipped)
    }
}

/// Walk a paid order through the given admin statuses
async fn advance(shop: &Shop, order: &Order, steps: &[OrderStatus]) -> Order {
    let mut current = order.clone();
    for step in steps {
        let req = match step {
            OrderStatus::Shipped => ship(),
            other => status(*other),
        };
        current = shop
            .orders
            .admin_transition(ADMIN, current.id, req)
            .await
            .unwrap();
    }
    current
}

async fn paid_order(shop: &Shop, product_id: i64, quantity: i32, amount: i64) -> Order {
    let entry = shop.add_to_cart(USER, product_id, quantity).await;
    let merchant_uid = format!("mid_{entry}");
    let imp_uid = format!("imp_{entry}");
    shop.gateway.record_paid(&imp_uid, &merchant_uid, amount);
    shop.orders
        .create_from_cart(USER, paid_from_cart(vec![entry], &imp_uid, &merchant_uid))
        .await
        .unwrap()
        .order
}

// ========== Creation ==========

#[tokio::test]
async fn checkout_consumes_only_selected_cart_entries() {
    let shop = Shop::new(vec![product(1, 10_000, 10), product(2, 5_000, 10)]);
    let first = shop.add_to_cart(USER, 1, 2).await;
    let second = shop.add_to_cart(USER, 2, 1).await;

    let outcome = shop
        .orders
        .create_from_cart(USER, from_cart(vec![first]))
        .await
        .unwrap();
    let order = outcome.order;

    assert!(outcome.created);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    assert!(!order.payment.verified);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.total_product_amount, 20_000);
    assert_eq!(order.shipping_fee, 3_000);
    assert_eq!(order.total_amount, 23_000);
    assert_eq!(
        order.total_amount,
        order.total_product_amount + order.shipping_fee - order.discount_amount
    );

    let cart = shop.carts.get(USER).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].item.id, second);
    assert_eq!(shop.stock(1), 8);
    assert_eq!(shop.stock(2), 10);
}

#[tokio::test]
async fn whole_cart_over_threshold_ships_free() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    shop.add_to_cart(USER, 1, 3).await;

    let order = shop
        .orders
        .create_from_cart(USER, from_cart(Vec::new()))
        .await
        .unwrap()
        .order;

    assert_eq!(order.total_product_amount, 45_000);
    assert_eq!(order.shipping_fee, 0);
    assert_eq!(order.total_amount, 45_000);
    assert_eq!(order.total_quantity, 3);
    assert!(shop.carts.get(USER).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn empty_cart_and_empty_selection_are_rejected() {
    let shop = Shop::new(vec![product(1, 1_000, 10)]);
    assert_eq!(
        error_code(shop.orders.create_from_cart(USER, from_cart(Vec::new())).await),
        ErrorCode::CartEmpty
    );

    shop.add_to_cart(USER, 1, 1).await;
    assert_eq!(
        error_code(shop.orders.create_from_cart(USER, from_cart(vec![999])).await),
        ErrorCode::CartNothingSelected
    );
    assert_eq!(shop.store.order_count(), 0);
}

#[tokio::test]
async fn verified_payment_marks_order_paid() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let entry = shop.add_to_cart(USER, 1, 3).await;
    shop.gateway.record_paid("imp_1", "mid_1", 45_000);

    let order = shop
        .orders
        .create_from_cart(USER, paid_from_cart(vec![entry], "imp_1", "mid_1"))
        .await
        .unwrap()
        .order;

    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment.status, PaymentStatus::Completed);
    assert!(order.payment.verified);
    assert!(order.payment.paid_at.is_some());
    assert_eq!(order.order_number, "mid_1");
    assert_eq!(order.imp_uid, "imp_1");
}

#[tokio::test]
async fn repeated_merchant_id_returns_original_order() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let entry = shop.add_to_cart(USER, 1, 3).await;
    shop.gateway.record_paid("imp_1", "mid_1", 45_000);

    let first = shop
        .orders
        .create_from_cart(USER, paid_from_cart(vec![entry], "imp_1", "mid_1"))
        .await
        .unwrap();
    let replay = shop
        .orders
        .create_from_cart(USER, paid_from_cart(vec![entry], "imp_1", "mid_1"))
        .await
        .unwrap();

    assert!(first.created);
    assert!(!replay.created);
    assert_eq!(replay.order.id, first.order.id);
    assert_eq!(shop.store.order_count(), 1);
    assert_eq!(shop.stock(1), 7);
}

#[tokio::test]
async fn merchant_id_of_another_user_is_refused() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let order = paid_order(&shop, 1, 3, 45_000).await;

    shop.add_to_cart("user-2", 1, 1).await;
    let result = shop
        .orders
        .create_from_cart(
            "user-2",
            paid_from_cart(Vec::new(), &order.imp_uid, &order.merchant_uid),
        )
        .await;
    assert_eq!(error_code(result), ErrorCode::AlreadyExists);
    assert_eq!(shop.store.order_count(), 1);
}

#[tokio::test]
async fn amount_mismatch_leaves_no_trace() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let entry = shop.add_to_cart(USER, 1, 3).await;
    shop.gateway.record_paid("imp_1", "mid_1", 44_000);

    let result = shop
        .orders
        .create_from_cart(USER, paid_from_cart(vec![entry], "imp_1", "mid_1"))
        .await;

    assert_eq!(error_code(result), ErrorCode::PaymentAmountMismatch);
    assert_eq!(shop.store.order_count(), 0);
    assert_eq!(shop.stock(1), 10);
    assert_eq!(shop.carts.get(USER).await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn unknown_payment_is_not_completed() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let entry = shop.add_to_cart(USER, 1, 1).await;

    let result = shop
        .orders
        .create_from_cart(USER, paid_from_cart(vec![entry], "imp_none", "mid_1"))
        .await;
    assert_eq!(error_code(result), ErrorCode::PaymentNotCompleted);
}

#[tokio::test]
async fn transaction_id_requires_merchant_id() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let req = BuyNowRequest {
        transaction_id: Some("imp_1".into()),
        ..buy_now(1, 1)
    };
    assert_eq!(
        error_code(shop.orders.buy_now(USER, req).await),
        ErrorCode::RequiredField
    );
    assert_eq!(shop.stock(1), 10);
}

#[tokio::test]
async fn merchant_id_cannot_claim_a_sequence_number() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let today = day_key(now_millis());
    let req = BuyNowRequest {
        merchant_order_id: Some(format_order_number(&today, 1)),
        ..buy_now(1, 1)
    };
    assert_eq!(
        error_code(shop.orders.buy_now(USER, req).await),
        ErrorCode::ValidationFailed
    );
    assert_eq!(shop.stock(1), 10);

    let first = shop.orders.buy_now(USER, buy_now(1, 1)).await.unwrap().order;
    let second = shop.orders.buy_now("user-2", buy_now(1, 1)).await.unwrap().order;
    assert_eq!(first.order_number, format_order_number(&today, 1));
    assert_ne!(first.order_number, second.order_number);
}

#[tokio::test]
async fn store_rejects_a_taken_order_number() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let first = shop.orders.buy_now(USER, buy_now(1, 1)).await.unwrap().order;

    let mut clash = first.clone();
    clash.id += 1;
    clash.user_id = "user-2".into();
    clash.merchant_uid = first.order_number.clone();
    let result = shop.store.commit_order(clash, &[]).await;

    assert!(matches!(
        result,
        Err(StoreError::DuplicateOrderNumber(number)) if number == first.order_number
    ));
    assert_eq!(shop.stock(1), 9);
    assert_eq!(shop.store.order_count(), 1);
}

#[tokio::test]
async fn receipt_ids_must_be_url_safe() {
    let shop = Shop::new(vec![product(1, 15_000, 10)]);
    let req = BuyNowRequest {
        transaction_id: Some("../users/getToken".into()),
        merchant_order_id: Some("mid_1".into()),
        ..buy_now(1, 1)
    };
    assert_eq!(
        error_code(shop.orders.buy_now(USER, req).await),
        ErrorCode::ValidationFailed
    );

    let req = BuyNowRequest {
        transaction_id: Some("imp_1".into()),
        merchant_order_id: Some("mid 1?x=y".into()),
        ..buy_now(1, 1)
    };
    assert_eq!(
        error_code(shop.orders.buy_now(USER, req).await),
        ErrorCode::ValidationFailed
    );
    assert_eq!(shop.stock(1), 10);
}

#[tokio::test]
async fn buy_now_checks_availability() {
    let mut discontinued = product(2, 1_000, 10);
    discontinued.status = shared::models::ProductStatus::Discontinued;
    let shop = Shop::new(vec![product(1, 1_000, 2), discontinued]);

    assert_eq!(
        error_code(shop.orders.buy_now(USER, buy_now(1, 3)).await),
        ErrorCode::ProductOutOfStock
    );
    assert_eq!(
        error_code(shop.orders.buy_now(USER, buy_now(2, 1)).await),
        ErrorCode::ProductUnavailable
    );
    assert_eq!(
        error_code(shop.orders.buy_now(USER, buy_now(99, 1)).await),
        ErrorCode::ProductNotFound
    );
    assert_eq!(shop.store.order_count(), 0);
}

#[tokio::test]
async fn buy_now_uses_live_price_and_leaves_cart_alone() {
    let shop = Shop::new(vec![product(1, 12_000, 10)]);
    shop.add_to_cart(USER, 1, 1).await;

    let order = shop
        .orders
        .buy_now(USER, buy_now(1, 2))
        .await
        .unwrap()
        .order;

    assert_eq!(order.items[0].price, 12_000);
    assert_eq!(order.items[0].selected_size, "L");
    assert_eq!(order.total_amount, 24_000 + 3_000);
    assert_eq!(shop.carts.get(USER).await.unwrap().items.len(), 1);
    assert_eq!(shop.stock(1), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_buy_now_never_oversells() {
    let shop = Arc::new(Shop::new(vec![product(1, 10_000, 5)]));

    let handles: Vec<_> = ["buyer-a", "buyer-b"]
        .into_iter()
        .map(|user| {
            let shop = shop.clone();
            tokio::spawn(async move { shop.orders.buy_now(user, buy_now(1, 5)).await })
        })
        .collect();

    let mut created = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => {
                assert_eq!(AppError::from(e).code, ErrorCode::ProductOutOfStock);
                out_of_stock += 1;
            }
        }
    }

    assert_eq!((created, out_of_stock), (1, 1));
    assert_eq!(shop.stock(1), 0);
    assert_eq!(shop.store.order_count(), 1);
}

// ========== Queries ==========

#[tokio::test]
async fn orders_are_private_to_their_owner() {
    let shop = Shop::new(vec![product(1, 1_000, 10)]);
    let order = shop.orders.buy_now(USER, buy_now(1, 1)).await.unwrap().order;

    assert_eq!(shop.orders.get_own(USER, order.id).await.unwrap().id, order.id);
    assert_eq!(
        error_code(shop.orders.get_own("user-2", order.id).await),
        ErrorCode::OrderNotFound
    );
    assert_eq!(
        error_code(shop.orders.cancel_own("user-2", order.id, None).await),
        ErrorCode::OrderNotFound
    );
    assert_eq!(shop.orders.admin_get(order.id).await.unwrap().id, order.id);
}

#[tokio::test]
async fn own_list_reports_status_counts_independent_of_filter() {
    let shop = Shop::new(vec![product(1, 1_000, 50)]);
    let first = paid_order(&shop, 1, 1, 4_000).await;
    paid_order(&shop, 1, 1, 4_000).await;
    shop.orders.buy_now(USER, buy_now(1, 1)).await.unwrap();
    shop.orders.buy_now("user-2", buy_now(1, 1)).await.unwrap();
    advance(&shop, &first, &[OrderStatus::Preparing, OrderStatus::Shipped]).await;

    let page = shop
        .orders
        .list_own(
            USER,
            ListQuery {
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(page.total_count, 1);
    assert_eq!(page.orders[0].id, first.id);
    let counts = page.status_counts.unwrap();
    assert_eq!(counts.all, 3);
    assert_eq!(counts.shipped, 1);
    assert_eq!(counts.preparing, 0);
}

#[tokio::test]
async fn admin_search_matches_recipient_case_insensitively() {
    let shop = Shop::new(vec![product(1, 1_000, 50)]);
    shop.orders.buy_now(USER, buy_now(1, 1)).await.unwrap();
    let mut other = buy_now(1, 1);
    other.shipping.recipient_name = "Park Jisoo".into();
    shop.orders.buy_now("user-2", other).await.unwrap();

    let page = shop
        .orders
        .admin_list(ListQuery {
            search: Some("park".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.orders[0].user_id, "user-2");
    assert!(page.status_counts.is_none());

    let all = shop.orders.admin_list(ListQuery::default()).await.unwrap();
    assert_eq!(all.total_count, 2);
}

// ========== Lifecycle ==========

#[tokio::test]
async fn create_then_cancel_restores_stock() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = shop.orders.buy_now(USER, buy_now(1, 3)).await.unwrap().order;
    assert_eq!(shop.stock(1), 7);

    let cancelled = shop.orders.cancel_own(USER, order.id, None).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(
        cancelled.cancel_reason.as_deref(),
        Some(DEFAULT_CUSTOMER_CANCEL_REASON)
    );
    assert_eq!(cancelled.payment.status, PaymentStatus::Cancelled);
    assert_eq!(shop.stock(1), 10);

    // A second cancel is illegal and credits nothing
    assert_eq!(
        error_code(shop.orders.cancel_own(USER, order.id, None).await),
        ErrorCode::OrderNotCancellable
    );
    assert_eq!(shop.stock(1), 10);
}

#[tokio::test]
async fn customer_cannot_cancel_once_preparing() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 1, 13_000).await;
    let preparing = advance(&shop, &order, &[OrderStatus::Preparing]).await;

    let result = shop
        .orders
        .cancel_own(USER, preparing.id, Some("changed my mind".into()))
        .await;

    assert_eq!(error_code(result), ErrorCode::OrderNotCancellable);
    let stored = shop.orders.get_own(USER, order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Preparing);
    assert_eq!(shop.stock(1), 9);
}

#[tokio::test]
async fn illegal_transition_leaves_status_unchanged() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 1, 13_000).await;
    let delivered = advance(
        &shop,
        &order,
        &[
            OrderStatus::Preparing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
    )
    .await;
    assert!(delivered.shipped_at.is_some());
    assert!(delivered.delivered_at.is_some());

    let result = shop
        .orders
        .admin_transition(ADMIN, order.id, status(OrderStatus::Preparing))
        .await;

    let err = AppError::from(result.unwrap_err());
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    assert!(err.message.contains("delivered"));
    assert!(err.message.contains("preparing"));
    assert_eq!(
        shop.orders.admin_get(order.id).await.unwrap().status,
        OrderStatus::Delivered
    );
}

#[tokio::test]
async fn shipping_requires_tracking_number() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 1, 13_000).await;
    advance(&shop, &order, &[OrderStatus::Preparing]).await;

    let req = StatusUpdateRequest {
        tracking_number: Some("  ".into()),
        ..ship()
    };
    let result = shop.orders.admin_transition(ADMIN, order.id, req).await;

    assert_eq!(error_code(result), ErrorCode::RequiredField);
    let stored = shop.orders.admin_get(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Preparing);
    assert!(stored.tracking_number.is_none());
}

#[tokio::test]
async fn refund_after_delivery_restores_stock() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 2, 23_000).await;
    advance(
        &shop,
        &order,
        &[
            OrderStatus::Preparing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
    )
    .await;
    assert_eq!(shop.stock(1), 8);

    let refunded = shop
        .orders
        .admin_transition(ADMIN, order.id, status(OrderStatus::Refunded))
        .await
        .unwrap();

    assert_eq!(refunded.refund_amount, 23_000);
    assert_eq!(refunded.payment.status, PaymentStatus::Refunded);
    assert_eq!(shop.stock(1), 10);
}

#[tokio::test]
async fn refund_above_total_is_rejected() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 1, 13_000).await;

    let req = StatusUpdateRequest {
        refund_amount: Some(13_001),
        ..status(OrderStatus::Refunded)
    };
    let result = shop.orders.admin_transition(ADMIN, order.id, req).await;

    assert_eq!(error_code(result), ErrorCode::PaymentRefundExceedsAmount);
    assert_eq!(
        shop.orders.admin_get(order.id).await.unwrap().status,
        OrderStatus::Paid
    );
    assert_eq!(shop.stock(1), 9);
}

#[tokio::test]
async fn admin_cancel_requires_reason() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 1, 13_000).await;

    let result = shop
        .orders
        .admin_transition(ADMIN, order.id, status(OrderStatus::Cancelled))
        .await;
    assert_eq!(error_code(result), ErrorCode::RequiredField);

    let req = StatusUpdateRequest {
        cancel_reason: Some("Out of season".into()),
        ..status(OrderStatus::Cancelled)
    };
    let cancelled = shop
        .orders
        .admin_transition(ADMIN, order.id, req)
        .await
        .unwrap();
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("Out of season"));
    assert_eq!(shop.stock(1), 10);
}

#[tokio::test]
async fn shipping_info_correction_only_after_shipment() {
    let shop = Shop::new(vec![product(1, 10_000, 10)]);
    let order = paid_order(&shop, 1, 1, 13_000).await;

    let fix = ShippingInfoRequest {
        shipping_company: None,
        tracking_number: Some("9999-0000".into()),
    };
    assert_eq!(
        error_code(
            shop.orders
                .update_shipping_info(ADMIN, order.id, fix.clone())
                .await
        ),
        ErrorCode::ShippingInfoLocked
    );

    advance(&shop, &order, &[OrderStatus::Preparing, OrderStatus::Shipped]).await;
    assert_eq!(
        error_code(
            shop.orders
                .update_shipping_info(ADMIN, order.id, ShippingInfoRequest::default())
                .await
        ),
        ErrorCode::ValidationFailed
    );

    let updated = shop
        .orders
        .update_shipping_info(ADMIN, order.id, fix)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.tracking_number.as_deref(), Some("9999-0000"));
    assert_eq!(updated.shipping_company.as_deref(), Some("CJ Logistics"));
}
