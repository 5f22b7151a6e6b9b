//! Referred order handlers.
//!
//! Orders are private to the user who earned them; admins get no special
//! access here.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use showcase_core::{AffiliatePlatform, CurrencyCode, OrderId, OrderStatus, ProductId};

use super::products::{validate_amount, validate_currency};
use crate::db::{OrderRepository, ProductRepository};
use crate::error::AppError;
use crate::middleware::{RequireUser, ValidatedJson};
use crate::models::{
    CurrentUser, NewOrder, Order, OrderFilter, OrderSummary, OrderUpdate, PageParams, Paginated,
};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/summary", get(summary))
        .route(
            "/api/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub product_id: Option<ProductId>,
    pub platform: AffiliatePlatform,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub external_order_id: String,
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    #[validate(custom(function = "validate_amount"))]
    pub commission: Decimal,
    #[validate(custom(function = "validate_currency"))]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    pub ordered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    #[validate(custom(function = "validate_amount"))]
    pub amount: Option<Decimal>,
    #[validate(custom(function = "validate_amount"))]
    pub commission: Option<Decimal>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// Paid and cancelled orders are settled; their figures no longer change.
fn ensure_mutable(order: &Order) -> Result<(), AppError> {
    if order.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order is {} and can no longer change",
            order.status
        )));
    }
    Ok(())
}

async fn load_own(state: &AppState, current: &CurrentUser, id: OrderId) -> Result<Order, AppError> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_string()))?;

    if order.user_id != current.id {
        return Err(AppError::Forbidden("not your order".to_string()));
    }
    Ok(order)
}

async fn list_orders(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(params): Query<PageParams>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Paginated<Order>>, AppError> {
    let page = params.validate()?;
    let filter = OrderFilter {
        status: query.status,
    };
    let (orders, total) = OrderRepository::new(state.pool())
        .list_for_user(current.id, filter, page)
        .await?;
    Ok(Json(Paginated::new(orders, page, total)))
}

async fn create_order(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    ValidatedJson(body): ValidatedJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(product_id) = body.product_id {
        let product = ProductRepository::new(state.pool())
            .get(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("product".to_string()))?;
        if product.owner_id != current.id {
            return Err(AppError::Forbidden("not your product".to_string()));
        }
    }

    let currency_code = body
        .currency_code
        .as_deref()
        .and_then(|c| c.parse::<CurrencyCode>().ok())
        .unwrap_or_default();

    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            user_id: current.id,
            product_id: body.product_id,
            platform: body.platform,
            external_order_id: body.external_order_id.trim().to_string(),
            amount: body.amount,
            commission: body.commission,
            currency_code,
            status: body.status,
            ordered_at: body.ordered_at.unwrap_or_else(Utc::now),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Count, amount and commission per status.
async fn summary(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<Vec<OrderSummary>>, AppError> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .summary(current.id)
            .await?,
    ))
}

async fn get_order(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(load_own(&state, &current, id).await?))
}

async fn update_order(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<OrderId>,
    ValidatedJson(body): ValidatedJson<UpdateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = load_own(&state, &current, id).await?;
    ensure_mutable(&order)?;

    let order = OrderRepository::new(state.pool())
        .update(
            id,
            &OrderUpdate {
                amount: body.amount,
                commission: body.commission,
                status: body.status,
            },
        )
        .await?;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, AppError> {
    load_own(&state, &current, id).await?;
    OrderRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use showcase_core::UserId;

    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            product_id: None,
            platform: AffiliatePlatform::Amazon,
            external_order_id: "111-2222222-3333333".to_string(),
            amount: Decimal::new(4999, 2),
            commission: Decimal::new(200, 2),
            currency_code: CurrencyCode::USD,
            status,
            ordered_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn settled_orders_are_frozen() {
        assert!(ensure_mutable(&order(OrderStatus::Pending)).is_ok());
        assert!(ensure_mutable(&order(OrderStatus::Confirmed)).is_ok());
        let err = ensure_mutable(&order(OrderStatus::Paid)).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn create_request_defaults_and_rules() {
        let req: CreateOrderRequest = serde_json::from_str(
            r#"{"platform": "ebay", "external_order_id": "A1", "amount": "10", "commission": "0.5"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.status, OrderStatus::Pending);

        let req: CreateOrderRequest = serde_json::from_str(
            r#"{"platform": "ebay", "external_order_id": "", "amount": "-1", "commission": "0"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("external_order_id"));
        assert!(errors.field_errors().contains_key("amount"));

        let req: CreateOrderRequest = serde_json::from_str(
            r#"{"platform": "ebay", "external_order_id": "A2", "amount": "99999999999", "commission": "0"}"#,
        )
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("amount"));

        let update = UpdateOrderRequest {
            amount: None,
            commission: Some(Decimal::new(999_999_999_999, 2)),
            status: None,
        };
        assert!(update.validate().is_ok());
    }
}
