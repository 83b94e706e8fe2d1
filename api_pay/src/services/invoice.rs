use std::collections::HashSet;

use chrono::{Duration, Utc};
use common::{
    env_config::Config,
    error::{AppError, Res},
    jwt::Principal,
    misc::{cents_to_usd, usd_to_cents},
    nowpayments::{CreateInvoice, PaymentGateway},
};
use db::{
    dtos::{
        payment::PaymentCreateRequest, payment_item::PaymentItemCreateRequest,
        subscription::SubscriptionCreateRequest,
    },
    models::status::Period,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::pay::{CreateInvoiceRequest, CreateInvoiceResponse, OrderData};

pub const MINIMUM_AMOUNT_CENTS: i64 = 2000;
pub const INVOICE_TTL_MINUTES: i64 = 20;
/// Upper bound for an order total and for any single line item ($100,000).
pub const MAXIMUM_AMOUNT_CENTS: i64 = 10_000_000;

/// A create-invoice request that passed validation.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedOrder {
    pub total_cents: i64,
    pub currency: String,
    pub network: String,
    pub period: Period,
    pub items: Vec<LineItem>,
    pub order_data: OrderData,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineItem {
    pub pair_id: Uuid,
    pub base_price_cents: i64,
    pub discount_rate: f64,
    pub final_price_cents: i64,
}

pub(crate) fn validate(req: &CreateInvoiceRequest) -> Res<ValidatedOrder> {
    let missing = || AppError::BadRequest("Missing required fields: amount, currency, network, orderData".to_string());

    let amount = req.amount.ok_or_else(missing)?;
    let currency = non_empty(req.currency.as_deref()).ok_or_else(missing)?;
    let network = non_empty(req.network.as_deref()).ok_or_else(missing)?;
    let order_data = req.order_data.clone().ok_or_else(missing)?;

    if !amount.is_finite() {
        return Err(AppError::BadRequest("Invalid amount".to_string()));
    }
    let total_cents = usd_to_cents(amount);
    if total_cents < MINIMUM_AMOUNT_CENTS {
        return Err(AppError::BadRequest(
            "Minimum amount is $20 USD. Please increase your order.".to_string(),
        ));
    }
    if total_cents > MAXIMUM_AMOUNT_CENTS {
        return Err(AppError::BadRequest(format!(
            "Maximum amount is ${:.2} USD",
            cents_to_usd(MAXIMUM_AMOUNT_CENTS)
        )));
    }

    let mut seen = HashSet::new();
    let pair_ids: Vec<Uuid> = order_data
        .pair_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if pair_ids.is_empty() {
        return Err(AppError::BadRequest(
            "orderData.pairIds must contain at least one pair".to_string(),
        ));
    }

    let period = match order_data.period.as_deref().or(order_data.plan.as_deref()) {
        Some(raw) => raw.parse::<Period>().map_err(AppError::BadRequest)?,
        None => Period::OneMonth,
    };

    let items = if order_data.payment_items.is_empty() {
        split_evenly(total_cents, &pair_ids)
    } else {
        priced_items(total_cents, &pair_ids, &order_data)?
    };

    Ok(ValidatedOrder {
        total_cents,
        currency: currency.to_lowercase(),
        network: network.to_lowercase(),
        period,
        items,
        order_data,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Spreads the total over the pairs; leftover cents go to the first item.
fn split_evenly(total_cents: i64, pair_ids: &[Uuid]) -> Vec<LineItem> {
    let count = pair_ids.len() as i64;
    let share = total_cents / count;
    let remainder = total_cents - share * count;

    pair_ids
        .iter()
        .enumerate()
        .map(|(i, pair_id)| {
            let price = if i == 0 { share + remainder } else { share };
            LineItem {
                pair_id: *pair_id,
                base_price_cents: price,
                discount_rate: 0.0,
                final_price_cents: price,
            }
        })
        .collect()
}

fn priced_items(total_cents: i64, pair_ids: &[Uuid], order: &OrderData) -> Res<Vec<LineItem>> {
    let allowed: HashSet<&Uuid> = pair_ids.iter().collect();
    let mut items = Vec::with_capacity(order.payment_items.len());

    for input in &order.payment_items {
        if !allowed.contains(&input.pair_id) {
            return Err(AppError::BadRequest(format!(
                "Payment item references pair {} which is not part of the order",
                input.pair_id
            )));
        }
        if !(0.0..=100.0).contains(&input.discount_rate) {
            return Err(AppError::BadRequest(format!(
                "Invalid discount rate {} for pair {}",
                input.discount_rate, input.pair_id
            )));
        }
        let base_price_cents = item_price_cents(input.base_price, input.pair_id)?;
        let final_price_cents = match input.final_price {
            Some(price) => item_price_cents(price, input.pair_id)?,
            None => item_price_cents(
                input.base_price * (1.0 - input.discount_rate / 100.0),
                input.pair_id,
            )?,
        };
        items.push(LineItem {
            pair_id: input.pair_id,
            base_price_cents,
            discount_rate: input.discount_rate,
            final_price_cents,
        });
    }

    let covered: HashSet<&Uuid> = items.iter().map(|item| &item.pair_id).collect();
    if covered.len() != items.len() || covered.len() != pair_ids.len() {
        return Err(AppError::BadRequest(
            "Exactly one payment item is required per pair".to_string(),
        ));
    }

    // one cent of rounding slack per item
    let sum = items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.final_price_cents))
        .ok_or_else(|| AppError::BadRequest("Payment items total is out of range".to_string()))?;
    if (sum - total_cents).abs() > items.len() as i64 {
        return Err(AppError::BadRequest(format!(
            "Payment items total ${:.2} does not match amount ${:.2}",
            cents_to_usd(sum),
            cents_to_usd(total_cents)
        )));
    }

    Ok(items)
}

/// A line-item price in cents, strictly positive and no larger than the order cap.
fn item_price_cents(price: f64, pair_id: Uuid) -> Res<i64> {
    let cents = if price.is_finite() { usd_to_cents(price) } else { 0 };
    if cents <= 0 || cents > MAXIMUM_AMOUNT_CENTS {
        return Err(AppError::BadRequest(format!(
            "Invalid price {} for pair {}",
            price, pair_id
        )));
    }
    Ok(cents)
}

/// Canonical correlation id echoed back by every gateway callback.
pub(crate) fn generate_order_id() -> String {
    format!("AM-{}", Uuid::new_v4().simple())
}

pub(crate) fn build_gateway_request(
    order: &ValidatedOrder,
    order_id: &str,
    app_url: &str,
) -> CreateInvoice {
    CreateInvoice {
        price_amount: cents_to_usd(order.total_cents),
        price_currency: order.currency.clone(),
        pay_currency: order.network.clone(),
        order_id: order_id.to_string(),
        order_description: format!(
            "AlgoMakers.Ai subscription: {} pair(s), {}",
            order.items.len(),
            order.period
        ),
        ipn_callback_url: format!("{}/api/payments/webhook", app_url),
        success_url: format!("{}/dashboard?payment=success", app_url),
        cancel_url: format!("{}/dashboard?payment=cancelled", app_url),
    }
}

/// Creates the hosted invoice, then persists subscriptions, payment and
/// payment items atomically. A gateway failure leaves no rows behind.
pub async fn create_invoice(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    config: &Config,
    principal: &Principal,
    req: CreateInvoiceRequest,
) -> Res<CreateInvoiceResponse> {
    let order = validate(&req)?;
    let order_id = generate_order_id();

    let invoice = gateway
        .create_invoice(&build_gateway_request(&order, &order_id, &config.app_url))
        .await?;

    let now = Utc::now().naive_utc();
    let expires_at = now + Duration::minutes(INVOICE_TTL_MINUTES);

    let mut tx = pool.begin().await?;

    let mut created = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let sub = db::subscription::insert_subscription(
            &mut *tx,
            SubscriptionCreateRequest {
                user_id: principal.user_id,
                pair_id: item.pair_id,
                period: order.period,
                start_date: now,
                base_price_cents: item.base_price_cents,
                discount_rate: item.discount_rate,
            },
        )
        .await?;
        created.push((item, sub));
    }

    let payment = db::payment::insert_payment(
        &mut *tx,
        PaymentCreateRequest {
            user_id: principal.user_id,
            total_amount_cents: order.total_cents,
            network: order.network.clone(),
            order_id: order_id.clone(),
            invoice_id: invoice.id.clone(),
            invoice_url: invoice.invoice_url.clone(),
            expires_at,
            order_data: serde_json::to_value(&order.order_data)?,
        },
    )
    .await?;

    for (item, sub) in created {
        db::payment_item::insert_payment_item(
            &mut *tx,
            PaymentItemCreateRequest {
                payment_id: payment.id,
                pair_id: item.pair_id,
                subscription_id: sub.id,
                base_price_cents: item.base_price_cents,
                discount_rate: item.discount_rate,
                final_price_cents: item.final_price_cents,
            },
        )
        .await?;
    }

    tx.commit().await?;

    log::info!(
        "Invoice {} created for user {}: order {} ${:.2} in {}",
        invoice.id,
        principal.user_id,
        order_id,
        cents_to_usd(order.total_cents),
        order.network
    );

    Ok(CreateInvoiceResponse {
        invoice_url: invoice.invoice_url,
        invoice_id: invoice.id,
        order_id,
        payment_id: payment.id,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use crate::dtos::pay::PaymentItemInput;

    use super::*;

    fn pair(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn request(amount: f64, pairs: Vec<Uuid>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            amount: Some(amount),
            currency: Some("USD".to_string()),
            network: Some("usdttrc20".to_string()),
            order_data: Some(OrderData {
                pair_ids: pairs,
                period: Some("THREE_MONTHS".to_string()),
                ..Default::default()
            }),
        }
    }

    fn bad_request_message(res: Res<ValidatedOrder>) -> String {
        match res {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn amount_below_twenty_dollars_is_rejected() {
        let msg = bad_request_message(validate(&request(15.0, vec![pair(1)])));
        assert!(msg.starts_with("Minimum amount is $20 USD"), "{msg}");
    }

    #[test]
    fn exactly_twenty_dollars_is_accepted() {
        let order = validate(&request(20.0, vec![pair(1)])).unwrap();
        assert_eq!(order.total_cents, 2000);
        assert_eq!(order.currency, "usd");
        assert_eq!(order.period, Period::ThreeMonths);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut req = request(50.0, vec![pair(1)]);
        req.network = Some("  ".to_string());
        let msg = bad_request_message(validate(&req));
        assert!(msg.starts_with("Missing required fields"));

        let msg = bad_request_message(validate(&CreateInvoiceRequest::default()));
        assert!(msg.starts_with("Missing required fields"));
    }

    #[test]
    fn empty_pair_list_is_rejected() {
        let msg = bad_request_message(validate(&request(50.0, vec![])));
        assert!(msg.contains("pairIds"));
    }

    #[test]
    fn duplicate_pairs_collapse_into_one_line() {
        let order = validate(&request(60.0, vec![pair(1), pair(1), pair(2)])).unwrap();
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn even_split_puts_remainder_on_first_item() {
        let order = validate(&request(100.0, vec![pair(1), pair(2), pair(3)])).unwrap();
        let prices: Vec<i64> = order.items.iter().map(|i| i.final_price_cents).collect();
        assert_eq!(prices, vec![3334, 3333, 3333]);
        assert_eq!(prices.iter().sum::<i64>(), 10000);
    }

    #[test]
    fn precomputed_items_apply_discount() {
        let mut req = request(90.0, vec![pair(1), pair(2)]);
        if let Some(order) = req.order_data.as_mut() {
            order.payment_items = vec![
                PaymentItemInput {
                    pair_id: pair(1),
                    base_price: 50.0,
                    discount_rate: 10.0,
                    final_price: None,
                },
                PaymentItemInput {
                    pair_id: pair(2),
                    base_price: 50.0,
                    discount_rate: 10.0,
                    final_price: Some(45.0),
                },
            ];
        }
        let order = validate(&req).unwrap();
        assert_eq!(order.items[0].base_price_cents, 5000);
        assert_eq!(order.items[0].final_price_cents, 4500);
        assert_eq!(order.items[1].final_price_cents, 4500);
    }

    #[test]
    fn precomputed_items_must_match_amount_and_pairs() {
        let mut req = request(90.0, vec![pair(1)]);
        if let Some(order) = req.order_data.as_mut() {
            order.payment_items = vec![PaymentItemInput {
                pair_id: pair(1),
                base_price: 50.0,
                discount_rate: 0.0,
                final_price: None,
            }];
        }
        assert!(bad_request_message(validate(&req)).contains("does not match amount"));

        let mut req = request(50.0, vec![pair(1)]);
        if let Some(order) = req.order_data.as_mut() {
            order.payment_items = vec![PaymentItemInput {
                pair_id: pair(9),
                base_price: 50.0,
                discount_rate: 0.0,
                final_price: None,
            }];
        }
        assert!(bad_request_message(validate(&req)).contains("not part of the order"));
    }

    fn priced(amount: f64, prices: &[f64]) -> CreateInvoiceRequest {
        let pairs: Vec<Uuid> = (1..=prices.len() as u128).map(pair).collect();
        let mut req = request(amount, pairs.clone());
        if let Some(order) = req.order_data.as_mut() {
            order.payment_items = pairs
                .iter()
                .zip(prices)
                .map(|(pair_id, price)| PaymentItemInput {
                    pair_id: *pair_id,
                    base_price: *price,
                    discount_rate: 0.0,
                    final_price: None,
                })
                .collect();
        }
        req
    }

    #[test]
    fn negative_item_price_is_rejected() {
        let msg = bad_request_message(validate(&priced(20.0, &[80.0, -60.0])));
        assert!(msg.starts_with("Invalid price -60"), "{msg}");
    }

    #[test]
    fn huge_item_prices_are_rejected_without_overflow() {
        let msg = bad_request_message(validate(&priced(50.0, &[1e300, 1e300])));
        assert!(msg.starts_with("Invalid price"), "{msg}");

        let msg = bad_request_message(validate(&priced(50.0, &[f64::INFINITY, 25.0])));
        assert!(msg.starts_with("Invalid price"), "{msg}");
    }

    #[test]
    fn full_discount_leaves_nothing_to_charge() {
        let mut req = priced(50.0, &[50.0]);
        if let Some(order) = req.order_data.as_mut() {
            order.payment_items[0].discount_rate = 100.0;
        }
        assert!(bad_request_message(validate(&req)).starts_with("Invalid price"));
    }

    #[test]
    fn amount_above_cap_is_rejected() {
        let msg = bad_request_message(validate(&request(1e300, vec![pair(1)])));
        assert!(msg.starts_with("Maximum amount"), "{msg}");
    }

    #[test]
    fn gateway_request_points_back_at_this_service() {
        let order = validate(&request(49.99, vec![pair(1)])).unwrap();
        let req = build_gateway_request(&order, "AM-abc", "https://algomakers.ai");

        assert_eq!(req.price_amount, 49.99);
        assert_eq!(req.price_currency, "usd");
        assert_eq!(req.pay_currency, "usdttrc20");
        assert_eq!(req.order_id, "AM-abc");
        assert_eq!(req.ipn_callback_url, "https://algomakers.ai/api/payments/webhook");
        assert!(req.success_url.starts_with("https://algomakers.ai/dashboard"));
    }

    #[test]
    fn order_ids_are_unique_and_prefixed() {
        let a = generate_order_id();
        let b = generate_order_id();
        assert!(a.starts_with("AM-"));
        assert_eq!(a.len(), 35);
        assert_ne!(a, b);
    }
}
