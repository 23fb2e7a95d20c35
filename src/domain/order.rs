use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::Document;

/// Lifecycle of an order. Serialized with the exact labels shown to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Pending Payment")]
    PendingPayment,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "Pending Payment",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Cash on Delivery")]
    CashOnDelivery,
}

impl PaymentMethod {
    /// Status a freshly placed order starts in.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            PaymentMethod::BankTransfer => OrderStatus::PendingPayment,
            PaymentMethod::CashOnDelivery => OrderStatus::Processing,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::BankTransfer => f.write_str("Bank Transfer"),
            PaymentMethod::CashOnDelivery => f.write_str("Cash on Delivery"),
        }
    }
}

/// Delivery details collected at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits."))]
    pub phone: String,
    #[validate(length(min = 5, message = "Address is too short."))]
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[validate(length(min = 2, message = "City is too short."))]
    pub city: String,
    #[validate(length(min = 4, message = "Postal code is too short."))]
    pub postal_code: String,
}

/// A purchased line, frozen at the moment the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    /// Unit price charged.
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Represents a customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Order {
    /// Builds a new order; the total and initial status are derived from the
    /// items and payment method.
    pub fn new(
        id: impl Into<String>,
        user_id: Option<String>,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        Self {
            id: id.into(),
            user_id,
            items,
            total_amount,
            status: payment_method.initial_status(),
            shipping_address,
            payment_method,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
pub(crate) fn sample_address() -> ShippingAddress {
    ShippingAddress {
        name: "Nimal Perera".to_string(),
        email: "nimal@example.com".to_string(),
        phone: "0771234567".to_string(),
        address_line1: "12 Temple Road".to_string(),
        address_line2: None,
        city: "Kandy".to_string(),
        postal_code: "20000".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: format!("p{price}"),
            name: "Tap".to_string(),
            price: Decimal::new(price, 0),
            quantity,
            image_url: String::new(),
        }
    }

    #[test]
    fn status_uses_display_labels_on_the_wire() {
        assert_eq!(
            serde_json::to_value(OrderStatus::PendingPayment).unwrap(),
            "Pending Payment"
        );
        assert_eq!(
            serde_json::from_value::<PaymentMethod>("Cash on Delivery".into()).unwrap(),
            PaymentMethod::CashOnDelivery
        );
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
    }

    #[test]
    fn new_order_sums_lines_and_picks_status() {
        let order = Order::new(
            "AB12345",
            None,
            vec![item(100, 2), item(50, 1)],
            sample_address(),
            PaymentMethod::BankTransfer,
            Utc::now(),
        );

        assert_eq!(order.total_amount, Decimal::new(250, 0));
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn shipping_address_rules() {
        assert!(sample_address().validate().is_ok());

        let mut address = sample_address();
        address.email = "not-an-email".to_string();
        address.phone = "12345".to_string();
        address.postal_code = "1".to_string();

        let errors = address.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("postal_code"));
        assert!(!fields.contains_key("city"));
    }
}
