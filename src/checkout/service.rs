use serde_json::{json, Map};
use tracing::{error, info, instrument};
use validator::Validate;

use super::{allocate_order_id, CheckoutError};
use crate::cart::{Cart, CartItem, CartStorage};
use crate::clients::OrderClient;
use crate::domain::{self, Order, OrderItem, PaymentMethod, Product, Session, ShippingAddress};
use crate::store::{Document, StoreClient};

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: Order,
}

impl PlacedOrder {
    pub fn order_id(&self) -> &str {
        &self.order.id
    }

    /// Where the customer is sent after placing the order.
    pub fn confirmation_path(&self) -> String {
        format!("/order-confirmation/{}", self.order.id)
    }
}

/// What the transaction needs from a cart line.
#[derive(Debug, Clone)]
struct Line {
    product_id: String,
    name: String,
    quantity: u32,
}

/// One line per product with the quantities summed, so each product's stock
/// is checked and decremented once against the full amount ordered.
fn lines_by_product(items: &[CartItem]) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::with_capacity(items.len());
    for item in items {
        match lines.iter_mut().find(|line| line.product_id == item.product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => lines.push(Line {
                product_id: item.product.id.clone(),
                name: item.product.name.clone(),
                quantity: item.quantity,
            }),
        }
    }
    lines
}

/// Places orders: validates the request, allocates an order id, then
/// decrements stock and writes the order in one optimistic transaction.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    store: StoreClient,
    orders: OrderClient,
    max_attempts: u32,
}

impl CheckoutService {
    pub fn new(store: StoreClient, orders: OrderClient, max_attempts: u32) -> Self {
        Self {
            store,
            orders,
            max_attempts,
        }
    }

    /// Place an order for everything in `cart`. On success the cart is
    /// cleared; on failure it is left exactly as it was.
    #[instrument(skip_all, fields(payment = %payment, lines = cart.items().len()))]
    pub async fn place_order<S: CartStorage>(
        &self,
        cart: &mut Cart<S>,
        shipping: ShippingAddress,
        payment: PaymentMethod,
        session: Option<&Session>,
    ) -> Result<PlacedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        shipping
            .validate()
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;

        let lines = lines_by_product(cart.items());
        let user_id = session.map(|session| session.uid.clone());

        let result = self.commit_order(&lines, user_id, shipping, payment).await;
        match result {
            Ok(order) => {
                info!(order_id = %order.id, total = %order.total_amount, "Order placed");
                cart.clear();
                Ok(PlacedOrder { order })
            }
            Err(e) => {
                error!(error = %e, "Checkout aborted");
                Err(e)
            }
        }
    }

    async fn commit_order(
        &self,
        lines: &[Line],
        user_id: Option<String>,
        shipping: ShippingAddress,
        payment: PaymentMethod,
    ) -> Result<Order, CheckoutError> {
        let orders = &self.orders;
        let order_id = allocate_order_id(|candidate| async move {
            orders.order_exists(&candidate).await
        })
        .await?;

        self.store
            .run_transaction(self.max_attempts, |mut tx| {
                let order_id = order_id.clone();
                let user_id = user_id.clone();
                let shipping = shipping.clone();
                async move {
                    let mut fresh: Vec<(Product, u32)> = Vec::with_capacity(lines.len());
                    for line in lines {
                        let product = tx
                            .get_as::<Product>(&line.product_id)
                            .await?
                            .ok_or_else(|| CheckoutError::ProductUnavailable(line.name.clone()))?;
                        if product.stock < line.quantity {
                            return Err(CheckoutError::InsufficientStock {
                                name: line.name.clone(),
                                available: product.stock,
                            });
                        }
                        fresh.push((product, line.quantity));
                    }

                    let now = domain::now();
                    let mut items = Vec::with_capacity(fresh.len());
                    for (product, quantity) in fresh {
                        let mut fields = Map::new();
                        fields.insert("stock".to_string(), json!(product.stock - quantity));
                        fields.insert("updatedAt".to_string(), json!(now.timestamp_millis()));
                        tx.update(product.path(), fields);

                        items.push(OrderItem {
                            product_id: product.id.clone(),
                            price: product.effective_price(),
                            name: product.name,
                            quantity,
                            image_url: product.image_url,
                        });
                    }

                    let order = Order::new(order_id, user_id, items, shipping, payment, now);
                    tx.create(&order)?;
                    Ok::<_, CheckoutError>((tx, order))
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn repeated_products_are_summed_into_one_line() {
        let tap = Product::new("p1", "Rain Shower", Decimal::new(100, 0), 5);
        let hose = Product::new("p2", "Garden Hose", Decimal::new(50, 0), 5);
        let items = vec![
            CartItem { product: tap.clone(), quantity: 3 },
            CartItem { product: hose, quantity: 1 },
            CartItem { product: tap, quantity: 3 },
        ];

        let lines = lines_by_product(&items);

        let summary: Vec<(&str, u32)> = lines
            .iter()
            .map(|line| (line.product_id.as_str(), line.quantity))
            .collect();
        assert_eq!(summary, vec![("p1", 6), ("p2", 1)]);
    }
}
