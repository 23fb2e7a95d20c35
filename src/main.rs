mod admin;
mod app_system;
mod auth;
mod cart;
mod catalog;
mod checkout;
mod clients;
mod config;
mod domain;
mod error;
mod storage;
mod store;

#[cfg(test)]
mod mock_framework;

use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use crate::admin::AdminConsole;
use crate::app_system::{setup_tracing, StoreSystem};
use crate::cart::{Cart, FileCartStorage};
use crate::catalog::{CatalogFilter, SortOrder};
use crate::config::StoreConfig;
use crate::domain::{OrderStatus, PaymentMethod, ProductDraft, Role, ShippingAddress};

fn seed_draft(name: &str, price: i64, stock: u32, category_id: &str, featured: bool) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        name_si: None,
        description: format!("{name} from the demo catalog"),
        description_si: None,
        price: Decimal::new(price, 0),
        discount_price: None,
        stock,
        image_url: String::new(),
        additional_image_urls: Vec::new(),
        image_hint: name.to_lowercase(),
        category_id: category_id.to_string(),
        featured,
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = StoreConfig::load().map_err(|e| e.to_string())?;
    setup_tracing(&config.log_filter);

    info!("Starting storefront");

    let system = StoreSystem::new(&config);

    // Bootstrap an admin account and seed the catalog
    let span = tracing::info_span!("admin_bootstrap");
    let console = async {
        let session = system
            .auth
            .sign_up("admin@storefront.local", "change-me-now")
            .await
            .map_err(|e| e.to_string())?;
        system
            .user_client
            .set_role(&session.uid, Role::Admin)
            .await
            .map_err(|e| e.to_string())?;
        let session = system
            .auth
            .refresh_session(&session)
            .await
            .map_err(|e| e.to_string())?;

        let console = AdminConsole::open(Some(&session), &system).map_err(|e| e.to_string())?;
        let taps = console.create_category("Taps").await.map_err(|e| e.to_string())?;
        for (name, price, stock, featured) in [
            ("Basin Mixer", 12_500, 5, true),
            ("Garden Tap", 1_800, 20, false),
        ] {
            console
                .create_product(seed_draft(name, price, stock, &taps.id, featured))
                .await
                .map_err(|e| e.to_string())?;
        }

        console
            .update_category(&taps.id, "Taps & Mixers")
            .await
            .map_err(|e| e.to_string())?;
        let placeholder = console.create_category("Clearance").await.map_err(|e| e.to_string())?;
        console
            .delete_category(&placeholder.id)
            .await
            .map_err(|e| e.to_string())?;

        let overview = console.stock_overview().await.map_err(|e| e.to_string())?;
        info!(total = overview.total_products, low = overview.low_stock.len(), "Catalog seeded");

        let staff = system
            .auth
            .sign_up("staff@storefront.local", "staff-pass")
            .await
            .map_err(|e| e.to_string())?;
        console
            .change_role(&staff.uid, Role::Admin)
            .await
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(console)
    }
    .instrument(span)
    .await?;

    let _categories = system
        .category_client
        .subscribe_categories(|categories| info!(count = categories.len(), "Categories changed"))
        .await
        .map_err(|e| e.to_string())?;
    let _stock = console
        .watch_stock(|overview| {
            info!(
                total = overview.total_products,
                low = overview.low_stock.len(),
                out = overview.out_of_stock.len(),
                "Stock overview"
            )
        })
        .await
        .map_err(|e| e.to_string())?;

    let _featured = system
        .product_client
        .subscribe_featured(|products| info!(count = products.len(), "Featured products changed"))
        .await
        .map_err(|e| e.to_string())?;
    let featured = system
        .product_client
        .featured_products()
        .await
        .map_err(|e| e.to_string())?;
    info!(count = featured.len(), "Featured products loaded");

    let products = system
        .product_client
        .list_products()
        .await
        .map_err(|e| e.to_string())?;
    let filter = CatalogFilter {
        locale: config.locale,
        sort: SortOrder::PriceLowToHigh,
        ..CatalogFilter::default()
    };
    for product in catalog::browse(&products, &filter) {
        info!(
            product_id = %product.id,
            name = %product.localized_name(filter.locale),
            description = %product.localized_description(filter.locale),
            price = %product.effective_price(),
            discounted = product.is_discounted(),
            stock = product.stock,
            "Catalog entry"
        );
    }

    // A customer fills a cart and checks out
    let span = tracing::info_span!("customer_checkout");
    let placed = async {
        system
            .auth
            .sign_up("customer@example.com", "customer-pass")
            .await
            .map_err(|e| e.to_string())?;
        system
            .auth
            .request_password_reset("customer@example.com")
            .await
            .map_err(|e| e.to_string())?;
        let session = system
            .auth
            .sign_in("customer@example.com", "customer-pass")
            .await
            .map_err(|e| e.to_string())?;
        let _orders = system
            .order_client
            .subscribe_user_orders(&session.uid, |orders| info!(count = orders.len(), "My orders changed"))
            .await
            .map_err(|e| e.to_string())?;

        let mut cart = Cart::load(FileCartStorage::new(&config.cart_path));
        info!(path = %cart.storage().path().display(), "Cart storage ready");
        for product in &products {
            match cart.add_to_cart(product, 2) {
                Ok(notice) => info!(notice = %notice, "Cart updated"),
                Err(e) => error!(error = %e, "Add to cart rejected"),
            }
        }
        if let Some(first) = products.first() {
            if let Err(e) = cart.update_quantity(&first.id, 1) {
                error!(error = %e, "Quantity update rejected");
            }
        }
        if let Some(last) = products.get(1) {
            info!(notice = %cart.remove_from_cart(&last.id), "Cart updated");
        }
        info!(items = cart.cart_count(), subtotal = %cart.subtotal(), "Cart ready");

        let shipping = ShippingAddress {
            name: "Demo Customer".to_string(),
            email: session.email.clone(),
            phone: "0771234567".to_string(),
            address_line1: "42 Galle Road".to_string(),
            address_line2: None,
            city: "Colombo".to_string(),
            postal_code: "00300".to_string(),
        };
        let placed = system
            .checkout
            .place_order(&mut cart, shipping, PaymentMethod::CashOnDelivery, Some(&session))
            .await
            .map_err(|e| e.to_string())?;

        let history = system
            .order_client
            .orders_for_user(&session.uid)
            .await
            .map_err(|e| e.to_string())?;
        let detail = system
            .order_client
            .order_for_user(placed.order_id(), &session.uid)
            .await
            .map_err(|e| e.to_string())?;
        info!(
            orders = history.len(),
            items = detail.item_count(),
            status = %detail.status,
            "Order history loaded"
        );
        Ok::<_, String>((session, placed))
    }
    .instrument(span)
    .await;

    match placed {
        Ok((session, placed)) => {
            info!(order_id = %placed.order_id(), redirect = %placed.confirmation_path(), "Order placed successfully");
            let watch = console
                .watch_order(placed.order_id(), |order| {
                    if let Some(order) = order {
                        info!(order_id = %order.id, status = %order.status, "Order changed");
                    }
                })
                .await
                .map_err(|e| e.to_string())?;
            info!(listener_id = watch.id(), "Watching order");
            let _tracking = system
                .order_client
                .subscribe_user_order(placed.order_id(), &session.uid, |order| match order {
                    Ok(order) => info!(status = %order.status, "Your order was updated"),
                    Err(e) => error!(error = %e, "Order tracking unavailable"),
                })
                .await
                .map_err(|e| e.to_string())?;

            match console.update_order_status(placed.order_id(), OrderStatus::Shipped).await {
                Ok(_) => info!(order_id = %placed.order_id(), "Order shipped"),
                Err(e) => error!(error = %e, "Order status update failed"),
            }
            if let Err(e) = watch.unsubscribe().await {
                error!(error = %e, "Failed to stop order watch");
            }
        }
        Err(e) => error!(error = %e, "Order processing failed"),
    }

    match console.list_users().await {
        Ok(users) => info!(count = users.len(), "Registered users"),
        Err(e) => error!(error = %e, "Failed to list users"),
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
