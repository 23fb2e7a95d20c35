//! Storefront browsing over an already-fetched product list.

use crate::domain::{Locale, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// `None` shows every category.
    pub category_id: Option<String>,
    /// Search matches the name shown in this language.
    pub locale: Locale,
    pub search: String,
    pub sort: SortOrder,
}

/// Apply category filter, name search and ordering. Prices compare by effective price.
pub fn browse<'a>(products: &'a [Product], filter: &CatalogFilter) -> Vec<&'a Product> {
    let needle = filter.search.trim().to_lowercase();

    let mut visible: Vec<&Product> = products
        .iter()
        .filter(|product| match &filter.category_id {
            Some(category) => &product.category_id == category,
            None => true,
        })
        .filter(|product| {
            needle.is_empty()
                || product
                    .localized_name(filter.locale)
                    .to_lowercase()
                    .contains(&needle)
        })
        .collect();

    match filter.sort {
        SortOrder::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::PriceLowToHigh => {
            visible.sort_by(|a, b| a.effective_price().cmp(&b.effective_price()))
        }
        SortOrder::PriceHighToLow => {
            visible.sort_by(|a, b| b.effective_price().cmp(&a.effective_price()))
        }
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn catalog() -> Vec<Product> {
        let now = Utc::now();
        let mut mixer = Product::new("p1", "Basin Mixer", Decimal::new(9000, 0), 3);
        mixer.category_id = "taps".to_string();
        mixer.created_at = now - Duration::days(2);

        let mut shower = Product::new("p2", "Rain Shower", Decimal::new(12000, 0), 3);
        shower.category_id = "showers".to_string();
        shower.discount_price = Some(Decimal::new(7000, 0));
        shower.created_at = now - Duration::days(1);

        let mut tap = Product::new("p3", "Garden Tap", Decimal::new(1500, 0), 3);
        tap.category_id = "taps".to_string();
        tap.created_at = now;

        vec![mixer, shower, tap]
    }

    fn ids(products: Vec<&Product>) -> Vec<&str> {
        products.into_iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn default_filter_lists_newest_first() {
        let products = catalog();
        assert_eq!(ids(browse(&products, &CatalogFilter::default())), ["p3", "p2", "p1"]);
    }

    #[test]
    fn price_sort_uses_discounted_price() {
        let products = catalog();
        let filter = CatalogFilter {
            sort: SortOrder::PriceHighToLow,
            ..Default::default()
        };

        assert_eq!(ids(browse(&products, &filter)), ["p1", "p2", "p3"]);
    }

    #[test]
    fn category_and_search_combine() {
        let products = catalog();
        let filter = CatalogFilter {
            category_id: Some("taps".to_string()),
            search: "  MIXER ".to_string(),
            sort: SortOrder::PriceLowToHigh,
            ..Default::default()
        };

        assert_eq!(ids(browse(&products, &filter)), ["p1"]);
    }

    #[test]
    fn search_matches_localized_name() {
        let mut products = catalog();
        products[1].name_si = Some("වැසි ෂවර්".to_string());
        let filter = CatalogFilter {
            locale: Locale::Sinhala,
            search: "ෂවර්".to_string(),
            ..Default::default()
        };

        assert_eq!(ids(browse(&products, &filter)), ["p2"]);

        let english = CatalogFilter {
            locale: Locale::English,
            ..filter
        };
        assert!(browse(&products, &english).is_empty());
    }
}
