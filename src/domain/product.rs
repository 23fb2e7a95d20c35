use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::store::Document;

/// Display language for catalog text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Locale {
    #[default]
    English,
    Sinhala,
}

/// Represents a product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_si: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_si: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    pub image_url: String,
    #[serde(default)]
    pub additional_image_urls: Vec<String>,
    #[serde(default)]
    pub image_hint: String,
    /// Units available for sale.
    pub stock: u32,
    pub category_id: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Product {
    /// Creates a product with the mandatory fields set and everything else empty.
    ///
    /// # Arguments
    /// * `id` - Document id
    /// * `name` - Display name
    /// * `price` - List price
    /// * `stock` - Units available
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal, stock: u32) -> Self {
        let now = super::now();
        Self {
            id: id.into(),
            name: name.into(),
            name_si: None,
            description: String::new(),
            description_si: None,
            price,
            discount_price: None,
            image_url: String::new(),
            additional_image_urls: Vec::new(),
            image_hint: String::new(),
            stock,
            category_id: String::new(),
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Price the customer pays: the discount price when one is set and
    /// positive, the list price otherwise.
    pub fn effective_price(&self) -> Decimal {
        match self.discount_price {
            Some(discount) if discount > Decimal::ZERO => discount,
            _ => self.price,
        }
    }

    pub fn is_discounted(&self) -> bool {
        self.effective_price() < self.price
    }

    pub fn localized_name(&self, locale: Locale) -> &str {
        localized(&self.name, self.name_si.as_deref(), locale)
    }

    pub fn localized_description(&self, locale: Locale) -> &str {
        localized(&self.description, self.description_si.as_deref(), locale)
    }

    /// Every image URL the product references, primary first.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.image_url.as_str())
            .chain(self.additional_image_urls.iter().map(String::as_str))
            .filter(|url| !url.is_empty())
    }
}

fn localized<'a>(default: &'a str, sinhala: Option<&'a str>, locale: Locale) -> &'a str {
    match (locale, sinhala) {
        (Locale::Sinhala, Some(text)) if !text.trim().is_empty() => text,
        _ => default,
    }
}

/// Admin form payload for creating or editing a product.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub name_si: Option<String>,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub description_si: Option<String>,
    #[validate(custom(function = non_negative))]
    pub price: Decimal,
    #[validate(custom(function = non_negative))]
    pub discount_price: Option<Decimal>,
    pub stock: u32,
    pub image_url: String,
    pub additional_image_urls: Vec<String>,
    #[validate(length(min = 1, message = "Image hint is required"))]
    pub image_hint: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category_id: String,
    pub featured: bool,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.message = Some("Must be 0 or more.".into());
        return Err(error);
    }
    Ok(())
}

impl ProductDraft {
    /// Materialize the draft as a new product stamped with `now`.
    pub fn into_product(self, id: String, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            name_si: self.name_si.filter(|s| !s.is_empty()),
            description: self.description,
            description_si: self.description_si.filter(|s| !s.is_empty()),
            price: self.price,
            discount_price: self.discount_price.filter(|d| *d > Decimal::ZERO),
            image_url: self.image_url,
            additional_image_urls: self.additional_image_urls,
            image_hint: self.image_hint,
            stock: self.stock,
            category_id: self.category_id,
            featured: self.featured,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Basin Mixer".to_string(),
            name_si: Some(String::new()),
            description: "Chrome basin mixer".to_string(),
            description_si: None,
            price: Decimal::new(12_500, 0),
            discount_price: Some(Decimal::ZERO),
            stock: 4,
            image_url: "/media/products/1_mixer.png".to_string(),
            additional_image_urls: Vec::new(),
            image_hint: "basin mixer".to_string(),
            category_id: "taps".to_string(),
            featured: true,
        }
    }

    #[test]
    fn effective_price_prefers_positive_discount() {
        let mut product = Product::new("p1", "Shower Head", Decimal::new(5000, 0), 3);
        assert_eq!(product.effective_price(), Decimal::new(5000, 0));

        product.discount_price = Some(Decimal::ZERO);
        assert_eq!(product.effective_price(), Decimal::new(5000, 0));

        product.discount_price = Some(Decimal::new(4250, 0));
        assert_eq!(product.effective_price(), Decimal::new(4250, 0));
        assert!(product.is_discounted());
    }

    #[test]
    fn localized_text_falls_back_to_default() {
        let mut product = Product::new("p1", "Shower Head", Decimal::ONE, 1);
        assert_eq!(product.localized_name(Locale::Sinhala), "Shower Head");

        product.name_si = Some("ෂවර් හිස".to_string());
        assert_eq!(product.localized_name(Locale::Sinhala), "ෂවර් හිස");
        assert_eq!(product.localized_name(Locale::English), "Shower Head");

        product.description = "Wide rain head".to_string();
        product.description_si = Some("   ".to_string());
        assert_eq!(product.localized_description(Locale::Sinhala), "Wide rain head");
        product.description_si = Some("පළල් ෂවර් හිස".to_string());
        assert_eq!(product.localized_description(Locale::Sinhala), "පළල් ෂවර් හිස");
    }

    #[test]
    fn draft_validation_rejects_negative_price() {
        let mut invalid = draft();
        invalid.price = Decimal::new(-1, 0);
        invalid.name.clear();

        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("name"));
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn draft_drops_zero_discount_and_empty_translations() {
        let product = draft().into_product("p1".to_string(), Utc::now());

        assert_eq!(product.discount_price, None);
        assert_eq!(product.name_si, None);
        assert_eq!(product.created_at, product.updated_at);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let product = Product::new("p1", "Shower Head", Decimal::ONE, 1);
        let value = serde_json::to_value(&product).unwrap();

        assert!(value.get("categoryId").is_some());
        assert!(value.get("createdAt").unwrap().is_i64());
        assert!(value.get("nameSi").is_none());
    }
}
