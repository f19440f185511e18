//! Catalog data types as served by dummyjson.

use serde::{Deserialize, Serialize};

/// Page sizes offered to shoppers.
pub const ITEMS_PER_PAGE_OPTIONS: [u32; 3] = [10, 24, 48];

/// A product review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: f64,
    pub comment: String,
    pub date: String,
    pub reviewer_name: String,
    pub reviewer_email: String,
}

/// Package dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// A catalog product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub stock: u32,
    /// Some products have no brand.
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_order_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

impl Product {
    /// Price after the listed discount, rounded to cents.
    pub fn discounted_price(&self) -> f64 {
        let discounted = self.price * (1.0 - self.discount_percentage / 100.0);
        (discounted * 100.0).round() / 100.0
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// One page of products.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

/// Paging and filter parameters for a product listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductsParams {
    pub limit: u32,
    pub skip: u32,
    pub category: Option<String>,
}

impl Default for ProductsParams {
    fn default() -> Self {
        Self {
            limit: ITEMS_PER_PAGE_OPTIONS[0],
            skip: 0,
            category: None,
        }
    }
}

impl ProductsParams {
    pub fn new(limit: u32, skip: u32) -> Self {
        Self {
            limit,
            skip,
            category: None,
        }
    }

    /// Restricts the listing to `category`. A blank category means no filter.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = (!category.trim().is_empty()).then_some(category);
        self
    }

    /// Parameters for the given zero-based page.
    pub fn page(limit: u32, page: u32) -> Self {
        Self::new(limit, limit.saturating_mul(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_deserializes_minimal_and_full() {
        let minimal: Product = serde_json::from_value(json!({
            "id": 1,
            "title": "Essence Mascara",
            "price": 9.99
        }))
        .unwrap();
        assert_eq!(minimal.brand, "");
        assert!(minimal.reviews.is_none());

        let full: Product = serde_json::from_value(json!({
            "id": 2,
            "title": "Eyeshadow Palette",
            "description": "A palette",
            "price": 20.0,
            "discountPercentage": 10.0,
            "rating": 4.5,
            "stock": 3,
            "brand": "Glamour",
            "category": "beauty",
            "thumbnail": "t.png",
            "images": ["a.png"],
            "availabilityStatus": "In Stock",
            "minimumOrderQuantity": 2,
            "dimensions": {"width": 1.0, "height": 2.0, "depth": 3.0},
            "reviews": [{
                "rating": 5,
                "comment": "Great",
                "date": "2024-05-23T08:56:21.618Z",
                "reviewerName": "Ann",
                "reviewerEmail": "ann@example.com"
            }]
        }))
        .unwrap();
        assert_eq!(full.discounted_price(), 18.0);
        assert!(full.in_stock());
        assert_eq!(full.reviews.unwrap()[0].reviewer_name, "Ann");
        assert_eq!(full.dimensions.unwrap().depth, 3.0);
    }

    #[test]
    fn test_products_params() {
        assert_eq!(ProductsParams::default().limit, 10);
        assert_eq!(ProductsParams::page(24, 2).skip, 48);
        assert_eq!(
            ProductsParams::new(10, 0).with_category("  ").category,
            None
        );
        assert_eq!(
            ProductsParams::new(10, 0).with_category("smartphones").category.as_deref(),
            Some("smartphones")
        );
    }
}
