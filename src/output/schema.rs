//! Dataset record type and the fixed CSV column contract
//!
//! The column order and names are a compatibility contract with the
//! downstream bulk-import consumer. They must not be reordered or renamed
//! independently of that consumer.

use serde::{Deserialize, Serialize};

/// Constant product-type marker written into every row
pub const PRODUCT_TYPE: &str = "simple";

/// CSV header row, in contract order
pub const CSV_HEADERS: [&str; 16] = [
    "SKU",
    "Name",
    "Regular price",
    "Stock",
    "In stock?",
    "Images",
    "Categories",
    "Tags",
    "Short description",
    "Type",
    "Brand",
    "Grade",
    "Packaging",
    "Attribute 1 value(s)",
    "Attribute 2 value(s)",
    "Attribute 3 value(s)",
];

/// One catalog entry accepted into the dataset
///
/// The identifier is the sole dedup key and is immutable once assigned; a
/// record is appended to the sink at most once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Unique item identifier (SKU)
    pub id: String,

    /// Display name
    pub name: String,

    /// Price, absent when the page does not show one
    pub price: Option<f64>,

    /// Stock quantity; stock status is derived from it
    pub stock_quantity: u32,

    /// Resolved image reference (base URL + filename), absent when no
    /// candidate downloaded successfully
    pub image: Option<String>,

    /// Category labels, comma-joined in the CSV cell
    pub categories: Vec<String>,

    /// Tag labels, comma-joined in the CSV cell
    pub tags: Vec<String>,

    /// Short description text
    pub short_description: Option<String>,

    /// Brand attribute
    pub brand: Option<String>,

    /// Quality grade attribute
    pub grade: Option<String>,

    /// Packaging note
    pub packaging: Option<String>,

    /// Color attribute (Attribute 1)
    pub color: Option<String>,

    /// Model attribute (Attribute 2)
    pub model: Option<String>,

    /// Compatibility attribute (Attribute 3)
    pub compatibility: Option<String>,
}

impl ItemRecord {
    /// Derived stock status: in stock iff the quantity is positive
    pub fn stock_status(&self) -> &'static str {
        if self.stock_quantity > 0 {
            "instock"
        } else {
            "outofstock"
        }
    }

    /// Encodes the record as a CSV row in contract column order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.price.map(|p| format!("{:.2}", p)).unwrap_or_default(),
            self.stock_quantity.to_string(),
            self.stock_status().to_string(),
            self.image.clone().unwrap_or_default(),
            self.categories.join(", "),
            self.tags.join(", "),
            self.short_description.clone().unwrap_or_default(),
            PRODUCT_TYPE.to_string(),
            self.brand.clone().unwrap_or_default(),
            self.grade.clone().unwrap_or_default(),
            self.packaging.clone().unwrap_or_default(),
            self.color.clone().unwrap_or_default(),
            self.model.clone().unwrap_or_default(),
            self.compatibility.clone().unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn create_test_record(id: &str) -> ItemRecord {
        ItemRecord {
            id: id.to_string(),
            name: format!("Item {}", id),
            price: Some(12.5),
            stock_quantity: 3,
            image: Some("https://cdn.example.com/images/SKU-1.jpg".to_string()),
            categories: vec!["Parts".to_string()],
            tags: vec!["new".to_string(), "oem".to_string()],
            short_description: Some("A part".to_string()),
            brand: Some("Acme".to_string()),
            grade: Some("A".to_string()),
            packaging: None,
            color: Some("black".to_string()),
            model: Some("X100".to_string()),
            compatibility: Some("X100, X200".to_string()),
        }
    }

    #[test]
    fn test_stock_status_derivation() {
        let mut record = create_test_record("SKU-1");
        assert_eq!(record.stock_status(), "instock");

        record.stock_quantity = 0;
        assert_eq!(record.stock_status(), "outofstock");
    }

    #[test]
    fn test_row_matches_header_width() {
        let record = create_test_record("SKU-1");
        assert_eq!(record.to_row().len(), CSV_HEADERS.len());
    }

    #[test]
    fn test_row_contract_order() {
        let record = create_test_record("SKU-1");
        let row = record.to_row();

        assert_eq!(row[0], "SKU-1");
        assert_eq!(row[1], "Item SKU-1");
        assert_eq!(row[2], "12.50");
        assert_eq!(row[3], "3");
        assert_eq!(row[4], "instock");
        assert_eq!(row[7], "new, oem");
        assert_eq!(row[9], PRODUCT_TYPE);
        assert_eq!(row[10], "Acme");
        assert_eq!(row[12], ""); // absent packaging renders empty
        assert_eq!(row[13], "black");
    }

    #[test]
    fn test_absent_price_renders_empty() {
        let mut record = create_test_record("SKU-1");
        record.price = None;
        assert_eq!(record.to_row()[2], "");
    }
}
