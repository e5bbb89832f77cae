//! Column-name mapping from canonical fields to a concrete file layout.
//!
//! Every observed file variant carries the same eight fields under different
//! headers. Rather than one loader per variant, a `SchemaMapping` names the
//! source column for each canonical field.

use std::collections::HashSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::Field;
use crate::error::LoadError;

/// Built-in header layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPreset {
    /// `Date;Product type;Product line;Quantity;Sale price;Purchase cost;Ordering method;Country of sale`
    #[default]
    English,
    /// `Fecha;Tipo de producto;Línea de producto;Cantidad;Precio de venta;Costo de compra;Método de pedido;País de venta`
    Spanish,
}

impl SchemaPreset {
    pub fn mapping(self) -> SchemaMapping {
        match self {
            SchemaPreset::English => SchemaMapping::english(),
            SchemaPreset::Spanish => SchemaMapping::spanish(),
        }
    }
}

/// Source column name for each canonical field.
///
/// JSON form uses the canonical keys:
///
/// ```json
/// { "date": "Fecha", "product_type": "Tipo", "product_line": "Linea", "quantity": "Cant",
///   "sale_price": "Precio", "purchase_cost": "Costo", "ordering_method": "Metodo", "country": "Pais" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaMapping {
    pub date: String,
    pub product_type: String,
    pub product_line: String,
    pub quantity: String,
    pub sale_price: String,
    pub purchase_cost: String,
    pub ordering_method: String,
    pub country: String,
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self::english()
    }
}

impl SchemaMapping {
    pub fn english() -> Self {
        Self {
            date: "Date".to_string(),
            product_type: "Product type".to_string(),
            product_line: "Product line".to_string(),
            quantity: "Quantity".to_string(),
            sale_price: "Sale price".to_string(),
            purchase_cost: "Purchase cost".to_string(),
            ordering_method: "Ordering method".to_string(),
            country: "Country of sale".to_string(),
        }
    }

    pub fn spanish() -> Self {
        Self {
            date: "Fecha".to_string(),
            product_type: "Tipo de producto".to_string(),
            product_line: "Línea de producto".to_string(),
            quantity: "Cantidad".to_string(),
            sale_price: "Precio de venta".to_string(),
            purchase_cost: "Costo de compra".to_string(),
            ordering_method: "Método de pedido".to_string(),
            country: "País de venta".to_string(),
        }
    }

    /// Parse and validate a mapping from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        let mapping: SchemaMapping =
            serde_json::from_str(text).map_err(|e| LoadError::Mapping(e.to_string()))?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Source column name for a canonical field.
    pub fn column(&self, field: Field) -> &str {
        match field {
            Field::Date => &self.date,
            Field::ProductType => &self.product_type,
            Field::ProductLine => &self.product_line,
            Field::Quantity => &self.quantity,
            Field::SalePrice => &self.sale_price,
            Field::PurchaseCost => &self.purchase_cost,
            Field::OrderingMethod => &self.ordering_method,
            Field::Country => &self.country,
        }
    }

    /// Source column names in canonical field order.
    pub fn columns(&self) -> Vec<&str> {
        Field::ALL.iter().map(|&f| self.column(f)).collect()
    }

    /// Column names must be non-empty (after trimming) and distinct.
    pub fn validate(&self) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        for field in Field::ALL {
            let name = self.column(field).trim();
            if name.is_empty() {
                return Err(LoadError::Mapping(format!(
                    "column name for `{}` is empty",
                    field.key()
                )));
            }
            if !seen.insert(name) {
                return Err(LoadError::Mapping(format!(
                    "column '{name}' is mapped to more than one field"
                )));
            }
        }
        Ok(())
    }
}
