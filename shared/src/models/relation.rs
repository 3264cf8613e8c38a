//! Product variant property relation models
//!
//! A relation binds one product variant to one property definition with a
//! concrete value. The value type follows the property kind.

use serde::{Deserialize, Serialize};

use super::Entity;

/// Product variant relation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantRelation<T> {
    pub id: String,
    pub product_variant_id: String,
    pub property_id: String,
    pub value: T,
}

/// Create relation payload (a draft until the server assigns an id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductVariantRelation<T> {
    pub product_variant_id: String,
    pub property_id: String,
    pub value: T,
}

/// Update relation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchProductVariantRelation<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
}

impl<T> Default for PatchProductVariantRelation<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Entity for ProductVariantRelation<T> {
    fn id(&self) -> &str {
        &self.id
    }
}

pub type ProductVariantBooleanProperty = ProductVariantRelation<bool>;
pub type ProductVariantNumericProperty = ProductVariantRelation<f64>;
pub type ProductVariantStringProperty = ProductVariantRelation<String>;

pub type CreateProductVariantBooleanProperty = CreateProductVariantRelation<bool>;
pub type CreateProductVariantNumericProperty = CreateProductVariantRelation<f64>;
pub type CreateProductVariantStringProperty = CreateProductVariantRelation<String>;

pub type PatchProductVariantBooleanProperty = PatchProductVariantRelation<bool>;
pub type PatchProductVariantNumericProperty = PatchProductVariantRelation<f64>;
pub type PatchProductVariantStringProperty = PatchProductVariantRelation<String>;
