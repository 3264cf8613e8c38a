//! Property definition models
//!
//! Three typed property kinds exist: boolean, numeric and string. A
//! definition carries the name shown to users plus kind-specific constraints.

use serde::{Deserialize, Serialize};

use super::{Entity, serde_helpers};

/// Common view over the three property definition kinds.
pub trait PropertyDefinition: Entity {
    /// Kind-specific constraints copied into hydrated values
    type Constraints: Clone + std::fmt::Debug + PartialEq + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn constraints(&self) -> Self::Constraints;
}

// ============================================================================
// Boolean
// ============================================================================

/// Boolean property entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanProperty {
    pub id: String,
    pub name: String,
}

/// Create boolean property payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooleanProperty {
    pub name: String,
}

/// Update boolean property payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBooleanProperty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Boolean properties carry no constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanConstraints {}

impl Entity for BooleanProperty {
    fn id(&self) -> &str {
        &self.id
    }
}

impl PropertyDefinition for BooleanProperty {
    type Constraints = BooleanConstraints;

    fn name(&self) -> &str {
        &self.name
    }

    fn constraints(&self) -> Self::Constraints {
        BooleanConstraints {}
    }
}

// ============================================================================
// Numeric
// ============================================================================

/// Numeric property entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericProperty {
    pub id: String,
    pub name: String,
    /// Lower bound (null = unbounded)
    pub min_value: Option<f64>,
    /// Upper bound (null = unbounded)
    pub max_value: Option<f64>,
}

/// Create numeric property payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNumericProperty {
    pub name: String,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

/// Update numeric property payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchNumericProperty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some(None)` clears the bound
    #[serde(
        default,
        deserialize_with = "serde_helpers::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_value: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "serde_helpers::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_value: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericConstraints {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl Entity for NumericProperty {
    fn id(&self) -> &str {
        &self.id
    }
}

impl PropertyDefinition for NumericProperty {
    type Constraints = NumericConstraints;

    fn name(&self) -> &str {
        &self.name
    }

    fn constraints(&self) -> Self::Constraints {
        NumericConstraints {
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}

// ============================================================================
// String
// ============================================================================

/// String property entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringProperty {
    pub id: String,
    pub name: String,
    /// Closed value set (null = free text)
    pub allowed_values: Option<Vec<String>>,
}

/// Create string property payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStringProperty {
    pub name: String,
    pub allowed_values: Option<Vec<String>>,
}

/// Update string property payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchStringProperty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some(None)` turns the property into free text
    #[serde(
        default,
        deserialize_with = "serde_helpers::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_values: Option<Option<Vec<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringConstraints {
    pub allowed_values: Option<Vec<String>>,
}

impl Entity for StringProperty {
    fn id(&self) -> &str {
        &self.id
    }
}

impl PropertyDefinition for StringProperty {
    type Constraints = StringConstraints;

    fn name(&self) -> &str {
        &self.name
    }

    fn constraints(&self) -> Self::Constraints {
        StringConstraints {
            allowed_values: self.allowed_values.clone(),
        }
    }
}
