//! Medicine catalog models.

use serde::{Deserialize, Serialize};

/// CSV column order used by import, export and the template.
pub const CSV_COLUMNS: [&str; 5] = ["name", "formula", "dosage", "formulation", "stock"];

/// Dosage-form labels offered by the entry form. Formulation is stored as free text.
pub const KNOWN_FORMULATIONS: [&str; 8] = [
    "Tablet", "Capsule", "Syrup", "Injection", "Cream", "Ointment", "Drops", "Powder",
];

/// Highest stock count still reported as low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A single medicine in the pharmacy catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medicine {
    /// Store-assigned identifier, immutable after creation
    pub id: String,
    /// Brand or product name (required, trimmed)
    pub name: String,
    /// Active ingredient or chemical composition (e.g., "Paracetamol")
    #[serde(default)]
    pub formula: String,
    /// Strength or concentration (e.g., "500 mg", "120 mg/5ml")
    #[serde(default)]
    pub dosage: String,
    /// Dosage form (e.g., "Tablet", "Syrup")
    #[serde(default)]
    pub formulation: String,
    /// Units on hand
    #[serde(default)]
    pub stock: u32,
}

/// Fields of a medicine that has not been persisted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMedicine {
    pub name: String,
    #[serde(default)]
    pub formula: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub formulation: String,
    #[serde(default)]
    pub stock: u32,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub dosage: Option<String>,
    pub formulation: Option<String>,
    pub stock: Option<u32>,
}

/// A validation failure tied to one field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Stock band shown next to each medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    OutOfStock,
    Low,
    InStock,
}

impl StockStatus {
    pub fn from_stock(stock: u32) -> Self {
        match stock {
            0 => StockStatus::OutOfStock,
            s if s <= LOW_STOCK_THRESHOLD => StockStatus::Low,
            _ => StockStatus::InStock,
        }
    }
}

/// Read access to the text fields shared by stored and unsaved medicines.
pub trait MedicineFields {
    fn name(&self) -> &str;
    fn formula(&self) -> &str;
    fn dosage(&self) -> &str;
    fn formulation(&self) -> &str;
}

impl MedicineFields for Medicine {
    fn name(&self) -> &str {
        &self.name
    }
    fn formula(&self) -> &str {
        &self.formula
    }
    fn dosage(&self) -> &str {
        &self.dosage
    }
    fn formulation(&self) -> &str {
        &self.formulation
    }
}

impl MedicineFields for NewMedicine {
    fn name(&self) -> &str {
        &self.name
    }
    fn formula(&self) -> &str {
        &self.formula
    }
    fn dosage(&self) -> &str {
        &self.dosage
    }
    fn formulation(&self) -> &str {
        &self.formulation
    }
}

impl Medicine {
    /// Attach a store-assigned id to unsaved fields.
    pub fn from_new(id: String, fields: NewMedicine) -> Self {
        Self {
            id,
            name: fields.name,
            formula: fields.formula,
            dosage: fields.dosage,
            formulation: fields.formulation,
            stock: fields.stock,
        }
    }

    /// Copy of the editable fields.
    pub fn fields(&self) -> NewMedicine {
        NewMedicine {
            name: self.name.clone(),
            formula: self.formula.clone(),
            dosage: self.dosage.clone(),
            formulation: self.formulation.clone(),
            stock: self.stock,
        }
    }

    /// Apply a partial update in place. The id never changes.
    pub fn apply(&mut self, patch: &MedicinePatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(formula) = &patch.formula {
            self.formula = formula.trim().to_string();
        }
        if let Some(dosage) = &patch.dosage {
            self.dosage = dosage.trim().to_string();
        }
        if let Some(formulation) = &patch.formulation {
            self.formulation = formulation.trim().to_string();
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }
}

impl NewMedicine {
    /// Create unsaved fields with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Same fields with every text value trimmed.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            formula: self.formula.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            formulation: self.formulation.trim().to_string(),
            stock: self.stock,
        }
    }

    /// Check the entry-form rules. Stock is non-negative by type.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Medicine name is required"));
        }
        errors
    }
}

impl MedicinePatch {
    /// Patch that overwrites every field.
    pub fn replace_all(fields: NewMedicine) -> Self {
        Self {
            name: Some(fields.name),
            formula: Some(fields.formula),
            dosage: Some(fields.dosage),
            formulation: Some(fields.formulation),
            stock: Some(fields.stock),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.formula.is_none()
            && self.dosage.is_none()
            && self.formulation.is_none()
            && self.stock.is_none()
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            errors.push(FieldError::new("name", "Medicine name is required"));
        }
        errors
    }
}

/// Validate a bulk-add batch. Every row must pass; failures carry the 1-based row.
pub fn validate_batch(rows: Vec<NewMedicine>) -> Result<Vec<NewMedicine>, Vec<(usize, FieldError)>> {
    let errors: Vec<(usize, FieldError)> = rows
        .iter()
        .enumerate()
        .flat_map(|(index, row)| {
            row.validate()
                .into_iter()
                .map(move |error| (index + 1, error))
        })
        .collect();

    if errors.is_empty() {
        Ok(rows.into_iter().map(NewMedicine::normalized).collect())
    } else {
        Err(errors)
    }
}
