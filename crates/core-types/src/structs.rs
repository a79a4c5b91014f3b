use crate::enums::FormType;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest site code a pesticide application line may carry.
pub const MAX_LOCATION_CODE_LEN: usize = 16;

/// Descriptive fields shared by every form type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommonFields {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub street_number: String,
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub home_phone: String,
    #[serde(default)]
    pub other_phone: String,
    /// The client wants a phone call before the crew arrives.
    #[serde(default)]
    pub call_before: bool,
    /// The job is scheduled on a holiday.
    #[serde(default)]
    pub is_holiday: bool,
}

impl CommonFields {
    pub fn validate(&self) -> Result<(), CoreError> {
        require_name("first_name", &self.first_name)?;
        require_name("last_name", &self.last_name)
    }
}

/// The base form row. `updated_at` is maintained by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub form_type: FormType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShrubDetails {
    pub flea_only: bool,
    pub num_shrubs: i32,
}

impl ShrubDetails {
    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_negative("num_shrubs", self.num_shrubs)
    }
}

/// One chemical applied during a lawn treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PesticideApplication {
    pub id: Uuid,
    pub chemical_id: i64,
    pub applied_at: DateTime<Utc>,
    pub rate: Decimal,
    pub amount_applied: Decimal,
    pub location_code: String,
}

/// A line item supplied by the caller; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub chemical_id: i64,
    pub applied_at: DateTime<Utc>,
    pub rate: Decimal,
    pub amount_applied: Decimal,
    pub location_code: String,
}

impl NewApplication {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.chemical_id <= 0 {
            return Err(CoreError::validation("chemical_id must be positive"));
        }
        if self.rate < Decimal::ZERO {
            return Err(CoreError::validation("rate must not be negative"));
        }
        if self.amount_applied < Decimal::ZERO {
            return Err(CoreError::validation("amount_applied must not be negative"));
        }
        let code = self.location_code.trim();
        if code.is_empty() || code.chars().count() > MAX_LOCATION_CODE_LEN {
            return Err(CoreError::validation(format!(
                "location_code must be 1 to {MAX_LOCATION_CODE_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PesticideDetails {
    pub lawn_area_sq_ft: i32,
    pub fert_only: bool,
    pub applications: Vec<PesticideApplication>,
}

/// Pesticide details as supplied on create.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewPesticideDetails {
    pub lawn_area_sq_ft: i32,
    #[serde(default)]
    pub fert_only: bool,
    #[serde(default)]
    pub applications: Vec<NewApplication>,
}

impl NewPesticideDetails {
    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_negative("lawn_area_sq_ft", self.lawn_area_sq_ft)?;
        self.applications.iter().try_for_each(NewApplication::validate)
    }
}

/// The type-specific half of a [`FormView`]. Exactly one variant is ever
/// populated, and it always agrees with the form's discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FormDetails {
    Shrub(ShrubDetails),
    Pesticide(PesticideDetails),
}

impl FormDetails {
    pub fn form_type(&self) -> FormType {
        match self {
            FormDetails::Shrub(_) => FormType::Shrub,
            FormDetails::Pesticide(_) => FormType::Pesticide,
        }
    }

    pub fn shrub(&self) -> Option<&ShrubDetails> {
        match self {
            FormDetails::Shrub(details) => Some(details),
            FormDetails::Pesticide(_) => None,
        }
    }

    pub fn pesticide(&self) -> Option<&PesticideDetails> {
        match self {
            FormDetails::Pesticide(details) => Some(details),
            FormDetails::Shrub(_) => None,
        }
    }
}

/// Read-side projection: a base form joined with its matching details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormView {
    pub form: Form,
    pub details: FormDetails,
}

impl FormView {
    /// Pairs a form with its details, refusing a pair whose types disagree.
    pub fn new(form: Form, details: FormDetails) -> Result<Self, CoreError> {
        if form.form_type != details.form_type() {
            return Err(CoreError::validation(format!(
                "{} details cannot belong to a {} form",
                details.form_type(),
                form.form_type
            )));
        }
        Ok(Self { form, details })
    }

    pub fn form_type(&self) -> FormType {
        self.form.form_type
    }

    pub fn shrub(&self) -> Option<&ShrubDetails> {
        self.details.shrub()
    }

    pub fn pesticide(&self) -> Option<&PesticideDetails> {
        self.details.pesticide()
    }
}

pub(crate) fn require_name(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: i32) -> Result<(), CoreError> {
    if value < 0 {
        return Err(CoreError::validation(format!("{field} must not be negative")));
    }
    Ok(())
}
