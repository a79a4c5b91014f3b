//! Write-side payloads: what a caller may send to create or change a form.

use crate::enums::FormType;
use crate::error::CoreError;
use crate::structs::{
    require_name, require_non_negative, CommonFields, NewApplication, NewPesticideDetails,
    ShrubDetails,
};
use serde::{Deserialize, Serialize};

/// A create call as it arrives from a handler: a discriminator plus two
/// optional detail payloads, exactly one of which must be present and match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFormRequest {
    pub form_type: FormType,
    pub common: CommonFields,
    #[serde(default)]
    pub shrub: Option<ShrubDetails>,
    #[serde(default)]
    pub pesticide: Option<NewPesticideDetails>,
}

impl CreateFormRequest {
    pub fn shrub(common: CommonFields, details: ShrubDetails) -> Self {
        Self { form_type: FormType::Shrub, common, shrub: Some(details), pesticide: None }
    }

    pub fn pesticide(common: CommonFields, details: NewPesticideDetails) -> Self {
        Self { form_type: FormType::Pesticide, common, shrub: None, pesticide: Some(details) }
    }

    /// Checks the request and narrows it to a [`NewForm`] that cannot carry
    /// contradictory payloads.
    pub fn validate(self) -> Result<NewForm, CoreError> {
        let details = match (self.shrub, self.pesticide) {
            (Some(_), Some(_)) => {
                return Err(CoreError::validation(
                    "a form carries either shrub or pesticide details, not both",
                ));
            }
            (None, None) => {
                return Err(CoreError::validation("form details are required"));
            }
            (Some(shrub), None) => NewFormDetails::Shrub(shrub),
            (None, Some(pesticide)) => NewFormDetails::Pesticide(pesticide),
        };

        if details.form_type() != self.form_type {
            return Err(CoreError::validation(format!(
                "{} details supplied for a {} form",
                details.form_type(),
                self.form_type
            )));
        }

        self.common.validate()?;
        details.validate()?;

        Ok(NewForm { common: self.common, details })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewFormDetails {
    Shrub(ShrubDetails),
    Pesticide(NewPesticideDetails),
}

impl NewFormDetails {
    pub fn form_type(&self) -> FormType {
        match self {
            NewFormDetails::Shrub(_) => FormType::Shrub,
            NewFormDetails::Pesticide(_) => FormType::Pesticide,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        match self {
            NewFormDetails::Shrub(details) => details.validate(),
            NewFormDetails::Pesticide(details) => details.validate(),
        }
    }
}

/// A validated create payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    pub common: CommonFields,
    pub details: NewFormDetails,
}

impl NewForm {
    pub fn form_type(&self) -> FormType {
        self.details.form_type()
    }
}

/// Partial update of the common fields. `None` leaves a column untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommonFieldsPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub town: Option<String>,
    pub zip_code: Option<String>,
    pub home_phone: Option<String>,
    pub other_phone: Option<String>,
    pub call_before: Option<bool>,
    pub is_holiday: Option<bool>,
}

impl CommonFieldsPatch {
    fn validate(&self) -> Result<(), CoreError> {
        if let Some(first_name) = &self.first_name {
            require_name("first_name", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            require_name("last_name", last_name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShrubPatch {
    pub flea_only: Option<bool>,
    pub num_shrubs: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PesticidePatch {
    pub lawn_area_sq_ft: Option<i32>,
    pub fert_only: Option<bool>,
    /// When present, replaces every application line on the form.
    pub applications: Option<Vec<NewApplication>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum DetailsPatch {
    Shrub(ShrubPatch),
    Pesticide(PesticidePatch),
}

impl DetailsPatch {
    pub fn form_type(&self) -> FormType {
        match self {
            DetailsPatch::Shrub(_) => FormType::Shrub,
            DetailsPatch::Pesticide(_) => FormType::Pesticide,
        }
    }
}

/// Everything a caller may change on an existing form.
///
/// There is deliberately no discriminator, owner or timestamp here; payloads
/// naming one are refused when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormUpdate {
    pub common: CommonFieldsPatch,
    pub details: Option<DetailsPatch>,
}

impl FormUpdate {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.common.validate()?;
        match &self.details {
            Some(DetailsPatch::Shrub(patch)) => {
                if let Some(count) = patch.num_shrubs {
                    require_non_negative("num_shrubs", count)?;
                }
            }
            Some(DetailsPatch::Pesticide(patch)) => {
                if let Some(area) = patch.lawn_area_sq_ft {
                    require_non_negative("lawn_area_sq_ft", area)?;
                }
                if let Some(applications) = &patch.applications {
                    applications.iter().try_for_each(NewApplication::validate)?;
                }
            }
            None => {}
        }
        Ok(())
    }
}
