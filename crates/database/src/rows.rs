//! Row shapes as they come back from Postgres, and their mapping onto the
//! domain model.

use crate::error::DbError;
use chrono::{DateTime, Utc};
use core_types::{
    CommonFields, Form, FormDetails, FormType, FormView, PesticideApplication, PesticideDetails,
    ShrubDetails,
};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `forms` table.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct FormRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub form_type: FormType,
    pub first_name: String,
    pub last_name: String,
    pub street_number: String,
    pub street_name: String,
    pub town: String,
    pub zip_code: String,
    pub home_phone: String,
    pub other_phone: String,
    pub call_before: bool,
    pub is_holiday: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FormRow> for Form {
    fn from(row: FormRow) -> Self {
        Form {
            id: row.id,
            owner_id: row.owner_id,
            form_type: row.form_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
            common: CommonFields {
                first_name: row.first_name,
                last_name: row.last_name,
                street_number: row.street_number,
                street_name: row.street_name,
                town: row.town,
                zip_code: row.zip_code,
                home_phone: row.home_phone,
                other_phone: row.other_phone,
                call_before: row.call_before,
                is_holiday: row.is_holiday,
            },
        }
    }
}

/// `forms` left-joined with both detail tables. Only the columns of the
/// table matching `form_type` are expected to be non-null.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct FormViewRow {
    #[sqlx(flatten)]
    pub form: FormRow,
    pub flea_only: Option<bool>,
    pub num_shrubs: Option<i32>,
    pub lawn_area_sq_ft: Option<i32>,
    pub fert_only: Option<bool>,
}

impl FormViewRow {
    pub fn form_id(&self) -> Uuid {
        self.form.id
    }

    pub fn form_type(&self) -> FormType {
        self.form.form_type
    }

    /// Builds the view, attaching `applications` to a pesticide form.
    pub fn into_view(self, applications: Vec<PesticideApplication>) -> Result<FormView, DbError> {
        let form_id = self.form.id;
        let form_type = self.form.form_type;
        let missing =
            || DbError::Integrity(format!("form {form_id} is missing its {form_type} details"));

        let details = match form_type {
            FormType::Shrub => FormDetails::Shrub(ShrubDetails {
                flea_only: self.flea_only.ok_or_else(missing)?,
                num_shrubs: self.num_shrubs.ok_or_else(missing)?,
            }),
            FormType::Pesticide => FormDetails::Pesticide(PesticideDetails {
                lawn_area_sq_ft: self.lawn_area_sq_ft.ok_or_else(missing)?,
                fert_only: self.fert_only.ok_or_else(missing)?,
                applications,
            }),
        };

        FormView::new(self.form.into(), details).map_err(|e| DbError::Integrity(e.to_string()))
    }
}

/// A row from `pesticide_applications`.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ApplicationRow {
    pub id: Uuid,
    pub form_id: Uuid,
    pub chemical_id: i64,
    pub applied_at: DateTime<Utc>,
    pub rate: Decimal,
    pub amount_applied: Decimal,
    pub location_code: String,
}

impl From<ApplicationRow> for PesticideApplication {
    fn from(row: ApplicationRow) -> Self {
        PesticideApplication {
            id: row.id,
            chemical_id: row.chemical_id,
            applied_at: row.applied_at,
            rate: row.rate,
            amount_applied: row.amount_applied,
            location_code: row.location_code,
        }
    }
}
