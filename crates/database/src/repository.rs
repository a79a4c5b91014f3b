use crate::error::DbError;
use crate::rows::{ApplicationRow, FormRow, FormViewRow};
use core_types::{
    AdminAccess, Caller, CreateFormRequest, DetailsPatch, Form, FormType, FormUpdate, FormView,
    ListQuery, NewApplication, NewForm, NewFormDetails, PesticideApplication, SortField,
};
use sqlx::postgres::{PgConnection, PgPool, Postgres};
use sqlx::{QueryBuilder, Transaction};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Deadline applied to each operation when none is configured.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Base form columns joined with both detail tables. Callers append the
/// predicate and ordering.
const VIEW_SELECT: &str = r#"
    SELECT
        f.id, f.owner_id, f.form_type, f.first_name, f.last_name, f.street_number,
        f.street_name, f.town, f.zip_code, f.home_phone, f.other_phone, f.call_before,
        f.is_holiday, f.created_at, f.updated_at,
        sd.flea_only, sd.num_shrubs,
        pd.lawn_area_sq_ft, pd.fert_only
    FROM forms AS f
    LEFT JOIN shrub_details AS sd ON sd.form_id = f.id
    LEFT JOIN pesticide_details AS pd ON pd.form_id = f.id
"#;

/// The `FormsRepository` is the only component that reads or writes the
/// form tables.
///
/// Every owned-row statement carries `owner_id = <caller>` in its own
/// predicate, so a form that belongs to someone else behaves exactly like one
/// that does not exist. Multi-statement operations run in one transaction;
/// an error rolls it back explicitly, and a dropped future (cancellation or
/// deadline) drops the transaction, which rolls it back as well.
#[derive(Debug, Clone)]
pub struct FormsRepository {
    pool: PgPool,
    operation_timeout: Duration,
}

impl FormsRepository {
    /// Creates a new `FormsRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_OPERATION_TIMEOUT)
    }

    pub fn with_timeout(pool: PgPool, operation_timeout: Duration) -> Self {
        Self { pool, operation_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips a trivial query through the pool.
    pub async fn health_check(&self) -> Result<(), DbError> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    /// Creates a form and its matching detail row in one transaction.
    ///
    /// The request is validated before any statement runs; a request with
    /// both or neither detail payloads never reaches the database.
    pub async fn create_form(
        &self,
        caller: &Caller,
        request: CreateFormRequest,
    ) -> Result<Form, DbError> {
        let owner_id = caller.owner_scope()?;
        let new_form = request.validate()?;

        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            let result = insert_form(&mut tx, owner_id, &new_form).await;
            let form = finish(tx, result).await?;

            tracing::debug!(
                form_id = %form.id,
                owner_id = %owner_id,
                form_type = %form.form_type,
                "Created form"
            );
            Ok(form)
        })
        .await
    }

    /// Fetches one form with its details, scoped to the caller.
    pub async fn get_form_view(&self, caller: &Caller, form_id: Uuid) -> Result<FormView, DbError> {
        let owner_id = caller.owner_scope()?;

        self.bounded(async {
            let mut tx = begin_snapshot(&self.pool).await?;
            let result = fetch_view(&mut tx, owner_id, form_id).await;
            finish(tx, result).await
        })
        .await
    }

    /// Applies a partial update to the caller's form.
    ///
    /// The ownership predicate lives in the `UPDATE` itself. Detail changes
    /// must target the form's existing type; `updated_at` moves on every
    /// successful call.
    pub async fn update_form(
        &self,
        caller: &Caller,
        form_id: Uuid,
        update: FormUpdate,
    ) -> Result<Form, DbError> {
        let owner_id = caller.owner_scope()?;
        update.validate()?;

        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            let result = apply_update(&mut tx, owner_id, form_id, &update).await;
            let form = finish(tx, result).await?;

            tracing::debug!(form_id = %form.id, owner_id = %owner_id, "Updated form");
            Ok(form)
        })
        .await
    }

    /// Deletes the caller's form. Detail rows and application lines go with
    /// it through the cascading foreign keys.
    pub async fn delete_form(&self, caller: &Caller, form_id: Uuid) -> Result<(), DbError> {
        let owner_id = caller.owner_scope()?;

        self.bounded(async {
            let result = sqlx::query("DELETE FROM forms WHERE id = $1 AND owner_id = $2")
                .bind(form_id)
                .bind(owner_id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFoundOrUnauthorized);
            }

            tracing::debug!(form_id = %form_id, owner_id = %owner_id, "Deleted form");
            Ok(())
        })
        .await
    }

    /// Lists the caller's forms. There is no way to widen the scope here.
    pub async fn list_forms_by_owner(
        &self,
        caller: &Caller,
        query: &ListQuery,
    ) -> Result<Vec<FormView>, DbError> {
        let owner_id = caller.owner_scope()?;
        self.bounded(self.list_views(Some(owner_id), query)).await
    }

    /// Lists every form in the system.
    ///
    /// The `AdminAccess` token can only be obtained by passing the admin gate,
    /// so no ownership filter is applied.
    pub async fn list_all_forms(
        &self,
        access: &AdminAccess,
        query: &ListQuery,
    ) -> Result<Vec<FormView>, DbError> {
        tracing::debug!(admin_id = %access.admin_id(), "Listing all forms");
        self.bounded(self.list_views(None, query)).await
    }

    async fn list_views(
        &self,
        owner_id: Option<Uuid>,
        query: &ListQuery,
    ) -> Result<Vec<FormView>, DbError> {
        let mut tx = begin_snapshot(&self.pool).await?;
        let result = fetch_views(&mut tx, owner_id, query).await;
        finish(tx, result).await
    }

    /// Runs `operation` under the configured deadline.
    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, DbError> {
        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| DbError::TimedOut(self.operation_timeout))?
    }
}

// ==============================================================================
// Transaction helpers
// ==============================================================================

/// Commits on success, rolls back on failure, and hands back the result.
async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, DbError>,
) -> Result<T, DbError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                // The connection is discarded by the pool; the original error matters more.
                tracing::debug!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// A read-only transaction whose statements all see one snapshot, so a
/// form and its application lines are read consistently.
async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

// ==============================================================================
// Writes
// ==============================================================================

async fn insert_form(
    conn: &mut PgConnection,
    owner_id: Uuid,
    new_form: &NewForm,
) -> Result<Form, DbError> {
    let form_id = Uuid::new_v4();
    let common = &new_form.common;

    let row = sqlx::query_as::<_, FormRow>(
        r#"
        INSERT INTO forms (
            id, owner_id, form_type, first_name, last_name, street_number, street_name,
            town, zip_code, home_phone, other_phone, call_before, is_holiday
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(form_id)
    .bind(owner_id)
    .bind(new_form.form_type())
    .bind(&common.first_name)
    .bind(&common.last_name)
    .bind(&common.street_number)
    .bind(&common.street_name)
    .bind(&common.town)
    .bind(&common.zip_code)
    .bind(&common.home_phone)
    .bind(&common.other_phone)
    .bind(common.call_before)
    .bind(common.is_holiday)
    .fetch_one(&mut *conn)
    .await?;

    match &new_form.details {
        NewFormDetails::Shrub(details) => {
            sqlx::query(
                "INSERT INTO shrub_details (form_id, flea_only, num_shrubs) VALUES ($1, $2, $3)",
            )
            .bind(form_id)
            .bind(details.flea_only)
            .bind(details.num_shrubs)
            .execute(&mut *conn)
            .await?;
        }
        NewFormDetails::Pesticide(details) => {
            sqlx::query(
                r#"
                INSERT INTO pesticide_details (form_id, lawn_area_sq_ft, fert_only)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(form_id)
            .bind(details.lawn_area_sq_ft)
            .bind(details.fert_only)
            .execute(&mut *conn)
            .await?;

            insert_applications(conn, form_id, &details.applications).await?;
        }
    }

    Ok(row.into())
}

async fn insert_applications(
    conn: &mut PgConnection,
    form_id: Uuid,
    applications: &[NewApplication],
) -> Result<(), DbError> {
    for application in applications {
        sqlx::query(
            r#"
            INSERT INTO pesticide_applications (
                id, form_id, chemical_id, applied_at, rate, amount_applied, location_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(form_id)
        .bind(application.chemical_id)
        .bind(application.applied_at)
        .bind(application.rate)
        .bind(application.amount_applied)
        .bind(application.location_code.trim())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn apply_update(
    conn: &mut PgConnection,
    owner_id: Uuid,
    form_id: Uuid,
    update: &FormUpdate,
) -> Result<Form, DbError> {
    let common = &update.common;

    // The base row is always touched so the trigger refreshes `updated_at`,
    // and so the ownership predicate gates detail changes too.
    let row = sqlx::query_as::<_, FormRow>(
        r#"
        UPDATE forms SET
            first_name    = COALESCE($3, first_name),
            last_name     = COALESCE($4, last_name),
            street_number = COALESCE($5, street_number),
            street_name   = COALESCE($6, street_name),
            town          = COALESCE($7, town),
            zip_code      = COALESCE($8, zip_code),
            home_phone    = COALESCE($9, home_phone),
            other_phone   = COALESCE($10, other_phone),
            call_before   = COALESCE($11, call_before),
            is_holiday    = COALESCE($12, is_holiday)
        WHERE id = $1 AND owner_id = $2
        RETURNING *
        "#,
    )
    .bind(form_id)
    .bind(owner_id)
    .bind(common.first_name.as_deref())
    .bind(common.last_name.as_deref())
    .bind(common.street_number.as_deref())
    .bind(common.street_name.as_deref())
    .bind(common.town.as_deref())
    .bind(common.zip_code.as_deref())
    .bind(common.home_phone.as_deref())
    .bind(common.other_phone.as_deref())
    .bind(common.call_before)
    .bind(common.is_holiday)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFoundOrUnauthorized)?;

    let form: Form = row.into();

    let Some(patch) = &update.details else {
        return Ok(form);
    };

    if patch.form_type() != form.form_type {
        return Err(DbError::Validation(format!(
            "{} details cannot be applied to a {} form",
            patch.form_type(),
            form.form_type
        )));
    }

    match patch {
        DetailsPatch::Shrub(shrub) => {
            let result = sqlx::query(
                r#"
                UPDATE shrub_details SET
                    flea_only  = COALESCE($2, flea_only),
                    num_shrubs = COALESCE($3, num_shrubs)
                WHERE form_id = $1
                "#,
            )
            .bind(form.id)
            .bind(shrub.flea_only)
            .bind(shrub.num_shrubs)
            .execute(&mut *conn)
            .await?;
            require_detail_row(&form, result.rows_affected())?;
        }
        DetailsPatch::Pesticide(pesticide) => {
            let result = sqlx::query(
                r#"
                UPDATE pesticide_details SET
                    lawn_area_sq_ft = COALESCE($2, lawn_area_sq_ft),
                    fert_only       = COALESCE($3, fert_only)
                WHERE form_id = $1
                "#,
            )
            .bind(form.id)
            .bind(pesticide.lawn_area_sq_ft)
            .bind(pesticide.fert_only)
            .execute(&mut *conn)
            .await?;
            require_detail_row(&form, result.rows_affected())?;

            if let Some(applications) = &pesticide.applications {
                sqlx::query("DELETE FROM pesticide_applications WHERE form_id = $1")
                    .bind(form.id)
                    .execute(&mut *conn)
                    .await?;
                insert_applications(conn, form.id, applications).await?;
            }
        }
    }

    Ok(form)
}

/// Every form owns exactly one detail row; a detail update touching any
/// other number of rows means the stored data is broken.
fn require_detail_row(form: &Form, rows_affected: u64) -> Result<(), DbError> {
    if rows_affected == 1 {
        return Ok(());
    }
    Err(DbError::Integrity(format!(
        "form {} has {rows_affected} {} detail rows",
        form.id, form.form_type
    )))
}

// ==============================================================================
// Reads
// ==============================================================================

async fn fetch_view(
    conn: &mut PgConnection,
    owner_id: Uuid,
    form_id: Uuid,
) -> Result<FormView, DbError> {
    let sql = format!("{VIEW_SELECT} WHERE f.id = $1 AND f.owner_id = $2");
    let row = sqlx::query_as::<_, FormViewRow>(&sql)
        .bind(form_id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::NotFoundOrUnauthorized)?;

    let applications = match row.form_type() {
        FormType::Pesticide => fetch_applications(conn, &[row.form_id()])
            .await?
            .remove(&row.form_id())
            .unwrap_or_default(),
        FormType::Shrub => Vec::new(),
    };

    row.into_view(applications)
}

async fn fetch_views(
    conn: &mut PgConnection,
    owner_id: Option<Uuid>,
    query: &ListQuery,
) -> Result<Vec<FormView>, DbError> {
    let mut builder = QueryBuilder::<Postgres>::new(VIEW_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(owner_id) = owner_id {
        builder.push(" AND f.owner_id = ").push_bind(owner_id);
    }
    if let Some(form_type) = query.form_type {
        builder.push(" AND f.form_type = ").push_bind(form_type);
    }
    if let Some(pattern) = query.search_pattern() {
        builder
            .push(" AND (f.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR f.last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    builder.push(" ORDER BY ").push(order_clause(query));

    let rows: Vec<FormViewRow> = builder.build_query_as().fetch_all(&mut *conn).await?;

    let pesticide_ids: Vec<Uuid> = rows
        .iter()
        .filter(|row| row.form_type() == FormType::Pesticide)
        .map(FormViewRow::form_id)
        .collect();
    let mut applications = fetch_applications(conn, &pesticide_ids).await?;

    // A corrupted row is reported and left out rather than failing the listing.
    let views = rows
        .into_iter()
        .filter_map(|row| {
            let form_id = row.form_id();
            let lines = applications.remove(&form_id).unwrap_or_default();
            match row.into_view(lines) {
                Ok(view) => Some(view),
                Err(err) => {
                    tracing::warn!(form_id = %form_id, error = %err, "Skipping inconsistent form");
                    None
                }
            }
        })
        .collect();
    Ok(views)
}

/// Loads application lines for the given forms, grouped by form id.
async fn fetch_applications(
    conn: &mut PgConnection,
    form_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<PesticideApplication>>, DbError> {
    let mut grouped: HashMap<Uuid, Vec<PesticideApplication>> = HashMap::new();
    if form_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query_as::<_, ApplicationRow>(
        r#"
        SELECT id, form_id, chemical_id, applied_at, rate, amount_applied, location_code
        FROM pesticide_applications
        WHERE form_id = ANY($1)
        ORDER BY applied_at ASC, id ASC
        "#,
    )
    .bind(form_ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in rows {
        grouped.entry(row.form_id).or_default().push(row.into());
    }
    Ok(grouped)
}

/// The `ORDER BY` body for a listing. Only allow-listed columns can appear;
/// name sorts ignore case and every ordering ends on unique keys so pages
/// are stable.
fn order_clause(query: &ListQuery) -> String {
    let direction = query.order.as_sql();
    match query.sort_by {
        SortField::FirstName => format!(
            "lower(f.first_name) {direction}, f.created_at {direction}, f.id {direction}"
        ),
        SortField::LastName => format!(
            "lower(f.last_name) {direction}, f.created_at {direction}, f.id {direction}"
        ),
        SortField::CreatedAt => format!("f.created_at {direction}, f.id {direction}"),
    }
}
