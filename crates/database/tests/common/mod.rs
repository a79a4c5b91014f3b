//! Shared fixtures for the repository integration tests.
//!
//! The tests need a disposable Postgres database named by
//! `TEST_DATABASE_URL` (a `.env` file is honoured). When it is not set the
//! tests print a notice and return early. Every test creates its own users,
//! so tests can share one database and run in parallel.

#![allow(dead_code)]

use chrono::Utc;
use configuration::DatabaseSettings;
use core_types::{
    Caller, CommonFields, CreateFormRequest, NewApplication, NewPesticideDetails, ShrubDetails,
};
use database::{connect, run_migrations, FormsRepository};
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

pub struct TestDb {
    pub pool: PgPool,
    pub repo: FormsRepository,
}

/// Connects and migrates, or returns `None` when no test database is configured.
pub async fn test_db() -> Option<TestDb> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping database test: TEST_DATABASE_URL is not set");
        return None;
    };

    let settings = DatabaseSettings {
        url,
        max_connections: 4,
        min_connections: 0,
        ..Default::default()
    };
    let pool = connect(&settings).await.expect("connect to test database");
    run_migrations(&pool).await.expect("apply migrations");

    Some(TestDb {
        repo: FormsRepository::new(pool.clone()),
        pool,
    })
}

impl TestDb {
    /// Inserts an approved user with the given role and returns its caller triple.
    async fn insert_user(&self, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email, role, approval) VALUES ($1, $2, $3, 'approved')")
            .bind(id)
            .bind(format!("{id}@example.test"))
            .bind(role)
            .execute(&self.pool)
            .await
            .expect("insert user");
        id
    }

    pub async fn employee(&self) -> Caller {
        Caller::employee(self.insert_user("employee").await)
    }

    pub async fn admin(&self) -> Caller {
        Caller::admin(self.insert_user("admin").await)
    }

    pub async fn chemical(&self) -> i64 {
        sqlx::query_scalar("INSERT INTO chemicals (brand_name) VALUES ($1) RETURNING id")
            .bind("Turf Builder")
            .fetch_one(&self.pool)
            .await
            .expect("insert chemical")
    }

    pub async fn count_forms(&self, owner: &Caller) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM forms WHERE owner_id = $1")
            .bind(owner.user_id)
            .fetch_one(&self.pool)
            .await
            .expect("count forms")
    }

    pub async fn count_rows(&self, table: &str, form_id: Uuid) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE form_id = $1");
        sqlx::query_scalar(&sql)
            .bind(form_id)
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }
}

pub fn common(first_name: &str, last_name: &str) -> CommonFields {
    CommonFields {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        street_number: "14".to_string(),
        street_name: "Maple Ave".to_string(),
        town: "Exeter".to_string(),
        zip_code: "03833".to_string(),
        home_phone: "603-555-0101".to_string(),
        other_phone: String::new(),
        call_before: true,
        is_holiday: false,
    }
}

pub fn shrub_request(first_name: &str, last_name: &str, num_shrubs: i32) -> CreateFormRequest {
    CreateFormRequest::shrub(
        common(first_name, last_name),
        ShrubDetails { flea_only: false, num_shrubs },
    )
}

pub fn application(chemical_id: i64, location_code: &str) -> NewApplication {
    NewApplication {
        chemical_id,
        applied_at: Utc::now(),
        rate: dec!(2.5),
        amount_applied: dec!(1.25),
        location_code: location_code.to_string(),
    }
}

pub fn pesticide_request(
    first_name: &str,
    last_name: &str,
    applications: Vec<NewApplication>,
) -> CreateFormRequest {
    CreateFormRequest::pesticide(
        common(first_name, last_name),
        NewPesticideDetails {
            lawn_area_sq_ft: 8000,
            fert_only: false,
            applications,
        },
    )
}
