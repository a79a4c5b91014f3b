//! Resolves the acting user for CLI commands.
//!
//! In the service this triple arrives from the authentication layer. The
//! operator CLI looks it up in the `users` table instead.

use anyhow::{bail, Context};
use core_types::{ApprovalState, Caller, Role};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserRow {
    role: String,
    approval: String,
}

pub async fn resolve_caller(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Caller> {
    let row: Option<UserRow> = sqlx::query_as("SELECT role, approval FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up user")?;

    let Some(row) = row else {
        bail!("no user with id {user_id}");
    };

    Ok(Caller::new(user_id, parse_role(&row.role)?, parse_approval(&row.approval)?))
}

fn parse_role(value: &str) -> anyhow::Result<Role> {
    match value {
        "employee" => Ok(Role::Employee),
        "admin" => Ok(Role::Admin),
        other => bail!("unknown role '{other}'"),
    }
}

fn parse_approval(value: &str) -> anyhow::Result<ApprovalState> {
    match value {
        "pending" => Ok(ApprovalState::Pending),
        "approved" => Ok(ApprovalState::Approved),
        other => bail!("unknown approval state '{other}'"),
    }
}
