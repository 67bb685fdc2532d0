use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::pending_account::PendingAccountCreateRequest, models::pending_account::PendingAccount,
};

/// Inserts a pending account unless an unconfirmed one already holds the
/// same email key. Returns `None` when the insert was skipped.
pub async fn insert_pending_account_if_absent<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &PendingAccountCreateRequest,
) -> Res<Option<PendingAccount>> {
    sqlx::query_as::<_, PendingAccount>(
        r#"
        INSERT INTO pending_accounts (id, email, email_key, first_name, last_name, postal_code)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email_key) WHERE NOT confirmed DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(data.email.as_str())
    .bind(data.email.canonical())
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.postal_code)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_oldest_unconfirmed_by_email_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email_key: &str,
) -> Res<Option<PendingAccount>> {
    sqlx::query_as::<_, PendingAccount>(
        r#"
        SELECT * FROM pending_accounts
        WHERE email_key = $1 AND NOT confirmed
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(email_key)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_pending_account_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
) -> Res<Option<PendingAccount>> {
    sqlx::query_as::<_, PendingAccount>("SELECT * FROM pending_accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Flips `confirmed` to true. Returns `None` when the row is missing or
/// was already confirmed.
pub async fn confirm_pending_account<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
) -> Res<Option<PendingAccount>> {
    sqlx::query_as::<_, PendingAccount>(
        r#"
        UPDATE pending_accounts
        SET confirmed = TRUE, confirmed_at = now()
        WHERE id = $1 AND NOT confirmed
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
