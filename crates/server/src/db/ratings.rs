use chrono::{DateTime, Utc};
use puzzle_core::{RatedParty, Rating, Variant};
use sqlx::PgConnection;

use crate::error::AppError;

/// Lock and read a user's rating for a variant. Users without a row get the
/// default rating with no last update.
pub async fn get_user_rating_for_update(
    conn: &mut PgConnection,
    user_id: i64,
    variant: Variant,
) -> Result<RatedParty, AppError> {
    let row: Option<(f64, f64, f64, Option<DateTime<Utc>>)> = sqlx::query_as(
        r#"SELECT value, deviation, volatility, updated_at
           FROM user_ratings WHERE user_id = $1 AND variant = $2
           FOR UPDATE"#,
    )
    .bind(user_id)
    .bind(variant.as_str())
    .fetch_optional(conn)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(match row {
        Some((value, deviation, volatility, updated_at)) => {
            RatedParty::new(Rating::new(value, deviation, volatility), updated_at)
        }
        None => RatedParty::new(Rating::default(), None),
    })
}

pub async fn upsert_user_rating(
    conn: &mut PgConnection,
    user_id: i64,
    variant: Variant,
    rating: &Rating,
    updated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO user_ratings (user_id, variant, value, deviation, volatility, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (user_id, variant) DO UPDATE SET
               value = EXCLUDED.value,
               deviation = EXCLUDED.deviation,
               volatility = EXCLUDED.volatility,
               updated_at = EXCLUDED.updated_at"#,
    )
    .bind(user_id)
    .bind(variant.as_str())
    .bind(rating.value)
    .bind(rating.deviation)
    .bind(rating.volatility)
    .bind(updated_at)
    .execute(conn)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}
