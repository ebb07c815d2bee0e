use sqlx::{PgConnection, PgPool};

use crate::error::AppError;

/// Privilege levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    None,
    PuzzleReviewer,
    PuzzleEditor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::None => "none",
            Role::PuzzleReviewer => "puzzle_reviewer",
            Role::PuzzleEditor => "puzzle_editor",
            Role::Admin => "admin",
        }
    }

    /// Unknown role names get no privileges.
    pub fn from_db(value: &str) -> Self {
        match value {
            "puzzle_reviewer" => Role::PuzzleReviewer,
            "puzzle_editor" => Role::PuzzleEditor,
            "admin" => Role::Admin,
            _ => Role::None,
        }
    }

    /// Puzzles by reviewers skip the review queue.
    pub fn can_review(self) -> bool {
        self >= Role::PuzzleReviewer
    }

    pub fn can_moderate_comments(self) -> bool {
        self >= Role::PuzzleEditor
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"INSERT INTO users (username, email, password_hash)
           VALUES ($1, $2, $3)
           RETURNING id, username, email, password_hash, role, created_at"#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)
}

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, role, created_at FROM users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Sqlx)
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(row.0)
}

pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, AppError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(row.0)
}

pub async fn get_username(pool: &PgPool, id: i64) -> Result<Option<String>, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Sqlx)?;
    Ok(row.map(|r| r.0))
}

pub async fn solved_puzzle_ids(pool: &PgPool, user_id: i64) -> Result<Vec<i64>, AppError> {
    let row: Option<(Vec<i64>,)> = sqlx::query_as("SELECT solved_puzzles FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Sqlx)?;
    Ok(row.map(|r| r.0).unwrap_or_default())
}

/// Add a puzzle to the user's solved list unless it is already there.
pub async fn add_solved_puzzle(
    conn: &mut PgConnection,
    user_id: i64,
    puzzle_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE users SET solved_puzzles = array_append(solved_puzzles, $2)
           WHERE id = $1 AND NOT ($2 = ANY(solved_puzzles))"#,
    )
    .bind(user_id)
    .bind(puzzle_id)
    .execute(conn)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}
