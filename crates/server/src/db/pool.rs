use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Users (authentication, roles, solved history)
CREATE TABLE IF NOT EXISTS users (
    id             BIGSERIAL PRIMARY KEY,
    username       TEXT UNIQUE NOT NULL,
    email          TEXT UNIQUE NOT NULL,
    password_hash  TEXT NOT NULL,
    role           TEXT NOT NULL DEFAULT 'none',
    solved_puzzles BIGINT[] NOT NULL DEFAULT '{}',
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_users_email_lower
    ON users (LOWER(email));
CREATE INDEX IF NOT EXISTS idx_users_username_lower
    ON users (LOWER(username));

-- Per-variant puzzle ratings
CREATE TABLE IF NOT EXISTS user_ratings (
    user_id    BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    variant    TEXT NOT NULL,
    value      DOUBLE PRECISION NOT NULL,
    deviation  DOUBLE PRECISION NOT NULL,
    volatility DOUBLE PRECISION NOT NULL,
    updated_at TIMESTAMPTZ,
    PRIMARY KEY (user_id, variant)
);

-- Published puzzles (IDs come from the counters table)
CREATE TABLE IF NOT EXISTS puzzles (
    id                BIGINT PRIMARY KEY,
    variant           TEXT NOT NULL,
    initial_fen       TEXT NOT NULL,
    solutions         TEXT[] NOT NULL,
    rating_value      DOUBLE PRECISION NOT NULL DEFAULT 1500,
    rating_deviation  DOUBLE PRECISION NOT NULL DEFAULT 350,
    rating_volatility DOUBLE PRECISION NOT NULL DEFAULT 0.06,
    rating_updated_at TIMESTAMPTZ,
    author            BIGINT NOT NULL REFERENCES users(id),
    reviewers         BIGINT[] NOT NULL DEFAULT '{}',
    in_review         BOOLEAN NOT NULL DEFAULT TRUE,
    approved          BOOLEAN NOT NULL DEFAULT FALSE,
    explanation       TEXT NOT NULL DEFAULT '',
    date_submitted    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_puzzles_variant_approved
    ON puzzles (variant, approved);

-- Named sequences
CREATE TABLE IF NOT EXISTS counters (
    name  TEXT PRIMARY KEY,
    value BIGINT NOT NULL
);

-- Rated attempts
CREATE TABLE IF NOT EXISTS puzzle_attempts (
    id                 BIGSERIAL PRIMARY KEY,
    user_id            BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    puzzle_id          BIGINT NOT NULL REFERENCES puzzles(id) ON DELETE CASCADE,
    started_at         TIMESTAMPTZ NOT NULL,
    ended_at           TIMESTAMPTZ NOT NULL,
    success            BOOLEAN NOT NULL,
    user_rating_before DOUBLE PRECISION NOT NULL,
    user_rating_after  DOUBLE PRECISION NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_puzzle_attempts_user_id
    ON puzzle_attempts (user_id);

-- Puzzle comments (threaded, soft-deleted)
CREATE TABLE IF NOT EXISTS comments (
    id          BIGSERIAL PRIMARY KEY,
    author      BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    puzzle_id   BIGINT NOT NULL REFERENCES puzzles(id) ON DELETE CASCADE,
    parent_id   BIGINT REFERENCES comments(id),
    body        TEXT NOT NULL,
    deleted     BOOLEAN NOT NULL DEFAULT FALSE,
    date_posted TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_comments_puzzle_id
    ON comments (puzzle_id);
"#;
