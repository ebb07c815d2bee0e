use std::collections::HashMap;

use chrono::{DateTime, Utc};
use puzzle_core::puzzle::escape_html;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use crate::error::AppError;

/// A comment on a puzzle page. Replies point at their parent through
/// `parent_id`. Deleting only hides a comment so its replies keep a place in
/// the thread.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub author: i64,
    pub author_username: String,
    pub body_unsafe: String,
    pub parent_id: Option<i64>,
    pub puzzle_id: i64,
    pub deleted: bool,
    pub date_posted: DateTime<Utc>,
}

impl Comment {
    pub fn body_safe(&self) -> String {
        escape_html(&self.body_unsafe)
    }

    pub fn to_json(&self, depth: usize) -> JsonValue {
        if self.deleted {
            return json!({
                "id": self.id,
                "parentId": self.parent_id,
                "depth": depth,
                "deleted": true,
                "author": null,
                "body": null,
                "datePosted": self.date_posted.to_rfc3339(),
            });
        }
        json!({
            "id": self.id,
            "parentId": self.parent_id,
            "depth": depth,
            "deleted": false,
            "author": self.author_username,
            "body": self.body_safe(),
            "datePosted": self.date_posted.to_rfc3339(),
        })
    }
}

/// Order comments for display: each top-level comment followed by its
/// replies, depth first, siblings oldest first. Replies whose parent is not
/// in `comments` are shown at the top level.
pub fn thread_comments(comments: &[Comment]) -> Vec<(usize, &Comment)> {
    let mut sorted: Vec<&Comment> = comments.iter().collect();
    sorted.sort_by_key(|c| (c.date_posted, c.id));

    let known: Vec<i64> = sorted.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<i64>, Vec<&Comment>> = HashMap::new();
    for comment in sorted {
        let parent = comment.parent_id.filter(|p| known.contains(p));
        children.entry(parent).or_default().push(comment);
    }

    let mut ordered = Vec::with_capacity(comments.len());
    let mut stack: Vec<(usize, &Comment)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|c| (0, *c)).collect())
        .unwrap_or_default();
    while let Some((depth, comment)) = stack.pop() {
        ordered.push((depth, comment));
        if let Some(replies) = children.get(&Some(comment.id)) {
            stack.extend(replies.iter().rev().map(|c| (depth + 1, *c)));
        }
    }
    ordered
}

const COMMENT_QUERY: &str = r#"SELECT
    c.id,
    c.author,
    u.username AS author_username,
    c.body AS body_unsafe,
    c.parent_id,
    c.puzzle_id,
    c.deleted,
    c.date_posted
FROM comments c
JOIN users u ON c.author = u.id"#;

pub async fn get_comments_for_puzzle(
    pool: &PgPool,
    puzzle_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let query = format!("{COMMENT_QUERY} WHERE c.puzzle_id = $1 ORDER BY c.date_posted, c.id");
    sqlx::query_as::<_, Comment>(&query)
        .bind(puzzle_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Sqlx)
}

pub async fn get_comment(pool: &PgPool, id: i64) -> Result<Option<Comment>, AppError> {
    let query = format!("{COMMENT_QUERY} WHERE c.id = $1");
    sqlx::query_as::<_, Comment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Sqlx)
}

pub async fn create_comment(
    pool: &PgPool,
    author: i64,
    puzzle_id: i64,
    parent_id: Option<i64>,
    body: &str,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        r#"INSERT INTO comments (author, puzzle_id, parent_id, body, date_posted)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id"#,
    )
    .bind(author)
    .bind(puzzle_id)
    .bind(parent_id)
    .bind(body)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.0)
}

/// Returns `false` if the comment was already deleted.
pub async fn soft_delete_comment(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE comments SET deleted = TRUE WHERE id = $1 AND NOT deleted")
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::Sqlx)?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn comment(id: i64, parent_id: Option<i64>, minute: u32) -> Comment {
        Comment {
            id,
            author: 1,
            author_username: "alice".into(),
            body_unsafe: format!("comment {id}"),
            parent_id,
            puzzle_id: 7,
            deleted: false,
            date_posted: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_thread_order() {
        let comments = vec![
            comment(4, Some(1), 3),
            comment(1, None, 0),
            comment(2, None, 1),
            comment(3, Some(1), 2),
            comment(5, Some(3), 4),
        ];
        let order: Vec<(usize, i64)> = thread_comments(&comments)
            .into_iter()
            .map(|(depth, c)| (depth, c.id))
            .collect();
        assert_eq!(order, vec![(0, 1), (1, 3), (2, 5), (1, 4), (0, 2)]);
    }

    #[test]
    fn test_orphan_reply_is_top_level() {
        let comments = vec![comment(1, None, 0), comment(9, Some(42), 1)];
        let order: Vec<(usize, i64)> = thread_comments(&comments)
            .into_iter()
            .map(|(depth, c)| (depth, c.id))
            .collect();
        assert_eq!(order, vec![(0, 1), (0, 9)]);
    }

    #[test]
    fn test_body_is_escaped() {
        let mut c = comment(1, None, 0);
        c.body_unsafe = "<script>alert('x')</script>".into();
        let json = c.to_json(0);
        assert_eq!(
            json["body"],
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert_eq!(json["author"], "alice");
    }

    #[test]
    fn test_deleted_comment_hides_content() {
        let mut c = comment(3, Some(1), 0);
        c.deleted = true;
        let json = c.to_json(1);
        assert_eq!(json["deleted"], true);
        assert!(json["body"].is_null());
        assert!(json["author"].is_null());
        assert_eq!(json["parentId"], 1);
        assert_eq!(json["depth"], 1);
    }
}
