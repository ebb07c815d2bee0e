pub mod attempts;
pub mod comments;
pub mod counters;
pub mod pool;
pub mod puzzles;
pub mod ratings;
pub mod users;
