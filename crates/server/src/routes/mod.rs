pub mod auth;
pub mod comments;
pub mod editor;
pub mod health;
pub mod puzzles;
pub mod train;
