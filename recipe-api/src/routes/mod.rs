/// API route handlers
///
/// - `health`: Health check endpoint
/// - `users`: Registration, tokens and the current user
/// - `recipes`: Recipe CRUD and image upload
/// - `names`: Tag and ingredient endpoints, shared by both models

pub mod health;
pub mod names;
pub mod recipes;
pub mod users;
