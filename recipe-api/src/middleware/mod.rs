/// Middleware for the API server
///
/// Authentication is a `from_fn` layer in `app`; this module holds the
/// tower layers.

pub mod security;
