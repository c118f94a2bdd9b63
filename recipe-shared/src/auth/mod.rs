/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access/refresh token generation and validation
/// - [`context`]: Resolving a bearer token into the authenticated user
///
/// # Example
///
/// ```
/// use recipe_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use recipe_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// assert_eq!(validate_access_token(&token, "secret-key")?.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

pub mod context;
pub mod jwt;
pub mod password;
