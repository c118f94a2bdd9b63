/// Database models for the recipe service
///
/// Each model owns its SQL. Everything except `user` is scoped to an owning
/// user, and every query that reads or writes those rows takes the owner's id.
///
/// # Models
///
/// - `user`: Accounts keyed by email
/// - `recipe`: Recipes with their tag and ingredient links
/// - `tag`: Per-user tags
/// - `ingredient`: Per-user ingredients
/// - `owned_name`: Queries shared by tags and ingredients
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::recipe::{NewRecipe, Recipe};
/// use recipe_shared::models::user::User;
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create_user(&pool, "user@example.com", "testpass123").await?;
///
/// let mut data = NewRecipe::new("Thai Prawn Curry", 30, Decimal::new(250, 2));
/// data.tags = vec!["Thai".to_string(), "Dinner".to_string()];
///
/// let created = Recipe::create(&pool, user.id, data).await?;
/// assert_eq!(created.tags.len(), 2);
/// # Ok(())
/// # }
/// ```

pub mod ingredient;
pub mod owned_name;
pub mod recipe;
pub mod tag;
pub mod user;
