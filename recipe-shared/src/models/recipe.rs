/// Recipe model and database operations
///
/// A recipe belongs to one user and links to any number of that user's tags
/// and ingredients. Writes that touch those links run in one transaction, so
/// a failed tag insert never leaves a half-updated recipe behind.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id BIGSERIAL PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     time_minutes INTEGER NOT NULL,
///     price NUMERIC(5, 2) NOT NULL,
///     link VARCHAR(255) NOT NULL DEFAULT '',
///     description TEXT NOT NULL DEFAULT '',
///     image VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::ingredient::Ingredient;
use super::owned_name::{self, OwnedName};
use super::tag::Tag;

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, link, description, image, \
                              created_at, updated_at";

/// Total significant digits allowed in a price
pub const PRICE_MAX_DIGITS: u32 = 5;

/// Digits allowed after the decimal point in a price
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Why a price was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places.")]
    TooManyDecimalPlaces,

    #[error("Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total.")]
    TooManyDigits,

    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
}

/// Checks a price fits `NUMERIC(5, 2)` and rescales it to two places
///
/// Trailing zeros do not count against the limits, so `5.500` is accepted
/// as `5.50`.
pub fn validate_price(price: Decimal) -> Result<Decimal, PriceError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(PriceError::Negative);
    }

    let normalized = price.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        return Err(PriceError::TooManyDecimalPlaces);
    }

    let whole_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;
    if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        return Err(PriceError::TooManyDigits);
    }

    let mut scaled = normalized;
    scaled.rescale(PRICE_DECIMAL_PLACES);
    Ok(scaled)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,

    /// Always two decimal places
    pub price: Decimal,

    /// Blank when unset
    pub link: String,

    /// Blank when unset
    pub description: String,

    /// Path relative to the media root, e.g. `uploads/recipe/<uuid>.jpg`
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Recipe::create`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,

    /// Tag names, resolved to the owner's tags and created when missing
    pub tags: Vec<String>,

    /// Ingredient names, resolved like `tags`
    pub ingredients: Vec<String>,
}

impl NewRecipe {
    pub fn new(title: impl Into<String>, time_minutes: i32, price: Decimal) -> Self {
        Self {
            title: title.into(),
            time_minutes,
            price,
            link: String::new(),
            description: String::new(),
            tags: Vec::new(),
            ingredients: Vec::new(),
        }
    }
}

/// Partial update for [`Recipe::update`]. `None` leaves a field untouched.
///
/// `tags` and `ingredients` replace the whole set when present; an empty
/// list clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

/// Narrows a recipe listing to recipes linked to any of the given ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// A recipe with its linked tags and ingredients loaded
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeWithRelations {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    /// Inserts a recipe and links its tags and ingredients
    ///
    /// Names the owner has not used before become new tags or ingredients.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: NewRecipe,
    ) -> Result<RecipeWithRelations, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "INSERT INTO recipes (user_id, title, time_minutes, price, link, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&data.title)
        .bind(data.time_minutes)
        .bind(data.price)
        .bind(&data.link)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        let tags = link_names::<Tag>(&mut tx, user_id, recipe.id, &data.tags).await?;
        let ingredients =
            link_names::<Ingredient>(&mut tx, user_id, recipe.id, &data.ingredients).await?;

        tx.commit().await?;

        tracing::info!(
            recipe_id = recipe.id,
            user_id = %user_id,
            tags = tags.len(),
            ingredients = ingredients.len(),
            "Created recipe"
        );

        Ok(RecipeWithRelations {
            recipe,
            tags,
            ingredients,
        })
    }

    /// Lists the user's recipes, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeWithRelations>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.user_id = "
        ));
        query.push_bind(user_id);

        if !filter.tags.is_empty() {
            query.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt \
                 WHERE rt.recipe_id = r.id AND rt.tag_id = ANY(",
            );
            query.push_bind(filter.tags.clone());
            query.push("))");
        }

        if !filter.ingredients.is_empty() {
            query.push(
                " AND EXISTS (SELECT 1 FROM recipe_ingredients ri \
                 WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY(",
            );
            query.push_bind(filter.ingredients.clone());
            query.push("))");
        }

        query.push(" ORDER BY r.id DESC");

        let recipes = query.build_query_as::<Recipe>().fetch_all(pool).await?;
        let mut conn = pool.acquire().await?;
        with_relations(&mut conn, recipes).await
    }

    /// Fetches one recipe if it belongs to the user
    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<RecipeWithRelations>, sqlx::Error> {
        let mut conn = pool.acquire().await?;

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        match recipe {
            Some(recipe) => Ok(with_relations(&mut conn, vec![recipe]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Applies a partial update; `Ok(None)` if the user has no such recipe
    pub async fn update(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeWithRelations>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes
             SET title = COALESCE($3, title),
                 time_minutes = COALESCE($4, time_minutes),
                 price = COALESCE($5, price),
                 link = COALESCE($6, link),
                 description = COALESCE($7, description),
                 updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(changes.title)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(changes.link)
        .bind(changes.description)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(recipe) = recipe else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(names) = &changes.tags {
            owned_name::detach_all::<Tag>(&mut *tx, recipe.id).await?;
            link_names::<Tag>(&mut tx, user_id, recipe.id, names).await?;
        }

        if let Some(names) = &changes.ingredients {
            owned_name::detach_all::<Ingredient>(&mut *tx, recipe.id).await?;
            link_names::<Ingredient>(&mut tx, user_id, recipe.id, names).await?;
        }

        let mut loaded = with_relations(&mut tx, vec![recipe]).await?;
        tx.commit().await?;

        Ok(loaded.pop())
    }

    /// Points the recipe at a new image and returns it with the previous path
    ///
    /// The caller owns removing the previous file from storage.
    pub async fn set_image(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
        image: &str,
    ) -> Result<Option<(Recipe, Option<String>)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous: Option<(Option<String>,)> =
            sqlx::query_as("SELECT image FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((previous,)) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes SET image = $2, updated_at = NOW() WHERE id = $1
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(image)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some((recipe, previous)))
    }

    /// Deletes the user's recipe and returns the removed row
    ///
    /// Links to tags and ingredients cascade; the tags and ingredients
    /// themselves are kept.
    pub async fn delete_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<Recipe>, sqlx::Error> {
        sqlx::query_as::<_, Recipe>(&format!(
            "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Resolves names to the owner's rows and links each to the recipe
///
/// Duplicate names in `names` resolve to the same row and link once.
async fn link_names<T: OwnedName>(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: i64,
    names: &[String],
) -> Result<Vec<T>, sqlx::Error> {
    let mut linked: Vec<T> = Vec::with_capacity(names.len());

    for name in names {
        let row: T = owned_name::get_or_create(&mut *conn, user_id, name).await?;
        owned_name::attach::<T>(&mut *conn, recipe_id, row.id()).await?;

        if !linked.iter().any(|existing| existing.id() == row.id()) {
            linked.push(row);
        }
    }

    linked.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(linked)
}

/// Loads tags and ingredients for a batch of recipes, keeping their order
async fn with_relations(
    conn: &mut PgConnection,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeWithRelations>, sqlx::Error> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = recipes.iter().map(|recipe| recipe.id).collect();

    let mut tags = group_by_recipe(owned_name::attached_to::<Tag>(&mut *conn, &ids).await?);
    let mut ingredients =
        group_by_recipe(owned_name::attached_to::<Ingredient>(&mut *conn, &ids).await?);

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeWithRelations {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

fn group_by_recipe<T>(pairs: Vec<(i64, T)>) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for (recipe_id, row) in pairs {
        grouped.entry(recipe_id).or_default().push(row);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_recipe() -> Recipe {
        let now = Utc::now();
        Recipe {
            id: 1,
            user_id: Uuid::new_v4(),
            title: "Sample recipe name".to_string(),
            time_minutes: 5,
            price: Decimal::from_str("5.50").unwrap(),
            link: String::new(),
            description: "Sample recipe description.".to_string(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_recipe_display_is_title() {
        assert_eq!(sample_recipe().to_string(), "Sample recipe name");
    }

    #[test]
    fn test_validate_price_accepts_two_places() {
        let price = validate_price(Decimal::from_str("5.25").unwrap()).unwrap();
        assert_eq!(price.to_string(), "5.25");

        let price = validate_price(Decimal::from_str("999.99").unwrap()).unwrap();
        assert_eq!(price.to_string(), "999.99");
    }

    #[test]
    fn test_validate_price_rescales_to_two_places() {
        assert_eq!(validate_price(Decimal::from(5)).unwrap().to_string(), "5.00");
        assert_eq!(
            validate_price(Decimal::from_str("5.500").unwrap()).unwrap().to_string(),
            "5.50"
        );
        assert_eq!(validate_price(Decimal::ZERO).unwrap().to_string(), "0.00");
    }

    #[test]
    fn test_validate_price_rejects_out_of_range() {
        assert_eq!(
            validate_price(Decimal::from_str("5.255").unwrap()),
            Err(PriceError::TooManyDecimalPlaces)
        );
        assert_eq!(validate_price(Decimal::from(1000)), Err(PriceError::TooManyDigits));
        assert_eq!(
            validate_price(Decimal::from_str("-1.00").unwrap()),
            Err(PriceError::Negative)
        );
    }

    #[test]
    fn test_group_by_recipe_keeps_order_within_recipe() {
        let grouped = group_by_recipe(vec![(1, "a"), (2, "b"), (1, "c")]);
        assert_eq!(grouped[&1], vec!["a", "c"]);
        assert_eq!(grouped[&2], vec!["b"]);
    }

    #[test]
    fn test_new_recipe_defaults_are_blank() {
        let data = NewRecipe::new("Sample", 22, Decimal::from_str("5.25").unwrap());
        assert!(data.link.is_empty());
        assert!(data.description.is_empty());
        assert!(data.tags.is_empty());
        assert!(data.ingredients.is_empty());
    }
}
