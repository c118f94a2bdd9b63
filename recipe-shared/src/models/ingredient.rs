/// Ingredient model
///
/// Scoped per user exactly like [`Tag`](super::tag::Tag).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE ingredients (
///     id BIGSERIAL PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     CONSTRAINT ingredients_user_id_name_key UNIQUE (user_id, name)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::owned_name::{self, NameTable, OwnedName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

impl OwnedName for Ingredient {
    const TABLE: NameTable = NameTable {
        table: "ingredients",
        join_table: "recipe_ingredients",
        join_column: "ingredient_id",
        label: "ingredient",
    };

    fn from_parts(id: i64, user_id: Uuid, name: String) -> Self {
        Self { id, user_id, name }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Ingredient {
    pub async fn create(pool: &PgPool, user_id: Uuid, name: &str) -> Result<Self, sqlx::Error> {
        owned_name::create(pool, user_id, name).await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        owned_name::list_for_user(pool, user_id, false).await
    }

    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        owned_name::find_for_user(pool, id, user_id).await
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_display_is_name() {
        let ingredient = Ingredient::from_parts(7, Uuid::new_v4(), "ingredientA".to_string());
        assert_eq!(ingredient.to_string(), "ingredientA");
        assert_eq!(ingredient.id, 7);
    }
}
