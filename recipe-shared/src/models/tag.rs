/// Tag model
///
/// A tag is a name owned by one user and attachable to any of that user's
/// recipes. Two users may each have a tag called "Vegan"; one user cannot
/// have two.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id BIGSERIAL PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     CONSTRAINT tags_user_id_name_key UNIQUE (user_id, name)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::owned_name::{self, NameTable, OwnedName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

impl OwnedName for Tag {
    const TABLE: NameTable = NameTable {
        table: "tags",
        join_table: "recipe_tags",
        join_column: "tag_id",
        label: "tag",
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

impl Tag {
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

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
