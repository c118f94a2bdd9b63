/// Shared operations for per-user named rows attached to recipes
///
/// Tags and ingredients have the same shape (`id`, `user_id`, `name`), the
/// same per-user uniqueness rule, and the same many-to-many link to recipes.
/// The [`OwnedName`] trait describes where each one lives; the functions in
/// this module implement the queries once for both.
///
/// Every query takes the owning user and filters on it, so a row belonging to
/// someone else behaves exactly like a row that does not exist.

use sqlx::{postgres::PgRow, FromRow, PgExecutor};
use uuid::Uuid;

/// Table layout for one kind of named row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTable {
    /// Table holding the rows, e.g. `tags`
    pub table: &'static str,

    /// Join table linking rows to recipes, e.g. `recipe_tags`
    pub join_table: &'static str,

    /// Column in the join table referencing `table`, e.g. `tag_id`
    pub join_column: &'static str,

    /// Singular name used in log fields and error messages
    pub label: &'static str,
}

/// A per-user named row that can be attached to recipes
pub trait OwnedName: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    const TABLE: NameTable;

    fn from_parts(id: i64, user_id: Uuid, name: String) -> Self;

    fn id(&self) -> i64;

    fn name(&self) -> &str;
}

/// Inserts a new row
///
/// # Errors
///
/// Fails with a unique violation if the user already has a row with this name.
pub async fn create<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    name: &str,
) -> Result<T, sqlx::Error> {
    let table = T::TABLE.table;

    sqlx::query_as::<_, T>(&format!(
        "INSERT INTO {table} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(executor)
    .await
}

/// Returns the user's row with this exact name, inserting it if missing
///
/// The upsert relies on the `(user_id, name)` unique constraint, so two
/// concurrent writers resolve to the same row.
pub async fn get_or_create<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    name: &str,
) -> Result<T, sqlx::Error> {
    let table = T::TABLE.table;

    sqlx::query_as::<_, T>(&format!(
        "INSERT INTO {table} (user_id, name) VALUES ($1, $2)
         ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id, user_id, name"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(executor)
    .await
}

/// Lists the user's rows, ordered by name descending
///
/// With `assigned_only`, only rows attached to at least one recipe are
/// returned.
pub async fn list_for_user<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    assigned_only: bool,
) -> Result<Vec<T>, sqlx::Error> {
    let NameTable {
        table,
        join_table,
        join_column,
        ..
    } = T::TABLE;

    let assigned_clause = if assigned_only {
        format!(" AND EXISTS (SELECT 1 FROM {join_table} j WHERE j.{join_column} = t.id)")
    } else {
        String::new()
    };

    sqlx::query_as::<_, T>(&format!(
        "SELECT t.id, t.user_id, t.name FROM {table} t
         WHERE t.user_id = $1{assigned_clause}
         ORDER BY t.name DESC, t.id DESC"
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Fetches one row if it belongs to the user
pub async fn find_for_user<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    id: i64,
    user_id: Uuid,
) -> Result<Option<T>, sqlx::Error> {
    let table = T::TABLE.table;

    sqlx::query_as::<_, T>(&format!(
        "SELECT id, user_id, name FROM {table} WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Renames a row the user owns; `Ok(None)` if there is no such row
pub async fn rename<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    id: i64,
    user_id: Uuid,
    name: &str,
) -> Result<Option<T>, sqlx::Error> {
    let table = T::TABLE.table;

    sqlx::query_as::<_, T>(&format!(
        "UPDATE {table} SET name = $3 WHERE id = $1 AND user_id = $2
         RETURNING id, user_id, name"
    ))
    .bind(id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(executor)
    .await
}

/// Deletes a row the user owns; recipe links cascade
///
/// Returns false if nothing was deleted.
pub async fn delete_for_user<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    id: i64,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let table = T::TABLE.table;

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1 AND user_id = $2"))
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Loads rows attached to any of `recipe_ids` as `(recipe_id, row)` pairs
///
/// Pairs come back ordered by recipe, then name.
pub async fn attached_to<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    recipe_ids: &[i64],
) -> Result<Vec<(i64, T)>, sqlx::Error> {
    let NameTable {
        table,
        join_table,
        join_column,
        ..
    } = T::TABLE;

    let rows: Vec<(i64, i64, Uuid, String)> = sqlx::query_as(&format!(
        "SELECT j.recipe_id, t.id, t.user_id, t.name
         FROM {join_table} j
         JOIN {table} t ON t.id = j.{join_column}
         WHERE j.recipe_id = ANY($1)
         ORDER BY j.recipe_id, t.name, t.id"
    ))
    .bind(recipe_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(recipe_id, id, user_id, name)| (recipe_id, T::from_parts(id, user_id, name)))
        .collect())
}

/// Links a row to a recipe; linking twice is a no-op
pub async fn attach<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    recipe_id: i64,
    id: i64,
) -> Result<(), sqlx::Error> {
    let NameTable {
        join_table,
        join_column,
        ..
    } = T::TABLE;

    sqlx::query(&format!(
        "INSERT INTO {join_table} (recipe_id, {join_column}) VALUES ($1, $2)
         ON CONFLICT DO NOTHING"
    ))
    .bind(recipe_id)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Removes every link between a recipe and rows of this kind
pub async fn detach_all<'e, T: OwnedName>(
    executor: impl PgExecutor<'e>,
    recipe_id: i64,
) -> Result<u64, sqlx::Error> {
    let join_table = T::TABLE.join_table;

    let result = sqlx::query(&format!("DELETE FROM {join_table} WHERE recipe_id = $1"))
        .bind(recipe_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Whether a database error is the per-user name uniqueness constraint
pub fn is_duplicate_name(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .constraint()
            .is_some_and(|constraint| constraint.ends_with("_user_id_name_key")),
        _ => false,
    }
}
