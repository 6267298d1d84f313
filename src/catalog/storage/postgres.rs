//! PostgreSQL store.
//!
//! Uniqueness and cascades live in the schema (`UNIQUE (parent, slug)`,
//! `ON DELETE CASCADE`); this module maps constraint violations back onto
//! `StoreError` so the service can report them like its own checks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::{CatalogStore, MAX_SESSION_TTL_SECS, UserStore};
use crate::{
    accounts::User,
    catalog::{
        entity::{Entity, EntityKind, Menu, MenuItem, MenuSection, Restaurant, Theme},
        error::StoreError,
    },
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

const RESTAURANT_SELECT: &str = r"
    SELECT t.id, t.name, t.slug,
        COALESCE(
            array_agg(a.user_id ORDER BY a.user_id) FILTER (WHERE a.user_id IS NOT NULL),
            '{}'::uuid[]
        ) AS admin_users
    FROM restaurants t
    LEFT JOIN restaurant_admins a ON a.restaurant_id = t.id";
const MENU_SELECT: &str =
    "SELECT t.id, t.restaurant_id AS parent_id, t.name, t.slug, t.theme FROM menus t";
const SECTION_SELECT: &str =
    "SELECT t.id, t.menu_id AS parent_id, t.name, t.slug FROM menu_sections t";
const ITEM_SELECT: &str =
    "SELECT t.id, t.section_id AS parent_id, t.name, t.slug, t.description FROM menu_items t";

const USER_COLUMNS: &str = "id, username, email, is_staff";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies `sql/schema.sql` statement by statement. Every statement is
    /// idempotent, so this is safe on an already initialised database.
    ///
    /// # Errors
    /// Returns an error if a connection cannot be acquired or a statement fails.
    pub async fn apply_schema(&self) -> Result<()> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .context("failed to acquire connection for schema setup")?;

        let statements = split_sql_statements(SCHEMA_SQL);
        for (index, statement) in statements.iter().enumerate() {
            sqlx::query(statement)
                .execute(&mut *connection)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }

        info!("Applied {} schema statements", statements.len());
        Ok(())
    }
}

/// Splits a schema file on statement-terminating `;`, skipping `psql` includes.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("\\ir ") || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

const fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Restaurant => "restaurants",
        EntityKind::Menu => "menus",
        EntityKind::MenuSection => "menu_sections",
        EntityKind::MenuItem => "menu_items",
    }
}

const fn parent_column(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Restaurant => None,
        EntityKind::Menu => Some("restaurant_id"),
        EntityKind::MenuSection => Some("menu_id"),
        EntityKind::MenuItem => Some("section_id"),
    }
}

/// Builds the `SELECT` for `kind` with the given `WHERE` clause.
fn select_sql(kind: EntityKind, filter: &str) -> String {
    let (base, group) = match kind {
        EntityKind::Restaurant => (RESTAURANT_SELECT, " GROUP BY t.id, t.name, t.slug"),
        EntityKind::Menu => (MENU_SELECT, ""),
        EntityKind::MenuSection => (SECTION_SELECT, ""),
        EntityKind::MenuItem => (ITEM_SELECT, ""),
    };
    // UUIDv7 ids sort in creation order.
    let order = match kind {
        EntityKind::Restaurant | EntityKind::Menu => "t.name, t.id",
        EntityKind::MenuSection | EntityKind::MenuItem => "t.id",
    };
    format!("{base} WHERE {filter}{group} ORDER BY {order}")
}

fn entity_from_row(kind: EntityKind, row: &PgRow) -> Result<Entity, StoreError> {
    let entity = match kind {
        EntityKind::Restaurant => {
            let admins: Vec<Uuid> = row.try_get("admin_users")?;
            Entity::Restaurant(Restaurant {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                slug: row.try_get("slug")?,
                admin_users: admins.into_iter().collect(),
            })
        }
        EntityKind::Menu => {
            let theme: String = row.try_get("theme")?;
            let theme = theme
                .parse::<Theme>()
                .map_err(|err| sqlx::Error::Decode(err.into()))?;
            Entity::Menu(Menu {
                id: row.try_get("id")?,
                restaurant_id: row.try_get("parent_id")?,
                name: row.try_get("name")?,
                slug: row.try_get("slug")?,
                theme,
            })
        }
        EntityKind::MenuSection => Entity::MenuSection(MenuSection {
            id: row.try_get("id")?,
            menu_id: row.try_get("parent_id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
        }),
        EntityKind::MenuItem => Entity::MenuItem(MenuItem {
            id: row.try_get("id")?,
            section_id: row.try_get("parent_id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
        }),
    };
    Ok(entity)
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_staff: row.try_get("is_staff")?,
    })
}

fn violation_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Maps constraint violations on a write to `kind`.
fn write_error(err: sqlx::Error, kind: EntityKind) -> StoreError {
    match violation_code(&err).as_deref() {
        Some(PG_UNIQUE_VIOLATION) => StoreError::UniqueViolation,
        Some(PG_FOREIGN_KEY_VIOLATION) => match kind.parent() {
            Some(parent) => StoreError::ParentMissing(parent),
            None => StoreError::UnknownUser,
        },
        _ => StoreError::Database(err),
    }
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(())
    }

    async fn create(&self, entity: &Entity) -> Result<(), StoreError> {
        let kind = entity.kind();
        let mut tx = self.pool.begin().await?;

        let insert = match entity {
            Entity::Restaurant(restaurant) => {
                let query = "INSERT INTO restaurants (id, name, slug) VALUES ($1, $2, $3)";
                sqlx::query(query)
                    .bind(restaurant.id)
                    .bind(&restaurant.name)
                    .bind(&restaurant.slug)
                    .execute(&mut *tx)
                    .instrument(db_span("INSERT", query))
                    .await
            }
            Entity::Menu(menu) => {
                let query = "INSERT INTO menus (id, restaurant_id, name, slug, theme) VALUES ($1, $2, $3, $4, $5)";
                sqlx::query(query)
                    .bind(menu.id)
                    .bind(menu.restaurant_id)
                    .bind(&menu.name)
                    .bind(&menu.slug)
                    .bind(menu.theme.as_str())
                    .execute(&mut *tx)
                    .instrument(db_span("INSERT", query))
                    .await
            }
            Entity::MenuSection(section) => {
                let query = "INSERT INTO menu_sections (id, menu_id, name, slug) VALUES ($1, $2, $3, $4)";
                sqlx::query(query)
                    .bind(section.id)
                    .bind(section.menu_id)
                    .bind(&section.name)
                    .bind(&section.slug)
                    .execute(&mut *tx)
                    .instrument(db_span("INSERT", query))
                    .await
            }
            Entity::MenuItem(item) => {
                let query = "INSERT INTO menu_items (id, section_id, name, slug, description) VALUES ($1, $2, $3, $4, $5)";
                sqlx::query(query)
                    .bind(item.id)
                    .bind(item.section_id)
                    .bind(&item.name)
                    .bind(&item.slug)
                    .bind(&item.description)
                    .execute(&mut *tx)
                    .instrument(db_span("INSERT", query))
                    .await
            }
        };
        if let Err(err) = insert {
            let _ = tx.rollback().await;
            return Err(write_error(err, kind));
        }

        if let Entity::Restaurant(restaurant) = entity {
            let query = "INSERT INTO restaurant_admins (restaurant_id, user_id) VALUES ($1, $2)";
            for user_id in &restaurant.admin_users {
                let insert = sqlx::query(query)
                    .bind(restaurant.id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .instrument(db_span("INSERT", query))
                    .await;
                if let Err(err) = insert {
                    let _ = tx.rollback().await;
                    return Err(write_error(err, kind));
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StoreError> {
        let query = select_sql(kind, "t.id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        row.map(|row| entity_from_row(kind, &row)).transpose()
    }

    async fn find_by_slug(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
        slug: &str,
    ) -> Result<Vec<Entity>, StoreError> {
        let rows = match (parent_column(kind), parent) {
            (Some(column), Some(parent)) => {
                let query = select_sql(kind, &format!("t.{column} = $1 AND t.slug = $2"));
                sqlx::query(&query)
                    .bind(parent)
                    .bind(slug)
                    .fetch_all(&self.pool)
                    .instrument(db_span("SELECT", &query))
                    .await?
            }
            (None, _) => {
                let query = select_sql(kind, "t.slug = $1");
                sqlx::query(&query)
                    .bind(slug)
                    .fetch_all(&self.pool)
                    .instrument(db_span("SELECT", &query))
                    .await?
            }
            (Some(_), None) => return Ok(Vec::new()),
        };
        rows.iter().map(|row| entity_from_row(kind, row)).collect()
    }

    async fn list(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
    ) -> Result<Vec<Entity>, StoreError> {
        let rows = match (parent_column(kind), parent) {
            (Some(column), Some(parent)) => {
                let query = select_sql(kind, &format!("t.{column} = $1"));
                sqlx::query(&query)
                    .bind(parent)
                    .fetch_all(&self.pool)
                    .instrument(db_span("SELECT", &query))
                    .await?
            }
            (None, _) => {
                let query = select_sql(kind, "TRUE");
                sqlx::query(&query)
                    .fetch_all(&self.pool)
                    .instrument(db_span("SELECT", &query))
                    .await?
            }
            (Some(_), None) => return Ok(Vec::new()),
        };
        rows.iter().map(|row| entity_from_row(kind, row)).collect()
    }

    async fn update(&self, entity: &Entity) -> Result<(), StoreError> {
        let kind = entity.kind();
        let result = match entity {
            Entity::Restaurant(restaurant) => {
                let query = "UPDATE restaurants SET name = $2, slug = $3 WHERE id = $1";
                sqlx::query(query)
                    .bind(restaurant.id)
                    .bind(&restaurant.name)
                    .bind(&restaurant.slug)
                    .execute(&self.pool)
                    .instrument(db_span("UPDATE", query))
                    .await
            }
            Entity::Menu(menu) => {
                let query = "UPDATE menus SET name = $2, slug = $3, theme = $4 WHERE id = $1";
                sqlx::query(query)
                    .bind(menu.id)
                    .bind(&menu.name)
                    .bind(&menu.slug)
                    .bind(menu.theme.as_str())
                    .execute(&self.pool)
                    .instrument(db_span("UPDATE", query))
                    .await
            }
            Entity::MenuSection(section) => {
                let query = "UPDATE menu_sections SET name = $2, slug = $3 WHERE id = $1";
                sqlx::query(query)
                    .bind(section.id)
                    .bind(&section.name)
                    .bind(&section.slug)
                    .execute(&self.pool)
                    .instrument(db_span("UPDATE", query))
                    .await
            }
            Entity::MenuItem(item) => {
                let query =
                    "UPDATE menu_items SET name = $2, slug = $3, description = $4 WHERE id = $1";
                sqlx::query(query)
                    .bind(item.id)
                    .bind(&item.name)
                    .bind(&item.slug)
                    .bind(&item.description)
                    .execute(&self.pool)
                    .instrument(db_span("UPDATE", query))
                    .await
            }
        };

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::Missing(kind)),
            Ok(_) => Ok(()),
            Err(err) => Err(write_error(err, kind)),
        }
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError> {
        let query = format!("DELETE FROM {} WHERE id = $1", table(kind));
        let done = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", &query))
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn add_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO restaurant_admins (restaurant_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
        ";
        let insert = sqlx::query(query)
            .bind(restaurant_id)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match insert {
            Ok(_) => Ok(()),
            Err(err) if violation_code(&err).as_deref() == Some(PG_FOREIGN_KEY_VIOLATION) => {
                // Either side of the membership row may be gone.
                let restaurant = self.get(EntityKind::Restaurant, restaurant_id).await?;
                if restaurant.is_none() {
                    Err(StoreError::Missing(EntityKind::Restaurant))
                } else {
                    Err(StoreError::UnknownUser)
                }
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn remove_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent removals on the same restaurant.
        let lock = "SELECT id FROM restaurants WHERE id = $1 FOR UPDATE";
        let locked = sqlx::query(lock)
            .bind(restaurant_id)
            .fetch_optional(&mut *tx)
            .instrument(db_span("SELECT", lock))
            .await?;
        if locked.is_none() {
            return Ok(false);
        }

        let membership = r"
            SELECT count(*) AS admins, COALESCE(bool_or(user_id = $2), FALSE) AS is_admin
            FROM restaurant_admins
            WHERE restaurant_id = $1
        ";
        let row = sqlx::query(membership)
            .bind(restaurant_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .instrument(db_span("SELECT", membership))
            .await?;
        let admins: i64 = row.try_get("admins")?;
        let is_admin: bool = row.try_get("is_admin")?;
        if !is_admin {
            return Ok(false);
        }
        if admins <= 1 {
            return Err(StoreError::LastAdmin);
        }

        let query = "DELETE FROM restaurant_admins WHERE restaurant_id = $1 AND user_id = $2";
        let done = sqlx::query(query)
            .bind(restaurant_id)
            .bind(user_id)
            .execute(&mut *tx)
            .instrument(db_span("DELETE", query))
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let query = "INSERT INTO users (id, username, email, is_staff) VALUES ($1, $2, $3, $4)";
        let insert = sqlx::query(query)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.is_staff)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match insert {
            Ok(_) => Ok(()),
            Err(err) if violation_code(&err).as_deref() == Some(PG_UNIQUE_VIOLATION) => {
                Err(StoreError::UniqueViolation)
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_session(
        &self,
        token_hash: &[u8],
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if ttl.as_secs() > MAX_SESSION_TTL_SECS {
            return Err(StoreError::SessionTtlOutOfRange);
        }
        let query = r"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
        ";
        let insert = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(ttl.as_secs_f64())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match insert {
            Ok(_) => {}
            Err(err) if violation_code(&err).as_deref() == Some(PG_FOREIGN_KEY_VIOLATION) => {
                return Err(StoreError::UnknownUser);
            }
            Err(err) => return Err(StoreError::Database(err)),
        }

        let prune = "DELETE FROM sessions WHERE expires_at <= NOW()";
        sqlx::query(prune)
            .execute(&self.pool)
            .instrument(db_span("DELETE", prune))
            .await?;
        Ok(())
    }

    async fn find_session_user(&self, token_hash: &[u8]) -> Result<Option<User>, StoreError> {
        let query = r"
            SELECT u.id, u.username, u.email, u.is_staff
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1
              AND s.expires_at > NOW()
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let done = sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
