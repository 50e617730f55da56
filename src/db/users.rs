//! Dashboard user operations

use sqlx::SqlitePool;

use crate::domain::User;

use super::parse_rfc3339;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    created_at: String,
}

impl UserRow {
    fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            created_at: parse_rfc3339(&self.created_at),
        }
    }
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.to_user()))
}

pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.to_user()))
}

pub async fn create_user(pool: &SqlitePool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// Create the initial admin account when no users exist yet
pub async fn seed_admin_user(
    pool: &SqlitePool,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<(), sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let (Some(email), Some(password)) = (email, password) else {
        tracing::info!("ADMIN_EMAIL or ADMIN_PASSWORD not set, skipping admin seeding");
        return Ok(());
    };

    let user = User::new(email, password);
    create_user(pool, &user).await?;
    tracing::info!("Seeded admin user: {}", email);
    Ok(())
}
