use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Public view of a user; credentials never leave the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub nombre: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
}

/// Stored user row including the salted password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
    pub password_salt: String,
}

impl<'r> FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            user: User {
                id: row.try_get("id")?,
                nombre: row.try_get("nombre")?,
                email: row.try_get("email")?,
                role: role.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
                avatar: row.try_get("avatar")?,
            },
            password_hash: row.try_get("password_hash")?,
            password_salt: row.try_get("password_salt")?,
        })
    }
}

/// Up to two uppercase initials taken from the first words of a name.
pub fn initials(nombre: &str) -> String {
    nombre
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

// ── Request payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub nombre: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub avatar: Option<String>,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}
