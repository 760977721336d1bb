//! User directory on top of [`Store`]. Passwords are kept as salted SHA-256.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;

use crate::config::BootstrapAdmin;
use crate::db::Store;
use crate::error::{AppError, AppResult};
use crate::models::{initials, Credentials, NewUser, Role, User, UserRecord};

pub fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{}{}", salt, password).as_bytes());
    format!("{:x}", digest)
}

fn new_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl UserRecord {
    /// Compares in constant time for equal-length hashes.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = hash_password(&self.password_salt, password);
        candidate
            .as_bytes()
            .ct_eq(self.password_hash.as_bytes())
            .into()
    }
}

pub async fn authenticate(store: &dyn Store, credentials: &Credentials) -> AppResult<User> {
    let record = store
        .find_user_by_email(credentials.email.trim())
        .await?
        .filter(|record| record.verify(&credentials.password))
        .ok_or(AppError::Unauthorized)?;

    info!(id = %record.user.id, role = %record.user.role, "User authenticated");
    Ok(record.user)
}

pub async fn create_user(store: &dyn Store, new_user: NewUser) -> AppResult<User> {
    let nombre = new_user.nombre.trim().to_string();
    let email = new_user.email.trim().to_string();
    if nombre.is_empty() || email.is_empty() || new_user.password.is_empty() {
        return Err(AppError::BadRequest(
            "nombre, email and password are required".to_string(),
        ));
    }

    let avatar = new_user
        .avatar
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| initials(&nombre));
    let salt = new_salt();
    let record = UserRecord {
        user: User {
            id: Uuid::new_v4().to_string(),
            nombre,
            email,
            role: new_user.role,
            avatar: Some(avatar),
        },
        password_hash: hash_password(&salt, &new_user.password),
        password_salt: salt,
    };

    store.insert_user(&record).await?;
    info!(id = %record.user.id, role = %record.user.role, "Created user");
    Ok(record.user)
}

/// Create the configured administrator when the directory is empty.
pub async fn ensure_bootstrap_admin(
    store: &dyn Store,
    admin: Option<&BootstrapAdmin>,
) -> AppResult<bool> {
    let Some(admin) = admin else {
        return Ok(false);
    };
    if store.count_users().await? > 0 {
        return Ok(false);
    }

    create_user(
        store,
        NewUser {
            nombre: admin.nombre.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            role: Role::Admin,
            avatar: None,
        },
    )
    .await?;
    Ok(true)
}
