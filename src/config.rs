use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    /// Offset used to decide which movements happened "today" on the dashboard.
    pub stats_utc_offset_minutes: i32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// First administrator created when the user directory is empty.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub nombre: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_EMAIL"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                nombre: lookup("BOOTSTRAP_ADMIN_NAME")
                    .unwrap_or_else(|| "Administrador".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("DB_MAX_CONNECTIONS must be a valid number")?,
            stats_utc_offset_minutes: lookup("STATS_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|| "-180".to_string())
                .parse()
                .context("STATS_UTC_OFFSET_MINUTES must be a whole number of minutes")?,
            bootstrap_admin,
        })
    }
}
