use std::net::IpAddr;

const DEFAULT_JWT_SECRET: &str = "change-me-access-secret";
const DEFAULT_JWT_REFRESH_SECRET: &str = "change-me-refresh-secret";
const DEFAULT_ADMIN_PASSWORD: &str = "password";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub host: IpAddr,
    pub port: u16,
    pub frontend_url: String,
    pub max_body_size: usize,
    pub log_level: String,
    pub admin: AdminSeed,
}

/// Credentials for the administrator account provisioned on first boot.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_or("DATABASE_URL", "sqlite://helpdesk.db?mode=rwc");
        let jwt_secret = env_or("JWT_SECRET", DEFAULT_JWT_SECRET);
        let jwt_refresh_secret = env_or("JWT_REFRESH_SECRET", DEFAULT_JWT_REFRESH_SECRET);

        let access_token_minutes: i64 = env_or("JWT_EXPIRES_IN_MINUTES", "60")
            .parse()
            .map_err(|e| format!("Invalid JWT_EXPIRES_IN_MINUTES: {e}"))?;

        let refresh_token_days: i64 = env_or("JWT_REFRESH_EXPIRES_IN_DAYS", "7")
            .parse()
            .map_err(|e| format!("Invalid JWT_REFRESH_EXPIRES_IN_DAYS: {e}"))?;

        if access_token_minutes <= 0 || refresh_token_days <= 0 {
            return Err("Token lifetimes must be positive".to_string());
        }

        let host: IpAddr = env_or("HELPDESK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid HELPDESK_HOST: {e}"))?;

        let port: u16 = env_or("PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let frontend_url = env_or("FRONTEND_URL", "http://localhost:5173");

        let max_body_size: usize = env_or("HELPDESK_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid HELPDESK_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("HELPDESK_LOG_LEVEL", "info");

        let admin = AdminSeed {
            name: env_or("HELPDESK_ADMIN_NAME", "John Admin"),
            email: env_or("HELPDESK_ADMIN_EMAIL", "admin@company.com"),
            password: env_or("HELPDESK_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_refresh_secret,
            access_token_minutes,
            refresh_token_days,
            host,
            port,
            frontend_url,
            max_body_size,
            log_level,
            admin,
        })
    }

    /// Names of settings still carrying their insecure placeholder values.
    pub fn insecure_defaults(&self) -> Vec<&'static str> {
        let mut found = Vec::new();
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            found.push("JWT_SECRET");
        }
        if self.jwt_refresh_secret == DEFAULT_JWT_REFRESH_SECRET {
            found.push("JWT_REFRESH_SECRET");
        }
        if self.admin.password == DEFAULT_ADMIN_PASSWORD {
            found.push("HELPDESK_ADMIN_PASSWORD");
        }
        found
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
