use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub bind_address: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("CLINIC_DATABASE_PATH")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_DATABASE_PATH not set, using ./clinic.db");
                    "./clinic.db".to_string()
                }),
            bind_address: env::var("CLINIC_BIND_ADDRESS")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BIND_ADDRESS not set, using 0.0.0.0:3000");
                    "0.0.0.0:3000".to_string()
                }),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.database_path != ":memory:"
    }
}
