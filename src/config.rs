use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub jwt_secret: String,
    pub polka_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./database.json".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set for signing tokens")?;

        let polka_key = env::var("POLKA_KEY")
            .map_err(|_| "POLKA_KEY must be set for webhook authentication")?;

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            jwt_secret,
            polka_key,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
