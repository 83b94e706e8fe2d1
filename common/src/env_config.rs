use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, the public URL of the web application
/// and the NOWPayments gateway settings.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Public base URL of the web application, used for gateway callbacks and redirects.
    pub app_url: String,
    /// Global request budget per second.
    pub rate_limit_per_second: u32,
    /// Configuration for the NOWPayments gateway.
    pub nowpayments: NowPaymentsConfig,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to verify JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug)]
/// `NowPaymentsConfig` holds what is needed to talk to the crypto payment gateway
/// and to authenticate its IPN callbacks.
pub struct NowPaymentsConfig {
    /// Static API key sent as `x-api-key` on every outbound call.
    pub api_key: String,
    /// Secret used to sign IPN callbacks.
    pub ipn_key: String,
    /// Base URL of the gateway API, without trailing slash.
    pub api_url: String,
    /// Timeout for outbound gateway calls in seconds.
    pub timeout_secs: u64,
}

impl NowPaymentsConfig {
    /// Keys accepted for IPN signature verification, in the order they are tried.
    /// Empty keys are skipped.
    pub fn signing_keys(&self) -> Vec<&str> {
        [self.ipn_key.as_str(), self.api_key.as_str()]
            .into_iter()
            .filter(|key| !key.is_empty())
            .collect()
    }
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads the JWT configuration from environment variables:
    /// - `JWT_SECRET`: Required. The secret key for JWT verification.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `production` enables strict webhook signature checks
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT verification (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `NEXTAUTH_URL`: Public URL of the web app (default: "http://localhost:3000")
    /// - `RATE_LIMIT_PER_SECOND`: Global request budget (default: 10)
    /// - `NOWPAYMENTS_API_KEY`, `NOWPAYMENTS_IPN_KEY`: Gateway secrets (default: empty)
    /// - `NOWPAYMENTS_API_URL`: Gateway base URL (default: "https://api.nowpayments.io")
    /// - `NOWPAYMENTS_TIMEOUT_SECS`: Outbound call timeout (default: 15)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_or(env::var("PORT").ok(), 8080),
            num_workers: parse_or(env::var("WORKERS").ok(), 4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            app_url: trim_url(
                env::var("NEXTAUTH_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
            rate_limit_per_second: parse_or(env::var("RATE_LIMIT_PER_SECOND").ok(), 10),
            nowpayments: NowPaymentsConfig {
                api_key: env::var("NOWPAYMENTS_API_KEY").unwrap_or_default(),
                ipn_key: env::var("NOWPAYMENTS_IPN_KEY").unwrap_or_default(),
                api_url: trim_url(
                    env::var("NOWPAYMENTS_API_URL")
                        .unwrap_or_else(|_| "https://api.nowpayments.io".to_string()),
                ),
                timeout_secs: parse_or(env::var("NOWPAYMENTS_TIMEOUT_SECS").ok(), 15),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
