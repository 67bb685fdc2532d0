use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes the pending-account database, server host and port,
/// number of worker threads, CORS settings, logging preferences,
/// the supporter directory vendor, the trust cookie, the human gate
/// and the outbound mail provider.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to. In-memory storage is used when absent.
    pub database_url: Option<String>,
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
    /// File the logger mirrors console output to.
    pub log_file: String,
    /// Global request budget per second.
    pub rate_limit_per_second: u32,
    /// Key material for the signed session cookie (at least 64 bytes).
    pub session_secret: String,
    /// Public origin of this service, used to build verification links.
    pub public_base_url: String,
    /// Where visitors land after authentication, and after a failed link.
    pub auth_redirect_location: String,
    /// HTML snippet appended to error messages pointing at a human contact.
    pub support_contact_html: String,
    /// Whether a repeated signup for a pending address resends the link.
    pub resend_verification_on_repeat: bool,
    /// Verification token settings.
    pub token_config: TokenConfig,
    /// Mailing-list vendor settings.
    pub directory: DirectoryConfig,
    /// Trust cookie read by the protected application.
    pub auth_cookie: AuthCookieConfig,
    /// reCAPTCHA settings for the human gate.
    pub recaptcha: RecaptchaConfig,
    /// Transactional mail settings.
    pub mail: MailConfig,
}

#[derive(Clone, Debug)]
/// Configuration for email verification tokens.
pub struct TokenConfig {
    /// The HMAC key tokens are derived with.
    pub secret: String,
    /// Token lifetime in hours. Zero disables expiry.
    pub ttl_hours: i64,
}

#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub vendor: DirectoryVendor,
    /// Request timeout for every vendor call, in seconds.
    pub timeout_seconds: u64,
}

#[derive(Clone, Debug)]
/// The mailing-list platform supporters are looked up in.
pub enum DirectoryVendor {
    Mailchimp {
        list_id: String,
        api_key: String,
        /// Data center prefix, e.g. `us6`.
        server: String,
    },
    Salsa {
        api_token: String,
        hostname: String,
    },
    /// Process-local directory, for development only.
    Memory,
}

#[derive(Clone, Debug)]
pub struct AuthCookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub max_age_weeks: i64,
}

#[derive(Clone, Debug)]
pub struct RecaptchaConfig {
    pub private_key: String,
    pub verify_url: String,
    /// Scores below this are bots.
    pub bot_threshold: f64,
    /// Scores below this (and above the bot threshold) are uncertain.
    pub uncertain_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    /// Brevo-compatible transactional endpoint.
    pub api_url: String,
    /// Verification emails are only logged when no key is configured.
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

impl TokenConfig {
    /// Creates a new `TokenConfig` instance from environment variables.
    ///
    /// Reads the token configuration from environment variables:
    /// - `TOKEN_SECRET`: Required. The HMAC key for verification tokens.
    /// - `VERIFICATION_TOKEN_TTL_HOURS`: Optional. Defaults to 72 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `TOKEN_SECRET` environment variable is not set
    /// - `VERIFICATION_TOKEN_TTL_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        TokenConfig {
            secret: env::var("TOKEN_SECRET").expect("TOKEN_SECRET must be set"),
            ttl_hours: env::var("VERIFICATION_TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "72".to_string())
                .parse()
                .expect("VERIFICATION_TOKEN_TTL_HOURS must be a valid number"),
        }
    }
}

impl DirectoryVendor {
    /// Reads `DIRECTORY_VENDOR` and the credentials of the selected vendor.
    ///
    /// # Panics
    ///
    /// Panics when the vendor is unknown or one of its credentials is missing.
    pub fn from_env() -> Self {
        let vendor = env::var("DIRECTORY_VENDOR").expect("DIRECTORY_VENDOR must be set");

        match vendor.to_lowercase().as_str() {
            "mailchimp" => DirectoryVendor::Mailchimp {
                list_id: env::var("MAILCHIMP_LIST_ID").expect("MAILCHIMP_LIST_ID must be set"),
                api_key: env::var("MAILCHIMP_API_KEY").expect("MAILCHIMP_API_KEY must be set"),
                server: env::var("MAILCHIMP_SERVER").expect("MAILCHIMP_SERVER must be set"),
            },
            "salsa" => DirectoryVendor::Salsa {
                api_token: env::var("SALSA_API_TOKEN").expect("SALSA_API_TOKEN must be set"),
                hostname: env::var("SALSA_HOSTNAME")
                    .unwrap_or_else(|_| "https://api.salsalabs.org".to_string()),
            },
            "memory" => DirectoryVendor::Memory,
            other => panic!("Unsupported DIRECTORY_VENDOR: {}", other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DirectoryVendor::Mailchimp { .. } => "mailchimp",
            DirectoryVendor::Salsa { .. } => "salsa",
            DirectoryVendor::Memory => "memory",
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `SESSION_SECRET`: Key for the signed session cookie
    /// - `TOKEN_SECRET`: Key for verification tokens (via `TokenConfig::from_env()`)
    /// - `DIRECTORY_VENDOR` and its credentials (via `DirectoryVendor::from_env()`)
    /// - `AUTH_COOKIE_NAME`, `AUTH_REDIRECT_LOCATION`
    ///
    /// Optional (with defaults):
    /// - `DATABASE_URL`: Postgres connection string (default: in-memory storage)
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - Various mail, reCAPTCHA and cookie settings (see implementation for details)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing or if
    /// numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let mail_api_key = env::var("MAIL_API_KEY").ok().filter(|k| !k.trim().is_empty());

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "supporter-gate.log".to_string()),
            rate_limit_per_second: env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            session_secret: env::var("SESSION_SECRET").expect("SESSION_SECRET must be set"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            auth_redirect_location: env::var("AUTH_REDIRECT_LOCATION")
                .expect("AUTH_REDIRECT_LOCATION must be set"),
            support_contact_html: env::var("SUPPORT_CONTACT_HTML").unwrap_or_else(|_| {
                "please contact our <a href=\"mailto:help@example.org\" target=\"_blank\">Data Coordinator</a>."
                    .to_string()
            }),
            resend_verification_on_repeat: env::var("RESEND_VERIFICATION_ON_REPEAT_SIGNUP")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                == "true",
            token_config: TokenConfig::from_env(),
            directory: DirectoryConfig {
                vendor: DirectoryVendor::from_env(),
                timeout_seconds: env::var("DIRECTORY_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            auth_cookie: AuthCookieConfig {
                name: env::var("AUTH_COOKIE_NAME").expect("AUTH_COOKIE_NAME must be set"),
                domain: env::var("AUTH_COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
                max_age_weeks: env::var("AUTH_COOKIE_MAX_AGE_WEEKS")
                    .unwrap_or_else(|_| "52".to_string())
                    .parse()
                    .unwrap_or(52),
            },
            recaptcha: RecaptchaConfig {
                private_key: env::var("RECAPTCHA_PRIVATE_KEY").unwrap_or_default(),
                verify_url: env::var("RECAPTCHA_VERIFY_URL").unwrap_or_else(|_| {
                    "https://www.google.com/recaptcha/api/siteverify".to_string()
                }),
                bot_threshold: env::var("RECAPTCHA_BOT_THRESHOLD")
                    .unwrap_or_else(|_| "0.1".to_string())
                    .parse()
                    .expect("RECAPTCHA_BOT_THRESHOLD must be a valid number"),
                uncertain_threshold: env::var("RECAPTCHA_UNCERTAIN_THRESHOLD")
                    .unwrap_or_else(|_| "0.5".to_string())
                    .parse()
                    .expect("RECAPTCHA_UNCERTAIN_THRESHOLD must be a valid number"),
            },
            mail: MailConfig {
                api_url: env::var("MAIL_API_URL")
                    .unwrap_or_else(|_| "https://api.brevo.com/v3/smtp/email".to_string()),
                api_key: mail_api_key,
                sender_email: env::var("MAIL_SENDER_EMAIL")
                    .unwrap_or_else(|_| "no-reply@example.org".to_string()),
                sender_name: env::var("MAIL_SENDER_NAME").ok(),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
