use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TAX_RATE: &str = "0.10";
const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub server_port: u16,
    pub default_tax_rate: Decimal,
    pub notification_buffer: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, records will be kept in memory");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, falling back to anon key");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set or invalid, using {}", DEFAULT_PORT);
                    DEFAULT_PORT
                }),
            default_tax_rate: parse_tax_rate(env::var("DEFAULT_TAX_RATE").ok()),
            notification_buffer: env::var("NOTIFICATION_BUFFER")
                .ok()
                .and_then(|value| value.parse().ok())
                .filter(|size: &usize| *size > 0)
                .unwrap_or(DEFAULT_NOTIFICATION_BUFFER),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Token verification needs the shared JWT secret; everything else has a fallback.
    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
    }

    pub fn uses_remote_store(&self) -> bool {
        !self.supabase_url.is_empty() && !self.store_api_key().is_empty()
    }

    /// Key used for server-side PostgREST calls.
    pub fn store_api_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: String::new(),
            server_port: DEFAULT_PORT,
            default_tax_rate: parse_tax_rate(None),
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
        }
    }
}

fn parse_tax_rate(raw: Option<String>) -> Decimal {
    let fallback = Decimal::from_str(DEFAULT_TAX_RATE).unwrap_or(Decimal::ZERO);

    match raw {
        None => fallback,
        Some(value) => match Decimal::from_str(value.trim()) {
            Ok(rate) if rate >= Decimal::ZERO && rate <= Decimal::ONE => rate,
            _ => {
                warn!("DEFAULT_TAX_RATE '{}' is not a rate between 0 and 1, using {}", value, DEFAULT_TAX_RATE);
                fallback
            }
        },
    }
}
