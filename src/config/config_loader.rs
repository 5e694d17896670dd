use crate::config::stage::Stage;
use anyhow::{Ok, Result};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = super::config_model::Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let stripe = super::config_model::StripeConfig {
        secret_key: std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY is invalid"),
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
        monthly_price_id: std::env::var("STRIPE_MONTHLY_PRICE_ID")
            .unwrap_or_else(|_| "price_xxx".to_string()),
        yearly_price_id: std::env::var("STRIPE_YEARLY_PRICE_ID")
            .unwrap_or_else(|_| "price_xxx".to_string()),
    };

    let record_store = super::config_model::RecordStoreConfig {
        base_url: std::env::var("RECORD_STORE_URL").expect("RECORD_STORE_URL is invalid"),
        api_key: std::env::var("RECORD_STORE_API_KEY").expect("RECORD_STORE_API_KEY is invalid"),
    };

    let app = super::config_model::App {
        base_url: std::env::var("APP_BASE_URL").expect("APP_BASE_URL is invalid"),
        debug_errors: std::env::var("DEBUG_ERRORS")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    };

    Ok(DotEnvyConfig {
        server,
        stripe,
        record_store,
        app,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_numeric_var_is_an_error() {
        unsafe {
            std::env::set_var("SERVER_PORT", "not-a-port");
            std::env::set_var("SERVER_BODY_LIMIT", "10");
            std::env::set_var("SERVER_TIMEOUT", "30");
            std::env::set_var("STRIPE_SECRET_KEY", "sk_test");
            std::env::set_var("RECORD_STORE_URL", "http://localhost:9000");
            std::env::set_var("RECORD_STORE_API_KEY", "test-key");
            std::env::set_var("APP_BASE_URL", "http://localhost:3000");
        }

        assert!(load().is_err());
    }
}
