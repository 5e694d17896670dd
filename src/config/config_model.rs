#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub stripe: StripeConfig,
    pub record_store: RecordStoreConfig,
    pub app: App,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Absent in deployments that never configured webhooks; the webhook
    /// route reports a configuration error rather than failing startup.
    pub webhook_secret: Option<String>,
    pub monthly_price_id: String,
    pub yearly_price_id: String,
}

#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct App {
    /// Fallback origin for success/cancel/return URLs when the request
    /// carries no Origin header.
    pub base_url: String,
    /// Echo provider error detail in error responses. Off outside local
    /// stages.
    pub debug_errors: bool,
}
