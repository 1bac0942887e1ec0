use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "cosproxy", about = "OpenAI-compatible proxy for the Cosine chat API")]
pub struct Cli {
    /// Bind host.
    #[arg(long, env = "COSPROXY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port.
    #[arg(long, env = "COSPROXY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Database DSN (sqlite/mysql/postgres). Empty selects a sqlite file
    /// next to the executable.
    #[arg(long, env = "COSPROXY_DSN", default_value = "")]
    pub dsn: String,

    /// Key required on the x-admin-key header of /admin routes.
    #[arg(long, env = "COSPROXY_ADMIN_KEY")]
    pub admin_key: String,

    /// Base URL of the Cosine upstream.
    #[arg(long, env = "COSPROXY_UPSTREAM_URL", default_value = "https://api.cosine.sh")]
    pub upstream_url: String,
}
