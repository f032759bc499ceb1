use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "mini-mysql-redis",
    version,
    about = "mysql wire protocol adapter backed by redis."
)]
pub struct AdapterArgs {
    #[clap(long, value_name = "PORT", default_value_t = 3306)]
    pub port: u16,

    #[clap(
        long,
        value_name = "REDIS_URL",
        default_value = "redis://127.0.0.1:6379"
    )]
    pub redis_url: String,

    #[clap(long, value_name = "SCAN_LIMIT", default_value_t = 100)]
    pub scan_limit: usize,

    #[clap(long, value_name = "RATE_LIMIT", default_value_t = 100)]
    pub rate_limit: u64,

    #[clap(long, value_name = "RATE_WINDOW_SECONDS", default_value_t = 60)]
    pub rate_window: u64,

    #[clap(long, value_name = "ALLOW_SCAN", default_value_t = true, action = clap::ArgAction::Set)]
    pub allow_scan: bool,

    #[clap(long, value_name = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl AdapterArgs {
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
