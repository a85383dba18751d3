use civic::config::Config;
use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if config.auth_secret.is_none() {
        error!("AUTH_SECRET is not set; sign-in will fail until it is configured");
    }

    if let Err(e) = civic::server::run(config).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
