use devserve::config::{Config, DEFAULT_CONFIG_FILE};
use devserve::logger;
use devserve::server::ShutdownOutcome;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let cfg = Config::load_from(&config_path)?;

    logger::init(&cfg.logging)?;

    // Single-threaded runtime; connections are spawned onto a LocalSet
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(devserve::run(cfg)) {
        Ok(ShutdownOutcome::Graceful) => Ok(()),
        Ok(ShutdownOutcome::TimedOut { .. }) => {
            // Dropping the runtime cancels whatever is still in flight
            runtime.shutdown_background();
            Ok(())
        }
        Err(e) => {
            logger::log_error(&e.to_string());
            Err(e.into())
        }
    }
}
