use till_agent::{Config, run, setup_environment};
use till_printer::{Dispatcher, PrintError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env, logging)
    setup_environment()?;

    tracing::info!("Till agent starting...");

    // 2. Configuration
    let config = Config::from_env().inspect_err(|e| tracing::error!("Invalid configuration: {}", e))?;

    // 3. Dispatcher
    let mut dispatcher = Dispatcher::system();
    if let Some(dir) = &config.scratch_dir {
        dispatcher = dispatcher.with_scratch_dir(dir);
    }

    // 4. Render and deliver
    match run(&config, &dispatcher).await {
        Ok(ack) => {
            tracing::info!(transport = %ack.transport, bytes = ack.bytes, "Job complete");
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<PrintError>() {
                Some(print_error) => {
                    tracing::error!(stage = %print_error.stage(), "Job failed: {:#}", e)
                }
                None => tracing::error!("Job failed: {:#}", e),
            }
            Err(e)
        }
    }
}
