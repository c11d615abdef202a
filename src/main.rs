use anyhow::Context;
use newsletter_subscriptions::{
    configuration::get_configuration,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        "newsletter-subscriptions".into(),
        "info".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber).map_err(|e| anyhow::anyhow!(e))?;

    let config = get_configuration().context("Failed to read configuration")?;
    let application = Application::build(config).await?;
    tracing::info!(port = application.port(), "Listening for subscription requests");

    if let Err(e) = application.run_until_stopped().await {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "API failed"
        );
        return Err(e.into());
    }
    tracing::info!("API has exited");

    Ok(())
}
