use std::sync::Arc;
use std::thread;

use anyhow::Context;
use depth_quotes::{
    channel::QuoteChannel,
    config,
    dispatcher::{Dispatcher, LogOrder},
    ingestor::Ingestor,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();

    let config = config::read_config("config.yml")?;
    // the one channel every ingestor publishes into and the dispatcher drains
    let channel = Arc::new(QuoteChannel::with_capacity(config.channel_capacity)?);

    for (id, pair) in config.instrument_ids() {
        // a bad endpoint only costs this instrument, like any other ingestor failure
        match Ingestor::from_config(&config, id, pair, Arc::clone(&channel)) {
            Ok(ingestor) => {
                ingestor
                    .spawn()
                    .with_context(|| format!("failed to spawn ingestor for {pair}"))?;
            }
            Err(e) => tracing::error!(instrument = %pair, error = %e, "ingestor not started"),
        }
    }

    let mut dispatcher = Dispatcher::new(
        channel,
        config.instruments.clone(),
        config.dispatcher_backoff,
        LogOrder,
    );
    let handle = thread::Builder::new()
        .name("dispatcher".to_owned())
        .spawn(move || dispatcher.run())
        .context("failed to spawn dispatcher")?;

    // the dispatcher never returns; a join error means it panicked
    if handle.join().is_err() {
        anyhow::bail!("dispatcher panicked");
    }
    Ok(())
}
