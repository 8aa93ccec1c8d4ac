/// Installs the global tracing subscriber: an env filter, a fmt layer and the
/// indicatif layer drawing progress bars for highway spans.
///
/// `RUST_LOG` wins over `default_filter`. Verbose runs lower the crate level
/// to `debug`.
#[cfg(feature = "logging")]
pub(crate) fn init_logging(default_filter: &str, verbose: bool) -> anyhow::Result<()> {
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        if verbose {
            EnvFilter::try_new(format!("{default_filter},highway=debug"))
        } else {
            EnvFilter::try_new(default_filter)
        }
    })?;

    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(indicatif_layer.get_stderr_writer()),
        )
        .with(indicatif_layer)
        .try_init()?;

    Ok(())
}

#[cfg(not(feature = "logging"))]
pub(crate) fn init_logging(_: &str, _: bool) -> anyhow::Result<()> {
    Ok(())
}
