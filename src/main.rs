fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = gri_lib::commands::settings::load_effective_settings()
        .map_err(|e| anyhow::anyhow!("invalid settings: {e}"))?;
    log::info!(
        "Tracking {} DAOs, polling every {}s via {}",
        settings.indexer.tracked_daos.len(),
        settings.poll_interval.as_secs(),
        settings.rpc_url
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(gri_lib::run(settings))
}
