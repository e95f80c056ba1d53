use std::sync::Arc;

use mtb_core::{
    clock::SystemClock, config::Config, storage::JsonDirStore, store::Store, Marketplace,
};

#[tokio::main]
async fn main() -> Result<(), mtb_core::Error> {
    mtb_core::logging::init("mtb")?;

    let cfg = Arc::new(Config::load()?);

    tokio::fs::create_dir_all(&cfg.data_dir).await?;
    let kv = Arc::new(JsonDirStore::new(cfg.data_dir.clone()));
    let store = Arc::new(Store::load(kv).await);

    let market = Arc::new(Marketplace::new(
        cfg.clone(),
        store,
        Arc::new(SystemClock),
    ));

    mtb_telegram::router::run_polling(cfg, market)
        .await
        .map_err(|e| mtb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
