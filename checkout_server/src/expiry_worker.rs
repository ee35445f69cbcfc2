use checkout_engine::{helpers::PricingConfig, CartApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the stale-cart sweep. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(db: SqliteDatabase, pricing: PricingConfig, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        let api = CartApi::new(db, pricing);
        info!("🕰️ Stale cart expiry worker started, sweeping every {interval_secs}s");
        loop {
            timer.tick().await;
            debug!("🕰️ Running stale cart sweep");
            match api.expire_stale_carts().await {
                Ok(0) => trace!("🕰️ No stale carts found"),
                Ok(n) => info!("🕰️ {n} stale carts reclaimed"),
                Err(e) => error!("🕰️ Error running stale cart sweep: {e}"),
            }
        }
    })
}
