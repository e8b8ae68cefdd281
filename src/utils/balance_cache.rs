use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Approved leave days per (employee_id, year). Reads on the balance
/// endpoint hit this first; approve/cancel invalidate the entry so the next
/// read recomputes from the DB.
static BALANCE_CACHE: Lazy<Cache<(u64, i32), u32>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(3600)) // 1h TTL as a backstop
        .build()
});

pub async fn get(employee_id: u64, year: i32) -> Option<u32> {
    BALANCE_CACHE.get(&(employee_id, year)).await
}

pub async fn put(employee_id: u64, year: i32, balance: u32) {
    BALANCE_CACHE.insert((employee_id, year), balance).await;
}

pub async fn invalidate(employee_id: u64, year: i32) {
    BALANCE_CACHE.invalidate(&(employee_id, year)).await;
}
