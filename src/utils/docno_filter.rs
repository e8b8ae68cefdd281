use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real document volumes.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Fast duplicate pre-check for invoice/bill numbers. A negative answer is
/// definitive; a positive one falls through to the DB unique index, which
/// stays authoritative.
static DOCNO_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(doc_no: &str) -> String {
    doc_no.trim().to_uppercase()
}

/// Check if a document number might already exist (false positives possible)
pub fn might_exist(doc_no: &str) -> bool {
    let doc_no = normalize(doc_no);
    DOCNO_FILTER
        .read()
        .expect("docno filter poisoned")
        .contains(&doc_no)
}

/// Insert a single document number into the filter
pub fn insert(doc_no: &str) {
    let doc_no = normalize(doc_no);
    DOCNO_FILTER
        .write()
        .expect("docno filter poisoned")
        .add(&doc_no);
}

/// Warm up the filter from existing invoice and bill numbers,
/// streaming + batching.
pub async fn warmup_docno_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut total = 0usize;

    for sql in [
        "SELECT invoice_no FROM invoices",
        "SELECT bill_no FROM bills",
    ] {
        let mut stream = sqlx::query_as::<_, (String,)>(sql).fetch(pool);
        let mut batch = Vec::with_capacity(batch_size);

        while let Some(row) = stream.next().await {
            let (doc_no,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

            batch.push(normalize(&doc_no));
            total += 1;

            if batch.len() == batch_size {
                insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            insert_batch(&batch);
        }
    }

    tracing::info!(total, "Document-number filter warmup complete");
    Ok(())
}

/// Insert a batch of normalized document numbers
fn insert_batch(doc_nos: &[String]) {
    let mut filter = DOCNO_FILTER.write().expect("docno filter poisoned");

    for doc_no in doc_nos {
        filter.add(doc_no);
    }
}
