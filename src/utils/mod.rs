pub mod balance_cache;
pub mod db_utils;
pub mod docno_filter;
