//! Pure business rules: derived-value calculations, status rules and the
//! filter builder. Everything here is unit-tested without a database.

pub mod attendance;
pub mod export;
pub mod filter;
pub mod gst;
pub mod leave;
pub mod payroll;
