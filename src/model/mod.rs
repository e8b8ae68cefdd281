pub mod attendance;
pub mod bill;
pub mod compliance;
pub mod customer_address;
pub mod employee;
pub mod export_job;
pub mod invoice;
pub mod leave_request;
pub mod payroll;
pub mod performance_review;
pub mod role;
