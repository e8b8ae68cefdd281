use crate::api::attendance::{AttendanceListResponse, AttendanceQuery, RecordAttendance};
use crate::api::bill::{
    BillDetail, BillListResponse, BillQuery, CreateBill, CreateBillItem, UpdateBill,
};
use crate::api::compliance::{
    BulkCreateCompliance, BulkCreateResult, BulkItemError, ComplianceListResponse,
    ComplianceQuery, CreateCompliance, UpdateCompliance,
};
use crate::api::customer_address::{AddressListResponse, AddressQuery, CreateCustomerAddress};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::export_job::{CreateExport, ExportFilters, ExportListResponse, ExportQuery};
use crate::api::invoice::{
    CreateInvoice, CreateInvoiceItem, InvoiceDetail, InvoiceListResponse, InvoiceQuery,
    RecordPayment, TransitionRequest, UpdateInvoice,
};
use crate::api::leave_request::{
    CreateLeave, DecideLeave, LeaveBalanceResponse, LeaveFilter, LeaveListResponse, UpdateLeave,
};
use crate::api::payroll::{CreatePayroll, PaginatedPayrollResponse, PayrollQuery, UpdatePayroll};
use crate::api::performance_review::{
    CompleteReview, CreateReview, ReviewListResponse, ReviewQuery, UpdateReview,
};
use crate::model::attendance::AttendanceStatus;
use crate::model::compliance::{ComplianceStatus, ComplianceType};
use crate::model::employee::Employee;
use crate::model::export_job::{ExportFormat, ExportSource, ExportStatus};
use crate::model::invoice::DocumentStatus;
use crate::model::leave_request::{LeaveStatus, LeaveType};
use crate::model::payroll::PayrollStatus;
use crate::model::performance_review::ReviewStatus;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ERP System API",
        version = "1.0.0",
        description = r#"
## Enterprise Resource Planning (ERP) System

This API powers an **ERP** system covering HR operations and GST-compliant finance.

### 🔹 Key Features
- **Employee Management**
  - Create, update, list, and view employee profiles
- **Leave Management**
  - Apply for leave, approve/reject/cancel requests, and check remaining balance
- **Attendance Management**
  - Daily check-in/check-out tracking with late detection and overtime
- **Payroll Management**
  - Draft, process, and pay monthly payroll with derived gross/net figures
- **Performance Reviews**
  - Periodic reviews with 1-5 ratings, employee comments, and HR approval
- **Compliance Tracking**
  - Trainings, certifications, and documents with expiry sweeps
- **Finance**
  - GST invoices and vendor bills with CGST/SGST/IGST split, payments,
    customer addresses, and CSV/spreadsheet/print exports

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Sensitive operations require **Admin**, **HR**, or **Manager** roles.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::leave_balance,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::record_attendance,
        crate::api::attendance::list_attendance,

        crate::api::payroll::create_payroll,
        crate::api::payroll::update_payroll,
        crate::api::payroll::process_payroll,
        crate::api::payroll::cancel_payroll,
        crate::api::payroll::get_payroll,
        crate::api::payroll::list_payrolls,

        crate::api::performance_review::create_review,
        crate::api::performance_review::list_reviews,
        crate::api::performance_review::get_review,
        crate::api::performance_review::update_review,
        crate::api::performance_review::complete_review,
        crate::api::performance_review::approve_review,
        crate::api::performance_review::delete_review,

        crate::api::compliance::create_compliance,
        crate::api::compliance::bulk_create_compliance,
        crate::api::compliance::list_compliance,
        crate::api::compliance::get_compliance,
        crate::api::compliance::update_compliance,
        crate::api::compliance::complete_compliance,
        crate::api::compliance::sweep_expired,

        crate::api::invoice::create_invoice,
        crate::api::invoice::list_invoices,
        crate::api::invoice::get_invoice,
        crate::api::invoice::update_invoice,
        crate::api::invoice::transition_invoice,
        crate::api::invoice::add_invoice_payment,

        crate::api::bill::create_bill,
        crate::api::bill::list_bills,
        crate::api::bill::get_bill,
        crate::api::bill::update_bill,
        crate::api::bill::transition_bill,
        crate::api::bill::add_bill_payment,

        crate::api::customer_address::create_address,
        crate::api::customer_address::list_addresses,
        crate::api::customer_address::delete_address,

        crate::api::export_job::create_export,
        crate::api::export_job::list_exports,
        crate::api::export_job::get_export,
        crate::api::export_job::download_export,
        crate::api::export_job::cancel_export,
    ),
    components(
        schemas(
            Employee,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,

            LeaveType,
            LeaveStatus,
            CreateLeave,
            UpdateLeave,
            DecideLeave,
            LeaveFilter,
            LeaveListResponse,
            LeaveBalanceResponse,

            AttendanceStatus,
            RecordAttendance,
            AttendanceQuery,
            AttendanceListResponse,

            PayrollStatus,
            CreatePayroll,
            UpdatePayroll,
            PayrollQuery,
            PaginatedPayrollResponse,

            ReviewStatus,
            CreateReview,
            UpdateReview,
            CompleteReview,
            ReviewQuery,
            ReviewListResponse,

            ComplianceType,
            ComplianceStatus,
            CreateCompliance,
            BulkCreateCompliance,
            BulkCreateResult,
            BulkItemError,
            UpdateCompliance,
            ComplianceQuery,
            ComplianceListResponse,

            DocumentStatus,
            CreateInvoice,
            CreateInvoiceItem,
            UpdateInvoice,
            TransitionRequest,
            RecordPayment,
            InvoiceQuery,
            InvoiceListResponse,
            InvoiceDetail,

            CreateBill,
            CreateBillItem,
            UpdateBill,
            BillQuery,
            BillListResponse,
            BillDetail,

            CreateCustomerAddress,
            AddressQuery,
            AddressListResponse,

            ExportFormat,
            ExportSource,
            ExportStatus,
            ExportFilters,
            CreateExport,
            ExportQuery,
            ExportListResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Payroll", description = "Payroll management APIs"),
        (name = "Performance", description = "Performance review APIs"),
        (name = "Compliance", description = "Compliance tracking APIs"),
        (name = "Invoices", description = "GST sales invoice APIs"),
        (name = "Bills", description = "Vendor bill APIs"),
        (name = "Customer Addresses", description = "Customer billing address APIs"),
        (name = "Exports", description = "Export and print job APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
