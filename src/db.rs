use sqlx::MySqlPool;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

#[cfg(test)]
mod tests {
    const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

    // Employee rows own their HR children; deleting an employee must take
    // leave, payroll, attendance, reviews and compliance items with it.
    #[test]
    fn hr_child_tables_cascade_from_employees() {
        for fk in [
            "fk_leave_employee",
            "fk_payroll_employee",
            "fk_attendance_employee",
            "fk_review_employee",
            "fk_compliance_employee",
        ] {
            let pos = SCHEMA
                .find(fk)
                .unwrap_or_else(|| panic!("missing constraint {fk}"));
            let clause = &SCHEMA[pos..pos + 200.min(SCHEMA.len() - pos)];
            assert!(
                clause.contains("REFERENCES employees (id) ON DELETE CASCADE"),
                "{fk} must cascade from employees"
            );
        }
    }

    #[test]
    fn finance_child_tables_cascade_from_their_documents() {
        for (fk, parent) in [
            ("fk_invoice_items_invoice", "invoices"),
            ("fk_invoice_payments_invoice", "invoices"),
            ("fk_bill_items_bill", "bills"),
            ("fk_bill_payments_bill", "bills"),
        ] {
            let pos = SCHEMA
                .find(fk)
                .unwrap_or_else(|| panic!("missing constraint {fk}"));
            let clause = &SCHEMA[pos..pos + 200.min(SCHEMA.len() - pos)];
            assert!(
                clause.contains(&format!("REFERENCES {parent} (id) ON DELETE CASCADE")),
                "{fk} must cascade from {parent}"
            );
        }
    }
}
