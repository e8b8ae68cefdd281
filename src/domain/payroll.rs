/// Earning and deduction components of one payroll run.
///
/// Gross and net are always derived server-side from these inputs, never
/// accepted from the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayComponents {
    pub basic_salary: f64,
    pub allowances: f64,
    pub overtime: f64,
    pub bonus: f64,
    pub commission: f64,
    pub deductions: f64,
    pub tax_deduction: f64,
    pub provident_fund: f64,
    pub insurance: f64,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn gross_salary(c: &PayComponents) -> f64 {
    round2(c.basic_salary + c.allowances + c.overtime + c.bonus + c.commission)
}

/// Net never goes below zero even when deductions exceed earnings.
pub fn net_salary(c: &PayComponents) -> f64 {
    let net = gross_salary(c)
        - c.deductions
        - c.tax_deduction
        - c.provident_fund
        - c.insurance;
    round2(net.max(0.0))
}

pub fn validate_components(c: &PayComponents) -> Result<(), &'static str> {
    let all = [
        c.basic_salary,
        c.allowances,
        c.overtime,
        c.bonus,
        c.commission,
        c.deductions,
        c.tax_deduction,
        c.provident_fund,
        c.insurance,
    ];
    if all.iter().any(|v| *v < 0.0 || !v.is_finite()) {
        return Err("Salary components must be non-negative numbers");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_is_the_sum_of_earnings() {
        let c = PayComponents {
            basic_salary: 50000.0,
            allowances: 5000.0,
            overtime: 1200.0,
            bonus: 3000.0,
            commission: 800.0,
            ..Default::default()
        };
        assert_eq!(gross_salary(&c), 60000.0);
    }

    #[test]
    fn march_payroll_scenario() {
        // basic 50000 + allowances 5000, deductions 2000 + tax 3000
        let c = PayComponents {
            basic_salary: 50000.0,
            allowances: 5000.0,
            deductions: 2000.0,
            tax_deduction: 3000.0,
            ..Default::default()
        };
        assert_eq!(gross_salary(&c), 55000.0);
        assert_eq!(net_salary(&c), 50000.0);
    }

    #[test]
    fn net_is_floored_at_zero() {
        let c = PayComponents {
            basic_salary: 1000.0,
            deductions: 800.0,
            tax_deduction: 300.0,
            provident_fund: 200.0,
            ..Default::default()
        };
        assert_eq!(net_salary(&c), 0.0);
    }

    #[test]
    fn totals_round_to_two_decimals() {
        let c = PayComponents {
            basic_salary: 33333.335,
            allowances: 0.004,
            ..Default::default()
        };
        assert_eq!(gross_salary(&c), 33333.34);
    }

    #[test]
    fn negative_components_are_rejected() {
        let c = PayComponents {
            basic_salary: -1.0,
            ..Default::default()
        };
        assert!(validate_components(&c).is_err());
        assert!(validate_components(&PayComponents::default()).is_ok());
    }
}
