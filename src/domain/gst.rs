use crate::domain::payroll::round2;

/// GST slabs currently notified; anything else is a data-entry error.
pub const GST_RATES: [f64; 5] = [0.0, 5.0, 12.0, 18.0, 28.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GstSplit {
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
}

/// Intra-state supply splits the tax evenly into CGST/SGST; inter-state
/// supply books the whole amount under IGST.
pub fn split_tax(tax: f64, customer_state: &str, company_state: &str) -> GstSplit {
    if customer_state == company_state {
        let half = round2(tax / 2.0);
        GstSplit {
            cgst: half,
            sgst: half,
            igst: 0.0,
        }
    } else {
        GstSplit {
            cgst: 0.0,
            sgst: 0.0,
            igst: round2(tax),
        }
    }
}

pub fn line_amount(quantity: f64, rate: f64) -> f64 {
    round2(quantity * rate)
}

pub fn line_tax(amount: f64, gst_rate: f64) -> f64 {
    round2(amount * gst_rate / 100.0)
}

pub fn is_valid_gst_rate(rate: f64) -> bool {
    GST_RATES.contains(&rate)
}

/// Light structural check: 15 chars, 2-digit state code prefix, alphanumeric.
pub fn is_valid_gstin(gstin: &str) -> bool {
    gstin.len() == 15
        && gstin.chars().all(|c| c.is_ascii_alphanumeric())
        && gstin[..2].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intra_state_splits_evenly() {
        let s = split_tax(180.0, "27", "27");
        assert_eq!(s.cgst, 90.0);
        assert_eq!(s.sgst, 90.0);
        assert_eq!(s.igst, 0.0);
    }

    #[test]
    fn inter_state_goes_to_igst() {
        let s = split_tax(180.0, "29", "27");
        assert_eq!(s.cgst, 0.0);
        assert_eq!(s.sgst, 0.0);
        assert_eq!(s.igst, 180.0);
    }

    #[test]
    fn line_math() {
        let amount = line_amount(3.0, 1250.5);
        assert_eq!(amount, 3751.5);
        assert_eq!(line_tax(amount, 18.0), 675.27);
    }

    #[test]
    fn only_notified_slabs_are_valid() {
        for r in GST_RATES {
            assert!(is_valid_gst_rate(r));
        }
        assert!(!is_valid_gst_rate(10.0));
        assert!(!is_valid_gst_rate(-5.0));
    }

    #[test]
    fn gstin_shape() {
        assert!(is_valid_gstin("27AAPFU0939F1ZV"));
        assert!(!is_valid_gstin("27AAPFU0939F1Z")); // 14 chars
        assert!(!is_valid_gstin("XXAAPFU0939F1ZV")); // no state prefix
        assert!(!is_valid_gstin("27AAPFU0939F1Z!"));
    }
}
