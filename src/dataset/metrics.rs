use super::DistrictRecord;

/// Round to one decimal place, ties to even.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Percentage change from `baseline` to `followup`, rounded to one decimal.
///
/// Returns `None` when `baseline` is zero; callers record `0.0` and flag
/// the row instead of dividing.
pub fn relative_change_pct(baseline: u32, followup: u32) -> Option<f64> {
    if baseline == 0 {
        return None;
    }
    let change = followup as f64 - baseline as f64;
    Some(round1(change / baseline as f64 * 100.0))
}

/// Build a record with its derived columns filled in.
pub fn derive_record(name: impl Into<String>, baseline: u32, followup: u32) -> DistrictRecord {
    let mut record = DistrictRecord {
        name: name.into(),
        baseline_value: baseline,
        followup_value: followup,
        absolute_change: 0,
        relative_change_pct: 0.0,
        zero_baseline: false,
    };
    recompute_record(&mut record);
    record
}

/// Re-derive `absolute_change`, `relative_change_pct` and `zero_baseline`
/// from the record's baseline and follow-up values.
pub fn recompute_record(record: &mut DistrictRecord) {
    record.absolute_change = record.followup_value as i64 - record.baseline_value as i64;
    match relative_change_pct(record.baseline_value, record.followup_value) {
        Some(pct) => {
            record.relative_change_pct = pct;
            record.zero_baseline = false;
        }
        None => {
            record.relative_change_pct = 0.0;
            record.zero_baseline = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forty_percent_increase() {
        let record = derive_record("A", 50, 70);
        assert_eq!(record.absolute_change, 20);
        assert_eq!(record.relative_change_pct, 40.0);
        assert!(!record.zero_baseline);
    }

    #[test]
    fn zero_baseline_is_guarded() {
        let record = derive_record("B", 0, 10);
        assert_eq!(record.absolute_change, 10);
        assert_eq!(record.relative_change_pct, 0.0);
        assert!(record.zero_baseline);
    }

    #[test]
    fn negative_change() {
        let record = derive_record("C", 80, 60);
        assert_eq!(record.absolute_change, -20);
        assert_eq!(record.relative_change_pct, -25.0);
    }

    #[test]
    fn rounds_to_one_decimal() {
        // 10 / 30 * 100 = 33.333...
        assert_eq!(relative_change_pct(30, 40), Some(33.3));
        // 5 / 60 * 100 = 8.333...
        assert_eq!(relative_change_pct(60, 65), Some(8.3));
        // 2 / 3 * 100 = 66.666...
        assert_eq!(relative_change_pct(3, 5), Some(66.7));
    }

    #[test]
    fn round1_ties_to_even() {
        assert_eq!(round1(0.25), 0.2);
        assert_eq!(round1(0.75), 0.8);
        assert_eq!(round1(-1.25), -1.2);
    }

    #[test]
    fn recompute_after_edit() {
        let mut record = derive_record("D", 40, 50);
        record.followup_value = 40;
        recompute_record(&mut record);
        assert_eq!(record.absolute_change, 0);
        assert_eq!(record.relative_change_pct, 0.0);

        record.baseline_value = 0;
        recompute_record(&mut record);
        assert!(record.zero_baseline);
    }
}
