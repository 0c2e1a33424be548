//! Validity filters and the magnetic declination fix.

use tracing::{error, info};

use crate::model::{Table, Value};
use crate::schema::{columns, SubType, AZIMUTH_COLUMNS};

/// Row predicate on a single column value.
pub type Predicate = fn(&Value) -> bool;

/// Is `value` a number within `[min, max]`. Non-numeric values are not.
pub fn in_range(value: &Value, min: f64, max: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|number| min <= number && number <= max)
}

/// Dip or plunge in `[0, 90]`.
pub fn filter_dip(value: &Value) -> bool {
    in_range(value, 0.0, 90.0)
}

/// Dip direction or trend in `[0, 360]`.
pub fn filter_dip_dir(value: &Value) -> bool {
    in_range(value, 0.0, 360.0)
}

/// Validity rules applied to a sub-type before it is exported.
pub fn export_rules(sub_type: SubType) -> &'static [(&'static str, Predicate)] {
    match sub_type {
        SubType::Planar => &[
            (columns::DIP, filter_dip as Predicate),
            (columns::DIP_DIRECTION, filter_dip_dir as Predicate),
        ],
        SubType::Linear => &[
            (columns::PLUNGE, filter_dip as Predicate),
            (columns::DIRECTION, filter_dip_dir as Predicate),
        ],
        SubType::RockObservation | SubType::Sample | SubType::Texture | SubType::Image => &[],
    }
}

/// Keeps the rows for which every column predicate holds.
///
/// A rule naming a column the table lacks is logged and skipped, the table
/// passes through that step unfiltered.
pub fn filter_invalid_rows(table: &Table, rules: &[(&str, Predicate)]) -> Table {
    let mut filtered = table.clone();
    for (column, predicate) in rules {
        let Some(idx) = filtered.column_index(column) else {
            error!(
                table = table.name(),
                column = *column,
                "Cannot filter on a missing column, skipping the rule"
            );
            continue;
        };
        let rows_before = filtered.len();
        filtered = filtered.filter_rows(|row| predicate(&row[idx]));
        info!(
            table = table.name(),
            column = *column,
            rows_before,
            rows_after = filtered.len(),
            "Filtered invalid rows"
        );
    }
    filtered
}

/// Adds `declination` to a magnetic `azimuth`, wrapped back into `[0, 360]`.
///
/// Defined for `azimuth` in `[0, 360]` and `declination` in `[-360, 360]`,
/// where a single wrap step always suffices. Any other input is logged and
/// the azimuth is returned unchanged.
pub fn apply_declination_fix(azimuth: f64, declination: f64) -> f64 {
    if !(0.0..=360.0).contains(&azimuth) || !(-360.0..=360.0).contains(&declination) {
        error!(azimuth, declination, "Azimuth or declination out of range, not fixed");
        return azimuth;
    }
    let fixed = azimuth + declination;
    if fixed > 360.0 {
        fixed - 360.0
    } else if fixed < 0.0 {
        fixed + 360.0
    } else {
        fixed
    }
}

/// Applies the declination fix to every numeric azimuth column of `table`.
pub fn apply_declination_to_table(table: &mut Table, declination: f64) {
    if declination == 0.0 {
        return;
    }
    for column in AZIMUTH_COLUMNS {
        if !table.has_column(column) {
            continue;
        }
        let result = table.map_column(column, |value| match value.as_f64() {
            Some(azimuth) => Value::Real(apply_declination_fix(azimuth, declination)),
            None => value.clone(),
        });
        if let Err(err) = result {
            error!(column, "Declination fix skipped: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::with_captured_logs;

    #[test]
    fn test_declination_fix_wraps() {
        assert_eq!(apply_declination_fix(358.0, 8.0), 6.0);
        assert_eq!(apply_declination_fix(0.0, -8.0), 352.0);
        assert_eq!(apply_declination_fix(180.0, 8.0), 188.0);
        assert_eq!(apply_declination_fix(360.0, 360.0), 360.0);
        assert_eq!(apply_declination_fix(0.0, -360.0), 0.0);
    }

    #[test]
    fn test_declination_fix_stays_in_range() {
        for azimuth in (0..=360).step_by(15) {
            for declination in (-360..=360).step_by(20) {
                let fixed = apply_declination_fix(f64::from(azimuth), f64::from(declination));
                assert!(
                    (0.0..=360.0).contains(&fixed),
                    "{azimuth} + {declination} -> {fixed}"
                );
            }
        }
    }

    #[test]
    fn test_declination_fix_identity_out_of_domain() {
        let (fixed, logs) = with_captured_logs(|| apply_declination_fix(361.0, 8.0));
        assert_eq!(fixed, 361.0);
        assert!(logs.contains("out of range"));

        assert_eq!(apply_declination_fix(-1.0, 8.0), -1.0);
        assert_eq!(apply_declination_fix(10.0, 400.0), 10.0);
        assert!(apply_declination_fix(f64::NAN, 8.0).is_nan());
        assert_eq!(apply_declination_fix(10.0, f64::NAN), 10.0);
        assert_eq!(apply_declination_fix(10.0, f64::INFINITY), 10.0);
    }

    #[test]
    fn test_filter_dip_rows() {
        let table = Table::from_rows(
            "planars",
            vec!["DIP".to_string()],
            vec![
                vec![Value::Real(-1.0)],
                vec![Value::Real(45.0)],
                vec![Value::Real(91.0)],
            ],
        );
        let filtered = filter_invalid_rows(&table, &[("DIP", filter_dip)]);
        assert_eq!(filtered.rows(), &[vec![Value::Real(45.0)]]);
    }

    #[test]
    fn test_filter_rejects_non_numeric() {
        assert!(!filter_dip(&Value::Null));
        assert!(!filter_dip(&Value::from("45")));
        assert!(filter_dip(&Value::Integer(90)));
        assert!(filter_dip_dir(&Value::Integer(360)));
        assert!(!filter_dip_dir(&Value::Real(f64::NAN)));
    }

    #[test]
    fn test_filter_missing_column_passes_through() {
        let table = Table::from_rows(
            "linears",
            vec!["DIRECTION".to_string()],
            vec![vec![Value::Real(500.0)], vec![Value::Real(10.0)]],
        );
        let (filtered, logs) = with_captured_logs(|| {
            filter_invalid_rows(&table, export_rules(SubType::Linear))
        });
        // PLUNGE is missing, DIRECTION still applies
        assert_eq!(filtered.len(), 1);
        assert!(logs.contains("missing column"));
    }

    #[test]
    fn test_declination_on_table() {
        let mut table = Table::from_rows(
            "planars",
            vec!["DIP".to_string(), "DIRECTION_OF_DIP".to_string()],
            vec![
                vec![Value::Real(30.0), Value::Real(358.0)],
                vec![Value::Real(30.0), Value::Null],
            ],
        );
        apply_declination_to_table(&mut table, 8.0);
        assert_eq!(table.value(0, "DIRECTION_OF_DIP"), Some(&Value::Real(6.0)));
        assert_eq!(table.value(0, "DIP"), Some(&Value::Real(30.0)));
        assert_eq!(table.value(1, "DIRECTION_OF_DIP"), Some(&Value::Null));
    }
}
