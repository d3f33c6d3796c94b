use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

/// Mints a human-facing quote id: `prefix` + two-digit year + two-digit month
/// + four random digits, e.g. `UP25120438`.
pub fn mint_quote_id(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!(
        "{}{:02}{:02}{:04}",
        prefix,
        now.year().rem_euclid(100),
        now.month(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn quote_id_has_prefix_year_month_and_four_digits() {
        let now = Utc.with_ymd_and_hms(2025, 12, 3, 10, 0, 0).unwrap();
        let id = mint_quote_id("UP", now);

        assert_eq!(id.len(), 10);
        assert!(id.starts_with("UP2512"));
        assert!(id[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn single_digit_month_is_zero_padded() {
        let now = Utc.with_ymd_and_hms(2031, 3, 1, 0, 0, 0).unwrap();
        assert!(mint_quote_id("UP", now).starts_with("UP3103"));
    }
}
