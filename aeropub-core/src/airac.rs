// Copyright 2025 Aeropub (https://github.com/aeropub)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! AIRAC cycle arithmetic.
//!
//! Aeronautical information is published on a fixed 28-day cadence. Cycle
//! identifiers here are `"YYYY-NN"` where NN is the 1-based 28-day window
//! within the year.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of one AIRAC cycle in days. Also the review window granted to an
/// approval workflow before a document's effective date.
pub const REVIEW_CYCLE_DAYS: i64 = 28;

/// One upcoming publication window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleInfo {
    pub cycle: String,
    pub effective_date: DateTime<Utc>,
}

/// Cycle identifier for the window containing `date`.
pub fn cycle_for_date(date: DateTime<Utc>) -> String {
    let cycle_number = date.ordinal0() / REVIEW_CYCLE_DAYS as u32 + 1;
    format!("{}-{:02}", date.year(), cycle_number)
}

/// The next `count` publication windows starting from `from`, at 28-day
/// strides.
pub fn upcoming_cycles(from: DateTime<Utc>, count: usize) -> Vec<CycleInfo> {
    (0..count)
        .map(|i| {
            let effective_date = from + Duration::days(i as i64 * REVIEW_CYCLE_DAYS);
            CycleInfo {
                cycle: cycle_for_date(effective_date),
                effective_date,
            }
        })
        .collect()
}

/// Check a cycle identifier against the `"YYYY-NN"` format.
pub fn is_valid_cycle(cycle: &str) -> bool {
    let Some((year, number)) = cycle.split_once('-') else {
        return false;
    };
    if year.len() != 4 || number.len() != 2 {
        return false;
    }
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match number.parse::<u32>() {
        // 366 days / 28 = at most 14 windows per year
        Ok(n) => (1..=14).contains(&n),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cycle_identifier_for_known_dates() {
        let jan = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(cycle_for_date(jan), "2025-01");

        // Day 30 of the year falls in the second 28-day window.
        let feb = Utc.with_ymd_and_hms(2025, 1, 30, 0, 0, 0).unwrap();
        assert_eq!(cycle_for_date(feb), "2025-02");
    }

    #[test]
    fn upcoming_cycles_stride_by_28_days() {
        let from = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let cycles = upcoming_cycles(from, 3);
        assert_eq!(cycles.len(), 3);
        assert_eq!(cycles[0].effective_date, from);
        assert_eq!(
            cycles[1].effective_date - cycles[0].effective_date,
            Duration::days(REVIEW_CYCLE_DAYS)
        );
        assert_eq!(cycles[0].cycle, "2025-01");
        assert_eq!(cycles[1].cycle, "2025-02");
    }

    #[test]
    fn cycle_format_validation() {
        assert!(is_valid_cycle("2025-07"));
        assert!(is_valid_cycle("2025-14"));
        assert!(!is_valid_cycle("2025-00"));
        assert!(!is_valid_cycle("2025-15"));
        assert!(!is_valid_cycle("25-07"));
        assert!(!is_valid_cycle("2025/07"));
        assert!(!is_valid_cycle("202507"));
        assert!(!is_valid_cycle(""));
    }
}
