//! Upcoming-birthday matching with calendar wraparound
//!
//! A birthday "falls within the next N days" when its month-day lands in the
//! inclusive window `[today, today + days]`, compared cyclically so a window
//! opened in late December keeps matching into January.
//!
//! Day-of-year ordinals are assigned in a fixed leap reference year, so
//! Feb 29 always maps to ordinal 60 and Mar 1 to 61 regardless of the year
//! `today` happens to fall in. Feb-29 birthdays therefore never vanish in
//! non-leap years: any window covering Feb 28 through Mar 1 matches them.

use chrono::{Datelike, Days, NaiveDate};

use crate::db::Contact;
use crate::{Error, Result};

/// Leap year used to assign stable day-of-year ordinals
const REFERENCE_YEAR: i32 = 2000;

/// Length of the reference year, the modulus for cyclic offsets
const REFERENCE_YEAR_DAYS: i64 = 366;

/// Find contacts whose birthday falls within `[today, today + days]`,
/// month-day only, wrapping across the year boundary.
///
/// The result is ordered by how soon each birthday comes up (cyclic offset
/// from `today`), with ties broken by `(name, surname)` and then input order,
/// so repeated calls over identical input are deterministic.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` when `days < 1` or the window end does
/// not fit in the calendar
pub fn find_upcoming_birthdays(
    contacts: Vec<Contact>,
    today: NaiveDate,
    days: i64,
) -> Result<Vec<Contact>> {
    if days < 1 {
        return Err(Error::InvalidArgument(format!(
            "days must be at least 1, got {days}"
        )));
    }

    let end = today
        .checked_add_days(Days::new(days.unsigned_abs()))
        .ok_or_else(|| {
            Error::InvalidArgument(format!("window of {days} days overflows the calendar"))
        })?;

    let t = day_of_year(today);
    let e = day_of_year(end);

    let mut matched: Vec<(i64, Contact)> = contacts
        .into_iter()
        .filter_map(|contact| {
            let b = day_of_year(contact.birthday);
            let hit = if e >= t {
                t <= b && b <= e
            } else {
                // Window wraps past year-end
                b >= t || b <= e
            };
            hit.then(|| ((b - t).rem_euclid(REFERENCE_YEAR_DAYS), contact))
        })
        .collect();

    matched.sort_by(|(offset_a, a), (offset_b, b)| {
        offset_a
            .cmp(offset_b)
            .then_with(|| (a.name.as_str(), a.surname.as_str()).cmp(&(b.name.as_str(), b.surname.as_str())))
    });

    Ok(matched.into_iter().map(|(_, contact)| contact).collect())
}

/// Day-of-year ordinal of a date's month-day in the leap reference year
fn day_of_year(date: NaiveDate) -> i64 {
    NaiveDate::from_ymd_opt(REFERENCE_YEAR, date.month(), date.day())
        .map_or_else(|| i64::from(date.ordinal()), |d| i64::from(d.ordinal()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn contact(name: &str, birthday: NaiveDate) -> Contact {
        Contact {
            id: format!("id-{name}"),
            user_id: "user".to_string(),
            name: name.to_string(),
            surname: "Test".to_string(),
            email: format!("{name}@example.com"),
            phone: format!("+1{name}"),
            birthday,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn names(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_birthday_today_always_included() {
        let today = date(2025, 6, 15);
        for days in [1, 7, 30] {
            let result =
                find_upcoming_birthdays(vec![contact("today", date(1990, 6, 15))], today, days)
                    .unwrap();
            assert_eq!(names(&result), ["today"], "days={days}");
        }
    }

    #[test]
    fn test_window_end_inclusive() {
        let today = date(2025, 6, 15);
        let result = find_upcoming_birthdays(
            vec![
                contact("at-end", date(1990, 6, 22)),
                contact("past-end", date(1990, 6, 23)),
            ],
            today,
            7,
        )
        .unwrap();
        assert_eq!(names(&result), ["at-end"]);
    }

    #[test]
    fn test_tomorrow_with_one_day_window() {
        let today = date(2025, 6, 15);
        let result = find_upcoming_birthdays(
            vec![
                contact("tomorrow", date(1985, 6, 16)),
                contact("day-after", date(1985, 6, 17)),
            ],
            today,
            1,
        )
        .unwrap();
        assert_eq!(names(&result), ["tomorrow"]);
    }

    #[test]
    fn test_year_wraparound() {
        // Dec 28 + 7 days -> window ends Jan 4
        let today = date(2025, 12, 28);
        let result = find_upcoming_birthdays(
            vec![
                contact("jan-2", date(1990, 1, 2)),
                contact("dec-20", date(1990, 12, 20)),
                contact("dec-30", date(1990, 12, 30)),
                contact("jan-4", date(1990, 1, 4)),
                contact("jan-5", date(1990, 1, 5)),
            ],
            today,
            7,
        )
        .unwrap();
        assert_eq!(names(&result), ["dec-30", "jan-2", "jan-4"]);
    }

    #[test]
    fn test_ordered_by_offset_from_window_start() {
        // Across the year boundary the January birthdays sort after December
        // ones even though their raw ordinals are smaller
        let today = date(2025, 12, 28);
        let result = find_upcoming_birthdays(
            vec![
                contact("jan-1", date(1990, 1, 1)),
                contact("dec-29", date(1990, 12, 29)),
                contact("dec-28", date(1990, 12, 28)),
            ],
            today,
            7,
        )
        .unwrap();
        assert_eq!(names(&result), ["dec-28", "dec-29", "jan-1"]);
    }

    #[test]
    fn test_ties_broken_by_name() {
        let today = date(2025, 6, 15);
        let result = find_upcoming_birthdays(
            vec![
                contact("zoe", date(1990, 6, 16)),
                contact("amy", date(1985, 6, 16)),
            ],
            today,
            7,
        )
        .unwrap();
        assert_eq!(names(&result), ["amy", "zoe"]);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let today = date(2025, 12, 28);
        let input = vec![
            contact("jan-2", date(1990, 1, 2)),
            contact("dec-30", date(1990, 12, 30)),
            contact("dec-28", date(1990, 12, 28)),
        ];

        let first = find_upcoming_birthdays(input.clone(), today, 7).unwrap();
        let second = find_upcoming_birthdays(input, today, 7).unwrap();
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_empty_input() {
        let result = find_upcoming_birthdays(vec![], date(2025, 6, 15), 7).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_invalid_days_rejected() {
        for days in [0, -1, -30] {
            let err = find_upcoming_birthdays(vec![], date(2025, 6, 15), days).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "days={days}");
        }
    }

    #[test]
    fn test_feb_29_matches_in_non_leap_year() {
        // 2025 is not a leap year; a window covering Feb 28 -> Mar 1 must
        // still pick up the Feb-29 birthday
        let today = date(2025, 2, 28);
        let result = find_upcoming_birthdays(
            vec![contact("leapling", date(1992, 2, 29))],
            today,
            1,
        )
        .unwrap();
        assert_eq!(names(&result), ["leapling"]);
    }

    #[test]
    fn test_no_ordinal_shift_after_leap_day() {
        // In a leap year, a March birthday keeps the same offset from a
        // March reference day as in a non-leap year
        let input = vec![contact("mar-5", date(1990, 3, 5))];

        let leap = find_upcoming_birthdays(input.clone(), date(2024, 3, 1), 7).unwrap();
        let non_leap = find_upcoming_birthdays(input, date(2025, 3, 1), 7).unwrap();
        assert_eq!(names(&leap), ["mar-5"]);
        assert_eq!(names(&non_leap), ["mar-5"]);
    }

    #[test]
    fn test_window_spanning_leap_day_in_non_leap_year() {
        // Feb 27 + 3 days in a non-leap year ends Mar 2; Mar-1 and Mar-2
        // birthdays are in, Mar-3 is out
        let today = date(2025, 2, 27);
        let result = find_upcoming_birthdays(
            vec![
                contact("mar-1", date(1990, 3, 1)),
                contact("mar-2", date(1990, 3, 2)),
                contact("mar-3", date(1990, 3, 3)),
            ],
            today,
            3,
        )
        .unwrap();
        assert_eq!(names(&result), ["mar-1", "mar-2"]);
    }
}
