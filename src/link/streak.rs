use chrono::NaiveDate;

use crate::date_util::{are_consecutive_days, is_within_last_n_days_on, today};

/// How recent a last activity must be, in days, to count as live.
const RECENT_DAYS: i64 = 1;

/// Unified streak length for a guest folding into a server account.
///
/// Checked in order:
/// 1. Guest streak empty or not recent: the server value stands.
/// 2. Server streak recent, non-zero, and consecutive with the guest's last
///    day: one unbroken streak, so the lengths add.
/// 3. Otherwise the server streak has lapsed and only the guest's counts.
pub fn merge_streak_on(
    server_streak: u32,
    server_last: Option<NaiveDate>,
    guest_streak: u32,
    guest_last: Option<NaiveDate>,
    today: NaiveDate,
) -> u32 {
    if guest_streak == 0 || !is_within_last_n_days_on(guest_last, RECENT_DAYS, today) {
        log::debug!("Guest streak {guest_streak} is stale or empty; keeping server streak {server_streak}");
        return server_streak;
    }

    if server_streak > 0
        && is_within_last_n_days_on(server_last, RECENT_DAYS, today)
        && are_consecutive_days(server_last, guest_last)
    {
        let merged = server_streak.saturating_add(guest_streak);
        log::debug!("Server streak {server_streak} continues into guest streak {guest_streak}: {merged}");
        return merged;
    }

    log::debug!("Server streak {server_streak} has lapsed; using guest streak {guest_streak}");
    guest_streak
}

/// [`merge_streak_on`] relative to the local calendar date.
pub fn merge_streak(
    server_streak: u32,
    server_last: Option<NaiveDate>,
    guest_streak: u32,
    guest_last: Option<NaiveDate>,
) -> u32 {
    merge_streak_on(server_streak, server_last, guest_streak, guest_last, today())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_continuous_streak_sums() {
        let server_last = Some(d(2024, 1, 14));
        let guest_last = Some(d(2024, 1, 15));
        assert_eq!(merge_streak_on(5, server_last, 3, guest_last, d(2024, 1, 15)), 8);
        // A day later the server day has lapsed
        assert_eq!(merge_streak_on(5, server_last, 3, guest_last, d(2024, 1, 16)), 3);
    }

    #[test]
    fn test_stale_server_yields_guest_only() {
        let today = d(2024, 1, 15);
        assert_eq!(merge_streak_on(5, Some(d(2024, 1, 1)), 3, Some(today), today), 3);
        assert_eq!(
            merge_streak_on(5, Some(d(2024, 1, 1)), 3, Some(d(2024, 1, 14)), today),
            3
        );
    }

    #[test]
    fn test_stale_guest_never_changes_server() {
        let today = d(2024, 1, 15);
        let stale = Some(d(2024, 1, 13));
        for (server_streak, server_last) in [
            (0, None),
            (5, Some(d(2024, 1, 14))),
            (7, Some(d(2023, 6, 1))),
            (2, Some(today)),
        ] {
            assert_eq!(merge_streak_on(server_streak, server_last, 4, stale, today), server_streak);
            assert_eq!(merge_streak_on(server_streak, server_last, 4, None, today), server_streak);
        }
    }

    #[test]
    fn test_empty_guest_never_changes_server() {
        let today = d(2024, 1, 15);
        assert_eq!(merge_streak_on(5, Some(d(2024, 1, 14)), 0, Some(today), today), 5);
        assert_eq!(merge_streak_on(0, None, 0, Some(today), today), 0);
    }

    #[test]
    fn test_server_absent_or_zero_yields_guest() {
        let today = d(2024, 1, 15);
        assert_eq!(merge_streak_on(0, None, 1, Some(today), today), 1);
        assert_eq!(merge_streak_on(0, Some(d(2024, 1, 14)), 2, Some(today), today), 2);
    }

    #[test]
    fn test_same_day_activity_sums() {
        let today = d(2024, 1, 15);
        assert_eq!(merge_streak_on(4, Some(today), 1, Some(today), today), 5);
    }

    #[test]
    fn test_recent_but_not_consecutive() {
        // Server clock ahead of ours: recent, but three days from the guest.
        let today = d(2024, 1, 15);
        assert_eq!(
            merge_streak_on(4, Some(d(2024, 1, 17)), 2, Some(d(2024, 1, 14)), today),
            2
        );
    }

    #[test]
    fn test_saturating_sum() {
        let today = d(2024, 1, 15);
        assert_eq!(merge_streak_on(u32::MAX, Some(today), 3, Some(today), today), u32::MAX);
    }

    #[test]
    fn test_merge_streak_uses_local_today() {
        let now = today();
        let yesterday = now - Duration::days(1);
        assert_eq!(merge_streak(4, Some(yesterday), 2, Some(now)), 6);
    }
}
