pub mod streak;

use chrono::NaiveDate;

use crate::date_util::today;
use crate::progress::{level_for_experience, AccountKind, ProgressRecord};

pub use streak::{merge_streak, merge_streak_on};

/// Fold the device's current progress into a freshly authenticated server
/// record, returning the record to persist as the account's new state.
///
/// Only a guest `current` is merged. Absent or already-linked progress passes
/// the server record through with `account_kind` forced to `Linked`; callers
/// should still gate on [`ProgressRecord::is_guest`] rather than rely on that.
pub fn link_account_on(
    server: &ProgressRecord,
    current: Option<&ProgressRecord>,
    today: NaiveDate,
) -> ProgressRecord {
    let guest = match current {
        Some(c) if c.is_guest() => c,
        _ => {
            return ProgressRecord {
                account_kind: AccountKind::Linked,
                ..server.clone()
            };
        }
    };

    let experience_points = server
        .experience_points
        .saturating_add(guest.experience_points);
    let streak_length = merge_streak_on(
        server.streak_length,
        server.last_streak_activity_date,
        guest.streak_length,
        guest.last_streak_activity_date,
        today,
    );

    ProgressRecord {
        account_id: server.account_id.clone(),
        username: server.username.clone(),
        experience_points,
        level: level_for_experience(experience_points),
        streak_length,
        last_streak_activity_date: guest
            .last_streak_activity_date
            .or(server.last_streak_activity_date),
        account_kind: AccountKind::Linked,
    }
}

/// [`link_account_on`] relative to the local calendar date.
pub fn link_account(server: &ProgressRecord, current: Option<&ProgressRecord>) -> ProgressRecord {
    link_account_on(server, current, today())
}
