pub mod date_util;
pub mod error;
pub mod link;
pub mod progress;
pub mod storage;

pub use error::{Error, Result};
pub use link::{link_account, link_account_on, merge_streak, merge_streak_on};
pub use progress::{
    level_for_experience, AccountKind, ActivityOutcome, ExperienceGain, ProgressRecord,
};
pub use storage::repository::LinkEvent;
pub use storage::Database;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;

use storage::repository;

/// Outcome of linking this device's progress to a server account.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub record: ProgressRecord,
    /// False when there was no guest progress to fold in.
    pub merged_guest: bool,
    pub guest_experience: u64,
    pub server_experience: u64,
}

/// Owns the device's progress store and the account-link sequence.
pub struct GlucoQuest {
    db: Database,
    link_guard: Mutex<()>,
}

impl GlucoQuest {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            link_guard: Mutex::new(()),
        }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Progress ───────────────────────────────────────────────────

    /// The record local activity applies to: the linked record once there
    /// is one, otherwise the guest record, created empty on first use.
    pub async fn active_progress(&self) -> Result<ProgressRecord> {
        let record = self
            .db
            .writer()
            .call(|conn| {
                let tx = conn.transaction()?;
                let record = load_or_create_active(&tx)?;
                tx.commit()?;
                Ok::<ProgressRecord, rusqlite::Error>(record)
            })
            .await?;
        Ok(record)
    }

    /// Add experience to the active record.
    pub async fn add_experience(&self, points: u64) -> Result<ExperienceGain> {
        let gain = self
            .db
            .writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut record = load_or_create_active(&tx)?;
                let gain = record.add_experience(points);
                repository::put_progress(&tx, &record)?;
                tx.commit()?;
                Ok::<ExperienceGain, rusqlite::Error>(gain)
            })
            .await?;

        if gain.leveled_up() {
            log::info!("Level up: {} -> {}", gain.old_level, gain.new_level);
        }
        Ok(gain)
    }

    /// Record a streak-qualifying activity on `date` against the active record.
    pub async fn record_activity(
        &self,
        date: NaiveDate,
    ) -> Result<(ActivityOutcome, ProgressRecord)> {
        let (outcome, record) = self
            .db
            .writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut record = load_or_create_active(&tx)?;
                let outcome = record.record_activity(date);
                if outcome != ActivityOutcome::OutOfOrder {
                    repository::put_progress(&tx, &record)?;
                }
                tx.commit()?;
                Ok::<_, rusqlite::Error>((outcome, record))
            })
            .await?;

        if outcome == ActivityOutcome::OutOfOrder {
            log::warn!(
                "Ignoring activity on {date}; last activity was {:?}",
                record.last_streak_activity_date
            );
        }
        Ok((outcome, record))
    }

    // ── Account link ───────────────────────────────────────────────

    /// Merge any guest progress into `server` and make the result the linked
    /// record, deleting the guest row in the same transaction.
    ///
    /// Only one link may run at a time per instance; a concurrent call fails
    /// with [`Error::LinkInProgress`] instead of waiting.
    pub async fn link(&self, server: ProgressRecord) -> Result<LinkReport> {
        self.link_on(server, date_util::today()).await
    }

    /// [`GlucoQuest::link`] with an explicit reference date.
    pub async fn link_on(&self, server: ProgressRecord, today: NaiveDate) -> Result<LinkReport> {
        let _guard = self
            .link_guard
            .try_lock()
            .map_err(|_| Error::LinkInProgress)?;

        let report = self
            .db
            .writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let guest = repository::get_progress(&tx, AccountKind::Guest)?;
                let record = link::link_account_on(&server, guest.as_ref(), today);
                let merged_guest = guest.is_some();
                let guest_experience = guest.map_or(0, |g| g.experience_points);

                repository::put_progress(&tx, &record)?;
                repository::delete_progress(&tx, AccountKind::Guest)?;
                repository::insert_link_event(
                    &tx,
                    record.account_id.as_deref(),
                    merged_guest,
                    guest_experience,
                    server.experience_points,
                    record.experience_points,
                    record.streak_length,
                    today,
                )?;
                if let Some(id) = &record.account_id {
                    repository::set_config(&tx, "linked_account_id", id)?;
                }
                tx.commit()?;

                Ok::<LinkReport, rusqlite::Error>(LinkReport {
                    record,
                    merged_guest,
                    guest_experience,
                    server_experience: server.experience_points,
                })
            })
            .await?;

        log::info!(
            "Linked account {}: {} XP (guest {}, server {}), streak {}",
            report.record.account_id.as_deref().unwrap_or("<unknown>"),
            report.record.experience_points,
            report.guest_experience,
            report.server_experience,
            report.record.streak_length,
        );
        Ok(report)
    }

    /// Every completed link on this device, oldest first.
    pub async fn link_history(&self) -> Result<Vec<LinkEvent>> {
        self.db
            .reader()
            .call(|conn| repository::list_link_events(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Config ─────────────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

fn load_or_create_active(
    conn: &rusqlite::Connection,
) -> std::result::Result<ProgressRecord, rusqlite::Error> {
    if let Some(linked) = repository::get_progress(conn, AccountKind::Linked)? {
        return Ok(linked);
    }
    if let Some(guest) = repository::get_progress(conn, AccountKind::Guest)? {
        return Ok(guest);
    }
    log::debug!("No local progress yet; starting a guest record");
    let guest = ProgressRecord::guest();
    repository::put_progress(conn, &guest)?;
    Ok(guest)
}
