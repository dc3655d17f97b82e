use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Experience points needed per level.
pub const XP_PER_LEVEL: u64 = 100;

/// Level for a cumulative experience total: `xp / 100 + 1`.
pub fn level_for_experience(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// Whether progress lives only on this device or is tied to a server account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Guest,
    Linked,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Linked => "linked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Self::Guest),
            "linked" => Some(Self::Linked),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One account's gamification state.
///
/// `level` is always derived from `experience_points`; deserializing a record
/// recomputes it rather than trusting the wire value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ProgressRecordWire")]
pub struct ProgressRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub experience_points: u64,
    pub level: u64,
    pub streak_length: u32,
    pub last_streak_activity_date: Option<NaiveDate>,
    pub account_kind: AccountKind,
}

/// Lenient server shape: everything but the identity may be missing.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecordWire {
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    experience_points: u64,
    #[serde(default)]
    level: Option<u64>,
    #[serde(default)]
    streak_length: u32,
    #[serde(default)]
    last_streak_activity_date: Option<NaiveDate>,
    #[serde(default = "default_wire_kind")]
    account_kind: AccountKind,
}

fn default_wire_kind() -> AccountKind {
    AccountKind::Linked
}

impl From<ProgressRecordWire> for ProgressRecord {
    fn from(w: ProgressRecordWire) -> Self {
        let level = level_for_experience(w.experience_points);
        if let Some(sent) = w.level.filter(|sent| *sent != level) {
            log::warn!(
                "Progress record level {sent} disagrees with {} XP; using level {level}",
                w.experience_points
            );
        }
        Self {
            account_id: w.account_id,
            username: w.username,
            experience_points: w.experience_points,
            level,
            streak_length: w.streak_length,
            last_streak_activity_date: w.last_streak_activity_date,
            account_kind: w.account_kind,
        }
    }
}

/// Result of adding experience to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExperienceGain {
    pub old_experience: u64,
    pub new_experience: u64,
    pub old_level: u64,
    pub new_level: u64,
}

impl ExperienceGain {
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

/// How a streak-qualifying activity changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityOutcome {
    /// First activity ever, or the previous streak had lapsed. Streak is now 1.
    Started,
    /// Activity on the day after the last one.
    Extended,
    /// Already counted for this day.
    AlreadyCounted,
    /// Dated before the last recorded activity; ignored.
    OutOfOrder,
}

impl ProgressRecord {
    /// Fresh guest progress for a device that has never signed in.
    pub fn guest() -> Self {
        Self {
            account_id: None,
            username: None,
            experience_points: 0,
            level: level_for_experience(0),
            streak_length: 0,
            last_streak_activity_date: None,
            account_kind: AccountKind::Guest,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.account_kind == AccountKind::Guest
    }

    /// Add experience and keep `level` in step.
    pub fn add_experience(&mut self, points: u64) -> ExperienceGain {
        let old_experience = self.experience_points;
        let old_level = self.level;
        self.experience_points = old_experience.saturating_add(points);
        self.level = level_for_experience(self.experience_points);
        ExperienceGain {
            old_experience,
            new_experience: self.experience_points,
            old_level,
            new_level: self.level,
        }
    }

    /// Record a streak-qualifying activity on `date`.
    pub fn record_activity(&mut self, date: NaiveDate) -> ActivityOutcome {
        let outcome = match self.last_streak_activity_date {
            Some(last) if date < last => return ActivityOutcome::OutOfOrder,
            Some(last) if date == last => return ActivityOutcome::AlreadyCounted,
            Some(last) if (date - last).num_days() == 1 && self.streak_length > 0 => {
                self.streak_length = self.streak_length.saturating_add(1);
                ActivityOutcome::Extended
            }
            _ => {
                self.streak_length = 1;
                ActivityOutcome::Started
            }
        };
        self.last_streak_activity_date = Some(date);
        outcome
    }
}
