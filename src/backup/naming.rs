//! Snapshot file naming
//!
//! Snapshots are named `<prefix><YYYYMMDD_HHMMSS_mmm><extension>`, so a plain
//! string sort orders them by creation time. Safety snapshots taken before a
//! restore use the fixed `before_restore_` prefix and never match the
//! primary listing.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};

use crate::error::{CaseError, CaseResult};

/// Prefix of the snapshot taken automatically before a restore
pub const SAFETY_PREFIX: &str = "before_restore_";

/// Prefix and extension of primary snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNaming {
    prefix: String,
    extension: String,
}

impl SnapshotNaming {
    /// Create a naming scheme
    ///
    /// The prefix must be non-empty, free of path separators, and distinct
    /// from the safety prefix. The extension is either empty or starts
    /// with a dot.
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> CaseResult<Self> {
        let prefix = prefix.into();
        let extension = extension.into();

        if prefix.is_empty() {
            return Err(CaseError::Validation("Backup prefix cannot be empty".into()));
        }
        if has_separator(&prefix) || has_separator(&extension) {
            return Err(CaseError::Validation(
                "Backup prefix and extension cannot contain path separators".into(),
            ));
        }
        if prefix.starts_with(SAFETY_PREFIX) || SAFETY_PREFIX.starts_with(&prefix) {
            return Err(CaseError::Validation(format!(
                "Backup prefix '{}' overlaps the safety prefix '{}'",
                prefix, SAFETY_PREFIX
            )));
        }
        if !extension.is_empty() && !extension.starts_with('.') {
            return Err(CaseError::Validation(format!(
                "Backup extension '{}' must start with '.'",
                extension
            )));
        }

        Ok(Self { prefix, extension })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Filename of a primary snapshot taken at `stamp`
    pub fn snapshot_name(&self, stamp: &DateTime<Utc>) -> String {
        format!("{}{}{}", self.prefix, format_stamp(stamp), self.extension)
    }

    /// Filename of a safety snapshot taken at `stamp`
    pub fn safety_name(&self, stamp: &DateTime<Utc>) -> String {
        format!("{}{}{}", SAFETY_PREFIX, format_stamp(stamp), self.extension)
    }

    /// Whether `name` is a primary snapshot
    ///
    /// The part between prefix and extension must be a valid stamp, so
    /// hand-made files and leftover temp files are never listed.
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && self.parse_timestamp(name).is_some()
    }

    /// Whether `name` is a safety snapshot
    pub fn is_safety(&self, name: &str) -> bool {
        name.starts_with(SAFETY_PREFIX) && self.parse_timestamp(name).is_some()
    }

    /// Creation time encoded in a primary or safety snapshot name
    pub fn parse_timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        let stem = name.strip_suffix(self.extension.as_str())?;
        let stamp = stem
            .strip_prefix(self.prefix.as_str())
            .or_else(|| stem.strip_prefix(SAFETY_PREFIX))?;
        parse_stamp(stamp)
    }
}

impl Default for SnapshotNaming {
    fn default() -> Self {
        Self {
            prefix: "backup_".to_string(),
            extension: ".json".to_string(),
        }
    }
}

/// Reject names that could escape the retention directory
pub fn validate_snapshot_name(name: &str) -> CaseResult<()> {
    if name.is_empty() || name == "." || name == ".." || has_separator(name) {
        return Err(CaseError::Validation(format!(
            "Invalid backup name: '{}'",
            name
        )));
    }
    Ok(())
}

fn has_separator(s: &str) -> bool {
    s.contains('/') || s.contains('\\')
}

/// Issues strictly increasing millisecond timestamps
///
/// Two backups inside the same millisecond would otherwise share a name;
/// the later one is moved to the next free millisecond instead.
#[derive(Debug, Default)]
pub struct StampSequence {
    last: Option<DateTime<Utc>>,
}

impl StampSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next stamp at or after `now`, strictly after the previous one
    pub fn next(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(3);
        let stamp = match self.last {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

fn format_stamp(stamp: &DateTime<Utc>) -> String {
    format!(
        "{}_{:03}",
        stamp.format("%Y%m%d_%H%M%S"),
        stamp.timestamp_subsec_millis()
    )
}

/// Parse `YYYYMMDD_HHMMSS` or `YYYYMMDD_HHMMSS_mmm`
fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = stamp.split('_').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let date_part = parts[0];
    let time_part = parts[1];
    let millis: u32 = match parts.get(2) {
        Some(ms) if ms.len() == 3 => ms.parse().ok()?,
        Some(_) => return None,
        None => 0,
    };

    if date_part.len() != 8 || time_part.len() != 6 {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;

    Some(DateTime::from_naive_utc_and_offset(
        NaiveDateTime::new(date, time),
        Utc,
    ))
}
