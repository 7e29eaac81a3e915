//! Per-project execution history.
//!
//! The store remembers how often and how recently each script ran in each
//! project, which drives the "recent" ordering and rerun-last. Retention is
//! bounded: at most [`MAX_PROJECTS`] projects, [`MAX_SCRIPTS_PER_PROJECT`]
//! scripts per project, and [`MAX_FILE_BYTES`] on disk.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub const HISTORY_VERSION: u32 = 1;
pub const MAX_PROJECTS: usize = 100;
pub const MAX_SCRIPTS_PER_PROJECT: usize = 50;
pub const MAX_FILE_BYTES: usize = 1024 * 1024;

const DEFAULT_HISTORY_PATH: &str = "~/.config/nrs/history.json";

const FREQUENCY_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.7;
/// Recency lost per elapsed day.
const RECENCY_DECAY_PER_DAY: f64 = 0.1;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptRecord {
    #[serde(rename = "count")]
    pub run_count: u32,
    pub last_run: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_args: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    #[serde(default)]
    pub last_script: Option<String>,
    pub last_run: DateTime<Utc>,
    #[serde(default)]
    pub scripts: IndexMap<String, ScriptRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
struct HistoryFile {
    version: u32,
    #[serde(default)]
    projects: IndexMap<String, ProjectRecord>,
}

/// Recency weight in `[0, 1]`: 1 right after a run, 0 after ten days.
pub fn recency(last_run: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed_days = ((now - last_run).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0);
    (1.0 - RECENCY_DECAY_PER_DAY * elapsed_days).max(0.0)
}

pub fn score_record(record: &ScriptRecord, now: DateTime<Utc>) -> f64 {
    f64::from(record.run_count) * FREQUENCY_WEIGHT + recency(record.last_run, now) * RECENCY_WEIGHT
}

pub fn default_history_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_HISTORY_PATH).to_string())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStore {
    path: PathBuf,
    projects: IndexMap<String, ProjectRecord>,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        HistoryStore {
            path,
            projects: IndexMap::new(),
        }
    }

    /// Loads the history at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file can't be read and
    /// [`Error::HistoryCorrupt`] if it can't be decoded.
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No history file at `{}`", path.display());
            return Ok(Self::new(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::io_error("history", &path.display().to_string(), e))?;

        let corrupt = |message: String| Error::HistoryCorrupt {
            path: path.display().to_string(),
            message,
        };

        let file: HistoryFile =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

        if file.version != HISTORY_VERSION {
            return Err(corrupt(format!("unsupported version {}", file.version)));
        }

        Ok(HistoryStore {
            path: path.to_path_buf(),
            projects: file.projects,
        })
    }

    /// Loads the history at `path`, degrading to an empty store on any error.
    ///
    /// A corrupt file is moved aside to `<path>.bak` so the next persist
    /// doesn't lose it.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => store,
            Err(e) => {
                warn!("{e}; starting with empty history");
                if matches!(e, Error::HistoryCorrupt { .. }) {
                    let backup = backup_path(path);
                    if let Err(rename_error) = fs::rename(path, &backup) {
                        warn!(
                            "Could not back up history to `{}`: {rename_error}",
                            backup.display()
                        );
                    }
                }
                Self::new(path.to_path_buf())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project(&self, project: &str) -> Option<&ProjectRecord> {
        self.projects.get(project)
    }

    pub fn script(&self, project: &str, script: &str) -> Option<&ScriptRecord> {
        self.projects.get(project)?.scripts.get(script)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn script_count(&self, project: &str) -> usize {
        self.projects.get(project).map_or(0, |p| p.scripts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Records one run of `script` in `project` and applies eviction.
    pub fn record(&mut self, project: &str, script: &str, args: Option<&str>, now: DateTime<Utc>) {
        let project_record = self
            .projects
            .entry(project.to_string())
            .or_insert_with(|| ProjectRecord {
                last_script: None,
                last_run: now,
                scripts: IndexMap::new(),
            });

        project_record.last_script = Some(script.to_string());
        project_record.last_run = now;

        let script_record = project_record
            .scripts
            .entry(script.to_string())
            .or_insert_with(|| ScriptRecord {
                run_count: 0,
                last_run: now,
                last_args: None,
            });
        script_record.run_count = script_record.run_count.saturating_add(1);
        script_record.last_run = now;
        script_record.last_args = args.map(str::to_string);

        self.evict_scripts(project, script, now);
        self.evict_projects(project);
    }

    /// The last script run in `project` and the arguments it ran with.
    pub fn last(&self, project: &str) -> Option<(String, Option<String>)> {
        let project_record = self.projects.get(project)?;
        let script = project_record.last_script.as_ref()?;
        let args = project_record
            .scripts
            .get(script)
            .and_then(|s| s.last_args.clone());
        Some((script.clone(), args))
    }

    /// Ranking weight of a script; 0 if it never ran.
    pub fn score(&self, project: &str, script: &str, now: DateTime<Utc>) -> f64 {
        self.script(project, script)
            .map_or(0.0, |record| score_record(record, now))
    }

    fn evict_scripts(&mut self, project: &str, keep: &str, now: DateTime<Utc>) {
        let Some(project_record) = self.projects.get_mut(project) else {
            return;
        };

        while project_record.scripts.len() > MAX_SCRIPTS_PER_PROJECT {
            let victim = project_record
                .scripts
                .iter()
                .filter(|(name, _)| name.as_str() != keep)
                .min_by(|(a_name, a), (b_name, b)| {
                    score_record(a, now)
                        .total_cmp(&score_record(b, now))
                        .then_with(|| a.last_run.cmp(&b.last_run))
                        .then_with(|| a_name.cmp(b_name))
                })
                .map(|(name, _)| name.clone());

            let Some(victim) = victim else {
                break;
            };
            debug!("Evicting script `{victim}` from history of `{project}`");
            project_record.scripts.shift_remove(&victim);
        }
    }

    fn evict_projects(&mut self, keep: &str) {
        while self.projects.len() > MAX_PROJECTS {
            let Some(victim) = self.oldest_project(Some(keep)) else {
                break;
            };
            debug!("Evicting project `{victim}` from history");
            self.projects.shift_remove(&victim);
        }
    }

    fn oldest_project(&self, keep: Option<&str>) -> Option<String> {
        self.projects
            .iter()
            .filter(|(path, _)| Some(path.as_str()) != keep)
            .min_by(|(a_path, a), (b_path, b)| {
                a.last_run.cmp(&b.last_run).then_with(|| a_path.cmp(b_path))
            })
            .map(|(path, _)| path.clone())
    }

    fn serialize(&self) -> Result<String> {
        let file = HistoryFile {
            version: HISTORY_VERSION,
            projects: self.projects.clone(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| Error::json_error("writing", "history", &self.path.display().to_string(), e))
    }

    /// Writes the store to its path atomically, first dropping the oldest
    /// projects while the encoded size is over budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file can't be written.
    pub fn persist(&mut self) -> Result<()> {
        let mut content = self.serialize()?;
        while content.len() > MAX_FILE_BYTES && self.projects.len() > 1 {
            let Some(victim) = self.oldest_project(None) else {
                break;
            };
            debug!("History over size budget, evicting project `{victim}`");
            self.projects.shift_remove(&victim);
            content = self.serialize()?;
        }

        let path_description = self.path.display().to_string();
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)
            .map_err(|e| Error::io_error("history directory", &directory.display().to_string(), e))?;

        let mut temp_file = NamedTempFile::new_in(&directory)
            .map_err(|e| Error::io_error("temporary history", &path_description, e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::io_error("temporary history", &path_description, e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| Error::io_error("history", &path_description, e.error))?;

        debug!("History written to `{path_description}`");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    const PROJECT: &str = "/home/dev/web";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn memory_store() -> HistoryStore {
        HistoryStore::new(PathBuf::from("/nonexistent/history.json"))
    }

    #[test]
    fn test_record_increments_and_sets_last() {
        let mut store = memory_store();
        store.record(PROJECT, "dev", None, t0());
        store.record(PROJECT, "dev", Some("--port 3000"), t0() + Duration::hours(1));
        store.record(PROJECT, "build", None, t0() + Duration::hours(2));

        let dev = store.script(PROJECT, "dev").unwrap();
        assert_eq!(dev.run_count, 2);
        assert_eq!(dev.last_run, t0() + Duration::hours(1));
        assert_eq!(dev.last_args.as_deref(), Some("--port 3000"));

        assert_eq!(store.last(PROJECT), Some(("build".to_string(), None)));
        assert_eq!(
            store.project(PROJECT).unwrap().last_run,
            t0() + Duration::hours(2)
        );
    }

    #[test]
    fn test_last_unknown_project() {
        assert_eq!(memory_store().last(PROJECT), None);
    }

    #[test]
    fn test_score_formula() {
        let mut store = memory_store();
        assert_eq!(store.score(PROJECT, "dev", t0()), 0.0);

        store.record(PROJECT, "dev", None, t0());
        let fresh = store.score(PROJECT, "dev", t0());
        assert!((fresh - 1.0).abs() < 1e-9);

        let five_days = store.score(PROJECT, "dev", t0() + Duration::days(5));
        assert!((five_days - (0.3 + 0.5 * 0.7)).abs() < 1e-9);

        let old = store.score(PROJECT, "dev", t0() + Duration::days(30));
        assert!((old - 0.3).abs() < 1e-9);

        // A clock behind the record counts as zero elapsed time.
        let future = store.score(PROJECT, "dev", t0() - Duration::days(2));
        assert!((future - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_monotonic() {
        let record = |run_count| ScriptRecord {
            run_count,
            last_run: t0(),
            last_args: None,
        };

        let mut previous = f64::INFINITY;
        for hours in (0..400).step_by(7) {
            let score = score_record(&record(3), t0() + Duration::hours(hours));
            assert!(score <= previous);
            previous = score;
        }

        let now = t0() + Duration::days(2);
        assert!(score_record(&record(4), now) >= score_record(&record(3), now));
    }

    #[test]
    fn test_script_eviction_drops_lowest_score() {
        let mut store = memory_store();
        for i in 0..MAX_SCRIPTS_PER_PROJECT {
            store.record(PROJECT, &format!("s{i}"), None, t0() + Duration::hours(i as i64));
        }
        // s0 is the oldest but also the most used.
        store.record(PROJECT, "s0", None, t0());
        store.record(PROJECT, "s0", None, t0());
        assert_eq!(store.script_count(PROJECT), MAX_SCRIPTS_PER_PROJECT);

        store.record(PROJECT, "newcomer", None, t0() + Duration::hours(60));

        assert_eq!(store.script_count(PROJECT), MAX_SCRIPTS_PER_PROJECT);
        assert!(store.script(PROJECT, "s1").is_none());
        assert!(store.script(PROJECT, "s0").is_some());
        assert!(store.script(PROJECT, "newcomer").is_some());
    }

    #[test]
    fn test_project_eviction_drops_oldest() {
        let mut store = memory_store();
        for i in 0..MAX_PROJECTS {
            store.record(&format!("/p/{i}"), "dev", None, t0() + Duration::minutes(i as i64));
        }
        // Touch /p/0 so /p/1 becomes the oldest.
        store.record("/p/0", "dev", None, t0() + Duration::days(1));

        store.record("/p/new", "dev", None, t0() + Duration::days(2));

        assert_eq!(store.project_count(), MAX_PROJECTS);
        assert!(store.project("/p/1").is_none());
        assert!(store.project("/p/0").is_some());
        assert!(store.project("/p/new").is_some());
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = HistoryStore::new(path.clone());
        store.record(PROJECT, "dev", Some("--open"), t0());
        store.record(PROJECT, "build", None, t0() + Duration::minutes(3));
        store.record("/other", "test", None, t0() + Duration::minutes(5));
        store.persist().unwrap();

        let loaded = HistoryStore::try_load(&path).unwrap();
        assert_eq!(loaded, store);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"version\": 1"));
        assert!(raw.contains("\"count\": 1"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::load(&dir.path().join("history.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_backs_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ this is not json").unwrap();

        assert!(matches!(
            HistoryStore::try_load(&path),
            Err(Error::HistoryCorrupt { .. })
        ));

        let store = HistoryStore::load(&path);
        assert!(store.is_empty());
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("history.json.bak")).unwrap(),
            "{ this is not json"
        );
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"version": 9, "projects": {}}"#).unwrap();

        assert!(matches!(
            HistoryStore::try_load(&path),
            Err(Error::HistoryCorrupt { .. })
        ));
    }

    #[test]
    fn test_persist_respects_size_budget() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut store = HistoryStore::new(path.clone());

        let long_args = "x".repeat(30_000);
        for i in 0..MAX_PROJECTS {
            store.record(
                &format!("/p/{i}"),
                "dev",
                Some(&long_args),
                t0() + Duration::minutes(i as i64),
            );
        }
        store.persist().unwrap();

        let size = fs::metadata(&path).unwrap().len() as usize;
        assert!(size <= MAX_FILE_BYTES);
        assert!(store.project_count() < MAX_PROJECTS);
        assert!(store.project("/p/0").is_none());
        assert!(store.project(&format!("/p/{}", MAX_PROJECTS - 1)).is_some());
    }
}
