//! # Identity History Store
//!
//! Owns `<data_dir>/network_history.json` and is the only code that writes it.
//!
//! Each [`HistoryStore::apply_scan`] runs load, [`reconcile`], and save while
//! holding the writer lock, so a second scan waits for the first. Saves go
//! through a temporary file in the same directory that is then renamed over
//! the canonical path. Readers therefore see either the previous or the new
//! document, never a partial one, and they do not take the lock.
//!
//! A document that cannot be read or parsed is treated as empty. The scan
//! that finds it carries on and overwrites it.

use std::fs;
use std::io::{ErrorKind, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use lanwatch_common::config::HistoryConfig;
use lanwatch_common::error::StoreError;
use lanwatch_common::history::document::HistoryDocument;
use lanwatch_common::history::event::ChangeSummary;
use lanwatch_common::history::record::DeviceRecord;
use lanwatch_common::network::observation::DeviceObservation;

mod query;
mod reconcile;

pub use query::{DeviceSummary, LastSeen, RecentEvents, StoreStats};
pub use reconcile::reconcile;

pub struct HistoryStore {
    path: PathBuf,
    cfg: HistoryConfig,
    writer: Mutex<()>,
}

impl HistoryStore {
    /// Opens the store under `cfg.data_dir`, creating the directory and an
    /// empty document if they do not exist yet.
    pub fn open(cfg: HistoryConfig) -> Result<Self, StoreError> {
        let path = cfg.history_path();
        fs::create_dir_all(&cfg.data_dir).map_err(|source| StoreError::Write {
            path: cfg.data_dir.clone(),
            source,
        })?;

        let store = Self {
            path,
            cfg,
            writer: Mutex::new(()),
        };
        if !store.path.exists() {
            store.save(&HistoryDocument::default())?;
            info!(path = %store.path.display(), "created empty history");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.cfg
    }

    /// Reconciles one scan's observations into the history and persists it.
    pub fn apply_scan(
        &self,
        observations: &[DeviceObservation],
        scan_duration_secs: f64,
    ) -> Result<ChangeSummary, StoreError> {
        self.apply_scan_at(observations, scan_duration_secs, Utc::now())
    }

    /// [`Self::apply_scan`] with an explicit clock.
    pub fn apply_scan_at(
        &self,
        observations: &[DeviceObservation],
        scan_duration_secs: f64,
        now: DateTime<Utc>,
    ) -> Result<ChangeSummary, StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut doc = self.load();
        let summary = reconcile(&mut doc, observations, scan_duration_secs, now, &self.cfg);
        if let Err(err) = self.save(&doc) {
            error!(path = %self.path.display(), "history not saved: {err}");
            return Err(err);
        }

        debug!(
            devices = doc.devices_by_identity.len(),
            events = summary.total_events(),
            "history updated"
        );
        Ok(summary)
    }

    /// Removes records not seen for longer than `horizon`. Returns how many went.
    pub fn prune_unseen(&self, horizon: TimeDelta) -> Result<usize, StoreError> {
        self.prune_unseen_at(horizon, Utc::now())
    }

    pub fn prune_unseen_at(&self, horizon: TimeDelta, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut doc = self.load();
        let before = doc.devices_by_identity.len();
        doc.devices_by_identity
            .retain(|_, record| now - record.last_seen_at <= horizon);
        let removed = before - doc.devices_by_identity.len();
        if removed == 0 {
            return Ok(0);
        }

        let devices = &doc.devices_by_identity;
        doc.identity_by_ip.retain(|_, key| devices.contains_key(key));
        doc.stats.unique_devices = doc.devices_by_identity.len();
        doc.stats.last_updated = Some(now);
        self.save(&doc)?;

        info!(removed, "pruned devices unseen for {} days", horizon.num_days());
        Ok(removed)
    }

    /// The whole document as currently persisted.
    pub fn history(&self) -> HistoryDocument {
        self.load()
    }

    /// Looks a record up by MAC, placeholder key, or an address from the latest scan.
    pub fn device(&self, mac_or_ip: &str) -> Option<DeviceRecord> {
        self.load().find(mac_or_ip).cloned()
    }

    /// Identity currently bound to `ip`, if the latest scan saw it.
    pub fn identity_at(&self, ip: IpAddr) -> Option<String> {
        self.load().identity_by_ip.get(&ip).cloned()
    }

    /// Reads the document, falling back to an empty one.
    fn load(&self) -> HistoryDocument {
        match self.try_load() {
            Ok(Some(mut doc)) => {
                doc.normalize();
                doc
            }
            Ok(None) => HistoryDocument::default(),
            Err(err) => {
                warn!("{err}; starting from an empty history");
                HistoryDocument::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<HistoryDocument>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, doc: &HistoryDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(doc).map_err(StoreError::Serialize)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
