//! Backends switching by commenting out all but one directive line.
//!
//! Plain `WireGuard` (`#Endpoint = ...`) and `OpenVPN` (`;remote ...`)
//! both keep every candidate server in the config file and differ only in
//! the directive grammar and restart commands.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::info;

use super::{next_in, Switchable};
use crate::codec::{ConfigFile, Dialect};
use crate::error::Result;
use crate::restart::{RestartPlan, Restarter};

/// Comment-toggling exit selector over one config file.
pub struct ToggleSwitch {
    path: PathBuf,
    dialect: Dialect,
    plan: RestartPlan,
    restarter: Restarter,
    /// Serialises read-modify-write-restart on the config file.
    lock: Mutex<()>,
}

impl ToggleSwitch {
    #[must_use]
    pub fn new(path: PathBuf, dialect: Dialect, plan: RestartPlan, restarter: Restarter) -> Self {
        Self {
            path,
            dialect,
            plan,
            restarter,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ConfigFile> {
        ConfigFile::load(&self.path, &[self.dialect])
    }

    /// Switches to the server after the current one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SwitchError::Inconsistent`] if the current
    /// server is not listed, or any switch error.
    pub fn next(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = self.load()?;
        let current = file.current(&self.dialect).unwrap_or_default();
        let target = next_in(&file.list(&self.dialect), current)?;
        self.apply(file, &target)
    }

    fn apply(&self, mut file: ConfigFile, target: &str) -> Result<()> {
        if !file.select(&self.dialect, target)? {
            info!("{target} is already the current server");
            return Ok(());
        }
        file.store(&self.path)?;
        info!("switched {} to {target}, restarting", self.path.display());
        self.restarter.restart(&self.plan)
    }
}

impl Switchable for ToggleSwitch {
    fn current(&self) -> Result<String> {
        Ok(self
            .load()?
            .current(&self.dialect)
            .unwrap_or_default()
            .to_string())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.list(&self.dialect))
    }

    fn switch(&self, server: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = self.load()?;
        self.apply(file, server)
    }
}
