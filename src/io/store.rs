//! Per-user artifact store with atomic replacement

use super::artifact::{ModelArtifact, FORMAT_VERSION};
use super::format::SaveConfig;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::ids::UserId;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Filesystem store laid out as `<root>/user_<id>/model.<ext>`
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
    config: SaveConfig,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>, config: SaveConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.root.clone(),
            SaveConfig::new(config.format).with_pretty(config.pretty),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user: UserId) -> PathBuf {
        self.root.join(format!("user_{user}"))
    }

    pub fn path_for(&self, user: UserId) -> PathBuf {
        self.user_dir(user)
            .join(format!("model.{}", self.config.format.extension()))
    }

    pub fn exists(&self, user: UserId) -> bool {
        self.path_for(user).is_file()
    }

    /// Write the artifact, replacing any previous one only once fully written
    pub fn save(&self, user: UserId, artifact: &ModelArtifact) -> Result<PathBuf> {
        if artifact.user != user {
            return Err(Error::invalid(format!(
                "artifact belongs to user {}, not {user}",
                artifact.user
            )));
        }
        let content = self.config.serialize(artifact)?;

        let dir = self.user_dir(user);
        fs::create_dir_all(&dir)?;
        let path = self.path_for(user);
        let tmp = dir.join(temp_name(self.config.format.extension()));

        let written = write_synced(&tmp, content.as_bytes()).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(user = %user, version = artifact.version, path = %path.display(), "saved model artifact");
        Ok(path)
    }

    pub fn load(&self, user: UserId) -> Result<ModelArtifact> {
        let path = self.path_for(user);
        if !path.is_file() {
            return Err(Error::ArtifactNotFound(user));
        }
        let content = fs::read_to_string(&path)?;
        let artifact: ModelArtifact = self.config.deserialize(&content)?;

        if artifact.format_version > FORMAT_VERSION {
            return Err(Error::Serialization(format!(
                "artifact format {} is newer than supported {FORMAT_VERSION}",
                artifact.format_version
            )));
        }
        if artifact.user != user {
            return Err(Error::Serialization(format!(
                "{} holds an artifact for user {}",
                path.display(),
                artifact.user
            )));
        }
        tracing::debug!(user = %user, version = artifact.version, "loaded model artifact");
        Ok(artifact)
    }
}

fn temp_name(ext: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!(".model.{ext}.tmp-{}-{nanos}", std::process::id())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
