// src/registry/model.rs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SyncError};
use crate::fs::FileSystem;
use crate::watch::path_utils::{clean_dir_str, clean_path, dir_display};

/// Remote path value meaning "the same path relative to my home directory",
/// e.g. `host1:=` for `/home/me/src/app` resolves to `host1:src/app/`.
pub const MIRROR_HOME_PATH: &str = "=";

/// A `host:path` destination as understood by `rsync -e ssh`.
///
/// Directory locations always end with `/`; file locations are built from
/// them with [`RemoteLocation::join_file`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteLocation {
    host: String,
    path: String,
}

impl RemoteLocation {
    /// Parse a plain `host:path` locator without any special path handling.
    pub fn parse(spec: &str) -> Result<Self> {
        let (host, path) = spec.split_once(':').ok_or_else(|| {
            SyncError::Validation(format!("remote {spec:?} is not of the form host:path"))
        })?;
        if host.is_empty() {
            return Err(SyncError::Validation(format!("remote {spec:?} has an empty host")));
        }
        if path.is_empty() {
            return Err(SyncError::Validation(format!("remote {spec:?} has an empty path")));
        }
        Ok(Self {
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    /// Parse a directory locator, resolving [`MIRROR_HOME_PATH`] against
    /// `local` and `home`, and normalizing to a trailing `/`.
    pub fn parse_dir(spec: &str, local: &Path, home: Option<&Path>) -> Result<Self> {
        let mut loc = Self::parse(spec)?;
        if loc.path == MIRROR_HOME_PATH {
            let home = home.ok_or_else(|| {
                SyncError::Validation("cannot resolve home directory".to_string())
            })?;
            let rel = local.strip_prefix(home).map_err(|_| {
                SyncError::Validation(format!(
                    "localdir:{:?} is not under home {:?}",
                    dir_display(local),
                    dir_display(home)
                ))
            })?;
            loc.path = rel.to_string_lossy().into_owned();
        }
        loc.path = clean_dir_str(&loc.path);
        Ok(loc)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Location of `name` inside this directory.
    pub fn join_file(&self, name: &str) -> Self {
        let sep = if self.path.ends_with('/') { "" } else { "/" };
        Self {
            host: self.host.clone(),
            path: format!("{}{}{}", self.path, sep, name),
        }
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.path)
    }
}

impl TryFrom<String> for RemoteLocation {
    type Error = SyncError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RemoteLocation> for String {
    fn from(loc: RemoteLocation) -> Self {
        loc.to_string()
    }
}

/// A registered local directory and its remote destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedDir {
    /// Absolute, cleaned; rendered with a trailing separator.
    pub local: PathBuf,
    pub remote: RemoteLocation,
}

impl WatchedDir {
    /// Validate a user-supplied pair, resolving the home directory via `dirs`.
    pub fn validate(local: &Path, remote_spec: &str, fs: &dyn FileSystem) -> Result<Self> {
        let home = dirs::home_dir();
        Self::validate_with_home(local, remote_spec, fs, home.as_deref())
    }

    pub fn validate_with_home(
        local: &Path,
        remote_spec: &str,
        fs: &dyn FileSystem,
        home: Option<&Path>,
    ) -> Result<Self> {
        if !local.is_absolute() {
            return Err(SyncError::Validation(format!(
                "localdir:{:?} is not abs",
                local
            )));
        }
        let local = clean_path(local);
        if !fs.is_dir(&local) {
            return Err(SyncError::Validation(format!(
                "localdir:{:?} is not a dir",
                dir_display(&local)
            )));
        }
        let remote = RemoteLocation::parse_dir(remote_spec, &local, home)?;
        Ok(Self { local, remote })
    }

    pub fn local_display(&self) -> String {
        dir_display(&self.local)
    }
}

impl fmt::Display for WatchedDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.local_display(), self.remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn parse_rejects_missing_host_or_path() {
        assert!(RemoteLocation::parse("host1").is_err());
        assert!(RemoteLocation::parse(":backups").is_err());
        assert!(RemoteLocation::parse("host1:").is_err());
        let loc = RemoteLocation::parse("host1:backups/app").unwrap();
        assert_eq!(loc.host(), "host1");
        assert_eq!(loc.path(), "backups/app");
    }

    #[test]
    fn parse_dir_normalizes_and_mirrors_home() {
        let local = Path::new("/home/me/src/app");
        let home = Path::new("/home/me");

        let loc = RemoteLocation::parse_dir("host1:backups//app", local, Some(home)).unwrap();
        assert_eq!(loc.to_string(), "host1:backups/app/");

        let loc = RemoteLocation::parse_dir("host1:=", local, Some(home)).unwrap();
        assert_eq!(loc.to_string(), "host1:src/app/");

        let err = RemoteLocation::parse_dir("host1:=", Path::new("/data/app"), Some(home));
        assert!(matches!(err, Err(SyncError::Validation(_))));
    }

    #[test]
    fn join_file_appends_name() {
        let dir = RemoteLocation::parse_dir("host1:backups/app", Path::new("/x"), None).unwrap();
        assert_eq!(dir.join_file("x.txt").to_string(), "host1:backups/app/x.txt");
    }

    #[test]
    fn validate_requires_existing_absolute_dir() {
        let fs = MockFileSystem::new();
        fs.add_dir("/data/app");
        fs.add_file("/data/file.txt", "x");

        let wd = WatchedDir::validate_with_home(Path::new("/data/app/"), "host1:backups/app", &fs, None)
            .unwrap();
        assert_eq!(wd.local, PathBuf::from("/data/app"));
        assert_eq!(wd.to_string(), "/data/app/ => host1:backups/app/");

        for bad in ["data/app", "/data/missing", "/data/file.txt"] {
            let res = WatchedDir::validate_with_home(Path::new(bad), "host1:x", &fs, None);
            assert!(matches!(res, Err(SyncError::Validation(_))), "{bad} should fail");
        }
    }
}
