//! Remembered sign-in.
//!
//! The signed-in display name lives in `<data_dir>/current_user` so later
//! commands can omit it.

use crate::{Result, UserId};
use std::path::{Path, PathBuf};

const CURRENT_USER_FILE: &str = "current_user";

fn current_user_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CURRENT_USER_FILE)
}

/// Remember `user` as the signed-in user
pub fn remember_user(data_dir: &Path, user: &UserId) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(current_user_path(data_dir), user.as_str())?;
    tracing::debug!("Remembered {} as current user", user);
    Ok(())
}

/// The remembered user, if any
///
/// An unreadable or invalid name is logged and treated as signed out.
pub fn current_user(data_dir: &Path) -> Result<Option<UserId>> {
    let path = current_user_path(data_dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    match UserId::parse(&raw) {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            tracing::warn!("Ignoring remembered user in {:?}: {}", path, e);
            Ok(None)
        }
    }
}

/// Forget the signed-in user; returns whether one was remembered
pub fn forget_user(data_dir: &Path) -> Result<bool> {
    let path = current_user_path(data_dir);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}
