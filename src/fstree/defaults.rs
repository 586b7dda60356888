//! Default metadata for the root and implicitly created directories.
//!
//! ```rust
//! use sqimage::fstree::TreeDefaults;
//!
//! let defaults: TreeDefaults = "uid=1000,gid=100,mode=0750".parse().unwrap();
//! assert_eq!(defaults.uid, 1000);
//! assert_eq!(defaults.mode, 0o750);
//! ```

use std::str::FromStr;

use super::Metadata;
use crate::{Error, Result};

/// Environment variable consulted by [`TreeDefaults::from_env`].
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

/// Metadata applied to the root directory and to directories that are
/// created implicitly on the way to a deeper entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeDefaults {
    /// Owner user ID.
    pub uid: u32,
    /// Owner group ID.
    pub gid: u32,
    /// Permission bits.
    pub mode: u16,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: i64,
}

impl Default for TreeDefaults {
    fn default() -> Self {
        Self {
            uid: 0,
            gid: 0,
            mode: 0o755,
            mtime: 0,
        }
    }
}

impl TreeDefaults {
    /// Creates defaults with root ownership, mode `0755` and mtime 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates defaults whose mtime comes from `SOURCE_DATE_EPOCH`.
    ///
    /// If the variable is unset the mtime is 0. If it is set but not a
    /// non-negative integer that fits in 32 bits, a warning is logged and the
    /// mtime is 0.
    pub fn from_env() -> Self {
        Self::default().mtime(source_date_epoch())
    }

    /// Sets the owner.
    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Sets the permission bits.
    pub fn mode(mut self, mode: u16) -> Self {
        self.mode = mode & 0o7777;
        self
    }

    /// Sets the modification time.
    pub fn mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Returns these defaults as node metadata.
    pub fn metadata(&self) -> Metadata {
        Metadata::with_permissions(self.mode)
            .owner(self.uid, self.gid)
            .mtime(self.mtime)
    }
}

fn source_date_epoch() -> i64 {
    let Ok(value) = std::env::var(SOURCE_DATE_EPOCH) else {
        return 0;
    };
    match parse_epoch(&value) {
        Some(mtime) => mtime,
        None => {
            log::warn!(
                "{} is set to '{}', which is not a valid 32 bit timestamp; using 0",
                SOURCE_DATE_EPOCH,
                value
            );
            0
        }
    }
}

fn parse_epoch(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok().map(i64::from)
}

fn parse_number<T: TryFrom<u64>>(key: &str, value: &str, radix_octal: bool) -> Result<T> {
    let parsed = if radix_octal {
        u64::from_str_radix(value, 8)
    } else {
        value.parse::<u64>()
    };
    parsed
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("defaults: bad value '{}' for {}", value, key)))
}

impl FromStr for TreeDefaults {
    type Err = Error;

    /// Parses a comma separated list of `key=value` pairs.
    ///
    /// Recognized keys are `uid`, `gid`, `mode` (octal) and `mtime`.
    fn from_str(s: &str) -> Result<Self> {
        let mut defaults = Self::default();

        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let Some((key, value)) = item.split_once('=') else {
                return Err(Error::InvalidArgument(format!(
                    "defaults: missing value for '{}'",
                    item
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "uid" => defaults.uid = parse_number(key, value, false)?,
                "gid" => defaults.gid = parse_number(key, value, false)?,
                "mode" => {
                    let mode: u16 = parse_number(key, value, true)?;
                    if mode > 0o7777 {
                        return Err(Error::InvalidArgument(format!(
                            "defaults: mode {:o} out of range",
                            mode
                        )));
                    }
                    defaults.mode = mode;
                }
                "mtime" => {
                    let mtime: u32 = parse_number(key, value, false)?;
                    defaults.mtime = i64::from(mtime);
                }
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "defaults: unknown option '{}'",
                        key
                    )));
                }
            }
        }

        Ok(defaults)
    }
}
