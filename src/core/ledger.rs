//! Process-wide usage counters.
//!
//! Counters are atomics so concurrent sessions can record without a lock;
//! snapshots are a relaxed read and may lag a concurrent increment.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::platform::Platform;

#[derive(Debug, Default)]
pub struct UsageLedger {
    total: AtomicU64,
    per_platform: [AtomicU64; Platform::ALL.len()],
    last_updated: AtomicU64,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful end-to-end resolution.
    pub fn record(&self, platform: Platform) {
        self.per_platform[platform.index()].fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.last_updated.store(now, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let count = |p: Platform| self.per_platform[p.index()].load(Ordering::Relaxed);
        let last_updated = self.last_updated.load(Ordering::Relaxed);

        UsageSnapshot {
            total: self.total.load(Ordering::Relaxed),
            youtube: count(Platform::YouTube),
            instagram: count(Platform::Instagram),
            tiktok: count(Platform::TikTok),
            twitter: count(Platform::Twitter),
            generic: count(Platform::Generic),
            last_updated: (last_updated > 0).then_some(last_updated),
        }
    }
}

/// Point-in-time copy of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub total: u64,
    pub youtube: u64,
    pub instagram: u64,
    pub tiktok: u64,
    pub twitter: u64,
    pub generic: u64,
    /// Unix seconds of the latest increment.
    pub last_updated: Option<u64>,
}

impl UsageSnapshot {
    pub fn count(&self, platform: Platform) -> u64 {
        match platform {
            Platform::YouTube => self.youtube,
            Platform::Instagram => self.instagram,
            Platform::TikTok => self.tiktok,
            Platform::Twitter => self.twitter,
            Platform::Generic => self.generic,
        }
    }
}

impl fmt::Display for UsageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 *Download Statistics*")?;
        writeln!(f)?;
        writeln!(f, "*Total downloads:* {}", self.total)?;
        for platform in Platform::ALL {
            writeln!(f, "• {}: {}", platform, self.count(platform))?;
        }
        match self.last_updated {
            Some(ts) => write!(f, "\n_Last updated: {} (unix)_", ts),
            None => write!(f, "\n_No downloads yet_"),
        }
    }
}
