//! Per-request load flags (mirrors net/base/load_flags_list.h).

use std::ops::{BitOr, BitOrAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoadFlags(u32);

impl LoadFlags {
    pub const NORMAL: LoadFlags = LoadFlags(0);
    pub const VALIDATE_CACHE: LoadFlags = LoadFlags(1 << 0);
    /// Ignore any cached entry; sends `Pragma: no-cache` and `Cache-Control: no-cache`.
    pub const BYPASS_CACHE: LoadFlags = LoadFlags(1 << 1);
    pub const SKIP_CACHE_VALIDATION: LoadFlags = LoadFlags(1 << 2);
    /// Fail with `CacheMiss` rather than touching the network.
    pub const ONLY_FROM_CACHE: LoadFlags = LoadFlags(1 << 3);
    pub const DISABLE_CACHE: LoadFlags = LoadFlags(1 << 4);
    pub const PREFETCH: LoadFlags = LoadFlags(1 << 10);
    pub const RESTRICTED_PREFETCH_FOR_MAIN_FRAME: LoadFlags = LoadFlags(1 << 15);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: LoadFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: LoadFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for LoadFlags {
    type Output = LoadFlags;

    fn bitor(self, rhs: LoadFlags) -> LoadFlags {
        LoadFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LoadFlags {
    fn bitor_assign(&mut self, rhs: LoadFlags) {
        self.0 |= rhs.0;
    }
}
