/// Request priority levels (matches Chromium's `RequestPriority`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RequestPriority {
    Throttled = 0,
    Idle = 1,
    Lowest = 2,
    Low = 3,
    #[default]
    Medium = 4,
    Highest = 5,
}

impl RequestPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPriority::Throttled => "THROTTLED",
            RequestPriority::Idle => "IDLE",
            RequestPriority::Lowest => "LOWEST",
            RequestPriority::Low => "LOW",
            RequestPriority::Medium => "MEDIUM",
            RequestPriority::Highest => "HIGHEST",
        }
    }
}
