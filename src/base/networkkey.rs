/// Partitions shared state (server properties, alt-services) by top-level site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkAnonymizationKey {
    top_frame_site: Option<String>,
}

impl NetworkAnonymizationKey {
    pub fn new(top_frame_site: impl Into<String>) -> Self {
        Self {
            top_frame_site: Some(top_frame_site.into()),
        }
    }

    pub fn top_frame_site(&self) -> Option<&str> {
        self.top_frame_site.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.top_frame_site.is_none()
    }
}
