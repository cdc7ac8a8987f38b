use crate::models::{GroupingMode, ScopeKey};

pub struct CacheKeys;

impl CacheKeys {
    /// Namespace for grouped statistics aggregates.
    pub const STATISTICS: &'static str = "statistics";

    /// Grouped aggregate: statistics-{mode}-organizer | statistics-{mode}-{ngo_id}
    ///
    /// Organizers see every NGO's rows, so they share one entry per mode
    /// regardless of their own NGO id.
    pub fn statistics(mode: GroupingMode, scope: ScopeKey) -> String {
        Self::scoped(Self::STATISTICS, mode.as_str(), scope)
    }

    /// {namespace}-{tag}-organizer | {namespace}-{tag}-{ngo_id}
    pub fn scoped(namespace: &str, tag: &str, scope: ScopeKey) -> String {
        if scope.is_organizer {
            format!("{namespace}-{tag}-organizer")
        } else {
            format!("{namespace}-{tag}-{}", scope.ngo_id)
        }
    }
}
