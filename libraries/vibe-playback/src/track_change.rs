//! Track-change detection
//!
//! Decides when the playing track actually changed, so the queue refresh
//! fires once per transition no matter how many state events share a track.

/// Memo of the last track id seen in a snapshot
#[derive(Debug, Clone, Default)]
pub struct TrackChangeDetector {
    last: Option<String>,
}

impl TrackChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `track_id` with the memo, then store it
    ///
    /// Returns true iff the id is present, non-empty, and differs from the
    /// memo. The memo is overwritten on every call, absent ids included.
    pub fn observe(&mut self, track_id: Option<&str>) -> bool {
        let incoming = track_id.filter(|id| !id.is_empty());
        let changed = incoming.is_some() && incoming != self.last.as_deref();
        self.last = incoming.map(str::to_string);
        changed
    }

    /// Last id stored by [`observe`](Self::observe)
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_track_counts_as_change() {
        let mut detector = TrackChangeDetector::new();
        assert!(detector.observe(Some("a")));
        assert_eq!(detector.last(), Some("a"));
    }

    #[test]
    fn repeated_track_reports_once() {
        let mut detector = TrackChangeDetector::new();
        assert!(detector.observe(Some("a")));
        assert!(!detector.observe(Some("a")));
        assert!(!detector.observe(Some("a")));
        assert!(detector.observe(Some("b")));
        assert!(!detector.observe(Some("b")));
    }

    #[test]
    fn absent_or_empty_id_never_changes() {
        let mut detector = TrackChangeDetector::new();
        assert!(!detector.observe(None));
        assert!(!detector.observe(Some("")));
        assert_eq!(detector.last(), None);
    }

    #[test]
    fn absent_id_resets_memo() {
        let mut detector = TrackChangeDetector::new();
        assert!(detector.observe(Some("a")));
        assert!(!detector.observe(None));
        assert!(detector.observe(Some("a")));
    }
}
