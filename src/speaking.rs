use crate::id_types::ParticipantId;

/// Recency-ordered list of currently-speaking participants.
///
/// The list is set-like: adding an id already present moves it to the end instead
/// of duplicating it, so recency stays correct under add/remove churn. The current
/// dominant speaker is simply the most recently added entry.
#[derive(Debug, Default)]
pub struct SpeakingTracker {
    order: Vec<ParticipantId>,
}

impl SpeakingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as speaking now. An id already present is moved to the end.
    pub fn add(&mut self, id: ParticipantId) {
        if let Some(pos) = self.order.iter().position(|entry| *entry == id) {
            self.order.remove(pos);
        }
        self.order.push(id);
    }

    /// Removes the first occurrence of `id`. No-op if absent.
    pub fn remove(&mut self, id: &ParticipantId) {
        if let Some(pos) = self.order.iter().position(|entry| entry == id) {
            self.order.remove(pos);
        }
    }

    /// The most recently added speaker, if anyone is speaking.
    pub fn current(&self) -> Option<&ParticipantId> {
        self.order.last()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_is_most_recent() {
        let mut tracker = SpeakingTracker::new();
        tracker.add(ParticipantId::from("p1"));
        tracker.add(ParticipantId::from("p2"));
        assert_eq!(tracker.current(), Some(&ParticipantId::from("p2")));
    }

    #[test]
    fn test_empty_has_no_current() {
        let tracker = SpeakingTracker::new();
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn test_re_add_moves_to_end_without_duplicate() {
        let mut tracker = SpeakingTracker::new();
        tracker.add(ParticipantId::from("p1"));
        tracker.add(ParticipantId::from("p2"));
        tracker.add(ParticipantId::from("p1"));

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.current(), Some(&ParticipantId::from("p1")));

        // A single remove must fully clear the id.
        tracker.remove(&ParticipantId::from("p1"));
        assert_eq!(tracker.current(), Some(&ParticipantId::from("p2")));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut tracker = SpeakingTracker::new();
        tracker.add(ParticipantId::from("p1"));
        tracker.remove(&ParticipantId::from("ghost"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_remove_reveals_previous_speaker() {
        let mut tracker = SpeakingTracker::new();
        tracker.add(ParticipantId::from("p1"));
        tracker.add(ParticipantId::from("p2"));
        tracker.remove(&ParticipantId::from("p2"));
        assert_eq!(tracker.current(), Some(&ParticipantId::from("p1")));
    }
}
