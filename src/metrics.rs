use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge,
};

lazy_static! {
    pub static ref SESSION_ACTIVE_PARTICIPANTS: IntGauge = register_int_gauge!(
        "session_active_participants",
        "Number of participants currently present in the session registry"
    )
    .unwrap();
    pub static ref SESSION_ACTIVE_STREAMS: IntGauge = register_int_gauge!(
        "session_active_streams",
        "Number of streams currently owned by registered participants"
    )
    .unwrap();
    pub static ref SESSION_EVENTS_EMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "session_events_emitted_total",
        "Total number of lifecycle events delivered to listeners",
        &["event"] // wire name, e.g. "participant-joined"
    )
    .unwrap();
    pub static ref SESSION_NOTIFICATIONS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "session_notifications_dropped_total",
        "Total number of inbound signaling notifications absorbed as diagnostics",
        &["reason"] // "malformed_payload", "unknown_participant", "unknown_endpoint", "not_connected"
    )
    .unwrap();
    pub static ref SESSION_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "session_requests_total",
        "Total number of outbound signaling requests, by method and outcome",
        &["method", "outcome"] // outcome: "ok" or "error"
    )
    .unwrap();
}

pub fn register_metrics() {
    // Force initialization of lazy_statics
    let _ = SESSION_ACTIVE_PARTICIPANTS.get();
    let _ = SESSION_ACTIVE_STREAMS.get();
    let _ = SESSION_EVENTS_EMITTED_TOTAL
        .with_label_values(&["room-connected"])
        .get();
    let _ = SESSION_NOTIFICATIONS_DROPPED_TOTAL
        .with_label_values(&["malformed_payload"])
        .get();
    let _ = SESSION_REQUESTS_TOTAL
        .with_label_values(&["joinRoom", "ok"])
        .get();
}

/// Records an outbound request outcome.
pub fn observe_request(method: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    SESSION_REQUESTS_TOTAL
        .with_label_values(&[method, outcome])
        .inc();
}

/// Records an inbound notification that was absorbed as a diagnostic.
pub fn observe_dropped(reason: &str) {
    SESSION_NOTIFICATIONS_DROPPED_TOTAL
        .with_label_values(&[reason])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_observe_counters() {
        let before = SESSION_NOTIFICATIONS_DROPPED_TOTAL
            .with_label_values(&["unknown_endpoint"])
            .get();
        observe_dropped("unknown_endpoint");
        let after = SESSION_NOTIFICATIONS_DROPPED_TOTAL
            .with_label_values(&["unknown_endpoint"])
            .get();
        assert_eq!(after, before + 1);

        let before = SESSION_REQUESTS_TOTAL
            .with_label_values(&["leaveRoom", "error"])
            .get();
        observe_request("leaveRoom", false);
        let after = SESSION_REQUESTS_TOTAL
            .with_label_values(&["leaveRoom", "error"])
            .get();
        assert_eq!(after, before + 1);
    }
}
