use super::*;
use vk::DebugUtilsMessageSeverityFlagsEXT as S;

#[test]
fn test_severity_filter() {
    assert!(DebugSeverity::ErrorsOnly.accepts(S::ERROR));
    assert!(!DebugSeverity::ErrorsOnly.accepts(S::WARNING));

    assert!(DebugSeverity::ErrorsAndWarnings.accepts(S::WARNING));
    assert!(!DebugSeverity::ErrorsAndWarnings.accepts(S::INFO));

    assert!(DebugSeverity::All.accepts(S::VERBOSE));
}

#[test]
fn test_severity_round_trips_through_atomic_storage() {
    for severity in [DebugSeverity::ErrorsOnly, DebugSeverity::ErrorsAndWarnings, DebugSeverity::All] {
        assert_eq!(DebugSeverity::from_u8(severity as u8), severity);
    }
}

#[test]
fn test_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
}

#[test]
fn test_tracker_buckets_by_highest_severity() {
    let tracker = StatsTracker::new();
    tracker.record(S::ERROR);
    tracker.record(S::WARNING);
    tracker.record(S::WARNING);
    tracker.record(S::VERBOSE);
    assert_eq!(tracker.snapshot(), ValidationStats { errors: 1, warnings: 2, info: 0, verbose: 1 });

    tracker.reset();
    assert_eq!(tracker.snapshot().total(), 0);
}

#[test]
fn test_message_type_names() {
    assert_eq!(message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), "Validation");
    assert_eq!(message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
    assert_eq!(message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}
