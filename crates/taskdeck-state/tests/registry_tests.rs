use chrono::Local;
use taskdeck_protocol::{TaskListResponse, TaskStatus, TaskSummary};
use taskdeck_state::{RegistryView, SelectionTracker, StateError, TaskRegistry};

fn snapshot(entries: &[(&str, TaskStatus)]) -> TaskListResponse {
    TaskListResponse {
        tasks: entries
            .iter()
            .map(|(id, status)| TaskSummary {
                task_id: id.to_string(),
                status: *status,
                start_time: Some(1_700_000_000.0),
                end_time: None,
                has_error: false,
            })
            .collect(),
        total: entries.len() as u64,
    }
}

#[test]
fn test_running_count_tracks_latest_snapshot_only() {
    use TaskStatus::*;
    let sequence = [
        vec![("a", Running), ("b", Running), ("c", Completed)],
        vec![("a", Completed), ("b", Running)],
        vec![],
        vec![("d", Running), ("e", Running), ("f", Running), ("a", Completed)],
    ];

    let mut reg = TaskRegistry::new();
    for entries in &sequence {
        let snap = snapshot(entries);
        let expected = snap.tasks.iter().filter(|t| t.status == Running).count();
        let report = reg.replace(snap, Local::now());
        assert_eq!(report.running, expected);
        assert_eq!(reg.running_count(), expected);
        assert_eq!(reg.total(), entries.len());
    }
}

#[test]
fn test_stale_entries_disappear_on_next_snapshot() {
    let mut reg = TaskRegistry::new();
    reg.replace(snapshot(&[("a", TaskStatus::Running)]), Local::now());
    reg.replace(snapshot(&[("b", TaskStatus::Running)]), Local::now());
    assert!(!reg.contains("a"));
    assert!(reg.contains("b"));
}

#[test]
fn test_duplicate_ids_collapse_to_one_entry() {
    let mut reg = TaskRegistry::new();
    let report = reg.replace(
        snapshot(&[("a", TaskStatus::Running), ("a", TaskStatus::Running)]),
        Local::now(),
    );
    assert_eq!(report.total, 1);
}

#[test]
fn test_selection_survives_reconciliation() {
    let mut reg = TaskRegistry::new();
    let mut sel = SelectionTracker::new();
    reg.replace(snapshot(&[("a", TaskStatus::Running)]), Local::now());
    sel.select(&reg, "a").unwrap();

    reg.set_offline();
    assert_eq!(reg.view(), RegistryView::Offline);
    assert_eq!(sel.selected(), Some("a"));
    assert!(sel.is_stale(&reg));

    assert_eq!(sel.select(&reg, "a"), Err(StateError::NotFound("a".into())));
}
