use taskdeck_protocol::{OutputKind, OutputLine};
use taskdeck_state::{OutputFilter, OutputStore};

fn mixed(n: usize) -> Vec<OutputLine> {
    (0..n)
        .map(|i| {
            if i % 3 == 0 {
                OutputLine::stderr(format!("[00:00:{:02}] err {i}", i % 60))
            } else {
                OutputLine::stdout(format!("out {i}"))
            }
        })
        .collect()
}

#[test]
fn test_displayed_count_never_exceeds_cap() {
    let mut store = OutputStore::new();
    store.replace("t", mixed(1_200));
    for filter in [OutputFilter::All, OutputFilter::Stdout, OutputFilter::Stderr] {
        for cap in [1, 7, 500, 5_000] {
            let view = store.render("t", filter, cap);
            assert!(view.displayed_count <= cap);
            assert!(view.filtered_count >= view.displayed_count);
            assert_eq!(view.displayed_count, view.lines.len());
            assert_eq!(view.total_count, 1_200);
        }
    }
}

#[test]
fn test_cap_keeps_most_recent_lines_in_order() {
    let mut store = OutputStore::new();
    store.replace("t", mixed(10));
    let view = store.render("t", OutputFilter::Stdout, 3);
    // stdout lines are 1,2,4,5,7,8 -> last three are 5,7,8
    let texts: Vec<&str> = view.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["out 5", "out 7", "out 8"]);
    assert_eq!(view.filtered_count, 6);
    assert_eq!(view.displayed_count, 3);
}

#[test]
fn test_stderr_filter_selects_only_stderr() {
    let mut store = OutputStore::new();
    store.replace("t", mixed(9));
    let view = store.render("t", OutputFilter::Stderr, 500);
    assert_eq!(view.filtered_count, 3);
    assert!(view.lines.iter().all(|l| l.kind == OutputKind::Stderr));
    assert!(view.lines.iter().all(|l| l.time.is_some()));
}

#[test]
fn test_replace_is_a_full_snapshot() {
    let mut store = OutputStore::new();
    store.replace("t", mixed(50));
    store.replace("t", vec![OutputLine::stdout("only")]);
    assert_eq!(store.lines("t").len(), 1);

    store.clear("t");
    let view = store.render("t", OutputFilter::All, 500);
    assert!(view.is_empty());
    assert_eq!(view.filtered_count, 0);
}

#[test]
fn test_unknown_task_renders_empty() {
    let store = OutputStore::new();
    let view = store.render("missing", OutputFilter::All, 500);
    assert_eq!(view.total_count, 0);
}
