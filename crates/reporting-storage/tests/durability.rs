use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use reporting_query::FilterCriteria;
use reporting_storage::{ReportStore, StoreOptions};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

#[test]
fn reports_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("reports.sqlite");
    let criteria = FilterCriteria::new()
        .exact("category", "B")
        .on_date("date", NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());

    let id = {
        let store = ReportStore::open_path(&path).expect("open store");
        store
            .save_report("org-1", "Persisted", &criteria)
            .expect("save report")
    };

    let reopened = ReportStore::open_path(&path).expect("reopen store");
    let reports = reopened.list_reports("org-1").expect("list reports");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, id);
    assert_eq!(reports[0].query, criteria);
}

#[test]
fn concurrent_saves_through_one_handle_are_all_kept() {
    let store = ReportStore::open_in_memory().expect("open store");

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                (0..10)
                    .map(|i| {
                        store
                            .save_report(&format!("org-{}", t % 2), &format!("r{t}-{i}"), &FilterCriteria::new())
                            .expect("save report")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.extend(handle.join().expect("thread panicked"));
    }
    assert_eq!(ids.len(), 80);

    let org0 = store.list_reports("org-0").expect("list reports");
    let org1 = store.list_reports("org-1").expect("list reports");
    assert_eq!(org0.len(), 40);
    assert_eq!(org1.len(), 40);
    assert!(org0.iter().chain(&org1).all(|r| ids.contains(&r.id)));
}

#[test]
fn concurrent_saves_through_separate_connections_are_all_kept() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("reports.sqlite");
    let options = StoreOptions {
        busy_timeout: Duration::from_secs(30),
        ..StoreOptions::default()
    };
    // Create the schema before the writers race.
    ReportStore::open_path_with_options(&path, options).expect("open store");

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let path = path.clone();
            thread::spawn(move || {
                let store = ReportStore::open_path_with_options(&path, options).expect("open store");
                for i in 0..10 {
                    store
                        .save_report("org-1", &format!("w{t}-{i}"), &FilterCriteria::new())
                        .expect("save report");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let store = ReportStore::open_path(&path).expect("open store");
    let reports = store.list_reports("org-1").expect("list reports");
    assert_eq!(reports.len(), 40);
    let names: HashSet<_> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), 40);
}
