//! Tests for the shared state components.

#[cfg(test)]
mod share_tests {
    use std::fs;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;

    use crate::share::{
        ClientRegistry, Error, Event, EventLog, LogEntry, SharedFileCatalog, ShareState, API_LOG_TAIL,
    };

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    #[test]
    fn test_first_visit_wins() {
        let registry = ClientRegistry::new();
        assert!(registry.record_visit(ip(10), "Firefox"));
        let first = registry.get(&ip(10)).unwrap();

        assert!(!registry.record_visit(ip(10), "Chrome"));
        assert!(!registry.record_visit(ip(10), ""));

        let record = registry.get(&ip(10)).unwrap();
        assert_eq!(record, first);
        assert_eq!(record.user_agent, "Firefox");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_one_record_per_ip() {
        let registry = ClientRegistry::new();
        for round in 0..5 {
            for last in 1..=4 {
                registry.record_visit(ip(last), &format!("agent-{round}"));
            }
        }

        let records = registry.list_all();
        assert_eq!(records.len(), 4);
        for record in records {
            assert_eq!(record.user_agent, "agent-0");
        }
    }

    #[test]
    fn test_concurrent_first_visits_insert_once() {
        let registry = ClientRegistry::new();
        let firsts = Arc::new(AtomicUsize::new(0));

        thread::scope(|scope| {
            for last in 0..50u8 {
                for _ in 0..4 {
                    let registry = registry.clone();
                    let firsts = Arc::clone(&firsts);
                    scope.spawn(move || {
                        if registry.record_visit(ip(last), "load-test") {
                            firsts.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            }
        });

        assert_eq!(registry.len(), 50);
        assert_eq!(firsts.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_client_record_json_shape() {
        let registry = ClientRegistry::new();
        registry.record_visit(ip(7), "curl/8.5.0");

        let json = serde_json::to_value(registry.list_all()).unwrap();
        let record = &json[0];
        assert_eq!(record["ip"], "192.168.1.7");
        assert_eq!(record["ua"], "curl/8.5.0");
        let since = record["since"].as_str().unwrap();
        assert!(since.ends_with(" GMT"), "unexpected since: {since}");
    }

    #[test]
    fn test_event_log_recent_is_chronological_suffix() {
        let log = EventLog::new();
        for n in 0..10u8 {
            log.record(ip(n), Event::Connected);
        }

        let recent = log.recent(3);
        let ips: Vec<IpAddr> = recent.iter().map(|e| e.ip).collect();
        assert_eq!(ips, vec![ip(7), ip(8), ip(9)]);
        assert_eq!(log.recent(100).len(), 10);
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_event_log_retention_cap() {
        let log = EventLog::with_capacity(300);
        for n in 0..5000u32 {
            log.record(ip((n % 250) as u8), Event::Downloaded(format!("file-{n}")));
        }

        assert_eq!(log.len(), 300);
        assert_eq!(log.total_appended(), 5000);

        let tail = log.recent(API_LOG_TAIL);
        assert_eq!(tail.len(), API_LOG_TAIL);
        assert_eq!(tail.last().unwrap().event, Event::Downloaded("file-4999".to_string()));
        assert_eq!(tail[0].event, Event::Downloaded("file-4800".to_string()));
    }

    #[test]
    fn test_log_entry_json_shape() {
        let entry = LogEntry::now(ip(3), Event::Downloaded("报告.pdf".to_string()));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["ip"], "192.168.1.3");
        assert_eq!(json["event"], "downloaded 报告.pdf");
        let time = json["t"].as_str().unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }

    #[test]
    fn test_register_and_unregister() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        let catalog = SharedFileCatalog::new();
        let file = catalog.register(&path).unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.size, 5);
        assert!(file.path.is_absolute());
        assert_eq!(catalog.lookup("notes.txt"), Some(file.clone()));

        assert_eq!(catalog.unregister("notes.txt"), Some(file));
        assert!(catalog.lookup("notes.txt").is_none());
        assert!(catalog.unregister("notes.txt").is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_same_basename_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a");
        let second = dir.path().join("b");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("data.bin"), b"one").unwrap();
        fs::write(second.join("data.bin"), b"second").unwrap();

        let catalog = SharedFileCatalog::new();
        catalog.register(first.join("data.bin")).unwrap();
        let replacement = catalog.register(second.join("data.bin")).unwrap();

        assert_eq!(catalog.len(), 1);
        let stored = catalog.lookup("data.bin").unwrap();
        assert_eq!(stored, replacement);
        assert_eq!(stored.size, 6);
    }

    #[test]
    fn test_register_rejects_directories_and_missing_paths() {
        let dir = TempDir::new().unwrap();
        let catalog = SharedFileCatalog::new();

        assert!(matches!(catalog.register(dir.path()), Err(Error::NotAFile(_))));
        assert!(matches!(
            catalog.register(dir.path().join("missing.txt")),
            Err(Error::Io { .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_list_all_sorted_and_path_hidden() {
        let dir = TempDir::new().unwrap();
        for name in ["b.txt", "a.txt", "c.txt"] {
            fs::write(dir.path().join(name), name).unwrap();
        }

        let state = ShareState::default();
        for name in ["b.txt", "a.txt", "c.txt"] {
            state.catalog.register(dir.path().join(name)).unwrap();
        }

        let names: Vec<String> = state.catalog.list_all().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let json = serde_json::to_value(state.catalog.list_all()).unwrap();
        assert_eq!(json[0], serde_json::json!({"name": "a.txt", "size": 5}));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_shared_under_its_own_name() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("blob-7f3a.bin");
        fs::write(&target, b"quarterly numbers").unwrap();
        let link = dir.path().join("report.pdf");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let catalog = SharedFileCatalog::new();
        let file = catalog.register(&link).unwrap();

        assert_eq!(file.name, "report.pdf");
        assert_eq!(file.path, link);
        assert_eq!(file.size, 17);
        assert!(catalog.lookup("blob-7f3a.bin").is_none());
        assert_eq!(catalog.lookup("report.pdf"), Some(file));
    }

    #[test]
    fn test_since_returns_each_entry_once() {
        let log = EventLog::new();
        let (seen, fresh) = log.since(0);
        assert_eq!(seen, 0);
        assert!(fresh.is_empty());

        for n in 0..3u8 {
            log.record(ip(n), Event::Connected);
        }
        let (seen, fresh) = log.since(seen);
        assert_eq!(seen, 3);
        assert_eq!(fresh.iter().map(|e| e.ip).collect::<Vec<_>>(), vec![ip(0), ip(1), ip(2)]);

        for n in 3..5u8 {
            log.record(ip(n), Event::Connected);
        }
        let (seen, fresh) = log.since(seen);
        assert_eq!(seen, 5);
        assert_eq!(fresh.iter().map(|e| e.ip).collect::<Vec<_>>(), vec![ip(3), ip(4)]);

        let (seen, fresh) = log.since(seen);
        assert_eq!(seen, 5);
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_since_under_concurrent_appends() {
        let log = EventLog::with_capacity(10_000);
        let mut printed = Vec::new();

        thread::scope(|scope| {
            for writer in 0..4u32 {
                let log = log.clone();
                scope.spawn(move || {
                    for n in 0..500u32 {
                        log.record(ip(writer as u8), Event::Downloaded(format!("{writer}-{n}")));
                    }
                });
            }

            let mut seen = 0;
            while seen < 2000 {
                let (total, fresh) = log.since(seen);
                printed.extend(fresh);
                seen = total;
            }
        });

        assert_eq!(printed, log.recent(usize::MAX));
    }

    #[test]
    fn test_since_after_entries_dropped() {
        let log = EventLog::with_capacity(4);
        for n in 0..10u8 {
            log.record(ip(n), Event::Connected);
        }

        let (seen, fresh) = log.since(2);
        assert_eq!(seen, 10);
        assert_eq!(fresh.iter().map(|e| e.ip).collect::<Vec<_>>(), vec![ip(6), ip(7), ip(8), ip(9)]);
    }
}
