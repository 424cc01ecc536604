//! Tests for the pluggable AuditSink / forward sink functionality.

use std::fs;
use std::sync::{Arc, Mutex};

use hashlineage::audit::{AuditEvent, AuditLog, AuditRecord, AuditSink, FileAuditSink};
use hashlineage::{Lineage, LineageOptions, TaggedCiphertext};

/// A test sink that collects records into a shared Vec.
struct SharedVecSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl SharedVecSink {
    fn new(records: Arc<Mutex<Vec<AuditRecord>>>) -> Self {
        Self { records }
    }
}

impl AuditSink for SharedVecSink {
    fn append(&mut self, record: AuditRecord) -> std::io::Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

fn audited_lineage(max_rung: u64) -> (Lineage, hashlineage::audit::SharedAuditLog) {
    let log = AuditLog::shared();
    let options = LineageOptions {
        audit: Some(Arc::clone(&log)),
        ..LineageOptions::default()
    };
    (Lineage::with_options(b"audited", max_rung, options), log)
}

#[test]
fn test_forward_sink_receives_records() {
    let (lineage, log) = audited_lineage(10);

    let records = Arc::new(Mutex::new(Vec::new()));
    log.lock()
        .unwrap()
        .add_forward_sink(Box::new(SharedVecSink::new(Arc::clone(&records))));

    let sealed = lineage.encrypt_at(b"secret", 4).unwrap();
    lineage.decrypt(&sealed).unwrap();

    // Primary log has the records
    assert_eq!(log.lock().unwrap().len(), 3);

    // Forward sink also received them
    let collected = records.lock().unwrap();
    let events: Vec<_> = collected.iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        vec![AuditEvent::Derived, AuditEvent::Encrypted, AuditEvent::Decrypted]
    );
    assert_eq!(collected[0].max_rung, 10);
    assert_eq!(collected[0].rung, 4);
}

#[test]
fn test_failures_are_audited() {
    let (lineage, log) = audited_lineage(10);

    assert!(lineage.sublineage(11).is_err());
    let forged = TaggedCiphertext::new(10, b"gAAAAAAAAAAA".to_vec());
    assert!(lineage.decrypt(&forged).is_err());

    let events: Vec<_> = log.lock().unwrap().iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        vec![AuditEvent::AscentRejected, AuditEvent::DecryptRejected]
    );
}

#[test]
fn test_file_sink_writes_json_lines() {
    let path = std::env::temp_dir().join(format!(
        "hashlineage-audit-{}.jsonl",
        std::process::id()
    ));
    let _ = fs::remove_file(&path);

    let (lineage, log) = audited_lineage(5);
    log.lock()
        .unwrap()
        .add_forward_sink(Box::new(FileAuditSink::new(&path).unwrap()));

    lineage.encrypt(b"one").unwrap();
    lineage.encrypt_at(b"two", 1).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<AuditRecord> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let _ = fs::remove_file(&path);

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].event, AuditEvent::Encrypted);
    assert_eq!(lines[1].event, AuditEvent::Derived);
    assert_eq!(lines[2].rung, 1);
    assert_eq!(log.lock().unwrap().sink_failures(), 0);
}
