use super::Persistence;
use crate::broker::Envelope;
use crate::message::MessageKind;
use tempfile::tempdir;

fn envelope(subject: &str, payload: &str, timestamp: i64) -> Envelope {
    Envelope {
        subject: subject.to_string(),
        kind: MessageKind::Publish,
        payload: payload.to_string(),
        timestamp,
    }
}

#[test]
fn test_store_and_load_in_order() {
    let dir = tempdir().unwrap();
    let store = Persistence::open(dir.path(), None, None).unwrap();
    let now = chrono::Utc::now().timestamp_millis();

    store.store(&envelope("GMSEC.A", "second", now + 1)).unwrap();
    store.store(&envelope("GMSEC.A", "first", now)).unwrap();

    let loaded = store.load_subject("GMSEC.A").unwrap();
    let payloads: Vec<&str> = loaded.iter().map(|e| e.payload.as_str()).collect();
    assert_eq!(payloads, vec!["first", "second"]);
    assert!(store.load_subject("GMSEC.B").unwrap().is_empty());
}

#[test]
fn test_max_per_subject_drops_oldest() {
    let store = Persistence::temporary(None, Some(2)).unwrap();
    let now = chrono::Utc::now().timestamp_millis();
    for (i, payload) in ["a", "b", "c"].iter().enumerate() {
        store
            .store(&envelope("GMSEC.A", payload, now + i as i64))
            .unwrap();
    }
    let payloads: Vec<String> = store
        .load_subject("GMSEC.A")
        .unwrap()
        .into_iter()
        .map(|e| e.payload)
        .collect();
    assert_eq!(payloads, vec!["b", "c"]);
}

#[test]
fn test_ttl_expires_old_envelopes() {
    let store = Persistence::temporary(Some(60), None).unwrap();
    let now = chrono::Utc::now().timestamp_millis();
    store.store(&envelope("GMSEC.A", "stale", now - 120_000)).unwrap();
    store.store(&envelope("GMSEC.A", "fresh", now)).unwrap();

    let loaded = store.load_subject("GMSEC.A").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].payload, "fresh");
}

#[test]
fn test_load_matching_uses_patterns() {
    let store = Persistence::temporary(None, None).unwrap();
    let now = chrono::Utc::now().timestamp_millis();
    store.store(&envelope("GMSEC.SAT1.HB", "1", now)).unwrap();
    store.store(&envelope("GMSEC.SAT2.HB", "2", now + 1)).unwrap();
    store.store(&envelope("GMSEC.SAT2.LOG", "3", now + 2)).unwrap();

    let hb: Vec<String> = store
        .load_matching("GMSEC.*.HB")
        .unwrap()
        .into_iter()
        .map(|e| e.payload)
        .collect();
    assert_eq!(hb, vec!["1", "2"]);
    assert_eq!(store.load_matching("GMSEC.>").unwrap().len(), 3);
    assert!(store.load_matching("OTHER.>").unwrap().is_empty());
}
