use std::sync::Arc;
use std::thread;

use rstest::rstest;
use xqbridge_store::{Cursor, CursorKind, QName, Store, StoreErrorKind};

fn child(cursor: &Cursor, local: &str) -> Cursor {
    let mut next = cursor.duplicate();
    assert!(next.to_child(local), "missing <{local}>");
    next
}

#[rstest]
fn every_mutation_bumps_the_version() {
    let doc = Store::new().parse_document("<r><a>1</a></r>").unwrap();
    let root = child(&doc.new_cursor(), "r");
    let a = child(&root, "a");

    let mut last = doc.current_version();
    let mut check = |label: &str| {
        let now = doc.current_version();
        assert!(now > last, "{label} did not bump the version");
        last = now;
    };

    a.set_text("2").unwrap();
    check("set_text");
    root.append_element(QName::local("b")).unwrap();
    check("append_element");
    root.append_text("tail").unwrap();
    check("append_text");
    root.set_attribute(QName::local("id"), "x").unwrap();
    check("set_attribute");
    a.remove().unwrap();
    check("remove");
}

#[rstest]
fn reading_and_annotating_keep_the_version() {
    let doc = Store::new().parse_document("<r><a>1</a></r>").unwrap();
    let before = doc.current_version();
    let a = child(&child(&doc.new_cursor(), "r"), "a");
    let _ = a.text();
    let _ = a.xml_text().unwrap();
    a.set_type_annotation(QName::local("t")).unwrap();
    let weak = a.weak();
    weak.release();
    assert_eq!(doc.current_version(), before);
}

#[rstest]
fn removed_nodes_reject_mutation() {
    let doc = Store::new().parse_document("<r><a/></r>").unwrap();
    let a = child(&child(&doc.new_cursor(), "r"), "a");
    a.remove().unwrap();
    assert!(!a.is_attached());
    let err = a.set_text("late").unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::Detached);
    assert!(doc.cursor_at(a.node()).is_none());
}

#[rstest]
fn weak_cursors_are_counted_apart_from_pinned_ones() {
    let doc = Store::new().parse_document("<r/>").unwrap();
    let pinned = doc.new_cursor();
    let weak = pinned.weak();
    assert_eq!(weak.kind(), CursorKind::Weak);
    assert_eq!((doc.pinned_cursor_count(), doc.weak_cursor_count()), (1, 1));
    let copy = weak.clone();
    assert_eq!(doc.weak_cursor_count(), 2);
    drop((weak, copy));
    assert_eq!((doc.pinned_cursor_count(), doc.weak_cursor_count()), (1, 0));
}

#[rstest]
fn concurrent_writers_are_all_counted() {
    let doc = Arc::new(Store::new().parse_document("<r/>").unwrap());
    let before = doc.current_version();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let doc = Arc::clone(&doc);
            thread::spawn(move || {
                let root = child(&doc.new_cursor(), "r");
                for _ in 0..25 {
                    root.append_element(QName::local("x")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(doc.current_version(), before + 100);
    assert_eq!(child(&doc.new_cursor(), "r").xml_text().unwrap().matches("<x/>").count(), 100);
}
