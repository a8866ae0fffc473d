use nestcat_core::db::open_db;
use nestcat_core::{
    CategoryService, DocumentRepository, NewDocument, SqliteDocumentRepository, SqliteTreeStore,
    ROOT_CATEGORY_ID,
};
use std::thread;

const WRITERS: usize = 4;
const ROUNDS: usize = 5;

#[test]
fn concurrent_writers_keep_tree_and_counters_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");

    let (shared_id, inbox_id) = {
        let conn = open_db(&path).unwrap();
        let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());
        let shared = service.create_category("Shared", "", None).unwrap();
        let inbox = service.create_category("Inbox", "", None).unwrap();
        (shared.id, inbox.id)
    };

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());
                let documents = SqliteDocumentRepository::new(&conn);

                for round in 0..ROUNDS {
                    let category = service
                        .create_category(&format!("w{writer}-r{round}"), "", Some(shared_id))
                        .unwrap();
                    if round % 2 == 1 {
                        service.move_categories(&[category.id], inbox_id).unwrap();
                    }

                    let doc = documents
                        .create_document(&NewDocument::new(format!("w{writer}-doc{round}"), ""))
                        .unwrap();
                    service.attach_documents(inbox_id, &[doc.id]).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());

    let violations = service.verify_tree().unwrap();
    assert!(violations.is_empty(), "tree violations: {violations:?}");

    let inbox = service.get_category(inbox_id).unwrap();
    assert_eq!(inbox.amount, (WRITERS * ROUNDS) as i64);

    let moved_per_writer = (ROUNDS / 2) as i64;
    assert_eq!(inbox.children_count, WRITERS as i64 * moved_per_writer);
    let shared = service.get_category(shared_id).unwrap();
    assert_eq!(
        shared.children_count,
        (WRITERS * ROUNDS) as i64 - WRITERS as i64 * moved_per_writer
    );

    let root = service.get_category(ROOT_CATEGORY_ID).unwrap();
    assert_eq!(root.rgt, 2 * (3 + (WRITERS * ROUNDS) as i64));
}
