use nestcat_core::db::open_db_in_memory;
use nestcat_core::{
    CategoryListQuery, CategoryService, CategorySortField, ErrorKind, QueryService, SortDirection,
    SqliteTreeStore, ROOT_CATEGORY_ID,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn hierarchy_lists_ancestors_root_first() {
    let conn = setup();
    let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());

    let lang = service.create_category("Languages", "", None).unwrap();
    let rust = service.create_category("Rust", "", Some(lang.id)).unwrap();
    let async_rs = service.create_category("Async", "", Some(rust.id)).unwrap();

    let hierarchy = service.get_hierarchy(async_rs.id).unwrap();
    assert_eq!(hierarchy.category.id, async_rs.id);
    let ancestors: Vec<_> = hierarchy.ancestors.iter().map(|item| item.id).collect();
    assert_eq!(ancestors, vec![ROOT_CATEGORY_ID, lang.id, rust.id]);
    assert!(hierarchy.descendants.is_empty());

    let root = service.get_hierarchy(ROOT_CATEGORY_ID).unwrap();
    assert!(root.ancestors.is_empty());
}

#[test]
fn hierarchy_nests_descendants_in_preorder() {
    let conn = setup();
    let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());

    let a = service.create_category("A", "", None).unwrap();
    let a1 = service.create_category("A1", "", Some(a.id)).unwrap();
    let a2 = service.create_category("A2", "", Some(a.id)).unwrap();
    let a1x = service.create_category("A1x", "", Some(a1.id)).unwrap();
    service.create_category("B", "", None).unwrap();

    let hierarchy = service.get_hierarchy(a.id).unwrap();
    let top: Vec<_> = hierarchy
        .descendants
        .iter()
        .map(|node| node.category.id)
        .collect();
    assert_eq!(top, vec![a1.id, a2.id]);
    assert_eq!(hierarchy.descendants[0].children.len(), 1);
    assert_eq!(hierarchy.descendants[0].children[0].category.id, a1x.id);
    assert!(hierarchy.descendants[1].children.is_empty());

    let whole = service.get_hierarchy(ROOT_CATEGORY_ID).unwrap();
    let total: usize = whole.descendants.iter().map(|node| node.node_count()).sum();
    assert_eq!(total, 5);
}

#[test]
fn hierarchy_of_unknown_id_is_not_found() {
    let conn = setup();
    let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());

    let err = service.get_hierarchy(12345).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn hierarchy_serializes_with_camel_case_keys() {
    let conn = setup();
    let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());
    let a = service.create_category("A", "", None).unwrap();
    service.create_category("A1", "", Some(a.id)).unwrap();

    let value = serde_json::to_value(service.get_hierarchy(a.id).unwrap()).unwrap();
    assert_eq!(value["parentID"], ROOT_CATEGORY_ID);
    assert_eq!(value["childrenCount"], 1);
    assert_eq!(value["ancestors"][0]["name"], "Root");
    assert_eq!(value["descendants"][0]["name"], "A1");
    assert!(value["descendants"][0]["children"].as_array().unwrap().is_empty());
}

#[test]
fn list_pages_non_root_categories() {
    let conn = setup();
    let store = SqliteTreeStore::try_new(&conn).unwrap();
    let service = CategoryService::new(store);
    for index in 0..12 {
        service
            .create_category(&format!("cat-{index:02}"), "", None)
            .unwrap();
    }

    let first = service
        .list_categories(&CategoryListQuery::default())
        .unwrap();
    assert_eq!(first.count, 12);
    assert_eq!(first.rows.len(), 10);
    assert!(first.rows.iter().all(|row| row.id != ROOT_CATEGORY_ID));
    // Same-millisecond timestamps fall back to id order.
    assert_eq!(first.rows[0].name, "cat-11");

    let second = service
        .list_categories(&CategoryListQuery {
            page: 2,
            ..CategoryListQuery::default()
        })
        .unwrap();
    assert_eq!(second.count, 12);
    assert_eq!(second.rows.len(), 2);

    let ascending = QueryService::new(store)
        .list(&CategoryListQuery {
            limit: 5,
            sort_by: CategorySortField::UpdatedAt,
            sort_order: SortDirection::Asc,
            ..CategoryListQuery::default()
        })
        .unwrap();
    let names: Vec<_> = ascending.rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["cat-00", "cat-01", "cat-02", "cat-03", "cat-04"]);
}

#[test]
fn list_filters_by_case_insensitive_key() {
    let conn = setup();
    let service = CategoryService::new(SqliteTreeStore::try_new(&conn).unwrap());
    service.create_category("Rust Tips", "", None).unwrap();
    service.create_category("rusty nails", "", None).unwrap();
    service.create_category("Go", "", None).unwrap();

    let page = service
        .list_categories(&CategoryListQuery {
            key: Some(" RUST ".to_string()),
            ..CategoryListQuery::default()
        })
        .unwrap();
    assert_eq!(page.count, 2);
    assert!(page
        .rows
        .iter()
        .all(|row| row.name.to_lowercase().contains("rust")));

    let nothing = service
        .list_categories(&CategoryListQuery {
            key: Some("python".to_string()),
            ..CategoryListQuery::default()
        })
        .unwrap();
    assert_eq!(nothing.count, 0);
    assert!(nothing.rows.is_empty());
}
