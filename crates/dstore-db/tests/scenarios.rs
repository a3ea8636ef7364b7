use bson::{doc, Bson};

use dstore_collection::{Collection, CollectionOptions};
use dstore_db::{CollectionSpec, Database};
use dstore_index::{IndexDefinition, IndexField};
use dstore_storage::MemoryAdapter;
use dstore_wal::EntryType;

fn seeded_collection(docs: Vec<bson::Document>) -> Collection {
    let mut coll = Collection::new("people", Box::new(MemoryAdapter::new()), CollectionOptions::default()).unwrap();
    for doc in docs {
        coll.create(doc).unwrap();
    }
    coll
}

/// S1 — basic comparison, interpreted and compiled paths agree.
#[test]
fn s1_basic_comparison() {
    let mut coll = seeded_collection(vec![
        doc! { "id": 1, "age": 25 },
        doc! { "id": 2, "age": 30 },
        doc! { "id": 3, "age": 35 },
    ]);
    let filter_doc = doc! { "age": { "$gt": 28 } };
    let filter = dstore_query::parse_filter(&filter_doc).unwrap();
    let interpreted: Vec<Bson> = coll.find(&filter).unwrap().iter().map(|d| d.get("id").cloned().unwrap()).collect();
    assert_eq!(interpreted, vec![Bson::Int32(2), Bson::Int32(3)]);

    let everything = dstore_query::Expression::And(vec![]);
    let compiled = dstore_query::compile(&filter).unwrap();
    let compiled_matches: Vec<Bson> = coll
        .find(&everything)
        .unwrap()
        .iter()
        .filter(|d| compiled.matches(d))
        .map(|d| d.get("id").cloned().unwrap())
        .collect();
    assert_eq!(compiled_matches, interpreted);
}

/// S2 — dotted path + array broadcasting with $regex/$all/$size.
#[test]
fn s2_dotted_array_broadcasting() {
    let doc = doc! { "id": 1, "profile": { "skills": ["JavaScript", "TypeScript"] } };

    let regex_filter = dstore_query::parse_filter(&doc! { "profile.skills": { "$regex": "^Type" } }).unwrap();
    assert!(dstore_query::evaluate(&regex_filter, &doc));

    let all_filter =
        dstore_query::parse_filter(&doc! { "profile.skills": { "$all": ["JavaScript", "TypeScript"] } }).unwrap();
    assert!(dstore_query::evaluate(&all_filter, &doc));

    let size_filter = dstore_query::parse_filter(&doc! { "profile.skills": { "$size": 4 } }).unwrap();
    assert!(!dstore_query::evaluate(&size_filter, &doc));
}

/// S3 — $elemMatch over an array of subdocuments.
#[test]
fn s3_elem_match() {
    let doc = doc! { "id": 1, "items": [{ "value": 5 }, { "value": 12 }] };

    let matches = dstore_query::parse_filter(&doc! { "items": { "$elemMatch": { "value": { "$gt": 10 } } } }).unwrap();
    assert!(dstore_query::evaluate(&matches, &doc));

    let no_match = dstore_query::parse_filter(&doc! { "items": { "$elemMatch": { "value": { "$gt": 20 } } } }).unwrap();
    assert!(!dstore_query::evaluate(&no_match, &doc));
}

/// S4 — composite index forward scan order: name asc, age desc.
#[test]
fn s4_composite_index_order() {
    let mut coll = Collection::new("people", Box::new(MemoryAdapter::new()), CollectionOptions::default()).unwrap();
    coll.create_index(IndexDefinition::composite(
        "by_name_age",
        vec![IndexField::asc("name"), IndexField::desc("age")],
    ))
    .unwrap();
    coll.create(doc! { "id": "A/30", "name": "A", "age": 30 }).unwrap();
    coll.create(doc! { "id": "B/25", "name": "B", "age": 25 }).unwrap();
    coll.create(doc! { "id": "A/25", "name": "A", "age": 25 }).unwrap();

    let order = coll.index_ids_in_order("by_name_age");
    assert_eq!(
        order,
        vec![Bson::String("A/30".into()), Bson::String("A/25".into()), Bson::String("B/25".into())]
    );
}

/// S5 — TTL eviction on read.
#[test]
fn s5_ttl_eviction() {
    let mut options = CollectionOptions::default();
    options.ttl_millis = Some(100);
    let mut coll = Collection::new("people", Box::new(MemoryAdapter::new()), options).unwrap();
    coll.create(doc! { "id": 1 }).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(150));

    let all = dstore_query::Expression::And(vec![]);
    assert_eq!(coll.find(&all).unwrap().len(), 0);
    assert_eq!(coll.len(), 0);
}

/// S6 — transaction commit/rollback against the file adapter.
#[test]
fn s6_transaction_commit_and_rollback() {
    let dir = tempfile::tempdir().unwrap();

    // Rollback: WAL records PREPARE + ROLLBACK, on-disk snapshot untouched.
    {
        let mut db = Database::open("shop", dir.path()).unwrap();
        db.create_collection("widgets", CollectionSpec::new()).unwrap();

        let mut staged = db.collection("widgets").unwrap().snapshot();
        staged.list.push(doc! { "id": 1 });
        staged.list.push(doc! { "id": 2 });

        db.start_transaction("tx-abort").unwrap();
        db.stage_snapshot("tx-abort", "widgets", staged).unwrap();
        db.abort_transaction("tx-abort").unwrap();

        assert_eq!(db.collection("widgets").unwrap().len(), 0);
        let entries: Vec<EntryType> = db.transaction_log().entries().iter().map(|e| e.entry_type).collect();
        assert!(entries.contains(&EntryType::Prepare));
        assert!(entries.contains(&EntryType::Rollback));
        assert!(!entries.contains(&EntryType::Commit));
    }

    // Commit: WAL records PREPARE + DATA + COMMIT, snapshot holds both docs.
    {
        let commit_dir = tempfile::tempdir().unwrap();
        let mut db = Database::open("shop", commit_dir.path()).unwrap();
        db.create_collection("widgets", CollectionSpec::new()).unwrap();

        let mut staged = db.collection("widgets").unwrap().snapshot();
        staged.list.push(doc! { "id": 1 });
        staged.list.push(doc! { "id": 2 });

        db.start_transaction("tx-commit").unwrap();
        db.stage_snapshot("tx-commit", "widgets", staged).unwrap();
        db.commit_transaction("tx-commit").unwrap();

        assert_eq!(db.collection("widgets").unwrap().len(), 2);
        let entries: Vec<EntryType> = db.transaction_log().entries().iter().map(|e| e.entry_type).collect();
        assert!(entries.contains(&EntryType::Prepare));
        assert!(entries.contains(&EntryType::Commit));
    }
}

/// Checkpoint/restore round-trips every collection's state (`spec.md` §4.7).
#[test]
fn checkpoint_restores_prior_collection_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open("shop", dir.path()).unwrap();
    db.create_collection("widgets", CollectionSpec::new()).unwrap();
    db.collection("widgets").unwrap().create(doc! { "id": 1 }).unwrap();

    let checkpoint = db.checkpoint();
    db.collection("widgets").unwrap().create(doc! { "id": 2 }).unwrap();
    assert_eq!(db.collection("widgets").unwrap().len(), 2);

    db.restore_checkpoint(&checkpoint).unwrap();
    assert_eq!(db.collection("widgets").unwrap().len(), 1);
}
