use blog_core::db::open_db_in_memory;
use blog_core::{
    Comment, CommentRepository, CommentService, Entry, EntryService, RecordState, ServiceError,
    SqliteCommentRepository, SqliteEntryRepository,
};
use rusqlite::Connection;

type Entries<'conn> = EntryService<SqliteEntryRepository<'conn>, SqliteCommentRepository<'conn>>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn entries(conn: &Connection) -> Entries<'_> {
    EntryService::new(
        SqliteEntryRepository::try_new(conn).unwrap(),
        SqliteCommentRepository::try_new(conn).unwrap(),
    )
}

fn comments(conn: &Connection) -> CommentService<SqliteCommentRepository<'_>> {
    CommentService::new(SqliteCommentRepository::try_new(conn).unwrap())
}

fn saved_entry(service: &Entries<'_>, text: &str) -> Entry {
    let mut entry = Entry::with_text(text);
    service.create_entry(&mut entry).unwrap();
    entry
}

#[test]
fn new_entry_has_no_comments() {
    let conn = setup();
    let service = entries(&conn);

    let entry = Entry::new();
    assert_eq!(service.comment_count(&entry).unwrap(), 0);
    assert!(service.comments(&entry).unwrap().is_empty());

    let stored = saved_entry(&service, "Hello");
    assert_eq!(service.comment_count(&stored).unwrap(), 0);
}

#[test]
fn unattached_comment_is_not_in_collection() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let _comment = Comment::new("わー、いいなあ！");

    assert!(service.comments(&entry).unwrap().is_empty());
}

#[test]
fn create_through_entry_persists_comment() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let comment = service.create_comment(&entry, "わー、いいなあ！").unwrap();

    assert_eq!(service.comments(&entry).unwrap().to_vec(), vec![comment.clone()]);
    assert!(comment.is_persisted());
    assert_eq!(comment.entry_id(), entry.id());
}

#[test]
fn build_keeps_comment_unsaved_until_collection_is_saved() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let mut collection = service.comments(&entry).unwrap();
    let built = collection.build("わー、いいなあ！");

    assert_eq!(collection.to_vec(), vec![built.clone()]);
    assert!(!built.is_persisted());
    assert!(service.comments(&entry).unwrap().is_empty());

    let written = service.save_collection(&mut collection).unwrap();
    assert_eq!(written, 1);
    assert_eq!(collection.pending_len(), 0);
    assert!(collection.records()[0].is_persisted());
    assert_eq!(
        service.comments(&entry).unwrap().to_vec(),
        collection.to_vec()
    );
}

#[test]
fn build_on_unsaved_entry_cannot_be_saved() {
    let conn = setup();
    let service = entries(&conn);

    let mut collection = service.comments(&Entry::with_text("draft")).unwrap();
    collection.build("orphan");

    let err = service.save_collection(&mut collection).unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.on("entry").len(), 1);
    assert_eq!(collection.pending_len(), 1);
}

#[test]
fn failed_collection_save_writes_nothing() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "entry");

    let mut collection = service.comments(&entry).unwrap();
    collection.build("ok");
    collection.build("  ");

    let err = service.save_collection(&mut collection).unwrap_err();

    assert_eq!(err.validation_errors().unwrap().on("text").len(), 1);
    assert_eq!(collection.pending_len(), 2);
    assert!(collection.iter().all(Comment::is_new_record));
    assert_eq!(service.comment_count(&entry).unwrap(), 0);
}

#[test]
fn append_persists_and_preserves_order() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let mut first = Comment::new("わー、いいなあ！");
    assert!(!first.is_persisted());
    service.append_comment(&entry, &mut first).unwrap();

    let mut second = Comment::new("うらやましすぎる！！");
    service.append_comment(&entry, &mut second).unwrap();

    assert!(first.is_persisted());
    assert!(second.is_persisted());
    assert_eq!(
        service.comments(&entry).unwrap().to_vec(),
        vec![first, second]
    );
}

#[test]
fn append_moves_comment_from_another_entry() {
    let conn = setup();
    let service = entries(&conn);
    let source = saved_entry(&service, "source");
    let target = saved_entry(&service, "target");

    let mut comment = service.create_comment(&source, "moving").unwrap();
    service.append_comment(&target, &mut comment).unwrap();

    assert!(service.comments(&source).unwrap().is_empty());
    assert_eq!(service.comments(&target).unwrap().to_vec(), vec![comment]);
}

#[test]
fn moved_comment_is_listed_by_id() {
    let conn = setup();
    let service = entries(&conn);
    let source = saved_entry(&service, "source");
    let target = saved_entry(&service, "target");

    let mut old = service.create_comment(&source, "old").unwrap();
    let mut first = Comment::new("first");
    service.append_comment(&target, &mut first).unwrap();
    service.append_comment(&target, &mut old).unwrap();

    let texts: Vec<Option<String>> = service
        .comments(&target)
        .unwrap()
        .iter()
        .map(|comment| comment.text.clone())
        .collect();
    assert_eq!(texts, vec![Some("old".to_string()), Some("first".to_string())]);
}

#[test]
fn append_to_unsaved_entry_is_rejected() {
    let conn = setup();
    let service = entries(&conn);

    let mut comment = Comment::new("too early");
    let err = service
        .append_comment(&Entry::with_text("draft"), &mut comment)
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotSaved { table: "entries" }));
    assert!(comment.is_new_record());
    assert_eq!(comment.entry_id(), None);
}

#[test]
fn replace_swaps_full_collection_and_destroys_dropped_comments() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let mut comment_old = Comment::new("やった、コメント1番乗り！！");
    service.append_comment(&entry, &mut comment_old).unwrap();
    assert_eq!(
        service.comments(&entry).unwrap().to_vec(),
        vec![comment_old.clone()]
    );
    assert!(comment_old.is_persisted());

    let mut replacement = vec![
        Comment::new("わー、いいなあ！"),
        Comment::new("うらやましすぎる！！"),
    ];
    let removed = service.replace_comments(&entry, &mut replacement).unwrap();

    assert_eq!(service.comments(&entry).unwrap().to_vec(), replacement);
    assert!(replacement.iter().all(Comment::is_persisted));
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id(), comment_old.id());
    assert!(removed[0].is_destroyed());

    assert_eq!(
        comment_service.refresh_comment(&mut comment_old).unwrap(),
        RecordState::Destroyed
    );
    assert!(comment_old.is_destroyed());
}

#[test]
fn replace_collection_marks_its_dropped_records_destroyed() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");
    let comment_old = service
        .create_comment(&entry, "やった、コメント1番乗り！！")
        .unwrap();

    let mut collection = service.comments(&entry).unwrap();
    collection.build("never saved");
    let destroyed = service
        .replace_collection(
            &mut collection,
            vec![
                Comment::new("わー、いいなあ！"),
                Comment::new("うらやましすぎる！！"),
            ],
        )
        .unwrap();

    assert_eq!(destroyed.len(), 1);
    assert_eq!(destroyed[0].id(), comment_old.id());
    assert!(destroyed[0].is_destroyed());
    assert_eq!(collection.len(), 2);
    assert!(collection.iter().all(Comment::is_persisted));
    assert_eq!(collection.pending_len(), 0);
    assert_eq!(service.comments(&entry).unwrap(), collection);
    assert!(!comment_service
        .comment_exists(comment_old.id().unwrap())
        .unwrap());
}

#[test]
fn replace_collection_of_unsaved_entry_is_rejected() {
    let conn = setup();
    let service = entries(&conn);

    let mut collection = service.comments(&Entry::with_text("draft")).unwrap();
    collection.build("kept in memory");
    let err = service
        .replace_collection(&mut collection, vec![Comment::new("new")])
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotSaved { table: "entries" }));
    assert_eq!(collection.pending_len(), 1);
}

#[test]
fn replace_keeps_comments_present_in_new_set() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "entry");

    let kept = service.create_comment(&entry, "kept").unwrap();
    let dropped = service.create_comment(&entry, "dropped").unwrap();

    let mut replacement = vec![kept.clone(), Comment::new("added")];
    let removed = service.replace_comments(&entry, &mut replacement).unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id(), dropped.id());
    assert_eq!(replacement[0].id(), kept.id());
    assert_eq!(service.comments(&entry).unwrap().to_vec(), replacement);
}

#[test]
fn replace_with_empty_set_clears_collection() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "entry");
    service.create_comment(&entry, "one").unwrap();
    service.create_comment(&entry, "two").unwrap();

    let removed = service.replace_comments(&entry, &mut []).unwrap();

    assert_eq!(removed.len(), 2);
    assert_eq!(service.comment_count(&entry).unwrap(), 0);
}

#[test]
fn failed_replace_changes_nothing() {
    let conn = setup();
    let service = entries(&conn);
    let entry = saved_entry(&service, "entry");
    let existing = service.create_comment(&entry, "existing").unwrap();

    let mut invalid = Comment::new("ignored");
    invalid.text = None;
    let mut replacement = vec![Comment::new("valid"), invalid];
    let err = service
        .replace_comments(&entry, &mut replacement)
        .unwrap_err();

    assert_eq!(err.validation_errors().unwrap().on("text").len(), 1);
    assert!(replacement.iter().all(Comment::is_new_record));
    assert_eq!(replacement[0].entry_id(), None);
    assert_eq!(service.comments(&entry).unwrap().to_vec(), vec![existing]);
}

#[test]
fn assigning_entry_object_then_saving_attaches_comment() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let mut comment = Comment::new("わー、いいなあ！");
    comment.set_entry(Some(&entry));
    comment_service.save_comment(&mut comment).unwrap();

    assert_eq!(service.comments(&entry).unwrap().to_vec(), vec![comment]);
}

#[test]
fn constructing_with_entry_object_attaches_comments() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let mut comment_1 = Comment::for_entry("わー、いいなあ！", &entry);
    comment_service.save_comment(&mut comment_1).unwrap();
    let comment_2 = comment_service
        .create_comment(Comment::for_entry("うらやましすぎる！！", &entry))
        .unwrap();

    assert_eq!(
        service.comments(&entry).unwrap().to_vec(),
        vec![comment_1, comment_2]
    );
}

#[test]
fn assigning_post_id_then_saving_attaches_comment() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");

    let mut comment = Comment::new("わー、いいなあ！");
    comment.set_post_id(entry.id());
    comment_service.save_comment(&mut comment).unwrap();

    assert_eq!(service.comments(&entry).unwrap().to_vec(), vec![comment]);
}

#[test]
fn constructing_with_entry_id_attaches_comments() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "新しいMacBook Proを買いました！");
    let entry_id = entry.id().unwrap();

    let mut comment_1 = Comment::with_entry_id("わー、いいなあ！", entry_id);
    comment_service.save_comment(&mut comment_1).unwrap();
    let comment_2 = comment_service
        .create_comment(Comment::with_entry_id("うらやましすぎる！！", entry_id))
        .unwrap();

    assert_eq!(
        service.comments(&entry).unwrap().to_vec(),
        vec![comment_1, comment_2]
    );
}

#[test]
fn destroying_entry_destroys_its_comments() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let mut entry = saved_entry(&service, "こんにちは、伊藤です。");
    let mut comment = service
        .create_comment(&entry, "山田です。伊藤さん、こんにちは！")
        .unwrap();
    let other = saved_entry(&service, "untouched");
    service.create_comment(&other, "stays").unwrap();

    assert_eq!(comment_service.count_comments().unwrap(), 2);
    let removed = service.destroy_entry(&mut entry).unwrap();

    assert_eq!(removed, 1);
    assert_eq!(comment_service.count_comments().unwrap(), 1);
    assert!(entry.is_destroyed());
    assert_eq!(service.get_entry(entry.id().unwrap()).unwrap(), None);
    assert_eq!(
        comment_service.refresh_comment(&mut comment).unwrap(),
        RecordState::Destroyed
    );
}

#[test]
fn delete_by_entry_removes_only_that_entrys_comments() {
    let conn = setup();
    let service = entries(&conn);
    let repo = SqliteCommentRepository::try_new(&conn).unwrap();
    let entry = saved_entry(&service, "entry");
    let sibling = saved_entry(&service, "sibling");
    service.create_comment(&entry, "one").unwrap();
    service.create_comment(&entry, "two").unwrap();
    let kept = service.create_comment(&sibling, "kept").unwrap();

    let removed = repo.delete_by_entry(entry.id().unwrap()).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(repo.count_by_entry(entry.id().unwrap()).unwrap(), 0);
    assert_eq!(repo.find_by_entry(sibling.id().unwrap()).unwrap(), vec![kept]);
    assert_eq!(repo.delete_by_entry(entry.id().unwrap()).unwrap(), 0);
}

#[test]
fn comment_exists_tracks_stored_rows() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "entry");
    let mut comment = service.create_comment(&entry, "here").unwrap();
    let id = comment.id().unwrap();

    assert!(comment_service.comment_exists(id).unwrap());
    comment_service.destroy_comment(&mut comment).unwrap();
    assert!(!comment_service.comment_exists(id).unwrap());
    assert!(!comment_service.comment_exists(id + 100).unwrap());
}

#[test]
fn destroyed_entry_rejects_collection_access() {
    let conn = setup();
    let service = entries(&conn);
    let mut entry = saved_entry(&service, "gone");
    service.destroy_entry(&mut entry).unwrap();

    assert!(matches!(
        service.comments(&entry).unwrap_err(),
        ServiceError::Destroyed {
            table: "entries",
            ..
        }
    ));
    assert!(matches!(
        service.destroy_entry(&mut entry).unwrap_err(),
        ServiceError::Destroyed { .. }
    ));
}

#[test]
fn destroying_single_comment_leaves_siblings() {
    let conn = setup();
    let service = entries(&conn);
    let comment_service = comments(&conn);
    let entry = saved_entry(&service, "entry");
    let mut first = service.create_comment(&entry, "first").unwrap();
    let second = service.create_comment(&entry, "second").unwrap();

    comment_service.destroy_comment(&mut first).unwrap();

    assert!(first.is_destroyed());
    assert_eq!(service.comments(&entry).unwrap().to_vec(), vec![second]);
    assert!(matches!(
        comment_service.save_comment(&mut first).unwrap_err(),
        ServiceError::Destroyed {
            table: "comments",
            ..
        }
    ));
}
