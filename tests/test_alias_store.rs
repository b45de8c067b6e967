//! Alias persistence across engine restarts, driven through the command
//! surface rather than the table API.

mod common;

use nsh::{codes, AliasStore, ShellType};

#[test]
fn alias_added_by_command_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aliases.json");

    {
        let engine = common::engine();
        engine.attach_alias_store(AliasStore::new(&path));
        let (code, _) = common::eval(&engine, "alias add say echo");
        assert_eq!(code, codes::SUCCESS);
    }

    // A fresh engine attaching the same store picks the alias back up.
    let engine = common::engine();
    engine.attach_alias_store(AliasStore::new(&path));
    let (code, out) = common::eval(&engine, "say hello");
    assert_eq!(code, codes::SUCCESS);
    assert_eq!(out, "hello\n");
}

#[test]
fn removal_rewrites_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aliases.json");

    let engine = common::engine();
    engine.attach_alias_store(AliasStore::new(&path));
    common::eval(&engine, "alias add say echo");
    common::eval(&engine, "alias add shout echo");

    let (code, _) = common::eval(&engine, "alias rem say");
    assert_eq!(code, codes::SUCCESS);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("\"say\""));
    assert!(text.contains("\"shout\""));
}

#[test]
fn store_rows_with_unknown_types_are_skipped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aliases.json");
    std::fs::write(
        &path,
        r#"[{"Alias":"say","Command":"echo","Type":"shell"},
            {"Alias":"mail","Command":"echo","Type":"mailer"}]"#,
    )
    .unwrap();

    let engine = common::engine();
    engine.attach_alias_store(AliasStore::new(&path));
    assert!(engine.alias_exists("say", ShellType::Shell));
    assert!(!engine.alias_exists("mail", ShellType::Shell));
}

#[test]
fn scoped_aliases_only_resolve_in_their_scope() {
    let engine = common::engine();
    let (code, _) = common::eval(&engine, "alias add say echo -type=transfer");
    assert_eq!(code, codes::SUCCESS);

    // Not visible in the shell scope.
    let (code, _) = common::eval(&engine, "say hi");
    assert_eq!(code, codes::NOT_FOUND);

    let (code, out) = nsh::eval_line(&engine, ShellType::Transfer, "say hi");
    assert_eq!(code, codes::SUCCESS);
    assert_eq!(out, "hi\n");
}
