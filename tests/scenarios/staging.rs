//! Test: scratch workspace lifecycle - merged trees, collisions, cleanup

use datarun::{ScratchWorkspace, StagingError};
use std::fs;
use std::path::Path;

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_staged_tree_spans_all_modules() {
    let dir = tempfile::tempdir().unwrap();

    let client = dir.path().join("client");
    write_file(&client.join("pom.xml"), "<project/>");
    write_file(&client.join("src/main/java/base/Api.java"), "class Api {}");

    let source_client = dir.path().join("source_client");
    write_file(
        &source_client.join("src/main/java/source/Dump.java"),
        "class Dump {}",
    );

    let tools = dir.path().join("tools");
    write_file(
        &tools.join("src/main/java/tools/Cli.java"),
        "class Cli {}",
    );

    let workspace = ScratchWorkspace::create(dir.path().join("scratch")).unwrap();
    let code = workspace.copy_tree(&client, "code").unwrap();
    for module in [&source_client, &tools] {
        workspace
            .merge_tree(&module.join("src/main/java"), "code/src/main/java")
            .unwrap();
    }

    assert!(code.join("pom.xml").exists());
    assert!(code.join("src/main/java/base/Api.java").exists());
    assert!(code.join("src/main/java/source/Dump.java").exists());
    assert!(code.join("src/main/java/tools/Cli.java").exists());
}

#[test]
fn test_colliding_merge_fails_and_overwrites_nothing() {
    let dir = tempfile::tempdir().unwrap();

    let first = dir.path().join("first");
    write_file(&first.join("util/Helper.java"), "class Helper {}");
    let second = dir.path().join("second");
    write_file(&second.join("util/Helper.java"), "class Helper { int x; }");

    let workspace = ScratchWorkspace::create(dir.path().join("scratch")).unwrap();
    let code = workspace.copy_tree(&first, "code").unwrap();

    let result = workspace.merge_tree(&second, "code");
    assert!(matches!(result, Err(StagingError::Collision(_))));
    assert_eq!(
        fs::read_to_string(code.join("util/Helper.java")).unwrap(),
        "class Helper {}"
    );
}

#[test]
fn test_cleanup_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("scratch");

    // create -> destroy -> create -> destroy leaves no residue after
    // either run
    for _ in 0..2 {
        let workspace = ScratchWorkspace::create(&root).unwrap();
        write_file(&workspace.path().join("code/A.java"), "class A {}");
        workspace.remove().unwrap();
        assert!(!root.exists());
    }
}

#[test]
fn test_pre_existing_scratch_directory_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("scratch");
    fs::create_dir_all(&root).unwrap();

    assert!(matches!(
        ScratchWorkspace::create(&root),
        Err(StagingError::AlreadyExists(_))
    ));
}
