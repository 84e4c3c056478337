//! Resource-loader integration (`load`)

use haigui::host::FsLoader;
use haigui::util::config::EngineConfig;
use haigui::vm::Session;
use std::io::Write;

#[tokio::test]
async fn test_load_runs_file_through_the_loader() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shapes.lgo");
    let mut file = std::fs::File::create(&path).expect("create");
    writeln!(file, "to twice :x").expect("write");
    writeln!(file, "output :x * 2").expect("write");
    writeln!(file, "end").expect("write");
    writeln!(file, "print twice 21").expect("write");
    drop(file);

    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    session.loader = Box::new(FsLoader::new(dir.path()));
    session.execute("load \"shapes.lgo").await;
    assert_eq!(handles.io.err(), "");
    assert_eq!(handles.io.out(), "42\n");

    // definitions from the file persist in the workspace
    session.execute("print twice 5").await;
    assert_eq!(handles.io.out(), "42\n10\n");
}

#[tokio::test]
async fn test_load_missing_file_reports_error() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    session.execute("load \"nowhere.lgo").await;
    assert!(handles.io.err().contains("Couldn't read file nowhere.lgo"));
}
