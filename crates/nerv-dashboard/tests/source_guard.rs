use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_rs_files(&path, out);
            } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
}

fn source_files() -> Vec<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rs_files(&manifest_dir.join("src"), &mut files);
    assert!(!files.is_empty(), "no sources found under src/");
    files
}

#[test]
fn dashboard_sources_are_ascii() {
    // The bitmap fonts only carry ASCII glyphs.
    let offenders: Vec<_> = source_files()
        .into_iter()
        .filter(|file| {
            let content = fs::read_to_string(file).unwrap_or_default();
            !content.is_ascii()
        })
        .collect();

    assert!(
        offenders.is_empty(),
        "dashboard sources must be ASCII only. Offenders: {offenders:?}"
    );
}

#[test]
fn only_the_binary_prints() {
    let offenders: Vec<_> = source_files()
        .into_iter()
        .filter(|file| {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name == "main.rs" || name == "cli.rs" {
                return false;
            }
            let content = fs::read_to_string(file).unwrap_or_default();
            content.contains("println!") || content.contains("eprintln!")
        })
        .collect();

    assert!(
        offenders.is_empty(),
        "library code must log through tracing. Offenders: {offenders:?}"
    );
}
