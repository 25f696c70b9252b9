//! Integration tests for bundles, batch loads and manifests.
//!
//! `ScriptedIo` drives completion order by hand; `FileIo` tests use tempfile
//! to create isolated asset directories.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use stowage_assets::*;
use stowage_promise::{Progress, Scheduler};
use stowage_test_utils::{RequestKind, ScriptedIo};

// ============================================================================
// Helpers
// ============================================================================

fn scripted(capabilities: AudioCapabilities, config: LoaderConfig) -> (Rc<ScriptedIo>, AssetManager) {
    let io = Rc::new(ScriptedIo::new());
    let manager = AssetManager::new(Scheduler::new(), io.clone(), capabilities, config);
    (io, manager)
}

fn memory(config: LoaderConfig) -> (Rc<MemoryIo>, AssetManager) {
    let io = Rc::new(MemoryIo::new());
    let manager = AssetManager::new(
        Scheduler::new(),
        io.clone(),
        AudioCapabilities::new(["mp3", "ogg"]),
        config,
    );
    (io, manager)
}

fn record_progress<T: Clone + 'static>(promise: &AssetPromise<T>) -> Rc<RefCell<Vec<Progress>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    promise.on_progress(move |p| sink.borrow_mut().push(p));
    seen
}

fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

// ============================================================================
// Bundle declaration
// ============================================================================

#[test]
fn test_duplicate_bundle_keeps_original() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert("hero.png", b"px".to_vec());

    manager.create_bundle("b").unwrap();
    manager.add_bundle_asset("b", [("hero", "hero.png")]).unwrap();

    let err = manager.create_bundle("b").unwrap_err();
    assert_eq!(err, AssetError::DuplicateBundle { bundle: "b".into() });
    assert_eq!(manager.bundle("b").map(|b| b.len()), Some(1));

    let loaded = manager.load_bundle("b");
    manager.scheduler().run_until_idle();
    assert_eq!(loaded.outcome(), Some(Ok(())));
    assert_eq!(manager.bundle_status("b"), Some(BundleStatus::Loaded));
}

#[test]
fn test_duplicate_in_list_keeps_earlier_names() {
    let (_, manager) = memory(LoaderConfig::default());
    manager.create_bundle("taken").unwrap();

    let err = manager.create_bundle(["first", "taken", "never"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateBundle);
    assert_eq!(manager.bundle_names(), vec!["taken", "first"]);
}

#[test]
fn test_add_asset_overwrites_existing_key() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());

    let err = manager
        .add_bundle_asset("nowhere", [("a", "a.png")])
        .unwrap_err();
    assert_eq!(err, AssetError::BundleNotFound { bundle: "nowhere".into() });

    manager.create_bundle("b").unwrap();
    manager.add_bundle_asset("b", [("a", "first.png")]).unwrap();
    manager.add_bundle_asset("b", [("a", "second.png")]).unwrap();

    let _ = manager.load_bundle("b");
    assert_eq!(io.requested_urls(), vec!["second.png".to_string()]);
}

// ============================================================================
// Batch loads
// ============================================================================

#[test]
fn test_failed_decode_leaves_no_entry() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert_failure("x.png", "decode error");

    let promise = manager.load_assets([("a", "x.png")]);
    manager.scheduler().run_until_idle();

    let err = promise.outcome().unwrap().unwrap_err();
    assert!(matches!(err, AssetError::LoadFailed { kind: AssetKind::Image, .. }));
    assert!(!manager.resources().contains("a"));
    assert!(!manager.resources().contains("x.png"));
}

#[test]
fn test_failed_reload_keeps_earlier_entry() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());

    let _first = manager.load_assets([("hero", "hero.png")]);
    assert!(io.succeed("hero.png", b"v1".to_vec()));
    let second = manager.load_assets([("hero", "hero.png")]);
    assert!(io.fail("hero.png", "decode error"));
    manager.scheduler().run_until_idle();

    assert_eq!(second.outcome().map(|r| r.is_err()), Some(true));
    let kept = manager.resources().image("hero").map(|i| i.bytes().to_vec());
    assert_eq!(kept, Some(b"v1".to_vec()));
    assert!(manager.resources().contains("hero.png"));
}

#[test]
fn test_out_of_order_completion_keeps_input_order() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());

    let promise = manager.load_assets([("a", "a.png"), ("b", "b.json"), ("c", "c.css")]);
    let seen = record_progress(&promise);
    manager.scheduler().run_until_idle();
    assert_eq!(io.outstanding(), 3);

    assert!(io.succeed("c.css", Vec::new()));
    manager.scheduler().run_until_idle();
    assert!(io.succeed("a.png", b"px".to_vec()));
    manager.scheduler().run_until_idle();
    assert!(promise.is_pending());
    assert!(io.succeed("b.json", "[1, 2]"));
    manager.scheduler().run_until_idle();

    let loaded = promise.outcome().unwrap().unwrap();
    assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(
        *seen.borrow(),
        vec![Progress::new(1, 3), Progress::new(2, 3), Progress::new(3, 3)]
    );
    assert_eq!(
        io.calls().iter().map(|r| r.kind).collect::<Vec<_>>(),
        vec![RequestKind::DecodeImage, RequestKind::Fetch, RequestKind::InjectStylesheet]
    );
}

#[test]
fn test_unsupported_type_does_not_block_siblings() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());

    let promise = manager.load_assets([("hero", "hero.png"), ("map", "map.tmx")]);
    manager.scheduler().run_until_idle();

    let err = promise.outcome().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    assert!(err.to_string().contains("png"));

    // The image load was still dispatched and still lands in the table.
    assert!(io.succeed("hero.png", b"px".to_vec()));
    manager.scheduler().run_until_idle();
    assert!(manager.resources().image("hero").is_some());
}

#[test]
fn test_audio_negotiation() {
    let (io, manager) = scripted(AudioCapabilities::new(["mp3"]), LoaderConfig::default());

    let playable = manager.load_assets([("a", AssetSpec::from(["a.xyz", "a.mp3"]))]);
    let unplayable = manager.load_assets([("b", AssetSpec::from(["b.xyz", "b.ogg"]))]);
    manager.scheduler().run_until_idle();

    assert_eq!(io.requested_urls(), vec!["a.mp3".to_string()]);
    io.succeed("a.mp3", b"id3".to_vec());
    manager.scheduler().run_until_idle();

    let loaded = playable.outcome().unwrap().unwrap();
    let audio = loaded["a"].as_ref().and_then(Resource::as_audio).unwrap();
    assert_eq!(audio.url(), "a.mp3");

    assert_eq!(
        unplayable.outcome(),
        Some(Err(AssetError::UnsupportedAudioFormat {
            name: "b".into(),
            candidates: vec!["b.xyz".into(), "b.ogg".into()],
        }))
    );
}

#[test]
fn test_concurrent_loads_last_write_wins() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());

    let _first = manager.load_assets([("shared", "one.json")]);
    let _second = manager.load_assets([("shared", "two.json")]);
    io.succeed("two.json", "2");
    io.succeed("one.json", "1");
    manager.scheduler().run_until_idle();

    let data = manager.resources().data("shared").unwrap();
    assert_eq!(data.as_json(), Some(&serde_json::json!(1)));
}

// ============================================================================
// Bundle loads
// ============================================================================

#[test]
fn test_bundle_progress_spans_all_bundles() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());
    manager.create_bundle(["b1", "b2"]).unwrap();
    manager
        .add_bundle_asset("b1", [("a", "a.png"), ("b", "b.png")])
        .unwrap();
    manager.add_bundle_asset("b2", [("c", "c.json")]).unwrap();

    let promise = manager.load_bundle(["b1", "b2"]);
    let seen = record_progress(&promise);
    assert_eq!(manager.bundle_status("b1"), Some(BundleStatus::Loading));
    assert_eq!(manager.bundle_status("b2"), Some(BundleStatus::Loading));

    io.succeed("c.json", "{}");
    io.succeed("a.png", b"a".to_vec());
    manager.scheduler().run_until_idle();
    assert_eq!(manager.bundle_status("b2"), Some(BundleStatus::Loading));

    io.succeed("b.png", b"b".to_vec());
    manager.scheduler().run_until_idle();

    assert_eq!(promise.outcome(), Some(Ok(())));
    assert_eq!(
        *seen.borrow(),
        vec![Progress::new(1, 3), Progress::new(2, 3), Progress::new(3, 3)]
    );
    assert_eq!(manager.bundle_status("b1"), Some(BundleStatus::Loaded));
    assert_eq!(manager.bundle_status("b2"), Some(BundleStatus::Loaded));
}

#[test]
fn test_bundle_failure_advances_no_bundle() {
    let (io, manager) = scripted(AudioCapabilities::none(), LoaderConfig::default());
    manager.create_bundle(["b1", "b2"]).unwrap();
    manager.add_bundle_asset("b1", [("a", "a.png")]).unwrap();
    manager.add_bundle_asset("b2", [("c", "c.json")]).unwrap();

    let promise = manager.load_bundle(["b1", "b2"]);
    io.succeed("a.png", b"a".to_vec());
    io.fail("c.json", "503");
    manager.scheduler().run_until_idle();

    let err = promise.outcome().unwrap().unwrap_err();
    assert_eq!(
        err,
        AssetError::LoadFailed {
            kind: AssetKind::Data,
            locator: "c.json".into(),
            name: Some("c".into()),
            cause: "503".into(),
        }
    );
    assert_eq!(manager.bundle_status("b1"), Some(BundleStatus::Loading));
    assert_eq!(manager.bundle_status("b2"), Some(BundleStatus::Loading));
}

#[test]
fn test_deferred_audio_policy_in_bundle() {
    let (io, manager) = scripted(
        AudioCapabilities::new(["ogg"]),
        LoaderConfig::new().defer_audio_until_interaction(true),
    );
    manager.create_bundle("level").unwrap();
    manager
        .add_bundle_asset(
            "level",
            [
                ("hero", AssetSpec::from("hero.png")),
                ("music", AssetSpec::from(["music.ogg"])),
            ],
        )
        .unwrap();

    let promise = manager.load_bundle("level");
    let seen = record_progress(&promise);
    io.succeed("hero.png", b"px".to_vec());
    manager.scheduler().run_until_idle();

    // Audio never finished buffering, yet the bundle is done.
    assert_eq!(promise.outcome(), Some(Ok(())));
    assert_eq!(*seen.borrow(), vec![Progress::new(1, 1)]);
    assert_eq!(io.count_requests("music.ogg"), 1);
    assert_eq!(manager.resources().audio("music").map(|a| a.is_buffered()), Some(false));
}

// ============================================================================
// Manifests
// ============================================================================

const MANIFEST: &str = r#"{
    "assetRoot": "assets/",
    "imagePath": "img/",
    "audioPath": "sfx/",
    "dataPath": "data/",
    "bundles": [
        { "name": "menu", "assets": { "logo": "logo.png" } },
        { "name": "level1", "assets": { "map": "level1.json", "theme": ["theme.mp3", "theme.ogg"] } }
    ],
    "loadBundles": "level1"
}"#;

#[test]
fn test_manifest_registers_and_loads_selected_bundle() {
    let (io, manager) = scripted(AudioCapabilities::new(["ogg"]), LoaderConfig::default());

    let promise = manager.load_manifest("manifest.json");
    let seen = record_progress(&promise);
    assert!(io.succeed("manifest.json", MANIFEST));
    manager.scheduler().run_until_idle();

    assert_eq!(manager.bundle_names(), vec!["menu", "level1"]);
    assert_eq!(manager.bundle_status("menu"), Some(BundleStatus::Created));
    assert_eq!(manager.paths().images, "img/");

    assert!(io.succeed("assets/data/level1.json", r#"{"tiles": []}"#));
    assert!(io.succeed("assets/sfx/theme.ogg", b"ogg".to_vec()));
    manager.scheduler().run_until_idle();

    assert_eq!(promise.outcome(), Some(Ok(())));
    assert_eq!(manager.bundle_status("level1"), Some(BundleStatus::Loaded));
    assert_eq!(
        *seen.borrow(),
        vec![Progress::new(1, 2), Progress::new(2, 2)]
    );
    assert_eq!(io.count_requests("assets/img/logo.png"), 0);
}

#[test]
fn test_manifest_same_url_is_not_reprocessed() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert(
        "manifest.json",
        r#"{ "bundles": [{ "name": "ui", "assets": {} }] }"#,
    );

    let first = manager.load_manifest("manifest.json");
    manager.scheduler().run_until_idle();
    assert_eq!(first.outcome(), Some(Ok(())));

    let second = manager.load_manifest("manifest.json");
    manager.scheduler().run_until_idle();
    assert_eq!(second.outcome(), Some(Ok(())));
    assert_eq!(io.request_count("manifest.json"), 1);
    assert_eq!(manager.bundle_names(), vec!["ui"]);
}

#[test]
fn test_manifest_memory_holds_one_url() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert("one.json", r#"{ "bundles": [{ "name": "one" }] }"#);
    io.insert("two.json", r#"{ "bundles": [{ "name": "two" }] }"#);

    for url in ["one.json", "two.json"] {
        let _ = manager.load_manifest(url);
        manager.scheduler().run_until_idle();
    }

    // The first manifest is fetched again and its bundle collides.
    let again = manager.load_manifest("one.json");
    manager.scheduler().run_until_idle();
    assert_eq!(io.request_count("one.json"), 2);
    assert_eq!(
        again.outcome(),
        Some(Err(AssetError::DuplicateBundle { bundle: "one".into() }))
    );
}

#[test]
fn test_manifest_fetch_failure() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert_failure("manifest.json", "connection reset");

    let promise = manager.load_manifest("manifest.json");
    manager.scheduler().run_until_idle();

    let err = promise.outcome().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ManifestLoadFailed);
    assert!(err.to_string().contains("connection reset"));

    // A failed fetch is not remembered.
    io.insert("manifest.json", "{}");
    let retry = manager.load_manifest("manifest.json");
    manager.scheduler().run_until_idle();
    assert_eq!(retry.outcome(), Some(Ok(())));
}

#[test]
fn test_manifest_parse_failure() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert("text.json", "definitely not json");
    io.insert("shape.json", r#"{ "bundles": 7 }"#);

    let text = manager.load_manifest("text.json");
    let shape = manager.load_manifest("shape.json");
    manager.scheduler().run_until_idle();

    for promise in [text, shape] {
        let err = promise.outcome().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ManifestParseFailed);
    }
}

#[test]
fn test_manifest_unknown_selected_bundle() {
    let (io, manager) = memory(LoaderConfig::default());
    io.insert(
        "manifest.json",
        r#"{ "bundles": [{ "name": "ui" }], "loadBundles": ["ui", "ghost"] }"#,
    );

    let promise = manager.load_manifest("manifest.json");
    manager.scheduler().run_until_idle();

    assert_eq!(
        promise.outcome(),
        Some(Err(AssetError::BundleNotFound { bundle: "ghost".into() }))
    );
    assert_eq!(manager.bundle_status("ui"), Some(BundleStatus::Created));
}

#[test]
fn test_manifest_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(
        root,
        "manifest.json",
        br#"{
            "assetRoot": "assets/",
            "imagePath": "img/",
            "audioPath": "sfx/",
            "dataPath": "data/",
            "bundles": [{
                "name": "level1",
                "assets": {
                    "hero": "hero.png",
                    "level": "level.json",
                    "theme": ["theme.mp3", "theme.ogg"],
                    "boot": "game.js"
                }
            }],
            "loadBundles": true
        }"#,
    );
    write_file(root, "assets/img/hero.png", b"\x89PNG");
    write_file(root, "assets/data/level.json", br#"{"width": 16}"#);
    write_file(root, "assets/sfx/theme.ogg", b"OggS");
    write_file(root, "assets/game.js", b"start();");

    let io = Rc::new(FileIo::new(root));
    let manager = AssetManager::new(
        Scheduler::new(),
        io.clone(),
        AudioCapabilities::new(["ogg"]),
        LoaderConfig::default(),
    );

    let promise = manager.load_manifest("manifest.json");
    let seen = record_progress(&promise);
    manager.scheduler().run_until_idle();

    assert_eq!(promise.outcome(), Some(Ok(())));
    assert_eq!(seen.borrow().last().copied(), Some(Progress::new(4, 4)));

    let resources = manager.resources();
    assert_eq!(
        resources.image("hero").map(|i| i.bytes().to_vec()),
        Some(b"\x89PNG".to_vec())
    );
    assert_eq!(
        resources.data("level").and_then(|d| d.as_json().cloned()),
        Some(serde_json::json!({"width": 16}))
    );
    assert!(resources.audio("assets/sfx/theme.ogg").is_some_and(|a| a.is_buffered()));
    assert!(!resources.contains("boot"));
    assert_eq!(io.injected(), vec![root.join("assets/game.js")]);
}

#[test]
fn test_file_io_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let manager = AssetManager::new(
        Scheduler::new(),
        Rc::new(FileIo::new(dir.path())),
        AudioCapabilities::none(),
        LoaderConfig::default(),
    );

    let promise = manager.load_data("missing.json", Some("missing"), DataFormat::Auto);
    manager.scheduler().run_until_idle();

    let err = promise.outcome().unwrap().unwrap_err();
    assert!(err.to_string().contains("not found"));
}
