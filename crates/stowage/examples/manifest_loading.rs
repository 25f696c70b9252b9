//! Manifest-driven loading from disk.
//!
//! Writes a small asset tree into a temporary directory, loads it through a
//! manifest and prints progress as each asset completes.
//!
//! Run with `RUST_LOG=debug` to see every dispatch and completion.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use stowage::core::profiling::{self, ProfilingBackend};
use stowage::prelude::*;

const MANIFEST: &str = r#"{
    "assetRoot": "assets/",
    "imagePath": "img/",
    "audioPath": "sfx/",
    "dataPath": "data/",
    "bundles": [
        {
            "name": "menu",
            "assets": { "logo": "logo.png", "style": "menu.css" }
        },
        {
            "name": "level1",
            "assets": {
                "hero": "hero.png",
                "map": "level1.json",
                "theme": ["theme.m4a", "theme.ogg"]
            }
        }
    ],
    "loadBundles": "all"
}"#;

fn write_tree(root: &Path) -> std::io::Result<()> {
    let files: [(&str, &[u8]); 6] = [
        ("manifest.json", MANIFEST.as_bytes()),
        ("assets/img/logo.png", b"\x89PNG logo"),
        ("assets/img/hero.png", b"\x89PNG hero"),
        ("assets/menu.css", b"body { margin: 0 }"),
        ("assets/data/level1.json", br#"{"width": 32, "height": 18}"#),
        ("assets/sfx/theme.ogg", b"OggS"),
    ];
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    stowage::logging::init();
    profiling::init_profiling(ProfilingBackend::PuffinHttp);

    let dir = tempfile::tempdir()?;
    write_tree(dir.path())?;

    let manager = AssetManager::new(
        Scheduler::new(),
        Rc::new(FileIo::new(dir.path())),
        AudioCapabilities::probe(|mime| mime.starts_with("audio/ogg")),
        LoaderConfig::default(),
    );

    let loaded = manager
        .load_manifest("manifest.json")
        .on_progress(|progress| {
            println!("loaded {} ({:.0}%)", progress, progress.fraction() * 100.0);
        });

    while loaded.is_pending() && !manager.scheduler().is_idle() {
        profiling::new_frame();
        manager.scheduler().tick();
    }

    match loaded.outcome() {
        Some(Ok(())) => {}
        Some(Err(error)) => return Err(error.into()),
        None => return Err("manifest never settled".into()),
    }

    for name in manager.bundle_names() {
        println!("bundle {:<8} {:?}", name, manager.bundle_status(&name));
    }
    if let Some(map) = manager.resources().data("map").as_ref().and_then(DataValue::as_json) {
        println!("map is {} x {}", map["width"], map["height"]);
    }
    let theme = manager.resources().audio("theme");
    println!("theme plays from {:?}", theme.as_ref().map(|a| a.url()));

    Ok(())
}
