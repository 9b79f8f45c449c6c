//! Minimal walkthrough: register a loader, request a file asynchronously,
//! drive the integrator, read the content.

use std::time::Duration;

use vesper_assets::{AssetCache, AssetEvent, Handle, TextLoader};

fn main() {
    vesper_core::logging::init();

    // Stage a small asset root.
    let root = std::env::temp_dir().join("vesper-basic-loading");
    std::fs::create_dir_all(&root).expect("failed to create asset root");
    std::fs::write(root.join("greeting.txt"), "hello from disk").expect("failed to write asset");

    let cache = AssetCache::with_root(&root);
    cache.register_loader(TextLoader);

    let handle: Handle<String> = cache.load_async("greeting.txt").expect("invalid request");
    println!("requested greeting.txt as {:?}", handle);

    // The host application would call update() once per frame; here we just
    // pump until everything settles.
    loop {
        cache.update();

        let mut settled = false;
        for event in cache.drain_events() {
            match event {
                AssetEvent::Loaded { id, success, error } => {
                    println!("loaded {}: success={} error={:?}", id, success, error);
                }
                AssetEvent::AllSettled => settled = true,
            }
        }
        if settled {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let text = cache.get(&handle).expect("asset should be loaded");
    println!("content: {}", text);
    println!("aggregate progress: {}", cache.aggregate_progress());
}
