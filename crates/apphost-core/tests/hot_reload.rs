//! Snapshot publication under concurrent rebuilds.

use std::sync::Arc;
use std::time::Duration;

use apphost_core::{App, HotReloader, ReloadOutcome, ReloadState, RenderConfig, Renderer};
use apphost_origin::MemoryOrigin;

fn chat(version: &str) -> App {
    App::script("chat", version, "widgets/chat", "/widgets/chat.js")
}

fn origin() -> Arc<MemoryOrigin> {
    let origin = Arc::new(MemoryOrigin::new());
    origin.set_manifest(vec![chat("1"), App::page("shop", "1.0.0", "apps/shop")]);
    origin.put_file("widgets/chat/1", "text/javascript", "chat v1");
    origin.put_file("widgets/chat/2", "text/javascript", "chat v2");
    origin.put_file(
        "apps/shop/1.0.0/index.html",
        "text/html",
        "<html><head></head><body>shop one</body></html>",
    );
    origin.put_file(
        "apps/shop/2.0.0/index.html",
        "text/html",
        "<html><head></head><body>shop two</body></html>",
    );
    origin
}

#[tokio::test]
async fn readers_see_previous_generation_until_publish() {
    let origin = origin();
    let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();
    let reloader = Arc::new(HotReloader::new(renderer.clone(), Duration::from_secs(60)));
    let mut state = reloader.state();

    origin.set_manifest(vec![chat("2"), App::page("shop", "2.0.0", "apps/shop")]);
    origin.close_gate();

    let tick = tokio::spawn({
        let reloader = Arc::clone(&reloader);
        async move { reloader.tick().await }
    });
    state
        .wait_for(|s| *s == ReloadState::Rebuilding)
        .await
        .unwrap();

    // Rebuild is in flight and held on the origin.
    let before = renderer.snapshot();
    assert_eq!(before.generation, 1);
    assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("chat v1"));
    assert!(renderer.has_application("shop", Some("1.0.0")));
    assert!(!renderer.has_application("shop", Some("2.0.0")));

    origin.open_gate();
    let outcome = tick.await.unwrap();

    match outcome {
        ReloadOutcome::Rebuilt { delta, report } => {
            assert_eq!(delta.updated.len(), 2);
            assert_eq!(report.failures(), 0);
        }
        other => panic!("expected rebuild, got {other:?}"),
    }
    assert_eq!(renderer.snapshot().generation, 2);
    assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("chat v2"));
    let shop = renderer.get_application("shop", None).unwrap();
    assert!(shop.text().unwrap().contains("shop two"));

    // The held snapshot is unaffected by the publish.
    assert_eq!(before.store.get("/widgets/chat.js").unwrap().text(), Some("chat v1"));
    assert_eq!(*state.borrow(), ReloadState::Idle);
}

#[tokio::test]
async fn removed_application_is_dropped_from_index() {
    let origin = origin();
    let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();
    assert_eq!(
        renderer.list_application_names(),
        vec!["chat".to_string(), "shop".to_string()]
    );

    origin.set_manifest(vec![chat("1")]);
    let reloader = HotReloader::new(renderer.clone(), Duration::from_secs(60));
    match reloader.tick().await {
        ReloadOutcome::Rebuilt { delta, .. } => {
            assert_eq!(delta.removed, vec!["shop".to_string()]);
            assert!(delta.added.is_empty());
        }
        other => panic!("expected rebuild, got {other:?}"),
    }

    assert_eq!(renderer.list_application_names(), vec!["chat".to_string()]);
    assert!(!renderer.has_application("shop", None));
}

#[tokio::test]
async fn outage_then_recovery() {
    let origin = origin();
    let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();
    let reloader = HotReloader::new(renderer.clone(), Duration::from_secs(60));

    origin.set_manifest(vec![chat("2")]);
    origin.take_manifest_down();
    assert!(matches!(reloader.tick().await, ReloadOutcome::Skipped { .. }));
    assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("chat v1"));

    origin.restore_manifest();
    assert!(matches!(reloader.tick().await, ReloadOutcome::Rebuilt { .. }));
    assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("chat v2"));
    assert!(matches!(reloader.tick().await, ReloadOutcome::Unchanged));
}

#[tokio::test]
async fn failed_application_does_not_block_publish() {
    let origin = origin();
    let (renderer, _) = Renderer::init(origin.clone(), RenderConfig::default()).await.unwrap();

    origin.set_manifest(vec![chat("3"), App::page("shop", "2.0.0", "apps/shop")]);
    let report = renderer.rebuild_with(origin_manifest(&origin).await).await;

    assert_eq!(report.failed_apps(), vec!["chat"]);
    assert_eq!(renderer.snapshot().generation, 2);
    assert!(renderer.has_application("shop", Some("2.0.0")));
    // Seeded from the previous generation, so the last good bundle stays.
    assert_eq!(renderer.get_file("/widgets/chat.js").unwrap().text(), Some("chat v1"));
}

async fn origin_manifest(origin: &MemoryOrigin) -> Vec<App> {
    use apphost_core::OriginClient;
    origin.fetch_manifest().await.unwrap()
}
