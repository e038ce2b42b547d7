//! End-to-end build tests over the in-memory origin.

use std::sync::Arc;

use apphost_core::rewrite::PREFETCH_META;
use apphost_core::{App, ArtifactDigest, RenderConfig, Renderer, RequestContext};
use apphost_origin::MemoryOrigin;

const SHOP_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Shop</title>
  <!-- build 42 -->
</head>
<body>
  <script src="./app.js"></script>
</body>
</html>"#;

const LODASH: &str = "/* lodash 4.17.21 */ var _ = {};";

fn shop_origin() -> Arc<MemoryOrigin> {
    let origin = Arc::new(MemoryOrigin::new());
    origin.set_manifest(vec![App::page("shop", "1.0.0", "apps/shop")]);
    origin.put_file("apps/shop/1.0.0/index.html", "text/html", SHOP_INDEX);
    origin.put_file("apps/shop/1.0.0/app.js", "text/javascript", "console.log('shop')");
    origin
}

fn vendor_page(title: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body><script src="./vendor/lodash_4.17.21.js"></script><script src="./main.js"></script></body></html>"#
    )
}

#[tokio::test]
async fn shop_end_to_end() {
    let (renderer, report) = Renderer::init(shop_origin(), RenderConfig::default())
        .await
        .unwrap();

    assert_eq!(report.failures(), 0);
    assert_eq!(report.files_cached(), 2);

    let script = renderer.get_file("/shop/1.0.0/app.js").unwrap();
    let digest = ArtifactDigest::from_bytes(b"console.log('shop')");
    assert_eq!(script.text(), Some("console.log('shop')"));
    assert_eq!(script.sha256(), &digest);

    let document = renderer.get_application("shop", None).unwrap();
    let html = document.text().unwrap();
    assert_eq!(document.content_type(), "text/html");
    assert!(html.contains(&format!(
        r#"<script src=/shop/1.0.0/app.js integrity="{}" async defer></script>"#,
        digest.integrity()
    )));
    assert!(html.contains("<meta http-equiv=x-dns-prefetch-control content=on />"));
    assert!(!html.contains("build 42"));
    assert!(!html.contains(PREFETCH_META));

    assert_eq!(
        renderer.get_application("shop", Some("1.0.0")),
        renderer.get_file("/shop/1.0.0/index.html")
    );
}

#[tokio::test]
async fn apps_bundling_same_vendor_file_converge() {
    let origin = Arc::new(MemoryOrigin::new());
    origin.set_manifest(vec![
        App::page("shop", "1.0.0", "apps/shop"),
        App::page("blog", "3.2.0", "apps/blog"),
    ]);
    for (location, title) in [("apps/shop/1.0.0", "Shop"), ("apps/blog/3.2.0", "Blog")] {
        origin.put_file(&format!("{location}/index.html"), "text/html", vendor_page(title));
        origin.put_file(&format!("{location}/vendor/lodash_4.17.21.js"), "text/javascript", LODASH);
        origin.put_file(
            &format!("{location}/main.js"),
            "text/javascript",
            r#"import _ from "./@vendor/lodash_4.17.21.js";"#,
        );
    }

    let (renderer, report) = Renderer::init(origin, RenderConfig::default()).await.unwrap();
    assert_eq!(report.failures(), 0);

    assert_eq!(
        renderer.dependency_keys(),
        vec!["/@node_modules/lodash_4.17.21.js".to_string()]
    );
    let lodash = renderer.get_file("/@node_modules/lodash_4.17.21.js").unwrap();
    assert_eq!(lodash.sha256(), &ArtifactDigest::from_bytes(LODASH.as_bytes()));

    let integrity = format!(
        r#"src=/@node_modules/lodash_4.17.21.js integrity="{}""#,
        lodash.sha256().integrity()
    );
    for name in ["shop", "blog"] {
        let html = renderer.get_application(name, None).unwrap();
        assert!(html.text().unwrap().contains(&integrity), "{name}");
    }

    let shop_main = renderer.get_file("/shop/1.0.0/main.js").unwrap();
    assert_eq!(
        shop_main.text(),
        Some(r#"import _ from "/@node_modules/lodash_4.17.21.js";"#)
    );
}

#[tokio::test]
async fn rebuilding_identical_input_yields_identical_digests() {
    let (renderer, _) = Renderer::init(shop_origin(), RenderConfig::default())
        .await
        .unwrap();
    let first = renderer.get_application("shop", None).unwrap();

    renderer.run_full_build().await;
    let second = renderer.get_application("shop", None).unwrap();

    assert_eq!(renderer.snapshot().generation, 2);
    assert_eq!(first.sha256(), second.sha256());
    assert_eq!(first.content(), second.content());
}

#[tokio::test]
async fn binary_assets_pass_through_unchanged() {
    let origin = shop_origin();
    let png = vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0xff];
    origin.put_file("apps/shop/1.0.0/img/logo.png", "image/png", png.clone());

    let (renderer, _) = Renderer::init(origin, RenderConfig::default()).await.unwrap();
    let logo = renderer.get_file("/shop/1.0.0/img/logo.png").unwrap();

    assert_eq!(logo.content(), png.as_slice());
    assert_eq!(logo.content_type(), "image/png");
}

#[tokio::test]
async fn missing_reference_is_isolated() {
    let origin = shop_origin();
    origin.put_file(
        "apps/shop/1.0.0/index.html",
        "text/html",
        r#"<html><head></head><body><img src="img/missing.png"><script src="./app.js"></script></body></html>"#,
    );

    let (renderer, report) = Renderer::init(origin, RenderConfig::default()).await.unwrap();
    assert_eq!(report.failures(), 1);

    let html = renderer.get_application("shop", None).unwrap();
    let html = html.text().unwrap();
    assert!(html.contains("<img src=img/missing.png>"));
    assert!(html.contains("src=/shop/1.0.0/app.js"));
}

#[tokio::test]
async fn rendered_pages_carry_fresh_nonces() {
    let (renderer, _) = Renderer::init(shop_origin(), RenderConfig::default())
        .await
        .unwrap();
    let request = RequestContext::new().with_param("id", "7");

    let first = renderer.render("shop", None, &request).unwrap().unwrap();
    let second = renderer.render("shop", None, &request).unwrap().unwrap();

    assert_ne!(first.nonce, second.nonce);
    for page in [&first, &second] {
        assert_eq!(page.html.matches("Content-Security-Policy").count(), 1);
        assert!(page.html.contains(&format!(r#"nonce="{}""#, page.nonce)));
    }
}

#[tokio::test]
async fn vendor_lookalike_directories_stay_per_application() {
    let origin = Arc::new(MemoryOrigin::new());
    origin.set_manifest(vec![
        App::page("shop", "1.0.0", "apps/shop"),
        App::page("blog", "3.2.0", "apps/blog"),
    ]);
    for (location, body) in [("apps/shop/1.0.0", "shop()"), ("apps/blog/3.2.0", "blog()")] {
        origin.put_file(
            &format!("{location}/index.html"),
            "text/html",
            r#"<html><head></head><body><script src="./js/devendor/app.js"></script></body></html>"#,
        );
        origin.put_file(&format!("{location}/js/devendor/app.js"), "text/javascript", body);
    }

    let (renderer, report) = Renderer::init(origin, RenderConfig::default()).await.unwrap();
    assert_eq!(report.failures(), 0);
    assert!(renderer.dependency_keys().is_empty());

    for (name, version, body) in [("shop", "1.0.0", "shop()"), ("blog", "3.2.0", "blog()")] {
        let key = format!("/{name}/{version}/js/devendor/app.js");
        let script = renderer.get_file(&key).unwrap();
        assert_eq!(script.text(), Some(body));

        let html = renderer.get_application(name, None).unwrap();
        assert!(
            html.text().unwrap().contains(&format!(
                r#"src={key} integrity="{}""#,
                script.sha256().integrity()
            )),
            "{name}"
        );
    }
}

#[tokio::test]
async fn vendor_references_point_at_stored_keys() {
    let origin = shop_origin();
    origin.put_file(
        "apps/shop/1.0.0/main.js",
        "text/javascript",
        r#"import "./@vendor/theme_1.0.0.css";"#,
    );
    origin.put_file("apps/shop/1.0.0/@vendor/theme_1.0.0.css", "text/css", "body{}");

    let (renderer, report) = Renderer::init(origin, RenderConfig::default()).await.unwrap();
    assert_eq!(report.failures(), 0);

    let main = renderer.get_file("/shop/1.0.0/main.js").unwrap();
    assert_eq!(main.text(), Some(r#"import "/@node_modules/theme_1.0.0.css";"#));

    let theme = renderer.get_file("/@node_modules/theme_1.0.0.css").unwrap();
    assert_eq!(theme.content_type(), "text/css");
    assert!(!renderer.has_file("/shop/1.0.0/@vendor/theme_1.0.0.css"));
    assert_eq!(
        renderer.dependency_keys(),
        vec!["/@node_modules/theme_1.0.0.css".to_string()]
    );
}
