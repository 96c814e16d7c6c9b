//! End-to-end pipeline tests against a mock maker site.
//!
//! Each test serves a maker page (with the state blob written the way the
//! site's bundle writes it — unquoted keys, `!0`, `void 0`) plus image
//! endpoints from a wiremock server, scrapes into a temp directory, and
//! checks the produced tree and manifests.

use assert_json_diff::assert_json_eq;
use picrew_archive::manifest::{ASSETS_FILE, CONFIG_FILE, INCOMPLETE_FILE, SEPARATED_FILE};
use picrew_archive::{manifest, Scraper};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wrap a state blob into page markup, pointing image urls at the mock
/// server.
fn page(blob_template: &str, server_uri: &str) -> String {
    let blob = blob_template.replace("SERVER", server_uri);
    format!(
        "<!doctype html><html><head><title>maker</title></head><body>\
         <div id=\"app\"></div>\
         <script>window.__NUXT__={blob};</script>\
         <script src=\"/js/app.js\" defer></script></body></html>"
    )
}

async fn mount_page(server: &MockServer, maker_id: u32, blob_template: &str) -> String {
    let body = page(blob_template, &server.uri());
    let route = format!("/en/image_maker/{maker_id}");
    Mock::given(method("GET"))
        .and(path(route.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
    format!("{}{route}", server.uri())
}

async fn mount_png(server: &MockServer, route: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route.to_owned()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
        .mount(server)
        .await;
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

/// One active part with a single uncategorized color and one declared-but-
/// empty part: the empty part must leave no trace anywhere.
const BASIC_BLOB: &str = r#"{state:{imageMakerId:77,loaded:!0,config:{
    pList:[
        {pId:1,pNm:"hair",items:[{itmId:10}],lyrs:[5],thumbUrl:"SERVER/img/thumb1.png",cpId:void 0},
        {pId:2,pNm:"ghost",items:[{itmId:20}],lyrs:[6]}
    ],
    lyrList:{5:50,6:60},cpList:{}},
    commonImages:{
        10:{5:{0:{url:"SERVER/img/a.png"}}},
        20:{6:{0:{url:""}}}
    },memberImages:{}}}"#;

#[tokio::test]
async fn test_basic_scrape_produces_tree_and_manifests() {
    let server = MockServer::start().await;
    let url = mount_page(&server, 77, BASIC_BLOB).await;
    mount_png(&server, "/img/a.png", b"png-a").await;
    mount_png(&server, "/img/thumb1.png", b"png-thumb").await;

    let dest = tempfile::tempdir().unwrap();
    let outcome = Scraper::new().scrape(&url, dest.path(), None).await.unwrap();

    assert_eq!(outcome.maker_id, "77");
    assert!(outcome.report.is_complete());
    let maker = dest.path().join("Maker_77");
    assert_eq!(outcome.maker_dir, maker);

    // The single active (part, layer) pair landed on coordinate 1-1.
    assert_eq!(
        std::fs::read(maker.join("1-1/default/1.png")).unwrap(),
        b"png-a"
    );
    assert_eq!(std::fs::read(maker.join("1-1/nav.png")).unwrap(), b"png-thumb");

    // The empty part produced no output of any kind.
    assert!(!maker.join("1-2").exists());
    assert!(!maker.join("2-2").exists());

    let assets = read_json(&maker.join(ASSETS_FILE));
    assert_json_eq!(
        assets,
        json!([{
            "folder": "1-1", "x": 1, "y": 1,
            "colors": [{"code": "default", "items": ["1.png"]}]
        }])
    );

    let config = read_json(&maker.join(CONFIG_FILE));
    assert_eq!(config["pList"].as_array().unwrap().len(), 1);
    assert_json_eq!(config["lyrList"], json!({"5": 1}));

    assert_json_eq!(read_json(&maker.join(SEPARATED_FILE)), json!([]));
    assert!(!maker.join(INCOMPLETE_FILE).exists());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    let url = mount_page(&server, 77, BASIC_BLOB).await;
    mount_png(&server, "/img/a.png", b"png-a").await;
    mount_png(&server, "/img/thumb1.png", b"png-thumb").await;

    let dest = tempfile::tempdir().unwrap();
    let scraper = Scraper::new();

    let first = scraper.scrape(&url, dest.path(), None).await.unwrap();
    assert_eq!(first.report.downloaded, 2);

    let image_requests = |reqs: &[wiremock::Request]| {
        reqs.iter()
            .filter(|r| r.url.path().starts_with("/img/"))
            .count()
    };
    let after_first = image_requests(&server.received_requests().await.unwrap());
    assert_eq!(after_first, 2);

    let assets_before = std::fs::read(dest.path().join("Maker_77").join(ASSETS_FILE)).unwrap();
    let image_before = std::fs::read(dest.path().join("Maker_77/1-1/default/1.png")).unwrap();

    let second = scraper.scrape(&url, dest.path(), None).await.unwrap();
    assert_eq!(second.report.downloaded, 0);
    assert_eq!(second.report.skipped, 2);

    // Zero additional image requests on the second run.
    let after_second = image_requests(&server.received_requests().await.unwrap());
    assert_eq!(after_second, after_first);

    // Byte-identical outputs.
    assert_eq!(
        std::fs::read(dest.path().join("Maker_77").join(ASSETS_FILE)).unwrap(),
        assets_before
    );
    assert_eq!(
        std::fs::read(dest.path().join("Maker_77/1-1/default/1.png")).unwrap(),
        image_before
    );
}

/// An item drawn by stacking a declared and an undeclared layer: both
/// collapse into the part's folder and the merge is recorded.
const MERGE_BLOB: &str = r#"{state:{imageMakerId:88,config:{
    pList:[{pId:1,items:[{itmId:10}],lyrs:[5]}],
    lyrList:{5:10,9:90},cpList:{}},
    commonImages:{10:{
        5:{0:{url:"SERVER/img/base.png"}},
        9:{0:{url:"SERVER/img/overlay.png"}}
    }},memberImages:{}}}"#;

#[tokio::test]
async fn test_multi_layer_merge_recorded_in_separated_layers() {
    let server = MockServer::start().await;
    let url = mount_page(&server, 88, MERGE_BLOB).await;
    mount_png(&server, "/img/base.png", b"png-base").await;
    mount_png(&server, "/img/overlay.png", b"png-overlay").await;

    let dest = tempfile::tempdir().unwrap();
    let outcome = Scraper::new().scrape(&url, dest.path(), None).await.unwrap();

    let maker = outcome.maker_dir;
    assert!(maker.join("1-1/default/1.png").exists());
    assert!(maker.join("1-1/default/2.png").exists());
    assert_json_eq!(read_json(&maker.join(SEPARATED_FILE)), json!(["1-1"]));
}

/// Two declared, active layers of one part: two distinct folders, and no
/// multi-layer merge.
const TWO_LAYER_BLOB: &str = r#"{state:{imageMakerId:88,config:{
    pList:[{pId:1,items:[{itmId:10}],lyrs:[5,6]}],
    lyrList:{5:10,6:20},cpList:{}},
    commonImages:{10:{
        5:{0:{url:"SERVER/img/base.png"}},
        6:{0:{url:"SERVER/img/overlay.png"}}
    }},memberImages:{}}}"#;

#[tokio::test]
async fn test_two_declared_layers_stay_separate() {
    let server = MockServer::start().await;
    let url = mount_page(&server, 88, TWO_LAYER_BLOB).await;
    mount_png(&server, "/img/base.png", b"png-base").await;
    mount_png(&server, "/img/overlay.png", b"png-overlay").await;

    let dest = tempfile::tempdir().unwrap();
    let outcome = Scraper::new().scrape(&url, dest.path(), None).await.unwrap();

    let maker = outcome.maker_dir;
    assert!(maker.join("1-1/default/1.png").exists());
    assert!(maker.join("2-2/default/1.png").exists());
    assert_json_eq!(read_json(&maker.join(SEPARATED_FILE)), json!([]));
}

#[tokio::test]
async fn test_failed_fetch_degrades_but_completes() {
    let server = MockServer::start().await;
    // Only the first of two images is served; the second 404s.
    let blob = r#"{state:{imageMakerId:99,config:{
        pList:[{pId:1,items:[{itmId:10},{itmId:11}],lyrs:[5]}],
        lyrList:{5:10},cpList:{}},
        commonImages:{
            10:{5:{0:{url:"SERVER/img/ok.png"}}},
            11:{5:{0:{url:"SERVER/img/missing.png"}}}
        },memberImages:{}}}"#;
    let url = mount_page(&server, 99, blob).await;
    mount_png(&server, "/img/ok.png", b"png-ok").await;

    let dest = tempfile::tempdir().unwrap();
    let outcome = Scraper::new().scrape(&url, dest.path(), None).await.unwrap();

    assert_eq!(outcome.report.downloaded, 1);
    assert_eq!(outcome.report.failed.len(), 1);

    let maker = outcome.maker_dir;
    assert!(maker.join("1-1/default/1.png").exists());
    assert!(!maker.join("1-1/default/2.png").exists());

    // assets.json reflects what was actually written, not what was asked.
    let assets = read_json(&maker.join(ASSETS_FILE));
    assert_json_eq!(assets[0]["colors"][0]["items"], json!(["1.png"]));

    // The gap is recorded truthfully.
    let incomplete = read_json(&maker.join(INCOMPLETE_FILE));
    assert_eq!(incomplete["failed"][0]["path"], "Maker_99/1-1/default/2.png");
    assert_eq!(incomplete["failed"][0]["reason"], "status 404");
}

#[tokio::test]
async fn test_assets_manifest_round_trips_with_independent_scan() {
    let server = MockServer::start().await;
    let url = mount_page(&server, 77, BASIC_BLOB).await;
    mount_png(&server, "/img/a.png", b"png-a").await;
    mount_png(&server, "/img/thumb1.png", b"png-thumb").await;

    let dest = tempfile::tempdir().unwrap();
    let outcome = Scraper::new().scrape(&url, dest.path(), None).await.unwrap();

    let rescanned = manifest::scan_assets(&outcome.maker_dir).unwrap();
    let persisted: Vec<manifest::AssetFolder> =
        serde_json::from_value(read_json(&outcome.maker_dir.join(ASSETS_FILE))).unwrap();
    assert_eq!(rescanned, persisted);
}

#[tokio::test]
async fn test_page_without_state_blob_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en/image_maker/13"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>no blob</html>"))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let url = format!("{}/en/image_maker/13", server.uri());
    let err = Scraper::new().scrape(&url, dest.path(), None).await.unwrap_err();
    assert!(matches!(
        err,
        picrew_archive::ScrapeError::Extraction(
            picrew_archive::ExtractionError::MarkerNotFound
        )
    ));
    // Nothing was created for a failed extraction.
    assert!(std::fs::read_dir(dest.path()).unwrap().next().is_none());
}
