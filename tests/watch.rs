use httpmock::Method::GET;
use httpmock::MockServer;
use playbook_page_enhance::{CliArgs, Command, ProgressMode, WatchArgs};
use tempfile::tempdir;
use url::Url;

const RUNNING_PAGE: &str = r#"<html><body>
<nav id="navbar" class="navbar navbar-light bg-light"></nav>
<span id="running-status" data-status-url="/runs/7/status"></span>
<div class="diff">
  <div class="diff-before-header">a.txt</div><pre class="diff-before-content">foo
bar</pre>
  <div class="diff-after-header">a.txt</div><pre class="diff-after-content">foo
baz</pre>
</div>
</body></html>"#;

fn watch_args(page_url: Option<Url>, status_url: Option<Url>) -> WatchArgs {
    WatchArgs {
        page_url,
        status_url,
        out: None,
        markers: None,
        settings: None,
        interval_ms: 10,
        max_ticks: Some(3),
        timeout_secs: 5,
        user_agent: "test-agent".to_string(),
        progress: ProgressMode::Never,
    }
}

#[tokio::test]
async fn finished_run_reloads_page_once() {
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/runs/7");
        then.status(200)
            .header("Content-Type", "text/html")
            .body(RUNNING_PAGE);
    });
    let status = server.mock(|when, then| {
        when.method(GET).path("/runs/7/status");
        then.status(200)
            .header("Content-Type", "application/json")
            .body("2");
    });

    let tmp = tempdir().unwrap();
    let out = tmp.path().join("reloaded.html");
    let mut args = watch_args(Some(Url::parse(&server.url("/runs/7")).unwrap()), None);
    args.out = Some(out.clone());

    playbook_page_enhance::run(CliArgs {
        command: Command::Watch(args),
    })
    .await
    .unwrap();

    // One fetch to discover the status url, one for the reload.
    page.assert_hits(2);
    status.assert_hits(1);

    let html = std::fs::read_to_string(&out).unwrap();
    assert!(html.contains("d2h-file-side-diff"));
    assert!(html.contains("<del>bar</del>"));
    assert!(html.contains("<ins>baz</ins>"));
}

#[tokio::test]
async fn running_status_never_reloads() {
    let server = MockServer::start();
    let status = server.mock(|when, then| {
        when.method(GET).path("/status");
        then.status(200).body("1");
    });

    let tmp = tempdir().unwrap();
    let out = tmp.path().join("never.html");
    let mut args = watch_args(None, Some(Url::parse(&server.url("/status")).unwrap()));
    args.out = Some(out.clone());

    playbook_page_enhance::run(CliArgs {
        command: Command::Watch(args),
    })
    .await
    .unwrap();

    status.assert_hits(3);
    assert!(!out.exists());
}

#[tokio::test]
async fn failed_polls_are_retried() {
    let server = MockServer::start();
    let broken = server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(500);
    });
    let garbage = server.mock(|when, then| {
        when.method(GET).path("/garbage");
        then.status(200).body("<html>not json</html>");
    });

    for (mock, path) in [(&broken, "/broken"), (&garbage, "/garbage")] {
        let args = watch_args(None, Some(Url::parse(&server.url(path)).unwrap()));
        playbook_page_enhance::run(CliArgs {
            command: Command::Watch(args),
        })
        .await
        .unwrap();
        mock.assert_hits(3);
    }
}

#[tokio::test]
async fn page_without_status_element_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/plain");
        then.status(200).body("<html><body>done</body></html>");
    });

    let args = watch_args(Some(Url::parse(&server.url("/plain")).unwrap()), None);
    let err = playbook_page_enhance::run(CliArgs {
        command: Command::Watch(args),
    })
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("running-status"));
}
