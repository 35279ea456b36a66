#![cfg(feature = "fetch")]

use rfsnapshot::{snapshot, CloneOptions, Document, Error, FetchResolver, ResourceResolver};
use tiny_http::{Header, Response, Server};

fn serve(requests: usize) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    std::thread::spawn(move || {
        for _ in 0..requests {
            let Ok(request) = server.recv() else {
                return;
            };
            let response = match request.url() {
                "/poster" => Response::from_data(b"\x89PNG fake".to_vec()).with_header(
                    "Content-Type: image/png; charset=binary"
                        .parse::<Header>()
                        .unwrap(),
                ),
                "/poster.jpg" => Response::from_data(b"jpeg".to_vec()),
                _ => Response::from_data(Vec::new()).with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn fetch_resolver_inlines_responses() {
    // Skip on CI where network may be unreliable
    if std::env::var("CI").is_ok() {
        return;
    }

    let base = serve(3);
    let resolver = FetchResolver::new(5000).unwrap();

    // no extension: MIME comes from the response
    let uri = resolver.resolve(&format!("{}/poster", base), "").await.unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));

    // derived MIME wins over the (missing) header
    let uri = resolver
        .resolve(&format!("{}/poster.jpg", base), "image/jpeg")
        .await
        .unwrap();
    assert_eq!(uri, "data:image/jpeg;base64,anBlZw==");

    let err = resolver
        .resolve(&format!("{}/missing.png", base), "image/png")
        .await
        .unwrap_err();
    match err {
        Error::ResourceError { reason, .. } => assert_eq!(reason, "HTTP 404"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn poster_is_fetched_relative_to_base_url() {
    if std::env::var("CI").is_ok() {
        return;
    }

    let base = serve(1);
    let doc = Document::parse(r#"<div id="r"><video poster="poster.jpg"></video></div>"#)
        .with_base_url(&format!("{}/page.html", base))
        .unwrap();
    let options = CloneOptions::default()
        .without_style_sheets()
        .with_resolver(FetchResolver::new(5000).unwrap());

    let snap = snapshot(&doc, doc.element_by_id("r").unwrap(), &options)
        .await
        .unwrap();
    assert!(snap
        .to_html()
        .contains(r#"<img src="data:image/jpeg;base64,anBlZw==">"#));
}
