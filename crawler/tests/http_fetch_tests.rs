use crawler::{FetchError, HttpFetcher, HttpFetcherConfig, PageFetcher, MAX_BODY_BYTES};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Serves `head` followed by `body` to every connection and returns the page URL.
async fn serve(head: String, body: Vec<u8>) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let head = head.clone();
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                // the client may hang up early on rejected bodies
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    Url::parse(&format!("http://{addr}/page")).unwrap()
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&HttpFetcherConfig { respect_robots: false, ..HttpFetcherConfig::default() }).unwrap()
}

#[tokio::test]
async fn html_pages_are_extracted() {
    let body = b"<html><head><title>Crabs</title></head><body><p>crab shells</p><a href=\"/b\">b</a></body></html>".to_vec();
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nLast-Modified: Sun, 06 Nov 1994 08:49:37 GMT\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let url = serve(head, body.clone()).await;

    let page = fetcher().fetch(&url).await.unwrap();

    assert_eq!(page.title, "Crabs");
    assert!(page.text.contains("crab shells"));
    assert_eq!(page.last_modified, 784_111_777);
    assert_eq!(page.size, body.len() as i64);
    assert_eq!(page.links, vec![url.join("/b").unwrap().to_string()]);
}

#[tokio::test]
async fn non_html_content_is_rejected() {
    let body = b"%PDF-1.4 binary".to_vec();
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let url = serve(head, body).await;

    let err = fetcher().fetch(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::NotHtml { ref content_type, .. } if content_type == "application/pdf"));
}

#[tokio::test]
async fn declared_oversized_body_is_rejected() {
    let body = vec![b'a'; MAX_BODY_BYTES + 1];
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let url = serve(head, body).await;

    let err = fetcher().fetch(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::TooLarge { limit, .. } if limit == MAX_BODY_BYTES));
}

#[tokio::test]
async fn undeclared_oversized_body_is_cut_off_while_reading() {
    let body = vec![b'a'; MAX_BODY_BYTES + 1];
    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n".to_string();
    let url = serve(head, body).await;

    let err = fetcher().fetch(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::TooLarge { .. }));
}
