use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use birthday_carddav::{CardDavClient, CardDavError};
use birthday_core::{ContactSource, WebdavConfig, BIRTHDAY_FIELD};

// "alice:s3cret"
const AUTH: &str = "Basic YWxpY2U6czNjcmV0";

const HOME_SET: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:response>
    <d:href>/dav/principals/users/alice/</d:href>
    <d:propstat>
      <d:prop>
        <card:addressbook-home-set><d:href>/dav/addressbooks/users/alice/</d:href></card:addressbook-home-set>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

const BOOKS: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:response>
    <d:href>/dav/addressbooks/users/alice/</d:href>
    <d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/addressbooks/users/alice/contacts/</d:href>
    <d:propstat><d:prop>
      <d:resourcetype><d:collection/><card:addressbook/></d:resourcetype>
      <d:displayname>Contacts</d:displayname>
    </d:prop></d:propstat>
  </d:response>
</d:multistatus>"#;

const CARDS: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:response>
    <d:href>/dav/addressbooks/users/alice/contacts/joe.vcf</d:href>
    <d:propstat><d:prop>
      <d:getetag>"1"</d:getetag>
      <card:address-data>BEGIN:VCARD
VERSION:4.0
N:Bloggs;Joe;;;
FN:Joe Bloggs
BDAY:19960215
END:VCARD
</card:address-data>
    </d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/addressbooks/users/alice/contacts/ann.vcf</d:href>
    <d:propstat><d:prop>
      <d:getetag>"2"</d:getetag>
      <card:address-data>BEGIN:VCARD
VERSION:3.0
FN:Ann
item1.BDAY;X-APPLE-OMIT-YEAR=1604:1604-09-13
END:VCARD
</card:address-data>
    </d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/addressbooks/users/alice/contacts/nobody.vcf</d:href>
    <d:propstat><d:prop>
      <d:getetag>"3"</d:getetag>
      <card:address-data>BEGIN:VCARD
VERSION:4.0
FN:Nobody
END:VCARD
</card:address-data>
    </d:prop></d:propstat>
  </d:response>
</d:multistatus>"#;

async fn fake_carddav(method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(AUTH);
    if !authorized {
        return reply(StatusCode::UNAUTHORIZED, "");
    }

    let depth = headers
        .get("Depth")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match (method.as_str(), uri.path(), depth.as_str()) {
        ("PROPFIND", "/dav/principals/users/alice", "0") => reply(StatusCode::MULTI_STATUS, HOME_SET),
        ("PROPFIND", "/dav/addressbooks/users/alice/", "1") => reply(StatusCode::MULTI_STATUS, BOOKS),
        ("REPORT", "/dav/addressbooks/users/alice/contacts/", _) => {
            reply(StatusCode::MULTI_STATUS, CARDS)
        }
        _ => reply(StatusCode::NOT_FOUND, ""),
    }
}

fn reply(status: StatusCode, body: &'static str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
        .body(Body::from(body))
        .unwrap()
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new().fallback(fake_carddav);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr, pass: &str) -> WebdavConfig {
    WebdavConfig {
        base_url: format!("http://{addr}/dav/"),
        timeout: Duration::from_secs(5),
        user: "alice".into(),
        pass: pass.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn discovers_books_and_fetches_cards() {
    let addr = spawn_server().await;
    let client = CardDavClient::new(&config(addr, "s3cret")).unwrap();

    let home_set = client.find_address_book_home_set().await.unwrap();
    assert_eq!(home_set.path(), "/dav/addressbooks/users/alice/");

    let books = client.find_address_books(&home_set).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].path(), "/dav/addressbooks/users/alice/contacts/");

    let records = client
        .list_contacts_with_field(BIRTHDAY_FIELD)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);

    let joe = &records[0];
    assert_eq!(joe.contact.display_name(), "Joe");
    assert_eq!(joe.birthday.as_ref().unwrap().value, "19960215");

    let ann = &records[1];
    let bday = ann.birthday.as_ref().unwrap();
    assert_eq!(bday.value, "1604-09-13");
    assert_eq!(bday.param("X-APPLE-OMIT-YEAR"), Some("1604"));

    assert!(records[2].birthday.is_none());
}

#[tokio::test]
async fn wrong_password_is_a_status_error() {
    let addr = spawn_server().await;
    let client = CardDavClient::new(&config(addr, "wrong")).unwrap();

    let err = client.fetch_contacts(BIRTHDAY_FIELD).await.unwrap_err();
    match err {
        CardDavError::Status { status, .. } => assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED),
        other => panic!("expected status error, got {other:?}"),
    }

    // Through the trait the failure is opaque but still reported.
    assert!(client.list_contacts_with_field(BIRTHDAY_FIELD).await.is_err());
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CardDavClient::new(&config(addr, "s3cret")).unwrap();
    let err = client.fetch_contacts(BIRTHDAY_FIELD).await.unwrap_err();
    assert!(matches!(err, CardDavError::Http(_)));
}
