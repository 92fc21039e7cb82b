pub(crate) mod test_support;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::tests::test_support::{base_config, credential_body, has_fresh_session};
use crate::{MarketplaceClient, RequestDescriptor};

#[tokio::test]
async fn login_then_fetch_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "session=fresh; Path=/")
                .set_body_json(credential_body("session-token", 900)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(|req: &Request| {
            if has_fresh_session(req) {
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "display_name": "casey" }))
            } else {
                ResponseTemplate::new(401)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(base_config(&server.uri())).expect("client");

    let credential = client.login("idp-token").await.expect("login");
    assert_eq!(credential.value(), "session-token");

    let profile: serde_json::Value = client
        .fetch_json(RequestDescriptor::get("/profile"))
        .await
        .expect("profile fetch");
    assert_eq!(profile["display_name"], "casey");
}
