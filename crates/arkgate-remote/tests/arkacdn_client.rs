//! Integration tests for the HTTP client against a local mock server.
//!
//! `mockito` binds a real socket, so these exercise the full reqwest path:
//! URL building, bearer header, JSON body, and status/body passthrough.

#[cfg(feature = "http")]
mod http {
    use std::sync::Arc;

    use arkgate_remote::{ArkacdnClient, AuthRefresher, Credential, RemoteStore, Upload};
    use mockito::Matcher;
    use serde_json::json;

    fn sample_upload() -> Upload {
        Upload {
            data: r#"{"ip":"1.2.3.4","username":"alice"}"#.into(),
            filename: "session-alice.json".into(),
            description: "session for alice".into(),
        }
    }

    #[tokio::test]
    async fn test_upload_sends_bearer_and_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/plain")
            .match_header("authorization", "Bearer access-1")
            .match_body(Matcher::PartialJson(json!({
                "filename": "session-alice.json",
                "description": "session for alice",
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"id":"f-42"}}"#)
            .create_async()
            .await;

        let client = ArkacdnClient::new(&server.url()).unwrap();
        let resp = client.upload(Some("access-1"), &sample_upload()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.status, 201);
        assert_eq!(resp.body["data"]["id"], "f-42");
    }

    #[tokio::test]
    async fn test_upload_unauthorized_passes_status_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload/plain")
            .with_status(401)
            .with_body(r#"{"message":"jwt expired"}"#)
            .create_async()
            .await;

        let client = ArkacdnClient::new(&server.url()).unwrap();
        let resp = client.upload(Some("old"), &sample_upload()).await.unwrap();

        assert!(resp.is_unauthorized());
        assert_eq!(resp.error_message(), "jwt expired");
    }

    #[tokio::test]
    async fn test_fetch_content_hits_json_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/upload/f-42/json")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(r#"{"ip":"1.2.3.4"}"#)
            .create_async()
            .await;

        let client = ArkacdnClient::new(&server.url()).unwrap();
        let resp = client.fetch_content(Some("access-1"), "f-42").await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.body["ip"], "1.2.3.4");
    }

    #[tokio::test]
    async fn test_fetch_meta_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/upload/gone")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let client = ArkacdnClient::new(&server.url()).unwrap();
        let resp = client.fetch_meta(Some("a"), "gone").await.unwrap();

        assert!(resp.is_not_found());
        assert_eq!(resp.error_message(), "Not Found");
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_token_without_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"refreshToken": "rt-1"})))
            .with_status(200)
            .with_body(r#"{"accessToken":"access-2"}"#)
            .create_async()
            .await;

        let client = ArkacdnClient::new(&server.url()).unwrap();
        let resp = client.refresh("rt-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.body["accessToken"], "access-2");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) on localhost is essentially never listening.
        let client = ArkacdnClient::new("http://127.0.0.1:9").unwrap();

        let result = client.refresh("rt").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_refresher_swaps_credential_from_nested_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"data":{"accessToken":"nested-1"}}"#)
            .create_async()
            .await;

        let client = Arc::new(ArkacdnClient::new(&server.url()).unwrap());
        let credential = Arc::new(Credential::new(Some("expired".into())));
        let refresher =
            AuthRefresher::new(client, Arc::clone(&credential), Some("rt".into()));

        assert!(refresher.attempt_refresh().await);
        assert_eq!(credential.current().as_deref(), Some("nested-1"));
    }

    #[tokio::test]
    async fn test_refresher_success_without_token_keeps_credential() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = Arc::new(ArkacdnClient::new(&server.url()).unwrap());
        let credential = Arc::new(Credential::new(Some("current".into())));
        let refresher =
            AuthRefresher::new(client, Arc::clone(&credential), Some("rt".into()));

        // 2xx with nothing to swap in still reports success.
        assert!(refresher.attempt_refresh().await);
        assert_eq!(credential.current().as_deref(), Some("current"));
    }
}
