//! Finnhub 클라이언트 HTTP 통합 테스트
//!
//! mockito 서버로 상태 코드와 응답 형태별 동작을 확인합니다.

use std::io::Write;
use std::time::Duration;

use chrono::NaiveDate;
use mockito::{Matcher, Server};
use quant_core::{FailureKind, ProviderFailure};
use quant_data::{DataError, FinnhubClient, InsiderSource, NewsSource};

fn client(server: &Server) -> FinnhubClient {
    FinnhubClient::new("test-key", Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.url())
}

#[tokio::test]
async fn test_company_news_sends_token_and_date_range() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/company-news")
        .match_header("X-Finnhub-Token", "test-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "AAPL".into()),
            Matcher::UrlEncoded("from".into(), "2024-03-01".into()),
            Matcher::UrlEncoded("to".into(), "2024-03-08".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"datetime": 1709550000, "headline": "Apple news", "summary": "s", "source": "Reuters", "url": "https://x"},
                {"datetime": 1709560000, "headline": ""}
            ]"#,
        )
        .create_async()
        .await;

    let news = client(&server)
        .company_news_between(
            "aapl",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].symbol, "AAPL");
    assert_eq!(news[0].source, "Reuters");
}

#[tokio::test]
async fn test_rate_limit_maps_to_rate_limited() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/company-news")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let err = client(&server).fetch_news("AAPL", 7).await.unwrap_err();
    assert!(matches!(err, DataError::RateLimited { .. }));
    assert_eq!(
        err.failure_kind(),
        FailureKind::Provider(ProviderFailure::RateLimited)
    );
}

#[tokio::test]
async fn test_forbidden_maps_to_rate_limited_and_unauthorized_to_http() {
    let mut server = Server::new_async().await;
    let _forbidden = server
        .mock("GET", "/company-news")
        .match_query(Matcher::Any)
        .with_status(403)
        .create_async()
        .await;
    let _unauthorized = server
        .mock("GET", "/stock/insider-transactions")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let client = client(&server);
    assert!(matches!(
        client.fetch_news("AAPL", 7).await,
        Err(DataError::RateLimited { .. })
    ));
    assert!(matches!(
        client.fetch_insider("AAPL").await,
        Err(DataError::Http { .. })
    ));
}

#[tokio::test]
async fn test_server_error_message_is_extracted() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/company-news")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"error": "internal failure"}"#)
        .create_async()
        .await;

    match client(&server).fetch_news("AAPL", 7).await {
        Err(DataError::Http { message, .. }) => assert_eq!(message, "internal failure"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_news_object_payload_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/company-news")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error": "unexpected"}"#)
        .create_async()
        .await;

    let err = client(&server).fetch_news("AAPL", 7).await.unwrap_err();
    assert!(matches!(err, DataError::Malformed { .. }));
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/stock/insider-transactions")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let err = client(&server).fetch_insider("MSFT").await.unwrap_err();
    assert!(matches!(err, DataError::Malformed { .. }));
}

#[tokio::test]
async fn test_insider_transactions_parses_data_array() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/stock/insider-transactions")
        .match_header("X-Finnhub-Token", "test-key")
        .match_query(Matcher::UrlEncoded("symbol".into(), "MSFT".into()))
        .with_status(200)
        .with_body(
            r#"{"symbol": "MSFT", "data": [
                {"name": "Satya Nadella", "change": -1000, "transactionDate": "2024-02-01",
                 "transactionCode": "S", "transactionPrice": 405.1},
                {"name": "Missing Date", "change": 10}
            ]}"#,
        )
        .create_async()
        .await;

    let txns = client(&server).insider_transactions("msft").await.unwrap();
    mock.assert_async().await;
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].symbol, "MSFT");
    assert_eq!(txns[0].transaction_type, "S");
    assert_eq!(txns[0].shares, -1000.0);
    assert_eq!(txns[0].price, Some(405.1));
}

#[tokio::test]
async fn test_insider_payload_without_data_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/stock/insider-transactions")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let err = client(&server).fetch_insider("MSFT").await.unwrap_err();
    assert!(matches!(err, DataError::Malformed { .. }));
}

#[tokio::test]
async fn test_slow_response_times_out_as_provider_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/company-news")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(1000));
            w.write_all(b"[]")
        })
        .create_async()
        .await;

    let client = FinnhubClient::new("test-key", Duration::from_millis(200))
        .unwrap()
        .with_base_url(server.url());
    let err = client.fetch_news("AAPL", 7).await.unwrap_err();

    assert!(matches!(err, DataError::Timeout { .. }));
    assert_eq!(
        err.failure_kind(),
        FailureKind::Provider(ProviderFailure::Timeout)
    );
}
