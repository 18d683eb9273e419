//! Silent retries: which transport errors are resent, and the retry budget.

mod common;

use common::*;
use http::Method;

use httpdriver::base::neterror::NetError;
use httpdriver::base::networkkey::NetworkAnonymizationKey;
use httpdriver::http::connectioninfo::NextProto;
use httpdriver::http::requestinfo::HttpRequestInfo;
use httpdriver::http::retry::MAX_RETRY_ATTEMPTS;
use httpdriver::http::serverproperties::AlternativeService;
use httpdriver::http::session::HttpNetworkSessionParams;
use httpdriver::http::uploaddatastream::ElementsUploadDataStream;

fn quic_service() -> AlternativeService {
    AlternativeService::new(NextProto::Quic, "alt.example.com", 443)
}

#[tokio::test]
async fn test_third_transient_error_is_too_many_retries() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    for _ in 0..4 {
        factory.push_ready(MockStream::new(&log).send_error(NetError::Http2PingFailed));
    }
    let session = session(&factory);
    let mut trans = transaction(&session);

    assert_eq!(
        trans.start(get("https://example.com/")).await,
        Err(NetError::TooManyRetries)
    );
    assert_eq!(trans.retry_attempts(), MAX_RETRY_ATTEMPTS);
    assert_eq!(factory.request_count(), 3);
    // Every abandoned attempt was closed without reuse.
    assert_eq!(log.get().closed, vec![(1, true), (2, true)]);
}

#[tokio::test]
async fn test_budgeted_retry_then_success() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).headers_error(NetError::Http2ServerRefusedStream));
    factory.push_ready(MockStream::new(&log).response(response(200)).body(b"ok"));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(trans.retry_attempts(), 1);
    assert_eq!(read_all(&mut trans).await.unwrap(), b"ok");
}

#[tokio::test]
async fn test_resend_on_reused_connection_is_identical() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .reused()
            .headers_error(NetError::ConnectionReset),
    );
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    let request = HttpRequestInfo::new(Method::POST, url("http://example.com/form"))
        .with_body(ElementsUploadDataStream::new("a=1&b=2"));
    trans.start(request).await.unwrap();

    let log = log.get();
    assert_eq!(log.sent.len(), 2);
    assert_eq!(log.sent[0].stream_id, 1);
    assert_eq!(log.sent[1].stream_id, 2);
    assert_eq!(log.sent[0].headers, log.sent[1].headers);
    assert_eq!(log.sent[0].body, b"a=1&b=2");
    assert_eq!(log.sent[0].body, log.sent[1].body);
    // Resends of a stale socket cost nothing from the budget.
    assert_eq!(trans.retry_attempts(), 0);

    let per_attempt = (log.sent[0].headers.wire_len() + 7) as u64;
    assert_eq!(trans.get_total_sent_bytes(), 2 * per_attempt);
}

#[tokio::test]
async fn test_reset_on_fresh_connection_is_surfaced() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).send_error(NetError::ConnectionReset));
    factory.push_ready(MockStream::new(&log).headers_error(NetError::ConnectionClosed));
    let session = session(&factory);

    let mut first = transaction(&session);
    assert_eq!(
        first.start(get("http://example.com/")).await,
        Err(NetError::ConnectionReset)
    );
    assert_eq!(first.retry_attempts(), 0);
    assert_eq!(factory.request_count(), 1);

    let mut second = transaction(&session);
    assert_eq!(
        second.start(get("http://example.com/")).await,
        Err(NetError::ConnectionClosed)
    );
    assert_eq!(factory.request_count(), 2);
    assert_eq!(log.get().sent.len(), 2);
}

#[tokio::test]
async fn test_reset_after_headers_is_not_resent() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .reused()
            .partial_headers(response(200), NetError::ConnectionReset),
    );
    let session = session(&factory);
    let mut trans = transaction(&session);

    assert_eq!(
        trans.start(get("http://example.com/")).await,
        Err(NetError::ConnectionReset)
    );
    assert_eq!(factory.request_count(), 1);
}

#[tokio::test]
async fn test_empty_response_on_reused_connection() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).reused().headers_error(NetError::EmptyResponse));
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("http://example.com/")).await.unwrap();
    assert_eq!(factory.request_count(), 2);
}

#[tokio::test]
async fn test_misdirected_request_disables_pooling() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).response(response(421)));
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(trans.get_response_info().response_code(), Some(200));
    assert_eq!(trans.retry_attempts(), 0);
    let factory_log = factory.log();
    assert_eq!(factory_log.requests.len(), 2);
    assert!(factory_log.requests[0].enable_ip_based_pooling);
    assert!(factory_log.requests[0].enable_alternative_services);
    assert!(!factory_log.requests[1].enable_ip_based_pooling);
    assert!(!factory_log.requests[1].enable_alternative_services);
}

#[tokio::test]
async fn test_misdirected_request_with_single_use_body_is_surfaced() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).response(response(421)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    let request = HttpRequestInfo::new(Method::POST, url("https://example.com/"))
        .with_body(ElementsUploadDataStream::new("once").single_use());
    trans.start(request).await.unwrap();

    assert_eq!(trans.get_response_info().response_code(), Some(421));
    assert_eq!(factory.request_count(), 1);
}

#[tokio::test]
async fn test_second_misdirected_request_is_surfaced() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).response(response(421)));
    factory.push_ready(MockStream::new(&log).response(response(421)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(trans.get_response_info().response_code(), Some(421));
    assert_eq!(factory.request_count(), 2);
}

#[tokio::test]
async fn test_request_timeout_on_reused_http1_connection() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).reused().response(response(408)));
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("http://example.com/")).await.unwrap();
    assert_eq!(trans.get_response_info().response_code(), Some(200));
    assert_eq!(trans.retry_attempts(), 0);
}

#[tokio::test]
async fn test_request_timeout_on_fresh_connection_is_surfaced() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).response(response(408)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("http://example.com/")).await.unwrap();
    assert_eq!(trans.get_response_info().response_code(), Some(408));
    assert_eq!(factory.request_count(), 1);
}

#[tokio::test]
async fn test_too_early_retries_without_early_data() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).response(response(425)));
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(trans.get_response_info().response_code(), Some(200));
    assert_eq!(log.get().initialized, vec![(1, true), (2, false)]);
    assert_eq!(trans.retry_attempts(), 0);
}

#[tokio::test]
async fn test_too_early_without_early_data_is_a_response() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).response(response(425)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    let request = HttpRequestInfo::new(Method::POST, url("https://example.com/"))
        .with_body(ElementsUploadDataStream::new("x"));
    trans.start(request).await.unwrap();

    assert_eq!(trans.get_response_info().response_code(), Some(425));
    assert_eq!(log.get().initialized, vec![(1, false)]);
}

#[tokio::test]
async fn test_early_data_rejected_by_transport() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).send_error(NetError::WrongVersionOnEarlyData));
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();
    assert_eq!(log.get().initialized, vec![(1, true), (2, false)]);
}

#[tokio::test]
async fn test_http11_required_on_send() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).send_error(NetError::Http11Required));
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(factory.request_count(), 2);
    assert_eq!(trans.retry_attempts(), 0);
    assert_eq!(log.get().closed, vec![(1, true)]);
}

#[tokio::test]
async fn test_http11_required_from_stream_request() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push(vec![failed(NetError::ProxyHttp11Required)]);
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();
    assert_eq!(factory.request_count(), 2);
}

#[tokio::test]
async fn test_reused_socket_without_endpoint_is_resent() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .reused()
            .endpoint_error(NetError::SocketNotConnected),
    );
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("http://example.com/")).await.unwrap();
    assert_eq!(trans.get_remote_endpoint(), Some(endpoint()));
    assert_eq!(log.get().sent.len(), 1);
    assert_eq!(log.get().sent[0].stream_id, 2);
}

#[tokio::test]
async fn test_stale_socket_on_initialize_is_resent() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .reused()
            .init_error(NetError::ConnectionClosed),
    );
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let session = session(&factory);
    let mut trans = transaction(&session);

    trans.start(get("http://example.com/")).await.unwrap();
    assert_eq!(factory.request_count(), 2);
}

#[tokio::test]
async fn test_quic_error_retries_without_alternative_service() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .alternative_service(quic_service())
            .send_error(NetError::QuicProtocolError),
    );
    factory.push_ready(MockStream::new(&log).response(response(200)).body(b"fine"));
    let session = session(&factory);
    let mut trans = transaction(&session);
    let key = NetworkAnonymizationKey::default();

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(trans.retry_attempts(), 1);
    assert!(!factory.log().requests[1].enable_alternative_services);
    assert!(factory.log().requests[1].enable_ip_based_pooling);
    assert!(!session
        .http_server_properties()
        .is_alternative_service_broken(&quic_service(), &key));

    // Only a successful fallback proves the service broken.
    assert_eq!(read_all(&mut trans).await.unwrap(), b"fine");
    assert!(session
        .http_server_properties()
        .is_alternative_service_broken(&quic_service(), &key));
}

#[tokio::test]
async fn test_quic_error_without_fallback_flag_is_surfaced() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .alternative_service(quic_service())
            .send_error(NetError::QuicProtocolError),
    );
    let params = HttpNetworkSessionParams::new().retry_without_alt_svc_on_quic_errors(false);
    let session = session_with_params(&factory, params);
    let mut trans = transaction(&session);

    assert_eq!(
        trans.start(get("https://example.com/")).await,
        Err(NetError::QuicProtocolError)
    );
    assert_eq!(trans.retry_attempts(), 0);
}

#[tokio::test]
async fn test_quic_error_on_already_broken_service() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(
        MockStream::new(&log)
            .alternative_service(quic_service())
            .send_error(NetError::QuicProtocolError),
    );
    factory.push_ready(MockStream::new(&log).response(response(200)));
    let params = HttpNetworkSessionParams::new().retry_without_alt_svc_on_quic_errors(false);
    let session = session_with_params(&factory, params);
    session
        .http_server_properties()
        .mark_alternative_service_broken(&quic_service(), &NetworkAnonymizationKey::default());
    let mut trans = transaction(&session);

    trans.start(get("https://example.com/")).await.unwrap();

    assert_eq!(trans.retry_attempts(), 1);
    // The provider already skips broken services.
    assert!(factory.log().requests[1].enable_alternative_services);
}

#[tokio::test]
async fn test_quic_error_without_alternative_service_is_surfaced() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).send_error(NetError::QuicProtocolError));
    let session = session(&factory);
    let mut trans = transaction(&session);

    assert_eq!(
        trans.start(get("https://example.com/")).await,
        Err(NetError::QuicProtocolError)
    );
}

#[tokio::test]
async fn test_quic_error_budget_exhausted() {
    let log = SharedLog::new();
    let factory = MockStreamFactory::new();
    factory.push_ready(MockStream::new(&log).send_error(NetError::QuicHandshakeFailed));
    factory.push_ready(MockStream::new(&log).send_error(NetError::QuicGoawayRequestCanBeRetried));
    factory.push_ready(
        MockStream::new(&log)
            .alternative_service(quic_service())
            .send_error(NetError::QuicProtocolError),
    );
    let session = session(&factory);
    let mut trans = transaction(&session);

    assert_eq!(
        trans.start(get("https://example.com/")).await,
        Err(NetError::TooManyRetries)
    );
    assert_eq!(trans.retry_attempts(), MAX_RETRY_ATTEMPTS);
}
