//! End-to-end client flows against a mock HTTP server: answer-set
//! generation with polling, restricted reports, impersonation token
//! caching and client-side rate limiting.

use ds_client::{DeepSights, Error};
use ds_core::{Config, RateQuota};
use serde_json::json;
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
  Config::default_with_key("test_key".to_string()).with_base_url(server.uri())
}

#[tokio::test]
async fn answer_set_is_polled_to_completion() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/end-user-gateway-service/answer-sets"))
    .and(body_json(json!({"input": "What drives demand?"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "answer_set": {"minion_job": {"id": "as-1", "status": "CREATED"}}
    })))
    .expect(1)
    .mount(&server)
    .await;

  // first poll sees the job in flight, the next one finds it done
  Mock::given(method("GET"))
    .and(path("/end-user-gateway-service/answer-sets/as-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "permission_validation_result": "GRANTED",
      "answer_set": {"minion_job": {"id": "as-1", "status": "STARTED"}}
    })))
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/end-user-gateway-service/answer-sets/as-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "permission_validation_result": "GRANTED",
      "answer_set": {
        "minion_job": {"id": "as-1", "status": "COMPLETED"},
        "context": {
          "summarized_search_results": [{
            "id": "ans-1",
            "summary": "Demand grew 4% YoY.",
            "artifact_id": "doc-9",
            "artifact_type": "DOCUMENT",
            "page_references": [{"id": "p-1", "number": 12}]
          }],
          "search_results": []
        }
      }
    })))
    .mount(&server)
    .await;

  let client = DeepSights::new(config_for(&server)).unwrap();
  let user = client.user_client_with_token("user-token").unwrap();

  let answer_set = user.answers().create_and_wait("What drives demand?").await.unwrap();

  assert_eq!(answer_set.permission_validation, "GRANTED");
  assert_eq!(answer_set.answers.len(), 1);
  assert_eq!(answer_set.answers[0].text.as_deref(), Some("Demand grew 4% YoY."));
  assert!(answer_set.search_results.is_empty());
}

#[tokio::test]
async fn failed_answer_job_reports_the_reason() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/end-user-gateway-service/answer-sets/as-2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "answer_set": {"minion_job": {
        "id": "as-2", "status": "FAILED_NO_SOURCES", "error_reason": "no matching documents"
      }}
    })))
    .mount(&server)
    .await;

  let client = DeepSights::new(config_for(&server)).unwrap();
  let user = client.user_client_with_token("user-token").unwrap();

  let err = user.answers().wait_for_answer("as-2").await.unwrap_err();
  match err {
    Error::OperationFailed { id, reason } => {
      assert_eq!(id, "as-2");
      assert_eq!(reason, "no matching documents");
    }
    other => panic!("expected OperationFailed, got {other:?}"),
  }
}

#[tokio::test]
async fn restricted_report_yields_placeholder() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/end-user-gateway-service/desk-researches/r-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "permission_validation_result": "RESTRICTED",
      "restricted_desk_research": {"desk_research_id": "r-1", "input": "market size?"}
    })))
    .mount(&server)
    .await;

  let client = DeepSights::new(config_for(&server)).unwrap();
  let user = client.user_client_with_token("user-token").unwrap();

  let report = user.reports().get("r-1").await.unwrap();
  assert_eq!(report.permission_validation, "RESTRICTED");
  assert_eq!(report.id, "r-1");
  assert_eq!(report.question, "market size?");
  assert!(report.document_sources.is_empty());
}

#[tokio::test]
async fn impersonation_token_is_cached() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/user-service-adapter/deep-sights/oauth/_generate-user-token"))
    .and(body_json(json!({"user_email": "jane.doe@acme.com"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "oauth-1"})))
    .expect(1)
    .mount(&server)
    .await;

  let mut config = config_for(&server);
  config.mip_api_key = Some("mip_key".to_string());
  config.mip_base_url = server.uri();
  let client = DeepSights::new(config).unwrap();

  // same user twice, with sloppy casing; one identity-service call
  client.user_client("Jane.Doe@acme.com ").await.unwrap();
  client.user_client("jane.doe@acme.com").await.unwrap();
}

#[tokio::test]
async fn unknown_user_is_an_authentication_error() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/user-service-adapter/deep-sights/oauth/_generate-user-token"))
    .respond_with(ResponseTemplate::new(404))
    .mount(&server)
    .await;

  let mut config = config_for(&server);
  config.mip_api_key = Some("mip_key".to_string());
  config.mip_base_url = server.uri();
  let client = DeepSights::new(config).unwrap();

  let err = client.user_client("nobody@acme.com").await.unwrap_err();
  assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn fail_fast_mode_rejects_over_quota_creates() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/end-user-gateway-service/answer-sets"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "answer_set": {"minion_job": {"id": "as-1", "status": "CREATED"}}
    })))
    .mount(&server)
    .await;

  let mut config = config_for(&server);
  config.fail_fast = true;
  config.rate_limits.answer_create = RateQuota::new(1, 60);
  let client = DeepSights::new(config).unwrap();
  let user = client.user_client_with_token("user-token").unwrap();

  user.answers().create("first question").await.unwrap();

  let err = user.answers().create("second question").await.unwrap_err();
  match err {
    Error::RateLimit { retry_after, .. } => {
      // the client-side limiter always knows when the window frees up
      assert!(retry_after.is_some());
    }
    other => panic!("expected RateLimit, got {other:?}"),
  }
}

#[tokio::test]
async fn document_loads_are_cached_and_invalidated_on_delete() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/artifact-service/artifacts/doc-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "id": "doc-1", "title": "Category deep dive", "status": "COMPLETED"
    })))
    .mount(&server)
    .await;
  Mock::given(method("DELETE"))
    .and(path("/artifact-service/artifacts/doc-1"))
    .respond_with(ResponseTemplate::new(204))
    .mount(&server)
    .await;

  let client = DeepSights::new(config_for(&server)).unwrap();
  let documents = client.documents();

  let first = documents.load("doc-1").await.unwrap();
  let second = documents.load("doc-1").await.unwrap();
  assert_eq!(first, second);
  // one GET so far, the second load was a cache hit
  let gets = |requests: &[wiremock::Request]| {
    requests.iter().filter(|r| r.method.as_str() == "GET").count()
  };
  assert_eq!(gets(&server.received_requests().await.unwrap()), 1);

  documents.delete("doc-1").await.unwrap();
  documents.load("doc-1").await.unwrap();
  assert_eq!(gets(&server.received_requests().await.unwrap()), 2);
}

#[tokio::test]
async fn uploaded_document_is_pushed_to_the_signed_link_and_polled() {
  let server = MockServer::start().await;
  let content = b"%PDF-1.4 quarterly brief";
  let file = std::env::temp_dir().join(format!("ds-upload-{}.pdf", std::process::id()));
  std::fs::write(&file, content).unwrap();

  Mock::given(method("POST"))
    .and(path("/artifact-service/document-upload-links/_generate"))
    .and(body_json(json!({
      "file_name": file.file_name().unwrap().to_str().unwrap(),
      "file_type": "PDF"
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "signed_link": format!("{}/upload-target/gcs-obj-1", server.uri()),
      "gcs_object_id": "gcs-obj-1"
    })))
    .expect(1)
    .mount(&server)
    .await;

  // the raw bytes land on the signed link, create-only
  Mock::given(method("PUT"))
    .and(path("/upload-target/gcs-obj-1"))
    .and(header("content-type", "application/pdf"))
    .and(header("x-goog-if-generation-match", "0"))
    .and(body_bytes(content.to_vec()))
    .respond_with(ResponseTemplate::new(200))
    .expect(1)
    .mount(&server)
    .await;

  Mock::given(method("POST"))
    .and(path("/artifact-service/artifacts"))
    .and(body_json(json!({"gcs_object_id": "gcs-obj-1"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "doc-7"})))
    .expect(1)
    .mount(&server)
    .await;

  // ingestion is still running on the first poll, done on the second
  Mock::given(method("GET"))
    .and(path("/artifact-service/artifacts/doc-7"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "id": "doc-7", "status": "CONVERTING"
    })))
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/artifact-service/artifacts/doc-7"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "id": "doc-7", "status": "COMPLETED", "file_name": file.file_name().unwrap().to_str().unwrap()
    })))
    .mount(&server)
    .await;

  let client = DeepSights::new(config_for(&server)).unwrap();
  let documents = client.documents();

  let document = documents.upload_and_wait(&file).await.unwrap();
  assert_eq!(document.id, "doc-7");
  assert_eq!(document.status.as_deref(), Some("COMPLETED"));

  // the completed record was cached, so a load is free
  let loaded = documents.load("doc-7").await.unwrap();
  assert_eq!(loaded, document);
  let gets = server
    .received_requests()
    .await
    .unwrap()
    .iter()
    .filter(|r| r.method.as_str() == "GET")
    .count();
  assert_eq!(gets, 2);

  let _ = std::fs::remove_file(&file);
}

#[tokio::test]
async fn upload_rejects_unsupported_file_types() {
  let server = MockServer::start().await;
  let file = std::env::temp_dir().join(format!("ds-upload-{}.csv", std::process::id()));
  std::fs::write(&file, b"a,b,c").unwrap();

  let client = DeepSights::new(config_for(&server)).unwrap();
  let err = client.documents().upload(&file).await.unwrap_err();

  assert!(matches!(err, Error::Validation(_)));
  // nothing reached the server
  assert!(server.received_requests().await.unwrap().is_empty());

  let _ = std::fs::remove_file(&file);
}

#[tokio::test]
async fn download_follows_the_signed_object_link() {
  let server = MockServer::start().await;
  let content = b"%PDF-1.4 stored file";

  Mock::given(method("GET"))
    .and(path("/artifact-service/artifacts/doc-7/gcs-object-link"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "signed_link": format!("{}/download-target/gcs-obj-1", server.uri())
    })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/download-target/gcs-obj-1"))
    .respond_with(ResponseTemplate::new(200).set_body_raw(content.to_vec(), "application/pdf"))
    .expect(1)
    .mount(&server)
    .await;

  let client = DeepSights::new(config_for(&server)).unwrap();
  let bytes = client.documents().download("doc-7").await.unwrap();

  assert_eq!(bytes, content);
}
