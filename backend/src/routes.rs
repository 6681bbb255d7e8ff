use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde_json::{Value, json};
use shared::{AnalysisRequest, AnalysisResponse, MediaKind};
use uuid::Uuid;

use crate::attribution::Aggregator;
use crate::attribution::scoring::rng_for;
use crate::config::{AnalysisConfig, UploadConfig};
use crate::error::AnalysisError;
use crate::model::ModelClient;
use crate::prompt::compose;
use crate::storage::TempMedia;

const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/analyze").route(web::post().to(handle_analyze)))
        .service(web::resource("/api/aggregate").route(web::post().to(handle_aggregate)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

/// `request.media_reference` names the file held by `media`; it stops being valid once `media` drops.
struct Upload {
    request: AnalysisRequest,
    media: TempMedia,
}

async fn handle_analyze(
    config: web::Data<AnalysisConfig>,
    aggregator: web::Data<Aggregator>,
    model: web::Data<dyn ModelClient>,
    payload: Multipart,
) -> Result<HttpResponse, AnalysisError> {
    let request_id = Uuid::new_v4();
    let Upload { request, mut media } = read_upload(payload, &config.upload).await?;

    info!(
        "[{}] Analyzing {} upload of {} bytes at {}",
        request_id,
        request.media_kind,
        media.len(),
        request.media_reference
    );

    let instruction = compose(request.media_kind, &request.question);
    let media_payload = media.payload()?;
    let raw = model
        .generate(&instruction, &media_payload)
        .await
        .map_err(|e| {
            error!("[{}] Model invocation error: {}", request_id, e);
            e
        })?;
    drop(media);

    let record = aggregator.aggregate(&raw, &mut rng_for(config.scoring.seed));
    info!(
        "[{}] Attribution: visual {}%, search {}%",
        request_id,
        record.score.visual_score(),
        record.score.search_score()
    );

    Ok(HttpResponse::Ok().json(AnalysisResponse::new(
        request_id,
        request.media_kind,
        request.question,
        record,
    )))
}

async fn handle_aggregate(
    config: web::Data<AnalysisConfig>,
    aggregator: web::Data<Aggregator>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AnalysisError> {
    let record = aggregator.aggregate_value(&body, &mut rng_for(config.scoring.seed))?;
    Ok(HttpResponse::Ok().json(record))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn read_upload(mut payload: Multipart, upload: &UploadConfig) -> Result<Upload, AnalysisError> {
    let mut media_kind = None;
    let mut question = String::new();
    let mut media = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AnalysisError::InvalidInput(format!("Malformed multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "media_kind" => {
                let value = read_text_field(&mut field).await?;
                let kind = value.trim().parse::<MediaKind>().map_err(|_| {
                    AnalysisError::InvalidInput(format!("Unknown media kind: {}", value.trim()))
                })?;
                media_kind = Some(kind);
            }
            "question" => question = read_text_field(&mut field).await?,
            "file" => {
                let kind = media_kind.ok_or_else(|| {
                    AnalysisError::InvalidInput("media_kind must be sent before file".into())
                })?;
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();

                let mut temp = TempMedia::create(kind, &file_name, upload)?;
                while let Some(chunk) = field.next().await {
                    let data = chunk.map_err(|e| {
                        AnalysisError::InvalidInput(format!("Failed to read upload: {}", e))
                    })?;
                    temp.write_chunk(&data)?;
                }
                media = Some(temp);
            }
            other => {
                warn!("Ignoring unexpected multipart field: {}", other);
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
                }
            }
        }
    }

    let media_kind =
        media_kind.ok_or_else(|| AnalysisError::InvalidInput("Please select a media type.".into()))?;
    let media = media.ok_or_else(|| {
        AnalysisError::InvalidInput(format!("Please upload a {} to begin analysis.", media_kind))
    })?;
    if media.is_empty() {
        return Err(AnalysisError::InvalidInput("Uploaded file is empty.".into()));
    }
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(AnalysisError::InvalidInput("Please enter your question.".into()));
    }

    Ok(Upload {
        request: AnalysisRequest {
            media_kind,
            media_reference: media.path().display().to_string(),
            question,
        },
        media,
    })
}

async fn read_text_field(field: &mut Field) -> Result<String, AnalysisError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
        if bytes.len() + data.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AnalysisError::InvalidInput("Text field too long.".into()));
        }
        bytes.extend_from_slice(&data);
    }
    String::from_utf8(bytes)
        .map_err(|_| AnalysisError::InvalidInput("Text fields must be UTF-8.".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::scoring::{SEARCH_RELIANT_RANGE, VISUAL_RELIANT_RANGE};
    use crate::model::{MediaPayload, ModelInvocationError};
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use shared::{AttributionRecord, ErrorResponse, EvidenceProvenance, RawResponse};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    const BOUNDARY: &str = "analysis-test-boundary";
    const SCENARIO_A: &str = "**VISUAL FINDINGS:**\nA red car.\n**RESEARCH FINDINGS:**\nCar model confirmed via web search.\n**FINAL ANSWER:**\nIt is a 2020 sedan.";

    #[derive(Default)]
    struct Seen {
        instruction: Option<String>,
        path: Option<PathBuf>,
        file_existed: bool,
        mime_type: Option<String>,
    }

    struct FakeModel {
        reply: Result<String, u16>,
        seen: Mutex<Seen>,
    }

    impl FakeModel {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Seen::default()),
            })
        }

        fn failing(code: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(code),
                seen: Mutex::new(Seen::default()),
            })
        }
    }

    impl ModelClient for FakeModel {
        fn generate<'a>(
            &'a self,
            instruction: &'a str,
            media: &'a MediaPayload,
        ) -> BoxFuture<'a, Result<RawResponse, ModelInvocationError>> {
            {
                let mut seen = self.seen.lock().unwrap();
                seen.instruction = Some(instruction.to_string());
                seen.path = Some(media.path.clone());
                seen.file_existed = media.path.exists();
                seen.mime_type = Some(media.mime_type.clone());
            }
            let result = match &self.reply {
                Ok(text) => Ok(RawResponse::from_text(text.clone())),
                Err(code) => Err(ModelInvocationError::Status {
                    code: *code,
                    body: "quota exceeded".into(),
                }),
            };
            async move { result }.boxed()
        }
    }

    fn multipart(fields: &[(&str, Option<&str>, &str)]) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (name, file_name, content) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(content.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (format!("multipart/form-data; boundary={}", BOUNDARY), body)
    }

    fn analyze_request(fields: &[(&str, Option<&str>, &str)]) -> test::TestRequest {
        let (content_type, body) = multipart(fields);
        test::TestRequest::post()
            .uri("/api/analyze")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
    }

    fn app_data(
        config: AnalysisConfig,
        model: Arc<FakeModel>,
    ) -> (
        web::Data<AnalysisConfig>,
        web::Data<Aggregator>,
        web::Data<dyn ModelClient>,
    ) {
        let model: Arc<dyn ModelClient> = model;
        (
            web::Data::new(config),
            web::Data::new(Aggregator::default()),
            web::Data::from(model),
        )
    }

    macro_rules! init_app {
        ($config:expr, $model:expr) => {{
            let (config, aggregator, model) = app_data($config, $model);
            test::init_service(
                App::new()
                    .app_data(config)
                    .app_data(aggregator)
                    .app_data(model)
                    .configure(configure_routes),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn analyze_returns_record_and_releases_media() {
        let model = FakeModel::replying(SCENARIO_A);
        let app = init_app!(AnalysisConfig::default(), model.clone());

        let req = analyze_request(&[
            ("media_kind", None, "image"),
            ("question", None, "What car is this?"),
            ("file", Some("car.png"), "PNG fake"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: AnalysisResponse = test::read_body_json(resp).await;
        assert_eq!(body.media_kind, MediaKind::Image);
        assert_eq!(body.question, "What car is this?");
        assert_eq!(body.record.sections.visual_findings, vec!["A red car."]);
        assert_eq!(body.record.sections.final_answer, "It is a 2020 sedan.");
        assert!(body.record.tool_activity_signal);
        assert!(SEARCH_RELIANT_RANGE.contains(&body.record.score.search_score()));
        assert_eq!(body.record.evidence.provenance, EvidenceProvenance::Placeholder);
        assert_eq!(body.scorecard.visual.label, "Image Insight Score");
        assert_eq!(body.scorecard.research.value, body.record.score.search_score());

        let seen = model.seen.lock().unwrap();
        assert!(seen.file_existed);
        assert_eq!(seen.mime_type.as_deref(), Some("image/png"));
        assert!(seen.instruction.as_deref().unwrap().contains("What car is this?"));
        assert!(!seen.path.as_ref().unwrap().exists());
    }

    #[actix_web::test]
    async fn analyze_requires_question() {
        let model = FakeModel::replying(SCENARIO_A);
        let app = init_app!(AnalysisConfig::default(), model.clone());

        let req = analyze_request(&[
            ("media_kind", None, "video"),
            ("question", None, "   "),
            ("file", Some("clip.mp4"), "frames"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Please enter your question.");
        assert!(model.seen.lock().unwrap().instruction.is_none());
    }

    #[actix_web::test]
    async fn analyze_rejects_extension_for_media_kind() {
        let app = init_app!(AnalysisConfig::default(), FakeModel::replying(SCENARIO_A));

        let req = analyze_request(&[
            ("media_kind", None, "image"),
            ("question", None, "What is this?"),
            ("file", Some("clip.mp4"), "frames"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn analyze_requires_media_kind_before_file() {
        let app = init_app!(AnalysisConfig::default(), FakeModel::replying(SCENARIO_A));

        let req = analyze_request(&[
            ("file", Some("car.png"), "png"),
            ("media_kind", None, "image"),
            ("question", None, "What is this?"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn analyze_enforces_upload_limit() {
        let mut config = AnalysisConfig::default();
        config.upload.max_bytes = 4;
        let app = init_app!(config, FakeModel::replying(SCENARIO_A));

        let req = analyze_request(&[
            ("media_kind", None, "image"),
            ("question", None, "What is this?"),
            ("file", Some("car.jpg"), "far too many bytes"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn model_failure_maps_to_bad_gateway_and_releases_media() {
        let model = FakeModel::failing(429);
        let app = init_app!(AnalysisConfig::default(), model.clone());

        let req = analyze_request(&[
            ("media_kind", None, "video"),
            ("question", None, "What happens?"),
            ("file", Some("clip.mov"), "frames"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.contains("429"));

        let seen = model.seen.lock().unwrap();
        assert!(seen.file_existed);
        assert_eq!(seen.mime_type.as_deref(), Some("video/quicktime"));
        assert!(!seen.path.as_ref().unwrap().exists());
    }

    #[actix_web::test]
    async fn seeded_config_is_deterministic() {
        let mut config = AnalysisConfig::default();
        config.scoring.seed = Some(99);
        let app = init_app!(config, FakeModel::replying(SCENARIO_A));

        let mut records = Vec::new();
        for _ in 0..2 {
            let req = analyze_request(&[
                ("media_kind", None, "image"),
                ("question", None, "What car is this?"),
                ("file", Some("car.png"), "png"),
            ]).to_request();
            let body: AnalysisResponse = test::call_and_read_body_json(&app, req).await;
            records.push(body.record);
        }
        assert_eq!(records[0], records[1]);
    }

    #[actix_web::test]
    async fn aggregate_endpoint_handles_plain_text() {
        let app = init_app!(AnalysisConfig::default(), FakeModel::replying(""));

        let req = test::TestRequest::post()
            .uri("/api/aggregate")
            .set_json(json!({ "text": "Just a plain description with no headers." }))
            .to_request();
        let record: AttributionRecord = test::call_and_read_body_json(&app, req).await;
        assert_eq!(record.sections.final_answer, "Just a plain description with no headers.");
        assert!(!record.tool_activity_signal);
        assert!(VISUAL_RELIANT_RANGE.contains(&record.score.search_score()));
    }

    #[actix_web::test]
    async fn aggregate_endpoint_rejects_non_string_text() {
        let app = init_app!(AnalysisConfig::default(), FakeModel::replying(""));

        for body in [json!({ "text": 42 }), json!(null), json!({ "answer": "x" })] {
            let req = test::TestRequest::post()
                .uri("/api/aggregate")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = init_app!(AnalysisConfig::default(), FakeModel::replying(""));
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn read_upload_builds_analysis_request() {
        let (content_type, body) = multipart(&[
            ("media_kind", None, "Video"),
            ("question", None, "  What happens next?  "),
            ("file", Some("clip.mp4"), "frames"),
        ]);
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_str(&content_type).unwrap(),
        );
        let stream = futures::stream::once(async move {
            Ok::<_, actix_web::error::PayloadError>(web::Bytes::from(body))
        });

        let upload = read_upload(Multipart::new(&headers, stream), &AnalysisConfig::default().upload)
            .await
            .unwrap();
        assert_eq!(upload.request.media_kind, MediaKind::Video);
        assert_eq!(upload.request.question, "What happens next?");
        assert_eq!(
            upload.request.media_reference,
            upload.media.path().display().to_string()
        );
        assert!(upload.media.path().exists());
        assert_eq!(upload.media.len(), "frames".len());
    }
}
