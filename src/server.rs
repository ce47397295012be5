use crate::{
    config::RelayConfig,
    error::RelayError,
    models::GeneratedImage,
    relay::{parse_request, require_json, Relay},
};
use actix_cors::Cors;
use actix_web::{
    http::header::{self, ContentDisposition, DispositionParam, DispositionType},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use uuid::Uuid;

pub const GENERATE_IMAGE_PATH: &str = "/generate-image";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(GENERATE_IMAGE_PATH, web::post().to(generate_image));
}

/// Any origin may POST; preflight requests are answered by the middleware.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}

/// `POST /generate-image`. Every failure is logged here once, with its
/// stage, and rendered through `RelayError`'s `ResponseError` impl.
pub async fn generate_image(
    relay: web::Data<Relay>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, RelayError> {
    let request_id = Uuid::new_v4().to_string();
    log::info!(
        "📥 [{}] POST {} ({} bytes, {} strategy)",
        request_id,
        GENERATE_IMAGE_PATH,
        body.len(),
        relay.strategy()
    );

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let result = match require_json(content_type).and_then(|_| parse_request(&body)) {
        Ok(request) => relay.process(request, &request_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(image) => {
            log::info!(
                "✅ [{}] sending {} ({} bytes)",
                request_id,
                image.filename,
                image.bytes.len()
            );
            Ok(image_response(image))
        }
        Err(e) => {
            log::error!("❌ [{}] {} stage failed: {}", request_id, e.stage(), e);
            Err(e)
        }
    }
}

fn image_response(image: GeneratedImage) -> HttpResponse {
    let disposition = ContentDisposition {
        disposition: if image.attachment {
            DispositionType::Attachment
        } else {
            DispositionType::Inline
        },
        parameters: vec![DispositionParam::Filename(image.filename)],
    };

    HttpResponse::Ok()
        .content_type(image.content_type)
        .insert_header(disposition)
        .body(image.bytes)
}

pub async fn run(relay: Relay, config: &RelayConfig) -> std::io::Result<()> {
    let relay = web::Data::new(relay);

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .app_data(relay.clone())
            .configure(configure)
    })
        .bind(config.bind_address())?
        .run()
        .await
}
