//! Text-to-speech proxy handler.
//!
//! Audio is streamed back with the upstream content type. Requests fail
//! with `503` when no upstream is configured.

use actix_web::http::header::{CacheControl, CacheDirective, ContentType};
use actix_web::{HttpResponse, post, web};

use crate::domain::Error;
use crate::domain::tts::SpeechRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::state::HttpState;

#[utoipa::path(
    post,
    path = "/api/v1/tts",
    request_body = SpeechRequest,
    responses(
        (status = 200, description = "Synthesised audio", content_type = "audio/mpeg", body = Vec<u8>),
        (status = 400, description = "Invalid text or language", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 503, description = "Speech synthesis unavailable", body = Error)
    ),
    tags = ["tts"],
    operation_id = "synthesizeSpeech"
)]
#[post("/tts")]
pub async fn synthesize(
    state: web::Data<HttpState>,
    _auth: AuthContext,
    payload: web::Json<SpeechRequest>,
) -> ApiResult<HttpResponse> {
    let audio = state.speech.speak(payload.into_inner()).await?;
    let content_type = audio
        .content_type
        .parse()
        .map(ContentType)
        .unwrap_or_else(|_| ContentType::octet_stream());
    Ok(HttpResponse::Ok()
        .insert_header(content_type)
        .insert_header(CacheControl(vec![CacheDirective::Private]))
        .body(audio.bytes))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(synthesize);
}
