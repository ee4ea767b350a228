use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Form, Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{ModelRegistry, RegistrySnapshot},
    page::{self, PageView},
    speech::SpeechSynthesizer,
    story::{GenerationRequest, Genre, LengthTier, StoryWriter},
    temp_files::{AUDIO_SUFFIX, TEXT_SUFFIX, TempStore},
};

const DOWNLOAD_NAME: &str = "generated_story.txt";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ModelRegistry>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub temp: TempStore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoryForm {
    prompt: String,
    genre: String,
    length_value: String,
    model: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoryContentForm {
    story_content: String,
}

#[derive(Debug, Serialize)]
struct DebugEcho {
    prompt: String,
    genre: String,
    length: String,
    model: String,
    all_form_data: BTreeMap<String, String>,
}

pub fn build_router(
    config: Arc<AppConfig>,
    registry: Arc<ModelRegistry>,
    speech: Arc<dyn SpeechSynthesizer>,
) -> Router {
    let state = AppState {
        temp: TempStore::new(config.cleanup.temp_dir.clone()),
        registry,
        speech,
        config,
    };

    Router::new()
        .route("/", get(index).post(generate_story))
        .route("/debug", post(debug_params))
        .route("/download_story", post(download_story))
        .route("/generate_speech", post(generate_speech))
        .route("/health", get(health))
        .route("/metadata", get(metadata))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn metadata(State(state): State<AppState>) -> Json<RegistrySnapshot> {
    Json(state.registry.snapshot())
}

fn render_page(
    state: &AppState,
    story: &str,
    prompt: &str,
    genre: Genre,
    length: LengthTier,
) -> Html<String> {
    let current = state.registry.current();
    Html(page::render(&PageView {
        story,
        prompt,
        genre,
        length,
        models: state.registry.catalog(),
        current_model: current.key(),
    }))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    render_page(&state, "", "", Genre::Fantasy, LengthTier::Medium)
}

async fn generate_story(
    State(state): State<AppState>,
    form: Option<Form<StoryForm>>,
) -> Result<Html<String>, ServiceError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let prompt = form.prompt.trim().to_string();
    let genre = Genre::parse_or_default(&form.genre);
    let length = LengthTier::parse_or_default(&form.length_value);

    if prompt.is_empty() {
        return Ok(render_page(
            &state,
            "Please enter a story prompt!",
            "",
            genre,
            length,
        ));
    }

    let model_key = if state.registry.is_registered(&form.model) {
        form.model
    } else {
        state.registry.default_key().to_string()
    };

    let registry = state.registry.clone();
    let key = model_key.clone();
    let active = match task::spawn_blocking(move || registry.select(&key)).await {
        Ok(Ok(active)) => active,
        Ok(Err(err)) => {
            warn!(model = %model_key, error = %err, "model load failed");
            return Ok(render_page(
                &state,
                "Error loading AI model. Please try again.",
                &prompt,
                genre,
                length,
            ));
        }
        Err(err) => {
            warn!(model = %model_key, error = %err, "model load task failed");
            return Ok(render_page(
                &state,
                "Error loading AI model. Please try again.",
                &prompt,
                genre,
                length,
            ));
        }
    };

    let request = GenerationRequest::new(prompt.clone(), genre, length);
    let preview: String = prompt.chars().take(50).collect();
    info!(
        genre = genre.as_str(),
        length = length.as_str(),
        tokens = request.token_budget(),
        model = %model_key,
        model_version = active.version(),
        prompt = %preview,
        "story generation parameters"
    );

    let config = state.config.clone();
    let outcome = task::spawn_blocking(move || {
        StoryWriter::new(active.generator(), &config.sampling, &config.heuristics)
            .write(&request.full_prompt(), request.token_budget())
    })
    .await
    .map_err(|err| ServiceError::Inference(format!("generation task failed: {err}")))?;

    info!(
        attempts = outcome.attempts,
        accepted = outcome.accepted,
        "story generation finished"
    );

    Ok(render_page(&state, &outcome.story, &prompt, genre, length))
}

async fn debug_params(fields: Option<Form<BTreeMap<String, String>>>) -> Json<DebugEcho> {
    let fields = fields.map(|Form(fields)| fields).unwrap_or_default();
    let field = |name: &str, default: &str| {
        fields
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };

    Json(DebugEcho {
        prompt: field("prompt", ""),
        genre: field("genre", ""),
        length: field("length_value", ""),
        model: field("model", "original"),
        all_form_data: fields.clone(),
    })
}

async fn download_story(
    State(state): State<AppState>,
    form: Option<Form<StoryContentForm>>,
) -> Result<Response, ServiceError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    if form.story_content.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "No story to download").into_response());
    }

    let path = state
        .temp
        .persist(form.story_content.into_bytes(), TEXT_SUFFIX)
        .await?;
    let body = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_NAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}

async fn generate_speech(
    State(state): State<AppState>,
    form: Option<Form<StoryContentForm>>,
) -> Result<Response, ServiceError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    if form.story_content.is_empty() {
        return Err(ServiceError::MissingField("No story content provided"));
    }

    let audio = state.speech.synthesize(form.story_content.trim()).await?;
    let path = state.temp.persist(audio, AUDIO_SUFFIX).await?;
    let body = tokio::fs::read(&path).await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], body).into_response())
}
