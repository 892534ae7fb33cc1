use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use serde::Deserialize;
use warp::http::StatusCode;
use warp::http::header::{CONTENT_TYPE, HeaderValue};
use warp::hyper::Body;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::AppContext;
use crate::content::preview_note;
use crate::error::NoteError;
use crate::index::index;
use crate::notes::{create_folder, read_note, write_note};
use crate::search::search;
use crate::settings::SettingsUpdate;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathQuery {
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub q: String,
}

/// Every API route plus the UI assets, with plain-text fallbacks for
/// unmatched requests.
pub fn routes(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let static_dir = ctx.static_dir.clone();
    let with_ctx = warp::any().map(move || ctx.clone());

    let folders = warp::path!("api" / "folders")
        .and(warp::get())
        .and(with_ctx.clone())
        .then(get_folders);
    let note_get = warp::path!("api" / "note")
        .and(warp::get())
        .and(with_ctx.clone())
        .and(warp::query::<PathQuery>())
        .then(get_note);
    let note_post = warp::path!("api" / "note")
        .and(warp::post())
        .and(with_ctx.clone())
        .and(warp::query::<PathQuery>())
        .and(warp::body::bytes())
        .then(post_note);
    let folder_post = warp::path!("api" / "folder")
        .and(warp::post())
        .and(with_ctx.clone())
        .and(warp::query::<PathQuery>())
        .then(post_folder);
    let search_get = warp::path!("api" / "search")
        .and(warp::get())
        .and(with_ctx.clone())
        .and(warp::query::<SearchQuery>())
        .then(get_search);
    let preview_get = warp::path!("api" / "preview")
        .and(warp::get())
        .and(with_ctx.clone())
        .and(warp::query::<PathQuery>())
        .then(get_preview);
    let settings_get = warp::path!("api" / "settings")
        .and(warp::get())
        .and(with_ctx.clone())
        .then(get_settings);
    let settings_post = warp::path!("api" / "settings")
        .and(warp::post())
        .and(with_ctx.clone())
        .and(warp::body::bytes())
        .then(post_settings);
    let heartbeat = warp::path!("api" / "heartbeat")
        .and(warp::post())
        .and(with_ctx.clone())
        .then(post_heartbeat);
    let shutdown = warp::path!("api" / "shutdown")
        .and(warp::post())
        .and(with_ctx.clone())
        .then(post_shutdown);

    let api = folders
        .or(note_get)
        .or(note_post)
        .or(folder_post)
        .or(search_get)
        .or(preview_get)
        .or(settings_get)
        .or(settings_post)
        .or(heartbeat)
        .or(shutdown);

    let assets = warp::path("static").and(warp::fs::dir(static_dir));
    let index_page = warp::path::end()
        .and(warp::get())
        .and(with_ctx)
        .then(serve_index);

    api.or(assets)
        .or(index_page)
        .recover(handle_rejection)
        .with(warp::log("asap_notes::http"))
}

fn respond<T: Reply>(result: Result<T, NoteError>) -> Response {
    match result {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Runs filesystem work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, NoteError>
where
    F: FnOnce() -> Result<T, NoteError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NoteError::io("Background task failed", io::Error::other(e)))?
}

async fn get_folders(ctx: Arc<AppContext>) -> Response {
    let root = ctx.settings.notes_root();
    let result = blocking(move || index(&root)).await;
    respond(result.map(|folders| warp::reply::json(&folders.root)))
}

async fn get_note(ctx: Arc<AppContext>, query: PathQuery) -> Response {
    log::debug!("Reading note: {}", query.path);
    let root = ctx.settings.notes_root();
    let result = blocking(move || read_note(&root, &query.path)).await;
    respond(result.map(|data| {
        let mut response = Response::new(Body::from(data));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }))
}

async fn post_note(ctx: Arc<AppContext>, query: PathQuery, body: Bytes) -> Response {
    let root = ctx.settings.notes_root();
    let result = blocking(move || write_note(&root, &query.path, &body)).await;
    respond(result.map(|()| "OK"))
}

async fn post_folder(ctx: Arc<AppContext>, query: PathQuery) -> Response {
    let root = ctx.settings.notes_root();
    let result = blocking(move || create_folder(&root, &query.path)).await;
    respond(result.map(|()| "OK"))
}

async fn get_search(ctx: Arc<AppContext>, query: SearchQuery) -> Response {
    let root = ctx.settings.notes_root();
    let result = blocking(move || Ok(search(&root, &query.q))).await;
    respond(result.map(|report| warp::reply::json(&report.matches)))
}

async fn get_preview(ctx: Arc<AppContext>, query: PathQuery) -> Response {
    let root = ctx.settings.notes_root();
    let result = blocking(move || preview_note(&root, &query.path)).await;
    respond(result.map(|preview| warp::reply::json(&preview)))
}

async fn get_settings(ctx: Arc<AppContext>) -> Response {
    warp::reply::json(&ctx.settings.get()).into_response()
}

async fn post_settings(ctx: Arc<AppContext>, body: Bytes) -> Response {
    let update = match serde_json::from_slice::<SettingsUpdate>(&body) {
        Ok(update) => update,
        Err(e) => return NoteError::MalformedRequest(e.to_string()).into_response(),
    };
    let result = blocking(move || ctx.settings.update(update)).await;
    respond(result.map(|_| "OK"))
}

async fn post_heartbeat(ctx: Arc<AppContext>) -> Response {
    ctx.supervisor.heartbeat();
    "OK".into_response()
}

async fn post_shutdown(ctx: Arc<AppContext>) -> Response {
    log::info!("Shutdown requested by client");
    ctx.supervisor.request_shutdown();
    "Shutting down...".into_response()
}

async fn serve_index(ctx: Arc<AppContext>) -> Response {
    let index_path = ctx.static_dir.join("index.html");
    match tokio::fs::read(&index_path).await {
        Ok(data) => warp::reply::html(data).into_response(),
        Err(e) => {
            log::error!("Could not read {}: {e}", index_path.display());
            warp::reply::with_status("Index file not found.", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(warp::reply::with_status(message, status))
}
