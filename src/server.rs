//! HTTP routes over a shared [`EvalService`].
//!
//! Store work is blocking, so every handler hands it to `web::block`.

use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, Responder, get, http::header::ContentType, web};
use anyhow::{Context, Result};
use log::{error, info};
use serde::Serialize;

use crate::{
    present,
    service::{EvalService, ImportOutcome, SummaryView},
};

type SharedService = web::Data<Arc<EvalService>>;

#[derive(Serialize)]
struct SummaryResponse {
    import: ImportOutcome,
    #[serde(flatten)]
    view: SummaryView,
}

fn html_page(title: &str, view: &SummaryView) -> HttpResponse {
    let body = present::render_page(title, &view.table.to_html(), view.notice.as_deref());
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

fn blocking_failed(err: impl std::fmt::Display) -> HttpResponse {
    error!("Request worker failed: {err}");
    HttpResponse::InternalServerError().body(format!("internal error: {err}"))
}

#[get("/")]
async fn index(service: SharedService) -> impl Responder {
    let service = service.get_ref().clone();
    match web::block(move || service.import_and_summarize(false)).await {
        Ok((_, view)) => html_page("Model evaluation summary", &view),
        Err(err) => blocking_failed(err),
    }
}

#[get("/refresh")]
async fn refresh(service: SharedService) -> impl Responder {
    let service = service.get_ref().clone();
    match web::block(move || service.import(true)).await {
        Ok(outcome) => HttpResponse::Ok()
            .content_type(ContentType::plaintext())
            .body(outcome.to_string()),
        Err(err) => blocking_failed(err),
    }
}

#[get("/raw")]
async fn raw(service: SharedService) -> impl Responder {
    let service = service.get_ref().clone();
    match web::block(move || service.raw_view()).await {
        Ok(view) => html_page("Stored evaluations", &view),
        Err(err) => blocking_failed(err),
    }
}

#[get("/api/summary")]
async fn api_summary(service: SharedService) -> impl Responder {
    let service = service.get_ref().clone();
    match web::block(move || service.import_and_summarize(false)).await {
        Ok((import, view)) => HttpResponse::Ok().json(SummaryResponse { import, view }),
        Err(err) => blocking_failed(err),
    }
}

/// Registers every route; shared by [`serve`] and the route tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(refresh)
        .service(raw)
        .service(api_summary);
}

/// Runs the server until interrupted, then applies the marker exit policy.
pub fn serve(service: Arc<EvalService>, bind: &str) -> Result<()> {
    let state = web::Data::new(service.clone());
    let result = actix_web::rt::System::new().block_on(async move {
        let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
            .bind(bind)
            .with_context(|| format!("Binding server to {bind}"))?
            .run();
        info!("Serving evaluation summary on http://{bind}");
        server.await.context("Running HTTP server")
    });
    info!("Server stopped");
    service.finish();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use actix_web::{body::to_bytes, test};
    use std::fs;
    use tempfile::tempdir;

    fn service_in(dir: &std::path::Path) -> Arc<EvalService> {
        let settings = Settings {
            csv_path: dir.join("data.csv"),
            store_path: dir.join("summary.db"),
            ..Settings::default()
        };
        Arc::new(EvalService::new(settings).expect("service"))
    }

    #[actix_web::test]
    async fn index_imports_and_renders_summary() {
        let dir = tempdir().expect("temp dir");
        fs::write(
            dir.path().join("data.csv"),
            "ds,ver,metric,param,mode,score\nsetA_1,v1,acc,p,eval,80\nsetA_2,v1,acc,p,eval,90\n",
        )
        .expect("write");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service_in(dir.path())))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        let body = to_bytes(resp.into_body()).await.expect("body");
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("<td>setA</td>"), "{html}");
        assert!(html.contains("<td>85.00</td>"), "{html}");
    }

    #[actix_web::test]
    async fn refresh_reports_missing_csv() {
        let dir = tempdir().expect("temp dir");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service_in(dir.path())))
                .configure(configure),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/refresh").to_request()).await;
        assert!(resp.status().is_success());
        let body = to_bytes(resp.into_body()).await.expect("body");
        assert_eq!(body.as_ref(), b"CSV file not found");
    }

    #[actix_web::test]
    async fn api_summary_returns_json_rows() {
        let dir = tempdir().expect("temp dir");
        fs::write(
            dir.path().join("data.csv"),
            "ds,ver,metric,param,mode,score\nb_1,v1,f1,p,eval,7\n",
        )
        .expect("write");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service_in(dir.path())))
                .configure(configure),
        )
        .await;

        let value: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/summary").to_request(),
        )
        .await;
        assert_eq!(value["import"]["status"], "updated");
        assert_eq!(value["import"]["rows"], 1);
        assert_eq!(value["table"]["rows"][0][0], "b");
        assert_eq!(value["table"]["rows"][0][5], "7.00");
        assert!(value["notice"].is_null());
    }
}
