use actix_web::{
    body::BoxBody,
    error, get,
    http::{header::ContentType, StatusCode},
    web, App, HttpResponse, HttpServer,
};
use blackjack_session::prelude::*;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server configuration, read from the command line or the environment.
#[derive(Debug, Parser)]
#[command(name = "blackjack-api", about = "Stateless blackjack over signed state tokens")]
struct Config {
    /// Secret used to sign state tokens. Changing it invalidates every token in flight.
    #[arg(long, env = "BJ_SECRET", default_value = DEV_SECRET, hide_env_values = true)]
    secret: String,
    #[arg(long, env = "BJ_ADDRESS", default_value = "127.0.0.1")]
    address: String,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

/// Wraps a `SessionError` so it can be turned into an HTTP response.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct UserError(#[from] SessionError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl error::ResponseError for UserError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        let error = if self.0.is_client_error() {
            self.to_string()
        } else {
            String::from("an internal error occurred")
        };
        HttpResponse::build(self.status_code())
            .content_type(ContentType::json())
            .json(ErrorBody { error })
    }

    fn status_code(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// The single game endpoint. The body is read as raw bytes so that an unreadable body is
/// answered with "Unknown action" rather than a framework error.
async fn play(
    body: web::Bytes,
    key: web::Data<SigningKey>,
) -> Result<HttpResponse, UserError> {
    let request = GameRequest::from_body(&body);
    let response = handle(request, &key)?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::post().to(play))
        .route("/api/blackjack", web::post().to(play))
        .service(health);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    if config.secret == DEV_SECRET {
        warn!("BJ_SECRET is not set, signing tokens with the development secret");
    }

    let key = web::Data::new(SigningKey::new(&config.secret));

    info!(address = %config.address, port = config.port, "listening");

    HttpServer::new(move || App::new().app_data(key.clone()).configure(configure))
        .bind((config.address.as_str(), config.port))?
        .run()
        .await
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use serde_json::{json, Value};

    fn key() -> web::Data<SigningKey> {
        web::Data::new(SigningKey::new("api test secret"))
    }

    #[actix_web::test]
    async fn test_start_and_stand() {
        let app = init_service(App::new().app_data(key()).configure(configure)).await;

        let req = TestRequest::post()
            .uri("/")
            .set_json(json!({"action": "start", "bet": 1, "currency": "FUN"}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["view"]["bet"], json!(1.0));
        assert_eq!(body["view"]["canSplit"], json!(false));
        let token = body["stateToken"].as_str().unwrap().to_string();

        let req = TestRequest::post()
            .uri("/api/blackjack")
            .set_json(json!({"action": "stand", "stateToken": token}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        assert_ne!(body["view"]["status"], json!("playing"));
        assert_eq!(body["view"]["revealDealer"], json!(true));
        assert!(!body["view"]["dealer"]
            .as_array()
            .unwrap()
            .contains(&json!(blackjack_lib::FACE_DOWN)));
    }

    #[actix_web::test]
    async fn test_error_responses() {
        let app = init_service(App::new().app_data(key()).configure(configure)).await;

        let cases = [
            (json!({"action": "hit"}), "Missing stateToken"),
            (json!({"action": "fold"}), "Unknown action"),
            (json!({}), "Unknown action"),
            (json!({"action": "stand", "stateToken": "nope"}), "Malformed state token"),
            (json!({"action": "start", "bet": "a lot"}), "Invalid bet"),
        ];
        for (payload, message) in cases {
            let req = TestRequest::post().uri("/").set_json(payload).to_request();
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = read_body_json(resp).await;
            assert_eq!(body, json!({"error": message}));
        }
    }

    #[actix_web::test]
    async fn test_forged_token_rejected() {
        let app = init_service(App::new().app_data(key()).configure(configure)).await;
        let forged = SigningKey::new("someone else");
        let token = handle(GameRequest::start(), &forged).unwrap().state_token;

        let req = TestRequest::post()
            .uri("/")
            .set_json(json!({"action": "hit", "stateToken": token}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Invalid state signature"}));
    }

    #[actix_web::test]
    async fn test_non_json_body() {
        let app = init_service(App::new().app_data(key()).configure(configure)).await;
        let req = TestRequest::post().uri("/").set_payload("action=start").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = init_service(App::new().configure(configure)).await;
        let req = TestRequest::get().uri("/health").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_config_flags() {
        let config = Config::try_parse_from(["blackjack-api", "--secret", "s3cret", "--port", "9000"])
            .unwrap();
        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.port, 9000);
    }
}
