use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use log::debug;

use crate::helpers::{calculate_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub const SIGNING_SECRET: &str = "e6b19c573432dcc6b075501d51b51bb8";

/// Slack signature headers for `body`, signed just now.
pub fn signed_headers(body: &str) -> Vec<(&'static str, String)> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = calculate_signature(SIGNING_SECRET, &timestamp, body.as_bytes());
    vec![(TIMESTAMP_HEADER, timestamp), (SIGNATURE_HEADER, signature)]
}

/// Sends `req` to an app set up by `configure` and returns the status and body of the response. Errors raised by
/// middleware are turned into their error response, the way the server would send them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned());
            (status, body.unwrap_or_default())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub async fn post_json<F>(path: &str, body: &str, headers: Vec<(&'static str, String)>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json"));
    for header in headers {
        req = req.insert_header(header);
    }
    send_request(req.set_payload(body.to_string()), configure).await
}
