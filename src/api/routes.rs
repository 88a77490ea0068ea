//! API route configuration module.

use super::{messaging, templates};
use ntex::web;
use serde_json::json;

/// Configures outbound messaging routes.
///
/// # Routes
/// - `POST /send-message` - Send a text or template message
/// - `POST /send-hello-world` - Send the `hello_world` template
/// - `POST /send-template` - Send any approved template
/// - `POST /test-order` - Run a sample order through the dispatcher
pub fn messaging(cfg: &mut web::ServiceConfig) {
    cfg.service((
        messaging::send_message_view,
        messaging::send_hello_world_view,
        messaging::send_template_view,
        messaging::test_order_view,
    ));
}

/// Configures template management routes.
///
/// # Routes
/// - `GET /templates` - List templates
/// - `POST /templates` - Create a template
/// - `GET /templates/{name}` - Get a template
/// - `DELETE /templates/{name}` - Delete a template
/// - `POST /templates/{name}/recreate` - Delete then create a template
pub fn templates(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/templates").service((
        templates::list_templates_view,
        templates::create_template_view,
        templates::get_template_view,
        templates::delete_template_view,
        templates::recreate_template_view,
    )));
}

#[web::get("/health")]
pub async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntex::http::StatusCode;
    use ntex::web::test;

    #[ntex::test]
    async fn test_health() {
        let app = test::init_service(web::App::new().service(health)).await;

        let req = test::TestRequest::with_uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            test::read_body(resp).await,
            ntex::util::Bytes::from_static(br#"{"status":"ok"}"#)
        );
    }

    #[ntex::test]
    async fn test_test_order_endpoint() {
        let app = test::init_service(web::App::new().configure(messaging)).await;

        let req = test::TestRequest::with_uri("/test-order")
            .method(ntex::http::Method::POST)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "Order processing test completed",
                "orderId": "wamid.test123",
                "totalItems": 2
            })
        );
    }
}
