//! # Templates API Module
//!
//! Pass-through management of message templates owned by the business account.

use crate::{
    errors::ApiError,
    metric,
    services::MessagingApi,
    state::AppState,
    webhook::whatsapp::outgoing_schemas::TemplateDefinition,
};
use ntex::web;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct CreateTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub components: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecreateTemplateRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub components: Option<Vec<serde_json::Value>>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn template_definition(
    name: Option<String>,
    category: &Option<String>,
    language: &Option<String>,
    components: &Option<Vec<serde_json::Value>>,
    missing: &str,
) -> Result<TemplateDefinition, ApiError> {
    match (name, present(category), present(language), components) {
        (Some(name), Some(category), Some(language), Some(components)) => Ok(TemplateDefinition {
            name,
            category,
            language,
            components: components.clone(),
        }),
        _ => Err(ApiError::Validation(format!(
            "Missing required fields: {missing}"
        ))),
    }
}

/// Lists the templates, returns the provider's `data` array.
pub async fn list_templates(api: &dyn MessagingApi) -> Result<Vec<serde_json::Value>, ApiError> {
    let response = api
        .list_templates()
        .await
        .map_err(|e| ApiError::from_provider("Failed to fetch templates", e))?;

    let templates = response
        .get("data")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default();

    logfire::info!("Templates fetched: {total}", total = templates.len() as i64);

    Ok(templates)
}

pub async fn create_template(
    api: &dyn MessagingApi,
    request: &CreateTemplateRequest,
) -> Result<serde_json::Value, ApiError> {
    let template = template_definition(
        present(&request.name),
        &request.category,
        &request.language,
        &request.components,
        "name, category, language, components",
    )?;
    metric::incr_outbound_statds("create_template");

    let response = api
        .create_template(&template)
        .await
        .map_err(|e| ApiError::from_provider("Failed to create template", e))?;

    logfire::info!("Template created: {name}", name = template.name);

    Ok(response)
}

pub async fn get_template(api: &dyn MessagingApi, name: &str) -> Result<serde_json::Value, ApiError> {
    api.get_template(name.to_string())
        .await
        .map_err(|e| ApiError::from_provider("Failed to fetch template", e))
}

pub async fn delete_template(
    api: &dyn MessagingApi,
    name: &str,
) -> Result<serde_json::Value, ApiError> {
    metric::incr_outbound_statds("delete_template");

    let response = api
        .delete_template(name.to_string())
        .await
        .map_err(|e| ApiError::from_provider("Failed to delete template", e))?;

    logfire::info!("Template deleted: {name}", name = name.to_string());

    Ok(response)
}

/// Deletes then creates the template under the same name.
///
/// A failed delete (usually an unknown template) is logged and ignored. The
/// provider needs a pause between both calls, `delay` is that pause.
pub async fn recreate_template(
    api: &dyn MessagingApi,
    name: &str,
    request: &RecreateTemplateRequest,
    delay: Duration,
) -> Result<serde_json::Value, ApiError> {
    let template = template_definition(
        Some(name.to_string()),
        &request.category,
        &request.language,
        &request.components,
        "category, language, components",
    )?;
    metric::incr_outbound_statds("recreate_template");

    match api.delete_template(name.to_string()).await {
        Ok(_) => logfire::info!(
            "Template {name} deleted before recreation",
            name = name.to_string()
        ),
        Err(e) => logfire::warn!(
            "Template {name} could not be deleted, continuing: {error}",
            name = name.to_string(),
            error = e.to_string()
        ),
    }

    if !delay.is_zero() {
        ntex::time::sleep(delay).await;
    }

    let response = api
        .create_template(&template)
        .await
        .map_err(|e| ApiError::from_provider("Failed to recreate template", e))?;

    logfire::info!("Template recreated: {name}", name = name.to_string());

    Ok(response)
}

#[web::get("")]
pub async fn list_templates_view(
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let templates = list_templates(app_state.messaging_api.as_ref()).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "total": templates.len(),
        "data": templates,
    })))
}

#[web::post("")]
pub async fn create_template_view(
    body: Result<web::types::Json<CreateTemplateRequest>, web::error::JsonPayloadError>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.map_err(ApiError::from)?;
    let data = create_template(app_state.messaging_api.as_ref(), &body).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "message": "Template created successfully",
        "data": data,
    })))
}

#[web::get("/{name}")]
pub async fn get_template_view(
    path: web::types::Path<String>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let data = get_template(app_state.messaging_api.as_ref(), &path).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "data": data,
    })))
}

#[web::delete("/{name}")]
pub async fn delete_template_view(
    path: web::types::Path<String>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let data = delete_template(app_state.messaging_api.as_ref(), &path).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "message": "Template deleted successfully",
        "data": data,
    })))
}

#[web::post("/{name}/recreate")]
pub async fn recreate_template_view(
    path: web::types::Path<String>,
    body: Result<web::types::Json<RecreateTemplateRequest>, web::error::JsonPayloadError>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.map_err(ApiError::from)?;
    let delay = Duration::from_millis(app_state.config.template_recreate_delay_ms);
    let data =
        recreate_template(app_state.messaging_api.as_ref(), &path, &body, delay).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "message": "Template recreated successfully",
        "data": data,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::routes, config::AppConfig, errors::ProviderError, services::MockMessagingApi};
    use mockall::Sequence;
    use ntex::http::{Method, StatusCode};
    use ntex::web::test;

    async fn json_body(resp: web::WebResponse) -> serde_json::Value {
        serde_json::from_slice(&test::read_body(resp).await).unwrap()
    }

    fn state(mock_api: MockMessagingApi) -> AppState {
        AppState {
            config: AppConfig::for_tests(),
            messaging_api: Box::new(mock_api),
        }
    }

    #[ntex::test]
    async fn test_list_templates_endpoint() {
        let mut mock_api = MockMessagingApi::new();
        mock_api.expect_list_templates().times(1).returning(|| {
            Ok(json!({
                "data": [
                    {"name": "hello_world", "status": "APPROVED"},
                    {"name": "order_update", "status": "PENDING"}
                ],
                "paging": {}
            }))
        });

        let app = test::init_service(
            web::App::new()
                .state(state(mock_api))
                .configure(routes::templates),
        )
        .await;

        let req = test::TestRequest::with_uri("/templates").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["total"], 2);
        assert_eq!(body["data"][1]["name"], "order_update");
    }

    #[ntex::test]
    async fn test_provider_failure_surfaces_details() {
        let mut mock_api = MockMessagingApi::new();
        mock_api.expect_get_template().times(1).returning(|_| {
            Err(ProviderError::Rejected {
                status: 404,
                message: "Unsupported get request".into(),
                details: json!({"error": {"message": "Unsupported get request", "code": 100}}),
            })
        });

        let app = test::init_service(
            web::App::new()
                .state(state(mock_api))
                .configure(routes::templates),
        )
        .await;

        let req = test::TestRequest::with_uri("/templates/missing_template").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(resp).await;
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Failed to fetch template",
                "details": {"error": {"message": "Unsupported get request", "code": 100}}
            })
        );
    }

    #[ntex::test]
    async fn test_create_template_requires_fields() {
        let app = test::init_service(
            web::App::new()
                .state(state(MockMessagingApi::new()))
                .configure(routes::templates),
        )
        .await;

        let req = test::TestRequest::with_uri("/templates")
            .method(Method::POST)
            .set_json(&json!({"name": "welcome", "category": "UTILITY"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await["error"],
            "Missing required fields: name, category, language, components"
        );
    }

    #[ntex::test]
    async fn test_delete_template_endpoint() {
        let mut mock_api = MockMessagingApi::new();
        mock_api
            .expect_delete_template()
            .withf(|name| name == "order_update")
            .times(1)
            .returning(|_| Ok(json!({"success": true})));

        let app = test::init_service(
            web::App::new()
                .state(state(mock_api))
                .configure(routes::templates),
        )
        .await;

        let req = test::TestRequest::with_uri("/templates/order_update")
            .method(Method::DELETE)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["data"]["success"], true);
    }

    #[ntex::test]
    async fn test_recreate_ignores_failed_delete() {
        let mut seq = Sequence::new();
        let mut mock_api = MockMessagingApi::new();
        mock_api
            .expect_delete_template()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(ProviderError::Rejected {
                    status: 404,
                    message: "Template not found".into(),
                    details: json!({}),
                })
            });
        mock_api
            .expect_create_template()
            .withf(|template| {
                template.name == "welcome_message"
                    && template.category == "MARKETING"
                    && template.components.is_empty()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({"id": "1", "status": "PENDING"})));

        let result = recreate_template(
            &mock_api,
            "welcome_message",
            &RecreateTemplateRequest {
                category: Some("MARKETING".into()),
                language: Some("en_US".into()),
                components: Some(vec![]),
            },
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "PENDING");
    }

    #[ntex::test]
    async fn test_recreate_requires_fields() {
        let result = recreate_template(
            &MockMessagingApi::new(),
            "welcome_message",
            &RecreateTemplateRequest {
                category: Some("MARKETING".into()),
                ..Default::default()
            },
            Duration::ZERO,
        )
        .await;

        assert!(matches!(
            result,
            Err(ApiError::Validation(ref msg)) if msg == "Missing required fields: category, language, components"
        ));
    }
}
