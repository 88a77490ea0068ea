use ntex::web;

/// Configures the WhatsApp webhook routes.
///
/// Public endpoints, Meta authenticates through the verify token handshake.
///
/// # Routes
/// - `GET /webhook`, `GET /` - webhook verification
/// - `POST /webhook`, `POST /` - webhook receiver
pub fn whatsapp(cfg: &mut web::ServiceConfig) {
    for path in ["/webhook", "/"] {
        cfg.service(
            web::resource(path)
                .route(web::get().to(super::whatsapp::verify))
                .route(web::post().to(super::whatsapp::receive)),
        );
    }
}
