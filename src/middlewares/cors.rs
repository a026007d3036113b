use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        // the front desk app is served from a separate origin
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
