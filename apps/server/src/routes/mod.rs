use actix_web::web;

mod endpoints;
mod health;
mod monitoring;


pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_route)
        .service(
            web::scope("/api/monitoring")
                .service(monitoring::all_stats)
                .service(monitoring::active_stats)
                .service(monitoring::endpoint_stats)
                .service(monitoring::health_checks)
                .service(monitoring::health_checks_since)
                .service(monitoring::check_all)
                .service(monitoring::check_endpoint),
        )
        .service(
            web::scope("/api/endpoints")
                .service(endpoints::list_endpoints)
                .service(endpoints::create_endpoint)
                .service(endpoints::list_active_endpoints)
                .service(endpoints::count_active_endpoints)
                .service(endpoints::get_endpoint)
                .service(endpoints::update_endpoint)
                .service(endpoints::delete_endpoint)
                .service(endpoints::toggle_endpoint),
        );
}
