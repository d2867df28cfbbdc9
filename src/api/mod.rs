mod controls;
mod health;
pub mod models;
mod navigation;
mod state;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(state::get_state)
            .service(state::run_diagnostics)
            .service(navigation::fly_to)
            .service(navigation::show_address)
            .service(controls::set_filters)
            .service(controls::set_color_mode)
            .service(controls::set_orbits)
            .service(controls::set_comets)
            .service(controls::set_pixel_ratio)
            .service(controls::set_pointer)
            .service(controls::set_viewport),
    );
}
