use crate::{api::attendance, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let attendance_limiter = Arc::new(build_limiter(config.rate_attendance_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(attendance_limiter)
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/login/{user_id}").route(web::post().to(attendance::login)),
                    )
                    .service(
                        web::resource("/logout/{record_id}")
                            .route(web::post().to(attendance::logout)),
                    )
                    .service(
                        web::resource("/history/{user_id}")
                            .route(web::get().to(attendance::history)),
                    )
                    .service(
                        web::resource("/history/{user_id}/days")
                            .route(web::get().to(attendance::history_days)),
                    )
                    .service(
                        web::resource("/history/{user_id}/days/{date}")
                            .route(web::get().to(attendance::day)),
                    )
                    .service(
                        web::resource("/hourly-ip/{user_id}")
                            .route(web::post().to(attendance::hourly_ip)),
                    )
                    .service(
                        web::resource("/{record_id}").route(web::put().to(attendance::correct)),
                    ),
            ),
    );
}
