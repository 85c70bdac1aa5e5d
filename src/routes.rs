use crate::{
    api::{department, employee, position, rank, role, schedule_doc, user, vacation},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfigBuilder, PeerIpKeyExtractor,
};
use actix_web::middleware::{from_fn, Condition};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter; a limit of 0 disables it below.
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let rpm = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(60_000 / rpm as u64)
            .burst_size(rpm)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    // Malformed bodies, query strings and path segments all surface in
    // the shared {status, detail} error shape.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::Validation(err.to_string()).into()),
    );
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::Validation(err.to_string()).into()),
    );
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|err, _| ApiError::Validation(err.to_string()).into()),
    );

    let login_limiter = Condition::new(
        config.rate_login_per_min > 0,
        build_limiter(config.rate_login_per_min),
    );
    let protected_limiter = Condition::new(
        config.rate_protected_per_min > 0,
        build_limiter(config.rate_protected_per_min),
    );

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(department::get_department))
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(
                web::scope("/positions")
                    .service(
                        web::resource("")
                            .route(web::get().to(position::list_positions))
                            .route(web::post().to(position::create_position)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(position::get_position))
                            .route(web::put().to(position::update_position))
                            .route(web::delete().to(position::delete_position)),
                    ),
            )
            .service(
                web::scope("/ranks")
                    .service(
                        web::resource("")
                            .route(web::get().to(rank::list_ranks))
                            .route(web::post().to(rank::create_rank)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(rank::get_rank))
                            .route(web::put().to(rank::update_rank))
                            .route(web::delete().to(rank::delete_rank)),
                    ),
            )
            .service(
                web::scope("/roles")
                    .service(
                        web::resource("")
                            .route(web::get().to(role::list_roles))
                            .route(web::post().to(role::create_role)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(role::get_role))
                            .route(web::put().to(role::update_role))
                            .route(web::delete().to(role::delete_role)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/supervisor/{id}")
                            .route(web::get().to(employee::list_by_supervisor)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::get().to(user::list_users))
                            .route(web::post().to(user::create_user)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/vacations")
                    .service(
                        web::resource("")
                            .route(web::get().to(vacation::list_vacations))
                            .route(web::post().to(vacation::create_vacation)),
                    )
                    .service(
                        web::resource("/employee/{id}")
                            .route(web::get().to(vacation::list_by_employee)),
                    )
                    .service(
                        web::resource("/boss/{id}").route(web::get().to(vacation::list_by_boss)),
                    )
                    .service(
                        web::resource("/department/{id}")
                            .route(web::get().to(vacation::list_by_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(vacation::get_vacation))
                            .route(web::put().to(vacation::update_vacation))
                            .route(web::delete().to(vacation::delete_vacation)),
                    ),
            )
            .service(
                web::scope("/generate")
                    .service(
                        web::resource("/vacation-schedule")
                            .route(web::post().to(schedule_doc::generate_department_schedule)),
                    )
                    .service(
                        web::resource("/vacation-schedule/all")
                            .route(web::post().to(schedule_doc::generate_full_schedule)),
                    ),
            ),
    );
}

// LOGIN
//  └─ access_token (30 min fixed window; no refresh, re-login on expiry)

// API REQUEST
//  └─ Authorization: Bearer access_token
