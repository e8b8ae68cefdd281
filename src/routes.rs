use crate::{
    api::{
        attendance, bill, compliance, customer_address, employee, export_job, invoice,
        leave_request, payroll, performance_review,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
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

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/hr")
                    .service(
                        web::scope("/employees")
                            .service(
                                web::resource("")
                                    .route(web::post().to(employee::create_employee))
                                    .route(web::get().to(employee::list_employees)),
                            )
                            .service(
                                web::resource("/{employee_id}")
                                    .route(web::get().to(employee::get_employee))
                                    .route(web::patch().to(employee::update_employee))
                                    .route(web::delete().to(employee::delete_employee)),
                            ),
                    )
                    .service(
                        web::scope("/leave-requests")
                            .service(
                                web::resource("")
                                    .route(web::post().to(leave_request::create_leave))
                                    .route(web::get().to(leave_request::leave_list)),
                            )
                            // literal route before the {leave_id} matcher
                            .service(
                                web::resource("/balance")
                                    .route(web::get().to(leave_request::leave_balance)),
                            )
                            .service(
                                web::resource("/{leave_id}")
                                    .route(web::get().to(leave_request::get_leave))
                                    .route(web::patch().to(leave_request::update_leave))
                                    .route(web::delete().to(leave_request::delete_leave)),
                            )
                            .service(
                                web::resource("/{leave_id}/approve")
                                    .route(web::patch().to(leave_request::approve_leave)),
                            )
                            .service(
                                web::resource("/{leave_id}/reject")
                                    .route(web::patch().to(leave_request::reject_leave)),
                            )
                            .service(
                                web::resource("/{leave_id}/cancel")
                                    .route(web::patch().to(leave_request::cancel_leave)),
                            ),
                    )
                    .service(
                        web::scope("/attendance")
                            .service(
                                web::resource("")
                                    .route(web::post().to(attendance::record_attendance))
                                    .route(web::get().to(attendance::list_attendance)),
                            )
                            .service(
                                web::resource("/check-in")
                                    .route(web::post().to(attendance::check_in)),
                            )
                            .service(
                                web::resource("/check-out")
                                    .route(web::patch().to(attendance::check_out)),
                            ),
                    )
                    .service(
                        web::scope("/payroll")
                            .service(
                                web::resource("")
                                    .route(web::post().to(payroll::create_payroll))
                                    .route(web::get().to(payroll::list_payrolls)),
                            )
                            .service(
                                web::resource("/{payroll_id}")
                                    .route(web::get().to(payroll::get_payroll))
                                    .route(web::patch().to(payroll::update_payroll))
                                    .route(web::delete().to(payroll::cancel_payroll)),
                            )
                            .service(
                                web::resource("/{payroll_id}/process")
                                    .route(web::patch().to(payroll::process_payroll)),
                            ),
                    )
                    .service(
                        web::scope("/performance-reviews")
                            .service(
                                web::resource("")
                                    .route(web::post().to(performance_review::create_review))
                                    .route(web::get().to(performance_review::list_reviews)),
                            )
                            .service(
                                web::resource("/{review_id}")
                                    .route(web::get().to(performance_review::get_review))
                                    .route(web::patch().to(performance_review::update_review))
                                    .route(web::delete().to(performance_review::delete_review)),
                            )
                            .service(
                                web::resource("/{review_id}/complete")
                                    .route(web::patch().to(performance_review::complete_review)),
                            )
                            .service(
                                web::resource("/{review_id}/approve")
                                    .route(web::patch().to(performance_review::approve_review)),
                            ),
                    )
                    .service(
                        web::scope("/compliance")
                            .service(
                                web::resource("")
                                    .route(web::post().to(compliance::create_compliance))
                                    .route(web::get().to(compliance::list_compliance)),
                            )
                            .service(
                                web::resource("/bulk")
                                    .route(web::post().to(compliance::bulk_create_compliance)),
                            )
                            .service(
                                web::resource("/sweep-expired")
                                    .route(web::post().to(compliance::sweep_expired)),
                            )
                            .service(
                                web::resource("/{item_id}")
                                    .route(web::get().to(compliance::get_compliance))
                                    .route(web::patch().to(compliance::update_compliance)),
                            )
                            .service(
                                web::resource("/{item_id}/complete")
                                    .route(web::patch().to(compliance::complete_compliance)),
                            ),
                    ),
            )
            .service(
                web::scope("/finance")
                    .service(
                        web::scope("/invoices")
                            .service(
                                web::resource("")
                                    .route(web::post().to(invoice::create_invoice))
                                    .route(web::get().to(invoice::list_invoices)),
                            )
                            .service(
                                web::resource("/{invoice_id}")
                                    .route(web::get().to(invoice::get_invoice))
                                    .route(web::patch().to(invoice::update_invoice)),
                            )
                            .service(
                                web::resource("/{invoice_id}/status")
                                    .route(web::patch().to(invoice::transition_invoice)),
                            )
                            .service(
                                web::resource("/{invoice_id}/payments")
                                    .route(web::post().to(invoice::add_invoice_payment)),
                            ),
                    )
                    .service(
                        web::scope("/bills")
                            .service(
                                web::resource("")
                                    .route(web::post().to(bill::create_bill))
                                    .route(web::get().to(bill::list_bills)),
                            )
                            .service(
                                web::resource("/{bill_id}")
                                    .route(web::get().to(bill::get_bill))
                                    .route(web::patch().to(bill::update_bill)),
                            )
                            .service(
                                web::resource("/{bill_id}/status")
                                    .route(web::patch().to(bill::transition_bill)),
                            )
                            .service(
                                web::resource("/{bill_id}/payments")
                                    .route(web::post().to(bill::add_bill_payment)),
                            ),
                    )
                    .service(
                        web::scope("/customer-addresses")
                            .service(
                                web::resource("")
                                    .route(web::post().to(customer_address::create_address))
                                    .route(web::get().to(customer_address::list_addresses)),
                            )
                            .service(
                                web::resource("/{address_id}")
                                    .route(web::delete().to(customer_address::delete_address)),
                            ),
                    )
                    .service(
                        web::scope("/exports")
                            .service(
                                web::resource("")
                                    .route(web::post().to(export_job::create_export))
                                    .route(web::get().to(export_job::list_exports)),
                            )
                            .service(
                                web::resource("/{job_id}")
                                    .route(web::get().to(export_job::get_export)),
                            )
                            .service(
                                web::resource("/{job_id}/download")
                                    .route(web::get().to(export_job::download_export)),
                            )
                            .service(
                                web::resource("/{job_id}/cancel")
                                    .route(web::patch().to(export_job::cancel_export)),
                            ),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
