//! API router.
//!
//! Returns a composable `Router` mounted under `/api/`. Every route is
//! reachable with and without a trailing slash.
//!
//! Middleware stack for protected groups (outermost → innermost):
//! 1. Auth validator → 2. Audit logger → 3. Role gate (per group)

use axum::http::{header, HeaderValue};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, MethodRouter};
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{admin, doctor, health, labtech, pharmacist, receptionist, token};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::authorization::Access;
use crate::models::Role;

type Routes = Vec<(&'static str, MethodRouter<ApiContext>)>;

/// Register each route under both `path` and `path/`.
fn with_trailing_slash(routes: Routes) -> Router<ApiContext> {
    routes
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| {
            router
                .route(path, handler.clone())
                .route(&format!("{path}/"), handler)
        })
}

/// An endpoint group behind a role gate.
fn gated(routes: Routes, access: Access) -> Router<ApiContext> {
    with_trailing_slash(routes).route_layer(from_fn_with_state(
        access,
        middleware::auth::require_access,
    ))
}

fn admin_routes() -> Router<ApiContext> {
    gated(
        vec![
            (
                "/departments",
                get(admin::list_departments).post(admin::create_department),
            ),
            (
                "/departments/:id",
                get(admin::get_department)
                    .put(admin::replace_department)
                    .patch(admin::patch_department)
                    .delete(admin::delete_department),
            ),
            (
                "/employees",
                get(admin::list_employees).post(admin::create_employee),
            ),
            (
                "/employees/:id",
                get(admin::get_employee)
                    .put(admin::replace_employee)
                    .patch(admin::patch_employee)
                    .delete(admin::delete_employee),
            ),
            (
                "/employees/:id/generate-account",
                post(admin::generate_account),
            ),
            ("/employees/by-role/:role", get(admin::employees_by_role)),
            ("/accounts", get(admin::list_accounts)),
            ("/accounts/:id", get(admin::get_account)),
            ("/billing", get(admin::list_billing)),
            ("/billing/:id", get(admin::get_billing)),
        ],
        Access::Admin,
    )
}

fn doctor_routes() -> Router<ApiContext> {
    gated(
        vec![
            ("/my-appointments", get(doctor::my_appointments)),
            ("/appointments/:id", get(doctor::appointment_detail)),
            (
                "/appointments/:id/prescription",
                get(doctor::get_prescription).post(doctor::create_prescription),
            ),
            (
                "/appointments/:id/prescription/add-item",
                post(doctor::add_prescription_item),
            ),
            ("/appointments/:id/lab-order", post(doctor::create_lab_order)),
            (
                "/appointments/:id/pharmacy-order",
                post(doctor::create_pharmacy_order),
            ),
            ("/appointments/:id/complete", post(doctor::complete)),
        ],
        Access::Staff(Role::Doctor),
    )
}

fn receptionist_routes() -> Router<ApiContext> {
    gated(
        vec![
            (
                "/patients",
                get(receptionist::list_patients).post(receptionist::create_patient),
            ),
            (
                "/patients/:id",
                get(receptionist::get_patient).patch(receptionist::update_patient),
            ),
            (
                "/appointments",
                get(receptionist::list_appointments).post(receptionist::create_appointment),
            ),
            (
                "/appointments/:id",
                get(receptionist::get_appointment).patch(receptionist::update_appointment),
            ),
            (
                "/appointments/:id/cancel",
                post(receptionist::cancel_appointment),
            ),
            ("/doctors", get(receptionist::list_doctors)),
        ],
        Access::Staff(Role::Receptionist),
    )
}

fn pharmacist_routes() -> Router<ApiContext> {
    gated(
        vec![
            ("/orders", get(pharmacist::list_orders)),
            ("/orders/:id", get(pharmacist::get_order)),
            ("/orders/:id/dispense", post(pharmacist::dispense_order)),
            ("/prescriptions", get(pharmacist::list_prescriptions)),
            ("/prescriptions/:id", get(pharmacist::get_prescription)),
            (
                "/prescriptions/:id/dispense",
                post(pharmacist::dispense_prescription),
            ),
        ],
        Access::Staff(Role::Pharmacist),
    )
}

fn labtech_routes() -> Router<ApiContext> {
    gated(
        vec![
            ("/orders", get(labtech::list_orders)),
            ("/orders/:id", get(labtech::get_order)),
            ("/orders/:id/process", post(labtech::process_order)),
        ],
        Access::Staff(Role::LabTechnician),
    )
}

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    // Protected routes: auth + audit, then a role gate per group
    let protected = Router::new()
        .nest("/admin-panel", admin_routes())
        .nest("/doctor", doctor_routes())
        .nest("/receptionist", receptionist_routes())
        .nest("/pharmacist", pharmacist_routes())
        .nest("/labtech", labtech_routes())
        .with_state(ctx.clone())
        .layer(from_fn(middleware::audit::log_access))
        .layer(from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(Extension(ctx.clone()));

    // Unprotected routes
    let public = with_trailing_slash(vec![
        ("/health", get(health::check)),
        ("/token", post(token::obtain)),
        ("/token/refresh", post(token::refresh)),
    ])
    .with_state(ctx);

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
