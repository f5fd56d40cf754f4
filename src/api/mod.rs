// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::events::AppEvent;
use crate::state::AppState;
use crate::storage::SenderRole;

pub mod creators;
pub mod health;
pub mod identity;
pub mod messages;
pub mod unlock;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/me", get(identity::get_me).patch(identity::update_me))
        .route("/me/connections", get(users::list_connections))
        .route("/me/transactions", get(users::list_transactions))
        .route("/wallet", post(identity::create_wallet))
        .route("/wallet/balance", get(identity::get_balance))
        .route(
            "/creators",
            get(creators::list_creators).post(creators::register_creator),
        )
        .route("/creators/login", post(creators::login_creator))
        .route("/creators/logout", post(creators::logout_creator))
        .route("/creators/me", patch(creators::update_creator))
        .route("/creators/me/connections", get(creators::list_supporters))
        .route("/creators/me/earnings", get(creators::get_earnings))
        .route("/creators/me/events", get(messages::creator_dashboard_ws))
        .route("/creators/{creator_id}", get(creators::get_creator))
        .route("/creators/{creator_id}/unlock", post(unlock::unlock))
        .route(
            "/creators/{creator_id}/messages",
            get(messages::list_user_thread).post(messages::send_user_message),
        )
        .route(
            "/creators/{creator_id}/messages/ws",
            get(messages::user_thread_ws),
        )
        .route(
            "/threads/{user_id}/messages",
            get(messages::list_creator_thread).post(messages::send_creator_message),
        )
        .route("/threads/{user_id}/ws", get(messages::creator_thread_ws))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        identity::get_me,
        identity::update_me,
        identity::create_wallet,
        identity::get_balance,
        users::list_connections,
        users::list_transactions,
        creators::list_creators,
        creators::get_creator,
        creators::register_creator,
        creators::login_creator,
        creators::logout_creator,
        creators::update_creator,
        creators::list_supporters,
        creators::get_earnings,
        unlock::unlock,
        messages::list_user_thread,
        messages::send_user_message,
        messages::list_creator_thread,
        messages::send_creator_message,
        messages::user_thread_ws,
        messages::creator_thread_ws,
        messages::creator_dashboard_ws
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            identity::MeResponse,
            identity::UpdateMeRequest,
            identity::WalletState,
            identity::WalletResponse,
            identity::BalanceResponse,
            users::ConnectedCreator,
            users::MessagePreview,
            users::PaymentRecord,
            creators::CreatorSummary,
            creators::RegisterCreatorRequest,
            creators::UpdateCreatorRequest,
            creators::CreatorLoginResponse,
            creators::SupporterConnection,
            creators::DayEarnings,
            creators::EarningsResponse,
            unlock::UnlockResponse,
            unlock::UnlockResponseStatus,
            messages::MessageView,
            messages::SendMessageRequest,
            AppEvent,
            SenderRole
        )
    ),
    tags(
        (name = "Health", description = "Service health probes"),
        (name = "Identity", description = "Caller profile and custodial wallet"),
        (name = "Me", description = "The caller's connections and payment history"),
        (name = "Creators", description = "Creator directory, registration and dashboard"),
        (name = "Unlock", description = "Paid connection unlocks"),
        (name = "Messages", description = "Direct message threads and live streams")
    )
)]
struct ApiDoc;
