use super::handlers;
use axum::{routing::get, Router};

/// Role CRUD, mounted under both `/roles` and `/api/v1/roles`
pub fn roles_routes() -> Router {
    let mut router = Router::new();
    for prefix in ["/roles", "/api/v1/roles"] {
        router = router
            .route(prefix, get(handlers::list_roles).post(handlers::create_role))
            .route(
                &format!("{}/:id", prefix),
                get(handlers::get_role)
                    .put(handlers::update_role)
                    .delete(handlers::delete_role),
            );
    }
    router
}
