pub mod v1;

use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub const HEALTH_MESSAGE: &str = "matecircle is online!";

/// The whole HTTP surface: `GET /` health check plus `/api/v1`.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let health = warp::path::end()
        .and(warp::get())
        .map(|| HEALTH_MESSAGE);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(v1::routes(server));

    health.or(api_v1).recover(v1::recover_error)
}
