use crate::handlers::analytics as routes;
use crate::AppState;
use axum::routing::get;
use axum::{
	extract::FromRef,
	http::{
		header::{AUTHORIZATION, CONTENT_TYPE},
		{HeaderValue, Method},
	},
	Router,
};
use tower_http::cors::CorsLayer;

pub fn repo_analytics<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	AppState: FromRef<S>,
{
	let cors = CorsLayer::new()
		.allow_origin("http://localhost:5173".parse::<HeaderValue>().unwrap())
		.allow_methods([Method::GET])
		.allow_headers([CONTENT_TYPE, AUTHORIZATION])
		.allow_credentials(true);

	Router::new().route("/analytics/:owner/:repo", get(routes::get_repo_analytics)).layer(cors)
}
