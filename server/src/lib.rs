#![allow(clippy::new_without_default)]

use app::{App, AppError};
use auth::{TokenHandler, UserClaims};
use futures::future;
use hyper::{body::Buf, Body, Request, Response};
use model::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub mod app;
pub mod auth;
pub mod controller;

#[macro_use]
extern crate log;

#[derive(Clone, Debug)]
pub struct Opts {
    pub port: u16,
    pub database_addr: String,
    pub max_connections: u32,
    pub conflict_retries: u32,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            port: 3000,
            database_addr: String::new(),
            max_connections: 5,
            conflict_retries: 3,
        }
    }
}

const API_URI: &str = "/api";
const PING_URI: &str = "/api/ping";
const URIS: [&str; 2] = [API_URI, PING_URI];

pub async fn entry_point(
    webserver: Arc<Webserver>,
    request: Request<Body>,
) -> Result<Response<Body>, hyper::Error> {
    Ok(webserver.handle_request(request).await)
}

pub struct Webserver {
    app: Arc<App>,
    tokens: TokenHandler,
}

impl Webserver {
    pub fn new(app: Arc<App>, tokens: TokenHandler) -> Self {
        Self { app, tokens }
    }

    pub async fn handle_request(&self, request: Request<Body>) -> Response<Body> {
        let route = request.uri().path().to_string();
        // route without trailing slash for easier matching
        let without_trailing_slash = route.trim_end_matches('/');
        trace!(
            "matching route '{}' against {:?}",
            without_trailing_slash,
            URIS
        );
        match (request.method(), without_trailing_slash) {
            (_, PING_URI) => ping_pong_response(),
            (&hyper::Method::POST, API_URI) => {
                let response_body = self.api_route(request).await;
                generic_json_response(response_body, 200)
            }
            _invalid => {
                error!("invalid http method or route request: '{:?}'", request);
                generic_json_response(not_found(), 200)
            }
        }
    }

    async fn api_route(&self, request: Request<Body>) -> Vec<JsonRpcResponse> {
        let claims = self.get_auth_claims(&request);

        match Self::get_body_as_json(request).await {
            Ok(JsonValue::Array(values)) => {
                let results: Vec<_> = values
                    .into_iter()
                    .map(|v| self.parse_and_handle_single(v, &claims))
                    .collect();

                future::join_all(results)
                    .await
                    .into_iter()
                    .filter_map(|res| match res {
                        Ok(response) => response,
                        Err(error) => {
                            error!("error handling request: '{:?}'", error.context);
                            Some(JsonRpcResponse::error(error.rpc_error, None))
                        }
                    })
                    .collect()
            }
            Ok(_) => {
                error!("request contains non-array JSON");
                vec![JsonRpcResponse::error(
                    JsonRpcError::invalid_request().with_message("non-array json is not supported"),
                    None,
                )]
            }
            Err(error) => {
                error!("error parsing request as json: '{:?}'", error.context);
                vec![JsonRpcResponse::error(error.rpc_error, None)]
            }
        }
    }

    fn get_auth_claims(&self, request: &Request<Body>) -> Option<UserClaims> {
        let header = request.headers().get("Authorization")?;
        let token = header.to_str().ok()?.trim_start_matches("Bearer ");
        self.tokens.parse_token(token).ok()
    }

    async fn parse_and_handle_single(
        &self,
        request: JsonValue,
        claims: &Option<UserClaims>,
    ) -> Result<Option<JsonRpcResponse>, AppError> {
        match serde_json::from_value::<JsonRpcRequest>(request) {
            Ok(request) => {
                if request.is_notification() {
                    let claims = *claims;
                    let app = self.app.clone();
                    tokio::spawn(async move { app.handle_single(request, &claims).await });
                    Ok(None)
                } else {
                    Ok(Some(self.app.handle_single(request, claims).await))
                }
            }
            Err(serde_error) => {
                Err(AppError::from(JsonRpcError::invalid_request()).with_context(&serde_error))
            }
        }
    }

    /// Attempts to parse the body of a request as json
    async fn get_body_as_json(request: Request<Body>) -> Result<JsonValue, AppError> {
        let buf = hyper::body::aggregate(request)
            .await
            .map_err(|hyper_error| AppError::invalid_request().with_context(&hyper_error))?;
        let json: JsonValue = serde_json::from_reader(buf.reader())
            .map_err(|serde_error| AppError::invalid_request().with_context(&serde_error))?;

        Ok(json)
    }
}

fn generic_json_response<T>(body: T, status: u16) -> Response<Body>
where
    T: Serialize,
{
    let response = serde_json::to_vec(&body)
        .map_err(AppError::from)
        .and_then(|b| {
            Response::builder()
                .status(status)
                .header("Content-Type", "application/json")
                .body(Body::from(b))
                .map_err(AppError::from)
        });

    match response {
        Ok(response) => response,
        Err(error) => {
            error!("failed to build response: '{:?}'", error.context);
            let mut response = Response::new(Body::empty());
            *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn ping_pong_response() -> Response<Body> {
    Response::new(Body::from("pong"))
}

fn not_found() -> Vec<JsonRpcResponse> {
    let error = JsonRpcError::invalid_request().with_message("invalid route");
    let response = JsonRpcResponse::error(error, None);

    vec![response]
}
