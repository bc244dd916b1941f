//! HTTP shim forwarding ticket-creation requests to JIRA.
//!
//! `GET /` serves a short usage page; `GET|POST /create-jira-ticket`
//! takes title/description/assignee/parent as query parameters (or a
//! JSON body on POST) and answers with the created ticket's URL.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::jira::JiraClient;

#[derive(Debug, Default, Deserialize)]
struct TicketRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    assignee: String,
    #[serde(default)]
    parent: String,
}

#[derive(Serialize)]
struct TicketResponse {
    success: bool,
    url: String,
    message: String,
}

/// Run the shim until the process is stopped.
pub async fn serve(config: Arc<AppConfig>, port: u16) -> Result<()> {
    config.validate_jira()?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("JIRA shim listening on http://{addr}");

    let make_svc = make_service_fn(move |_conn| {
        let config = config.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let config = config.clone();
                async move { Ok::<_, Infallible>(handle(req, config).await) }
            }))
        }
    });

    Server::bind(&addr)
        .serve(make_svc)
        .await
        .context("HTTP server failed")
}

async fn handle(req: Request<Body>, config: Arc<AppConfig>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    if path == "/create-jira-ticket" {
        if method == Method::GET || method == Method::POST {
            create_ticket(req, config).await
        } else {
            text_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
    } else if path == "/" && method == Method::GET {
        usage_page()
    } else {
        text_response(StatusCode::NOT_FOUND, "Not found")
    }
}

async fn create_ticket(req: Request<Body>, config: Arc<AppConfig>) -> Response<Body> {
    let is_post = *req.method() == Method::POST;
    let params = query_params(req.uri().query().unwrap_or_default());
    let mut ticket = TicketRequest {
        title: params.get("title").cloned().unwrap_or_default(),
        description: params.get("description").cloned().unwrap_or_default(),
        assignee: params.get("assignee").cloned().unwrap_or_default(),
        parent: params.get("parent").cloned().unwrap_or_default(),
    };

    // A JSON body on POST wins over query parameters.
    if is_post {
        match hyper::body::to_bytes(req.into_body()).await {
            Ok(bytes) if !bytes.is_empty() => match serde_json::from_slice(&bytes) {
                Ok(body) => ticket = body,
                Err(err) => {
                    return text_response(
                        StatusCode::BAD_REQUEST,
                        &format!("Invalid JSON body: {err}"),
                    )
                }
            },
            Ok(_) => {}
            Err(err) => {
                return text_response(
                    StatusCode::BAD_REQUEST,
                    &format!("Failed to read request body: {err}"),
                )
            }
        }
    }

    if ticket.title.is_empty() {
        return text_response(StatusCode::BAD_REQUEST, "Missing required parameter: title");
    }
    if ticket.parent.is_empty() {
        ticket.parent = config.jira.parent_task.clone();
    }

    let client = match JiraClient::new(config.jira.clone()) {
        Ok(client) => client,
        Err(err) => {
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("{err:#}"))
        }
    };

    match client
        .create_ticket(
            &ticket.title,
            &ticket.description,
            &ticket.assignee,
            &ticket.parent,
        )
        .await
    {
        Ok(url) => {
            info!("Created JIRA ticket: {url}");
            let body = TicketResponse {
                success: true,
                url,
                message: "JIRA ticket created successfully".to_string(),
            };
            json_response(StatusCode::OK, &body)
        }
        Err(err) => {
            error!("Error creating JIRA ticket: {err:#}");
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Error creating JIRA ticket: {err:#}"),
            )
        }
    }
}

/// Decode a query string into a map. Malformed pairs are skipped.
fn query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((
                urlencoding::decode(key).ok()?.into_owned(),
                urlencoding::decode(value).ok()?.into_owned(),
            ))
        })
        .collect()
}

fn usage_page() -> Response<Body> {
    let html = r#"<!DOCTYPE html>
<html>
<head><title>garchive - JIRA Integration</title></head>
<body>
<h1>garchive JIRA integration</h1>
<p>POST /create-jira-ticket with the parameters:</p>
<ul>
<li><strong>title</strong>: ticket title (required)</li>
<li><strong>description</strong>: ticket description</li>
<li><strong>assignee</strong>: user to assign the ticket to</li>
<li><strong>parent</strong>: parent ticket key</li>
</ul>
</body>
</html>
"#;
    let mut response = Response::new(Body::from(html));
    response
        .headers_mut()
        .insert("Content-Type", hyper::header::HeaderValue::from_static("text/html"));
    response
}

fn text_response(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(message.to_string()));
    *response.status_mut() = status;
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response.headers_mut().insert(
                "Content-Type",
                hyper::header::HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(err) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("{err}")),
    }
}
