//! Scripted in-memory backend for request-layer tests
//!
//! `FakeBackend` implements `Transport` and answers like the dashboard API
//! would: a session flag flipped by login/refresh/logout, 401 for protected
//! routes when the flag is off, and a few canned resources. Every request is
//! logged so tests can count refresh calls and inspect replays.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use tokio::sync::Semaphore;

use crate::transport::{SendFuture, Transport, TransportError, TransportRequest, TransportResponse};

pub(crate) const BASE: &str = "http://backend.test/api";

/// How `/auth/refresh` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshBehavior {
    /// 200 and the session becomes valid
    Renew,
    /// Given status, session unchanged
    Reject(u16),
    /// Transport error, no response
    Unreachable,
}

pub(crate) struct FakeBackend {
    session_valid: AtomicBool,
    refresh_behavior: Mutex<RefreshBehavior>,
    /// When set, each refresh call waits for one permit before answering
    refresh_gate: Option<Semaphore>,
    log: Mutex<Vec<TransportRequest>>,
    company: Mutex<serde_json::Value>,
}

impl FakeBackend {
    pub(crate) fn new(session_valid: bool, behavior: RefreshBehavior) -> Self {
        Self {
            session_valid: AtomicBool::new(session_valid),
            refresh_behavior: Mutex::new(behavior),
            refresh_gate: None,
            log: Mutex::new(Vec::new()),
            company: Mutex::new(serde_json::json!({
                "id": "c1",
                "name": "Restaurante Sabor Caseiro Ltda",
                "shortName": "Sabor Caseiro",
                "cnpj": "12.345.678/0001-90",
            })),
        }
    }

    /// Hold every refresh call until `release_refresh` is called.
    pub(crate) fn gated(mut self) -> Self {
        self.refresh_gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn release_refresh(&self, permits: usize) {
        if let Some(gate) = &self.refresh_gate {
            gate.add_permits(permits);
        }
    }

    pub(crate) fn set_session_valid(&self, valid: bool) {
        self.session_valid.store(valid, Ordering::SeqCst);
    }

    pub(crate) fn set_refresh_behavior(&self, behavior: RefreshBehavior) {
        *self.refresh_behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Number of logged requests for `method` whose path (query excluded)
    /// equals `path`.
    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .count()
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.count(Method::POST, "/auth/refresh")
    }

    async fn answer(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let path = path_of(&request.url).to_owned();

        if path == "/auth/refresh" {
            if let Some(gate) = &self.refresh_gate {
                gate.acquire().await.unwrap().forget();
            }
            let behavior = *self.refresh_behavior.lock().unwrap();
            return match behavior {
                RefreshBehavior::Renew => {
                    self.set_session_valid(true);
                    Ok(json(200, serde_json::json!({ "message": "ok" })))
                }
                RefreshBehavior::Reject(status) => Ok(json(
                    status,
                    serde_json::json!({ "message": "Refresh token inválido" }),
                )),
                RefreshBehavior::Unreachable => {
                    Err(TransportError::Connect("connection refused".into()))
                }
            };
        }

        match (request.method.clone(), path.as_str()) {
            (Method::POST, "/auth/login") => {
                let body: serde_json::Value = request
                    .body
                    .as_deref()
                    .and_then(|b| serde_json::from_slice(b).ok())
                    .unwrap_or_default();
                if body["password"] == "correta" {
                    self.set_session_valid(true);
                    Ok(json(200, serde_json::json!({ "message": "Login realizado" })))
                } else {
                    Ok(json(401, serde_json::json!({ "message": "Credenciais inválidas" })))
                }
            }
            (Method::POST, "/auth/logout") => {
                self.set_session_valid(false);
                Ok(json(200, serde_json::json!({})))
            }
            (_, "/always-401") => Ok(json(401, serde_json::json!({ "message": "Acesso negado" }))),
            (_, "/broken") => Ok(raw(500, "text/html", "<h1>Internal Server Error</h1>")),
            _ if !self.session_valid.load(Ordering::SeqCst) => {
                Ok(json(401, serde_json::json!({ "message": "Token expirado" })))
            }
            (Method::GET, "/auth/me") => Ok(json(
                200,
                serde_json::json!({ "id": "u1", "name": "Ana", "email": "ana@restaurante.com" }),
            )),
            (Method::GET, "/foods") => Ok(json(
                200,
                serde_json::json!({ "data": [{ "id": "f1", "name": "Frango" }], "page": 1 }),
            )),
            (Method::POST, "/sectors")
            | (Method::PATCH, "/sectors/s1")
            | (Method::PUT, "/sectors/s1") => {
                let echoed: serde_json::Value = request
                    .body
                    .as_deref()
                    .and_then(|b| serde_json::from_slice(b).ok())
                    .unwrap_or_default();
                Ok(json(200, serde_json::json!({ "id": "s1", "received": echoed })))
            }
            (Method::POST, "/sectors/s1/archive") => Ok(json(
                200,
                serde_json::json!({ "id": "s1", "archived": true }),
            )),
            (Method::GET, "/company") => Ok(json(200, self.company.lock().unwrap().clone())),
            (Method::PUT, "/company/c1") => {
                let changes: serde_json::Value = request
                    .body
                    .as_deref()
                    .and_then(|b| serde_json::from_slice(b).ok())
                    .unwrap_or_default();
                let mut company = self.company.lock().unwrap();
                if let (Some(current), Some(changes)) =
                    (company.as_object_mut(), changes.as_object())
                {
                    for (key, value) in changes {
                        current.insert(key.clone(), value.clone());
                    }
                }
                Ok(json(200, company.clone()))
            }
            (Method::PUT, path) if path.starts_with("/company/") => {
                Ok(json(404, serde_json::json!({ "message": "Empresa não encontrada" })))
            }
            (Method::POST, "/sectors/invalid") => {
                Ok(json(400, serde_json::json!({ "message": "Setor inválido" })))
            }
            (Method::DELETE, "/sectors/s1") => Ok(TransportResponse {
                status: StatusCode::NO_CONTENT,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            }),
            (Method::GET, "/reports/DAILY") => {
                let mut response = raw(200, "application/pdf", "%PDF-1.4 relatorio");
                response.headers.insert(
                    CONTENT_DISPOSITION,
                    HeaderValue::from_static(
                        "attachment; filename*=UTF-8''relat%C3%B3rio.pdf",
                    ),
                );
                Ok(response)
            }
            (Method::GET, "/reports/missing") => {
                Ok(raw(404, "text/plain", "Relatório não encontrado"))
            }
            _ => Ok(json(404, serde_json::json!({ "message": "Rota não encontrada" }))),
        }
    }
}

impl Transport for FakeBackend {
    fn send(&self, request: TransportRequest) -> SendFuture<'_> {
        self.log.lock().unwrap().push(request.clone());
        Box::pin(self.answer(request))
    }
}

/// Path relative to `BASE` with the query string removed.
pub(crate) fn path_of(url: &str) -> &str {
    let path = url.strip_prefix(BASE).unwrap_or(url);
    path.split('?').next().unwrap_or(path)
}

pub(crate) fn json(status: u16, body: serde_json::Value) -> TransportResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    TransportResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::from(body.to_string()),
    }
}

pub(crate) fn raw(
    status: u16,
    content_type: &'static str,
    body: &'static str,
) -> TransportResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    TransportResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::from_static(body.as_bytes()),
    }
}
