//! Common test utilities and helpers
//!
//! A canned HTTP server standing in for the enterprise API, and shell-script
//! scanners standing in for Lava.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One scripted HTTP response
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Canned {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            ..Self::json(body)
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// Request as seen by the canned server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub target: String,
    pub authorization: Option<String>,
}

type Routes = Arc<Mutex<HashMap<String, VecDeque<Canned>>>>;

/// In-process HTTP/1.1 server answering from per-path response queues
///
/// Each path serves its queued responses in order and keeps repeating the
/// last one. Unknown paths get a 404.
pub struct CannedServer {
    base: String,
    routes: Routes,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl CannedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Routes = Arc::default();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();

        let (r, q) = (Arc::clone(&routes), Arc::clone(&requests));
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let (routes, requests) = (Arc::clone(&r), Arc::clone(&q));
                tokio::spawn(async move {
                    let Some(recorded) = read_request(&mut stream).await else {
                        return;
                    };
                    let response = next_response(&routes, &recorded.target);
                    requests.lock().unwrap().push(recorded);
                    let _ = stream.write_all(render(&response).as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self {
            base,
            routes,
            requests,
        }
    }

    /// Base URL of the server (no trailing slash)
    pub fn url(&self) -> &str {
        &self.base
    }

    /// Queue responses for a request target (path plus query)
    pub fn route(&self, target: &str, responses: Vec<Canned>) {
        self.routes
            .lock()
            .unwrap()
            .insert(target.to_string(), responses.into());
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, target: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.target == target)
            .count()
    }

    /// `Link` header pointing at the next page
    pub fn next_link(&self, target: &str) -> String {
        format!("<{}{}>; rel=\"next\"", self.base, target)
    }

    /// Authenticated user endpoint answering with `login`
    pub fn with_user(&self, login: &str) {
        self.route(
            "/api/v3/user",
            vec![Canned::json(format!(r#"{{"login":"{}"}}"#, login))],
        );
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let text = String::from_utf8_lossy(&buf);
    let mut lines = text.lines();
    let target = lines.next()?.split_whitespace().nth(1)?.to_string();
    let authorization = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim().to_string());
    Some(Recorded {
        target,
        authorization,
    })
}

fn next_response(routes: &Routes, target: &str) -> Canned {
    let mut routes = routes.lock().unwrap();
    match routes.get_mut(target) {
        Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
        Some(queue) if !queue.is_empty() => queue[0].clone(),
        _ => Canned::status(404, r#"{"message":"Not Found"}"#),
    }
}

fn render(response: &Canned) -> String {
    let mut out = format!("HTTP/1.1 {} Canned\r\n", response.status);
    for (name, value) in &response.headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    ));
    out
}

/// JSON listing entry for one repository
pub fn repo_json(org: &str, name: &str, size: u64) -> String {
    format!(
        r#"{{"full_name":"{org}/{name}","clone_url":"https://ghe.example/{org}/{name}","size":{size},"archived":false,"disabled":false,"fork":false,"is_template":false}}"#
    )
}

/// Write an executable `/bin/sh` script standing in for the scanner
#[cfg(unix)]
pub fn fake_scanner(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Scanner body that reports MFA and BranchProtection for its last argument
pub const REPORTING_SCANNER: &str = r#"for last; do :; done
printf '[{"AffectedResource":"%s","Score":0,"Resources":[{"Rows":[{"Control":"MFA"},{"Control":"BranchProtection"}]}]}]' "$last""#;
