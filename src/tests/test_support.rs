use std::sync::{Arc, Mutex};

use jiff::{SignedDuration, Timestamp};
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::{Registry, fmt, layer::SubscriberExt};
use wiremock::Request;

use crate::Config;

pub fn base_config(server_uri: &str) -> Config {
    Config::from_values(server_uri, None, None, Some(1))
}

/// JSON body the credential endpoints answer with.
pub fn credential_body(token: &str, ttl_secs: i64) -> serde_json::Value {
    let now = Timestamp::now();
    serde_json::json!({
        "access_token": token,
        "issued_at": now.to_string(),
        "expires_at": (now + SignedDuration::from_secs(ttl_secs)).to_string(),
    })
}

/// True when the request carries the session cookie a refresh hands out.
pub fn has_fresh_session(req: &Request) -> bool {
    req.headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|cookies| cookies.contains("session=fresh"))
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}

pub fn drain_logs(lines: Arc<Mutex<Vec<String>>>) -> Vec<String> {
    Arc::try_unwrap(lines).unwrap().into_inner().unwrap()
}
