#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;

use post_summarizer::config::Config;
use serde_json::json;

pub const PAGE_HOST: &str = "social.example";
pub const PAGE_URL: &str = "http://social.example/post/1";
pub const VIDEO_HOST: &str = "cdn.example";
pub const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

/// Environment pointing the proxy and the model API at local mock servers.
pub fn env_for(proxy: SocketAddr, model_base: &str) -> HashMap<String, String> {
    HashMap::from([
        ("BRIGHT_PROXY_HOST".to_string(), proxy.ip().to_string()),
        ("BRIGHT_PROXY_PORT".to_string(), proxy.port().to_string()),
        ("BRIGHT_PROXY_USER".to_string(), "user".to_string()),
        ("BRIGHT_PROXY_PASS".to_string(), "pass".to_string()),
        ("GEMINI_API_KEY".to_string(), "test-key".to_string()),
        ("GEMINI_MODEL".to_string(), "gemini-test".to_string()),
        ("GEMINI_API_BASE".to_string(), model_base.to_string()),
    ])
}

pub fn config_from(vars: &HashMap<String, String>) -> Config {
    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config should load")
}

pub fn page_without_video() -> &'static str {
    r#"<html><head><title>Post</title><meta property="og:title" content="Launch day"></head>
       <body><p>The rocket lifted off at dawn.</p></body></html>"#
}

pub fn page_with_video() -> &'static str {
    r#"<html><head><title>Post</title><meta property="og:video" content="http://cdn.example/v.mp4"></head>
       <body><p>Watch the launch.</p></body></html>"#
}

pub fn model_answer(text: &str) -> String {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}
