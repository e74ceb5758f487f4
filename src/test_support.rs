//! One-shot HTTP server used by unit tests to stand in for the chat endpoint.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;
use std::thread::JoinHandle;
use serde_json::json;

/// Request as seen by the test server
pub struct RecordedRequest {
    pub head: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Returns the value of the named header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Starts a server that answers exactly one request and then exits.
/// Returns a base url ending in `/v1/llm` and a handle yielding the recorded request.
///
/// # Arguments
///
/// * 'status' - status line remainder, e.g. "200 OK"
/// * 'body' - response body
pub fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);

        let mut head = String::new();
        reader.read_line(&mut head).unwrap();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((k, v)) = line.split_once(':') {
                headers.push((k.trim().to_string(), v.trim().to_string()));
            }
        }

        let length = headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        let mut buf = vec![0u8; length];
        reader.read_exact(&mut buf).unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status, body.len(), body);
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        RecordedRequest {
            head: head.trim_end().to_string(),
            headers,
            body: String::from_utf8(buf).unwrap(),
        }
    });

    (format!("http://{}/v1/llm", addr), handle)
}

/// Returns a base url on a port nothing listens on
pub fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{}/v1/llm", addr)
}

/// Returns a base url on a listener that accepts connections but never answers.
/// The listener must be kept alive for as long as the url is used.
pub fn silent_base_url() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    (format!("http://{}/v1/llm", addr), listener)
}

/// Builds a chat completion body with a single choice carrying the given content
pub fn completion_body(content: Option<&str>) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1760000000,
        "model": "Qwen/Qwen2.5-7B-Instruct",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52 }
    }).to_string()
}

/// Builds a chat completion body whose single choice is a call to the named function
pub fn tool_call_body(name: &str, arguments: &str) -> String {
    json!({
        "id": "chatcmpl-2",
        "created": 1760000000,
        "model": "Qwen/Qwen2.5-7B-Instruct",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call-1",
                    "type": "function",
                    "function": { "name": name, "arguments": arguments }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    }).to_string()
}
