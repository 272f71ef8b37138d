//! In-memory scripted Pixelblaze for integration tests
#![allow(dead_code)]

use blazebridge_control::{ClientConfig, Connection, Pixelblaze, RequestClient};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{duplex, DuplexStream};
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// The device end of the socket
pub type Device = WebSocketStream<DuplexStream>;

pub async fn connected() -> (Connection<DuplexStream>, Device) {
    let (client_io, device_io) = duplex(64 * 1024);
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    let device = WebSocketStream::from_raw_socket(device_io, Role::Server, None).await;
    (Connection::new(client, ClientConfig::default()), device)
}

pub async fn request_client() -> (RequestClient<DuplexStream>, Device) {
    let (connection, device) = connected().await;
    (RequestClient::new(connection), device)
}

pub async fn pixelblaze() -> (Pixelblaze<DuplexStream>, Device) {
    let (connection, device) = connected().await;
    (Pixelblaze::from_connection(connection), device)
}

pub fn text(json: &str) -> Message {
    Message::Text(json.to_string())
}

pub fn binary(type_code: u8, flags: u8, payload: &[u8]) -> Message {
    let mut data = vec![type_code, flags];
    data.extend_from_slice(payload);
    Message::Binary(data)
}

/// Preview frame, the device's periodic binary telemetry
pub fn preview() -> Message {
    binary(0x05, 0x04, &[0x10, 0x20, 0x30])
}

/// Wait for the next command sent by the client
pub async fn next_command(device: &mut Device) -> Value {
    loop {
        match device.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("client went away: {:?}", other),
        }
    }
}

pub async fn send_all(device: &mut Device, messages: Vec<Message>) {
    for message in messages {
        device.send(message).await.unwrap();
    }
}

/// Answer one `listPrograms` command with the given fragments
pub async fn serve_catalog(device: &mut Device, fragments: Vec<Message>) {
    let command = next_command(device).await;
    assert_eq!(command, serde_json::json!({ "listPrograms": true }));
    send_all(device, fragments).await;
}
