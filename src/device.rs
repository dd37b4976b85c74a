use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::colors::{self, Color};
use crate::error::{LightError, Result};
use crate::latency::LatencyTracker;

pub const FLASH_EFFECT: &str = "white_strobe_flash";

pub const BUILTIN_EFFECTS: [&str; 20] = [
    "seven_color_cross_fade",
    "red_gradual_change",
    "green_gradual_change",
    "blue_gradual_change",
    "yellow_gradual_change",
    "cyan_gradual_change",
    "purple_gradual_change",
    "white_gradual_change",
    "red_green_cross_fade",
    "red_blue_cross_fade",
    "green_blue_cross_fade",
    "seven_color_strobe_flash",
    "red_strobe_flash",
    "green_strobe_flash",
    "blue_stobe_flash",
    "yellow_strobe_flash",
    "cyan_strobe_flash",
    "purple_strobe_flash",
    "white_strobe_flash",
    "seven_color_jumping",
];

/// Picks the device's strobe effect closest to a color name.
pub fn strobe_effect_for(color_name: Option<&str>) -> &'static str {
    let name = match color_name {
        Some(name) => name.to_lowercase(),
        None => return FLASH_EFFECT,
    };

    match name.as_str() {
        "red" | "pink" | "orange" => "red_strobe_flash",
        "green" | "ferngreen" | "seagreen" => "green_strobe_flash",
        // the device firmware really spells it this way
        "blue" | "lavender" => "blue_stobe_flash",
        "yellow" => "yellow_strobe_flash",
        "cyan" => "cyan_strobe_flash",
        "purple" | "violet" | "magenta" => "purple_strobe_flash",
        "white" => FLASH_EFFECT,
        other => {
            log::warn!("No strobe effect for {other:?}, using white");
            FLASH_EFFECT
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCommand {
    SetColor { color: Color, brightness: u8 },
    SetPower(bool),
    SetEffect { effect: &'static str, speed: u8 },
    /// Short white flash followed by power off.
    Flash,
}

/// Non-blocking handle for queueing device commands. Sending never waits for
/// the device, so loop timing is independent of network round trips.
#[derive(Clone)]
pub struct DeviceDispatcher {
    sender: mpsc::UnboundedSender<DeviceCommand>,
}

impl DeviceDispatcher {
    pub fn channel() -> (DeviceDispatcher, mpsc::UnboundedReceiver<DeviceCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (DeviceDispatcher { sender }, receiver)
    }

    pub fn send(&self, command: DeviceCommand) {
        log::debug!("Dispatching {command:?}");
        if self.sender.send(command).is_err() {
            log::debug!("Device worker is gone, dropping command");
        }
    }

    pub fn set_color(&self, color: Color, brightness: u8) {
        self.send(DeviceCommand::SetColor { color, brightness });
    }

    pub fn set_power(&self, on: bool) {
        self.send(DeviceCommand::SetPower(on));
    }

    pub fn set_effect(&self, effect: &'static str, speed: u8) {
        self.send(DeviceCommand::SetEffect { effect, speed });
    }

    pub fn flash(&self) {
        self.send(DeviceCommand::Flash);
    }
}

/// Drains the command queue, running each call as its own detached task.
/// Completions may land out of order.
pub async fn run_device_worker(
    client: Arc<DeviceClient>,
    mut receiver: mpsc::UnboundedReceiver<DeviceCommand>,
) {
    while let Some(command) = receiver.recv().await {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client.execute(command).await;
        });
    }
}

pub struct DeviceClient {
    http: reqwest::Client,
    base_url: String,
    device_id: String,
    latency: LatencyTracker,
}

impl DeviceClient {
    pub fn new(
        base_url: &str,
        device_id: &str,
        timeout: Duration,
        latency: LatencyTracker,
    ) -> Result<DeviceClient> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| LightError::from_transport(base_url, err))?;

        Ok(DeviceClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            device_id: device_id.to_string(),
            latency,
        })
    }

    pub async fn execute(&self, command: DeviceCommand) {
        match command {
            DeviceCommand::SetColor { color, brightness } => {
                self.set_color(color, brightness).await;
            }
            DeviceCommand::SetPower(on) => {
                self.set_power(on).await;
            }
            DeviceCommand::SetEffect { effect, speed } => {
                self.set_effect(effect, speed).await;
            }
            DeviceCommand::Flash => {
                // power off is timed from dispatch, not from the effect reply
                let power_off = async {
                    time::sleep(Duration::from_millis(50)).await;
                    self.set_power(false).await
                };
                tokio::join!(self.set_effect(FLASH_EFFECT, 1), power_off);
            }
        }
    }

    pub async fn set_color(&self, color: Color, brightness: u8) -> bool {
        let body = json::object! {
            id: self.device_id.as_str(),
            color: colors::to_hex(color),
            brightness: brightness,
        };
        self.post_command("/api/color", body).await
    }

    pub async fn set_power(&self, on: bool) -> bool {
        let body = json::object! {
            id: self.device_id.as_str(),
            power: on,
        };
        self.post_command("/api/power", body).await
    }

    pub async fn set_effect(&self, effect: &str, speed: u8) -> bool {
        let body = json::object! {
            id: self.device_id.as_str(),
            effect: effect,
            speed: speed,
        };
        self.post_command("/api/effect", body).await
    }

    pub async fn devices(&self) -> Result<String> {
        self.call(self.http.get(self.url("/api/devices")), "/api/devices")
            .await
    }

    pub async fn device_state(&self) -> Result<String> {
        let endpoint = format!("/api/device/{}", self.device_id);
        self.call(self.http.get(self.url(&endpoint)), &endpoint).await
    }

    async fn post_command(&self, endpoint: &str, body: json::JsonValue) -> bool {
        let request = self
            .http
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json")
            .body(json::stringify(body));

        let result = self.call(request, endpoint).await.and_then(|reply| {
            if reply == "OK" {
                Ok(())
            } else {
                Err(LightError::Rejected {
                    endpoint: endpoint.to_string(),
                    reply,
                })
            }
        });

        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    async fn call(&self, request: reqwest::RequestBuilder, endpoint: &str) -> Result<String> {
        let start = Instant::now();
        let reply = match request.send().await {
            Ok(response) => response.text().await,
            Err(err) => Err(err),
        };

        match reply {
            Ok(text) => {
                self.latency.record_latency(start.elapsed());
                Ok(text)
            }
            Err(err) => {
                self.latency.record_failure();
                Err(LightError::from_transport(endpoint, err))
            }
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Srgb;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned reply per connection and hands back the raw requests.
    async fn fake_device(
        reply_body: &'static str,
        delay: Duration,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let sender = sender.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut request = String::new();
                    loop {
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        request.push_str(&String::from_utf8_lossy(&buf[..n]));
                        if request_complete(&request) {
                            break;
                        }
                    }
                    let _ = sender.send(request);
                    tokio::time::sleep(delay).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        reply_body.len(),
                        reply_body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        (format!("http://{addr}"), receiver)
    }

    fn request_complete(request: &str) -> bool {
        let Some((head, body)) = request.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[test]
    fn strobe_effect_lookup() {
        assert_eq!(strobe_effect_for(None), "white_strobe_flash");
        assert_eq!(strobe_effect_for(Some("Red")), "red_strobe_flash");
        assert_eq!(strobe_effect_for(Some("blue")), "blue_stobe_flash");
        assert_eq!(strobe_effect_for(Some("magenta")), "purple_strobe_flash");
        assert_eq!(strobe_effect_for(Some("#123456")), "white_strobe_flash");
        assert!(BUILTIN_EFFECTS.contains(&strobe_effect_for(Some("cyan"))));
    }

    #[tokio::test]
    async fn dispatcher_queues_without_waiting() {
        let (dispatcher, mut receiver) = DeviceDispatcher::channel();
        dispatcher.set_power(true);
        dispatcher.set_effect(FLASH_EFFECT, 100);
        dispatcher.flash();

        assert_eq!(receiver.recv().await, Some(DeviceCommand::SetPower(true)));
        assert_eq!(
            receiver.recv().await,
            Some(DeviceCommand::SetEffect {
                effect: FLASH_EFFECT,
                speed: 100
            })
        );
        assert_eq!(receiver.recv().await, Some(DeviceCommand::Flash));
    }

    #[tokio::test]
    async fn ok_reply_counts_as_success() {
        let (url, mut requests) = fake_device("OK", Duration::ZERO).await;
        let latency = LatencyTracker::new();
        let client =
            DeviceClient::new(&url, "C82E4761852A", Duration::from_secs(1), latency.clone())
                .unwrap();

        assert!(client.set_color(Srgb::new(0xFE, 0x00, 0xAE), 100).await);

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /api/color "));
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        let body = json::parse(body).unwrap();
        assert_eq!(body["id"], "C82E4761852A");
        assert_eq!(body["color"], "#FE00AE");
        assert_eq!(body["brightness"], 100);

        let stats = latency.stats().unwrap();
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn other_replies_count_as_failure() {
        let (url, _requests) = fake_device("ERR", Duration::ZERO).await;
        let client =
            DeviceClient::new(&url, "dev", Duration::from_secs(1), LatencyTracker::new()).unwrap();

        assert!(!client.set_power(true).await);
    }

    #[tokio::test]
    async fn timeout_is_recorded_and_not_fatal() {
        let (url, _requests) = fake_device("OK", Duration::from_millis(500)).await;
        let latency = LatencyTracker::new();
        let client =
            DeviceClient::new(&url, "dev", Duration::from_millis(50), latency.clone()).unwrap();

        assert!(!client.set_effect(FLASH_EFFECT, 50).await);
        assert!(latency.stats().is_none());
        assert_eq!(latency.failures(), 1);

        match client.devices().await {
            Err(LightError::Timeout { endpoint }) => assert_eq!(endpoint, "/api/devices"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn flash_powers_off_without_waiting_for_the_effect_reply() {
        let (url, mut requests) = fake_device("OK", Duration::from_millis(300)).await;
        let client =
            DeviceClient::new(&url, "dev", Duration::from_secs(1), LatencyTracker::new()).unwrap();

        let start = Instant::now();
        let flash = tokio::spawn(async move { client.execute(DeviceCommand::Flash).await });

        let effect = requests.recv().await.unwrap();
        let power = requests.recv().await.unwrap();
        let gap = start.elapsed();

        assert!(effect.starts_with("POST /api/effect "));
        assert!(power.starts_with("POST /api/power "));
        assert!(gap < Duration::from_millis(250), "power off sent after {gap:?}");
        let (_, body) = power.split_once("\r\n\r\n").unwrap();
        assert_eq!(json::parse(body).unwrap()["power"], false);

        flash.await.unwrap();
    }

    #[tokio::test]
    async fn worker_does_not_wait_for_slow_calls() {
        let (url, mut requests) = fake_device("OK", Duration::from_millis(300)).await;
        let latency = LatencyTracker::new();
        let client =
            DeviceClient::new(&url, "dev", Duration::from_secs(1), latency.clone()).unwrap();
        let (dispatcher, commands) = DeviceDispatcher::channel();
        tokio::spawn(run_device_worker(Arc::new(client), commands));

        let start = Instant::now();
        dispatcher.set_color(Srgb::new(0xFF, 0x00, 0x00), 100);
        dispatcher.flash();

        let mut paths = Vec::new();
        for _ in 0..3 {
            let request = requests.recv().await.unwrap();
            paths.push(request.split_whitespace().nth(1).unwrap().to_string());
        }

        // all three calls are in flight before the device answers any of them
        assert!(start.elapsed() < Duration::from_millis(250));
        assert!(latency.stats().is_none());
        paths.sort();
        assert_eq!(paths, vec!["/api/color", "/api/effect", "/api/power"]);
    }

    #[tokio::test]
    async fn queries_return_raw_text() {
        let (url, mut requests) = fake_device("[{\"id\":\"dev\"}]", Duration::ZERO).await;
        let client =
            DeviceClient::new(&url, "dev", Duration::from_secs(1), LatencyTracker::new()).unwrap();

        assert_eq!(client.device_state().await.unwrap(), "[{\"id\":\"dev\"}]");
        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("GET /api/device/dev "));
    }
}
