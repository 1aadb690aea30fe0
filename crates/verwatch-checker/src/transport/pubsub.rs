/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! MQTT adapter: subscribe, wait for one publish, disconnect.

use crate::error::TransportError;
use crate::transport::PubSub;
use async_trait::async_trait;
use log::debug;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use verwatch_utils::config::Mqtt;

pub struct MqttPubSub {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    wait: Duration,
}

impl MqttPubSub {
    pub fn new(mqtt: &Mqtt, wait: Duration) -> Self {
        let credentials = match (&mqtt.username, &mqtt.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            (Some(user), None) => Some((user.clone(), String::new())),
            _ => None,
        };
        MqttPubSub {
            host: mqtt.host.clone(),
            port: mqtt.port,
            credentials,
            wait,
        }
    }

    fn options(&self) -> MqttOptions {
        let client_id = format!(
            "verwatch-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_subsec_nanos()
        );
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(5));
        if let Some((user, password)) = &self.credentials {
            options.set_credentials(user.clone(), password.clone());
        }
        options
    }
}

#[async_trait]
impl PubSub for MqttPubSub {
    async fn capture_one(&self, topic: &str) -> Result<Option<String>, TransportError> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| TransportError::Unavailable(format!("MQTT subscribe failed: {}", e)))?;

        let broker = format!("{}:{}", self.host, self.port);
        let captured = tokio::time::timeout(self.wait, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        return Ok(String::from_utf8_lossy(&publish.payload).to_string());
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        return Err(TransportError::Network {
                            url: broker.clone(),
                            message: e.to_string(),
                        })
                    }
                }
            }
        })
        .await;

        let _ = client.try_disconnect();

        match captured {
            Ok(Ok(payload)) => Ok(Some(payload)),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!("No message on {} within {:?}", topic, self.wait);
                Ok(None)
            }
        }
    }
}
