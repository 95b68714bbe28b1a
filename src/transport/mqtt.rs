use super::{Transport, TransportError};
use crate::config::BrokerConfig;
use rumqttc::{AsyncClient, ClientError, EventLoop, MqttOptions, QoS};
use std::time::Duration;

/// `rumqttc`-backed transport. Requests are queued with `try_*` so callers
/// on the dispatch path never wait on the network; the paired [`EventLoop`]
/// is polled by the runtime.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    qos: QoS,
}

impl MqttTransport {
    pub fn connect(cfg: &BrokerConfig, default_client_id: &str) -> (Self, EventLoop) {
        let client_id = cfg
            .client_id
            .clone()
            .unwrap_or_else(|| generated_client_id(default_client_id));
        let mut options = MqttOptions::new(client_id, &cfg.host, cfg.port);
        options.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
        options.set_clean_session(true);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            options.set_credentials(user.clone(), pass.clone());
        }
        let (client, eventloop) = AsyncClient::new(options, cfg.channel_capacity);
        (
            Self {
                client,
                qos: QoS::AtLeastOnce,
            },
            eventloop,
        )
    }

    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    pub async fn disconnect(&self) {
        if let Err(err) = self.client.disconnect().await {
            tracing::debug!("mqtt disconnect: {err}");
        }
    }
}

impl Transport for MqttTransport {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.client
            .try_publish(topic, self.qos, false, payload.as_bytes().to_vec())
            .map_err(map_client_error)
    }

    fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.client
            .try_subscribe(filter, self.qos)
            .map_err(map_client_error)
    }
}

fn map_client_error(err: ClientError) -> TransportError {
    match err {
        ClientError::Request(_) | ClientError::TryRequest(_) => TransportError::Unavailable,
    }
}

fn generated_client_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_short() {
        let id = generated_client_id("statesync-haven");
        assert!(id.starts_with("statesync-haven-"));
        assert_eq!(id.len(), "statesync-haven-".len() + 8);
        assert_ne!(id, generated_client_id("statesync-haven"));
    }

    #[test]
    fn dropped_event_loop_reports_unavailable() {
        let (transport, eventloop) =
            MqttTransport::connect(&BrokerConfig::default(), "statesync-haven");
        drop(eventloop);
        assert!(matches!(
            transport.publish("mqtt_shared/haven/state/light.porch", "on"),
            Err(TransportError::Unavailable)
        ));
        assert!(matches!(
            transport.subscribe("mqtt_shared/#"),
            Err(TransportError::Unavailable)
        ));
    }
}
