use crate::config::Config;
use crate::core::console::{ConsoleCommand, HELP};
use crate::core::wiring::{self, Wired};
use crate::routing::Dispatcher;
use crate::sync::{
    ListenerOutcome, MemoryStateStore, ServiceCall, ServiceRegistry, StateStore, StateUpdate,
    SyncEngine, REMOTE_ENTITY_SERVICE,
};
use crate::telemetry::{self, LogHandle};
use crate::transport::MqttTransport;
use anyhow::{anyhow, Result};
use rumqttc::{ConnectReturnCode, ConnectionError, Event, EventLoop, Incoming};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep, Duration};

/// One host: MQTT event loop, dispatcher, sync engine and local console,
/// all driven from a single task.
pub struct Runtime {
    config: Config,
    engine: Arc<SyncEngine>,
    dispatcher: Dispatcher<ListenerOutcome>,
    services: ServiceRegistry,
    store: MemoryStateStore,
    transport: MqttTransport,
    eventloop: Option<EventLoop>,
    log_handle: Option<LogHandle>,
}

impl Runtime {
    pub fn new(config: Config, log_handle: Option<LogHandle>) -> Result<Self> {
        config.validate()?;
        let (transport, eventloop) =
            MqttTransport::connect(&config.broker, &format!("statesync-{}", config.host.name));
        let store = MemoryStateStore::new();
        let engine = Arc::new(SyncEngine::new(
            config.sync_options(),
            config.name_codec(),
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
        ));
        let Wired {
            engine,
            dispatcher,
            services,
        } = wiring::wire(engine, config.sync.log_all_messages);
        tracing::info!(
            "host {} ready: {} listener(s), {} shared entit(ies), base topic {}",
            config.host.name,
            dispatcher.len(),
            config.sync.shared_entities.len(),
            config.sync.base_topic
        );
        Ok(Self {
            config,
            engine,
            dispatcher,
            services,
            store,
            transport,
            eventloop: Some(eventloop),
            log_handle,
        })
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn store(&self) -> &MemoryStateStore {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher<ListenerOutcome> {
        &self.dispatcher
    }

    /// Poll the broker connection and the console until ctrl-c.
    pub async fn run(&mut self) -> Result<()> {
        let mut eventloop = self
            .eventloop
            .take()
            .ok_or_else(|| anyhow!("runtime event loop already consumed"))?;
        let mut console = BufReader::new(tokio::io::stdin()).lines();
        let mut console_open = true;
        let mut backoff = Backoff::new();
        let mut connected = false;

        loop {
            tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("shutdown signal received");
                    break;
                }
                line = console.next_line(), if console_open => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&line),
                        Ok(None) => {
                            tracing::debug!("console closed");
                            console_open = false;
                        }
                        Err(err) => {
                            tracing::warn!("console read failed: {err}");
                            console_open = false;
                        }
                    }
                }
                res = eventloop.poll() => {
                    match res {
                        Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                            if ack.code != ConnectReturnCode::Success {
                                return Err(anyhow!("connection rejected: {:?}", ack.code));
                            }
                            tracing::info!(
                                "{} to {}:{}",
                                if connected { "reconnected" } else { "connected" },
                                self.config.broker.host,
                                self.config.broker.port
                            );
                            connected = true;
                            backoff.reset();
                            self.on_connected();
                        }
                        Ok(Event::Incoming(Incoming::Publish(publish))) => {
                            let payload = String::from_utf8_lossy(&publish.payload);
                            self.dispatcher.dispatch(&publish.topic, &payload);
                        }
                        Ok(_) => {}
                        Err(ConnectionError::ConnectionRefused(code)) => {
                            return Err(anyhow!("connection refused: {code:?}"));
                        }
                        Err(err) => {
                            connected = false;
                            let delay = backoff.next_delay();
                            tracing::warn!(
                                "connection error: {err}; reconnecting in {}ms",
                                delay.as_millis()
                            );
                            sleep(delay).await;
                        }
                    }
                }
            }
        }

        self.transport.disconnect().await;
        Ok(())
    }

    /// Subscriptions do not survive a clean session, so every (re)connect
    /// subscribes again and re-announces the shared entities.
    fn on_connected(&self) {
        if let Err(err) = wiring::subscribe(&self.transport, self.engine.base_topic()) {
            tracing::error!("subscribe failed: {err}");
        }
        let sent = self.engine.publish_current_states();
        tracing::debug!("announced {sent} shared entit(ies)");
    }

    /// Parse and apply one console line; problems are logged, never fatal.
    pub fn handle_line(&self, line: &str) {
        match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                if let Err(err) = self.apply(command) {
                    tracing::warn!("console: {err:#}");
                }
            }
            Err(err) => tracing::warn!("console: {err}"),
        }
    }

    pub fn apply(&self, command: ConsoleCommand) -> Result<()> {
        match command {
            ConsoleCommand::Set { entity_id, value } => {
                self.store.set(&entity_id, StateUpdate::new(value));
            }
            ConsoleCommand::Call {
                action,
                entity_id,
                value,
            } => {
                let mut call =
                    ServiceCall::new(&self.engine.options().service_namespace, &action)
                        .entity(&entity_id);
                if let Some(value) = value {
                    call = call.value(&value);
                }
                self.services.call(REMOTE_ENTITY_SERVICE, &call)?;
            }
            ConsoleCommand::Ping { nonce } => {
                let nonce = nonce.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
                self.engine.send_ping(&nonce)?;
            }
            ConsoleCommand::Dump => {
                for (entity_id, state) in self.store.snapshot() {
                    tracing::info!(
                        "{entity_id} = {} {}",
                        state.state,
                        serde_json::to_string(&state.attributes).unwrap_or_default()
                    );
                }
            }
            ConsoleCommand::LogLevel(filter) => {
                let handle = self
                    .log_handle
                    .as_ref()
                    .ok_or_else(|| anyhow!("logging is not reloadable in this process"))?;
                telemetry::set_log_level(handle, &filter)?;
            }
            ConsoleCommand::Help => tracing::info!("{HELP}"),
        }
        Ok(())
    }
}

/// Reconnect delay: exponential from 100ms, capped at 30s, plus jitter.
struct Backoff {
    current_ms: u64,
    max_ms: u64,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current_ms: 100,
            max_ms: 30_000,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms;
        self.current_ms = (self.current_ms * 2).min(self.max_ms);
        // up to 25% extra
        let jitter = delay / 4;
        let actual = delay + (rand_u64() % (jitter * 2).max(1)).saturating_sub(jitter);
        Duration::from_millis(actual)
    }

    fn reset(&mut self) {
        self.current_ms = 100;
    }
}

fn rand_u64() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        toml::from_str(
            r#"
[host]
name = "haven"

[sync]
shared_entities = ["light.porch"]
peers = ["seattle"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn backoff_grows_and_caps() {
        let mut backoff = Backoff::new();
        let first = backoff.next_delay().as_millis();
        assert!((100..125).contains(&first), "{first}");
        for _ in 0..20 {
            backoff.next_delay();
        }
        let capped = backoff.next_delay().as_millis();
        assert!((30_000..37_500).contains(&capped), "{capped}");
        backoff.reset();
        assert!(backoff.next_delay().as_millis() <= 125);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = config();
        cfg.host.name = "pi-haven".into();
        assert!(Runtime::new(cfg, None).is_err());
    }

    #[tokio::test]
    async fn inbound_dispatch_and_console_commands() {
        let runtime = Runtime::new(config(), None).unwrap();
        assert_eq!(runtime.dispatcher().len(), 3);

        let out = runtime
            .dispatcher()
            .dispatch("mqtt_shared/seattle/state/light.office", "on");
        assert_eq!(
            out,
            vec![ListenerOutcome::Mirrored {
                entity_id: "light.office_seattle".into()
            }]
        );

        runtime.handle_line("set light.porch on");
        assert_eq!(runtime.store().get("light.porch").unwrap().state, "on");

        runtime
            .apply(ConsoleCommand::Call {
                action: "toggle_state".into(),
                entity_id: "light.office_seattle".into(),
                value: None,
            })
            .unwrap();

        let err = runtime
            .apply(ConsoleCommand::Call {
                action: "toggle_state".into(),
                entity_id: "light.porch".into(),
                value: None,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "entity light.porch is not a mirrored entity");

        assert!(runtime
            .apply(ConsoleCommand::LogLevel("debug".into()))
            .is_err());
    }
}
