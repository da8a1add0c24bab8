use crate::prelude::*;
use crate::coordinator::FrameStats;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Publish, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

const PUBLISH_ATTEMPTS: u32 = 3;

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    /// Message for one reading; `topic` is relative to the namespace.
    pub fn for_reading(reading: &Reading, retain: bool) -> Result<Message> {
        Ok(Message {
            topic: reading.topic.clone(),
            retain,
            payload: reading.to_payload()?,
        })
    }
} // }}}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Message(Message),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

// ReadingPublisher {{{
/// `ReadingSink` that queues readings for the MQTT sender task.
#[derive(Clone, Debug)]
pub struct ReadingPublisher {
    sender: Sender,
    retain: bool,
}

impl ReadingPublisher {
    pub fn new(sender: Sender, retain: bool) -> Self {
        Self { sender, retain }
    }
}

impl ReadingSink for ReadingPublisher {
    fn publish(&self, reading: &Reading) -> Result<()> {
        let message = Message::for_reading(reading, self.retain)?;
        if self.sender.send(ChannelData::Message(message)).is_err() {
            bail!("send(to_mqtt) failed - channel closed?");
        }
        Ok(())
    }
} // }}}

#[derive(Clone)]
pub struct Mqtt {
    config: ConfigWrapper,
    shutdown: Arc<AtomicBool>,
    // signalled on every ConnAck
    connected: Arc<Notify>,
    channels: Channels,
    shared_stats: Arc<Mutex<FrameStats>>,
}

impl Mqtt {
    pub fn new(config: ConfigWrapper, channels: Channels, shared_stats: Arc<Mutex<FrameStats>>) -> Self {
        Self {
            config,
            channels,
            shutdown: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(Notify::new()),
            shared_stats,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let c = self.config.mqtt();

        if !c.enabled() {
            info!("mqtt disabled, skipping");
            return Ok(());
        }

        let mut options = MqttOptions::new(c.client_id(), c.host(), c.port());

        let will = LastWill {
            topic: self.availability_topic(),
            message: bytes::Bytes::from("offline"),
            qos: QoS::AtLeastOnce,
            retain: true,
        };
        options.set_last_will(will);

        options.set_keep_alive(c.keepalive());
        options.set_clean_session(false);
        if let (Some(u), Some(p)) = (c.username(), c.password()) {
            options.set_credentials(u, p);
        }

        info!("initializing mqtt at {}:{}", c.host(), c.port());

        let (client, eventloop) = AsyncClient::new(options, 10);

        futures::try_join!(
            self.setup(client.clone()),
            self.receiver(eventloop),
            self.sender(client)
        )?;

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping MQTT client...");
        self.shutdown.store(true, Ordering::SeqCst);
        self.connected.notify_one();
        let _ = self.channels.to_mqtt.send(ChannelData::Shutdown);
        Ok(())
    }

    // runs once per broker session; the broker may have lost our
    // subscription and retained configs, and the will may have fired
    async fn setup(&self, client: AsyncClient) -> Result<()> {
        loop {
            self.connected.notified().await;
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            if let Err(e) = self.announce(&client).await {
                warn!("mqtt session setup failed: {}", e);
            }
        }

        info!("MQTT setup loop exiting");
        Ok(())
    }

    async fn announce(&self, client: &AsyncClient) -> Result<()> {
        let c = self.config.mqtt();

        client.subscribe(c.input_topic(), c.qos()).await?;
        info!("subscribed to {}", c.input_topic());

        let messages = self.connect_messages()?;
        for msg in messages.iter() {
            client
                .publish(&msg.topic, QoS::AtLeastOnce, msg.retain, msg.payload.as_bytes())
                .await?;
        }
        if self.config.homeassistant_enabled() {
            info!("published {} Home Assistant discovery configs", messages.len() - 1);
        }

        Ok(())
    }

    /// Messages published after each ConnAck, with absolute topics:
    /// availability first, then discovery configs when enabled.
    pub fn connect_messages(&self) -> Result<Vec<Message>> {
        let mut messages = vec![Message {
            topic: self.availability_topic(),
            retain: true,
            payload: "online".to_string(),
        }];

        if self.config.homeassistant_enabled() {
            messages.extend(home_assistant::Config::new(&self.config).all()?);
        }

        Ok(messages)
    }

    // mqtt -> coordinator
    async fn receiver(&self, mut eventloop: EventLoop) -> Result<()> {
        let reconnect_delay = self.config.mqtt().reconnect_delay();

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("MQTT receiver shutting down");
                break;
            }

            if let Ok(event) =
                tokio::time::timeout(std::time::Duration::from_secs(1), eventloop.poll()).await
            {
                match event {
                    Ok(event) => self.handle_event(event),
                    Err(e) => {
                        if !self.shutdown.load(Ordering::SeqCst) {
                            error!("{}", e);
                            info!("reconnecting in {}s", reconnect_delay.as_secs());
                            tokio::time::sleep(reconnect_delay).await;
                        }
                    }
                }
            }
        }

        info!("MQTT receiver loop exiting");
        Ok(())
    }

    fn handle_event(&self, event: Event) {
        match event {
            Event::Incoming(Incoming::Publish(publish)) => self.handle_message(publish),
            Event::Incoming(Incoming::ConnAck(_)) => {
                info!("connected to mqtt broker");
                self.connected.notify_one();
            }
            _ => {} // keepalives etc
        }
    }

    fn handle_message(&self, publish: Publish) {
        let payload = match String::from_utf8(publish.payload.to_vec()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("ignoring non-UTF-8 payload on {}: {}", publish.topic, e);
                return;
            }
        };

        let message = Message {
            topic: publish.topic,
            retain: publish.retain,
            payload,
        };
        debug!("RX: {:?}", message);
        if self
            .channels
            .from_mqtt
            .send(ChannelData::Message(message))
            .is_err()
            && !self.shutdown.load(Ordering::SeqCst)
        {
            warn!("send(from_mqtt) failed - coordinator not listening?");
        }
    }

    // coordinator -> mqtt
    async fn sender(&self, client: AsyncClient) -> Result<()> {
        use ChannelData::*;

        let c = self.config.mqtt();
        let mut receiver = self.channels.to_mqtt.subscribe();

        loop {
            let data = match receiver.recv().await {
                Ok(data) => data,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("MQTT sender lagged, {} messages dropped", n);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            match data {
                Shutdown => {
                    info!("MQTT sender received shutdown signal");
                    let _ = client
                        .publish(self.availability_topic(), QoS::AtLeastOnce, true, "offline")
                        .await;
                    let _ = client.disconnect().await;
                    break;
                }
                Message(message) => {
                    let topic = format!("{}/{}", c.namespace(), message.topic);
                    debug!("publishing: {} = {}", topic, message.payload);
                    let payload = message.payload.as_bytes().to_vec();
                    let mut attempt = 1;
                    loop {
                        match client.publish(&topic, c.qos(), message.retain, payload.as_slice()).await {
                            Ok(_) => {
                                if let Ok(mut stats) = self.shared_stats.lock() {
                                    stats.mqtt_messages_sent += 1;
                                }
                                break;
                            }
                            Err(err) => {
                                if let Ok(mut stats) = self.shared_stats.lock() {
                                    stats.mqtt_errors += 1;
                                }
                                if attempt >= PUBLISH_ATTEMPTS {
                                    error!("MQTT publish to {} failed: {:?} - giving up", topic, err);
                                    break;
                                }
                                error!(
                                    "MQTT publish failed: {:?} - retrying in {}s (attempt {}/{})",
                                    err,
                                    c.reconnect_delay().as_secs(),
                                    attempt,
                                    PUBLISH_ATTEMPTS
                                );
                                tokio::time::sleep(c.reconnect_delay()).await;
                                attempt += 1;
                            }
                        }
                    }
                }
            }
        }

        info!("MQTT sender loop exiting");
        Ok(())
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/availability", self.config.mqtt().namespace())
    }
}
