//! Channel streaming producer.
//!
//! The [`ChannelStreamingProducer`] owns at most one background
//! emission task per session. `Start` advertises the channel catalog
//! and begins emission; `ChannelStreamingStart` restarts emission
//! (optionally scoped to a subset) without re-advertising;
//! `ChannelStreamingStop` cancels the task.
//!
//! Starting always tears down the previous task first, so there is
//! never more than one live emission loop per session. Cancellation is
//! cooperative: the loop sleeps for one emission interval, then checks
//! the signal before emitting, which bounds cancellation latency by one
//! interval. The loop never clears the task handle itself; only the
//! dispatch side mutates it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::config::StreamingSettings;
use crate::etp::transport::Transport;
use crate::etp::types::{
    ChannelData, ChannelMetadata, ChannelMetadataRecord, ChannelStreamingStart, DataItem,
    EtpMessage, MessageBody, MessageHeader, MessageId, Protocol, Start,
};
use crate::utils::error::EtpResult;

/// A simulated data source exposing a fixed channel catalog
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Display name of the producer
    pub name: String,
    /// Channel catalog advertised to consumers
    pub channels: Vec<ChannelMetadataRecord>,
}

impl Simulation {
    /// Creates an empty simulation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
        }
    }

    /// Adds a channel to the catalog
    pub fn with_channel(mut self, channel: ChannelMetadataRecord) -> Self {
        self.channels.push(channel);
        self
    }
}

struct StreamingTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Converts streaming control messages into a cancellable emission loop
pub struct ChannelStreamingProducer {
    transport: Arc<dyn Transport>,
    simulation: Simulation,
    max_message_rate: Duration,
    max_data_items: usize,
    is_simple_streamer: bool,
    task: Option<StreamingTask>,
}

impl std::fmt::Debug for ChannelStreamingProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStreamingProducer")
            .field("simulation", &self.simulation.name)
            .field("max_message_rate", &self.max_message_rate)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

impl ChannelStreamingProducer {
    /// Creates a producer for `simulation`, emitting through `transport`
    pub fn new(
        transport: Arc<dyn Transport>,
        simulation: Simulation,
        settings: &StreamingSettings,
    ) -> Self {
        Self {
            transport,
            simulation,
            max_message_rate: Duration::from_millis(settings.max_message_rate_ms),
            max_data_items: settings.max_data_items.max(1) as usize,
            is_simple_streamer: settings.simple_streamer,
            task: None,
        }
    }

    /// The simulated data source behind this producer
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Whether the producer advertises itself as a simple streamer
    pub fn is_simple_streamer(&self) -> bool {
        self.is_simple_streamer
    }

    /// Whether an emission loop is currently live
    pub fn is_streaming(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.handle.is_finished())
    }

    /// Handles `Start`: advertise the catalog, then begin emission over
    /// the full channel set.
    pub async fn on_start(&mut self, header: &MessageHeader, start: Start) -> EtpResult<()> {
        self.on_channel_streaming_stop();

        if start.max_message_rate > 0 {
            self.max_message_rate = Duration::from_millis(start.max_message_rate as u64);
        }
        if start.max_data_items > 0 {
            self.max_data_items = start.max_data_items as usize;
        }

        let metadata = ChannelMetadata {
            channels: self.simulation.channels.clone(),
        };
        self.transport
            .send(EtpMessage::response(
                Protocol::ChannelStreaming,
                header.message_id,
                MessageBody::ChannelMetadata(metadata),
            ))
            .await?;

        self.restart_streaming(header.message_id, self.simulation.channels.clone());
        Ok(())
    }

    /// Handles `ChannelStreamingStart`: restart emission without
    /// re-advertising metadata, scoped to the requested subset when one
    /// was given.
    pub fn on_channel_streaming_start(
        &mut self,
        header: &MessageHeader,
        request: ChannelStreamingStart,
    ) {
        let channels = if request.channels.is_empty() {
            self.simulation.channels.clone()
        } else {
            self.simulation
                .channels
                .iter()
                .filter(|channel| {
                    request
                        .channels
                        .iter()
                        .any(|info| info.channel_id == channel.channel_id)
                })
                .cloned()
                .collect()
        };
        self.restart_streaming(header.message_id, channels);
    }

    /// Handles `ChannelStreamingStop`. Idempotent: a stop with no
    /// active task is a no-op.
    pub fn on_channel_streaming_stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("cancelling streaming task");
            let _ = task.cancel.send(true);
        }
    }

    fn restart_streaming(&mut self, request_id: MessageId, channels: Vec<ChannelMetadataRecord>) {
        self.on_channel_streaming_stop();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let transport = Arc::clone(&self.transport);
        let interval = self.max_message_rate;
        let max_items = self.max_data_items;

        debug!(channels = channels.len(), ?interval, "starting streaming task");
        let handle = tokio::spawn(send_channel_data(
            transport, request_id, channels, interval, max_items, cancel_rx,
        ));
        self.task = Some(StreamingTask {
            cancel: cancel_tx,
            handle,
        });
    }
}

/// Emission loop body: wait one interval, check for cancellation, then
/// emit one data item per channel.
async fn send_channel_data(
    transport: Arc<dyn Transport>,
    request_id: MessageId,
    channels: Vec<ChannelMetadataRecord>,
    interval: Duration,
    max_items: usize,
    cancel: watch::Receiver<bool>,
) {
    loop {
        time::sleep(interval).await;

        if *cancel.borrow() {
            break;
        }

        let mut data: Vec<DataItem> = channels
            .iter()
            .map(|channel| DataItem::timestamp_now(channel.channel_id))
            .collect();
        data.truncate(max_items);

        let message = EtpMessage::response(
            Protocol::ChannelStreaming,
            request_id,
            MessageBody::ChannelData(ChannelData { data }),
        );
        if let Err(error) = transport.send(message).await {
            warn!(%error, "channel data send failed, stopping emission");
            break;
        }
    }
}
