use crate::domain::model::StreamEvent;
use crate::domain::ports::EventSink;
use crate::utils::error::{AggregatorError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 外層 HTTP 回應必須帶上的標頭
pub const STREAM_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("X-Accel-Buffering", "no"),
];

/// `data: <compact json>\n\n`
pub fn encode_frame(event: &StreamEvent) -> Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

fn disconnected(error: impl std::fmt::Display) -> AggregatorError {
    AggregatorError::ClientDisconnected {
        message: error.to_string(),
    }
}

/// 把 frame 寫到任意位元組串流（stdout、socket、回應本體）。
///
/// 位元組串流本身無法得知對端已離開，持有連線的一方可以透過
/// `with_disconnect` 交入的 token 通知斷線。
pub struct FrameWriter<W> {
    writer: W,
    disconnect: Option<CancellationToken>,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            disconnect: None,
        }
    }

    /// token 被 cancel 即視為客戶端斷線
    pub fn with_disconnect(mut self, token: CancellationToken) -> Self {
        self.disconnect = Some(token);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for FrameWriter<W> {
    async fn emit(&mut self, event: &StreamEvent) -> Result<()> {
        let frame = encode_frame(event)?;
        self.writer
            .write_all(frame.as_bytes())
            .await
            .map_err(disconnected)?;
        self.writer.flush().await.map_err(disconnected)
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(disconnected)
    }

    async fn closed(&mut self) {
        match &self.disconnect {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    }
}

/// 把 frame 交給 mpsc channel，由外層 web 框架轉成回應本體。
///
/// 接收端被 drop 即視為客戶端斷線。
pub struct ChannelSink {
    sender: Option<mpsc::Sender<String>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: &StreamEvent) -> Result<()> {
        let frame = encode_frame(event)?;
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| disconnected("stream already closed"))?;
        sender
            .send(frame)
            .await
            .map_err(|_| disconnected("receiver dropped"))
    }

    async fn close(&mut self) -> Result<()> {
        // drop sender 後接收端會讀到串流結尾
        self.sender.take();
        Ok(())
    }

    async fn closed(&mut self) {
        match &self.sender {
            Some(sender) => sender.closed().await,
            None => std::future::pending::<()>().await,
        }
    }
}

/// 協調迴圈唯一的寫入者：依完成順序寫出 frame，並在每個 frame 後暫停
pub struct Emitter<'a, S: EventSink + ?Sized> {
    sink: &'a mut S,
    pacing: Duration,
    frames: usize,
}

impl<'a, S: EventSink + ?Sized> Emitter<'a, S> {
    pub fn new(sink: &'a mut S, pacing: Duration) -> Self {
        Self {
            sink,
            pacing,
            frames: 0,
        }
    }

    pub async fn emit(&mut self, event: &StreamEvent) -> Result<()> {
        self.sink.emit(event).await?;
        self.frames += 1;
        debug!(provider = %event.provider, frame = self.frames, "Frame emitted");

        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
        Ok(())
    }

    pub async fn closed(&mut self) {
        self.sink.closed().await
    }

    pub async fn close(self) -> Result<usize> {
        self.sink.close().await?;
        Ok(self.frames)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}
