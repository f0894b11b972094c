use crate::domain::model::StreamEvent;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 客戶端連線：每次只有協調迴圈一個寫入者
#[async_trait]
pub trait EventSink: Send {
    /// 寫出一個 frame 並 flush，回傳前客戶端即可看到
    async fn emit(&mut self, event: &StreamEvent) -> Result<()>;

    /// 所有供應商都結束後關閉串流
    async fn close(&mut self) -> Result<()>;

    /// 客戶端斷線時完成；無法偵測斷線的 sink 永遠不會完成
    async fn closed(&mut self) {
        std::future::pending::<()>().await
    }
}
