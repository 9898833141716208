use crate::error::EngineError;
use tokio::sync::oneshot;

/// Запросы оркестратора к запущенной сессии звонка.
#[derive(Debug)]
pub enum SessionCommand {
    /// Получить камеру и микрофон. В ответе: доступны ли медиа.
    RequestPermissions {
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },

    /// В ответе итоговое состояние видео.
    ToggleVideo {
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },

    /// В ответе итоговое состояние звука.
    ToggleAudio {
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },

    /// Объявить об уходе, закрыть всё и завершить цикл.
    Leave { reply: oneshot::Sender<()> },
}
