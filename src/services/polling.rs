use std::sync::Arc;
use std::time::Duration;

use crate::services::dispatch;
use crate::services::messaging::telegram::TelegramClient;
use crate::state::AppState;

const LONG_POLL_SECS: u64 = 30;
const ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Pulls updates with `getUpdates` when no webhook is registered. Updates
/// are handled one at a time, in the order Telegram returns them.
pub async fn run(state: Arc<AppState>, client: TelegramClient) {
    let mut offset = 0;
    tracing::info!("long polling for updates");

    loop {
        let updates = match client.get_updates(offset, LONG_POLL_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed");
                tokio::time::sleep(ERROR_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let update_id = update.update_id;
            match update.into_inbound() {
                Some(inbound) => dispatch::handle_inbound(&state, inbound).await,
                None => tracing::debug!(update_id, "ignoring unsupported update"),
            }
        }
    }
}
