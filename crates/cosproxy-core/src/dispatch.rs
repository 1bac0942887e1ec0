use http::StatusCode;
use tracing::warn;

use cosproxy_pool::{AccountPool, PoolError};
use cosproxy_protocol::cosine::CosineChatRequest;
use cosproxy_upstream::{ChatUpstream, UpstreamReply};

use crate::error::ProxyError;

pub const MAX_ATTEMPTS: u32 = 3;

/// Binds the request to an account and drives the bounded retry loop.
///
/// Failure classification: a transport error is transient and never blamed on
/// the account; 401/403 retires the account permanently; any other non-200 is
/// ambiguous and retried without deactivation. An empty pool is terminal
/// immediately, since there is nothing left to rotate to.
pub async fn dispatch_chat<U>(
    pool: &AccountPool,
    upstream: &U,
    mut request: CosineChatRequest,
) -> Result<UpstreamReply, ProxyError>
where
    U: ChatUpstream + ?Sized,
{
    for attempt in 0..MAX_ATTEMPTS {
        let account = match pool.next().await {
            Ok(account) => account,
            Err(PoolError::NoneAvailable) => return Err(ProxyError::no_accounts()),
            Err(err) => return Err(ProxyError::internal(err.to_string())),
        };
        request.team_id = account.team_id.clone();

        let reply = match upstream.send_chat(&request, &account.secret).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(account = account.id, attempt, error = %err, "upstream request failed");
                continue;
            }
        };

        match reply.status {
            StatusCode::OK => return Ok(reply),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(
                    account = account.id,
                    status = %reply.status,
                    "credential rejected, deactivating"
                );
                if let Err(err) = pool.deactivate(account.id).await {
                    warn!(account = account.id, error = %err, "deactivation failed");
                }
            }
            status => {
                warn!(account = account.id, attempt, %status, "upstream returned non-success");
            }
        }
    }

    Err(ProxyError::retries_exhausted())
}
