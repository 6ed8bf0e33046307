use crate::errors::ServiceError;
use tracing::warn;

/// The storefront endpoints never surface errors as HTTP statuses: every
/// failure is flattened into a `success:false` envelope on a 200 so browser
/// callers inspect the flag, not the status. The webhook receiver is the
/// exception and uses statuses directly.
pub fn flatten_error(context: &str, err: &ServiceError) -> String {
    warn!("{} failed: {}", context, err);
    err.response_message()
}
