use serde::Serialize;
use utoipa::ToSchema;

/// Whether the backend can currently reach its room store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// Rooms cannot be read or written until the store answers again.
    Degraded,
}

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
        }
    }

    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_value(HealthResponse::degraded()).unwrap(),
            serde_json::json!({ "status": "degraded" })
        );
    }
}
