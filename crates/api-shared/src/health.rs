use crate::dto::HealthRes;

/// Liveness check shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static check; the preferred form since no state is involved.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "MedBill is alive".into(),
        }
    }
}
