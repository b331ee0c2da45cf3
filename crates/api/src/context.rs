use protelab_core::LabId;

/// Header naming the lab on whose behalf a request is made.
pub const LAB_HEADER: &str = "x-lab-id";

/// Acting lab for a request.
///
/// Inserted by [`crate::middleware::lab_context_middleware`] when the request
/// carries a valid `X-Lab-Id` header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LabContext {
    lab_id: LabId,
}

impl LabContext {
    pub fn new(lab_id: LabId) -> Self {
        Self { lab_id }
    }

    pub fn lab_id(&self) -> LabId {
        self.lab_id
    }
}
