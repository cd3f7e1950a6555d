pub mod talemachine;

use anyhow::Result;

use crate::domain::models::BackendBox;

pub struct BackendManager {}

impl BackendManager {
    pub fn get() -> Result<BackendBox> {
        return Ok(Box::<talemachine::TaleMachine>::default());
    }
}
