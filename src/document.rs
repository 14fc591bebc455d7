// src/document.rs
//
// Challan documents. Byte layout belongs to the renderer; the engine only
// supplies the field set.

use crate::challan::Challan;
use crate::error::EngineError;
use serde::Serialize;

const DETAILS_MAX_CHARS: usize = 80;
const PAYMENT_NOTICE: &str = "Please pay at the nearest traffic office or online portal.";

/// Everything a renderer needs to print a challan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallanDocument {
    pub id: String,
    pub violation: String,
    pub vehicle_info: String,
    pub amount: u32,
    pub status: String,
    pub details: String,
    pub notice: String,
}

impl ChallanDocument {
    pub fn from_challan(challan: &Challan) -> Self {
        let mut details: String = challan.details.chars().take(DETAILS_MAX_CHARS).collect();
        if challan.details.chars().count() > DETAILS_MAX_CHARS {
            details.push_str("...");
        }
        Self {
            id: challan.id.to_string(),
            violation: challan.violation_type.title(),
            vehicle_info: challan.vehicle_info.clone(),
            amount: challan.amount,
            status: challan.status.as_str().to_string(),
            details,
            notice: PAYMENT_NOTICE.to_string(),
        }
    }
}

pub trait DocumentRenderer: Send + Sync {
    /// Fails with `EngineError::Unavailable` if no rendering backend exists.
    fn render(&self, doc: &ChallanDocument) -> Result<Vec<u8>, EngineError>;

    /// File extension for rendered output
    fn extension(&self) -> &'static str;
}

/// Plain-text e-challan.
#[derive(Debug, Default)]
pub struct TextChallanRenderer;

impl DocumentRenderer for TextChallanRenderer {
    fn render(&self, doc: &ChallanDocument) -> Result<Vec<u8>, EngineError> {
        let text = format!(
            "Traffic Challan / E-Challan\n\
             \n\
             Challan ID: {}\n\
             Violation: {}\n\
             Vehicle: {}\n\
             Amount: {}\n\
             Status: {}\n\
             Details: {}\n\
             \n\
             {}\n",
            doc.id, doc.violation, doc.vehicle_info, doc.amount, doc.status, doc.details, doc.notice
        );
        Ok(text.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

/// Stand-in when no renderer is installed.
#[derive(Debug, Default)]
pub struct UnavailableRenderer;

impl DocumentRenderer for UnavailableRenderer {
    fn render(&self, _doc: &ChallanDocument) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::Unavailable(
            "no challan document renderer installed".to_string(),
        ))
    }

    fn extension(&self) -> &'static str {
        "bin"
    }
}
