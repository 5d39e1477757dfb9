//! Human-readable guidance shown during a demonstration.

use mimic_common::protocol::{MessageType, Payload};
use std::time::SystemTime;

/// One pending ask to the human: "show me which element you mean".
#[derive(Debug, Clone)]
pub struct GuidanceInstruction {
    pub message_type: MessageType,
    pub instructions: String,
    pub payload: Payload,
    pub issued_at: SystemTime,
}

impl GuidanceInstruction {
    pub fn new(message_type: MessageType, payload: Payload) -> Self {
        Self {
            instructions: build_instructions(message_type, &payload),
            message_type,
            payload,
            issued_at: SystemTime::now(),
        }
    }
}

/// Generate the instruction text for an action kind.
///
/// Exhaustive on purpose: a new message type must get its own wording here
/// before it compiles.
pub fn build_instructions(message_type: MessageType, payload: &Payload) -> String {
    let target = describe_target(payload);
    match message_type {
        MessageType::FillText => {
            format!("Click on the {target} input field you want this text typed into.")
        }
        MessageType::ClickElement => {
            format!("Click the {target} button or link you want automated.")
        }
        MessageType::SelectOption => {
            format!("Click the {target} dropdown that should receive this selection.")
        }
        MessageType::ToggleCheckbox => {
            format!("Click the {target} checkbox or switch you want toggled.")
        }
    }
}

fn describe_target(payload: &Payload) -> String {
    let description = payload.element_description();
    if !description.is_empty() {
        return format!("\"{description}\"");
    }
    let name = payload.target_name();
    if !name.is_empty() {
        return format!("\"{name}\"");
    }
    "target".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_name_the_described_element() {
        let payload = Payload::new().with("elementDescription", "Email address");
        let text = build_instructions(MessageType::FillText, &payload);
        assert!(text.contains("\"Email address\""));
        assert!(text.contains("input field"));
    }

    #[test]
    fn instructions_fall_back_to_target_name_then_generic() {
        let named = Payload::new().with("targetName", "submit");
        assert!(build_instructions(MessageType::ClickElement, &named).contains("\"submit\""));

        let bare = Payload::new();
        assert!(build_instructions(MessageType::ToggleCheckbox, &bare).contains("target"));
    }
}
