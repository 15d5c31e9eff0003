use std::time::Duration;

/// Protocol version - increment when making breaking changes
pub const PROTOCOL_VERSION: u32 = 1;

/// Default room server port
pub const DEFAULT_TCP_PORT: u16 = 25565;

/// Network limits
pub const MAX_LINE_LENGTH: usize = 65536; // 64KB max message line
pub const MAX_PLAYER_NAME_LENGTH: usize = 16;
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 256;
pub const RECONNECT_TOKEN_BYTES: usize = 16;

/// Protocol handler
pub struct Protocol;

impl Protocol {
    /// Validate a display name
    pub fn validate_player_name(name: &str) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("Name cannot be empty".to_string());
        }

        if name.chars().count() > MAX_PLAYER_NAME_LENGTH {
            return Err(format!(
                "Name too long (max {} characters)",
                MAX_PLAYER_NAME_LENGTH
            ));
        }

        // Letters, numbers, underscores and inner spaces
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ' ') {
            return Err("Name can only contain letters, numbers, spaces and underscores".to_string());
        }

        Ok(())
    }

    /// Validate chat message
    pub fn validate_chat_message(message: &str) -> Result<(), String> {
        if message.trim().is_empty() {
            return Err("Message cannot be empty".to_string());
        }

        if message.chars().count() > MAX_CHAT_MESSAGE_LENGTH {
            return Err(format!(
                "Message too long (max {} characters)",
                MAX_CHAT_MESSAGE_LENGTH
            ));
        }

        if message.chars().any(|c| c.is_control()) {
            return Err("Message cannot contain control characters".to_string());
        }

        Ok(())
    }

    /// Minimum spacing between relayed position updates from one player
    pub fn relay_interval(hz: u32) -> Duration {
        Duration::from_millis(1000 / hz.max(1) as u64)
    }
}
