use serde::{Deserialize, Serialize};

/// One tick worth of movement intent, already decoupled from any key bindings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sneak: bool,
    pub sprint: bool,
    /// Explicit flight toggle, in addition to the jump double-tap
    pub fly_toggle: bool,
}

impl PlayerInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Movement axes as (strafe, forward), each in -1..=1
    pub fn movement_axes(&self) -> (f32, f32) {
        let axis = |positive: bool, negative: bool| match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        (axis(self.right, self.left), axis(self.forward, self.backward))
    }

    pub fn is_moving(&self) -> bool {
        self.movement_axes() != (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposing_keys_cancel() {
        let input = PlayerInput {
            forward: true,
            backward: true,
            right: true,
            ..PlayerInput::default()
        };
        assert_eq!(input.movement_axes(), (1.0, 0.0));
        assert!(input.is_moving());
        assert!(!PlayerInput::new().is_moving());
    }

    #[test]
    fn test_missing_fields_default_to_false() {
        let input: PlayerInput = serde_json::from_str(r#"{"jump":true}"#).expect("valid json");
        assert!(input.jump);
        assert!(!input.sprint);
    }
}
