//! Pending confirmations for destructive or unusual actions
//!
//! Deleting a product, emptying the scan log and accepting a duplicate-variant
//! scan all take two steps: a request that moves the session into a pending
//! state, then a confirmation that must name the same target.

use serde::Serialize;

/// What the session is waiting on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConfirmState {
    #[default]
    Idle,
    PendingDelete { barcode: String },
    PendingClear,
    PendingVariant { barcode: String, existing: Vec<String> },
}

/// Request-scoped UI state that used to live in global flags
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub state: ConfirmState,
    /// Last scan that matched nothing, offered for the unfound log
    pub last_unfound: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_delete(&mut self, barcode: &str) {
        self.state = ConfirmState::PendingDelete {
            barcode: barcode.to_string(),
        };
    }

    pub fn request_clear(&mut self) {
        self.state = ConfirmState::PendingClear;
    }

    pub fn request_variant(&mut self, barcode: &str, existing: Vec<String>) {
        self.state = ConfirmState::PendingVariant {
            barcode: barcode.to_string(),
            existing,
        };
    }

    /// Drop whatever was pending
    pub fn cancel(&mut self) {
        if self.state != ConfirmState::Idle {
            log::debug!("Cancelled pending {:?}", self.state);
        }
        self.state = ConfirmState::Idle;
    }

    /// Consume a pending delete for `barcode`
    pub fn take_delete(&mut self, barcode: &str) -> bool {
        self.take_if(|s| matches!(s, ConfirmState::PendingDelete { barcode: b } if b == barcode))
    }

    /// Consume a pending clear
    pub fn take_clear(&mut self) -> bool {
        self.take_if(|s| matches!(s, ConfirmState::PendingClear))
    }

    /// Consume a pending duplicate-variant scan for `barcode`
    pub fn take_variant(&mut self, barcode: &str) -> bool {
        self.take_if(|s| Self::is_variant_for(s, barcode))
    }

    /// Whether a duplicate-variant scan for `barcode` is waiting, without
    /// consuming it
    pub fn has_pending_variant(&self, barcode: &str) -> bool {
        Self::is_variant_for(&self.state, barcode)
    }

    fn is_variant_for(state: &ConfirmState, barcode: &str) -> bool {
        matches!(state, ConfirmState::PendingVariant { barcode: b, .. } if b == barcode)
    }

    fn take_if(&mut self, pred: impl Fn(&ConfirmState) -> bool) -> bool {
        if pred(&self.state) {
            self.state = ConfirmState::Idle;
            true
        } else {
            false
        }
    }

    /// Remember (or forget) the last unfound scan
    pub fn set_last_unfound(&mut self, barcode: Option<String>) {
        self.last_unfound = barcode;
    }

    pub fn take_last_unfound(&mut self) -> Option<String> {
        self.last_unfound.take()
    }
}
