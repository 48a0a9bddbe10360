use std::sync::Arc;

use tracing::{debug, warn};

use crate::omdb::{DetailRecord, OmdbError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Loading { id: String },
    Loaded { id: String, record: Arc<DetailRecord> },
    Failed { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    pub generation: u64,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub is_open: bool,
    pub focused_id: Option<String>,
    pub detail: Option<Arc<DetailRecord>>,
    pub loading: bool,
}

#[derive(Debug)]
pub struct ModalController {
    state: ModalState,
    generation: u64,
}

impl Default for ModalController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalController {
    pub fn new() -> Self {
        Self {
            state: ModalState::Closed,
            generation: 0,
        }
    }

    /// Opens the modal on `id`. A record already in the detail cache is shown
    /// immediately; otherwise the returned ticket must be resolved through
    /// [`ModalController::on_details`].
    pub fn open(&mut self, id: &str, cached: Option<Arc<DetailRecord>>) -> Option<DetailTicket> {
        self.generation = self.generation.wrapping_add(1);
        if let Some(record) = cached {
            self.state = ModalState::Loaded {
                id: id.to_string(),
                record,
            };
            return None;
        }
        self.state = ModalState::Loading { id: id.to_string() };
        Some(DetailTicket {
            generation: self.generation,
            id: id.to_string(),
        })
    }

    pub fn close(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = ModalState::Closed;
    }

    /// Returns whether the result was applied.
    pub fn on_details(
        &mut self,
        ticket: &DetailTicket,
        result: Result<Option<Arc<DetailRecord>>, OmdbError>,
    ) -> bool {
        let focused = matches!(&self.state, ModalState::Loading { id } if *id == ticket.id);
        if ticket.generation != self.generation || !focused {
            debug!(id = %ticket.id, "modal: dropping stale details");
            return false;
        }
        self.state = match result {
            Ok(Some(record)) => ModalState::Loaded {
                id: ticket.id.clone(),
                record,
            },
            Ok(None) => ModalState::Failed {
                id: ticket.id.clone(),
            },
            Err(err) => {
                warn!(id = %ticket.id, error = %err, "modal: details unavailable");
                ModalState::Failed {
                    id: ticket.id.clone(),
                }
            }
        };
        true
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    pub fn view(&self) -> ModalView {
        match &self.state {
            ModalState::Closed => ModalView {
                is_open: false,
                focused_id: None,
                detail: None,
                loading: false,
            },
            ModalState::Loading { id } => ModalView {
                is_open: true,
                focused_id: Some(id.clone()),
                detail: None,
                loading: true,
            },
            ModalState::Loaded { id, record } => ModalView {
                is_open: true,
                focused_id: Some(id.clone()),
                detail: Some(record.clone()),
                loading: false,
            },
            ModalState::Failed { id } => ModalView {
                is_open: true,
                focused_id: Some(id.clone()),
                detail: None,
                loading: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DetailService, ScriptedDetailService};

    fn record(id: &str) -> Arc<DetailRecord> {
        Arc::new(
            ScriptedDetailService::demo()
                .details(id)
                .unwrap()
                .unwrap(),
        )
    }

    #[test]
    fn open_then_resolve() {
        let mut modal = ModalController::new();
        let ticket = modal.open("tt0100001", None).unwrap();
        assert!(modal.view().loading);
        assert_eq!(modal.view().focused_id.as_deref(), Some("tt0100001"));

        assert!(modal.on_details(&ticket, Ok(Some(record("tt0100001")))));
        let view = modal.view();
        assert!(view.is_open);
        assert!(!view.loading);
        assert_eq!(view.detail.unwrap().title, "Avengers");
    }

    #[test]
    fn cached_record_skips_fetch() {
        let mut modal = ModalController::new();
        assert!(modal.open("tt0100001", Some(record("tt0100001"))).is_none());
        assert!(matches!(modal.state(), ModalState::Loaded { .. }));
    }

    #[test]
    fn close_discards_in_flight_result() {
        let mut modal = ModalController::new();
        let ticket = modal.open("tt0100001", None).unwrap();
        modal.close();
        assert!(!modal.on_details(&ticket, Ok(Some(record("tt0100001")))));
        assert_eq!(modal.state(), &ModalState::Closed);
        assert_eq!(modal.view().focused_id, None);
    }

    #[test]
    fn only_latest_opened_item_is_rendered() {
        let mut modal = ModalController::new();
        let first = modal.open("tt0100001", None).unwrap();
        let second = modal.open("tt0200001", None).unwrap();

        assert!(!modal.on_details(&first, Ok(Some(record("tt0100001")))));
        assert!(matches!(modal.state(), ModalState::Loading { id } if id == "tt0200001"));
        assert!(modal.on_details(&second, Ok(Some(record("tt0200001")))));
        assert_eq!(modal.view().detail.unwrap().title, "Batman");
    }

    #[test]
    fn reopening_same_item_ignores_older_ticket() {
        let mut modal = ModalController::new();
        let first = modal.open("tt0100001", None).unwrap();
        modal.close();
        let second = modal.open("tt0100001", None).unwrap();
        assert!(!modal.on_details(&first, Ok(None)));
        assert!(modal.view().loading);
        assert!(modal.on_details(&second, Ok(None)));
        assert!(matches!(modal.state(), ModalState::Failed { .. }));
    }

    #[test]
    fn fetch_error_degrades_to_failed() {
        let mut modal = ModalController::new();
        let ticket = modal.open("tt1", None).unwrap();
        assert!(modal.on_details(&ticket, Err(OmdbError::Upstream(None))));
        let view = modal.view();
        assert!(view.is_open);
        assert!(view.detail.is_none());
        assert!(!view.loading);
    }
}
