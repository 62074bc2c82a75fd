// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run telemetry over a broadcast channel.
//!
//! The pool emits one event per task transition; subscribers (the CLI
//! progress bar, tests) attach as needed. With no subscribers events are
//! dropped silently.

use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum HarvestEvent {
    PageStarted {
        run_id: Uuid,
        page_index: u32,
        url: String,
    },
    PageCompleted {
        run_id: Uuid,
        page_index: u32,
        records: usize,
        attempt: u32,
    },
    PageFailed {
        run_id: Uuid,
        page_index: u32,
        attempts: u32,
        error: String,
    },
    EndOfListing {
        run_id: Uuid,
        page_index: u32,
    },
    RunComplete {
        run_id: Uuid,
        pages: u32,
        records: u64,
        failed: u32,
    },
}

/// Broadcast bus for one harvest run.
#[derive(Debug, Clone)]
pub struct EventBus {
    run_id: Uuid,
    tx: broadcast::Sender<HarvestEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            run_id: Uuid::new_v4(),
            tx,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HarvestEvent> {
        self.tx.subscribe()
    }

    /// Send errors mean no subscribers; that is fine.
    pub fn emit(&self, event: HarvestEvent) {
        let _ = self.tx.send(event);
    }

    pub fn page_started(&self, page_index: u32, url: &str) {
        self.emit(HarvestEvent::PageStarted {
            run_id: self.run_id,
            page_index,
            url: url.to_string(),
        });
    }

    pub fn page_completed(&self, page_index: u32, records: usize, attempt: u32) {
        self.emit(HarvestEvent::PageCompleted {
            run_id: self.run_id,
            page_index,
            records,
            attempt,
        });
    }

    pub fn page_failed(&self, page_index: u32, attempts: u32, error: &str) {
        self.emit(HarvestEvent::PageFailed {
            run_id: self.run_id,
            page_index,
            attempts,
            error: error.to_string(),
        });
    }

    pub fn end_of_listing(&self, page_index: u32) {
        self.emit(HarvestEvent::EndOfListing {
            run_id: self.run_id,
            page_index,
        });
    }

    pub fn run_complete(&self, pages: u32, records: u64, failed: u32) {
        self.emit(HarvestEvent::RunComplete {
            run_id: self.run_id,
            pages,
            records,
            failed,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
