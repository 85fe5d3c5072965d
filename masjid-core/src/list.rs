use std::fmt::Write as _;

use tracing::{debug, warn};

use crate::{model::MosqueRecord, route::Route, store::MosqueStore};

pub const EMPTY_MESSAGE: &str = "No mosques found";

/// Exactly one of these is on screen at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Error(String),
    Loaded(Vec<MosqueRecord>),
    Empty,
}

#[derive(Debug)]
pub struct ListView {
    state: ListState,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new()
    }
}

impl ListView {
    pub fn new() -> Self {
        Self { state: ListState::Loading }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn rows(&self) -> &[MosqueRecord] {
        match &self.state {
            ListState::Loaded(rows) => rows,
            _ => &[],
        }
    }

    /// Read every row. Always leaves the view out of `Loading`.
    pub async fn load(&mut self, store: &dyn MosqueStore) {
        self.state = ListState::Loading;

        self.state = match store.list_mosques().await {
            Ok(rows) if rows.is_empty() => ListState::Empty,
            Ok(rows) => {
                debug!(rows = rows.len(), "mosque list loaded");
                ListState::Loaded(rows)
            }
            Err(err) => {
                warn!(error = %err, "error fetching mosques");
                ListState::Error(err.to_string())
            }
        };
    }

    pub async fn refresh(&mut self, store: &dyn MosqueStore) {
        self.load(store).await;
    }

    /// Route to the editor carrying the tapped row.
    pub fn open_editor(&self, id: i64) -> Option<Route> {
        self.rows()
            .iter()
            .find(|row| row.id == id)
            .map(|row| Route::EditMasjid { mosque: row.clone() })
    }

    pub fn render(&self) -> String {
        match &self.state {
            ListState::Loading => "Loading...".to_string(),
            ListState::Error(msg) => format!("Error: {msg}"),
            ListState::Empty => EMPTY_MESSAGE.to_string(),
            ListState::Loaded(rows) => {
                let mut out = String::new();
                for row in rows {
                    let _ = writeln!(out, "[{}] {}", row.id, row.name);
                    if !row.address.is_empty() {
                        let _ = writeln!(out, "    {}", row.address);
                    }
                    for (prayer, time) in row.times.iter() {
                        let _ = writeln!(out, "    {}: {}", prayer.label(), time);
                    }
                }
                out
            }
        }
    }
}
