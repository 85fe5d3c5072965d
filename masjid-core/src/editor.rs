use chrono::NaiveTime;
use tracing::{info, warn};

use crate::{
    error::WireTimeError,
    model::{MosqueRecord, MosqueUpdate, Prayer, PrayerTimes},
    notice::Notice,
    route::Route,
    store::MosqueStore,
    wire_time::{display_time, format_wire_time, parse_wire_time},
};

/// Editable copy of a record, times parsed for the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub times: PrayerTimes<NaiveTime>,
}

impl EditForm {
    pub fn from_record(record: &MosqueRecord) -> Result<Self, WireTimeError> {
        let times = record.times.try_map(|_, wire| parse_wire_time(wire))?;

        Ok(Self { id: record.id, name: record.name.clone(), address: record.address.clone(), times })
    }

    pub fn to_update(&self) -> MosqueUpdate {
        MosqueUpdate {
            name: self.name.clone(),
            address: self.address.clone(),
            times: self.times.map(|t| format_wire_time(*t)),
        }
    }
}

/// Which prayer the time picker is open for, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickerState {
    pub target: Option<Prayer>,
}

impl PickerState {
    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Row updated; the caller should navigate back.
    Saved { notice: Notice },
    /// Update rejected; the form is untouched so the user can retry.
    Failed { notice: Notice },
}

impl EditOutcome {
    pub fn navigate_back(&self) -> bool {
        matches!(self, EditOutcome::Saved { .. })
    }

    pub fn notice(&self) -> &Notice {
        match self {
            EditOutcome::Saved { notice } | EditOutcome::Failed { notice } => notice,
        }
    }
}

#[derive(Debug)]
pub struct EntryEditor {
    form: EditForm,
    picker: PickerState,
}

impl EntryEditor {
    pub fn open(mosque: &MosqueRecord) -> Result<Self, WireTimeError> {
        Ok(Self { form: EditForm::from_record(mosque)?, picker: PickerState::default() })
    }

    pub fn from_route(route: &Route) -> anyhow::Result<Self> {
        match route {
            Route::EditMasjid { mosque } => Ok(Self::open(mosque)?),
            other => Err(anyhow::anyhow!("'{}' does not carry a mosque to edit", other.title())),
        }
    }

    pub fn form(&self) -> &EditForm {
        &self.form
    }

    pub fn picker(&self) -> PickerState {
        self.picker
    }

    pub fn open_picker(&mut self, prayer: Prayer) {
        self.picker.target = Some(prayer);
    }

    /// Write the picked time into the targeted field and close the picker.
    pub fn confirm_picker(&mut self, time: NaiveTime) {
        if let Some(prayer) = self.picker.target.take() {
            *self.form.times.get_mut(prayer) = time;
        }
    }

    pub fn cancel_picker(&mut self) {
        self.picker.target = None;
    }

    /// Rows of `label  HH:MM` as the editor shows them.
    pub fn display_rows(&self) -> Vec<(Prayer, String)> {
        self.form.times.iter().map(|(p, t)| (p, display_time(*t))).collect()
    }

    pub async fn submit(&self, store: &dyn MosqueStore) -> EditOutcome {
        let update = self.form.to_update();

        match store.update_mosque(self.form.id, &update).await {
            Ok(()) => {
                info!(id = self.form.id, "prayer times updated");
                EditOutcome::Saved {
                    notice: Notice::new("Updated", "Prayer times updated successfully"),
                }
            }
            Err(err) => {
                warn!(id = self.form.id, error = %err, "update failed");
                EditOutcome::Failed { notice: err.notice() }
            }
        }
    }
}
