use crate::model::MosqueRecord;

/// Screens and the parameters they need. The editor's record travels by
/// value; there is no fetch-by-id path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    MasjidList,
    EditMasjid { mosque: MosqueRecord },
}

impl Route {
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Welcome",
            Route::MasjidList => "Nearby Masjids",
            Route::EditMasjid { .. } => "Edit Masjid",
        }
    }
}
