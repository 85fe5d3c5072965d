use std::fmt::Write as _;

use masjid_core::{EntryEditor, ResolverState};

pub fn location(state: &ResolverState) -> String {
    let mut out = String::from("Your Location Details\n\nCoordinates\n");

    if let Some(c) = state.coordinate {
        let _ = writeln!(out, "  Latitude: {:.6}", c.latitude);
        let _ = writeln!(out, "  Longitude: {:.6}", c.longitude);
    }

    let _ = writeln!(out, "\nAddress\n  {}", state.formatted_address());
    out
}

pub fn editor(editor: &EntryEditor) -> String {
    let form = editor.form();
    let mut out = format!("{} ({})\n", form.name, form.id);

    for (prayer, time) in editor.display_rows() {
        let _ = writeln!(out, "  {:<8} {}", prayer.label(), time);
    }

    out
}
