use crate::{controller::DisplayStatus, error::StatusLookupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Known(DisplayStatus),
    /// The status lookup failed for this row.
    Unknown,
}

impl RowStatus {
    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Known(status) => status.label(),
            RowStatus::Unknown => "?",
        }
    }

    pub fn is_yes(self) -> bool {
        matches!(self, RowStatus::Known(DisplayStatus::Yes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    /// The authoritative item this row was built from.
    pub source: String,
    pub label: String,
    pub status: RowStatus,
}

/// A list display rebuilt wholesale from an authoritative item sequence.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    rows: Vec<ListRow>,
    selected: Option<usize>,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&ListRow> {
        self.selected.and_then(|index| self.rows.get(index))
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = match index {
            Some(_) if self.rows.is_empty() => None,
            Some(index) => Some(index.min(self.rows.len() - 1)),
            None => None,
        };
    }

    pub fn select_next(&mut self) {
        let next = match self.selected {
            Some(index) => index + 1,
            None => 0,
        };
        self.select(Some(next));
    }

    pub fn select_prev(&mut self) {
        let prev = self.selected.map(|index| index.saturating_sub(1)).unwrap_or(0);
        self.select(Some(prev));
    }

    /// Clears the list and inserts one row per item, in order. Duplicates are
    /// kept. A failed status lookup marks that row [`RowStatus::Unknown`] and
    /// is returned; the other rows are unaffected. Selection is cleared.
    pub fn project<I, S, L, F>(
        &mut self,
        items: I,
        mut status_lookup: L,
        mut formatter: F,
    ) -> Vec<StatusLookupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        L: FnMut(&str) -> Result<DisplayStatus, StatusLookupError>,
        F: FnMut(&str) -> String,
    {
        self.rows.clear();
        self.selected = None;
        let mut failures = Vec::new();
        for item in items {
            let item = item.as_ref();
            let status = match status_lookup(item) {
                Ok(status) => RowStatus::Known(status),
                Err(err) => {
                    failures.push(err);
                    RowStatus::Unknown
                }
            };
            self.rows.push(ListRow {
                source: item.to_string(),
                label: formatter(item),
                status,
            });
        }
        failures
    }
}

/// Label for a utility path such as `Therapist/Therapist.sh`: the parent
/// folder and file name, or only the file stem when paths are hidden.
pub fn utility_label(path: &str, hide_path: bool) -> String {
    let mut parts = path.rsplit('/');
    let file = parts.next().unwrap_or(path);
    if hide_path {
        return match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file.to_string(),
        };
    }
    match parts.next() {
        Some(parent) => format!("{parent}/{file}"),
        None => file.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ListKind;
    use proptest::prelude::*;

    fn lookup_failure(item: &str) -> StatusLookupError {
        StatusLookupError {
            kind: ListKind::Hacks,
            item: item.to_string(),
            reason: "boom".to_string(),
        }
    }

    #[test]
    fn rows_follow_status_lookup() {
        let mut view = ListView::new();
        let failures = view.project(
            ["a.txt", "b.txt"],
            |item| Ok(DisplayStatus::from(item == "a.txt")),
            str::to_string,
        );
        assert!(failures.is_empty());
        assert_eq!(view.len(), 2);
        assert_eq!(view.rows()[0].source, "a.txt");
        assert_eq!(view.rows()[0].status, RowStatus::Known(DisplayStatus::Yes));
        assert_eq!(view.rows()[1].status, RowStatus::Known(DisplayStatus::No));
    }

    #[test]
    fn failed_lookup_keeps_its_row() {
        let mut view = ListView::new();
        let failures = view.project(
            ["a.txt", "b.txt"],
            |item| {
                if item == "b.txt" {
                    Err(lookup_failure(item))
                } else {
                    Ok(DisplayStatus::Yes)
                }
            },
            str::to_string,
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].item, "b.txt");
        assert_eq!(view.rows()[0].status, RowStatus::Known(DisplayStatus::Yes));
        assert_eq!(view.rows()[1].source, "b.txt");
        assert_eq!(view.rows()[1].status, RowStatus::Unknown);
        assert_eq!(view.rows()[1].status.label(), "?");
    }

    #[test]
    fn rebuild_drops_stale_rows_and_selection() {
        let mut view = ListView::new();
        view.project(["old-1", "old-2", "old-3"], |_| Ok(DisplayStatus::No), str::to_string);
        view.select(Some(2));
        assert_eq!(view.selected_row().unwrap().source, "old-3");

        view.project(["new"], |_| Ok(DisplayStatus::Yes), str::to_uppercase);
        assert_eq!(view.len(), 1);
        assert_eq!(view.rows()[0].label, "NEW");
        assert_eq!(view.selected(), None);

        view.project(Vec::<String>::new(), |_| Ok(DisplayStatus::Yes), str::to_string);
        assert!(view.is_empty());
        view.select(Some(0));
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn selection_clamps_to_rows() {
        let mut view = ListView::new();
        view.project(["a", "b"], |_| Ok(DisplayStatus::No), str::to_string);
        view.select_next();
        assert_eq!(view.selected(), Some(0));
        view.select_next();
        view.select_next();
        assert_eq!(view.selected(), Some(1));
        view.select_prev();
        view.select_prev();
        assert_eq!(view.selected(), Some(0));
    }

    #[test]
    fn utility_labels() {
        assert_eq!(
            utility_label("Therapist/bin/Therapist.sh", false),
            "bin/Therapist.sh"
        );
        assert_eq!(utility_label("Therapist/bin/Therapist.sh", true), "Therapist");
        assert_eq!(utility_label("tool.jar", false), "tool.jar");
        assert_eq!(utility_label(".hidden", true), ".hidden");
    }

    proptest! {
        #[test]
        fn prop_projection_preserves_length_and_order(
            items in proptest::collection::vec("[a-c]{1,3}", 0..24),
            failing in "[a-c]{1,3}",
        ) {
            let mut view = ListView::new();
            view.project(["stale"], |_| Ok(DisplayStatus::Yes), str::to_string);
            let failures = view.project(
                &items,
                |item| {
                    if item == failing {
                        Err(lookup_failure(item))
                    } else {
                        Ok(DisplayStatus::from(item.len() % 2 == 0))
                    }
                },
                str::to_string,
            );

            prop_assert_eq!(view.len(), items.len());
            let sources: Vec<&str> = view.rows().iter().map(|row| row.source.as_str()).collect();
            let expected: Vec<&str> = items.iter().map(String::as_str).collect();
            prop_assert_eq!(sources, expected);
            let unknown = view.rows().iter().filter(|row| row.status == RowStatus::Unknown).count();
            prop_assert_eq!(unknown, failures.len());
            prop_assert_eq!(unknown, items.iter().filter(|item| **item == failing).count());
        }
    }
}
