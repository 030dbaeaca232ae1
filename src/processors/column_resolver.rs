use crate::error::{ProcessingError, Result};
use crate::models::{AttributeTable, YearRange};
use crate::utils::constants::DEFAULT_SEPARATOR;

/// Year columns of one variable that actually exist in the table, in ascending year order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub variable: String,
    pub entries: Vec<(i32, String)>,
}

impl ResolvedColumns {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries.iter().map(|(year, _)| *year).collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, name)| name.as_str()).collect()
    }

    pub fn column_for_year(&self, year: i32) -> Option<&str> {
        self.entries
            .binary_search_by_key(&year, |(y, _)| *y)
            .ok()
            .map(|pos| self.entries[pos].1.as_str())
    }

    /// Map each year of `axis` to this variable's column for that year, if any.
    pub fn align_to(&self, axis: &[i32]) -> Vec<Option<String>> {
        axis.iter()
            .map(|year| self.column_for_year(*year).map(str::to_string))
            .collect()
    }
}

pub struct ColumnResolver {
    separator: String,
}

impl ColumnResolver {
    pub fn new() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
        }
    }

    /// Columns `<prefix><sep><year>` the table has for years inside `range`.
    ///
    /// One pass over the table's columns, so the cost does not depend on how
    /// wide the requested range is.
    pub fn resolve<T: AttributeTable + ?Sized>(
        &self,
        table: &T,
        prefix: &str,
        range: YearRange,
    ) -> ResolvedColumns {
        let mut entries: Vec<(i32, String)> = table
            .column_names()
            .into_iter()
            .filter_map(|name| {
                let suffix = name.strip_prefix(prefix)?.strip_prefix(self.separator.as_str())?;
                let year = parse_year(suffix)?;
                range.contains(year).then(|| (year, name.to_string()))
            })
            .collect();
        entries.sort_by_key(|(year, _)| *year);

        ResolvedColumns {
            variable: prefix.to_string(),
            entries,
        }
    }

    /// Like `resolve`, but an empty result aborts the run
    pub fn resolve_required<T: AttributeTable + ?Sized>(
        &self,
        table: &T,
        prefix: &str,
        range: YearRange,
    ) -> Result<ResolvedColumns> {
        let resolved = self.resolve(table, prefix, range);
        if resolved.is_empty() {
            return Err(ProcessingError::MissingColumns {
                variable: prefix.to_string(),
                start: range.start,
                end: range.end,
            });
        }
        Ok(resolved)
    }
}

/// Only the canonical spelling counts: `BA_2003`, not `BA_02003` or `BA_+2003`
fn parse_year(suffix: &str) -> Option<i32> {
    let year: i32 = suffix.parse().ok()?;
    (year.to_string() == suffix).then_some(year)
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new()
    }
}
