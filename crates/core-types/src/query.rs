use crate::enums::{FormType, SortField, SortOrder};
use serde::{Deserialize, Serialize};

/// How a form listing is ordered and narrowed.
///
/// Built from untrusted query-string values with a permissive policy: an
/// unrecognised sort key, order or type filter is replaced by its default
/// rather than reported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub sort_by: SortField,
    pub order: SortOrder,
    pub form_type: Option<FormType>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn from_params(
        sort_by: Option<&str>,
        order: Option<&str>,
        form_type: Option<&str>,
        search: Option<&str>,
    ) -> Self {
        Self {
            sort_by: sort_by.map(SortField::parse_or_default).unwrap_or_default(),
            order: order.map(SortOrder::parse_or_default).unwrap_or_default(),
            form_type: form_type.and_then(|raw| raw.parse().ok()),
            search: search
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_owned),
        }
    }

    pub fn sorted(sort_by: SortField, order: SortOrder) -> Self {
        Self { sort_by, order, ..Default::default() }
    }

    /// The `ILIKE` pattern for the name search, with wildcards in the term
    /// escaped so they match literally.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|term| {
            let mut escaped = String::with_capacity(term.len() + 2);
            escaped.push('%');
            for ch in term.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(ch);
            }
            escaped.push('%');
            escaped
        })
    }
}
