//! Heuristic-typed row comparison and the presented-order controller.

use std::cmp::Ordering;

use crate::rows::{FieldValue, ResultRow};

/// Placeholder the service uses for "no data"; sorts like an empty cell.
const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Normalized<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
}

impl<'a> Normalized<'a> {
    fn from_field(value: &'a FieldValue) -> Self {
        match value {
            FieldValue::Missing => Normalized::Text(""),
            FieldValue::Text(text) if text == PLACEHOLDER => Normalized::Text(""),
            FieldValue::Text(text) => Normalized::Text(text),
            FieldValue::Number(n) => Normalized::Number(*n),
            FieldValue::Bool(b) => Normalized::Bool(*b),
        }
    }

    fn has_percent(self) -> bool {
        matches!(self, Normalized::Text(text) if text.contains('%'))
    }

    /// Percent-aware coercion: `%` is stripped and the leading number is
    /// taken; anything unparsable counts as zero.
    fn percent_value(self) -> f64 {
        match self {
            Normalized::Text(text) => leading_number(&text.replace('%', "")).unwrap_or(0.0),
            Normalized::Number(n) => n,
            Normalized::Bool(b) => f64::from(u8::from(b)),
        }
    }

    /// Strict coercion: the whole text must be a finite number. Blank text
    /// counts as zero.
    fn numeric_value(self) -> Option<f64> {
        match self {
            Normalized::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Some(0.0);
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            Normalized::Number(n) => Some(n),
            Normalized::Bool(b) => Some(f64::from(u8::from(b))),
        }
    }

    fn folded_text(self) -> String {
        match self {
            Normalized::Text(text) => text.to_lowercase(),
            Normalized::Number(n) => FieldValue::Number(n).to_string(),
            Normalized::Bool(b) => b.to_string(),
        }
    }
}

/// Compares two cells the way the results table orders them.
///
/// Percent-bearing text forces a numeric comparison on both sides, two
/// numeric-looking cells compare as numbers, and everything else compares
/// as case-folded text. `Missing` and `"N/A"` behave like empty text.
pub fn compare(a: &FieldValue, b: &FieldValue, direction: SortDirection) -> Ordering {
    let a = Normalized::from_field(a);
    let b = Normalized::from_field(b);

    let natural = if a.has_percent() || b.has_percent() {
        cmp_numbers(a.percent_value(), b.percent_value())
    } else if let (Some(x), Some(y)) = (a.numeric_value(), b.numeric_value()) {
        cmp_numbers(x, y)
    } else {
        a.folded_text().cmp(&b.folded_text())
    };

    direction.apply(natural)
}

fn cmp_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Parses the longest leading decimal literal, e.g. `"12.5 pts"` -> 12.5.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Bottom-up merge sort; ties keep their input order.
///
/// The cell comparator is not a total order over mixed numeric and text
/// columns, and `slice::sort_by` may panic when it detects that.
fn stable_sort_by<F>(items: &mut Vec<usize>, mut cmp: F)
where
    F: FnMut(usize, usize) -> Ordering,
{
    let len = items.len();
    let mut buf = items.clone();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                if cmp(items[j], items[i]) == Ordering::Less {
                    buf[k] = items[j];
                    j += 1;
                } else {
                    buf[k] = items[i];
                    i += 1;
                }
                k += 1;
            }
            buf[k..k + (mid - i)].copy_from_slice(&items[i..mid]);
            k += mid - i;
            buf[k..k + (end - j)].copy_from_slice(&items[j..end]);
            start = end;
        }
        std::mem::swap(items, &mut buf);
        width *= 2;
    }
}

/// Canned orderings offered next to the table headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickSort {
    /// Highest abuse confidence first.
    Risk,
    /// Most reports first.
    Reports,
    /// Country code, A to Z.
    Country,
}

impl QuickSort {
    pub fn field(self) -> &'static str {
        match self {
            QuickSort::Risk => "abuse_confidence",
            QuickSort::Reports => "total_reports",
            QuickSort::Country => "country",
        }
    }

    pub fn direction(self) -> SortDirection {
        match self {
            QuickSort::Risk | QuickSort::Reports => SortDirection::Desc,
            QuickSort::Country => SortDirection::Asc,
        }
    }
}

/// Presented order of a result set. The rows themselves are never touched;
/// the controller only keeps a permutation of their indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortController {
    field: Option<String>,
    direction: SortDirection,
    order: Vec<usize>,
}

impl SortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the active field and restores received order.
    pub fn reset(&mut self, rows: &[ResultRow]) {
        self.field = None;
        self.direction = SortDirection::Asc;
        self.order = (0..rows.len()).collect();
    }

    /// Header click: same field toggles direction, a new field starts ascending.
    /// Does nothing on an empty result set.
    pub fn sort_by(&mut self, field: &str, rows: &[ResultRow]) {
        if rows.is_empty() {
            return;
        }
        let direction = if self.field.as_deref() == Some(field) {
            self.direction.toggled()
        } else {
            SortDirection::Asc
        };
        self.sort_with(field, direction, rows);
    }

    pub fn quick_sort(&mut self, quick: QuickSort, rows: &[ResultRow]) {
        if rows.is_empty() {
            return;
        }
        self.sort_with(quick.field(), quick.direction(), rows);
    }

    fn sort_with(&mut self, field: &str, direction: SortDirection, rows: &[ResultRow]) {
        self.field = Some(field.to_owned());
        self.direction = direction;
        let mut order: Vec<usize> = (0..rows.len()).collect();
        stable_sort_by(&mut order, |a, b| {
            compare(rows[a].get(field), rows[b].get(field), direction)
        });
        self.order = order;
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Indices into the row set, in presented order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn sorted<'a>(&'a self, rows: &'a [ResultRow]) -> impl Iterator<Item = &'a ResultRow> {
        self.order.iter().filter_map(move |&index| rows.get(index))
    }
}
