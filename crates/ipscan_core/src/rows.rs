use std::fmt;

/// Field carrying the analysed address in every result row.
pub const ADDRESS_FIELD: &str = "ip";
/// Field carrying the risk classification.
pub const RISK_LEVEL_FIELD: &str = "risk_level";

static MISSING: FieldValue = FieldValue::Missing;

/// A single cell of a result row, loosely typed as received from the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => Ok(()),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One address's analysis record. Field order is kept as received.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    fields: Vec<(String, FieldValue)>,
}

impl ResultRow {
    pub fn new(fields: Vec<(String, FieldValue)>) -> Self {
        Self { fields }
    }

    /// Builder-style insert; replaces an existing field in place.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    /// Returns `FieldValue::Missing` for absent fields.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
            .unwrap_or(&MISSING)
    }

    pub fn address(&self) -> &str {
        self.get(ADDRESS_FIELD).as_str().unwrap_or_default()
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.get(RISK_LEVEL_FIELD)
            .as_str()
            .map(RiskLevel::parse)
            .unwrap_or(RiskLevel::Unknown)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskLevel {
    /// Accepts English labels and the localized labels the analysis service
    /// emits. "Normal" is folded into `Low`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" | "高风险" => RiskLevel::High,
            "medium" | "中风险" => RiskLevel::Medium,
            "low" | "低风险" | "normal" | "正常" => RiskLevel::Low,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiskSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    /// Everything that is neither high nor medium, unknown included.
    pub low: usize,
}

impl RiskSummary {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        let mut summary = RiskSummary {
            total: rows.len(),
            ..RiskSummary::default()
        };
        for row in rows {
            match row.risk_level() {
                RiskLevel::High => summary.high += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::Low | RiskLevel::Unknown => {}
            }
        }
        summary.low = summary.total - summary.high - summary.medium;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_unknown_and_normal_as_low() {
        let rows: Vec<ResultRow> = ["High", "中风险", "normal", "", "low"]
            .iter()
            .map(|label| ResultRow::default().with(RISK_LEVEL_FIELD, *label))
            .collect();
        let summary = RiskSummary::from_rows(&rows);
        assert_eq!(
            summary,
            RiskSummary {
                total: 5,
                high: 1,
                medium: 1,
                low: 3,
            }
        );
    }
}
