//! Report endpoints and download file names.

use clap::ValueEnum;
use url::form_urlencoded;

/// Report families served by `/reports/<KIND>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
    Conformity,
    Custom,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Conformity => "CONFORMITY",
            Self::Custom => "CUSTOM",
        }
    }

    /// Label used in generated file names.
    fn file_label(self) -> &'static str {
        match self {
            Self::Daily => "diario",
            Self::Weekly => "semanal",
            Self::Monthly => "mensal",
            Self::Conformity => "conformidade",
            Self::Custom => "personalizado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Pdf,
    Xlsx,
    Csv,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// Parameters of an on-demand report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub date: Option<String>,
    pub week: Option<String>,
    pub month: Option<String>,
}

impl ReportRequest {
    /// Endpoint with its query string. `format` is always sent; the period
    /// parameter only for the kinds that take one.
    pub fn endpoint(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("format", self.format.as_str());

        let period = match self.kind {
            ReportKind::Daily | ReportKind::Conformity => ("date", self.date.as_deref()),
            ReportKind::Weekly => ("week", self.week.as_deref()),
            ReportKind::Monthly => ("month", self.month.as_deref()),
            ReportKind::Custom => ("", None),
        };
        if let (name, Some(value)) = period
            && !value.is_empty()
        {
            query.append_pair(name, value);
        }

        format!("/reports/{}?{}", self.kind.as_str(), query.finish())
    }

    /// Name used when the server does not announce one.
    pub fn fallback_filename(&self, unix_millis: u128) -> String {
        format!(
            "relatorio-{}-{unix_millis}.{}",
            self.kind.file_label(),
            self.format.as_str()
        )
    }
}

pub fn saved_report_endpoint(id: &str) -> String {
    format!("/reports/saved/{id}")
}

/// Fallback for a stored report: last path segment of its `fileUrl`, else
/// `relatorio-<id>`.
pub fn saved_report_fallback(id: &str, file_url: Option<&str>) -> String {
    file_url
        .map(|url| url.split(['?', '#']).next().unwrap_or(url))
        .and_then(|path| path.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("relatorio-{id}"))
}
