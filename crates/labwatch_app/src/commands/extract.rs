use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use labwatch_engine::{
    decode_page, Extractor, FetchSettings, Fetcher, LabReportExtractor, ReqwestFetcher,
};
use url::Url;

use super::emit;

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Saved lab report page, or an http(s) URL to fetch it from
    pub(crate) source: String,

    /// Write the record JSON to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub(crate) output: Option<PathBuf>,
}

pub async fn execute(args: ExtractArgs) -> Result<()> {
    let html = match remote_source(&args.source) {
        Some(url) => fetch_page(&url).await?,
        None => std::fs::read_to_string(Path::new(&args.source))
            .with_context(|| format!("failed to read {}", args.source))?,
    };
    let record = LabReportExtractor
        .extract(&html)
        .with_context(|| format!("cannot extract a record from {}", args.source))?;
    let mut json = serde_json::to_string_pretty(&record)?;
    json.push('\n');
    emit(&json, args.output.as_deref(), args.output.is_some())
}

fn remote_source(source: &str) -> Option<Url> {
    Url::parse(source)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

async fn fetch_page(url: &Url) -> Result<String> {
    let fetcher = ReqwestFetcher::new(FetchSettings::default())?;
    let output = fetcher
        .fetch(url)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;
    let page = decode_page(&output.bytes, output.metadata.content_type.as_deref())
        .with_context(|| format!("cannot decode {url}"))?;
    Ok(page.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labwatch_core::parse_record;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<form id="form1"><span id="lblName">JANE DOE</span>
        <table id="GView"><tr><th>a</th><th>b</th><th>c</th><th>d</th></tr>
        <tr><td>B1</td><td>01/01/2025</td><td><span id="GView_lblTest_0">CBC</span></td><td>Pending</td></tr>
        </table></form>"#;

    fn assert_sample_record(output: &Path) {
        let record = parse_record(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(
            record.personal_details.get("patient_name").map(String::as_str),
            Some("JANE DOE")
        );
        assert_eq!(record.tests.len(), 1);
        assert_eq!(record.tests[0].status.as_deref(), Some("Pending"));
    }

    #[tokio::test]
    async fn extracted_json_loads_back_as_a_record() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("report.html");
        fs::write(&source, PAGE).unwrap();
        let output = dir.path().join("report.json");
        execute(ExtractArgs {
            source: source.display().to_string(),
            output: Some(output.clone()),
        })
        .await
        .unwrap();
        assert_sample_record(&output);
    }

    #[tokio::test]
    async fn url_sources_are_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient_Report.aspx/20250335112"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("report.json");
        execute(ExtractArgs {
            source: format!("{}/Patient_Report.aspx/20250335112", server.uri()),
            output: Some(output.clone()),
        })
        .await
        .unwrap();
        assert_sample_record(&output);
    }

    #[tokio::test]
    async fn unrelated_page_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("login.html");
        fs::write(&source, "<p>Please sign in</p>").unwrap();
        let result = execute(ExtractArgs {
            source: source.display().to_string(),
            output: None,
        })
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn only_http_schemes_count_as_remote() {
        assert!(remote_source("https://lis.example.test/report/1").is_some());
        assert!(remote_source("report.html").is_none());
        assert!(remote_source("C:\\reports\\a.html").is_none());
        assert!(remote_source("file:///tmp/a.html").is_none());
    }
}
